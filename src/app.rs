use crate::catalog::{CatalogApi, CatalogError};
use crate::config::Config;
use crate::favorites::FavoritesStore;
use crate::models::{MovieDetail, MovieSummary, TypeFilter};
use crate::omdb::OmdbClient;
use crate::session::{IntentOutcome, SearchSession, SessionSnapshot};
use crate::storage::{FileStore, KeyValueStore};
use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info, warn};

const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogApi>,
    pub favorites: Arc<FavoritesStore>,
    pub session: Arc<SearchSession>,
}

impl AppState {
    pub fn new(catalog: Arc<dyn CatalogApi>, favorites: Arc<FavoritesStore>) -> Self {
        let session = Arc::new(SearchSession::new(catalog.clone()));
        Self {
            catalog,
            favorites,
            session,
        }
    }
}

pub async fn run_server(config: Config) -> Result<()> {
    let catalog: Arc<dyn CatalogApi> = Arc::new(OmdbClient::from_config(&config)?);
    let storage: Arc<dyn KeyValueStore> = Arc::new(
        FileStore::open(&config.data_dir)
            .with_context(|| format!("Failed to open data dir {}", config.data_dir.display()))?,
    );
    let favorites = Arc::new(FavoritesStore::load(storage));
    let _saved = favorites.subscribe(|snapshot| {
        info!(count = snapshot.len(), "Favorites saved");
    });

    let state = AppState::new(catalog, favorites);
    let session = state.session.clone();
    tokio::spawn(async move {
        session.initialize().await;
    });

    let app = build_router(state);

    info!("Listening on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/search", get(get_search).post(post_search))
        .route("/search/filter", post(post_filter))
        .route("/search/page", post(post_page))
        .route("/search/types", get(get_types))
        .route("/movies/:id", get(get_movie))
        .route("/favorites", get(get_favorites).post(post_favorite))
        .route(
            "/favorites/:id",
            get(get_favorite).delete(delete_favorite),
        )
        .route("/favorites/:id/toggle", post(toggle_favorite))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

#[derive(Deserialize)]
struct SearchRequest {
    term: String,
}

#[derive(Deserialize)]
struct FilterRequest {
    #[serde(rename = "type")]
    filter: TypeFilter,
}

#[derive(Deserialize)]
struct PageRequest {
    page: u32,
}

#[derive(Serialize)]
struct TypeOption {
    value: TypeFilter,
    label: &'static str,
}

#[derive(Serialize)]
struct MovieResponse {
    #[serde(flatten)]
    detail: MovieDetail,
    poster_url: Option<String>,
    genres: Vec<String>,
    actors: Vec<String>,
    favorite: bool,
}

#[derive(Serialize)]
struct FavoritesResponse {
    count: usize,
    favorites: Vec<MovieSummary>,
}

#[derive(Serialize)]
struct FavoriteStatus {
    #[serde(rename = "imdbID")]
    imdb_id: String,
    favorite: bool,
}

type ErrorResponse = (StatusCode, Json<Value>);

fn error_response(status: StatusCode, message: &str) -> ErrorResponse {
    (
        status,
        Json(json!({"status": "error", "message": message})),
    )
}

fn intent_response(
    state: &AppState,
    outcome: IntentOutcome,
) -> (StatusCode, Json<SessionSnapshot>) {
    let status = match outcome {
        IntentOutcome::Rejected => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::OK,
    };
    (status, Json(state.session.snapshot()))
}

async fn get_search(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.session.snapshot())
}

async fn post_search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> (StatusCode, Json<SessionSnapshot>) {
    let outcome = state.session.search(&req.term).await;
    intent_response(&state, outcome)
}

async fn post_filter(
    State(state): State<AppState>,
    Json(req): Json<FilterRequest>,
) -> (StatusCode, Json<SessionSnapshot>) {
    let outcome = state.session.change_filter(req.filter).await;
    intent_response(&state, outcome)
}

async fn post_page(
    State(state): State<AppState>,
    Json(req): Json<PageRequest>,
) -> (StatusCode, Json<SessionSnapshot>) {
    let outcome = state.session.change_page(req.page).await;
    intent_response(&state, outcome)
}

async fn get_types() -> Json<Vec<TypeOption>> {
    Json(
        TypeFilter::OPTIONS
            .iter()
            .map(|f| TypeOption {
                value: *f,
                label: f.label(),
            })
            .collect(),
    )
}

async fn get_movie(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MovieResponse>, ErrorResponse> {
    match state.catalog.get_details(&id).await {
        Ok(detail) => {
            let favorite = state.favorites.is_favorite(&detail.imdb_id);
            Ok(Json(MovieResponse {
                poster_url: detail.poster_url().map(str::to_string),
                genres: detail.genres(),
                actors: detail.actors(),
                detail,
                favorite,
            }))
        }
        Err(e @ CatalogError::Upstream(_)) => {
            info!("No details for '{}': {}", id, e);
            Err(error_response(StatusCode::NOT_FOUND, &e.to_string()))
        }
        Err(e) => {
            warn!("Detail lookup for '{}' failed: {}", id, e);
            Err(error_response(StatusCode::BAD_GATEWAY, &e.to_string()))
        }
    }
}

// Favorites mutations write through to storage synchronously, so they run on
// the blocking pool.
async fn update_favorites<T, F>(state: &AppState, update: F) -> Result<T, ErrorResponse>
where
    F: FnOnce(&FavoritesStore) -> T + Send + 'static,
    T: Send + 'static,
{
    let favorites = state.favorites.clone();
    tokio::task::spawn_blocking(move || update(&favorites))
        .await
        .map_err(|e| {
            error!("Favorites update task failed: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to update favorites",
            )
        })
}

async fn get_favorites(State(state): State<AppState>) -> Json<FavoritesResponse> {
    let favorites = state.favorites.favorites();
    Json(FavoritesResponse {
        count: favorites.len(),
        favorites,
    })
}

async fn get_favorite(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<FavoriteStatus> {
    let favorite = state.favorites.is_favorite(&id);
    Json(FavoriteStatus {
        imdb_id: id,
        favorite,
    })
}

async fn post_favorite(
    State(state): State<AppState>,
    Json(movie): Json<MovieSummary>,
) -> Result<Json<FavoriteStatus>, ErrorResponse> {
    if movie.imdb_id.trim().is_empty() {
        return Err(error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "imdbID must not be empty",
        ));
    }
    let imdb_id = movie.imdb_id.clone();
    update_favorites(&state, move |favorites| favorites.add_favorite(movie)).await?;
    Ok(Json(FavoriteStatus {
        imdb_id,
        favorite: true,
    }))
}

async fn toggle_favorite(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(movie): Json<MovieSummary>,
) -> Result<Json<FavoriteStatus>, ErrorResponse> {
    if movie.imdb_id != id {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "imdbID in body does not match path",
        ));
    }
    let favorite =
        update_favorites(&state, move |favorites| favorites.toggle_favorite(movie)).await?;
    Ok(Json(FavoriteStatus {
        imdb_id: id,
        favorite,
    }))
}

async fn delete_favorite(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FavoriteStatus>, ErrorResponse> {
    let target = id.clone();
    update_favorites(&state, move |favorites| favorites.remove_favorite(&target)).await?;
    Ok(Json(FavoriteStatus {
        imdb_id: id,
        favorite: false,
    }))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        term.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
