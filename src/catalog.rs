use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::models::{MovieDetail, MovieSummary, TypeFilter};

pub const SEARCH_UNAVAILABLE: &str = "Failed to fetch movies. Please try again later.";
pub const DETAILS_UNAVAILABLE: &str = "Failed to fetch movie details. Please try again later.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Unavailable(&'static str),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchPage {
    pub results: Vec<MovieSummary>,
    pub total_results: u64,
}

#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn search(
        &self,
        term: &str,
        filter: TypeFilter,
        page: u32,
    ) -> Result<SearchPage, CatalogError>;

    async fn get_details(&self, imdb_id: &str) -> Result<MovieDetail, CatalogError>;
}
