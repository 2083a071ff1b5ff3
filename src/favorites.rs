use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tracing::{debug, error, info, warn};

use crate::models::MovieSummary;
use crate::storage::KeyValueStore;

pub const FAVORITES_KEY: &str = "favorites";

type Listener = Arc<dyn Fn(&[MovieSummary]) + Send + Sync>;

#[derive(Default)]
struct FavoriteSet {
    order: Vec<MovieSummary>,
    ids: HashSet<String>,
}

impl FavoriteSet {
    fn from_records(records: Vec<MovieSummary>) -> Self {
        let mut set = Self::default();
        for movie in records {
            set.insert(movie);
        }
        set
    }

    fn insert(&mut self, movie: MovieSummary) -> bool {
        if !self.ids.insert(movie.imdb_id.clone()) {
            return false;
        }
        self.order.push(movie);
        true
    }

    fn remove(&mut self, id: &str) -> bool {
        if !self.ids.remove(id) {
            return false;
        }
        self.order.retain(|m| m.imdb_id != id);
        true
    }
}

#[derive(Default)]
struct Listeners {
    next_id: AtomicU64,
    entries: Mutex<Vec<(u64, Listener)>>,
}

pub struct FavoritesStore {
    storage: Arc<dyn KeyValueStore>,
    set: Mutex<FavoriteSet>,
    listeners: Arc<Listeners>,
}

pub struct Subscription {
    id: u64,
    listeners: Weak<Listeners>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        if let Some(listeners) = self.listeners.upgrade() {
            lock(&listeners.entries).retain(|(id, _)| *id != self.id);
        }
    }
}

impl FavoritesStore {
    // Missing or unreadable content starts an empty set.
    pub fn load(storage: Arc<dyn KeyValueStore>) -> Self {
        let records = match storage.get(FAVORITES_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<MovieSummary>>(&raw) {
                Ok(records) => records,
                Err(e) => {
                    warn!("Stored favorites are unreadable, starting empty: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Failed to read stored favorites, starting empty: {}", e);
                Vec::new()
            }
        };
        let set = FavoriteSet::from_records(records);
        info!("Loaded {} favorite(s)", set.order.len());
        Self {
            storage,
            set: Mutex::new(set),
            listeners: Arc::new(Listeners::default()),
        }
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        lock(&self.set).ids.contains(id)
    }

    pub fn favorites(&self) -> Vec<MovieSummary> {
        lock(&self.set).order.clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.set).order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn add_favorite(&self, movie: MovieSummary) {
        let id = movie.imdb_id.clone();
        self.mutate(|set| set.insert(movie), "added", &id);
    }

    pub fn remove_favorite(&self, id: &str) {
        self.mutate(|set| set.remove(id), "removed", id);
    }

    pub fn toggle_favorite(&self, movie: MovieSummary) -> bool {
        let id = movie.imdb_id.clone();
        let mut now_favorite = false;
        self.mutate(
            |set| {
                if !set.remove(&movie.imdb_id) {
                    now_favorite = set.insert(movie);
                }
                true
            },
            "toggled",
            &id,
        );
        now_favorite
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&[MovieSummary]) + Send + Sync + 'static,
    {
        let id = self.listeners.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.listeners.entries).push((id, Arc::new(callback)));
        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    fn mutate<F>(&self, change: F, action: &str, id: &str)
    where
        F: FnOnce(&mut FavoriteSet) -> bool,
    {
        let snapshot = {
            let mut set = lock(&self.set);
            if !change(&mut set) {
                debug!(imdb_id = %id, "Favorite unchanged ({} was a no-op)", action);
                return;
            }
            let snapshot = set.order.clone();
            self.persist(&snapshot);
            snapshot
        };
        debug!(imdb_id = %id, count = snapshot.len(), "Favorite {}", action);

        let listeners: Vec<Listener> = lock(&self.listeners.entries)
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in listeners {
            listener(snapshot.as_slice());
        }
    }

    fn persist(&self, snapshot: &[MovieSummary]) {
        let encoded = match serde_json::to_string(snapshot) {
            Ok(v) => v,
            Err(e) => {
                error!("Failed to encode favorites: {}", e);
                return;
            }
        };
        if let Err(e) = self.storage.set(FAVORITES_KEY, &encoded) {
            error!("Failed to persist favorites: {}", e);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, StorageError};
    use std::sync::atomic::AtomicUsize;

    fn movie(id: &str, title: &str) -> MovieSummary {
        MovieSummary {
            imdb_id: id.to_string(),
            title: title.to_string(),
            year: "2008".to_string(),
            poster: "N/A".to_string(),
            kind: "movie".to_string(),
        }
    }

    fn ids(store: &FavoritesStore) -> Vec<String> {
        store.favorites().into_iter().map(|m| m.imdb_id).collect()
    }

    #[test]
    fn add_and_remove_keep_ids_unique() {
        let store = FavoritesStore::load(Arc::new(MemoryStore::new()));
        store.add_favorite(movie("tt1", "A"));
        store.add_favorite(movie("tt2", "B"));
        store.add_favorite(movie("tt1", "A again"));
        store.remove_favorite("tt3");
        assert_eq!(ids(&store), vec!["tt1", "tt2"]);
        assert_eq!(store.favorites()[0].title, "A");

        store.remove_favorite("tt1");
        store.add_favorite(movie("tt1", "A"));
        assert_eq!(ids(&store), vec!["tt2", "tt1"]);
        assert!(store.is_favorite("tt1"));
        assert!(!store.is_favorite("tt3"));
        assert_eq!(store.len(), 2);
    }

    #[derive(Clone, Copy)]
    enum Op {
        Add(&'static str),
        Remove(&'static str),
        Toggle(&'static str),
    }

    #[test]
    fn interleaved_scripts_match_an_ordered_model() {
        use Op::{Add, Remove, Toggle};
        let scripts: &[&[Op]] = &[
            &[],
            &[Add("tt1"), Add("tt1"), Add("tt1")],
            &[Remove("tt1"), Add("tt1"), Remove("tt1"), Remove("tt1")],
            &[Add("tt1"), Add("tt2"), Add("tt3"), Remove("tt2"), Add("tt2")],
            &[Add("tt3"), Toggle("tt3"), Toggle("tt3"), Add("tt1"), Toggle("tt2")],
            &[Add("tt1"), Add("tt2"), Remove("tt1"), Add("tt1"), Add("tt2"), Remove("tt9")],
            &[Toggle("tt1"), Toggle("tt2"), Remove("tt1"), Toggle("tt1"), Add("tt3"), Remove("tt2")],
            &[Add("tt2"), Add("tt1"), Remove("tt2"), Remove("tt1"), Add("tt1"), Add("tt2"), Add("tt3")],
        ];
        let universe = ["tt1", "tt2", "tt3", "tt9"];

        for (n, script) in scripts.iter().enumerate() {
            let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
            let store = FavoritesStore::load(storage.clone());
            let mut model: Vec<String> = Vec::new();

            for op in script.iter().copied() {
                match op {
                    Add(id) => {
                        store.add_favorite(movie(id, id));
                        if !model.iter().any(|m| m == id) {
                            model.push(id.to_string());
                        }
                    }
                    Remove(id) => {
                        store.remove_favorite(id);
                        model.retain(|m| m != id);
                    }
                    Toggle(id) => {
                        let now = store.toggle_favorite(movie(id, id));
                        if model.iter().any(|m| m == id) {
                            model.retain(|m| m != id);
                        } else {
                            model.push(id.to_string());
                        }
                        assert_eq!(now, model.iter().any(|m| m == id), "script {n}");
                    }
                }
                assert_eq!(ids(&store), model, "script {n}");
            }

            for id in universe {
                assert_eq!(
                    store.is_favorite(id),
                    model.iter().any(|m| m == id),
                    "script {n}, {id}"
                );
            }
            let reloaded = FavoritesStore::load(storage);
            assert_eq!(ids(&reloaded), model, "script {n} after reload");
        }
    }

    #[test]
    fn reload_restores_the_same_set() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let store = FavoritesStore::load(storage.clone());
        store.add_favorite(movie("tt0468569", "The Dark Knight"));
        store.add_favorite(movie("tt0372784", "Batman Begins"));
        let before = store.favorites();

        let reloaded = FavoritesStore::load(storage);
        assert_eq!(reloaded.favorites(), before);
    }

    #[test]
    fn corrupt_storage_starts_empty() {
        let storage = Arc::new(MemoryStore::with_value(FAVORITES_KEY, "[{not json"));
        let store = FavoritesStore::load(storage);
        assert!(store.is_empty());
    }

    #[test]
    fn stored_duplicates_collapse_to_first() {
        let raw = serde_json::to_string(&vec![movie("tt1", "first"), movie("tt1", "second")])
            .unwrap();
        let store = FavoritesStore::load(Arc::new(MemoryStore::with_value(FAVORITES_KEY, &raw)));
        assert_eq!(store.len(), 1);
        assert_eq!(store.favorites()[0].title, "first");
    }

    #[test]
    fn every_effective_mutation_rewrites_storage() {
        let storage = Arc::new(MemoryStore::new());
        let store = FavoritesStore::load(storage.clone());
        store.add_favorite(movie("tt1", "A"));
        store.add_favorite(movie("tt2", "B"));
        store.remove_favorite("tt1");

        let raw = storage.get(FAVORITES_KEY).unwrap().unwrap();
        let stored: Vec<MovieSummary> = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored, vec![movie("tt2", "B")]);
    }

    #[test]
    fn toggle_flips_membership() {
        let store = FavoritesStore::load(Arc::new(MemoryStore::new()));
        assert!(store.toggle_favorite(movie("tt1", "A")));
        assert!(store.is_favorite("tt1"));
        assert!(!store.toggle_favorite(movie("tt1", "A")));
        assert!(!store.is_favorite("tt1"));
    }

    #[test]
    fn subscribers_see_each_change_until_unsubscribed() {
        let store = FavoritesStore::load(Arc::new(MemoryStore::new()));
        let calls = Arc::new(AtomicUsize::new(0));
        let last_len = Arc::new(AtomicUsize::new(usize::MAX));
        let sub = {
            let calls = calls.clone();
            let last_len = last_len.clone();
            store.subscribe(move |snapshot| {
                calls.fetch_add(1, Ordering::SeqCst);
                last_len.store(snapshot.len(), Ordering::SeqCst);
            })
        };

        store.add_favorite(movie("tt1", "A"));
        store.add_favorite(movie("tt1", "A"));
        store.remove_favorite("missing");
        store.add_favorite(movie("tt2", "B"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(last_len.load(Ordering::SeqCst), 2);

        sub.unsubscribe();
        store.remove_favorite("tt1");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn subscriber_can_read_the_store() {
        let store = Arc::new(FavoritesStore::load(Arc::new(MemoryStore::new())));
        let seen = Arc::new(AtomicUsize::new(0));
        let _sub = {
            let inner = store.clone();
            let seen = seen.clone();
            store.subscribe(move |_| {
                if inner.is_favorite("tt1") {
                    seen.fetch_add(1, Ordering::SeqCst);
                }
            })
        };
        store.add_favorite(movie("tt1", "A"));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Io(std::io::Error::other("disk gone")))
        }
        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Io(std::io::Error::other("disk gone")))
        }
    }

    #[test]
    fn storage_failures_are_not_fatal() {
        let store = FavoritesStore::load(Arc::new(FailingStore));
        assert!(store.is_empty());
        store.add_favorite(movie("tt1", "A"));
        assert!(store.is_favorite("tt1"));
    }
}
