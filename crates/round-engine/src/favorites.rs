//! Favourite learning topics, persisted through a pluggable key-value store

use std::collections::{BTreeMap, BTreeSet};
use std::convert::Infallible;

use thiserror::Error;
use tracing::debug;

/// Storage key the favourites list lives under
pub const FAVORITES_KEY: &str = "favorites";

/// Minimal string key-value persistence
///
/// Browser local storage on the web, a map in tests.
pub trait KeyValueStore {
    type Error: std::error::Error + Send + Sync + 'static;

    fn get(&self, key: &str) -> Result<Option<String>, Self::Error>;

    fn set(&mut self, key: &str, value: String) -> Result<(), Self::Error>;
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    type Error = Infallible;

    fn get(&self, key: &str) -> Result<Option<String>, Infallible> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), Infallible> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum FavoritesError<E: std::error::Error + 'static> {
    #[error("Favorites store failed: {0}")]
    Store(#[source] E),

    #[error("Stored favorites are not a JSON list of topics: {0}")]
    Format(#[from] serde_json::Error),
}

/// Set of favourite topic ids, written through on every change
#[derive(Debug)]
pub struct Favorites<S: KeyValueStore> {
    store: S,
    topics: BTreeSet<String>,
}

impl<S: KeyValueStore> Favorites<S> {
    /// Read the stored list once; a missing key is an empty set
    pub fn load(store: S) -> Result<Self, FavoritesError<S::Error>> {
        let topics = match store.get(FAVORITES_KEY).map_err(FavoritesError::Store)? {
            Some(raw) => serde_json::from_str::<Vec<String>>(&raw)?.into_iter().collect(),
            None => BTreeSet::new(),
        };
        Ok(Self { store, topics })
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.topics.contains(topic)
    }

    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.topics.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// Add or remove `topic`; returns whether it is a favourite afterwards
    pub fn toggle(&mut self, topic: &str) -> Result<bool, FavoritesError<S::Error>> {
        let now_favorite = if self.topics.remove(topic) {
            false
        } else {
            self.topics.insert(topic.to_string());
            true
        };
        self.persist()?;
        debug!(topic, now_favorite, "favorite toggled");
        Ok(now_favorite)
    }

    fn persist(&mut self) -> Result<(), FavoritesError<S::Error>> {
        let list: Vec<&str> = self.topics.iter().map(String::as_str).collect();
        let raw = serde_json::to_string(&list)?;
        self.store.set(FAVORITES_KEY, raw).map_err(FavoritesError::Store)
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_persists() {
        let mut favorites = Favorites::load(MemoryStore::new()).unwrap();
        assert!(favorites.is_empty());
        assert!(favorites.toggle("nash-equilibrium").unwrap());
        assert!(favorites.toggle("prisoners-dilemma").unwrap());
        assert!(!favorites.toggle("nash-equilibrium").unwrap());

        let store = favorites.into_store();
        assert_eq!(store.get(FAVORITES_KEY).unwrap().as_deref(), Some(r#"["prisoners-dilemma"]"#));
    }

    #[test]
    fn test_load_existing_list() {
        let mut store = MemoryStore::new();
        store.set(FAVORITES_KEY, r#"["zero-sum","mixed-strategy"]"#.to_string()).unwrap();
        let favorites = Favorites::load(store).unwrap();
        assert!(favorites.contains("zero-sum"));
        assert_eq!(favorites.topics().collect::<Vec<_>>(), vec!["mixed-strategy", "zero-sum"]);
    }

    #[test]
    fn test_malformed_list_rejected() {
        let mut store = MemoryStore::new();
        store.set(FAVORITES_KEY, "{not json".to_string()).unwrap();
        assert!(matches!(Favorites::load(store), Err(FavoritesError::Format(_))));
    }
}
