// src/provider.rs
//
// Contracts for the external collaborators: the network metadata
// provider and the remembered-selection store. The core consumes only
// these shapes; transport and persistence stay outside the crate.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{EpisodePlacement, ShowCandidate};
use crate::error::AppResult;
use crate::text::normalize_for_query;

/// Episode-level metadata returned once a show is resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeMetadata {
    pub title: String,
    pub air_date: Option<NaiveDate>,
}

/// The metadata provider: candidate search by show name, episode
/// lookup by resolved show + placement. Implementations wrap whatever
/// network client the application ships with.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShowLookup: Send + Sync {
    /// Ordered candidate list for a (normalized) show-name query
    async fn search_shows(&self, query: &str) -> AppResult<Vec<ShowCandidate>>;

    /// Title and air date for one episode of a resolved show
    async fn episode_metadata(
        &self,
        show_id: &str,
        placement: &EpisodePlacement,
    ) -> AppResult<EpisodeMetadata>;
}

/// Remembered show selections: query string to pinned identifier.
/// Consulted before any textual matching so a user decides each
/// ambiguous query at most once. Durable persistence is the
/// application's concern; keys are `normalize_for_query` output.
#[cfg_attr(test, mockall::automock)]
pub trait SelectionStore: Send + Sync {
    fn pinned_for(&self, query: &str) -> Option<String>;
    fn remember(&self, query: &str, show_id: &str);
}

/// In-process selection store. Normalizes keys on both paths so
/// "The Office" and "the.office" share one pin.
#[derive(Debug, Default)]
pub struct InMemorySelectionStore {
    pins: RwLock<HashMap<String, String>>,
}

impl InMemorySelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from previously persisted pairs
    pub fn with_pins<I, K, V>(pins: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let map = pins
            .into_iter()
            .map(|(k, v)| (normalize_for_query(k.as_ref()), v.into()))
            .collect();
        Self {
            pins: RwLock::new(map),
        }
    }

    /// Snapshot for persisting, in no particular order
    pub fn entries(&self) -> Vec<(String, String)> {
        self.pins
            .read()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl SelectionStore for InMemorySelectionStore {
    fn pinned_for(&self, query: &str) -> Option<String> {
        self.pins
            .read()
            .unwrap()
            .get(&normalize_for_query(query))
            .cloned()
    }

    fn remember(&self, query: &str, show_id: &str) {
        self.pins
            .write()
            .unwrap()
            .insert(normalize_for_query(query), show_id.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_round_trip_is_keyed_by_normalized_query() {
        let store = InMemorySelectionStore::new();
        store.remember("The Office", "78107");

        assert_eq!(store.pinned_for("the.office").as_deref(), Some("78107"));
        assert_eq!(store.pinned_for("THE OFFICE").as_deref(), Some("78107"));
        assert_eq!(store.pinned_for("The Office (US)"), None);
    }

    #[test]
    fn test_later_selection_replaces_earlier() {
        let store = InMemorySelectionStore::new();
        store.remember("Doctor Who", "76107");
        store.remember("Doctor Who", "78804");

        assert_eq!(store.pinned_for("Doctor Who").as_deref(), Some("78804"));
        assert_eq!(store.entries().len(), 1);
    }

    #[test]
    fn test_seeding_normalizes_keys() {
        let store =
            InMemorySelectionStore::with_pins([("Marvel's Agents of S.H.I.E.L.D.", "263365")]);
        assert_eq!(
            store.pinned_for("marvels agents of shield").as_deref(),
            Some("263365")
        );
    }
}
