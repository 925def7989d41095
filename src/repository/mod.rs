//! Observation persistence
//!
//! The store is append-only: observations are inserted and ranked, never
//! updated or deleted.

pub mod sqlite;

use async_trait::async_trait;

use crate::models::Observation;
use crate::Result;

pub use sqlite::SqliteObservationRepository;

/// Durable store of observations
#[async_trait]
pub trait ObservationRepository: Send + Sync {
    /// Persist `observation` and return a copy carrying the assigned id.
    async fn save(&self, observation: &Observation) -> Result<Observation>;

    /// The observation with the highest US AQI recorded for `city`.
    ///
    /// City matching is exact. Ties on AQI go to the most recent
    /// `created_at`, then to the highest id. Returns `Ok(None)` when the
    /// city has no observations.
    async fn find_most_polluted(&self, city: &str) -> Result<Option<Observation>>;
}
