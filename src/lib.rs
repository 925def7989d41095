//! `airquality` - scheduled air quality ingestion and ranking
//!
//! This library fetches pollution and weather readings from the IQAir API on
//! a fixed schedule, stores every reading as an immutable observation, and
//! answers "most polluted moment" queries per city.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod provider;
pub mod repository;
pub mod scheduler;
pub mod service;
pub mod telemetry;
pub mod web;

// Re-export core types for public API
pub use config::AirQualityConfig;
pub use error::AirQualityError;
pub use models::{Location, MostPolluted, Observation, ObservationId, Pollution, Weather};
pub use pipeline::{CycleOutcome, Pipeline, Target};
pub use provider::{IqAirClient, ObservationProvider};
pub use repository::{ObservationRepository, SqliteObservationRepository};
pub use scheduler::Scheduler;
pub use service::QueryService;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, AirQualityError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
