//! Fetch-and-persist ingestion cycle
//!
//! One cycle fetches the current reading for a target and stores it. A
//! failure at either step abandons the cycle: it is logged and reported as a
//! [`CycleOutcome`], never returned as an error, so a bad fetch or a store
//! outage cannot stop later cycles.

use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::models::{Location, ObservationId};
use crate::provider::ObservationProvider;
use crate::repository::ObservationRepository;

/// City label and coordinates ingested by the scheduler
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub city: String,
    pub location: Location,
}

impl Target {
    #[must_use]
    pub fn new(city: impl Into<String>, location: Location) -> Self {
        Self {
            city: city.into(),
            location,
        }
    }
}

/// What happened during one cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Observation fetched and stored under this id
    Persisted(ObservationId),
    /// Provider call failed; nothing was stored
    FetchFailed,
    /// Observation fetched but the store rejected it
    SaveFailed,
}

/// Provider → repository orchestration for one ingestion cycle
#[derive(Clone)]
pub struct Pipeline {
    provider: Arc<dyn ObservationProvider>,
    repository: Arc<dyn ObservationRepository>,
    quiet: bool,
}

impl Pipeline {
    pub fn new(
        provider: Arc<dyn ObservationProvider>,
        repository: Arc<dyn ObservationRepository>,
    ) -> Self {
        Self {
            provider,
            repository,
            quiet: false,
        }
    }

    /// Suppress failed-cycle warnings, used under `environment = "test"`
    #[must_use]
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Run one cycle for `target`. Never fails and never retries.
    #[instrument(name = "ingestion_cycle", skip_all, fields(city = %target.city))]
    pub async fn run(&self, target: &Target) -> CycleOutcome {
        debug!(
            "Checking air quality for {} ({})",
            target.city,
            target.location.format_coordinates()
        );

        let observation = match self.provider.fetch_observation(&target.location).await {
            Ok(observation) => observation,
            Err(e) => {
                if !self.quiet {
                    warn!("Failed to check air quality for {}: {}", target.city, e);
                }
                return CycleOutcome::FetchFailed;
            }
        };

        match self.repository.save(&observation).await {
            Ok(saved) => match saved.id {
                Some(id) => {
                    info!(
                        %id,
                        aqius = saved.pollution.aqius,
                        "Air quality data for {} saved",
                        target.city
                    );
                    CycleOutcome::Persisted(id)
                }
                None => {
                    if !self.quiet {
                        warn!("Store returned an observation without an id for {}", target.city);
                    }
                    CycleOutcome::SaveFailed
                }
            },
            Err(e) => {
                if !self.quiet {
                    warn!("Failed to save air quality for {}: {}", target.city, e);
                }
                CycleOutcome::SaveFailed
            }
        }
    }
}
