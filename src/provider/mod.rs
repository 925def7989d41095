//! Air quality providers
//!
//! A provider turns a [`Location`] into a freshly stamped [`Observation`].
//! The production implementation talks to the IQAir "nearest city" API.

pub mod iqair;

use async_trait::async_trait;

use crate::models::{Location, Observation};
use crate::Result;

pub use iqair::IqAirClient;

/// Source of observations for a coordinate
#[async_trait]
pub trait ObservationProvider: Send + Sync {
    /// Fetch the current reading nearest to `location`.
    ///
    /// The returned observation has no id and is stamped with the time of
    /// mapping. Any upstream failure is reported as
    /// [`AirQualityError::Provider`](crate::AirQualityError::Provider).
    async fn fetch_observation(&self, location: &Location) -> Result<Observation>;
}
