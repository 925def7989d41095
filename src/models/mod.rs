//! Data models for the air quality service
//!
//! - Location: validated geographic coordinates
//! - Observation: pollution and weather readings for a location

pub mod location;
pub mod observation;

// Re-export all public types for convenient access
pub use location::Location;
pub use observation::{MostPolluted, Observation, ObservationId, Pollution, Weather};
