//! Observation model: one immutable pollution + weather reading

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Location;

/// Store-assigned identifier of a persisted observation
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct ObservationId(pub i64);

impl fmt::Display for ObservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Air pollution measurement
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Pollution {
    /// Time the provider took the measurement
    pub timestamp: DateTime<Utc>,
    /// US EPA air quality index
    pub aqius: u32,
    /// Main pollutant for the US index (e.g. "p2" = PM2.5)
    pub mainus: String,
    /// China MEP air quality index
    pub aqicn: u32,
    /// Main pollutant for the China index
    pub maincn: String,
}

/// Weather conditions reported alongside the pollution reading
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Weather {
    pub timestamp: DateTime<Utc>,
    /// Temperature in Celsius
    pub temperature: f64,
    /// Atmospheric pressure in hPa
    pub pressure: f64,
    /// Relative humidity in percent
    pub humidity: f64,
    /// Wind speed in m/s
    pub wind_speed: f64,
    /// Wind direction in degrees (0-360, where 0/360 is North)
    pub wind_direction: f64,
}

/// One reading for a location, as fetched from the provider
///
/// `id` stays `None` until the observation has been saved; saving yields a
/// new value carrying the id rather than modifying the original.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<ObservationId>,
    pub city: String,
    pub state: String,
    pub country: String,
    pub location: Location,
    pub pollution: Pollution,
    pub weather: Weather,
    /// Time the observation was mapped from the provider response
    pub created_at: DateTime<Utc>,
}

impl Observation {
    /// Return this observation carrying the given store identifier
    #[must_use]
    pub fn with_id(self, id: ObservationId) -> Self {
        Self {
            id: Some(id),
            ..self
        }
    }

    /// Whether the observation has been persisted
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}

/// Projection returned by the most-polluted query
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MostPolluted {
    /// Pollution measurement timestamp of the winning observation
    pub datetime: DateTime<Utc>,
    pub aqius: u32,
    pub city: String,
}

impl From<&Observation> for MostPolluted {
    fn from(observation: &Observation) -> Self {
        Self {
            datetime: observation.pollution.timestamp,
            aqius: observation.pollution.aqius,
            city: observation.city.clone(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::observation;
    use super::*;

    #[test]
    fn test_with_id_leaves_other_fields_untouched() {
        let original = observation("Paris", 42, Utc::now());
        assert!(!original.is_persisted());

        let saved = original.clone().with_id(ObservationId(7));
        assert_eq!(saved.id, Some(ObservationId(7)));
        assert_eq!(Observation { id: None, ..saved }, original);
    }

    #[test]
    fn test_most_polluted_projection() {
        let obs = observation("Paris", 99, Utc::now());
        let projection = MostPolluted::from(&obs);
        assert_eq!(projection.aqius, 99);
        assert_eq!(projection.city, "Paris");
        assert_eq!(projection.datetime, obs.pollution.timestamp);
    }

    #[test]
    fn test_serialized_field_names() {
        let json = serde_json::to_value(observation("Paris", 42, Utc::now())).unwrap();
        assert!(json.get("id").is_none());
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["weather"]["windSpeed"], 3.1);
        assert_eq!(json["weather"]["windDirection"], 270.0);
        assert_eq!(json["pollution"]["aqius"], 42);
    }
}
