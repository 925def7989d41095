//! Location value object for validated geographic coordinates

use serde::{Deserialize, Serialize};

use crate::{AirQualityError, Result};

const LATITUDE_RANGE: std::ops::RangeInclusive<f64> = -90.0..=90.0;
const LONGITUDE_RANGE: std::ops::RangeInclusive<f64> = -180.0..=180.0;

/// Validated latitude/longitude pair
///
/// The fields are private so the only ways to obtain a `Location` are
/// [`Location::new`] and deserialization, both of which enforce the bounds.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(try_from = "RawLocation")]
pub struct Location {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct RawLocation {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawLocation> for Location {
    type Error = AirQualityError;

    fn try_from(raw: RawLocation) -> Result<Self> {
        Self::new(raw.latitude, raw.longitude)
    }
}

impl Location {
    /// Create a new location, rejecting coordinates outside the valid ranges
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !LATITUDE_RANGE.contains(&latitude) {
            return Err(AirQualityError::validation(format!(
                "latitude {latitude} is outside [-90, 90]"
            )));
        }
        if !LONGITUDE_RANGE.contains(&longitude) {
            return Err(AirQualityError::validation(format!(
                "longitude {longitude} is outside [-180, 180]"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Latitude in decimal degrees
    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in decimal degrees
    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Format location as coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, 0.0)]
    #[case(48.856613, 2.352222)]
    #[case(90.0, 180.0)]
    #[case(-90.0, -180.0)]
    #[case(-33.8688, 151.2093)]
    fn test_valid_coordinates_are_preserved(#[case] lat: f64, #[case] lon: f64) {
        let location = Location::new(lat, lon).unwrap();
        assert_eq!(location.latitude(), lat);
        assert_eq!(location.longitude(), lon);
    }

    #[rstest]
    #[case(90.0001, 0.0)]
    #[case(-91.0, 0.0)]
    #[case(0.0, 180.5)]
    #[case(0.0, -181.0)]
    #[case(f64::NAN, 0.0)]
    #[case(0.0, f64::INFINITY)]
    fn test_out_of_range_coordinates_are_rejected(#[case] lat: f64, #[case] lon: f64) {
        let result = Location::new(lat, lon);
        assert!(matches!(result, Err(AirQualityError::Validation { .. })));
    }

    #[test]
    fn test_deserialize_validates_bounds() {
        let ok: Location = serde_json::from_str(r#"{"latitude":48.8,"longitude":2.3}"#).unwrap();
        assert_eq!(ok.latitude(), 48.8);

        let bad = serde_json::from_str::<Location>(r#"{"latitude":123.0,"longitude":2.3}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_format_coordinates() {
        let location = Location::new(48.856613, 2.352222).unwrap();
        assert_eq!(location.format_coordinates(), "48.8566, 2.3522");
    }
}
