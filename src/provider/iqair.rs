//! IQAir (AirVisual) API client
//!
//! Calls `GET {base_url}/nearest_city?lat=..&lon=..&key=..` and maps the
//! response into the domain model. The provider reports failures in the body
//! (`{"status":"fail","data":{"message":..}}`), usually with a 4xx status, so
//! the body is inspected before the HTTP status.

use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

use super::ObservationProvider;
use crate::config::{ProviderConfig, RuntimeEnvironment};
use crate::models::{Location, Observation, Pollution, Weather};
use crate::{AirQualityError, Result};

const SUCCESS_STATUS: &str = "success";

/// HTTP client for the IQAir nearest-city endpoint
#[derive(Debug, Clone)]
pub struct IqAirClient {
    client: Client,
    endpoint: String,
    api_key: String,
    /// Suppresses failure logging, used when running under tests
    quiet: bool,
}

impl IqAirClient {
    /// Create a new client from provider settings.
    ///
    /// A missing API key is not an error here; the request is sent with an
    /// empty key and the provider's rejection surfaces from
    /// [`fetch_observation`](ObservationProvider::fetch_observation).
    pub fn new(config: &ProviderConfig, environment: RuntimeEnvironment) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .user_agent(concat!("airquality/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AirQualityError::config(format!("Failed to create HTTP client: {e}")))?;

        let api_key = config.api_key.clone().unwrap_or_default();
        if api_key.is_empty() {
            warn!("No IQAir API key configured, provider requests will be rejected");
        }

        Ok(Self {
            client,
            endpoint: format!("{}/nearest_city", config.base_url.trim_end_matches('/')),
            api_key,
            quiet: environment == RuntimeEnvironment::Test,
        })
    }

    fn request_url(&self, location: &Location) -> Result<Url> {
        Url::parse_with_params(
            &self.endpoint,
            &[
                ("lat", location.latitude().to_string()),
                ("lon", location.longitude().to_string()),
                ("key", self.api_key.clone()),
            ],
        )
        .map_err(|e| AirQualityError::provider(format!("invalid provider URL: {e}")))
    }

    async fn request(&self, location: &Location) -> Result<Observation> {
        let url = self.request_url(location)?;
        let start_time = Instant::now();

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        debug!(
            "Provider responded {} in {:.3}s",
            status,
            start_time.elapsed().as_secs_f64()
        );

        let envelope: api::Envelope = serde_json::from_str(&body).map_err(|e| {
            if status.is_success() {
                AirQualityError::provider(format!("malformed provider response: {e}"))
            } else {
                AirQualityError::provider(format!("provider returned HTTP {status}"))
            }
        })?;

        if envelope.status != SUCCESS_STATUS {
            let detail = envelope
                .data
                .and_then(|data| serde_json::from_value::<api::Failure>(data).ok())
                .and_then(|failure| failure.message)
                .map(|message| format!(" ({message})"))
                .unwrap_or_default();
            return Err(AirQualityError::provider(format!(
                "Failed to get air quality data: status '{}'{detail}",
                envelope.status
            )));
        }

        let data = envelope
            .data
            .ok_or_else(|| AirQualityError::provider("provider response has no data"))?;
        let city: api::NearestCity = serde_json::from_value(data)
            .map_err(|e| AirQualityError::provider(format!("malformed provider data: {e}")))?;

        Ok(city.into_observation(*location))
    }
}

#[async_trait]
impl ObservationProvider for IqAirClient {
    #[instrument(name = "fetch_observation", skip_all, fields(location = %location.format_coordinates()))]
    async fn fetch_observation(&self, location: &Location) -> Result<Observation> {
        match self.request(location).await {
            Ok(observation) => {
                info!(
                    city = %observation.city,
                    aqius = observation.pollution.aqius,
                    "Fetched observation"
                );
                Ok(observation)
            }
            Err(e) => {
                if !self.quiet {
                    error!("Failed to fetch air quality: {}", e);
                }
                Err(e)
            }
        }
    }
}

/// IQAir response structures
mod api {
    use super::{Location, Observation, Pollution, Weather};
    use chrono::{DateTime, Utc};
    use serde::Deserialize;
    use serde_json::Value;

    #[derive(Debug, Deserialize)]
    pub struct Envelope {
        pub status: String,
        #[serde(default)]
        pub data: Option<Value>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Failure {
        pub message: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct NearestCity {
        pub city: String,
        pub state: String,
        pub country: String,
        pub current: Current,
    }

    #[derive(Debug, Deserialize)]
    pub struct Current {
        pub pollution: PollutionReading,
        pub weather: WeatherReading,
    }

    #[derive(Debug, Deserialize)]
    pub struct PollutionReading {
        pub ts: DateTime<Utc>,
        pub aqius: u32,
        pub mainus: String,
        pub aqicn: u32,
        pub maincn: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct WeatherReading {
        pub ts: DateTime<Utc>,
        /// temperature, Celsius
        pub tp: f64,
        /// pressure, hPa
        pub pr: f64,
        /// humidity, %
        pub hu: f64,
        /// wind speed, m/s
        pub ws: f64,
        /// wind direction, degrees
        pub wd: f64,
    }

    impl NearestCity {
        pub fn into_observation(self, location: Location) -> Observation {
            let Current { pollution, weather } = self.current;
            Observation {
                id: None,
                city: self.city,
                state: self.state,
                country: self.country,
                location,
                pollution: Pollution {
                    timestamp: pollution.ts,
                    aqius: pollution.aqius,
                    mainus: pollution.mainus,
                    aqicn: pollution.aqicn,
                    maincn: pollution.maincn,
                },
                weather: Weather {
                    timestamp: weather.ts,
                    temperature: weather.tp,
                    pressure: weather.pr,
                    humidity: weather.hu,
                    wind_speed: weather.ws,
                    wind_direction: weather.wd,
                },
                created_at: Utc::now(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn paris() -> Location {
        Location::new(48.856613, 2.352222).unwrap()
    }

    fn client_for(server: &MockServer, api_key: Option<&str>) -> IqAirClient {
        let config = ProviderConfig {
            api_key: api_key.map(str::to_string),
            base_url: server.uri(),
            timeout_seconds: 2,
        };
        IqAirClient::new(&config, RuntimeEnvironment::Test).unwrap()
    }

    fn success_body() -> serde_json::Value {
        json!({
            "status": "success",
            "data": {
                "city": "Paris",
                "state": "Ile-de-France",
                "country": "France",
                "location": { "type": "Point", "coordinates": [2.351666, 48.859425] },
                "current": {
                    "pollution": {
                        "ts": "2023-01-01T12:00:00.000Z",
                        "aqius": 42,
                        "mainus": "p2",
                        "aqicn": 14,
                        "maincn": "p2"
                    },
                    "weather": {
                        "ts": "2023-01-01T13:00:00.000Z",
                        "tp": 15,
                        "pr": 1012,
                        "hu": 65,
                        "ws": 3.1,
                        "wd": 270,
                        "ic": "04d"
                    }
                }
            }
        })
    }

    #[tokio::test]
    async fn test_maps_payload_fields_exactly() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/nearest_city"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
            .mount(&server)
            .await;

        let before = Utc::now();
        let observation = client_for(&server, Some("k"))
            .fetch_observation(&paris())
            .await
            .unwrap();
        let after = Utc::now();

        assert_eq!(observation.id, None);
        assert_eq!(observation.city, "Paris");
        assert_eq!(observation.state, "Ile-de-France");
        assert_eq!(observation.country, "France");
        assert_eq!(observation.location, paris());

        let pollution_ts = Utc.with_ymd_and_hms(2023, 1, 1, 12, 0, 0).unwrap();
        assert_eq!(
            observation.pollution,
            Pollution {
                timestamp: pollution_ts,
                aqius: 42,
                mainus: "p2".to_string(),
                aqicn: 14,
                maincn: "p2".to_string(),
            }
        );

        let weather_ts = Utc.with_ymd_and_hms(2023, 1, 1, 13, 0, 0).unwrap();
        assert_eq!(
            observation.weather,
            Weather {
                timestamp: weather_ts,
                temperature: 15.0,
                pressure: 1012.0,
                humidity: 65.0,
                wind_speed: 3.1,
                wind_direction: 270.0,
            }
        );

        // stamped at mapping time, not with the upstream timestamp
        assert!(observation.created_at >= before && observation.created_at <= after);
    }

    #[tokio::test]
    async fn test_sends_coordinates_and_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/nearest_city"))
            .and(query_param("lat", "48.856613"))
            .and(query_param("lon", "2.352222"))
            .and(query_param("key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server, Some("secret"))
            .fetch_observation(&paris())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_missing_key_sends_empty_credential() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/nearest_city"))
            .and(query_param("key", ""))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "status": "fail",
                "data": { "message": "incorrect_api_key" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server, None)
            .fetch_observation(&paris())
            .await
            .unwrap_err();
        assert!(matches!(err, AirQualityError::Provider { .. }));
        assert!(err.to_string().contains("incorrect_api_key"));
    }

    #[tokio::test]
    async fn test_fail_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "fail" })))
            .mount(&server)
            .await;

        let err = client_for(&server, Some("k"))
            .fetch_observation(&paris())
            .await
            .unwrap_err();
        assert!(matches!(err, AirQualityError::Provider { .. }));
        assert!(err.to_string().contains("fail"));
    }

    #[tokio::test]
    async fn test_missing_field_fails_closed() {
        let server = MockServer::start().await;
        let mut body = success_body();
        body["data"]["current"]["pollution"]
            .as_object_mut()
            .unwrap()
            .remove("aqius");
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let err = client_for(&server, Some("k"))
            .fetch_observation(&paris())
            .await
            .unwrap_err();
        assert!(matches!(err, AirQualityError::Provider { .. }));
        assert!(err.to_string().contains("malformed"));
    }

    #[tokio::test]
    async fn test_non_json_body_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("<html>down</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server, Some("k"))
            .fetch_observation(&paris())
            .await
            .unwrap_err();
        assert!(matches!(err, AirQualityError::Provider { .. }));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_provider_error() {
        let config = ProviderConfig {
            api_key: None,
            // nothing listens on the discard port
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_seconds: 2,
        };
        let client = IqAirClient::new(&config, RuntimeEnvironment::Test).unwrap();

        let err = client.fetch_observation(&paris()).await.unwrap_err();
        assert!(matches!(err, AirQualityError::Provider { .. }));
    }

    #[tokio::test]
    async fn test_hanging_provider_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(success_body())
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let config = ProviderConfig {
            api_key: None,
            base_url: server.uri(),
            timeout_seconds: 1,
        };
        let client = IqAirClient::new(&config, RuntimeEnvironment::Test).unwrap();

        let err = client.fetch_observation(&paris()).await.unwrap_err();
        assert!(matches!(err, AirQualityError::Provider { .. }));
    }
}
