use axum::{
    Router,
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{AirQualityError, models::Observation, service::QueryService};

/// Shared state for the air quality routes
#[derive(Clone)]
pub struct ApiState {
    pub service: QueryService,
    /// City answered by `most-polluted`
    pub city: String,
}

/// Response body wrapper, `{"Result": ...}`
#[derive(Serialize)]
pub struct ApiEnvelope<T> {
    #[serde(rename = "Result")]
    pub result: T,
}

#[derive(Debug, Deserialize)]
pub struct NearestCityQuery {
    pub latitude: f64,
    pub longitude: f64,
}

/// Maps domain errors onto HTTP statuses
pub struct ApiError(AirQualityError);

impl From<AirQualityError> for ApiError {
    fn from(err: AirQualityError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AirQualityError::Validation { .. } => StatusCode::BAD_REQUEST,
            AirQualityError::Provider { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.user_message() }))).into_response()
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/air-quality/nearest-city", get(get_nearest_city))
        .route("/air-quality/nearest-observation", get(get_nearest_city))
        .route("/air-quality/most-polluted", get(get_most_polluted))
        .with_state(state)
}

async fn get_nearest_city(
    State(state): State<ApiState>,
    query: Result<Query<NearestCityQuery>, QueryRejection>,
) -> Result<Json<ApiEnvelope<Observation>>, ApiError> {
    let Query(query) =
        query.map_err(|rejection| AirQualityError::validation(rejection.body_text()))?;
    let observation = state
        .service
        .nearest_observation(query.latitude, query.longitude)
        .await?;
    Ok(Json(ApiEnvelope {
        result: observation,
    }))
}

async fn get_most_polluted(State(state): State<ApiState>) -> Result<Response, ApiError> {
    let response = match state.service.most_polluted(&state.city).await? {
        Some(most_polluted) => Json(ApiEnvelope {
            result: most_polluted,
        })
        .into_response(),
        // no data yet is an empty result, not an error
        None => Json(ApiEnvelope { result: json!({}) }).into_response(),
    };
    Ok(response)
}
