//! Read operations exposed to the HTTP boundary and the CLI

use std::sync::Arc;
use tracing::instrument;

use crate::models::{Location, MostPolluted, Observation};
use crate::provider::ObservationProvider;
use crate::repository::ObservationRepository;
use crate::Result;

/// On-demand queries. Errors propagate to the caller, unlike the scheduled
/// pipeline which contains them.
#[derive(Clone)]
pub struct QueryService {
    provider: Arc<dyn ObservationProvider>,
    repository: Arc<dyn ObservationRepository>,
}

impl QueryService {
    pub fn new(
        provider: Arc<dyn ObservationProvider>,
        repository: Arc<dyn ObservationRepository>,
    ) -> Self {
        Self {
            provider,
            repository,
        }
    }

    /// Most polluted recorded moment for `city`; `None` when there is no data
    #[instrument(skip(self))]
    pub async fn most_polluted(&self, city: &str) -> Result<Option<MostPolluted>> {
        let observation = self.repository.find_most_polluted(city).await?;
        Ok(observation.as_ref().map(MostPolluted::from))
    }

    /// Current reading nearest to the given coordinates, not persisted.
    ///
    /// Coordinates are validated before the provider is contacted.
    #[instrument(skip(self))]
    pub async fn nearest_observation(&self, latitude: f64, longitude: f64) -> Result<Observation> {
        let location = Location::new(latitude, longitude)?;
        self.provider.fetch_observation(&location).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::doubles::{RecordingRepository, StubProvider};
    use crate::AirQualityError;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_most_polluted_absent_is_not_error() {
        let service = QueryService::new(
            Arc::new(StubProvider::returning(1)),
            Arc::new(RecordingRepository::default()),
        );
        assert_eq!(service.most_polluted("Paris").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_most_polluted_projects_fields() {
        let provider = Arc::new(StubProvider::returning(99));
        let repository = Arc::new(RecordingRepository::default());
        let fetched = provider
            .fetch_observation(&Location::new(0.0, 0.0).unwrap())
            .await
            .unwrap();
        repository.save(&fetched).await.unwrap();

        let service = QueryService::new(provider, repository);
        let result = service.most_polluted("Paris").await.unwrap().unwrap();
        assert_eq!(
            result,
            MostPolluted {
                datetime: fetched.pollution.timestamp,
                aqius: 99,
                city: "Paris".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_most_polluted_propagates_store_failure() {
        let service = QueryService::new(
            Arc::new(StubProvider::returning(1)),
            Arc::new(RecordingRepository::failing()),
        );
        let result = service.most_polluted("Paris").await;
        assert!(matches!(result, Err(AirQualityError::Persistence { .. })));
    }

    #[tokio::test]
    async fn test_invalid_coordinates_rejected_before_fetch() {
        let provider = Arc::new(StubProvider::returning(1));
        let service = QueryService::new(provider.clone(), Arc::new(RecordingRepository::default()));

        let result = service.nearest_observation(95.0, 0.0).await;
        assert!(matches!(result, Err(AirQualityError::Validation { .. })));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_nearest_observation_propagates_provider_error() {
        let service = QueryService::new(
            Arc::new(StubProvider::failing()),
            Arc::new(RecordingRepository::default()),
        );
        let result = service.nearest_observation(48.85, 2.35).await;
        assert!(matches!(result, Err(AirQualityError::Provider { .. })));
    }
}
