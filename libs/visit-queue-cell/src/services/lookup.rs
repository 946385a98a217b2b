use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use shared_config::AppConfig;
use shared_database::{RestClient, REST_PREFIX};

use crate::error::VisitQueueError;
use crate::models::{
    ConceptSet, Location, QueuePriority, QueueStatus, RemoteRef, ResultsPage, Service, VisitType,
};

/// Read-only access to the enumerations the change-status and start-visit forms offer.
///
/// An empty list means "no data" and is not an error. Fetch failures surface as
/// [`VisitQueueError::LookupError`] and are never retried here.
#[async_trait]
pub trait LookupProvider: Send + Sync {
    async fn list_statuses(&self, auth_token: &str) -> Result<Vec<QueueStatus>, VisitQueueError>;

    async fn list_priorities(&self, auth_token: &str) -> Result<Vec<QueuePriority>, VisitQueueError>;

    async fn list_services(
        &self,
        location_uuid: &str,
        auth_token: &str,
    ) -> Result<Vec<Service>, VisitQueueError>;

    async fn list_locations(&self, auth_token: &str) -> Result<Vec<Location>, VisitQueueError>;

    async fn list_visit_types(&self, auth_token: &str) -> Result<Vec<VisitType>, VisitQueueError>;

    fn default_status(&self) -> &str;

    fn default_priority(&self) -> &str;
}

/// Picks the location services are listed for.
///
/// Precedence: a location the clinician already chose, then the session's
/// location, then the first available one. Blank identifiers count as absent.
pub fn resolve_location(
    previously_chosen: Option<&str>,
    session_location: Option<&str>,
    available: &[Location],
) -> Option<String> {
    let present = |value: Option<&str>| value.filter(|v| !v.trim().is_empty()).map(str::to_string);

    present(previously_chosen)
        .or_else(|| present(session_location))
        .or_else(|| available.first().map(|location| location.uuid.clone()))
}

pub struct RemoteLookupService {
    client: Arc<RestClient>,
    config: Arc<AppConfig>,
}

impl RemoteLookupService {
    pub fn new(client: Arc<RestClient>, config: Arc<AppConfig>) -> Self {
        Self { client, config }
    }

    async fn concept_set_members(
        &self,
        concept_set_uuid: &str,
        auth_token: &str,
    ) -> Result<ConceptSet, VisitQueueError> {
        if concept_set_uuid.is_empty() {
            warn!("Concept set not configured, returning no members");
            return Ok(ConceptSet { set_members: Vec::new() });
        }

        let path = format!("{}/concept/{}", REST_PREFIX, urlencoding::encode(concept_set_uuid));
        self.client
            .get::<ConceptSet>(&path, Some(auth_token))
            .await
            .map_err(|e| VisitQueueError::LookupError(e.to_string()))
    }

    async fn results(&self, path: &str, auth_token: &str) -> Result<Vec<RemoteRef>, VisitQueueError> {
        let page: ResultsPage<RemoteRef> = self
            .client
            .get(path, Some(auth_token))
            .await
            .map_err(|e| VisitQueueError::LookupError(e.to_string()))?;

        Ok(page.results)
    }
}

#[async_trait]
impl LookupProvider for RemoteLookupService {
    async fn list_statuses(&self, auth_token: &str) -> Result<Vec<QueueStatus>, VisitQueueError> {
        let set = self
            .concept_set_members(&self.config.status_concept_set_uuid, auth_token)
            .await?;

        debug!("Loaded {} queue statuses", set.set_members.len());
        Ok(set.set_members.into_iter().map(QueueStatus::from).collect())
    }

    async fn list_priorities(&self, auth_token: &str) -> Result<Vec<QueuePriority>, VisitQueueError> {
        let set = self
            .concept_set_members(&self.config.priority_concept_set_uuid, auth_token)
            .await?;

        debug!("Loaded {} queue priorities", set.set_members.len());
        Ok(set.set_members.into_iter().map(QueuePriority::from).collect())
    }

    async fn list_services(
        &self,
        location_uuid: &str,
        auth_token: &str,
    ) -> Result<Vec<Service>, VisitQueueError> {
        if location_uuid.is_empty() {
            debug!("No location resolved yet, no services to list");
            return Ok(Vec::new());
        }

        let path = format!("{}/queue?location={}", REST_PREFIX, urlencoding::encode(location_uuid));
        let services = self.results(&path, auth_token).await?;

        Ok(services.into_iter().map(Service::from).collect())
    }

    async fn list_locations(&self, auth_token: &str) -> Result<Vec<Location>, VisitQueueError> {
        let tag = urlencoding::encode(&self.config.login_location_tag);
        let path = format!("{}/location?tag={}", REST_PREFIX, tag);
        let locations = self.results(&path, auth_token).await?;

        Ok(locations.into_iter().map(Location::from).collect())
    }

    async fn list_visit_types(&self, auth_token: &str) -> Result<Vec<VisitType>, VisitQueueError> {
        let path = format!("{}/visittype", REST_PREFIX);
        let visit_types = self.results(&path, auth_token).await?;

        Ok(visit_types.into_iter().map(VisitType::from).collect())
    }

    fn default_status(&self) -> &str {
        &self.config.default_status_concept_uuid
    }

    fn default_priority(&self) -> &str {
        &self.config.default_priority_concept_uuid
    }
}
