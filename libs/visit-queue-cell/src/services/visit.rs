use std::sync::Arc;

use chrono::Utc;
use reqwest::Method;
use tracing::{debug, info, warn};

use shared_database::{RestClient, REST_PREFIX};
use shared_models::Notification;

use crate::datetime::parse_canonical_strict;
use crate::error::VisitQueueError;
use crate::models::{RemoteVisit, ResultsPage, StartVisitForm, Visit};
use crate::services::cache::{ActiveEntriesCache, ACTIVE_QUEUE_ENTRIES_KEY};
use crate::services::lifecycle::VisitLifecycle;

/// Result of a committed start or end of a visit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitChange {
    pub visit: Visit,
    pub refresh_error: Option<VisitQueueError>,
}

impl VisitChange {
    pub fn notifications(&self, title: &str, description: &str) -> Vec<Notification> {
        let mut notifications = vec![Notification::success(title, description)];
        if let Some(err) = &self.refresh_error {
            notifications.push(err.to_notification());
        }
        notifications
    }
}

/// Remote side of the visit lifecycle. Every call is gated by [`VisitLifecycle`]
/// first, so a refused action never reaches the network.
pub struct VisitService {
    client: Arc<RestClient>,
    cache: Arc<ActiveEntriesCache>,
}

impl VisitService {
    pub fn new(client: Arc<RestClient>, cache: Arc<ActiveEntriesCache>) -> Self {
        Self { client, cache }
    }

    pub async fn fetch_active_visit(
        &self,
        patient_uuid: &str,
        auth_token: &str,
    ) -> Result<Option<Visit>, VisitQueueError> {
        let path = format!(
            "{}/visit?patient={}&includeInactive=false&v=full",
            REST_PREFIX,
            urlencoding::encode(patient_uuid)
        );

        let page: ResultsPage<RemoteVisit> = self
            .client
            .get(&path, Some(auth_token))
            .await
            .map_err(|e| VisitQueueError::RemoteError(e.to_string()))?;

        let visits = page
            .results
            .into_iter()
            .map(Visit::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let active = visits.into_iter().find(Visit::is_active);
        debug!(
            "Patient {} has {}",
            patient_uuid,
            if active.is_some() { "an active visit" } else { "no active visit" }
        );
        Ok(active)
    }

    pub async fn load_lifecycle(
        &self,
        patient_uuid: &str,
        auth_token: &str,
    ) -> Result<VisitLifecycle, VisitQueueError> {
        let active = self.fetch_active_visit(patient_uuid, auth_token).await?;
        Ok(VisitLifecycle::new(patient_uuid, active))
    }

    pub async fn start_visit(
        &self,
        lifecycle: &mut VisitLifecycle,
        form: &StartVisitForm,
        auth_token: &str,
    ) -> Result<VisitChange, VisitQueueError> {
        let payload = lifecycle.prepare_start(form, Utc::now())?;
        let body = serde_json::to_value(&payload)
            .map_err(|e| VisitQueueError::RemoteError(e.to_string()))?;

        let path = format!("{}/visit", REST_PREFIX);
        let response = self
            .client
            .send(Method::POST, &path, Some(auth_token), Some(body))
            .await
            .map_err(|e| VisitQueueError::RemoteError(e.to_string()))?;

        if !response.status.is_success() {
            warn!("Start visit rejected ({}) for patient {}", response.status, payload.patient);
            return Err(VisitQueueError::RemoteError(response.error_message()));
        }

        let remote: RemoteVisit = serde_json::from_value(response.body)
            .map_err(|e| VisitQueueError::RemoteError(format!("Unexpected visit payload: {}", e)))?;
        let visit = Visit::try_from(remote)?;

        lifecycle.record_started(visit.clone())?;
        let refresh_error = self.refresh(auth_token).await;

        Ok(VisitChange { visit, refresh_error })
    }

    pub async fn end_visit(
        &self,
        lifecycle: &mut VisitLifecycle,
        auth_token: &str,
    ) -> Result<VisitChange, VisitQueueError> {
        let payload = lifecycle.prepare_end(Utc::now())?;
        let body = serde_json::to_value(&payload)
            .map_err(|e| VisitQueueError::RemoteError(e.to_string()))?;

        let path = format!("{}/visit/{}", REST_PREFIX, urlencoding::encode(&payload.visit_uuid));
        let response = self
            .client
            .send(Method::POST, &path, Some(auth_token), Some(body))
            .await
            .map_err(|e| VisitQueueError::RemoteError(e.to_string()))?;

        if !response.status.is_success() {
            warn!("End visit rejected ({}) for visit {}", response.status, payload.visit_uuid);
            return Err(VisitQueueError::RemoteError(response.error_message()));
        }

        let ended_at = parse_canonical_strict(&payload.stop_datetime)?;
        let visit = lifecycle.record_ended(ended_at)?.clone();
        info!("Visit {} closed at {}", visit.uuid, payload.stop_datetime);

        let refresh_error = self.refresh(auth_token).await;
        Ok(VisitChange { visit, refresh_error })
    }

    async fn refresh(&self, auth_token: &str) -> Option<VisitQueueError> {
        self.cache
            .invalidate(ACTIVE_QUEUE_ENTRIES_KEY, auth_token)
            .await
            .err()
    }
}
