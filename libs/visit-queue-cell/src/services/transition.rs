use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::{AbortHandle, AbortRegistration, Abortable};
use reqwest::Method;
use tracing::{debug, info, instrument, warn};

use shared_config::AppConfig;
use shared_database::{RestClient, REST_PREFIX};
use shared_models::Notification;

use crate::datetime::canonical_timestamp;
use crate::error::VisitQueueError;
use crate::models::{QueueEntry, QueueEntryEdits, TransitionRequest};
use crate::services::cache::{ActiveEntriesCache, ACTIVE_QUEUE_ENTRIES_KEY};
use crate::services::lookup::LookupProvider;

/// Default status and priority substituted for fields the clinician left blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConceptDefaults {
    pub status: String,
    pub priority: String,
}

impl ConceptDefaults {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            status: config.default_status_concept_uuid.clone(),
            priority: config.default_priority_concept_uuid.clone(),
        }
    }

    pub fn from_provider(provider: &dyn LookupProvider) -> Self {
        Self {
            status: provider.default_status().to_string(),
            priority: provider.default_priority().to_string(),
        }
    }
}

fn first_filled<'a>(candidates: &[Option<&'a str>]) -> Option<&'a str> {
    candidates
        .iter()
        .flatten()
        .copied()
        .find(|value| !value.trim().is_empty())
}

/// Builds the close-old/open-new request for `current`.
///
/// Status and priority resolve independently: the edit, else the entry's
/// current value, else the configured default. The target queue resolves to
/// the edit, else the queue the entry occupies now.
pub fn build_transition_request(
    current: &QueueEntry,
    edits: &QueueEntryEdits,
    defaults: &ConceptDefaults,
    end_date: String,
) -> TransitionRequest {
    let status = first_filled(&[edits.status.as_deref(), Some(current.status_uuid.as_str())])
        .unwrap_or(defaults.status.as_str());
    let priority = first_filled(&[edits.priority.as_deref(), Some(current.priority_uuid.as_str())])
        .unwrap_or(defaults.priority.as_str());
    let new_queue = first_filled(&[edits.target_queue_uuid.as_deref()])
        .unwrap_or(current.queue_uuid.as_str());

    TransitionRequest {
        visit_uuid: current.visit_uuid.clone(),
        previous_queue_uuid: current.queue_uuid.clone(),
        new_queue_uuid: new_queue.to_string(),
        queue_entry_uuid: current.queue_entry_uuid.clone(),
        patient_uuid: current.patient_uuid.clone(),
        priority: priority.to_string(),
        status: status.to_string(),
        end_date,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The remote system closed the old entry and opened a new one.
    Committed {
        request: TransitionRequest,
        refresh_error: Option<VisitQueueError>,
    },
    /// The caller aborted before the remote call resolved.
    Cancelled,
}

impl TransitionOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, TransitionOutcome::Committed { .. })
    }

    pub fn notifications(&self) -> Vec<Notification> {
        match self {
            TransitionOutcome::Committed { refresh_error, .. } => {
                let mut notifications = vec![Notification::success(
                    "Update entry",
                    "Queue Entry Updated Successfully",
                )];
                if let Some(err) = refresh_error {
                    notifications.push(err.to_notification());
                }
                notifications
            }
            TransitionOutcome::Cancelled => Vec::new(),
        }
    }
}

pub const TRANSITION_PATH: &str = "/visit-queue-entry/transition";

/// Submits queue entry transitions and invalidates the active-entries list on success.
///
/// The engine neither queues nor coalesces submits; callers keep one submit in
/// flight per entry.
pub struct QueueTransitionEngine {
    client: Arc<RestClient>,
    defaults: ConceptDefaults,
    cache: Arc<ActiveEntriesCache>,
}

impl QueueTransitionEngine {
    pub fn new(client: Arc<RestClient>, defaults: ConceptDefaults, cache: Arc<ActiveEntriesCache>) -> Self {
        Self { client, defaults, cache }
    }

    pub fn defaults(&self) -> &ConceptDefaults {
        &self.defaults
    }

    /// Resolves defaults and timestamps the transition. Runs synchronously, so
    /// the request is fixed before anything is awaited.
    pub fn prepare(
        &self,
        current: &QueueEntry,
        edits: &QueueEntryEdits,
        now: DateTime<Utc>,
    ) -> Result<TransitionRequest, VisitQueueError> {
        let end_date = canonical_timestamp(&now)?;
        let request = build_transition_request(current, edits, &self.defaults, end_date);

        if request.status.is_empty() || request.priority.is_empty() {
            return Err(VisitQueueError::ValidationError(
                "No status or priority selected and no default configured".to_string(),
            ));
        }

        debug!(
            "Prepared transition of entry {} from queue {} to {}",
            request.queue_entry_uuid, request.previous_queue_uuid, request.new_queue_uuid
        );
        Ok(request)
    }

    /// Submits without an external cancellation signal.
    pub async fn submit(
        &self,
        current: &QueueEntry,
        edits: &QueueEntryEdits,
        auth_token: &str,
    ) -> Result<TransitionOutcome, VisitQueueError> {
        let (_handle, registration) = AbortHandle::new_pair();
        self.submit_transition(current, edits, auth_token, registration).await
    }

    /// Closes the current entry and opens the edited one in a single remote call.
    ///
    /// Aborting through the [`AbortHandle`] paired with `abort` before the call
    /// resolves yields [`TransitionOutcome::Cancelled`]: no invalidation, no error.
    #[instrument(skip_all, fields(queue_entry = %current.queue_entry_uuid))]
    pub async fn submit_transition(
        &self,
        current: &QueueEntry,
        edits: &QueueEntryEdits,
        auth_token: &str,
        abort: AbortRegistration,
    ) -> Result<TransitionOutcome, VisitQueueError> {
        let request = self.prepare(current, edits, Utc::now())?;
        let body = serde_json::to_value(&request)
            .map_err(|e| VisitQueueError::TransitionError(e.to_string()))?;

        let path = format!("{}{}", REST_PREFIX, TRANSITION_PATH);
        let call = self.client.send(Method::POST, &path, Some(auth_token), Some(body));

        let response = match Abortable::new(call, abort).await {
            Err(_aborted) => {
                info!("Transition of entry {} cancelled before completion", request.queue_entry_uuid);
                return Ok(TransitionOutcome::Cancelled);
            }
            Ok(Err(e)) => {
                warn!("Transition of entry {} failed: {}", request.queue_entry_uuid, e);
                return Err(VisitQueueError::TransitionError(e.to_string()));
            }
            Ok(Ok(response)) => response,
        };

        if !response.is_created() {
            let message = response.error_message();
            warn!(
                "Transition of entry {} rejected ({}): {}",
                request.queue_entry_uuid, response.status, message
            );
            return Err(VisitQueueError::TransitionError(message));
        }

        info!(
            "Queue entry {} moved to queue {} (status {}, priority {})",
            request.queue_entry_uuid, request.new_queue_uuid, request.status, request.priority
        );

        let refresh_error = self
            .cache
            .invalidate(ACTIVE_QUEUE_ENTRIES_KEY, auth_token)
            .await
            .err();

        Ok(TransitionOutcome::Committed { request, refresh_error })
    }
}
