#![allow(dead_code)]

use std::sync::Arc;

use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_config::AppConfig;
use shared_database::RestClient;
use shared_utils::test_utils::{test_token, MockEmrResponses, TestConfig};
use visit_queue_cell::handlers::VisitQueueState;
use visit_queue_cell::*;

pub const TRANSITION_URL: &str = "/ws/rest/v1/visit-queue-entry/transition";
pub const ACTIVE_ENTRIES_URL: &str = "/ws/rest/v1/visit-queue-entry";
pub const VISIT_URL: &str = "/ws/rest/v1/visit";

/// A mock clinical system plus the services wired against it.
pub struct TestHarness {
    pub server: MockServer,
    pub config: Arc<AppConfig>,
    pub client: Arc<RestClient>,
    pub cache: Arc<ActiveEntriesCache>,
    pub token: String,
}

impl TestHarness {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let config = TestConfig::with_base_url(&server.uri()).to_arc();
        let client = Arc::new(RestClient::new(&config));
        let cache = Arc::new(ActiveEntriesCache::new(client.clone()));

        Self {
            server,
            config,
            client,
            cache,
            token: test_token(),
        }
    }

    pub fn engine(&self) -> QueueTransitionEngine {
        QueueTransitionEngine::new(
            self.client.clone(),
            ConceptDefaults::from_config(&self.config),
            self.cache.clone(),
        )
    }

    pub fn visits(&self) -> VisitService {
        VisitService::new(self.client.clone(), self.cache.clone())
    }

    pub fn lookups(&self) -> RemoteLookupService {
        RemoteLookupService::new(self.client.clone(), self.config.clone())
    }

    pub fn state(&self) -> Arc<VisitQueueState> {
        Arc::new(VisitQueueState::new(self.config.clone()))
    }

    pub fn auth_header(&self) -> TypedHeader<Authorization<Bearer>> {
        TypedHeader(Authorization::bearer(&self.token).unwrap())
    }

    /// Answers the active-entries refetch with `entries`, expecting `times` calls.
    pub async fn mount_active_entries(&self, entries: Vec<Value>, times: u64) {
        Mock::given(method("GET"))
            .and(path(ACTIVE_ENTRIES_URL))
            .and(query_param("v", "full"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": entries })))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    pub async fn mount_transition_response(&self, status: u16, times: u64) {
        let template = if status == 201 {
            ResponseTemplate::new(201).set_body_json(json!({ "uuid": "new-visit-queue-entry" }))
        } else {
            ResponseTemplate::new(status)
                .set_body_json(MockEmrResponses::error_response("Could not update queue entry"))
        };

        Mock::given(method("POST"))
            .and(path(TRANSITION_URL))
            .respond_with(template)
            .expect(times)
            .mount(&self.server)
            .await;
    }

    pub async fn transition_requests(&self) -> Vec<TransitionRequest> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|request| request.url.path() == TRANSITION_URL)
            .map(|request| request.body_json::<TransitionRequest>().unwrap())
            .collect()
    }
}

pub fn queue_entry(status: &str, priority: &str, queue: &str) -> QueueEntry {
    QueueEntry {
        queue_entry_uuid: "entry-1".to_string(),
        visit_uuid: "visit-1".to_string(),
        patient_uuid: "patient-1".to_string(),
        name: "Jane Doe".to_string(),
        patient_age: Some(34),
        patient_sex: "F".to_string(),
        queue_uuid: queue.to_string(),
        status_uuid: status.to_string(),
        priority_uuid: priority.to_string(),
    }
}
