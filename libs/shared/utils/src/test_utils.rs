use std::sync::Arc;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;

pub const TEST_DEFAULT_STATUS: &str = "S-DEFAULT";
pub const TEST_DEFAULT_PRIORITY: &str = "P-DEFAULT";
pub const TEST_STATUS_SET: &str = "status-concept-set";
pub const TEST_PRIORITY_SET: &str = "priority-concept-set";

pub struct TestConfig {
    pub emr_base_url: String,
    pub default_status: String,
    pub default_priority: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            emr_base_url: "http://localhost:8080/openmrs".to_string(),
            default_status: TEST_DEFAULT_STATUS.to_string(),
            default_priority: TEST_DEFAULT_PRIORITY.to_string(),
        }
    }
}

impl TestConfig {
    /// Points the config at a mock server, typically `MockServer::uri()`.
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            emr_base_url: base_url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            emr_base_url: self.emr_base_url.clone(),
            default_status_concept_uuid: self.default_status.clone(),
            default_priority_concept_uuid: self.default_priority.clone(),
            status_concept_set_uuid: TEST_STATUS_SET.to_string(),
            priority_concept_set_uuid: TEST_PRIORITY_SET.to_string(),
            login_location_tag: "Login Location".to_string(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub fn test_token() -> String {
    format!("test-session-{}", Uuid::new_v4().simple())
}

/// Payloads shaped like the clinical system's REST resources.
pub struct MockEmrResponses;

impl MockEmrResponses {
    pub fn concept_set(members: &[(&str, &str)]) -> Value {
        let members: Vec<Value> = members
            .iter()
            .map(|(uuid, display)| json!({
                "uuid": uuid,
                "display": display,
                "name": { "display": display }
            }))
            .collect();

        json!({
            "uuid": Uuid::new_v4(),
            "display": "Concept set",
            "setMembers": members
        })
    }

    pub fn results(items: &[(&str, &str)]) -> Value {
        let results: Vec<Value> = items
            .iter()
            .map(|(uuid, display)| json!({ "uuid": uuid, "display": display }))
            .collect();

        json!({ "results": results })
    }

    pub fn visit(
        visit_uuid: &str,
        patient_uuid: &str,
        started_at: DateTime<Utc>,
        stopped_at: Option<DateTime<Utc>>,
    ) -> Value {
        let format = "%Y-%m-%dT%H:%M:%S%.3f%z";
        json!({
            "uuid": visit_uuid,
            "patient": { "uuid": patient_uuid },
            "visitType": { "uuid": "facility-visit", "display": "Facility Visit" },
            "startDatetime": started_at.format(format).to_string(),
            "stopDatetime": stopped_at.map(|t| t.format(format).to_string()),
        })
    }

    pub fn visit_queue_entry(
        queue_entry_uuid: &str,
        visit_uuid: &str,
        patient_uuid: &str,
        queue_uuid: &str,
        status_uuid: &str,
        priority_uuid: &str,
    ) -> Value {
        json!({
            "uuid": Uuid::new_v4(),
            "visit": { "uuid": visit_uuid },
            "queueEntry": {
                "uuid": queue_entry_uuid,
                "status": { "uuid": status_uuid, "display": "Waiting" },
                "priority": { "uuid": priority_uuid, "display": "Not Urgent" },
                "queue": { "uuid": queue_uuid, "display": "Triage" },
                "patient": {
                    "uuid": patient_uuid,
                    "person": { "display": "Jane Doe", "age": 34, "gender": "F" }
                }
            }
        })
    }

    pub fn error_response(message: &str) -> Value {
        json!({
            "error": {
                "message": message,
                "code": "webservices.rest"
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::with_base_url("http://127.0.0.1:9999");
        let app_config = config.to_app_config();

        assert_eq!(app_config.emr_base_url, "http://127.0.0.1:9999");
        assert_eq!(app_config.default_status_concept_uuid, TEST_DEFAULT_STATUS);
        assert!(app_config.is_configured());
        assert!(app_config.has_concept_sets());
    }

    #[test]
    fn test_concept_set_shape() {
        let set = MockEmrResponses::concept_set(&[("s-1", "Waiting"), ("s-2", "In Service")]);
        assert_eq!(set["setMembers"].as_array().map(Vec::len), Some(2));
        assert_eq!(set["setMembers"][1]["name"]["display"], "In Service");
    }
}
