use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub emr_base_url: String,
    pub default_status_concept_uuid: String,
    pub default_priority_concept_uuid: String,
    pub status_concept_set_uuid: String,
    pub priority_concept_set_uuid: String,
    pub login_location_tag: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            emr_base_url: env::var("EMR_BASE_URL")
                .unwrap_or_else(|_| {
                    warn!("EMR_BASE_URL not set, using default");
                    "http://localhost:8080/openmrs".to_string()
                }),
            default_status_concept_uuid: env::var("DEFAULT_STATUS_CONCEPT_UUID")
                .unwrap_or_else(|_| {
                    warn!("DEFAULT_STATUS_CONCEPT_UUID not set, using empty value");
                    String::new()
                }),
            default_priority_concept_uuid: env::var("DEFAULT_PRIORITY_CONCEPT_UUID")
                .unwrap_or_else(|_| {
                    warn!("DEFAULT_PRIORITY_CONCEPT_UUID not set, using empty value");
                    String::new()
                }),
            status_concept_set_uuid: env::var("STATUS_CONCEPT_SET_UUID")
                .unwrap_or_else(|_| {
                    warn!("STATUS_CONCEPT_SET_UUID not set, using empty value");
                    String::new()
                }),
            priority_concept_set_uuid: env::var("PRIORITY_CONCEPT_SET_UUID")
                .unwrap_or_else(|_| {
                    warn!("PRIORITY_CONCEPT_SET_UUID not set, using empty value");
                    String::new()
                }),
            login_location_tag: env::var("LOGIN_LOCATION_TAG")
                .unwrap_or_else(|_| "Login Location".to_string()),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - queue defaults missing");
        }
        if !config.has_concept_sets() {
            warn!("Status or priority concept set missing - lookups will be empty");
        }

        config
    }

    /// True when the transition engine has both default concepts to fall back on.
    pub fn is_configured(&self) -> bool {
        !self.emr_base_url.is_empty()
            && !self.default_status_concept_uuid.is_empty()
            && !self.default_priority_concept_uuid.is_empty()
    }

    pub fn has_concept_sets(&self) -> bool {
        !self.status_concept_set_uuid.is_empty() && !self.priority_concept_set_uuid.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig {
            emr_base_url: "http://localhost:8080/openmrs".to_string(),
            default_status_concept_uuid: "S-DEFAULT".to_string(),
            default_priority_concept_uuid: "P-DEFAULT".to_string(),
            status_concept_set_uuid: String::new(),
            priority_concept_set_uuid: String::new(),
            login_location_tag: "Login Location".to_string(),
        }
    }

    #[test]
    fn test_configured_requires_defaults() {
        let mut config = config();
        assert!(config.is_configured());
        assert!(!config.has_concept_sets());

        config.default_priority_concept_uuid.clear();
        assert!(!config.is_configured());
    }
}
