use anyhow::{Result, anyhow};
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, AUTHORIZATION},
    Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;

/// Base path of the clinical system's REST resources.
pub const REST_PREFIX: &str = "/ws/rest/v1";

/// Raw outcome of a call whose status code the caller needs to inspect.
#[derive(Debug, Clone)]
pub struct RestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl RestResponse {
    pub fn is_created(&self) -> bool {
        self.status == StatusCode::CREATED
    }

    /// Best-effort human readable message out of an error payload.
    pub fn error_message(&self) -> String {
        self.body
            .pointer("/error/message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Remote system responded with {}", self.status))
    }
}

pub struct RestClient {
    client: Client,
    base_url: String,
}

impl RestClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.emr_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| anyhow!("Invalid authorization token: {}", e))?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }

    /// Sends a request and returns status and body without judging the status.
    pub async fn send(&self, method: Method, path: &str,
                      auth_token: Option<&str>, body: Option<Value>)
                      -> Result<RestResponse> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut req = self.client.request(method, &url)
            .headers(self.get_headers(auth_token)?);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;
        let status = response.status();
        let text = response.text().await?;

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        Ok(RestResponse { status, body })
    }

    pub async fn request<T>(&self, method: Method, path: &str,
                            auth_token: Option<&str>, body: Option<Value>)
                            -> Result<T>
    where T: DeserializeOwned {
        let response = self.send(method, path, auth_token, body).await?;

        if !response.status.is_success() {
            let message = response.error_message();
            error!("API error ({}): {}", response.status, message);

            return Err(match response.status.as_u16() {
                401 | 403 => anyhow!("Authentication error: {}", message),
                404 => anyhow!("Resource not found: {}", message),
                _ => anyhow!("API error ({}): {}", response.status, message),
            });
        }

        let data = serde_json::from_value::<T>(response.body)?;
        Ok(data)
    }

    pub async fn get<T>(&self, path: &str, auth_token: Option<&str>) -> Result<T>
    where T: DeserializeOwned {
        self.request(Method::GET, path, auth_token, None).await
    }
}
