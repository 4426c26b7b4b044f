use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use shared_config::AppConfig;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Constraint violation (PostgREST reports unique-index violations as
    /// HTTP 409). Callers decide whether this means a lost booking race.
    #[error("Constraint violation: {0}")]
    Conflict(String),

    #[error("Store error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode store response: {0}")]
    Decode(String),
}

pub struct PostgrestClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl PostgrestClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.postgrest_url.clone(),
            api_key: config.postgrest_api_key.clone(),
        }
    }

    fn headers(&self, auth_token: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Ok(value) = HeaderValue::from_str(&self.api_key) {
            headers.insert("apikey", value);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", token)) {
                headers.insert(AUTHORIZATION, value);
            }
        }

        headers
    }

    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<T, StoreError>
    where
        T: DeserializeOwned,
    {
        self.request_with_headers(method, path, auth_token, body, None)
            .await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T, StoreError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Store request: {} {}", method, url);

        let mut headers = self.headers(auth_token);
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url).headers(headers);
        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;
        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Store error ({}): {}", status, error_text);
            return Err(Self::map_error(status, error_text));
        }

        let data = response
            .json::<T>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(data)
    }

    /// Same as `request`, but asks PostgREST for an exact row count and
    /// returns it alongside the page of results (parsed from Content-Range).
    pub async fn request_with_count<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
    ) -> Result<(T, Option<i64>), StoreError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Store request (counted): {} {}", method, url);

        let mut headers = self.headers(auth_token);
        headers.insert("Prefer", HeaderValue::from_static("count=exact"));

        let response = self
            .client
            .request(method, &url)
            .headers(headers)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Store error ({}): {}", status, error_text);
            return Err(Self::map_error(status, error_text));
        }

        // Content-Range looks like "0-24/117"; the total follows the slash.
        let total = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.rsplit('/').next())
            .and_then(|v| v.parse::<i64>().ok());

        let data = response
            .json::<T>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok((data, total))
    }

    fn map_error(status: StatusCode, body: String) -> StoreError {
        match status.as_u16() {
            401 | 403 => StoreError::Auth(body),
            404 => StoreError::NotFound(body),
            409 => StoreError::Conflict(body),
            code => StoreError::Api { status: code, body },
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
