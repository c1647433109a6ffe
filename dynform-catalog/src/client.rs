//! HTTP client for the plugin catalog API.

use async_trait::async_trait;
use dynform_fields::{PluginDescriptor, ValidationResult};
use reqwest::Client;
use tracing::debug;

use crate::config::CatalogConfig;
use crate::error::{CatalogError, Result};
use crate::types::*;

const PLUGINS_PATH: &str = "/dynamic/plugins";

/// Operations the page controller needs from the catalog service.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// `GET /dynamic/plugins?{query}`
    async fn list_plugins(&self, query: &ListQuery) -> Result<PluginPage>;

    /// `GET /dynamic/plugins/{type}`
    async fn get_plugin(&self, type_: &str) -> Result<PluginDescriptor>;

    /// `POST /dynamic/plugins/validate`
    async fn validate_value(&self, request: &ValidateRequest) -> Result<ValidationResult>;

    /// `POST /dynamic/plugins/process`
    async fn process_value(&self, request: &ProcessRequest) -> Result<ProcessResponse>;

    /// `POST /dynamic/plugins/register`
    async fn register_plugin(&self, plugin: &PluginRegisterDto) -> Result<()>;

    /// `DELETE /dynamic/plugins/{type}`
    async fn unregister_plugin(&self, type_: &str) -> Result<()>;
}

/// Extract a human-readable message from a JSON error body.
///
/// Tries `message`, then `msg`, then `error`, then falls back to the raw body.
fn extract_error_description(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "msg", "error"] {
            if let Some(msg) = json.get(key).and_then(|v| v.as_str()) {
                return msg.to_string();
            }
        }
    }
    body.to_string()
}

/// reqwest-backed catalog client.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: Client,
    base_url: String,
}

impl CatalogClient {
    /// Client with reqwest defaults against `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Client with the configured timeout and user agent.
    pub fn from_config(config: &CatalogConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(&config.user_agent)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn plugins_url(&self) -> String {
        format!("{}{}", self.base_url, PLUGINS_PATH)
    }

    fn plugin_url(&self, type_: &str) -> String {
        format!("{}/{}", self.plugins_url(), urlencoding::encode(type_))
    }

    /// Map an HTTP response to a `CatalogError` based on status code.
    async fn check_response(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let status_code = status.as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = extract_error_description(&body);

        match status_code {
            404 => Err(CatalogError::NotFound(message)),
            409 => Err(CatalogError::Conflict(message)),
            _ => Err(CatalogError::Api {
                status: status_code,
                body: message,
            }),
        }
    }

    /// Decode the body as JSON, reporting shape mismatches as `CatalogError::Json`.
    async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl CatalogApi for CatalogClient {
    async fn list_plugins(&self, query: &ListQuery) -> Result<PluginPage> {
        let url = format!("{}?{}", self.plugins_url(), query.to_query_string());
        debug!(%url, "listing plugins");
        let response = self.client.get(&url).send().await?;
        let response = self.check_response(response).await?;
        Self::decode(response).await
    }

    async fn get_plugin(&self, type_: &str) -> Result<PluginDescriptor> {
        let url = self.plugin_url(type_);
        let response = self.client.get(&url).send().await?;
        let response = self.check_response(response).await?;
        Self::decode(response).await
    }

    async fn validate_value(&self, request: &ValidateRequest) -> Result<ValidationResult> {
        let url = format!("{}/validate", self.plugins_url());
        let response = self.client.post(&url).json(request).send().await?;
        let response = self.check_response(response).await?;
        Self::decode(response).await
    }

    async fn process_value(&self, request: &ProcessRequest) -> Result<ProcessResponse> {
        let url = format!("{}/process", self.plugins_url());
        let response = self.client.post(&url).json(request).send().await?;
        let response = self.check_response(response).await?;
        Self::decode(response).await
    }

    async fn register_plugin(&self, plugin: &PluginRegisterDto) -> Result<()> {
        let url = format!("{}/register", self.plugins_url());
        debug!(plugin = %plugin.type_, "registering plugin");
        let response = self.client.post(&url).json(plugin).send().await?;
        self.check_response(response).await?;
        Ok(())
    }

    async fn unregister_plugin(&self, type_: &str) -> Result<()> {
        let url = self.plugin_url(type_);
        debug!(plugin = type_, "unregistering plugin");
        let response = self.client.delete(&url).send().await?;
        self.check_response(response).await?;
        Ok(())
    }
}
