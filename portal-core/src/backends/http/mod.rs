use crate::config::DeviceConfig;
use crate::structs::{ConnectRequest, ConnectResponse, RawNetwork, StatusResponse};
use crate::traits::PortalApi;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

/// Talks to a provisioning device over its captive-portal HTTP API.
#[derive(Debug, Clone)]
pub struct HttpPortalApi {
    client: Client,
    base_url: String,
}

impl HttpPortalApi {
    pub fn new(config: &DeviceConfig) -> Result<Self> {
        // the device sits on the local link of its own access point
        let client = Client::builder()
            .no_proxy()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

// The device answers with a JSON body even on HTTP 4xx (validation errors),
// so status codes are never turned into errors here.
#[async_trait]
impl PortalApi for HttpPortalApi {
    async fn scan(&self) -> Result<Vec<RawNetwork>> {
        let url = self.endpoint("/api/scan");
        tracing::debug!(%url, "GET scan");
        let networks = self.client.get(&url).send().await?.json::<Vec<RawNetwork>>().await?;
        tracing::debug!("Scan returned {} observations", networks.len());
        Ok(networks)
    }

    async fn connect(&self, request: &ConnectRequest) -> Result<ConnectResponse> {
        let url = self.endpoint("/api/connect");
        tracing::debug!(
            %url,
            ssid = %request.ssid,
            has_password = !request.pass.is_empty(),
            enterprise = request.is_enterprise(),
            "POST connect"
        );
        let response = self.client.post(&url).json(request).send().await?;
        let http_status = response.status();
        let body: Value = response.json().await?;
        tracing::debug!(%http_status, "Connect answered");
        Ok(ConnectResponse::from_value(&body))
    }

    async fn status(&self) -> Result<StatusResponse> {
        let url = self.endpoint("/api/status");
        let status = self.client.get(&url).send().await?.json::<StatusResponse>().await?;
        Ok(status)
    }
}
