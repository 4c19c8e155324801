//! HTTP client for cPanel UAPI.

use super::{ApiOutcome, BackupRequest, ControlPanel};
use crate::config::ApiConfig;
use crate::utils::errors::{BackupError, Result};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use std::time::Duration;
use tracing::{debug, warn};

/// Issues UAPI calls authenticated with an API token
pub struct CpanelClient {
    http: reqwest::Client,
    endpoint: Url,
    authorization: String,
}

impl CpanelClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let endpoint = Url::parse(&format!(
            "{}://{}:{}/execute/{}/{}",
            config.scheme, config.host, config.port, config.module, config.function
        ))
        .map_err(|e| BackupError::Config(format!("invalid API endpoint: {}", e)))?;

        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .user_agent(concat!("cpanel-backup/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BackupError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint,
            authorization: format!("cpanel {}:{}", config.user, config.token),
        })
    }

    /// Endpoint with the request's query parameters applied
    pub fn request_url(&self, request: &BackupRequest) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("email", &request.notify_address);
        url
    }
}

#[async_trait]
impl ControlPanel for CpanelClient {
    async fn trigger(&self, request: &BackupRequest, timeout: Duration) -> ApiOutcome {
        let url = self.request_url(request);
        debug!("GET {}", self.endpoint);

        let response = match self
            .http
            .get(url)
            .header(reqwest::header::AUTHORIZATION, &self.authorization)
            .timeout(timeout)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                warn!("cPanel API request failed: {}", e);
                return ApiOutcome::TransportError(e.to_string());
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            return ApiOutcome::HttpError(status.as_u16());
        }

        match response.text().await {
            Ok(body) => ApiOutcome::from_body(&body),
            Err(e) => ApiOutcome::TransportError(format!("failed to read response body: {}", e)),
        }
    }
}
