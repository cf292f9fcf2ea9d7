use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error};

use super::TransportError;
use crate::config::{HttpMethod, PollSource};
use crate::constants::polling::REQUESTED_WITH_HEADER;

/// Issues one poll request and returns the response body
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn fetch(&self, source: &PollSource) -> Result<String, TransportError>;
}

/// Polls over a reusable reqwest client
#[derive(Debug, Clone, Default)]
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn fetch(&self, source: &PollSource) -> Result<String, TransportError> {
        debug!("Polling {} {}", source.method, source.url);

        let request = match source.method {
            HttpMethod::Get => self.client.get(source.url.clone()),
            HttpMethod::Post => self.client.post(source.url.clone()).form(&source.form),
        };

        let response = match request
            .header(REQUESTED_WITH_HEADER.0, REQUESTED_WITH_HEADER.1)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                error!("Network error polling {}: {}", source.url, e);
                return Err(TransportError::NetworkError(e.to_string()));
            }
        };

        let status = response.status();
        if !status.is_success() {
            error!(
                "HTTP error {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            );
            return Err(TransportError::HttpError(status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| TransportError::NetworkError(e.to_string()))
    }
}
