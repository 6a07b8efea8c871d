// src/figi.rs
use crate::config::FigiConfig;
use crate::error::IsinError;
use crate::types::{FigiTable, MappingRequest};
use log::{error, info};
use reqwest::Client;

/// Client for the OpenFIGI mapping endpoint.
pub struct FigiClient {
    config: FigiConfig,
    client: Client,
}

impl FigiClient {
    pub fn new(config: FigiConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Maps `requests` and returns the response table, or `None` when the call
    /// fails for any reason. Failures are logged, never propagated.
    pub async fn lookup(&self, requests: &[MappingRequest]) -> Option<FigiTable> {
        match self.try_lookup(requests).await {
            Ok(table) => Some(table),
            Err(IsinError::Api { status, body }) => {
                error!("Error: HTTP {} from {}", status, self.config.endpoint);
                error!("Response text: {}", body);
                None
            }
            Err(e) => {
                error!("Error: {}", e);
                None
            }
        }
    }

    pub async fn try_lookup(&self, requests: &[MappingRequest]) -> Result<FigiTable, IsinError> {
        if requests.is_empty() {
            return Err(IsinError::EmptyRequests);
        }

        let data = serde_json::to_string(requests)?;
        info!("{}", data);

        let res = self
            .client
            .post(&self.config.endpoint)
            .header("Content-Type", "text/json")
            .header("X-OPENFIGI-APIKEY", &self.config.api_key)
            .body(data)
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(IsinError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let json = serde_json::from_str(&body).map_err(|e| {
            error!("Response text: {}", body);
            IsinError::Serialization(e)
        })?;
        let table = FigiTable::from_json(json).map_err(|e| {
            error!("Response text: {}", body);
            IsinError::Serialization(e)
        })?;

        info!("Mapped {} requests into {} rows", requests.len(), table.len());
        Ok(table)
    }
}
