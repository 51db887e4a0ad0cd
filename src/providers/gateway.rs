//! Gateway analysis provider
//!
//! Posts `{ "prompt": ... }` to a deployment-owned endpoint that holds the
//! model credentials server-side. The gateway may reply with the completion
//! array directly or wrap it as `{ "content": "..." }`; the body is handed
//! to the response parser verbatim, which accepts both shapes.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, error};

use crate::error::{Error, Result};

use super::{AnalysisProvider, AnalysisRequest, AnalysisResponse};

/// Analysis provider backed by a gateway endpoint
pub struct GatewayAnalysisProvider {
    client: Client,
    endpoint: Option<String>,
}

#[derive(Debug, Serialize)]
struct GatewayRequest {
    prompt: String,
}

impl GatewayAnalysisProvider {
    /// Create a new provider (endpoint loaded from environment if not provided)
    pub fn new(endpoint: Option<String>) -> Self {
        let endpoint = endpoint.or_else(|| std::env::var("ANALYSIS_GATEWAY_URL").ok());

        Self {
            client: Client::new(),
            endpoint,
        }
    }

    fn endpoint(&self) -> Result<&str> {
        self.endpoint
            .as_deref()
            .ok_or_else(|| Error::ProviderNotConfigured("analysis gateway URL not set".to_string()))
    }
}

#[async_trait]
impl AnalysisProvider for GatewayAnalysisProvider {
    fn name(&self) -> &'static str {
        "Gateway"
    }

    async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResponse> {
        let endpoint = self.endpoint()?;

        debug!("Sending analysis request to gateway");

        let response = self
            .client
            .post(endpoint)
            .json(&GatewayRequest {
                prompt: request.utterance,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Gateway error: {} - {}", status, error_text);
            return Err(Error::Analysis(format!(
                "Gateway error: {} - {}",
                status, error_text
            )));
        }

        // array or wrapper object; the parser discriminates
        let content = response.text().await?;

        Ok(AnalysisResponse {
            content,
            model: None,
            usage: None,
        })
    }

    fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }
}
