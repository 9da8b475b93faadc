//! Generation through a remote story endpoint.

use super::{GenerationBoundary, GenerationError, GenerationRequest};
use async_trait::async_trait;
use serde::Deserialize;

/// POSTs generation requests to a story endpoint such as `/api/story`.
#[derive(Debug, Clone)]
pub struct HttpBoundary {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl HttpBoundary {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// Reuse an existing HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl GenerationBoundary for HttpBoundary {
    async fn request(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| GenerationError::Http(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GenerationError::Http(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or(body);
            return Err(GenerationError::Status {
                status: status.as_u16(),
                message,
            });
        }

        if body.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(body)
    }
}
