use std::time::Duration;

use crate::error::VqaError;
use crate::models::VqaQuestion;
use crate::relay::{RelayErrorBody, VqaRequest, VqaResponse};
use crate::services::image::ImageEncoding;

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Asks one question about one image.
#[async_trait::async_trait]
pub trait VqaClient: Send + Sync {
    async fn ask(&self, image: &ImageEncoding, question: VqaQuestion) -> Result<String, VqaError>;
}

/// Talks to the relay's `POST /api/vqa`.
pub struct RelayVqaClient {
    endpoint: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl RelayVqaClient {
    pub fn new(relay_url: &str, timeout: Duration) -> Self {
        Self {
            endpoint: format!("{}/api/vqa", relay_url.trim_end_matches('/')),
            timeout,
            client: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn transport_error(&self, e: reqwest::Error) -> VqaError {
        if e.is_timeout() {
            VqaError::Timeout(self.timeout.as_millis() as u64)
        } else {
            VqaError::Transport(e.to_string())
        }
    }
}

#[async_trait::async_trait]
impl VqaClient for RelayVqaClient {
    async fn ask(&self, image: &ImageEncoding, question: VqaQuestion) -> Result<String, VqaError> {
        if image.is_empty() {
            return Err(VqaError::EmptyImage);
        }

        let request = VqaRequest::new(image.as_str(), question.text());
        log::debug!("📤 Asking relay {} the {} question", self.endpoint, question);

        let response = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        log::debug!("📥 Relay response status: {}", status);

        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            let message = serde_json::from_str::<RelayErrorBody>(&body)
                .map(|b| b.message())
                .unwrap_or(body);

            return Err(match status.as_u16() {
                503 => VqaError::UpstreamBusy(message),
                405 => VqaError::MethodNotAllowed,
                code @ 400..=499 => VqaError::Rejected { status: code, message },
                code => VqaError::Upstream { status: code, message },
            });
        }

        let parsed: VqaResponse =
            serde_json::from_str(&body).map_err(|e| VqaError::MalformedResponse(e.to_string()))?;
        Ok(parsed.answer)
    }
}
