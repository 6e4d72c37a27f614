use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::UpstreamError;
use crate::services::image::strip_data_url;

pub const DEFAULT_MODEL_URL: &str =
    "https://api-inference.huggingface.co/models/Salesforce/blip-vqa-capfilt-large";

#[derive(Debug, Serialize)]
struct ModelRequest<'a> {
    inputs: ModelInputs<'a>,
}

#[derive(Debug, Serialize)]
struct ModelInputs<'a> {
    image: &'a str,
    question: &'a str,
}

#[derive(Debug, Deserialize)]
struct ModelAnswer {
    answer: Option<String>,
    #[allow(dead_code)]
    score: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct LoadingBody {
    estimated_time: Option<f64>,
}

/// Anything that can answer a question about an image.
#[async_trait::async_trait]
pub trait VqaModel: Send + Sync {
    async fn answer(&self, image: &str, question: &str) -> Result<String, UpstreamError>;
}

/// Hosted VQA model behind the Hugging Face inference API.
pub struct HuggingFaceVqa {
    api_token: String,
    model_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HuggingFaceVqa {
    pub fn new(api_token: String, model_url: String, timeout: Duration) -> Self {
        Self {
            api_token,
            model_url,
            timeout,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl VqaModel for HuggingFaceVqa {
    async fn answer(&self, image: &str, question: &str) -> Result<String, UpstreamError> {
        let request = ModelRequest {
            inputs: ModelInputs {
                image: strip_data_url(image),
                question,
            },
        };

        log::info!("🤖 Asking model: {}", question);
        log::debug!("📤 Image payload size: {} bytes", request.inputs.image.len());

        let response = self
            .client
            .post(&self.model_url)
            .header("Authorization", format!("Bearer {}", self.api_token))
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        log::debug!("📥 Model response status: {}", status);

        let body = response.text().await?;

        if status.as_u16() == 503 {
            let estimated_time = serde_json::from_str::<LoadingBody>(&body)
                .ok()
                .and_then(|b| b.estimated_time);
            log::warn!("⏳ Model is loading (estimated {:?}s)", estimated_time);
            return Err(UpstreamError::Loading { estimated_time });
        }

        if !status.is_success() {
            log::error!("❌ Model API error response ({}): {}", status, body);
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let answer = parse_answer(&body)?;
        log::info!("💬 Model answer: {}", answer);
        Ok(answer)
    }
}

/// Pulls `answer` out of the first element of the model's reply.
/// A reply with no answer yields an empty string.
fn parse_answer(body: &str) -> Result<String, UpstreamError> {
    let answers: Vec<ModelAnswer> =
        serde_json::from_str(body).map_err(|e| UpstreamError::Parse(e.to_string()))?;

    Ok(answers
        .into_iter()
        .next()
        .and_then(|a| a.answer)
        .unwrap_or_default())
}
