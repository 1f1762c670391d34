//! Together.ai backend (OpenAI-compatible chat completions).

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use viva_core::traits::{InvokeRequest, InvokeResponse, ModelInvoker, TransportError};

const DEFAULT_BASE_URL: &str = "https://api.together.xyz";
pub const DEFAULT_MODEL: &str = "meta-llama/Llama-3.3-70B-Instruct-Turbo";

/// Together.ai chat-completions backend. Requests JSON-mode output, since
/// every prompt in the system expects a JSON object back.
pub struct TogetherProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl TogetherProvider {
    pub fn new(api_key: &str, model: Option<String>, base_url: Option<String>) -> Self {
        // Per-request deadlines come from the invoke request; the client
        // itself carries no timeout.
        let client = reqwest::Client::new();
        Self {
            api_key: api_key.to_string(),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            client,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    max_tokens: u32,
    temperature: f64,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    model: String,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[async_trait]
impl ModelInvoker for TogetherProvider {
    fn name(&self) -> &str {
        "together"
    }

    #[instrument(skip(self, request), fields(model = %self.model))]
    async fn invoke(&self, request: &InvokeRequest) -> Result<InvokeResponse, TransportError> {
        let start = Instant::now();

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system_prompt {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.prompt.clone(),
        });

        let body = ChatRequest {
            model: self.model.clone(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages,
            response_format: ResponseFormat {
                kind: "json_object".to_string(),
            },
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .timeout(request.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(request.timeout)
                } else {
                    TransportError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status == 429 {
            let retry_after_ms = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(5)
                * 1000;
            return Err(TransportError::RateLimited { retry_after_ms });
        }
        if status == 401 {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::AuthenticationFailed(body));
        }
        if status == 404 {
            return Err(TransportError::ModelNotFound(self.model.clone()));
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Api {
                status,
                message: body,
            });
        }

        let api_response: ChatResponse = response.json().await.map_err(|e| TransportError::Api {
            status: 0,
            message: format!("failed to parse response: {e}"),
        })?;

        let content = api_response
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .unwrap_or_default();

        Ok(InvokeResponse {
            content,
            model: api_response.model,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}
