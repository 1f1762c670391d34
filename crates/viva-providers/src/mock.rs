//! Mock backend for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use viva_core::traits::{InvokeRequest, InvokeResponse, ModelInvoker, TransportError};

/// A mock model backend for exercising the engine without real API calls.
///
/// Returns configurable responses based on prompt content matching, and can
/// inject transient failures before the first success.
pub struct MockInvoker {
    /// Map of prompt substring → response content.
    responses: HashMap<String, String>,
    /// Default response if no prompt matches.
    default_response: String,
    /// Fail this many calls with a network error before answering.
    fail_first: u32,
    /// Number of calls made.
    call_count: AtomicU32,
    /// Last request received.
    last_request: Mutex<Option<InvokeRequest>>,
}

impl MockInvoker {
    /// New mock with the given prompt-substring → response mappings.
    pub fn new(responses: HashMap<String, String>) -> Self {
        Self {
            responses,
            default_response: "{}".to_string(),
            fail_first: 0,
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// A mock that always returns the same response.
    pub fn with_fixed_response(response: &str) -> Self {
        Self {
            responses: HashMap::new(),
            default_response: response.to_string(),
            fail_first: 0,
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Make the first `n` calls fail with a network error.
    pub fn failing_first(mut self, n: u32) -> Self {
        self.fail_first = n;
        self
    }

    /// Number of calls made to this backend.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// The last request received.
    pub fn last_request(&self) -> Option<InvokeRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelInvoker for MockInvoker {
    fn name(&self) -> &str {
        "mock"
    }

    async fn invoke(&self, request: &InvokeRequest) -> Result<InvokeResponse, TransportError> {
        let call = self.call_count.fetch_add(1, Ordering::Relaxed);
        *self.last_request.lock().unwrap() = Some(request.clone());

        if call < self.fail_first {
            return Err(TransportError::Network("injected failure".to_string()));
        }

        let content = self
            .responses
            .iter()
            .find(|(key, _)| request.prompt.contains(key.as_str()))
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| self.default_response.clone());

        Ok(InvokeResponse {
            content,
            model: "mock-model".to_string(),
            latency_ms: 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn request(prompt: &str) -> InvokeRequest {
        InvokeRequest {
            prompt: prompt.into(),
            system_prompt: None,
            max_tokens: 100,
            temperature: 0.0,
            timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn fixed_response() {
        let invoker = MockInvoker::with_fixed_response(r#"{"grade": 80}"#);
        let response = invoker.invoke(&request("anything")).await.unwrap();
        assert_eq!(response.content, r#"{"grade": 80}"#);
        assert_eq!(invoker.call_count(), 1);
        assert_eq!(invoker.last_request().unwrap().prompt, "anything");
    }

    #[tokio::test]
    async fn prompt_matching() {
        let mut responses = HashMap::new();
        responses.insert("Grade the following".to_string(), r#"{"grade": 70}"#.to_string());
        responses.insert("Generate".to_string(), r#"{"question_text": "Q"}"#.to_string());
        let invoker = MockInvoker::new(responses);

        let graded = invoker
            .invoke(&request("Grade the following student answer"))
            .await
            .unwrap();
        assert!(graded.content.contains("grade"));

        let generated = invoker.invoke(&request("Generate a question")).await.unwrap();
        assert!(generated.content.contains("question_text"));
        assert_eq!(invoker.call_count(), 2);
    }

    #[tokio::test]
    async fn injected_failures_precede_success() {
        let invoker = MockInvoker::with_fixed_response("{}").failing_first(2);
        assert!(invoker.invoke(&request("x")).await.is_err());
        assert!(invoker.invoke(&request("x")).await.is_err());
        assert!(invoker.invoke(&request("x")).await.is_ok());
    }
}
