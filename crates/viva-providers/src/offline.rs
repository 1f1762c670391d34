//! Offline backend: always fails, pushing the system onto its fallbacks.

use async_trait::async_trait;

use viva_core::traits::{InvokeRequest, InvokeResponse, ModelInvoker, TransportError};

/// A backend with no model behind it. Every invocation fails permanently, so
/// the gateway degrades to deterministic content without burning retries.
/// This is the demo-mode backend used when no API key is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineInvoker;

#[async_trait]
impl ModelInvoker for OfflineInvoker {
    fn name(&self) -> &str {
        "offline"
    }

    async fn invoke(&self, _: &InvokeRequest) -> Result<InvokeResponse, TransportError> {
        Err(TransportError::NotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn always_fails_permanently() {
        let invoker = OfflineInvoker;
        let request = InvokeRequest {
            prompt: "anything".into(),
            system_prompt: None,
            max_tokens: 100,
            temperature: 0.0,
            timeout: Duration::from_secs(1),
        };
        let err = invoker.invoke(&request).await.unwrap_err();
        assert!(matches!(err, TransportError::NotConfigured));
        assert!(err.is_permanent());
    }
}
