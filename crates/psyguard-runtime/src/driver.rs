//! Model driver abstraction.
//!
//! A driver turns a [`ChatRequest`] into raw response text. Transport, auth
//! and provider wire formats live entirely behind this trait.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use psyguard_core::{ChatRequest, GuardrailConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from a model driver. Never retried by this crate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DriverError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Authentication failed")]
    Auth,

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Driver not configured: {0}")]
    NotConfigured(String),
}

/// Sampling parameters forwarded with every request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SendOptions {
    /// Temperature (low for classification)
    pub temperature: f32,

    /// Completion cap; `None` leaves it to the driver
    pub max_tokens: Option<u32>,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            max_tokens: None,
        }
    }
}

impl From<&GuardrailConfig> for SendOptions {
    fn from(config: &GuardrailConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// Driver abstraction allows swapping model backends.
#[async_trait]
pub trait ModelDriver: Send + Sync {
    /// Send a request and return the complete response text.
    async fn send(
        &self,
        request: &ChatRequest,
        options: &SendOptions,
    ) -> Result<String, DriverError>;

    /// Stream the response as text chunks.
    ///
    /// The default yields the whole [`send`](Self::send) result as one chunk.
    fn send_stream<'a>(
        &'a self,
        request: &'a ChatRequest,
        options: &'a SendOptions,
    ) -> BoxStream<'a, Result<String, DriverError>> {
        stream::once(self.send(request, options)).boxed()
    }

    /// Driver name for logs.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use psyguard_core::Message;

    struct Echo;

    #[async_trait]
    impl ModelDriver for Echo {
        async fn send(
            &self,
            request: &ChatRequest,
            _: &SendOptions,
        ) -> Result<String, DriverError> {
            Ok(request.user_transcript())
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    #[test]
    fn test_options_from_config() {
        let config = GuardrailConfig {
            temperature: 0.4,
            max_tokens: Some(200),
            ..Default::default()
        };
        let options = SendOptions::from(&config);
        assert_eq!(options.temperature, 0.4);
        assert_eq!(options.max_tokens, Some(200));
    }

    #[tokio::test]
    async fn test_default_stream_is_single_chunk() {
        let request = ChatRequest::new(vec![Message::user("hello")]);
        let options = SendOptions::default();
        let chunks: Vec<_> = Echo.send_stream(&request, &options).collect().await;
        assert_eq!(chunks, vec![Ok("hello".to_string())]);
    }

    #[test]
    fn test_error_display() {
        let err = DriverError::Api {
            status: 529,
            message: "overloaded".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 529 - overloaded");
    }
}
