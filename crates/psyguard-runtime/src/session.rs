//! Guarded request/response sessions.
//!
//! A session runs the full loop for one conversation:
//! 1. `apply` the guardrail to the caller's request
//! 2. Send the modified request through the driver, bounded by a timeout
//! 3. Buffer streamed chunks until the response is complete
//! 4. `validate` the complete text once
//!
//! The guardrail is shared and stateless, so concurrent runs on one session
//! need no coordination.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use futures::StreamExt;
use psyguard_core::{ChatRequest, GuardedRequest, Guardrail, GuardrailConfig, ValidationReport};
use serde::Serialize;

use crate::driver::{DriverError, ModelDriver, SendOptions};
use crate::RuntimeError;

/// Settings for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Upper bound on one driver call; `None` waits indefinitely
    pub timeout: Option<Duration>,

    /// Sampling parameters forwarded to the driver
    pub options: SendOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(30)),
            options: SendOptions::default(),
        }
    }
}

impl SessionConfig {
    /// Derive from a validated guardrail configuration.
    pub fn from_guardrail_config(config: &GuardrailConfig) -> Result<Self, RuntimeError> {
        config.validate()?;
        Ok(Self {
            timeout: Some(Duration::from_secs(config.timeout_seconds)),
            options: SendOptions::from(config),
        })
    }
}

/// Everything recorded about one guarded call.
#[derive(Debug, Clone, Serialize)]
pub struct GuardedExchange {
    pub guarded_request: GuardedRequest,

    /// Complete response text as validated
    pub response_text: String,

    pub report: ValidationReport,

    /// Chunks received; 1 for non-streaming calls
    pub chunks: usize,

    pub completed_at: DateTime<Utc>,
}

impl GuardedExchange {
    /// Whether the response passed every guardrail.
    pub fn is_valid(&self) -> bool {
        self.report.is_valid
    }

    /// Pretty JSON for audit trails.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Runs guarded calls against one driver.
pub struct GuardedSession {
    guardrail: Arc<dyn Guardrail>,
    driver: Arc<dyn ModelDriver>,
    config: SessionConfig,
}

impl GuardedSession {
    /// Create a session with default settings.
    pub fn new(guardrail: Arc<dyn Guardrail>, driver: Arc<dyn ModelDriver>) -> Self {
        Self {
            guardrail,
            driver,
            config: SessionConfig::default(),
        }
    }

    /// Replace the session settings.
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the driver timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Apply, send, validate.
    pub async fn run(&self, request: &ChatRequest) -> Result<GuardedExchange, RuntimeError> {
        let guarded_request = self.guardrail.apply(request);
        let send = self
            .driver
            .send(&guarded_request.modified_request, &self.config.options);
        let response_text = self.bounded(send).await?;

        Ok(self.finish(guarded_request, response_text, 1))
    }

    /// Apply, stream, buffer, validate.
    ///
    /// The timeout covers the whole stream, not each chunk. A chunk error
    /// aborts the run; nothing partial is validated.
    pub async fn run_streaming(
        &self,
        request: &ChatRequest,
    ) -> Result<GuardedExchange, RuntimeError> {
        let guarded_request = self.guardrail.apply(request);

        let collect = async {
            let mut stream = self
                .driver
                .send_stream(&guarded_request.modified_request, &self.config.options);
            let mut buffer = String::new();
            let mut chunks = 0usize;
            while let Some(chunk) = stream.next().await {
                buffer.push_str(&chunk?);
                chunks += 1;
            }
            Ok::<_, DriverError>((buffer, chunks))
        };
        let (response_text, chunks) = self.bounded(collect).await?;

        Ok(self.finish(guarded_request, response_text, chunks))
    }

    /// Run independent requests concurrently. Results keep input order.
    pub async fn run_batch(
        &self,
        requests: &[ChatRequest],
    ) -> Vec<Result<GuardedExchange, RuntimeError>> {
        join_all(requests.iter().map(|request| self.run(request))).await
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, DriverError>
    where
        F: std::future::Future<Output = Result<T, DriverError>>,
    {
        let result = match self.config.timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => Err(DriverError::Timeout(limit)),
            },
            None => call.await,
        };

        if let Err(e) = &result {
            tracing::warn!(driver = self.driver.name(), error = %e, "driver call failed");
        }
        result
    }

    fn finish(
        &self,
        guarded_request: GuardedRequest,
        response_text: String,
        chunks: usize,
    ) -> GuardedExchange {
        let report = self.guardrail.validate(&response_text);
        tracing::info!(
            guardrail = self.guardrail.name(),
            driver = self.driver.name(),
            is_valid = report.is_valid,
            violations = report.violations.len(),
            chunks,
            "guarded exchange complete"
        );

        GuardedExchange {
            guarded_request,
            response_text,
            report,
            chunks,
            completed_at: Utc::now(),
        }
    }
}

impl std::fmt::Debug for GuardedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardedSession")
            .field("guardrail", &self.guardrail.name())
            .field("driver", &self.driver.name())
            .field("config", &self.config)
            .finish()
    }
}
