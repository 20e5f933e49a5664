//! # psyguard-runtime
//!
//! Async glue between guardrails and a model driver.
//!
//! ## Important
//!
//! `psyguard-core` never performs I/O. This crate owns the single suspension
//! point in the system: the call to the model. It applies timeouts around
//! that call and buffers streamed output so guardrails only ever see a
//! complete response.
//!
//! Driver failures are surfaced as errors and never retried here; retry
//! policy belongs to the caller.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use psyguard_core::{GuardrailConfig, GuardrailRegistry};
//! use psyguard_runtime::{GuardedSession, SessionConfig};
//!
//! let config = GuardrailConfig::from_yaml_file("psyguard.yaml")?;
//! let guardrail = GuardrailRegistry::with_defaults().compose(&["suicide_prevention"], &config)?;
//!
//! let session = GuardedSession::new(Arc::new(guardrail), Arc::new(my_driver))
//!     .with_config(SessionConfig::from_guardrail_config(&config)?);
//!
//! let exchange = session.run(&request).await?;
//! if !exchange.is_valid() {
//!     escalate(&exchange.report);
//! }
//! ```

pub mod driver;
pub mod session;

pub use driver::{DriverError, ModelDriver, SendOptions};
pub use session::{GuardedExchange, GuardedSession, SessionConfig};

use psyguard_core::ConfigError;
use thiserror::Error;

/// Errors from the runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
