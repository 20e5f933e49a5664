//! Guardrail registry and the built-in catalog.
//!
//! The registry is an explicit value mapping names to factories. Nothing is
//! registered globally; callers build a registry (usually
//! [`GuardrailRegistry::with_defaults`]) and pass it where it is needed.
//!
//! ## Usage
//!
//! ```ignore
//! let registry = GuardrailRegistry::with_defaults();
//! let config = GuardrailConfig::from_yaml_file("psyguard.yaml")?;
//! let guardrail = registry.compose(&["suicide_prevention", "pii_protection"], &config)?;
//! ```
//!
//! ## Built-ins
//!
//! | name | apply | validate |
//! |------|-------|----------|
//! | `suicide_prevention` | risk prompt over the user transcript | risk threshold |
//! | `ai_harm_detection` | harm audit prompt over both sides | harm threshold |
//! | `mental_health_support` | supportive-reply instruction | always valid |
//! | `complaints_handling` | triage instruction for the latest user turn | always valid |
//! | `pii_protection` | data-handling instruction merged into system | PII and credential scan |

pub mod ai_harm;
pub mod complaints;
pub mod mental_health;
pub mod patterns;
pub mod pii;
pub mod prompts;
pub mod suicide_prevention;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::config::{ConfigError, GuardrailConfig};
use crate::guardrail::{CompositeGuardrail, Guardrail};

pub use ai_harm::AiHarmDetectionGuardrail;
pub use complaints::ComplaintsHandlingGuardrail;
pub use pii::SensitiveDataValidator;
pub use suicide_prevention::SuicidePreventionGuardrail;

type BuildFn = fn(&GuardrailConfig) -> Result<Box<dyn Guardrail>, ConfigError>;

/// Creates guardrail instances from configuration.
pub trait GuardrailFactory: Send + Sync {
    /// Unique registry name.
    fn name(&self) -> &str;

    /// Build an instance. Invalid configuration fails here, never later.
    fn create(&self, config: &GuardrailConfig) -> Result<Box<dyn Guardrail>, ConfigError>;

    /// One-line description for listings.
    fn description(&self) -> &str {
        "Guardrail"
    }
}

/// Factory backed by a plain function.
struct FnFactory<F> {
    name: String,
    description: String,
    build: F,
}

impl<F> GuardrailFactory for FnFactory<F>
where
    F: Fn(&GuardrailConfig) -> Result<Box<dyn Guardrail>, ConfigError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn create(&self, config: &GuardrailConfig) -> Result<Box<dyn Guardrail>, ConfigError> {
        (self.build)(config)
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Name-to-factory mapping with load and compose helpers.
#[derive(Default, Clone)]
pub struct GuardrailRegistry {
    factories: BTreeMap<String, Arc<dyn GuardrailFactory>>,
}

impl GuardrailRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory. A name can only be registered once.
    pub fn register(&mut self, factory: Arc<dyn GuardrailFactory>) -> Result<(), ConfigError> {
        let name = factory.name().to_string();
        if self.factories.contains_key(&name) {
            return Err(ConfigError::DuplicateGuardrail(name));
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    /// Register a function as a factory.
    pub fn register_fn<F>(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        build: F,
    ) -> Result<(), ConfigError>
    where
        F: Fn(&GuardrailConfig) -> Result<Box<dyn Guardrail>, ConfigError> + Send + Sync + 'static,
    {
        self.register(Arc::new(FnFactory {
            name: name.into(),
            description: description.into(),
            build,
        }))
    }

    /// Instantiate one guardrail.
    pub fn create(
        &self,
        name: &str,
        config: &GuardrailConfig,
    ) -> Result<Box<dyn Guardrail>, ConfigError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ConfigError::UnknownGuardrail {
                name: name.to_string(),
                available: self.available().iter().map(|s| s.to_string()).collect(),
            })?;
        let guardrail = factory.create(config)?;
        tracing::debug!(guardrail = name, "guardrail created");
        Ok(guardrail)
    }

    /// Instantiate several guardrails in order. Fails on the first error.
    pub fn load<S: AsRef<str>>(
        &self,
        names: &[S],
        config: &GuardrailConfig,
    ) -> Result<Vec<Box<dyn Guardrail>>, ConfigError> {
        names
            .iter()
            .map(|name| self.create(name.as_ref(), config))
            .collect()
    }

    /// Instantiate several guardrails as one composite, in the given order.
    pub fn compose<S: AsRef<str>>(
        &self,
        names: &[S],
        config: &GuardrailConfig,
    ) -> Result<CompositeGuardrail, ConfigError> {
        let children = self.load(names, config)?;
        let name = names
            .iter()
            .map(|n| n.as_ref())
            .collect::<Vec<_>>()
            .join("+");
        Ok(CompositeGuardrail::new(name, children))
    }

    /// Registered names, sorted.
    pub fn available(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }

    /// Registered names with descriptions, sorted by name.
    pub fn describe(&self) -> Vec<(&str, &str)> {
        self.factories
            .iter()
            .map(|(name, factory)| (name.as_str(), factory.description()))
            .collect()
    }

    /// Whether `name` is registered.
    pub fn has(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// A registry holding the built-in catalog.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let builtins: [(&str, &str, BuildFn); 5] = [
            (
                suicide_prevention::NAME,
                "Classifies suicide risk in user messages against the risk threshold",
                |config| Ok(Box::new(SuicidePreventionGuardrail::new(config)?)),
            ),
            (
                ai_harm::NAME,
                "Audits assistant replies against the harm policies and threshold",
                |config| Ok(Box::new(AiHarmDetectionGuardrail::new(config)?)),
            ),
            (
                mental_health::NAME,
                "Steers replies toward supportive, non-clinical language",
                |config| Ok(Box::new(mental_health::build(config))),
            ),
            (
                complaints::NAME,
                "Frames the latest user turn as a possible complaint to triage",
                |_| Ok(Box::new(ComplaintsHandlingGuardrail)),
            ),
            (
                pii::NAME,
                "Forbids personal data in replies and scans responses for it",
                |config| Ok(Box::new(pii::build(config))),
            ),
        ];

        for (name, description, build) in builtins {
            let registered = registry.register_fn(name, description, build);
            debug_assert!(registered.is_ok(), "built-in guardrail {name} registered twice");
        }
        registry
    }
}

impl fmt::Debug for GuardrailRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardrailRegistry")
            .field("guardrails", &self.available())
            .finish()
    }
}
