pub mod decode;
pub mod encode;
pub mod process;
pub mod resolve;
pub mod session;

use std::path::Path;
use std::time::Duration;

use crate::config::Settings;
use crate::engine::resolve::ExecutableResolver;

pub use encode::{encode_profile, EncodedQuery};

/// Hard wall-clock limit on a single engine invocation, for both the one-shot
/// subprocess and a read against the persistent session.
pub const INVOCATION_TIMEOUT: Duration = Duration::from_secs(15);

/// Relation the rule base exposes for a bound profile.
pub const RECOMMENDATION_RELATION: &str = "recomendaciones";

#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    /// No usable engine: the executable could not be resolved, or the
    /// persistent session failed at startup. Every later call fails fast.
    #[error("Motor Prolog no disponible: {0}")]
    Unavailable(String),
    /// The engine raised while answering a live query.
    #[error("Error ejecutando Prolog: {0}")]
    Query(String),
}

/// Snapshot of engine readiness for the health endpoint.
#[derive(Debug, Clone)]
pub struct EngineDiagnostics {
    pub strategy: &'static str,
    pub binding_available: bool,
    pub executable_detected: Option<String>,
    pub rules_file_found: bool,
}

impl EngineDiagnostics {
    pub fn healthy(&self) -> bool {
        self.binding_available || (self.executable_detected.is_some() && self.rules_file_found)
    }
}

#[async_trait::async_trait]
pub trait EngineInvoker: Send + Sync {
    fn name(&self) -> &'static str;

    fn diagnostics(&self) -> EngineDiagnostics;

    /// Run one encoded profile against the rule base and return the engine's
    /// output lines in order. Timeouts and non-zero exits inside the process
    /// strategy degrade to an empty sequence; see the strategy docs.
    async fn invoke(&self, query: &EncodedQuery) -> Result<Vec<String>, EngineError>;
}

/// Stand-in invoker installed when the bound session could not be started.
/// Keeps the failure from startup and replays it on every call instead of
/// retrying per request.
pub struct UnavailableEngine {
    reason: String,
    resolver: ExecutableResolver,
    rules_file: String,
}

impl UnavailableEngine {
    pub fn from_settings(settings: &Settings, reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            resolver: ExecutableResolver::from_settings(settings),
            rules_file: settings.rules_file.clone(),
        }
    }
}

#[async_trait::async_trait]
impl EngineInvoker for UnavailableEngine {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn diagnostics(&self) -> EngineDiagnostics {
        EngineDiagnostics {
            strategy: self.name(),
            binding_available: false,
            executable_detected: self.resolver.detect(),
            rules_file_found: Path::new(&self.rules_file).is_file(),
        }
    }

    async fn invoke(&self, _query: &EncodedQuery) -> Result<Vec<String>, EngineError> {
        Err(EngineError::Unavailable(self.reason.clone()))
    }
}
