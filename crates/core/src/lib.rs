pub mod classify;
pub mod domain;
pub mod engine;
pub mod service;

pub mod config {
    pub const DEFAULT_RULES_FILE: &str = "asistente_finanzas.pl";

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum EngineStrategyKind {
        /// One-shot `swipl` subprocess per request, driven by a generated script.
        Process,
        /// One persistent `swipl` session for the whole process lifetime.
        Bound,
    }

    #[derive(Debug, Clone)]
    pub struct Settings {
        /// Explicit engine command override (`SWIPL_CMD`, then `SWI_PROLOG`).
        pub engine_cmd: Option<String>,
        pub rules_file: String,
        pub engine_strategy: EngineStrategyKind,
        /// Encoding label for engine output; defaults to UTF-8 when unset or unknown.
        pub output_encoding: Option<String>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let engine_strategy = match std::env::var("ASESOR_ENGINE_STRATEGY")
                .ok()
                .map(|s| s.trim().to_lowercase())
                .as_deref()
            {
                None | Some("") | Some("process") => EngineStrategyKind::Process,
                Some("bound") => EngineStrategyKind::Bound,
                Some(other) => {
                    anyhow::bail!("ASESOR_ENGINE_STRATEGY no reconocida: {other} (use process|bound)")
                }
            };

            Ok(Self {
                engine_cmd: std::env::var("SWIPL_CMD")
                    .ok()
                    .or_else(|| std::env::var("SWI_PROLOG").ok())
                    .filter(|s| !s.trim().is_empty()),
                rules_file: std::env::var("ASESOR_RULES_FILE")
                    .ok()
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_RULES_FILE.to_string()),
                engine_strategy,
                output_encoding: std::env::var("ASESOR_OUTPUT_ENCODING").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
            })
        }
    }
}
