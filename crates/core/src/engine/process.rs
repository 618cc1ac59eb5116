use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use encoding_rs::Encoding;

use crate::config::Settings;
use crate::engine::encode::{quote_atom, EncodedQuery};
use crate::engine::resolve::ExecutableResolver;
use crate::engine::{
    decode, EngineDiagnostics, EngineError, EngineInvoker, INVOCATION_TIMEOUT,
    RECOMMENDATION_RELATION,
};

/// One-shot invocation strategy: each request writes a self-contained script
/// to a temp file and runs `swipl -q -t halt <script>` against it. Holds no
/// engine state between requests.
///
/// Timeouts and non-zero exits degrade to an empty recommendation list; the
/// caller cannot tell "no recommendations" from "engine fell over" here, which
/// keeps the endpoint available when the engine misbehaves.
#[derive(Debug, Clone)]
pub struct ProcessStrategy {
    resolver: ExecutableResolver,
    rules_file: String,
    encoding: &'static Encoding,
    timeout: Duration,
    scratch_dir: PathBuf,
}

impl ProcessStrategy {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            resolver: ExecutableResolver::from_settings(settings),
            rules_file: settings.rules_file.clone(),
            encoding: decode::resolve_encoding(settings.output_encoding.as_deref()),
            timeout: INVOCATION_TIMEOUT,
            scratch_dir: std::env::temp_dir(),
        }
    }

    #[cfg(test)]
    fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[cfg(test)]
    fn with_scratch_dir(mut self, dir: PathBuf) -> Self {
        self.scratch_dir = dir;
        self
    }

    /// Self-contained script: load the rule base, bind the profile, print one
    /// recommendation per line, and halt on every path so the process always
    /// terminates.
    fn render_script(&self, query: &EncodedQuery) -> String {
        format!(
            ":- consult({rules}).\n\
             \n\
             ejecutar_consulta :-\n\
             \x20   Perfil = {perfil},\n\
             \x20   {relation}(Perfil, Recs),\n\
             \x20   maplist(writeln, Recs),\n\
             \x20   halt.\n\
             \n\
             :- ejecutar_consulta.\n\
             :- halt.\n",
            rules = quote_atom(&self.rules_file),
            perfil = query.as_str(),
            relation = RECOMMENDATION_RELATION,
        )
    }
}

#[async_trait::async_trait]
impl EngineInvoker for ProcessStrategy {
    fn name(&self) -> &'static str {
        "process"
    }

    fn diagnostics(&self) -> EngineDiagnostics {
        EngineDiagnostics {
            strategy: self.name(),
            binding_available: false,
            executable_detected: self.resolver.detect(),
            rules_file_found: Path::new(&self.rules_file).is_file(),
        }
    }

    async fn invoke(&self, query: &EncodedQuery) -> Result<Vec<String>, EngineError> {
        let program = self.resolver.resolve()?;

        // NamedTempFile deletes on drop, so the script disappears on every
        // exit path, timeout and panic included.
        let mut script_file = tempfile::Builder::new()
            .prefix("consulta_")
            .suffix(".pl")
            .tempfile_in(&self.scratch_dir)
            .map_err(|e| EngineError::Query(format!("no se pudo crear el archivo temporal: {e}")))?;
        script_file
            .write_all(self.render_script(query).as_bytes())
            .and_then(|()| script_file.flush())
            .map_err(|e| EngineError::Query(format!("no se pudo escribir la consulta: {e}")))?;

        let mut cmd = tokio::process::Command::new(&program);
        cmd.arg("-q")
            .arg("-t")
            .arg("halt")
            .arg(script_file.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(program = %program, script = %script_file.path().display(), "ejecutando Prolog");

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                tracing::warn!(program = %program, error = %err, "no se pudo lanzar el proceso Prolog");
                return Ok(Vec::new());
            }
            Err(_) => {
                tracing::warn!(
                    timeout_secs = self.timeout.as_secs(),
                    "timeout ejecutando Prolog"
                );
                return Ok(Vec::new());
            }
        };

        if !output.status.success() {
            let stderr = decode::decode_lines(&output.stderr, self.encoding).join(" | ");
            tracing::warn!(status = %output.status, stderr = %stderr, "Prolog terminó con error");
            return Ok(Vec::new());
        }

        Ok(decode::decode_lines(&output.stdout, self.encoding))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    use crate::config::EngineStrategyKind;
    use crate::engine::encode_profile;

    fn settings_with_cmd(cmd: &str) -> Settings {
        Settings {
            engine_cmd: Some(cmd.to_string()),
            rules_file: "reglas.pl".to_string(),
            engine_strategy: EngineStrategyKind::Process,
            output_encoding: None,
            sentry_dsn: None,
        }
    }

    fn query() -> EncodedQuery {
        let profile = serde_json::from_value(json!({"ingreso": 100, "metas": []})).unwrap();
        encode_profile(&profile)
    }

    #[cfg(unix)]
    fn fake_engine(dir: &TempDir, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.path().join("fake-swipl");
        std::fs::write(&path, body).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn script_loads_rules_binds_profile_and_always_halts() {
        let strategy = ProcessStrategy::from_settings(&settings_with_cmd("swipl"));
        let script = strategy.render_script(&query());
        assert!(script.starts_with(":- consult('reglas.pl').\n"));
        assert!(script.contains("Perfil = _{ ingreso: 100, metas: [] }"));
        assert!(script.contains("recomendaciones(Perfil, Recs)"));
        assert!(script.contains("maplist(writeln, Recs)"));
        assert!(script.trim_end().ends_with(":- halt."));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn successful_run_returns_trimmed_output_lines() {
        let dir = TempDir::new().unwrap();
        let exe = fake_engine(&dir, "#!/bin/sh\necho '  uno  '\necho\necho dos\n");
        let strategy = ProcessStrategy::from_settings(&settings_with_cmd(&exe));

        let recs = strategy.invoke(&query()).await.unwrap();
        assert_eq!(recs, ["uno", "dos"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_degrades_to_empty_not_error() {
        let dir = TempDir::new().unwrap();
        let exe = fake_engine(&dir, "#!/bin/sh\necho descartada\nexit 3\n");
        let strategy = ProcessStrategy::from_settings(&settings_with_cmd(&exe));

        let recs = strategy.invoke(&query()).await.unwrap();
        assert!(recs.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn timeout_returns_empty_and_removes_the_temp_script() {
        let scratch = TempDir::new().unwrap();
        let dir = TempDir::new().unwrap();
        let exe = fake_engine(&dir, "#!/bin/sh\nsleep 5\n");
        let strategy = ProcessStrategy::from_settings(&settings_with_cmd(&exe))
            .with_timeout(Duration::from_millis(200))
            .with_scratch_dir(scratch.path().to_path_buf());

        let recs = strategy.invoke(&query()).await.unwrap();
        assert!(recs.is_empty());

        let leftovers: Vec<_> = std::fs::read_dir(scratch.path()).unwrap().collect();
        assert!(leftovers.is_empty(), "temp script leaked: {leftovers:?}");
    }

    #[tokio::test]
    async fn unspawnable_program_degrades_to_empty() {
        let strategy = ProcessStrategy::from_settings(&settings_with_cmd("/no/existe/swipl"));
        let recs = strategy.invoke(&query()).await.unwrap();
        assert!(recs.is_empty());
    }
}
