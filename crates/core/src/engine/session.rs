use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use encoding_rs::Encoding;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout};
use tokio::sync::Mutex;

use crate::config::Settings;
use crate::engine::encode::{quote_atom, EncodedQuery};
use crate::engine::resolve::ExecutableResolver;
use crate::engine::{
    decode, EngineDiagnostics, EngineError, EngineInvoker, INVOCATION_TIMEOUT,
    RECOMMENDATION_RELATION,
};

// Sentinel lines delimiting one reply on the session's stdout. ASCII on
// purpose so they survive any output encoding.
const SENTINEL_CONSULT_OK: &str = "__asesor_ok__";
const SENTINEL_CONSULT_FAIL: &str = "__asesor_fail__";
const SENTINEL_DONE: &str = "__asesor_done__";
const SENTINEL_NONE: &str = "__asesor_none__";
const SENTINEL_ERROR: &str = "__asesor_error__";

/// Persistent-session strategy: one `swipl -q` child is spawned at startup,
/// the rule base is consulted exactly once, and every request issues a single
/// goal against the live session. Amortizes engine startup across requests.
///
/// The session is one shared mutable resource; all access is serialized behind
/// an async mutex, so concurrent requests queue rather than interleave on the
/// engine's stdio.
#[derive(Debug)]
pub struct BoundSessionStrategy {
    executable: String,
    rules_file: String,
    encoding: &'static Encoding,
    timeout: Duration,
    session: Mutex<BoundSession>,
}

impl BoundSessionStrategy {
    /// Spawn the session and consult the rule file. Any failure here is
    /// definitive: the caller is expected to install an invoker that fails
    /// fast instead of retrying per request.
    pub async fn start(settings: &Settings) -> Result<Self, EngineError> {
        let resolver = ExecutableResolver::from_settings(settings);
        let executable = resolver.resolve()?;
        let encoding = decode::resolve_encoding(settings.output_encoding.as_deref());

        let mut session = BoundSession::spawn(&executable)
            .map_err(|e| EngineError::Unavailable(format!("no se pudo iniciar la sesión Prolog: {e}")))?;

        session
            .send_goal(&consult_goal(&settings.rules_file))
            .await
            .map_err(|e| EngineError::Unavailable(format!("no se pudo consultar las reglas: {e}")))?;

        let reply = tokio::time::timeout(INVOCATION_TIMEOUT, session.read_reply(encoding))
            .await
            .map_err(|_| {
                EngineError::Unavailable("timeout cargando el archivo de reglas".to_string())
            })?
            .map_err(|e| EngineError::Unavailable(format!("fallo leyendo la sesión Prolog: {e}")))?;

        match reply.outcome {
            Outcome::ConsultOk => {
                tracing::info!(executable = %executable, rules_file = %settings.rules_file, "sesión Prolog iniciada");
                Ok(Self {
                    executable,
                    rules_file: settings.rules_file.clone(),
                    encoding,
                    timeout: INVOCATION_TIMEOUT,
                    session: Mutex::new(session),
                })
            }
            _ => Err(EngineError::Unavailable(format!(
                "no se pudo cargar el archivo de reglas {}",
                settings.rules_file
            ))),
        }
    }

    #[cfg(test)]
    fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait::async_trait]
impl EngineInvoker for BoundSessionStrategy {
    fn name(&self) -> &'static str {
        "bound"
    }

    fn diagnostics(&self) -> EngineDiagnostics {
        EngineDiagnostics {
            strategy: self.name(),
            binding_available: true,
            executable_detected: Some(self.executable.clone()),
            rules_file_found: Path::new(&self.rules_file).is_file(),
        }
    }

    async fn invoke(&self, query: &EncodedQuery) -> Result<Vec<String>, EngineError> {
        let mut session = self.session.lock().await;
        if session.poisoned {
            return Err(EngineError::Unavailable(
                "la sesión Prolog quedó fuera de sincronía y fue descartada".to_string(),
            ));
        }

        session
            .send_goal(&query_goal(query))
            .await
            .map_err(|e| EngineError::Query(format!("no se pudo escribir en la sesión Prolog: {e}")))?;

        // A timed-out or aborted read leaves this query's reply pending in the
        // pipe, where the next request would consume it as its own answer.
        // The session is unusable from that point on.
        let reply = match tokio::time::timeout(self.timeout, session.read_reply(self.encoding)).await
        {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                session.poisoned = true;
                return Err(EngineError::Query(format!(
                    "fallo leyendo la sesión Prolog: {e}"
                )));
            }
            Err(_) => {
                session.poisoned = true;
                return Err(EngineError::Query(
                    "timeout leyendo la sesión Prolog".to_string(),
                ));
            }
        };

        match reply.outcome {
            Outcome::Done => Ok(reply.lines),
            // The relation failed without raising: no advice for this profile.
            Outcome::NoSolution => Ok(Vec::new()),
            Outcome::Raised => Err(EngineError::Query(
                "la consulta Prolog lanzó una excepción".to_string(),
            )),
            Outcome::ConsultOk | Outcome::ConsultFail => Err(EngineError::Query(
                "respuesta inesperada de la sesión Prolog".to_string(),
            )),
        }
    }
}

#[derive(Debug)]
struct BoundSession {
    // Held so the child is killed when the strategy is dropped at shutdown.
    _child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    // Set once the session's stdio can no longer be trusted to be in sync.
    poisoned: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    ConsultOk,
    ConsultFail,
    Done,
    NoSolution,
    Raised,
}

struct SessionReply {
    lines: Vec<String>,
    outcome: Outcome,
}

impl BoundSession {
    fn spawn(program: &str) -> io::Result<Self> {
        let mut child = tokio::process::Command::new(program)
            .arg("-q")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child.stdin.take().ok_or_else(|| {
            io::Error::new(io::ErrorKind::BrokenPipe, "stdin de la sesión no disponible")
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            io::Error::new(io::ErrorKind::BrokenPipe, "stdout de la sesión no disponible")
        })?;

        Ok(Self {
            _child: child,
            stdin,
            stdout: BufReader::new(stdout),
            poisoned: false,
        })
    }

    async fn send_goal(&mut self, goal: &str) -> io::Result<()> {
        self.stdin.write_all(goal.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await
    }

    /// Collect output lines until a sentinel shows up. Bytes are decoded per
    /// line with the configured encoding (replacement chars on bad input), so
    /// a corrupt line never kills the session.
    async fn read_reply(&mut self, encoding: &'static Encoding) -> io::Result<SessionReply> {
        let mut lines = Vec::new();
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let n = self.stdout.read_until(b'\n', &mut buf).await?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "la sesión Prolog terminó inesperadamente",
                ));
            }
            let (decoded, _, _) = encoding.decode(&buf);
            let line = decoded.trim();
            let outcome = match line {
                "" => continue,
                SENTINEL_CONSULT_OK => Outcome::ConsultOk,
                SENTINEL_CONSULT_FAIL => Outcome::ConsultFail,
                SENTINEL_DONE => Outcome::Done,
                SENTINEL_NONE => Outcome::NoSolution,
                SENTINEL_ERROR => Outcome::Raised,
                _ => {
                    lines.push(line.to_string());
                    continue;
                }
            };
            return Ok(SessionReply { lines, outcome });
        }
    }
}

/// Goal sent once at startup: consult the rule base and acknowledge.
fn consult_goal(rules_file: &str) -> String {
    format!(
        "( consult({rules}) -> writeln('{ok}') ; writeln('{fail}') ), flush_output.",
        rules = quote_atom(rules_file),
        ok = SENTINEL_CONSULT_OK,
        fail = SENTINEL_CONSULT_FAIL,
    )
}

/// Goal sent per request: bind the profile, print each recommendation, and
/// close with a sentinel on every outcome (solution, no solution, exception).
fn query_goal(query: &EncodedQuery) -> String {
    format!(
        "catch(( {relation}({perfil}, Recs) -> maplist(writeln, Recs), writeln('{done}') ; writeln('{none}') ), E, ( print_message(error, E), writeln('{error}') )), flush_output.",
        relation = RECOMMENDATION_RELATION,
        perfil = query.as_str(),
        done = SENTINEL_DONE,
        none = SENTINEL_NONE,
        error = SENTINEL_ERROR,
    )
}
