use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::engine::EngineError;

pub const ENGINE_EXECUTABLE: &str = "swipl";

/// Ordered discovery of the engine executable:
/// 1. explicit override from the environment (quotes stripped, variables
///    expanded; used verbatim whether or not it names an existing path),
/// 2. PATH lookup for `swipl` (plus `.exe` on Windows),
/// 3. well-known install locations for the host platform.
#[derive(Debug, Clone)]
pub struct ExecutableResolver {
    override_cmd: Option<String>,
}

impl ExecutableResolver {
    pub fn new(override_cmd: Option<String>) -> Self {
        Self { override_cmd }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.engine_cmd.clone())
    }

    pub fn resolve(&self) -> Result<String, EngineError> {
        self.resolve_with(env::var_os("PATH").as_deref(), &well_known_paths())
    }

    fn resolve_with(
        &self,
        path_var: Option<&OsStr>,
        well_known: &[PathBuf],
    ) -> Result<String, EngineError> {
        if let Some(cmd) = self.cleaned_override() {
            // An existing path is used verbatim; anything else is handed to the
            // OS as a bare command name.
            return Ok(cmd);
        }
        if let Some(path_var) = path_var {
            if let Some(found) = find_in_path(ENGINE_EXECUTABLE, path_var) {
                return Ok(found.to_string_lossy().into_owned());
            }
        }
        if let Some(found) = well_known.iter().find(|p| p.is_file()) {
            return Ok(found.to_string_lossy().into_owned());
        }
        Err(EngineError::Unavailable(
            "no se encontró el ejecutable swipl; configure SWIPL_CMD o añádalo al PATH".to_string(),
        ))
    }

    /// Health-check variant: only reports an executable it can actually see on
    /// disk, unlike `resolve`, which trusts an explicit override.
    pub fn detect(&self) -> Option<String> {
        self.detect_with(env::var_os("PATH").as_deref(), &well_known_paths())
    }

    fn detect_with(&self, path_var: Option<&OsStr>, well_known: &[PathBuf]) -> Option<String> {
        if let Some(cmd) = self.cleaned_override() {
            if Path::new(&cmd).is_file() {
                return Some(cmd);
            }
            if let Some(path_var) = path_var {
                if let Some(found) = find_in_path(&cmd, path_var) {
                    return Some(found.to_string_lossy().into_owned());
                }
            }
        }
        if let Some(path_var) = path_var {
            if let Some(found) = find_in_path(ENGINE_EXECUTABLE, path_var) {
                return Some(found.to_string_lossy().into_owned());
            }
        }
        well_known
            .iter()
            .find(|p| p.is_file())
            .map(|p| p.to_string_lossy().into_owned())
    }

    fn cleaned_override(&self) -> Option<String> {
        let raw = self.override_cmd.as_deref()?;
        let cmd = expand_env_vars(strip_quotes(raw), |name| env::var(name).ok());
        (!cmd.is_empty()).then_some(cmd)
    }
}

fn strip_quotes(raw: &str) -> &str {
    raw.trim().trim_matches(|c| c == '"' || c == '\'')
}

/// `${VAR}`, `$VAR` and `%VAR%` expansion. References to unset variables are
/// left untouched.
fn expand_env_vars(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(idx) = rest.find(['$', '%']) {
        out.push_str(&rest[..idx]);
        let tail = &rest[idx..];
        let (replacement, consumed) = expand_one(tail, &lookup);
        out.push_str(&replacement);
        rest = &tail[consumed..];
    }
    out.push_str(rest);
    out
}

fn expand_one(tail: &str, lookup: &impl Fn(&str) -> Option<String>) -> (String, usize) {
    if let Some(body) = tail.strip_prefix("${") {
        if let Some(end) = body.find('}') {
            let consumed = end + 3;
            if let Some(val) = lookup(&body[..end]) {
                return (val, consumed);
            }
            return (tail[..consumed].to_string(), consumed);
        }
        return ("$".to_string(), 1);
    }
    if let Some(body) = tail.strip_prefix('$') {
        let len: usize = body
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
            .map(char::len_utf8)
            .sum();
        if len == 0 {
            return ("$".to_string(), 1);
        }
        let consumed = len + 1;
        return match lookup(&body[..len]) {
            Some(val) => (val, consumed),
            None => (tail[..consumed].to_string(), consumed),
        };
    }
    if let Some(body) = tail.strip_prefix('%') {
        if let Some(end) = body.find('%') {
            let consumed = end + 2;
            if end > 0 {
                if let Some(val) = lookup(&body[..end]) {
                    return (val, consumed);
                }
            }
            return (tail[..consumed].to_string(), consumed);
        }
        return ("%".to_string(), 1);
    }
    (tail[..1].to_string(), 1)
}

fn find_in_path(name: &str, path_var: &OsStr) -> Option<PathBuf> {
    for dir in env::split_paths(path_var) {
        if dir.as_os_str().is_empty() {
            continue;
        }
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
        if cfg!(windows) && !name.to_lowercase().ends_with(".exe") {
            let candidate = dir.join(format!("{name}.exe"));
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}

fn well_known_paths() -> Vec<PathBuf> {
    let paths: &[&str] = if cfg!(windows) {
        &[
            r"C:\Program Files\swipl\bin\swipl.exe",
            r"C:\Program Files (x86)\swipl\bin\swipl.exe",
            r"C:\Program Files\swipl\swipl.exe",
        ]
    } else {
        &["/usr/bin/swipl", "/usr/local/bin/swipl", "/opt/homebrew/bin/swipl"]
    };
    paths.iter().map(PathBuf::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "SWI_HOME" => Some("/opt/swi".to_string()),
            "BIN" => Some("bin".to_string()),
            _ => None,
        }
    }

    #[test]
    fn strips_surrounding_quotes_and_whitespace() {
        assert_eq!(strip_quotes("  \"swipl\"  "), "swipl");
        assert_eq!(strip_quotes("'/usr/bin/swipl'"), "/usr/bin/swipl");
        assert_eq!(strip_quotes("swipl"), "swipl");
    }

    #[test]
    fn expands_known_variables_in_both_forms() {
        assert_eq!(
            expand_env_vars("${SWI_HOME}/$BIN/swipl", lookup),
            "/opt/swi/bin/swipl"
        );
        assert_eq!(expand_env_vars("%SWI_HOME%\\swipl.exe", lookup), "/opt/swi\\swipl.exe");
    }

    #[test]
    fn leaves_unknown_variables_untouched() {
        assert_eq!(expand_env_vars("${NOPE}/swipl", lookup), "${NOPE}/swipl");
        assert_eq!(expand_env_vars("$NOPE/swipl", lookup), "$NOPE/swipl");
        assert_eq!(expand_env_vars("a $ b", lookup), "a $ b");
    }

    #[test]
    fn override_wins_over_everything_even_as_bare_name() {
        let resolver = ExecutableResolver::new(Some("\"mi-swipl\"".to_string()));
        let resolved = resolver.resolve_with(None, &[]).unwrap();
        assert_eq!(resolved, "mi-swipl");
    }

    #[test]
    fn path_lookup_finds_the_executable() {
        let dir = TempDir::new().unwrap();
        let exe = dir.path().join(ENGINE_EXECUTABLE);
        std::fs::write(&exe, b"").unwrap();
        let path_var = env::join_paths([dir.path().to_path_buf()]).unwrap();

        let resolver = ExecutableResolver::new(None);
        let resolved = resolver.resolve_with(Some(path_var.as_os_str()), &[]).unwrap();
        assert_eq!(resolved, exe.to_string_lossy());
    }

    #[test]
    fn well_known_paths_are_the_last_resort() {
        let dir = TempDir::new().unwrap();
        let exe = dir.path().join("swipl");
        std::fs::write(&exe, b"").unwrap();

        let resolver = ExecutableResolver::new(None);
        let resolved = resolver.resolve_with(None, &[exe.clone()]).unwrap();
        assert_eq!(resolved, exe.to_string_lossy());
    }

    #[test]
    fn nothing_resolves_to_unavailable() {
        let resolver = ExecutableResolver::new(None);
        let err = resolver.resolve_with(None, &[]).unwrap_err();
        assert!(matches!(err, EngineError::Unavailable(_)));
    }

    #[test]
    fn detect_reports_nothing_when_override_points_nowhere() {
        let resolver = ExecutableResolver::new(Some("/no/such/swipl".to_string()));
        assert_eq!(resolver.detect_with(None, &[]), None);
    }

    #[test]
    fn detect_reports_existing_override_path() {
        let dir = TempDir::new().unwrap();
        let exe = dir.path().join("swipl");
        std::fs::write(&exe, b"").unwrap();

        let resolver = ExecutableResolver::new(Some(exe.to_string_lossy().into_owned()));
        assert_eq!(
            resolver.detect_with(None, &[]),
            Some(exe.to_string_lossy().into_owned())
        );
    }
}
