//! Call trace log.
//!
//! Every surface call appends one JSON line to `<root>/traces.jsonl`.
//! Payloads are redacted first: AgentProfile carries a password field and
//! free-text fields can carry anything.

use crate::core::error::LedgerError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

pub const TRACE_LOG_NAME: &str = "traces.jsonl";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEvent {
    pub trace_id: String,
    pub ts: String,
    pub actor: String,
    pub op: String,
    pub request: Value,
    pub response: Value,
}

/// Key fragments whose values are dropped wholesale.
const SENSITIVE_KEYS: &[&str] = &["password", "passwd", "secret", "token", "authorization"];

static SECRET_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    let patterns: [(&str, &'static str); 4] = [
        (r"(?i)bearer\s+[a-zA-Z0-9_\-\.]{20,}", "[BEARER_REDACTED]"),
        (
            r"-----BEGIN (?:RSA |DSA |EC |OPENSSH )?PRIVATE KEY-----[\s\S]*?-----END (?:RSA |DSA |EC |OPENSSH )?PRIVATE KEY-----",
            "[PEM_KEY_REDACTED]",
        ),
        (
            r#"(?i)(postgres|mysql|mongodb|redis)://[^\s'"]+:[^\s'"]+@[^\s'"]+"#,
            "[CONNECTION_STRING_REDACTED]",
        ),
        (
            r#"(?i)(password|passwd|pwd)['"]?\s*[:=]\s*['"]?[^\s'"]{4,}['"]?"#,
            "[PASSWORD_REDACTED]",
        ),
    ];
    patterns
        .into_iter()
        .filter_map(|(re, replacement)| Regex::new(re).ok().map(|re| (re, replacement)))
        .collect()
});

pub fn redact_string(input: &str) -> String {
    let mut result = input.to_string();
    for (pattern, replacement) in SECRET_PATTERNS.iter() {
        result = pattern.replace_all(&result, *replacement).to_string();
    }
    result
}

/// Recursively redact a JSON value: sensitive keys lose their value,
/// every other string is scanned for secret patterns.
pub fn redact(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted_map = Map::new();
            for (key, val) in map {
                let lower_key = key.to_lowercase();
                if SENSITIVE_KEYS.iter().any(|k| lower_key.contains(k)) {
                    redacted_map.insert(key, Value::String("[REDACTED]".to_string()));
                } else {
                    redacted_map.insert(key, redact(val));
                }
            }
            Value::Object(redacted_map)
        }
        Value::Array(vec) => Value::Array(vec.into_iter().map(redact).collect()),
        Value::String(s) => Value::String(redact_string(&s)),
        other => other,
    }
}

pub fn trace_path(store_root: &Path) -> PathBuf {
    store_root.join(TRACE_LOG_NAME)
}

pub fn append_trace(store_root: &Path, event: TraceEvent) -> Result<(), LedgerError> {
    let path = trace_path(store_root);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let redacted_event = TraceEvent {
        request: redact(event.request),
        response: redact(event.response),
        ..event
    };

    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    writeln!(file, "{}", serde_json::to_string(&redacted_event)?)?;
    Ok(())
}

pub fn get_last_traces(store_root: &Path, n: usize) -> Result<Vec<TraceEvent>, LedgerError> {
    let path = trace_path(store_root);
    if !path.exists() {
        return Ok(vec![]);
    }
    let content = std::fs::read_to_string(path)?;
    let lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(n);
    lines[start..]
        .iter()
        .map(|l| serde_json::from_str(l).map_err(LedgerError::from))
        .collect()
}
