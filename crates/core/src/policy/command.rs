//! External command policy
//!
//! Spawns a rule program once per evaluation. The program reads one JSON
//! object from stdin:
//!
//! ```text
//! {"path": "/tmp/a.txt", "time": "2024-01-03T14:30:00.000000000Z", "now": "..."}
//! ```
//!
//! and must print one JSON object with a boolean `allow` field on stdout.
//!
//! Rules are treated as arbitrary unless declared monotonic: a monotonic
//! rule never allows an entry while denying an older one, so sweeps may
//! stop at the first denial.

use super::{PolicyEngine, PolicyError, PolicyOutcome};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::SystemTime;
use tracing::debug;

/// Policy input document
#[derive(Debug, Serialize)]
struct PolicyInput<'a> {
    path: &'a str,
    time: String,
    now: String,
}

/// Policy backed by an external rule program
#[derive(Debug, Clone)]
pub struct CommandPolicy {
    program: PathBuf,
    args: Vec<String>,
    monotonic: bool,
}

impl CommandPolicy {
    /// Create a policy that runs `program` with `args`
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            monotonic: false,
        }
    }

    /// Declare whether the rule is monotonic in observation time
    pub fn with_monotonic(mut self, monotonic: bool) -> Self {
        self.monotonic = monotonic;
        self
    }

    /// Program invoked for each evaluation
    pub fn program(&self) -> &Path {
        &self.program
    }

    fn run(&self, input: &PolicyInput<'_>) -> Result<Value, PolicyError> {
        let payload = serde_json::to_vec(input)
            .map_err(|e| PolicyError::Evaluation(format!("encoding input: {}", e)))?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                PolicyError::Evaluation(format!("spawning {}: {}", self.program.display(), e))
            })?;

        // A program that decides without reading its input closes stdin early
        let write_result = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(&payload),
            None => Ok(()),
        };

        let output = child.wait_with_output().map_err(|e| {
            PolicyError::Evaluation(format!("waiting for {}: {}", self.program.display(), e))
        })?;

        if let Err(e) = write_result {
            if e.kind() != ErrorKind::BrokenPipe {
                return Err(PolicyError::Evaluation(format!("writing input: {}", e)));
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PolicyError::Evaluation(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| PolicyError::Evaluation(format!("parsing output: {}", e)))
    }
}

impl PolicyEngine for CommandPolicy {
    fn evaluate(&self, path: &Path, observed_at: SystemTime, now: SystemTime) -> PolicyOutcome {
        let path_str = path.to_string_lossy();
        let input = PolicyInput {
            path: &path_str,
            time: rfc3339(observed_at),
            now: rfc3339(now),
        };

        let outcome = match self.run(&input) {
            Ok(value) => interpret(&value),
            Err(e) => PolicyOutcome::Error(e),
        };
        debug!("Policy {} for {}: {:?}", self.program.display(), path.display(), outcome);
        outcome
    }

    fn is_monotonic(&self) -> bool {
        self.monotonic
    }
}

/// Map a decision document onto an outcome
fn interpret(value: &Value) -> PolicyOutcome {
    let Value::Object(doc) = value else {
        return PolicyOutcome::Error(PolicyError::UnexpectedType {
            found: json_kind(value).to_string(),
        });
    };

    match doc.get("allow") {
        None | Some(Value::Null) => PolicyOutcome::Error(PolicyError::Undefined),
        Some(Value::Bool(allow)) => PolicyOutcome::from(*allow),
        Some(other) => PolicyOutcome::Error(PolicyError::UnexpectedType {
            found: json_kind(other).to_string(),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn rfc3339(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339_opts(SecondsFormat::Nanos, true)
}
