//! Append-only JSONL audit trail of validation outcomes.
//!
//! Submissions are identified by a SHA-256 fingerprint of their canonical
//! JSON, salted with the session id; field values never reach the log.

use crate::rules::FieldError;
use crate::schema::{SchemaError, Validation};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct AuditLog {
    pub path: PathBuf,
    session_id: String,
    file: File,
}

#[derive(Serialize)]
struct Event<'a> {
    ts: DateTime<Utc>,
    session_id: &'a str,
    #[serde(rename = "type")]
    event_type: &'a str,
    #[serde(flatten)]
    data: serde_json::Value,
}

impl AuditLog {
    pub fn new(path: &Path, session_id: &str) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            session_id: session_id.to_string(),
            file,
        })
    }

    /// Open `<dir>/<session_id>.jsonl`, creating the directory if needed
    pub fn in_dir(dir: &Path, session_id: &str) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        Self::new(&dir.join(format!("{}.jsonl", session_id)), session_id)
    }

    pub fn log(&mut self, event_type: &str, data: serde_json::Value) -> Result<()> {
        let event = Event {
            ts: Utc::now(),
            session_id: &self.session_id,
            event_type,
            data,
        };
        let line = serde_json::to_string(&event)?;
        writeln!(self.file, "{}", line)?;
        self.file.flush()?;
        Ok(())
    }

    pub fn session_start(&mut self, mode: &str) -> Result<()> {
        self.log(
            "session_start",
            serde_json::json!({ "mode": mode, "version": env!("CARGO_PKG_VERSION") }),
        )
    }

    /// Log the outcome of one validation
    pub fn validation(
        &mut self,
        source: &str,
        raw: &serde_json::Value,
        outcome: &Validation,
    ) -> Result<()> {
        let fingerprint = fingerprint(&self.session_id, raw);
        match outcome {
            Validation::Valid { value } => self.log(
                "validation_passed",
                serde_json::json!({
                    "source": source,
                    "fingerprint": fingerprint,
                    "fields": value.present_fields(),
                }),
            ),
            Validation::Invalid { errors } => self.log(
                "validation_failed",
                serde_json::json!({
                    "source": source,
                    "fingerprint": fingerprint,
                    "errors": error_summary(errors),
                }),
            ),
        }
    }

    /// Log a submission the validator could not evaluate
    pub fn internal_error(
        &mut self,
        source: &str,
        raw: &serde_json::Value,
        error: &SchemaError,
    ) -> Result<()> {
        let fingerprint = fingerprint(&self.session_id, raw);
        self.log(
            "internal_error",
            serde_json::json!({
                "source": source,
                "fingerprint": fingerprint,
                "error": error.to_string(),
            }),
        )
    }
}

/// Field and kind of each error, without the message text
fn error_summary(errors: &[FieldError]) -> Vec<serde_json::Value> {
    errors
        .iter()
        .map(|e| serde_json::json!({ "field": e.field, "kind": e.kind }))
        .collect()
}

/// Hex SHA-256 of the session id, a NUL byte and the submission's JSON text.
/// `serde_json` keeps object keys sorted, so equal submissions hash equally
/// within a session.
pub fn fingerprint(session_id: &str, raw: &serde_json::Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(session_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(raw.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RulesConfig;
    use crate::schema::Validator;
    use serde_json::json;
    use tempfile::TempDir;

    fn read_events(path: &Path) -> Vec<serde_json::Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_fingerprint_ignores_key_order() {
        let a = json!({"businessName": "Pan", "whatsapp": "+51987654321"});
        let b = json!({"whatsapp": "+51987654321", "businessName": "Pan"});
        assert_eq!(fingerprint("s1", &a), fingerprint("s1", &b));
        assert_eq!(fingerprint("s1", &a).len(), 64);
        assert_ne!(fingerprint("s1", &a), fingerprint("s1", &json!({})));
    }

    #[test]
    fn test_fingerprint_salted_by_session() {
        let form = json!({"businessName": "Pan y Vino", "whatsapp": "+34612345678"});
        assert_ne!(fingerprint("s1", &form), fingerprint("s2", &form));

        let unsalted = format!("{:x}", Sha256::digest(form.to_string().as_bytes()));
        assert_ne!(fingerprint("s1", &form), unsalted);
        assert_ne!(fingerprint("", &form), unsalted);
    }

    #[test]
    fn test_logs_outcomes_without_values() {
        let dir = TempDir::new().unwrap();
        let mut log = AuditLog::in_dir(&dir.path().join("audit"), "session-1").unwrap();
        let validator = Validator::new(&RulesConfig::builtin());

        log.session_start("batch").unwrap();

        let ok = json!({"businessName": "Café Paradiso", "whatsapp": "+51987654321"});
        log.validation("ok.json", &ok, &validator.validate(&ok).unwrap())
            .unwrap();

        let bad = json!({"businessName": "Café Paradiso", "email": "x@yopmail.com"});
        log.validation("bad.json", &bad, &validator.validate(&bad).unwrap())
            .unwrap();

        let broken = json!({"businessName": 7});
        let err = validator.validate(&broken).unwrap_err();
        log.internal_error("broken.json", &broken, &err).unwrap();

        let events = read_events(&log.path);
        assert_eq!(events.len(), 4);
        assert!(events.iter().all(|e| e["session_id"] == "session-1"));

        assert_eq!(events[0]["type"], "session_start");
        assert_eq!(events[1]["type"], "validation_passed");
        assert_eq!(events[1]["fields"], json!(["businessName", "whatsapp"]));

        assert_eq!(events[2]["type"], "validation_failed");
        assert_eq!(
            events[2]["errors"],
            json!([
                {"field": "email", "kind": "denied_value"},
                {"field": "whatsapp", "kind": "required"}
            ])
        );

        assert_eq!(events[3]["type"], "internal_error");
        assert_eq!(events[1]["fingerprint"], fingerprint("session-1", &ok));
        assert_eq!(events[3]["fingerprint"], fingerprint("session-1", &broken));
        let text = std::fs::read_to_string(&log.path).unwrap();
        assert!(!text.contains("Café Paradiso"));
        assert!(!text.contains("yopmail"));
    }
}
