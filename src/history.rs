//! Seed conversation history loaded from disk at startup
//!
//! The seed file is a JSON array of `{ "role": "user" | "model", "message": "..." }`
//! records. A missing or malformed file never prevents startup: the session
//! starts empty and the outcome is kept as a `SeedStatus` for diagnostics.

use crate::llm::{Role, Turn};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// On-disk record shape
#[derive(Debug, Deserialize)]
struct SeedRecord {
    role: Role,
    message: String,
}

impl From<SeedRecord> for Turn {
    fn from(record: SeedRecord) -> Self {
        Turn {
            role: record.role,
            text: record.message,
        }
    }
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("failed to read seed history: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse seed history: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Outcome of loading the seed file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedStatus {
    Loaded { count: usize },
    Missing,
    Malformed { reason: String },
}

impl SeedStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SeedStatus::Loaded { .. } => "loaded",
            SeedStatus::Missing => "missing",
            SeedStatus::Malformed { .. } => "malformed",
        }
    }
}

/// Seed turns plus how they were obtained
#[derive(Debug, Clone)]
pub struct SeedHistory {
    pub turns: Vec<Turn>,
    pub status: SeedStatus,
}

/// Parse seed history, surfacing every failure.
pub fn try_load_history(path: &Path) -> Result<Vec<Turn>, HistoryError> {
    let data = std::fs::read_to_string(path)?;
    let records: Vec<SeedRecord> = serde_json::from_str(&data)?;
    Ok(records.into_iter().map(Turn::from).collect())
}

/// Load seed history, falling back to an empty history on any failure.
pub fn load_history(path: &Path) -> SeedHistory {
    match try_load_history(path) {
        Ok(turns) => {
            tracing::info!(path = %path.display(), turns = turns.len(), "Seed history loaded");
            SeedHistory {
                status: SeedStatus::Loaded { count: turns.len() },
                turns,
            }
        }
        Err(HistoryError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "Seed history not found, starting empty");
            SeedHistory {
                turns: Vec::new(),
                status: SeedStatus::Missing,
            }
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Seed history unusable, starting empty");
            SeedHistory {
                turns: Vec::new(),
                status: SeedStatus::Malformed {
                    reason: e.to_string(),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn seed_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_turns_in_file_order() {
        let file = seed_file(r#"[{"role":"user","message":"hi"},{"role":"model","message":"hello"}]"#);

        let seed = load_history(file.path());

        assert_eq!(seed.turns, vec![Turn::user("hi"), Turn::model("hello")]);
        assert_eq!(seed.status, SeedStatus::Loaded { count: 2 });
    }

    #[test]
    fn loading_twice_is_identical() {
        let file = seed_file(
            r#"[{"role":"user","message":"a"},{"role":"model","message":"b"},{"role":"user","message":"c"}]"#,
        );

        let first = load_history(file.path());
        let second = load_history(file.path());

        assert_eq!(first.turns, second.turns);
        assert_eq!(first.status, second.status);
    }

    #[test]
    fn missing_file_yields_empty_history() {
        let dir = tempfile::tempdir().unwrap();

        let seed = load_history(&dir.path().join("nope.json"));

        assert!(seed.turns.is_empty());
        assert_eq!(seed.status, SeedStatus::Missing);
    }

    #[test]
    fn malformed_json_yields_empty_history() {
        let file = seed_file("[{\"role\": \"user\", ");

        let seed = load_history(file.path());

        assert!(seed.turns.is_empty());
        assert_eq!(seed.status.label(), "malformed");
    }

    #[test]
    fn wrong_structure_is_malformed() {
        for contents in [
            r#"{"role":"user","message":"hi"}"#,
            r#"[{"role":"user"}]"#,
            r#"[{"role":"assistant","message":"hi"}]"#,
            r#"[{"role":"user","message":42}]"#,
        ] {
            let file = seed_file(contents);
            let seed = load_history(file.path());
            assert!(seed.turns.is_empty(), "{contents}");
            assert!(matches!(seed.status, SeedStatus::Malformed { .. }), "{contents}");
        }
    }

    #[test]
    fn empty_array_is_loaded() {
        let file = seed_file("[]");

        let seed = load_history(file.path());

        assert!(seed.turns.is_empty());
        assert_eq!(seed.status, SeedStatus::Loaded { count: 0 });
    }

    #[test]
    fn try_load_reports_parse_errors() {
        let file = seed_file("not json");
        assert!(matches!(try_load_history(file.path()), Err(HistoryError::Parse(_))));
    }
}
