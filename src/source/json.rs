//! JSON / JSONL file source
//!
//! `path` is a file or a glob pattern. `.jsonl` / `.ndjson` files hold one
//! row object per line; anything else is parsed as a JSON array of row objects
//! (or a single object).

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::{LeadSource, SourceBatch};
use crate::error::{DialerError, Result};
use crate::reconcile::{ReconcileMode, SourceRow};

pub struct JsonSource {
    id: String,
    pattern: String,
    mode: ReconcileMode,
}

impl JsonSource {
    pub fn new(id: impl Into<String>, pattern: impl Into<String>, mode: ReconcileMode) -> Self {
        Self {
            id: id.into(),
            pattern: pattern.into(),
            mode,
        }
    }

    /// Files matching the pattern, sorted for a stable batch tag
    fn files(&self) -> Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = glob::glob(&self.pattern)
            .map_err(|e| DialerError::source(format!("bad pattern '{}': {}", self.pattern, e)))?
            .filter_map(|entry| entry.ok())
            .filter(|p| p.is_file())
            .collect();
        files.sort();
        Ok(files)
    }

    fn is_line_delimited(path: &Path) -> bool {
        matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("jsonl") | Some("ndjson")
        )
    }

    fn parse_file(path: &Path, content: &str, batch: &mut SourceBatch) {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        if Self::is_line_delimited(path) {
            for (idx, line) in content.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                let reference = format!("{}:{}", file_name, idx + 1);
                match serde_json::from_str::<SourceRow>(line) {
                    Ok(mut row) => {
                        row.external_ref = Some(reference);
                        batch.rows.push(row);
                    }
                    Err(e) => {
                        warn!(row = %reference, error = %e, "undecodable line");
                        batch.errors.push(format!("{}: {}", reference, e));
                    }
                }
            }
            return;
        }

        let value: serde_json::Value = match serde_json::from_str(content) {
            Ok(v) => v,
            Err(e) => {
                batch.errors.push(format!("{}: {}", file_name, e));
                return;
            }
        };

        let items = match value {
            serde_json::Value::Array(items) => items,
            obj @ serde_json::Value::Object(_) => vec![obj],
            _ => {
                batch
                    .errors
                    .push(format!("{}: expected an array of rows", file_name));
                return;
            }
        };

        for (idx, item) in items.into_iter().enumerate() {
            let reference = format!("{}:{}", file_name, idx + 1);
            match serde_json::from_value::<SourceRow>(item) {
                Ok(mut row) => {
                    row.external_ref = Some(reference);
                    batch.rows.push(row);
                }
                Err(e) => batch.errors.push(format!("{}: {}", reference, e)),
            }
        }
    }
}

impl LeadSource for JsonSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> String {
        format!("JSON rows from {}", self.pattern)
    }

    fn mode(&self) -> ReconcileMode {
        self.mode
    }

    fn is_available(&self) -> bool {
        self.files().map(|f| !f.is_empty()).unwrap_or(false)
    }

    fn load(&self) -> Result<SourceBatch> {
        let files = self.files()?;
        if files.is_empty() {
            return Err(DialerError::source(format!(
                "no files match '{}'",
                self.pattern
            )));
        }

        let mut hasher = Sha256::new();
        let mut batch = SourceBatch::default();

        for path in &files {
            let content = match std::fs::read_to_string(path) {
                Ok(content) => content,
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "unreadable source file");
                    batch.errors.push(format!("{}: {}", path.display(), e));
                    continue;
                }
            };
            hasher.update(path.file_name().map(|n| n.as_encoded_bytes()).unwrap_or_default());
            hasher.update(content.as_bytes());
            Self::parse_file(path, &content, &mut batch);
            debug!(file = %path.display(), rows = batch.rows.len(), "source file read");
        }

        let digest = hex::encode(hasher.finalize());
        batch.tag = format!("batch-{}", &digest[..12]);
        Ok(batch)
    }
}
