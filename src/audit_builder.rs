use chrono::Utc;
use serde::Serialize;
use tokio::{
    fs::{self, File, OpenOptions},
    io::AsyncWriteExt,
};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum What {
    ReindexStarted,
    BulkRequest,
    BulkResponseOk,
    BulkResponseErr,
    ReindexFinished,
}

/// One line of the audit file.
#[derive(Debug, Serialize)]
pub struct AuditRecord<'a> {
    pub timestamp: String,
    pub what: What,
    pub source_index: &'a str,
    pub target_index: &'a str,
    pub actions: u64,
    pub succeeded: u64,
    pub failed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Append-only JSON-lines audit trail of a reindex.
///
/// If the file cannot be opened the builder stays usable and records nothing.
#[derive(Debug)]
pub struct AuditBuilder {
    file_handler: Option<File>,
}

impl AuditBuilder {
    pub async fn new(file_name: &str) -> Self {
        // Create all parent dirs
        if let Some(parent) = std::path::Path::new(file_name).parent() {
            let _ = fs::create_dir_all(parent).await;
        }

        let file_handler = match OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_name)
            .await
        {
            Ok(file) => Some(file),
            Err(err) => {
                warn!("Audit disabled, cannot open {}: {}", file_name, err);
                None
            }
        };

        Self { file_handler }
    }

    /// Builder that records nothing.
    pub fn disabled() -> Self {
        Self { file_handler: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.file_handler.is_some()
    }

    pub async fn append_to_file(&mut self, data: &str) -> std::io::Result<()> {
        if let Some(file) = self.file_handler.as_mut() {
            file.write_all(data.as_bytes()).await?;
            file.flush().await?;
        }
        Ok(())
    }

    /// Writes `record` as one JSON line, stamping the current time.
    pub async fn record(&mut self, mut record: AuditRecord<'_>) {
        if !self.is_enabled() {
            return;
        }
        record.timestamp = Utc::now().to_rfc3339();
        let mut line = match serde_json::to_string(&record) {
            Ok(line) => line,
            Err(err) => {
                warn!("Failed to encode audit record: {}", err);
                return;
            }
        };
        line.push('\n');
        if let Err(err) = self.append_to_file(&line).await {
            warn!("Failed to append audit record: {}", err);
        }
    }
}
