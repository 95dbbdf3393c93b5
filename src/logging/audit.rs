//! Security audit trail
//!
//! Logs authentication and authorization events in JSONL format. Events
//! carry ids and short reason codes only: never tokens, passwords,
//! ciphertext or decrypted values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

/// Audit event types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    LoginSucceeded,
    LoginFailed,
    /// A presented token did not verify
    TokenRejected,
    /// A verified identity was refused (inactive account, role, ownership)
    AccessDenied,
    TokenRefreshed,
    /// A sensitive field was encrypted and handed back for storage
    SensitiveFieldWritten,
}

/// One line of the audit log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventType,
    /// Account id (if known)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    /// Short machine-readable cause
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Field name or resource the event concerns
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type,
            subject_id: None,
            reason: None,
            target: None,
        }
    }

    pub fn with_subject(mut self, subject_id: impl Into<String>) -> Self {
        self.subject_id = Some(subject_id.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Convert to JSONL line
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Audit logger that appends events to a JSONL file.
/// Without a file it accepts and drops events.
#[derive(Clone, Default)]
pub struct AuditLogger {
    inner: Arc<Mutex<AuditLoggerInner>>,
}

#[derive(Default)]
struct AuditLoggerInner {
    writer: Option<BufWriter<File>>,
    path: Option<PathBuf>,
}

impl AuditLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialize file logging to the specified path
    pub async fn init_file(&self, path: PathBuf) -> std::io::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        let mut inner = self.inner.lock().await;
        inner.writer = Some(BufWriter::new(file));
        inner.path = Some(path.clone());

        info!("Audit logging initialized to {}", path.display());
        Ok(())
    }

    pub async fn path(&self) -> Option<PathBuf> {
        self.inner.lock().await.path.clone()
    }

    /// Log an audit event
    pub async fn log(&self, event: AuditEvent) {
        let mut inner = self.inner.lock().await;
        let Some(writer) = inner.writer.as_mut() else {
            return;
        };

        let jsonl = match event.to_jsonl() {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to serialize audit event: {}", e);
                return;
            }
        };

        if let Err(e) = writeln!(writer, "{}", jsonl) {
            error!("Failed to write audit event: {}", e);
        }
        if let Err(e) = writer.flush() {
            error!("Failed to flush audit log: {}", e);
        }
    }

    pub async fn log_login(&self, success: bool, subject_id: Option<&str>, reason: &str) {
        let event_type = if success {
            AuditEventType::LoginSucceeded
        } else {
            AuditEventType::LoginFailed
        };
        let mut event = AuditEvent::new(event_type).with_reason(reason);
        if let Some(id) = subject_id {
            event = event.with_subject(id);
        }
        self.log(event).await;
    }

    pub async fn log_token_rejected(&self, reason: &str) {
        self.log(AuditEvent::new(AuditEventType::TokenRejected).with_reason(reason))
            .await;
    }

    pub async fn log_access_denied(&self, subject_id: &str, reason: &str, target: Option<&str>) {
        let mut event = AuditEvent::new(AuditEventType::AccessDenied)
            .with_subject(subject_id)
            .with_reason(reason);
        if let Some(t) = target {
            event = event.with_target(t);
        }
        self.log(event).await;
    }

    pub async fn log_refresh(&self, subject_id: &str) {
        self.log(AuditEvent::new(AuditEventType::TokenRefreshed).with_subject(subject_id))
            .await;
    }

    pub async fn log_field_written(&self, subject_id: &str, field: &str) {
        self.log(
            AuditEvent::new(AuditEventType::SensitiveFieldWritten)
                .with_subject(subject_id)
                .with_target(field),
        )
        .await;
    }
}
