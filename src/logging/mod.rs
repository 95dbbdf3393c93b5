//! Logging infrastructure for artisan-auth
//!
//! Process-wide `tracing` setup plus the JSONL security audit trail.

pub mod audit;

pub use audit::{AuditEvent, AuditEventType, AuditLogger};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence; otherwise this crate logs at `level` and
/// everything else at `info`.
pub fn init_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("artisan_auth={},info", level).into());

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}
