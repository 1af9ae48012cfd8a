//! Wiring of the bulk pipeline shared by the NATS handlers and the CLI.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use sqlx::PgPool;
use tracing::info;

use crate::auth::Argon2Hasher;
use crate::config::Config;
use crate::db::PgBatchStore;
use crate::services::bulk::{BatchExecutor, EmailReportNotifier, ErrorReporter, OperationRegistry};
use crate::services::email_sender::{EmailSender, LogEmailSender, ResendEmailSender};

pub struct Pipeline {
    pub registry: OperationRegistry,
    pub executor: BatchExecutor,
    /// Only files under this directory may be submitted
    pub uploads_dir: PathBuf,
}

impl Pipeline {
    pub fn from_config(pool: PgPool, config: &Config) -> Result<Self> {
        let hasher = Arc::new(Argon2Hasher::new(config.password_hash_cost)?);
        let registry = OperationRegistry::new(hasher);
        anyhow::ensure!(!registry.is_empty(), "No bulk operations registered");
        info!("Operation registry initialized with {} operations", registry.len());

        let notifier = Arc::new(EmailReportNotifier::new(email_sender(config)));
        let reporter = ErrorReporter::new(&config.reports_dir, config.report_retention);
        let executor = BatchExecutor::new(Arc::new(PgBatchStore::new(pool)), notifier, reporter);

        Ok(Self {
            registry,
            executor,
            uploads_dir: config.uploads_dir.clone(),
        })
    }
}

/// Resend when an API key is configured, otherwise log-only delivery.
pub fn email_sender(config: &Config) -> Arc<dyn EmailSender> {
    match &config.resend_api_key {
        Some(key) => {
            info!("Email delivery via Resend from {}", config.email_from);
            Arc::new(ResendEmailSender::new(key.clone(), config.email_from.clone()))
        }
        None => {
            info!("RESEND_API_KEY not set, emails will only be logged");
            Arc::new(LogEmailSender)
        }
    }
}
