//! Configuration management

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{self, Context, Result};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// NATS server URL
    pub nats_url: String,

    /// Optional NATS credentials (both must be set)
    pub nats_user: Option<String>,
    pub nats_password: Option<String>,

    /// PostgreSQL connection string
    pub database_url: String,

    /// JWT secret key for token validation
    pub jwt_secret: String,

    /// Directory holding stored uploads. Submissions may only name files in it.
    pub uploads_dir: PathBuf,

    /// Where failure reports are written
    pub reports_dir: PathBuf,

    /// How long a failure report stays on disk after the email is sent
    pub report_retention: Duration,

    /// Argon2 time cost for temporary account passwords
    pub password_hash_cost: u32,

    /// Resend API key. Without it emails are only logged.
    pub resend_api_key: Option<String>,

    pub email_from: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let nats_url = var("NATS_URL").unwrap_or_else(|| "nats://localhost:4222".to_string());

        let database_url = var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let jwt_secret = var("JWT_SECRET")
            .context("JWT_SECRET must be set — generate one with: openssl rand -base64 48")?;

        if jwt_secret.len() < 32 {
            anyhow::bail!(
                "JWT_SECRET must be at least 32 bytes (current: {} bytes). Generate one with: openssl rand -base64 48",
                jwt_secret.len()
            );
        }

        let report_retention_secs = match var("REPORT_RETENTION_SECS") {
            Some(v) => v
                .parse::<u64>()
                .with_context(|| format!("REPORT_RETENTION_SECS must be a number of seconds, got '{}'", v))?,
            None => 60,
        };

        let password_hash_cost = match var("PASSWORD_HASH_COST") {
            Some(v) => v
                .parse::<u32>()
                .ok()
                .filter(|cost| *cost >= 1)
                .with_context(|| format!("PASSWORD_HASH_COST must be a positive integer, got '{}'", v))?,
            None => 2,
        };

        Ok(Self {
            nats_url,
            nats_user: var("NATS_USER"),
            nats_password: var("NATS_PASSWORD"),
            database_url,
            jwt_secret,
            uploads_dir: var("UPLOADS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./uploads")),
            reports_dir: var("REPORTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./uploads")),
            report_retention: Duration::from_secs(report_retention_secs),
            password_hash_cost,
            resend_api_key: var("RESEND_API_KEY"),
            email_from: var("EMAIL_FROM_ADDRESS")
                .unwrap_or_else(|| "noreply@lmsportal.com".to_string()),
        })
    }
}
