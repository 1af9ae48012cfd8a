//! LMS Worker - bulk CSV operations for the LMS portal
//!
//! This worker connects to NATS and processes administrator uploads of
//! student, teacher, course and enrollment records.

mod admin;
mod auth;
mod cli;
mod config;
mod db;
mod handlers;
mod pipeline;
mod services;
mod types;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::pipeline::Pipeline;
use crate::services::bulk::BatchJob;
use crate::types::OperationKey;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs directory - use LOGS_DIR env var or default to ../logs (relative to worker)
    let logs_dir = std::env::var("LOGS_DIR").unwrap_or_else(|_| "../logs".to_string());
    std::fs::create_dir_all(&logs_dir).ok();

    // File appender for persistent logs (daily rotation)
    let file_appender = RollingFileAppender::new(Rotation::DAILY, &logs_dir, "worker.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Initialize logging - both stdout and file
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,lms_worker=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer()) // stdout
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false)) // file
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    info!("Configuration loaded");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Migrate => {
            let pool = db::create_pool(&config.database_url).await?;
            db::run_migrations(&pool).await
        }
        Command::CreateAdmin { id } => {
            let pool = db::create_pool(&config.database_url).await?;
            admin::create_admin_interactive(&pool, &id).await
        }
        Command::Process {
            action,
            entity,
            file,
            notify,
        } => {
            let pool = db::create_pool(&config.database_url).await?;
            let pipeline = Pipeline::from_config(pool, &config)?;
            let key = OperationKey::new(action, entity);
            let operation = pipeline
                .registry
                .get(key)
                .with_context(|| format!("Unsupported operation: {}", key))?;

            let (summary, removal) = pipeline
                .executor
                .run_with_cleanup(BatchJob {
                    source: file,
                    recipient: notify,
                    operation,
                })
                .await;

            println!(
                "{}: {} succeeded, {} failed, {} unchanged{}",
                summary.operation,
                summary.success_count,
                summary.failures.len(),
                summary.no_op_count,
                if summary.committed { "" } else { " (rolled back)" }
            );
            if let (Some(path), Some(removal)) = (&summary.report_path, removal) {
                println!(
                    "Error report at {} is removed after {}s",
                    path.display(),
                    config.report_retention.as_secs()
                );
                removal.await.context("Report removal task failed")?;
            }
            Ok(())
        }
        Command::IssueToken { id, role, name } => {
            println!("{}", auth::generate_token(&id, role, &name, &config.jwt_secret)?);
            Ok(())
        }
    }
}

async fn serve(config: Config) -> Result<()> {
    info!("Starting LMS Worker...");

    // Connect to database
    let pool = db::create_pool(&config.database_url).await?;
    info!("Connected to PostgreSQL");

    db::run_migrations(&pool).await?;

    // Connect to NATS (supports optional NATS_USER/NATS_PASSWORD auth).
    let nats_client = match (&config.nats_user, &config.nats_password) {
        (Some(user), Some(password)) => {
            async_nats::ConnectOptions::new()
                .user_and_password(user.clone(), password.clone())
                .connect(&config.nats_url)
                .await?
        }
        _ => async_nats::connect(&config.nats_url).await?,
    };
    info!("Connected to NATS at {}", config.nats_url);

    let pipeline = Pipeline::from_config(pool, &config)?;

    // Start message handlers
    if let Err(e) = handlers::start_handlers(nats_client, pipeline, &config).await {
        error!("Handler error: {}", e);
        return Err(e);
    }

    Ok(())
}
