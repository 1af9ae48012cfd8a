//! NATS message handlers

pub mod bulk;
pub mod ping;

use std::sync::Arc;

use anyhow::Result;
use async_nats::Client;
use tokio::select;
use tracing::{error, info};

use crate::config::Config;
use crate::pipeline::Pipeline;

pub const SUBJECT_PING: &str = "lms.ping";
pub const SUBJECT_BULK_SUBMIT: &str = "lms.bulk.submit";

/// Start all message handlers. Returns when any of them stops.
pub async fn start_handlers(client: Client, pipeline: Pipeline, config: &Config) -> Result<()> {
    info!("Starting message handlers...");

    let pipeline = Arc::new(pipeline);
    let jwt_secret: Arc<str> = Arc::from(config.jwt_secret.as_str());

    let ping_sub = client.subscribe(SUBJECT_PING).await?;
    let bulk_submit_sub = client.subscribe(SUBJECT_BULK_SUBMIT).await?;
    info!("Subscribed to {}, {}", SUBJECT_PING, SUBJECT_BULK_SUBMIT);

    let client_ping = client.clone();
    let ping_handle = tokio::spawn(async move {
        ping::handle_ping(client_ping, ping_sub).await
    });

    let client_bulk = client.clone();
    let bulk_submit_handle = tokio::spawn(async move {
        bulk::handle_submit(client_bulk, bulk_submit_sub, pipeline, jwt_secret).await
    });

    info!("All handlers started, waiting for messages...");

    select! {
        result = ping_handle => {
            error!("Ping handler finished: {:?}", result);
        }
        result = bulk_submit_handle => {
            error!("Bulk submit handler finished: {:?}", result);
        }
    }

    Ok(())
}
