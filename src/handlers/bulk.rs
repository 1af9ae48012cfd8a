//! Bulk submission handler
//!
//! Replies as soon as the job is admitted; the batch itself runs on its own
//! task and reports back by email only.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use async_nats::{Client, Subscriber};
use futures::StreamExt;
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

use crate::auth::extract_auth;
use crate::pipeline::Pipeline;
use crate::services::bulk::{remove_file, BatchJob, OperationRegistry};
use crate::types::{BulkSubmitRequest, BulkSubmitResponse, ErrorResponse, Request, SuccessResponse};

/// Resolve a submitted path to an existing file inside `uploads_dir`.
/// Relative paths are taken relative to `uploads_dir`.
async fn confine(uploads_dir: &Path, file_path: &str) -> Result<PathBuf, String> {
    let root = tokio::fs::canonicalize(uploads_dir)
        .await
        .map_err(|e| format!("Uploads directory {} unavailable: {}", uploads_dir.display(), e))?;
    let candidate = root.join(file_path);
    let resolved = tokio::fs::canonicalize(&candidate)
        .await
        .map_err(|_| format!("Uploaded file not found: {}", file_path))?;

    if resolved == root || !resolved.starts_with(&root) {
        return Err(format!("File is outside the uploads directory: {}", file_path));
    }
    Ok(resolved)
}

/// Check the caller, the uploaded file and the requested operation. On
/// success returns the acknowledgement and the job to run.
pub async fn admit(
    registry: &OperationRegistry,
    uploads_dir: &Path,
    jwt_secret: &str,
    request: &Request<BulkSubmitRequest>,
) -> Result<(BulkSubmitResponse, BatchJob), ErrorResponse> {
    let auth = extract_auth(request, jwt_secret)
        .map_err(|e| ErrorResponse::new(request.id, "UNAUTHORIZED", e.to_string()))?;
    auth.require_admin()
        .map_err(|e| ErrorResponse::new(request.id, "FORBIDDEN", e.to_string()))?;

    let payload = &request.payload;
    let source = confine(uploads_dir, &payload.file_path).await.map_err(|message| {
        warn!("Refused file path from {}: {}", auth.user_id, message);
        ErrorResponse::new(request.id, "INVALID_REQUEST", message)
    })?;
    let key = payload.key();

    let Some(operation) = registry.get(key) else {
        warn!("Unsupported bulk operation {} requested by {}", key, auth.user_id);
        remove_file(&source).await;
        return Err(ErrorResponse::new(
            request.id,
            "UNSUPPORTED_OPERATION",
            format!("Unsupported operation: {}", key),
        ));
    };

    let response = BulkSubmitResponse {
        job_id: Uuid::new_v4(),
        operation: operation.label().to_string(),
        message: format!(
            "File received. Processing has started. A report will be emailed to {}.",
            payload.notify_email
        ),
    };
    let job = BatchJob {
        source,
        recipient: payload.notify_email.clone(),
        operation,
    };
    Ok((response, job))
}

/// Handle lms.bulk.submit messages
pub async fn handle_submit(
    client: Client,
    mut subscriber: Subscriber,
    pipeline: Arc<Pipeline>,
    jwt_secret: Arc<str>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received bulk.submit message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Message without reply subject");
                continue;
            }
        };

        let request: Request<BulkSubmitRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        match admit(&pipeline.registry, &pipeline.uploads_dir, &jwt_secret, &request).await {
            Ok((response, job)) => {
                info!(
                    job_id = %response.job_id,
                    "Accepted {} from {}",
                    response.operation,
                    job.source.display()
                );
                let span = tracing::info_span!("bulk_job", job_id = %response.job_id);
                let success = SuccessResponse::new(request.id, response);
                let _ = client.publish(reply, serde_json::to_vec(&success)?.into()).await;

                let pipeline = Arc::clone(&pipeline);
                tokio::spawn(
                    async move {
                        pipeline.executor.run(job).await;
                    }
                    .instrument(span),
                );
            }
            Err(error) => {
                warn!("Rejected bulk submission: {}", error.error.message);
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}
