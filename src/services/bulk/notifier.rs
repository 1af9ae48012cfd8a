//! Completion notification for a batch.
//!
//! Delivery is best-effort: by the time a report is sent the data change has
//! already been committed or rolled back, so a failed send is logged and
//! dropped.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use super::report::RowFailure;
use crate::services::email_sender::{EmailAttachment, EmailSender};
use crate::services::email_templates::BulkReportEmail;

/// Everything the administrator is told about a finished batch.
#[derive(Debug, Clone, Copy)]
pub struct BatchReport<'a> {
    pub recipient: &'a str,
    pub operation: &'a str,
    pub success_count: u64,
    pub failures: &'a [RowFailure],
    pub report_path: Option<&'a Path>,
}

#[async_trait]
pub trait ReportNotifier: Send + Sync {
    /// Never fails; implementations log their own errors.
    async fn send_report(&self, report: BatchReport<'_>);
}

/// Mails the summary, attaching the failure CSV as `errors.csv`.
pub struct EmailReportNotifier {
    sender: Arc<dyn EmailSender>,
}

impl EmailReportNotifier {
    pub fn new(sender: Arc<dyn EmailSender>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl ReportNotifier for EmailReportNotifier {
    async fn send_report(&self, report: BatchReport<'_>) {
        let mut msg = BulkReportEmail {
            to: report.recipient,
            operation: report.operation,
            success_count: report.success_count,
            failure_count: report.failures.len(),
        }
        .render();

        if let Some(path) = report.report_path.filter(|_| !report.failures.is_empty()) {
            match tokio::fs::read(path).await {
                Ok(content) => msg.attachments.push(EmailAttachment {
                    filename: "errors.csv".to_string(),
                    content_type: "text/csv".to_string(),
                    content,
                }),
                Err(e) => warn!("Failed to read error report {}: {}", path.display(), e),
            }
        }

        match self.sender.send(msg).await {
            Ok(()) => info!("Sent {} report to {}", report.operation, report.recipient),
            Err(e) => warn!("Failed to send {} report to {}: {:#}", report.operation, report.recipient, e),
        }
    }
}

#[cfg(test)]
pub mod recording {
    //! Notifier double that keeps what it was asked to send.

    use std::path::PathBuf;
    use std::sync::Mutex;

    use super::*;

    #[derive(Debug, Clone)]
    pub struct SentReport {
        pub recipient: String,
        pub operation: String,
        pub success_count: u64,
        pub failures: Vec<RowFailure>,
        pub report_path: Option<PathBuf>,
    }

    #[derive(Default)]
    pub struct RecordingNotifier {
        pub sent: Mutex<Vec<SentReport>>,
    }

    impl RecordingNotifier {
        pub fn reports(&self) -> Vec<SentReport> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ReportNotifier for RecordingNotifier {
        async fn send_report(&self, report: BatchReport<'_>) {
            self.sent.lock().unwrap().push(SentReport {
                recipient: report.recipient.to_string(),
                operation: report.operation.to_string(),
                success_count: report.success_count,
                failures: report.failures.to_vec(),
                report_path: report.report_path.map(Path::to_path_buf),
            });
        }
    }
}
