//! Transactional email templates.
//!
//! The `render()` method returns an `EmailMessage` ready to pass to `EmailSender::send`.

use crate::services::email_sender::EmailMessage;

// =============================================================================
// Bulk operation report
// =============================================================================

/// Completion summary mailed to the administrator who started a batch.
pub struct BulkReportEmail<'a> {
    pub to: &'a str,
    pub operation: &'a str,
    pub success_count: u64,
    pub failure_count: usize,
}

impl<'a> BulkReportEmail<'a> {
    pub fn render(&self) -> EmailMessage {
        let total = self.success_count + self.failure_count as u64;

        let (details_html, details_text) = if self.failure_count > 0 {
            (
                format!(
                    "<p><strong>{} records failed to process.</strong> Please see the attached 'errors.csv' file for details.</p>",
                    self.failure_count
                ),
                format!(
                    "{} records failed to process. Please see the attached 'errors.csv' file for details.",
                    self.failure_count
                ),
            )
        } else {
            (
                "<p>All records processed successfully!</p>".to_string(),
                "All records processed successfully!".to_string(),
            )
        };

        let html = format!(
            r#"<div style="font-family: sans-serif; line-height: 1.6;">
<h2>Your {op} report is ready.</h2>
<p>The bulk operation you started has finished processing.</p>
<hr>
<h3>Summary:</h3>
<ul>
<li><strong>Total Records Processed:</strong> {total}</li>
<li style="color: green;"><strong>Successful:</strong> {ok}</li>
<li style="color: red;"><strong>Failed:</strong> {failed}</li>
</ul>
<hr>
{details}
</div>"#,
            op = self.operation,
            total = total,
            ok = self.success_count,
            failed = self.failure_count,
            details = details_html,
        );

        let text = format!(
            "Your {} report is ready.\n\nTotal Records Processed: {}\nSuccessful: {}\nFailed: {}\n\n{}",
            self.operation, total, self.success_count, self.failure_count, details_text
        );

        EmailMessage {
            to: self.to.to_string(),
            subject: format!("Report: {} Process Complete", self.operation),
            html,
            text,
            attachments: Vec::new(),
        }
    }
}
