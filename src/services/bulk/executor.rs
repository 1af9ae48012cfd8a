//! Runs one uploaded CSV through an operation inside a single transaction.
//!
//! Rows are applied strictly in file order. A row that fails validation,
//! building or execution is recorded and the loop moves on; the successful
//! rows are still committed. Anything that escapes the row loop (unreadable
//! file, malformed stream, failed commit) rolls the whole batch back and is
//! reported as one synthetic failure. Reporting and notification run in
//! every case.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use csv::StringRecord;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::error::{clean_reason, RowError};
use super::notifier::{BatchReport, ReportNotifier};
use super::operations::BulkOperation;
use super::report::{remove_file, ErrorReporter, RowFailure};
use super::row::BatchRow;
use super::store::{BatchStore, BatchTransaction};

/// One queued batch: the stored upload, who to tell, and what to do.
pub struct BatchJob {
    pub source: PathBuf,
    pub recipient: String,
    pub operation: Arc<dyn BulkOperation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub operation: &'static str,
    /// Data lines read, header excluded.
    pub rows_consumed: u64,
    /// Rows persisted. Zero when the batch was rolled back.
    pub success_count: u64,
    pub no_op_count: u64,
    pub failures: Vec<RowFailure>,
    pub committed: bool,
    pub report_path: Option<PathBuf>,
}

impl BatchSummary {
    fn new(operation: &'static str) -> Self {
        Self {
            operation,
            rows_consumed: 0,
            success_count: 0,
            no_op_count: 0,
            failures: Vec::new(),
            committed: false,
            report_path: None,
        }
    }

    fn abort(&mut self, cause: &anyhow::Error) {
        error!(operation = self.operation, "Fatal error during bulk operation: {:#}", cause);
        self.success_count = 0;
        self.committed = false;
        self.failures.push(RowFailure::fatal(format!(
            "Fatal Error: {}. All changes have been rolled back.",
            clean_reason(&format!("{:#}", cause))
        )));
    }
}

enum RowOutcome {
    Applied,
    Skipped,
}

pub struct BatchExecutor {
    store: Arc<dyn BatchStore>,
    notifier: Arc<dyn ReportNotifier>,
    reporter: ErrorReporter,
}

impl BatchExecutor {
    pub fn new(
        store: Arc<dyn BatchStore>,
        notifier: Arc<dyn ReportNotifier>,
        reporter: ErrorReporter,
    ) -> Self {
        Self {
            store,
            notifier,
            reporter,
        }
    }

    /// Process the whole file, report, notify, and clean up the upload. The
    /// report is removed in the background after the retention period.
    pub async fn run(&self, job: BatchJob) -> BatchSummary {
        let (summary, _removal) = self.run_with_cleanup(job).await;
        summary
    }

    /// Like [`run`](Self::run), but hands back the pending report removal so
    /// a short-lived process can wait for it before exiting.
    pub async fn run_with_cleanup(&self, job: BatchJob) -> (BatchSummary, Option<JoinHandle<()>>) {
        let started = Instant::now();
        let op = job.operation.as_ref();
        info!("Starting {} from file: {}", op.label(), job.source.display());

        let mut summary = self.apply(&job.source, op).await;

        summary.report_path = match self
            .reporter
            .write_report(op.label(), op.report_columns(), summary.failures.clone())
            .await
        {
            Ok(path) => path,
            Err(e) => {
                error!("Failed to write error report for {}: {:#}", op.label(), e);
                None
            }
        };

        self.notifier
            .send_report(BatchReport {
                recipient: &job.recipient,
                operation: op.label(),
                success_count: summary.success_count,
                failures: &summary.failures,
                report_path: summary.report_path.as_deref(),
            })
            .await;

        remove_file(&job.source).await;
        let removal = summary
            .report_path
            .clone()
            .map(|path| self.reporter.schedule_removal(path));

        info!(
            committed = summary.committed,
            no_op = summary.no_op_count,
            duration_ms = started.elapsed().as_millis() as u64,
            "Processing complete for {}. Success: {}, Failed: {}",
            job.source.display(),
            summary.success_count,
            summary.failures.len()
        );
        (summary, removal)
    }

    async fn apply(&self, source: &Path, op: &dyn BulkOperation) -> BatchSummary {
        let mut summary = BatchSummary::new(op.label());

        let mut tx = match self.store.begin().await {
            Ok(tx) => tx,
            Err(e) => {
                summary.abort(&e.context("Failed to open transaction"));
                return summary;
            }
        };

        match apply_rows(tx.as_mut(), source, op, &mut summary).await {
            Ok(()) => match tx.commit().await {
                Ok(()) => summary.committed = true,
                Err(e) => summary.abort(&e.context("Failed to commit transaction")),
            },
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("Rollback failed: {:#}", rollback_err);
                }
                summary.abort(&e);
            }
        }

        summary
    }
}

async fn apply_rows(
    tx: &mut dyn BatchTransaction,
    source: &Path,
    op: &dyn BulkOperation,
    summary: &mut BatchSummary,
) -> Result<()> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(source)
        .with_context(|| format!("Cannot open {}", source.display()))?;
    let headers = reader.headers().context("Cannot read CSV header")?.clone();

    let mut record = StringRecord::new();
    while reader.read_record(&mut record).context("Cannot read CSV row")? {
        summary.rows_consumed += 1;
        let line = record
            .position()
            .map(|p| p.line())
            .unwrap_or(summary.rows_consumed + 1);
        let row = BatchRow::from_record(&headers, &record);

        match apply_row(&mut *tx, op, &row).await {
            Ok(RowOutcome::Applied) => summary.success_count += 1,
            Ok(RowOutcome::Skipped) => {
                summary.no_op_count += 1;
                debug!(line, "Row has nothing to change, skipped");
            }
            Err(e) => {
                let reason = e.reason();
                warn!(line, "Row Error: {}", reason);
                summary.failures.push(RowFailure::new(line, row, reason));
            }
        }
    }

    Ok(())
}

async fn apply_row(
    tx: &mut dyn BatchTransaction,
    op: &dyn BulkOperation,
    row: &BatchRow,
) -> Result<RowOutcome, RowError> {
    op.validate(row)?;

    let Some(statement) = op.build(row, &mut *tx).await? else {
        return Ok(RowOutcome::Skipped);
    };

    if tx.execute(&statement).await? == 0 {
        return Err(RowError::NoMatch);
    }
    Ok(RowOutcome::Applied)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::auth::{verify_password, Argon2Hasher};
    use crate::services::bulk::notifier::recording::RecordingNotifier;
    use crate::services::bulk::registry::OperationRegistry;
    use crate::services::bulk::store::memory::MemoryStore;
    use crate::types::{Action, Entity, OperationKey};

    struct Harness {
        _dir: tempfile::TempDir,
        uploads: PathBuf,
        store: Arc<MemoryStore>,
        notifier: Arc<RecordingNotifier>,
        registry: OperationRegistry,
        executor: BatchExecutor,
    }

    fn harness() -> Harness {
        harness_with_retention(Duration::from_secs(60))
    }

    fn harness_with_retention(retention: Duration) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let uploads = dir.path().join("uploads");
        std::fs::create_dir_all(&uploads).unwrap();

        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let reporter = ErrorReporter::new(dir.path().join("reports"), retention);
        let executor = BatchExecutor::new(store.clone(), notifier.clone(), reporter);
        let registry = OperationRegistry::new(Arc::new(Argon2Hasher::new(1).unwrap()));

        Harness {
            _dir: dir,
            uploads,
            store,
            notifier,
            registry,
            executor,
        }
    }

    impl Harness {
        fn upload(&self, name: &str, content: &[u8]) -> PathBuf {
            let path = self.uploads.join(name);
            std::fs::write(&path, content).unwrap();
            path
        }

        async fn run(&self, action: Action, entity: Entity, source: PathBuf) -> BatchSummary {
            let operation = self.registry.get(OperationKey::new(action, entity)).unwrap();
            self.executor
                .run(BatchJob {
                    source,
                    recipient: "admin@uni.edu".to_string(),
                    operation,
                })
                .await
        }
    }

    fn assert_accounted(summary: &BatchSummary) {
        assert_eq!(
            summary.success_count + summary.failures.len() as u64,
            summary.rows_consumed - summary.no_op_count
        );
    }

    const STUDENTS: &[u8] = b"ID,Firstname,Lastname,EmailID,Semester,Contact_Details
S1,Ada,Lovelace,ada@uni.edu,1,555-0001
S2,Alan,Turing,,1,555-0002
S3,Grace,Hopper,grace@uni.edu,2,555-0003
";

    #[tokio::test]
    async fn test_partial_failure_commits_valid_rows() {
        let h = harness();
        let source = h.upload("students.csv", STUDENTS);

        let summary = h.run(Action::Create, Entity::Student, source.clone()).await;

        assert!(summary.committed);
        assert_eq!(summary.rows_consumed, 3);
        assert_eq!(summary.success_count, 2);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].line, Some(3));
        assert_eq!(summary.failures[0].row.get("ID"), Some("S2"));
        assert!(summary.failures[0].reason.contains("EmailID"));
        assert_accounted(&summary);

        assert_eq!(h.store.rows("Student").len(), 2);
        assert!(h.store.find("Student", "Student_ID", "S2").is_none());
        let ada = h.store.find("Student", "Student_ID", "S1").unwrap();
        let stored = &ada["Student_Password"];
        assert_ne!(stored, "S1");
        assert!(verify_password("S1", stored).unwrap());

        assert!(!source.exists(), "upload is removed after processing");
        assert_eq!(h.store.open_transactions(), 0);
    }

    #[tokio::test]
    async fn test_report_and_notification() {
        let h = harness();
        let source = h.upload("students.csv", STUDENTS);

        let summary = h.run(Action::Create, Entity::Student, source).await;

        let path = summary.report_path.clone().unwrap();
        assert!(path.ends_with("Student_Account_Creation_errors.csv"));
        let mut reader = csv::Reader::from_path(&path).unwrap();
        let records: Vec<StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(&records[0][0], "S2");
        assert_eq!(&records[0][6], "Missing required field: EmailID");

        let reports = h.notifier.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].recipient, "admin@uni.edu");
        assert_eq!(reports[0].operation, "Student Account Creation");
        assert_eq!(reports[0].success_count, 2);
        assert_eq!(reports[0].failures, summary.failures);
        assert_eq!(reports[0].report_path.as_deref(), Some(path.as_path()));
    }

    #[tokio::test]
    async fn test_clean_batch_has_no_report() {
        let h = harness();
        let source = h.upload(
            "courses.csv",
            b"ID,Coursename,Credits,Department_Name\nC1,Algebra,4,Maths\nC2,Physics,3,Science\n",
        );

        let summary = h.run(Action::Create, Entity::Course, source).await;

        assert_eq!(summary.success_count, 2);
        assert!(summary.failures.is_empty());
        assert!(summary.report_path.is_none());
        assert!(h.notifier.reports()[0].report_path.is_none());
        assert_eq!(h.store.find("Courses", "Course_ID", "C2").unwrap()["Credits"], "3");
    }

    #[tokio::test]
    async fn test_duplicate_key_is_a_row_failure() {
        let h = harness();
        h.store.seed("Courses", &[("Course_ID", "C1"), ("Course_Name", "Old")]);
        let source = h.upload(
            "courses.csv",
            b"ID,Coursename,Credits,Department_Name\nC1,Algebra,4,Maths\nC2,Physics,x,Science\nC3,Chemistry,2,Science\n",
        );

        let summary = h.run(Action::Create, Entity::Course, source).await;

        assert!(summary.committed);
        assert_eq!(summary.success_count, 1);
        assert_eq!(summary.failures.len(), 2);
        assert_eq!(
            summary.failures[0].reason,
            "duplicate key value violates unique constraint \"courses_pkey\""
        );
        assert!(summary.failures[1].reason.contains("Credits"));
        assert_eq!(h.store.find("Courses", "Course_ID", "C1").unwrap()["Course_Name"], "Old");
        assert!(h.store.find("Courses", "Course_ID", "C3").is_some());
        assert_accounted(&summary);
    }

    #[tokio::test]
    async fn test_update_no_op_and_missing_target() {
        let h = harness();
        h.store.seed("Student", &[("Student_ID", "S1"), ("Semester", "1")]);
        let source = h.upload(
            "update.csv",
            b"ID,Firstname,Lastname,EmailID,Semester,Contact_Details
S1,,,,2,
S1,,,,,
S9,Nobody,,,,
,Ghost,,,,
",
        );

        let summary = h.run(Action::Update, Entity::Student, source).await;

        assert_eq!(summary.rows_consumed, 4);
        assert_eq!(summary.success_count, 1);
        assert_eq!(summary.no_op_count, 1);
        let reasons: Vec<&str> = summary.failures.iter().map(|f| f.reason.as_str()).collect();
        assert_eq!(reasons, vec!["ID not found in database", "Missing ID in row"]);
        assert_eq!(h.store.find("Student", "Student_ID", "S1").unwrap()["Semester"], "2");
        assert_accounted(&summary);
    }

    #[tokio::test]
    async fn test_delete_accepts_lowercase_header() {
        let h = harness();
        h.store.seed("Teacher", &[("Teacher_ID", "T1")]);
        h.store.seed("Teacher", &[("Teacher_ID", "T2")]);
        let source = h.upload("delete.csv", b"id\nT1\nT3\n");

        let summary = h.run(Action::Delete, Entity::Teacher, source).await;

        assert_eq!(summary.success_count, 1);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].row.get("id"), Some("T3"));
        assert_eq!(h.store.rows("Teacher").len(), 1);
    }

    #[tokio::test]
    async fn test_assignment_with_unknown_student() {
        let h = harness();
        h.store.seed("Student", &[("Student_ID", "S1")]);
        h.store.seed("Teacher", &[("Teacher_ID", "T1")]);
        h.store.seed("Courses", &[("Course_ID", "C1")]);
        let source = h.upload(
            "assign.csv",
            b"Student_ID,Teacher_ID,Course_ID,Semester\nS1,T1,C1,Fall\nS404,T1,C1,Fall\n",
        );

        let summary = h.run(Action::Create, Entity::Enrollment, source).await;

        assert_eq!(summary.success_count, 1);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].reason, "Student_ID does not exist: S404");
        let enrollments = h.store.rows("Enrollment");
        assert_eq!(enrollments.len(), 1);
        assert_eq!(enrollments[0]["Student_ID"], "S1");
    }

    #[tokio::test]
    async fn test_reference_checks_see_uncommitted_changes() {
        let h = harness();
        h.store.seed("Teacher", &[("Teacher_ID", "T1")]);
        h.store.seed("Courses", &[("Course_ID", "C1")]);
        h.store.seed("Student", &[("Student_ID", "S1")]);
        let store: Arc<dyn BatchStore> = h.store.clone();
        let mut tx = store.begin().await.unwrap();
        tx.execute(&crate::services::bulk::statement::Statement::Delete {
            table: "Student",
            id_column: "Student_ID",
            id: "S1".to_string(),
        })
        .await
        .unwrap();

        let op = h.registry.get(OperationKey::new(Action::Create, Entity::Enrollment)).unwrap();
        let row: BatchRow = [("Student_ID", "S1"), ("Teacher_ID", "T1"), ("Course_ID", "C1"), ("Semester", "Fall")]
            .into_iter()
            .collect();
        let err = op.build(&row, tx.as_mut()).await.unwrap_err();
        assert_eq!(err.reason(), "Student_ID does not exist: S1");
    }

    #[tokio::test]
    async fn test_stream_error_rolls_back_everything() {
        let h = harness();
        let mut content = b"ID,Coursename,Credits,Department_Name\nC1,Algebra,4,Maths\nC2,".to_vec();
        content.extend_from_slice(&[0xff, 0xfe]);
        content.extend_from_slice(b",3,Science\n");
        let source = h.upload("broken.csv", &content);

        let summary = h.run(Action::Create, Entity::Course, source.clone()).await;

        assert!(!summary.committed);
        assert_eq!(summary.success_count, 0);
        assert_eq!(summary.failures.len(), 1);
        assert!(summary.failures[0].line.is_none());
        assert!(summary.failures[0].reason.starts_with("Fatal Error: "));
        assert!(summary.failures[0].reason.ends_with("All changes have been rolled back."));
        assert!(h.store.rows("Courses").is_empty());
        assert!(summary.report_path.is_some());
        assert!(!source.exists());
        assert_eq!(h.store.open_transactions(), 0);
    }

    #[tokio::test]
    async fn test_missing_file_is_fatal() {
        let h = harness();
        let source = h.uploads.join("never-uploaded.csv");

        let summary = h.run(Action::Delete, Entity::Course, source).await;

        assert!(!summary.committed);
        assert_eq!(summary.rows_consumed, 0);
        assert_eq!(summary.failures.len(), 1);
        assert!(summary.failures[0].reason.contains("Cannot open"));
        assert_eq!(h.notifier.reports().len(), 1);
        assert_eq!(h.store.open_transactions(), 0);
    }

    #[tokio::test]
    async fn test_header_only_file_commits_nothing() {
        let h = harness();
        let source = h.upload("empty.csv", b"ID\n");

        let summary = h.run(Action::Delete, Entity::Student, source).await;

        assert!(summary.committed);
        assert_eq!(summary.rows_consumed, 0);
        assert!(summary.failures.is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_handle_removes_report() {
        let h = harness_with_retention(Duration::from_millis(20));
        let source = h.upload("students.csv", STUDENTS);
        let operation = h
            .registry
            .get(OperationKey::new(Action::Create, Entity::Student))
            .unwrap();

        let (summary, removal) = h
            .executor
            .run_with_cleanup(BatchJob {
                source,
                recipient: "admin@uni.edu".to_string(),
                operation,
            })
            .await;

        let path = summary.report_path.clone().unwrap();
        assert!(path.exists(), "report stays until the retention period ends");
        removal.expect("a report was written").await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_clean_batch_schedules_nothing() {
        let h = harness();
        let source = h.upload("delete.csv", b"ID\n");
        let operation = h
            .registry
            .get(OperationKey::new(Action::Delete, Entity::Course))
            .unwrap();

        let (summary, removal) = h
            .executor
            .run_with_cleanup(BatchJob {
                source,
                recipient: "admin@uni.edu".to_string(),
                operation,
            })
            .await;

        assert!(summary.report_path.is_none());
        assert!(removal.is_none());
    }
}
