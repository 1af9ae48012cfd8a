//! Failure report written as CSV and attached to the summary email.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::row::BatchRow;

/// Header of the trailing column holding each failure's cause.
pub const REASON: &str = "Reason";

/// One report column: `id` is looked up in the row, `title` is written as
/// the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportColumn {
    pub id: &'static str,
    pub title: &'static str,
}

impl ReportColumn {
    pub const fn new(name: &'static str) -> Self {
        Self { id: name, title: name }
    }
}

/// A row that did not reach the database, with the reason why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFailure {
    /// 1-based line in the source file, header included. `None` for a
    /// batch-level failure.
    pub line: Option<u64>,
    pub row: BatchRow,
    pub reason: String,
}

impl RowFailure {
    pub fn new(line: u64, row: BatchRow, reason: impl Into<String>) -> Self {
        Self {
            line: Some(line),
            row,
            reason: reason.into(),
        }
    }

    /// Failure that is not attributable to a single row.
    pub fn fatal(reason: impl Into<String>) -> Self {
        Self {
            line: None,
            row: BatchRow::default(),
            reason: reason.into(),
        }
    }

    fn value(&self, column: &ReportColumn) -> &str {
        if column.id == REASON {
            return &self.reason;
        }
        let value = match column.id {
            "ID" => self.row.get("ID").or_else(|| self.row.get("id")),
            id => self.row.get(id),
        };
        value.unwrap_or("")
    }
}

/// Stable artifact name for an operation label.
pub fn report_file_name(label: &str) -> String {
    let stem: Vec<&str> = label.split_whitespace().collect();
    format!("{}_errors.csv", stem.join("_"))
}

/// Writes failure reports into a directory and cleans them up later.
#[derive(Debug, Clone)]
pub struct ErrorReporter {
    dir: PathBuf,
    retention: Duration,
}

impl ErrorReporter {
    pub fn new(dir: impl Into<PathBuf>, retention: Duration) -> Self {
        Self {
            dir: dir.into(),
            retention,
        }
    }

    /// Serialize `failures` under `columns` on the blocking pool. Returns
    /// `None` without touching the filesystem when there is nothing to report.
    pub async fn write_report(
        &self,
        label: &'static str,
        columns: &'static [ReportColumn],
        failures: Vec<RowFailure>,
    ) -> Result<Option<PathBuf>> {
        if failures.is_empty() {
            return Ok(None);
        }
        let reporter = self.clone();
        tokio::task::spawn_blocking(move || reporter.write(label, columns, &failures))
            .await
            .context("Report writer task failed")?
    }

    fn write(
        &self,
        label: &str,
        columns: &[ReportColumn],
        failures: &[RowFailure],
    ) -> Result<Option<PathBuf>> {
        if failures.is_empty() {
            return Ok(None);
        }

        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create report directory {}", self.dir.display()))?;
        let path = self.dir.join(report_file_name(label));

        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("Failed to create error report {}", path.display()))?;
        writer.write_record(columns.iter().map(|c| c.title))?;
        for failure in failures {
            writer.write_record(columns.iter().map(|c| failure.value(c)))?;
        }
        writer.flush()?;

        info!("Error report saved to {}", path.display());
        Ok(Some(path))
    }

    /// Delete a report once the grace period has passed, leaving time for the
    /// mail transport to read the attachment. Callers that exit before the
    /// grace period ends must await the handle.
    pub fn schedule_removal(&self, path: PathBuf) -> JoinHandle<()> {
        let retention = self.retention;
        tokio::spawn(async move {
            tokio::time::sleep(retention).await;
            remove_file(&path).await;
        })
    }
}

/// Best-effort removal of a transient file.
pub async fn remove_file(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Deleted {}", path.display()),
        Err(e) => warn!("Failed to delete {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLUMNS: &[ReportColumn] = &[
        ReportColumn::new("ID"),
        ReportColumn::new("EmailID"),
        ReportColumn::new(REASON),
    ];

    fn failure(line: u64, fields: &[(&str, &str)], reason: &str) -> RowFailure {
        RowFailure::new(line, fields.iter().copied().collect(), reason)
    }

    #[test]
    fn test_report_file_name_replaces_whitespace() {
        assert_eq!(
            report_file_name("Student Account Creation"),
            "Student_Account_Creation_errors.csv"
        );
        assert_eq!(report_file_name("Course  Deletion"), "Course_Deletion_errors.csv");
    }

    #[test]
    fn test_no_failures_no_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = ErrorReporter::new(dir.path(), Duration::from_secs(60));

        let path = reporter.write("Course Creation", COLUMNS, &[]).unwrap();
        assert!(path.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_report_round_trips_through_csv() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = ErrorReporter::new(dir.path(), Duration::from_secs(60));
        let failures = vec![
            failure(3, &[("ID", "S2"), ("EmailID", ""), ("Semester", "1")], "Missing required field: EmailID"),
            failure(5, &[("id", "S4"), ("EmailID", "x@uni.edu")], "ID not found in database"),
            RowFailure::fatal("Fatal Error: stream closed, \"early\". All changes have been rolled back."),
        ];

        let path = reporter
            .write("Student Account Creation", COLUMNS, &failures)
            .unwrap()
            .unwrap();
        assert!(path.ends_with("Student_Account_Creation_errors.csv"));

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, vec!["ID", "EmailID", "Reason"]);

        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), failures.len());
        for (record, failure) in records.iter().zip(&failures) {
            assert_eq!(&record[2], failure.reason);
        }
        assert_eq!(&records[0][0], "S2");
        assert_eq!(&records[1][0], "S4");
        assert_eq!(&records[2][0], "");
    }

    #[tokio::test]
    async fn test_scheduled_removal_deletes_report() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = ErrorReporter::new(dir.path(), Duration::from_millis(10));
        let path = reporter
            .write("Course Deletion", COLUMNS, &[failure(2, &[("ID", "C1")], "ID not found in database")])
            .unwrap()
            .unwrap();

        let removal = reporter.schedule_removal(path.clone());
        assert!(path.exists());
        removal.await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_write_report_writes_csv() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = ErrorReporter::new(dir.path().join("nested"), Duration::from_secs(60));

        assert!(reporter.write_report("Course Deletion", COLUMNS, Vec::new()).await.unwrap().is_none());
        assert!(!dir.path().join("nested").exists());

        let path = reporter
            .write_report(
                "Course Deletion",
                COLUMNS,
                vec![failure(2, &[("ID", "C1")], "ID not found in database")],
            )
            .await
            .unwrap()
            .unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "ID,EmailID,Reason\nC1,,ID not found in database\n");
    }

    #[tokio::test]
    async fn test_write_report_surfaces_io_errors() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("taken");
        std::fs::write(&blocker, "").unwrap();
        let reporter = ErrorReporter::new(&blocker, Duration::from_secs(60));

        let err = reporter
            .write_report("Course Deletion", COLUMNS, vec![RowFailure::fatal("boom")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to create report directory"));
    }
}
