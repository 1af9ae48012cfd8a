//! CSV bulk operations: validate, build, execute, report, notify.
//!
//! The [`BatchExecutor`] drives one file through a [`BulkOperation`]
//! looked up in the [`OperationRegistry`], inside a single transaction
//! obtained from a [`BatchStore`].

pub mod error;
pub mod executor;
pub mod notifier;
pub mod operations;
pub mod registry;
pub mod report;
pub mod row;
pub mod statement;
pub mod store;
pub mod validator;

pub use error::RowError;
pub use executor::{BatchExecutor, BatchJob, BatchSummary};
pub use notifier::{BatchReport, EmailReportNotifier, ReportNotifier};
pub use operations::BulkOperation;
pub use registry::OperationRegistry;
pub use report::{remove_file, ErrorReporter, RowFailure};
pub use row::BatchRow;
pub use statement::{Param, Statement};
pub use store::{BatchStore, BatchTransaction};
