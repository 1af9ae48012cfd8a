//! Per-operation row handling: validation fields, statement building and
//! the report layout.
//!
//! Every (action, entity) pair in the registry is one value implementing
//! [`BulkOperation`]. Builders either return a statement, return `None` when
//! the row needs no change, or fail the row with a [`RowError`].

use std::sync::Arc;

use async_trait::async_trait;

use super::error::RowError;
use super::report::{ReportColumn, REASON};
use super::row::BatchRow;
use super::statement::{Param, Statement};
use super::store::BatchTransaction;
use super::validator::validate_required;
use crate::auth::CredentialHasher;

#[async_trait]
pub trait BulkOperation: Send + Sync {
    /// Human label, used in logs, the email subject and the report name.
    fn label(&self) -> &'static str;

    fn required_fields(&self) -> &'static [&'static str];

    /// Report columns, entity fields first and [`REASON`] last.
    fn report_columns(&self) -> &'static [ReportColumn];

    fn validate(&self, row: &BatchRow) -> Result<(), RowError> {
        validate_required(row, self.required_fields())
    }

    /// Build the row's statement. Lookups go through `tx` so they see the
    /// same snapshot as the write.
    async fn build(
        &self,
        row: &BatchRow,
        tx: &mut dyn BatchTransaction,
    ) -> Result<Option<Statement>, RowError>;
}

fn field<'r>(row: &'r BatchRow, name: &str) -> Result<&'r str, RowError> {
    row.non_empty(name)
        .map(str::trim)
        .ok_or_else(|| RowError::validation(name))
}

fn parse_int(name: &str, value: &str) -> Result<i32, RowError> {
    value.trim().parse().map_err(|_| RowError::Type {
        field: name.to_string(),
        value: value.to_string(),
    })
}

// =============================================================================
// Create: student / teacher accounts
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountKind {
    Student,
    Teacher,
}

const STUDENT_COLUMNS: &[ReportColumn] = &[
    ReportColumn::new("ID"),
    ReportColumn::new("Firstname"),
    ReportColumn::new("Lastname"),
    ReportColumn::new("EmailID"),
    ReportColumn::new("Semester"),
    ReportColumn::new("Contact_Details"),
    ReportColumn::new(REASON),
];

const TEACHER_COLUMNS: &[ReportColumn] = &[
    ReportColumn::new("ID"),
    ReportColumn::new("Firstname"),
    ReportColumn::new("Lastname"),
    ReportColumn::new("EmailID"),
    ReportColumn::new("Department_Name"),
    ReportColumn::new("Contact_Details"),
    ReportColumn::new(REASON),
];

impl AccountKind {
    pub const fn table(self) -> &'static str {
        match self {
            AccountKind::Student => "Student",
            AccountKind::Teacher => "Teacher",
        }
    }

    pub const fn id_column(self) -> &'static str {
        match self {
            AccountKind::Student => "Student_ID",
            AccountKind::Teacher => "Teacher_ID",
        }
    }

    /// The header that differs between the two account types.
    fn group_header(self) -> &'static str {
        match self {
            AccountKind::Student => "Semester",
            AccountKind::Teacher => "Department_Name",
        }
    }

    fn insert_columns(self) -> Vec<&'static str> {
        match self {
            AccountKind::Student => vec![
                "Student_ID",
                "Student_First_Name",
                "Student_Last_Name",
                "Student_Email_ID",
                "Student_Password",
                "Semester",
                "Student_Contact_Details",
            ],
            AccountKind::Teacher => vec![
                "Teacher_ID",
                "Teacher_First_Name",
                "Teacher_Last_Name",
                "Teacher_Email_ID",
                "Teacher_Password",
                "Department_Name",
                "Teacher_Contact_Details",
            ],
        }
    }

    pub const fn report_columns(self) -> &'static [ReportColumn] {
        match self {
            AccountKind::Student => STUDENT_COLUMNS,
            AccountKind::Teacher => TEACHER_COLUMNS,
        }
    }
}

/// Inserts an account whose temporary password is its own ID, stored only
/// as a salted one-way hash.
pub struct CreateAccount {
    kind: AccountKind,
    hasher: Arc<dyn CredentialHasher>,
}

impl CreateAccount {
    pub fn new(kind: AccountKind, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self { kind, hasher }
    }
}

#[async_trait]
impl BulkOperation for CreateAccount {
    fn label(&self) -> &'static str {
        match self.kind {
            AccountKind::Student => "Student Account Creation",
            AccountKind::Teacher => "Teacher Account Creation",
        }
    }

    fn required_fields(&self) -> &'static [&'static str] {
        match self.kind {
            AccountKind::Student => &["ID", "Firstname", "Lastname", "EmailID", "Semester", "Contact_Details"],
            AccountKind::Teacher => &["ID", "Firstname", "Lastname", "EmailID", "Department_Name", "Contact_Details"],
        }
    }

    fn report_columns(&self) -> &'static [ReportColumn] {
        self.kind.report_columns()
    }

    async fn build(
        &self,
        row: &BatchRow,
        _tx: &mut dyn BatchTransaction,
    ) -> Result<Option<Statement>, RowError> {
        let id = field(row, "ID")?;
        let credential = self
            .hasher
            .hash(id)
            .map_err(|e| RowError::Credential(e.to_string()))?;

        let values = vec![
            Param::from(id),
            field(row, "Firstname")?.into(),
            field(row, "Lastname")?.into(),
            field(row, "EmailID")?.into(),
            credential.into(),
            field(row, self.kind.group_header())?.into(),
            field(row, "Contact_Details")?.into(),
        ];

        Ok(Some(Statement::Insert {
            table: self.kind.table(),
            columns: self.kind.insert_columns(),
            values,
        }))
    }
}

// =============================================================================
// Create: courses
// =============================================================================

pub const COURSE_COLUMNS: &[ReportColumn] = &[
    ReportColumn::new("ID"),
    ReportColumn::new("Coursename"),
    ReportColumn::new("Credits"),
    ReportColumn::new("Department_Name"),
    ReportColumn::new(REASON),
];

pub struct CreateCourse;

#[async_trait]
impl BulkOperation for CreateCourse {
    fn label(&self) -> &'static str {
        "Course Creation"
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["ID", "Coursename", "Credits", "Department_Name"]
    }

    fn report_columns(&self) -> &'static [ReportColumn] {
        COURSE_COLUMNS
    }

    async fn build(
        &self,
        row: &BatchRow,
        _tx: &mut dyn BatchTransaction,
    ) -> Result<Option<Statement>, RowError> {
        let credits = parse_int("Credits", field(row, "Credits")?)?;

        Ok(Some(Statement::Insert {
            table: "Courses",
            columns: vec!["Course_ID", "Course_Name", "Credits", "Department_Name"],
            values: vec![
                field(row, "ID")?.into(),
                field(row, "Coursename")?.into(),
                credits.into(),
                field(row, "Department_Name")?.into(),
            ],
        }))
    }
}

// =============================================================================
// Create: course assignment (enrollment)
// =============================================================================

const ASSIGNMENT_COLUMNS: &[ReportColumn] = &[
    ReportColumn::new("Student_ID"),
    ReportColumn::new("Teacher_ID"),
    ReportColumn::new("Course_ID"),
    ReportColumn::new("Semester"),
    ReportColumn::new(REASON),
];

/// References checked before an enrollment insert: (header, table, column).
const ASSIGNMENT_REFERENCES: [(&str, &str, &str); 3] = [
    ("Student_ID", "Student", "Student_ID"),
    ("Teacher_ID", "Teacher", "Teacher_ID"),
    ("Course_ID", "Courses", "Course_ID"),
];

pub struct AssignCourses;

#[async_trait]
impl BulkOperation for AssignCourses {
    fn label(&self) -> &'static str {
        "Course Assignment"
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &["Student_ID", "Teacher_ID", "Course_ID", "Semester"]
    }

    fn report_columns(&self) -> &'static [ReportColumn] {
        ASSIGNMENT_COLUMNS
    }

    async fn build(
        &self,
        row: &BatchRow,
        tx: &mut dyn BatchTransaction,
    ) -> Result<Option<Statement>, RowError> {
        for (header, table, column) in ASSIGNMENT_REFERENCES {
            let id = field(row, header)?;
            if !tx.exists(table, column, id).await? {
                return Err(RowError::reference(header, id));
            }
        }

        Ok(Some(Statement::Insert {
            table: "Enrollment",
            columns: vec!["Student_ID", "Teacher_ID", "Course_ID", "Semester"],
            values: vec![
                field(row, "Student_ID")?.into(),
                field(row, "Teacher_ID")?.into(),
                field(row, "Course_ID")?.into(),
                field(row, "Semester")?.into(),
            ],
        }))
    }
}

// =============================================================================
// Update
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
}

/// CSV header → table column for partial updates.
#[derive(Debug, Clone, Copy)]
pub struct MappedColumn {
    pub header: &'static str,
    pub column: &'static str,
    pub kind: ColumnKind,
}

impl MappedColumn {
    pub const fn text(header: &'static str, column: &'static str) -> Self {
        Self { header, column, kind: ColumnKind::Text }
    }

    pub const fn integer(header: &'static str, column: &'static str) -> Self {
        Self { header, column, kind: ColumnKind::Integer }
    }
}

/// Sets only the mapped columns whose cell is non-empty. A blank cell means
/// "leave as is", never "clear".
pub struct UpdateRecord {
    pub label: &'static str,
    pub table: &'static str,
    pub id_column: &'static str,
    pub columns: &'static [MappedColumn],
    pub report_columns: &'static [ReportColumn],
}

#[async_trait]
impl BulkOperation for UpdateRecord {
    fn label(&self) -> &'static str {
        self.label
    }

    /// The identifier is resolved by the builder, which accepts `ID` or `id`.
    fn required_fields(&self) -> &'static [&'static str] {
        &[]
    }

    fn report_columns(&self) -> &'static [ReportColumn] {
        self.report_columns
    }

    async fn build(
        &self,
        row: &BatchRow,
        _tx: &mut dyn BatchTransaction,
    ) -> Result<Option<Statement>, RowError> {
        let id = row.identifier().ok_or(RowError::MissingIdentifier)?;

        let mut assignments = Vec::new();
        for mapped in self.columns {
            let Some(value) = row.non_empty(mapped.header) else {
                continue;
            };
            let param = match mapped.kind {
                ColumnKind::Text => Param::from(value.trim()),
                ColumnKind::Integer => parse_int(mapped.header, value)?.into(),
            };
            assignments.push((mapped.column, param));
        }

        if assignments.is_empty() {
            return Ok(None);
        }

        Ok(Some(Statement::Update {
            table: self.table,
            assignments,
            id_column: self.id_column,
            id: id.trim().to_string(),
        }))
    }
}

// =============================================================================
// Delete
// =============================================================================

pub const DELETE_COLUMNS: &[ReportColumn] = &[ReportColumn::new("ID"), ReportColumn::new(REASON)];

pub struct DeleteRecord {
    pub label: &'static str,
    pub table: &'static str,
    pub id_column: &'static str,
}

#[async_trait]
impl BulkOperation for DeleteRecord {
    fn label(&self) -> &'static str {
        self.label
    }

    fn required_fields(&self) -> &'static [&'static str] {
        &[]
    }

    fn report_columns(&self) -> &'static [ReportColumn] {
        DELETE_COLUMNS
    }

    async fn build(
        &self,
        row: &BatchRow,
        _tx: &mut dyn BatchTransaction,
    ) -> Result<Option<Statement>, RowError> {
        let id = row.identifier().ok_or(RowError::MissingIdentifier)?;
        Ok(Some(Statement::Delete {
            table: self.table,
            id_column: self.id_column,
            id: id.trim().to_string(),
        }))
    }
}
