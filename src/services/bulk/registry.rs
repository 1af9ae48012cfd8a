//! Fixed table of bulk operations keyed by (action, entity).
//!
//! Built once at startup and shared by reference with the handlers and the
//! CLI.

use std::collections::HashMap;
use std::sync::Arc;

use crate::auth::CredentialHasher;
use crate::types::{Action, Entity, OperationKey};

use super::operations::{
    AccountKind, AssignCourses, BulkOperation, CreateAccount, CreateCourse, DeleteRecord,
    MappedColumn, UpdateRecord, COURSE_COLUMNS,
};

const STUDENT_UPDATE_COLUMNS: &[MappedColumn] = &[
    MappedColumn::text("Firstname", "Student_First_Name"),
    MappedColumn::text("Lastname", "Student_Last_Name"),
    MappedColumn::text("EmailID", "Student_Email_ID"),
    MappedColumn::text("Semester", "Semester"),
    MappedColumn::text("Contact_Details", "Student_Contact_Details"),
];

const TEACHER_UPDATE_COLUMNS: &[MappedColumn] = &[
    MappedColumn::text("Firstname", "Teacher_First_Name"),
    MappedColumn::text("Lastname", "Teacher_Last_Name"),
    MappedColumn::text("EmailID", "Teacher_Email_ID"),
    MappedColumn::text("Department_Name", "Department_Name"),
    MappedColumn::text("Contact_Details", "Teacher_Contact_Details"),
];

const COURSE_UPDATE_COLUMNS: &[MappedColumn] = &[
    MappedColumn::text("Coursename", "Course_Name"),
    MappedColumn::integer("Credits", "Credits"),
    MappedColumn::text("Department_Name", "Department_Name"),
];

pub struct OperationRegistry {
    operations: HashMap<OperationKey, Arc<dyn BulkOperation>>,
}

impl OperationRegistry {
    pub fn new(hasher: Arc<dyn CredentialHasher>) -> Self {
        let mut operations: HashMap<OperationKey, Arc<dyn BulkOperation>> = HashMap::new();
        let mut register = |action, entity, op: Arc<dyn BulkOperation>| {
            operations.insert(OperationKey::new(action, entity), op);
        };

        register(
            Action::Create,
            Entity::Student,
            Arc::new(CreateAccount::new(AccountKind::Student, Arc::clone(&hasher))),
        );
        register(
            Action::Create,
            Entity::Teacher,
            Arc::new(CreateAccount::new(AccountKind::Teacher, hasher)),
        );
        register(Action::Create, Entity::Course, Arc::new(CreateCourse));
        register(Action::Create, Entity::Enrollment, Arc::new(AssignCourses));

        register(
            Action::Update,
            Entity::Student,
            Arc::new(UpdateRecord {
                label: "Student Data Update",
                table: AccountKind::Student.table(),
                id_column: AccountKind::Student.id_column(),
                columns: STUDENT_UPDATE_COLUMNS,
                report_columns: AccountKind::Student.report_columns(),
            }),
        );
        register(
            Action::Update,
            Entity::Teacher,
            Arc::new(UpdateRecord {
                label: "Teacher Data Update",
                table: AccountKind::Teacher.table(),
                id_column: AccountKind::Teacher.id_column(),
                columns: TEACHER_UPDATE_COLUMNS,
                report_columns: AccountKind::Teacher.report_columns(),
            }),
        );
        register(
            Action::Update,
            Entity::Course,
            Arc::new(UpdateRecord {
                label: "Course Data Update",
                table: "Courses",
                id_column: "Course_ID",
                columns: COURSE_UPDATE_COLUMNS,
                report_columns: COURSE_COLUMNS,
            }),
        );

        register(
            Action::Delete,
            Entity::Student,
            Arc::new(DeleteRecord {
                label: "Student Account Deletion",
                table: AccountKind::Student.table(),
                id_column: AccountKind::Student.id_column(),
            }),
        );
        register(
            Action::Delete,
            Entity::Teacher,
            Arc::new(DeleteRecord {
                label: "Teacher Account Deletion",
                table: AccountKind::Teacher.table(),
                id_column: AccountKind::Teacher.id_column(),
            }),
        );
        register(
            Action::Delete,
            Entity::Course,
            Arc::new(DeleteRecord {
                label: "Course Deletion",
                table: "Courses",
                id_column: "Course_ID",
            }),
        );

        Self { operations }
    }

    pub fn get(&self, key: OperationKey) -> Option<Arc<dyn BulkOperation>> {
        self.operations.get(&key).cloned()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
