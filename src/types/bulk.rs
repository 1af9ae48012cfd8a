//! Bulk operation selection and submission types

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a bulk upload does to each row's record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Update,
    Delete,
}

/// Which records a bulk upload targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Entity {
    Student,
    Teacher,
    #[serde(alias = "courses")]
    Course,
    /// Student × teacher × course assignment for a semester
    #[serde(alias = "assignCourses")]
    Enrollment,
}

/// Registry key for one configured bulk operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationKey {
    pub action: Action,
    pub entity: Entity,
}

impl OperationKey {
    pub const fn new(action: Action, entity: Entity) -> Self {
        Self { action, entity }
    }
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {:?}", self.action, self.entity)
    }
}

/// Payload of `lms.bulk.submit`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSubmitRequest {
    pub action: Action,
    pub entity: Entity,
    /// Local path of the stored upload
    pub file_path: String,
    /// Where the completion report is mailed
    pub notify_email: String,
}

impl BulkSubmitRequest {
    pub fn key(&self) -> OperationKey {
        OperationKey::new(self.action, self.entity)
    }
}

/// Immediate acknowledgement; the outcome arrives by email.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSubmitResponse {
    pub job_id: Uuid,
    pub operation: String,
    pub message: String,
}
