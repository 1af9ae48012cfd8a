//! Row-level failure taxonomy.
//!
//! A `RowError` never aborts a batch. Its display text becomes the `Reason`
//! column of the failure report.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RowError {
    /// Required column absent, empty or whitespace only.
    #[error("Missing required field: {field}")]
    Validation { field: String },

    /// Column present but not of the expected type.
    #[error("Invalid value for {field}: '{value}' is not a whole number")]
    Type { field: String, value: String },

    #[error("Missing ID in row")]
    MissingIdentifier,

    /// A referenced record does not exist inside the running transaction.
    #[error("{entity} does not exist: {id}")]
    Reference { entity: String, id: String },

    /// The statement ran but touched no rows.
    #[error("ID not found in database")]
    NoMatch,

    #[error("Failed to derive credential: {0}")]
    Credential(String),

    #[error("{0}")]
    Database(String),
}

impl RowError {
    pub fn validation(field: impl Into<String>) -> Self {
        Self::Validation { field: field.into() }
    }

    pub fn reference(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::Reference {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Reason text as shown to the administrator.
    pub fn reason(&self) -> String {
        clean_reason(&self.to_string())
    }
}

impl From<anyhow::Error> for RowError {
    fn from(e: anyhow::Error) -> Self {
        Self::Database(format!("{:#}", e))
    }
}

/// Strip the driver's `error: ` prefixes from a message.
pub fn clean_reason(message: &str) -> String {
    message.replace("error: ", "")
}
