//! Required-field check run before any statement is built.

use super::error::RowError;
use super::row::BatchRow;

/// Fail on the first field of `required` (in declared order) that is absent
/// or blank. Fields outside the list are not inspected.
pub fn validate_required(row: &BatchRow, required: &[&str]) -> Result<(), RowError> {
    match required.iter().find(|field| row.non_empty(field).is_none()) {
        Some(field) => Err(RowError::validation(*field)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: &[&str] = &["ID", "Firstname", "EmailID"];

    #[test]
    fn test_complete_row_passes() {
        let row: BatchRow = [("ID", "S1"), ("Firstname", "Ada"), ("EmailID", "ada@uni.edu")]
            .into_iter()
            .collect();
        assert!(validate_required(&row, REQUIRED).is_ok());
    }

    #[test]
    fn test_reports_first_missing_field_in_declared_order() {
        let row: BatchRow = [("ID", "S1"), ("Firstname", ""), ("EmailID", " ")]
            .into_iter()
            .collect();
        match validate_required(&row, REQUIRED) {
            Err(RowError::Validation { field }) => assert_eq!(field, "Firstname"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_absent_column_fails() {
        let row: BatchRow = [("ID", "S1"), ("Firstname", "Ada")].into_iter().collect();
        match validate_required(&row, REQUIRED) {
            Err(RowError::Validation { field }) => assert_eq!(field, "EmailID"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_whitespace_only_fails() {
        let row: BatchRow = [("ID", "\t ")].into_iter().collect();
        assert!(validate_required(&row, &["ID"]).is_err());
    }

    #[test]
    fn test_unlisted_fields_ignored() {
        let row: BatchRow = [("ID", "S1"), ("Semester", "")].into_iter().collect();
        assert!(validate_required(&row, &["ID"]).is_ok());
    }
}
