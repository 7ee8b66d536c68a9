//! SQLSTATE classification for PostgreSQL errors.

const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

/// Returns true if the transaction was aborted only because it lost a
/// concurrency race and can be re-run as is.
pub fn is_retryable_conflict(e: &sqlx::Error) -> bool {
    let Some(db_err) = e.as_database_error() else {
        return false;
    };

    matches!(
        db_err.code().as_deref(),
        Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_are_not_retryable() {
        assert!(!is_retryable_conflict(&sqlx::Error::RowNotFound));
        assert!(!is_retryable_conflict(&sqlx::Error::PoolTimedOut));
    }
}
