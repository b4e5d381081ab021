use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Persistence failures.
///
/// These are fatal to a run: losing the checkpoint file silently would
/// discard completed work, so they are never absorbed the way per-row
/// acquisition failures are.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("row index {index} out of bounds (table has {len} rows)")]
    RowOutOfBounds { index: usize, len: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::RowOutOfBounds { index: 12, len: 5 };
        assert_eq!(
            err.to_string(),
            "row index 12 out of bounds (table has 5 rows)"
        );
    }
}
