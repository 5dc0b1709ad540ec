use thiserror::Error;

/// Invalid input rejected by the scoring and statistics routines.
#[derive(Debug, Error, PartialEq)]
pub enum ScoreError {
    #[error("row for {person} has no category scores")]
    EmptyRow { person: String },

    #[error("row for {person} has {found} scores but the table has {expected} categories")]
    ColumnMismatch {
        person: String,
        expected: usize,
        found: usize,
    },

    #[error("score for {person} in {category} is not a finite number")]
    NonFiniteScore { person: String, category: String },

    #[error("cutoff must be a finite number, got {0}")]
    InvalidCutoff(f64),

    #[error("top-n must be a positive integer")]
    InvalidTopN,

    #[error("invalid status ladder: {0}")]
    InvalidLadder(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("table has no rows")]
    EmptyTable,
}
