use thiserror::Error;

/// Error type for calibration operations
#[derive(Debug, Error)]
pub enum CalibrationError {
    /// Reference and target sample lists differ in length
    #[error("Mismatched sample lists: {reference} reference vs {target} target positions")]
    MismatchedSamples { reference: usize, target: usize },

    /// Point count outside the supported range
    #[error("Unsupported calibration point count: {0} (expected 3..=5)")]
    PointCount(usize),

    /// The rigid fit could not be computed
    #[error("Rigid transform solver failed: {0}")]
    Solver(String),

    /// Reading or writing the calibration store failed
    #[error("Calibration store error: {0}")]
    Store(#[from] anyhow::Error),

    /// Invalid calibration configuration
    #[error("Invalid calibration configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for calibration operations
pub type CalibrationResult<T> = Result<T, CalibrationError>;
