use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown loss {0:?}")]
    UnknownLoss(String),
    #[error("unknown activation {0:?}")]
    UnknownActivation(String),
    #[error("unknown solver {0:?}")]
    UnknownSolver(String),
    #[error("dimension mismatch: expected {expected:?}, got {got:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },
    #[error("estimator is not fitted")]
    NotFitted,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("model encoding failed: {0}")]
    Encode(String),
}

pub type Result<T> = std::result::Result<T, Error>;
