use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("expected {quantity} in range [0, {bound}) but got: {value}")]
    OutOfRange {
        quantity: &'static str,
        value: f64,
        bound: f64,
    },
    #[error("cannot move with turn {turn} and forward {forward}: forward must be finite and non-negative")]
    InvalidMotion { turn: f64, forward: f64 },
    #[error("invalid {name} of {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },
    #[error("expected a finite {quantity} but got: {value}")]
    NonFinite { quantity: &'static str, value: f64 },
    #[error("expected {expected} values but got: {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("all {particles} particle weights are zero")]
    DegenerateWeights { particles: usize },
    #[error("world must contain at least one landmark")]
    EmptyLandmarks,
}

impl Error {
    pub(crate) fn invalid_parameter(name: &'static str, value: f64, reason: &'static str) -> Self {
        Self::InvalidParameter {
            name,
            value,
            reason,
        }
    }
}
