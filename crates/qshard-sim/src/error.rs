//! Error types for the simulation crate.

use qshard_ir::{IrError, QubitId};
use thiserror::Error;

use crate::precision::Precision;

/// Broad class of a [`SimError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed caller input; never retried.
    Validation,
    /// Operation not allowed in the current lifecycle state.
    State,
    /// Value is not a recognized state representation.
    Type,
    /// Numerical failure or norm check violation.
    Numeric,
    /// Configuration could not be parsed.
    Config,
}

/// Errors produced by the simulator.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SimError {
    /// Gate construction or binding failed.
    #[error("Gate error: {0}")]
    Ir(#[from] IrError),

    /// Piece count is not a power of two.
    #[error("Piece count must be a power of two, got {0}")]
    InvalidPieceCount(usize),

    /// More pieces than amplitudes to distribute.
    #[error("Cannot split {num_qubits} qubits into {pieces} pieces")]
    TooManyPieces {
        /// Requested number of pieces.
        pieces: usize,
        /// Register size.
        num_qubits: usize,
    },

    /// Device descriptor is malformed.
    #[error("Invalid device descriptor: {0}")]
    InvalidDeviceMap(String),

    /// Explicit global-qubit set is malformed.
    #[error("Invalid global qubit set: {0}")]
    InvalidGlobalQubits(String),

    /// Number of supplied pieces does not match the partition.
    #[error("Partition expects {expected} pieces, got {got}")]
    PieceCountMismatch {
        /// Pieces required by the partition.
        expected: usize,
        /// Pieces supplied.
        got: usize,
    },

    /// Amplitude buffer has the wrong length.
    #[error("Expected a state of length {expected}, got {got}")]
    StateLengthMismatch {
        /// Expected length.
        expected: usize,
        /// Actual length.
        got: usize,
    },

    /// State and contraction plan disagree on the register size.
    #[error("Observable bound to {expected} qubits received a {got}-qubit state")]
    QubitCountMismatch {
        /// Qubit count of the plan.
        expected: usize,
        /// Qubit count of the state.
        got: usize,
    },

    /// Subsystem for a partial trace is malformed.
    #[error("Invalid subsystem: {0}")]
    InvalidSubsystem(String),

    /// Circuits of different widths cannot be joined.
    #[error("Cannot join circuits with {left} and {right} qubits")]
    CircuitSizeMismatch {
        /// Width of the left circuit.
        left: u32,
        /// Width of the right circuit.
        right: u32,
    },

    /// Callback result index beyond the recorded calls.
    #[error("Callback index {index} out of range: {len} calls recorded")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of recorded results.
        len: usize,
    },

    /// Callback result key is neither an integer, a range nor a list.
    #[error("Unrecognized callback index key: {0}")]
    InvalidIndexKey(String),

    /// Stacked results have differing shapes.
    #[error("Callback results have differing shapes and cannot be stacked")]
    RaggedResults,

    /// Precision string not recognized.
    #[error("Unknown precision '{0}', expected 'single' or 'double'")]
    UnknownPrecision(String),

    /// Initial state precision does not match the configuration.
    #[error("Simulator runs in {expected:?} precision but the state is {got:?}")]
    PrecisionMismatch {
        /// Configured precision.
        expected: Precision,
        /// Precision of the supplied state.
        got: Precision,
    },

    /// Circuit has already produced a final state.
    #[error("Cannot add operations to a circuit after it is executed")]
    CircuitExecuted,

    /// Qubit was consumed by a measurement.
    #[error("Cannot reuse qubit {0} because it is already measured")]
    QubitAlreadyMeasured(QubitId),

    /// Measurement register name already in use.
    #[error("Register name '{0}' has already been used")]
    DuplicateRegister(String),

    /// Callback result is a matrix where a scalar was requested.
    #[error("Callback result {index} is a matrix, not a scalar")]
    NotScalar {
        /// Index of the result.
        index: usize,
    },

    /// Value handed to an observable is not a state.
    #[error("Unrecognized state representation: {0}")]
    UnrecognizedState(String),

    /// State norm drifted beyond the configured tolerance.
    #[error("State norm {norm} deviates from 1 by more than {tolerance}")]
    NormDrift {
        /// Observed norm.
        norm: f64,
        /// Configured tolerance.
        tolerance: f64,
    },

    /// Hermitian eigendecomposition failed.
    #[error("Eigenvalue computation failed: {0}")]
    Eigen(String),

    /// YAML configuration could not be parsed.
    #[error("YAML configuration error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// JSON configuration could not be parsed.
    #[error("JSON configuration error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration value out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be read.
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

impl SimError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SimError::CircuitExecuted
            | SimError::QubitAlreadyMeasured(_)
            | SimError::DuplicateRegister(_)
            | SimError::PrecisionMismatch { .. } => ErrorKind::State,
            SimError::UnrecognizedState(_) | SimError::NotScalar { .. } => ErrorKind::Type,
            SimError::NormDrift { .. } | SimError::Eigen(_) => ErrorKind::Numeric,
            SimError::Yaml(_)
            | SimError::Json(_)
            | SimError::Io(_)
            | SimError::InvalidConfig(_)
            | SimError::UnknownPrecision(_) => ErrorKind::Config,
            _ => ErrorKind::Validation,
        }
    }
}

/// Result type for simulation operations.
pub type SimResult<T> = Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(SimError::CircuitExecuted.kind(), ErrorKind::State);
        assert_eq!(
            SimError::UnrecognizedState("rank 3".into()).kind(),
            ErrorKind::Type
        );
        assert_eq!(SimError::NotScalar { index: 0 }.kind(), ErrorKind::Type);
        assert_eq!(SimError::InvalidPieceCount(3).kind(), ErrorKind::Validation);
        assert_eq!(
            SimError::IndexOutOfRange { index: 4, len: 1 }.kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn test_error_messages() {
        let err = SimError::IndexOutOfRange { index: 2, len: 1 };
        assert_eq!(
            err.to_string(),
            "Callback index 2 out of range: 1 calls recorded"
        );
    }
}
