//! Error types for the IR crate.

use crate::qubit::QubitId;
use thiserror::Error;

/// Errors raised while building or validating gates.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrError {
    /// A gate was built without any target qubit.
    #[error("Gate '{gate_name}' has no target qubits")]
    EmptyTargets {
        /// Name of the gate.
        gate_name: String,
    },

    /// A qubit index lies outside the register.
    #[error("Qubit {qubit} out of range for a {num_qubits}-qubit register (gate: {gate_name})")]
    QubitOutOfRange {
        /// The offending qubit.
        qubit: QubitId,
        /// Size of the register.
        num_qubits: u32,
        /// Name of the gate.
        gate_name: String,
    },

    /// The same qubit appears twice among targets or controls.
    #[error("Duplicate qubit {qubit} in operation (gate: {gate_name})")]
    DuplicateQubit {
        /// The duplicate qubit.
        qubit: QubitId,
        /// Name of the gate.
        gate_name: String,
    },

    /// A qubit is used both as target and as control.
    #[error("Qubit {qubit} is both target and control (gate: {gate_name})")]
    TargetControlOverlap {
        /// The shared qubit.
        qubit: QubitId,
        /// Name of the gate.
        gate_name: String,
    },

    /// Matrix shape does not match the number of targets.
    #[error(
        "Gate '{gate_name}' with {num_targets} targets needs a {expected}x{expected} matrix, got {rows}x{cols}"
    )]
    MatrixShape {
        /// Name of the gate.
        gate_name: String,
        /// Number of target qubits.
        num_targets: usize,
        /// Expected side length (2^targets).
        expected: usize,
        /// Actual number of rows.
        rows: usize,
        /// Actual number of columns.
        cols: usize,
    },

    /// Gate is bound to a register of a different size.
    #[error("Gate '{gate_name}' is bound to {expected} qubits, got {got}")]
    QubitCountMismatch {
        /// Name of the gate.
        gate_name: String,
        /// Qubit count the gate was bound to.
        expected: u32,
        /// Qubit count it was used with.
        got: u32,
    },
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;
