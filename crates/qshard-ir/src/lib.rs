//! qshard Gate Representation
//!
//! This crate provides the gate records consumed by the `qshard-sim`
//! state-vector engine. A gate is a dense unitary plus the ordered list of
//! qubit axes it contracts against and an optional list of control qubits.
//!
//! # Conventions
//!
//! - Qubit 0 is the least-significant bit of a flat amplitude index.
//! - For a gate with targets `[t0, t1, ...]`, `t0` is the most significant
//!   bit of the matrix row/column index.
//! - A controlled gate acts as the identity outside the subspace where all
//!   controls read 1.
//!
//! # Example
//!
//! ```rust
//! use qshard_ir::{Gate, QubitId};
//!
//! let h = Gate::h(QubitId(0));
//! let cx = Gate::cnot(QubitId(0), QubitId(1)).unwrap();
//!
//! assert_eq!(h.matrix().dim(), (2, 2));
//! assert_eq!(cx.controls(), &[QubitId(0)]);
//! ```
//!
//! # Supported Gates
//!
//! | Gate | Qubits | Constructor |
//! |------|--------|-------------|
//! | `H`, `X`, `Y`, `Z`, `S`, `T` | 1 | [`Gate::h`] etc. |
//! | `Rx`, `Ry`, `Rz`, `U` | 1 | [`Gate::rx`] etc. |
//! | `CX`, `CZ` | 2 | [`Gate::cnot`], [`Gate::cz`] |
//! | `Swap` | 2 | [`Gate::swap`] |
//! | `CCX` | 3 | [`Gate::toffoli`] |
//! | any | k | [`Gate::unitary`] + [`Gate::controlled_by`] |

pub mod error;
pub mod gate;
pub mod matrix;
pub mod qubit;

pub use error::{IrError, IrResult};
pub use gate::Gate;
pub use qubit::QubitId;
