//! Gate records.
//!
//! A [`Gate`] is an immutable unitary matrix together with the ordered
//! target qubits it acts on and an optional set of control qubits. The
//! order of `targets` is part of the gate's identity: `targets[0]` maps to
//! the most significant bit of the matrix row/column index.

use ndarray::Array2;
use num_complex::Complex64;

use crate::error::{IrError, IrResult};
use crate::matrix;
use crate::qubit::QubitId;

/// A unitary operation on a subset of qubits.
#[derive(Debug, Clone, PartialEq)]
pub struct Gate {
    name: String,
    matrix: Array2<Complex64>,
    targets: Vec<QubitId>,
    controls: Vec<QubitId>,
    num_qubits: Option<u32>,
}

impl Gate {
    /// Create a gate from an explicit matrix and ordered targets.
    ///
    /// Fails when `targets` is empty, contains duplicates, or the matrix is
    /// not `2^k × 2^k` for `k = targets.len()`.
    pub fn new(
        name: impl Into<String>,
        matrix: Array2<Complex64>,
        targets: impl IntoIterator<Item = QubitId>,
    ) -> IrResult<Self> {
        let name = name.into();
        let targets: Vec<QubitId> = targets.into_iter().collect();

        if targets.is_empty() {
            return Err(IrError::EmptyTargets { gate_name: name });
        }
        check_unique(&targets, &name)?;

        let k = targets.len();
        let expected = 1usize << k;
        let (rows, cols) = matrix.dim();
        if rows != expected || cols != expected {
            return Err(IrError::MatrixShape {
                gate_name: name,
                num_targets: k,
                expected,
                rows,
                cols,
            });
        }

        Ok(Self {
            name,
            matrix,
            targets,
            controls: vec![],
            num_qubits: None,
        })
    }

    /// Arbitrary unitary on the given targets.
    pub fn unitary(
        matrix: Array2<Complex64>,
        targets: impl IntoIterator<Item = QubitId>,
    ) -> IrResult<Self> {
        Self::new("unitary", matrix, targets)
    }

    /// Restrict the gate to the subspace where every control reads 1.
    ///
    /// Controls accumulate over repeated calls.
    pub fn controlled_by(mut self, controls: impl IntoIterator<Item = QubitId>) -> IrResult<Self> {
        for control in controls {
            if self.targets.contains(&control) {
                return Err(IrError::TargetControlOverlap {
                    qubit: control,
                    gate_name: self.name,
                });
            }
            if self.controls.contains(&control) {
                return Err(IrError::DuplicateQubit {
                    qubit: control,
                    gate_name: self.name,
                });
            }
            self.controls.push(control);
        }
        if let Some(n) = self.num_qubits {
            self.check_range(n)?;
        }
        Ok(self)
    }

    /// Bind the gate to a register of `num_qubits` qubits.
    pub fn with_num_qubits(mut self, num_qubits: u32) -> IrResult<Self> {
        self.bind_num_qubits(num_qubits)?;
        Ok(self)
    }

    /// Bind an unbound gate, or check that a bound gate matches.
    pub fn bind_num_qubits(&mut self, num_qubits: u32) -> IrResult<()> {
        match self.num_qubits {
            Some(bound) if bound != num_qubits => Err(IrError::QubitCountMismatch {
                gate_name: self.name.clone(),
                expected: bound,
                got: num_qubits,
            }),
            _ => {
                self.check_range(num_qubits)?;
                self.num_qubits = Some(num_qubits);
                Ok(())
            }
        }
    }

    /// Check that every target and control lies in `[0, num_qubits)`.
    pub fn check_range(&self, num_qubits: u32) -> IrResult<()> {
        match self.qubits().find(|q| q.0 >= num_qubits) {
            Some(qubit) => Err(IrError::QubitOutOfRange {
                qubit,
                num_qubits,
                gate_name: self.name.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Name of the gate.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The `2^k × 2^k` unitary.
    pub fn matrix(&self) -> &Array2<Complex64> {
        &self.matrix
    }

    /// Ordered target qubits.
    pub fn targets(&self) -> &[QubitId] {
        &self.targets
    }

    /// Control qubits.
    pub fn controls(&self) -> &[QubitId] {
        &self.controls
    }

    /// Register size the gate is bound to, if any.
    pub fn num_qubits(&self) -> Option<u32> {
        self.num_qubits
    }

    /// Targets followed by controls.
    pub fn qubits(&self) -> impl Iterator<Item = QubitId> + '_ {
        self.targets.iter().chain(self.controls.iter()).copied()
    }

    // =========================================================================
    // Standard gates
    // =========================================================================

    /// Hadamard gate.
    pub fn h(qubit: QubitId) -> Self {
        Self::standard("h", matrix::h(), vec![qubit])
    }

    /// Pauli-X gate.
    pub fn x(qubit: QubitId) -> Self {
        Self::standard("x", matrix::x(), vec![qubit])
    }

    /// Pauli-Y gate.
    pub fn y(qubit: QubitId) -> Self {
        Self::standard("y", matrix::y(), vec![qubit])
    }

    /// Pauli-Z gate.
    pub fn z(qubit: QubitId) -> Self {
        Self::standard("z", matrix::z(), vec![qubit])
    }

    /// S gate.
    pub fn s(qubit: QubitId) -> Self {
        Self::standard("s", matrix::s(), vec![qubit])
    }

    /// T gate.
    pub fn t(qubit: QubitId) -> Self {
        Self::standard("t", matrix::t(), vec![qubit])
    }

    /// Rotation around X.
    pub fn rx(qubit: QubitId, theta: f64) -> Self {
        Self::standard("rx", matrix::rx(theta), vec![qubit])
    }

    /// Rotation around Y.
    pub fn ry(qubit: QubitId, theta: f64) -> Self {
        Self::standard("ry", matrix::ry(theta), vec![qubit])
    }

    /// Rotation around Z.
    pub fn rz(qubit: QubitId, theta: f64) -> Self {
        Self::standard("rz", matrix::rz(theta), vec![qubit])
    }

    /// Universal single-qubit gate U(θ, φ, λ).
    pub fn u(qubit: QubitId, theta: f64, phi: f64, lambda: f64) -> Self {
        Self::standard("u", matrix::u(theta, phi, lambda), vec![qubit])
    }

    /// Controlled-X. Fails if `control == target`.
    pub fn cnot(control: QubitId, target: QubitId) -> IrResult<Self> {
        Self::standard("cx", matrix::x(), vec![target]).controlled_by([control])
    }

    /// Controlled-Z. Fails if `control == target`.
    pub fn cz(control: QubitId, target: QubitId) -> IrResult<Self> {
        Self::standard("cz", matrix::z(), vec![target]).controlled_by([control])
    }

    /// SWAP gate. Fails if both qubits are equal.
    pub fn swap(a: QubitId, b: QubitId) -> IrResult<Self> {
        Self::new("swap", matrix::swap(), [a, b])
    }

    /// Toffoli (CCX) gate.
    pub fn toffoli(c1: QubitId, c2: QubitId, target: QubitId) -> IrResult<Self> {
        Self::standard("ccx", matrix::x(), vec![target]).controlled_by([c1, c2])
    }

    /// Single-target gates built from a known-good matrix.
    fn standard(name: &str, matrix: Array2<Complex64>, targets: Vec<QubitId>) -> Self {
        Self {
            name: name.to_string(),
            matrix,
            targets,
            controls: vec![],
            num_qubits: None,
        }
    }
}

fn check_unique(qubits: &[QubitId], gate_name: &str) -> IrResult<()> {
    for (i, q) in qubits.iter().enumerate() {
        if qubits[..i].contains(q) {
            return Err(IrError::DuplicateQubit {
                qubit: *q,
                gate_name: gate_name.to_string(),
            });
        }
    }
    Ok(())
}
