//! Reduced density matrices and entanglement entropy.
//!
//! A [`TracePlan`] fixes which qubits survive a partial trace and
//! precomputes the flat-index offsets for the kept and traced axes. The
//! reduced matrix index packs the kept qubits in ascending order, so
//! `kept[i]` is bit `i` of the row/column index.
//!
//! When the requested subsystem holds more than half of the register the
//! plan keeps the complement instead. Both sides of a pure-state
//! bipartition have the same spectrum, so entropies are unchanged while the
//! matrix to diagonalize shrinks.

use faer::{Mat, Side};
use ndarray::{Array2, ArrayView1, ArrayView2, ArrayViewD, Ix1, Ix2};
use num_complex::Complex64;
use qshard_ir::QubitId;

use crate::error::{SimError, SimResult};
use crate::store::qubits_for_len;

/// Eigenvalues at or below this are treated as numerical noise.
pub const EIGVAL_CUTOFF: f64 = 1e-14;

/// A state handed to an observable.
#[derive(Debug, Clone, Copy)]
pub enum StateInput<'a> {
    /// Pure state amplitudes, length `2^n`.
    Vector(ArrayView1<'a, Complex64>),
    /// Density matrix, `2^n × 2^n`.
    Density(ArrayView2<'a, Complex64>),
}

impl<'a> StateInput<'a> {
    /// Borrow a flat amplitude slice.
    pub fn vector(amplitudes: &'a [Complex64]) -> Self {
        StateInput::Vector(ArrayView1::from(amplitudes))
    }

    /// Borrow a density matrix.
    pub fn density(matrix: &'a Array2<Complex64>) -> Self {
        StateInput::Density(matrix.view())
    }

    /// Classify an array of arbitrary rank.
    ///
    /// Rank 1 is a state vector and rank 2 a density matrix; anything else,
    /// or a shape that is not a power of two, is rejected.
    pub fn from_dyn(array: ArrayViewD<'a, Complex64>) -> SimResult<Self> {
        let shape = array.shape().to_vec();
        let input = match shape.as_slice() {
            [_] => array
                .into_dimensionality::<Ix1>()
                .map(StateInput::Vector)
                .map_err(|e| SimError::UnrecognizedState(e.to_string()))?,
            [rows, cols] if rows == cols => array
                .into_dimensionality::<Ix2>()
                .map(StateInput::Density)
                .map_err(|e| SimError::UnrecognizedState(e.to_string()))?,
            _ => {
                return Err(SimError::UnrecognizedState(format!(
                    "array of shape {shape:?} is neither a state vector nor a square density matrix"
                )));
            }
        };
        input.num_qubits()?;
        Ok(input)
    }

    /// Register size implied by the shape.
    pub fn num_qubits(&self) -> SimResult<usize> {
        let len = match self {
            StateInput::Vector(v) => v.len(),
            StateInput::Density(m) => m.nrows(),
        };
        qubits_for_len(len).map_err(|_| {
            SimError::UnrecognizedState(format!("dimension {len} is not a power of two"))
        })
    }
}

/// Default retained subsystem: the first `⌈n/2⌉` qubits.
pub fn default_subsystem(num_qubits: usize) -> Vec<QubitId> {
    (0..num_qubits / 2 + num_qubits % 2)
        .map(QubitId::from)
        .collect()
}

/// Precomputed partial-trace contraction for a fixed subsystem and register
/// size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracePlan {
    num_qubits: usize,
    kept: Vec<usize>,
    traced: Vec<usize>,
    switched: bool,
    kept_offsets: Vec<usize>,
    traced_offsets: Vec<usize>,
    subsystem_offsets: Vec<usize>,
    complement_offsets: Vec<usize>,
}

impl TracePlan {
    /// Build the plan retaining `subsystem` of an `num_qubits`-qubit
    /// register.
    ///
    /// Fails when a qubit is out of range or listed twice.
    pub fn new(subsystem: &[QubitId], num_qubits: usize) -> SimResult<Self> {
        let mut requested: Vec<usize> = Vec::with_capacity(subsystem.len());
        for q in subsystem {
            let q = q.index();
            if q >= num_qubits {
                return Err(SimError::InvalidSubsystem(format!(
                    "qubit {q} outside a {num_qubits}-qubit register"
                )));
            }
            if requested.contains(&q) {
                return Err(SimError::InvalidSubsystem(format!("qubit {q} listed twice")));
            }
            requested.push(q);
        }
        requested.sort_unstable();

        let complement: Vec<usize> = (0..num_qubits)
            .filter(|q| requested.binary_search(q).is_err())
            .collect();
        let subsystem_offsets = offsets(&requested);
        let complement_offsets = offsets(&complement);
        let switched = 2 * requested.len() > num_qubits;
        let (kept, traced, kept_offsets, traced_offsets) = if switched {
            (
                complement,
                requested,
                complement_offsets.clone(),
                subsystem_offsets.clone(),
            )
        } else {
            (
                requested,
                complement,
                subsystem_offsets.clone(),
                complement_offsets.clone(),
            )
        };

        Ok(Self {
            num_qubits,
            kept,
            traced,
            switched,
            kept_offsets,
            traced_offsets,
            subsystem_offsets,
            complement_offsets,
        })
    }

    /// Register size the plan was built for.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Qubits surviving the trace of a state vector, ascending.
    pub fn kept(&self) -> &[usize] {
        &self.kept
    }

    /// Qubits traced out, ascending.
    pub fn traced(&self) -> &[usize] {
        &self.traced
    }

    /// True if a state vector is reduced to the complement of the requested
    /// subsystem.
    pub fn is_switched(&self) -> bool {
        self.switched
    }

    /// Side length of the reduced matrix of a state vector.
    pub fn rho_dim(&self) -> usize {
        self.kept_offsets.len()
    }

    /// Side length of the reduced matrix of a density matrix, which always
    /// keeps the requested subsystem.
    pub fn density_rho_dim(&self) -> usize {
        self.subsystem_offsets.len()
    }

    /// Reduced density matrix.
    ///
    /// A state vector is reduced to the smaller side of the bipartition; both
    /// sides of a pure state share a spectrum. A density matrix may be mixed,
    /// so its complement is always traced out.
    pub fn reduced_density(&self, state: &StateInput<'_>) -> SimResult<Array2<Complex64>> {
        let num_qubits = state.num_qubits()?;
        if num_qubits != self.num_qubits {
            return Err(SimError::QubitCountMismatch {
                expected: self.num_qubits,
                got: num_qubits,
            });
        }

        let rho = match state {
            StateInput::Vector(psi) => {
                let dk = self.kept_offsets.len();
                let dt = self.traced_offsets.len();
                let m = Array2::from_shape_fn((dk, dt), |(a, t)| {
                    psi[self.kept_offsets[a] + self.traced_offsets[t]]
                });
                let m_dag = m.t().mapv(|z| z.conj());
                m.dot(&m_dag)
            }
            StateInput::Density(d) => {
                let ds = self.subsystem_offsets.len();
                Array2::from_shape_fn((ds, ds), |(a, b)| {
                    let (ra, rb) = (self.subsystem_offsets[a], self.subsystem_offsets[b]);
                    self.complement_offsets
                        .iter()
                        .map(|&t| d[[ra + t, rb + t]])
                        .sum()
                })
            }
        };
        Ok(rho)
    }

    /// Von Neumann entropy (base 2) of the requested subsystem.
    pub fn entropy(&self, state: &StateInput<'_>) -> SimResult<f64> {
        entropy(&self.reduced_density(state)?)
    }
}

/// Flat-index offset of every assignment of `qubits`; entry `a` sets
/// `qubits[i]` to bit `i` of `a`.
fn offsets(qubits: &[usize]) -> Vec<usize> {
    (0..1usize << qubits.len())
        .map(|a| {
            qubits
                .iter()
                .enumerate()
                .fold(0, |acc, (i, &q)| acc | (((a >> i) & 1) << q))
        })
        .collect()
}

/// Reduced density matrix of `state` over `subsystem`; a state vector is
/// reduced to the smaller side instead.
pub fn reduced_density(
    state: &StateInput<'_>,
    subsystem: &[QubitId],
) -> SimResult<Array2<Complex64>> {
    TracePlan::new(subsystem, state.num_qubits()?)?.reduced_density(state)
}

/// Von Neumann entropy `-Σ λ log2 λ` of a Hermitian matrix.
pub fn entropy(rho: &Array2<Complex64>) -> SimResult<f64> {
    let (rows, cols) = rho.dim();
    if rows != cols {
        return Err(SimError::UnrecognizedState(format!(
            "density matrix must be square, got {rows}x{cols}"
        )));
    }
    let m = Mat::<Complex64>::from_fn(rows, cols, |i, j| rho[[i, j]]);
    let eigenvalues = m
        .as_ref()
        .self_adjoint_eigenvalues(Side::Lower)
        .map_err(|e| SimError::Eigen(format!("{e:?}")))?;
    Ok(entropy_from_eigenvalues(&eigenvalues))
}

/// Entropy from a spectrum, ignoring eigenvalues at or below
/// [`EIGVAL_CUTOFF`].
pub fn entropy_from_eigenvalues(eigenvalues: &[f64]) -> f64 {
    let s: f64 = eigenvalues
        .iter()
        .filter(|&&l| l > EIGVAL_CUTOFF)
        .map(|&l| -l * l.log2())
        .sum();
    // Empty or pure spectra sum to -0.0
    if s > 0.0 { s } else { 0.0 }
}

/// Squared norm of a vector, or trace of a density matrix.
pub fn norm_sqr(state: &StateInput<'_>) -> f64 {
    match state {
        StateInput::Vector(psi) => psi.iter().map(Complex64::norm_sqr).sum(),
        StateInput::Density(d) => d.diag().iter().map(|z| z.re).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array3, IxDyn};
    use std::f64::consts::FRAC_1_SQRT_2;

    fn c(re: f64) -> Complex64 {
        Complex64::new(re, 0.0)
    }

    fn bell() -> Vec<Complex64> {
        vec![c(FRAC_1_SQRT_2), c(0.0), c(0.0), c(FRAC_1_SQRT_2)]
    }

    fn outer(psi: &[Complex64]) -> Array2<Complex64> {
        Array2::from_shape_fn((psi.len(), psi.len()), |(i, j)| psi[i] * psi[j].conj())
    }

    #[test]
    fn test_bell_reduced_density() {
        let psi = bell();
        let rho = reduced_density(&StateInput::vector(&psi), &[QubitId(0)]).unwrap();
        assert_eq!(rho.dim(), (2, 2));
        assert!((rho[[0, 0]].re - 0.5).abs() < 1e-12);
        assert!((rho[[1, 1]].re - 0.5).abs() < 1e-12);
        assert!(rho[[0, 1]].norm() < 1e-12);
        assert!((entropy(&rho).unwrap() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_product_state_entropy_is_zero() {
        // |0> ⊗ |+> ⊗ |1>
        let mut psi = vec![c(0.0); 8];
        psi[0b100] = c(FRAC_1_SQRT_2);
        psi[0b110] = c(FRAC_1_SQRT_2);
        for subsystem in [vec![QubitId(0)], vec![QubitId(1)], vec![QubitId(0), QubitId(2)]] {
            let plan = TracePlan::new(&subsystem, 3).unwrap();
            let s = plan.entropy(&StateInput::vector(&psi)).unwrap();
            assert!(s.abs() < 1e-8, "subsystem {subsystem:?}: {s}");
        }
    }

    #[test]
    fn test_kept_index_order() {
        // |q0=1, q1=0, q2=0>: keeping q0 must put the weight on index 1.
        let mut psi = vec![c(0.0); 8];
        psi[0b001] = c(1.0);
        let rho = reduced_density(&StateInput::vector(&psi), &[QubitId(0)]).unwrap();
        assert!((rho[[1, 1]].re - 1.0).abs() < 1e-12);

        let plan = TracePlan::new(&[QubitId(2), QubitId(1)], 3).unwrap();
        assert!(plan.is_switched());
        assert_eq!(plan.kept(), &[0]);

        // Keeping q1 and q2 of |q2=1, q1=0, q0=0, q3=0>: q1 is bit 0, q2 is bit 1.
        let plan = TracePlan::new(&[QubitId(2), QubitId(1)], 4).unwrap();
        assert!(!plan.is_switched());
        let mut psi4 = vec![c(0.0); 16];
        psi4[0b0100] = c(1.0);
        let rho = plan.reduced_density(&StateInput::vector(&psi4)).unwrap();
        assert!((rho[[0b10, 0b10]].re - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_partition_switch() {
        let plan = TracePlan::new(&[QubitId(0), QubitId(1), QubitId(2)], 4).unwrap();
        assert!(plan.is_switched());
        assert_eq!(plan.kept(), &[3]);
        assert_eq!(plan.traced(), &[0, 1, 2]);
        assert_eq!(plan.rho_dim(), 2);

        let plan = TracePlan::new(&[QubitId(0), QubitId(1)], 4).unwrap();
        assert!(!plan.is_switched());
        assert_eq!(plan.rho_dim(), 4);
    }

    #[test]
    fn test_density_matrix_input_matches_vector() {
        let psi: Vec<Complex64> = (0..8)
            .map(|i| Complex64::new(i as f64, 1.0 - i as f64))
            .collect();
        let norm = psi.iter().map(Complex64::norm_sqr).sum::<f64>().sqrt();
        let psi: Vec<Complex64> = psi.iter().map(|a| a / norm).collect();
        let rho_full = outer(&psi);

        let plan = TracePlan::new(&[QubitId(1)], 3).unwrap();
        let a = plan.reduced_density(&StateInput::vector(&psi)).unwrap();
        let b = plan.reduced_density(&StateInput::density(&rho_full)).unwrap();
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).norm() < 1e-12);
        }
        let trace: Complex64 = a.diag().sum();
        assert!((trace.re - 1.0).abs() < 1e-12);
        assert!((norm_sqr(&StateInput::density(&rho_full)) - 1.0).abs() < 1e-12);
    }

    /// |0⟩⟨0| on qubit 0 tensored with I/4 on qubits 1 and 2.
    fn mixed_product() -> Array2<Complex64> {
        Array2::from_shape_fn((8, 8), |(i, j)| {
            if i == j && i & 1 == 0 { c(0.25) } else { c(0.0) }
        })
    }

    #[test]
    fn test_mixed_density_keeps_requested_subsystem() {
        let rho = mixed_product();
        let input = StateInput::density(&rho);

        // {1, 2} would switch to {0} for a state vector
        let plan = TracePlan::new(&[QubitId(1), QubitId(2)], 3).unwrap();
        assert!(plan.is_switched());
        assert_eq!(plan.density_rho_dim(), 4);
        let reduced = plan.reduced_density(&input).unwrap();
        assert_eq!(reduced.dim(), (4, 4));
        for ((i, j), v) in reduced.indexed_iter() {
            let expected = if i == j { 0.25 } else { 0.0 };
            assert!((v - c(expected)).norm() < 1e-12);
        }
        assert!((plan.entropy(&input).unwrap() - 2.0).abs() < 1e-10);

        let plan = TracePlan::new(&[QubitId(1)], 3).unwrap();
        assert!(!plan.is_switched());
        assert!((plan.entropy(&input).unwrap() - 1.0).abs() < 1e-10);

        let plan = TracePlan::new(&[QubitId(0)], 3).unwrap();
        assert_eq!(plan.entropy(&input).unwrap(), 0.0);
    }

    #[test]
    fn test_entropy_is_never_negative_zero() {
        assert!(entropy_from_eigenvalues(&[]).is_sign_positive());
        assert!(entropy_from_eigenvalues(&[1.0]).is_sign_positive());
        assert!(entropy_from_eigenvalues(&[1e-16, 1.0]).is_sign_positive());

        let psi = bell();
        let plan = TracePlan::new(&[], 2).unwrap();
        let s = plan.entropy(&StateInput::vector(&psi)).unwrap();
        assert!(s == 0.0 && s.is_sign_positive());
    }

    #[test]
    fn test_plan_rejects_mismatched_state() {
        let plan = TracePlan::new(&[QubitId(0)], 3).unwrap();
        let psi = bell();
        assert!(matches!(
            plan.reduced_density(&StateInput::vector(&psi)),
            Err(SimError::QubitCountMismatch {
                expected: 3,
                got: 2
            })
        ));
    }

    #[test]
    fn test_plan_rejects_bad_subsystem() {
        assert!(matches!(
            TracePlan::new(&[QubitId(3)], 3),
            Err(SimError::InvalidSubsystem(_))
        ));
        assert!(matches!(
            TracePlan::new(&[QubitId(1), QubitId(1)], 3),
            Err(SimError::InvalidSubsystem(_))
        ));
    }

    #[test]
    fn test_from_dyn() {
        let v = Array1::from(bell());
        let input = StateInput::from_dyn(v.view().into_dyn()).unwrap();
        assert_eq!(input.num_qubits().unwrap(), 2);

        let m = outer(&bell());
        assert!(matches!(
            StateInput::from_dyn(m.view().into_dyn()).unwrap(),
            StateInput::Density(_)
        ));

        let odd = Array1::from(vec![c(1.0); 3]);
        assert!(matches!(
            StateInput::from_dyn(odd.view().into_dyn()),
            Err(SimError::UnrecognizedState(_))
        ));
        let cube = Array3::<Complex64>::zeros((2, 2, 2));
        assert!(StateInput::from_dyn(cube.view().into_dyn()).is_err());
        let rect = ndarray::ArrayD::<Complex64>::zeros(IxDyn(&[2, 4]));
        assert!(StateInput::from_dyn(rect.view()).is_err());
    }

    #[test]
    fn test_eigenvalue_cutoff() {
        assert_eq!(entropy_from_eigenvalues(&[1.0, 1e-15, -1e-16]), 0.0);
        assert!((entropy_from_eigenvalues(&[0.5, 0.5, 1e-20]) - 1.0).abs() < 1e-12);
        assert_eq!(entropy_from_eigenvalues(&[0.0, -1e-17]), 0.0);
    }

    #[test]
    fn test_default_subsystem() {
        assert_eq!(default_subsystem(5), vec![QubitId(0), QubitId(1), QubitId(2)]);
        assert_eq!(default_subsystem(4).len(), 2);
        assert!(default_subsystem(0).is_empty());
    }
}
