//! Gate application kernels.
//!
//! A flat buffer of `2^n` amplitudes is viewed as a rank-`n` tensor with
//! one binary axis per qubit. Applying a `2^k × 2^k` matrix to an ordered
//! list of `k` target axes updates every `2^k`-amplitude block that shares
//! the same values on the remaining axes. Controls restrict the update to
//! the blocks where every control axis reads 1.

use ndarray::Array2;
use num_complex::Complex;
use qshard_ir::{Gate, IrError, QubitId};

use crate::error::{SimError, SimResult};
use crate::precision::{Real, narrow_matrix};
use crate::store::qubits_for_len;

/// A gate with its matrix cast to the working precision and its qubits
/// lowered to plain axis positions.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedGate<T: Real> {
    name: String,
    matrix: Array2<Complex<T>>,
    targets: Vec<usize>,
    controls: Vec<usize>,
}

impl<T: Real> PreparedGate<T> {
    /// Build a prepared gate from raw parts.
    ///
    /// # Arguments
    ///
    /// * `name` - Label used in error messages
    /// * `matrix` - `2^k × 2^k` matrix, `k = targets.len()`
    /// * `targets` - Ordered target axes; `targets[0]` is the most
    ///   significant bit of the matrix index
    /// * `controls` - Control axes, disjoint from `targets`
    pub fn new(
        name: impl Into<String>,
        matrix: Array2<Complex<T>>,
        targets: Vec<usize>,
        controls: Vec<usize>,
    ) -> SimResult<Self> {
        let name = name.into();
        validate_axes(&name, matrix.dim(), &targets, &controls)?;
        Ok(Self {
            name,
            matrix,
            targets,
            controls,
        })
    }

    /// Lower a validated [`Gate`] to the working precision.
    pub fn from_gate(gate: &Gate) -> Self {
        Self {
            name: gate.name().to_string(),
            matrix: narrow_matrix(gate.matrix()),
            targets: gate.targets().iter().map(|q| q.index()).collect(),
            controls: gate.controls().iter().map(|q| q.index()).collect(),
        }
    }

    /// Gate label.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Matrix in the working precision.
    pub fn matrix(&self) -> &Array2<Complex<T>> {
        &self.matrix
    }

    /// Ordered target axes.
    pub fn targets(&self) -> &[usize] {
        &self.targets
    }

    /// Control axes.
    pub fn controls(&self) -> &[usize] {
        &self.controls
    }

    /// Check that every axis lies inside an `num_qubits`-qubit register.
    pub fn check_range(&self, num_qubits: usize) -> SimResult<()> {
        match self
            .targets
            .iter()
            .chain(&self.controls)
            .find(|&&q| q >= num_qubits)
        {
            Some(&q) => Err(IrError::QubitOutOfRange {
                qubit: QubitId::from(q),
                num_qubits: u32::try_from(num_qubits).unwrap_or(u32::MAX),
                gate_name: self.name.clone(),
            }
            .into()),
            None => Ok(()),
        }
    }

    /// Apply the gate in place to a full amplitude buffer.
    ///
    /// Fails if the buffer length is not a power of two or if any axis lies
    /// outside the register.
    pub fn apply(&self, amplitudes: &mut [Complex<T>]) -> SimResult<()> {
        let num_qubits = qubits_for_len(amplitudes.len())?;
        self.check_range(num_qubits)?;
        apply_unchecked(amplitudes, &self.matrix, &self.targets, &self.controls);
        Ok(())
    }

    /// Apply the matrix with substituted axes. The caller guarantees the
    /// axes are valid for the buffer.
    pub(crate) fn apply_remapped(
        &self,
        amplitudes: &mut [Complex<T>],
        targets: &[usize],
        controls: &[usize],
    ) {
        apply_unchecked(amplitudes, &self.matrix, targets, controls);
    }
}

/// Apply `matrix` to `targets` of `amplitudes`, restricted to `controls`.
///
/// This is the free-standing form of [`PreparedGate::apply`].
pub fn apply_matrix<T: Real>(
    amplitudes: &mut [Complex<T>],
    matrix: &Array2<Complex<T>>,
    targets: &[usize],
    controls: &[usize],
) -> SimResult<()> {
    validate_axes("unitary", matrix.dim(), targets, controls)?;
    let num_qubits = qubits_for_len(amplitudes.len())?;
    if let Some(&q) = targets.iter().chain(controls).find(|&&q| q >= num_qubits) {
        return Err(IrError::QubitOutOfRange {
            qubit: QubitId::from(q),
            num_qubits: u32::try_from(num_qubits).unwrap_or(u32::MAX),
            gate_name: "unitary".into(),
        }
        .into());
    }
    apply_unchecked(amplitudes, matrix, targets, controls);
    Ok(())
}

fn validate_axes(
    name: &str,
    (rows, cols): (usize, usize),
    targets: &[usize],
    controls: &[usize],
) -> SimResult<()> {
    if targets.is_empty() {
        return Err(IrError::EmptyTargets {
            gate_name: name.to_string(),
        }
        .into());
    }
    for (i, &q) in targets.iter().enumerate() {
        if targets[..i].contains(&q) {
            return Err(duplicate(q, name));
        }
    }
    for (i, &q) in controls.iter().enumerate() {
        if targets.contains(&q) {
            return Err(IrError::TargetControlOverlap {
                qubit: QubitId::from(q),
                gate_name: name.to_string(),
            }
            .into());
        }
        if controls[..i].contains(&q) {
            return Err(duplicate(q, name));
        }
    }
    let expected = 1usize << targets.len();
    if rows != expected || cols != expected {
        return Err(IrError::MatrixShape {
            gate_name: name.to_string(),
            num_targets: targets.len(),
            expected,
            rows,
            cols,
        }
        .into());
    }
    Ok(())
}

fn duplicate(q: usize, name: &str) -> SimError {
    IrError::DuplicateQubit {
        qubit: QubitId::from(q),
        gate_name: name.to_string(),
    }
    .into()
}

// =========================================================================
// Kernels
// =========================================================================

fn apply_unchecked<T: Real>(
    amplitudes: &mut [Complex<T>],
    matrix: &Array2<Complex<T>>,
    targets: &[usize],
    controls: &[usize],
) {
    let control_mask = controls.iter().fold(0usize, |m, &c| m | (1 << c));
    if targets.len() == 1 {
        apply_single(amplitudes, matrix, targets[0], control_mask);
    } else {
        apply_multi(amplitudes, matrix, targets, controls, control_mask);
    }
}

fn apply_single<T: Real>(
    amplitudes: &mut [Complex<T>],
    matrix: &Array2<Complex<T>>,
    target: usize,
    control_mask: usize,
) {
    let mask = 1usize << target;
    let (m00, m01, m10, m11) = (
        matrix[[0, 0]],
        matrix[[0, 1]],
        matrix[[1, 0]],
        matrix[[1, 1]],
    );
    for i in 0..amplitudes.len() {
        if i & mask == 0 && i & control_mask == control_mask {
            let j = i | mask;
            let a = amplitudes[i];
            let b = amplitudes[j];
            amplitudes[i] = m00 * a + m01 * b;
            amplitudes[j] = m10 * a + m11 * b;
        }
    }
}

fn apply_multi<T: Real>(
    amplitudes: &mut [Complex<T>],
    matrix: &Array2<Complex<T>>,
    targets: &[usize],
    controls: &[usize],
    control_mask: usize,
) {
    let num_qubits = amplitudes.len().trailing_zeros() as usize;
    let k = targets.len();
    let dim = 1usize << k;

    // Row r of the matrix addresses the amplitude at base + offsets[r].
    let offsets: Vec<usize> = (0..dim)
        .map(|r| {
            targets
                .iter()
                .enumerate()
                .filter(|(j, _)| (r >> (k - 1 - j)) & 1 == 1)
                .fold(0usize, |acc, (_, &t)| acc | (1 << t))
        })
        .collect();

    let mut fixed: Vec<usize> = targets.iter().chain(controls).copied().collect();
    fixed.sort_unstable();
    let free = num_qubits - fixed.len();

    let zero = Complex::new(T::zero(), T::zero());
    let mut block = vec![zero; dim];
    for g in 0..(1usize << free) {
        let base = insert_zero_bits(g, &fixed) | control_mask;
        for (slot, &off) in block.iter_mut().zip(&offsets) {
            *slot = amplitudes[base + off];
        }
        for (r, &off) in offsets.iter().enumerate() {
            let mut acc = zero;
            for (c, &v) in block.iter().enumerate() {
                acc += matrix[[r, c]] * v;
            }
            amplitudes[base + off] = acc;
        }
    }
}

/// Spread the bits of `value` so that a zero sits at every position in
/// `positions` (ascending).
#[inline]
pub(crate) fn insert_zero_bits(mut value: usize, positions: &[usize]) -> usize {
    for &p in positions {
        let low = value & ((1usize << p) - 1);
        value = ((value >> p) << (p + 1)) | low;
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;
    use qshard_ir::matrix;

    fn c(re: f64) -> Complex64 {
        Complex64::new(re, 0.0)
    }

    fn basis(n: usize, index: usize) -> Vec<Complex64> {
        let mut v = vec![c(0.0); 1 << n];
        v[index] = c(1.0);
        v
    }

    #[test]
    fn test_insert_zero_bits() {
        assert_eq!(insert_zero_bits(0b11, &[1]), 0b101);
        assert_eq!(insert_zero_bits(0b111, &[0, 2]), 0b11010);
        assert_eq!(insert_zero_bits(5, &[]), 5);
    }

    #[test]
    fn test_x_on_qubit_zero() {
        let mut state = basis(2, 0);
        apply_matrix(&mut state, &matrix::x(), &[0], &[]).unwrap();
        assert_eq!(state, basis(2, 1));
    }

    #[test]
    fn test_target_order_is_msb_first() {
        // X ⊗ I on targets [1, 0] flips qubit 1 only.
        let xi = ndarray::linalg::kron(&matrix::x(), &matrix::identity(1));
        let mut state = basis(2, 0);
        apply_matrix(&mut state, &xi, &[1, 0], &[]).unwrap();
        assert_eq!(state, basis(2, 0b10));

        let mut state = basis(2, 0);
        apply_matrix(&mut state, &xi, &[0, 1], &[]).unwrap();
        assert_eq!(state, basis(2, 0b01));
    }

    #[test]
    fn test_controlled_gate_identity_when_control_is_zero() {
        let mut state = basis(3, 0b000);
        apply_matrix(&mut state, &matrix::x(), &[2], &[0]).unwrap();
        assert_eq!(state, basis(3, 0b000));

        let mut state = basis(3, 0b001);
        apply_matrix(&mut state, &matrix::x(), &[2], &[0]).unwrap();
        assert_eq!(state, basis(3, 0b101));
    }

    #[test]
    fn test_multi_target_with_control() {
        let mut state = basis(3, 0b100);
        apply_matrix(&mut state, &matrix::swap(), &[0, 1], &[2]).unwrap();
        assert_eq!(state, basis(3, 0b100));

        let mut state = basis(3, 0b101);
        apply_matrix(&mut state, &matrix::swap(), &[0, 1], &[2]).unwrap();
        assert_eq!(state, basis(3, 0b110));
    }

    #[test]
    fn test_single_precision() {
        let mut state = vec![Complex::<f32>::new(1.0, 0.0), Complex::new(0.0, 0.0)];
        let h: Array2<Complex<f32>> = narrow_matrix(&matrix::h());
        apply_matrix(&mut state, &h, &[0], &[]).unwrap();
        assert!((state[0].re - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
        assert!((state[1].re - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn test_validation_errors() {
        let mut state = basis(2, 0);
        assert!(matches!(
            apply_matrix(&mut state, &matrix::x(), &[], &[]),
            Err(SimError::Ir(IrError::EmptyTargets { .. }))
        ));
        assert!(matches!(
            apply_matrix(&mut state, &matrix::x(), &[2], &[]),
            Err(SimError::Ir(IrError::QubitOutOfRange { .. }))
        ));
        assert!(matches!(
            apply_matrix(&mut state, &matrix::x(), &[0], &[0]),
            Err(SimError::Ir(IrError::TargetControlOverlap { .. }))
        ));
        assert!(matches!(
            apply_matrix(&mut state, &matrix::swap(), &[1, 1], &[]),
            Err(SimError::Ir(IrError::DuplicateQubit { .. }))
        ));
        assert!(matches!(
            apply_matrix(&mut state, &matrix::swap(), &[0], &[]),
            Err(SimError::Ir(IrError::MatrixShape { .. }))
        ));
        let mut odd = vec![c(1.0); 3];
        assert!(matches!(
            apply_matrix(&mut odd, &matrix::x(), &[0], &[]),
            Err(SimError::StateLengthMismatch { .. })
        ));
    }

    #[test]
    fn test_prepared_gate_from_gate() {
        let gate = Gate::cnot(QubitId(0), QubitId(1)).unwrap();
        let prepared = PreparedGate::<f64>::from_gate(&gate);
        assert_eq!(prepared.targets(), &[1]);
        assert_eq!(prepared.controls(), &[0]);

        let mut state = basis(2, 0b01);
        prepared.apply(&mut state).unwrap();
        assert_eq!(state, basis(2, 0b11));

        let mut small = basis(1, 0);
        assert!(prepared.apply(&mut small).is_err());
    }
}
