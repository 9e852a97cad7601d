//! Amplitude storage.

use num_complex::{Complex, Complex32, Complex64};

use crate::error::{SimError, SimResult};
use crate::precision::{Precision, Real, widen};

/// Flat amplitude buffer for a (sub-)register of `num_qubits` qubits.
///
/// The buffer has `2^num_qubits` entries; qubit `i` is bit `i` of the
/// index. The store knows nothing about circuits.
#[derive(Debug, Clone, PartialEq)]
pub struct AmplitudeStore<T: Real> {
    amplitudes: Vec<Complex<T>>,
    num_qubits: usize,
}

impl<T: Real> AmplitudeStore<T> {
    /// The computational basis state |0...0⟩.
    pub fn zero_state(num_qubits: usize) -> Self {
        let mut store = Self::zeros(num_qubits);
        store.amplitudes[0] = Complex::new(T::one(), T::zero());
        store
    }

    /// An all-zero buffer (not a valid state on its own).
    pub fn zeros(num_qubits: usize) -> Self {
        Self {
            amplitudes: vec![Complex::new(T::zero(), T::zero()); 1 << num_qubits],
            num_qubits,
        }
    }

    /// Take ownership of an existing buffer.
    ///
    /// Fails unless the length is a power of two.
    pub fn from_amplitudes(amplitudes: Vec<Complex<T>>) -> SimResult<Self> {
        let num_qubits = qubits_for_len(amplitudes.len())?;
        Ok(Self {
            amplitudes,
            num_qubits,
        })
    }

    /// Number of qubits held by this store.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Number of amplitudes.
    pub fn len(&self) -> usize {
        self.amplitudes.len()
    }

    /// Always false: a store holds at least one amplitude.
    pub fn is_empty(&self) -> bool {
        self.amplitudes.is_empty()
    }

    /// Read-only view of the amplitudes.
    pub fn as_slice(&self) -> &[Complex<T>] {
        &self.amplitudes
    }

    /// Mutable view of the amplitudes.
    pub fn as_mut_slice(&mut self) -> &mut [Complex<T>] {
        &mut self.amplitudes
    }

    /// Consume the store and return its buffer.
    pub fn into_vec(self) -> Vec<Complex<T>> {
        self.amplitudes
    }

    /// Squared 2-norm, accumulated in `f64`.
    pub fn norm_sqr(&self) -> f64 {
        self.amplitudes.iter().map(|a| widen(*a).norm_sqr()).sum()
    }
}

/// A full state vector in one of the supported precisions.
#[derive(Debug, Clone, PartialEq)]
pub enum StateVector {
    /// Single-precision amplitudes.
    Single(Vec<Complex32>),
    /// Double-precision amplitudes.
    Double(Vec<Complex64>),
}

impl StateVector {
    /// Precision of the amplitudes.
    pub fn precision(&self) -> Precision {
        match self {
            StateVector::Single(_) => Precision::Single,
            StateVector::Double(_) => Precision::Double,
        }
    }

    /// Number of amplitudes.
    pub fn len(&self) -> usize {
        match self {
            StateVector::Single(v) => v.len(),
            StateVector::Double(v) => v.len(),
        }
    }

    /// True if there are no amplitudes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register size, if the length is a power of two.
    pub fn num_qubits(&self) -> SimResult<usize> {
        qubits_for_len(self.len())
    }

    /// Amplitudes widened to double precision.
    pub fn to_complex64(&self) -> Vec<Complex64> {
        match self {
            StateVector::Single(v) => v.iter().map(|a| widen(*a)).collect(),
            StateVector::Double(v) => v.clone(),
        }
    }

    /// Double-precision amplitudes, if stored as such.
    pub fn as_double(&self) -> Option<&[Complex64]> {
        match self {
            StateVector::Double(v) => Some(v),
            StateVector::Single(_) => None,
        }
    }

    /// Single-precision amplitudes, if stored as such.
    pub fn as_single(&self) -> Option<&[Complex32]> {
        match self {
            StateVector::Single(v) => Some(v),
            StateVector::Double(_) => None,
        }
    }

    /// Born-rule probabilities `|a_i|^2`.
    pub fn probabilities(&self) -> Vec<f64> {
        match self {
            StateVector::Single(v) => v.iter().map(|a| widen(*a).norm_sqr()).collect(),
            StateVector::Double(v) => v.iter().map(Complex64::norm_sqr).collect(),
        }
    }

    /// Squared 2-norm.
    pub fn norm_sqr(&self) -> f64 {
        self.probabilities().iter().sum()
    }
}

impl From<Vec<Complex64>> for StateVector {
    fn from(v: Vec<Complex64>) -> Self {
        StateVector::Double(v)
    }
}

impl From<Vec<Complex32>> for StateVector {
    fn from(v: Vec<Complex32>) -> Self {
        StateVector::Single(v)
    }
}

/// `log2(len)` for a power-of-two length.
pub(crate) fn qubits_for_len(len: usize) -> SimResult<usize> {
    if len == 0 || !len.is_power_of_two() {
        return Err(SimError::StateLengthMismatch {
            expected: len.next_power_of_two().max(1),
            got: len,
        });
    }
    Ok(len.trailing_zeros() as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_state() {
        let store = AmplitudeStore::<f64>::zero_state(2);
        assert_eq!(store.len(), 4);
        assert_eq!(store.num_qubits(), 2);
        assert_eq!(store.as_slice()[0], Complex64::new(1.0, 0.0));
        assert!((store.norm_sqr() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_from_amplitudes_rejects_bad_length() {
        let err = AmplitudeStore::<f32>::from_amplitudes(vec![Complex32::new(1.0, 0.0); 3])
            .unwrap_err();
        assert!(matches!(
            err,
            SimError::StateLengthMismatch {
                expected: 4,
                got: 3
            }
        ));
    }

    #[test]
    fn test_state_vector_widening() {
        let sv = StateVector::from(vec![Complex32::new(0.6, 0.0), Complex32::new(0.0, 0.8)]);
        assert_eq!(sv.precision(), Precision::Single);
        assert_eq!(sv.num_qubits().unwrap(), 1);
        let wide = sv.to_complex64();
        assert!((wide[1].im - 0.8).abs() < 1e-6);
        assert!((sv.norm_sqr() - 1.0).abs() < 1e-6);
    }
}
