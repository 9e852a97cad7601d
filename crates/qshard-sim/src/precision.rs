//! Floating-point precision selection.

use ndarray::Array2;
use num_complex::{Complex, Complex32, Complex64};
use num_traits::{Float, NumAssign};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{SimError, SimResult};
use crate::store::StateVector;

/// Width of the floating-point components of amplitudes and matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    /// `complex64` (two `f32`).
    Single,
    /// `complex128` (two `f64`).
    #[default]
    Double,
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precision::Single => write!(f, "single"),
            Precision::Double => write!(f, "double"),
        }
    }
}

impl FromStr for Precision {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" => Ok(Precision::Single),
            "double" => Ok(Precision::Double),
            other => Err(SimError::UnknownPrecision(other.to_string())),
        }
    }
}

/// Real component type of the simulator's complex numbers.
pub trait Real: Float + NumAssign + Send + Sync + fmt::Debug + 'static {
    /// The matching [`Precision`] tag.
    const PRECISION: Precision;

    /// Convert from `f64`, rounding if needed.
    fn from_double(value: f64) -> Self;

    /// Widen to `f64`.
    fn to_double(self) -> f64;

    /// Wrap a buffer of this precision.
    fn wrap_state(amplitudes: Vec<Complex<Self>>) -> StateVector;

    /// Unwrap a buffer, failing if it has another precision.
    fn unwrap_state(state: StateVector) -> SimResult<Vec<Complex<Self>>>;
}

impl Real for f32 {
    const PRECISION: Precision = Precision::Single;

    #[inline]
    fn from_double(value: f64) -> Self {
        value as f32
    }

    #[inline]
    fn to_double(self) -> f64 {
        f64::from(self)
    }

    fn wrap_state(amplitudes: Vec<Complex32>) -> StateVector {
        StateVector::Single(amplitudes)
    }

    fn unwrap_state(state: StateVector) -> SimResult<Vec<Complex32>> {
        match state {
            StateVector::Single(v) => Ok(v),
            other => Err(SimError::PrecisionMismatch {
                expected: Precision::Single,
                got: other.precision(),
            }),
        }
    }
}

impl Real for f64 {
    const PRECISION: Precision = Precision::Double;

    #[inline]
    fn from_double(value: f64) -> Self {
        value
    }

    #[inline]
    fn to_double(self) -> f64 {
        self
    }

    fn wrap_state(amplitudes: Vec<Complex64>) -> StateVector {
        StateVector::Double(amplitudes)
    }

    fn unwrap_state(state: StateVector) -> SimResult<Vec<Complex64>> {
        match state {
            StateVector::Double(v) => Ok(v),
            other => Err(SimError::PrecisionMismatch {
                expected: Precision::Double,
                got: other.precision(),
            }),
        }
    }
}

/// Narrow a `Complex64` to the target precision.
#[inline]
pub fn narrow<T: Real>(c: Complex64) -> Complex<T> {
    Complex::new(T::from_double(c.re), T::from_double(c.im))
}

/// Widen a complex number to `Complex64`.
#[inline]
pub fn widen<T: Real>(c: Complex<T>) -> Complex64 {
    Complex64::new(c.re.to_double(), c.im.to_double())
}

/// Cast a gate matrix to the target precision.
pub fn narrow_matrix<T: Real>(m: &Array2<Complex64>) -> Array2<Complex<T>> {
    m.mapv(narrow::<T>)
}
