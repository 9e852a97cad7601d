//! Standard gate unitaries.
//!
//! Every matrix is a row-major `Array2<Complex64>` of side `2^k`. For
//! multi-qubit matrices the first target of a gate is the most significant
//! bit of the row/column index.

use ndarray::{Array2, array};
use num_complex::Complex64;
use std::f64::consts::FRAC_1_SQRT_2;

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);
const I: Complex64 = Complex64::new(0.0, 1.0);

/// Tolerance used by [`is_unitary`].
pub const UNITARY_EPSILON: f64 = 1e-10;

/// Identity on `num_qubits` qubits.
pub fn identity(num_qubits: usize) -> Array2<Complex64> {
    Array2::eye(1 << num_qubits)
}

/// Hadamard.
pub fn h() -> Array2<Complex64> {
    let s = Complex64::new(FRAC_1_SQRT_2, 0.0);
    array![[s, s], [s, -s]]
}

/// Pauli-X.
pub fn x() -> Array2<Complex64> {
    array![[ZERO, ONE], [ONE, ZERO]]
}

/// Pauli-Y.
pub fn y() -> Array2<Complex64> {
    array![[ZERO, -I], [I, ZERO]]
}

/// Pauli-Z.
pub fn z() -> Array2<Complex64> {
    array![[ONE, ZERO], [ZERO, -ONE]]
}

/// S gate (sqrt(Z)).
pub fn s() -> Array2<Complex64> {
    array![[ONE, ZERO], [ZERO, I]]
}

/// T gate (fourth root of Z).
pub fn t() -> Array2<Complex64> {
    p(std::f64::consts::FRAC_PI_4)
}

/// Phase gate diag(1, e^{iλ}).
pub fn p(lambda: f64) -> Array2<Complex64> {
    array![[ONE, ZERO], [ZERO, Complex64::from_polar(1.0, lambda)]]
}

/// Rotation around X.
pub fn rx(theta: f64) -> Array2<Complex64> {
    let c = Complex64::new((theta / 2.0).cos(), 0.0);
    let s = Complex64::new(0.0, -(theta / 2.0).sin());
    array![[c, s], [s, c]]
}

/// Rotation around Y.
pub fn ry(theta: f64) -> Array2<Complex64> {
    let c = Complex64::new((theta / 2.0).cos(), 0.0);
    let s = Complex64::new((theta / 2.0).sin(), 0.0);
    array![[c, -s], [s, c]]
}

/// Rotation around Z.
pub fn rz(theta: f64) -> Array2<Complex64> {
    array![
        [Complex64::from_polar(1.0, -theta / 2.0), ZERO],
        [ZERO, Complex64::from_polar(1.0, theta / 2.0)]
    ]
}

/// Universal single-qubit gate U(θ, φ, λ).
pub fn u(theta: f64, phi: f64, lambda: f64) -> Array2<Complex64> {
    let c = (theta / 2.0).cos();
    let s = (theta / 2.0).sin();
    array![
        [Complex64::new(c, 0.0), -Complex64::from_polar(s, lambda)],
        [
            Complex64::from_polar(s, phi),
            Complex64::from_polar(c, phi + lambda)
        ]
    ]
}

/// SWAP on two qubits.
pub fn swap() -> Array2<Complex64> {
    let mut m = Array2::zeros((4, 4));
    m[[0, 0]] = ONE;
    m[[1, 2]] = ONE;
    m[[2, 1]] = ONE;
    m[[3, 3]] = ONE;
    m
}

/// Check `m† m ≈ 1` within [`UNITARY_EPSILON`].
pub fn is_unitary(m: &Array2<Complex64>) -> bool {
    let (rows, cols) = m.dim();
    if rows != cols {
        return false;
    }
    let adjoint = m.t().mapv(|c| c.conj());
    let product = adjoint.dot(m);
    product.indexed_iter().all(|((i, j), v)| {
        let expected = if i == j { ONE } else { ZERO };
        (v - expected).norm() < UNITARY_EPSILON
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_standard_matrices_are_unitary() {
        for m in [
            h(),
            x(),
            y(),
            z(),
            s(),
            t(),
            rx(0.3),
            ry(1.2),
            rz(-0.7),
            u(0.1, 0.2, 0.3),
            swap(),
            identity(3),
        ] {
            assert!(is_unitary(&m));
        }
    }

    #[test]
    fn test_non_unitary_rejected() {
        let m = array![[ONE, ONE], [ZERO, ONE]];
        assert!(!is_unitary(&m));
    }

    #[test]
    fn test_u_matches_ry_at_zero_phases() {
        let a = u(0.8, 0.0, 0.0);
        let b = ry(0.8);
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).norm() < 1e-12);
        }
    }

    #[test]
    fn test_rx_pi_is_x_up_to_phase() {
        let m = rx(PI);
        assert!((m[[0, 1]] - Complex64::new(0.0, -1.0)).norm() < 1e-12);
        assert!(m[[0, 0]].norm() < 1e-12);
    }
}
