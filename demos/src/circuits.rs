//! Circuit builders for the demos.

use std::sync::Arc;

use qshard_ir::{Gate, QubitId};
use qshard_sim::{Callback, Circuit, SimResult};

/// Bell pair with a callback before any gate, after H and after CNOT.
pub fn bell_with_callbacks(callback: &Arc<Callback>) -> SimResult<Circuit> {
    let mut circuit = Circuit::new(2);
    circuit.add_callback(Arc::clone(callback))?;
    circuit.add(Gate::h(QubitId(0)))?;
    circuit.add_callback(Arc::clone(callback))?;
    circuit.add(Gate::cnot(QubitId(0), QubitId(1))?)?;
    circuit.add_callback(Arc::clone(callback))?;
    Ok(circuit)
}

/// GHZ state preparation on `num_qubits` qubits.
pub fn ghz(num_qubits: u32) -> SimResult<Circuit> {
    let mut circuit = Circuit::new(num_qubits);
    circuit.add(Gate::h(QubitId(0)))?;
    for i in 1..num_qubits {
        circuit.add(Gate::cnot(QubitId(i - 1), QubitId(i))?)?;
    }
    Ok(circuit)
}

/// Hardware-efficient ansatz: RY on every qubit followed by a brick of CZ
/// gates, repeated `layers` times.
///
/// `theta` scales every rotation angle. When `callback` is given it is
/// attached after each layer.
pub fn variational(
    num_qubits: u32,
    layers: usize,
    theta: f64,
    callback: Option<&Arc<Callback>>,
) -> SimResult<Circuit> {
    let mut circuit = Circuit::new(num_qubits);
    for layer in 0..layers {
        for i in 0..num_qubits {
            let angle = theta * (f64::from(i) + 1.0) / (layer as f64 + 1.0);
            circuit.add(Gate::ry(QubitId(i), angle))?;
        }
        let offset = (layer % 2) as u32;
        let mut i = offset;
        while i + 1 < num_qubits {
            circuit.add(Gate::cz(QubitId(i), QubitId(i + 1))?)?;
            i += 2;
        }
        if let Some(cb) = callback {
            circuit.add_callback(Arc::clone(cb))?;
        }
    }
    Ok(circuit)
}
