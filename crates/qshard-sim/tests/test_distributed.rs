//! Distributed execution must agree with single-piece execution.

use std::sync::Arc;

use num_complex::Complex64;
use proptest::prelude::*;
use qshard_ir::{Gate, QubitId};
use qshard_sim::{
    Callback, Circuit, DeviceMap, PolicyKind, Precision, SimConfig, SimError, Simulator,
};

fn q(i: u32) -> QubitId {
    QubitId(i)
}

fn run(config: SimConfig, circuit: &Circuit) -> Vec<Complex64> {
    let mut circuit = circuit.clone();
    Simulator::new(config)
        .unwrap()
        .execute(&mut circuit, None)
        .unwrap()
        .into_state()
        .to_complex64()
}

fn assert_close(a: &[Complex64], b: &[Complex64], tol: f64) {
    assert_eq!(a.len(), b.len());
    for (i, (x, y)) in a.iter().zip(b).enumerate() {
        assert!((x - y).norm() < tol, "amplitude {i}: {x} vs {y}");
    }
}

/// Four qubits, every kind of gate, touching every qubit as target and
/// control.
fn mixed_circuit() -> Circuit {
    let mut circuit = Circuit::new(4);
    circuit
        .add_all([
            Gate::h(q(0)),
            Gate::h(q(3)),
            Gate::ry(q(2), 0.4),
            Gate::cnot(q(0), q(3)).unwrap(),
            Gate::cz(q(3), q(1)).unwrap(),
            Gate::rx(q(1), -1.1),
            Gate::swap(q(1), q(3)).unwrap(),
            Gate::toffoli(q(3), q(2), q(0)).unwrap(),
            Gate::u(q(2), 0.2, 0.9, 1.7),
            Gate::t(q(3)),
            Gate::ry(q(0), 2.3).controlled_by([q(3)]).unwrap(),
            Gate::swap(q(0), q(2)).unwrap(),
            Gate::s(q(1)),
        ])
        .unwrap();
    circuit
}

// ---------------------------------------------------------------------------
// Piece counts and global sets
// ---------------------------------------------------------------------------

#[test]
fn piece_counts_agree_with_single_piece() {
    let circuit = mixed_circuit();
    let reference = run(SimConfig::new(), &circuit);
    for pieces in [2, 4, 8, 16] {
        let state = run(SimConfig::new().with_pieces(pieces), &circuit);
        assert_close(&state, &reference, 1e-10);
    }
}

#[test]
fn explicit_global_sets_agree() {
    let circuit = mixed_circuit();
    let reference = run(SimConfig::new(), &circuit);
    let sets: [&[u32]; 5] = [&[0], &[2], &[0, 3], &[3, 1], &[2, 0, 1]];
    for set in sets {
        let config = SimConfig::new()
            .with_pieces(1 << set.len())
            .with_global_qubits(set.iter().copied().map(QubitId));
        let state = run(config, &circuit);
        assert_close(&state, &reference, 1e-10);
    }
}

#[test]
fn least_touched_policy_agrees() {
    let circuit = mixed_circuit();
    let reference = run(SimConfig::new(), &circuit);
    let config = SimConfig::new()
        .with_pieces(4)
        .with_global_policy(PolicyKind::LeastTouched);
    assert_close(&run(config, &circuit), &reference, 1e-10);
}

#[test]
fn sequential_pieces_agree_with_parallel() {
    let circuit = mixed_circuit();
    let parallel = run(SimConfig::new().with_pieces(4), &circuit);
    let sequential = run(SimConfig::new().with_pieces(4).with_parallel(false), &circuit);
    assert_close(&parallel, &sequential, 1e-14);
}

#[test]
fn multi_device_descriptor() {
    let circuit = mixed_circuit();
    let reference = run(SimConfig::new(), &circuit);
    let devices = DeviceMap::new()
        .with_device("/GPU:0", 2)
        .with_device("/GPU:1", 1)
        .with_device("/CPU:0", 1);
    assert_eq!(devices.piece_assignment().unwrap().len(), 4);
    let state = run(SimConfig::new().with_devices(devices), &circuit);
    assert_close(&state, &reference, 1e-10);
}

#[test]
fn single_precision_agrees_within_tolerance() {
    let circuit = mixed_circuit();
    let reference = run(SimConfig::new(), &circuit);
    let config = SimConfig::new()
        .with_precision(Precision::Single)
        .with_pieces(4);
    assert_close(&run(config, &circuit), &reference, 1e-5);
}

#[test]
fn invalid_device_descriptors_are_rejected() {
    assert!(matches!(
        Simulator::new(SimConfig::new().with_pieces(3)),
        Err(SimError::InvalidDeviceMap(_))
    ));
    let devices = DeviceMap::new().with_device("a", 2).with_device("b", 1);
    assert!(matches!(
        Simulator::new(SimConfig::new().with_devices(devices)),
        Err(SimError::InvalidDeviceMap(_))
    ));

    let sim = Simulator::new(SimConfig::new().with_pieces(32)).unwrap();
    let mut circuit = mixed_circuit();
    assert!(matches!(
        sim.execute(&mut circuit, None),
        Err(SimError::TooManyPieces { .. })
    ));
    assert!(!circuit.is_executed());
}

// ---------------------------------------------------------------------------
// Controlled gates
// ---------------------------------------------------------------------------

#[test]
fn controlled_gate_acts_only_when_control_is_set() {
    for pieces in [1, 2, 4] {
        for control_set in [false, true] {
            let mut prep = Circuit::new(3);
            prep.add(Gate::h(q(0))).unwrap().add(Gate::ry(q(1), 0.8)).unwrap();
            if control_set {
                prep.add(Gate::x(q(2))).unwrap();
            }

            let mut controlled = prep.clone();
            controlled
                .add(Gate::u(q(0), 1.0, 0.3, -0.6).controlled_by([q(2)]).unwrap())
                .unwrap();

            let mut uncontrolled = prep.clone();
            if control_set {
                uncontrolled.add(Gate::u(q(0), 1.0, 0.3, -0.6)).unwrap();
            }

            let config = SimConfig::new().with_pieces(pieces);
            assert_close(
                &run(config.clone(), &controlled),
                &run(config, &uncontrolled),
                1e-12,
            );
        }
    }
}

#[test]
fn two_qubit_gate_with_global_control_and_target() {
    let mut circuit = Circuit::new(4);
    circuit
        .add_all([
            Gate::h(q(0)),
            Gate::h(q(1)),
            Gate::x(q(3)),
            Gate::swap(q(0), q(1)).unwrap().controlled_by([q(3)]).unwrap(),
            Gate::cnot(q(2), q(3)).unwrap().controlled_by([q(0)]).unwrap(),
        ])
        .unwrap();
    let reference = run(SimConfig::new(), &circuit);
    let config = SimConfig::new()
        .with_pieces(4)
        .with_global_qubits([q(3), q(1)]);
    assert_close(&run(config, &circuit), &reference, 1e-12);
}

// ---------------------------------------------------------------------------
// Callbacks
// ---------------------------------------------------------------------------

#[test]
fn callbacks_see_identical_states_across_piece_counts() {
    let mut records = Vec::new();
    for pieces in [1, 2, 8] {
        let entropy = Arc::new(Callback::entanglement_entropy([q(1), q(3)]));
        let norm = Arc::new(Callback::norm());
        let mut circuit = Circuit::new(4);
        for entry in mixed_circuit().gates() {
            circuit.add(entry.clone()).unwrap();
            circuit.add_callback(Arc::clone(&entropy)).unwrap();
        }
        circuit.add_callback(Arc::clone(&norm)).unwrap();

        let sim = Simulator::new(
            SimConfig::new()
                .with_pieces(pieces)
                .with_norm_tolerance(1e-9),
        )
        .unwrap();
        sim.execute(&mut circuit, None).unwrap();

        assert!((norm.scalar(0).unwrap() - 1.0).abs() < 1e-10);
        let values: Vec<f64> = (0..entropy.len())
            .map(|i| entropy.scalar(i).unwrap())
            .collect();
        records.push(values);
    }
    for values in &records[1..] {
        assert_eq!(values.len(), records[0].len());
        for (a, b) in values.iter().zip(&records[0]) {
            assert!((a - b).abs() < 1e-8);
        }
    }
}

// ---------------------------------------------------------------------------
// Random circuits
// ---------------------------------------------------------------------------

const NUM_QUBITS: u32 = 4;

#[derive(Debug, Clone)]
enum Op {
    H(u32),
    X(u32),
    Ry(u32, f64),
    Rz(u32, f64),
    Cnot(u32, u32),
    Cz(u32, u32),
    Swap(u32, u32),
    Toffoli(u32, u32, u32),
    ControlledU(u32, u32, f64, f64, f64),
}

impl Op {
    fn gate(&self) -> Gate {
        match *self {
            Op::H(a) => Gate::h(q(a)),
            Op::X(a) => Gate::x(q(a)),
            Op::Ry(a, t) => Gate::ry(q(a), t),
            Op::Rz(a, t) => Gate::rz(q(a), t),
            Op::Cnot(c, t) => Gate::cnot(q(c), q(t)).unwrap(),
            Op::Cz(c, t) => Gate::cz(q(c), q(t)).unwrap(),
            Op::Swap(a, b) => Gate::swap(q(a), q(b)).unwrap(),
            Op::Toffoli(c1, c2, t) => Gate::toffoli(q(c1), q(c2), q(t)).unwrap(),
            Op::ControlledU(c, t, theta, phi, lambda) => Gate::u(q(t), theta, phi, lambda)
                .controlled_by([q(c)])
                .unwrap(),
        }
    }
}

fn arb_qubit() -> impl Strategy<Value = u32> {
    0..NUM_QUBITS
}

fn arb_pair() -> impl Strategy<Value = (u32, u32)> {
    (arb_qubit(), 1..NUM_QUBITS).prop_map(|(a, offset)| (a, (a + offset) % NUM_QUBITS))
}

fn arb_triple() -> impl Strategy<Value = (u32, u32, u32)> {
    Just((0..NUM_QUBITS).collect::<Vec<_>>())
        .prop_shuffle()
        .prop_map(|v| (v[0], v[1], v[2]))
}

fn arb_angle() -> impl Strategy<Value = f64> {
    -std::f64::consts::PI..std::f64::consts::PI
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        arb_qubit().prop_map(Op::H),
        arb_qubit().prop_map(Op::X),
        (arb_qubit(), arb_angle()).prop_map(|(a, t)| Op::Ry(a, t)),
        (arb_qubit(), arb_angle()).prop_map(|(a, t)| Op::Rz(a, t)),
        arb_pair().prop_map(|(c, t)| Op::Cnot(c, t)),
        arb_pair().prop_map(|(c, t)| Op::Cz(c, t)),
        arb_pair().prop_map(|(a, b)| Op::Swap(a, b)),
        arb_triple().prop_map(|(a, b, c)| Op::Toffoli(a, b, c)),
        (arb_pair(), arb_angle(), arb_angle(), arb_angle())
            .prop_map(|((c, t), th, ph, la)| Op::ControlledU(c, t, th, ph, la)),
    ]
}

/// A piece count together with a matching explicit global set.
fn arb_globals() -> impl Strategy<Value = Vec<u32>> {
    (0..=3usize).prop_flat_map(|g| {
        Just((0..NUM_QUBITS).collect::<Vec<_>>())
            .prop_shuffle()
            .prop_map(move |v| v[..g].to_vec())
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_circuits_match_single_piece(
        ops in prop::collection::vec(arb_op(), 1..24),
        globals in arb_globals(),
    ) {
        let mut circuit = Circuit::new(NUM_QUBITS);
        circuit.add_all(ops.iter().map(Op::gate)).unwrap();

        let reference = run(SimConfig::new(), &circuit);
        let config = SimConfig::new()
            .with_pieces(1 << globals.len())
            .with_global_qubits(globals.iter().copied().map(QubitId));
        let state = run(config, &circuit);

        for (x, y) in state.iter().zip(&reference) {
            prop_assert!((x - y).norm() < 1e-10);
        }
        let norm: f64 = state.iter().map(|a| a.norm_sqr()).sum();
        prop_assert!((norm - 1.0).abs() < 1e-10);
    }
}
