//! `qshard-sim`: distributed state-vector simulation with mid-circuit
//! observables.
//!
//! A circuit is a queue of gates and callback markers. The simulator splits
//! the `2^n` amplitude vector into `2^g` pieces by designating `g` qubits as
//! *global*, applies gates piece by piece (merging pieces only when a gate
//! targets a global qubit), and evaluates each callback on the exact state
//! at its queue position.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use qshard_ir::{Gate, QubitId};
//! use qshard_sim::{Callback, Circuit, SimConfig, Simulator};
//!
//! let entropy = Arc::new(Callback::entanglement_entropy([QubitId(0)]));
//!
//! let mut circuit = Circuit::new(2);
//! circuit.add_callback(Arc::clone(&entropy)).unwrap();
//! circuit.add(Gate::h(QubitId(0))).unwrap();
//! circuit.add_callback(Arc::clone(&entropy)).unwrap();
//! circuit.add(Gate::cnot(QubitId(0), QubitId(1)).unwrap()).unwrap();
//! circuit.add_callback(Arc::clone(&entropy)).unwrap();
//!
//! let sim = Simulator::new(SimConfig::new().with_pieces(2)).unwrap();
//! sim.execute(&mut circuit, None).unwrap();
//!
//! assert_eq!(entropy.len(), 3);
//! assert!((entropy.scalar(2).unwrap() - 1.0).abs() < 1e-10);
//! ```
//!
//! # Modules
//!
//! - [`apply`]: in-place gate kernels over a flat amplitude buffer
//! - [`partition`]: global/local qubit split, policies and exchange routing
//! - [`executor`]: per-piece state and gate dispatch
//! - [`observable`]: partial trace and entanglement entropy
//! - [`callback`] and [`scheduler`]: mid-circuit evaluation
//! - [`circuit`], [`measurement`], [`config`], [`simulator`]: front-end

pub mod apply;
pub mod callback;
pub mod circuit;
pub mod config;
pub mod error;
pub mod executor;
pub mod measurement;
pub mod observable;
pub mod partition;
pub mod precision;
pub mod scheduler;
pub mod simulator;
pub mod store;

pub use apply::{PreparedGate, apply_matrix};
pub use callback::{Callback, CallbackIndex, CallbackValue, Observable, Stacked};
pub use circuit::{Circuit, QueueEntry};
pub use config::{PolicyKind, SimConfig};
pub use error::{ErrorKind, SimError, SimResult};
pub use executor::DistributedState;
pub use measurement::{Counts, MeasurementOutcome, MeasurementRegisters};
pub use observable::{EIGVAL_CUTOFF, StateInput, TracePlan, entropy, reduced_density};
pub use partition::{
    DeviceMap, ExplicitQubits, GlobalQubitPolicy, HighestQubits, LeastTouched, Partition, Route,
    exchange_groups,
};
pub use precision::{Precision, Real};
pub use scheduler::Schedule;
pub use simulator::{FinalState, Simulator};
pub use store::{AmplitudeStore, StateVector};
