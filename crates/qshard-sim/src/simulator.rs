//! Circuit execution entry point.

use qshard_ir::Gate;
use rand::Rng;
use tracing::{debug, info, instrument};

use crate::circuit::Circuit;
use crate::config::{PolicyKind, SimConfig};
use crate::error::SimResult;
use crate::executor::DistributedState;
use crate::measurement::{MeasurementOutcome, MeasurementRegisters};
use crate::partition::{ExplicitQubits, GlobalQubitPolicy, HighestQubits, LeastTouched, Partition};
use crate::precision::{Precision, Real};
use crate::scheduler::Schedule;
use crate::store::StateVector;

/// Runs circuits under a fixed [`SimConfig`].
#[derive(Debug)]
pub struct Simulator {
    config: SimConfig,
    policy: Box<dyn GlobalQubitPolicy>,
}

impl Simulator {
    /// Create a simulator, validating the configuration.
    pub fn new(config: SimConfig) -> SimResult<Self> {
        config.validate()?;
        let policy: Box<dyn GlobalQubitPolicy> = match config.global_qubits() {
            Some(qubits) => Box::new(ExplicitQubits(qubits.to_vec())),
            None => match config.global_policy() {
                PolicyKind::Highest => Box::new(HighestQubits),
                PolicyKind::LeastTouched => Box::new(LeastTouched),
            },
        };
        Ok(Self { config, policy })
    }

    /// Replace the global-qubit policy.
    #[must_use]
    pub fn with_policy(mut self, policy: impl GlobalQubitPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    /// The configuration in use.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Partition that [`Simulator::execute`] would use for `circuit`.
    pub fn plan(&self, circuit: &Circuit) -> SimResult<Partition> {
        let pieces = self.config.devices().num_pieces()?;
        let gates: Vec<&Gate> = circuit.gates().collect();
        Partition::plan(
            circuit.num_qubits() as usize,
            pieces,
            self.policy.as_ref(),
            &gates,
        )
    }

    /// Run `circuit` from |0...0⟩ or from `initial_state`.
    ///
    /// Callbacks in the queue record their results as they are reached.
    /// On success the circuit is marked executed and accepts no further
    /// entries; it may still be executed again.
    ///
    /// # Errors
    ///
    /// Fails on an invalid device descriptor or global set, an initial
    /// state of the wrong length or precision, or a callback failure. No
    /// partial state is returned.
    #[instrument(
        skip_all,
        fields(num_qubits = circuit.num_qubits(), precision = %self.config.precision())
    )]
    pub fn execute(
        &self,
        circuit: &mut Circuit,
        initial_state: Option<StateVector>,
    ) -> SimResult<FinalState> {
        let state = match self.config.precision() {
            Precision::Single => self.run::<f32>(circuit, initial_state)?,
            Precision::Double => self.run::<f64>(circuit, initial_state)?,
        };
        circuit.mark_executed();
        Ok(FinalState {
            state,
            registers: circuit.measurements().clone(),
        })
    }

    fn run<T: Real>(
        &self,
        circuit: &Circuit,
        initial_state: Option<StateVector>,
    ) -> SimResult<StateVector> {
        let partition = self.plan(circuit)?;
        let num_pieces = partition.num_pieces();

        let state = match initial_state {
            Some(initial) => DistributedState::from_state(partition, T::unwrap_state(initial)?)?,
            None => DistributedState::zero(partition),
        };
        let mut state = state.with_parallel(self.config.parallel());

        let schedule = Schedule::<T>::from_queue(circuit.queue());
        debug!(
            steps = schedule.steps().len(),
            barriers = schedule.num_barriers(),
            num_pieces,
            "running schedule"
        );
        schedule.run(&mut state, self.config.norm_tolerance())?;

        info!(num_pieces, gates = circuit.num_gates(), "execution complete");
        Ok(T::wrap_state(state.into_state()))
    }
}

/// Result of an execution: the full state plus the circuit's measurement
/// registers.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalState {
    state: StateVector,
    registers: MeasurementRegisters,
}

impl FinalState {
    /// The state vector.
    pub fn state(&self) -> &StateVector {
        &self.state
    }

    /// Take the state vector.
    pub fn into_state(self) -> StateVector {
        self.state
    }

    /// Measurement registers of the executed circuit.
    pub fn registers(&self) -> &MeasurementRegisters {
        &self.registers
    }

    /// Born-rule probabilities.
    pub fn probabilities(&self) -> Vec<f64> {
        self.state.probabilities()
    }

    /// Sample `shots` outcomes for every measurement register.
    pub fn sample<R: Rng + ?Sized>(&self, shots: u64, rng: &mut R) -> MeasurementOutcome {
        self.registers.sample(&self.probabilities(), shots, rng)
    }
}
