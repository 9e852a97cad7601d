//! Circuit queue.

use std::sync::Arc;

use qshard_ir::{Gate, QubitId};

use crate::callback::Callback;
use crate::error::{SimError, SimResult};
use crate::measurement::MeasurementRegisters;

/// One entry of a circuit queue.
#[derive(Debug, Clone)]
pub enum QueueEntry {
    /// A unitary gate bound to the circuit's register.
    Gate(Gate),
    /// A callback evaluated on the state at this position.
    Callback(Arc<Callback>),
}

/// Ordered gates and callbacks over a fixed-size register.
///
/// Once executed, a circuit accepts no further entries but may be executed
/// again; bound callbacks keep accumulating results.
#[derive(Debug, Clone)]
pub struct Circuit {
    num_qubits: u32,
    queue: Vec<QueueEntry>,
    measurements: MeasurementRegisters,
    executed: bool,
}

impl Circuit {
    /// Create an empty circuit.
    pub fn new(num_qubits: u32) -> Self {
        Self {
            num_qubits,
            queue: vec![],
            measurements: MeasurementRegisters::new(),
            executed: false,
        }
    }

    /// Number of qubits.
    pub fn num_qubits(&self) -> u32 {
        self.num_qubits
    }

    /// The queue, in execution order.
    pub fn queue(&self) -> &[QueueEntry] {
        &self.queue
    }

    /// Gates in queue order, skipping callbacks.
    pub fn gates(&self) -> impl Iterator<Item = &Gate> {
        self.queue.iter().filter_map(|e| match e {
            QueueEntry::Gate(g) => Some(g),
            QueueEntry::Callback(_) => None,
        })
    }

    /// Number of gates.
    pub fn num_gates(&self) -> usize {
        self.gates().count()
    }

    /// Measurement registers.
    pub fn measurements(&self) -> &MeasurementRegisters {
        &self.measurements
    }

    /// True once the circuit has produced a final state.
    pub fn is_executed(&self) -> bool {
        self.executed
    }

    pub(crate) fn mark_executed(&mut self) {
        self.executed = true;
    }

    // =========================================================================
    // Building
    // =========================================================================

    /// Append a gate, binding it to this circuit's register size.
    pub fn add(&mut self, mut gate: Gate) -> SimResult<&mut Self> {
        self.check_open()?;
        gate.bind_num_qubits(self.num_qubits)?;
        if let Some(q) = gate.qubits().find(|&q| self.measurements.is_measured(q)) {
            return Err(SimError::QubitAlreadyMeasured(q));
        }
        self.queue.push(QueueEntry::Gate(gate));
        Ok(self)
    }

    /// Append several gates in order.
    pub fn add_all(&mut self, gates: impl IntoIterator<Item = Gate>) -> SimResult<&mut Self> {
        for gate in gates {
            self.add(gate)?;
        }
        Ok(self)
    }

    /// Append a callback marker.
    pub fn add_callback(&mut self, callback: Arc<Callback>) -> SimResult<&mut Self> {
        self.check_open()?;
        self.queue.push(QueueEntry::Callback(callback));
        Ok(self)
    }

    /// Measure `qubits` into a register and return the register name.
    ///
    /// Measured qubits cannot be targeted by later gates.
    pub fn measure(
        &mut self,
        name: Option<&str>,
        qubits: impl IntoIterator<Item = QubitId>,
    ) -> SimResult<String> {
        self.check_open()?;
        let qubits: Vec<QubitId> = qubits.into_iter().collect();
        if let Some(&q) = qubits.iter().find(|q| q.0 >= self.num_qubits) {
            return Err(qshard_ir::IrError::QubitOutOfRange {
                qubit: q,
                num_qubits: self.num_qubits,
                gate_name: "measure".into(),
            }
            .into());
        }
        self.measurements.add(name, qubits)
    }

    /// A new circuit running `self` followed by `other`.
    ///
    /// Callbacks are shared with both operands.
    pub fn concat(&self, other: &Circuit) -> SimResult<Circuit> {
        if self.num_qubits != other.num_qubits {
            return Err(SimError::CircuitSizeMismatch {
                left: self.num_qubits,
                right: other.num_qubits,
            });
        }
        let mut joined = Circuit {
            num_qubits: self.num_qubits,
            queue: self.queue.clone(),
            measurements: self.measurements.clone(),
            executed: false,
        };
        for entry in &other.queue {
            match entry {
                QueueEntry::Gate(g) => joined.add(g.clone())?,
                QueueEntry::Callback(cb) => joined.add_callback(Arc::clone(cb))?,
            };
        }
        joined.measurements.extend_from(&other.measurements)?;
        Ok(joined)
    }

    /// Number of gate layers, where gates sharing a qubit occupy different
    /// layers.
    pub fn depth(&self) -> usize {
        let mut level = vec![0usize; self.num_qubits as usize];
        for gate in self.gates() {
            let layer = gate
                .qubits()
                .map(|q| level[q.index()])
                .max()
                .unwrap_or(0)
                + 1;
            for q in gate.qubits() {
                level[q.index()] = layer;
            }
        }
        level.into_iter().max().unwrap_or(0)
    }

    fn check_open(&self) -> SimResult<()> {
        if self.executed {
            return Err(SimError::CircuitExecuted);
        }
        Ok(())
    }
}
