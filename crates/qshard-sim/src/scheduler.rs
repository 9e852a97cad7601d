//! Ordering of gates and callback evaluations within one execution.
//!
//! Consecutive callback markers form a single barrier: the distributed
//! state is composed once and every callback of the run observes that same
//! state, in queue order.

use std::sync::Arc;

use num_complex::Complex64;
use tracing::{debug, warn};

use crate::apply::PreparedGate;
use crate::callback::Callback;
use crate::circuit::QueueEntry;
use crate::error::{SimError, SimResult};
use crate::executor::DistributedState;
use crate::observable::{StateInput, norm_sqr};
use crate::precision::{Real, widen};

/// One step of an execution.
#[derive(Debug, Clone)]
pub enum Step<T: Real> {
    /// Apply a gate to every affected piece.
    Gate(PreparedGate<T>),
    /// Compose the state and record each callback.
    Barrier {
        /// Queue index of the first callback of the run.
        position: usize,
        /// Callbacks in queue order.
        callbacks: Vec<Arc<Callback>>,
    },
}

/// A circuit queue lowered to a working precision.
#[derive(Debug, Clone)]
pub struct Schedule<T: Real> {
    steps: Vec<Step<T>>,
}

impl<T: Real> Schedule<T> {
    /// Lower a queue, preparing gate matrices and grouping callbacks.
    pub fn from_queue(queue: &[QueueEntry]) -> Self {
        let mut steps: Vec<Step<T>> = Vec::with_capacity(queue.len());
        for (position, entry) in queue.iter().enumerate() {
            match entry {
                QueueEntry::Gate(gate) => steps.push(Step::Gate(PreparedGate::from_gate(gate))),
                QueueEntry::Callback(cb) => match steps.last_mut() {
                    Some(Step::Barrier { callbacks, .. }) => callbacks.push(Arc::clone(cb)),
                    _ => steps.push(Step::Barrier {
                        position,
                        callbacks: vec![Arc::clone(cb)],
                    }),
                },
            }
        }
        Self { steps }
    }

    /// Steps in execution order.
    pub fn steps(&self) -> &[Step<T>] {
        &self.steps
    }

    /// Number of barriers.
    pub fn num_barriers(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s, Step::Barrier { .. }))
            .count()
    }

    /// Run every step against `state`.
    ///
    /// With a `norm_tolerance`, a barrier fails when `|‖ψ‖ - 1|` exceeds it.
    pub fn run(
        &self,
        state: &mut DistributedState<T>,
        norm_tolerance: Option<f64>,
    ) -> SimResult<()> {
        for step in &self.steps {
            match step {
                Step::Gate(gate) => state.apply(gate)?,
                Step::Barrier {
                    position,
                    callbacks,
                } => {
                    let full: Vec<Complex64> = state.compose().into_iter().map(widen).collect();
                    let input = StateInput::vector(&full);

                    if let Some(tolerance) = norm_tolerance {
                        let norm = norm_sqr(&input).sqrt();
                        if (norm - 1.0).abs() > tolerance {
                            warn!(position, norm, tolerance, "state norm drifted");
                            return Err(SimError::NormDrift { norm, tolerance });
                        }
                    }

                    debug!(position, callbacks = callbacks.len(), "callback barrier");
                    for cb in callbacks {
                        cb.record(&input)?;
                    }
                }
            }
        }
        Ok(())
    }
}
