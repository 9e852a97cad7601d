//! Mid-circuit observables.
//!
//! A [`Callback`] is placed in a circuit queue and evaluated on the exact
//! state at that position every time the circuit runs. Results accumulate
//! across executions until [`Callback::reset`] is called.

use std::ops::{Range, RangeFull};
use std::sync::{Mutex, PoisonError};

use ndarray::{Array1, Array2, Array3};
use num_complex::Complex64;
use qshard_ir::QubitId;
use serde_json::Value;

use crate::error::{SimError, SimResult};
use crate::observable::{StateInput, TracePlan, default_subsystem, norm_sqr};

/// Quantity computed by a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observable {
    /// Reduced density matrix of the kept side of the bipartition.
    PartialTrace,
    /// Von Neumann entropy (base 2) across the bipartition.
    EntanglementEntropy,
    /// State norm: `‖ψ‖` for vectors, `Tr ρ` for density matrices.
    Norm,
}

impl Observable {
    /// Evaluate on `state` using a prepared contraction plan.
    pub fn compute(&self, plan: &TracePlan, state: &StateInput<'_>) -> SimResult<CallbackValue> {
        match self {
            Observable::PartialTrace => plan.reduced_density(state).map(CallbackValue::Matrix),
            Observable::EntanglementEntropy => plan.entropy(state).map(CallbackValue::Scalar),
            Observable::Norm => Ok(CallbackValue::Scalar(norm(state))),
        }
    }

    fn needs_plan(&self) -> bool {
        !matches!(self, Observable::Norm)
    }

    fn is_scalar(&self) -> bool {
        !matches!(self, Observable::PartialTrace)
    }
}

fn norm(state: &StateInput<'_>) -> f64 {
    match state {
        StateInput::Vector(_) => norm_sqr(state).sqrt(),
        StateInput::Density(_) => norm_sqr(state),
    }
}

/// One recorded callback result.
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackValue {
    /// Real number (entropy, norm).
    Scalar(f64),
    /// Complex matrix (reduced density).
    Matrix(Array2<Complex64>),
}

impl CallbackValue {
    /// The scalar, if this is one.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            CallbackValue::Scalar(v) => Some(*v),
            CallbackValue::Matrix(_) => None,
        }
    }

    /// The matrix, if this is one.
    pub fn as_matrix(&self) -> Option<&Array2<Complex64>> {
        match self {
            CallbackValue::Matrix(m) => Some(m),
            CallbackValue::Scalar(_) => None,
        }
    }
}

/// Selection of recorded results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackIndex {
    /// A single result.
    At(usize),
    /// A contiguous half-open range.
    Range(Range<usize>),
    /// An explicit list, in the given order.
    List(Vec<usize>),
    /// Every result.
    All,
}

impl From<usize> for CallbackIndex {
    fn from(i: usize) -> Self {
        CallbackIndex::At(i)
    }
}

impl From<Range<usize>> for CallbackIndex {
    fn from(r: Range<usize>) -> Self {
        CallbackIndex::Range(r)
    }
}

impl From<RangeFull> for CallbackIndex {
    fn from(_: RangeFull) -> Self {
        CallbackIndex::All
    }
}

impl From<Vec<usize>> for CallbackIndex {
    fn from(v: Vec<usize>) -> Self {
        CallbackIndex::List(v)
    }
}

impl From<&[usize]> for CallbackIndex {
    fn from(v: &[usize]) -> Self {
        CallbackIndex::List(v.to_vec())
    }
}

impl TryFrom<&Value> for CallbackIndex {
    type Error = SimError;

    /// Accepts a non-negative integer, a list of them, or an object
    /// `{"start": a, "end": b}` describing `a..b`.
    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        let invalid = || SimError::InvalidIndexKey(value.to_string());
        let as_index = |v: &Value| {
            v.as_u64()
                .and_then(|i| usize::try_from(i).ok())
                .ok_or_else(invalid)
        };
        match value {
            Value::Number(_) => as_index(value).map(CallbackIndex::At),
            Value::Array(items) => items
                .iter()
                .map(as_index)
                .collect::<SimResult<Vec<_>>>()
                .map(CallbackIndex::List),
            Value::Object(map) => match (map.get("start"), map.get("end")) {
                (Some(start), Some(end)) if map.len() == 2 => {
                    Ok(CallbackIndex::Range(as_index(start)?..as_index(end)?))
                }
                _ => Err(invalid()),
            },
            _ => Err(invalid()),
        }
    }
}

/// Results gathered into one array.
#[derive(Debug, Clone, PartialEq)]
pub enum Stacked {
    /// Scalar results, one per entry.
    Scalars(Array1<f64>),
    /// Matrix results stacked along axis 0.
    Matrices(Array3<Complex64>),
}

/// An observable bound to a bipartition, with its result history.
#[derive(Debug)]
pub struct Callback {
    observable: Observable,
    subsystem: Option<Vec<QubitId>>,
    plan: Mutex<Option<TracePlan>>,
    results: Mutex<Vec<CallbackValue>>,
}

impl Callback {
    /// Create a callback on the default bipartition (first `⌈n/2⌉` qubits).
    pub fn new(observable: Observable) -> Self {
        Self {
            observable,
            subsystem: None,
            plan: Mutex::new(None),
            results: Mutex::new(vec![]),
        }
    }

    /// Entanglement entropy of `subsystem` against its complement.
    pub fn entanglement_entropy(subsystem: impl IntoIterator<Item = QubitId>) -> Self {
        Self::new(Observable::EntanglementEntropy).with_subsystem(subsystem)
    }

    /// Reduced density matrix of `subsystem`.
    pub fn partial_trace(subsystem: impl IntoIterator<Item = QubitId>) -> Self {
        Self::new(Observable::PartialTrace).with_subsystem(subsystem)
    }

    /// State norm.
    pub fn norm() -> Self {
        Self::new(Observable::Norm)
    }

    /// Set the retained subsystem.
    #[must_use]
    pub fn with_subsystem(mut self, subsystem: impl IntoIterator<Item = QubitId>) -> Self {
        self.subsystem = Some(subsystem.into_iter().collect());
        self
    }

    /// The observable computed.
    pub fn observable(&self) -> Observable {
        self.observable
    }

    /// The requested subsystem, if one was given.
    pub fn subsystem(&self) -> Option<&[QubitId]> {
        self.subsystem.as_deref()
    }

    // =========================================================================
    // Evaluation
    // =========================================================================

    /// Evaluate on `state` without recording the result.
    pub fn compute(&self, state: &StateInput<'_>) -> SimResult<CallbackValue> {
        if !self.observable.needs_plan() {
            state.num_qubits()?;
            return Ok(CallbackValue::Scalar(norm(state)));
        }

        let num_qubits = state.num_qubits()?;
        let mut cache = self.plan.lock().unwrap_or_else(PoisonError::into_inner);
        let plan = match cache.take() {
            Some(plan) if plan.num_qubits() == num_qubits => plan,
            _ => {
                let subsystem = self
                    .subsystem
                    .clone()
                    .unwrap_or_else(|| default_subsystem(num_qubits));
                TracePlan::new(&subsystem, num_qubits)?
            }
        };
        let result = self.observable.compute(&plan, state);
        *cache = Some(plan);
        result
    }

    /// Evaluate on `state` and append the result.
    pub fn record(&self, state: &StateInput<'_>) -> SimResult<()> {
        let value = self.compute(state)?;
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(value);
        Ok(())
    }

    /// Plan currently cached, if any.
    pub fn cached_plan(&self) -> Option<TracePlan> {
        self.plan
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // =========================================================================
    // Results
    // =========================================================================

    /// Number of recorded results.
    pub fn len(&self) -> usize {
        self.lock_results().len()
    }

    /// True if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.lock_results().is_empty()
    }

    /// Discard all recorded results.
    pub fn reset(&self) {
        self.lock_results().clear();
    }

    /// Snapshot of every recorded result, oldest first.
    pub fn results(&self) -> Vec<CallbackValue> {
        self.lock_results().clone()
    }

    /// Result of the `index`-th evaluation.
    pub fn get(&self, index: usize) -> SimResult<CallbackValue> {
        let results = self.lock_results();
        results
            .get(index)
            .cloned()
            .ok_or(SimError::IndexOutOfRange {
                index,
                len: results.len(),
            })
    }

    /// Scalar result of the `index`-th evaluation.
    pub fn scalar(&self, index: usize) -> SimResult<f64> {
        self.get(index)?
            .as_scalar()
            .ok_or(SimError::NotScalar { index })
    }

    /// Gather the selected results into one array.
    pub fn stacked(&self, index: impl Into<CallbackIndex>) -> SimResult<Stacked> {
        let results = self.lock_results();
        let len = results.len();
        let out_of_range = |index: usize| SimError::IndexOutOfRange { index, len };

        let selected: Vec<&CallbackValue> = match index.into() {
            CallbackIndex::At(i) => vec![results.get(i).ok_or_else(|| out_of_range(i))?],
            CallbackIndex::Range(range) => {
                if range.start > range.end {
                    return Err(SimError::InvalidIndexKey(format!("{range:?}")));
                }
                if range.end > len {
                    return Err(out_of_range(range.end - 1));
                }
                results[range].iter().collect()
            }
            CallbackIndex::List(list) => list
                .iter()
                .map(|&i| results.get(i).ok_or_else(|| out_of_range(i)))
                .collect::<SimResult<_>>()?,
            CallbackIndex::All => results.iter().collect(),
        };
        stack(&selected, self.observable.is_scalar())
    }

    fn lock_results(&self) -> std::sync::MutexGuard<'_, Vec<CallbackValue>> {
        self.results.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn stack(values: &[&CallbackValue], scalar: bool) -> SimResult<Stacked> {
    if scalar {
        let scalars = values
            .iter()
            .map(|v| v.as_scalar().ok_or(SimError::RaggedResults))
            .collect::<SimResult<Vec<_>>>()?;
        return Ok(Stacked::Scalars(Array1::from(scalars)));
    }

    let matrices = values
        .iter()
        .map(|v| v.as_matrix().ok_or(SimError::RaggedResults))
        .collect::<SimResult<Vec<_>>>()?;
    let (rows, cols) = matrices.first().map_or((0, 0), |m| m.dim());
    if matrices.iter().any(|m| m.dim() != (rows, cols)) {
        return Err(SimError::RaggedResults);
    }
    let stacked = Array3::from_shape_fn((matrices.len(), rows, cols), |(k, i, j)| {
        matrices[k][[i, j]]
    });
    Ok(Stacked::Matrices(stacked))
}
