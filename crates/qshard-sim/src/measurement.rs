//! Named measurement registers and shot sampling.

use std::collections::BTreeMap;

use qshard_ir::QubitId;
use rand::Rng;
use rustc_hash::FxHashMap;

use crate::error::{SimError, SimResult};

/// Bitstring frequencies for one register.
pub type Counts = FxHashMap<String, u64>;

/// Ordered set of named registers over disjoint qubits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeasurementRegisters {
    registers: Vec<(String, Vec<QubitId>)>,
}

impl MeasurementRegisters {
    /// No registers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a register and return its name.
    ///
    /// Without a name the register is called `Register{k}` with the
    /// smallest free `k`, starting from the current register count.
    pub fn add(
        &mut self,
        name: Option<&str>,
        qubits: impl IntoIterator<Item = QubitId>,
    ) -> SimResult<String> {
        let name = match name {
            Some(name) if self.get(name).is_some() => {
                return Err(SimError::DuplicateRegister(name.to_string()));
            }
            Some(name) => name.to_string(),
            None => (self.registers.len()..)
                .map(|k| format!("Register{k}"))
                .find(|candidate| self.get(candidate).is_none())
                .unwrap_or_default(),
        };

        let qubits: Vec<QubitId> = qubits.into_iter().collect();
        for (i, q) in qubits.iter().enumerate() {
            if self.is_measured(*q) || qubits[..i].contains(q) {
                return Err(SimError::QubitAlreadyMeasured(*q));
            }
        }

        self.registers.push((name.clone(), qubits));
        Ok(name)
    }

    /// Qubits of the register called `name`.
    pub fn get(&self, name: &str) -> Option<&[QubitId]> {
        self.registers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, q)| q.as_slice())
    }

    /// True if `qubit` belongs to some register.
    pub fn is_measured(&self, qubit: QubitId) -> bool {
        self.registers.iter().any(|(_, q)| q.contains(&qubit))
    }

    /// Registers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[QubitId])> {
        self.registers
            .iter()
            .map(|(n, q)| (n.as_str(), q.as_slice()))
    }

    /// Number of registers.
    pub fn len(&self) -> usize {
        self.registers.len()
    }

    /// True if no register is defined.
    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }

    /// Merge `other` into `self`, rejecting clashes.
    pub fn extend_from(&mut self, other: &MeasurementRegisters) -> SimResult<()> {
        for (name, qubits) in other.iter() {
            self.add(Some(name), qubits.iter().copied())?;
        }
        Ok(())
    }

    /// Draw `shots` samples from `probabilities` and tally each register.
    ///
    /// The first qubit of a register is the leftmost character of its
    /// bitstring.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        probabilities: &[f64],
        shots: u64,
        rng: &mut R,
    ) -> MeasurementOutcome {
        let mut cumulative = Vec::with_capacity(probabilities.len());
        let mut total = 0.0;
        for &p in probabilities {
            total += p;
            cumulative.push(total);
        }
        let last = probabilities.len().saturating_sub(1);

        let mut registers: BTreeMap<String, Counts> = self
            .registers
            .iter()
            .map(|(name, _)| (name.clone(), Counts::default()))
            .collect();

        for _ in 0..shots {
            let r = rng.r#gen::<f64>() * total;
            let index = cumulative.partition_point(|&c| c <= r).min(last);
            for (name, qubits) in &self.registers {
                let bits: String = qubits
                    .iter()
                    .map(|q| if (index >> q.index()) & 1 == 1 { '1' } else { '0' })
                    .collect();
                if let Some(counts) = registers.get_mut(name) {
                    *counts.entry(bits).or_insert(0) += 1;
                }
            }
        }

        MeasurementOutcome { shots, registers }
    }
}

/// Per-register counts from a sampling run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeasurementOutcome {
    shots: u64,
    registers: BTreeMap<String, Counts>,
}

impl MeasurementOutcome {
    /// Number of shots drawn.
    pub fn shots(&self) -> u64 {
        self.shots
    }

    /// Counts of the register called `name`.
    pub fn register(&self, name: &str) -> Option<&Counts> {
        self.registers.get(name)
    }

    /// All registers, ordered by name.
    pub fn registers(&self) -> impl Iterator<Item = (&str, &Counts)> {
        self.registers.iter().map(|(n, c)| (n.as_str(), c))
    }
}
