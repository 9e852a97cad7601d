//! Splitting a register into device pieces.
//!
//! With `2^g` pieces, `g` qubits are *global*: their bits select the piece
//! (`global[b]` is bit `b` of the piece index). The remaining qubits are
//! *local* and packed in ascending order into the piece-local index. A gate
//! whose targets are all local runs independently on each piece; a gate
//! with a global target needs the pieces that differ on those bits merged.

use std::collections::BTreeMap;
use std::fmt;

use qshard_ir::{Gate, QubitId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SimError, SimResult};

/// Assignment of qubits to global (piece-selecting) and local roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    num_qubits: usize,
    global: Vec<usize>,
    local: Vec<usize>,
}

impl Partition {
    /// A single piece holding the whole register.
    pub fn single(num_qubits: usize) -> Self {
        Self {
            num_qubits,
            global: vec![],
            local: (0..num_qubits).collect(),
        }
    }

    /// Partition with an explicit ordered global set.
    pub fn new(num_qubits: usize, global: Vec<usize>) -> SimResult<Self> {
        for (i, &q) in global.iter().enumerate() {
            if q >= num_qubits {
                return Err(SimError::InvalidGlobalQubits(format!(
                    "qubit {q} outside a {num_qubits}-qubit register"
                )));
            }
            if global[..i].contains(&q) {
                return Err(SimError::InvalidGlobalQubits(format!(
                    "qubit {q} listed twice"
                )));
            }
        }
        let local = (0..num_qubits).filter(|q| !global.contains(q)).collect();
        Ok(Self {
            num_qubits,
            global,
            local,
        })
    }

    /// Choose a partition of `num_pieces` pieces using `policy`.
    ///
    /// # Arguments
    ///
    /// * `num_qubits` - Register size
    /// * `num_pieces` - Power of two, at most `2^num_qubits`
    /// * `policy` - Global-qubit selection strategy
    /// * `gates` - Gate queue, for queue-aware policies
    pub fn plan(
        num_qubits: usize,
        num_pieces: usize,
        policy: &dyn GlobalQubitPolicy,
        gates: &[&Gate],
    ) -> SimResult<Self> {
        if num_pieces == 0 || !num_pieces.is_power_of_two() {
            return Err(SimError::InvalidPieceCount(num_pieces));
        }
        let num_global = num_pieces.trailing_zeros() as usize;
        if num_global > num_qubits {
            return Err(SimError::TooManyPieces {
                pieces: num_pieces,
                num_qubits,
            });
        }

        let global = policy.select(num_qubits, num_global, gates)?;
        if global.len() != num_global {
            return Err(SimError::InvalidGlobalQubits(format!(
                "{num_pieces} pieces need {num_global} global qubits, got {}",
                global.len()
            )));
        }
        let partition = Self::new(num_qubits, global)?;
        debug!(
            num_qubits,
            num_pieces,
            policy = ?policy,
            global = ?partition.global,
            "planned partition"
        );
        Ok(partition)
    }

    /// Register size.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Number of pieces, `2^g`.
    pub fn num_pieces(&self) -> usize {
        1 << self.global.len()
    }

    /// Number of global qubits.
    pub fn num_global(&self) -> usize {
        self.global.len()
    }

    /// Number of local qubits per piece.
    pub fn num_local(&self) -> usize {
        self.local.len()
    }

    /// Global qubits; `global()[b]` is bit `b` of the piece index.
    pub fn global(&self) -> &[usize] {
        &self.global
    }

    /// Local qubits in ascending order.
    pub fn local(&self) -> &[usize] {
        &self.local
    }

    /// Bit of the piece index carrying `qubit`, if it is global.
    pub fn global_bit(&self, qubit: usize) -> Option<usize> {
        self.global.iter().position(|&g| g == qubit)
    }

    /// Bit of the piece-local index carrying `qubit`, if it is local.
    pub fn local_position(&self, qubit: usize) -> Option<usize> {
        self.local.binary_search(&qubit).ok()
    }

    /// True when the global qubits are the top qubits in ascending order, so
    /// piece `p` is the `p`-th contiguous chunk of the flat state.
    pub fn is_contiguous(&self) -> bool {
        self.global
            .iter()
            .enumerate()
            .all(|(b, &q)| q == self.local.len() + b)
    }

    /// Split a flat index into `(piece, local index)`.
    pub fn split(&self, index: usize) -> (usize, usize) {
        (
            gather_bits(index, &self.global),
            gather_bits(index, &self.local),
        )
    }

    /// Inverse of [`Partition::split`].
    pub fn join(&self, piece: usize, local: usize) -> usize {
        scatter_bits(piece, &self.global) | scatter_bits(local, &self.local)
    }
}

fn gather_bits(index: usize, qubits: &[usize]) -> usize {
    qubits
        .iter()
        .enumerate()
        .fold(0, |acc, (i, &q)| acc | (((index >> q) & 1) << i))
}

fn scatter_bits(value: usize, qubits: &[usize]) -> usize {
    qubits
        .iter()
        .enumerate()
        .fold(0, |acc, (i, &q)| acc | (((value >> i) & 1) << q))
}

// =========================================================================
// Global qubit policies
// =========================================================================

/// Strategy choosing which qubits become global.
pub trait GlobalQubitPolicy: Send + Sync + fmt::Debug {
    /// Return `num_global` distinct qubits in `[0, num_qubits)`. The order
    /// of the result fixes the bit order of the piece index.
    fn select(
        &self,
        num_qubits: usize,
        num_global: usize,
        gates: &[&Gate],
    ) -> SimResult<Vec<usize>>;
}

/// The `g` highest-indexed qubits, ascending.
#[derive(Debug, Clone, Copy, Default)]
pub struct HighestQubits;

impl GlobalQubitPolicy for HighestQubits {
    fn select(
        &self,
        num_qubits: usize,
        num_global: usize,
        _gates: &[&Gate],
    ) -> SimResult<Vec<usize>> {
        Ok((num_qubits - num_global..num_qubits).collect())
    }
}

/// A caller-supplied global set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplicitQubits(pub Vec<QubitId>);

impl GlobalQubitPolicy for ExplicitQubits {
    fn select(
        &self,
        num_qubits: usize,
        num_global: usize,
        _gates: &[&Gate],
    ) -> SimResult<Vec<usize>> {
        if self.0.len() != num_global {
            return Err(SimError::InvalidGlobalQubits(format!(
                "expected {num_global} global qubits, got {}",
                self.0.len()
            )));
        }
        let global: Vec<usize> = self.0.iter().map(|q| q.index()).collect();
        // Range and uniqueness are checked by Partition::new.
        Partition::new(num_qubits, global.clone())?;
        Ok(global)
    }
}

/// The `g` qubits touched by the fewest gates, ties broken toward higher
/// indices.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeastTouched;

impl GlobalQubitPolicy for LeastTouched {
    fn select(
        &self,
        num_qubits: usize,
        num_global: usize,
        gates: &[&Gate],
    ) -> SimResult<Vec<usize>> {
        let mut touches = vec![0usize; num_qubits];
        for gate in gates {
            for q in gate.qubits() {
                if let Some(count) = touches.get_mut(q.index()) {
                    *count += 1;
                }
            }
        }
        let mut order: Vec<usize> = (0..num_qubits).collect();
        order.sort_by(|&a, &b| touches[a].cmp(&touches[b]).then(b.cmp(&a)));
        let mut global: Vec<usize> = order.into_iter().take(num_global).collect();
        global.sort_unstable();
        Ok(global)
    }
}

// =========================================================================
// Device descriptor
// =========================================================================

/// Mapping from device id to the number of pieces it hosts.
///
/// An empty map means a single piece on the default device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceMap(BTreeMap<String, usize>);

impl DeviceMap {
    /// An empty descriptor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `pieces` pieces on `device`.
    #[must_use]
    pub fn with_device(mut self, device: impl Into<String>, pieces: usize) -> Self {
        self.0.insert(device.into(), pieces);
        self
    }

    /// Devices and their piece counts, ordered by id.
    pub fn devices(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(k, &v)| (k.as_str(), v))
    }

    /// True if no device is listed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total number of pieces.
    ///
    /// Fails when a device has zero pieces or the total is not a power of
    /// two.
    pub fn num_pieces(&self) -> SimResult<usize> {
        if self.0.is_empty() {
            return Ok(1);
        }
        let mut total = 0usize;
        for (device, &pieces) in &self.0 {
            if pieces == 0 {
                return Err(SimError::InvalidDeviceMap(format!(
                    "device '{device}' has zero pieces"
                )));
            }
            total = total.checked_add(pieces).ok_or_else(|| {
                SimError::InvalidDeviceMap("piece count overflows".to_string())
            })?;
        }
        if !total.is_power_of_two() {
            return Err(SimError::InvalidDeviceMap(format!(
                "total piece count {total} is not a power of two"
            )));
        }
        Ok(total)
    }

    /// Device id hosting each piece, in piece order.
    pub fn piece_assignment(&self) -> SimResult<Vec<String>> {
        self.num_pieces()?;
        if self.0.is_empty() {
            return Ok(vec!["default".to_string()]);
        }
        Ok(self
            .0
            .iter()
            .flat_map(|(device, &pieces)| std::iter::repeat_n(device.clone(), pieces))
            .collect())
    }
}

impl FromIterator<(String, usize)> for DeviceMap {
    fn from_iter<I: IntoIterator<Item = (String, usize)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// =========================================================================
// Routing
// =========================================================================

/// How a gate reaches the pieces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Every target is local: apply independently to these pieces.
    Local {
        /// Pieces whose global control bits are all 1.
        pieces: Vec<usize>,
    },
    /// Some target is global: merge each group, apply, split back.
    Exchange {
        /// Groups of `2^m` pieces; member `j` has bit `i` of `j` at piece
        /// bit `global_bits[i]`.
        groups: Vec<Vec<usize>>,
        /// Piece-index bits of the global targets, ascending.
        global_bits: Vec<usize>,
    },
}

/// Decide how a gate on `targets`/`controls` is dispatched.
pub fn route(partition: &Partition, targets: &[usize], controls: &[usize]) -> Route {
    let mut global_bits: Vec<usize> = targets
        .iter()
        .filter_map(|&t| partition.global_bit(t))
        .collect();
    global_bits.sort_unstable();

    let control_bits = controls
        .iter()
        .filter_map(|&c| partition.global_bit(c))
        .fold(0usize, |m, b| m | (1 << b));
    let target_bits = global_bits.iter().fold(0usize, |m, &b| m | (1 << b));

    let eligible = (0..partition.num_pieces()).filter(|p| p & control_bits == control_bits);

    if global_bits.is_empty() {
        return Route::Local {
            pieces: eligible.collect(),
        };
    }

    let groups = eligible
        .filter(|p| p & target_bits == 0)
        .map(|base| {
            (0..1usize << global_bits.len())
                .map(|j| base | scatter_bits(j, &global_bits))
                .collect()
        })
        .collect();
    Route::Exchange {
        groups,
        global_bits,
    }
}

/// Groups of pieces that must be merged to apply a gate.
///
/// A gate with only local targets yields one singleton group per eligible
/// piece.
pub fn exchange_groups(
    partition: &Partition,
    targets: &[usize],
    controls: &[usize],
) -> Vec<Vec<usize>> {
    match route(partition, targets, controls) {
        Route::Local { pieces } => pieces.into_iter().map(|p| vec![p]).collect(),
        Route::Exchange { groups, .. } => groups,
    }
}
