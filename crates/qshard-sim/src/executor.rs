//! Distributed state execution.

use num_complex::Complex;
use rayon::prelude::*;
use tracing::trace;

use crate::apply::PreparedGate;
use crate::error::{SimError, SimResult};
use crate::partition::{Partition, Route, route};
use crate::precision::Real;
use crate::store::AmplitudeStore;

/// A state vector split into `2^g` pieces according to a [`Partition`].
///
/// Pieces are addressed by index; piece `p` holds the amplitudes of every
/// basis state whose global bits spell `p`.
#[derive(Debug, Clone)]
pub struct DistributedState<T: Real> {
    partition: Partition,
    pieces: Vec<AmplitudeStore<T>>,
    parallel: bool,
}

impl<T: Real> DistributedState<T> {
    /// The |0...0⟩ state distributed over `partition`.
    pub fn zero(partition: Partition) -> Self {
        let num_local = partition.num_local();
        let pieces = (0..partition.num_pieces())
            .map(|p| {
                if p == 0 {
                    AmplitudeStore::zero_state(num_local)
                } else {
                    AmplitudeStore::zeros(num_local)
                }
            })
            .collect();
        Self {
            partition,
            pieces,
            parallel: true,
        }
    }

    /// Distribute a full amplitude vector.
    pub fn from_state(partition: Partition, amplitudes: Vec<Complex<T>>) -> SimResult<Self> {
        let expected = 1usize << partition.num_qubits();
        if amplitudes.len() != expected {
            return Err(SimError::StateLengthMismatch {
                expected,
                got: amplitudes.len(),
            });
        }

        let num_local = partition.num_local();
        let piece_len = 1usize << num_local;
        let pieces = if partition.is_contiguous() {
            amplitudes
                .chunks_exact(piece_len)
                .map(|chunk| AmplitudeStore::from_amplitudes(chunk.to_vec()))
                .collect::<SimResult<Vec<_>>>()?
        } else {
            let mut pieces: Vec<AmplitudeStore<T>> = (0..partition.num_pieces())
                .map(|_| AmplitudeStore::zeros(num_local))
                .collect();
            for (index, amp) in amplitudes.into_iter().enumerate() {
                let (piece, local) = partition.split(index);
                pieces[piece].as_mut_slice()[local] = amp;
            }
            pieces
        };

        Ok(Self {
            partition,
            pieces,
            parallel: true,
        })
    }

    /// Assemble from existing pieces.
    pub fn from_pieces(partition: Partition, pieces: Vec<AmplitudeStore<T>>) -> SimResult<Self> {
        if pieces.len() != partition.num_pieces() {
            return Err(SimError::PieceCountMismatch {
                expected: partition.num_pieces(),
                got: pieces.len(),
            });
        }
        let piece_len = 1usize << partition.num_local();
        if let Some(bad) = pieces.iter().find(|p| p.len() != piece_len) {
            return Err(SimError::StateLengthMismatch {
                expected: piece_len,
                got: bad.len(),
            });
        }
        Ok(Self {
            partition,
            pieces,
            parallel: true,
        })
    }

    /// Run pieces on the rayon pool (default) or sequentially.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// The partition in use.
    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    /// The pieces, in piece order.
    pub fn pieces(&self) -> &[AmplitudeStore<T>] {
        &self.pieces
    }

    /// Register size.
    pub fn num_qubits(&self) -> usize {
        self.partition.num_qubits()
    }

    // =========================================================================
    // Gate dispatch
    // =========================================================================

    /// Apply a gate, exchanging data between pieces when a target is global.
    pub fn apply(&mut self, gate: &PreparedGate<T>) -> SimResult<()> {
        gate.check_range(self.num_qubits())?;

        match route(&self.partition, gate.targets(), gate.controls()) {
            Route::Local { pieces } => {
                trace!(gate = gate.name(), pieces = pieces.len(), "local gate");
                self.apply_local(gate, &pieces);
            }
            Route::Exchange {
                groups,
                global_bits,
            } => {
                trace!(
                    gate = gate.name(),
                    groups = groups.len(),
                    global_bits = ?global_bits,
                    "exchange gate"
                );
                self.apply_exchange(gate, &groups, &global_bits);
            }
        }
        Ok(())
    }

    fn apply_local(&mut self, gate: &PreparedGate<T>, pieces: &[usize]) {
        let targets: Vec<usize> = self.local_axes(gate.targets());
        let controls: Vec<usize> = self.local_axes(gate.controls());

        let mut active = vec![false; self.pieces.len()];
        for &p in pieces {
            active[p] = true;
        }

        let run = |(p, piece): (usize, &mut AmplitudeStore<T>)| {
            if active[p] {
                gate.apply_remapped(piece.as_mut_slice(), &targets, &controls);
            }
        };
        if self.parallel {
            self.pieces.par_iter_mut().enumerate().for_each(run);
        } else {
            self.pieces.iter_mut().enumerate().for_each(run);
        }
    }

    fn apply_exchange(
        &mut self,
        gate: &PreparedGate<T>,
        groups: &[Vec<usize>],
        global_bits: &[usize],
    ) {
        let num_local = self.partition.num_local();
        let piece_len = 1usize << num_local;

        // Global target bit global_bits[i] becomes axis num_local + i of the
        // merged buffer; global controls were resolved by the routing.
        let targets: Vec<usize> = gate
            .targets()
            .iter()
            .map(|&t| match self.partition.local_position(t) {
                Some(pos) => pos,
                None => {
                    let bit = self.partition.global_bit(t).unwrap_or_default();
                    num_local + global_bits.iter().position(|&b| b == bit).unwrap_or_default()
                }
            })
            .collect();
        let controls = self.local_axes(gate.controls());

        let pieces = &self.pieces;
        let merge = |group: &Vec<usize>| {
            let mut merged = Vec::with_capacity(piece_len * group.len());
            for &p in group {
                merged.extend_from_slice(pieces[p].as_slice());
            }
            gate.apply_remapped(&mut merged, &targets, &controls);
            merged
        };
        let merged: Vec<Vec<Complex<T>>> = if self.parallel {
            groups.par_iter().map(merge).collect()
        } else {
            groups.iter().map(merge).collect()
        };

        for (group, buffer) in groups.iter().zip(merged) {
            for (&p, chunk) in group.iter().zip(buffer.chunks_exact(piece_len)) {
                self.pieces[p].as_mut_slice().copy_from_slice(chunk);
            }
        }
    }

    /// Piece-local positions of the local qubits among `qubits`.
    fn local_axes(&self, qubits: &[usize]) -> Vec<usize> {
        qubits
            .iter()
            .filter_map(|&q| self.partition.local_position(q))
            .collect()
    }

    // =========================================================================
    // Reassembly
    // =========================================================================

    /// Reassemble the full `2^n` amplitude vector.
    pub fn compose(&self) -> Vec<Complex<T>> {
        if self.pieces.len() == 1 {
            return self.pieces[0].as_slice().to_vec();
        }
        if self.partition.is_contiguous() {
            return self
                .pieces
                .iter()
                .flat_map(|p| p.as_slice().iter().copied())
                .collect();
        }
        let zero = Complex::new(T::zero(), T::zero());
        let mut full = vec![zero; 1usize << self.num_qubits()];
        for (p, piece) in self.pieces.iter().enumerate() {
            for (local, &amp) in piece.as_slice().iter().enumerate() {
                full[self.partition.join(p, local)] = amp;
            }
        }
        full
    }

    /// Consume the state and return the full amplitude vector.
    pub fn into_state(self) -> Vec<Complex<T>> {
        if self.pieces.len() == 1 {
            return self.pieces.into_iter().flat_map(AmplitudeStore::into_vec).collect();
        }
        self.compose()
    }

    /// Squared norm summed over all pieces.
    pub fn norm_sqr(&self) -> f64 {
        self.pieces.iter().map(AmplitudeStore::norm_sqr).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::HighestQubits;
    use num_complex::Complex64;
    use qshard_ir::{Gate, QubitId};

    fn prepared(gate: Gate) -> PreparedGate<f64> {
        PreparedGate::from_gate(&gate)
    }

    fn run(partition: Partition, gates: &[Gate]) -> Vec<Complex64> {
        let mut state = DistributedState::<f64>::zero(partition);
        for gate in gates {
            state.apply(&prepared(gate.clone())).unwrap();
        }
        state.compose()
    }

    fn circuit() -> Vec<Gate> {
        vec![
            Gate::h(QubitId(0)),
            Gate::h(QubitId(2)),
            Gate::cnot(QubitId(0), QubitId(1)).unwrap(),
            Gate::ry(QubitId(2), 0.3),
            Gate::cnot(QubitId(2), QubitId(0)).unwrap(),
            Gate::swap(QubitId(1), QubitId(2)).unwrap(),
            Gate::toffoli(QubitId(2), QubitId(0), QubitId(1)).unwrap(),
            Gate::rz(QubitId(1), 1.1),
        ]
    }

    fn assert_close(a: &[Complex64], b: &[Complex64]) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).norm() < 1e-12, "{x} != {y}");
        }
    }

    #[test]
    fn test_zero_state_composes() {
        let p = Partition::plan(3, 4, &HighestQubits, &[]).unwrap();
        let state = DistributedState::<f64>::zero(p);
        let full = state.compose();
        assert_eq!(full[0], Complex64::new(1.0, 0.0));
        assert!(full[1..].iter().all(|a| a.norm() == 0.0));
    }

    #[test]
    fn test_distributed_matches_single_piece() {
        let reference = run(Partition::single(3), &circuit());
        for global in [vec![2], vec![0], vec![1, 2], vec![2, 0], vec![0, 1, 2]] {
            let p = Partition::new(3, global).unwrap();
            assert_close(&run(p, &circuit()), &reference);
        }
    }

    #[test]
    fn test_sequential_matches_parallel() {
        let p = Partition::new(3, vec![1]).unwrap();
        let mut state = DistributedState::<f64>::zero(p.clone()).with_parallel(false);
        for gate in circuit() {
            state.apply(&prepared(gate)).unwrap();
        }
        assert_close(&state.compose(), &run(p, &circuit()));
    }

    #[test]
    fn test_from_state_round_trip() {
        let amps: Vec<Complex64> = (0..8).map(|i| Complex64::new(i as f64, 0.0)).collect();
        let p = Partition::new(3, vec![0, 2]).unwrap();
        let state = DistributedState::from_state(p, amps.clone()).unwrap();
        assert_eq!(state.pieces()[1].as_slice(), &[amps[1], amps[3]]);
        assert_eq!(state.into_state(), amps);
    }

    #[test]
    fn test_construction_errors() {
        let p = Partition::new(3, vec![2]).unwrap();
        assert!(matches!(
            DistributedState::<f64>::from_state(p.clone(), vec![Complex64::new(1.0, 0.0); 4]),
            Err(SimError::StateLengthMismatch {
                expected: 8,
                got: 4
            })
        ));
        assert!(matches!(
            DistributedState::<f64>::from_pieces(p, vec![AmplitudeStore::zero_state(2)]),
            Err(SimError::PieceCountMismatch {
                expected: 2,
                got: 1
            })
        ));
    }

    #[test]
    fn test_out_of_range_gate() {
        let mut state = DistributedState::<f64>::zero(Partition::single(2));
        assert!(state.apply(&prepared(Gate::h(QubitId(4)))).is_err());
    }
}
