use std::fmt::Debug;

use log::{debug, trace};
use rayon::prelude::*;

use crate::bits::{bitmask, get_bit, set_bit, BitBlock, BitTable, BLOCK_SIZE};
use crate::gates::{Lanes, SingleQubitGate, TwoQubitGate};
use crate::pauli_string::{blocks_commute, Pauli, PauliString};
use crate::transposed::TransposedTableau;

/// Tableaus with at least this many qubits update rows on all cores.
pub const PARALLEL_MIN_QUBITS: usize = 1024;

/// Half of a tableau: either the destabilizers or the stabilizers.
///
/// The generators
/// ```text
/// P0 -> x0 x1 ... xn | z0 z1 ... zn | r
/// P1 -> x0 x1 ... xn | z0 z1 ... zn | r
/// ...
/// ```
/// are stored as two square bit tables, one for the x parts and one for the z parts,
/// with generator `k` in row `k` of each table, and a separate bit vector of signs.
/// While a [`TransposedTableau`] exists, both tables are transposed, so that row `q` holds
/// the `q`th tensor element of every generator. The signs are unaffected by transposition.
#[derive(Clone)]
pub(crate) struct Generators {
    pub xs: BitTable,
    pub zs: BitTable,
    pub signs: Vec<BitBlock>,
}
impl Generators {
    fn zero(capacity: usize) -> Self {
        let xs = BitTable::zero(capacity);
        let zs = BitTable::zero(capacity);
        let signs = vec![0; xs.blocks()];
        Generators { xs, zs, signs }
    }

    fn grown(&self, capacity: usize) -> Self {
        let xs = self.xs.grown(capacity);
        let zs = self.zs.grown(capacity);
        let mut signs = self.signs.clone();
        signs.resize(xs.blocks(), 0);
        Generators { xs, zs, signs }
    }

    pub fn transpose(&mut self) {
        self.xs.transpose();
        self.zs.transpose();
    }

    pub fn sign(&self, k: usize) -> bool {
        get_bit(&self.signs, k)
    }

    pub fn set_sign(&mut self, k: usize, negative: bool) {
        set_bit(&mut self.signs, k, negative);
    }

    /// Get the x bit of the `q`th tensor element of generator `k`.
    pub fn x(&self, k: usize, q: usize) -> bool {
        self.xs.get(k, q)
    }

    fn row(&self, k: usize, num_qubits: usize) -> PauliString {
        PauliString::from_blocks(num_qubits, self.sign(k), self.xs.row(k), self.zs.row(k))
    }

    fn set_row(&mut self, k: usize, p: &PauliString) {
        let xs = self.xs.row_mut(k);
        xs.fill(0);
        xs[..p.xs().len()].copy_from_slice(p.xs());
        let zs = self.zs.row_mut(k);
        zs.fill(0);
        zs[..p.zs().len()].copy_from_slice(p.zs());
        self.set_sign(k, p.is_negative());
    }

    /// Set generator `k` to the product of itself and `rhs`, `P_k = P_k * rhs`.
    fn right_mul_row(&mut self, k: usize, rhs: &PauliString) {
        let mut row = PauliString::from_blocks(
            rhs.num_qubits(),
            self.sign(k),
            self.xs.row(k),
            self.zs.row(k),
        );
        row.right_mul(rhs);
        self.set_row(k, &row);
    }

    fn apply_single(&mut self, gate: SingleQubitGate, q: usize, parallel: bool) {
        let blocks = self.xs.blocks();
        let column = Column::new(q);
        let update =
            |((xs, zs), r): ((&mut [BitBlock], &mut [BitBlock]), &mut BitBlock)| {
                let mut lanes = column.gather(xs, zs, blocks);
                gate.conjugate(&mut lanes, r);
                column.scatter(xs, zs, blocks, lanes);
            };

        // Each chunk holds 64 generators, whose signs share a single block.
        let chunk = blocks * BLOCK_SIZE;
        if parallel {
            self.xs
                .data_mut()
                .par_chunks_mut(chunk)
                .zip(self.zs.data_mut().par_chunks_mut(chunk))
                .zip(self.signs.par_iter_mut())
                .for_each(update);
        } else {
            self.xs
                .data_mut()
                .chunks_mut(chunk)
                .zip(self.zs.data_mut().chunks_mut(chunk))
                .zip(self.signs.iter_mut())
                .for_each(update);
        }
    }

    fn apply_two(&mut self, gate: TwoQubitGate, a: usize, b: usize, parallel: bool) {
        let blocks = self.xs.blocks();
        let column_a = Column::new(a);
        let column_b = Column::new(b);
        let update =
            |((xs, zs), r): ((&mut [BitBlock], &mut [BitBlock]), &mut BitBlock)| {
                let mut lanes_a = column_a.gather(xs, zs, blocks);
                let mut lanes_b = column_b.gather(xs, zs, blocks);
                gate.conjugate(&mut lanes_a, &mut lanes_b, r);
                column_a.scatter(xs, zs, blocks, lanes_a);
                column_b.scatter(xs, zs, blocks, lanes_b);
            };

        let chunk = blocks * BLOCK_SIZE;
        if parallel {
            self.xs
                .data_mut()
                .par_chunks_mut(chunk)
                .zip(self.zs.data_mut().par_chunks_mut(chunk))
                .zip(self.signs.par_iter_mut())
                .for_each(update);
        } else {
            self.xs
                .data_mut()
                .chunks_mut(chunk)
                .zip(self.zs.data_mut().chunks_mut(chunk))
                .zip(self.signs.iter_mut())
                .for_each(update);
        }
    }
}

/// Position of a qubit's tensor element within a generator-major row.
#[derive(Clone, Copy)]
struct Column {
    block: usize,
    mask: BitBlock,
}
impl Column {
    fn new(q: usize) -> Self {
        Column {
            block: q / BLOCK_SIZE,
            mask: bitmask(q % BLOCK_SIZE),
        }
    }

    /// Collect this column of 64 consecutive generators into lanes, generator `k` in bit `k`.
    fn gather(self, xs: &[BitBlock], zs: &[BitBlock], blocks: usize) -> Lanes {
        let mut lanes = Lanes::default();
        for k in 0..BLOCK_SIZE {
            let i = k * blocks + self.block;
            if xs[i] & self.mask != 0 {
                lanes.x |= bitmask(k);
            }
            if zs[i] & self.mask != 0 {
                lanes.z |= bitmask(k);
            }
        }
        lanes
    }

    /// Inverse of [`Column::gather`].
    fn scatter(self, xs: &mut [BitBlock], zs: &mut [BitBlock], blocks: usize, lanes: Lanes) {
        for k in 0..BLOCK_SIZE {
            let i = k * blocks + self.block;
            xs[i] &= !self.mask;
            zs[i] &= !self.mask;
            if lanes.x & bitmask(k) != 0 {
                xs[i] |= self.mask;
            }
            if lanes.z & bitmask(k) != 0 {
                zs[i] |= self.mask;
            }
        }
    }
}

/// The result of collapsing a qubit onto the Z basis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Collapse {
    /// Whether the qubit ended up in |1⟩.
    pub outcome: bool,
    /// The stabilizer that anticommuted with the measurement, or `None` if the outcome was deterministic.
    pub pivot: Option<PauliString>,
}

/// The stabilizer tableau of a pure stabilizer state on `num_qubits` qubits.
///
/// Row `r` of the tableau is destabilizer `r` for `r < n` and stabilizer `r - n` for `n <= r < 2n`.
/// Destabilizer `k` anticommutes with stabilizer `k` and commutes with every other row.
#[derive(Clone)]
pub struct Tableau {
    num_qubits: usize,
    pub(crate) destabilizers: Generators,
    pub(crate) stabilizers: Generators,
    /// Whether gates are applied to chunks of rows in parallel.
    parallel: bool,
}
impl Tableau {
    /// Initialize a new tableau with `num_qubits` qubits in the all-zero state.
    pub fn identity(num_qubits: usize) -> Self {
        let mut tableau = Tableau {
            num_qubits: 0,
            destabilizers: Generators::zero(num_qubits),
            stabilizers: Generators::zero(num_qubits),
            parallel: false,
        };
        if num_qubits > 0 {
            tableau.ensure_large_enough_for_qubit(num_qubits - 1);
        }
        tableau
    }

    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// The number of qubits the current storage can hold without reallocating.
    pub fn capacity(&self) -> usize {
        self.stabilizers.xs.side()
    }

    /// Grow the tableau so that qubit `q` exists. New qubits start in |0⟩,
    /// with destabilizer `X_q` and stabilizer `Z_q`.
    pub fn ensure_large_enough_for_qubit(&mut self, q: usize) {
        if q < self.num_qubits {
            return;
        }
        if q >= self.capacity() {
            let capacity = (q + 1).max(2 * self.capacity());
            debug!(
                "Growing tableau storage from {} to {} qubits",
                self.capacity(),
                capacity
            );
            self.destabilizers = self.destabilizers.grown(capacity);
            self.stabilizers = self.stabilizers.grown(capacity);
        }
        for k in self.num_qubits..=q {
            self.destabilizers.xs.set(k, k, true);
            self.stabilizers.zs.set(k, k, true);
        }
        self.num_qubits = q + 1;
        self.parallel = self.capacity() >= PARALLEL_MIN_QUBITS && num_cpus::get() > 1;
    }

    /// Get row `r`, counting destabilizers first and stabilizers second.
    pub fn row(&self, r: usize) -> PauliString {
        let n = self.num_qubits;
        assert!(r < 2 * n, "Row {r} out of range for {n} qubits");
        if r < n {
            self.destabilizer(r)
        } else {
            self.stabilizer(r - n)
        }
    }

    pub fn destabilizer(&self, k: usize) -> PauliString {
        self.destabilizers.row(k, self.num_qubits)
    }

    pub fn stabilizer(&self, k: usize) -> PauliString {
        self.stabilizers.row(k, self.num_qubits)
    }

    /// Conjugate every row by the single-qubit gate acting on qubit `q`.
    pub fn apply_single(&mut self, gate: SingleQubitGate, q: usize) {
        self.ensure_large_enough_for_qubit(q);
        self.destabilizers.apply_single(gate, q, self.parallel);
        self.stabilizers.apply_single(gate, q, self.parallel);
    }

    /// Conjugate every row by the two-qubit gate acting on qubits `a` and `b`.
    ///
    /// # Panics
    /// If `a == b`.
    pub fn apply_two(&mut self, gate: TwoQubitGate, a: usize, b: usize) {
        assert_ne!(a, b, "Two-qubit gate {} applied to qubit {a} twice", gate.name());
        self.ensure_large_enough_for_qubit(a.max(b));
        self.destabilizers.apply_two(gate, a, b, self.parallel);
        self.stabilizers.apply_two(gate, a, b, self.parallel);
    }

    /// Whether measuring qubit `q` in the Z basis has a fixed outcome,
    /// i.e. whether `Z_q` commutes with every stabilizer.
    pub fn is_deterministic(&self, q: usize) -> bool {
        if q >= self.num_qubits {
            return true;
        }
        (0..self.num_qubits).all(|k| !self.stabilizers.x(k, q))
    }

    /// The outcome of measuring qubit `q` in the Z basis if it is fixed, without collapsing anything.
    pub fn deterministic_outcome(&self, q: usize) -> Option<bool> {
        if q >= self.num_qubits {
            return Some(false);
        }
        if !self.is_deterministic(q) {
            return None;
        }
        Some(self.z_product_sign(q))
    }

    /// The sign `s` such that `s * Z_q` is in the stabilizer group, assuming it is.
    ///
    /// `Z_q` is the product of the stabilizers whose destabilizers anticommute with it.
    fn z_product_sign(&self, q: usize) -> bool {
        let n = self.num_qubits;
        let mut product = PauliString::identity(n);
        for k in 0..n {
            if self.destabilizers.x(k, q) {
                product.right_mul_blocks(
                    self.stabilizers.sign(k),
                    self.stabilizers.xs.row(k),
                    self.stabilizers.zs.row(k),
                );
            }
        }
        debug_assert_eq!(product.weight(), 1);
        debug_assert_eq!(product.get(q), Pauli::Z);
        product.is_negative()
    }

    /// Measure qubit `q` in the Z basis, collapsing the state.
    ///
    /// `random_outcome` is only called if the outcome is not determined by the state.
    pub(crate) fn collapse(&mut self, q: usize, random_outcome: impl FnOnce() -> bool) -> Collapse {
        self.ensure_large_enough_for_qubit(q);
        let n = self.num_qubits;

        let Some(pivot_index) = (0..n).find(|&k| self.stabilizers.x(k, q)) else {
            return Collapse {
                outcome: self.z_product_sign(q),
                pivot: None,
            };
        };

        // Make the pivot the only stabilizer anticommuting with Z_q,
        // and every destabilizer but the pivot's own commute with it.
        let pivot = self.stabilizers.row(pivot_index, n);
        for k in 0..n {
            if self.destabilizers.x(k, q) {
                self.destabilizers.right_mul_row(k, &pivot);
            }
            if k != pivot_index && self.stabilizers.x(k, q) {
                self.stabilizers.right_mul_row(k, &pivot);
            }
        }

        let outcome = random_outcome();
        self.destabilizers.set_row(pivot_index, &pivot);
        self.stabilizers
            .set_row(pivot_index, &PauliString::single(n, q, Pauli::Z, outcome));
        trace!("Collapsed qubit {q} onto stabilizer {pivot_index} with outcome {outcome}");
        debug_assert!(self.is_collapsed_onto(q, pivot_index));

        Collapse {
            outcome,
            pivot: Some(pivot),
        }
    }

    /// Whether destabilizer `k` is the only row anticommuting with `Z_q`.
    fn is_collapsed_onto(&self, q: usize, k: usize) -> bool {
        (0..self.num_qubits).all(|j| {
            self.destabilizers.x(j, q) == (j == k) && !self.stabilizers.x(j, q)
        })
    }

    /// Check the commutation relations between every pair of rows.
    ///
    /// This takes O(n^3) time and is meant for testing.
    pub fn satisfies_invariants(&self) -> bool {
        let n = self.num_qubits;
        let rows: Vec<PauliString> = (0..2 * n).map(|r| self.row(r)).collect();
        for i in 0..2 * n {
            for j in (i + 1)..2 * n {
                let should_anticommute = i < n && j == i + n;
                if blocks_commute(rows[i].xs(), rows[i].zs(), rows[j].xs(), rows[j].zs())
                    == should_anticommute
                {
                    return false;
                }
            }
        }
        true
    }

    /// Temporarily switch to qubit-major storage. The layout is restored when the view is dropped.
    pub fn transposed(&mut self) -> TransposedTableau<'_> {
        TransposedTableau::new(self)
    }
}
impl PartialEq for Tableau {
    /// Tableaus are equal if all of their rows are, regardless of how much storage they hold.
    fn eq(&self, other: &Self) -> bool {
        self.num_qubits == other.num_qubits
            && (0..2 * self.num_qubits).all(|r| self.row(r) == other.row(r))
    }
}
impl Eq for Tableau {}

impl Debug for Tableau {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let n = self.num_qubits;
        writeln!(f, "Tableau {{ n: {n:?}")?;
        for k in 0..n {
            writeln!(f, "\tD{k} -> {}", self.destabilizer(k))?;
        }
        for k in 0..n {
            writeln!(f, "\tS{k} -> {}", self.stabilizer(k))?;
        }
        write!(f, "}}")
    }
}
