use log::trace;

use crate::bits::{
    bitmask, broadcast, first_set_index, prefix_parity, set_bit, BitBlock, BLOCK_SIZE,
};
use crate::gates::{Lanes, SingleQubitGate, TwoQubitGate};
use crate::pauli_string::{Pauli, PauliString, PhaseCounter};
use crate::tableau::{Collapse, Generators, Tableau};

/// A view of a [`Tableau`] with its storage in qubit-major layout.
///
/// In this layout the tensor elements belonging to one qubit are contiguous across all generators,
/// so gates and eliminations touching few qubits update 64 generators per word operation.
/// The storage is transposed back when the view is dropped.
///
/// The view holds the only mutable borrow of its tableau, so at most one can exist at a time.
pub struct TransposedTableau<'a> {
    tableau: &'a mut Tableau,
}
impl<'a> TransposedTableau<'a> {
    pub(crate) fn new(tableau: &'a mut Tableau) -> Self {
        trace!("Transposing tableau of {} qubits", tableau.num_qubits());
        tableau.destabilizers.transpose();
        tableau.stabilizers.transpose();
        TransposedTableau { tableau }
    }

    pub fn num_qubits(&self) -> usize {
        self.tableau.num_qubits()
    }

    fn check_qubit(&self, q: usize) {
        assert!(
            q < self.num_qubits(),
            "Qubit {q} out of range for transposed tableau of {} qubits",
            self.num_qubits()
        );
    }

    /// Conjugate every row by the single-qubit gate acting on qubit `q`.
    ///
    /// # Panics
    /// If `q` is not already part of the tableau, since the storage cannot grow while transposed.
    pub fn apply_single(&mut self, gate: SingleQubitGate, q: usize) {
        self.check_qubit(q);
        self.tableau.destabilizers.apply_single_by_qubit(gate, q);
        self.tableau.stabilizers.apply_single_by_qubit(gate, q);
    }

    /// Conjugate every row by the two-qubit gate acting on qubits `a` and `b`.
    ///
    /// # Panics
    /// If `a == b` or either qubit is not already part of the tableau.
    pub fn apply_two(&mut self, gate: TwoQubitGate, a: usize, b: usize) {
        assert_ne!(a, b, "Two-qubit gate {} applied to qubit {a} twice", gate.name());
        self.check_qubit(a);
        self.check_qubit(b);
        self.tableau.destabilizers.apply_two_by_qubit(gate, a, b);
        self.tableau.stabilizers.apply_two_by_qubit(gate, a, b);
    }

    /// Whether measuring qubit `q` in the Z basis has a fixed outcome.
    pub fn is_deterministic(&self, q: usize) -> bool {
        q >= self.num_qubits() || self.tableau.stabilizers.xs.row(q).iter().all(|&b| b == 0)
    }

    /// Measure qubit `q` in the Z basis, collapsing the state.
    ///
    /// `random_outcome` is only called if the outcome is not determined by the state.
    ///
    /// # Panics
    /// If `q` is not already part of the tableau.
    pub(crate) fn collapse(
        &mut self,
        q: usize,
        random_outcome: impl FnOnce() -> bool,
    ) -> Collapse {
        self.check_qubit(q);
        let n = self.num_qubits();
        let tableau = &mut *self.tableau;

        let pivot_index = tableau
            .stabilizers
            .xs
            .row(q)
            .iter()
            .enumerate()
            .find(|(_, &b)| b != 0)
            .map(|(i, &b)| i * BLOCK_SIZE + first_set_index(b));
        let Some(pivot_index) = pivot_index else {
            return Collapse {
                outcome: z_product_sign(tableau, q),
                pivot: None,
            };
        };

        let pivot = tableau.stabilizers.generator(pivot_index, n);
        // The masks are read before elimination touches row q.
        let destabilizer_mask = tableau.destabilizers.xs.row(q).to_vec();
        let mut stabilizer_mask = tableau.stabilizers.xs.row(q).to_vec();
        set_bit(&mut stabilizer_mask, pivot_index, false);

        tableau
            .destabilizers
            .right_mul_masked(&destabilizer_mask, &pivot);
        tableau.stabilizers.right_mul_masked(&stabilizer_mask, &pivot);

        let outcome = random_outcome();
        tableau.destabilizers.set_generator(pivot_index, &pivot);
        tableau
            .stabilizers
            .set_generator(pivot_index, &PauliString::single(n, q, Pauli::Z, outcome));
        trace!("Collapsed qubit {q} onto stabilizer {pivot_index} with outcome {outcome}");
        debug_assert!(self.is_collapsed_onto(q, pivot_index));

        Collapse {
            outcome,
            pivot: Some(pivot),
        }
    }

    /// Whether destabilizer `k` is the only row anticommuting with `Z_q`.
    fn is_collapsed_onto(&self, q: usize, k: usize) -> bool {
        let destabilizer_column = self.tableau.destabilizers.xs.row(q);
        self.is_deterministic(q)
            && destabilizer_column.iter().enumerate().all(|(i, &b)| {
                let expected = if i == k / BLOCK_SIZE {
                    bitmask(k % BLOCK_SIZE)
                } else {
                    0
                };
                b == expected
            })
    }
}
impl Drop for TransposedTableau<'_> {
    fn drop(&mut self) {
        self.tableau.destabilizers.transpose();
        self.tableau.stabilizers.transpose();
    }
}

/// The sign of `Z_q` within the stabilizer group, assuming it is a member.
///
/// `Z_q` is the product, in increasing order, of the stabilizers selected by row `q` of the
/// destabilizer x table. Each factor is `i^(xz) X^x Z^z` on every qubit, so the product picks up
/// a factor of -1 for each Z that moves past the X of a later factor.
fn z_product_sign(tableau: &Tableau, q: usize) -> bool {
    let mask = tableau.destabilizers.xs.row(q);
    let stabilizers = &tableau.stabilizers;

    let mut negative = mask
        .iter()
        .zip(&stabilizers.signs)
        .fold(false, |acc, (&m, &r)| acc ^ ((m & r).count_ones() % 2 == 1));
    let mut log_i: u32 = 0;
    for j in 0..tableau.num_qubits() {
        let (mut x_parity, mut z_parity) = (false, false);
        for ((&x, &z), &m) in stabilizers.xs.row(j).iter().zip(stabilizers.zs.row(j)).zip(mask) {
            let (x, z) = (x & m, z & m);
            if x | z == 0 {
                continue;
            }
            // Parity of the Z components in all earlier factors, per lane.
            let earlier_z = (prefix_parity(z) >> 1) ^ broadcast(z_parity);
            log_i = log_i
                .wrapping_add((x & z).count_ones())
                .wrapping_add(2 * (x & earlier_z).count_ones());
            x_parity ^= x.count_ones() % 2 == 1;
            z_parity ^= z.count_ones() % 2 == 1;
        }
        // X Z = -i Y
        if x_parity && z_parity {
            log_i = log_i.wrapping_sub(1);
        }
    }
    debug_assert_eq!(log_i % 2, 0);
    negative ^= log_i & 2 != 0;
    negative
}

/// Operations on generators stored in qubit-major layout,
/// where row `q` of each table holds qubit `q` of every generator.
impl Generators {
    fn apply_single_by_qubit(&mut self, gate: SingleQubitGate, q: usize) {
        let xs = self.xs.row_mut(q);
        let zs = self.zs.row_mut(q);
        for ((x, z), r) in xs.iter_mut().zip(zs.iter_mut()).zip(self.signs.iter_mut()) {
            let mut lanes = Lanes { x: *x, z: *z };
            gate.conjugate(&mut lanes, r);
            *x = lanes.x;
            *z = lanes.z;
        }
    }

    fn apply_two_by_qubit(&mut self, gate: TwoQubitGate, a: usize, b: usize) {
        for i in 0..self.signs.len() {
            let mut lanes_a = Lanes {
                x: self.xs.row(a)[i],
                z: self.zs.row(a)[i],
            };
            let mut lanes_b = Lanes {
                x: self.xs.row(b)[i],
                z: self.zs.row(b)[i],
            };
            gate.conjugate(&mut lanes_a, &mut lanes_b, &mut self.signs[i]);
            self.xs.row_mut(a)[i] = lanes_a.x;
            self.zs.row_mut(a)[i] = lanes_a.z;
            self.xs.row_mut(b)[i] = lanes_b.x;
            self.zs.row_mut(b)[i] = lanes_b.z;
        }
    }

    /// Read generator `k`.
    fn generator(&self, k: usize, num_qubits: usize) -> PauliString {
        let mut p = PauliString::identity(num_qubits);
        for q in 0..num_qubits {
            p.set(q, Pauli::from_bits(self.xs.get(q, k), self.zs.get(q, k)));
        }
        p.set_negative(self.sign(k));
        p
    }

    /// Overwrite generator `k`.
    fn set_generator(&mut self, k: usize, p: &PauliString) {
        for q in 0..p.num_qubits() {
            let (x, z) = p.get(q).bits();
            self.xs.set(q, k, x);
            self.zs.set(q, k, z);
        }
        self.set_sign(k, p.is_negative());
    }

    /// Set every generator selected by `mask` to its product with `rhs`.
    ///
    /// The phases of all selected generators are tracked together, one [`PhaseCounter`] lane each.
    fn right_mul_masked(&mut self, mask: &[BitBlock], rhs: &PauliString) {
        let mut phases = vec![PhaseCounter::default(); mask.len()];
        for q in 0..rhs.num_qubits() {
            let (x, z) = rhs.get(q).bits();
            if !x && !z {
                continue;
            }
            let (x2s, z2s) = (broadcast(x), broadcast(z));
            let xs = self.xs.row_mut(q);
            let zs = self.zs.row_mut(q);
            for (i, &m) in mask.iter().enumerate() {
                if m == 0 {
                    continue;
                }
                let (x2, z2) = (x2s & m, z2s & m);
                phases[i].accumulate(xs[i], zs[i], x2, z2);
                xs[i] ^= x2;
                zs[i] ^= z2;
            }
        }

        let rhs_sign = broadcast(rhs.is_negative());
        for ((r, phase), &m) in self.signs.iter_mut().zip(&phases).zip(mask) {
            *r ^= (rhs_sign & m) ^ phase.negated();
        }
    }
}
