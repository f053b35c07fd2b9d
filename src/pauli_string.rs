use std::fmt::{Debug, Display};
use std::str::FromStr;

use crate::bits::{get_bit, set_bit, BitBlock, BLOCK_SIZE};
use crate::error::SimulationError;

/// A single-qubit Pauli operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pauli {
    I,
    X,
    Y,
    Z,
}
impl Pauli {
    pub fn from_bits(x: bool, z: bool) -> Self {
        match (x, z) {
            (false, false) => Pauli::I,
            (true, false) => Pauli::X,
            (true, true) => Pauli::Y,
            (false, true) => Pauli::Z,
        }
    }

    /// The `(x, z)` bits of the operator.
    pub fn bits(self) -> (bool, bool) {
        match self {
            Pauli::I => (false, false),
            Pauli::X => (true, false),
            Pauli::Y => (true, true),
            Pauli::Z => (false, true),
        }
    }
}
impl Display for Pauli {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let c = match self {
            Pauli::I => 'I',
            Pauli::X => 'X',
            Pauli::Y => 'Y',
            Pauli::Z => 'Z',
        };
        write!(f, "{c}")
    }
}

/// Per-lane exponent, modulo 4, of the power of `i` picked up while multiplying Pauli operators.
///
/// Every bit position is an independent lane. The exponent of a lane is `low + 2 * high`.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct PhaseCounter {
    low: BitBlock,
    high: BitBlock,
}
impl PhaseCounter {
    /// Account for the product `(x1, z1) * (x2, z2)` in every lane.
    ///
    /// Commuting factors contribute nothing. Anticommuting factors contribute `i` or `-i`,
    /// which is a `+1` or `+3` on the lane's counter.
    pub fn accumulate(&mut self, x1: BitBlock, z1: BitBlock, x2: BitBlock, z2: BitBlock) {
        let x1z2 = x1 & z2;
        let anticommutes = (x2 & z1) ^ x1z2;
        self.high ^= (self.low ^ x1 ^ x2 ^ z1 ^ z2 ^ x1z2) & anticommutes;
        self.low ^= anticommutes;
    }

    /// Lanes whose exponent is 2 or 3, i.e. whose real part of the phase is negated.
    pub fn negated(&self) -> BitBlock {
        self.high
    }

    /// The sum of the exponents of all lanes, modulo 4.
    pub fn total(&self) -> u8 {
        ((self.low.count_ones() + 2 * self.high.count_ones()) % 4) as u8
    }
}

/// Multiply the Pauli string `lhs` by `rhs` from the right, ignoring signs.
///
/// Returns the exponent `e` such that the product picked up a factor of `i^e`.
pub(crate) fn right_mul_returning_log_i(
    lhs_xs: &mut [BitBlock],
    lhs_zs: &mut [BitBlock],
    rhs_xs: &[BitBlock],
    rhs_zs: &[BitBlock],
) -> u8 {
    let mut phase = PhaseCounter::default();
    for (((x1, z1), &x2), &z2) in lhs_xs
        .iter_mut()
        .zip(lhs_zs.iter_mut())
        .zip(rhs_xs)
        .zip(rhs_zs)
    {
        phase.accumulate(*x1, *z1, x2, z2);
        *x1 ^= x2;
        *z1 ^= z2;
    }
    phase.total()
}

/// Whether the two Pauli strings given by their blocks commute.
pub(crate) fn blocks_commute(
    xs1: &[BitBlock],
    zs1: &[BitBlock],
    xs2: &[BitBlock],
    zs2: &[BitBlock],
) -> bool {
    let mut parity = 0;
    for (((x1, z1), x2), z2) in xs1.iter().zip(zs1).zip(xs2).zip(zs2) {
        parity ^= ((x1 & z2) ^ (z1 & x2)).count_ones() & 1;
    }
    parity == 0
}

/// A dense, bit-packed Pauli string with a sign.
#[derive(Clone, PartialEq, Eq)]
pub struct PauliString {
    num_qubits: usize,
    /// Whether the string carries a factor of -1.
    negative: bool,
    xs: Vec<BitBlock>,
    zs: Vec<BitBlock>,
}
impl PauliString {
    /// The identity on `num_qubits` qubits.
    pub fn identity(num_qubits: usize) -> Self {
        let blocks = num_qubits.div_ceil(BLOCK_SIZE);
        PauliString {
            num_qubits,
            negative: false,
            xs: vec![0; blocks],
            zs: vec![0; blocks],
        }
    }

    pub fn from_paulis(negative: bool, paulis: impl IntoIterator<Item = Pauli>) -> Self {
        let paulis: Vec<Pauli> = paulis.into_iter().collect();
        let mut p = PauliString::identity(paulis.len());
        p.negative = negative;
        for (q, &pauli) in paulis.iter().enumerate() {
            p.set(q, pauli);
        }
        p
    }

    /// The single-qubit operator `pauli` acting on qubit `q` of `num_qubits`.
    pub fn single(num_qubits: usize, q: usize, pauli: Pauli, negative: bool) -> Self {
        let mut p = PauliString::identity(num_qubits);
        p.set(q, pauli);
        p.negative = negative;
        p
    }

    /// Copy the first `num_qubits` qubits out of a pair of block slices.
    pub(crate) fn from_blocks(
        num_qubits: usize,
        negative: bool,
        xs: &[BitBlock],
        zs: &[BitBlock],
    ) -> Self {
        let blocks = num_qubits.div_ceil(BLOCK_SIZE);
        PauliString {
            num_qubits,
            negative,
            xs: xs[..blocks].to_vec(),
            zs: zs[..blocks].to_vec(),
        }
    }

    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    pub fn set_negative(&mut self, negative: bool) {
        self.negative = negative;
    }

    pub fn get(&self, q: usize) -> Pauli {
        debug_assert!(q < self.num_qubits);
        Pauli::from_bits(get_bit(&self.xs, q), get_bit(&self.zs, q))
    }

    pub fn set(&mut self, q: usize, pauli: Pauli) {
        debug_assert!(q < self.num_qubits);
        let (x, z) = pauli.bits();
        set_bit(&mut self.xs, q, x);
        set_bit(&mut self.zs, q, z);
    }

    pub(crate) fn xs(&self) -> &[BitBlock] {
        &self.xs
    }

    pub(crate) fn zs(&self) -> &[BitBlock] {
        &self.zs
    }

    /// The number of non-identity tensor elements.
    pub fn weight(&self) -> usize {
        self.xs
            .iter()
            .zip(&self.zs)
            .map(|(x, z)| (x | z).count_ones() as usize)
            .sum()
    }

    pub fn commutes(&self, other: &PauliString) -> bool {
        blocks_commute(&self.xs, &self.zs, &other.xs, &other.zs)
    }

    /// Set `self` to `self * rhs`.
    ///
    /// Returns the exponent `e` of the `i^e` factor of the product, before it is folded into the sign.
    /// The sign can only absorb real factors, so an odd exponent (anticommuting operands) is dropped.
    pub fn right_mul(&mut self, rhs: &PauliString) -> u8 {
        self.right_mul_blocks(rhs.negative, &rhs.xs, &rhs.zs)
    }

    pub(crate) fn right_mul_blocks(
        &mut self,
        negative: bool,
        xs: &[BitBlock],
        zs: &[BitBlock],
    ) -> u8 {
        let log_i = right_mul_returning_log_i(&mut self.xs, &mut self.zs, xs, zs);
        self.negative ^= negative ^ (log_i & 2 != 0);
        log_i
    }

    pub fn to_sparse(&self) -> SparsePauliString {
        SparsePauliString {
            negative: self.negative,
            indexed_paulis: (0..self.num_qubits)
                .map(|q| (q, self.get(q)))
                .filter(|&(_, p)| p != Pauli::I)
                .collect(),
        }
    }
}
impl Display for PauliString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", if self.negative { '-' } else { '+' })?;
        for q in 0..self.num_qubits {
            match self.get(q) {
                Pauli::I => write!(f, "_")?,
                p => write!(f, "{p}")?,
            }
        }
        Ok(())
    }
}
impl Debug for PauliString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PauliString({self})")
    }
}
impl FromStr for PauliString {
    type Err = SimulationError;

    /// Parse strings such as `+XZ_Y` or `-IIZ`. The sign is optional.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SimulationError::InvalidPauli {
            text: s.to_string(),
        };
        let (negative, body) = match s.chars().next() {
            Some('-') => (true, &s[1..]),
            Some('+') => (false, &s[1..]),
            _ => (false, s),
        };
        let paulis: Result<Vec<Pauli>, SimulationError> = body
            .chars()
            .map(|c| match c {
                'I' | '_' => Ok(Pauli::I),
                'X' => Ok(Pauli::X),
                'Y' => Ok(Pauli::Y),
                'Z' => Ok(Pauli::Z),
                _ => Err(invalid()),
            })
            .collect();
        Ok(PauliString::from_paulis(negative, paulis?))
    }
}

/// A Pauli string listing only its non-identity tensor elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparsePauliString {
    /// Whether the string carries a factor of -1.
    pub negative: bool,
    /// The non-identity elements, ordered by qubit.
    pub indexed_paulis: Vec<(usize, Pauli)>,
}
impl SparsePauliString {
    pub fn is_identity(&self) -> bool {
        self.indexed_paulis.is_empty()
    }
}
impl Display for SparsePauliString {
    /// Written as e.g. `-X0*Z3`, or `+I` for the identity.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", if self.negative { '-' } else { '+' })?;
        if self.indexed_paulis.is_empty() {
            return write!(f, "I");
        }
        for (i, (q, p)) in self.indexed_paulis.iter().enumerate() {
            if i > 0 {
                write!(f, "*")?;
            }
            write!(f, "{p}{q}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> PauliString {
        s.parse().unwrap()
    }

    #[test]
    fn single_qubit_products() {
        // X * Z = -iY
        let mut a = p("X");
        assert_eq!(a.right_mul(&p("Z")), 3);
        assert_eq!(a.get(0), Pauli::Y);

        // Z * X = iY
        let mut a = p("Z");
        assert_eq!(a.right_mul(&p("X")), 1);

        // Y * X = -iZ
        let mut a = p("Y");
        assert_eq!(a.right_mul(&p("X")), 3);
        assert_eq!(a.get(0), Pauli::Z);

        // X * Y = iZ
        let mut a = p("X");
        assert_eq!(a.right_mul(&p("Y")), 1);
    }

    #[test]
    fn commuting_product_sign() {
        // (X ⊗ X) * (Z ⊗ Z) = (-iY) ⊗ (-iY) = -YY
        let mut a = p("+XX");
        let log_i = a.right_mul(&p("+ZZ"));
        assert_eq!(log_i, 2);
        assert_eq!(a, p("-YY"));

        // (Y ⊗ Z) * (Y ⊗ Z) = I
        let mut a = p("-YZ");
        a.right_mul(&p("-YZ"));
        assert_eq!(a, p("+__"));
    }

    #[test]
    fn phase_across_blocks() {
        // Qubits 0 and 64 share a bit position in different blocks.
        let mut lhs = PauliString::identity(65);
        lhs.set(0, Pauli::X);
        lhs.set(64, Pauli::X);
        let mut rhs = PauliString::identity(65);
        rhs.set(0, Pauli::Z);
        rhs.set(64, Pauli::Z);
        assert_eq!(lhs.right_mul(&rhs), 2);
        assert!(lhs.is_negative());
        assert_eq!(lhs.get(0), Pauli::Y);
        assert_eq!(lhs.get(64), Pauli::Y);
    }

    #[test]
    fn commutation() {
        assert!(p("XX").commutes(&p("ZZ")));
        assert!(!p("XI").commutes(&p("ZZ")));
        assert!(p("Y").commutes(&p("Y")));
        assert!(!p("Y").commutes(&p("Z")));
    }

    #[test]
    fn formatting() {
        let s = p("-X_ZY");
        assert_eq!(s.to_string(), "-X_ZY");
        assert_eq!(s.weight(), 3);
        assert_eq!(s.to_sparse().to_string(), "-X0*Z2*Y3");
        assert_eq!(p("+__").to_sparse().to_string(), "+I");
        assert!(p("+__").to_sparse().is_identity());
        assert!("XQ".parse::<PauliString>().is_err());
    }
}
