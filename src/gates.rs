//! The gate set, partitioned by arity, and the conjugation rules of the unitary gates.
//!
//! Every rule works on lanes: bit `k` of each block describes row `k` of some group of tableau rows,
//! so one call updates up to `BLOCK_SIZE` rows at once.

use std::fmt::Display;
use std::str::FromStr;

use crate::bits::BitBlock;
use crate::error::SimulationError;

/// The x and z components of one qubit column, one bit per row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Lanes {
    pub x: BitBlock,
    pub z: BitBlock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SingleQubitGate {
    I,
    X,
    Y,
    Z,
    /// Hadamard, exchanging X and Z.
    H,
    /// Exchanges Y and Z.
    HYZ,
    /// Exchanges X and Y.
    HXY,
    SqrtX,
    SqrtXDag,
    SqrtY,
    SqrtYDag,
    /// The S gate.
    SqrtZ,
    /// The inverse of the S gate.
    SqrtZDag,
}
impl SingleQubitGate {
    pub const ALL: [SingleQubitGate; 13] = [
        SingleQubitGate::I,
        SingleQubitGate::X,
        SingleQubitGate::Y,
        SingleQubitGate::Z,
        SingleQubitGate::H,
        SingleQubitGate::HYZ,
        SingleQubitGate::HXY,
        SingleQubitGate::SqrtX,
        SingleQubitGate::SqrtXDag,
        SingleQubitGate::SqrtY,
        SingleQubitGate::SqrtYDag,
        SingleQubitGate::SqrtZ,
        SingleQubitGate::SqrtZDag,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SingleQubitGate::I => "I",
            SingleQubitGate::X => "X",
            SingleQubitGate::Y => "Y",
            SingleQubitGate::Z => "Z",
            SingleQubitGate::H => "H",
            SingleQubitGate::HYZ => "H_YZ",
            SingleQubitGate::HXY => "H_XY",
            SingleQubitGate::SqrtX => "SQRT_X",
            SingleQubitGate::SqrtXDag => "SQRT_X_DAG",
            SingleQubitGate::SqrtY => "SQRT_Y",
            SingleQubitGate::SqrtYDag => "SQRT_Y_DAG",
            SingleQubitGate::SqrtZ => "SQRT_Z",
            SingleQubitGate::SqrtZDag => "SQRT_Z_DAG",
        }
    }

    pub fn inverse(self) -> Self {
        match self {
            SingleQubitGate::SqrtX => SingleQubitGate::SqrtXDag,
            SingleQubitGate::SqrtXDag => SingleQubitGate::SqrtX,
            SingleQubitGate::SqrtY => SingleQubitGate::SqrtYDag,
            SingleQubitGate::SqrtYDag => SingleQubitGate::SqrtY,
            SingleQubitGate::SqrtZ => SingleQubitGate::SqrtZDag,
            SingleQubitGate::SqrtZDag => SingleQubitGate::SqrtZ,
            g => g,
        }
    }

    /// Conjugate the Pauli lanes `a` with signs `r` by the gate, `P -> U P U†`.
    pub(crate) fn conjugate(self, a: &mut Lanes, r: &mut BitBlock) {
        let Lanes { x, z } = *a;
        match self {
            SingleQubitGate::I => {}
            SingleQubitGate::X => *r ^= z,
            SingleQubitGate::Y => *r ^= x ^ z,
            SingleQubitGate::Z => *r ^= x,
            SingleQubitGate::H => {
                *r ^= x & z;
                *a = Lanes { x: z, z: x };
            }
            SingleQubitGate::HYZ => {
                *r ^= x & !z;
                a.x = x ^ z;
            }
            SingleQubitGate::HXY => {
                *r ^= !x & z;
                a.z = x ^ z;
            }
            SingleQubitGate::SqrtX => {
                *r ^= !x & z;
                a.x = x ^ z;
            }
            SingleQubitGate::SqrtXDag => {
                *r ^= x & z;
                a.x = x ^ z;
            }
            SingleQubitGate::SqrtY => {
                *r ^= x & !z;
                *a = Lanes { x: z, z: x };
            }
            SingleQubitGate::SqrtYDag => {
                *r ^= !x & z;
                *a = Lanes { x: z, z: x };
            }
            SingleQubitGate::SqrtZ => {
                *r ^= x & z;
                a.z = x ^ z;
            }
            SingleQubitGate::SqrtZDag => {
                *r ^= x & !z;
                a.z = x ^ z;
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TwoQubitGate {
    CX,
    CY,
    CZ,
    XCX,
    XCY,
    XCZ,
    YCX,
    YCY,
    YCZ,
    Swap,
    ISwap,
    ISwapDag,
}
impl TwoQubitGate {
    pub const ALL: [TwoQubitGate; 12] = [
        TwoQubitGate::CX,
        TwoQubitGate::CY,
        TwoQubitGate::CZ,
        TwoQubitGate::XCX,
        TwoQubitGate::XCY,
        TwoQubitGate::XCZ,
        TwoQubitGate::YCX,
        TwoQubitGate::YCY,
        TwoQubitGate::YCZ,
        TwoQubitGate::Swap,
        TwoQubitGate::ISwap,
        TwoQubitGate::ISwapDag,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TwoQubitGate::CX => "CX",
            TwoQubitGate::CY => "CY",
            TwoQubitGate::CZ => "CZ",
            TwoQubitGate::XCX => "XCX",
            TwoQubitGate::XCY => "XCY",
            TwoQubitGate::XCZ => "XCZ",
            TwoQubitGate::YCX => "YCX",
            TwoQubitGate::YCY => "YCY",
            TwoQubitGate::YCZ => "YCZ",
            TwoQubitGate::Swap => "SWAP",
            TwoQubitGate::ISwap => "ISWAP",
            TwoQubitGate::ISwapDag => "ISWAP_DAG",
        }
    }

    pub fn inverse(self) -> Self {
        match self {
            TwoQubitGate::ISwap => TwoQubitGate::ISwapDag,
            TwoQubitGate::ISwapDag => TwoQubitGate::ISwap,
            g => g,
        }
    }

    /// Conjugate the Pauli lanes `a` (first target) and `b` (second target) with signs `r` by the gate.
    ///
    /// The controlled variants are reduced to `CX` by conjugating the control and target
    /// with the single-qubit gate that rotates the relevant basis onto Z (or X for the target).
    pub(crate) fn conjugate(self, a: &mut Lanes, b: &mut Lanes, r: &mut BitBlock) {
        use SingleQubitGate as S;
        match self {
            TwoQubitGate::CX => cx(a, b, r),
            TwoQubitGate::CY => cy(a, b, r),
            TwoQubitGate::CZ => cz(a, b, r),
            TwoQubitGate::XCX => {
                S::H.conjugate(a, r);
                cx(a, b, r);
                S::H.conjugate(a, r);
            }
            TwoQubitGate::XCY => {
                S::H.conjugate(a, r);
                cy(a, b, r);
                S::H.conjugate(a, r);
            }
            TwoQubitGate::XCZ => cx(b, a, r),
            TwoQubitGate::YCX => {
                S::HYZ.conjugate(a, r);
                cx(a, b, r);
                S::HYZ.conjugate(a, r);
            }
            TwoQubitGate::YCY => {
                S::HYZ.conjugate(a, r);
                cy(a, b, r);
                S::HYZ.conjugate(a, r);
            }
            TwoQubitGate::YCZ => cy(b, a, r),
            TwoQubitGate::Swap => std::mem::swap(a, b),
            // ISWAP = SWAP · CZ · (S ⊗ S), the rightmost factor is conjugated first.
            TwoQubitGate::ISwap => {
                S::SqrtZ.conjugate(a, r);
                S::SqrtZ.conjugate(b, r);
                cz(a, b, r);
                std::mem::swap(a, b);
            }
            TwoQubitGate::ISwapDag => {
                std::mem::swap(a, b);
                cz(a, b, r);
                S::SqrtZDag.conjugate(a, r);
                S::SqrtZDag.conjugate(b, r);
            }
        }
    }
}

fn cx(c: &mut Lanes, t: &mut Lanes, r: &mut BitBlock) {
    *r ^= c.x & t.z & !(t.x ^ c.z);
    c.z ^= t.z;
    t.x ^= c.x;
}

fn cz(a: &mut Lanes, b: &mut Lanes, r: &mut BitBlock) {
    *r ^= a.x & b.x & (a.z ^ b.z);
    a.z ^= b.x;
    b.z ^= a.x;
}

// CY = S_t · CX · S_t†
fn cy(c: &mut Lanes, t: &mut Lanes, r: &mut BitBlock) {
    SingleQubitGate::SqrtZDag.conjugate(t, r);
    cx(c, t, r);
    SingleQubitGate::SqrtZ.conjugate(t, r);
}

/// Non-unitary operations that collapse the state, broadcast over any number of targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollapseGate {
    /// Z-basis measurement.
    M,
    /// Reset to |0⟩.
    R,
    /// Z-basis measurement followed by a reset to |0⟩.
    MR,
}
impl CollapseGate {
    pub fn name(self) -> &'static str {
        match self {
            CollapseGate::M => "M",
            CollapseGate::R => "R",
            CollapseGate::MR => "MR",
        }
    }

    /// Whether the operation reports one outcome per target.
    pub fn produces_results(self) -> bool {
        matches!(self, CollapseGate::M | CollapseGate::MR)
    }
}

/// Any operation the simulator can apply, tagged by arity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gate {
    Single(SingleQubitGate),
    Two(TwoQubitGate),
    Collapse(CollapseGate),
}
impl Gate {
    pub fn name(self) -> &'static str {
        match self {
            Gate::Single(g) => g.name(),
            Gate::Two(g) => g.name(),
            Gate::Collapse(g) => g.name(),
        }
    }

    /// Check that `targets` is a valid target list for this gate.
    ///
    /// Two-qubit gates take their targets in pairs, and a pair may not name the same qubit twice.
    pub fn validate_targets(self, targets: &[usize]) -> Result<(), SimulationError> {
        if let Gate::Two(g) = self {
            if targets.len() % 2 != 0 {
                return Err(SimulationError::OddTargetCount {
                    gate: g.name().to_string(),
                    count: targets.len(),
                });
            }
            for pair in targets.chunks_exact(2) {
                if pair[0] == pair[1] {
                    return Err(SimulationError::RepeatedTarget {
                        gate: g.name().to_string(),
                        qubit: pair[0],
                    });
                }
            }
        }
        Ok(())
    }
}
impl FromStr for Gate {
    type Err = SimulationError;

    /// Resolve a case-sensitive gate name, including the usual aliases.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        use CollapseGate as C;
        use SingleQubitGate as S;
        use TwoQubitGate as T;
        Ok(match name {
            "I" => Gate::Single(S::I),
            "X" => Gate::Single(S::X),
            "Y" => Gate::Single(S::Y),
            "Z" => Gate::Single(S::Z),
            "H" | "H_XZ" => Gate::Single(S::H),
            "H_YZ" => Gate::Single(S::HYZ),
            "H_XY" => Gate::Single(S::HXY),
            "SQRT_X" => Gate::Single(S::SqrtX),
            "SQRT_X_DAG" => Gate::Single(S::SqrtXDag),
            "SQRT_Y" => Gate::Single(S::SqrtY),
            "SQRT_Y_DAG" => Gate::Single(S::SqrtYDag),
            "SQRT_Z" | "S" => Gate::Single(S::SqrtZ),
            "SQRT_Z_DAG" | "S_DAG" => Gate::Single(S::SqrtZDag),

            "CX" | "CNOT" | "ZCX" => Gate::Two(T::CX),
            "CY" | "ZCY" => Gate::Two(T::CY),
            "CZ" | "ZCZ" => Gate::Two(T::CZ),
            "XCX" => Gate::Two(T::XCX),
            "XCY" => Gate::Two(T::XCY),
            "XCZ" => Gate::Two(T::XCZ),
            "YCX" => Gate::Two(T::YCX),
            "YCY" => Gate::Two(T::YCY),
            "YCZ" => Gate::Two(T::YCZ),
            "SWAP" => Gate::Two(T::Swap),
            "ISWAP" => Gate::Two(T::ISwap),
            "ISWAP_DAG" => Gate::Two(T::ISwapDag),

            "M" => Gate::Collapse(C::M),
            "R" => Gate::Collapse(C::R),
            "MR" => Gate::Collapse(C::MR),

            _ => {
                return Err(SimulationError::UnknownGate {
                    name: name.to_string(),
                })
            }
        })
    }
}
impl Display for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Conjugate a single-qubit Pauli given as `(x, z, negative)`.
    fn conjugate_single(gate: SingleQubitGate, p: (bool, bool, bool)) -> (bool, bool, bool) {
        let mut lanes = Lanes {
            x: p.0 as BitBlock,
            z: p.1 as BitBlock,
        };
        let mut r = p.2 as BitBlock;
        gate.conjugate(&mut lanes, &mut r);
        (lanes.x != 0, lanes.z != 0, r != 0)
    }

    const X: (bool, bool, bool) = (true, false, false);
    const Y: (bool, bool, bool) = (true, true, false);
    const Z: (bool, bool, bool) = (false, true, false);
    const MINUS_X: (bool, bool, bool) = (true, false, true);
    const MINUS_Y: (bool, bool, bool) = (true, true, true);
    const MINUS_Z: (bool, bool, bool) = (false, true, true);

    #[test]
    fn single_qubit_tables() {
        use SingleQubitGate as G;
        let cases = [
            (G::H, [Z, MINUS_Y, X]),
            (G::HYZ, [MINUS_X, Z, Y]),
            (G::HXY, [Y, X, MINUS_Z]),
            (G::SqrtX, [X, Z, MINUS_Y]),
            (G::SqrtXDag, [X, MINUS_Z, Y]),
            (G::SqrtY, [MINUS_Z, Y, X]),
            (G::SqrtYDag, [Z, Y, MINUS_X]),
            (G::SqrtZ, [Y, MINUS_X, Z]),
            (G::SqrtZDag, [MINUS_Y, X, Z]),
            (G::X, [X, MINUS_Y, MINUS_Z]),
            (G::Y, [MINUS_X, Y, MINUS_Z]),
            (G::Z, [MINUS_X, MINUS_Y, Z]),
        ];
        for (gate, [x, y, z]) in cases {
            assert_eq!(conjugate_single(gate, X), x, "{} X", gate.name());
            assert_eq!(conjugate_single(gate, Y), y, "{} Y", gate.name());
            assert_eq!(conjugate_single(gate, Z), z, "{} Z", gate.name());
        }
    }

    #[test]
    fn identity_lanes_are_untouched() {
        for gate in SingleQubitGate::ALL {
            assert_eq!(conjugate_single(gate, (false, false, false)), (false, false, false));
        }
        for gate in TwoQubitGate::ALL {
            let mut a = Lanes::default();
            let mut b = Lanes::default();
            let mut r = 0;
            gate.conjugate(&mut a, &mut b, &mut r);
            assert_eq!((a, b, r), (Lanes::default(), Lanes::default(), 0), "{}", gate.name());
        }
    }

    #[test]
    fn iswap_maps_x_to_zy() {
        let mut a = Lanes { x: 1, z: 0 };
        let mut b = Lanes::default();
        let mut r = 0;
        TwoQubitGate::ISwap.conjugate(&mut a, &mut b, &mut r);
        assert_eq!(a, Lanes { x: 0, z: 1 });
        assert_eq!(b, Lanes { x: 1, z: 1 });
        assert_eq!(r, 0);
    }

    #[test]
    fn cz_maps_yx_to_minus_xy() {
        let mut a = Lanes { x: 1, z: 1 };
        let mut b = Lanes { x: 1, z: 0 };
        let mut r = 0;
        TwoQubitGate::CZ.conjugate(&mut a, &mut b, &mut r);
        assert_eq!(a, Lanes { x: 1, z: 0 });
        assert_eq!(b, Lanes { x: 1, z: 1 });
        assert_eq!(r, 1);
    }

    #[test]
    fn names_round_trip() {
        for gate in SingleQubitGate::ALL {
            assert_eq!(gate.name().parse::<Gate>(), Ok(Gate::Single(gate)));
        }
        for gate in TwoQubitGate::ALL {
            assert_eq!(gate.name().parse::<Gate>(), Ok(Gate::Two(gate)));
        }
        assert_eq!("CNOT".parse::<Gate>(), Ok(Gate::Two(TwoQubitGate::CX)));
        assert_eq!("S_DAG".parse::<Gate>(), Ok(Gate::Single(SingleQubitGate::SqrtZDag)));
        assert_eq!(
            "h".parse::<Gate>(),
            Err(SimulationError::UnknownGate {
                name: "h".to_string()
            })
        );
    }

    #[test]
    fn target_validation() {
        let cx = Gate::Two(TwoQubitGate::CX);
        assert_eq!(cx.validate_targets(&[0, 1, 2, 3]), Ok(()));
        assert_eq!(
            cx.validate_targets(&[0, 1, 2]),
            Err(SimulationError::OddTargetCount {
                gate: "CX".to_string(),
                count: 3
            })
        );
        assert_eq!(
            cx.validate_targets(&[0, 1, 2, 2]),
            Err(SimulationError::RepeatedTarget {
                gate: "CX".to_string(),
                qubit: 2
            })
        );
        assert_eq!(Gate::Single(SingleQubitGate::H).validate_targets(&[0, 0]), Ok(()));
    }
}
