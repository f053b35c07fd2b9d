use std::{fmt::Display, str::FromStr};

use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::error::SimulationError;
use crate::gates::{CollapseGate, Gate, SingleQubitGate, TwoQubitGate};

/// A gate broadcast over an ordered list of targets.
///
/// Two-qubit gates take their targets in consecutive pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    gate: Gate,
    targets: Vec<usize>,
}
impl Instruction {
    pub fn new(gate: Gate, targets: Vec<usize>) -> Result<Self, SimulationError> {
        gate.validate_targets(&targets)?;
        Ok(Instruction { gate, targets })
    }

    pub fn gate(&self) -> Gate {
        self.gate
    }

    pub fn targets(&self) -> &[usize] {
        &self.targets
    }

    /// The number of outcomes the instruction reports when applied.
    pub fn num_measurements(&self) -> usize {
        match self.gate {
            Gate::Collapse(g) if g.produces_results() => self.targets.len(),
            _ => 0,
        }
    }

    /// Parse a single line of circuit text, `NAME t0 t1 ...`.
    ///
    /// Returns `None` for lines that are blank or only hold a `#` comment.
    pub(crate) fn parse_line(line: &str, line_number: usize) -> Result<Option<Self>, SimulationError> {
        let code = match line.find('#') {
            Some(i) => &line[..i],
            None => line,
        };
        let mut tokens = code.split_whitespace();
        let Some(name) = tokens.next() else {
            return Ok(None);
        };
        let gate = name
            .parse::<Gate>()
            .map_err(|e| e.on_line(line_number))?;
        let targets = tokens
            .map(|token| {
                token
                    .parse()
                    .map_err(|_| SimulationError::InvalidTarget {
                        line: line_number,
                        token: token.to_string(),
                    })
            })
            .collect::<Result<Vec<usize>, _>>()?;
        Instruction::new(gate, targets)
            .map(Some)
            .map_err(|e| e.on_line(line_number))
    }
}
impl Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.gate)?;
        for t in &self.targets {
            write!(f, " {t}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Circuit {
    /// The number of qubits in the circuit, at least one more than the largest target.
    num_qubits: usize,
    /// The number of outcomes the circuit reports.
    num_measurements: usize,
    /// The ordered list of instructions in the circuit.
    instructions: Vec<Instruction>,
}
impl Circuit {
    pub fn new(num_qubits: usize, instructions: impl IntoIterator<Item = Instruction>) -> Self {
        let mut circuit = Circuit {
            num_qubits,
            ..Default::default()
        };
        for instruction in instructions {
            circuit.push_instruction(instruction);
        }
        circuit
    }

    /// Append the gate called `name` broadcast over `targets`.
    pub fn push(&mut self, name: &str, targets: &[usize]) -> Result<(), SimulationError> {
        let instruction = Instruction::new(name.parse()?, targets.to_vec())?;
        self.push_instruction(instruction);
        Ok(())
    }

    pub fn push_instruction(&mut self, instruction: Instruction) {
        if let Some(&max) = instruction.targets.iter().max() {
            self.num_qubits = self.num_qubits.max(max + 1);
        }
        self.num_measurements += instruction.num_measurements();
        self.instructions.push(instruction);
    }

    /// The number of qubits in the circuit.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// The number of outcomes reported when the circuit is simulated.
    pub fn num_measurements(&self) -> usize {
        self.num_measurements
    }

    /// The instructions in the circuit, in the order that they are applied.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Create a random unitary circuit with the given number of `qubits` and `gates`, followed by measuring every qubit.
    pub fn random(qubits: usize, gates: usize, seed: u64) -> Self {
        assert!(qubits >= 2, "Random circuits need at least 2 qubits");
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut circuit = Circuit::new(qubits, []);
        for _ in 0..gates {
            let a = rng.random_range(0..qubits);
            let mut b = a;
            while b == a {
                b = rng.random_range(0..qubits);
            }
            let instruction = if rng.random_bool(0.5) {
                let g = SingleQubitGate::ALL[rng.random_range(0..SingleQubitGate::ALL.len())];
                Instruction {
                    gate: Gate::Single(g),
                    targets: vec![a],
                }
            } else {
                let g = TwoQubitGate::ALL[rng.random_range(0..TwoQubitGate::ALL.len())];
                Instruction {
                    gate: Gate::Two(g),
                    targets: vec![a, b],
                }
            };
            circuit.push_instruction(instruction);
        }
        circuit.push_instruction(Instruction {
            gate: Gate::Collapse(CollapseGate::M),
            targets: (0..qubits).collect(),
        });
        circuit
    }
}
impl FromStr for Circuit {
    type Err = SimulationError;

    /// Parse circuit text with one instruction per line. Blank lines and `#` comments are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut circuit = Circuit::default();
        for (i, line) in s.lines().enumerate() {
            if let Some(instruction) = Instruction::parse_line(line, i + 1)? {
                circuit.push_instruction(instruction);
            }
        }
        Ok(circuit)
    }
}
impl Display for Circuit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for instruction in &self.instructions {
            writeln!(f, "{instruction}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse() {
        let circuit: Circuit = "
            # Bell pair
            H 0
            CNOT 0 1  # entangle
            M 0 1
        "
        .parse()
        .unwrap();
        assert_eq!(circuit.num_qubits(), 2);
        assert_eq!(circuit.num_measurements(), 2);
        assert_eq!(
            circuit.instructions(),
            &[
                Instruction::new(Gate::Single(SingleQubitGate::H), vec![0]).unwrap(),
                Instruction::new(Gate::Two(TwoQubitGate::CX), vec![0, 1]).unwrap(),
                Instruction::new(Gate::Collapse(CollapseGate::M), vec![0, 1]).unwrap(),
            ]
        );
    }

    #[test]
    fn display_round_trip() {
        let text = "H 0\nCX 0 3\nMR 3\nR 1\n";
        let circuit: Circuit = text.parse().unwrap();
        assert_eq!(circuit.to_string(), text);
        assert_eq!(circuit.num_qubits(), 4);
        assert_eq!(circuit.num_measurements(), 1);
    }

    #[test]
    fn parse_errors() {
        assert_eq!(
            "H 0\nFOO 1".parse::<Circuit>(),
            Err(SimulationError::UnknownGate {
                name: "FOO".to_string()
            }
            .on_line(2))
        );
        assert_eq!(
            "H 0\n\nM 1 x".parse::<Circuit>(),
            Err(SimulationError::InvalidTarget {
                line: 3,
                token: "x".to_string()
            })
        );
        assert_eq!(
            "CZ 0 1 2".parse::<Circuit>(),
            Err(SimulationError::OddTargetCount {
                gate: "CZ".to_string(),
                count: 3
            }
            .on_line(1))
        );
        assert_eq!(
            "H 1\n# pair\nSWAP 4 4".parse::<Circuit>(),
            Err(SimulationError::RepeatedTarget {
                gate: "SWAP".to_string(),
                qubit: 4
            }
            .on_line(3))
        );

        let err = "X 0\nCX 0 1 2".parse::<Circuit>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Two-qubit gate CX needs an even number of targets, got 3 on line 2"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn push() {
        let mut circuit = Circuit::new(1, []);
        circuit.push("S", &[0]).unwrap();
        circuit.push("ISWAP", &[0, 5]).unwrap();
        circuit.push("M", &[5]).unwrap();
        assert_eq!(circuit.num_qubits(), 6);
        assert_eq!(circuit.num_measurements(), 1);
        assert!(circuit.push("CX", &[2]).is_err());
        assert_eq!(circuit.instructions().len(), 3);
    }

    #[test]
    fn random() {
        let circuit = Circuit::random(5, 40, 1);
        assert_eq!(circuit.num_qubits(), 5);
        assert_eq!(circuit.instructions().len(), 41);
        assert_eq!(circuit.num_measurements(), 5);
        assert_eq!(circuit, Circuit::random(5, 40, 1));
    }
}
