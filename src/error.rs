use std::{error::Error, fmt::Display};

#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// The name does not belong to any known gate.
    UnknownGate { name: String },
    /// A measurement or reset was given to an operation that only applies unitary gates.
    NotUnitary { name: String },
    /// A two-qubit gate was broadcast over a target list of odd length.
    OddTargetCount { gate: String, count: usize },
    /// A two-qubit gate was applied to the same qubit twice.
    RepeatedTarget { gate: String, qubit: usize },
    /// A measurement bias outside of `[0, 1]`.
    BiasOutOfRange { bias: f64 },
    /// A target in a circuit text that is not a qubit index.
    InvalidTarget { line: usize, token: String },
    /// An error in the instruction on a line of circuit text.
    InvalidLine {
        line: usize,
        error: Box<SimulationError>,
    },
    /// A Pauli string text containing something other than a sign and `I`, `_`, `X`, `Y`, `Z`.
    InvalidPauli { text: String },
}
impl Display for SimulationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimulationError::UnknownGate { name } => write!(f, "Unknown gate {name:?}"),
            SimulationError::NotUnitary { name } => {
                write!(f, "Gate {name} is not a unitary gate")
            }
            SimulationError::OddTargetCount { gate, count } => {
                write!(
                    f,
                    "Two-qubit gate {gate} needs an even number of targets, got {count}"
                )
            }
            SimulationError::RepeatedTarget { gate, qubit } => {
                write!(f, "Two-qubit gate {gate} targets qubit {qubit} twice")
            }
            SimulationError::BiasOutOfRange { bias } => {
                write!(f, "Measurement bias {bias} is outside of [0, 1]")
            }
            SimulationError::InvalidTarget { line, token } => {
                write!(f, "Invalid qubit target {token:?} on line {line}")
            }
            SimulationError::InvalidLine { line, error } => write!(f, "{error} on line {line}"),
            SimulationError::InvalidPauli { text } => write!(f, "Invalid Pauli string {text:?}"),
        }
    }
}
impl Error for SimulationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SimulationError::InvalidLine { error, .. } => Some(error.as_ref()),
            _ => None,
        }
    }
}
impl SimulationError {
    /// Attribute the error to a line of circuit text.
    pub(crate) fn on_line(self, line: usize) -> Self {
        SimulationError::InvalidLine {
            line,
            error: Box::new(self),
        }
    }
}
