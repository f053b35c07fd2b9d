//! A Clifford circuit simulator based on the stabilizer tableau formalism.
//!
//! The state of `n` qubits is tracked as `n` destabilizer and `n` stabilizer generators,
//! so that every Clifford gate costs `O(n)` and every measurement at most `O(n^2)` bit operations.

mod bits;
pub mod circuit;
mod error;
pub mod gates;
pub mod pauli_string;
#[cfg(feature = "python")]
mod python;
mod simulator;
mod state_vector;
pub mod tableau;
mod transposed;

pub use circuit::{Circuit, Instruction};
pub use error::SimulationError;
pub use gates::{CollapseGate, Gate, SingleQubitGate, TwoQubitGate};
pub use pauli_string::{Pauli, PauliString, SparsePauliString};
#[cfg(feature = "python")]
pub use python::python_module;
pub use simulator::{TableauSimulator, DEFAULT_BIAS};
pub use state_vector::MAX_STATE_VECTOR_QUBITS;
pub use tableau::{Tableau, PARALLEL_MIN_QUBITS};
pub use transposed::TransposedTableau;
