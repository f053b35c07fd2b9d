use num_complex::Complex;
use pyo3::{exceptions::PyValueError, prelude::*};

use crate::circuit::Circuit;
use crate::error::SimulationError;
use crate::simulator::{TableauSimulator, DEFAULT_BIAS};

impl From<SimulationError> for PyErr {
    fn from(value: SimulationError) -> Self {
        PyValueError::new_err(value.to_string())
    }
}

/// A Clifford circuit simulator. All qubits start in |0⟩ and more are added as they are targeted.
#[pyclass(name = "TableauSimulator")]
struct PyTableauSimulator {
    inner: TableauSimulator,
}
#[pymethods]
impl PyTableauSimulator {
    #[new]
    #[pyo3(signature = (num_qubits=0, seed=None))]
    fn py_new(num_qubits: usize, seed: Option<u64>) -> Self {
        let inner = match seed {
            Some(seed) => TableauSimulator::new(num_qubits, seed),
            None => TableauSimulator::from_os_rng(num_qubits),
        };
        PyTableauSimulator { inner }
    }

    #[getter]
    fn num_qubits(&self) -> usize {
        self.inner.num_qubits()
    }

    /// Measure a qubit in the Z basis. `bias` is the probability of `True` for a random outcome.
    #[pyo3(signature = (q, bias=DEFAULT_BIAS))]
    fn measure(&mut self, q: usize, bias: f64) -> PyResult<bool> {
        Ok(self.inner.measure_with_bias(q, bias)?)
    }

    #[pyo3(signature = (targets, bias=DEFAULT_BIAS))]
    fn measure_many(&mut self, targets: Vec<usize>, bias: f64) -> PyResult<Vec<bool>> {
        Ok(self.inner.measure_many_with_bias(&targets, bias)?)
    }

    fn reset(&mut self, q: usize) {
        self.inner.reset(q);
    }

    fn reset_many(&mut self, targets: Vec<usize>) {
        self.inner.reset_many(&targets);
    }

    fn is_deterministic(&self, q: usize) -> bool {
        self.inner.is_deterministic(q)
    }

    /// Apply the gate called `name` to the targets, returning the outcomes of any measurements.
    fn broadcast_op(&mut self, name: &str, targets: Vec<usize>) -> PyResult<Vec<bool>> {
        Ok(self.inner.broadcast_op(name, &targets)?)
    }

    /// Measure the targets, returning the observable each measurement randomized, e.g. `+X0*X1`.
    fn inspected_collapse(&mut self, targets: Vec<usize>) -> Vec<String> {
        self.inner
            .inspected_collapse(&targets)
            .iter()
            .map(|p| p.to_string())
            .collect()
    }

    /// The amplitudes of the current state, with qubit `q` as bit `q` of the index.
    fn state_vector(&self) -> PyResult<Vec<Complex<f64>>> {
        if self.inner.num_qubits() > crate::MAX_STATE_VECTOR_QUBITS {
            return Err(PyValueError::new_err(format!(
                "State vector of {} qubits exceeds the limit of {}",
                self.inner.num_qubits(),
                crate::MAX_STATE_VECTOR_QUBITS
            )));
        }
        Ok(self.inner.to_state_vector())
    }

    fn __repr__(&self) -> String {
        format!("TableauSimulator({})", self.inner.num_qubits())
    }
}

/// Simulate circuit text, returning one outcome per measured target.
#[pyfunction]
#[pyo3(name = "simulate", signature = (circuit, seed=None))]
fn py_simulate(circuit: &str, seed: Option<u64>) -> PyResult<Vec<bool>> {
    let circuit: Circuit = circuit.parse()?;
    Ok(match seed {
        Some(seed) => TableauSimulator::simulate_with_seed(&circuit, seed),
        None => TableauSimulator::simulate(&circuit),
    })
}

#[pymodule]
#[pyo3(name = "tableau_sim")]
pub fn python_module(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyTableauSimulator>()?;
    m.add_function(wrap_pyfunction!(py_simulate, m)?)?;
    Ok(())
}
