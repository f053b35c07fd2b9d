use num_complex::Complex;

use crate::pauli_string::{Pauli, PauliString};
use crate::tableau::Tableau;

/// The largest number of qubits whose state vector can be exported.
pub const MAX_STATE_VECTOR_QUBITS: usize = 24;

impl Tableau {
    /// Compute the amplitudes of the stabilizer state, where qubit `q` is bit `q` of the basis index.
    ///
    /// The global phase is chosen so that the first non-zero amplitude found while collapsing
    /// every qubit towards |0⟩ is real and positive.
    ///
    /// # Panics
    /// If the tableau has more than [`MAX_STATE_VECTOR_QUBITS`] qubits.
    pub fn to_state_vector(&self) -> Vec<Complex<f64>> {
        let n = self.num_qubits();
        assert!(
            n <= MAX_STATE_VECTOR_QUBITS,
            "State vector of {n} qubits exceeds the limit of {MAX_STATE_VECTOR_QUBITS}"
        );

        // Find a basis state in the support of the state.
        let mut support = self.clone();
        let mut basis_index = 0;
        {
            let mut view = support.transposed();
            for q in 0..n {
                if view.collapse(q, || false).outcome {
                    basis_index |= 1 << q;
                }
            }
        }

        // Project it onto the +1 eigenspace of every stabilizer.
        let mut amplitudes = vec![Complex::ZERO; 1 << n];
        amplitudes[basis_index] = Complex::ONE;
        for k in 0..n {
            project(&mut amplitudes, &self.stabilizer(k));
        }

        let norm = amplitudes.iter().map(|a| a.norm_sqr()).sum::<f64>().sqrt();
        for a in amplitudes.iter_mut() {
            *a /= norm;
        }
        amplitudes
    }
}

/// Replace `amplitudes` with `(amplitudes + P amplitudes) / 2`.
fn project(amplitudes: &mut [Complex<f64>], p: &PauliString) {
    let mut x_mask = 0;
    let mut z_mask = 0;
    let mut ys = 0;
    for q in 0..p.num_qubits() {
        match p.get(q) {
            Pauli::I => {}
            Pauli::X => x_mask |= 1 << q,
            Pauli::Z => z_mask |= 1 << q,
            Pauli::Y => {
                x_mask |= 1 << q;
                z_mask |= 1 << q;
                ys += 1;
            }
        }
    }

    // Y = iXZ, so P = sign * i^ys * X^x_mask * Z^z_mask.
    let mut phase: Complex<f64> = match ys % 4 {
        0 => Complex::ONE,
        1 => Complex::I,
        2 => -Complex::ONE,
        _ => -Complex::I,
    };
    if p.is_negative() {
        phase = -phase;
    }

    let mut image = vec![Complex::ZERO; amplitudes.len()];
    for (index, &a) in amplitudes.iter().enumerate() {
        if a == Complex::ZERO {
            continue;
        }
        let flipped = (index & z_mask).count_ones() % 2 == 1;
        image[index ^ x_mask] += if flipped { -phase * a } else { phase * a };
    }
    for (a, b) in amplitudes.iter_mut().zip(image) {
        *a = (*a + b) * 0.5;
    }
}
