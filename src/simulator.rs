use std::io::{self, BufRead, Write};

use log::{debug, trace};
use num_complex::Complex;
use rand::{rngs::SmallRng, Rng, SeedableRng};

use crate::circuit::{Circuit, Instruction};
use crate::error::SimulationError;
use crate::gates::{CollapseGate, Gate, SingleQubitGate, TwoQubitGate};
use crate::pauli_string::SparsePauliString;
use crate::tableau::Tableau;

/// The probability of a random measurement reporting `true` unless another bias is given.
pub const DEFAULT_BIAS: f64 = 0.5;

/// Unitary broadcasts with at least this many gate applications per qubit in the tableau,
/// divided by this factor, are applied under a single transposed view.
const TRANSPOSE_RATIO: usize = 32;

/// A Clifford circuit simulator tracking a stabilizer tableau and the randomness of its measurements.
///
/// All qubits start in |0⟩. Any gate or measurement targeting a qubit beyond the current size
/// grows the state with fresh |0⟩ qubits.
#[derive(Clone)]
pub struct TableauSimulator {
    tableau: Tableau,
    rng: SmallRng,
}
impl TableauSimulator {
    /// Create a simulator with `num_qubits` qubits whose random outcomes are reproducible from `seed`.
    pub fn new(num_qubits: usize, seed: u64) -> Self {
        debug!("Creating simulator with {num_qubits} qubits and seed {seed}");
        TableauSimulator {
            tableau: Tableau::identity(num_qubits),
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Create a simulator with `num_qubits` qubits seeded from the operating system.
    pub fn from_os_rng(num_qubits: usize) -> Self {
        debug!("Creating simulator with {num_qubits} qubits");
        TableauSimulator {
            tableau: Tableau::identity(num_qubits),
            rng: SmallRng::from_os_rng(),
        }
    }

    pub fn tableau(&self) -> &Tableau {
        &self.tableau
    }

    pub fn num_qubits(&self) -> usize {
        self.tableau.num_qubits()
    }

    pub fn ensure_large_enough_for_qubit(&mut self, q: usize) {
        self.tableau.ensure_large_enough_for_qubit(q);
    }

    /// Whether measuring qubit `q` in the Z basis would have a fixed outcome.
    pub fn is_deterministic(&self, q: usize) -> bool {
        self.tableau.is_deterministic(q)
    }

    /// Measure qubit `q` in the Z basis. `true` means the -1 eigenstate |1⟩.
    pub fn measure(&mut self, q: usize) -> bool {
        let rng = &mut self.rng;
        self.tableau
            .collapse(q, || rng.random_bool(DEFAULT_BIAS))
            .outcome
    }

    /// Measure qubit `q` in the Z basis, reporting `true` with probability `bias` if the outcome is random.
    pub fn measure_with_bias(&mut self, q: usize, bias: f64) -> Result<bool, SimulationError> {
        check_bias(bias)?;
        let rng = &mut self.rng;
        Ok(self.tableau.collapse(q, || rng.random_bool(bias)).outcome)
    }

    /// Reset qubit `q` to |0⟩.
    pub fn reset(&mut self, q: usize) {
        if self.tableau.collapse(q, || false).outcome {
            self.tableau.apply_single(SingleQubitGate::X, q);
        }
    }

    /// Measure every target in order under a single transposed view.
    pub fn measure_many(&mut self, targets: &[usize]) -> Vec<bool> {
        self.collapse_many(targets, DEFAULT_BIAS)
    }

    pub fn measure_many_with_bias(
        &mut self,
        targets: &[usize],
        bias: f64,
    ) -> Result<Vec<bool>, SimulationError> {
        check_bias(bias)?;
        Ok(self.collapse_many(targets, bias))
    }

    fn collapse_many(&mut self, targets: &[usize], bias: f64) -> Vec<bool> {
        let Some(&max) = targets.iter().max() else {
            return Vec::new();
        };
        self.tableau.ensure_large_enough_for_qubit(max);
        let rng = &mut self.rng;
        let mut view = self.tableau.transposed();
        targets
            .iter()
            .map(|&q| view.collapse(q, || rng.random_bool(bias)).outcome)
            .collect()
    }

    /// Reset every target to |0⟩ under a single transposed view.
    pub fn reset_many(&mut self, targets: &[usize]) {
        let Some(&max) = targets.iter().max() else {
            return;
        };
        self.tableau.ensure_large_enough_for_qubit(max);
        let mut view = self.tableau.transposed();
        for &q in targets {
            if view.collapse(q, || false).outcome {
                view.apply_single(SingleQubitGate::X, q);
            }
        }
    }

    /// Measure every target and report which observable each measurement randomized.
    ///
    /// For a random measurement this is the stabilizer that anticommuted with `Z_q` and was
    /// replaced by `±Z_q`. For a deterministic one it is the identity.
    pub fn inspected_collapse(&mut self, targets: &[usize]) -> Vec<SparsePauliString> {
        let Some(&max) = targets.iter().max() else {
            return Vec::new();
        };
        self.tableau.ensure_large_enough_for_qubit(max);
        let rng = &mut self.rng;
        let mut view = self.tableau.transposed();
        targets
            .iter()
            .map(|&q| {
                view.collapse(q, || rng.random_bool(DEFAULT_BIAS))
                    .pivot
                    .map(|p| p.to_sparse())
                    .unwrap_or_default()
            })
            .collect()
    }

    pub fn apply_single(&mut self, gate: SingleQubitGate, q: usize) {
        self.tableau.apply_single(gate, q);
    }

    /// # Panics
    /// If `a == b`.
    pub fn apply_two(&mut self, gate: TwoQubitGate, a: usize, b: usize) {
        self.tableau.apply_two(gate, a, b);
    }

    pub fn h(&mut self, q: usize) {
        self.apply_single(SingleQubitGate::H, q);
    }
    pub fn h_yz(&mut self, q: usize) {
        self.apply_single(SingleQubitGate::HYZ, q);
    }
    pub fn h_xy(&mut self, q: usize) {
        self.apply_single(SingleQubitGate::HXY, q);
    }
    pub fn sqrt_x(&mut self, q: usize) {
        self.apply_single(SingleQubitGate::SqrtX, q);
    }
    pub fn sqrt_x_dag(&mut self, q: usize) {
        self.apply_single(SingleQubitGate::SqrtXDag, q);
    }
    pub fn sqrt_y(&mut self, q: usize) {
        self.apply_single(SingleQubitGate::SqrtY, q);
    }
    pub fn sqrt_y_dag(&mut self, q: usize) {
        self.apply_single(SingleQubitGate::SqrtYDag, q);
    }
    pub fn sqrt_z(&mut self, q: usize) {
        self.apply_single(SingleQubitGate::SqrtZ, q);
    }
    pub fn sqrt_z_dag(&mut self, q: usize) {
        self.apply_single(SingleQubitGate::SqrtZDag, q);
    }
    pub fn x(&mut self, q: usize) {
        self.apply_single(SingleQubitGate::X, q);
    }
    pub fn y(&mut self, q: usize) {
        self.apply_single(SingleQubitGate::Y, q);
    }
    pub fn z(&mut self, q: usize) {
        self.apply_single(SingleQubitGate::Z, q);
    }

    pub fn cx(&mut self, control: usize, target: usize) {
        self.apply_two(TwoQubitGate::CX, control, target);
    }
    pub fn cy(&mut self, control: usize, target: usize) {
        self.apply_two(TwoQubitGate::CY, control, target);
    }
    pub fn cz(&mut self, a: usize, b: usize) {
        self.apply_two(TwoQubitGate::CZ, a, b);
    }
    pub fn xcx(&mut self, a: usize, b: usize) {
        self.apply_two(TwoQubitGate::XCX, a, b);
    }
    pub fn xcy(&mut self, a: usize, b: usize) {
        self.apply_two(TwoQubitGate::XCY, a, b);
    }
    pub fn xcz(&mut self, a: usize, b: usize) {
        self.apply_two(TwoQubitGate::XCZ, a, b);
    }
    pub fn ycx(&mut self, a: usize, b: usize) {
        self.apply_two(TwoQubitGate::YCX, a, b);
    }
    pub fn ycy(&mut self, a: usize, b: usize) {
        self.apply_two(TwoQubitGate::YCY, a, b);
    }
    pub fn ycz(&mut self, a: usize, b: usize) {
        self.apply_two(TwoQubitGate::YCZ, a, b);
    }
    pub fn swap(&mut self, a: usize, b: usize) {
        self.apply_two(TwoQubitGate::Swap, a, b);
    }
    pub fn iswap(&mut self, a: usize, b: usize) {
        self.apply_two(TwoQubitGate::ISwap, a, b);
    }
    pub fn iswap_dag(&mut self, a: usize, b: usize) {
        self.apply_two(TwoQubitGate::ISwapDag, a, b);
    }

    /// Apply the unitary gate called `name` to each target, or each pair of targets, in turn.
    pub fn func_op(&mut self, name: &str, targets: &[usize]) -> Result<(), SimulationError> {
        let gate = unitary(name, targets)?;
        self.apply_row_major(gate, targets);
        Ok(())
    }

    /// Apply the unitary gate called `name` to all targets under a single transposed view.
    pub fn tableau_op(&mut self, name: &str, targets: &[usize]) -> Result<(), SimulationError> {
        let gate = unitary(name, targets)?;
        self.apply_transposed(gate, targets);
        Ok(())
    }

    /// Apply the gate called `name` to all targets, returning the outcomes of any measurements.
    pub fn broadcast_op(
        &mut self,
        name: &str,
        targets: &[usize],
    ) -> Result<Vec<bool>, SimulationError> {
        let gate: Gate = name.parse()?;
        gate.validate_targets(targets)?;
        Ok(self.apply_validated(gate, targets))
    }

    /// Apply a parsed instruction, returning the outcomes of any measurements.
    pub fn apply_instruction(&mut self, instruction: &Instruction) -> Vec<bool> {
        self.apply_validated(instruction.gate(), instruction.targets())
    }

    fn apply_validated(&mut self, gate: Gate, targets: &[usize]) -> Vec<bool> {
        trace!("Applying {gate} to {targets:?}");
        match gate {
            Gate::Collapse(CollapseGate::M) => self.measure_many(targets),
            Gate::Collapse(CollapseGate::R) => {
                self.reset_many(targets);
                Vec::new()
            }
            Gate::Collapse(CollapseGate::MR) => {
                let outcomes = self.measure_many(targets);
                self.reset_many(targets);
                outcomes
            }
            _ => {
                let applications = match gate {
                    Gate::Two(_) => targets.len() / 2,
                    _ => targets.len(),
                };
                let max = targets.iter().copied().max().unwrap_or(0);
                let num_qubits = self.num_qubits().max(max + 1);
                if applications >= 2 && applications * TRANSPOSE_RATIO >= num_qubits {
                    self.apply_transposed(gate, targets);
                } else {
                    self.apply_row_major(gate, targets);
                }
                Vec::new()
            }
        }
    }

    fn apply_row_major(&mut self, gate: Gate, targets: &[usize]) {
        match gate {
            Gate::Single(g) => {
                for &q in targets {
                    self.tableau.apply_single(g, q);
                }
            }
            Gate::Two(g) => {
                for pair in targets.chunks_exact(2) {
                    self.tableau.apply_two(g, pair[0], pair[1]);
                }
            }
            Gate::Collapse(_) => unreachable!("Collapse gates are not applied by conjugation"),
        }
    }

    fn apply_transposed(&mut self, gate: Gate, targets: &[usize]) {
        let Some(&max) = targets.iter().max() else {
            return;
        };
        self.tableau.ensure_large_enough_for_qubit(max);
        let mut view = self.tableau.transposed();
        match gate {
            Gate::Single(g) => {
                for &q in targets {
                    view.apply_single(g, q);
                }
            }
            Gate::Two(g) => {
                for pair in targets.chunks_exact(2) {
                    view.apply_two(g, pair[0], pair[1]);
                }
            }
            Gate::Collapse(_) => unreachable!("Collapse gates are not applied by conjugation"),
        }
    }

    /// Run every instruction of `circuit` on a fresh simulator seeded from the operating system,
    /// returning one outcome per measured target in order.
    pub fn simulate(circuit: &Circuit) -> Vec<bool> {
        Self::from_os_rng(circuit.num_qubits()).run(circuit)
    }

    /// Like [`TableauSimulator::simulate`], but reproducible from `seed`.
    pub fn simulate_with_seed(circuit: &Circuit, seed: u64) -> Vec<bool> {
        Self::new(circuit.num_qubits(), seed).run(circuit)
    }

    /// Run every instruction of `circuit` on this simulator, returning one outcome per measured target in order.
    pub fn run(&mut self, circuit: &Circuit) -> Vec<bool> {
        let mut outcomes = Vec::with_capacity(circuit.num_measurements());
        for instruction in circuit.instructions() {
            outcomes.extend(self.apply_instruction(instruction));
        }
        outcomes
    }

    /// Read circuit text from `input` one line at a time, applying each instruction as it arrives.
    ///
    /// Every measuring instruction writes its outcomes as a line of `0` and `1` characters to `output`.
    /// Malformed lines are reported as [`io::ErrorKind::InvalidData`].
    pub fn simulate_stream(
        input: impl BufRead,
        mut output: impl Write,
        seed: Option<u64>,
    ) -> io::Result<()> {
        let mut simulator = match seed {
            Some(seed) => Self::new(0, seed),
            None => Self::from_os_rng(0),
        };
        for (i, line) in input.lines().enumerate() {
            let instruction = Instruction::parse_line(&line?, i + 1)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            let Some(instruction) = instruction else {
                continue;
            };
            let outcomes = simulator.apply_instruction(&instruction);
            if instruction.num_measurements() > 0 {
                let text: String = outcomes.iter().map(|&o| if o { '1' } else { '0' }).collect();
                writeln!(output, "{text}")?;
            }
            output.flush()?;
        }
        Ok(())
    }

    /// The amplitudes of the current state. See [`Tableau::to_state_vector`].
    pub fn to_state_vector(&self) -> Vec<Complex<f64>> {
        self.tableau.to_state_vector()
    }
}

fn check_bias(bias: f64) -> Result<(), SimulationError> {
    if (0.0..=1.0).contains(&bias) {
        Ok(())
    } else {
        Err(SimulationError::BiasOutOfRange { bias })
    }
}

/// Resolve `name` to a unitary gate and check that it can be broadcast over `targets`.
fn unitary(name: &str, targets: &[usize]) -> Result<Gate, SimulationError> {
    let gate: Gate = name.parse()?;
    if let Gate::Collapse(_) = gate {
        return Err(SimulationError::NotUnitary {
            name: name.to_string(),
        });
    }
    gate.validate_targets(targets)?;
    Ok(gate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measure_zero_state() {
        let mut sim = TableauSimulator::new(3, 1);
        assert!(sim.is_deterministic(1));
        assert!(!sim.measure(1));
        assert_eq!(sim.measure_many(&[0, 1, 2]), vec![false, false, false]);
    }

    #[test]
    fn bias_extremes() {
        let mut sim = TableauSimulator::new(2, 2);
        sim.h(0);
        sim.h(1);
        assert_eq!(sim.measure_with_bias(0, 1.0), Ok(true));
        assert_eq!(sim.measure_with_bias(1, 0.0), Ok(false));
        assert_eq!(sim.measure_with_bias(0, 0.0), Ok(true));
    }

    #[test]
    fn bias_out_of_range() {
        let mut sim = TableauSimulator::new(1, 3);
        sim.h(0);
        assert_eq!(
            sim.measure_with_bias(0, 1.5),
            Err(SimulationError::BiasOutOfRange { bias: 1.5 })
        );
        assert!(sim.measure_many_with_bias(&[0], -0.1).is_err());
        assert!(matches!(
            sim.measure_with_bias(0, f64::NAN),
            Err(SimulationError::BiasOutOfRange { .. })
        ));
        // Nothing was collapsed by the failed calls.
        assert!(!sim.is_deterministic(0));
    }

    #[test]
    fn reset_many_leaves_zero() {
        let mut sim = TableauSimulator::new(4, 4);
        sim.h(0);
        sim.cx(0, 1);
        sim.x(2);
        sim.sqrt_y(3);
        sim.reset_many(&[0, 1, 2, 3]);
        assert!(sim.tableau().satisfies_invariants());
        for q in 0..4 {
            assert_eq!(sim.tableau().deterministic_outcome(q), Some(false));
        }
    }

    #[test]
    fn inspected_collapse() {
        let mut sim = TableauSimulator::new(2, 5);
        sim.h(0);
        sim.cx(0, 1);
        let observables = sim.inspected_collapse(&[1, 0]);
        assert_eq!(observables[0].to_string(), "+X0*X1");
        assert!(observables[1].is_identity());
    }

    #[test]
    fn dispatch_errors_leave_state_untouched() {
        let mut sim = TableauSimulator::new(2, 6);
        sim.h(0);
        let before = sim.tableau().clone();
        assert_eq!(
            sim.func_op("FOO", &[0]),
            Err(SimulationError::UnknownGate {
                name: "FOO".to_string()
            })
        );
        assert_eq!(
            sim.tableau_op("M", &[0]),
            Err(SimulationError::NotUnitary {
                name: "M".to_string()
            })
        );
        assert_eq!(
            sim.broadcast_op("CX", &[0, 1, 0]),
            Err(SimulationError::OddTargetCount {
                gate: "CX".to_string(),
                count: 3
            })
        );
        assert_eq!(
            sim.func_op("CZ", &[0, 1, 1, 1]),
            Err(SimulationError::RepeatedTarget {
                gate: "CZ".to_string(),
                qubit: 1
            })
        );
        assert_eq!(sim.tableau(), &before);
    }

    #[test]
    fn dispatch_paths_agree() {
        let targets: Vec<usize> = (0..40).collect();
        let pairs: Vec<usize> = (0..40).map(|i| (i * 7) % 41).collect();

        let mut row_major = TableauSimulator::new(41, 7);
        let mut transposed = TableauSimulator::new(41, 7);
        let mut broadcast = TableauSimulator::new(41, 7);
        for (name, targets) in [("H", &targets), ("ISWAP", &pairs), ("SQRT_Y_DAG", &pairs), ("YCX", &targets)] {
            row_major.func_op(name, targets).unwrap();
            transposed.tableau_op(name, targets).unwrap();
            broadcast.broadcast_op(name, targets).unwrap();
        }
        assert_eq!(row_major.tableau(), transposed.tableau());
        assert_eq!(row_major.tableau(), broadcast.tableau());
    }

    #[test]
    fn broadcast_measure_reset() {
        let mut sim = TableauSimulator::new(0, 8);
        assert_eq!(sim.broadcast_op("X", &[2]).unwrap(), vec![]);
        assert_eq!(sim.broadcast_op("MR", &[0, 2]).unwrap(), vec![false, true]);
        assert_eq!(sim.broadcast_op("M", &[2]).unwrap(), vec![false]);
        assert_eq!(sim.broadcast_op("R", &[0]).unwrap(), vec![]);
        assert_eq!(sim.num_qubits(), 3);
    }

    #[test]
    fn stream() {
        let input = "X 1\n# comment\n\nM 0 1\nH 2\nCX 2 3\nM 2 3\n";
        let mut output = Vec::new();
        TableauSimulator::simulate_stream(input.as_bytes(), &mut output, Some(9)).unwrap();
        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "01");
        assert!(lines[1] == "00" || lines[1] == "11");
    }

    #[test]
    fn stream_error() {
        let mut output = Vec::new();
        let err = TableauSimulator::simulate_stream("H 0\nM zero\n".as_bytes(), &mut output, Some(10))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(err.to_string().contains("line 2"));

        let cases = [
            ("H 0\nX 1\nFOO 0\n", 3),
            ("M 0\nCZ 0 1 2\n", 2),
            ("SWAP 3 3\n", 1),
        ];
        for (input, line) in cases {
            let mut output = Vec::new();
            let err = TableauSimulator::simulate_stream(input.as_bytes(), &mut output, Some(10))
                .unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::InvalidData);
            assert!(err.to_string().ends_with(&format!("on line {line}")), "{err}");
        }
    }
}
