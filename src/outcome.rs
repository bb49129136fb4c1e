//! Optimization Outcome

use std::{collections::HashMap, fmt};

use good_lp::Variable;
use rustc_hash::FxHashSet;

use crate::{
    model::{Choice, DecisionLattice},
    sampler::ConsumerIncomes,
    solvers::BINARY_THRESHOLD,
    summary::{OutcomeSummary, summarize},
};

/// Result of one optimize invocation. Never mutated after creation.
#[derive(Debug, Clone)]
pub enum OptimizationOutcome {
    /// The solver found an optimal assignment.
    Solved(SolvedModel),

    /// The solve ended without an optimum.
    Failed(SolveFailure),
}

impl OptimizationOutcome {
    /// Whether the solve reached optimality.
    pub fn is_solved(&self) -> bool {
        matches!(self, OptimizationOutcome::Solved(_))
    }

    /// The successful result, if any.
    pub fn solved(&self) -> Option<&SolvedModel> {
        match self {
            OptimizationOutcome::Solved(model) => Some(model),
            OptimizationOutcome::Failed(_) => None,
        }
    }

    /// The failure record, if any.
    pub fn failure(&self) -> Option<&SolveFailure> {
        match self {
            OptimizationOutcome::Solved(_) => None,
            OptimizationOutcome::Failed(failure) => Some(failure),
        }
    }
}

/// Why a solve produced no assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The constraints admit no solution for these parameters.
    Infeasible,

    /// The solver stopped for any other reason (numerical trouble, limits, ...).
    SolverError,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Infeasible => f.write_str("infeasible"),
            FailureKind::SolverError => f.write_str("solver-error"),
        }
    }
}

/// Failure record of an optimize invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolveFailure {
    /// Failure category
    pub kind: FailureKind,

    /// Raw solver status, for diagnosis
    pub status: String,
}

impl fmt::Display for SolveFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind, self.status)
    }
}

/// Sparse set of lattice cells the solver set to one. Absent cells are zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolvedAssignment {
    cells: FxHashSet<Choice>,
}

impl SolvedAssignment {
    /// Read the chosen cells from solved variable values.
    ///
    /// Binary variables may come back slightly off 0/1, so anything above
    /// [`BINARY_THRESHOLD`] counts as chosen. Variables without a value are zero.
    pub fn from_values(lattice: &DecisionLattice, values: &HashMap<Variable, f64>) -> Self {
        let cells = lattice
            .iter()
            .filter(|(_, var)| values.get(var).is_some_and(|v| *v > BINARY_THRESHOLD))
            .map(|(choice, _)| choice)
            .collect();

        Self { cells }
    }

    /// Number of chosen cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether nothing was chosen
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Whether the cell was chosen.
    pub fn contains(&self, choice: Choice) -> bool {
        self.cells.contains(&choice)
    }

    /// Chosen cells in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = Choice> + '_ {
        self.cells.iter().copied()
    }

    /// Chosen cells ordered by consumer, method then timestep.
    pub fn sorted(&self) -> Vec<Choice> {
        let mut cells: Vec<Choice> = self.iter().collect();
        cells.sort_unstable();
        cells
    }
}

impl FromIterator<Choice> for SolvedAssignment {
    fn from_iter<I: IntoIterator<Item = Choice>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}

/// Success record of an optimize invocation.
#[derive(Debug, Clone)]
pub struct SolvedModel {
    objective: f64,
    assignment: SolvedAssignment,
    incomes: ConsumerIncomes,
    emissions_grams: Vec<f64>,
    timesteps: usize,
}

impl SolvedModel {
    /// Create a success record.
    pub fn new(
        objective: f64,
        assignment: SolvedAssignment,
        incomes: ConsumerIncomes,
        emissions_grams: Vec<f64>,
        timesteps: usize,
    ) -> Self {
        Self {
            objective,
            assignment,
            incomes,
            emissions_grams,
            timesteps,
        }
    }

    /// Total emissions in grams at the optimum
    pub fn objective(&self) -> f64 {
        self.objective
    }

    /// Chosen cells
    pub fn assignment(&self) -> &SolvedAssignment {
        &self.assignment
    }

    /// Income of every consumer
    pub fn incomes(&self) -> &ConsumerIncomes {
        &self.incomes
    }

    /// Emissions per use of each method, echoed from the parameters
    pub fn emissions_grams(&self) -> &[f64] {
        &self.emissions_grams
    }

    /// Number of consumers
    pub fn consumers(&self) -> usize {
        self.incomes.len()
    }

    /// Number of methods
    pub fn methods(&self) -> usize {
        self.emissions_grams.len()
    }

    /// Number of timesteps
    pub fn timesteps(&self) -> usize {
        self.timesteps
    }

    /// The method a consumer used at a timestep.
    ///
    /// Returns the lowest method index if the assignment (incorrectly) holds more
    /// than one, and `None` if it holds none.
    pub fn method_at(&self, consumer: usize, timestep: usize) -> Option<usize> {
        (0..self.methods()).find(|&method| {
            self.assignment
                .contains(Choice::new(consumer, method, timestep))
        })
    }

    /// Per-consumer summary statistics.
    pub fn summarize(&self) -> OutcomeSummary {
        summarize(self)
    }
}

#[cfg(test)]
mod tests {
    use good_lp::ProblemVariables;

    use super::*;

    #[test]
    fn values_above_threshold_are_chosen() {
        let mut pb = ProblemVariables::new();
        let lattice = DecisionLattice::new(&mut pb, 1, 3, 1);

        let values: HashMap<Variable, f64> = lattice
            .iter()
            .map(|(choice, var)| {
                let value = match choice.method {
                    0 => 0.999_999_9,
                    1 => 1e-7,
                    _ => 0.5,
                };

                (var, value)
            })
            .collect();

        let assignment = SolvedAssignment::from_values(&lattice, &values);

        assert_eq!(assignment.sorted(), vec![Choice::new(0, 0, 0)]);
    }

    #[test]
    fn missing_values_are_treated_as_zero() {
        let mut pb = ProblemVariables::new();
        let lattice = DecisionLattice::new(&mut pb, 2, 3, 2);

        let assignment = SolvedAssignment::from_values(&lattice, &HashMap::new());

        assert!(assignment.is_empty());
    }

    #[test]
    fn method_at_reads_sparse_assignment() {
        let assignment: SolvedAssignment = [Choice::new(0, 0, 0), Choice::new(0, 2, 1)]
            .into_iter()
            .collect();

        let model = SolvedModel::new(
            661.2,
            assignment,
            ConsumerIncomes::new(vec![25_000.0]),
            vec![578.4, 0.653, 82.8],
            3,
        );

        assert_eq!(model.method_at(0, 0), Some(0));
        assert_eq!(model.method_at(0, 1), Some(2));
        assert_eq!(model.method_at(0, 2), None);
    }

    #[test]
    fn outcome_accessors_match_variant() {
        let failed = OptimizationOutcome::Failed(SolveFailure {
            kind: FailureKind::Infeasible,
            status: "infeasible".to_string(),
        });

        assert!(!failed.is_solved());
        assert!(failed.solved().is_none());
        assert_eq!(
            failed.failure().map(ToString::to_string),
            Some("infeasible (infeasible)".to_string())
        );
    }
}
