//! Model Builder
//!
//! Translates [`Parameters`] and a [`ConsumerIncomes`] assignment into a
//! mixed-integer linear program over the decision lattice, solves it through a
//! [`SolverBackend`] and turns the terminal status into an
//! [`OptimizationOutcome`].

use rand::Rng;
use thiserror::Error;
use tracing::{info, info_span, warn};

use crate::{
    outcome::{FailureKind, OptimizationOutcome, SolveFailure, SolvedAssignment, SolvedModel},
    params::{Parameters, ParametersError},
    sampler::ConsumerIncomes,
    solvers::{Formulation, MilpBackend, SolveStatus, SolverBackend, SolverOptions},
};

pub mod constraints;
pub mod lattice;
pub mod observer;
pub mod state;

pub use lattice::{Choice, DecisionLattice};
pub use observer::{ConstraintFamily, FormulationObserver, FormulationStats, NoopObserver};
pub use state::ModelState;

/// Model construction errors
#[derive(Debug, Error)]
pub enum ModelError {
    /// Parameters or incomes were rejected before reaching the solver.
    #[error(transparent)]
    Parameters(#[from] ParametersError),

    /// A per-method parameter has no entry for a lattice method.
    #[error("{field} has no entry for method {method}")]
    MissingParameter {
        /// Name of the parameter sequence
        field: &'static str,
        /// Method index that was looked up
        method: usize,
    },

    /// The decision lattice has no variable for a cell it should contain.
    #[error("decision lattice has no variable for {0}")]
    MissingVariable(Choice),
}

/// Builds and solves the emissions model for one parameter set.
#[derive(Debug, Clone)]
pub struct ModelBuilder<'p> {
    params: &'p Parameters,
    options: SolverOptions,
}

impl<'p> ModelBuilder<'p> {
    /// Create a builder with default solver options.
    pub fn new(params: &'p Parameters) -> Self {
        Self {
            params,
            options: SolverOptions::default(),
        }
    }

    /// Replace the options passed through to the solver.
    #[must_use]
    pub fn with_options(mut self, options: SolverOptions) -> Self {
        self.options = options;
        self
    }

    /// Solver options in use
    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    /// Construct the formulation without solving it.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Parameters`] if `incomes` does not contain one
    /// configured tier per consumer.
    pub fn build(
        &self,
        incomes: &ConsumerIncomes,
        observer: &mut dyn FormulationObserver,
    ) -> Result<(Formulation, DecisionLattice), ModelError> {
        self.check_incomes(incomes)?;

        let params = self.params;

        let (mut state, lattice) = ModelState::with_lattice(
            params.consumers(),
            params.methods(),
            params.timesteps(),
            &mut *observer,
        );

        constraints::add_emissions_objective(params, &lattice, &mut state, observer)?;
        constraints::add_exclusivity_constraints(&lattice, &mut state, observer)?;
        constraints::add_precedence_constraints(&lattice, &mut state, observer)?;
        constraints::add_affordability_constraints(
            params,
            incomes,
            &lattice,
            &mut state,
            observer,
        )?;

        info!(
            variables = lattice.len(),
            constraints = state.constraint_count(),
            affordability = %params.affordability_form(),
            "built emissions model"
        );

        Ok((state.into_formulation(&lattice), lattice))
    }

    /// Build and solve the model.
    ///
    /// Infeasible and otherwise non-optimal solves are reported through the
    /// returned [`OptimizationOutcome`], not as errors.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError`] if the inputs are rejected before solving.
    pub fn optimize<B: SolverBackend + ?Sized>(
        &self,
        incomes: &ConsumerIncomes,
        backend: &B,
    ) -> Result<OptimizationOutcome, ModelError> {
        self.optimize_with_observer(incomes, backend, &mut NoopObserver)
    }

    /// Build and solve the model with an observer for capturing the formulation.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError`] if the inputs are rejected before solving.
    pub fn optimize_with_observer<B: SolverBackend + ?Sized>(
        &self,
        incomes: &ConsumerIncomes,
        backend: &B,
        observer: &mut dyn FormulationObserver,
    ) -> Result<OptimizationOutcome, ModelError> {
        let span = info_span!(
            "optimize",
            consumers = self.params.consumers(),
            timesteps = self.params.timesteps()
        );
        let _guard = span.enter();

        let (formulation, lattice) = self.build(incomes, observer)?;

        let outcome = match backend.solve(formulation, &self.options) {
            SolveStatus::Optimal { objective, values } => {
                let assignment = SolvedAssignment::from_values(&lattice, &values);

                OptimizationOutcome::Solved(SolvedModel::new(
                    objective,
                    assignment,
                    incomes.clone(),
                    self.params.emissions_grams().to_vec(),
                    self.params.timesteps(),
                ))
            }
            SolveStatus::Infeasible => {
                warn!("no method sequence satisfies every consumer's constraints");

                OptimizationOutcome::Failed(SolveFailure {
                    kind: FailureKind::Infeasible,
                    status: "infeasible".to_string(),
                })
            }
            SolveStatus::Other(status) => {
                warn!(%status, "solver did not reach an optimum");

                OptimizationOutcome::Failed(SolveFailure {
                    kind: FailureKind::SolverError,
                    status,
                })
            }
        };

        Ok(outcome)
    }

    fn check_incomes(&self, incomes: &ConsumerIncomes) -> Result<(), ParametersError> {
        if incomes.len() != self.params.consumers() {
            return Err(ParametersError::LengthMismatch {
                field: "consumer incomes",
                expected: self.params.consumers(),
                found: incomes.len(),
            });
        }

        for (consumer, income) in incomes.iter() {
            if !self.params.is_income_tier(income) {
                return Err(ParametersError::UnknownIncome { consumer, income });
            }
        }

        Ok(())
    }
}

/// Sample incomes with `rng` and solve with the default backend.
///
/// # Errors
///
/// Returns a [`ModelError`] if the parameters are rejected before solving.
pub fn optimize<R: Rng + ?Sized>(
    params: &Parameters,
    options: SolverOptions,
    rng: &mut R,
) -> Result<OptimizationOutcome, ModelError> {
    let incomes = ConsumerIncomes::sample(params, rng)?;

    ModelBuilder::new(params)
        .with_options(options)
        .optimize(&incomes, &MilpBackend)
}
