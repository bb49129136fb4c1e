//! Solvers
//!
//! The model builder hands a [`Formulation`] to a [`SolverBackend`] and gets a
//! terminal [`SolveStatus`] back. Nothing else about the solver leaks out.

use std::{collections::HashMap, fmt};

use good_lp::{Expression, ProblemVariables, Variable};
use serde::{Deserialize, Serialize};

pub mod milp;

pub use milp::MilpBackend;

/// Binary threshold for determining truthiness
pub const BINARY_THRESHOLD: f64 = 0.5;

/// Relation operator for a linear constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintRelation {
    /// Equality (`lhs == rhs`)
    Eq,

    /// Less than or equal (`lhs <= rhs`)
    Leq,
}

impl fmt::Display for ConstraintRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintRelation::Eq => f.write_str("="),
            ConstraintRelation::Leq => f.write_str("<="),
        }
    }
}

/// Recorded linear constraint emitted during model construction.
#[derive(Debug, Clone)]
pub struct LinearConstraint {
    /// Left-hand side expression
    pub lhs: Expression,

    /// Relation operator
    pub relation: ConstraintRelation,

    /// Right-hand side scalar
    pub rhs: f64,
}

/// A complete minimisation problem ready to be solved.
pub struct Formulation {
    /// All problem variables
    pub variables: ProblemVariables,

    /// Objective to minimise
    pub objective: Expression,

    /// Constraints that must hold simultaneously
    pub constraints: Vec<LinearConstraint>,

    /// Variables whose values must be reported back on success
    pub tracked: Vec<Variable>,
}

impl fmt::Debug for Formulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Formulation")
            .field("variables", &"<ProblemVariables>")
            .field("objective", &"<Expression>")
            .field(
                "constraints",
                &format!("[{} constraints]", self.constraints.len()),
            )
            .field("tracked", &format!("[{} variables]", self.tracked.len()))
            .finish()
    }
}

/// Terminal status of a single solve.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveStatus {
    /// An optimal solution was found.
    Optimal {
        /// Objective value at the optimum
        objective: f64,

        /// Value of every tracked variable
        values: HashMap<Variable, f64>,
    },

    /// The constraint set admits no solution.
    Infeasible,

    /// Any other non-optimal termination, with the solver's own description.
    Other(String),
}

/// Options passed straight through to the solver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SolverOptions {
    /// Let the solver print its progress log to the console.
    #[serde(default)]
    pub log_to_console: bool,

    /// Wall-clock limit for a single solve, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit_seconds: Option<f64>,
}

/// Mixed-integer linear programming backend.
pub trait SolverBackend {
    /// Solve the formulation, blocking until the solver reaches a terminal status.
    fn solve(&self, formulation: Formulation, options: &SolverOptions) -> SolveStatus;
}

impl<B: SolverBackend + ?Sized> SolverBackend for &B {
    fn solve(&self, formulation: Formulation, options: &SolverOptions) -> SolveStatus {
        (**self).solve(formulation, options)
    }
}
