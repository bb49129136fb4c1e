//! Formulation Observer

use std::fmt;

use good_lp::{Expression, Variable};

use crate::{model::lattice::Choice, solvers::ConstraintRelation};

/// Family a recorded constraint belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintFamily {
    /// Exactly one method per consumer and timestep.
    Exclusivity,

    /// Refill only after an earlier disposable purchase.
    Precedence,

    /// Spend stays within the consumer's budget.
    Affordability,
}

impl fmt::Display for ConstraintFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintFamily::Exclusivity => f.write_str("exclusivity"),
            ConstraintFamily::Precedence => f.write_str("precedence"),
            ConstraintFamily::Affordability => f.write_str("affordability"),
        }
    }
}

/// Observer trait for capturing the formulation as it's built.
///
/// The builder remains the only place constraints are encoded; observers
/// passively record what happens for logging, rendering or tests.
pub trait FormulationObserver {
    /// Called when the decision variable for a lattice cell is registered.
    fn on_choice_variable(&mut self, choice: Choice, var: Variable);

    /// Called when a term is added to the objective function.
    ///
    /// # Parameters
    ///
    /// - `var`: The decision variable
    /// - `coefficient`: Emissions in grams for one use
    fn on_objective_term(&mut self, _var: Variable, _coefficient: f64) {}

    /// Called for every constraint added to the model.
    ///
    /// # Parameters
    ///
    /// - `family`: Which rule the constraint encodes
    /// - `consumer`: Consumer the constraint is about
    /// - `constraint_expr`: The left-hand side expression
    /// - `relation`: Relation operator
    /// - `rhs`: Right-hand side value
    fn on_constraint(
        &mut self,
        family: ConstraintFamily,
        consumer: usize,
        constraint_expr: &Expression,
        relation: ConstraintRelation,
        rhs: f64,
    );
}

/// No-op observer for unobserved builds.
#[derive(Debug, Default)]
pub struct NoopObserver;

impl FormulationObserver for NoopObserver {
    fn on_choice_variable(&mut self, _: Choice, _: Variable) {}

    fn on_constraint(
        &mut self,
        _: ConstraintFamily,
        _: usize,
        _: &Expression,
        _: ConstraintRelation,
        _: f64,
    ) {
    }
}

/// Observer that counts what the builder emitted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FormulationStats {
    /// Decision variables registered
    pub variables: usize,

    /// Objective terms added
    pub objective_terms: usize,

    /// Exclusivity constraints
    pub exclusivity: usize,

    /// Precedence constraints
    pub precedence: usize,

    /// Affordability constraints
    pub affordability: usize,
}

impl FormulationStats {
    /// Total number of constraints of every family.
    pub fn constraints(&self) -> usize {
        self.exclusivity + self.precedence + self.affordability
    }
}

impl FormulationObserver for FormulationStats {
    fn on_choice_variable(&mut self, _: Choice, _: Variable) {
        self.variables += 1;
    }

    fn on_objective_term(&mut self, _: Variable, _: f64) {
        self.objective_terms += 1;
    }

    fn on_constraint(
        &mut self,
        family: ConstraintFamily,
        _: usize,
        _: &Expression,
        _: ConstraintRelation,
        _: f64,
    ) {
        match family {
            ConstraintFamily::Exclusivity => self.exclusivity += 1,
            ConstraintFamily::Precedence => self.precedence += 1,
            ConstraintFamily::Affordability => self.affordability += 1,
        }
    }
}
