//! Constraint Encoding
//!
//! Each function adds one family of linear constraints over the decision
//! lattice. They only read the lattice and parameters, so the order they are
//! applied in does not matter.

use good_lp::{Expression, Variable};
use tracing::debug;

use crate::{
    model::{
        ModelError,
        lattice::{Choice, DecisionLattice},
        observer::{ConstraintFamily, FormulationObserver},
        state::ModelState,
    },
    params::{AffordabilityForm, Method, Parameters},
    sampler::ConsumerIncomes,
    solvers::ConstraintRelation,
};

/// Method that can only be used once the prerequisite has been used earlier.
pub const DEPENDENT_METHOD: Method = Method::Refill;

/// Method that unlocks [`DEPENDENT_METHOD`].
pub const PREREQUISITE_METHOD: Method = Method::Disposable;

/// Minimise total emissions over every consumer, method and timestep.
pub(crate) fn add_emissions_objective(
    params: &Parameters,
    lattice: &DecisionLattice,
    state: &mut ModelState,
    observer: &mut dyn FormulationObserver,
) -> Result<(), ModelError> {
    for (choice, var) in lattice.iter() {
        let grams = params
            .emissions_grams()
            .get(choice.method)
            .copied()
            .ok_or(ModelError::MissingParameter {
                field: "emissions_grams",
                method: choice.method,
            })?;

        state.add_to_objective(var, grams);
        observer.on_objective_term(var, grams);
    }

    Ok(())
}

/// Every consumer uses exactly one method in every timestep.
pub(crate) fn add_exclusivity_constraints(
    lattice: &DecisionLattice,
    state: &mut ModelState,
    observer: &mut dyn FormulationObserver,
) -> Result<(), ModelError> {
    let before = state.constraint_count();

    for consumer in 0..lattice.consumers() {
        for timestep in 0..lattice.timesteps() {
            let mut expr = Expression::default();

            for method in 0..lattice.methods() {
                expr += require(lattice, Choice::new(consumer, method, timestep))?;
            }

            observer.on_constraint(
                ConstraintFamily::Exclusivity,
                consumer,
                &expr,
                ConstraintRelation::Eq,
                1.0,
            );

            state.add_eq_constraint(expr, 1.0);
        }
    }

    debug!(
        count = state.constraint_count() - before,
        "added exclusivity constraints"
    );

    Ok(())
}

/// A refill at timestep `k` needs a disposable purchase at some `s < k`.
///
/// At `k = 0` the prior sum is empty, which pins the refill variable to zero.
pub(crate) fn add_precedence_constraints(
    lattice: &DecisionLattice,
    state: &mut ModelState,
    observer: &mut dyn FormulationObserver,
) -> Result<(), ModelError> {
    let before = state.constraint_count();

    for consumer in 0..lattice.consumers() {
        let mut prior_purchases = Expression::default();

        for timestep in 0..lattice.timesteps() {
            let dependent = require(
                lattice,
                Choice::new(consumer, DEPENDENT_METHOD.index(), timestep),
            )?;

            let expr = Expression::from(dependent) - prior_purchases.clone();

            observer.on_constraint(
                ConstraintFamily::Precedence,
                consumer,
                &expr,
                ConstraintRelation::Leq,
                0.0,
            );

            state.add_leq_constraint(expr, 0.0);

            prior_purchases += require(
                lattice,
                Choice::new(consumer, PREREQUISITE_METHOD.index(), timestep),
            )?;
        }
    }

    debug!(
        count = state.constraint_count() - before,
        "added precedence constraints"
    );

    Ok(())
}

/// Keep spending within each consumer's budget under the active affordability form.
pub(crate) fn add_affordability_constraints(
    params: &Parameters,
    incomes: &ConsumerIncomes,
    lattice: &DecisionLattice,
    state: &mut ModelState,
    observer: &mut dyn FormulationObserver,
) -> Result<(), ModelError> {
    let before = state.constraint_count();
    let form = params.affordability_form();

    for (consumer, income) in incomes.iter() {
        let budget = params.budget_for(income);

        match form {
            AffordabilityForm::PerUse => {
                add_per_use_constraints(params, lattice, consumer, budget, state, observer)?;
            }
            AffordabilityForm::PerHorizon => {
                add_per_horizon_constraint(params, lattice, consumer, budget, state, observer)?;
            }
        }
    }

    debug!(
        %form,
        count = state.constraint_count() - before,
        "added affordability constraints"
    );

    Ok(())
}

fn add_per_use_constraints(
    params: &Parameters,
    lattice: &DecisionLattice,
    consumer: usize,
    budget: f64,
    state: &mut ModelState,
    observer: &mut dyn FormulationObserver,
) -> Result<(), ModelError> {
    for method in 0..lattice.methods() {
        let cost = method_cost(params, method)?;

        // Free methods can never exceed a non-negative budget.
        if cost <= 0.0 {
            continue;
        }

        for timestep in 0..lattice.timesteps() {
            let var = require(lattice, Choice::new(consumer, method, timestep))?;
            let expr = var * cost;

            observer.on_constraint(
                ConstraintFamily::Affordability,
                consumer,
                &expr,
                ConstraintRelation::Leq,
                budget,
            );

            state.add_leq_constraint(expr, budget);
        }
    }

    Ok(())
}

fn add_per_horizon_constraint(
    params: &Parameters,
    lattice: &DecisionLattice,
    consumer: usize,
    budget: f64,
    state: &mut ModelState,
    observer: &mut dyn FormulationObserver,
) -> Result<(), ModelError> {
    let mut spend = Expression::default();
    let mut has_cost = false;

    for method in 0..lattice.methods() {
        let cost = method_cost(params, method)?;

        if cost <= 0.0 {
            continue;
        }

        has_cost = true;

        for timestep in 0..lattice.timesteps() {
            spend += require(lattice, Choice::new(consumer, method, timestep))? * cost;
        }
    }

    if !has_cost {
        return Ok(());
    }

    observer.on_constraint(
        ConstraintFamily::Affordability,
        consumer,
        &spend,
        ConstraintRelation::Leq,
        budget,
    );

    state.add_leq_constraint(spend, budget);

    Ok(())
}

fn method_cost(params: &Parameters, method: usize) -> Result<f64, ModelError> {
    params
        .costs_usd()
        .get(method)
        .copied()
        .ok_or(ModelError::MissingParameter {
            field: "costs_USD",
            method,
        })
}

fn require(lattice: &DecisionLattice, choice: Choice) -> Result<Variable, ModelError> {
    lattice.get(choice).ok_or(ModelError::MissingVariable(choice))
}
