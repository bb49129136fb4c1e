//! MILP Backend

use good_lp::{ResolutionError, Solution, SolverModel};
use tracing::info;

#[cfg(feature = "solver-highs")]
use good_lp::solvers::highs::highs as default_solver;
#[cfg(all(not(feature = "solver-highs"), feature = "solver-microlp"))]
use good_lp::solvers::microlp::microlp as default_solver;

use crate::solvers::{
    ConstraintRelation, Formulation, LinearConstraint, SolveStatus, SolverBackend, SolverOptions,
};

/// Backend delegating to the solver selected by the crate features.
#[derive(Debug, Default, Clone, Copy)]
pub struct MilpBackend;

impl SolverBackend for MilpBackend {
    fn solve(&self, formulation: Formulation, options: &SolverOptions) -> SolveStatus {
        let Formulation {
            variables,
            objective,
            constraints,
            tracked,
        } = formulation;

        let model = configure(
            variables.minimise(objective.clone()).using(default_solver),
            options,
        );

        let model = apply_recorded_constraints(model, constraints);

        match model.solve() {
            Ok(solution) => {
                let values = tracked
                    .iter()
                    .map(|&var| (var, solution.value(var)))
                    .collect();

                let objective = solution.eval(&objective);

                info!(objective, "solver reached optimality");

                SolveStatus::Optimal { objective, values }
            }
            Err(ResolutionError::Infeasible) => {
                info!("solver proved the model infeasible");

                SolveStatus::Infeasible
            }
            Err(err) => {
                info!(status = %err, "solver terminated without an optimum");

                SolveStatus::Other(err.to_string())
            }
        }
    }
}

pub(crate) fn apply_recorded_constraints<S: SolverModel>(
    mut model: S,
    constraints: Vec<LinearConstraint>,
) -> S {
    for constraint in constraints {
        model = match constraint.relation {
            ConstraintRelation::Eq => model.with(constraint.lhs.eq(constraint.rhs)),
            ConstraintRelation::Leq => model.with(constraint.lhs.leq(constraint.rhs)),
        };
    }

    model
}

#[cfg(feature = "solver-highs")]
fn configure(
    model: good_lp::solvers::highs::HighsProblem,
    options: &SolverOptions,
) -> good_lp::solvers::highs::HighsProblem {
    let model = model.set_verbose(options.log_to_console);

    match options.time_limit_seconds {
        Some(limit) => model.set_time_limit(limit),
        None => model,
    }
}

#[cfg(all(not(feature = "solver-highs"), feature = "solver-microlp"))]
fn configure<S: SolverModel>(model: S, options: &SolverOptions) -> S {
    if options.log_to_console || options.time_limit_seconds.is_some() {
        tracing::debug!("bundled solver has no console log or time limit; options ignored");
    }

    model
}

#[cfg(test)]
mod tests {
    use good_lp::{Expression, ProblemVariables, variable};

    use super::*;
    use crate::solvers::BINARY_THRESHOLD;

    fn single_choice(cost_a: f64, cost_b: f64, rhs: f64) -> (Formulation, [good_lp::Variable; 2]) {
        let mut variables = ProblemVariables::new();
        let a = variables.add(variable().binary());
        let b = variables.add(variable().binary());

        let formulation = Formulation {
            variables,
            objective: a * cost_a + b * cost_b,
            constraints: vec![LinearConstraint {
                lhs: Expression::from(a) + b,
                relation: ConstraintRelation::Eq,
                rhs,
            }],
            tracked: vec![a, b],
        };

        (formulation, [a, b])
    }

    #[test]
    fn optimal_solve_reports_objective_and_values() {
        let (formulation, [a, b]) = single_choice(3.0, 1.0, 1.0);

        let status = MilpBackend.solve(formulation, &SolverOptions::default());

        let SolveStatus::Optimal { objective, values } = status else {
            unreachable!("expected an optimal solve, got {status:?}");
        };

        assert!((objective - 1.0).abs() < 1e-6);
        assert!(values.get(&a).is_some_and(|v| *v < BINARY_THRESHOLD));
        assert!(values.get(&b).is_some_and(|v| *v > BINARY_THRESHOLD));
    }

    #[test]
    fn contradictory_constraints_are_infeasible() {
        // Two binaries can never sum to three.
        let (formulation, _) = single_choice(1.0, 1.0, 3.0);

        let status = MilpBackend.solve(formulation, &SolverOptions::default());

        assert_eq!(status, SolveStatus::Infeasible);
    }

    #[test]
    fn solver_options_do_not_change_the_optimum() {
        let (formulation, _) = single_choice(2.0, 5.0, 1.0);

        let options = SolverOptions {
            log_to_console: true,
            time_limit_seconds: Some(30.0),
        };

        let status = MilpBackend.solve(formulation, &options);

        assert!(
            matches!(status, SolveStatus::Optimal { objective, .. } if (objective - 2.0).abs() < 1e-6),
            "unexpected status {status:?}"
        );
    }
}
