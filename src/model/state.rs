//! Model State

use std::fmt;

use good_lp::{Expression, ProblemVariables, Variable};

use crate::{
    model::{lattice::DecisionLattice, observer::FormulationObserver},
    solvers::{ConstraintRelation, Formulation, LinearConstraint},
};

/// Builder state for problem variables, objective and recorded constraints.
pub struct ModelState {
    pb: ProblemVariables,
    emissions: Expression,
    constraints: Vec<LinearConstraint>,
}

impl fmt::Debug for ModelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelState")
            .field("pb", &"<ProblemVariables>")
            .field("emissions", &"<Expression>")
            .field(
                "constraints",
                &format!("[{} constraints]", self.constraints.len()),
            )
            .finish()
    }
}

impl ModelState {
    /// Create state together with a fresh decision lattice over its variables.
    pub(crate) fn with_lattice<O: FormulationObserver + ?Sized>(
        consumers: usize,
        methods: usize,
        timesteps: usize,
        observer: &mut O,
    ) -> (Self, DecisionLattice) {
        let mut pb = ProblemVariables::new();
        let lattice = DecisionLattice::new(&mut pb, consumers, methods, timesteps);

        for (choice, var) in lattice.iter() {
            observer.on_choice_variable(choice, var);
        }

        let state = Self {
            pb,
            emissions: Expression::default(),
            constraints: Vec::new(),
        };

        (state, lattice)
    }

    /// Number of constraints recorded so far
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Add a term to the objective function (total emissions).
    pub fn add_to_objective(&mut self, var: Variable, coefficient: f64) {
        self.emissions += var * coefficient;
    }

    /// Record an equality constraint.
    pub fn add_eq_constraint(&mut self, lhs: Expression, rhs: f64) {
        self.constraints.push(LinearConstraint {
            lhs,
            relation: ConstraintRelation::Eq,
            rhs,
        });
    }

    /// Record a less-than-or-equal constraint.
    pub fn add_leq_constraint(&mut self, lhs: Expression, rhs: f64) {
        self.constraints.push(LinearConstraint {
            lhs,
            relation: ConstraintRelation::Leq,
            rhs,
        });
    }

    /// Finish the formulation, tracking every lattice variable.
    pub(crate) fn into_formulation(self, lattice: &DecisionLattice) -> Formulation {
        Formulation {
            variables: self.pb,
            objective: self.emissions,
            constraints: self.constraints,
            tracked: lattice.variables().to_vec(),
        }
    }
}
