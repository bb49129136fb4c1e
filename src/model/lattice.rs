//! Decision Lattice

use std::fmt;

use good_lp::{ProblemVariables, Variable, variable};

/// A single cell of the decision lattice: consumer `consumer` uses method
/// `method` at timestep `timestep`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Choice {
    /// Consumer index
    pub consumer: usize,

    /// Method index
    pub method: usize,

    /// Timestep index
    pub timestep: usize,
}

impl Choice {
    /// Create a new choice triple.
    pub const fn new(consumer: usize, method: usize, timestep: usize) -> Self {
        Self {
            consumer,
            method,
            timestep,
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x[{},{},{}]", self.consumer, self.method, self.timestep)
    }
}

/// Dense consumer × method × timestep grid of binary decision variables.
pub struct DecisionLattice {
    consumers: usize,
    methods: usize,
    timesteps: usize,
    variables: Vec<Variable>,
}

impl fmt::Debug for DecisionLattice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecisionLattice")
            .field("consumers", &self.consumers)
            .field("methods", &self.methods)
            .field("timesteps", &self.timesteps)
            .field("variables", &format!("[{} variables]", self.variables.len()))
            .finish()
    }
}

impl DecisionLattice {
    /// Add one binary variable per (consumer, method, timestep) to `pb`.
    pub fn new(
        pb: &mut ProblemVariables,
        consumers: usize,
        methods: usize,
        timesteps: usize,
    ) -> Self {
        // Sizes come from validated parameters, which bound the cell count.
        let size = consumers * methods * timesteps;
        let variables = (0..size).map(|_| pb.add(variable().binary())).collect();

        Self {
            consumers,
            methods,
            timesteps,
            variables,
        }
    }

    /// Number of consumers
    pub fn consumers(&self) -> usize {
        self.consumers
    }

    /// Number of methods
    pub fn methods(&self) -> usize {
        self.methods
    }

    /// Number of timesteps
    pub fn timesteps(&self) -> usize {
        self.timesteps
    }

    /// Total number of decision variables
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Whether the lattice has no variables
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Variable for a choice, or `None` if the triple is out of range.
    pub fn get(&self, choice: Choice) -> Option<Variable> {
        self.position(choice)
            .and_then(|idx| self.variables.get(idx).copied())
    }

    /// All variables in lattice order
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Iterate every cell with its variable, consumer-major then method then timestep.
    pub fn iter(&self) -> impl Iterator<Item = (Choice, Variable)> + '_ {
        let (methods, timesteps) = (self.methods, self.timesteps);

        self.variables.iter().copied().enumerate().map(move |(idx, var)| {
            let timestep = idx % timesteps;
            let method = (idx / timesteps) % methods;
            let consumer = idx / (timesteps * methods);

            (Choice::new(consumer, method, timestep), var)
        })
    }

    fn position(&self, choice: Choice) -> Option<usize> {
        if choice.consumer >= self.consumers
            || choice.method >= self.methods
            || choice.timestep >= self.timesteps
        {
            return None;
        }

        Some((choice.consumer * self.methods + choice.method) * self.timesteps + choice.timestep)
    }
}
