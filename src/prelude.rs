//! Lather prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    config::{ConfigError, RunConfig},
    model::{
        Choice, DecisionLattice, FormulationObserver, FormulationStats, ModelBuilder, ModelError,
        NoopObserver, optimize,
    },
    outcome::{FailureKind, OptimizationOutcome, SolveFailure, SolvedAssignment, SolvedModel},
    params::{AffordabilityForm, Granularity, Method, Parameters, ParametersError, RawParameters},
    report::ReportError,
    sampler::{ConsumerIncomes, sample_incomes},
    solvers::{MilpBackend, SolveStatus, SolverBackend, SolverOptions},
    summary::{ConsumerSummary, OutcomeSummary},
};
