//! Result Extractor
//!
//! Pure aggregation over a [`SolvedModel`]: per-consumer emissions and method
//! usage, plus totals across the population.

use rustc_hash::FxHashMap;
use smallvec::{SmallVec, smallvec};
use tracing::warn;

use crate::outcome::SolvedModel;

/// Per-method usage counts
pub type MethodUsage = SmallVec<[usize; 3]>;

/// Emissions and method usage for one consumer.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumerSummary {
    /// Consumer index
    pub consumer: usize,

    /// Sampled income
    pub income: f64,

    /// Grams of emissions attributable to this consumer
    pub emissions_grams: f64,

    /// Number of timesteps each method was used, indexed by method
    pub usage: MethodUsage,

    /// Timesteps with no recorded method
    pub missing_timesteps: usize,

    /// Timesteps with more than one recorded method
    pub conflicting_timesteps: usize,
}

impl ConsumerSummary {
    /// Whether the assignment for this consumer violates exactly-one-method.
    pub fn has_integrity_warning(&self) -> bool {
        self.missing_timesteps > 0 || self.conflicting_timesteps > 0
    }

    /// Total number of recorded choices
    pub fn choices(&self) -> usize {
        self.usage.iter().sum()
    }
}

/// Summary statistics for a solved model.
#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeSummary {
    /// One row per consumer, in consumer order
    pub consumers: Vec<ConsumerSummary>,

    /// Sum of every consumer's emissions
    pub total_emissions_grams: f64,

    /// Usage per method across the population
    pub method_usage: MethodUsage,
}

impl OutcomeSummary {
    /// Consumers whose assignment failed the integrity check.
    pub fn flagged(&self) -> impl Iterator<Item = &ConsumerSummary> + '_ {
        self.consumers
            .iter()
            .filter(|summary| summary.has_integrity_warning())
    }
}

/// Aggregate a solved model into per-consumer and population summaries.
///
/// Cells outside the model's consumer or method range are skipped with a
/// warning rather than failing the aggregation.
pub fn summarize(model: &SolvedModel) -> OutcomeSummary {
    let methods = model.methods();
    let timesteps = model.timesteps();

    let mut consumers: Vec<ConsumerSummary> = model
        .incomes()
        .iter()
        .map(|(consumer, income)| ConsumerSummary {
            consumer,
            income,
            emissions_grams: 0.0,
            usage: smallvec![0; methods],
            missing_timesteps: 0,
            conflicting_timesteps: 0,
        })
        .collect();

    // Choices per (consumer, timestep)
    let mut per_period: FxHashMap<(usize, usize), usize> = FxHashMap::default();

    for choice in model.assignment().sorted() {
        let (Some(summary), Some(grams)) = (
            consumers.get_mut(choice.consumer),
            model.emissions_grams().get(choice.method).copied(),
        ) else {
            warn!(%choice, "ignoring choice outside the model");
            continue;
        };

        if let Some(count) = summary.usage.get_mut(choice.method) {
            *count += 1;
        }

        summary.emissions_grams += grams;

        *per_period
            .entry((choice.consumer, choice.timestep))
            .or_default() += 1;
    }

    for summary in &mut consumers {
        for timestep in 0..timesteps {
            match per_period.get(&(summary.consumer, timestep)) {
                None => summary.missing_timesteps += 1,
                Some(count) if *count > 1 => summary.conflicting_timesteps += 1,
                Some(_) => {}
            }
        }

        if summary.choices() == 0 {
            warn!(
                consumer = summary.consumer,
                "consumer has no recorded choices"
            );
        } else if summary.has_integrity_warning() {
            warn!(
                consumer = summary.consumer,
                missing = summary.missing_timesteps,
                conflicting = summary.conflicting_timesteps,
                "consumer does not have exactly one method per timestep"
            );
        }
    }

    let mut method_usage: MethodUsage = smallvec![0; methods];

    for summary in &consumers {
        for (total, count) in method_usage.iter_mut().zip(&summary.usage) {
            *total += count;
        }
    }

    let total_emissions_grams = consumers
        .iter()
        .map(|summary| summary.emissions_grams)
        .sum();

    OutcomeSummary {
        consumers,
        total_emissions_grams,
        method_usage,
    }
}
