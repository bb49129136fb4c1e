//! Report
//!
//! Tables for people reading a solved model: method adoption over time, usage
//! by income tier and per-consumer summaries. Consumes only the
//! [`OptimizationOutcome`] structure.

use std::io;

use smallvec::SmallVec;
use tabled::{
    Table,
    builder::Builder,
    settings::{
        Alignment, Color, Style,
        object::{Columns, Rows},
    },
};
use thiserror::Error;

use crate::{
    outcome::{OptimizationOutcome, SolvedModel},
    params::{Method, count_as_f64, same_amount},
    summary::{MethodUsage, OutcomeSummary},
};

/// Errors that can occur when writing a report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Writing to the output failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Percentages per method
pub type MethodShares = SmallVec<[f64; 3]>;

/// How many consumers used each method at one timestep.
#[derive(Debug, Clone, PartialEq)]
pub struct AdoptionRow {
    /// Timestep index
    pub timestep: usize,

    /// Consumers using each method
    pub counts: MethodUsage,

    /// Share of all consumers using each method, in percent
    pub percentages: MethodShares,
}

/// Method usage aggregated over every consumer in one income tier.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomeUsageRow {
    /// Income tier
    pub income: f64,

    /// Consumers in this tier
    pub consumers: usize,

    /// Choices of each method across the tier
    pub usage: MethodUsage,

    /// Share of the tier's choices going to each method, in percent
    pub percentages: MethodShares,
}

/// Method adoption at every timestep.
pub fn adoption_by_timestep(model: &SolvedModel) -> Vec<AdoptionRow> {
    let methods = model.methods();
    let consumers = model.consumers();

    (0..model.timesteps())
        .map(|timestep| {
            let counts: MethodUsage = (0..methods)
                .map(|method| {
                    (0..consumers)
                        .filter(|&consumer| model.method_at(consumer, timestep) == Some(method))
                        .count()
                })
                .collect();

            let percentages = counts
                .iter()
                .map(|&count| percent(count, consumers))
                .collect();

            AdoptionRow {
                timestep,
                counts,
                percentages,
            }
        })
        .collect()
}

/// Method usage per income tier, ordered by income.
pub fn usage_by_income(summary: &OutcomeSummary) -> Vec<IncomeUsageRow> {
    let mut rows: Vec<IncomeUsageRow> = Vec::new();

    for consumer in &summary.consumers {
        let existing = rows
            .iter_mut()
            .find(|row| same_amount(row.income, consumer.income));

        if let Some(row) = existing {
            row.consumers += 1;

            for (total, count) in row.usage.iter_mut().zip(&consumer.usage) {
                *total += count;
            }
        } else {
            rows.push(IncomeUsageRow {
                income: consumer.income,
                consumers: 1,
                usage: consumer.usage.clone(),
                percentages: SmallVec::new(),
            });
        }
    }

    rows.sort_by(|a, b| a.income.total_cmp(&b.income));

    for row in &mut rows {
        let choices: usize = row.usage.iter().sum();

        row.percentages = row
            .usage
            .iter()
            .map(|&count| percent(count, choices))
            .collect();
    }

    rows
}

/// Write the full report for an outcome.
///
/// # Errors
///
/// Returns a [`ReportError`] if writing to `out` fails.
pub fn write_to(outcome: &OptimizationOutcome, mut out: impl io::Write) -> Result<(), ReportError> {
    let model = match outcome {
        OptimizationOutcome::Solved(model) => model,
        OptimizationOutcome::Failed(failure) => {
            writeln!(out, "\n No solution: {failure}")?;

            return Ok(());
        }
    };

    let summary = model.summarize();

    writeln!(out, "\n Method adoption by timestep")?;
    writeln!(out, "{}", adoption_table(model))?;

    writeln!(out, "\n Method usage by income")?;
    writeln!(out, "{}", income_table(&summary, model.methods()))?;

    writeln!(out, "\n Consumers")?;
    writeln!(out, "{}", consumer_table(&summary, model.methods()))?;

    writeln!(
        out,
        "\n Total emissions: {:.3} g ({} consumers, {} timesteps)",
        model.objective(),
        model.consumers(),
        model.timesteps()
    )?;

    let flagged = summary.flagged().count();

    if flagged > 0 {
        writeln!(
            out,
            " {flagged} consumer(s) do not have exactly one method per timestep"
        )?;
    }

    Ok(())
}

fn adoption_table(model: &SolvedModel) -> Table {
    let mut builder = Builder::default();

    builder.push_record(header("Timestep", &[], model.methods()));

    for row in adoption_by_timestep(model) {
        let mut record = vec![format!("{}", row.timestep + 1)];
        record.extend(share_cells(&row.counts, &row.percentages));

        builder.push_record(record);
    }

    style(builder.build())
}

fn income_table(summary: &OutcomeSummary, methods: usize) -> Table {
    let mut builder = Builder::default();

    builder.push_record(header("Income", &["Consumers"], methods));

    for row in usage_by_income(summary) {
        let mut record = vec![format!("{:.0}", row.income), row.consumers.to_string()];
        record.extend(share_cells(&row.usage, &row.percentages));

        builder.push_record(record);
    }

    style(builder.build())
}

fn consumer_table(summary: &OutcomeSummary, methods: usize) -> Table {
    let mut builder = Builder::default();

    let mut record = header("Consumer", &["Income", "Emissions (g)"], methods);
    record.push("Warning".to_string());
    builder.push_record(record);

    for consumer in &summary.consumers {
        let mut record = vec![
            format!("#{:<3}", consumer.consumer + 1),
            format!("{:.0}", consumer.income),
            format!("{:.3}", consumer.emissions_grams),
        ];

        record.extend(consumer.usage.iter().map(ToString::to_string));

        record.push(if consumer.choices() == 0 {
            "no choices".to_string()
        } else if consumer.has_integrity_warning() {
            "not exactly one per timestep".to_string()
        } else {
            String::new()
        });

        builder.push_record(record);
    }

    style(builder.build())
}

fn header(first: &str, extra: &[&str], methods: usize) -> Vec<String> {
    let mut record = vec![first.to_string()];
    record.extend(extra.iter().map(ToString::to_string));
    record.extend((0..methods).map(method_label));
    record
}

fn share_cells(counts: &[usize], percentages: &[f64]) -> Vec<String> {
    counts
        .iter()
        .zip(percentages)
        .map(|(count, pct)| format!("{count} ({pct:.1}%)"))
        .collect()
}

fn style(mut table: Table) -> Table {
    table.with(Style::modern_rounded());
    table.modify(Rows::first(), Color::BOLD);
    table.modify(Columns::new(1..), Alignment::right());
    table
}

fn method_label(method: usize) -> String {
    Method::from_index(method).map_or_else(|| format!("method {method}"), |m| m.label().to_string())
}

fn percent(part: usize, whole: usize) -> f64 {
    match (count_as_f64(part), count_as_f64(whole)) {
        (Some(part), Some(whole)) if whole > 0.0 => part / whole * 100.0,
        _ => 0.0,
    }
}
