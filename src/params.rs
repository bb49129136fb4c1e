//! Parameters

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of hand-hygiene methods the model understands.
pub const METHOD_COUNT: usize = 3;

/// Tolerance used when checking that tier probabilities sum to one.
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Configuration Errors
#[derive(Debug, Error, PartialEq)]
pub enum ParametersError {
    /// A count that must be positive was zero.
    #[error("{field} must be greater than zero")]
    ZeroCount {
        /// Name of the offending option
        field: &'static str,
    },

    /// A count is too large to be used as a solver coefficient.
    #[error("{field} is too large: {value}")]
    CountTooLarge {
        /// Name of the offending option
        field: &'static str,
        /// Configured value
        value: usize,
    },

    /// The decision lattice would hold more cells than the solver can index.
    #[error("{consumers} consumers over {timesteps} timesteps is too many decision variables")]
    LatticeTooLarge {
        /// Configured consumers
        consumers: usize,
        /// Configured timesteps
        timesteps: usize,
    },

    /// The model only knows about three methods.
    #[error("unsupported method count: {0} (expected {METHOD_COUNT})")]
    UnsupportedMethodCount(usize),

    /// A sequence option has the wrong length.
    #[error("{field} has {found} entries, expected {expected}")]
    LengthMismatch {
        /// Name of the offending option
        field: &'static str,
        /// Required length
        expected: usize,
        /// Actual length
        found: usize,
    },

    /// A sequence option is empty.
    #[error("{0} must not be empty")]
    Empty(&'static str),

    /// A value that must be finite and non-negative was not.
    #[error("{field}[{index}] must be finite and non-negative, found {value}")]
    Negative {
        /// Name of the offending option
        field: &'static str,
        /// Position in the sequence
        index: usize,
        /// Offending value
        value: f64,
    },

    /// An income tier is not a positive finite amount.
    #[error("incomes[{index}] must be finite and positive, found {value}")]
    NonPositiveIncome {
        /// Position in the tier list
        index: usize,
        /// Offending value
        value: f64,
    },

    /// Tier probabilities do not sum to one.
    #[error("probabilities sum to {0}, expected 1")]
    ProbabilitySum(f64),

    /// The affordability fraction is outside `(0, 1]`.
    #[error("percent_income must be in (0, 1], found {0}")]
    PercentIncomeOutOfRange(f64),

    /// Neither temporal granularity option was supplied.
    #[error("one of months_in_timestep or soap_purchase_per_yr is required")]
    MissingGranularity,

    /// Both temporal granularity options were supplied.
    #[error("months_in_timestep and soap_purchase_per_yr are mutually exclusive")]
    ConflictingGranularity,

    /// The temporal granularity value is not positive.
    #[error("temporal granularity must be finite and positive, found {0}")]
    NonPositiveGranularity(f64),

    /// A consumer was assigned an income that is not a configured tier.
    #[error("consumer {consumer} has income {income}, which is not a configured tier")]
    UnknownIncome {
        /// Consumer index
        consumer: usize,
        /// Assigned income
        income: f64,
    },

    /// The weighted tier distribution could not be built.
    #[error(transparent)]
    Weights(#[from] rand::distributions::WeightedError),
}

/// Hand-hygiene method, identified by its position in the per-method sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Method {
    /// Buy a new disposable bottle.
    Disposable,

    /// Refill a bottle bought earlier.
    Refill,

    /// Reuse-contingent option.
    Reuse,
}

impl Method {
    /// All methods in index order.
    pub const ALL: [Method; METHOD_COUNT] = [Method::Disposable, Method::Refill, Method::Reuse];

    /// Index of this method in the decision lattice.
    pub const fn index(self) -> usize {
        match self {
            Method::Disposable => 0,
            Method::Refill => 1,
            Method::Reuse => 2,
        }
    }

    /// Method for a lattice index, if there is one.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Human-readable label.
    pub const fn label(self) -> &'static str {
        match self {
            Method::Disposable => "buy disposable",
            Method::Refill => "refill",
            Method::Reuse => "reuse",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Temporal granularity of one timestep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Granularity {
    /// Each timestep spans this many months.
    MonthsPerTimestep(f64),

    /// Consumers buy soap this many times per year.
    PurchasesPerYear(f64),
}

impl Granularity {
    /// The affordability rule implied by this granularity.
    ///
    /// A purchase rate only makes sense for budgeting each use, while a
    /// timestep length lets the whole horizon be budgeted at once.
    pub fn affordability_form(self) -> AffordabilityForm {
        match self {
            Granularity::MonthsPerTimestep(_) => AffordabilityForm::PerHorizon,
            Granularity::PurchasesPerYear(_) => AffordabilityForm::PerUse,
        }
    }

    fn value(self) -> f64 {
        match self {
            Granularity::MonthsPerTimestep(value) | Granularity::PurchasesPerYear(value) => value,
        }
    }
}

/// Budgeting rule limiting method spend relative to income.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AffordabilityForm {
    /// Every single use must fit within the per-purchase budget.
    PerUse,

    /// Total spend over the horizon must fit within the cumulative budget.
    PerHorizon,
}

impl fmt::Display for AffordabilityForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AffordabilityForm::PerUse => f.write_str("per-use"),
            AffordabilityForm::PerHorizon => f.write_str("per-horizon"),
        }
    }
}

/// Unvalidated parameters as they appear in a configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawParameters {
    /// Number of consumers
    pub consumers: usize,

    /// Number of methods (always 3)
    pub methods: usize,

    /// Number of timesteps
    pub timesteps: usize,

    /// Months per timestep
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub months_in_timestep: Option<f64>,

    /// Soap purchases per year
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soap_purchase_per_yr: Option<f64>,

    /// Grams of emissions per use of each method
    pub emissions_grams: Vec<f64>,

    /// Cost in USD per use of each method
    #[serde(rename = "costs_USD")]
    pub costs_usd: Vec<f64>,

    /// Income tiers
    pub incomes: Vec<f64>,

    /// Probability of each income tier
    pub probabilities: Vec<f64>,

    /// Fraction of income a consumer may spend
    pub percent_income: f64,
}

/// Validated, immutable model parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameters {
    consumers: usize,
    methods: usize,
    timesteps: usize,
    granularity: Granularity,
    emissions_grams: Vec<f64>,
    costs_usd: Vec<f64>,
    incomes: Vec<f64>,
    probabilities: Vec<f64>,
    percent_income: f64,
}

impl TryFrom<RawParameters> for Parameters {
    type Error = ParametersError;

    fn try_from(raw: RawParameters) -> Result<Self, Self::Error> {
        ensure_count("consumers", raw.consumers)?;
        ensure_count("methods", raw.methods)?;
        ensure_count("timesteps", raw.timesteps)?;

        if raw.methods != METHOD_COUNT {
            return Err(ParametersError::UnsupportedMethodCount(raw.methods));
        }

        let cells = raw
            .consumers
            .checked_mul(raw.methods)
            .and_then(|n| n.checked_mul(raw.timesteps));

        if cells.and_then(count_as_f64).is_none() {
            return Err(ParametersError::LatticeTooLarge {
                consumers: raw.consumers,
                timesteps: raw.timesteps,
            });
        }

        let granularity = match (raw.months_in_timestep, raw.soap_purchase_per_yr) {
            (Some(months), None) => Granularity::MonthsPerTimestep(months),
            (None, Some(purchases)) => Granularity::PurchasesPerYear(purchases),
            (Some(_), Some(_)) => return Err(ParametersError::ConflictingGranularity),
            (None, None) => return Err(ParametersError::MissingGranularity),
        };

        let step = granularity.value();

        if !step.is_finite() || step <= 0.0 {
            return Err(ParametersError::NonPositiveGranularity(step));
        }

        ensure_per_method("emissions_grams", &raw.emissions_grams, raw.methods)?;
        ensure_per_method("costs_USD", &raw.costs_usd, raw.methods)?;
        validate_distribution(&raw.incomes, &raw.probabilities)?;

        if !(raw.percent_income > 0.0 && raw.percent_income <= 1.0) {
            return Err(ParametersError::PercentIncomeOutOfRange(raw.percent_income));
        }

        Ok(Self {
            consumers: raw.consumers,
            methods: raw.methods,
            timesteps: raw.timesteps,
            granularity,
            emissions_grams: raw.emissions_grams,
            costs_usd: raw.costs_usd,
            incomes: raw.incomes,
            probabilities: raw.probabilities,
            percent_income: raw.percent_income,
        })
    }
}

impl Parameters {
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

    /// Temporal granularity
    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Active affordability rule, selected by the granularity option.
    pub fn affordability_form(&self) -> AffordabilityForm {
        self.granularity.affordability_form()
    }

    /// Emissions in grams per use, indexed by method
    pub fn emissions_grams(&self) -> &[f64] {
        &self.emissions_grams
    }

    /// Cost in USD per use, indexed by method
    pub fn costs_usd(&self) -> &[f64] {
        &self.costs_usd
    }

    /// Income tiers
    pub fn incomes(&self) -> &[f64] {
        &self.incomes
    }

    /// Income tier selection probabilities
    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    /// Fraction of income available for hand soap
    pub fn percent_income(&self) -> f64 {
        self.percent_income
    }

    /// Length of the modelled horizon in years.
    ///
    /// Only defined when the granularity is expressed in months.
    pub fn years_modeled(&self) -> Option<f64> {
        match self.granularity {
            Granularity::MonthsPerTimestep(months) => {
                count_as_f64(self.timesteps).map(|timesteps| months * timesteps / 12.0)
            }
            Granularity::PurchasesPerYear(_) => None,
        }
    }

    /// Spending limit for a consumer with the given income under the active
    /// affordability form.
    ///
    /// For the per-use form this is the budget for a single purchase, for the
    /// per-horizon form it is the cumulative budget for the whole horizon.
    pub fn budget_for(&self, income: f64) -> f64 {
        let annual = self.percent_income * income;

        match self.granularity {
            Granularity::PurchasesPerYear(purchases) => annual / purchases,
            Granularity::MonthsPerTimestep(_) => annual * self.years_modeled().unwrap_or(0.0),
        }
    }

    /// Whether `income` is one of the configured tiers.
    pub fn is_income_tier(&self, income: f64) -> bool {
        self.incomes.iter().any(|tier| same_amount(*tier, income))
    }
}

/// Check that income tiers and their probabilities describe a valid distribution.
///
/// # Errors
///
/// Returns a [`ParametersError`] when the sequences are empty or differ in length,
/// when any tier is not positive, or when the probabilities are negative or do not
/// sum to one.
pub fn validate_distribution(tiers: &[f64], probabilities: &[f64]) -> Result<(), ParametersError> {
    if tiers.is_empty() {
        return Err(ParametersError::Empty("incomes"));
    }

    if probabilities.len() != tiers.len() {
        return Err(ParametersError::LengthMismatch {
            field: "probabilities",
            expected: tiers.len(),
            found: probabilities.len(),
        });
    }

    for (index, value) in tiers.iter().copied().enumerate() {
        if !value.is_finite() || value <= 0.0 {
            return Err(ParametersError::NonPositiveIncome { index, value });
        }
    }

    ensure_non_negative("probabilities", probabilities)?;

    let sum: f64 = probabilities.iter().sum();

    if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
        return Err(ParametersError::ProbabilitySum(sum));
    }

    Ok(())
}

/// Convert a validated count into a solver coefficient without precision loss.
pub(crate) fn count_as_f64(count: usize) -> Option<f64> {
    u32::try_from(count).ok().map(f64::from)
}

/// Compare two monetary amounts allowing for float noise.
pub(crate) fn same_amount(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

fn ensure_count(field: &'static str, value: usize) -> Result<(), ParametersError> {
    if value == 0 {
        return Err(ParametersError::ZeroCount { field });
    }

    if count_as_f64(value).is_none() {
        return Err(ParametersError::CountTooLarge { field, value });
    }

    Ok(())
}

fn ensure_per_method(
    field: &'static str,
    values: &[f64],
    methods: usize,
) -> Result<(), ParametersError> {
    if values.len() != methods {
        return Err(ParametersError::LengthMismatch {
            field,
            expected: methods,
            found: values.len(),
        });
    }

    ensure_non_negative(field, values)
}

fn ensure_non_negative(field: &'static str, values: &[f64]) -> Result<(), ParametersError> {
    for (index, value) in values.iter().copied().enumerate() {
        if !value.is_finite() || value < 0.0 {
            return Err(ParametersError::Negative {
                field,
                index,
                value,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use testresult::TestResult;

    use super::*;

    pub(crate) fn handsoap_raw() -> RawParameters {
        RawParameters {
            consumers: 10,
            methods: 3,
            timesteps: 12,
            months_in_timestep: Some(3.0),
            soap_purchase_per_yr: None,
            emissions_grams: vec![578.4, 0.653, 82.8],
            costs_usd: vec![15.0, 6.0, 5.0],
            incomes: vec![25_000.0, 75_000.0, 125_000.0, 175_000.0],
            probabilities: vec![0.442, 0.347, 0.145, 0.066],
            percent_income: 0.05,
        }
    }

    #[test]
    fn valid_parameters_are_accepted() -> TestResult {
        let params = Parameters::try_from(handsoap_raw())?;

        assert_eq!(params.consumers(), 10);
        assert_eq!(params.affordability_form(), AffordabilityForm::PerHorizon);
        assert_eq!(params.years_modeled(), Some(3.0));

        Ok(())
    }

    #[test]
    fn oversized_lattice_is_rejected() {
        let raw = RawParameters {
            consumers: 100_000,
            timesteps: 100_000,
            ..handsoap_raw()
        };

        assert_eq!(
            Parameters::try_from(raw),
            Err(ParametersError::LatticeTooLarge {
                consumers: 100_000,
                timesteps: 100_000,
            })
        );

        let overflowing = RawParameters {
            consumers: usize::try_from(u32::MAX).unwrap_or(usize::MAX),
            timesteps: usize::try_from(u32::MAX).unwrap_or(usize::MAX),
            ..handsoap_raw()
        };

        assert!(matches!(
            Parameters::try_from(overflowing),
            Err(ParametersError::LatticeTooLarge { .. })
        ));
    }

    #[test]
    fn purchase_rate_selects_per_use_form() -> TestResult {
        let raw = RawParameters {
            months_in_timestep: None,
            soap_purchase_per_yr: Some(12.0),
            ..handsoap_raw()
        };

        let params = Parameters::try_from(raw)?;

        assert_eq!(params.affordability_form(), AffordabilityForm::PerUse);
        assert_eq!(params.years_modeled(), None);

        // 5% of 24,000 spread over 12 purchases
        assert!((params.budget_for(24_000.0) - 100.0).abs() < 1e-9);

        Ok(())
    }

    #[test]
    fn horizon_budget_scales_with_years_modeled() -> TestResult {
        let params = Parameters::try_from(handsoap_raw())?;

        // 5% of 25,000 per year over 3 years
        assert!((params.budget_for(25_000.0) - 3_750.0).abs() < 1e-9);

        Ok(())
    }

    #[test]
    fn granularity_options_are_mutually_exclusive() {
        let both = RawParameters {
            soap_purchase_per_yr: Some(12.0),
            ..handsoap_raw()
        };

        let neither = RawParameters {
            months_in_timestep: None,
            ..handsoap_raw()
        };

        assert_eq!(
            Parameters::try_from(both).err(),
            Some(ParametersError::ConflictingGranularity)
        );
        assert_eq!(
            Parameters::try_from(neither).err(),
            Some(ParametersError::MissingGranularity)
        );
    }

    #[test]
    fn zero_counts_are_rejected() {
        let raw = RawParameters {
            timesteps: 0,
            ..handsoap_raw()
        };

        assert_eq!(
            Parameters::try_from(raw).err(),
            Some(ParametersError::ZeroCount { field: "timesteps" })
        );
    }

    #[test]
    fn method_count_other_than_three_is_rejected() {
        let raw = RawParameters {
            methods: 2,
            ..handsoap_raw()
        };

        assert_eq!(
            Parameters::try_from(raw).err(),
            Some(ParametersError::UnsupportedMethodCount(2))
        );
    }

    #[test]
    fn per_method_sequences_must_match_method_count() {
        let raw = RawParameters {
            costs_usd: vec![15.0, 6.0],
            ..handsoap_raw()
        };

        assert_eq!(
            Parameters::try_from(raw).err(),
            Some(ParametersError::LengthMismatch {
                field: "costs_USD",
                expected: 3,
                found: 2,
            })
        );
    }

    #[test]
    fn negative_emissions_are_rejected() {
        let raw = RawParameters {
            emissions_grams: vec![578.4, -1.0, 82.8],
            ..handsoap_raw()
        };

        assert!(matches!(
            Parameters::try_from(raw),
            Err(ParametersError::Negative {
                field: "emissions_grams",
                index: 1,
                ..
            })
        ));
    }

    #[test]
    fn probabilities_must_sum_to_one() {
        let raw = RawParameters {
            probabilities: vec![0.5, 0.3, 0.1, 0.05],
            ..handsoap_raw()
        };

        assert!(matches!(
            Parameters::try_from(raw),
            Err(ParametersError::ProbabilitySum(_))
        ));
    }

    #[test]
    fn probabilities_must_match_tiers() {
        let err = validate_distribution(&[1.0, 2.0], &[1.0]).err();

        assert_eq!(
            err,
            Some(ParametersError::LengthMismatch {
                field: "probabilities",
                expected: 2,
                found: 1,
            })
        );
    }

    #[test]
    fn percent_income_must_be_in_unit_interval() {
        for percent_income in [0.0, -0.1, 1.5, f64::NAN] {
            let raw = RawParameters {
                percent_income,
                ..handsoap_raw()
            };

            assert!(
                matches!(
                    Parameters::try_from(raw),
                    Err(ParametersError::PercentIncomeOutOfRange(_))
                ),
                "percent_income {percent_income} should be rejected"
            );
        }
    }

    #[test]
    fn method_indices_round_trip() {
        for method in Method::ALL {
            assert_eq!(Method::from_index(method.index()), Some(method));
        }

        assert_eq!(Method::from_index(3), None);
    }

    #[test]
    fn income_tier_membership_tolerates_float_noise() -> TestResult {
        let params = Parameters::try_from(handsoap_raw())?;

        assert!(params.is_income_tier(75_000.000_000_1));
        assert!(!params.is_income_tier(80_000.0));

        Ok(())
    }
}
