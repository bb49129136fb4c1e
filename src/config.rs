//! Run Configuration
//!
//! A run is described by a YAML document holding the model parameters, an
//! optional sampler seed and pass-through solver options:
//!
//! ```yaml
//! parameters:
//!   consumers: 10
//!   methods: 3
//!   timesteps: 12
//!   months_in_timestep: 3
//!   emissions_grams: [578.4, 0.653, 82.8]
//!   costs_USD: [15, 6, 5]
//!   incomes: [25000, 75000, 125000, 175000]
//!   probabilities: [0.442, 0.347, 0.145, 0.066]
//!   percent_income: 0.05
//! seed: 7
//! solver:
//!   log_to_console: false
//!   time_limit_seconds: 30
//! ```

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    params::{Parameters, ParametersError, RawParameters},
    solvers::SolverOptions,
};

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading the configuration file
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// The parameters failed validation
    #[error("Invalid parameters: {0}")]
    Parameters(#[from] ParametersError),
}

/// Everything needed for one optimize invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Model parameters, validated on use
    pub parameters: RawParameters,

    /// Seed for the income sampler
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Options forwarded to the solver backend
    #[serde(default)]
    pub solver: SolverOptions,
}

impl RunConfig {
    /// Parse a configuration from YAML.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError::Yaml`] if the document is malformed or has
    /// unknown fields.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_norway::from_str(yaml)?)
    }

    /// Read and parse a configuration file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let yaml = fs::read_to_string(path)?;

        Self::from_yaml_str(&yaml)
    }

    /// Validate and return the model parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parameters`] if any validation rule fails.
    pub fn parameters(&self) -> Result<Parameters, ConfigError> {
        Ok(Parameters::try_from(self.parameters.clone())?)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;
    use testresult::TestResult;

    use crate::params::{AffordabilityForm, tests::handsoap_raw};

    use super::*;

    const HANDSOAP: &str = "
parameters:
  consumers: 10
  methods: 3
  timesteps: 12
  months_in_timestep: 3
  emissions_grams: [578.4, 0.653, 82.8]
  costs_USD: [15, 6, 5]
  incomes: [25000, 75000, 125000, 175000]
  probabilities: [0.442, 0.347, 0.145, 0.066]
  percent_income: 0.05
seed: 7
";

    #[test]
    fn parses_parameters_and_seed() -> TestResult {
        let config = RunConfig::from_yaml_str(HANDSOAP)?;

        assert_eq!(config.parameters, handsoap_raw());
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.solver, SolverOptions::default());

        let params = config.parameters()?;

        assert_eq!(params.affordability_form(), AffordabilityForm::PerHorizon);

        Ok(())
    }

    #[test]
    fn reads_from_file() -> TestResult {
        let mut file = NamedTempFile::new()?;
        file.write_all(HANDSOAP.as_bytes())?;

        let config = RunConfig::from_path(file.path())?;

        assert_eq!(config.parameters.consumers, 10);

        Ok(())
    }

    #[test]
    fn solver_options_are_read() -> TestResult {
        let yaml = format!("{HANDSOAP}solver:\n  log_to_console: true\n  time_limit_seconds: 2.5\n");

        let config = RunConfig::from_yaml_str(&yaml)?;

        assert!(config.solver.log_to_console);
        assert_eq!(config.solver.time_limit_seconds, Some(2.5));

        Ok(())
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let yaml = format!("{HANDSOAP}threads: 4\n");

        assert!(matches!(
            RunConfig::from_yaml_str(&yaml),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            RunConfig::from_path("does/not/exist.yml"),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn invalid_parameters_surface_on_validation() -> TestResult {
        let yaml = HANDSOAP.replace("percent_income: 0.05", "percent_income: 1.5");

        let config = RunConfig::from_yaml_str(&yaml)?;

        assert!(matches!(
            config.parameters(),
            Err(ConfigError::Parameters(
                ParametersError::PercentIncomeOutOfRange(_)
            ))
        ));

        Ok(())
    }
}
