//! Integration tests for the command line interface

use std::{io::Write, process::Command};

use tempfile::NamedTempFile;
use testresult::TestResult;

fn lather() -> Command {
    Command::new(env!("CARGO_BIN_EXE_lather"))
}

fn fixture(name: &str) -> String {
    format!("{}/fixtures/{name}", env!("CARGO_MANIFEST_DIR"))
}

#[test]
fn validate_prints_budgets_per_tier() -> TestResult {
    let output = lather()
        .args(["validate", "--config", &fixture("handsoap.yml")])
        .output()?;

    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout)?;

    assert!(stdout.contains("per-horizon affordability"));
    assert!(stdout.contains("income 25000: budget 3750.00 USD"));

    Ok(())
}

#[test]
fn run_prints_report() -> TestResult {
    let output = lather()
        .args(["run", "--config", &fixture("handsoap.yml"), "--seed", "3"])
        .output()?;

    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout)?;

    assert!(stdout.contains("Method adoption by timestep"));
    assert!(stdout.contains("Total emissions: 5855.830 g"));
    assert!(stdout.contains("seed 3"));

    Ok(())
}

#[test]
fn logging_flags_follow_the_subcommand() -> TestResult {
    let output = lather()
        .args([
            "run",
            "--config",
            &fixture("handsoap.yml"),
            "--log-format",
            "json",
            "--log-level",
            "info",
        ])
        .output()?;

    assert!(output.status.success());

    let stderr = String::from_utf8(output.stderr)?;

    assert!(stderr.contains(r#""message":"run finished""#));

    Ok(())
}

#[test]
fn time_limit_flag_overrides_run_file() -> TestResult {
    let config = fixture("handsoap-per-use.yml");

    let from_file = lather().args(["run", "--config", &config]).output()?;

    assert!(from_file.status.success());
    assert!(String::from_utf8(from_file.stdout)?.contains("solver time limit 60s"));

    let from_flag = lather()
        .args(["run", "--config", &config, "--time-limit", "5", "--solver-log"])
        .output()?;

    assert!(from_flag.status.success());

    let stdout = String::from_utf8(from_flag.stdout)?;

    assert!(stdout.contains("solver time limit 5s"));
    assert!(!stdout.contains("solver time limit 60s"));

    Ok(())
}

#[test]
fn bad_flags_exit_with_usage_status() -> TestResult {
    let output = lather()
        .args(["run", "--config", &fixture("handsoap.yml"), "--no-such-flag"])
        .output()?;

    assert_eq!(output.status.code(), Some(2));

    Ok(())
}

#[test]
fn infeasible_run_exits_with_status_three() -> TestResult {
    let yaml = std::fs::read_to_string(fixture("handsoap.yml"))?
        .replace("percent_income: 0.05", "percent_income: 0.000000001");

    let mut config = NamedTempFile::new()?;
    config.write_all(yaml.as_bytes())?;

    let output = lather()
        .args(["run", "--config"])
        .arg(config.path())
        .output()?;

    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8(output.stdout)?.contains("No solution: infeasible"));

    Ok(())
}

#[test]
fn invalid_config_fails() -> TestResult {
    let yaml = std::fs::read_to_string(fixture("handsoap.yml"))?.replace("methods: 3", "methods: 4");

    let mut config = NamedTempFile::new()?;
    config.write_all(yaml.as_bytes())?;

    let output = lather()
        .args(["validate", "--config"])
        .arg(config.path())
        .output()?;

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8(output.stderr)?.contains("Invalid parameters"));

    Ok(())
}
