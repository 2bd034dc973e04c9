use assert_cmd::prelude::*; // Add methods on commands
use assert_fs::prelude::*;
use predicates::prelude::*; // Used for writing assertions
use std::process::Command;

const SCHEMA: &str = r#"{
  "customers": {
    "columns": ["customerNumber", "customerName", "country", "creditLimit"],
    "primary_key": "customerNumber"
  },
  "orders": {
    "columns": ["orderNumber", "orderDate", "customerNumber"],
    "primary_key": "orderNumber",
    "foreign_keys": {"customerNumber": "customers.customerNumber"}
  }
}"#;

/// Runs the binary in an isolated directory with an empty settings file.
fn sqlguard(temp: &assert_fs::TempDir) -> Result<Command, Box<dyn std::error::Error>> {
    temp.child("schema.json").write_str(SCHEMA)?;
    temp.child("config.toml").write_str("")?;

    let mut cmd = Command::cargo_bin("sqlguard")?;
    cmd.current_dir(temp.path())
        .arg("--config")
        .arg(temp.child("config.toml").path());
    Ok(cmd)
}

#[test]
#[serial_test::serial(cli)]
fn validate_accepts_a_conforming_select() -> Result<(), Box<dyn std::error::Error>> {
    let temp = assert_fs::TempDir::new()?;
    let mut cmd = sqlguard(&temp)?;

    cmd.arg("validate")
        .arg("SELECT c.customerName, o.orderDate FROM customers c JOIN orders o ON c.customerNumber = o.customerNumber")
        .arg("--schema")
        .arg("schema.json");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Valid"));

    Ok(())
}

#[test]
#[serial_test::serial(cli)]
fn validate_rejects_stacked_statements() -> Result<(), Box<dyn std::error::Error>> {
    let temp = assert_fs::TempDir::new()?;
    let mut cmd = sqlguard(&temp)?;

    cmd.arg("validate")
        .arg("SELECT customerName FROM customers; DROP TABLE customers")
        .arg("--schema")
        .arg("schema.json");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Multiple SQL statements not allowed"))
        .stderr(predicate::str::contains("Rejected"));

    Ok(())
}

#[test]
#[serial_test::serial(cli)]
fn validate_reports_unknown_column_as_json() -> Result<(), Box<dyn std::error::Error>> {
    let temp = assert_fs::TempDir::new()?;
    let mut cmd = sqlguard(&temp)?;

    cmd.arg("validate")
        .arg("SELECT salary FROM customers")
        .arg("--schema")
        .arg("schema.json")
        .arg("--json");
    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("\"valid\": false"))
        .stdout(predicate::str::contains(
            "Column 'salary' not found in any table",
        ));

    Ok(())
}

#[test]
#[serial_test::serial(cli)]
fn validate_honors_join_override() -> Result<(), Box<dyn std::error::Error>> {
    let temp = assert_fs::TempDir::new()?;
    let mut cmd = sqlguard(&temp)?;

    cmd.arg("validate")
        .arg("SELECT c.customerName FROM customers c JOIN orders o ON c.customerNumber = o.customerNumber")
        .arg("--schema")
        .arg("schema.json")
        .arg("--max-joins")
        .arg("0");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Too many JOINs: 1 (max allowed: 0)"));

    Ok(())
}

#[test]
#[serial_test::serial(cli)]
fn validate_reads_query_from_file() -> Result<(), Box<dyn std::error::Error>> {
    let temp = assert_fs::TempDir::new()?;
    temp.child("query.sql")
        .write_str("DELETE FROM customers WHERE country = 'France'")?;
    let mut cmd = sqlguard(&temp)?;

    cmd.arg("validate")
        .arg("--file")
        .arg("query.sql")
        .arg("--schema")
        .arg("schema.json");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Only SELECT queries are allowed"));

    Ok(())
}

#[test]
#[serial_test::serial(cli)]
fn estimate_prints_metrics_as_json() -> Result<(), Box<dyn std::error::Error>> {
    let temp = assert_fs::TempDir::new()?;
    let mut cmd = sqlguard(&temp)?;

    cmd.arg("estimate")
        .arg("SELECT DISTINCT country FROM customers ORDER BY country")
        .arg("--json");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"estimated_complexity\": 3"))
        .stdout(predicate::str::contains("\"has_distinct\": true"));

    Ok(())
}

#[test]
#[serial_test::serial(cli)]
fn missing_config_file_fails() -> Result<(), Box<dyn std::error::Error>> {
    let temp = assert_fs::TempDir::new()?;
    let mut cmd = Command::cargo_bin("sqlguard")?;

    cmd.current_dir(temp.path())
        .arg("--config")
        .arg(temp.child("absent.toml").path())
        .arg("estimate")
        .arg("SELECT 1");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read settings"));

    Ok(())
}

#[test]
fn cannot_run_without_subcommand() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("sqlguard")?;
    cmd.assert().failure();
    Ok(())
}
