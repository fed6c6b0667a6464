use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_cli_quote() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("haulage"));
    cmd.args(["quote", "--weight", "1.2", "--service", "standard", "--value", "150"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"service\": \"standard\""))
        .stdout(predicate::str::contains("\"tax\": \"1.65\""))
        .stdout(predicate::str::contains("\"total\": \"22.25\""))
        .stdout(predicate::str::contains("\"currency\": \"USD\""));

    Ok(())
}

#[test]
fn test_cli_quote_with_config() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("haulage"));
    cmd.args(["--config", "tests/fixtures/config.json"])
        .args(["quote", "--weight", "1.2", "--value", "150"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"total\": \"20.6\""))
        .stdout(predicate::str::contains("\"currency\": \"EUR\""));

    Ok(())
}

#[test]
fn test_cli_quote_rejects_huge_weight() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("haulage"));
    cmd.args([
        "quote",
        "--weight",
        "79228162514264337593543950335",
        "--service",
        "international",
    ]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("package weight"))
        .stderr(predicate::str::contains("panicked").not());

    Ok(())
}

#[test]
fn test_cli_services() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("haulage"));
    cmd.arg("services");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"express\""))
        .stdout(predicate::str::contains("\"freight\""))
        .stdout(predicate::str::contains("\"international\""));

    Ok(())
}

#[test]
fn test_cli_create() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("haulage"));
    cmd.args(["create", "tests/fixtures/shipment.json"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"tracking_number\": \"EHE-"))
        .stdout(predicate::str::contains("\"status\": \"pending\""))
        .stdout(predicate::str::contains("Shipment created and awaiting pickup"))
        .stdout(predicate::str::contains("\"total\": \"22.25\""));

    let mut cmd = Command::new(cargo_bin!("haulage"));
    cmd.args(["--config", "tests/fixtures/config.json"])
        .args(["create", "tests/fixtures/shipment.json"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"tracking_number\": \"ACME-"));

    Ok(())
}

#[test]
fn test_cli_track_unknown() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("haulage"));
    cmd.args(["track", "EHE-20250104-99999"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("not found"));

    Ok(())
}

#[test]
fn test_cli_advance_requires_staff_role() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("haulage"));
    cmd.args([
        "advance",
        "EHE-20250104-12345",
        "--status",
        "picked_up",
        "--location",
        "New York",
        "--description",
        "Picked up",
    ]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Not authorized"));

    Ok(())
}

#[test]
fn test_cli_apply_updates() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("haulage"));
    cmd.args(["--role", "agent", "apply-updates", "tests/fixtures/updates.csv"]);

    // nothing has been created in this process, so every parsed row is rejected
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("tracking_number,status,events,outcome"))
        .stdout(predicate::str::contains(
            "EHE-20250104-12345,picked_up,,rejected: Shipment not found",
        ))
        .stdout(predicate::str::contains("not-a-number,in_transit,,rejected: "))
        .stdout(predicate::str::contains("teleported,,rejected: "))
        .stderr(predicate::str::contains("Error reading update"));

    Ok(())
}

#[test]
fn test_cli_rejects_bad_arguments() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("haulage"));
    cmd.args(["cancel", "not-a-uuid"]);
    cmd.assert().failure();

    let mut cmd = Command::new(cargo_bin!("haulage"));
    cmd.args(["--role", "superuser", "services"]);
    cmd.assert().failure();

    Ok(())
}
