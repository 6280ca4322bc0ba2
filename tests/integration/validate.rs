use crate::common::{cpm, shop};
use predicates::prelude::*;

#[test]
fn test_validate_valid_project() {
    let project = shop(Some("secret"));

    cpm(&project)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ postgres"))
        .stdout(predicate::str::contains("✓ server"))
        .stdout(predicate::str::contains("Configuration is valid"));
}

#[test]
fn test_validate_reports_every_component() {
    let project = shop(None);

    cpm(&project)
        .arg("validate")
        .assert()
        .failure()
        .stdout(predicate::str::contains("✗ Invalid variable configuration for component 'postgres'"))
        .stdout(predicate::str::contains("✓ server"))
        .stderr(predicate::str::contains("Validation failed with 1 problem(s)"));
}

#[test]
fn test_validate_strict_rejects_unused() {
    let project = shop(Some("secret"));
    let config = project.read_file("cpm.json").unwrap();
    project
        .write_config(&config.replace(r#""web.port": 9090"#, r#""web.port": 9090, "web.typo": 1"#))
        .unwrap();

    cpm(&project).arg("validate").assert().success();

    cpm(&project)
        .args(["validate", "--strict"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Unused variables"))
        .stdout(predicate::str::contains("web.typo"));
}

#[test]
fn test_validate_strict_with_project_value_for_one_component() {
    let project = shop(Some("secret"));
    let config = project.read_file("cpm.json").unwrap();
    project
        .write_config(&config.replace(r#""packageVariables""#, r#""variables": { "web.port": 9191 },
  "packageVariables""#))
        .unwrap();

    cpm(&project)
        .args(["validate", "--strict"])
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ postgres"))
        .stdout(predicate::str::contains("✓ server"));
}

#[test]
fn test_validate_unknown_component_in_config() {
    let project = shop(Some("secret"));
    let config = project.read_file("cpm.json").unwrap();
    project.write_config(&config.replace(r#""server": {}"#, r#""server": {}, "redis": {}"#)).unwrap();

    cpm(&project)
        .arg("validate")
        .assert()
        .failure()
        .stdout(predicate::str::contains("Component 'redis' in cpm.json is not provided by any package"));
}
