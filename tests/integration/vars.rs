use crate::common::{cpm, shop};
use predicates::prelude::*;

#[test]
fn test_vars_lists_effective_values() {
    let project = shop(Some("secret"));

    cpm(&project)
        .args(["vars", "postgres"])
        .assert()
        .success()
        .stdout(predicate::str::contains("db.port = 5432"))
        .stdout(predicate::str::contains("db.password = secret"))
        .stdout(predicate::str::contains("db.url = postgres://localhost:5432/app"))
        .stdout(predicate::str::contains("builtin.component.id = postgres"))
        .stdout(predicate::str::contains("builtin.package.github.org = acme"));
}

#[test]
fn test_vars_package_override_and_constant() {
    let project = shop(Some("secret"));

    cpm(&project)
        .args(["vars", "server"])
        .assert()
        .success()
        .stdout(predicate::str::contains("web.port = 9090"))
        .stdout(predicate::str::contains("web.greeting = hello"))
        .stdout(predicate::str::contains("db.port = 5432"))
        .stdout(predicate::str::contains("db.password").not());
}

#[test]
fn test_vars_as_environment() {
    let project = shop(Some("secret"));

    cpm(&project)
        .args(["vars", "postgres", "--env"])
        .assert()
        .success()
        .stdout(predicate::str::contains("db_port=5432"))
        .stdout(predicate::str::contains("builtin_package_version=^1.0"))
        .stdout(predicate::str::contains("builtin_component_id=postgres"));
}

#[test]
fn test_vars_reports_missing_variable() {
    let project = shop(None);

    cpm(&project)
        .args(["vars", "postgres"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid variable configuration for component 'postgres'"))
        .stderr(predicate::str::contains("db.password (string): Superuser password"));
}

#[test]
fn test_vars_reports_wrong_type() {
    let project = shop(Some("secret"));
    project
        .write_config(
            r#"{
  "packages": [{ "name": "db-kit", "repository": "https://github.com/acme/db-kit.git", "version": "1.0.0" }],
  "variables": { "db.port": "not a number" },
  "components": { "postgres": { "variables": { "db.password": "secret" } } }
}"#,
        )
        .unwrap();

    cpm(&project)
        .args(["vars", "postgres"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("db.port: expected number, got string"));
}

#[test]
fn test_vars_unknown_component() {
    let project = shop(Some("secret"));

    cpm(&project)
        .args(["vars", "redis"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Component not found: redis"));
}

#[test]
fn test_vars_without_project() {
    let dir = tempfile::tempdir().unwrap();

    assert_cmd::Command::cargo_bin("cpm")
        .unwrap()
        .current_dir(dir.path())
        .env("NO_COLOR", "1")
        .args(["vars", "postgres"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No cpm.json found"));
}
