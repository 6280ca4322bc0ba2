use crate::common::{cpm, shop};
use cpm_cli::test_utils::TestProject;
use predicates::prelude::*;
use std::time::{Duration, Instant};

fn write_scripts(project: &TestProject, db_body: &str) {
    project.write_package_script("db-kit", "bin/db.sh", db_body).unwrap();
    project
        .write_package_script("db-kit", "bin/seed.sh", r#"echo "seeding port $db_port"; touch seeded"#)
        .unwrap();
    project.write_package_script("db-kit", "bin/db-stop.sh", "touch stopped").unwrap();
}

#[test]
fn test_start_waits_for_startup_line() {
    let project = shop(Some("secret"));
    write_scripts(&project, r#"echo "listening on $db_port"; echo "ready to accept connections"; sleep 0.3"#);

    cpm(&project)
        .arg("start")
        .assert()
        .success()
        .stdout(predicate::str::contains("db exited with code 0"))
        .stdout(predicate::str::contains("seed exited with code 0"))
        .stderr(predicate::str::contains("[db] listening on 5432"))
        .stderr(predicate::str::contains("[seed] seeding port 5432"));

    assert!(project.package_dir("db-kit").join("seeded").exists());
}

#[test]
fn test_start_fails_when_dependency_fails() {
    let project = shop(Some("secret"));
    write_scripts(&project, "echo 'disk full' >&2; exit 2");

    cpm(&project)
        .arg("start")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot start 'seed': dependency 'db' exited with exit code 2"));

    assert!(!project.package_dir("db-kit").join("seeded").exists());
}

#[test]
fn test_stop_runs_stop_sequence() {
    let project = shop(Some("secret"));
    write_scripts(&project, "exit 0");

    cpm(&project).arg("stop").assert().success().stdout(predicate::str::contains("db-stop exited with code 0"));
    assert!(project.package_dir("db-kit").join("stopped").exists());
}

#[test]
fn test_start_detached_returns_immediately() {
    let project = shop(Some("secret"));
    write_scripts(&project, "sleep 1");

    let began = Instant::now();
    cpm(&project)
        .args(["start", "--detached"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Started 2 process(es) in the background"));
    assert!(began.elapsed() < Duration::from_secs(1));

    let seeded = project.package_dir("db-kit").join("seeded");
    let deadline = Instant::now() + Duration::from_secs(5);
    while !seeded.exists() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(50));
    }
    assert!(seeded.exists());
}

#[test]
fn test_start_without_runtime() {
    let project = shop(Some("secret"));
    project
        .write_config(
            r#"{
  "packages": [{ "repository": "https://github.com/acme/web-kit.git", "version": "main" }],
  "components": { "server": {} }
}"#,
        )
        .unwrap();

    cpm(&project)
        .arg("start")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No runtime component selected"));
}
