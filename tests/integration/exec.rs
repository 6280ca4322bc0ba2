use crate::common::{cpm, shop};
use predicates::prelude::*;

#[cfg(unix)]
#[test]
fn test_exec_substitutes_arguments() {
    let project = shop(Some("secret"));
    project
        .write_package_script("db-kit", "bin/psql.sh", r#"echo "psql $* as $builtin_component_id""#)
        .unwrap();

    cpm(&project)
        .args(["exec", "postgres", "psql", "--", "-c", "select 1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("psql --port 5432 -c select 1 as postgres"));
}

#[cfg(unix)]
#[test]
fn test_exec_propagates_exit_code() {
    let project = shop(Some("secret"));
    project.write_package_script("db-kit", "bin/psql.sh", "exit 3").unwrap();

    cpm(&project).args(["exec", "postgres", "psql"]).assert().code(3);
}

#[test]
fn test_exec_unknown_program() {
    let project = shop(Some("secret"));

    cpm(&project)
        .args(["exec", "postgres", "pg_dump"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Component 'postgres' has no program 'pg_dump'"));
}

#[test]
fn test_exec_missing_executable() {
    let project = shop(Some("secret"));

    cpm(&project)
        .args(["exec", "postgres", "psql"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Executable 'bin/psql.sh' for 'postgres/psql' not found"));
}
