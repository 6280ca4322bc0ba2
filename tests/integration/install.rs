use crate::common::cpm;
use cpm_cli::test_utils::{ManifestFixture, TestProject};
use predicates::prelude::*;
use std::path::Path;
use std::process::Command;

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args(["-c", "user.name=cpm", "-c", "user.email=cpm@example.com", "-c", "init.defaultBranch=main"])
        .args(args)
        .current_dir(dir)
        .status()
        .unwrap();
    assert!(status.success(), "git {args:?} failed");
}

/// A local repository with tags v1.0.0 and v1.1.0 of the web-kit package.
fn web_kit_repository(root: &Path) -> std::path::PathBuf {
    let repo = root.join("web-kit");
    std::fs::create_dir_all(repo.join("templates")).unwrap();
    git(&repo, &["init", "--quiet"]);

    std::fs::write(repo.join("cpm-package.json"), ManifestFixture::web()).unwrap();
    git(&repo, &["add", "."]);
    git(&repo, &["commit", "--quiet", "-m", "v1.0.0"]);
    git(&repo, &["tag", "v1.0.0"]);

    std::fs::write(repo.join("README.md"), "web kit\n").unwrap();
    git(&repo, &["add", "."]);
    git(&repo, &["commit", "--quiet", "-m", "v1.1.0"]);
    git(&repo, &["tag", "v1.1.0"]);
    repo
}

#[test]
fn test_install_from_local_repository() {
    let project = TestProject::new().unwrap();
    let repo = web_kit_repository(project.temp_dir.path());
    project
        .write_config(&format!(
            r#"{{ "packages": [{{ "repository": "{}", "version": "~1.0" }}], "components": {{ "server": {{}} }} }}"#,
            repo.display()
        ))
        .unwrap();

    cpm(&project).arg("install").assert().success().stdout(predicate::str::contains("1 fetched, 0 up to date"));

    assert!(project.file_exists(".cpm/packages/web-kit/cpm-package.json"));
    assert!(!project.file_exists(".cpm/packages/web-kit/README.md"));
    let lockfile = project.read_file("cpm.lock").unwrap();
    assert!(lockfile.contains(r#""version": "v1.0.0""#));
    assert!(lockfile.contains(r#""specifier": "~1.0""#));

    cpm(&project).arg("install").assert().success().stdout(predicate::str::contains("0 fetched, 1 up to date"));

    cpm(&project)
        .args(["vars", "server"])
        .assert()
        .success()
        .stdout(predicate::str::contains("builtin.package.version = v1.0.0"));
}

#[test]
fn test_install_unknown_version() {
    let project = TestProject::new().unwrap();
    let repo = web_kit_repository(project.temp_dir.path());
    project
        .write_config(&format!(
            r#"{{ "packages": [{{ "repository": "{}", "version": "^2.0" }}] }}"#,
            repo.display()
        ))
        .unwrap();

    cpm(&project).arg("install").assert().failure().stderr(predicate::str::contains("matches '^2.0'"));
}
