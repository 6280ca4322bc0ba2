use assert_cmd::Command;
use cpm_cli::test_utils::{ManifestFixture, TestProject};

/// `cpm` with colors disabled, run in `project`.
pub fn cpm(project: &TestProject) -> Command {
    let mut cmd = Command::cargo_bin("cpm").unwrap();
    cmd.current_dir(project.path()).env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

/// A project using `postgres` from `db-kit` and `server` from `web-kit`.
pub fn shop(password: Option<&str>) -> TestProject {
    let project = TestProject::new().unwrap();
    project.install_package("db-kit", &ManifestFixture::postgres()).unwrap();
    project.install_package("web-kit", &ManifestFixture::web()).unwrap();

    let postgres = match password {
        Some(pw) => format!(r#"{{ "variables": {{ "db.password": "{pw}" }} }}"#),
        None => "{}".to_string(),
    };
    project
        .write_config(&format!(
            r#"{{
  "packages": [
    {{ "name": "db-kit", "repository": "https://github.com/acme/db-kit.git", "version": "^1.0" }},
    {{ "repository": "https://github.com/acme/web-kit.git", "version": "main" }}
  ],
  "packageVariables": {{ "web-kit": {{ "web.port": 9090 }} }},
  "components": {{
    "postgres": {postgres},
    "server": {{}}
  }}
}}"#
        ))
        .unwrap();
    project
}
