//! Sample package manifests.

/// Ready-made `cpm-package.json` documents.
pub struct ManifestFixture;

impl ManifestFixture {
    /// A runtime component with a project-scoped port, a required password,
    /// a migration program, a post-init hook, and a templated file.
    pub fn postgres() -> String {
        r#"{
  "components": [
    {
      "id": "postgres",
      "type": "runtime",
      "description": "PostgreSQL for local development",
      "variables": [
        { "name": "db.port", "type": "number", "scope": "project", "default": 5432, "description": "Listening port" },
        { "name": "db.password", "type": "string", "description": "Superuser password" },
        { "name": "db.url", "type": "string", "default": "postgres://localhost:${{ db.port }}/app" }
      ],
      "programs": [
        { "id": "psql", "executable": "bin/psql.sh", "args": ["--port", "${{ db.port }}"] }
      ],
      "onPostInit": [],
      "files": [
        { "source": "templates/db.env", "target": "config/${{ builtin.component.id }}.env" }
      ],
      "start": [
        { "id": "db", "executable": "bin/db.sh", "startupLine": "ready to accept connections" },
        { "id": "seed", "executable": "bin/seed.sh", "dependsOn": "db" }
      ],
      "stop": [
        { "id": "db-stop", "executable": "bin/db-stop.sh" }
      ]
    }
  ]
}"#
        .to_string()
    }

    /// A setup component consuming the project-scoped port of [`postgres`](Self::postgres).
    pub fn web() -> String {
        r#"{
  "components": [
    {
      "id": "server",
      "type": "setup",
      "variables": [
        { "name": "web.port", "type": "number", "default": 8080 },
        { "name": "web.greeting", "type": "string", "value": "hello" }
      ],
      "programs": [
        { "id": "show", "executable": "bin/show.sh", "args": ["${{ web.port }}"] }
      ]
    }
  ]
}"#
        .to_string()
    }

    /// A manifest with no components.
    pub fn empty() -> String {
        r#"{ "components": [] }"#.to_string()
    }
}
