//! Test utilities for CPM
//!
//! Helpers for writing tests against scratch projects: a temporary project
//! directory with `cpm.json`, installed packages under `.cpm/packages`, and
//! ready-made package manifests.
//!
//! # Example
//!
//! ```rust,no_run
//! use cpm_cli::test_utils::{ManifestFixture, TestProject};
//!
//! let project = TestProject::new().unwrap();
//! project.install_package("db-kit", &ManifestFixture::postgres()).unwrap();
//! project.write_config(r#"{ "packages": [], "components": { "postgres": {} } }"#).unwrap();
//! ```

pub mod environment;
pub mod fixtures;

pub use environment::TestProject;
pub use fixtures::ManifestFixture;

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Uses `level` when given, otherwise
/// `RUST_LOG`; without either, logging stays off.
///
/// ```bash
/// RUST_LOG=process=info,cpm_cli=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}
