//! Global constants used throughout the CPM codebase.
//!
//! File names, directory layout, and timing parameters shared by the
//! project loader, the installer, and the process sequencer.

use std::time::Duration;

/// Project configuration file name, looked up from the working directory upwards.
pub const PROJECT_CONFIG_FILE: &str = "cpm.json";

/// Lockfile recording the exact version each package was installed at.
pub const LOCKFILE_NAME: &str = "cpm.lock";

/// Manifest file every package carries at its repository root.
pub const PACKAGE_MANIFEST_FILE: &str = "cpm-package.json";

/// Directory (relative to the project root) where packages are checked out.
pub const PACKAGES_DIR: &str = ".cpm/packages";

/// Current lockfile format version.
pub const LOCKFILE_VERSION: u32 = 1;

/// Default delay between dependency checks in the process sequencer (500ms).
///
/// The sequencer also wakes up early whenever the awaited dependency changes
/// state, so this is an upper bound on each individual wait.
pub const DEFAULT_DEPENDENCY_WAIT: Duration = Duration::from_millis(500);

/// Timeout for Git clone operations (120 seconds).
pub const GIT_CLONE_TIMEOUT: Duration = Duration::from_secs(120);

/// Timeout for Git fetch and ls-remote operations (60 seconds).
pub const GIT_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Prefix of every built-in variable name.
pub const BUILTIN_PREFIX: &str = "builtin.";
