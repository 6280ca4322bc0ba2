//! Error handling for CPM
//!
//! This module provides the error types and user-friendly error reporting for the
//! Component Package Manager. The error system follows two principles:
//! 1. **Strongly-typed errors** for precise error handling in code
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! - [`CpmError`] - Enumerated error types for all failure cases in CPM
//! - [`ErrorContext`] - Wrapper that adds user-friendly messages and suggestions
//!
//! # Error Categories
//!
//! - **Configuration**: [`CpmError::InvalidVariables`], [`CpmError::ConstantRedefined`],
//!   [`CpmError::ComponentNotFound`], [`CpmError::ConfigNotFound`], ...
//! - **Processes**: [`CpmError::DependencyFailed`], [`CpmError::SpawnFailed`],
//!   [`CpmError::ExecutableNotFound`], [`CpmError::HookFailed`], ...
//! - **Git and versions**: [`CpmError::GitCommandError`], [`CpmError::VersionNotFound`], ...
//!
//! Validation errors are always aggregated: a single [`CpmError::InvalidVariables`]
//! lists every missing and wrongly-typed variable of a component so users can fix
//! their configuration in one go.
//!
//! # Examples
//!
//! ```rust,no_run
//! use cpm_cli::core::{CpmError, ErrorContext, user_friendly_error};
//!
//! fn start() -> anyhow::Result<()> {
//!     Err(CpmError::DependencyFailed {
//!         dependency: "db".to_string(),
//!         dependent: "api".to_string(),
//!         exit_code: Some(1),
//!     }
//!     .into())
//! }
//!
//! if let Err(e) = start() {
//!     user_friendly_error(e).display();
//! }
//! ```

use colored::Colorize;
use std::fmt;
use std::fmt::Write as _;
use thiserror::Error;

/// A declared variable that is required but has no configured value and no default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingVariable {
    /// Variable name
    pub name: String,
    /// Declared type (as written in the manifest)
    pub var_type: String,
    /// Human-readable description from the declaration
    pub description: String,
}

/// A configured variable whose value does not match its declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WronglyTypedVariable {
    /// Variable name
    pub name: String,
    /// Declared type
    pub expected: String,
    /// Type of the configured value
    pub actual: String,
}

/// The main error type for CPM operations
#[derive(Error, Debug, Clone)]
pub enum CpmError {
    /// One or more variables of a component failed validation.
    ///
    /// Every offending variable is listed; validation never stops at the first problem.
    #[error("{}", format_invalid_variables(component, missing, wrongly_typed, unused))]
    InvalidVariables {
        /// Component whose configuration was validated
        component: String,
        /// Required variables without value or default
        missing: Vec<MissingVariable>,
        /// Variables whose value has the wrong type
        wrongly_typed: Vec<WronglyTypedVariable>,
        /// Configured variables nothing consumes (only reported when the policy asks for it)
        unused: Vec<String>,
    },

    /// A constant variable was written a second time
    #[error("Constant variable '{name}' already set (redefined by component '{component}')")]
    ConstantRedefined {
        /// Variable name
        name: String,
        /// Component whose declaration attempted the second write
        component: String,
    },

    /// Component id not provided by any installed package
    #[error("Component not found: {id}")]
    ComponentNotFound {
        /// The requested component id
        id: String,
    },

    /// Two components share the same id
    #[error("Component id '{id}' is declared by both '{first}' and '{second}'")]
    DuplicateComponent {
        /// The duplicated component id
        id: String,
        /// Package that declared it first
        first: String,
        /// Package that declared it again
        second: String,
    },

    /// Program id not declared by the component
    #[error("Component '{component}' has no program '{program}'")]
    ProgramNotFound {
        /// Component id
        component: String,
        /// Program id
        program: String,
    },

    /// Project configuration could not be located
    #[error("No {file} found in {searched} or any parent directory")]
    ConfigNotFound {
        /// Config file name
        file: String,
        /// Directory where the search started
        searched: String,
    },

    /// A manifest or configuration document is malformed
    #[error("Failed to parse {file}: {reason}")]
    ManifestParseError {
        /// File that failed to parse
        file: String,
        /// Parser message
        reason: String,
    },

    /// Package listed in the configuration has not been installed yet
    #[error("Package '{name}' is not installed")]
    PackageNotInstalled {
        /// Package name
        name: String,
    },

    /// Runtime component could not be determined
    #[error("No runtime component selected: {reason}")]
    NoRuntime {
        /// Why selection failed
        reason: String,
    },

    /// A process dependency terminated unsuccessfully before its dependent could start
    #[error("Cannot start '{dependent}': dependency '{dependency}' exited with {}", describe_exit(*exit_code))]
    DependencyFailed {
        /// The dependency that failed
        dependency: String,
        /// The item that could not start
        dependent: String,
        /// Exit code of the dependency (None when killed by a signal)
        exit_code: Option<i32>,
    },

    /// A `dependsOn` references an id that is not part of the sequence
    #[error("Process '{dependent}' depends on unknown process '{dependency}'")]
    UnknownDependency {
        /// The missing id
        dependency: String,
        /// The item declaring the dependency
        dependent: String,
    },

    /// Processes of a sequence depend on each other in a loop
    #[error("Circular process dependency: {chain}")]
    DependencyCycle {
        /// The ids forming the loop, joined with " -> "
        chain: String,
    },

    /// Two processes of a sequence share an id
    #[error("Process id '{id}' is declared twice in the same sequence")]
    DuplicateProcess {
        /// The duplicated id
        id: String,
    },

    /// Startup line is not a valid regular expression
    #[error("Invalid startup line for process '{id}': {reason}")]
    InvalidStartupLine {
        /// Process id
        id: String,
        /// Regex error
        reason: String,
    },

    /// Executable could not be located
    #[error("Executable '{executable}' for '{id}' not found")]
    ExecutableNotFound {
        /// Process or program id
        id: String,
        /// Executable as declared
        executable: String,
    },

    /// The OS refused to spawn the process
    #[error("Failed to spawn '{id}' ({executable}): {reason}")]
    SpawnFailed {
        /// Process or program id
        id: String,
        /// Resolved executable
        executable: String,
        /// OS error
        reason: String,
    },

    /// A post-init hook exited unsuccessfully
    #[error("Post-init hook '{hook}' of component '{component}' exited with {}", describe_exit(*exit_code))]
    HookFailed {
        /// Component id
        component: String,
        /// Referenced program id
        hook: String,
        /// Exit code (None when killed by a signal)
        exit_code: Option<i32>,
    },

    /// A templated file would be written outside the project
    #[error("File target '{target}' of component '{component}' is outside the project")]
    InvalidFileTarget {
        /// Component id
        component: String,
        /// Target after substitution
        target: String,
    },

    /// Git executable not found in PATH
    #[error("Git is not installed or not found in PATH")]
    GitNotFound,

    /// Git operation failed during execution
    #[error("Git operation failed: {operation}")]
    GitCommandError {
        /// The git operation that failed (e.g., "clone", "ls-remote")
        operation: String,
        /// The error output from the git command
        stderr: String,
    },

    /// No tag or branch satisfies the version specifier
    #[error("No version of '{repository}' matches '{specifier}'")]
    VersionNotFound {
        /// Repository URL
        repository: String,
        /// Requested specifier
        specifier: String,
    },

    /// Other error
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
    },
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "a signal".to_string(),
    }
}

fn format_invalid_variables(
    component: &str,
    missing: &[MissingVariable],
    wrongly_typed: &[WronglyTypedVariable],
    unused: &[String],
) -> String {
    let mut message = format!("Invalid variable configuration for component '{component}':");

    if !missing.is_empty() {
        message.push_str("\n  Missing variables:");
        for var in missing {
            let _ = write!(message, "\n    - {} ({}): {}", var.name, var.var_type, var.description);
        }
    }

    if !wrongly_typed.is_empty() {
        message.push_str("\n  Wrongly typed variables:");
        for var in wrongly_typed {
            let _ = write!(
                message,
                "\n    - {}: expected {}, got {}",
                var.name, var.expected, var.actual
            );
        }
    }

    if !unused.is_empty() {
        message.push_str("\n  Unused variables:");
        for name in unused {
            let _ = write!(message, "\n    - {name}");
        }
    }

    message
}

/// Error wrapper that carries a suggestion and details for display.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying CPM error
    pub error: CpmError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: CpmError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr: error in red, details in yellow, suggestion in green.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Attach a suggestion and details appropriate for the given error.
#[must_use]
pub fn create_error_context(error: CpmError) -> ErrorContext {
    match &error {
        CpmError::InvalidVariables { .. } => ErrorContext::new(error)
            .with_suggestion(
                "Set the listed variables in cpm.json under 'variables', 'packageVariables' or 'components.<id>.variables'",
            )
            .with_details("Every required variable without a default must be configured with a value of its declared type"),
        CpmError::ConstantRedefined { .. } => ErrorContext::new(error)
            .with_suggestion("Remove the override from cpm.json or stop using one of the conflicting components")
            .with_details("Constant variables are fixed by the component that declares them"),
        CpmError::ConfigNotFound { .. } => ErrorContext::new(error)
            .with_suggestion("Create a cpm.json in your project directory or pass --project-dir"),
        CpmError::PackageNotInstalled { .. } => ErrorContext::new(error)
            .with_suggestion("Run 'cpm install' to fetch the packages listed in cpm.json"),
        CpmError::DependencyFailed { .. } => ErrorContext::new(error)
            .with_details("Processes that already started are left running; interrupt or run 'cpm stop' to tear them down"),
        CpmError::ExecutableNotFound { .. } => ErrorContext::new(error)
            .with_suggestion("Check the executable path in the package manifest and that the package is installed"),
        CpmError::GitNotFound => ErrorContext::new(error)
            .with_suggestion("Install git from https://git-scm.com/ and make sure it is in your PATH"),
        CpmError::VersionNotFound { .. } => ErrorContext::new(error)
            .with_suggestion("Check the 'version' field in cpm.json against the tags of the repository"),
        _ => ErrorContext::new(error),
    }
}

/// Convert any error into an [`ErrorContext`] suitable for display.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(cpm_error) = error.downcast_ref::<CpmError>() {
        return create_error_context(cpm_error.clone());
    }

    if let Some(json_error) = error.downcast_ref::<serde_json::Error>() {
        return ErrorContext::new(CpmError::ManifestParseError {
            file: "JSON document".to_string(),
            reason: json_error.to_string(),
        })
        .with_suggestion("Check the JSON syntax: quotes, commas and brackets");
    }

    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            let _ = write!(message, "\n  {}: {}", i + 1, cause);
        }
    }

    ErrorContext::new(CpmError::Other {
        message,
    })
}
