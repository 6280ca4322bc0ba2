//! CPM - Component Package Manager
//!
//! A git-based package manager for project components. Packages are git
//! repositories carrying a `cpm-package.json` manifest that declares
//! components: typed variable schemas, programs, post-install hooks, templated
//! files, and (for runtime components) ordered process sequences.
//!
//! # Architecture Overview
//!
//! - `cpm.json` lists packages with version specifiers and assigns variable
//!   values at project, package, and component level
//! - `cpm.lock` records the resolved version and commit of every package
//! - Packages are checked out under `.cpm/packages/<name>`
//!
//! Data flows from the manifests of installed packages and the user values in
//! `cpm.json` through the [`variables::VariableCollectionBuilder`] into an
//! immutable [`variables::VariableCollection`], which is substituted into
//! templated files, program and hook arguments, and exported as environment
//! for the processes the [`runtime::Sequencer`] spawns.
//!
//! # Core Modules
//!
//! - [`cli`] - Command-line interface
//! - [`config`] - Project configuration (`cpm.json`)
//! - [`core`] - Error types and user-facing error rendering
//! - [`project`] - Loaded project: packages, component contexts, runtime plan
//! - [`variables`] - Variable declarations, merging, validation, substitution
//! - [`runtime`] - Dependency-aware process sequencing
//!
//! ## Packages
//! - [`git`] - Repository access through the system `git`
//! - [`version`] - Version specifier resolution
//! - [`lockfile`] - Lockfile reading and writing (`cpm.lock`)
//! - [`manifest`] - Package manifests (`cpm-package.json`)
//! - [`installer`] - Fetching packages and configuring used components
//! - [`templating`] - Rendering component files
//! - [`hooks`] - Post-install hooks and program execution
//!
//! # Variable Example
//!
//! ```json
//! { "name": "db.port", "type": "number", "scope": "project", "default": 5432 }
//! ```
//!
//! A project-scoped declaration is visible to every component. Its value is
//! available as `${{ db.port }}` in arguments and templates, and as `db_port`
//! in the environment of spawned processes.

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod git;
pub mod hooks;
pub mod installer;
pub mod lockfile;
pub mod manifest;
pub mod project;
pub mod runtime;
pub mod templating;
pub mod variables;
pub mod version;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
