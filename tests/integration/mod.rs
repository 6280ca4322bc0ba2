//! Integration test suite for CPM
//!
//! End-to-end tests running the `cpm` binary against scratch projects with
//! pre-installed packages under `.cpm/packages`.
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **vars**: `cpm vars` output and variable errors
//! - **validate**: `cpm validate` across used components
//! - **exec**: `cpm exec` argument and environment handling
//! - **runtime**: `cpm start` / `cpm stop` sequencing
//! - **install**: `cpm install` from a local git repository

mod common;
mod exec;
mod install;
#[cfg(unix)]
mod runtime;
mod validate;
mod vars;
