//! Git access for package installation.
//!
//! Installation only needs two things from a repository: the names of its tags
//! and branches, and a working tree checked out at one of them. Both are
//! behind the [`RepositoryFetcher`] trait; [`GitFetcher`] implements it with
//! the system `git` binary (like Cargo does), and tests substitute their own.

pub mod command_builder;

use anyhow::{Context, Result};
use command_builder::GitCommand;
use std::future::Future;
use std::path::Path;

/// Source of repository refs and working trees.
pub trait RepositoryFetcher {
    /// Tag and branch names of `repository`.
    fn list_refs(&self, repository: &str) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Check `reference` of `repository` out into `target`, replacing whatever
    /// is there. Returns the checked-out commit when known.
    fn checkout(
        &self,
        repository: &str,
        reference: &str,
        target: &Path,
    ) -> impl Future<Output = Result<Option<String>>> + Send;
}

/// [`RepositoryFetcher`] backed by the system `git` command.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitFetcher;

impl RepositoryFetcher for GitFetcher {
    async fn list_refs(&self, repository: &str) -> Result<Vec<String>> {
        let stdout = GitCommand::ls_remote(repository)
            .with_context(repository)
            .execute_stdout()
            .await
            .with_context(|| format!("Failed to list refs of {repository}"))?;
        Ok(parse_ls_remote(&stdout))
    }

    async fn checkout(&self, repository: &str, reference: &str, target: &Path) -> Result<Option<String>> {
        if target.exists() {
            tokio::fs::remove_dir_all(target)
                .await
                .with_context(|| format!("Failed to remove previous checkout at {}", target.display()))?;
        }
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        GitCommand::clone_ref(repository, reference, target)
            .with_context(repository)
            .execute()
            .await
            .with_context(|| format!("Failed to check out {reference} of {repository}"))?;

        let commit = GitCommand::head_commit().current_dir(target).execute_stdout().await?;
        Ok(Some(commit))
    }
}

/// Tag and branch names from `git ls-remote` output.
///
/// Peeled tag entries (`refs/tags/v1^{}`) are folded into their tag.
#[must_use]
pub fn parse_ls_remote(output: &str) -> Vec<String> {
    let mut refs = Vec::new();
    for line in output.lines() {
        let Some(reference) = line.split_whitespace().nth(1) else {
            continue;
        };
        let name = reference
            .strip_prefix("refs/tags/")
            .or_else(|| reference.strip_prefix("refs/heads/"))
            .map(|name| name.trim_end_matches("^{}"));
        if let Some(name) = name {
            if !refs.iter().any(|r| r == name) {
                refs.push(name.to_string());
            }
        }
    }
    refs
}

/// Owner and repository name of a repository URL.
///
/// The owner is the second-to-last path segment and the name is the last one
/// without `.git`. Works for HTTPS, SSH (`git@host:owner/repo.git`), and local
/// paths; missing segments come back empty.
#[must_use]
pub fn repository_owner_and_name(url: &str) -> (String, String) {
    let segments: Vec<&str> =
        url.trim_end_matches('/').split(['/', ':']).filter(|s| !s.is_empty()).collect();

    let repo = segments.last().map(|s| s.trim_end_matches(".git")).unwrap_or_default();
    let owner = if segments.len() >= 2 {
        segments[segments.len() - 2]
    } else {
        ""
    };

    (owner.to_string(), repo.to_string())
}
