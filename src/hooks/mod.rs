//! Running component programs: `onPostInit` hooks and `cpm exec`.
//!
//! A program runs in its package directory with the component's variables
//! exported on top of the inherited environment. Its arguments, followed by
//! any extra arguments, have `${{ name }}` tokens substituted. Standard
//! streams are inherited so interactive programs work.

use crate::core::CpmError;
use crate::manifest::{Component, ProgramSpec};
use crate::project::Package;
use crate::runtime::process::resolve_executable;
use crate::variables::VariableCollection;
use anyhow::Result;
use tokio::process::Command;

/// Run `program` of `component` with `extra_args` appended and return its
/// exit code (`None` when killed by a signal).
///
/// # Errors
///
/// - [`CpmError::ExecutableNotFound`] / [`CpmError::SpawnFailed`]
pub async fn run_program(
    package: &Package,
    component: &Component,
    program: &ProgramSpec,
    extra_args: &[String],
    variables: &VariableCollection,
) -> Result<Option<i32>> {
    let id = format!("{}/{}", component.id, program.id);
    let executable =
        resolve_executable(&program.executable, &package.path).ok_or_else(|| CpmError::ExecutableNotFound {
            id: id.clone(),
            executable: program.executable.clone(),
        })?;

    let args: Vec<String> =
        program.args.iter().chain(extra_args).map(|arg| variables.substitute(arg)).collect();

    tracing::debug!(target: "process", "Running '{}': {} {}", id, executable.display(), args.join(" "));

    let status = Command::new(&executable)
        .args(&args)
        .current_dir(&package.path)
        .env_clear()
        .envs(variables.as_env_vars())
        .status()
        .await
        .map_err(|e| CpmError::SpawnFailed {
            id: id.clone(),
            executable: executable.display().to_string(),
            reason: e.to_string(),
        })?;

    tracing::debug!(target: "process", "'{}' exited with {:?}", id, status.code());
    Ok(status.code())
}

/// Run the program `program_id` of `component`.
///
/// # Errors
///
/// [`CpmError::ProgramNotFound`] when the component declares no such program,
/// plus the errors of [`run_program`].
pub async fn exec_program(
    package: &Package,
    component: &Component,
    program_id: &str,
    extra_args: &[String],
    variables: &VariableCollection,
) -> Result<Option<i32>> {
    let program = component.program(program_id).ok_or_else(|| CpmError::ProgramNotFound {
        component: component.id.clone(),
        program: program_id.to_string(),
    })?;
    run_program(package, component, program, extra_args, variables).await
}

/// Run every `onPostInit` hook of `component` in order, stopping at the first failure.
///
/// Returns the number of hooks run.
///
/// # Errors
///
/// [`CpmError::HookFailed`] when a hook exits unsuccessfully.
pub async fn run_post_init(package: &Package, component: &Component, variables: &VariableCollection) -> Result<usize> {
    for hook in &component.on_post_init {
        tracing::info!("Running post-init hook '{}' of '{}'", hook.program, component.id);
        let exit_code = exec_program(package, component, &hook.program, &hook.args, variables).await?;
        if exit_code != Some(0) {
            return Err(CpmError::HookFailed {
                component: component.id.clone(),
                hook: hook.program.clone(),
                exit_code,
            }
            .into());
        }
    }
    Ok(component.on_post_init.len())
}
