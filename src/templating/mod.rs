//! Rendering a component's `files[]` into the project.
//!
//! Each file is read from the package directory, has its `${{ name }}`
//! tokens substituted with the component's variables, and is written to its
//! target relative to the project root. Targets may contain tokens too.

use crate::core::CpmError;
use crate::manifest::{Component, FileSpec};
use crate::project::Package;
use crate::variables::VariableCollection;
use anyhow::{Context, Result};
use std::path::{Component as PathComponent, Path, PathBuf};

/// A file ready to be written: its resolved target and rendered content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    /// Absolute path inside the project
    pub target: PathBuf,
    /// Content with tokens substituted
    pub content: String,
}

/// Render every file of `component` and return the written paths.
///
/// # Errors
///
/// See [`prepare_component_files`] and [`write_rendered_files`].
pub fn render_component_files(
    package: &Package,
    component: &Component,
    project_root: &Path,
    variables: &VariableCollection,
) -> Result<Vec<PathBuf>> {
    let files = prepare_component_files(package, component, project_root, variables)?;
    write_rendered_files(&files)
}

/// Resolve the targets of `component` and render their content without
/// touching the project.
///
/// # Errors
///
/// - [`CpmError::InvalidFileTarget`] when a target is absolute or climbs out of
///   the project root
/// - IO errors reading a source
pub fn prepare_component_files(
    package: &Package,
    component: &Component,
    project_root: &Path,
    variables: &VariableCollection,
) -> Result<Vec<RenderedFile>> {
    let targets = component
        .files
        .iter()
        .map(|file| resolve_target(component, file, project_root, variables).map(|target| (file, target)))
        .collect::<Result<Vec<_>>>()?;

    targets
        .into_iter()
        .map(|(file, target)| {
            let source = package.path.join(&file.source);
            let content = std::fs::read_to_string(&source).with_context(|| {
                format!("Failed to read template {} of component '{}'", source.display(), component.id)
            })?;
            Ok(RenderedFile {
                target,
                content: variables.substitute(&content),
            })
        })
        .collect()
}

/// Write prepared files, creating parent directories, and return their paths.
///
/// # Errors
///
/// IO errors creating a directory or writing a file.
pub fn write_rendered_files(files: &[RenderedFile]) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(files.len());
    for file in files {
        if let Some(parent) = file.target.parent() {
            std::fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(&file.target, &file.content)
            .with_context(|| format!("Failed to write {}", file.target.display()))?;

        tracing::debug!("Rendered {}", file.target.display());
        written.push(file.target.clone());
    }
    Ok(written)
}

fn resolve_target(
    component: &Component,
    file: &FileSpec,
    project_root: &Path,
    variables: &VariableCollection,
) -> Result<PathBuf> {
    let target = variables.substitute(&file.target);
    let relative = Path::new(&target);

    let escapes = relative.is_absolute()
        || relative.components().any(|c| matches!(c, PathComponent::ParentDir | PathComponent::Prefix(_)));
    if escapes || target.is_empty() {
        return Err(CpmError::InvalidFileTarget {
            component: component.id.clone(),
            target,
        }
        .into());
    }

    Ok(project_root.join(relative))
}
