//! Template discovery: collect the component instances found in the immediate
//! subdirectories of a root directory.

use std::path::{Path, PathBuf};

use super::{Instance, Template};
use crate::config::{ConfigLoader, InstanceFile, LoadOverrides};
use crate::error::StackError;
use crate::types::Operation;

/// Load every component instance under `root` into one template.
///
/// Returns `Ok(None)` when no subdirectory holds an instance file, or when one
/// holds a configuration without a `component`. Either way `root` is not a
/// template directory.
pub fn load_template(
    root: &Path,
    loader: &mut ConfigLoader,
    overrides: &LoadOverrides,
    operation: Operation,
) -> Result<Option<Template>, StackError> {
    let dirs = instance_dirs(root)?;
    for dir in &dirs {
        if let Some(file) = loader.read_instance_file(dir)?
            && !file.is_component()
        {
            tracing::debug!("{} is not a component instance", dir.display());
            return Ok(None);
        }
    }

    let mut template = Template::new(dir_name(root));
    let mut found = false;

    for dir in dirs {
        let Some(config) = loader.load_instance(&dir, overrides, operation)? else {
            continue;
        };
        found = true;

        if template.instances.contains_key(&config.name) {
            return Err(StackError::invalid_config(
                &dir,
                format!("duplicate instance name '{}'", config.name),
            ));
        }
        tracing::debug!(
            "Found instance '{}' ({}) in {}",
            config.name,
            config.component,
            dir.display()
        );
        template.insert(Instance::from(config))?;
    }

    Ok(found.then_some(template))
}

/// The template to run from `root`.
///
/// A directory with its own deployable instance file is a single-instance
/// template. Otherwise the instances in its subdirectories form the template.
pub fn resolve_template(
    root: &Path,
    loader: &mut ConfigLoader,
    overrides: &LoadOverrides,
    operation: Operation,
) -> Result<Template, StackError> {
    let own = loader.read_instance_file(root)?;
    if !own.as_ref().is_some_and(InstanceFile::is_deployable) {
        return load_template(root, loader, overrides, operation)?.ok_or_else(|| {
            StackError::NotAnInstance {
                path: root.to_path_buf(),
            }
        });
    }

    let config = loader
        .load_instance(root, overrides, operation)?
        .ok_or_else(|| StackError::NotAnInstance {
            path: root.to_path_buf(),
        })?;
    let name = config.name.clone();
    Template::from_instances(name, [Instance::from(config)])
}

/// Whether `root` should be run as a template.
///
/// True when `root` has no deployable instance file of its own and at least
/// one subdirectory holds a component instance. Any subdirectory with a
/// non-component configuration rules the template out.
pub fn is_template_dir(root: &Path, loader: &mut ConfigLoader) -> bool {
    match detect_template(root, loader) {
        Ok(is_template) => is_template,
        Err(err) => {
            tracing::debug!("Template detection failed for {}: {}", root.display(), err);
            false
        }
    }
}

fn detect_template(root: &Path, loader: &mut ConfigLoader) -> Result<bool, StackError> {
    if let Some(file) = loader.read_instance_file(root)?
        && file.is_deployable()
    {
        return Ok(false);
    }

    let mut has_component = false;
    for dir in instance_dirs(root)? {
        if let Some(file) = loader.read_instance_file(&dir)? {
            if !file.is_component() {
                return Ok(false);
            }
            has_component = true;
        }
    }
    Ok(has_component)
}

/// Non-hidden immediate subdirectories of `root`, sorted by name.
fn instance_dirs(root: &Path) -> Result<Vec<PathBuf>, StackError> {
    let entries = std::fs::read_dir(root).map_err(|source| StackError::io(root, source))?;

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| StackError::io(root, source))?;
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        let path = entry.path();
        if !hidden && path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn dir_name(root: &Path) -> String {
    let resolved = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    resolved
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "template".to_string())
}
