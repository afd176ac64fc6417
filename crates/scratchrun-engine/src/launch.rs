use std::ffi::OsString;
use std::path::{Path, PathBuf};

use scratchrun_config::{ClasspathConfig, LaunchConfig};
use scratchrun_runner::CommandSpec;

use crate::stages::{ExpandedContext, RunFailure};

/// Classpath entries in lookup order: artifacts, module output, configured
/// dependencies, then the resolved closure. Duplicates keep their first slot.
#[must_use]
pub fn classpath_entries(
    artifact_dir: &Path,
    classpath: &ClasspathConfig,
    context: &ExpandedContext,
) -> Vec<PathBuf> {
    let mut entries: Vec<PathBuf> = Vec::new();
    let candidates = std::iter::once(artifact_dir.to_path_buf())
        .chain(classpath.module_output.iter().map(|p| p.as_std_path().to_path_buf()))
        .chain(classpath.dependencies.iter().map(|p| p.as_std_path().to_path_buf()))
        .chain(context.dependency_files.iter().cloned());

    for entry in candidates {
        if !entries.contains(&entry) {
            entries.push(entry);
        }
    }
    entries
}

/// `<program> <jvm_args> -cp <classpath> <entry_point>`
pub fn build_launch_command(
    launch: &LaunchConfig,
    classpath: &ClasspathConfig,
    artifact_dir: &Path,
    context: &ExpandedContext,
    entry_point: &str,
) -> Result<CommandSpec, RunFailure> {
    let entries = classpath_entries(artifact_dir, classpath, context);
    let joined: OsString =
        std::env::join_paths(&entries).map_err(|e| RunFailure::ProcessLaunch {
            program: launch.program.clone(),
            reason: format!("invalid classpath entry: {e}"),
        })?;

    Ok(CommandSpec::new(&launch.program)
        .args(&launch.jvm_args)
        .arg("-cp")
        .arg(joined)
        .arg(entry_point))
}
