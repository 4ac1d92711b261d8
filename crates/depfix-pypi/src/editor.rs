//! Pip, Pipenv and Poetry editors.

use crate::error::PypiError;
use crate::pyproject::{PipfileEntry, pin_in_pyproject, pipfile_entry};
use crate::requirements::{PinResult, compare_versions, pin_requirement};
use async_trait::async_trait;
use depfix_core::manifest::{read_manifest, require_manifest, restore_on_error, write_if_changed};
use depfix_core::{
    DependencyEditor, FixError, FixOutcome, Invocation, ProjectContext, Result, SharedRunner,
    Technology, VulnerabilityFix, fixed_package_args, require_direct,
};
use serde::Deserialize;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

const PIPFILE: &str = "Pipfile";
const PIPFILE_LOCK: &str = "Pipfile.lock";
const PYPROJECT: &str = "pyproject.toml";
const POETRY_LOCK: &str = "poetry.lock";

/// Settings shared by the Python editors.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PythonSettings {
    /// Requirements source used when the project does not name one
    pub default_requirements_file: String,
    pub pipenv_executable: String,
    pub poetry_executable: String,
}

impl Default for PythonSettings {
    fn default() -> Self {
        Self {
            default_requirements_file: "setup.py".to_string(),
            pipenv_executable: "pipenv".to_string(),
            poetry_executable: "poetry".to_string(),
        }
    }
}

fn parent_dir(path: &Path, fallback: &Path) -> PathBuf {
    path.parent()
        .map_or_else(|| fallback.to_path_buf(), Path::to_path_buf)
}

fn with_lockfile(manifest: PathBuf, dir: &Path, lockfile: &str) -> Vec<PathBuf> {
    let lock = dir.join(lockfile);
    if lock.is_file() {
        vec![manifest, lock]
    } else {
        vec![manifest]
    }
}

/// Pins packages in a requirements file or `setup.py`.
pub struct PipEditor {
    settings: PythonSettings,
}

impl PipEditor {
    pub fn new(settings: PythonSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl DependencyEditor for PipEditor {
    fn technology(&self) -> Technology {
        Technology::Pip
    }

    fn compare_versions(&self, a: &str, b: &str) -> Ordering {
        compare_versions(a, b)
    }

    async fn update_dependency(
        &mut self,
        fix: &VulnerabilityFix,
        project: &ProjectContext,
    ) -> Result<FixOutcome> {
        require_direct(self, fix)?;

        let package = fix.impacted_dependency_name.as_str();
        let file = project
            .pip_requirements_file
            .clone()
            .unwrap_or_else(|| self.settings.default_requirements_file.clone());
        let path = project.resolve(&file);
        if !path.is_file() {
            return Err(FixError::parse(package, &file, "requirements source not found"));
        }

        let content = read_manifest(&path).await?;
        match pin_requirement(&content, package, &fix.suggested_fixed_version) {
            PinResult::NotFound => Err(PypiError::not_declared(package, &file)
                .into_fix_error(package, &file)),
            PinResult::AlreadyPinned => {
                tracing::info!(package = %package, file = %file, "requirement already pinned");
                Ok(FixOutcome::unchanged())
            }
            PinResult::Updated(updated) => {
                write_if_changed(&path, &content, &updated).await?;
                tracing::info!(
                    package = %package,
                    version = %fix.suggested_fixed_version,
                    file = %file,
                    "pinned requirement"
                );
                Ok(FixOutcome::changed([path]))
            }
        }
    }
}

fn read_pipfile_entry(content: &str, package: &str) -> Result<Option<PipfileEntry>> {
    pipfile_entry(content, package).map_err(|e| e.into_fix_error(package, PIPFILE))
}

/// Re-reads the Pipfile after `pipenv install` and checks that the entry for
/// `package` now excludes everything below `version`.
async fn verify_pipfile(path: &Path, package: &str, version: &str) -> Result<()> {
    let content = read_manifest(path).await?;
    match read_pipfile_entry(&content, package)? {
        Some(entry) if entry.satisfies(version) => Ok(()),
        entry => Err(PypiError::VersionNotApplied {
            package: package.to_string(),
            file: PIPFILE.to_string(),
            expected: version.to_string(),
            found: entry
                .and_then(|e| e.version)
                .unwrap_or_else(|| "<none>".to_string()),
        }
        .into_fix_error(package, PIPFILE)),
    }
}

/// Upgrades packages declared in a Pipfile through `pipenv install`.
pub struct PipenvEditor {
    runner: SharedRunner,
    settings: PythonSettings,
}

impl PipenvEditor {
    pub fn new(runner: SharedRunner, settings: PythonSettings) -> Self {
        Self { runner, settings }
    }
}

#[async_trait]
impl DependencyEditor for PipenvEditor {
    fn technology(&self) -> Technology {
        Technology::Pipenv
    }

    fn compare_versions(&self, a: &str, b: &str) -> Ordering {
        compare_versions(a, b)
    }

    async fn update_dependency(
        &mut self,
        fix: &VulnerabilityFix,
        project: &ProjectContext,
    ) -> Result<FixOutcome> {
        require_direct(self, fix)?;

        let package = fix.impacted_dependency_name.as_str();
        let version = fix.suggested_fixed_version.as_str();
        let pipfile = require_manifest(&project.working_dir, &[PIPFILE], package)?;
        let content = read_manifest(&pipfile).await?;

        let Some(entry) = read_pipfile_entry(&content, package)? else {
            return Err(PypiError::not_declared(package, PIPFILE).into_fix_error(package, PIPFILE));
        };
        if entry.satisfies(version) {
            tracing::info!(
                package = %package,
                section = entry.section,
                "Pipfile already requires a fixed version"
            );
            return Ok(FixOutcome::unchanged());
        }

        let dir = parent_dir(&pipfile, &project.working_dir);
        let invocation = Invocation::new(&self.settings.pipenv_executable, &dir)
            .arg("install")
            .args(fixed_package_args(package, "==", version));
        self.runner.run_checked(&invocation).await?;
        verify_pipfile(&pipfile, package, version).await?;

        tracing::info!(package = %package, version = %version, "pipenv install completed");
        Ok(FixOutcome::changed(with_lockfile(pipfile, &dir, PIPFILE_LOCK)))
    }
}

/// Pins packages in pyproject.toml and refreshes poetry.lock.
pub struct PoetryEditor {
    runner: SharedRunner,
    settings: PythonSettings,
}

impl PoetryEditor {
    pub fn new(runner: SharedRunner, settings: PythonSettings) -> Self {
        Self { runner, settings }
    }
}

#[async_trait]
impl DependencyEditor for PoetryEditor {
    fn technology(&self) -> Technology {
        Technology::Poetry
    }

    fn compare_versions(&self, a: &str, b: &str) -> Ordering {
        compare_versions(a, b)
    }

    async fn update_dependency(
        &mut self,
        fix: &VulnerabilityFix,
        project: &ProjectContext,
    ) -> Result<FixOutcome> {
        require_direct(self, fix)?;

        let package = fix.impacted_dependency_name.as_str();
        let version = fix.suggested_fixed_version.as_str();
        let pyproject = require_manifest(&project.working_dir, &[PYPROJECT], package)?;
        let content = read_manifest(&pyproject).await?;

        let edit = pin_in_pyproject(&content, package, version)
            .map_err(|e| e.into_fix_error(package, PYPROJECT))?;
        if !edit.changed {
            tracing::info!(package = %package, "pyproject.toml already pinned");
            return Ok(FixOutcome::unchanged());
        }
        write_if_changed(&pyproject, &content, &edit.content).await?;

        let dir = parent_dir(&pyproject, &project.working_dir);
        let invocation = Invocation::new(&self.settings.poetry_executable, &dir)
            .arg("update")
            .arg(package.to_lowercase());
        let updated = self.runner.run_checked(&invocation).await;
        restore_on_error(&pyproject, &content, updated).await?;

        tracing::info!(
            package = %package,
            version = %version,
            sections = ?edit.sections,
            "poetry dependency pinned"
        );
        Ok(FixOutcome::changed(with_lockfile(pyproject, &dir, POETRY_LOCK)))
    }
}
