//! npm and Yarn editors.

use crate::error::NpmError;
use crate::package_json::{
    PackageJson, compare_versions, parse_package_json, requirement_satisfies, set_override,
};
use crate::yarn::{YARN_LOCK, detect_flavor};
use async_trait::async_trait;
use depfix_core::manifest::{
    locate_upwards, read_manifest, require_manifest, restore_on_error, write_if_changed,
};
use depfix_core::{
    DependencyEditor, FixError, FixOutcome, Invocation, ProjectContext, Result, SharedRunner,
    Technology, VulnerabilityFix, fixed_package_args, require_direct,
};
use serde::Deserialize;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

pub const PACKAGE_JSON: &str = "package.json";
pub const PACKAGE_LOCK: &str = "package-lock.json";

/// Settings for the npm editor.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NpmSettings {
    pub executable: String,
}

impl Default for NpmSettings {
    fn default() -> Self {
        Self {
            executable: "npm".to_string(),
        }
    }
}

/// Settings for the Yarn editor.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct YarnSettings {
    pub executable: String,
    /// Skips flavor detection when set
    pub major_version: Option<u64>,
}

impl Default for YarnSettings {
    fn default() -> Self {
        Self {
            executable: "yarn".to_string(),
            major_version: None,
        }
    }
}

/// package.json location plus its parsed content.
struct LoadedManifest {
    path: PathBuf,
    root: PathBuf,
    content: String,
    parsed: PackageJson,
}

async fn load_package_json(project: &ProjectContext, package: &str) -> Result<LoadedManifest> {
    let path = require_manifest(&project.working_dir, &[PACKAGE_JSON], package)?;
    let root = path
        .parent()
        .map_or_else(|| project.working_dir.clone(), Path::to_path_buf);
    let content = read_manifest(&path).await?;
    let parsed =
        parse_package_json(&content).map_err(|e| e.into_fix_error(package, PACKAGE_JSON))?;
    Ok(LoadedManifest {
        path,
        root,
        content,
        parsed,
    })
}

/// The manifest plus the lockfile, when the project has one.
fn changed_with_lockfile(manifest: PathBuf, root: &Path, lockfile: &str) -> FixOutcome {
    let lock = root.join(lockfile);
    let mut files = vec![manifest];
    if lock.is_file() {
        files.push(lock);
    }
    FixOutcome::changed(files)
}

/// Re-reads package.json after a package manager run and checks that the
/// declaration of `package` now requires at least `version`.
async fn verify_declared(path: &Path, package: &str, version: &str) -> Result<()> {
    let content = read_manifest(path).await?;
    let parsed =
        parse_package_json(&content).map_err(|e| e.into_fix_error(package, PACKAGE_JSON))?;
    let found = parsed
        .declared(package)
        .and_then(|dep| dep.version_req.as_deref());

    match found {
        Some(req) if requirement_satisfies(req, version) => Ok(()),
        _ => Err(NpmError::VersionNotApplied {
            package: package.to_string(),
            expected: version.to_string(),
            found: found.unwrap_or("<none>").to_string(),
        }
        .into_fix_error(package, PACKAGE_JSON)),
    }
}

fn not_pinned(package: &str) -> FixError {
    FixError::unsupported(
        package,
        Technology::Npm,
        "transitive dependency is not pinned in package.json overrides",
    )
}

/// Upgrades npm dependencies.
///
/// Direct dependencies go through `npm install <name>@<version>`. A
/// transitive dependency can only be fixed when package.json already pins it
/// in `overrides`.
pub struct NpmEditor {
    runner: SharedRunner,
    settings: NpmSettings,
}

impl NpmEditor {
    pub fn new(runner: SharedRunner, settings: NpmSettings) -> Self {
        Self { runner, settings }
    }

    async fn fix_direct(
        &self,
        fix: &VulnerabilityFix,
        manifest: LoadedManifest,
    ) -> Result<FixOutcome> {
        let package = fix.impacted_dependency_name.as_str();
        let version = fix.suggested_fixed_version.as_str();

        if let Some(req) = manifest
            .parsed
            .declared(package)
            .and_then(|dep| dep.version_req.as_deref())
            && requirement_satisfies(req, version)
        {
            tracing::info!(package = %package, current = %req, fixed = %version, "package.json already requires a fixed version");
            return Ok(FixOutcome::unchanged());
        }

        let invocation = Invocation::new(&self.settings.executable, &manifest.root)
            .arg("install")
            .args(fixed_package_args(package, "@", version));
        self.runner.run_checked(&invocation).await?;
        verify_declared(&manifest.path, package, version).await?;

        tracing::info!(package = %package, version = %version, "upgraded npm dependency");
        Ok(changed_with_lockfile(manifest.path, &manifest.root, PACKAGE_LOCK))
    }

    async fn fix_override(
        &self,
        fix: &VulnerabilityFix,
        manifest: LoadedManifest,
    ) -> Result<FixOutcome> {
        let package = fix.impacted_dependency_name.as_str();
        let version = fix.suggested_fixed_version.as_str();

        let pinned = manifest
            .parsed
            .override_for(package)
            .and_then(|entry| entry.version_req.as_deref());
        let Some(current) = pinned else {
            tracing::warn!(package = %package, "transitive dependency is not pinned in overrides");
            return Err(not_pinned(package));
        };

        if requirement_satisfies(current, version) {
            tracing::info!(package = %package, current = %current, "override already pins a fixed version");
            return Ok(FixOutcome::unchanged());
        }

        let updated = set_override(&manifest.content, package, version)
            .map_err(|e| e.into_fix_error(package, PACKAGE_JSON))?
            .ok_or_else(|| {
                NpmError::ValueNotFound {
                    package: package.to_string(),
                    section: "overrides".to_string(),
                }
                .into_fix_error(package, PACKAGE_JSON)
            })?;
        write_if_changed(&manifest.path, &manifest.content, &updated).await?;

        let invocation = Invocation::new(&self.settings.executable, &manifest.root).arg("install");
        let installed = self.runner.run_checked(&invocation).await;
        restore_on_error(&manifest.path, &manifest.content, installed).await?;

        tracing::info!(package = %package, version = %version, "rewrote npm override");
        Ok(changed_with_lockfile(manifest.path, &manifest.root, PACKAGE_LOCK))
    }
}

#[async_trait]
impl DependencyEditor for NpmEditor {
    fn technology(&self) -> Technology {
        Technology::Npm
    }

    fn supports_transitive(&self) -> bool {
        true
    }

    fn compare_versions(&self, a: &str, b: &str) -> Ordering {
        compare_versions(a, b)
    }

    async fn update_dependency(
        &mut self,
        fix: &VulnerabilityFix,
        project: &ProjectContext,
    ) -> Result<FixOutcome> {
        let package = fix.impacted_dependency_name.as_str();
        if !fix.is_direct_dependency
            && locate_upwards(&project.working_dir, &[PACKAGE_JSON]).is_none()
        {
            tracing::warn!(package = %package, "no package.json to pin a transitive dependency in");
            return Err(not_pinned(package));
        }

        let manifest = load_package_json(project, package).await?;
        if fix.is_direct_dependency {
            self.fix_direct(fix, manifest).await
        } else {
            self.fix_override(fix, manifest).await
        }
    }
}

/// Upgrades Yarn dependencies declared in package.json.
///
/// The flavor is detected once and reused for the rest of the run.
pub struct YarnEditor {
    runner: SharedRunner,
    settings: YarnSettings,
}

impl YarnEditor {
    pub fn new(runner: SharedRunner, settings: YarnSettings) -> Self {
        Self { runner, settings }
    }
}

#[async_trait]
impl DependencyEditor for YarnEditor {
    fn technology(&self) -> Technology {
        Technology::Yarn
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
        let manifest = load_package_json(project, package).await?;

        let Some(declared) = manifest.parsed.declared(package) else {
            return Err(NpmError::NotDeclared {
                package: package.to_string(),
            }
            .into_fix_error(package, PACKAGE_JSON));
        };
        if let Some(req) = declared.version_req.as_deref()
            && requirement_satisfies(req, version)
        {
            tracing::info!(package = %package, current = %req, "package.json already requires a fixed version");
            return Ok(FixOutcome::unchanged());
        }

        let flavor = detect_flavor(
            self.runner.as_ref(),
            &self.settings.executable,
            self.settings.major_version,
            &manifest.root,
        )
        .await?;
        self.settings.major_version.get_or_insert(flavor.major());

        let invocation = Invocation::new(&self.settings.executable, &manifest.root)
            .arg(flavor.upgrade_command())
            .args(fixed_package_args(package, "@", version));
        self.runner.run_checked(&invocation).await?;
        verify_declared(&manifest.path, package, version).await?;

        tracing::info!(package = %package, version = %version, flavor = %flavor, "upgraded yarn dependency");
        Ok(changed_with_lockfile(manifest.path, &manifest.root, YARN_LOCK))
    }
}
