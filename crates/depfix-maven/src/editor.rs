//! Maven editor.

use crate::gav_reader::{GavReaderSettings, ModuleDiscovery};
use crate::project::{MavenProject, split_coordinates};
use crate::version::compare_versions;
use async_trait::async_trait;
use depfix_core::{
    DependencyEditor, FixError, FixOutcome, ProjectContext, Result, SharedRunner, Technology,
    VulnerabilityFix, require_direct,
};
use serde::Deserialize;
use std::cmp::Ordering;
use std::path::PathBuf;

pub const POM_XML: &str = "pom.xml";

/// Settings for the Maven editor.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MavenSettings {
    pub executable: String,
    /// List reactor modules with the GAV reader plugin; otherwise only the
    /// working directory's pom.xml is edited
    pub discover_modules: bool,
    pub gav_reader: GavReaderSettings,
}

impl Default for MavenSettings {
    fn default() -> Self {
        Self {
            executable: "mvn".to_string(),
            discover_modules: true,
            gav_reader: GavReaderSettings::default(),
        }
    }
}

/// Upgrades direct Maven dependencies and plugins across all modules.
pub struct MavenEditor {
    discover_modules: bool,
    discovery: ModuleDiscovery,
}

impl MavenEditor {
    pub fn new(runner: SharedRunner, settings: MavenSettings) -> Self {
        Self {
            discover_modules: settings.discover_modules,
            discovery: ModuleDiscovery::new(runner, settings.executable, settings.gav_reader),
        }
    }

    async fn project_poms(
        &mut self,
        project: &ProjectContext,
        package: &str,
    ) -> Result<Vec<PathBuf>> {
        let root_pom = project.resolve(POM_XML);
        if !root_pom.is_file() {
            return Err(FixError::parse(
                package,
                POM_XML,
                format!("no pom.xml in {}", project.working_dir.display()),
            ));
        }
        if self.discover_modules {
            self.discovery.pom_paths(project).await
        } else {
            Ok(vec![root_pom])
        }
    }
}

#[async_trait]
impl DependencyEditor for MavenEditor {
    fn technology(&self) -> Technology {
        Technology::Maven
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

        let coordinates = fix.impacted_dependency_name.as_str();
        split_coordinates(coordinates)?;

        let paths = self.project_poms(project, coordinates).await?;
        let mut model = MavenProject::load(&paths).await?;
        let managed = model.found_in_dependency_management(coordinates)?;

        let edited = model.update_package_version(
            coordinates,
            &fix.suggested_fixed_version,
            managed,
        )?;
        if edited.is_empty() {
            tracing::info!(package = %coordinates, "all declarations already at a fixed version");
            return Ok(FixOutcome::unchanged());
        }

        let written = model.write_changes().await?;
        tracing::info!(
            package = %coordinates,
            version = %fix.suggested_fixed_version,
            poms = written.len(),
            managed,
            "upgraded maven dependency"
        );
        Ok(FixOutcome::changed(written))
    }
}
