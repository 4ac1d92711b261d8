//! NuGet editor.

use crate::error::NugetError;
use crate::project_file::{
    ProjectFile, find_reference, locate_declaring_projects, parse_package_references,
};
use async_trait::async_trait;
use depfix_core::manifest::read_manifest;
use depfix_core::version::compare_lenient;
use depfix_core::{
    DependencyEditor, FixOutcome, Invocation, ProjectContext, Result, SharedRunner, Technology,
    VulnerabilityFix, fixed_package_args, require_direct,
};
use serde::Deserialize;
use std::cmp::Ordering;
use std::path::Path;

/// Settings for the NuGet editor.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NugetSettings {
    /// .NET CLI executable
    pub executable: String,
}

impl Default for NugetSettings {
    fn default() -> Self {
        Self {
            executable: "dotnet".to_string(),
        }
    }
}

/// Upgrades direct package references with `dotnet add package`.
///
/// Every project file that references the package is upgraded, so a
/// solution with several projects is fixed as a whole.
pub struct NugetEditor {
    runner: SharedRunner,
    settings: NugetSettings,
}

impl NugetEditor {
    pub fn new(runner: SharedRunner, settings: NugetSettings) -> Self {
        Self { runner, settings }
    }

    async fn verify_applied(
        &self,
        project_file: &Path,
        package: &str,
        version: &str,
    ) -> Result<()> {
        let content = read_manifest(project_file).await?;
        let references = parse_package_references(&content);
        let found = find_reference(&references, package)
            .and_then(|r| r.version.clone())
            .unwrap_or_default();

        if found.is_empty() || compare_lenient(&found, version) == Ordering::Less {
            return Err(NugetError::VersionNotApplied {
                package: package.to_string(),
                file: project_file.display().to_string(),
                expected: version.to_string(),
                found,
            }
            .into());
        }
        Ok(())
    }
}

fn current_version<'a>(project: &'a ProjectFile, package: &str) -> Option<&'a str> {
    project
        .reference(package)
        .and_then(|r| r.version.as_deref())
        .filter(|v| !v.is_empty())
}

#[async_trait]
impl DependencyEditor for NugetEditor {
    fn technology(&self) -> Technology {
        Technology::Nuget
    }

    async fn update_dependency(
        &mut self,
        fix: &VulnerabilityFix,
        project: &ProjectContext,
    ) -> Result<FixOutcome> {
        require_direct(self, fix)?;

        let package = fix.impacted_dependency_name.as_str();
        let version = fix.suggested_fixed_version.as_str();
        let project_files = locate_declaring_projects(&project.working_dir, package)
            .await
            .map_err(|e| e.into_fix_error(package))?;

        let mut changed = Vec::new();
        for project_file in project_files {
            if let Some(current) = current_version(&project_file, package)
                && compare_lenient(current, version) != Ordering::Less
            {
                tracing::info!(
                    package = %package,
                    current = %current,
                    fixed = %version,
                    project = %project_file.path.display(),
                    "project already references a fixed version"
                );
                continue;
            }

            let project_dir = project_file
                .path
                .parent()
                .map_or_else(|| project.working_dir.clone(), Path::to_path_buf);
            let invocation = Invocation::new(&self.settings.executable, project_dir)
                .arg("add")
                .arg(project_file.path.display().to_string())
                .arg("package")
                .args(fixed_package_args(package, " -v ", version));
            self.runner.run_checked(&invocation).await?;
            self.verify_applied(&project_file.path, package, version).await?;

            tracing::info!(
                package = %package,
                version = %version,
                project = %project_file.path.display(),
                "upgraded nuget package"
            );
            changed.push(project_file.path);
        }

        if changed.is_empty() {
            return Ok(FixOutcome::unchanged());
        }
        Ok(FixOutcome::changed(changed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depfix_core::test_utils::FakeRunner;
    use depfix_core::{CommandOutput, FixError};
    use std::sync::Arc;

    const CSPROJ: &str = r#"<Project Sdk="Microsoft.NET.Sdk">
  <ItemGroup>
    <PackageReference Include="Snappier" Version="1.0.0" />
  </ItemGroup>
</Project>
"#;

    fn project() -> (tempfile::TempDir, ProjectContext) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("App.csproj"), CSPROJ).unwrap();
        let project = ProjectContext::new(dir.path());
        (dir, project)
    }

    /// Simulates `dotnet add package` rewriting the Version attribute.
    fn dotnet() -> FakeRunner {
        FakeRunner::with_handler(|invocation| {
            let project_file = &invocation.args[1];
            let version = invocation.args.last().cloned().unwrap_or_default();
            let content = std::fs::read_to_string(project_file).unwrap();
            let updated = content.replace("Version=\"1.0.0\"", &format!("Version=\"{version}\""));
            std::fs::write(project_file, updated).unwrap();
            CommandOutput::success("")
        })
    }

    #[tokio::test]
    async fn test_direct_fix() {
        let (dir, project) = project();
        let runner = dotnet();
        let mut editor = NugetEditor::new(Arc::new(runner.clone()), NugetSettings::default());

        let fix = VulnerabilityFix::new(Technology::Nuget, "snappier", "1.1.1").direct(true);
        let outcome = editor.update_dependency(&fix, &project).await.unwrap();

        let project_file = dir.path().join("App.csproj");
        assert_eq!(outcome.files_changed, vec![project_file.clone()]);
        assert_eq!(
            runner.command_lines(),
            vec![format!(
                "dotnet add {} package snappier -v 1.1.1",
                project_file.display()
            )]
        );
        assert_eq!(runner.calls()[0].working_dir, dir.path());
        assert!(
            std::fs::read_to_string(project_file)
                .unwrap()
                .contains(r#"Include="Snappier" Version="1.1.1""#)
        );
    }

    #[tokio::test]
    async fn test_every_declaring_project_upgraded() {
        let (dir, project) = project();
        let tests = dir.path().join("tests");
        std::fs::create_dir_all(&tests).unwrap();
        std::fs::write(tests.join("App.Tests.csproj"), CSPROJ).unwrap();
        let fixed = dir.path().join("tools");
        std::fs::create_dir_all(&fixed).unwrap();
        std::fs::write(fixed.join("Tools.csproj"), CSPROJ.replace("1.0.0", "1.2.0")).unwrap();

        let runner = dotnet();
        let mut editor = NugetEditor::new(Arc::new(runner.clone()), NugetSettings::default());
        let fix = VulnerabilityFix::new(Technology::Nuget, "Snappier", "1.1.1").direct(true);
        let outcome = editor.update_dependency(&fix, &project).await.unwrap();

        let app = dir.path().join("App.csproj");
        let app_tests = tests.join("App.Tests.csproj");
        assert_eq!(outcome.files_changed, vec![app.clone(), app_tests.clone()]);
        assert_eq!(runner.call_count(), 2);
        assert_eq!(runner.calls()[1].working_dir, tests);
        for path in [app, app_tests] {
            assert!(std::fs::read_to_string(path).unwrap().contains(r#"Version="1.1.1""#));
        }
    }

    #[tokio::test]
    async fn test_transitive_unsupported() {
        let (dir, project) = project();
        let runner = FakeRunner::new();
        let mut editor = NugetEditor::new(Arc::new(runner.clone()), NugetSettings::default());

        let fix = VulnerabilityFix::new(Technology::Nuget, "snappier", "1.1.1");
        let err = editor.update_dependency(&fix, &project).await.unwrap_err();

        assert!(err.is_unsupported());
        assert_eq!(runner.call_count(), 0);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("App.csproj")).unwrap(),
            CSPROJ
        );
    }

    #[tokio::test]
    async fn test_already_fixed() {
        let (_dir, project) = project();
        let runner = FakeRunner::new();
        let mut editor = NugetEditor::new(Arc::new(runner.clone()), NugetSettings::default());

        let fix = VulnerabilityFix::new(Technology::Nuget, "Snappier", "1.0.0").direct(true);
        let outcome = editor.update_dependency(&fix, &project).await.unwrap();
        assert!(outcome.is_unchanged());
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_ignored_upgrade_is_reported() {
        let (_dir, project) = project();
        let mut editor = NugetEditor::new(Arc::new(FakeRunner::new()), NugetSettings::default());

        let fix = VulnerabilityFix::new(Technology::Nuget, "Snappier", "1.1.1").direct(true);
        let err = editor.update_dependency(&fix, &project).await.unwrap_err();
        assert!(err.to_string().contains("expected 1.1.1"));
    }

    #[tokio::test]
    async fn test_tool_failure() {
        let (_dir, project) = project();
        let runner = FakeRunner::failing(1, "error: NU1101 unable to find package");
        let mut editor = NugetEditor::new(Arc::new(runner), NugetSettings::default());

        let fix = VulnerabilityFix::new(Technology::Nuget, "Snappier", "1.1.1").direct(true);
        let err = editor.update_dependency(&fix, &project).await.unwrap_err();
        assert!(matches!(err, FixError::ExternalToolError { status: Some(1), .. }));
    }

    #[tokio::test]
    async fn test_missing_project_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut editor = NugetEditor::new(Arc::new(FakeRunner::new()), NugetSettings::default());

        let fix = VulnerabilityFix::new(Technology::Nuget, "Snappier", "1.1.1").direct(true);
        let err = editor
            .update_dependency(&fix, &ProjectContext::new(dir.path()))
            .await
            .unwrap_err();
        match err {
            FixError::ParseError { package, .. } => assert_eq!(package, "Snappier"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
