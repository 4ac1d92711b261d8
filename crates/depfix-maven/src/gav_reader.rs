//! Multi-module discovery through the GAV reader plugin.
//!
//! The plugin walks the reactor and prints one JSON object per module, each
//! carrying the module's `pomPath`. It is installed into the local
//! repository once per run; the discovered paths are cached afterwards.

use crate::error::PomError;
use depfix_core::{Invocation, ProjectContext, Result, SharedRunner};
use serde::Deserialize;
use std::path::PathBuf;

/// Coordinates of the discovery plugin and an optional local jar.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GavReaderSettings {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    /// Installed with `install:install-file` instead of being downloaded
    pub jar_path: Option<PathBuf>,
}

impl Default for GavReaderSettings {
    fn default() -> Self {
        Self {
            group_id: "com.jfrog.frogbot".to_string(),
            artifact_id: "maven-gav-reader".to_string(),
            version: "1.0.0".to_string(),
            jar_path: None,
        }
    }
}

impl GavReaderSettings {
    /// `groupId:artifactId:version`
    pub fn gav(&self) -> String {
        format!("{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }
}

#[derive(Debug, Deserialize)]
struct GavLine {
    #[serde(rename = "pomPath")]
    pom_path: String,
}

/// Extracts POM paths from the plugin output.
///
/// Lines that are not GAV records (Maven banners, warnings) are skipped.
///
/// # Examples
///
/// ```
/// use depfix_maven::gav_reader::parse_pom_paths;
///
/// let output = "[INFO] Scanning for projects...\n\
///               {\"groupId\":\"g\",\"artifactId\":\"a\",\"version\":\"1\",\"pomPath\":\"/repo/pom.xml\"}\n";
/// assert_eq!(parse_pom_paths(output), vec![std::path::PathBuf::from("/repo/pom.xml")]);
/// ```
pub fn parse_pom_paths(output: &str) -> Vec<PathBuf> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with('{'))
        .filter_map(|line| match serde_json::from_str::<GavLine>(line) {
            Ok(record) => Some(PathBuf::from(record.pom_path)),
            Err(e) => {
                tracing::debug!(line, error = %e, "skipping unrecognized gav reader line");
                None
            }
        })
        .collect()
}

/// Installs the plugin on first use and caches the module list.
pub struct ModuleDiscovery {
    runner: SharedRunner,
    executable: String,
    settings: GavReaderSettings,
    installed: bool,
    pom_paths: Option<Vec<PathBuf>>,
}

impl ModuleDiscovery {
    pub fn new(
        runner: SharedRunner,
        executable: impl Into<String>,
        settings: GavReaderSettings,
    ) -> Self {
        Self {
            runner,
            executable: executable.into(),
            settings,
            installed: false,
            pom_paths: None,
        }
    }

    pub fn is_installed(&self) -> bool {
        self.installed
    }

    /// Installs the plugin into the local repository, once.
    pub async fn install(&mut self, project: &ProjectContext) -> Result<()> {
        if self.installed {
            return Ok(());
        }

        let settings = &self.settings;
        let mut invocation = Invocation::new(&self.executable, &project.working_dir).arg("-B");
        invocation = match &settings.jar_path {
            Some(jar) => invocation.args([
                "install:install-file".to_string(),
                format!("-Dfile={}", project.resolve(jar).display()),
                format!("-DgroupId={}", settings.group_id),
                format!("-DartifactId={}", settings.artifact_id),
                format!("-Dversion={}", settings.version),
                "-Dpackaging=maven-plugin".to_string(),
            ]),
            None => {
                let invocation = invocation
                    .arg("dependency:get")
                    .arg(format!("-Dartifact={}", settings.gav()));
                match project.deps_repo.as_deref() {
                    Some(repo) if !repo.is_empty() => {
                        invocation.arg(format!("-DremoteRepositories={repo}"))
                    }
                    _ => invocation,
                }
            }
        };

        self.runner.run_checked(&invocation).await?;
        self.installed = true;
        tracing::info!(plugin = %settings.gav(), "installed maven gav reader");
        Ok(())
    }

    /// Every POM of the reactor rooted at the working directory.
    pub async fn pom_paths(&mut self, project: &ProjectContext) -> Result<Vec<PathBuf>> {
        if let Some(paths) = &self.pom_paths {
            return Ok(paths.clone());
        }

        self.install(project).await?;
        let invocation = Invocation::new(&self.executable, &project.working_dir).args([
            "-B".to_string(),
            "-q".to_string(),
            format!("{}:gav", self.settings.gav()),
        ]);
        let output = self.runner.run_checked(&invocation).await?;

        let paths: Vec<PathBuf> = parse_pom_paths(&output.stdout)
            .into_iter()
            .map(|path| project.resolve(path))
            .collect();
        if paths.is_empty() {
            return Err(PomError::NoModulesDiscovered.into());
        }

        tracing::debug!(poms = paths.len(), "discovered maven modules");
        self.pom_paths = Some(paths.clone());
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depfix_core::CommandOutput;
    use depfix_core::test_utils::FakeRunner;
    use std::sync::Arc;

    fn gav_output() -> String {
        [
            r#"{"groupId":"org.example","artifactId":"parent","version":"1.0","pomPath":"pom.xml"}"#,
            r#"{"groupId":"org.example","artifactId":"app","version":"1.0","pomPath":"app/pom.xml"}"#,
        ]
        .join("\n")
    }

    fn discovery_runner() -> FakeRunner {
        FakeRunner::with_handler(|invocation| {
            if invocation.command_line().ends_with(":gav") {
                CommandOutput::success(gav_output())
            } else {
                CommandOutput::success("")
            }
        })
    }

    #[tokio::test]
    async fn test_two_module_discovery_installs_once() {
        let dir = tempfile::tempdir().unwrap();
        let project = ProjectContext::new(dir.path());
        let runner = discovery_runner();
        let mut discovery = ModuleDiscovery::new(
            Arc::new(runner.clone()),
            "mvn",
            GavReaderSettings::default(),
        );

        let paths = discovery.pom_paths(&project).await.unwrap();
        assert!(discovery.is_installed());
        assert_eq!(
            paths,
            vec![dir.path().join("pom.xml"), dir.path().join("app/pom.xml")]
        );

        let again = discovery.pom_paths(&project).await.unwrap();
        assert_eq!(again.len(), 2);
        assert_eq!(
            runner.command_lines(),
            vec![
                "mvn -B dependency:get -Dartifact=com.jfrog.frogbot:maven-gav-reader:1.0.0",
                "mvn -B -q com.jfrog.frogbot:maven-gav-reader:1.0.0:gav",
            ]
        );
    }

    #[tokio::test]
    async fn test_install_from_jar() {
        let dir = tempfile::tempdir().unwrap();
        let project = ProjectContext::new(dir.path());
        let runner = FakeRunner::new();
        let settings = GavReaderSettings {
            jar_path: Some(PathBuf::from("tools/gav-reader.jar")),
            ..GavReaderSettings::default()
        };
        let mut discovery = ModuleDiscovery::new(Arc::new(runner.clone()), "mvn", settings);

        discovery.install(&project).await.unwrap();
        discovery.install(&project).await.unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].args[1], "install:install-file");
        assert_eq!(
            calls[0].args[2],
            format!("-Dfile={}", dir.path().join("tools/gav-reader.jar").display())
        );
    }

    #[tokio::test]
    async fn test_remote_repository_passed_through() {
        let dir = tempfile::tempdir().unwrap();
        let project = ProjectContext::new(dir.path()).with_deps_repo("https://repo.example/maven");
        let runner = FakeRunner::new();
        let mut discovery =
            ModuleDiscovery::new(Arc::new(runner.clone()), "mvn", GavReaderSettings::default());

        discovery.install(&project).await.unwrap();
        assert!(
            runner.command_lines()[0].ends_with("-DremoteRepositories=https://repo.example/maven")
        );
    }

    #[tokio::test]
    async fn test_failed_install_is_not_memoized() {
        let dir = tempfile::tempdir().unwrap();
        let project = ProjectContext::new(dir.path());
        let runner = FakeRunner::failing(1, "could not resolve artifact");
        let mut discovery =
            ModuleDiscovery::new(Arc::new(runner.clone()), "mvn", GavReaderSettings::default());

        assert!(discovery.install(&project).await.is_err());
        assert!(!discovery.is_installed());
    }

    #[tokio::test]
    async fn test_empty_discovery_output() {
        let dir = tempfile::tempdir().unwrap();
        let project = ProjectContext::new(dir.path());
        let mut discovery =
            ModuleDiscovery::new(Arc::new(FakeRunner::new()), "mvn", GavReaderSettings::default());

        let err = discovery.pom_paths(&project).await.unwrap_err();
        assert!(err.to_string().contains("no POM paths"));
    }
}
