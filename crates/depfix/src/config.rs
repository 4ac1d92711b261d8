use depfix_go::GoSettings;
use depfix_maven::MavenSettings;
use depfix_npm::{NpmSettings, YarnSettings};
use depfix_nuget::NugetSettings;
use depfix_pypi::PythonSettings;
use serde::Deserialize;

/// Root configuration of a remediation run.
///
/// Every section is optional; missing sections and fields fall back to the
/// defaults of the corresponding editor.
///
/// # Examples
///
/// ```
/// use depfix::config::DepfixConfig;
///
/// let json = r#"{
///     "go": { "use_module_tool": false },
///     "yarn": { "major_version": 1 },
///     "maven": { "discover_modules": false }
/// }"#;
///
/// let config: DepfixConfig = serde_json::from_str(json).unwrap();
/// assert!(!config.go.use_module_tool);
/// assert_eq!(config.yarn.major_version, Some(1));
/// assert_eq!(config.npm.executable, "npm");
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DepfixConfig {
    #[serde(default)]
    pub go: GoSettings,
    #[serde(default)]
    pub npm: NpmSettings,
    #[serde(default)]
    pub yarn: YarnSettings,
    #[serde(default)]
    pub python: PythonSettings,
    #[serde(default)]
    pub maven: MavenSettings,
    #[serde(default)]
    pub nuget: NugetSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: DepfixConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.go.executable, "go");
        assert!(config.go.use_module_tool);
        assert_eq!(config.python.default_requirements_file, "setup.py");
        assert_eq!(config.yarn.major_version, None);
        assert!(config.maven.discover_modules);
        assert_eq!(config.nuget.executable, "dotnet");
    }

    #[test]
    fn test_gav_reader_overrides() {
        let json = r#"{
            "maven": {
                "executable": "./mvnw",
                "gav_reader": { "version": "1.0.1", "jar_path": "tools/gav.jar" }
            }
        }"#;
        let config: DepfixConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.maven.executable, "./mvnw");
        assert_eq!(config.maven.gav_reader.version, "1.0.1");
        assert_eq!(config.maven.gav_reader.group_id, "com.jfrog.frogbot");
        assert_eq!(
            config.maven.gav_reader.jar_path.as_deref(),
            Some(std::path::Path::new("tools/gav.jar"))
        );
    }

    #[test]
    fn test_python_section() {
        let json = r#"{ "python": { "poetry_executable": "/opt/poetry/bin/poetry" } }"#;
        let config: DepfixConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.python.poetry_executable, "/opt/poetry/bin/poetry");
        assert_eq!(config.python.pipenv_executable, "pipenv");
    }
}
