//! Fix descriptors, project context and outcomes shared by every editor.

use crate::error::FixError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Package ecosystem a vulnerability was reported against.
///
/// The set is closed: every variant has exactly one editor, and adding a
/// variant is a compile error until the dispatcher handles it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Technology {
    Go,
    Pip,
    Pipenv,
    Poetry,
    Npm,
    Yarn,
    Maven,
    Nuget,
}

impl Technology {
    pub const ALL: [Self; 8] = [
        Self::Go,
        Self::Pip,
        Self::Pipenv,
        Self::Poetry,
        Self::Npm,
        Self::Yarn,
        Self::Maven,
        Self::Nuget,
    ];

    /// Lowercase identifier used in requests, reports and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Go => "go",
            Self::Pip => "pip",
            Self::Pipenv => "pipenv",
            Self::Poetry => "poetry",
            Self::Npm => "npm",
            Self::Yarn => "yarn",
            Self::Maven => "maven",
            Self::Nuget => "nuget",
        }
    }

    /// Whether the ecosystem compares package names case-insensitively.
    pub fn is_case_insensitive(self) -> bool {
        matches!(self, Self::Pip | Self::Pipenv | Self::Poetry | Self::Nuget)
    }

    /// Canonical form of a package name for grouping fixes within a run.
    ///
    /// Python names follow PEP 503 (lowercase, runs of `-`, `_` and `.`
    /// collapse to `-`); NuGet ids are lowercased; everything else is kept
    /// verbatim.
    ///
    /// # Examples
    ///
    /// ```
    /// use depfix_core::Technology;
    ///
    /// assert_eq!(Technology::Pip.normalize_package_name("Oslo_Config"), "oslo-config");
    /// assert_eq!(Technology::Nuget.normalize_package_name("Snappier"), "snappier");
    /// assert_eq!(Technology::Npm.normalize_package_name("@Scope/Pkg"), "@Scope/Pkg");
    /// ```
    pub fn normalize_package_name(self, name: &str) -> String {
        match self {
            Self::Pip | Self::Pipenv | Self::Poetry => normalize_python_name(name),
            Self::Nuget => name.to_lowercase(),
            _ => name.to_string(),
        }
    }
}

impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Technology {
    type Err = FixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|tech| tech.as_str() == tag)
            .ok_or_else(|| FixError::UnknownTechnology(s.to_string()))
    }
}

/// Normalizes a Python distribution name per PEP 503.
pub fn normalize_python_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    let mut pending_separator = false;
    for c in name.trim().chars() {
        if matches!(c, '-' | '_' | '.') {
            pending_separator = true;
            continue;
        }
        if pending_separator && !normalized.is_empty() {
            normalized.push('-');
        }
        pending_separator = false;
        normalized.push(c.to_ascii_lowercase());
    }
    normalized
}

/// A single reported vulnerability with its suggested remediation.
///
/// Owned by the caller; editors only read it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VulnerabilityFix {
    pub technology: Technology,
    /// Package name as reported (Maven uses `groupId:artifactId`).
    pub impacted_dependency_name: String,
    /// Currently resolved version or range, when the scanner reported one.
    #[serde(default)]
    pub impacted_dependency_version: Option<String>,
    pub suggested_fixed_version: String,
    #[serde(default)]
    pub is_direct_dependency: bool,
    /// Violation metadata, passed through untouched.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl VulnerabilityFix {
    pub fn new(
        technology: Technology,
        impacted_dependency_name: impl Into<String>,
        suggested_fixed_version: impl Into<String>,
    ) -> Self {
        Self {
            technology,
            impacted_dependency_name: impacted_dependency_name.into(),
            impacted_dependency_version: None,
            suggested_fixed_version: suggested_fixed_version.into(),
            is_direct_dependency: false,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn direct(mut self, is_direct: bool) -> Self {
        self.is_direct_dependency = is_direct;
        self
    }

    pub fn with_current_version(mut self, version: impl Into<String>) -> Self {
        self.impacted_dependency_version = Some(version.into());
        self
    }

    /// Grouping key used by the merge policy.
    pub fn package_key(&self) -> String {
        self.technology
            .normalize_package_name(&self.impacted_dependency_name)
    }
}

/// Where the project being fixed lives.
///
/// Every editor resolves manifest paths and runs external tools relative to
/// `working_dir`; the process working directory is never changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectContext {
    pub working_dir: PathBuf,
    /// Requirements source for pip projects, relative to `working_dir`.
    #[serde(default)]
    pub pip_requirements_file: Option<String>,
    /// Remote repository used to resolve build-tool artifacts.
    #[serde(default)]
    pub deps_repo: Option<String>,
}

impl ProjectContext {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            pip_requirements_file: None,
            deps_repo: None,
        }
    }

    pub fn with_requirements_file(mut self, file: impl Into<String>) -> Self {
        self.pip_requirements_file = Some(file.into());
        self
    }

    pub fn with_deps_repo(mut self, repo: impl Into<String>) -> Self {
        self.deps_repo = Some(repo.into());
        self
    }

    /// Resolves a path relative to the working directory.
    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        let relative = relative.as_ref();
        if relative.is_absolute() {
            relative.to_path_buf()
        } else {
            self.working_dir.join(relative)
        }
    }
}

/// Successful result of an editor run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FixOutcome {
    /// Files rewritten by the editor or the tool it invoked.
    pub files_changed: Vec<PathBuf>,
}

impl FixOutcome {
    pub fn changed(files: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            files_changed: files.into_iter().collect(),
        }
    }

    /// The manifest already satisfied the fix.
    pub fn unchanged() -> Self {
        Self::default()
    }

    pub fn is_unchanged(&self) -> bool {
        self.files_changed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_technology_from_str() {
        assert_eq!("go".parse::<Technology>().unwrap(), Technology::Go);
        assert_eq!("NuGet".parse::<Technology>().unwrap(), Technology::Nuget);
        assert_eq!(" maven ".parse::<Technology>().unwrap(), Technology::Maven);
    }

    #[test]
    fn test_technology_from_str_unknown() {
        let err = "cargo".parse::<Technology>().unwrap_err();
        assert!(matches!(err, FixError::UnknownTechnology(ref t) if t == "cargo"));
    }

    #[test]
    fn test_technology_display_round_trips() {
        for tech in Technology::ALL {
            assert_eq!(tech.to_string().parse::<Technology>().unwrap(), tech);
        }
    }

    #[test]
    fn test_technology_serde() {
        let tech: Technology = serde_json::from_str("\"pipenv\"").unwrap();
        assert_eq!(tech, Technology::Pipenv);
        assert_eq!(serde_json::to_string(&Technology::Nuget).unwrap(), "\"nuget\"");
    }

    #[test]
    fn test_normalize_python_name() {
        assert_eq!(normalize_python_name("PyJWT"), "pyjwt");
        assert_eq!(normalize_python_name("prompt_toolkit"), "prompt-toolkit");
        assert_eq!(normalize_python_name("zope..interface"), "zope-interface");
        assert_eq!(normalize_python_name("oslo.config"), "oslo-config");
    }

    #[test]
    fn test_package_key_case_rules() {
        let pip = VulnerabilityFix::new(Technology::Pip, "PyJWT", "2.4.0");
        assert_eq!(pip.package_key(), "pyjwt");

        let go = VulnerabilityFix::new(Technology::Go, "github.com/Azure/go-autorest", "1.0.0");
        assert_eq!(go.package_key(), "github.com/Azure/go-autorest");
    }

    #[test]
    fn test_fix_deserialize_defaults() {
        let json = r#"{
            "technology": "npm",
            "impacted_dependency_name": "minimatch",
            "suggested_fixed_version": "3.0.2"
        }"#;
        let fix: VulnerabilityFix = serde_json::from_str(json).unwrap();
        assert_eq!(fix.technology, Technology::Npm);
        assert!(!fix.is_direct_dependency);
        assert!(fix.metadata.is_null());
        assert!(fix.impacted_dependency_version.is_none());
    }

    #[test]
    fn test_fix_metadata_passthrough() {
        let json = r#"{
            "technology": "go",
            "impacted_dependency_name": "github.com/gin-gonic/gin",
            "suggested_fixed_version": "1.7.7",
            "is_direct_dependency": true,
            "metadata": {"cve": "CVE-2020-28483", "severity": "High"}
        }"#;
        let fix: VulnerabilityFix = serde_json::from_str(json).unwrap();
        assert_eq!(fix.metadata["cve"], "CVE-2020-28483");
    }

    #[test]
    fn test_project_context_resolve() {
        let ctx = ProjectContext::new("/work/project");
        assert_eq!(
            ctx.resolve("requirements.txt"),
            PathBuf::from("/work/project/requirements.txt")
        );
        assert_eq!(ctx.resolve("/abs/pom.xml"), PathBuf::from("/abs/pom.xml"));
    }

    #[test]
    fn test_fix_outcome() {
        assert!(FixOutcome::unchanged().is_unchanged());
        let outcome = FixOutcome::changed([PathBuf::from("go.mod")]);
        assert!(!outcome.is_unchanged());
    }
}
