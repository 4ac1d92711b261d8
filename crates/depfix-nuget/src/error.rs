//! Errors specific to NuGet remediation.

use depfix_core::FixError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NugetError {
    #[error("No .csproj, .fsproj or .vbproj file under {dir}")]
    NoProjectFile { dir: String },

    #[error("Package '{package}' is not referenced by any project file")]
    NotDeclared { package: String },

    #[error("{file} references {package} {found}, expected {expected}")]
    VersionNotApplied {
        package: String,
        file: String,
        expected: String,
        found: String,
    },
}

pub type Result<T> = std::result::Result<T, NugetError>;

impl NugetError {
    fn package(&self) -> &str {
        match self {
            Self::NotDeclared { package } | Self::VersionNotApplied { package, .. } => package,
            Self::NoProjectFile { .. } => "",
        }
    }

    fn file(&self) -> &str {
        match self {
            Self::VersionNotApplied { file, .. } => file,
            _ => "*.csproj",
        }
    }

    /// Attaches the package being fixed before converting.
    pub fn into_fix_error(self, package: &str) -> FixError {
        let subject = if self.package().is_empty() {
            package
        } else {
            self.package()
        };
        FixError::parse(subject, self.file(), self.to_string())
    }
}

impl From<NugetError> for FixError {
    fn from(err: NugetError) -> Self {
        FixError::parse(err.package(), err.file(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_project_file_keeps_package() {
        let err = NugetError::NoProjectFile { dir: "/repo".into() }.into_fix_error("snappier");
        match err {
            FixError::ParseError { package, file, message } => {
                assert_eq!(package, "snappier");
                assert_eq!(file, "*.csproj");
                assert!(message.contains("/repo"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
