//! Errors specific to Python manifest handling.

use depfix_core::FixError;
use thiserror::Error;

/// Errors that can occur while editing Python manifests.
#[derive(Error, Debug)]
pub enum PypiError {
    /// TOML manifest is malformed
    #[error("Failed to parse TOML: {source}")]
    TomlParseError {
        #[source]
        source: toml_edit::TomlError,
    },

    /// A rewritten requirement is not valid PEP 508
    #[error("Invalid requirement '{requirement}': {message}")]
    InvalidRequirement { requirement: String, message: String },

    /// The package manager finished but the manifest does not require the
    /// fixed version
    #[error("{file} requires {package} {found}, expected at least {expected}")]
    VersionNotApplied {
        package: String,
        file: String,
        expected: String,
        found: String,
    },

    /// The package is not declared in the manifest
    #[error("Package '{package}' is not declared in {file}")]
    NotDeclared { package: String, file: String },
}

/// Result type alias for Python manifest operations.
pub type Result<T> = std::result::Result<T, PypiError>;

impl PypiError {
    /// Helper for creating not-declared errors
    pub fn not_declared(package: impl Into<String>, file: impl Into<String>) -> Self {
        Self::NotDeclared {
            package: package.into(),
            file: file.into(),
        }
    }

    /// Converts into the shared error type, attributing it to `package` and
    /// `file`.
    pub fn into_fix_error(self, package: &str, file: &str) -> FixError {
        FixError::parse(package, file, self.to_string())
    }
}

impl From<toml_edit::TomlError> for PypiError {
    fn from(source: toml_edit::TomlError) -> Self {
        Self::TomlParseError { source }
    }
}
