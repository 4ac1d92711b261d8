//! Errors specific to package.json handling.

use depfix_core::FixError;
use thiserror::Error;

/// Errors that can occur while reading or editing package.json.
#[derive(Error, Debug)]
pub enum NpmError {
    /// package.json is not valid JSON
    #[error("Failed to parse package.json: {source}")]
    JsonParseError {
        #[source]
        source: serde_json::Error,
    },

    /// The package is not declared in any dependency section
    #[error("Package '{package}' is not declared in package.json")]
    NotDeclared { package: String },

    /// The value could not be located in the document text
    #[error("Could not locate '{package}' in the {section} section")]
    ValueNotFound { package: String, section: String },

    /// The package manager finished but package.json does not require the
    /// fixed version
    #[error("package.json requires {package}@{found}, expected at least {expected}")]
    VersionNotApplied {
        package: String,
        expected: String,
        found: String,
    },

    /// `yarn --version` printed something unexpected
    #[error("Unrecognized yarn version output: {output}")]
    UnknownYarnVersion { output: String },
}

/// Result type alias for npm operations.
pub type Result<T> = std::result::Result<T, NpmError>;

impl NpmError {
    /// Converts into the shared error type, attributing it to `package`.
    pub fn into_fix_error(self, package: &str, file: &str) -> FixError {
        FixError::parse(package, file, self.to_string())
    }
}

impl From<serde_json::Error> for NpmError {
    fn from(source: serde_json::Error) -> Self {
        Self::JsonParseError { source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_declared_display() {
        let err = NpmError::NotDeclared {
            package: "minimist".into(),
        };
        assert_eq!(
            err.to_string(),
            "Package 'minimist' is not declared in package.json"
        );
    }

    #[test]
    fn test_into_fix_error() {
        let err = NpmError::UnknownYarnVersion {
            output: "oops".into(),
        }
        .into_fix_error("lodash", "yarn.lock");
        assert!(matches!(err, FixError::ParseError { .. }));
    }
}
