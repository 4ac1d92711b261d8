//! Errors specific to Go module remediation.

use depfix_core::FixError;
use thiserror::Error;

/// Errors that can occur while editing go.mod.
#[derive(Error, Debug)]
pub enum GoError {
    /// go.mod content could not be understood
    #[error("Failed to parse go.mod: {message}")]
    ParseError { message: String },

    /// The module is not listed in any require directive
    #[error("Module '{module}' is not required in go.mod")]
    ModuleNotRequired { module: String },

    /// After running the module tool, go.mod does not carry the fixed version
    #[error("go.mod requires {module} {found}, expected {expected}")]
    VersionNotApplied {
        module: String,
        expected: String,
        found: String,
    },
}

/// Result type alias for Go operations.
pub type Result<T> = std::result::Result<T, GoError>;

impl GoError {
    /// Helper for creating parse errors
    pub fn parse(message: impl Into<String>) -> Self {
        Self::ParseError {
            message: message.into(),
        }
    }

    fn module(&self) -> Option<&str> {
        match self {
            Self::ModuleNotRequired { module } | Self::VersionNotApplied { module, .. } => {
                Some(module)
            }
            _ => None,
        }
    }
}

impl From<GoError> for FixError {
    fn from(err: GoError) -> Self {
        let package = err.module().unwrap_or_default().to_string();
        FixError::parse(package, "go.mod", err.to_string())
    }
}
