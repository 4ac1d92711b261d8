use crate::types::Technology;
use thiserror::Error;

/// Error taxonomy for dependency remediation.
///
/// `UnsupportedFix` is a policy-level refusal and an expected outcome (most
/// ecosystems cannot pin a transitive dependency through the manifest).
/// `ParseError` and `ExternalToolError` are genuine failures. Callers are
/// expected to report the former distinctly from the latter.
///
/// # Examples
///
/// ```
/// use depfix_core::error::{FixError, Result};
/// use depfix_core::Technology;
///
/// fn refuse(package: &str) -> Result<()> {
///     Err(FixError::unsupported(
///         package,
///         Technology::Yarn,
///         "transitive dependencies cannot be pinned",
///     ))
/// }
///
/// let err = refuse("minimist").unwrap_err();
/// assert!(err.is_unsupported());
/// ```
#[derive(Error, Debug)]
pub enum FixError {
    #[error("unsupported fix for {package} ({technology}): {reason}")]
    UnsupportedFix {
        package: String,
        technology: Technology,
        reason: String,
    },

    #[error("failed to parse {file} while fixing {package}: {message}")]
    ParseError {
        package: String,
        file: String,
        message: String,
    },

    #[error("`{command}` failed ({}): {stderr}", status_label(.status))]
    ExternalToolError {
        command: String,
        status: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("unknown technology: {0}")]
    UnknownTechnology(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn status_label(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit status {code}"),
        None => "terminated without exit status".to_string(),
    }
}

/// Convenience type alias for `Result<T, FixError>`.
pub type Result<T> = std::result::Result<T, FixError>;

impl FixError {
    /// Helper for creating unsupported-fix errors
    pub fn unsupported(
        package: impl Into<String>,
        technology: Technology,
        reason: impl Into<String>,
    ) -> Self {
        Self::UnsupportedFix {
            package: package.into(),
            technology,
            reason: reason.into(),
        }
    }

    /// Helper for creating parse errors
    pub fn parse(
        package: impl Into<String>,
        file: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ParseError {
            package: package.into(),
            file: file.into(),
            message: message.into(),
        }
    }

    /// Returns true for policy refusals, which are not bugs.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedFix { .. })
    }
}
