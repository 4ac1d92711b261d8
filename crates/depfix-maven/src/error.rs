//! Errors specific to POM handling.

use depfix_core::FixError;
use thiserror::Error;

/// Errors that can occur while reading or editing POM files.
#[derive(Error, Debug)]
pub enum PomError {
    /// The document is not well-formed XML
    #[error("Failed to parse {file}: {message}")]
    XmlError { file: String, message: String },

    /// Impacted package names must be `groupId:artifactId`
    #[error("Invalid Maven coordinates '{name}', expected groupId:artifactId")]
    InvalidCoordinates { name: String },

    /// No loaded POM declares the package
    #[error("'{coordinates}' is not declared in any project POM")]
    NotDeclared { coordinates: String },

    /// The declared version cannot be traced to a single declaration
    #[error("No authoritative version declaration for '{coordinates}' in {file}")]
    NoAuthoritativeDeclaration { coordinates: String, file: String },

    /// A referenced property is defined nowhere in the module's ancestry
    #[error("Property '{name}' used by '{coordinates}' is not defined")]
    UnresolvedProperty { coordinates: String, name: String },

    /// Properties reference each other in a loop
    #[error("Property cycle while resolving '{coordinates}': {}", chain.join(" -> "))]
    PropertyCycle {
        coordinates: String,
        chain: Vec<String>,
    },

    /// `project.*` and similar properties are computed by Maven
    #[error("Property '{name}' used by '{coordinates}' is built in and cannot be edited")]
    BuiltInProperty { coordinates: String, name: String },

    /// `update_property` found no definition to rewrite
    #[error("Property '{name}' is not defined in any project POM")]
    PropertyNotDefined { name: String },

    /// The module discovery plugin printed no POM paths
    #[error("Module discovery returned no POM paths")]
    NoModulesDiscovered,
}

/// Result type alias for POM operations.
pub type Result<T> = std::result::Result<T, PomError>;

impl PomError {
    /// Helper for creating XML errors
    pub fn xml(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::XmlError {
            file: file.into(),
            message: message.into(),
        }
    }

    fn subject(&self) -> &str {
        match self {
            Self::InvalidCoordinates { name } => name,
            Self::NotDeclared { coordinates }
            | Self::NoAuthoritativeDeclaration { coordinates, .. }
            | Self::UnresolvedProperty { coordinates, .. }
            | Self::PropertyCycle { coordinates, .. }
            | Self::BuiltInProperty { coordinates, .. } => coordinates,
            Self::PropertyNotDefined { name } => name,
            Self::XmlError { .. } | Self::NoModulesDiscovered => "",
        }
    }

    fn file(&self) -> &str {
        match self {
            Self::XmlError { file, .. } | Self::NoAuthoritativeDeclaration { file, .. } => file,
            _ => "pom.xml",
        }
    }
}

impl From<PomError> for FixError {
    fn from(err: PomError) -> Self {
        FixError::parse(err.subject(), err.file(), err.to_string())
    }
}
