//! Core abstractions for depfix.
//!
//! This crate provides the pieces shared by every ecosystem editor:
//! - **Data model**: [`VulnerabilityFix`], [`ProjectContext`], [`FixOutcome`]
//! - **Merge policy**: [`version::update_if_max`] and [`FixTarget`]
//! - **Editor contract**: [`DependencyEditor`]
//! - **Process boundary**: [`CommandRunner`] and [`ProcessRunner`]
//! - **Manifest helpers**: upward discovery and byte-preserving splices
//! - **Error types**: [`FixError`]
//!
//! # Examples
//!
//! ```
//! use depfix_core::{FixTarget, Technology, VulnerabilityFix};
//! use depfix_core::version::compare_lenient;
//!
//! let mut target = FixTarget::new(VulnerabilityFix::new(Technology::Npm, "minimist", "1.2.3"));
//! target.merge(&VulnerabilityFix::new(Technology::Npm, "minimist", "1.2.6"), compare_lenient);
//! assert_eq!(target.fixed_version(), "1.2.6");
//! ```

pub mod command;
pub mod editor;
pub mod error;
pub mod manifest;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;
pub mod version;

pub use command::{
    CommandOutput, CommandRunner, Invocation, ProcessRunner, SharedRunner, fixed_package_args,
};
pub use editor::{DependencyEditor, require_direct};
pub use error::{FixError, Result};
pub use types::{FixOutcome, ProjectContext, Technology, VulnerabilityFix, normalize_python_name};
pub use version::{FixTarget, update_if_max};
