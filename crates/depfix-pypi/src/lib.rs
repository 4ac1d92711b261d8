//! Python support for depfix.
//!
//! This crate remediates Python dependencies declared in requirements files,
//! `setup.py`, Pipfiles and `pyproject.toml`, supporting both PEP 621 and
//! Poetry layouts.
//!
//! # Features
//!
//! - **Requirement matching**: Case-insensitive, separator-agnostic matching
//!   of `name[extras] <specifiers>` clauses with markers left untouched
//! - **pyproject.toml editing**: `toml_edit` rewrites that keep formatting
//! - **PEP 508 validation**: Rewritten requirement strings are re-parsed
//! - **PEP 440 ordering**: Used to merge fixes and to skip existing pins
//!
//! # Examples
//!
//! ```
//! use depfix_pypi::requirements::{PinResult, pin_requirement};
//!
//! let content = "flask>=2.0\nPyJWT>1.7.1 ; python_version >= \"3.7\"\n";
//! let PinResult::Updated(updated) = pin_requirement(content, "pyjwt", "2.4.0") else {
//!     panic!("pyjwt is declared");
//! };
//! assert_eq!(updated, "flask>=2.0\npyjwt==2.4.0 ; python_version >= \"3.7\"\n");
//! ```

pub mod editor;
pub mod error;
pub mod pyproject;
pub mod requirements;

pub use editor::{PipEditor, PipenvEditor, PoetryEditor, PythonSettings};
pub use error::{PypiError, Result};
pub use requirements::{RequirementClause, compare_versions, find_requirement};
