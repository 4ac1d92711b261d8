//! Go module support for depfix.
//!
//! This crate provides go.mod parsing with byte spans, Go version ordering
//! and the [`GoEditor`], which upgrades directly required modules either
//! through `go get` or by rewriting the require line in place.
//!
//! # Example
//!
//! ```
//! use depfix_go::parse_go_mod;
//!
//! let content = r#"
//! module example.com/myapp
//!
//! go 1.21
//!
//! require github.com/gin-gonic/gin v1.9.1
//! "#;
//!
//! let result = parse_go_mod(content).unwrap();
//! assert_eq!(result.dependencies.len(), 1);
//! ```

pub mod editor;
pub mod error;
pub mod parser;
pub mod types;
pub mod version;

pub use editor::{GoEditor, GoSettings};
pub use error::{GoError, Result};
pub use parser::parse_go_mod;
pub use types::{GoDependency, GoDirective, GoModFile};
pub use version::{compare_versions, ensure_v_prefix, is_pseudo_version};
