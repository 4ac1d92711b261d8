//! npm and Yarn support for depfix.
//!
//! package.json is parsed with `serde_json` and edited by byte span, so an
//! override bump changes nothing but the version text. Upgrades of direct
//! dependencies are delegated to `npm install` or `yarn upgrade`/`yarn up`
//! depending on the detected Yarn flavor.
//!
//! # Example
//!
//! ```
//! use depfix_npm::package_json::set_override;
//!
//! let json = "{\n  \"overrides\": { \"minimist\": \"1.2.5\" }\n}\n";
//! let updated = set_override(json, "minimist", "1.2.6").unwrap().unwrap();
//! assert_eq!(updated, "{\n  \"overrides\": { \"minimist\": \"1.2.6\" }\n}\n");
//! ```

pub mod editor;
pub mod error;
pub mod package_json;
pub mod yarn;

pub use editor::{NpmEditor, NpmSettings, YarnEditor, YarnSettings};
pub use error::{NpmError, Result};
pub use package_json::{NpmDependency, NpmDependencySection, PackageJson, parse_package_json};
pub use yarn::{YarnFlavor, detect_flavor};
