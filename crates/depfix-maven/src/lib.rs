//! Maven support for depfix.
//!
//! POMs are parsed with `quick-xml` into descriptors that remember the byte
//! span of every `<version>` text, so fixes rewrite exactly those bytes and
//! leave the rest of the file untouched. Versions expressed through
//! `${property}` references are followed across the module's parent chain
//! and the property definition is edited instead.
//!
//! Multi-module projects are discovered with the GAV reader plugin, which is
//! installed into the local repository on first use.
//!
//! # Examples
//!
//! ```
//! use depfix_maven::get_maven_dependencies;
//!
//! let pom = r#"<project>
//!     <dependencies>
//!         <dependency>
//!             <groupId>commons-io</groupId>
//!             <artifactId>commons-io</artifactId>
//!             <version>2.6</version>
//!         </dependency>
//!     </dependencies>
//! </project>"#;
//!
//! let dependencies = get_maven_dependencies(pom).unwrap();
//! assert_eq!(dependencies[0].coordinates(), "commons-io:commons-io");
//! ```

pub mod editor;
pub mod error;
pub mod gav_reader;
pub mod pom;
pub mod project;
pub mod version;

pub use editor::{MavenEditor, MavenSettings, POM_XML};
pub use error::{PomError, Result};
pub use gav_reader::{GavReaderSettings, ModuleDiscovery};
pub use pom::{
    DescriptorKind, PomDependencyDescriptor, PomDocument, get_maven_dependencies, parse_pom,
};
pub use project::{MavenProject, PomFile};
pub use version::compare_versions;
