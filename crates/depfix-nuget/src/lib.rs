//! NuGet support for depfix.
//!
//! Finds every `.csproj`, `.fsproj` or `.vbproj` that references the package
//! and upgrades each with `dotnet add <project> package <name> -v <version>`.

pub mod editor;
pub mod error;
pub mod project_file;

pub use editor::{NugetEditor, NugetSettings};
pub use error::{NugetError, Result};
pub use project_file::{PackageReference, ProjectFile, locate_declaring_projects};
