//! Types for go.mod contents.

use std::ops::Range;

/// A module entry from a go.mod directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoDependency {
    /// Module path (e.g., "github.com/gin-gonic/gin")
    pub module_path: String,
    /// Version (e.g., "v1.9.1", "v0.0.0-20191109021931-daa7c04131f5")
    pub version: Option<String>,
    /// Byte span of the version in the go.mod text
    pub version_span: Option<Range<usize>>,
    /// Directive the entry appeared in
    pub directive: GoDirective,
    /// Whether the line carries a `// indirect` marker
    pub indirect: bool,
}

/// Go module directive types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GoDirective {
    Require,
    Replace,
    Exclude,
}

/// Parsed go.mod file.
#[derive(Debug, Clone, Default)]
pub struct GoModFile {
    /// Module path declared in `module` directive
    pub module_path: Option<String>,
    /// Minimum Go version from `go` directive
    pub go_version: Option<String>,
    pub dependencies: Vec<GoDependency>,
}

impl GoModFile {
    /// The `require` entry for `module`, if any.
    pub fn required(&self, module: &str) -> Option<&GoDependency> {
        self.dependencies
            .iter()
            .find(|d| d.directive == GoDirective::Require && d.module_path == module)
    }

    /// Whether a `replace` directive redirects `module`.
    pub fn is_replaced(&self, module: &str) -> bool {
        self.dependencies
            .iter()
            .any(|d| d.directive == GoDirective::Replace && d.module_path == module)
    }
}
