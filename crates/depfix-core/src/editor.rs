use crate::error::{FixError, Result};
use crate::types::{FixOutcome, ProjectContext, Technology, VulnerabilityFix};
use crate::version::compare_lenient;
use async_trait::async_trait;
use std::cmp::Ordering;

/// Contract shared by every ecosystem editor.
///
/// An editor applies one merged fix to the manifest(s) of the project in
/// [`ProjectContext::working_dir`], either by rewriting files itself or by
/// invoking the ecosystem's package manager there. Editors may keep state
/// across calls within a run (the Maven editor caches module discovery), so
/// `update_dependency` takes `&mut self`.
///
/// # Contract
///
/// - Requests the editor cannot honor are rejected with
///   [`FixError::UnsupportedFix`] before any file is touched.
/// - Success implies the manifest literally carries the fixed version.
/// - Repeating a successful fix is a no-op or re-affirms the same version.
#[async_trait]
pub trait DependencyEditor: Send + Sync {
    /// Ecosystem handled by this editor.
    fn technology(&self) -> Technology;

    /// Whether transitive (indirect) dependencies can be fixed at all.
    fn supports_transitive(&self) -> bool {
        false
    }

    /// Ecosystem version ordering used by the merge policy.
    fn compare_versions(&self, a: &str, b: &str) -> Ordering {
        compare_lenient(a, b)
    }

    /// Applies the fix.
    async fn update_dependency(
        &mut self,
        fix: &VulnerabilityFix,
        project: &ProjectContext,
    ) -> Result<FixOutcome>;
}

/// Rejects transitive requests for editors without transitive support.
///
/// Call this first in `update_dependency` so a refused fix never reaches
/// the filesystem.
pub fn require_direct(editor: &dyn DependencyEditor, fix: &VulnerabilityFix) -> Result<()> {
    if fix.is_direct_dependency || editor.supports_transitive() {
        return Ok(());
    }
    tracing::warn!(
        package = %fix.impacted_dependency_name,
        technology = %editor.technology(),
        "refusing transitive fix"
    );
    Err(FixError::unsupported(
        &fix.impacted_dependency_name,
        editor.technology(),
        "only direct dependencies can be fixed",
    ))
}
