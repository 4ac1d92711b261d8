//! Go module editor.

use crate::error::GoError;
use crate::parser::parse_go_mod;
use crate::version::{compare_versions, ensure_v_prefix};
use async_trait::async_trait;
use depfix_core::manifest::{read_manifest, require_manifest, splice, write_if_changed};
use depfix_core::{
    DependencyEditor, FixOutcome, Invocation, ProjectContext, Result, SharedRunner, Technology,
    VulnerabilityFix, require_direct,
};
use serde::Deserialize;
use std::cmp::Ordering;
use std::path::Path;

const GO_MOD: &str = "go.mod";
const GO_SUM: &str = "go.sum";

/// Settings for the Go editor.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GoSettings {
    /// Go toolchain executable
    pub executable: String,
    /// Run `go get` instead of rewriting the require line directly
    pub use_module_tool: bool,
}

impl Default for GoSettings {
    fn default() -> Self {
        Self {
            executable: "go".to_string(),
            use_module_tool: true,
        }
    }
}

/// Upgrades directly required Go modules.
pub struct GoEditor {
    runner: SharedRunner,
    settings: GoSettings,
}

impl GoEditor {
    pub fn new(runner: SharedRunner, settings: GoSettings) -> Self {
        Self { runner, settings }
    }

    async fn run_module_tool(&self, module_root: &Path, module: &str, version: &str) -> Result<()> {
        let invocation = Invocation::new(&self.settings.executable, module_root)
            .arg("get")
            .arg(format!("{module}@{version}"));
        self.runner.run_checked(&invocation).await?;
        Ok(())
    }

    /// Re-reads go.mod and checks the module now requires at least `version`.
    async fn verify_applied(&self, go_mod: &Path, module: &str, version: &str) -> Result<()> {
        let content = read_manifest(go_mod).await?;
        let parsed = parse_go_mod(&content)?;
        let found = parsed
            .required(module)
            .and_then(|dep| dep.version.clone())
            .unwrap_or_default();

        if found.is_empty() || compare_versions(&found, version) == Ordering::Less {
            return Err(GoError::VersionNotApplied {
                module: module.to_string(),
                expected: version.to_string(),
                found,
            }
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl DependencyEditor for GoEditor {
    fn technology(&self) -> Technology {
        Technology::Go
    }

    fn compare_versions(&self, a: &str, b: &str) -> Ordering {
        compare_versions(a, b)
    }

    async fn update_dependency(
        &mut self,
        fix: &VulnerabilityFix,
        project: &ProjectContext,
    ) -> Result<FixOutcome> {
        require_direct(self, fix)?;

        let module = fix.impacted_dependency_name.as_str();
        let version = ensure_v_prefix(&fix.suggested_fixed_version);
        let go_mod = require_manifest(&project.working_dir, &[GO_MOD], module)?;
        let module_root = go_mod
            .parent()
            .map_or_else(|| project.working_dir.clone(), Path::to_path_buf);

        let content = read_manifest(&go_mod).await?;
        let parsed = parse_go_mod(&content)?;
        let Some(required) = parsed.required(module) else {
            return Err(GoError::ModuleNotRequired {
                module: module.to_string(),
            }
            .into());
        };

        if let Some(current) = &required.version
            && compare_versions(current, &version) != Ordering::Less
        {
            tracing::info!(
                package = %module,
                current = %current,
                fixed = %version,
                "go.mod already requires a fixed version"
            );
            return Ok(FixOutcome::unchanged());
        }

        if parsed.is_replaced(module) {
            tracing::warn!(package = %module, "module is redirected by a replace directive");
        }

        if self.settings.use_module_tool {
            self.run_module_tool(&module_root, module, &version).await?;
            self.verify_applied(&go_mod, module, &version).await?;

            let mut changed = vec![go_mod];
            let go_sum = module_root.join(GO_SUM);
            if go_sum.is_file() {
                changed.push(go_sum);
            }
            tracing::info!(package = %module, version = %version, "upgraded go module");
            return Ok(FixOutcome::changed(changed));
        }

        let Some(span) = required.version_span.clone() else {
            return Err(GoError::parse(format!("no version recorded for {module}")).into());
        };
        let updated = splice(&content, span, &version);
        write_if_changed(&go_mod, &content, &updated).await?;

        tracing::info!(package = %module, version = %version, "rewrote go.mod require");
        Ok(FixOutcome::changed([go_mod]))
    }
}
