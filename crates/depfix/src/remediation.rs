//! A remediation run.
//!
//! Reported fixes are grouped by technology and normalized package name,
//! merged so that each package is upgraded once to the highest requested
//! version, then applied one after another. A failing package never stops
//! the run; its failure is recorded in the report.

use crate::config::DepfixConfig;
use crate::dispatcher::Dispatcher;
use depfix_core::{
    FixError, FixOutcome, FixTarget, ProjectContext, SharedRunner, Technology, VulnerabilityFix,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;

/// Input of one run, as read by the binary.
#[derive(Debug, Clone, Deserialize)]
pub struct RemediationRequest {
    #[serde(default)]
    pub config: DepfixConfig,
    pub project: ProjectContext,
    /// Raw fixes; each is validated on its own so one bad entry does not
    /// reject the whole request
    #[serde(default)]
    pub fixes: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FixStatus {
    /// The manifest now carries the fixed version. `files_changed` is empty
    /// when it already did.
    Fixed { files_changed: Vec<PathBuf> },
    Unsupported { reason: String },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub package: String,
    pub technology: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_version: Option<String>,
    /// Number of reported fixes merged into this entry
    pub merged_fixes: usize,
    #[serde(flatten)]
    pub status: FixStatus,
}

impl ReportEntry {
    fn from_result(target: &FixTarget, result: depfix_core::Result<FixOutcome>) -> Self {
        let fix = target.fix();
        let status = match result {
            Ok(outcome) => FixStatus::Fixed {
                files_changed: outcome.files_changed,
            },
            Err(FixError::UnsupportedFix { reason, .. }) => FixStatus::Unsupported { reason },
            Err(e) => FixStatus::Failed {
                error: e.to_string(),
            },
        };
        Self {
            package: fix.impacted_dependency_name.clone(),
            technology: fix.technology.to_string(),
            fixed_version: Some(fix.suggested_fixed_version.clone()),
            merged_fixes: target.merged_count(),
            status,
        }
    }

    fn rejected(raw: &Value, error: &FixError) -> Self {
        let field = |name: &str| {
            raw.get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Self {
            package: field("impacted_dependency_name"),
            technology: field("technology"),
            fixed_version: raw
                .get("suggested_fixed_version")
                .and_then(Value::as_str)
                .map(str::to_string),
            merged_fixes: 1,
            status: FixStatus::Failed {
                error: error.to_string(),
            },
        }
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self.status, FixStatus::Fixed { .. })
    }
}

/// Outcome of a run, one entry per package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemediationReport {
    pub entries: Vec<ReportEntry>,
}

impl RemediationReport {
    pub fn entry(&self, technology: Technology, package: &str) -> Option<&ReportEntry> {
        self.entries
            .iter()
            .find(|e| e.technology == technology.as_str() && e.package == package)
    }

    pub fn fixed_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_fixed()).count()
    }

    pub fn unsupported_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.status, FixStatus::Unsupported { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.status, FixStatus::Failed { .. }))
            .count()
    }
}

/// Validates one raw fix.
///
/// The technology tag is checked first so an unrecognized ecosystem is
/// reported as such rather than as a generic decoding error.
pub fn parse_fix(raw: &Value) -> depfix_core::Result<VulnerabilityFix> {
    let tag = raw
        .get("technology")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let technology: Technology = tag.parse()?;

    let mut canonical = raw.clone();
    if let Some(fields) = canonical.as_object_mut() {
        fields.insert("technology".to_string(), Value::from(technology.as_str()));
    }

    serde_json::from_value(canonical).map_err(|e| {
        FixError::parse(
            raw.get("impacted_dependency_name")
                .and_then(Value::as_str)
                .unwrap_or_default(),
            "request",
            format!("invalid fix: {e}"),
        )
    })
}

/// Applies fixes to one project.
pub struct Remediation {
    dispatcher: Dispatcher,
}

impl Remediation {
    pub fn new(runner: SharedRunner, config: DepfixConfig) -> Self {
        Self {
            dispatcher: Dispatcher::new(runner, config),
        }
    }

    /// Merges fixes per (technology, package) in first-seen order.
    pub fn group(&mut self, fixes: Vec<VulnerabilityFix>) -> Vec<FixTarget> {
        let mut index: HashMap<(Technology, String), usize> = HashMap::new();
        let mut targets: Vec<FixTarget> = Vec::new();

        for fix in fixes {
            let key = (fix.technology, fix.package_key());
            if let Some(&position) = index.get(&key) {
                let editor = self.dispatcher.editor(fix.technology);
                targets[position].merge(&fix, |a, b| editor.compare_versions(a, b));
                tracing::debug!(
                    package = %fix.impacted_dependency_name,
                    technology = %fix.technology,
                    fixed = %targets[position].fixed_version(),
                    "merged duplicate fix"
                );
            } else {
                index.insert(key, targets.len());
                targets.push(FixTarget::new(fix));
            }
        }

        targets
    }

    /// Groups, merges and applies `fixes` sequentially.
    pub async fn run(
        &mut self,
        fixes: Vec<VulnerabilityFix>,
        project: &ProjectContext,
    ) -> RemediationReport {
        let targets = self.group(fixes);
        let mut report = RemediationReport::default();

        for target in &targets {
            let fix = target.fix();
            tracing::info!(
                package = %fix.impacted_dependency_name,
                technology = %fix.technology,
                version = %fix.suggested_fixed_version,
                direct = fix.is_direct_dependency,
                merged = target.merged_count(),
                "applying fix"
            );

            let editor = self.dispatcher.editor(fix.technology);
            let result = editor.update_dependency(fix, project).await;
            match &result {
                Ok(outcome) if outcome.is_unchanged() => {
                    tracing::info!(package = %fix.impacted_dependency_name, "already fixed");
                }
                Ok(_) => {}
                Err(e) if e.is_unsupported() => {
                    tracing::warn!(
                        package = %fix.impacted_dependency_name,
                        reason = %e,
                        "fix skipped"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        package = %fix.impacted_dependency_name,
                        error = %e,
                        "fix failed"
                    );
                }
            }
            report.entries.push(ReportEntry::from_result(target, result));
        }

        report
    }

    /// Validates the raw fixes of a request and runs the valid ones.
    ///
    /// Rejected fixes are reported first, followed by the applied ones.
    pub async fn run_request(
        runner: SharedRunner,
        request: RemediationRequest,
    ) -> RemediationReport {
        let mut rejected = Vec::new();
        let mut fixes = Vec::with_capacity(request.fixes.len());
        for raw in &request.fixes {
            match parse_fix(raw) {
                Ok(fix) => fixes.push(fix),
                Err(e) => {
                    tracing::warn!(error = %e, "rejecting fix");
                    rejected.push(ReportEntry::rejected(raw, &e));
                }
            }
        }

        let mut remediation = Self::new(runner, request.config);
        let mut report = remediation.run(fixes, &request.project).await;
        rejected.append(&mut report.entries);
        report.entries = rejected;
        report
    }
}
