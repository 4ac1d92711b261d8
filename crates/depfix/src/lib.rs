//! depfix applies suggested vulnerability fixes to project manifests.
//!
//! A run takes the fixes reported for one project, merges duplicates per
//! package and hands each merged fix to the editor of its ecosystem (Go,
//! pip, Pipenv, Poetry, npm, Yarn, Maven or NuGet). Editors either rewrite
//! the manifest themselves or drive the ecosystem's package manager.
//!
//! # Examples
//!
//! ```no_run
//! use depfix::{DepfixConfig, Remediation};
//! use depfix_core::{ProcessRunner, ProjectContext, Technology, VulnerabilityFix};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let mut remediation = Remediation::new(Arc::new(ProcessRunner), DepfixConfig::default());
//! let fixes = vec![VulnerabilityFix::new(Technology::Go, "golang.org/x/net", "0.7.0").direct(true)];
//! let report = remediation.run(fixes, &ProjectContext::new("/path/to/project")).await;
//! println!("{} fixed", report.fixed_count());
//! # }
//! ```

pub mod config;
pub mod dispatcher;
pub mod remediation;

pub use config::DepfixConfig;
pub use dispatcher::{Dispatcher, create_editor};
pub use remediation::{
    FixStatus, RemediationReport, RemediationRequest, Remediation, ReportEntry, parse_fix,
};
