//! End-to-end runs across several ecosystems with a recording runner.

mod common;

use common::{POM, REQUIREMENTS, project_with, read};
use depfix::{DepfixConfig, FixStatus, Remediation, RemediationRequest};
use depfix_core::test_utils::FakeRunner;
use depfix_core::{CommandOutput, ProjectContext, Technology, VulnerabilityFix};
use serde_json::json;
use std::sync::Arc;

const JACKSON: &str = "com.fasterxml.jackson.core:jackson-databind";

fn single_pom_config() -> DepfixConfig {
    serde_json::from_value(json!({ "maven": { "discover_modules": false } })).unwrap()
}

#[tokio::test]
async fn test_mixed_run() {
    let dir = project_with(&[
        ("pom.xml", POM),
        ("requirements.txt", REQUIREMENTS),
        (
            "go.mod",
            "module example.com/app\n\ngo 1.21\n\nrequire golang.org/x/net v0.5.0\n",
        ),
    ]);
    let project = ProjectContext::new(dir.path()).with_requirements_file("requirements.txt");
    let runner = FakeRunner::new();
    let mut remediation = Remediation::new(Arc::new(runner.clone()), single_pom_config());

    let fixes = vec![
        VulnerabilityFix::new(Technology::Maven, JACKSON, "2.13.4.2").direct(true),
        VulnerabilityFix::new(Technology::Pip, "pyjwt", "2.4.0").direct(true),
        VulnerabilityFix::new(Technology::Pip, "PyJWT", "2.1.0").direct(true),
        VulnerabilityFix::new(Technology::Yarn, "minimist", "1.2.6"),
        // `go get` is a no-op on the fake runner, so verification fails
        VulnerabilityFix::new(Technology::Go, "golang.org/x/net", "0.7.0").direct(true),
    ];
    let report = remediation.run(fixes, &project).await;

    assert_eq!(report.entries.len(), 4);
    assert_eq!(report.fixed_count(), 2);
    assert_eq!(report.unsupported_count(), 1);
    assert_eq!(report.failed_count(), 1);

    assert!(read(dir.path(), "pom.xml").contains("<jackson.version>2.13.4.2</jackson.version>"));
    assert_eq!(
        read(dir.path(), "requirements.txt"),
        "pyjwt==2.4.0\nrequests>=2.20 ; python_version >= \"3.6\"\n"
    );

    let pip = report.entry(Technology::Pip, "pyjwt").unwrap();
    assert_eq!(pip.merged_fixes, 2);
    assert_eq!(pip.fixed_version.as_deref(), Some("2.4.0"));

    assert_eq!(runner.command_lines(), vec!["go get golang.org/x/net@v0.7.0"]);
}

#[tokio::test]
async fn test_repeated_run_is_idempotent() {
    let dir = project_with(&[("requirements.txt", REQUIREMENTS)]);
    let project = ProjectContext::new(dir.path()).with_requirements_file("requirements.txt");
    let fixes = || vec![VulnerabilityFix::new(Technology::Pip, "PyJWT", "2.4.0").direct(true)];

    let mut remediation = Remediation::new(Arc::new(FakeRunner::new()), DepfixConfig::default());
    remediation.run(fixes(), &project).await;
    let after_first = read(dir.path(), "requirements.txt");

    let report = remediation.run(fixes(), &project).await;
    assert_eq!(read(dir.path(), "requirements.txt"), after_first);
    assert_eq!(
        report.entries[0].status,
        FixStatus::Fixed {
            files_changed: vec![]
        }
    );
}

#[tokio::test]
async fn test_request_with_unknown_technology() {
    let dir = project_with(&[("requirements.txt", REQUIREMENTS)]);
    let request: RemediationRequest = serde_json::from_value(json!({
        "project": {
            "working_dir": dir.path(),
            "pip_requirements_file": "requirements.txt"
        },
        "fixes": [
            {
                "technology": "cargo",
                "impacted_dependency_name": "serde",
                "suggested_fixed_version": "1.0.200"
            },
            {
                "technology": "pip",
                "impacted_dependency_name": "PyJWT",
                "suggested_fixed_version": "2.4.0",
                "is_direct_dependency": true
            }
        ]
    }))
    .unwrap();

    let report = Remediation::run_request(Arc::new(FakeRunner::new()), request).await;

    assert_eq!(report.entries.len(), 2);
    assert_eq!(report.entries[0].technology, "cargo");
    assert_eq!(
        report.entries[0].status,
        FixStatus::Failed {
            error: "unknown technology: cargo".into()
        }
    );
    assert!(report.entries[1].is_fixed());
}

#[tokio::test]
async fn test_maven_modules_discovered_once() {
    let child = POM.replace("<artifactId>demo</artifactId>", "<artifactId>child</artifactId>");
    let dir = project_with(&[("pom.xml", POM), ("child/pom.xml", &child)]);
    let project = ProjectContext::new(dir.path());

    let runner = FakeRunner::with_handler(|invocation| {
        if invocation.command_line().ends_with(":gav") {
            CommandOutput::success(
                "{\"pomPath\":\"pom.xml\"}\n{\"pomPath\":\"child/pom.xml\"}\n",
            )
        } else {
            CommandOutput::success("")
        }
    });
    let mut remediation = Remediation::new(Arc::new(runner.clone()), DepfixConfig::default());

    let fixes = vec![
        VulnerabilityFix::new(Technology::Maven, JACKSON, "2.13.4.2").direct(true),
        VulnerabilityFix::new(Technology::Maven, "org.example:missing", "1.0").direct(true),
    ];
    let report = remediation.run(fixes, &project).await;

    assert_eq!(report.fixed_count(), 1);
    assert_eq!(report.failed_count(), 1);
    assert!(read(dir.path(), "child/pom.xml").contains("2.13.4.2"));
    assert_eq!(runner.call_count(), 2);
}
