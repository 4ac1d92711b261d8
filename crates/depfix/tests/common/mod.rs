//! Shared fixtures for the depfix integration tests.

use std::path::Path;
use tempfile::TempDir;

/// Creates a scratch project holding `files` (path relative to the root,
/// content).
pub(crate) fn project_with(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    for (path, content) in files {
        let path = dir.path().join(path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create project dir");
        }
        std::fs::write(path, content).expect("Failed to write project file");
    }
    dir
}

pub(crate) fn read(root: &Path, path: &str) -> String {
    std::fs::read_to_string(root.join(path)).expect("Failed to read project file")
}

#[allow(dead_code)] // Used by the remediation tests only
pub(crate) const POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
    <modelVersion>4.0.0</modelVersion>
    <groupId>org.example</groupId>
    <artifactId>demo</artifactId>
    <version>1.0</version>
    <properties>
        <jackson.version>2.13.4</jackson.version>
    </properties>
    <dependencies>
        <dependency>
            <groupId>com.fasterxml.jackson.core</groupId>
            <artifactId>jackson-databind</artifactId>
            <version>${jackson.version}</version>
        </dependency>
    </dependencies>
</project>
"#;

pub(crate) const REQUIREMENTS: &str = "PyJWT==1.7.1\nrequests>=2.20 ; python_version >= \"3.6\"\n";
