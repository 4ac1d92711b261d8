//! package.json model with byte-span tracking.
//!
//! Values are read with `serde_json` and located in the original text by
//! key search, so edits touch only the quoted version string.

use crate::error::{NpmError, Result};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::ops::Range;

/// Section of package.json a dependency appears in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NpmDependencySection {
    Dependencies,
    DevDependencies,
    PeerDependencies,
    OptionalDependencies,
    /// Top-level entries of the `overrides` block
    Overrides,
}

impl NpmDependencySection {
    pub const DECLARING: [Self; 4] = [
        Self::Dependencies,
        Self::DevDependencies,
        Self::PeerDependencies,
        Self::OptionalDependencies,
    ];

    /// JSON key of the section.
    pub fn key(self) -> &'static str {
        match self {
            Self::Dependencies => "dependencies",
            Self::DevDependencies => "devDependencies",
            Self::PeerDependencies => "peerDependencies",
            Self::OptionalDependencies => "optionalDependencies",
            Self::Overrides => "overrides",
        }
    }
}

impl fmt::Display for NpmDependencySection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A dependency entry from package.json.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpmDependency {
    pub name: String,
    /// Version requirement (e.g., "^4.18.2"); `None` for non-string values
    pub version_req: Option<String>,
    /// Byte span of the version text, without quotes
    pub version_span: Option<Range<usize>>,
    pub section: NpmDependencySection,
}

/// Parsed package.json.
#[derive(Debug, Clone, Default)]
pub struct PackageJson {
    pub dependencies: Vec<NpmDependency>,
    pub overrides: Vec<NpmDependency>,
}

impl PackageJson {
    /// First declaration of `name` in a dependency section.
    pub fn declared(&self, name: &str) -> Option<&NpmDependency> {
        self.dependencies.iter().find(|d| d.name == name)
    }

    /// Top-level override for `name`.
    pub fn override_for(&self, name: &str) -> Option<&NpmDependency> {
        self.overrides.iter().find(|d| d.name == name)
    }
}

/// Parses package.json content.
///
/// # Examples
///
/// ```
/// use depfix_npm::package_json::parse_package_json;
///
/// let json = r#"{
///   "dependencies": { "express": "^4.18.2" },
///   "overrides": { "minimist": "1.2.5" }
/// }"#;
/// let parsed = parse_package_json(json).unwrap();
/// assert_eq!(parsed.declared("express").unwrap().version_req.as_deref(), Some("^4.18.2"));
/// let minimist = parsed.override_for("minimist").unwrap();
/// assert_eq!(&json[minimist.version_span.clone().unwrap()], "1.2.5");
/// ```
pub fn parse_package_json(content: &str) -> Result<PackageJson> {
    let root: Value = serde_json::from_str(content)?;
    let mut parsed = PackageJson::default();

    for section in NpmDependencySection::DECLARING {
        if let Some(deps) = root.get(section.key()).and_then(Value::as_object) {
            parsed
                .dependencies
                .extend(parse_dependency_section(content, deps, section));
        }
    }

    if let Some(overrides) = root
        .get(NpmDependencySection::Overrides.key())
        .and_then(Value::as_object)
    {
        parsed.overrides = parse_dependency_section(content, overrides, NpmDependencySection::Overrides);
    }

    tracing::debug!(
        dependencies = parsed.dependencies.len(),
        overrides = parsed.overrides.len(),
        "parsed package.json"
    );

    Ok(parsed)
}

fn parse_dependency_section(
    content: &str,
    deps: &serde_json::Map<String, Value>,
    section: NpmDependencySection,
) -> Vec<NpmDependency> {
    let section_start = find_key(content, 0, section.key()).unwrap_or(0);

    deps.iter()
        .map(|(name, value)| {
            let version_req = value.as_str().map(String::from);
            let version_span = version_req
                .as_deref()
                .and_then(|version| find_value_span(content, section_start, name, version));
            NpmDependency {
                name: name.clone(),
                version_req,
                version_span,
                section,
            }
        })
        .collect()
}

/// Finds `"key"` used as an object key at or after `from`.
///
/// Returns the offset just past the colon. Occurrences of the name as a
/// value (for example inside `scripts`) are skipped.
fn find_key(content: &str, from: usize, key: &str) -> Option<usize> {
    let pattern = format!("\"{key}\"");
    let mut search_start = from;

    while let Some(rel_idx) = content.get(search_start..)?.find(&pattern) {
        let after_idx = search_start + rel_idx + pattern.len();
        let after = &content[after_idx..];
        let trimmed = after.trim_start();
        if let Some(rest) = trimmed.strip_prefix(':') {
            return Some(content.len() - rest.len());
        }
        search_start = after_idx;
    }
    None
}

/// Byte span of the string value of `name` (without quotes).
fn find_value_span(content: &str, from: usize, name: &str, version: &str) -> Option<Range<usize>> {
    let colon_end = find_key(content, from, name)?;
    let after = &content[colon_end..];
    let value_start = colon_end + (after.len() - after.trim_start().len());
    let quoted = format!("\"{version}\"");

    content[value_start..].starts_with(&quoted).then(|| {
        let start = value_start + 1;
        start..start + version.len()
    })
}

/// Rewrites the top-level override of `package` to `version`.
///
/// Returns `Ok(None)` when package.json has no string override for it.
pub fn set_override(content: &str, package: &str, version: &str) -> Result<Option<String>> {
    let parsed = parse_package_json(content)?;
    let Some(entry) = parsed.override_for(package) else {
        return Ok(None);
    };
    let Some(span) = entry.version_span.clone() else {
        return Err(NpmError::ValueNotFound {
            package: package.to_string(),
            section: NpmDependencySection::Overrides.to_string(),
        });
    };
    Ok(Some(depfix_core::manifest::splice(content, span, version)))
}

/// node-semver ordering, falling back to lenient comparison.
///
/// # Examples
///
/// ```
/// use depfix_npm::package_json::compare_versions;
/// use std::cmp::Ordering;
///
/// assert_eq!(compare_versions("1.2.6", "1.2.10"), Ordering::Less);
/// assert_eq!(compare_versions("v2.0.0", "2.0.0-beta.1"), Ordering::Greater);
/// ```
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (
        node_semver::Version::parse(a.trim()),
        node_semver::Version::parse(b.trim()),
    ) {
        (Ok(va), Ok(vb)) => va.cmp(&vb),
        _ => depfix_core::version::compare_lenient(a, b),
    }
}

/// Whether a requirement already guarantees at least `version`.
///
/// Only exact versions and ranges with a single lower bound (`^1.2.6`,
/// `~1.2.6`, `>=1.2.6`) are considered.
pub fn requirement_satisfies(requirement: &str, version: &str) -> bool {
    let floor = requirement
        .trim()
        .trim_start_matches(['^', '~', '>', '=', 'v'])
        .trim();
    if floor.is_empty() || floor.contains([' ', '|', '<', '*', 'x', 'X']) {
        return false;
    }
    node_semver::Version::parse(floor).is_ok() && compare_versions(floor, version) != Ordering::Less
}
