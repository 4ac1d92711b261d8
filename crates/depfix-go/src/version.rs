//! Version ordering for Go modules.
//!
//! Go versions are semver with a mandatory `v` prefix. Pseudo-versions are
//! ordinary semver pre-releases (`v1.2.4-0.20191109021931-daa7c04131f5`
//! sorts after `v1.2.3` and before `v1.2.4`), so plain semver precedence is
//! the module ordering once build metadata such as `+incompatible` is
//! dropped.

use depfix_core::version::compare_lenient;
use std::cmp::Ordering;

/// Adds the `v` prefix Go module versions require.
///
/// # Examples
///
/// ```
/// use depfix_go::ensure_v_prefix;
///
/// assert_eq!(ensure_v_prefix("1.7.7"), "v1.7.7");
/// assert_eq!(ensure_v_prefix("v0.7.0"), "v0.7.0");
/// ```
pub fn ensure_v_prefix(version: &str) -> String {
    let version = version.trim();
    if version.starts_with('v') {
        version.to_string()
    } else {
        format!("v{version}")
    }
}

fn module_semver(version: &str) -> Option<semver::Version> {
    let mut parsed = semver::Version::parse(version.trim().trim_start_matches('v')).ok()?;
    parsed.build = semver::BuildMetadata::EMPTY;
    Some(parsed)
}

/// Whether `version` is a pseudo-version naming an untagged commit.
///
/// The last pre-release identifier of a pseudo-version is a 14-digit UTC
/// timestamp and a 12-character commit hash joined by `-`.
///
/// # Examples
///
/// ```
/// use depfix_go::is_pseudo_version;
///
/// assert!(is_pseudo_version("v0.0.0-20191109021931-daa7c04131f5"));
/// assert!(!is_pseudo_version("v1.2.3"));
/// ```
pub fn is_pseudo_version(version: &str) -> bool {
    let Some(parsed) = module_semver(version) else {
        return false;
    };
    let Some(last) = parsed.pre.as_str().rsplit('.').next() else {
        return false;
    };
    match last.split_once('-') {
        Some((timestamp, revision)) => {
            timestamp.len() == 14
                && timestamp.bytes().all(|b| b.is_ascii_digit())
                && revision.len() == 12
                && revision.bytes().all(|b| b.is_ascii_hexdigit())
        }
        None => false,
    }
}

/// Orders two Go module versions.
///
/// The `v` prefix is optional and `+incompatible` is ignored. Versions that
/// are not semver fall back to a lenient segment-wise comparison.
///
/// # Examples
///
/// ```
/// use depfix_go::compare_versions;
/// use std::cmp::Ordering;
///
/// assert_eq!(compare_versions("v1.6.0", "1.7.7"), Ordering::Less);
/// assert_eq!(compare_versions("v2.0.0+incompatible", "v2.0.0"), Ordering::Equal);
/// ```
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (module_semver(a), module_semver(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        _ => compare_lenient(a.trim_start_matches('v'), b.trim_start_matches('v')),
    }
}
