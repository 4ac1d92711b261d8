//! Version merge policy.
//!
//! Several reported vulnerabilities can name the same package with different
//! suggested versions. They are folded into one [`FixTarget`] whose version
//! only ever moves up, using the ordering of the package's ecosystem.

use crate::types::VulnerabilityFix;
use std::cmp::Ordering;

/// Returns `candidate` when it orders above `current`, otherwise `current`.
///
/// Uses [`compare_lenient`]; ecosystem editors pass their own ordering to
/// [`update_if_max_by`].
///
/// # Examples
///
/// ```
/// use depfix_core::version::update_if_max;
///
/// assert_eq!(update_if_max("1.2.3", "1.2.4"), "1.2.4");
/// assert_eq!(update_if_max("1.2.3", "1.0.4"), "1.2.3");
/// ```
pub fn update_if_max(current: &str, candidate: &str) -> String {
    update_if_max_by(current, candidate, compare_lenient)
}

/// [`update_if_max`] with an explicit ordering.
///
/// An empty `current` is always replaced; ties keep `current`.
pub fn update_if_max_by<F>(current: &str, candidate: &str, compare: F) -> String
where
    F: Fn(&str, &str) -> Ordering,
{
    if current.is_empty() || compare(candidate, current) == Ordering::Greater {
        candidate.to_string()
    } else {
        current.to_string()
    }
}

/// Semver ordering with a numeric fallback for non-semver strings.
///
/// A leading `v` is ignored. Strings that are not strict semver are
/// compared segment by segment: numeric segments numerically, others
/// lexically, and a missing segment counts as zero.
pub fn compare_lenient(a: &str, b: &str) -> Ordering {
    let a = a.trim().trim_start_matches('v');
    let b = b.trim().trim_start_matches('v');

    if let (Ok(va), Ok(vb)) = (semver::Version::parse(a), semver::Version::parse(b)) {
        return va.cmp(&vb);
    }

    compare_segments(a, b)
}

fn compare_segments(a: &str, b: &str) -> Ordering {
    let split = |s: &str| -> Vec<String> {
        s.split(['.', '-', '+', '_'])
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect()
    };
    let left = split(a);
    let right = split(b);

    for i in 0..left.len().max(right.len()) {
        let l = left.get(i).map_or("0", String::as_str);
        let r = right.get(i).map_or("0", String::as_str);
        let ord = match (l.parse::<u64>(), r.parse::<u64>()) {
            (Ok(ln), Ok(rn)) => ln.cmp(&rn),
            (Ok(_), Err(_)) => Ordering::Greater,
            (Err(_), Ok(_)) => Ordering::Less,
            (Err(_), Err(_)) => l.cmp(r),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Merged remediation request for one (technology, package) pair.
///
/// Lives for a single run. The fixed version never decreases and the target
/// counts as direct when any merged fix was direct.
#[derive(Debug, Clone)]
pub struct FixTarget {
    fix: VulnerabilityFix,
    merged: usize,
}

impl FixTarget {
    pub fn new(fix: VulnerabilityFix) -> Self {
        Self { fix, merged: 1 }
    }

    /// Folds another fix for the same package into this target.
    pub fn merge<F>(&mut self, other: &VulnerabilityFix, compare: F)
    where
        F: Fn(&str, &str) -> Ordering,
    {
        self.fix.suggested_fixed_version = update_if_max_by(
            &self.fix.suggested_fixed_version,
            &other.suggested_fixed_version,
            compare,
        );
        self.fix.is_direct_dependency |= other.is_direct_dependency;
        self.merged += 1;
    }

    /// The fix that will be handed to the editor.
    pub fn fix(&self) -> &VulnerabilityFix {
        &self.fix
    }

    pub fn fixed_version(&self) -> &str {
        &self.fix.suggested_fixed_version
    }

    /// Number of reported fixes folded into this target.
    pub fn merged_count(&self) -> usize {
        self.merged
    }

    pub fn into_fix(self) -> VulnerabilityFix {
        self.fix
    }
}
