//! Requirement clause matching for requirements files and `setup.py`.
//!
//! A clause is the `name[extras] <specifiers>` part of a requirement line.
//! Environment markers (`; python_version < "3.8"`), trailing comments and
//! surrounding quotes are outside the clause and are never rewritten.

use depfix_core::normalize_python_name;
use depfix_core::version::compare_lenient;
use pep440_rs::{Operator, Version, VersionSpecifiers};
use regex::Regex;
use std::cmp::Ordering;
use std::ops::Range;
use std::str::FromStr;

const SPECIFIER: &str = r"(?:===|==|!=|~=|<=|>=|<|>)[ \t]*[A-Za-z0-9.*+!_-]+";

/// A located requirement clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementClause {
    /// Byte span of the clause in the searched text
    pub span: Range<usize>,
    /// Package name as written
    pub name: String,
    /// Extras including brackets (e.g., `[security]`), if any
    pub extras: Option<String>,
    /// Version specifiers as written, possibly empty
    pub specifiers: String,
}

impl RequirementClause {
    /// The clause rewritten to pin `version` exactly.
    ///
    /// # Examples
    ///
    /// ```
    /// use depfix_pypi::requirements::find_requirement;
    ///
    /// let clause = find_requirement("PyJWT>1.7.1\n", "pyjwt").unwrap();
    /// assert_eq!(clause.pinned("2.4.0"), "pyjwt==2.4.0");
    /// ```
    pub fn pinned(&self, version: &str) -> String {
        let extras = self.extras.as_deref().map(str::trim_start).unwrap_or_default();
        format!("{}{}=={}", self.name.to_lowercase(), extras, version)
    }

    /// Lowest version the clause admits, see [`lower_bound`].
    pub fn lower_bound(&self) -> Option<Version> {
        lower_bound(&self.specifiers)
    }
}

/// Lowest version admitted by PEP 440 `specifiers`, when they set a floor.
///
/// `==`, `===`, `>=`, `>` and `~=` bound from below; with several of them
/// the highest wins. Returns `None` for an unbounded or unparsable set.
///
/// # Examples
///
/// ```
/// use depfix_pypi::requirements::lower_bound;
///
/// assert_eq!(lower_bound(">=3.0, <4").unwrap().to_string(), "3.0");
/// assert_eq!(lower_bound("~=1.0.15").unwrap().to_string(), "1.0.15");
/// assert!(lower_bound("<=1.7.4").is_none());
/// ```
pub fn lower_bound(specifiers: &str) -> Option<Version> {
    let specifiers = VersionSpecifiers::from_str(specifiers.trim()).ok()?;
    specifiers
        .iter()
        .filter(|specifier| {
            matches!(
                specifier.operator(),
                Operator::Equal
                    | Operator::ExactEqual
                    | Operator::GreaterThanEqual
                    | Operator::GreaterThan
                    | Operator::TildeEqual
            )
        })
        .map(|specifier| specifier.version().clone())
        .max()
}

/// Whether `specifiers` already exclude everything below `version`.
pub fn floor_satisfies(specifiers: &str, version: &str) -> bool {
    let Ok(wanted) = Version::from_str(version.trim()) else {
        return false;
    };
    lower_bound(specifiers).is_some_and(|floor| floor >= wanted)
}

/// Builds the name part of the pattern: case-insensitive elsewhere, with runs
/// of `-`, `_` and `.` treated as equivalent.
fn name_pattern(package: &str) -> String {
    normalize_python_name(package)
        .split('-')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("[-_.]+")
}

fn clause_regex(package: &str) -> Option<Regex> {
    let pattern = format!(
        r#"(?im)(?:^[ \t]*|["'])(?P<clause>(?P<name>{name})(?P<extras>[ \t]*\[[^\]\n]*\])?(?P<spec>[ \t]*{SPECIFIER}(?:[ \t]*,[ \t]*{SPECIFIER})*)?)"#,
        name = name_pattern(package),
    );
    Regex::new(&pattern).ok()
}

/// Whether `c` may follow a complete clause.
fn is_clause_boundary(c: Option<char>) -> bool {
    match c {
        None => true,
        Some(c) => c.is_whitespace() || matches!(c, ';' | '#' | '"' | '\'' | ',' | ')' | '\\'),
    }
}

/// Whether `offset` follows a `#` on its line.
fn in_comment(content: &str, offset: usize) -> bool {
    let line_start = content[..offset].rfind('\n').map_or(0, |i| i + 1);
    content[line_start..offset].contains('#')
}

/// Finds the first requirement clause declaring `package`.
///
/// Matching is anchored at the start of a line or just after a quote, so
/// packages whose names merely start with `package` are skipped. Anything
/// after a `#` on the same line is a comment and never matches.
///
/// # Examples
///
/// ```
/// use depfix_pypi::requirements::find_requirement;
///
/// let content = "passlib<=1.7.4\nurllib3 > 1.1.9, < 1.5.*";
/// let clause = find_requirement(content, "urllib3").unwrap();
/// assert_eq!(&content[clause.span.clone()], "urllib3 > 1.1.9, < 1.5.*");
/// ```
pub fn find_requirement(content: &str, package: &str) -> Option<RequirementClause> {
    let regex = clause_regex(package)?;

    regex.captures_iter(content).find_map(|caps| {
        let clause = caps.name("clause")?;
        if !is_clause_boundary(content[clause.end()..].chars().next())
            || in_comment(content, clause.start())
        {
            return None;
        }
        Some(RequirementClause {
            span: clause.range(),
            name: caps.name("name")?.as_str().to_string(),
            extras: caps.name("extras").map(|m| m.as_str().to_string()),
            specifiers: caps
                .name("spec")
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
        })
    })
}

/// Outcome of pinning a package in a text manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinResult {
    /// The clause was rewritten
    Updated(String),
    /// The requirement already excludes every version below the requested one
    AlreadyPinned,
    /// No clause declares the package
    NotFound,
}

/// Pins `package` to `version` in requirements-style text.
pub fn pin_requirement(content: &str, package: &str, version: &str) -> PinResult {
    let Some(clause) = find_requirement(content, package) else {
        return PinResult::NotFound;
    };

    if floor_satisfies(&clause.specifiers, version) {
        return PinResult::AlreadyPinned;
    }

    let replacement = clause.pinned(version);
    PinResult::Updated(depfix_core::manifest::splice(
        content,
        clause.span,
        &replacement,
    ))
}

/// PEP 440 ordering, falling back to lenient numeric comparison.
///
/// # Examples
///
/// ```
/// use depfix_pypi::requirements::compare_versions;
/// use std::cmp::Ordering;
///
/// assert_eq!(compare_versions("2.4.0rc1", "2.4.0"), Ordering::Less);
/// assert_eq!(compare_versions("1.26.5", "1.26.18"), Ordering::Less);
/// ```
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (Version::from_str(a.trim()), Version::from_str(b.trim())) {
        (Ok(va), Ok(vb)) => va.cmp(&vb),
        _ => compare_lenient(a, b),
    }
}
