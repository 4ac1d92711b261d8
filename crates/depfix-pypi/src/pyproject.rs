//! pyproject.toml and Pipfile handling.
//!
//! Uses `toml_edit` so that only the edited value changes; comments,
//! whitespace and key order of the document are preserved.

use crate::error::{PypiError, Result};
use crate::requirements::{PinResult, floor_satisfies, lower_bound, pin_requirement};
use depfix_core::normalize_python_name;
use pep508_rs::Requirement;
use toml_edit::{DocumentMut, Item, TableLike, Value};

/// Where a declaration was found in pyproject.toml.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PyprojectSection {
    /// `[tool.poetry.dependencies]`
    PoetryDependencies,
    /// `[tool.poetry.group.<group>.dependencies]`
    PoetryGroup { group: String },
    /// `[project] dependencies`
    Dependencies,
    /// `[project.optional-dependencies] <group>`
    OptionalDependencies { group: String },
}

/// Result of pinning a package in pyproject.toml.
#[derive(Debug, Clone)]
pub struct PyprojectEdit {
    /// Document text after the edit
    pub content: String,
    /// Sections where the package was declared
    pub sections: Vec<PyprojectSection>,
    /// Whether any value actually changed
    pub changed: bool,
}

/// Pins every declaration of `package` in pyproject.toml to `version`.
///
/// Poetry tables receive the bare version (an exact constraint in Poetry);
/// PEP 621 requirement strings have their clause rewritten to `==version`
/// with extras and markers kept, and the result is validated as PEP 508.
///
/// # Errors
///
/// Returns an error if the TOML is malformed, the package is not declared
/// in any supported section, or a rewritten requirement is invalid.
///
/// # Examples
///
/// ```
/// use depfix_pypi::pyproject::pin_in_pyproject;
///
/// let content = "[tool.poetry.dependencies]\npython = \"^3.9\"\nPyJWT = \"^1.7.1\" # auth\n";
/// let edit = pin_in_pyproject(content, "pyjwt", "2.4.0").unwrap();
/// assert_eq!(
///     edit.content,
///     "[tool.poetry.dependencies]\npython = \"^3.9\"\nPyJWT = \"2.4.0\" # auth\n"
/// );
/// ```
pub fn pin_in_pyproject(content: &str, package: &str, version: &str) -> Result<PyprojectEdit> {
    let mut doc = content.parse::<DocumentMut>()?;
    let mut sections = Vec::new();
    let mut changed = false;

    if let Some(poetry) = doc
        .get_mut("tool")
        .and_then(Item::as_table_like_mut)
        .and_then(|tool| tool.get_mut("poetry"))
        .and_then(Item::as_table_like_mut)
    {
        if let Some(deps) = poetry
            .get_mut("dependencies")
            .and_then(Item::as_table_like_mut)
            && let Some(did_change) = pin_poetry_table(deps, package, version)
        {
            sections.push(PyprojectSection::PoetryDependencies);
            changed |= did_change;
        }

        if let Some(groups) = poetry.get_mut("group").and_then(Item::as_table_like_mut) {
            for (group, item) in groups.iter_mut() {
                if let Some(deps) = item
                    .as_table_like_mut()
                    .and_then(|g| g.get_mut("dependencies"))
                    .and_then(Item::as_table_like_mut)
                    && let Some(did_change) = pin_poetry_table(deps, package, version)
                {
                    sections.push(PyprojectSection::PoetryGroup {
                        group: group.get().to_string(),
                    });
                    changed |= did_change;
                }
            }
        }
    }

    if let Some(project) = doc.get_mut("project").and_then(Item::as_table_like_mut) {
        if let Some(item) = project.get_mut("dependencies")
            && let Some(did_change) = pin_requirement_array(item, package, version)?
        {
            sections.push(PyprojectSection::Dependencies);
            changed |= did_change;
        }

        if let Some(optional) = project
            .get_mut("optional-dependencies")
            .and_then(Item::as_table_like_mut)
        {
            for (group, item) in optional.iter_mut() {
                if let Some(did_change) = pin_requirement_array(item, package, version)? {
                    sections.push(PyprojectSection::OptionalDependencies {
                        group: group.get().to_string(),
                    });
                    changed |= did_change;
                }
            }
        }
    }

    if sections.is_empty() {
        return Err(PypiError::not_declared(package, "pyproject.toml"));
    }

    tracing::debug!(package = %package, sections = ?sections, "pinned pyproject.toml");

    Ok(PyprojectEdit {
        content: if changed { doc.to_string() } else { content.to_string() },
        sections,
        changed,
    })
}

/// Pins `package` in a Poetry dependency table.
///
/// Returns `None` when the table does not declare it, otherwise whether the
/// value changed.
fn pin_poetry_table(table: &mut dyn TableLike, package: &str, version: &str) -> Option<bool> {
    let wanted = normalize_python_name(package);
    let (_, item) = table
        .iter_mut()
        .find(|(key, _)| normalize_python_name(key.get()) == wanted)?;

    let value = match item {
        Item::Value(Value::InlineTable(inline)) => inline.get_mut("version")?,
        Item::Table(table) => table.get_mut("version")?.as_value_mut()?,
        Item::Value(value) => value,
        _ => return None,
    };

    if value
        .as_str()
        .is_some_and(|current| poetry_constraint_satisfies(current, version))
    {
        return Some(false);
    }
    Some(replace_string(value, version))
}

/// Lowest version a Poetry constraint admits.
///
/// Bare versions, caret and tilde constraints bound from below at the
/// version they name; other comma-separated parts are read as PEP 440.
/// `||` unions have no single floor.
fn poetry_floor(constraint: &str) -> Option<pep440_rs::Version> {
    if constraint.contains("||") {
        return None;
    }
    constraint
        .split(',')
        .filter_map(|part| {
            let part = part.trim();
            let bare = part
                .strip_prefix('^')
                .or_else(|| part.strip_prefix('~').filter(|rest| !rest.starts_with('=')))
                .unwrap_or(part)
                .trim();
            bare.parse::<pep440_rs::Version>()
                .ok()
                .or_else(|| lower_bound(part))
        })
        .max()
}

/// Whether a Poetry constraint already excludes everything below `version`.
fn poetry_constraint_satisfies(constraint: &str, version: &str) -> bool {
    match (poetry_floor(constraint), version.trim().parse::<pep440_rs::Version>()) {
        (Some(floor), Ok(wanted)) => floor >= wanted,
        _ => false,
    }
}

/// Pins `package` in an array of PEP 508 requirement strings.
fn pin_requirement_array(item: &mut Item, package: &str, version: &str) -> Result<Option<bool>> {
    let Some(array) = item.as_array_mut() else {
        return Ok(None);
    };

    let mut found = None;
    for value in array.iter_mut() {
        let Some(text) = value.as_str() else {
            continue;
        };
        let updated = match pin_requirement(text, package, version) {
            PinResult::NotFound => continue,
            PinResult::AlreadyPinned => {
                found = Some(found.unwrap_or(false));
                continue;
            }
            PinResult::Updated(updated) => updated,
        };

        validate_requirement(&updated, package)?;
        replace_string(value, &updated);
        found = Some(true);
    }
    Ok(found)
}

/// Checks a rewritten requirement still parses and names `package`.
pub fn validate_requirement(requirement: &str, package: &str) -> Result<()> {
    let parsed = requirement
        .parse::<Requirement>()
        .map_err(|e| PypiError::InvalidRequirement {
            requirement: requirement.to_string(),
            message: e.to_string(),
        })?;

    if normalize_python_name(&parsed.name.to_string()) != normalize_python_name(package) {
        return Err(PypiError::InvalidRequirement {
            requirement: requirement.to_string(),
            message: format!("expected package {package}, found {}", parsed.name),
        });
    }
    Ok(())
}

/// Replaces a value with a string, keeping its surrounding decor.
fn replace_string(value: &mut Value, new: &str) -> bool {
    if value.as_str() == Some(new) {
        return false;
    }
    let decor = value.decor().clone();
    *value = Value::from(new);
    *value.decor_mut() = decor;
    true
}

/// A package entry of a Pipfile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipfileEntry {
    /// `packages` or `dev-packages`
    pub section: &'static str,
    /// Version constraint (`"*"`, `"==2.4.0"`, or a table's `version` key)
    pub version: Option<String>,
}

impl PipfileEntry {
    /// Whether the entry already excludes everything below `version`.
    pub fn satisfies(&self, version: &str) -> bool {
        self.version
            .as_deref()
            .is_some_and(|constraint| floor_satisfies(constraint, version))
    }
}

/// Finds `package` in a Pipfile's `[packages]` or `[dev-packages]`.
///
/// # Examples
///
/// ```
/// use depfix_pypi::pyproject::pipfile_entry;
///
/// let pipfile = "[packages]\nPyJWT = \"==2.4.0\"\n\n[dev-packages]\npytest = { version = \">=7.0\" }\n";
/// let pyjwt = pipfile_entry(pipfile, "pyjwt").unwrap().unwrap();
/// assert_eq!(pyjwt.version.as_deref(), Some("==2.4.0"));
/// assert!(pyjwt.satisfies("2.4.0"));
/// assert_eq!(pipfile_entry(pipfile, "pytest").unwrap().unwrap().section, "dev-packages");
/// assert!(pipfile_entry(pipfile, "urllib3").unwrap().is_none());
/// ```
pub fn pipfile_entry(content: &str, package: &str) -> Result<Option<PipfileEntry>> {
    let doc = content.parse::<DocumentMut>()?;
    let wanted = normalize_python_name(package);

    for section in ["packages", "dev-packages"] {
        let Some(table) = doc.get(section).and_then(Item::as_table_like) else {
            continue;
        };
        let Some((_, item)) = table
            .iter()
            .find(|(key, _)| normalize_python_name(key) == wanted)
        else {
            continue;
        };
        let version = match item {
            Item::Value(Value::String(text)) => Some(text.value().clone()),
            other => other
                .as_table_like()
                .and_then(|t| t.get("version"))
                .and_then(Item::as_str)
                .map(String::from),
        };
        return Ok(Some(PipfileEntry { section, version }));
    }
    Ok(None)
}
