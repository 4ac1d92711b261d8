//! .NET project files and their `PackageReference` items.

use crate::error::{NugetError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;
use std::path::{Path, PathBuf};

pub const PROJECT_EXTENSIONS: [&str; 3] = ["csproj", "fsproj", "vbproj"];

/// How many directory levels below the working directory are searched.
pub const MAX_SEARCH_DEPTH: usize = 4;

/// Build output and tooling directories never hold the project file.
const SKIPPED_DIRS: [&str; 4] = ["bin", "obj", "node_modules", "packages"];

static PACKAGE_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<PackageReference\b([^>]*?)(/?)>").expect("Invalid regex")
});

static INCLUDE_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bInclude\s*=\s*"([^"]*)""#).expect("Invalid regex"));

static VERSION_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bVersion\s*=\s*"([^"]*)""#).expect("Invalid regex"));

static VERSION_ELEMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<Version>\s*([^<]*?)\s*</Version>").expect("Invalid regex"));

static REFERENCE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</PackageReference\s*>").expect("Invalid regex"));

/// One `<PackageReference>` item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageReference {
    pub name: String,
    pub version: Option<String>,
    /// Byte span of the version text, attribute or child element
    pub version_span: Option<Range<usize>>,
}

/// Extracts every package reference in document order.
///
/// # Examples
///
/// ```
/// use depfix_nuget::project_file::parse_package_references;
///
/// let project = r#"<ItemGroup><PackageReference Include="Snappier" Version="1.0.0" /></ItemGroup>"#;
/// let references = parse_package_references(project);
/// assert_eq!(references[0].name, "Snappier");
/// assert_eq!(references[0].version.as_deref(), Some("1.0.0"));
/// ```
pub fn parse_package_references(content: &str) -> Vec<PackageReference> {
    let mut references = Vec::new();

    for tag in PACKAGE_REFERENCE.captures_iter(content) {
        let (Some(whole), Some(attrs)) = (tag.get(0), tag.get(1)) else {
            continue;
        };
        let Some(include) = INCLUDE_ATTR.captures(attrs.as_str()).and_then(|c| c.get(1)) else {
            continue;
        };

        let mut version = VERSION_ATTR
            .captures(attrs.as_str())
            .and_then(|c| c.get(1))
            .map(|m| (m.as_str().to_string(), attrs.start() + m.start()..attrs.start() + m.end()));

        let self_closing = tag.get(2).is_some_and(|m| !m.as_str().is_empty());
        if version.is_none() && !self_closing {
            let body_start = whole.end();
            let body_end = REFERENCE_END
                .find(&content[body_start..])
                .map_or(content.len(), |m| body_start + m.start());
            version = VERSION_ELEMENT
                .captures(&content[body_start..body_end])
                .and_then(|c| c.get(1))
                .map(|m| (m.as_str().to_string(), body_start + m.start()..body_start + m.end()));
        }

        let (version, version_span) = match version {
            Some((text, span)) => (Some(text), Some(span)),
            None => (None, None),
        };
        references.push(PackageReference {
            name: include.as_str().trim().to_string(),
            version,
            version_span,
        });
    }

    references
}

/// The reference to `package`, compared case-insensitively.
pub fn find_reference<'a>(
    references: &'a [PackageReference],
    package: &str,
) -> Option<&'a PackageReference> {
    references
        .iter()
        .find(|r| r.name.eq_ignore_ascii_case(package))
}

fn is_project_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| PROJECT_EXTENSIONS.iter().any(|p| ext.eq_ignore_ascii_case(p)))
}

/// Every project file under `root`, sorted, shallowest first.
pub async fn find_project_files(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut level = vec![root.to_path_buf()];

    for _ in 0..=MAX_SEARCH_DEPTH {
        let mut next = Vec::new();
        let mut files = Vec::new();
        for dir in level {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    let name = entry.file_name();
                    let name = name.to_string_lossy();
                    if !name.starts_with('.') && !SKIPPED_DIRS.contains(&name.as_ref()) {
                        next.push(path);
                    }
                } else if file_type.is_file() && is_project_file(&path) {
                    files.push(path);
                }
            }
        }
        files.sort();
        found.extend(files);
        if next.is_empty() {
            break;
        }
        next.sort();
        level = next;
    }

    Ok(found)
}

/// A project file and its parsed references.
#[derive(Debug, Clone)]
pub struct ProjectFile {
    pub path: PathBuf,
    pub content: String,
    pub references: Vec<PackageReference>,
}

impl ProjectFile {
    pub fn reference(&self, package: &str) -> Option<&PackageReference> {
        find_reference(&self.references, package)
    }
}

/// Every project file under `root` that references `package`, shallowest
/// first.
pub async fn locate_declaring_projects(root: &Path, package: &str) -> Result<Vec<ProjectFile>> {
    let candidates = find_project_files(root).await.unwrap_or_default();
    if candidates.is_empty() {
        return Err(NugetError::NoProjectFile {
            dir: root.display().to_string(),
        });
    }

    let mut declaring = Vec::new();
    for path in candidates {
        let Ok(content) = tokio::fs::read_to_string(&path).await else {
            tracing::debug!(path = %path.display(), "skipping unreadable project file");
            continue;
        };
        let references = parse_package_references(&content);
        if find_reference(&references, package).is_some() {
            tracing::debug!(package, path = %path.display(), "located project file");
            declaring.push(ProjectFile {
                path,
                content,
                references,
            });
        }
    }

    if declaring.is_empty() {
        return Err(NugetError::NotDeclared {
            package: package.to_string(),
        });
    }
    Ok(declaring)
}
