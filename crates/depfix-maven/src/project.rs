//! Maven project model.
//!
//! Holds every POM of a (possibly multi-module) project in memory, resolves
//! each module's parent chain, and traces a dependency's version to the one
//! declaration that controls it: a literal `<version>`, a property definition
//! reached through any number of `${...}` hops, or a `dependencyManagement`
//! or `pluginManagement` entry of the module or one of its ancestors. Edits are spliced into the
//! in-memory text and written back with [`MavenProject::write_changes`].

use crate::error::{PomError, Result};
use crate::pom::{
    PomDependencyDescriptor, PomDocument, SpannedText, parse_pom, referenced_properties,
    whole_property_reference,
};
use crate::version::compare_versions;
use depfix_core::manifest::{splice_all, write_if_changed};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::ops::Range;
use std::path::{Component, Path, PathBuf};

/// Property prefixes Maven computes itself.
const BUILT_IN_PREFIXES: [&str; 4] = ["project.", "pom.", "env.", "settings."];
const BUILT_IN_NAMES: [&str; 2] = ["basedir", "maven.build.timestamp"];

fn is_built_in(name: &str) -> bool {
    BUILT_IN_NAMES.contains(&name) || BUILT_IN_PREFIXES.iter().any(|p| name.starts_with(p))
}

/// One loaded POM and its pending edits.
#[derive(Debug, Clone)]
pub struct PomFile {
    pub path: PathBuf,
    original: String,
    content: String,
    pub document: PomDocument,
}

impl PomFile {
    pub fn parse(path: impl Into<PathBuf>, content: String) -> Result<Self> {
        let path = path.into();
        let document = parse_pom(&content, &path.display().to_string())?;
        Ok(Self {
            path,
            original: content.clone(),
            content,
            document,
        })
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_modified(&self) -> bool {
        self.original != self.content
    }

    fn apply(&mut self, edits: Vec<(Range<usize>, String)>) -> Result<()> {
        let updated = splice_all(&self.content, edits);
        self.document = parse_pom(&updated, &self.path.display().to_string())?;
        self.content = updated;
        Ok(())
    }
}

/// The declaration that controls a dependency's version.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Declaration {
    pom: usize,
    text: SpannedText,
}

/// Splits `groupId:artifactId`.
pub fn split_coordinates(name: &str) -> Result<(&str, &str)> {
    match name.split_once(':') {
        Some((group, artifact)) if !group.is_empty() && !artifact.is_empty() => {
            Ok((group, artifact.split(':').next().unwrap_or(artifact)))
        }
        _ => Err(PomError::InvalidCoordinates {
            name: name.to_string(),
        }),
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// All POMs of a project.
#[derive(Debug, Clone, Default)]
pub struct MavenProject {
    poms: Vec<PomFile>,
}

impl MavenProject {
    pub fn new(poms: Vec<PomFile>) -> Self {
        Self { poms }
    }

    /// Reads and parses every POM in `paths`.
    pub async fn load(paths: &[PathBuf]) -> depfix_core::Result<Self> {
        let mut poms = Vec::with_capacity(paths.len());
        for path in paths {
            let content = tokio::fs::read_to_string(path).await?;
            poms.push(PomFile::parse(path, content)?);
        }
        tracing::debug!(poms = poms.len(), "loaded maven project");
        Ok(Self { poms })
    }

    pub fn poms(&self) -> &[PomFile] {
        &self.poms
    }

    /// Whether any POM manages `groupId:artifactId` in `dependencyManagement`.
    pub fn found_in_dependency_management(&self, coordinates: &str) -> Result<bool> {
        let (group, artifact) = split_coordinates(coordinates)?;
        Ok(self.poms.iter().any(|pom| {
            pom.document
                .descriptors
                .iter()
                .any(|d| d.matches(group, artifact) && d.found_in_dependency_management)
        }))
    }

    fn parent_of(&self, index: usize) -> Option<usize> {
        let pom = &self.poms[index];
        let parent = pom.document.parent.as_ref()?;

        let relative = parent.relative_path.as_deref().unwrap_or("../pom.xml");
        if !relative.is_empty()
            && let Some(dir) = pom.path.parent()
        {
            let mut candidate = normalize(&dir.join(relative));
            if candidate.extension().is_none() {
                candidate.push("pom.xml");
            }
            if let Some(found) = self.poms.iter().position(|p| {
                normalize(&p.path) == candidate
                    && (parent.artifact_id.is_none()
                        || p.document.artifact_id == parent.artifact_id)
            }) && found != index
            {
                return Some(found);
            }
        }

        let artifact = parent.artifact_id.as_deref()?;
        self.poms.iter().enumerate().position(|(i, p)| {
            i != index
                && p.document.artifact_id.as_deref() == Some(artifact)
                && (parent.group_id.is_none()
                    || p.document.effective_group_id() == parent.group_id.as_deref())
        })
    }

    /// The module followed by its loaded ancestors, nearest first.
    fn ancestry(&self, index: usize) -> Vec<usize> {
        let mut chain = vec![index];
        let mut current = index;
        while let Some(parent) = self.parent_of(current) {
            if chain.contains(&parent) {
                tracing::warn!(pom = %self.poms[parent].path.display(), "parent cycle in project");
                break;
            }
            chain.push(parent);
            current = parent;
        }
        chain
    }

    /// Follows `${name}` hops through the chain to a literal value.
    fn resolve_property(
        &self,
        chain: &[usize],
        coordinates: &str,
        name: &str,
    ) -> Result<Declaration> {
        let mut visited: Vec<String> = Vec::new();
        let mut current = name.to_string();

        loop {
            if is_built_in(&current) {
                return Err(PomError::BuiltInProperty {
                    coordinates: coordinates.to_string(),
                    name: current,
                });
            }
            if visited.contains(&current) {
                visited.push(current);
                return Err(PomError::PropertyCycle {
                    coordinates: coordinates.to_string(),
                    chain: visited,
                });
            }

            let Some((pom, property)) = chain
                .iter()
                .find_map(|&i| self.poms[i].document.property(&current).map(|p| (i, p)))
            else {
                return Err(PomError::UnresolvedProperty {
                    coordinates: coordinates.to_string(),
                    name: current,
                });
            };
            let Some(value) = &property.value else {
                return Err(self.no_declaration(coordinates, pom));
            };

            visited.push(current);
            if let Some(next) = whole_property_reference(&value.value) {
                current = next.to_string();
                continue;
            }
            if !referenced_properties(&value.value).is_empty() {
                return Err(self.no_declaration(coordinates, pom));
            }
            tracing::debug!(
                coordinates,
                property = %visited.join(" -> "),
                pom = %self.poms[pom].path.display(),
                "resolved version property"
            );
            return Ok(Declaration {
                pom,
                text: value.clone(),
            });
        }
    }

    fn resolve_text(
        &self,
        chain: &[usize],
        coordinates: &str,
        pom: usize,
        text: &SpannedText,
    ) -> Result<Declaration> {
        if let Some(name) = whole_property_reference(&text.value) {
            return self.resolve_property(chain, coordinates, name);
        }
        if referenced_properties(&text.value).is_empty() {
            return Ok(Declaration {
                pom,
                text: text.clone(),
            });
        }
        Err(self.no_declaration(coordinates, pom))
    }

    /// Finds the declaration controlling `descriptor` as seen from `chain[0]`.
    fn authoritative_declaration(
        &self,
        chain: &[usize],
        descriptor: &PomDependencyDescriptor,
    ) -> Result<Declaration> {
        let module = chain[0];
        let coordinates = descriptor.coordinates();

        if let Some(text) = &descriptor.version {
            return self.resolve_text(chain, &coordinates, module, text);
        }

        for &ancestor in chain {
            let managed = self.poms[ancestor].document.descriptors.iter().find(|d| {
                d.found_in_dependency_management
                    && d.kind == descriptor.kind
                    && d.matches(&descriptor.group_id, &descriptor.artifact_id)
                    && d.version.is_some()
            });
            if let Some(text) = managed.and_then(|d| d.version.as_ref()) {
                return self.resolve_text(chain, &coordinates, ancestor, text);
            }
        }

        Err(self.no_declaration(&coordinates, module))
    }

    fn no_declaration(&self, coordinates: &str, pom: usize) -> PomError {
        PomError::NoAuthoritativeDeclaration {
            coordinates: coordinates.to_string(),
            file: self.poms[pom].path.display().to_string(),
        }
    }

    /// Sets `groupId:artifactId` to `fixed_version` in every module.
    ///
    /// Entries inside `dependencyManagement` are only considered when
    /// `found_in_dependency_management` is set. Declarations already at or
    /// above the fixed version are left alone. Returns the POMs edited by
    /// this call.
    pub fn update_package_version(
        &mut self,
        coordinates: &str,
        fixed_version: &str,
        found_in_dependency_management: bool,
    ) -> Result<Vec<PathBuf>> {
        let (group, artifact) = split_coordinates(coordinates)?;
        let mut edits: BTreeMap<usize, Vec<(Range<usize>, String)>> = BTreeMap::new();
        let mut declared = false;

        for module in 0..self.poms.len() {
            let chain = self.ancestry(module);
            let matching = self.poms[module].document.descriptors.iter().filter(|d| {
                d.matches(group, artifact)
                    && (found_in_dependency_management || !d.found_in_dependency_management)
            });

            for descriptor in matching {
                declared = true;
                let declaration = self.authoritative_declaration(&chain, descriptor)?;

                if compare_versions(&declaration.text.value, fixed_version) != Ordering::Less {
                    tracing::debug!(
                        coordinates,
                        current = %declaration.text.value,
                        fixed = %fixed_version,
                        "declaration already at a fixed version"
                    );
                    continue;
                }

                let pending = edits.entry(declaration.pom).or_default();
                if !pending.iter().any(|(span, _)| *span == declaration.text.span) {
                    pending.push((declaration.text.span, fixed_version.to_string()));
                }
            }
        }

        if !declared {
            return Err(PomError::NotDeclared {
                coordinates: coordinates.to_string(),
            });
        }

        self.apply_edits(edits)
    }

    /// Rewrites every definition of property `name` to `value`.
    pub fn update_property(&mut self, name: &str, value: &str) -> Result<Vec<PathBuf>> {
        let mut edits: BTreeMap<usize, Vec<(Range<usize>, String)>> = BTreeMap::new();
        let mut defined = false;

        for (index, pom) in self.poms.iter().enumerate() {
            let Some(current) = pom
                .document
                .property(name)
                .and_then(|p| p.value.as_ref())
            else {
                continue;
            };
            defined = true;
            if current.value != value {
                edits
                    .entry(index)
                    .or_default()
                    .push((current.span.clone(), value.to_string()));
            }
        }

        if !defined {
            return Err(PomError::PropertyNotDefined {
                name: name.to_string(),
            });
        }

        self.apply_edits(edits)
    }

    fn apply_edits(
        &mut self,
        edits: BTreeMap<usize, Vec<(Range<usize>, String)>>,
    ) -> Result<Vec<PathBuf>> {
        let mut changed = Vec::with_capacity(edits.len());
        for (index, pom_edits) in edits {
            let pom = &mut self.poms[index];
            tracing::info!(pom = %pom.path.display(), edits = pom_edits.len(), "editing pom");
            pom.apply(pom_edits)?;
            changed.push(pom.path.clone());
        }
        Ok(changed)
    }

    /// Writes every modified POM and returns their paths.
    pub async fn write_changes(&mut self) -> depfix_core::Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for pom in &mut self.poms {
            if write_if_changed(&pom.path, &pom.original, &pom.content).await? {
                written.push(pom.path.clone());
            }
            pom.original.clone_from(&pom.content);
        }
        Ok(written)
    }
}
