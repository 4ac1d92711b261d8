//! POM document extraction.
//!
//! Reads a POM with `quick-xml` and records, alongside each value, the byte
//! span of its trimmed text so edits can be spliced into the original file.
//! Element names are matched by local name, so namespace prefixes are
//! ignored.

use crate::error::{PomError, Result};
use once_cell::sync::Lazy;
use quick_xml::Reader;
use quick_xml::events::Event;
use regex::Regex;
use std::ops::Range;

/// Group assumed for plugins declared without one.
pub const DEFAULT_PLUGIN_GROUP: &str = "org.apache.maven.plugins";

/// Sections whose entries manage versions for the rest of the build.
const MANAGEMENT_SECTIONS: [&str; 2] = ["dependencyManagement", "pluginManagement"];

static PROPERTY_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("Invalid regex"));

/// Element a descriptor was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorKind {
    Dependency,
    Plugin,
}

/// A text value and where its trimmed text sits in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpannedText {
    pub value: String,
    pub span: Range<usize>,
}

/// A `<dependency>` or `<plugin>` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PomDependencyDescriptor {
    pub group_id: String,
    pub artifact_id: String,
    /// Literal version or property reference, as written
    pub version: Option<SpannedText>,
    pub scope: Option<String>,
    /// Declared under `dependencyManagement` or `pluginManagement`
    pub found_in_dependency_management: bool,
    /// Names of the properties referenced by the version
    pub properties: Vec<String>,
    pub kind: DescriptorKind,
}

impl PomDependencyDescriptor {
    /// `groupId:artifactId`
    pub fn coordinates(&self) -> String {
        format!("{}:{}", self.group_id, self.artifact_id)
    }

    pub fn matches(&self, group_id: &str, artifact_id: &str) -> bool {
        self.group_id == group_id && self.artifact_id == artifact_id
    }

    /// Name of the property when the whole version is one `${...}` reference.
    pub fn property_reference(&self) -> Option<&str> {
        self.version
            .as_ref()
            .and_then(|version| whole_property_reference(&version.value))
    }
}

/// Returns `name` when `value` is exactly `${name}`.
pub fn whole_property_reference(value: &str) -> Option<&str> {
    value
        .trim()
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
        .filter(|name| !name.contains(['{', '}', '$']))
}

/// Every property name referenced in `value`.
pub fn referenced_properties(value: &str) -> Vec<String> {
    PROPERTY_REFERENCE
        .captures_iter(value)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// A `<properties>` entry of the project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PomProperty {
    pub name: String,
    /// `None` for an empty element
    pub value: Option<SpannedText>,
}

/// `<parent>` reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParentReference {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub relative_path: Option<String>,
}

/// Everything depfix needs from one POM.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PomDocument {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub parent: Option<ParentReference>,
    pub properties: Vec<PomProperty>,
    /// Dependencies and plugins in document order
    pub descriptors: Vec<PomDependencyDescriptor>,
    pub modules: Vec<String>,
}

impl PomDocument {
    /// Own group, inherited from the parent when absent.
    pub fn effective_group_id(&self) -> Option<&str> {
        self.group_id
            .as_deref()
            .or_else(|| self.parent.as_ref().and_then(|p| p.group_id.as_deref()))
    }

    pub fn property(&self, name: &str) -> Option<&PomProperty> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// Descriptor under construction.
struct OpenDescriptor {
    depth: usize,
    start: usize,
    kind: DescriptorKind,
    managed: bool,
    group_id: Option<String>,
    artifact_id: Option<String>,
    version: Option<SpannedText>,
    scope: Option<String>,
}

impl OpenDescriptor {
    fn finish(self) -> Option<(usize, PomDependencyDescriptor)> {
        let group_id = match (self.group_id, self.kind) {
            (Some(group), _) => group,
            (None, DescriptorKind::Plugin) => DEFAULT_PLUGIN_GROUP.to_string(),
            (None, DescriptorKind::Dependency) => return None,
        };
        let artifact_id = self.artifact_id?;
        let properties = self
            .version
            .as_ref()
            .map(|v| referenced_properties(&v.value))
            .unwrap_or_default();

        Some((
            self.start,
            PomDependencyDescriptor {
                group_id,
                artifact_id,
                version: self.version,
                scope: self.scope,
                found_in_dependency_management: self.managed,
                properties,
                kind: self.kind,
            },
        ))
    }
}

fn local_name(name: &[u8]) -> String {
    String::from_utf8_lossy(name).into_owned()
}

/// Text between `start` and the next markup, trimmed.
fn spanned_text(content: &str, start: usize) -> Option<SpannedText> {
    let rest = content.get(start..)?;
    let raw = &rest[..rest.find('<').unwrap_or(rest.len())];
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let offset = start + (raw.len() - raw.trim_start().len());
    let value = quick_xml::escape::unescape(trimmed)
        .map_or_else(|_| trimmed.to_string(), |v| v.into_owned());
    Some(SpannedText {
        value,
        span: offset..offset + trimmed.len(),
    })
}

/// Parses a POM document.
///
/// `file` is only used in error messages.
///
/// # Examples
///
/// ```
/// use depfix_maven::pom::parse_pom;
///
/// let pom = "<dependency>\n  <groupId> org.apache.commons</groupId>\n  \
///            <artifactId>commons-email</artifactId>\n  <version>  1.1  </version>\n</dependency>";
/// let document = parse_pom(pom, "pom.xml").unwrap();
/// let dependency = &document.descriptors[0];
/// assert_eq!(dependency.group_id, "org.apache.commons");
/// assert_eq!(&pom[dependency.version.as_ref().unwrap().span.clone()], "1.1");
/// ```
pub fn parse_pom(content: &str, file: &str) -> Result<PomDocument> {
    let mut reader = Reader::from_str(content);
    let mut document = PomDocument::default();
    let mut path: Vec<String> = Vec::new();
    let mut open: Vec<OpenDescriptor> = Vec::new();
    let mut finished: Vec<(usize, PomDependencyDescriptor)> = Vec::new();

    loop {
        let position = reader.buffer_position() as usize;
        let event = reader
            .read_event()
            .map_err(|e| PomError::xml(file, format!("{e} at byte {position}")))?;

        match event {
            Event::Start(element) => {
                let name = local_name(element.local_name().as_ref());
                if name == "dependency" || name == "plugin" {
                    open.push(OpenDescriptor {
                        depth: path.len(),
                        start: position,
                        kind: if name == "plugin" {
                            DescriptorKind::Plugin
                        } else {
                            DescriptorKind::Dependency
                        },
                        managed: path
                            .iter()
                            .any(|p| MANAGEMENT_SECTIONS.contains(&p.as_str())),
                        group_id: None,
                        artifact_id: None,
                        version: None,
                        scope: None,
                    });
                }
                path.push(name);
            }
            Event::Empty(element) => {
                let name = local_name(element.local_name().as_ref());
                if is_project_properties(&path) {
                    document.properties.push(PomProperty { name, value: None });
                }
            }
            Event::Text(_) => {
                let Some(text) = spanned_text(content, position) else {
                    continue;
                };
                record_text(&mut document, &mut open, &path, text);
            }
            Event::End(_) => {
                path.pop();
                if open.last().is_some_and(|d| d.depth == path.len())
                    && let Some(descriptor) = open.pop()
                    && let Some(done) = descriptor.finish()
                {
                    finished.push(done);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !path.is_empty() {
        return Err(PomError::xml(
            file,
            format!("unclosed element <{}>", path.join("><")),
        ));
    }

    finished.sort_by_key(|(start, _)| *start);
    document.descriptors = finished.into_iter().map(|(_, d)| d).collect();

    tracing::debug!(
        file,
        descriptors = document.descriptors.len(),
        properties = document.properties.len(),
        "parsed pom"
    );

    Ok(document)
}

fn is_project_properties(path: &[String]) -> bool {
    matches!(path, [project, properties] if project == "project" && properties == "properties")
}

fn record_text(
    document: &mut PomDocument,
    open: &mut [OpenDescriptor],
    path: &[String],
    text: SpannedText,
) {
    let Some((field, owner_path)) = path.split_last() else {
        return;
    };

    if let Some(descriptor) = open.last_mut()
        && descriptor.depth + 2 == path.len()
    {
        match field.as_str() {
            "groupId" => descriptor.group_id = Some(text.value),
            "artifactId" => descriptor.artifact_id = Some(text.value),
            "version" => descriptor.version = Some(text),
            "scope" => descriptor.scope = Some(text.value),
            _ => {}
        }
        return;
    }

    let owner: Vec<&str> = owner_path.iter().map(String::as_str).collect();
    match (owner.as_slice(), field.as_str()) {
        (["project"], "groupId") => document.group_id = Some(text.value),
        (["project"], "artifactId") => document.artifact_id = Some(text.value),
        (["project"], "version") => document.version = Some(text.value),
        (["project", "properties"], _) => document.properties.push(PomProperty {
            name: field.clone(),
            value: Some(text),
        }),
        (["project", "modules"], "module") => document.modules.push(text.value),
        (["project", "parent"], _) => {
            let parent = document.parent.get_or_insert_with(ParentReference::default);
            match field.as_str() {
                "groupId" => parent.group_id = Some(text.value),
                "artifactId" => parent.artifact_id = Some(text.value),
                "version" => parent.version = Some(text.value),
                "relativePath" => parent.relative_path = Some(text.value),
                _ => {}
            }
        }
        _ => {}
    }
}

/// Dependencies and plugins of a POM in document order.
pub fn get_maven_dependencies(content: &str) -> Result<Vec<PomDependencyDescriptor>> {
    parse_pom(content, "pom.xml").map(|document| document.descriptors)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MULTI_DEPENDENCY: &str = r#"
<project xmlns="http://maven.apache.org/POM/4.0.0" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
        xsi:schemaLocation="http://maven.apache.org/POM/4.0.0 https://maven.apache.org/maven-v4_0_0.xsd">
<dependencies>
       <dependency>
           <groupId>org.apache.commons</groupId>
           <artifactId>commons-email</artifactId>
           <version>1.1</version>
           <scope>compile</scope>
       </dependency>
       <dependency>
           <groupId>org.codehaus.plexus</groupId>
           <artifactId>plexus-utils</artifactId>
           <version>1.5.1</version>
       </dependency>
	</dependencies>
</project>"#;

    const PLUGINS: &str = r#"<project>
    <build>
       <plugins>
           <plugin>
               <groupId>org.apache.maven.plugins</groupId>
               <artifactId>maven-source-plugin</artifactId>
           </plugin>
           <plugin>
               <groupId>com.github.spotbugs</groupId>
               <artifactId>spotbugs-maven-plugin</artifactId>
               <version>4.5.3.0</version>
               <configuration>
                   <excludeFilterFile>spotbugs-security-exclude.xml</excludeFilterFile>
                   <plugins>
                       <plugin>
                           <groupId>com.h3xstream.findsecbugs</groupId>
                           <artifactId>findsecbugs-plugin</artifactId>
                           <version>1.12.0</version>
                       </plugin>
                   </plugins>
               </configuration>
           </plugin>
           <plugin>
               <groupId>org.apache.maven.plugins</groupId>
               <artifactId>maven-surefire-plugin</artifactId>
               <version>2.22.1</version>
               <configuration>
                   <systemPropertyVariables>
                       <!--This will disable JenkinsRule timeout-->
                       <maven.surefire.debug>true</maven.surefire.debug>
                   </systemPropertyVariables>
                   <excludes>
                       <exclude>**/InjectedTest.java</exclude>
                       <exclude>**/*ITest.java</exclude>
                   </excludes>
               </configuration>
           </plugin>
       </plugins>
   </build>
</project>
"#;

    const DEPENDENCY_MANAGEMENT: &str = r#"
<project xmlns="http://maven.apache.org/POM/4.0.0">
   <dependencyManagement>
       <dependencies>
           <dependency>
               <groupId>io.jenkins.tools.bom</groupId>
               <artifactId>bom-2.346.x</artifactId>
               <version>1607.va_c1576527071</version>
               <scope>import</scope>
               <type>pom</type>
           </dependency>
           <dependency>
               <groupId>com.fasterxml.jackson.core</groupId>
               <artifactId>jackson-core</artifactId>
               <version>2.13.4</version>
           </dependency>
           <dependency>
               <groupId>com.fasterxml.jackson.core</groupId>
               <artifactId>jackson-databind</artifactId>
               <version>2.13.4.2</version>
           </dependency>
           <dependency>
               <groupId>com.fasterxml.jackson.core</groupId>
               <artifactId>jackson-annotations</artifactId>
               <version>2.13.4</version>
           </dependency>
           <dependency>
               <groupId>org.apache.httpcomponents</groupId>
               <artifactId>httpcore</artifactId>
               <version>4.4.15</version>
           </dependency>
           <dependency>
               <groupId>org.jenkins-ci.plugins.workflow</groupId>
               <artifactId>workflow-durable-task-step</artifactId>
               <version>1190.vc93d7d457042</version>
               <scope>test</scope>
           </dependency>
       </dependencies>
   </dependencyManagement>
</project>
"#;

    fn version_of(descriptor: &PomDependencyDescriptor) -> &str {
        descriptor
            .version
            .as_ref()
            .map(|v| v.value.as_str())
            .unwrap_or_default()
    }

    #[test]
    fn test_single_dependency_with_whitespace() {
        let cases = [
            "<dependency>\n\t<groupId>org.apache.commons</groupId>\n\t<artifactId>commons-email</artifactId>\n\t<version>1.1</version>\n\t<scope>compile</scope>\n</dependency>",
            "<dependency>\n\t<groupId> \torg.apache.commons</groupId>\n\t<artifactId>commons-email\t </artifactId>\n\t<version>  1.1  </version>\n\t<scope> compile\t\t</scope>\n</dependency>",
        ];
        for case in cases {
            let result = get_maven_dependencies(case).unwrap();
            assert_eq!(result.len(), 1);
            assert_eq!(result[0].group_id, "org.apache.commons");
            assert_eq!(result[0].artifact_id, "commons-email");
            assert_eq!(version_of(&result[0]), "1.1");
            assert_eq!(result[0].scope.as_deref(), Some("compile"));
        }
    }

    #[test]
    fn test_multi_dependency() {
        let result = get_maven_dependencies(MULTI_DEPENDENCY).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].coordinates(), "org.apache.commons:commons-email");
        assert_eq!(version_of(&result[0]), "1.1");
        assert_eq!(result[1].coordinates(), "org.codehaus.plexus:plexus-utils");
        assert_eq!(version_of(&result[1]), "1.5.1");
        assert!(result.iter().all(|d| !d.found_in_dependency_management));
    }

    #[test]
    fn test_plugins_in_document_order() {
        let plugins = get_maven_dependencies(PLUGINS).unwrap();
        let summary: Vec<(String, &str)> = plugins
            .iter()
            .map(|p| (p.coordinates(), version_of(p)))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("org.apache.maven.plugins:maven-source-plugin".to_string(), ""),
                ("com.github.spotbugs:spotbugs-maven-plugin".to_string(), "4.5.3.0"),
                ("com.h3xstream.findsecbugs:findsecbugs-plugin".to_string(), "1.12.0"),
                ("org.apache.maven.plugins:maven-surefire-plugin".to_string(), "2.22.1"),
            ]
        );
        assert!(plugins.iter().all(|p| p.kind == DescriptorKind::Plugin));
    }

    #[test]
    fn test_plugin_default_group() {
        let pom = "<project><build><plugins><plugin><artifactId>maven-jar-plugin</artifactId></plugin></plugins></build></project>";
        let plugins = get_maven_dependencies(pom).unwrap();
        assert_eq!(plugins[0].group_id, DEFAULT_PLUGIN_GROUP);
    }

    #[test]
    fn test_dependency_management_flagged() {
        let dependencies = get_maven_dependencies(DEPENDENCY_MANAGEMENT).unwrap();
        assert_eq!(dependencies.len(), 6);
        assert!(dependencies.iter().all(|d| d.found_in_dependency_management));
    }

    #[test]
    fn test_plugin_management_flagged() {
        let pom = r#"<project>
  <build>
    <pluginManagement>
      <plugins>
        <plugin>
          <artifactId>maven-surefire-plugin</artifactId>
          <version>2.22.1</version>
        </plugin>
      </plugins>
    </pluginManagement>
    <plugins>
      <plugin>
        <artifactId>maven-surefire-plugin</artifactId>
      </plugin>
    </plugins>
  </build>
</project>"#;
        let plugins = get_maven_dependencies(pom).unwrap();
        assert_eq!(plugins.len(), 2);
        assert!(plugins[0].found_in_dependency_management);
        assert!(!plugins[1].found_in_dependency_management);
        assert!(plugins[1].version.is_none());
    }

    #[test]
    fn test_version_span_points_at_text() {
        let dependencies = get_maven_dependencies(DEPENDENCY_MANAGEMENT).unwrap();
        let httpcore = dependencies
            .iter()
            .find(|d| d.artifact_id == "httpcore")
            .unwrap();
        let span = httpcore.version.as_ref().unwrap().span.clone();
        assert_eq!(&DEPENDENCY_MANAGEMENT[span], "4.4.15");
    }

    #[test]
    fn test_project_model() {
        let pom = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <parent>
    <groupId>org.example</groupId>
    <artifactId>parent</artifactId>
    <version>1.0.0</version>
  </parent>
  <artifactId>child</artifactId>
  <modules>
    <module>core</module>
  </modules>
  <properties>
    <jackson.version>2.13.4</jackson.version>
    <empty.property/>
  </properties>
  <dependencies>
    <dependency>
      <groupId>com.fasterxml.jackson.core</groupId>
      <artifactId>jackson-core</artifactId>
      <version>${jackson.version}</version>
    </dependency>
  </dependencies>
</project>
"#;
        let document = parse_pom(pom, "pom.xml").unwrap();
        assert_eq!(document.effective_group_id(), Some("org.example"));
        assert_eq!(document.artifact_id.as_deref(), Some("child"));
        assert_eq!(document.modules, vec!["core"]);
        assert_eq!(document.properties.len(), 2);
        assert_eq!(document.property("empty.property").unwrap().value, None);

        let jackson = &document.descriptors[0];
        assert_eq!(jackson.property_reference(), Some("jackson.version"));
        assert_eq!(jackson.properties, vec!["jackson.version"]);
        let value = document.property("jackson.version").unwrap().value.clone().unwrap();
        assert_eq!(&pom[value.span], "2.13.4");
    }

    #[test]
    fn test_prefixed_elements() {
        let pom = r#"<pom:project xmlns:pom="http://maven.apache.org/POM/4.0.0"><pom:dependencies><pom:dependency><pom:groupId>g</pom:groupId><pom:artifactId>a</pom:artifactId><pom:version>1</pom:version></pom:dependency></pom:dependencies></pom:project>"#;
        let dependencies = get_maven_dependencies(pom).unwrap();
        assert_eq!(dependencies[0].coordinates(), "g:a");
    }

    #[test]
    fn test_malformed_xml() {
        assert!(parse_pom("<project><dependencies></project>", "pom.xml").is_err());
    }

    #[test]
    fn test_whole_property_reference() {
        assert_eq!(whole_property_reference(" ${a.version} "), Some("a.version"));
        assert_eq!(whole_property_reference("${a}.${b}"), None);
        assert_eq!(whole_property_reference("1.0"), None);
        assert_eq!(referenced_properties("${a}.${b}"), vec!["a", "b"]);
    }
}
