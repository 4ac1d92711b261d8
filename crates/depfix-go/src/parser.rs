//! go.mod parser with byte-span tracking.
//!
//! Parses go.mod line by line. Every version is recorded with the byte span
//! it occupies so the editor can rewrite it without touching anything else
//! on the line (including `// indirect` markers).

use crate::error::{GoError, Result};
use crate::types::{GoDependency, GoDirective, GoModFile};
use once_cell::sync::Lazy;
use regex::Regex;

static MODULE_DIRECTIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*module\s+(\S+)").expect("Invalid regex"));
static GO_DIRECTIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*go\s+(\S+)").expect("Invalid regex"));
static REQUIRE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*require\s+\S+\s+\S+").expect("Invalid regex"));
static REQUIRE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*require\s*\(").expect("Invalid regex"));
// replace old [v] => new [v]
static REPLACE_DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*replace\s+(\S+)\s+(?:(\S+)\s+)?=>\s+\S+").expect("Invalid regex")
});
static EXCLUDE_DIRECTIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*exclude\s+(\S+)\s+(\S+)").expect("Invalid regex"));

/// Parses go.mod content.
///
/// # Examples
///
/// ```
/// use depfix_go::parse_go_mod;
///
/// let content = "module example.com/app\n\nrequire github.com/gin-gonic/gin v1.6.0\n";
/// let go_mod = parse_go_mod(content).unwrap();
/// let gin = go_mod.required("github.com/gin-gonic/gin").unwrap();
/// assert_eq!(&content[gin.version_span.clone().unwrap()], "v1.6.0");
/// ```
pub fn parse_go_mod(content: &str) -> Result<GoModFile> {
    let mut file = GoModFile::default();
    let mut in_require_block = false;
    let mut line_offset = 0;

    for raw_line in content.split_inclusive('\n') {
        let line = raw_line.trim_end_matches(['\n', '\r']);
        let offset = line_offset;
        line_offset += raw_line.len();

        let code = strip_line_comment(line);
        let trimmed = code.trim();

        if trimmed.is_empty() {
            continue;
        }

        if in_require_block {
            if trimmed.starts_with(')') {
                in_require_block = false;
            } else if let Some(dep) = parse_require_line(line, offset) {
                file.dependencies.push(dep);
            }
            continue;
        }

        if let Some(caps) = MODULE_DIRECTIVE.captures(trimmed) {
            file.module_path = Some(caps[1].trim_matches('"').to_string());
            continue;
        }

        if let Some(caps) = GO_DIRECTIVE.captures(trimmed) {
            file.go_version = Some(caps[1].to_string());
            continue;
        }

        if REQUIRE_BLOCK.is_match(trimmed) {
            in_require_block = true;
            continue;
        }

        if REQUIRE_LINE.is_match(trimmed) {
            if let Some(dep) = parse_require_line(line, offset) {
                file.dependencies.push(dep);
            }
            continue;
        }

        if let Some(caps) = REPLACE_DIRECTIVE.captures(trimmed) {
            file.dependencies.push(GoDependency {
                module_path: caps[1].to_string(),
                version: caps.get(2).map(|m| m.as_str().to_string()),
                version_span: None,
                directive: GoDirective::Replace,
                indirect: false,
            });
            continue;
        }

        if let Some(caps) = EXCLUDE_DIRECTIVE.captures(trimmed) {
            file.dependencies.push(GoDependency {
                module_path: caps[1].to_string(),
                version: Some(caps[2].to_string()),
                version_span: None,
                directive: GoDirective::Exclude,
                indirect: false,
            });
        }
    }

    if in_require_block {
        return Err(GoError::parse("unterminated require block"));
    }

    tracing::debug!(
        dependencies = file.dependencies.len(),
        module = ?file.module_path,
        "parsed go.mod"
    );

    Ok(file)
}

/// Drops a trailing `//` comment. A `//` that follows `:` belongs to a URL
/// and is kept.
fn strip_line_comment(line: &str) -> &str {
    let mut in_url = false;
    for (i, c) in line.char_indices() {
        if c == ':' && line[i..].starts_with("://") {
            in_url = true;
            continue;
        }
        if in_url && c.is_whitespace() {
            in_url = false;
        }
        if !in_url && line[i..].starts_with("//") {
            return &line[..i];
        }
    }
    line
}

/// Parses a require entry, either `require mod ver` or a block line `mod ver`.
fn parse_require_line(line: &str, line_start: usize) -> Option<GoDependency> {
    let code = strip_line_comment(line);
    let mut tokens = token_spans(code);

    let (mut module_span, mut version_span) = (tokens.next()?, tokens.next()?);
    if &code[module_span.clone()] == "require" {
        module_span = version_span;
        version_span = tokens.next()?;
    }

    let module_path = code[module_span].trim_matches('"').to_string();
    let version = code[version_span.clone()].to_string();
    let indirect = line[code.len()..].trim_start_matches('/').trim() == "indirect";

    Some(GoDependency {
        module_path,
        version: Some(version),
        version_span: Some(line_start + version_span.start..line_start + version_span.end),
        directive: GoDirective::Require,
        indirect,
    })
}

/// Byte spans of whitespace-separated tokens.
fn token_spans(text: &str) -> impl Iterator<Item = std::ops::Range<usize>> + '_ {
    let mut start = None;
    let mut spans = Vec::new();
    for (i, c) in text.char_indices() {
        match (c.is_whitespace(), start) {
            (false, None) => start = Some(i),
            (true, Some(s)) => {
                spans.push(s..i);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        spans.push(s..text.len());
    }
    spans.into_iter()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_require() {
        let content = r#"module example.com/myapp

go 1.21

require github.com/gin-gonic/gin v1.9.1
"#;
        let result = parse_go_mod(content).unwrap();
        assert_eq!(result.dependencies.len(), 1);
        let gin = &result.dependencies[0];
        assert_eq!(gin.module_path, "github.com/gin-gonic/gin");
        assert_eq!(gin.version.as_deref(), Some("v1.9.1"));
        assert_eq!(&content[gin.version_span.clone().unwrap()], "v1.9.1");
        assert!(!gin.indirect);
        assert_eq!(result.module_path.as_deref(), Some("example.com/myapp"));
        assert_eq!(result.go_version.as_deref(), Some("1.21"));
    }

    #[test]
    fn test_parse_require_block() {
        let content = r#"require (
    github.com/gin-gonic/gin v1.9.1
    golang.org/x/crypto v0.17.0 // indirect
)
"#;
        let result = parse_go_mod(content).unwrap();
        assert_eq!(result.dependencies.len(), 2);
        assert!(!result.dependencies[0].indirect);
        assert!(result.dependencies[1].indirect);

        let crypto = result.required("golang.org/x/crypto").unwrap();
        assert_eq!(&content[crypto.version_span.clone().unwrap()], "v0.17.0");
    }

    #[test]
    fn test_version_span_with_crlf() {
        let content = "module m\r\n\r\nrequire (\r\n\tgolang.org/x/net v0.1.0\r\n)\r\n";
        let result = parse_go_mod(content).unwrap();
        let net = result.required("golang.org/x/net").unwrap();
        assert_eq!(&content[net.version_span.clone().unwrap()], "v0.1.0");
    }

    #[test]
    fn test_version_span_when_module_contains_version_text() {
        let content = "require example.com/v1.0.0/lib v1.0.0\n";
        let result = parse_go_mod(content).unwrap();
        let dep = &result.dependencies[0];
        assert_eq!(dep.version_span.clone().unwrap(), 31..37);
    }

    #[test]
    fn test_parse_replace_and_exclude() {
        let content = "replace github.com/old/module => github.com/new/module v1.2.3\nexclude github.com/bad/module v0.1.0\n";
        let result = parse_go_mod(content).unwrap();
        assert_eq!(result.dependencies.len(), 2);
        assert_eq!(result.dependencies[0].directive, GoDirective::Replace);
        assert!(result.is_replaced("github.com/old/module"));
        assert_eq!(result.dependencies[1].directive, GoDirective::Exclude);
        assert!(result.required("github.com/bad/module").is_none());
    }

    #[test]
    fn test_replace_with_local_path() {
        let content = "replace example.com/lib => ../lib\n";
        let result = parse_go_mod(content).unwrap();
        assert!(result.is_replaced("example.com/lib"));
    }

    #[test]
    fn test_parse_pseudo_version() {
        let content = "require golang.org/x/crypto v0.0.0-20191109021931-daa7c04131f5\n";
        let result = parse_go_mod(content).unwrap();
        assert_eq!(
            result.dependencies[0].version.as_deref(),
            Some("v0.0.0-20191109021931-daa7c04131f5")
        );
    }

    #[test]
    fn test_empty_file() {
        let result = parse_go_mod("").unwrap();
        assert!(result.dependencies.is_empty());
        assert_eq!(result.module_path, None);
    }

    #[test]
    fn test_comments_stripped() {
        let content =
            "// This is a comment\nrequire github.com/pkg/errors v0.9.1 // inline comment\n";
        let result = parse_go_mod(content).unwrap();
        assert_eq!(result.dependencies.len(), 1);
        assert!(!result.dependencies[0].indirect);
    }

    #[test]
    fn test_unterminated_block() {
        assert!(parse_go_mod("require (\n\tgolang.org/x/net v0.1.0\n").is_err());
    }

    #[test]
    fn test_strip_line_comment_with_url() {
        let line = "replace github.com/old => https://github.com/new // comment";
        assert_eq!(
            strip_line_comment(line),
            "replace github.com/old => https://github.com/new "
        );
    }
}
