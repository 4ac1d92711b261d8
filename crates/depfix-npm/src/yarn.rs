//! Yarn flavor detection.

use crate::error::NpmError;
use depfix_core::{CommandRunner, Invocation, Result};
use std::fmt;
use std::path::Path;

pub const YARN_LOCK: &str = "yarn.lock";
pub const YARNRC_YML: &str = ".yarnrc.yml";

const CLASSIC_LOCK_HEADER: &str = "# yarn lockfile v1";
const BERRY_LOCK_METADATA: &str = "__metadata:";

/// Yarn major line, which decides the upgrade command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YarnFlavor {
    /// Yarn 1.x
    Classic,
    /// Yarn 2 and later
    Berry,
}

impl YarnFlavor {
    pub fn from_major(major: u64) -> Self {
        if major <= 1 { Self::Classic } else { Self::Berry }
    }

    /// Lowest major version of the line.
    pub fn major(self) -> u64 {
        match self {
            Self::Classic => 1,
            Self::Berry => 2,
        }
    }

    /// Subcommand that bumps a single package.
    pub fn upgrade_command(self) -> &'static str {
        match self {
            Self::Classic => "upgrade",
            Self::Berry => "up",
        }
    }
}

impl fmt::Display for YarnFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Classic => f.write_str("yarn v1"),
            Self::Berry => f.write_str("yarn v2+"),
        }
    }
}

/// Flavor implied by the project files alone.
///
/// # Examples
///
/// ```
/// use depfix_npm::yarn::{flavor_from_lockfile, YarnFlavor};
///
/// let lock = "# THIS IS AN AUTOGENERATED FILE.\n# yarn lockfile v1\n";
/// assert_eq!(flavor_from_lockfile(lock), Some(YarnFlavor::Classic));
/// assert_eq!(flavor_from_lockfile("__metadata:\n  version: 6\n"), Some(YarnFlavor::Berry));
/// ```
pub fn flavor_from_lockfile(content: &str) -> Option<YarnFlavor> {
    if content.lines().any(|line| line.trim_end() == BERRY_LOCK_METADATA) {
        return Some(YarnFlavor::Berry);
    }
    if content
        .lines()
        .take(5)
        .any(|line| line.trim() == CLASSIC_LOCK_HEADER)
    {
        return Some(YarnFlavor::Classic);
    }
    None
}

/// Parses the major version from `yarn --version` output.
pub fn parse_major(output: &str) -> Option<u64> {
    output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())?
        .trim_start_matches('v')
        .split('.')
        .next()?
        .parse()
        .ok()
}

/// Detects the flavor used by the project rooted at `project_root`.
///
/// An explicit major version wins; then `.yarnrc.yml`, then the lockfile
/// format, and finally `yarn --version`.
pub async fn detect_flavor(
    runner: &dyn CommandRunner,
    executable: &str,
    configured_major: Option<u64>,
    project_root: &Path,
) -> Result<YarnFlavor> {
    if let Some(major) = configured_major {
        return Ok(YarnFlavor::from_major(major));
    }

    if project_root.join(YARNRC_YML).is_file() {
        tracing::debug!(root = %project_root.display(), "found .yarnrc.yml");
        return Ok(YarnFlavor::Berry);
    }

    let lockfile = project_root.join(YARN_LOCK);
    if lockfile.is_file() {
        let content = tokio::fs::read_to_string(&lockfile).await?;
        if let Some(flavor) = flavor_from_lockfile(&content) {
            tracing::debug!(flavor = %flavor, "detected yarn flavor from lockfile");
            return Ok(flavor);
        }
    }

    let invocation = Invocation::new(executable, project_root).arg("--version");
    let output = runner.run_checked(&invocation).await?;
    let major = parse_major(&output.stdout).ok_or_else(|| {
        NpmError::UnknownYarnVersion {
            output: output.stdout.trim().to_string(),
        }
        .into_fix_error(executable, YARN_LOCK)
    })?;

    tracing::debug!(major, "detected yarn flavor from --version");
    Ok(YarnFlavor::from_major(major))
}
