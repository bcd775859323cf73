//! Mirror specification models and top-level error types.

use std::fmt;
use std::path::PathBuf;

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// Symlink handling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumMirrorSymlinkStrategy {
    /// Follow the link and copy the target bytes/entries.
    Dereference,
    /// Create a symbolic link at destination (do not copy target bytes).
    CopySymlinks,
    /// Ignore symlink entries.
    SkipSymlinks,
}

/// Pattern matching mode for exclude lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumMirrorPatternMode {
    /// Shell-like wildcards (`*`, `?`, character classes).
    Glob,
    /// Regular expression pattern.
    Regex,
    /// Exact string match.
    Literal,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region StructsAndErrors

/// Input options for `mirror_tree`.
#[derive(Debug, Clone)]
pub struct SpecMirrorOptions {
    /// Exclude patterns applied to file basename.
    pub patterns_exclude_files: Option<Vec<String>>,
    /// Exclude patterns applied to directory basename.
    pub patterns_exclude_dirs: Option<Vec<String>>,
    /// Pattern interpretation mode.
    pub rule_pattern: EnumMirrorPatternMode,
    /// Symlink handling behavior.
    pub rule_symlink: EnumMirrorSymlinkStrategy,
    /// Do not mutate filesystem; record what would happen.
    pub if_dry_run: bool,
}

impl Default for SpecMirrorOptions {
    fn default() -> Self {
        Self {
            patterns_exclude_files: None,
            patterns_exclude_dirs: None,
            rule_pattern: EnumMirrorPatternMode::Glob,
            rule_symlink: EnumMirrorSymlinkStrategy::Dereference,
            if_dry_run: false,
        }
    }
}

/// One mirror failure item with path + error text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecMirrorError {
    /// Failed source or destination path.
    pub path: PathBuf,
    /// User-facing error text.
    pub exception: String,
}

/// "Top-level call failed" errors (input validation / destination replacement).
#[derive(Debug)]
pub enum MirrorTreeError {
    /// Invalid exclude pattern.
    InvalidPattern(String),
    /// Source path is not a directory.
    SourceNotDirectory(PathBuf),
    /// Source and destination overlap (`src` contains `dst` or vice versa).
    SourceDestinationOverlap {
        /// Normalized source directory.
        source: PathBuf,
        /// Normalized destination directory.
        destination: PathBuf,
    },
    /// Destination's parent directory does not exist (no implicit creation).
    DestinationParentMissing(PathBuf),
    /// Existing destination cannot be replaced (e.g. it is a symlink).
    DestinationNotReplaceable {
        /// Destination path that resisted replacement.
        path: PathBuf,
        /// Reason text.
        message: String,
    },
    /// Deleting the pre-existing destination failed.
    DestinationReplaceFailed {
        /// Destination path whose removal failed.
        path: PathBuf,
        /// Underlying IO error text.
        message: String,
    },
    /// Destination directory initialization failed.
    DestinationInitFailed {
        /// Destination path that failed initialization.
        path: PathBuf,
        /// Underlying IO error text.
        message: String,
    },
}

impl fmt::Display for MirrorTreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPattern(msg) => write!(f, "{msg}"),
            Self::SourceNotDirectory(path) => {
                write!(f, "Source is not a directory: {}", path.display())
            }
            Self::SourceDestinationOverlap {
                source,
                destination,
            } => write!(
                f,
                "Source and destination directories overlap: {} <-> {}",
                source.display(),
                destination.display()
            ),
            Self::DestinationParentMissing(path) => {
                write!(
                    f,
                    "Destination parent directory does not exist: {}",
                    path.display()
                )
            }
            Self::DestinationNotReplaceable { path, message } => {
                write!(
                    f,
                    "Cannot replace destination {}: {message}",
                    path.display()
                )
            }
            Self::DestinationReplaceFailed { path, message } => {
                write!(
                    f,
                    "Failed to remove pre-existing destination {}: {message}",
                    path.display()
                )
            }
            Self::DestinationInitFailed { path, message } => {
                write!(
                    f,
                    "Failed to initialize destination {}: {message}",
                    path.display()
                )
            }
        }
    }
}

impl std::error::Error for MirrorTreeError {}

// #endregion
////////////////////////////////////////////////////////////////////////////////
