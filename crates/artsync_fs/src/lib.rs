//! `artsync_fs`:
//! Destructive mirror engine for build-artifact deployment.
//!
//! A mirror run replaces the destination wholesale with the source tree:
//! - `mirror` : destination replacement, traversal, copy orchestration
//! - `spec`   : enums/options/errors
//! - `report` : run-time report model
//! - `util`   : shared helper functions

pub mod mirror;
pub mod report;
pub mod spec;
mod util;

pub use mirror::mirror_tree;
pub use report::{ReportMirror, ReportMirrorBuilder};
pub use spec::{
    EnumMirrorPatternMode, EnumMirrorSymlinkStrategy, MirrorTreeError, SpecMirrorError,
    SpecMirrorOptions,
};
