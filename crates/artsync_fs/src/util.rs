use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};
use regex::Regex;

use crate::report::ReportMirrorBuilder;
use crate::spec::{EnumMirrorPatternMode, EnumMirrorSymlinkStrategy, MirrorTreeError};

////////////////////////////////////////////////////////////////////////////////
// #region PatternMatching

#[derive(Debug, Clone)]
pub(crate) enum TypeMirrorPatternSeq {
    Literal(Vec<String>),
    Glob(Vec<GlobMatcher>),
    Regex(Vec<Regex>),
}

#[derive(Debug, Clone, Default)]
pub(crate) struct SpecMirrorPatterns {
    pub(crate) patterns_exclude_files: Option<TypeMirrorPatternSeq>,
    pub(crate) patterns_exclude_dirs: Option<TypeMirrorPatternSeq>,
}

impl SpecMirrorPatterns {
    pub(crate) fn from_raw(
        patterns_exclude_files: Option<&[String]>,
        patterns_exclude_dirs: Option<&[String]>,
        rule_pattern: EnumMirrorPatternMode,
    ) -> Result<Self, MirrorTreeError> {
        Ok(Self {
            patterns_exclude_files: _compile(patterns_exclude_files, rule_pattern)?,
            patterns_exclude_dirs: _compile(patterns_exclude_dirs, rule_pattern)?,
        })
    }
}

fn _compile(
    patterns: Option<&[String]>,
    rule_pattern: EnumMirrorPatternMode,
) -> Result<Option<TypeMirrorPatternSeq>, MirrorTreeError> {
    let Some(patterns) = patterns else {
        return Ok(None);
    };
    if patterns.is_empty() {
        return Ok(None);
    }

    match rule_pattern {
        EnumMirrorPatternMode::Literal => {
            Ok(Some(TypeMirrorPatternSeq::Literal(patterns.to_vec())))
        }
        EnumMirrorPatternMode::Glob => {
            let mut l_glob = Vec::with_capacity(patterns.len());
            for pattern in patterns {
                let matcher = Glob::new(pattern)
                    .map_err(|e| {
                        MirrorTreeError::InvalidPattern(format!("Invalid exclude pattern: {e}"))
                    })?
                    .compile_matcher();
                l_glob.push(matcher);
            }
            Ok(Some(TypeMirrorPatternSeq::Glob(l_glob)))
        }
        EnumMirrorPatternMode::Regex => {
            let mut l_regex = Vec::with_capacity(patterns.len());
            for pattern in patterns {
                let regex = Regex::new(pattern).map_err(|e| {
                    MirrorTreeError::InvalidPattern(format!("Invalid exclude pattern: {e}"))
                })?;
                l_regex.push(regex);
            }
            Ok(Some(TypeMirrorPatternSeq::Regex(l_regex)))
        }
    }
}

pub(crate) fn should_exclude_by_patterns(
    value: &str,
    patterns_exclude: Option<&TypeMirrorPatternSeq>,
) -> bool {
    match patterns_exclude {
        None => false,
        Some(TypeMirrorPatternSeq::Literal(v)) => v.iter().any(|p| value.contains(p)),
        Some(TypeMirrorPatternSeq::Glob(v)) => v.iter().any(|p| p.is_match(value)),
        Some(TypeMirrorPatternSeq::Regex(v)) => v.iter().any(|p| p.is_match(value)),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region PathUtilities

fn _normalize_path(path: &Path) -> PathBuf {
    if let Ok(resolved) = fs::canonicalize(path) {
        return resolved;
    }
    _absolutize_path(path)
}

fn _absolutize_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(path)
}

pub(crate) fn is_overlap(src: &Path, dst: &Path) -> bool {
    let src_resolved = _normalize_path(src);
    let dst_resolved = _normalize_path(dst);
    dst_resolved.starts_with(&src_resolved) || src_resolved.starts_with(&dst_resolved)
}

/// Reject destination paths that escape the mirror root or traverse a
/// symlink component below it.
pub(crate) fn validate_destination_path_safety(
    path_dst_item: &Path,
    path_dir_dst_root: &Path,
) -> Result<(), String> {
    let path_dir_dst_root_abs = _absolutize_path(path_dir_dst_root);
    let path_dst_item_abs = _absolutize_path(path_dst_item);

    let path_rel_item = path_dst_item_abs
        .strip_prefix(&path_dir_dst_root_abs)
        .map_err(|_| {
            format!(
                "Unsafe destination path escapes mirror root: {} (root={})",
                path_dst_item.display(),
                path_dir_dst_root.display()
            )
        })?;

    let mut path_cursor = path_dir_dst_root_abs.clone();
    for part_rel in path_rel_item.components() {
        path_cursor.push(part_rel.as_os_str());
        match fs::symlink_metadata(&path_cursor) {
            Ok(meta_cursor) => {
                if meta_cursor.file_type().is_symlink() {
                    return Err(format!(
                        "Unsafe destination path traverses symlink component: {}",
                        path_cursor.display()
                    ));
                }
            }
            // Components below the first missing one cannot exist either.
            Err(e) if e.kind() == io::ErrorKind::NotFound => break,
            Err(e) => {
                return Err(format!(
                    "Failed to inspect destination path component {} ({e})",
                    path_cursor.display()
                ));
            }
        }
    }

    Ok(())
}

pub(crate) fn should_error_broken_symlink(
    path_symlink: &Path,
    rule_symlink: EnumMirrorSymlinkStrategy,
) -> bool {
    rule_symlink == EnumMirrorSymlinkStrategy::Dereference && !path_symlink.exists()
}

pub(crate) fn create_symbolic_link(
    path_src: &Path,
    path_dst: &Path,
    builder_mr_report: &mut ReportMirrorBuilder,
) {
    let target = match fs::read_link(path_src) {
        Ok(v) => v,
        Err(e) => {
            builder_mr_report.add_error(path_dst.to_path_buf(), e.to_string());
            return;
        }
    };

    #[cfg(unix)]
    {
        use std::os::unix::fs::symlink;
        match symlink(&target, path_dst) {
            Ok(_) => builder_mr_report.add_copied(),
            Err(e) => builder_mr_report.add_error(path_dst.to_path_buf(), e.to_string()),
        }
    }
    #[cfg(windows)]
    {
        use std::os::windows::fs::{symlink_dir, symlink_file};
        let res = if path_src.is_dir() {
            symlink_dir(&target, path_dst)
        } else {
            symlink_file(&target, path_dst)
        };
        match res {
            Ok(_) => builder_mr_report.add_copied(),
            Err(e) => builder_mr_report.add_error(path_dst.to_path_buf(), e.to_string()),
        }
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = target;
        builder_mr_report.add_error(
            path_dst.to_path_buf(),
            "Symbolic links are unsupported on this platform".to_string(),
        );
    }
}

pub(crate) fn copy_file_with_metadata(
    path_file_src: &Path,
    path_file_dst: &Path,
) -> Result<(), io::Error> {
    fs::copy(path_file_src, path_file_dst)?;
    #[cfg(target_os = "linux")]
    {
        apply_metadata_linux(path_file_src, path_file_dst)?;
    }
    Ok(())
}

#[cfg(target_os = "linux")]
fn apply_metadata_linux(path_file_src: &Path, path_file_dst: &Path) -> Result<(), io::Error> {
    use filetime::{FileTime, set_file_times};

    let stat_src = fs::metadata(path_file_src)?;
    fs::set_permissions(path_file_dst, stat_src.permissions())?;

    let file_time_access = FileTime::from_last_access_time(&stat_src);
    let file_time_modify = FileTime::from_last_modification_time(&stat_src);
    set_file_times(path_file_dst, file_time_access, file_time_modify)?;

    copy_xattrs_linux(path_file_src, path_file_dst);
    Ok(())
}

#[cfg(target_os = "linux")]
fn copy_xattrs_linux(path_file_src: &Path, path_file_dst: &Path) {
    let iter_xattr_names = match xattr::list(path_file_src) {
        Ok(v) => v,
        Err(_) => return,
    };

    for name in iter_xattr_names {
        let Some(raw_value) = xattr::get(path_file_src, &name).ok().flatten() else {
            continue;
        };
        let _ = xattr::set(path_file_dst, &name, &raw_value);
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
