//! Destination replacement, tree traversal, and mirror orchestration.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::report::{ReportMirror, ReportMirrorBuilder};
use crate::spec::{EnumMirrorSymlinkStrategy, MirrorTreeError, SpecMirrorOptions};
use crate::util::{
    SpecMirrorPatterns, copy_file_with_metadata, create_symbolic_link, is_overlap,
    should_error_broken_symlink, should_exclude_by_patterns, validate_destination_path_safety,
};

#[derive(Debug, Clone)]
struct SpecDirEntry {
    path_dir_src_sub: PathBuf,
    name_dir: String,
    if_is_symlink: bool,
}

#[derive(Debug, Clone)]
struct SpecFileEntry {
    path_file_src: PathBuf,
    name_file: String,
    if_is_symlink: bool,
}

#[derive(Debug, Clone)]
struct SpecCopyTaskFile {
    path_file_src: PathBuf,
    path_file_dst: PathBuf,
}

#[derive(Debug)]
struct SpecMirrorContext {
    path_dir_src: PathBuf,
    path_dir_dst: PathBuf,
    spec_mr_options: SpecMirrorOptions,
    spec_mr_pats: SpecMirrorPatterns,
    builder_mr_report: ReportMirrorBuilder,
    set_visited_dirs: HashSet<(u64, u64)>,
    l_tasks_file_copy: Vec<SpecCopyTaskFile>,
}

/// Mirror a directory tree from `dir_source` onto `dir_destination`,
/// replacing the destination wholesale.
///
/// Behavior is controlled by [`SpecMirrorOptions`], including:
/// - exclude pattern rules for files and directories,
/// - symlink handling strategy,
/// - dry-run.
///
/// This function performs:
/// 1. Input validation (source must be a directory, no source/destination
///    overlap, destination parent must already exist).
/// 2. Destructive replacement of any pre-existing destination (recursive
///    delete for a directory, unlink for a plain file; a symlink destination
///    is rejected).
/// 3. Directory traversal and file-copy task planning.
/// 4. Serial file-copy execution with Linux metadata preservation.
/// 5. Report aggregation.
///
/// Returns [`ReportMirror`] when the run completes (with possible per-entry
/// errors stored in the report). Returns [`MirrorTreeError`] only for
/// validation and destination-replacement failures. A run that fails mid-copy
/// leaves the destination partially written; there is no rollback.
pub fn mirror_tree<P, Q>(
    dir_source: P,
    dir_destination: Q,
    spec_mr_options: SpecMirrorOptions,
) -> Result<ReportMirror, MirrorTreeError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let path_dir_src = dir_source.as_ref().to_path_buf();
    let path_dir_dst = dir_destination.as_ref().to_path_buf();

    if !path_dir_src.is_dir() {
        return Err(MirrorTreeError::SourceNotDirectory(path_dir_src));
    }
    if is_overlap(&path_dir_src, &path_dir_dst) {
        return Err(MirrorTreeError::SourceDestinationOverlap {
            source: path_dir_src,
            destination: path_dir_dst,
        });
    }

    let spec_mr_pats = SpecMirrorPatterns::from_raw(
        spec_mr_options.patterns_exclude_files.as_deref(),
        spec_mr_options.patterns_exclude_dirs.as_deref(),
        spec_mr_options.rule_pattern,
    )?;

    // Deployment glue: the enclosing front-end checkout must already be
    // there, so a missing parent is an error rather than a mkdir -p.
    if let Some(path_parent_dst) = path_dir_dst.parent()
        && !path_parent_dst.as_os_str().is_empty()
        && !path_parent_dst.is_dir()
    {
        return Err(MirrorTreeError::DestinationParentMissing(
            path_parent_dst.to_path_buf(),
        ));
    }

    let mut builder_mr_report = ReportMirrorBuilder::default();
    replace_destination(&path_dir_dst, &spec_mr_options, &mut builder_mr_report)?;

    let mut spec_mr_ctx = SpecMirrorContext {
        path_dir_src: path_dir_src.clone(),
        path_dir_dst,
        spec_mr_options,
        spec_mr_pats,
        builder_mr_report,
        set_visited_dirs: HashSet::new(),
        l_tasks_file_copy: Vec::new(),
    };

    walk_directory(&path_dir_src, &mut spec_mr_ctx);
    flush_file_copy_tasks(&mut spec_mr_ctx);
    Ok(spec_mr_ctx.builder_mr_report.build())
}

/// Delete whatever occupies the destination path and recreate it as an empty
/// directory. Dry-run records the would-be replacement without mutating.
fn replace_destination(
    path_dir_dst: &Path,
    spec_mr_options: &SpecMirrorOptions,
    builder_mr_report: &mut ReportMirrorBuilder,
) -> Result<(), MirrorTreeError> {
    match fs::symlink_metadata(path_dir_dst) {
        Ok(meta_dir_dst) => {
            if meta_dir_dst.file_type().is_symlink() {
                return Err(MirrorTreeError::DestinationNotReplaceable {
                    path: path_dir_dst.to_path_buf(),
                    message: "Destination is a symbolic link.".to_string(),
                });
            }
            if !spec_mr_options.if_dry_run {
                let res_remove = if meta_dir_dst.is_dir() {
                    fs::remove_dir_all(path_dir_dst)
                } else {
                    fs::remove_file(path_dir_dst)
                };
                res_remove.map_err(|e| MirrorTreeError::DestinationReplaceFailed {
                    path: path_dir_dst.to_path_buf(),
                    message: e.to_string(),
                })?;
            }
            builder_mr_report.set_replaced_destination();
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(MirrorTreeError::DestinationInitFailed {
                path: path_dir_dst.to_path_buf(),
                message: e.to_string(),
            });
        }
    }

    if !spec_mr_options.if_dry_run {
        fs::create_dir(path_dir_dst).map_err(|e| MirrorTreeError::DestinationInitFailed {
            path: path_dir_dst.to_path_buf(),
            message: e.to_string(),
        })?;
    }
    Ok(())
}

fn derive_destination_path(
    path_src: &Path,
    path_item_name: &str,
    spec_mr_ctx: &SpecMirrorContext,
) -> PathBuf {
    spec_mr_ctx.path_dir_dst.join(
        path_src
            .strip_prefix(&spec_mr_ctx.path_dir_src)
            .unwrap_or(Path::new(path_item_name)),
    )
}

fn should_error_unsafe_destination_path(
    path_dst: &Path,
    spec_mr_ctx: &mut SpecMirrorContext,
) -> bool {
    if let Err(message) = validate_destination_path_safety(path_dst, &spec_mr_ctx.path_dir_dst) {
        spec_mr_ctx
            .builder_mr_report
            .add_error(path_dst.to_path_buf(), message);
        return true;
    }
    false
}

fn flush_file_copy_tasks(spec_mr_ctx: &mut SpecMirrorContext) {
    let l_tasks_file_copy = std::mem::take(&mut spec_mr_ctx.l_tasks_file_copy);
    for spec_task in l_tasks_file_copy {
        let res_copy =
            validate_destination_path_safety(&spec_task.path_file_dst, &spec_mr_ctx.path_dir_dst)
                .and_then(|_| {
                    copy_file_with_metadata(&spec_task.path_file_src, &spec_task.path_file_dst)
                        .map_err(|e| e.to_string())
                });
        match res_copy {
            Ok(_) => spec_mr_ctx.builder_mr_report.add_copied(),
            Err(msg) => spec_mr_ctx
                .builder_mr_report
                .add_error(spec_task.path_file_dst, msg),
        }
    }
}

fn walk_directory(path_root: &Path, spec_mr_ctx: &mut SpecMirrorContext) {
    let enum_rule_symlink = spec_mr_ctx.spec_mr_options.rule_symlink;
    if enum_rule_symlink == EnumMirrorSymlinkStrategy::Dereference {
        if let Ok(stat_root) = fs::metadata(path_root) {
            #[cfg(unix)]
            {
                use std::os::unix::fs::MetadataExt;
                let tuple_dirs_identifier = (stat_root.dev(), stat_root.ino());
                if !spec_mr_ctx.set_visited_dirs.insert(tuple_dirs_identifier) {
                    spec_mr_ctx
                        .builder_mr_report
                        .add_warning(format!("Symlink loop detected: {}", path_root.display()));
                    return;
                }
            }
        } else {
            spec_mr_ctx
                .builder_mr_report
                .add_warning(format!("Failed to stat directory: {}", path_root.display()));
            return;
        }
    }

    let mut l_dirs: Vec<SpecDirEntry> = Vec::new();
    let mut l_files: Vec<SpecFileEntry> = Vec::new();

    let iter_entries = match fs::read_dir(path_root) {
        Ok(iter) => iter,
        Err(e) => {
            spec_mr_ctx.builder_mr_report.add_warning(format!(
                "Failed to read directory {} ({e})",
                path_root.display()
            ));
            return;
        }
    };

    for _entry_res in iter_entries {
        let entry = match _entry_res {
            Ok(v) => v,
            Err(e) => {
                spec_mr_ctx.builder_mr_report.add_warning(format!(
                    "Failed to read directory entry under {} ({e})",
                    path_root.display()
                ));
                continue;
            }
        };

        let path_entry = entry.path();
        let c_name = entry.file_name().to_string_lossy().to_string();
        let cfg_file_type = match entry.file_type() {
            Ok(v) => v,
            Err(e) => {
                spec_mr_ctx
                    .builder_mr_report
                    .add_warning(format!("Failed to inspect {} ({e})", path_entry.display()));
                continue;
            }
        };

        let b_is_symlink = cfg_file_type.is_symlink();
        let b_is_dir = cfg_file_type.is_dir() || (b_is_symlink && path_entry.is_dir());
        if b_is_dir {
            l_dirs.push(SpecDirEntry {
                path_dir_src_sub: path_entry,
                name_dir: c_name,
                if_is_symlink: b_is_symlink,
            });
        } else if cfg_file_type.is_file() || b_is_symlink {
            l_files.push(SpecFileEntry {
                path_file_src: path_entry,
                name_file: c_name,
                if_is_symlink: b_is_symlink,
            });
        } else {
            spec_mr_ctx
                .builder_mr_report
                .add_warning(format!("Special file skipped: {}", path_entry.display()));
        }
    }

    l_dirs.sort_by(|a, b| a.name_dir.cmp(&b.name_dir));
    l_files.sort_by(|a, b| a.name_file.cmp(&b.name_file));

    if spec_mr_ctx.spec_mr_pats.patterns_exclude_dirs.is_some() {
        l_dirs.retain(|d| {
            !should_exclude_by_patterns(
                &d.name_dir,
                spec_mr_ctx.spec_mr_pats.patterns_exclude_dirs.as_ref(),
            )
        });
    }

    for _dir_entry in l_dirs {
        let path_next = _dir_entry.path_dir_src_sub.clone();
        let b_should_descend = handle_dir_entry(_dir_entry, spec_mr_ctx);
        if b_should_descend {
            walk_directory(&path_next, spec_mr_ctx);
        }
    }

    for _file_entry in l_files {
        handle_file_entry(_file_entry, spec_mr_ctx);
    }
}

fn handle_dir_entry(spec_dir_entry: SpecDirEntry, spec_mr_ctx: &mut SpecMirrorContext) -> bool {
    let enum_rule_symlink = spec_mr_ctx.spec_mr_options.rule_symlink;
    let if_dry_run = spec_mr_ctx.spec_mr_options.if_dry_run;

    if spec_dir_entry.if_is_symlink {
        if enum_rule_symlink == EnumMirrorSymlinkStrategy::SkipSymlinks {
            spec_mr_ctx
                .builder_mr_report
                .add_counts(&["cnt_scanned", "cnt_matched", "cnt_skipped"], 1);
            return false;
        }

        if should_error_broken_symlink(&spec_dir_entry.path_dir_src_sub, enum_rule_symlink) {
            spec_mr_ctx.builder_mr_report.add_error(
                spec_dir_entry.path_dir_src_sub.clone(),
                format!(
                    "Broken symlink: {}",
                    spec_dir_entry.path_dir_src_sub.display()
                ),
            );
            spec_mr_ctx
                .builder_mr_report
                .add_counts(&["cnt_scanned", "cnt_matched"], 1);
            return false;
        }

        if enum_rule_symlink == EnumMirrorSymlinkStrategy::CopySymlinks {
            spec_mr_ctx
                .builder_mr_report
                .add_counts(&["cnt_scanned", "cnt_matched"], 1);

            let path_dir_dst_sub = derive_destination_path(
                &spec_dir_entry.path_dir_src_sub,
                &spec_dir_entry.name_dir,
                spec_mr_ctx,
            );
            if should_error_unsafe_destination_path(&path_dir_dst_sub, spec_mr_ctx) {
                return false;
            }

            if if_dry_run {
                spec_mr_ctx.builder_mr_report.add_skipped();
                return false;
            }

            create_symbolic_link(
                &spec_dir_entry.path_dir_src_sub,
                &path_dir_dst_sub,
                &mut spec_mr_ctx.builder_mr_report,
            );
            return false;
        }
        // Dereference: treat the entry as the directory it points to.
    }

    spec_mr_ctx
        .builder_mr_report
        .add_counts(&["cnt_scanned", "cnt_matched"], 1);
    let path_dir_dst_sub = derive_destination_path(
        &spec_dir_entry.path_dir_src_sub,
        &spec_dir_entry.name_dir,
        spec_mr_ctx,
    );
    if should_error_unsafe_destination_path(&path_dir_dst_sub, spec_mr_ctx) {
        return false;
    }

    if if_dry_run {
        spec_mr_ctx.builder_mr_report.add_skipped();
    } else if let Err(e) = fs::create_dir_all(&path_dir_dst_sub) {
        spec_mr_ctx
            .builder_mr_report
            .add_error(path_dir_dst_sub, e.to_string());
        return false;
    } else {
        spec_mr_ctx.builder_mr_report.add_copied();
    }

    true
}

fn handle_file_entry(spec_file_entry: SpecFileEntry, spec_mr_ctx: &mut SpecMirrorContext) {
    spec_mr_ctx.builder_mr_report.add_scanned();

    if should_exclude_by_patterns(
        &spec_file_entry.name_file,
        spec_mr_ctx.spec_mr_pats.patterns_exclude_files.as_ref(),
    ) {
        return;
    }
    spec_mr_ctx.builder_mr_report.add_matched();

    let enum_rule_symlink = spec_mr_ctx.spec_mr_options.rule_symlink;
    if spec_file_entry.if_is_symlink {
        if enum_rule_symlink == EnumMirrorSymlinkStrategy::SkipSymlinks {
            spec_mr_ctx.builder_mr_report.add_skipped();
            return;
        }

        if should_error_broken_symlink(&spec_file_entry.path_file_src, enum_rule_symlink) {
            spec_mr_ctx.builder_mr_report.add_error(
                spec_file_entry.path_file_src.clone(),
                format!(
                    "Broken symlink: {}",
                    spec_file_entry.path_file_src.display()
                ),
            );
            return;
        }
    }
    if !spec_file_entry.if_is_symlink {
        let meta_file_src = match fs::symlink_metadata(&spec_file_entry.path_file_src) {
            Ok(v) => v,
            Err(e) => {
                spec_mr_ctx
                    .builder_mr_report
                    .add_error(spec_file_entry.path_file_src.clone(), e.to_string());
                return;
            }
        };
        if !meta_file_src.file_type().is_file() {
            spec_mr_ctx.builder_mr_report.add_warning(format!(
                "Special file skipped: {}",
                spec_file_entry.path_file_src.display()
            ));
            spec_mr_ctx.builder_mr_report.add_skipped();
            return;
        }
    } else if enum_rule_symlink == EnumMirrorSymlinkStrategy::Dereference {
        let meta_file_src_target = match fs::metadata(&spec_file_entry.path_file_src) {
            Ok(v) => v,
            Err(e) => {
                spec_mr_ctx
                    .builder_mr_report
                    .add_error(spec_file_entry.path_file_src.clone(), e.to_string());
                return;
            }
        };
        if !meta_file_src_target.file_type().is_file() {
            spec_mr_ctx.builder_mr_report.add_warning(format!(
                "Special file target skipped: {}",
                spec_file_entry.path_file_src.display()
            ));
            spec_mr_ctx.builder_mr_report.add_skipped();
            return;
        }
    }

    let path_file_dst = derive_destination_path(
        &spec_file_entry.path_file_src,
        &spec_file_entry.name_file,
        spec_mr_ctx,
    );
    if should_error_unsafe_destination_path(&path_file_dst, spec_mr_ctx) {
        return;
    }

    if spec_mr_ctx.spec_mr_options.if_dry_run {
        spec_mr_ctx.builder_mr_report.add_skipped();
        return;
    }

    if let Some(path_parent_dst) = path_file_dst.parent()
        && let Err(e) = fs::create_dir_all(path_parent_dst)
    {
        spec_mr_ctx
            .builder_mr_report
            .add_error(path_file_dst, e.to_string());
        return;
    }

    if spec_file_entry.if_is_symlink
        && enum_rule_symlink == EnumMirrorSymlinkStrategy::CopySymlinks
    {
        create_symbolic_link(
            &spec_file_entry.path_file_src,
            &path_file_dst,
            &mut spec_mr_ctx.builder_mr_report,
        );
        return;
    }

    spec_mr_ctx.l_tasks_file_copy.push(SpecCopyTaskFile {
        path_file_src: spec_file_entry.path_file_src,
        path_file_dst,
    });
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::mirror_tree;
    use crate::spec::{
        EnumMirrorPatternMode, EnumMirrorSymlinkStrategy, MirrorTreeError, SpecMirrorOptions,
    };

    struct TestDir {
        path: PathBuf,
    }

    impl TestDir {
        fn new() -> Self {
            let n = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock")
                .as_nanos();
            let path = std::env::temp_dir().join(format!("artsync_fs_test_{n}"));
            std::fs::create_dir_all(&path).expect("create test dir");
            Self { path }
        }

        fn path(&self) -> &Path {
            &self.path
        }
    }

    impl Drop for TestDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.path);
        }
    }

    fn write_text(path: &Path, txt: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent");
        }
        std::fs::write(path, txt).expect("write text");
    }

    fn read_text(path: &Path) -> String {
        std::fs::read_to_string(path).expect("read text")
    }

    #[test]
    fn mirror_tree_smoke_basic() {
        let tmp = TestDir::new();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");

        write_text(&src.join("a.txt"), "alpha");
        write_text(&src.join("b/c.txt"), "charlie");

        let report = mirror_tree(&src, &dst, SpecMirrorOptions::default()).expect("mirror tree");
        assert_eq!(report.error_count(), 0);
        assert!(!report.if_replaced_destination);
        assert_eq!(read_text(&dst.join("a.txt")), "alpha");
        assert_eq!(read_text(&dst.join("b/c.txt")), "charlie");

        // Source must never be mutated.
        assert_eq!(read_text(&src.join("a.txt")), "alpha");
        assert_eq!(read_text(&src.join("b/c.txt")), "charlie");

        // 1 directory + 2 files.
        assert_eq!(report.cnt_copied, 3);
        assert_eq!(report.cnt_scanned, 3);
        assert_eq!(report.cnt_matched, 3);
    }

    #[test]
    fn mirror_tree_removes_stale_destination_entries() {
        let tmp = TestDir::new();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");

        write_text(&src.join("a.txt"), "alpha");
        write_text(&dst.join("old.txt"), "stale");
        write_text(&dst.join("nested/old2.txt"), "stale");

        let report = mirror_tree(&src, &dst, SpecMirrorOptions::default()).expect("mirror tree");
        assert_eq!(report.error_count(), 0);
        assert!(report.if_replaced_destination);
        assert!(dst.join("a.txt").exists());
        assert!(!dst.join("old.txt").exists());
        assert!(!dst.join("nested").exists());
    }

    #[test]
    fn mirror_tree_is_idempotent() {
        let tmp = TestDir::new();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");

        write_text(&src.join("a.txt"), "alpha");
        write_text(&src.join("b/c.txt"), "charlie");

        let report_first =
            mirror_tree(&src, &dst, SpecMirrorOptions::default()).expect("first run");
        let report_second =
            mirror_tree(&src, &dst, SpecMirrorOptions::default()).expect("second run");

        assert_eq!(report_first.error_count(), 0);
        assert_eq!(report_second.error_count(), 0);
        assert!(report_second.if_replaced_destination);
        assert_eq!(report_first.cnt_copied, report_second.cnt_copied);
        assert_eq!(read_text(&dst.join("a.txt")), "alpha");
        assert_eq!(read_text(&dst.join("b/c.txt")), "charlie");
    }

    #[test]
    fn mirror_tree_missing_source_leaves_destination_untouched() {
        let tmp = TestDir::new();
        let src = tmp.path().join("no_such_src");
        let dst = tmp.path().join("dst");
        write_text(&dst.join("old.txt"), "stale");

        let err = mirror_tree(&src, &dst, SpecMirrorOptions::default()).expect_err("must fail");
        assert!(matches!(err, MirrorTreeError::SourceNotDirectory(_)));
        assert_eq!(read_text(&dst.join("old.txt")), "stale");
    }

    #[test]
    fn mirror_tree_missing_destination_parent_rejected() {
        let tmp = TestDir::new();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("no_such_parent/dst");
        write_text(&src.join("a.txt"), "alpha");

        let err = mirror_tree(&src, &dst, SpecMirrorOptions::default()).expect_err("must fail");
        assert!(matches!(err, MirrorTreeError::DestinationParentMissing(_)));
        assert!(!tmp.path().join("no_such_parent").exists());
    }

    #[test]
    fn mirror_tree_overlap_rejected() {
        let tmp = TestDir::new();
        let src = tmp.path().join("src");
        std::fs::create_dir_all(&src).expect("mkdir src");

        let nested = src.join("nested");
        let err = mirror_tree(&src, &nested, SpecMirrorOptions::default()).expect_err("must fail");
        assert!(matches!(
            err,
            MirrorTreeError::SourceDestinationOverlap { .. }
        ));
    }

    #[test]
    fn mirror_tree_replaces_plain_file_destination() {
        let tmp = TestDir::new();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        write_text(&src.join("a.txt"), "alpha");
        write_text(&dst, "i am a file, not a directory");

        let report = mirror_tree(&src, &dst, SpecMirrorOptions::default()).expect("mirror tree");
        assert_eq!(report.error_count(), 0);
        assert!(report.if_replaced_destination);
        assert!(dst.is_dir());
        assert_eq!(read_text(&dst.join("a.txt")), "alpha");
    }

    #[cfg(unix)]
    #[test]
    fn mirror_tree_rejects_symlink_destination() {
        use std::os::unix::fs::symlink;

        let tmp = TestDir::new();
        let src = tmp.path().join("src");
        let dst_real = tmp.path().join("dst_real");
        let dst_link = tmp.path().join("dst_link");
        write_text(&src.join("a.txt"), "alpha");
        std::fs::create_dir_all(&dst_real).expect("create dst real");
        symlink(&dst_real, &dst_link).expect("create dst symlink");

        let err = mirror_tree(&src, &dst_link, SpecMirrorOptions::default())
            .expect_err("symlink destination must fail");
        assert!(matches!(
            err,
            MirrorTreeError::DestinationNotReplaceable { .. }
        ));
        assert!(dst_link.exists());
    }

    #[test]
    fn mirror_tree_exclude_glob_works() {
        let tmp = TestDir::new();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");

        write_text(&src.join("keep.txt"), "keep");
        write_text(&src.join("drop.md"), "drop");

        let spec_mr_options = SpecMirrorOptions {
            patterns_exclude_files: Some(vec!["*.md".to_string()]),
            ..SpecMirrorOptions::default()
        };

        let report = mirror_tree(&src, &dst, spec_mr_options).expect("mirror tree");
        assert_eq!(report.error_count(), 0);
        assert!(dst.join("keep.txt").exists());
        assert!(!dst.join("drop.md").exists());
    }

    #[test]
    fn mirror_tree_exclude_dirs_works() {
        let tmp = TestDir::new();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");

        write_text(&src.join("a.txt"), "a");
        write_text(&src.join("build-info/meta.json"), "{}");

        let spec_mr_options = SpecMirrorOptions {
            patterns_exclude_dirs: Some(vec!["build-info".to_string()]),
            rule_pattern: EnumMirrorPatternMode::Literal,
            ..SpecMirrorOptions::default()
        };

        let report = mirror_tree(&src, &dst, spec_mr_options).expect("mirror tree");
        assert_eq!(report.error_count(), 0);
        assert!(dst.join("a.txt").exists());
        assert!(!dst.join("build-info").exists());
    }

    #[test]
    fn mirror_tree_exclude_regex_works() {
        let tmp = TestDir::new();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");

        write_text(&src.join("Contract.json"), "{}");
        write_text(&src.join("Contract.dbg.json"), "{}");

        let spec_mr_options = SpecMirrorOptions {
            patterns_exclude_files: Some(vec![r"\.dbg\.json$".to_string()]),
            rule_pattern: EnumMirrorPatternMode::Regex,
            ..SpecMirrorOptions::default()
        };

        let report = mirror_tree(&src, &dst, spec_mr_options).expect("mirror tree");
        assert_eq!(report.error_count(), 0);
        assert!(dst.join("Contract.json").exists());
        assert!(!dst.join("Contract.dbg.json").exists());
    }

    #[test]
    fn mirror_tree_invalid_glob_rejected() {
        let tmp = TestDir::new();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        write_text(&src.join("a.txt"), "a");

        let spec_mr_options = SpecMirrorOptions {
            patterns_exclude_files: Some(vec!["[".to_string()]),
            rule_pattern: EnumMirrorPatternMode::Glob,
            ..SpecMirrorOptions::default()
        };

        let err = mirror_tree(&src, &dst, spec_mr_options).expect_err("invalid glob must fail");
        assert!(matches!(err, MirrorTreeError::InvalidPattern(_)));
        assert!(!dst.exists());
    }

    #[test]
    fn mirror_tree_invalid_regex_rejected() {
        let tmp = TestDir::new();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        write_text(&src.join("a.txt"), "a");

        let spec_mr_options = SpecMirrorOptions {
            patterns_exclude_files: Some(vec!["(".to_string()]),
            rule_pattern: EnumMirrorPatternMode::Regex,
            ..SpecMirrorOptions::default()
        };

        let err = mirror_tree(&src, &dst, spec_mr_options).expect_err("invalid regex must fail");
        assert!(matches!(err, MirrorTreeError::InvalidPattern(_)));
        assert!(!dst.exists());
    }

    #[test]
    fn mirror_tree_dry_run_mutates_nothing() {
        let tmp = TestDir::new();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");

        write_text(&src.join("a.txt"), "alpha");
        write_text(&dst.join("old.txt"), "stale");

        let spec_mr_options = SpecMirrorOptions {
            if_dry_run: true,
            ..SpecMirrorOptions::default()
        };
        let report = mirror_tree(&src, &dst, spec_mr_options).expect("mirror tree");

        assert_eq!(report.error_count(), 0);
        assert!(report.if_replaced_destination);
        assert_eq!(report.cnt_copied, 0);
        assert!(report.cnt_skipped >= 1);
        assert_eq!(read_text(&dst.join("old.txt")), "stale");
        assert!(!dst.join("a.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn mirror_tree_dereferences_symlinks_by_default() {
        use std::os::unix::fs::symlink;

        let tmp = TestDir::new();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        write_text(&src.join("real.txt"), "real");
        symlink(src.join("real.txt"), src.join("link.txt")).expect("create symlink");

        let report = mirror_tree(&src, &dst, SpecMirrorOptions::default()).expect("mirror tree");
        assert_eq!(report.error_count(), 0);
        assert!(!dst.join("link.txt").is_symlink());
        assert_eq!(read_text(&dst.join("link.txt")), "real");
    }

    #[cfg(unix)]
    #[test]
    fn mirror_tree_symlink_copy_mode() {
        use std::os::unix::fs::symlink;

        let tmp = TestDir::new();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        write_text(&src.join("real.txt"), "real");
        symlink(src.join("real.txt"), src.join("link.txt")).expect("create symlink");

        let spec_mr_options = SpecMirrorOptions {
            rule_symlink: EnumMirrorSymlinkStrategy::CopySymlinks,
            ..SpecMirrorOptions::default()
        };

        let report = mirror_tree(&src, &dst, spec_mr_options).expect("mirror tree");
        assert_eq!(report.error_count(), 0);
        assert!(dst.join("link.txt").is_symlink());
    }

    #[cfg(unix)]
    #[test]
    fn mirror_tree_broken_symlink_dereference_errors() {
        use std::os::unix::fs::symlink;

        let tmp = TestDir::new();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        write_text(&src.join("real.txt"), "real");
        symlink(src.join("missing.txt"), src.join("dangling.txt")).expect("create symlink");

        let report = mirror_tree(&src, &dst, SpecMirrorOptions::default()).expect("mirror tree");
        assert_eq!(report.error_count(), 1);
        assert!(dst.join("real.txt").exists());
        assert!(!dst.join("dangling.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn mirror_tree_skip_symlinks_mode() {
        use std::os::unix::fs::symlink;

        let tmp = TestDir::new();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        write_text(&src.join("real.txt"), "real");
        symlink(src.join("real.txt"), src.join("link.txt")).expect("create symlink");

        let spec_mr_options = SpecMirrorOptions {
            rule_symlink: EnumMirrorSymlinkStrategy::SkipSymlinks,
            ..SpecMirrorOptions::default()
        };

        let report = mirror_tree(&src, &dst, spec_mr_options).expect("mirror tree");
        assert_eq!(report.error_count(), 0);
        assert!(dst.join("real.txt").exists());
        assert!(!dst.join("link.txt").exists());
        assert!(report.cnt_skipped >= 1);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn mirror_tree_preserves_linux_metadata() {
        use filetime::{FileTime, set_file_times};
        use std::os::unix::fs::PermissionsExt;

        let tmp = TestDir::new();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        let path_file_src = src.join("meta.txt");
        write_text(&path_file_src, "meta");

        std::fs::set_permissions(&path_file_src, std::fs::Permissions::from_mode(0o640))
            .expect("set permissions");
        set_file_times(
            &path_file_src,
            FileTime::from_unix_time(1_700_000_010, 0),
            FileTime::from_unix_time(1_700_000_020, 0),
        )
        .expect("set times");

        let c_xattr_name = "user.artsync_fs_test";
        let b_if_has_xattr = xattr::set(&path_file_src, c_xattr_name, b"meta_value").is_ok();

        let report = mirror_tree(&src, &dst, SpecMirrorOptions::default()).expect("mirror tree");
        assert_eq!(report.error_count(), 0);

        let path_file_dst = dst.join("meta.txt");
        let stat_src = std::fs::metadata(&path_file_src).expect("src metadata");
        let stat_dst = std::fs::metadata(&path_file_dst).expect("dst metadata");
        assert_eq!(
            stat_src.permissions().mode() & 0o777,
            stat_dst.permissions().mode() & 0o777
        );
        assert_eq!(
            FileTime::from_last_modification_time(&stat_src),
            FileTime::from_last_modification_time(&stat_dst)
        );

        if b_if_has_xattr {
            let raw_value_dst = xattr::get(&path_file_dst, c_xattr_name)
                .expect("get dst xattr")
                .expect("xattr exists");
            assert_eq!(raw_value_dst, b"meta_value");
        }
    }

    #[test]
    fn mirror_tree_fuzz_like_randomized_inputs_no_panic() {
        fn derive_name(seed: u64, n_idx: usize) -> String {
            let mut value = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
            value ^= (n_idx as u64).wrapping_mul(0x9E3779B97F4A7C15);
            format!("f_{:016x}.txt", value)
        }

        for n_seed in 0_u64..25 {
            let tmp = TestDir::new();
            let src = tmp.path().join("src");
            let dst = tmp.path().join("dst");

            for n_idx in 0..12 {
                let name = derive_name(n_seed, n_idx);
                if n_idx % 3 == 0 {
                    write_text(&src.join("a").join(name), "x");
                } else if n_idx % 3 == 1 {
                    write_text(&src.join("b").join("c").join(name), "x");
                } else {
                    write_text(&src.join(name), "x");
                }
            }

            let report = mirror_tree(&src, &dst, SpecMirrorOptions::default()).expect("first run");
            assert_eq!(report.error_count(), 0);

            // Mirroring again must reproduce the same tree.
            let report_again =
                mirror_tree(&src, &dst, SpecMirrorOptions::default()).expect("second run");
            assert_eq!(report_again.error_count(), 0);
            assert!(report_again.if_replaced_destination);
            assert_eq!(report.cnt_copied, report_again.cnt_copied);
        }
    }
}
