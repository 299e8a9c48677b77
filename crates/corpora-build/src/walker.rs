//! Deterministic directory walk.
//!
//! Entries in each directory are visited in file-name order, depth first,
//! with a directory's contents yielded right where the directory sorts.

use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Options controlling which files the walk yields.
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    /// Yield dot-files and descend into dot-directories
    pub include_hidden: bool,
    /// Descend into symlinked directories
    pub follow_links: bool,
    /// Glob patterns for paths to leave out
    pub exclude: ExcludeSet,
    /// Exact paths never yielded (the corpus output)
    pub skip: Vec<PathBuf>,
}

/// Compiled exclude globs.
///
/// `*` and `?` stay inside one path segment, `**` spans segments. A pattern
/// without `/` is matched against the entry name, anything else against the
/// path relative to the walk root.
#[derive(Debug, Clone, Default)]
pub struct ExcludeSet {
    by_name: Vec<Regex>,
    by_path: Vec<Regex>,
}

impl ExcludeSet {
    /// Compile patterns, dropping any that do not form a valid glob.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        let mut set = Self::default();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let Some(regex) = glob_to_regex(pattern) else {
                warn!("Ignoring invalid exclude pattern {:?}", pattern);
                continue;
            };
            if pattern.contains('/') {
                set.by_path.push(regex);
            } else {
                set.by_name.push(regex);
            }
        }
        set
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty() && self.by_path.is_empty()
    }

    /// Check a path relative to the walk root.
    #[must_use]
    pub fn matches(&self, relative: &Path) -> bool {
        let name = relative
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        if self.by_name.iter().any(|re| re.is_match(&name)) {
            return true;
        }

        let path = relative.to_string_lossy().replace('\\', "/");
        self.by_path.iter().any(|re| re.is_match(&path))
    }
}

/// Convert a glob-like pattern to an anchored regex.
fn glob_to_regex(pattern: &str) -> Option<Regex> {
    let escaped = regex::escape(pattern.trim_start_matches("./"))
        .replace(r"\*\*/", "\u{0}")
        .replace(r"\*\*", ".*")
        .replace(r"\*", "[^/]*")
        .replace(r"\?", "[^/]")
        .replace('\u{0}', "(?:.*/)?");
    Regex::new(&format!("^{escaped}$")).ok()
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Walk `root` and return every regular file in visit order.
pub fn scan_directory(root: &Path, options: &WalkOptions) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut visited = HashSet::new();
    if let Ok(canonical) = root.canonicalize() {
        visited.insert(canonical);
    }
    visit_dir(root, root, options, &mut visited, &mut files);
    files
}

fn visit_dir(
    root: &Path,
    dir: &Path,
    options: &WalkOptions,
    visited: &mut HashSet<PathBuf>,
    files: &mut Vec<PathBuf>,
) {
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            warn!("Cannot read directory {:?}: {}", dir, e);
            return;
        }
    };

    let mut entries: Vec<_> = entries.flatten().collect();
    entries.sort_by_key(fs::DirEntry::file_name);

    for entry in entries {
        let path = entry.path();
        let name = entry.file_name();

        if !options.include_hidden && is_hidden(&name.to_string_lossy()) {
            continue;
        }

        let relative = path.strip_prefix(root).unwrap_or(&path);
        if options.exclude.matches(relative) {
            debug!("Excluded {:?}", relative);
            continue;
        }

        let Ok(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_symlink() {
            if path.is_dir() {
                if !options.follow_links {
                    debug!("Not following symlinked directory {:?}", path);
                    continue;
                }
                // Guard against link cycles
                let fresh = path
                    .canonicalize()
                    .is_ok_and(|target| visited.insert(target));
                if fresh {
                    visit_dir(root, &path, options, visited, files);
                } else {
                    debug!("Already visited {:?}", path);
                }
            } else if path.is_file() && !options.skip.contains(&path) {
                files.push(path);
            }
        } else if file_type.is_dir() {
            if let Ok(canonical) = path.canonicalize() {
                visited.insert(canonical);
            }
            visit_dir(root, &path, options, visited, files);
        } else if file_type.is_file() && !options.skip.contains(&path) {
            files.push(path);
        }
    }
}
