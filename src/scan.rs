//! Post discovery for the supported on-disk conventions.
//!
//! A blog keeps its posts under one root directory, laid out in one of four
//! conventions:
//!
//! ```text
//! flat         posts/2020-03-02_second.html
//! hierarchy    posts/2020/03/02_second.html
//! year         posts/2020/03-02_second.html
//! user         posts/any/depth/2020-03-02_second.html
//! ```
//!
//! Every convention answers the same question, "which posts exist, newest
//! first?", and produces the same [`PostDescriptor`] for the same logical
//! post. The filename grammar itself lives in [`crate::naming`].
//!
//! ## Ordering
//!
//! | Convention | Mechanism |
//! |---|---|
//! | flat | reverse lexicographic over full path |
//! | hierarchy | years desc → months desc → day desc |
//! | year | years desc → reverse lexicographic path within a year |
//! | user | full index, stable sort desc by `(year, month, day)` |
//!
//! Zero-padding makes each of these reverse-chronological.
//!
//! ## Errors
//!
//! A directory that cannot be read aborts the scan: no partial index is ever
//! returned. Files that don't fit the grammar are skipped without a
//! diagnostic, as are hidden entries (leading `.`).
//!
//! ## Same-day posts under `hierarchy`
//!
//! The hierarchy convention indexes a month's posts by day of month. Two posts
//! on the same day collide and only one survives: files are read in ascending
//! name order and the later one wins. The dropped file is logged at `warn`.
//! The other conventions keep every post.

use crate::naming::{self, ParsedPostName, PostDate};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("cannot read posts directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot walk posts directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// On-disk layout of a blog's posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Convention {
    /// `YYYY-MM-DD_slug.ext` in one directory.
    #[default]
    Flat,
    /// `year/month/DD_slug.ext`.
    #[serde(alias = "hierarchical")]
    Hierarchy,
    /// `year/MM-DD_slug.ext`.
    Year,
    /// `YYYY-MM-DD_slug.ext` anywhere under the root.
    User,
}

/// Identity of one post file. Two descriptors are the same post iff their
/// paths are equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostDescriptor {
    #[serde(flatten)]
    pub date: PostDate,
    pub slug: String,
    pub path: PathBuf,
}

impl PostDescriptor {
    fn from_parsed(parsed: ParsedPostName, path: PathBuf) -> Self {
        Self {
            date: parsed.date,
            slug: parsed.slug,
            path,
        }
    }
}

/// Scan `root` with the given convention. Newest post first.
pub fn scan(root: &Path, convention: Convention) -> Result<Vec<PostDescriptor>, ScanError> {
    convention.scan(root)
}

impl Convention {
    pub fn scan(self, root: &Path) -> Result<Vec<PostDescriptor>, ScanError> {
        let posts = match self {
            Self::Flat => scan_flat(root)?,
            Self::Hierarchy => scan_hierarchy(root)?,
            Self::Year => scan_year(root)?,
            Self::User => scan_user(root)?,
        };
        debug!(
            "scanned {} posts under {} ({:?})",
            posts.len(),
            root.display(),
            self
        );
        Ok(posts)
    }

    /// Physical path of a post given its identity fields.
    ///
    /// The path is built, not verified: if no file with `extension` exists,
    /// a sibling with the same stem and another extension is preferred when
    /// one exists, otherwise the built path is returned as-is. The `user`
    /// convention has no fixed location, so it searches the tree and falls
    /// back to the flat layout.
    pub fn post_path(self, root: &Path, date: &PostDate, slug: &str, extension: &str) -> PathBuf {
        let built = match self {
            Self::Flat => root.join(format!("{date}_{slug}.{extension}")),
            Self::Hierarchy => root
                .join(&date.year)
                .join(&date.month)
                .join(format!("{}_{slug}.{extension}", date.day)),
            Self::Year => root
                .join(&date.year)
                .join(format!("{}-{}_{slug}.{extension}", date.month, date.day)),
            Self::User => {
                return find_user_post(root, date, slug)
                    .unwrap_or_else(|| root.join(format!("{date}_{slug}.{extension}")));
            }
        };
        if built.is_file() {
            built
        } else {
            find_other_extension(&built).unwrap_or(built)
        }
    }
}

// =============================================================================
// Directory listing
// =============================================================================

struct Entry {
    name: String,
    path: PathBuf,
    is_dir: bool,
}

/// List a directory, sorted by name ascending. Hidden and non-UTF-8 names
/// are skipped; any read error is fatal.
fn collect_entries(dir: &Path) -> Result<Vec<Entry>, ScanError> {
    let io_err = |source| ScanError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let Some(name) = entry.file_name().to_str().map(String::from) else {
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        let path = entry.path();
        let is_dir = path.is_dir();
        entries.push(Entry { name, path, is_dir });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// Subdirectories whose names pass `accept`, newest (largest) first.
fn dated_subdirs(dir: &Path, accept: fn(&str) -> bool) -> Result<Vec<Entry>, ScanError> {
    let mut dirs: Vec<Entry> = collect_entries(dir)?
        .into_iter()
        .filter(|e| e.is_dir && accept(&e.name))
        .collect();
    dirs.reverse();
    Ok(dirs)
}

// =============================================================================
// Conventions
// =============================================================================

fn scan_flat(root: &Path) -> Result<Vec<PostDescriptor>, ScanError> {
    let mut posts: Vec<PostDescriptor> = collect_entries(root)?
        .into_iter()
        .filter(|e| !e.is_dir)
        .filter_map(|e| {
            naming::parse_full_name(&e.name).map(|p| PostDescriptor::from_parsed(p, e.path))
        })
        .collect();
    posts.sort_by(|a, b| b.path.cmp(&a.path));
    Ok(posts)
}

fn scan_hierarchy(root: &Path) -> Result<Vec<PostDescriptor>, ScanError> {
    let mut posts = Vec::new();
    for year in dated_subdirs(root, naming::is_year)? {
        for month in dated_subdirs(&year.path, naming::is_two_digits)? {
            let mut by_day: BTreeMap<String, PostDescriptor> = BTreeMap::new();
            for file in collect_entries(&month.path)?.into_iter().filter(|e| !e.is_dir) {
                let Some(parsed) = naming::parse_day_name(&year.name, &month.name, &file.name)
                else {
                    continue;
                };
                let day = parsed.date.day.clone();
                let post = PostDescriptor::from_parsed(parsed, file.path);
                if let Some(dropped) = by_day.insert(day, post) {
                    warn!(
                        "two posts on {} in {}: {} is shadowed",
                        dropped.date,
                        month.path.display(),
                        dropped.path.display()
                    );
                }
            }
            posts.extend(by_day.into_values().rev());
        }
    }
    Ok(posts)
}

fn scan_year(root: &Path) -> Result<Vec<PostDescriptor>, ScanError> {
    let mut posts = Vec::new();
    for year in dated_subdirs(root, naming::is_year)? {
        let mut in_year: Vec<PostDescriptor> = collect_entries(&year.path)?
            .into_iter()
            .filter(|e| !e.is_dir)
            .filter_map(|e| {
                naming::parse_month_day_name(&year.name, &e.name)
                    .map(|p| PostDescriptor::from_parsed(p, e.path))
            })
            .collect();
        in_year.sort_by(|a, b| b.path.cmp(&a.path));
        posts.extend(in_year);
    }
    Ok(posts)
}

fn scan_user(root: &Path) -> Result<Vec<PostDescriptor>, ScanError> {
    let mut posts = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if let Some(parsed) = naming::parse_full_name(name) {
            posts.push(PostDescriptor::from_parsed(parsed, entry.into_path()));
        }
    }
    // Stable: same-day posts keep traversal order.
    posts.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(posts)
}

// =============================================================================
// Path lookup helpers
// =============================================================================

fn find_user_post(root: &Path, date: &PostDate, slug: &str) -> Option<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .find(|e| {
            e.file_name()
                .to_str()
                .and_then(naming::parse_full_name)
                .is_some_and(|p| p.date == *date && p.slug == slug)
        })
        .map(|e| e.into_path())
}

fn find_other_extension(built: &Path) -> Option<PathBuf> {
    let dir = built.parent()?;
    let stem = built.file_stem()?;
    let mut candidates: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.file_stem() == Some(stem))
        .collect();
    candidates.sort();
    candidates.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::touch;
    use tempfile::TempDir;

    fn slugs(posts: &[PostDescriptor]) -> Vec<&str> {
        posts.iter().map(|p| p.slug.as_str()).collect()
    }

    /// The same five posts under each convention's layout.
    fn layout(convention: Convention) -> Vec<&'static str> {
        match convention {
            Convention::Flat => vec![
                "2019-12-31_old.html",
                "2020-01-01_first.html",
                "2020-03-02_second.html",
                "2020-11-05_third.html",
                "2021-02-14_fourth.html",
            ],
            Convention::Hierarchy => vec![
                "2019/12/31_old.html",
                "2020/01/01_first.html",
                "2020/03/02_second.html",
                "2020/11/05_third.html",
                "2021/02/14_fourth.html",
            ],
            Convention::Year => vec![
                "2019/12-31_old.html",
                "2020/01-01_first.html",
                "2020/03-02_second.html",
                "2020/11-05_third.html",
                "2021/02-14_fourth.html",
            ],
            Convention::User => vec![
                "archive/2019-12-31_old.html",
                "2020-01-01_first.html",
                "misc/deep/2020-03-02_second.html",
                "misc/2020-11-05_third.html",
                "2021-02-14_fourth.html",
            ],
        }
    }

    const ALL: [Convention; 4] = [
        Convention::Flat,
        Convention::Hierarchy,
        Convention::Year,
        Convention::User,
    ];

    // =========================================================================
    // Ordering
    // =========================================================================

    #[test]
    fn flat_scan_is_newest_first() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "2020-01-01_first.html");
        touch(tmp.path(), "2020-03-02_second.html");
        touch(tmp.path(), "2019-12-31_old.html");

        let posts = scan(tmp.path(), Convention::Flat).unwrap();
        assert_eq!(slugs(&posts), vec!["second", "first", "old"]);
        assert_eq!(posts[0].date, PostDate::new("2020", "03", "02").unwrap());
        assert_eq!(posts[0].path, tmp.path().join("2020-03-02_second.html"));
    }

    #[test]
    fn all_conventions_agree_on_order() {
        for convention in ALL {
            let tmp = TempDir::new().unwrap();
            for rel in layout(convention) {
                touch(tmp.path(), rel);
            }
            let posts = scan(tmp.path(), convention).unwrap();
            assert_eq!(
                slugs(&posts),
                vec!["fourth", "third", "second", "first", "old"],
                "{convention:?}"
            );
        }
    }

    #[test]
    fn all_conventions_agree_on_dates() {
        let mut seen = Vec::new();
        for convention in ALL {
            let tmp = TempDir::new().unwrap();
            for rel in layout(convention) {
                touch(tmp.path(), rel);
            }
            let dates: Vec<String> = scan(tmp.path(), convention)
                .unwrap()
                .iter()
                .map(|p| p.date.to_string())
                .collect();
            seen.push(dates);
        }
        assert!(seen.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn hierarchy_orders_months_numerically() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "2020/02/01_feb.html");
        touch(tmp.path(), "2020/10/01_oct.html");
        touch(tmp.path(), "2020/09/30_sep.html");

        let posts = scan(tmp.path(), Convention::Hierarchy).unwrap();
        assert_eq!(slugs(&posts), vec!["oct", "sep", "feb"]);
    }

    #[test]
    fn user_same_day_posts_keep_traversal_order() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a/2020-01-01_alpha.html");
        touch(tmp.path(), "b/2020-01-01_beta.html");
        touch(tmp.path(), "2021-01-01_newer.html");

        let posts = scan(tmp.path(), Convention::User).unwrap();
        assert_eq!(slugs(&posts), vec!["newer", "alpha", "beta"]);
    }

    // =========================================================================
    // Grammar filtering
    // =========================================================================

    #[test]
    fn non_matching_files_are_skipped() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "2020-01-01_first.html");
        touch(tmp.path(), "README.md");
        touch(tmp.path(), "2020-1-01_bad.html");
        touch(tmp.path(), ".2020-01-02_hidden.html");
        fs::create_dir_all(tmp.path().join("2020-01-03_dir.html")).unwrap();

        let posts = scan(tmp.path(), Convention::Flat).unwrap();
        assert_eq!(slugs(&posts), vec!["first"]);
    }

    #[test]
    fn hierarchy_ignores_non_date_directories() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "2020/03/02_second.html");
        touch(tmp.path(), "drafts/03/02_draft.html");
        touch(tmp.path(), "2020/march/02_nope.html");
        touch(tmp.path(), "2020/03/2020-03-02_wrong-grammar.html");

        let posts = scan(tmp.path(), Convention::Hierarchy).unwrap();
        assert_eq!(slugs(&posts), vec!["second"]);
    }

    #[test]
    fn year_ignores_files_at_root() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "2020/03-02_second.html");
        touch(tmp.path(), "2020-01-01_flat.html");

        let posts = scan(tmp.path(), Convention::Year).unwrap();
        assert_eq!(slugs(&posts), vec!["second"]);
    }

    #[test]
    fn user_skips_hidden_directories() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "2020-01-01_first.html");
        touch(tmp.path(), ".trash/2020-02-01_deleted.html");

        let posts = scan(tmp.path(), Convention::User).unwrap();
        assert_eq!(slugs(&posts), vec!["first"]);
    }

    // =========================================================================
    // Same-day collision under hierarchy
    // =========================================================================

    #[test]
    fn hierarchy_same_day_keeps_one_post() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "2020/03/02_alpha.html");
        touch(tmp.path(), "2020/03/02_beta.html");
        touch(tmp.path(), "2020/03/01_other.html");

        let posts = scan(tmp.path(), Convention::Hierarchy).unwrap();
        assert_eq!(slugs(&posts), vec!["beta", "other"]);
    }

    #[test]
    fn flat_same_day_keeps_both_posts() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "2020-03-02_alpha.html");
        touch(tmp.path(), "2020-03-02_beta.html");

        let posts = scan(tmp.path(), Convention::Flat).unwrap();
        assert_eq!(posts.len(), 2);
    }

    // =========================================================================
    // Errors
    // =========================================================================

    #[test]
    fn missing_root_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope");
        for convention in [Convention::Flat, Convention::Hierarchy, Convention::Year] {
            let err = scan(&missing, convention).unwrap_err();
            assert!(matches!(err, ScanError::Io { ref path, .. } if *path == missing));
        }
        assert!(matches!(
            scan(&missing, Convention::User),
            Err(ScanError::Walk(_))
        ));
    }

    /// Make `dir` unreadable. Returns `false` when the current user can
    /// read it anyway (root), in which case the caller skips its checks.
    #[cfg(unix)]
    fn lock(dir: &Path) -> bool {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(0o000)).unwrap();
        fs::read_dir(dir).is_err()
    }

    #[cfg(unix)]
    fn unlock(dir: &Path) {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_month_fails_hierarchy_scan() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "2020/01/01_first.html");
        touch(tmp.path(), "2020/03/02_second.html");
        let month = tmp.path().join("2020").join("03");

        let locked = lock(&month);
        let result = scan(tmp.path(), Convention::Hierarchy);
        unlock(&month);
        if !locked {
            return;
        }
        let err = result.unwrap_err();
        assert!(
            matches!(err, ScanError::Io { ref path, .. } if *path == month),
            "{err:?}"
        );
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_year_fails_year_scan() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "2019/12-31_old.html");
        touch(tmp.path(), "2020/03-02_second.html");
        let year = tmp.path().join("2019");

        let locked = lock(&year);
        let result = scan(tmp.path(), Convention::Year);
        unlock(&year);
        if !locked {
            return;
        }
        assert!(matches!(
            result,
            Err(ScanError::Io { ref path, .. }) if *path == year
        ));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_nested_dir_fails_user_scan() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "2020-01-01_first.html");
        touch(tmp.path(), "archive/deep/2020-03-02_second.html");
        let nested = tmp.path().join("archive").join("deep");

        let locked = lock(&nested);
        let result = scan(tmp.path(), Convention::User);
        unlock(&nested);
        if !locked {
            return;
        }
        match result {
            Err(ScanError::Walk(err)) => assert_eq!(err.path(), Some(nested.as_path())),
            other => panic!("expected a walk error, got {other:?}"),
        }
    }

    // =========================================================================
    // Physical paths
    // =========================================================================

    #[test]
    fn post_path_per_convention() {
        let root = Path::new("/site/posts");
        let date = PostDate::new("2020", "03", "02").unwrap();
        assert_eq!(
            Convention::Flat.post_path(root, &date, "second", "html"),
            root.join("2020-03-02_second.html")
        );
        assert_eq!(
            Convention::Hierarchy.post_path(root, &date, "second", "html"),
            root.join("2020/03/02_second.html")
        );
        assert_eq!(
            Convention::Year.post_path(root, &date, "second", "html"),
            root.join("2020/03-02_second.html")
        );
    }

    #[test]
    fn post_path_finds_other_extension() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "2020-03-02_second.md");
        let date = PostDate::new("2020", "03", "02").unwrap();
        assert_eq!(
            Convention::Flat.post_path(tmp.path(), &date, "second", "html"),
            tmp.path().join("2020-03-02_second.md")
        );
    }

    #[test]
    fn user_post_path_searches_tree() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "nested/deeper/2020-03-02_second.html");
        let date = PostDate::new("2020", "03", "02").unwrap();
        assert_eq!(
            Convention::User.post_path(tmp.path(), &date, "second", "html"),
            tmp.path().join("nested/deeper/2020-03-02_second.html")
        );
        assert_eq!(
            Convention::User.post_path(tmp.path(), &date, "missing", "html"),
            tmp.path().join("2020-03-02_missing.html")
        );
    }

    #[test]
    fn scanned_paths_round_trip_through_post_path() {
        for convention in ALL {
            let tmp = TempDir::new().unwrap();
            for rel in layout(convention) {
                touch(tmp.path(), rel);
            }
            for post in scan(tmp.path(), convention).unwrap() {
                let built = convention.post_path(tmp.path(), &post.date, &post.slug, "html");
                assert_eq!(built, post.path, "{convention:?}");
            }
        }
    }

    #[test]
    fn convention_deserializes_lowercase_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            convention: Convention,
        }
        let w: Wrapper = toml::from_str("convention = \"hierarchical\"").unwrap();
        assert_eq!(w.convention, Convention::Hierarchy);
        let w: Wrapper = toml::from_str("convention = \"user\"").unwrap();
        assert_eq!(w.convention, Convention::User);
    }
}
