//! Shared test utilities for the quire test suite.
//!
//! Builders for on-disk site trees: empty files, pages with front matter,
//! and posts laid out per [`Convention`].
//!
//! # Usage
//!
//! ```ignore
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_post(tmp.path(), Convention::Hierarchy, "2020-03-02", "second",
//!     &post_meta(Some("news"), &["rust"]));
//! touch(tmp.path(), "pages/_tag.html");
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::scan::Convention;

// =========================================================================
// Files
// =========================================================================

/// Create an empty file (and its parents) at `root/rel`.
pub fn touch(root: &Path, rel: &str) {
    write_page(root, rel, "");
}

/// Write `content` to `root/rel`, creating parent directories.
pub fn write_page(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

// =========================================================================
// Posts
// =========================================================================

/// Path of a post relative to its posts root, for a `YYYY-MM-DD` date.
///
/// The user convention nests posts under their year to exercise the
/// recursive search.
pub fn post_rel_path(convention: Convention, date: &str, slug: &str) -> String {
    let (year, rest) = date.split_at(4);
    let (month, day) = (&rest[1..3], &rest[4..6]);
    match convention {
        Convention::Flat => format!("{date}_{slug}.html"),
        Convention::Hierarchy => format!("{year}/{month}/{day}_{slug}.html"),
        Convention::Year => format!("{year}/{month}-{day}_{slug}.html"),
        Convention::User => format!("archive/{year}/{date}_{slug}.html"),
    }
}

/// Write a post under `root/posts` for the given convention.
pub fn write_post(
    root: &Path,
    convention: Convention,
    date: &str,
    slug: &str,
    content: &str,
) -> PathBuf {
    let rel = format!("posts/{}", post_rel_path(convention, date, slug));
    write_page(root, &rel, content);
    root.join(rel)
}

/// A post body with a front-matter block carrying `category` and `tags`.
pub fn post_meta(category: Option<&str>, tags: &[&str]) -> String {
    let mut out = String::from("+++\n");
    if let Some(category) = category {
        out.push_str(&format!("category = {category:?}\n"));
    }
    let tags: Vec<String> = tags.iter().map(|t| format!("{t:?}")).collect();
    out.push_str(&format!("tags = [{}]\n", tags.join(", ")));
    out.push_str("+++\nbody\n");
    out
}
