//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Every entity leads with its identity (positional index, date, title) and
//! shows filesystem paths as indented `Source:` context lines. Paths are
//! printed relative to the site root when possible.
//!
//! # Output Format
//!
//! ## Scan
//!
//! ```text
//! blog (3 posts, flat)
//! 001 2020-03-02 Second
//!     Source: posts/2020-03-02_second.html
//! 002 2020-01-01 first
//!     Source: posts/2020-01-01_first.html
//! ```
//!
//! ## Resolve
//!
//! ```text
//! post /2020/03/02/second
//!     Blog: blog
//!     Date: 2020-03-02
//!     Source: posts/2020/03/02_second.html (not checked)
//! ```
//!
//! ## List
//!
//! ```text
//! tag a/b (page 1 of 2, 3 posts)
//! 001 2020-06-15 Latest → /2020/06/15/latest
//! 002 2020-03-02 Second → /2020/03/02/second
//! Next: page 2
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::environment::{PageSlice, Post};
use crate::resolve::ContentReference;
use crate::scan::Convention;
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Path relative to the site root, or as-is when outside it.
fn display_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

/// Post header: index, date, and the front-matter title or the slug.
///
/// ```text
/// 001 2020-03-02 Second      // titled
/// 002 2020-01-01 first       // untitled, slug is the identity
/// ```
fn post_line(index: usize, post: &Post) -> String {
    let title = post
        .metadata
        .get("title")
        .and_then(|t| t.as_str())
        .filter(|t| !t.is_empty())
        .unwrap_or(&post.descriptor.slug);
    format!(
        "{} {} {}",
        format_index(index),
        post.descriptor.date,
        title
    )
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

// ============================================================================
// scan
// ============================================================================

pub fn format_scan_output(
    blog_key: &str,
    convention: Convention,
    posts: &[Post],
    root: &Path,
) -> Vec<String> {
    let mut lines = vec![format!(
        "{blog_key} ({}, {})",
        plural(posts.len(), "post"),
        convention_name(convention)
    )];
    for (i, post) in posts.iter().enumerate() {
        lines.push(post_line(i + 1, post));
        lines.push(format!(
            "{}Source: {}",
            indent(1),
            display_path(&post.descriptor.path, root)
        ));
    }
    lines
}

pub fn print_scan_output(blog_key: &str, convention: Convention, posts: &[Post], root: &Path) {
    for line in format_scan_output(blog_key, convention, posts, root) {
        println!("{}", line);
    }
}

fn convention_name(convention: Convention) -> &'static str {
    match convention {
        Convention::Flat => "flat",
        Convention::Hierarchy => "hierarchy",
        Convention::Year => "year",
        Convention::User => "user",
    }
}

// ============================================================================
// resolve
// ============================================================================

pub fn format_reference(reference: &ContentReference, root: &Path) -> Vec<String> {
    let mut lines = vec![format!("{} {}", reference.kind, reference.uri)];
    let pad = indent(1);
    if let Some(blog) = &reference.blog_key {
        lines.push(format!("{pad}Blog: {blog}"));
    }
    if let Some(date) = &reference.date {
        lines.push(format!("{pad}Date: {date}"));
    }
    if let Some(key) = &reference.listing_key {
        lines.push(format!("{pad}Key: {key}"));
    }
    if reference.page_num > 1 {
        lines.push(format!("{pad}Page: {}", reference.page_num));
    }
    let checked = if reference.path_checked {
        ""
    } else {
        " (not checked)"
    };
    lines.push(format!(
        "{pad}Source: {}{checked}",
        display_path(&reference.path, root)
    ));
    lines
}

pub fn print_reference(reference: &ContentReference, root: &Path) {
    for line in format_reference(reference, root) {
        println!("{}", line);
    }
}

// ============================================================================
// list
// ============================================================================

/// Format one page of a listing; `post_uri` supplies each member's link.
pub fn format_listing<F>(reference: &ContentReference, slice: &PageSlice, post_uri: F) -> Vec<String>
where
    F: Fn(&Post) -> Option<String>,
{
    let title = match &reference.listing_key {
        Some(key) => format!("{} {key}", reference.kind),
        None => format!("{} {}", reference.kind, reference.uri),
    };
    let mut lines = vec![format!(
        "{title} (page {} of {}, {})",
        slice.page_num,
        slice.total_pages,
        plural(slice.total_posts, "post")
    )];

    if slice.posts.is_empty() {
        lines.push(format!("{}(no posts)", indent(1)));
    }
    for (i, post) in slice.posts.iter().enumerate() {
        let header = post_line(slice.offset + i + 1, post);
        match post_uri(post) {
            Some(uri) => lines.push(format!("{header} → {uri}")),
            None => lines.push(header),
        }
    }

    if let Some(prev) = slice.prev_page {
        lines.push(format!("Previous: page {prev}"));
    }
    if let Some(next) = slice.next_page {
        lines.push(format!("Next: page {next}"));
    }
    lines
}

pub fn print_listing<F>(reference: &ContentReference, slice: &PageSlice, post_uri: F)
where
    F: Fn(&Post) -> Option<String>,
{
    for line in format_listing(reference, slice, post_uri) {
        println!("{}", line);
    }
}

// ============================================================================
// check
// ============================================================================

/// Summary of a `check` run: one line per blog.
pub fn format_check_output(blogs: &[(String, Convention, usize)]) -> Vec<String> {
    blogs
        .iter()
        .map(|(key, convention, count)| {
            format!(
                "{key}: {} ({})",
                plural(*count, "post"),
                convention_name(*convention)
            )
        })
        .collect()
}

pub fn print_check_output(blogs: &[(String, Convention, usize)]) {
    for line in format_check_output(blogs) {
        println!("{}", line);
    }
}
