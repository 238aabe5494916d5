//! Centralized filename parsing for dated post files.
//!
//! Every post convention names a file `<date>_<slug>.<ext>`. The conventions
//! differ only in how much of the date lives in the filename and how much in
//! the enclosing directories:
//!
//! ```text
//! flat / user:  2020-03-02_second.html
//! year:         2020/03-02_second.html
//! hierarchy:    2020/03/02_second.html
//! ```
//!
//! The parsers here are the single source of truth for that grammar, so that
//! every scanner extracts identical [`PostDate`] + slug pairs for the same
//! logical post. A name that does not fit the grammar yields `None`; callers
//! skip it silently.
//!
//! ## Slugs
//!
//! The slug is the rest of the filename stem after the `_` separator. It is
//! kept verbatim (case, dashes, dots before the extension). [`slugify`] is a
//! separate normalizer used when *comparing* tag and category values, never
//! when deriving identities from filenames.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Zero-padded date fields of a post, exactly as spelled on disk.
///
/// Fields are kept as strings: widths are fixed (4/2/2), so lexicographic
/// order over `(year, month, day)` is chronological order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PostDate {
    pub year: String,
    pub month: String,
    pub day: String,
}

impl PostDate {
    /// Build a date from its fields, checking the 4/2/2 digit widths.
    pub fn new(year: &str, month: &str, day: &str) -> Option<Self> {
        if is_year(year) && is_two_digits(month) && is_two_digits(day) {
            Some(Self {
                year: year.to_string(),
                month: month.to_string(),
                day: day.to_string(),
            })
        } else {
            None
        }
    }
}

impl fmt::Display for PostDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.year, self.month, self.day)
    }
}

/// Result of parsing a post filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPostName {
    pub date: PostDate,
    pub slug: String,
    /// Extension without the dot (e.g. `html`).
    pub extension: String,
}

/// Whether a directory name is a 4-digit year.
pub fn is_year(name: &str) -> bool {
    name.len() == 4 && name.bytes().all(|b| b.is_ascii_digit())
}

/// Whether a directory name is a 2-digit month (or day) numeral.
pub fn is_two_digits(name: &str) -> bool {
    name.len() == 2 && name.bytes().all(|b| b.is_ascii_digit())
}

/// Parse `YYYY-MM-DD_slug.ext` (flat and user conventions).
///
/// - `"2020-03-02_second.html"` → 2020-03-02, slug `second`
/// - `"2020-3-02_second.html"` → None (month not zero-padded)
/// - `"2020-03-02.html"` → None (no slug)
pub fn parse_full_name(file_name: &str) -> Option<ParsedPostName> {
    let (year, rest) = take_digits(file_name, 4)?;
    let rest = rest.strip_prefix('-')?;
    let (month, rest) = take_digits(rest, 2)?;
    let rest = rest.strip_prefix('-')?;
    let (day, rest) = take_digits(rest, 2)?;
    let date = PostDate::new(year, month, day)?;
    finish(date, rest)
}

/// Parse `MM-DD_slug.ext` inside a year directory (year convention).
pub fn parse_month_day_name(year: &str, file_name: &str) -> Option<ParsedPostName> {
    let (month, rest) = take_digits(file_name, 2)?;
    let rest = rest.strip_prefix('-')?;
    let (day, rest) = take_digits(rest, 2)?;
    let date = PostDate::new(year, month, day)?;
    finish(date, rest)
}

/// Parse `DD_slug.ext` inside a `year/month` directory (hierarchy convention).
pub fn parse_day_name(year: &str, month: &str, file_name: &str) -> Option<ParsedPostName> {
    let (day, rest) = take_digits(file_name, 2)?;
    let date = PostDate::new(year, month, day)?;
    finish(date, rest)
}

/// Split off exactly `n` leading ASCII digits.
fn take_digits(s: &str, n: usize) -> Option<(&str, &str)> {
    let head = s.get(..n)?;
    if head.bytes().all(|b| b.is_ascii_digit()) {
        Some((head, &s[n..]))
    } else {
        None
    }
}

/// Parse the `_slug.ext` tail shared by every grammar.
fn finish(date: PostDate, rest: &str) -> Option<ParsedPostName> {
    let rest = rest.strip_prefix('_')?;
    let dot = rest.rfind('.')?;
    let (slug, extension) = (&rest[..dot], &rest[dot + 1..]);
    if slug.is_empty() || extension.is_empty() {
        return None;
    }
    Some(ParsedPostName {
        date,
        slug: slug.to_string(),
        extension: extension.to_string(),
    })
}

/// Normalize a tag or category value for comparison.
///
/// - Lowercases
/// - Replaces anything that is not alphanumeric with a dash
/// - Collapses consecutive dashes and strips leading/trailing ones
///
/// `"Rust Lang"`, `"rust-lang"` and `"RUST_LANG"` all become `"rust-lang"`.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut prev_dash = false;
    for c in value.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            slug.push(c);
            prev_dash = false;
        } else if !prev_dash {
            slug.push('-');
            prev_dash = true;
        }
    }
    slug.trim_matches('-').to_string()
}
