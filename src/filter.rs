//! Listing membership filters.
//!
//! A [`PaginationFilter`] is a small boolean expression over a post's front
//! matter. It is compiled once from a TOML table and evaluated per post.
//!
//! ## Filter grammar
//!
//! ```toml
//! # Top-level keys are conjoined.
//! is_category = "news"          # metadata `category` equals "news"
//! has_tags = ["rust", "cli"]    # metadata `tags` contains both values
//!
//! or = [{ is_category = "news" }, { is_category = "notes" }]
//! and = [{ has_tags = "x" }, { is_author = "jo" }]
//! not = { is_draft = true }     # or a one-element list: not = [{ ... }]
//! ```
//!
//! - `and` / `or` take a non-empty list of tables.
//! - `not` takes exactly one table.
//! - `has_<name>` takes a value or a list of values; a list means *all* of
//!   them must be present.
//! - `is_<name>` takes a single scalar.
//! - Any other key is an error.
//!
//! Structural problems are reported when the filter is compiled, never
//! during evaluation. An empty filter matches every post.
//!
//! ## Listing pages
//!
//! [`PaginationFilter::for_listing`] adds the clauses implied by a tag or
//! category page on top of the user filter. Those clauses compare values
//! through [`slugify`], so `"Rust Lang"` on a post matches a `/tag/rust-lang`
//! listing.

use crate::naming::slugify;
use crate::resolve::{ContentReference, ListingKey};
use thiserror::Error;

/// Folds a string value before comparison.
pub type Normalizer = fn(&str) -> String;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FilterError {
    #[error("unknown filter key `{0}`")]
    UnknownKey(String),
    #[error("filter `{key}` expects a list of clauses")]
    NotAList { key: String },
    #[error("filter `{key}` needs at least one clause")]
    NoOperands { key: String },
    #[error("filter `not` takes exactly one clause, got {count}")]
    NotArity { count: usize },
    #[error("filter `{key}` expects a table of clauses")]
    NotATable { key: String },
    #[error("filter `{key}`: {reason}")]
    InvalidValue { key: String, reason: &'static str },
}

/// One node of a filter expression.
#[derive(Debug, Clone)]
pub enum FilterClause {
    And(Vec<FilterClause>),
    Or(Vec<FilterClause>),
    Not(Box<FilterClause>),
    /// The list-valued setting `name` contains `value`.
    Has {
        name: String,
        value: toml::Value,
        normalizer: Option<Normalizer>,
    },
    /// The setting `name` equals `value`.
    Is {
        name: String,
        value: toml::Value,
        normalizer: Option<Normalizer>,
    },
}

impl FilterClause {
    pub fn has(name: &str, value: toml::Value) -> Self {
        Self::Has {
            name: name.to_string(),
            value,
            normalizer: None,
        }
    }

    pub fn is(name: &str, value: toml::Value) -> Self {
        Self::Is {
            name: name.to_string(),
            value,
            normalizer: None,
        }
    }

    pub fn matches(&self, metadata: &toml::Table) -> bool {
        match self {
            Self::And(children) => children.iter().all(|c| c.matches(metadata)),
            Self::Or(children) => children.iter().any(|c| c.matches(metadata)),
            Self::Not(child) => !child.matches(metadata),
            Self::Has {
                name,
                value,
                normalizer,
            } => match metadata.get(name) {
                Some(toml::Value::Array(items)) => {
                    items.iter().any(|item| values_equal(item, value, *normalizer))
                }
                Some(scalar) => values_equal(scalar, value, *normalizer),
                None => false,
            },
            Self::Is {
                name,
                value,
                normalizer,
            } => metadata
                .get(name)
                .is_some_and(|actual| values_equal(actual, value, *normalizer)),
        }
    }
}

fn values_equal(actual: &toml::Value, expected: &toml::Value, normalizer: Option<Normalizer>) -> bool {
    match (normalizer, actual.as_str(), expected.as_str()) {
        (Some(normalize), Some(a), Some(e)) => normalize(a) == normalize(e),
        _ => actual == expected,
    }
}

/// A compiled filter; the root clauses are conjoined.
#[derive(Debug, Clone, Default)]
pub struct PaginationFilter {
    clauses: Vec<FilterClause>,
}

impl PaginationFilter {
    /// The identity filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile a filter table.
    pub fn from_config(config: &toml::Table) -> Result<Self, FilterError> {
        Ok(Self {
            clauses: compile_table(config)?,
        })
    }

    /// The user filter (if any) plus the clauses implied by a listing page.
    pub fn for_listing(
        reference: &ContentReference,
        user: Option<&toml::Table>,
    ) -> Result<Self, FilterError> {
        let mut filter = match user {
            Some(config) => Self::from_config(config)?,
            None => Self::new(),
        };
        match &reference.listing_key {
            Some(ListingKey::Tags(tags)) => {
                for tag in tags {
                    filter.add(FilterClause::Has {
                        name: "tags".to_string(),
                        value: toml::Value::String(slugify(tag)),
                        normalizer: Some(slugify),
                    });
                }
            }
            Some(ListingKey::Category(category)) => {
                filter.add(FilterClause::Is {
                    name: "category".to_string(),
                    value: toml::Value::String(slugify(category)),
                    normalizer: Some(slugify),
                });
            }
            None => {}
        }
        Ok(filter)
    }

    pub fn add(&mut self, clause: FilterClause) {
        self.clauses.push(clause);
    }

    pub fn clauses(&self) -> &[FilterClause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches(&self, metadata: &toml::Table) -> bool {
        self.clauses.iter().all(|c| c.matches(metadata))
    }
}

// =============================================================================
// Compiler
// =============================================================================

fn compile_table(table: &toml::Table) -> Result<Vec<FilterClause>, FilterError> {
    table
        .iter()
        .map(|(key, value)| compile_entry(key, value))
        .collect()
}

fn compile_entry(key: &str, value: &toml::Value) -> Result<FilterClause, FilterError> {
    match key {
        "and" => Ok(FilterClause::And(compile_operands(key, value)?)),
        "or" => Ok(FilterClause::Or(compile_operands(key, value)?)),
        "not" => compile_not(value),
        _ => {
            if let Some(name) = key.strip_prefix("has_")
                && !name.is_empty()
            {
                compile_has(key, name, value)
            } else if let Some(name) = key.strip_prefix("is_")
                && !name.is_empty()
            {
                compile_is(key, name, value)
            } else {
                Err(FilterError::UnknownKey(key.to_string()))
            }
        }
    }
}

fn compile_operands(key: &str, value: &toml::Value) -> Result<Vec<FilterClause>, FilterError> {
    let items = value.as_array().ok_or_else(|| FilterError::NotAList {
        key: key.to_string(),
    })?;
    if items.is_empty() {
        return Err(FilterError::NoOperands {
            key: key.to_string(),
        });
    }
    items.iter().map(|item| compile_child(key, item)).collect()
}

fn compile_not(value: &toml::Value) -> Result<FilterClause, FilterError> {
    let child = match value {
        toml::Value::Array(items) if items.len() == 1 => &items[0],
        toml::Value::Array(items) => {
            return Err(FilterError::NotArity { count: items.len() });
        }
        other => other,
    };
    Ok(FilterClause::Not(Box::new(compile_child("not", child)?)))
}

/// One operand table; several keys in it are conjoined.
fn compile_child(key: &str, value: &toml::Value) -> Result<FilterClause, FilterError> {
    let table = value.as_table().ok_or_else(|| FilterError::NotATable {
        key: key.to_string(),
    })?;
    let mut clauses = compile_table(table)?;
    match clauses.len() {
        0 => Err(FilterError::NoOperands {
            key: key.to_string(),
        }),
        1 => Ok(clauses.remove(0)),
        _ => Ok(FilterClause::And(clauses)),
    }
}

fn compile_has(key: &str, name: &str, value: &toml::Value) -> Result<FilterClause, FilterError> {
    match value {
        toml::Value::Array(items) if items.is_empty() => Err(FilterError::NoOperands {
            key: key.to_string(),
        }),
        toml::Value::Array(items) => {
            let leaves = items
                .iter()
                .map(|item| {
                    scalar(key, item)?;
                    Ok(FilterClause::has(name, item.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(FilterClause::And(leaves))
        }
        other => {
            scalar(key, other)?;
            Ok(FilterClause::has(name, other.clone()))
        }
    }
}

fn compile_is(key: &str, name: &str, value: &toml::Value) -> Result<FilterClause, FilterError> {
    scalar(key, value)?;
    Ok(FilterClause::is(name, value.clone()))
}

fn scalar(key: &str, value: &toml::Value) -> Result<(), FilterError> {
    match value {
        toml::Value::Array(_) | toml::Value::Table(_) => Err(FilterError::InvalidValue {
            key: key.to_string(),
            reason: "expected a single value",
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::ContentKind;
    use std::path::PathBuf;

    fn table(src: &str) -> toml::Table {
        toml::from_str(src).unwrap()
    }

    fn compile(src: &str) -> Result<PaginationFilter, FilterError> {
        PaginationFilter::from_config(&table(src))
    }

    fn post(category: &str, tags: &[&str]) -> toml::Table {
        let mut meta = toml::Table::new();
        meta.insert("category".into(), toml::Value::String(category.into()));
        meta.insert(
            "tags".into(),
            toml::Value::Array(tags.iter().map(|t| toml::Value::String((*t).into())).collect()),
        );
        meta
    }

    fn listing(key: ListingKey) -> ContentReference {
        let kind = match key {
            ListingKey::Tags(_) => ContentKind::Tag,
            ListingKey::Category(_) => ContentKind::Category,
        };
        ContentReference {
            uri: "/listing".to_string(),
            path: PathBuf::from("pages/_tag.html"),
            kind,
            blog_key: Some("blog".to_string()),
            listing_key: Some(key),
            date: None,
            page_num: 1,
            path_checked: true,
        }
    }

    // =========================================================================
    // Evaluation
    // =========================================================================

    #[test]
    fn empty_filter_matches_everything() {
        let filter = PaginationFilter::new();
        assert!(filter.is_empty());
        assert!(filter.matches(&toml::Table::new()));
        assert!(filter.matches(&post("news", &["x"])));
    }

    #[test]
    fn and_of_is_and_has() {
        let filter = compile(r#"and = [{ is_category = "news" }, { has_tags = "x" }]"#).unwrap();
        assert!(filter.matches(&post("news", &["x", "y"])));
        assert!(!filter.matches(&post("sports", &["x", "y"])));
        assert!(!filter.matches(&post("news", &["y"])));
    }

    #[test]
    fn or_matches_any() {
        let filter = compile(r#"or = [{ is_category = "news" }, { is_category = "notes" }]"#).unwrap();
        assert!(filter.matches(&post("notes", &[])));
        assert!(!filter.matches(&post("sports", &[])));
    }

    #[test]
    fn not_with_table() {
        let filter = compile(r#"not = { is_category = "news" }"#).unwrap();
        assert!(filter.matches(&post("sports", &[])));
        assert!(!filter.matches(&post("news", &[])));
    }

    #[test]
    fn not_with_single_element_list() {
        let filter = compile(r#"not = [{ is_category = "news" }]"#).unwrap();
        assert!(filter.matches(&post("sports", &[])));
    }

    #[test]
    fn has_list_requires_all_values() {
        let filter = compile(r#"has_tags = ["a", "b"]"#).unwrap();
        assert!(filter.matches(&post("c", &["a", "b", "z"])));
        assert!(!filter.matches(&post("c", &["a"])));
    }

    #[test]
    fn top_level_keys_are_conjoined() {
        let filter = compile("is_category = \"news\"\nhas_tags = \"x\"").unwrap();
        assert_eq!(filter.clauses().len(), 2);
        assert!(filter.matches(&post("news", &["x"])));
        assert!(!filter.matches(&post("news", &[])));
    }

    #[test]
    fn missing_setting_never_matches() {
        let filter = compile("is_author = \"jo\"").unwrap();
        assert!(!filter.matches(&post("news", &[])));
        let filter = compile("not = { is_author = \"jo\" }").unwrap();
        assert!(filter.matches(&post("news", &[])));
    }

    #[test]
    fn non_string_values_compare_exactly() {
        let filter = compile("is_draft = false").unwrap();
        let mut meta = toml::Table::new();
        meta.insert("draft".into(), toml::Value::Boolean(false));
        assert!(filter.matches(&meta));
        meta.insert("draft".into(), toml::Value::Boolean(true));
        assert!(!filter.matches(&meta));
    }

    #[test]
    fn user_values_are_not_normalized() {
        let filter = compile("is_category = \"news\"").unwrap();
        assert!(!filter.matches(&post("News", &[])));
    }

    // =========================================================================
    // Compile errors
    // =========================================================================

    #[test]
    fn not_with_two_children_is_error() {
        let err = compile(r#"not = [{ is_category = "a" }, { is_category = "b" }]"#).unwrap_err();
        assert_eq!(err, FilterError::NotArity { count: 2 });
    }

    #[test]
    fn not_with_empty_list_is_error() {
        assert_eq!(
            compile("not = []").unwrap_err(),
            FilterError::NotArity { count: 0 }
        );
    }

    #[test]
    fn and_requires_a_list() {
        assert_eq!(
            compile(r#"and = { is_category = "a" }"#).unwrap_err(),
            FilterError::NotAList { key: "and".into() }
        );
    }

    #[test]
    fn or_requires_operands() {
        assert_eq!(
            compile("or = []").unwrap_err(),
            FilterError::NoOperands { key: "or".into() }
        );
    }

    #[test]
    fn operands_must_be_tables() {
        assert_eq!(
            compile(r#"and = ["news"]"#).unwrap_err(),
            FilterError::NotATable { key: "and".into() }
        );
    }

    #[test]
    fn unknown_key_is_named() {
        assert_eq!(
            compile(r#"and = [{ tagged = "x" }]"#).unwrap_err(),
            FilterError::UnknownKey("tagged".into())
        );
        assert_eq!(
            compile("has_ = 1").unwrap_err(),
            FilterError::UnknownKey("has_".into())
        );
    }

    #[test]
    fn is_requires_scalar() {
        assert!(matches!(
            compile(r#"is_category = ["a", "b"]"#).unwrap_err(),
            FilterError::InvalidValue { .. }
        ));
    }

    // =========================================================================
    // Listings
    // =========================================================================

    #[test]
    fn tag_listing_requires_every_tag() {
        let reference = listing(ListingKey::Tags(vec!["a".into(), "b".into()]));
        let filter = PaginationFilter::for_listing(&reference, None).unwrap();
        assert_eq!(filter.clauses().len(), 2);
        assert!(filter.matches(&post("any", &["a", "b"])));
        assert!(filter.matches(&post("any", &["B", "x", "A"])));
        assert!(!filter.matches(&post("any", &["a"])));
    }

    #[test]
    fn tag_listing_normalizes_both_sides() {
        let reference = listing(ListingKey::Tags(vec!["Rust Lang".into()]));
        let filter = PaginationFilter::for_listing(&reference, None).unwrap();
        assert!(filter.matches(&post("any", &["rust-lang"])));
        assert!(filter.matches(&post("any", &["RUST_LANG"])));
    }

    #[test]
    fn category_listing_normalizes() {
        let reference = listing(ListingKey::Category("news".into()));
        let filter = PaginationFilter::for_listing(&reference, None).unwrap();
        assert!(filter.matches(&post("News", &[])));
        assert!(!filter.matches(&post("sports", &[])));
    }

    #[test]
    fn listing_clauses_follow_user_filter() {
        let reference = listing(ListingKey::Category("news".into()));
        let user = table("not = { has_tags = \"draft\" }");
        let filter = PaginationFilter::for_listing(&reference, Some(&user)).unwrap();
        assert!(matches!(filter.clauses()[0], FilterClause::Not(_)));
        assert!(matches!(filter.clauses()[1], FilterClause::Is { .. }));
        assert!(filter.matches(&post("news", &["rust"])));
        assert!(!filter.matches(&post("news", &["draft"])));
    }

    #[test]
    fn bad_user_filter_fails_listing() {
        let reference = listing(ListingKey::Category("news".into()));
        let user = table("colour = \"red\"");
        assert!(PaginationFilter::for_listing(&reference, Some(&user)).is_err());
    }
}
