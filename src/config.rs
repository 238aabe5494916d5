//! Site configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. The user file is
//! sparse: it is deep-merged on top of the stock defaults, so it only needs
//! the keys it wants to change.
//!
//! ## Config File Location
//!
//! ```text
//! site/
//! ├── config.toml              # Site config (optional)
//! ├── pages/                   # Literal pages, _tag / _category templates
//! └── posts/                   # Dated posts, laid out per `convention`
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! pages_dir = "pages"
//! posts_dir = "posts"
//! convention = "flat"          # flat | hierarchy | year | user
//! default_extension = "html"
//! page_extensions = ["html", "md", "txt"]
//! posts_per_page = 5
//! cache_limit = 10000
//! cache_enabled = true
//!
//! [[blogs]]
//! key = "blog"
//! post_url = "%year%/%month%/%day%/%slug%"
//! tag_url = "tag/%value%"
//! category_url = "category/%value%"
//! ```
//!
//! ## Blogs
//!
//! `[[blogs]]` is an ordered array. Order matters: the resolver tries blogs
//! in this order and the first structural match wins. With a single blog its
//! posts live in `posts_dir` and its listing templates in `pages_dir`; with
//! several, each defaults to `posts_dir/<key>` and `pages_dir/<key>`.
//!
//! Unknown keys are rejected to catch typos early.

use crate::scan::Convention;
use crate::uri::{TemplateError, TemplateKind, UriTemplate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("blog `{blog}`: {source}")]
    Template {
        blog: String,
        #[source]
        source: TemplateError,
    },
}

/// Site configuration loaded from `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Directory of literal pages and listing templates, relative to the site root.
    pub pages_dir: String,
    /// Posts root for a single blog, or parent of per-blog roots.
    pub posts_dir: String,
    /// Post layout used by blogs that don't set their own.
    pub convention: Convention,
    /// Extension appended to request paths that carry none.
    pub default_extension: String,
    /// Extensions stripped from request paths before lookup.
    pub page_extensions: Vec<String>,
    /// Posts per listing page.
    pub posts_per_page: usize,
    /// Soft limit of the content cache.
    pub cache_limit: usize,
    /// When false, every page request builds a fresh handle.
    pub cache_enabled: bool,
    /// Ordered blog definitions.
    pub blogs: Vec<BlogConfig>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            pages_dir: "pages".to_string(),
            posts_dir: "posts".to_string(),
            convention: Convention::Flat,
            default_extension: "html".to_string(),
            page_extensions: vec!["html".to_string(), "md".to_string(), "txt".to_string()],
            posts_per_page: 5,
            cache_limit: 10_000,
            cache_enabled: true,
            blogs: vec![BlogConfig::default()],
        }
    }
}

/// One blog: a posts root plus its URL templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlogConfig {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posts_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub convention: Option<Convention>,
    pub post_url: String,
    pub tag_url: String,
    pub category_url: String,
}

impl Default for BlogConfig {
    fn default() -> Self {
        Self {
            key: "blog".to_string(),
            posts_dir: None,
            convention: None,
            post_url: "%year%/%month%/%day%/%slug%".to_string(),
            tag_url: "tag/%value%".to_string(),
            category_url: "category/%value%".to_string(),
        }
    }
}

/// Compiled URL templates of one blog.
#[derive(Debug, Clone)]
pub struct BlogTemplates {
    pub post: UriTemplate,
    pub tag: UriTemplate,
    pub category: UriTemplate,
}

impl BlogConfig {
    pub fn templates(&self) -> Result<BlogTemplates, ConfigError> {
        let compile = |template: &str, kind| {
            UriTemplate::parse(template, kind).map_err(|source| ConfigError::Template {
                blog: self.key.clone(),
                source,
            })
        };
        Ok(BlogTemplates {
            post: compile(&self.post_url, TemplateKind::Post)?,
            tag: compile(&self.tag_url, TemplateKind::Tag)?,
            category: compile(&self.category_url, TemplateKind::Category)?,
        })
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_extension.is_empty() {
            return Err(ConfigError::Validation(
                "default_extension must not be empty".into(),
            ));
        }
        if self.cache_limit == 0 {
            return Err(ConfigError::Validation(
                "cache_limit must be at least 1".into(),
            ));
        }
        if self.posts_per_page == 0 {
            return Err(ConfigError::Validation(
                "posts_per_page must be at least 1".into(),
            ));
        }
        if self.blogs.is_empty() {
            return Err(ConfigError::Validation(
                "at least one blog must be configured".into(),
            ));
        }
        let mut keys = HashSet::new();
        for blog in &self.blogs {
            if blog.key.is_empty() {
                return Err(ConfigError::Validation("blog key must not be empty".into()));
            }
            if !keys.insert(blog.key.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate blog key `{}`",
                    blog.key
                )));
            }
            blog.templates()?;
        }
        Ok(())
    }

    pub fn is_multi_blog(&self) -> bool {
        self.blogs.len() > 1
    }

    pub fn blog(&self, key: &str) -> Option<&BlogConfig> {
        self.blogs.iter().find(|b| b.key == key)
    }

    /// Posts root of a blog, relative to the site root.
    pub fn blog_posts_dir(&self, blog: &BlogConfig) -> PathBuf {
        match &blog.posts_dir {
            Some(dir) => PathBuf::from(dir),
            None if self.is_multi_blog() => Path::new(&self.posts_dir).join(&blog.key),
            None => PathBuf::from(&self.posts_dir),
        }
    }

    /// Directory holding a blog's `_tag` / `_category` templates, relative
    /// to the site root.
    pub fn blog_pages_dir(&self, blog: &BlogConfig) -> PathBuf {
        if self.is_multi_blog() {
            Path::new(&self.pages_dir).join(&blog.key)
        } else {
            PathBuf::from(&self.pages_dir)
        }
    }

    pub fn blog_convention(&self, blog: &BlogConfig) -> Convention {
        blog.convention.unwrap_or(self.convention)
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// The stock defaults as a TOML table: the bottom layer of every site config.
pub fn stock_defaults() -> Result<toml::Table, ConfigError> {
    match toml::Value::try_from(SiteConfig::default())? {
        toml::Value::Table(table) => Ok(table),
        other => Err(ConfigError::Validation(format!(
            "stock defaults serialized to a {}, not a table",
            other.type_str()
        ))),
    }
}

/// Fold a site's `overrides` into `layer`.
///
/// Nested tables merge key by key. Any other value replaces what `layer`
/// held, arrays included: a site's `[[blogs]]` is the whole blog list.
pub fn merge_toml(layer: &mut toml::Table, overrides: toml::Table) {
    for (key, value) in overrides {
        let value = match (layer.get_mut(&key), value) {
            (Some(toml::Value::Table(inner)), toml::Value::Table(nested)) => {
                merge_toml(inner, nested);
                continue;
            }
            (_, value) => value,
        };
        layer.insert(key, value);
    }
}

/// The site's own `config.toml`, or `None` when the site has none.
pub fn read_site_config(root: &Path) -> Result<Option<toml::Table>, ConfigError> {
    match fs::read_to_string(root.join("config.toml")) {
        Ok(text) => Ok(Some(toml::from_str(&text)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Stock defaults with `overrides` folded in, deserialized and validated.
pub fn resolve_config(overrides: Option<toml::Table>) -> Result<SiteConfig, ConfigError> {
    let mut layer = stock_defaults()?;
    if let Some(overrides) = overrides {
        merge_toml(&mut layer, overrides);
    }
    let config: SiteConfig = toml::Value::Table(layer).try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load and validate the config of the site at `root`.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    resolve_config(read_site_config(root)?)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Quire Configuration
# ===================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# Directory of literal pages and of the _tag / _category listing templates.
pages_dir = "pages"

# Posts root. With several blogs, each defaults to posts_dir/<key>.
posts_dir = "posts"

# On-disk post layout:
#   flat       posts/2020-03-02_slug.html
#   hierarchy  posts/2020/03/02_slug.html
#   year       posts/2020/03-02_slug.html
#   user       posts/any/depth/2020-03-02_slug.html
convention = "flat"

# Extension assumed when a request path has none.
default_extension = "html"

# Extensions recognized (and stripped) on request paths.
page_extensions = ["html", "md", "txt"]

# Posts per listing page.
posts_per_page = 5

# Resolved pages kept per run before the oldest tenth is evicted.
cache_limit = 10000

# Set to false to build every page fresh (nothing retained between requests).
cache_enabled = true

# ---------------------------------------------------------------------------
# Blogs
# ---------------------------------------------------------------------------
# Ordered: request paths are matched against each blog in turn, first match
# wins. Placeholders: %year% %month% %day% %slug% for posts, %value% for
# listings. A tag URL may carry several slash-separated tags.
[[blogs]]
key = "blog"
# posts_dir = "posts"        # per-blog override
# convention = "flat"        # per-blog override
post_url = "%year%/%month%/%day%/%slug%"
tag_url = "tag/%value%"
category_url = "category/%value%"
"##
}
