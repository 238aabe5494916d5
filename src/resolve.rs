//! URI resolution: request path → [`ContentReference`].
//!
//! Rules are tried in a fixed order and the first match wins:
//!
//! 1. **Literal page**: `pages_dir/<path>.<ext>` exists on disk.
//! 2. **Post**: the path fits a blog's `post_url`; the captured date and
//!    slug are turned into a physical path by that blog's [`Convention`].
//!    The file is *not* checked here.
//! 3. **Tag listing**: the path fits `tag_url`; one or more tag values are
//!    captured and the blog's `_tag` template must exist.
//! 4. **Category listing**: the path fits `category_url`; one value is
//!    captured and the blog's `_category` template must exist.
//!
//! Each of rules 2–4 is tried against every blog, in configuration order,
//! before the next rule runs: a post template of the last blog beats a tag
//! template of the first. If two blogs share a template for the same kind,
//! the first configured blog always wins; [`Resolver::new`] logs a warning
//! when it sees such a pair.
//!
//! Path segments starting with `_` never resolve as literal pages.
//!
//! ## Page-number suffix
//!
//! A final segment made only of digits is a page number: `/tag/rust/2` is
//! page 2 of `/tag/rust`. `0` or an unrepresentable number fails the whole
//! resolution. If the path without its suffix matches nothing, the full path
//! is tried once more as page 1, so purely numeric tag values still resolve.
//!
//! ## Extensions
//!
//! A recognized extension (`page_extensions`) on the last segment is
//! stripped before template matching and reused for the physical file; a
//! path without one gets `default_extension`. `/` is the `_index` page.

use crate::config::{BlogTemplates, ConfigError, SiteConfig};
use crate::naming::PostDate;
use crate::scan::{Convention, PostDescriptor};
use crate::uri::{TemplateKind, TemplateMatch, UriTemplate};
use log::{debug, warn};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the literal page served for `/`.
pub const INDEX_PAGE: &str = "_index";
/// Stem of the tag listing template file.
pub const TAG_TEMPLATE: &str = "_tag";
/// Stem of the category listing template file.
pub const CATEGORY_TEMPLATE: &str = "_category";

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("no content found for `{uri}`")]
    NotFound { uri: String },
    #[error("invalid page number `{suffix}` in `{uri}`")]
    InvalidPageNumber { uri: String, suffix: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Regular,
    Post,
    Tag,
    Category,
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Regular => "regular",
            Self::Post => "post",
            Self::Tag => "tag",
            Self::Category => "category",
        })
    }
}

/// Values captured by a listing template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingKey {
    /// Every tag must be present on a member post.
    Tags(Vec<String>),
    Category(String),
}

impl fmt::Display for ListingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tags(tags) => f.write_str(&tags.join("/")),
            Self::Category(category) => f.write_str(category),
        }
    }
}

/// The resolved target of a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentReference {
    /// Request path without its page suffix, `/`-prefixed. The default
    /// extension is dropped; any other recognized extension is kept.
    pub uri: String,
    pub path: PathBuf,
    pub kind: ContentKind,
    pub blog_key: Option<String>,
    pub listing_key: Option<ListingKey>,
    /// Set for posts only.
    pub date: Option<PostDate>,
    /// 1-based.
    pub page_num: u32,
    /// Whether `path` was confirmed to exist during resolution.
    pub path_checked: bool,
}

/// One blog's compiled routes and on-disk locations.
#[derive(Debug)]
struct BlogRoute {
    key: String,
    posts_root: PathBuf,
    pages_root: PathBuf,
    convention: Convention,
    templates: BlogTemplates,
}

/// Maps request paths to content references for one site.
#[derive(Debug)]
pub struct Resolver {
    pages_root: PathBuf,
    default_extension: String,
    page_extensions: Vec<String>,
    blogs: Vec<BlogRoute>,
}

impl Resolver {
    /// Compile every blog's templates against the site at `root`.
    pub fn new(config: &SiteConfig, root: &Path) -> Result<Self, ConfigError> {
        let mut blogs = Vec::with_capacity(config.blogs.len());
        for blog in &config.blogs {
            blogs.push(BlogRoute {
                key: blog.key.clone(),
                posts_root: root.join(config.blog_posts_dir(blog)),
                pages_root: root.join(config.blog_pages_dir(blog)),
                convention: config.blog_convention(blog),
                templates: blog.templates()?,
            });
        }
        warn_ambiguous_routes(&blogs);
        Ok(Self {
            pages_root: root.join(&config.pages_dir),
            default_extension: config.default_extension.clone(),
            page_extensions: config.page_extensions.clone(),
            blogs,
        })
    }

    /// Blog keys in configuration order.
    pub fn blog_keys(&self) -> impl Iterator<Item = &str> {
        self.blogs.iter().map(|b| b.key.as_str())
    }

    /// Posts root and convention of a blog.
    pub fn blog_posts(&self, blog_key: &str) -> Option<(&Path, Convention)> {
        self.blog(blog_key)
            .map(|b| (b.posts_root.as_path(), b.convention))
    }

    /// Request path of a scanned post, formatted from its blog's `post_url`.
    pub fn post_uri(&self, blog_key: &str, post: &PostDescriptor) -> Option<String> {
        self.blog(blog_key)
            .map(|b| b.templates.post.format_post(&post.date, &post.slug))
    }

    fn blog(&self, key: &str) -> Option<&BlogRoute> {
        self.blogs.iter().find(|b| b.key == key)
    }

    pub fn resolve(&self, uri: &str) -> Result<ContentReference, ResolveError> {
        let path = uri.trim_matches('/');

        if let Some((base, suffix)) = split_page_suffix(path) {
            let page_num = match suffix.parse::<u32>() {
                Ok(n) if n >= 1 => n,
                _ => {
                    return Err(ResolveError::InvalidPageNumber {
                        uri: uri.to_string(),
                        suffix: suffix.to_string(),
                    });
                }
            };
            if let Some(mut reference) = self.match_rules(base) {
                reference.page_num = page_num;
                debug!(
                    "resolved {uri} -> {} {} (page {page_num})",
                    reference.kind,
                    reference.path.display()
                );
                return Ok(reference);
            }
        }

        match self.match_rules(path) {
            Some(reference) => {
                debug!(
                    "resolved {uri} -> {} {}",
                    reference.kind,
                    reference.path.display()
                );
                Ok(reference)
            }
            None => {
                debug!("no route for {uri}");
                Err(ResolveError::NotFound {
                    uri: uri.to_string(),
                })
            }
        }
    }

    /// Apply the four rules to a slash-trimmed path with no page suffix.
    fn match_rules(&self, path: &str) -> Option<ContentReference> {
        if path.split('/').any(|s| s == "..") {
            return None;
        }
        let (stem, extension) = self.split_extension(path);
        // `_index`, `_tag` and `_category` are only reachable through routing.
        let reserved = stem.split('/').any(|s| s.starts_with('_'));
        let stem = if stem.is_empty() { INDEX_PAGE } else { stem };
        let extension = extension.unwrap_or(&self.default_extension);
        let uri = self.reference_uri(stem, extension);

        let literal = self.pages_root.join(format!("{stem}.{extension}"));
        if !reserved && literal.is_file() {
            return Some(ContentReference {
                uri,
                path: literal,
                kind: ContentKind::Regular,
                blog_key: None,
                listing_key: None,
                date: None,
                page_num: 1,
                path_checked: true,
            });
        }

        for blog in &self.blogs {
            if let Some(TemplateMatch::Post { date, slug }) = blog.templates.post.matches(stem) {
                let path = blog
                    .convention
                    .post_path(&blog.posts_root, &date, &slug, extension);
                return Some(ContentReference {
                    uri,
                    path,
                    kind: ContentKind::Post,
                    blog_key: Some(blog.key.clone()),
                    listing_key: None,
                    date: Some(date),
                    page_num: 1,
                    path_checked: false,
                });
            }
        }

        for blog in &self.blogs {
            if let Some(TemplateMatch::Listing(tags)) = blog.templates.tag.matches(stem)
                && let Some(template) = self.listing_template(&blog.pages_root, TAG_TEMPLATE)
            {
                return Some(listing_reference(
                    uri,
                    template,
                    ContentKind::Tag,
                    &blog.key,
                    ListingKey::Tags(tags),
                ));
            }
        }

        for blog in &self.blogs {
            if let Some(TemplateMatch::Listing(mut values)) =
                blog.templates.category.matches(stem)
                && let Some(value) = values.pop()
                && let Some(template) = self.listing_template(&blog.pages_root, CATEGORY_TEMPLATE)
            {
                return Some(listing_reference(
                    uri,
                    template,
                    ContentKind::Category,
                    &blog.key,
                    ListingKey::Category(value),
                ));
            }
        }
        None
    }

    /// Cache identity of a resolved path.
    ///
    /// The default extension is implied. Any other recognized extension
    /// stays: `/about` and `/about.md` are different files.
    fn reference_uri(&self, stem: &str, extension: &str) -> String {
        let mut uri = if stem == INDEX_PAGE {
            "/".to_string()
        } else {
            format!("/{stem}")
        };
        if extension != self.default_extension {
            if stem == INDEX_PAGE {
                uri.push_str(INDEX_PAGE);
            }
            uri.push('.');
            uri.push_str(extension);
        }
        uri
    }

    /// Split a recognized page extension off the last segment.
    fn split_extension<'a>(&self, path: &'a str) -> (&'a str, Option<&'a str>) {
        let last_segment = path.rsplit('/').next().unwrap_or(path);
        if let Some(dot) = last_segment.rfind('.') {
            let ext = &last_segment[dot + 1..];
            if self.page_extensions.iter().any(|e| e == ext) {
                let cut = path.len() - ext.len() - 1;
                return (&path[..cut], Some(ext));
            }
        }
        (path, None)
    }

    /// First existing `<stem>.<ext>` in `dir`, default extension first.
    fn listing_template(&self, dir: &Path, stem: &str) -> Option<PathBuf> {
        std::iter::once(&self.default_extension)
            .chain(self.page_extensions.iter())
            .map(|ext| dir.join(format!("{stem}.{ext}")))
            .find(|p| p.is_file())
    }
}

fn listing_reference(
    uri: String,
    path: PathBuf,
    kind: ContentKind,
    blog_key: &str,
    key: ListingKey,
) -> ContentReference {
    ContentReference {
        uri,
        path,
        kind,
        blog_key: Some(blog_key.to_string()),
        listing_key: Some(key),
        date: None,
        page_num: 1,
        path_checked: true,
    }
}

/// Split `base/N` into `(base, "N")` when the last segment is all digits.
fn split_page_suffix(path: &str) -> Option<(&str, &str)> {
    let (base, last) = match path.rfind('/') {
        Some(slash) => (&path[..slash], &path[slash + 1..]),
        None => ("", path),
    };
    if !last.is_empty() && last.bytes().all(|b| b.is_ascii_digit()) {
        Some((base, last))
    } else {
        None
    }
}

fn warn_ambiguous_routes(blogs: &[BlogRoute]) {
    for (i, first) in blogs.iter().enumerate() {
        for second in &blogs[i + 1..] {
            let pairs: [(&UriTemplate, &UriTemplate); 3] = [
                (&first.templates.post, &second.templates.post),
                (&first.templates.tag, &second.templates.tag),
                (&first.templates.category, &second.templates.category),
            ];
            for (a, b) in pairs {
                if a.source() == b.source() {
                    warn!(
                        "blogs `{}` and `{}` share the {} URL `{}`; `{}` will always match first",
                        first.key,
                        second.key,
                        kind_name(a.kind()),
                        a.source(),
                        first.key
                    );
                }
            }
        }
    }
}

fn kind_name(kind: TemplateKind) -> &'static str {
    match kind {
        TemplateKind::Post => "post",
        TemplateKind::Tag => "tag",
        TemplateKind::Category => "category",
    }
}
