//! The run context.
//!
//! An [`Environment`] is built once per run (one full build, or one served
//! request) and passed explicitly to whatever needs content. It owns the
//! validated configuration, the [`Resolver`], the [`ContentCache`], and a
//! memo of every blog's post index, so a run scans each blog at most once.
//! Nothing here is global: two environments never share state.
//!
//! ```text
//! request path ──► Resolver ──► ContentCache ──► Rc<Page>
//!                                                  │ tag / category
//!                                                  ▼
//!                       posts(blog) ──► PaginationFilter ──► PageSlice
//! ```

use crate::cache::ContentCache;
use crate::config::{self, ConfigError, SiteConfig};
use crate::filter::{FilterError, PaginationFilter};
use crate::page::{self, Page, PageError};
use crate::resolve::{ContentReference, ResolveError, Resolver};
use crate::scan::{self, PostDescriptor, ScanError};
use log::debug;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnvironmentError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Page(#[from] PageError),
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error("unknown blog `{0}`")]
    UnknownBlog(String),
}

/// A scanned post with its front matter.
#[derive(Debug, Clone)]
pub struct Post {
    pub descriptor: PostDescriptor,
    pub metadata: toml::Table,
}

impl Post {
    pub fn slug(&self) -> &str {
        &self.descriptor.slug
    }
}

/// One page of a listing.
#[derive(Debug, Clone)]
pub struct PageSlice {
    pub page_num: u32,
    pub total_pages: u32,
    /// Members across all pages.
    pub total_posts: usize,
    /// Position of the first post of this page within the full listing.
    pub offset: usize,
    pub prev_page: Option<u32>,
    pub next_page: Option<u32>,
    pub posts: Vec<Post>,
}

impl PageSlice {
    /// Cut page `page_num` (1-based) out of the full member list.
    ///
    /// There is always at least one page; a page past the end is empty.
    pub fn new(members: Vec<Post>, page_num: u32, per_page: usize) -> Self {
        let per_page = per_page.max(1);
        let page_num = page_num.max(1);
        let total_posts = members.len();
        let total_pages = u32::try_from(total_posts.div_ceil(per_page).max(1)).unwrap_or(u32::MAX);
        let start = (page_num as usize - 1).saturating_mul(per_page);
        let posts = members.into_iter().skip(start).take(per_page).collect();
        Self {
            page_num,
            total_pages,
            total_posts,
            offset: start,
            prev_page: (page_num > 1).then(|| page_num - 1),
            next_page: (page_num < total_pages).then(|| page_num + 1),
            posts,
        }
    }
}

/// Run-scoped content access for one site.
#[derive(Debug)]
pub struct Environment {
    root: PathBuf,
    config: SiteConfig,
    resolver: Resolver,
    cache: ContentCache,
    posts: HashMap<String, Rc<[Post]>>,
}

impl Environment {
    /// Load `config.toml` from `root` and build an environment for it.
    pub fn load(root: &Path) -> Result<Self, EnvironmentError> {
        let config = config::load_config(root)?;
        Self::new(root, config)
    }

    pub fn new(root: &Path, config: SiteConfig) -> Result<Self, EnvironmentError> {
        config.validate()?;
        let resolver = Resolver::new(&config, root)?;
        let cache = ContentCache::from_config(&config);
        Ok(Self {
            root: root.to_path_buf(),
            config,
            resolver,
            cache,
            posts: HashMap::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    pub fn resolve(&self, uri: &str) -> Result<ContentReference, EnvironmentError> {
        Ok(self.resolver.resolve(uri)?)
    }

    /// The run's handle for `uri`.
    ///
    /// Handles are cached under the URI without its page suffix, so
    /// `/tag/rust/2` and `/tag/rust` share one handle; the handle's page
    /// number reflects the latest request. A non-default extension is part
    /// of the key, so `/about.md` and `/about` stay distinct.
    pub fn get_page(&mut self, uri: &str) -> Result<Rc<Page>, EnvironmentError> {
        let mut reference = self.resolver.resolve(uri)?;
        let page_num = std::mem::replace(&mut reference.page_num, 1);
        let key = reference.uri.clone();
        let page = self
            .cache
            .get_or_create(&key, || Page::load(reference))?;
        if page_num > 1 {
            page.set_page_num(page_num);
        }
        Ok(page)
    }

    /// Every post of a blog, newest first. Scanned once per run.
    pub fn posts(&mut self, blog_key: &str) -> Result<Rc<[Post]>, EnvironmentError> {
        if let Some(posts) = self.posts.get(blog_key) {
            return Ok(Rc::clone(posts));
        }
        let (root, convention) = self
            .resolver
            .blog_posts(blog_key)
            .ok_or_else(|| EnvironmentError::UnknownBlog(blog_key.to_string()))?;
        let posts: Rc<[Post]> = scan::scan(root, convention)?
            .into_iter()
            .map(|descriptor| {
                let metadata = page::read_front_matter(&descriptor.path)?;
                Ok(Post {
                    descriptor,
                    metadata,
                })
            })
            .collect::<Result<Vec<_>, PageError>>()?
            .into();
        debug!("indexed {} posts for blog {blog_key}", posts.len());
        self.posts.insert(blog_key.to_string(), Rc::clone(&posts));
        Ok(posts)
    }

    /// Blog a page's listing draws from: its own, or the first configured.
    fn blog_for(&self, page: &Page) -> Result<String, EnvironmentError> {
        page.reference()
            .blog_key
            .clone()
            .or_else(|| self.resolver.blog_keys().next().map(str::to_string))
            .ok_or_else(|| EnvironmentError::UnknownBlog(String::new()))
    }

    /// Posts belonging to `page`, in index order.
    ///
    /// `user_filter` is compiled first; a tag or category page then adds
    /// its own clauses. A regular page with no filter lists every post.
    pub fn listing(
        &mut self,
        page: &Page,
        user_filter: Option<&toml::Table>,
    ) -> Result<Vec<Post>, EnvironmentError> {
        let filter = PaginationFilter::for_listing(page.reference(), user_filter)?;
        let blog = self.blog_for(page)?;
        let posts = self.posts(&blog)?;
        Ok(posts
            .iter()
            .filter(|post| filter.matches(&post.metadata))
            .cloned()
            .collect())
    }

    /// The slice of [`listing`](Self::listing) at the page's current number.
    pub fn paginate(
        &mut self,
        page: &Page,
        user_filter: Option<&toml::Table>,
    ) -> Result<PageSlice, EnvironmentError> {
        let members = self.listing(page, user_filter)?;
        Ok(PageSlice::new(
            members,
            page.page_num(),
            self.config.posts_per_page,
        ))
    }

    /// Request path of a post.
    pub fn post_uri(&self, blog_key: &str, post: &Post) -> Option<String> {
        self.resolver.post_uri(blog_key, &post.descriptor)
    }
}
