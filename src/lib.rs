//! # Quire
//!
//! Content routing, post indexing, and listing queries for a file-based
//! blog. The filesystem is the data source: literal pages live under
//! `pages/`, dated posts under `posts/`, and a small `config.toml` names the
//! post layout and the URL shapes.
//!
//! # Request Flow
//!
//! ```text
//! /tag/rust/2
//!   │
//!   ├─ resolve   path → ContentReference   (page, post, tag, or category)
//!   ├─ cache     ContentReference → Rc<Page>   (one handle per URI per run)
//!   └─ listing   scan(blog) + PaginationFilter → PageSlice
//! ```
//!
//! Everything hangs off an [`environment::Environment`]: one value per run,
//! explicitly constructed and passed. There are no process-wide caches, so
//! concurrent runs never share state.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`naming`] | Post filename grammars (`YYYY-MM-DD_slug.ext` and the partial forms) and the slug normalizer |
//! | [`scan`] | The four post layouts (`flat`, `hierarchy`, `year`, `user`) behind one `scan` contract |
//! | [`uri`] | `%year%/%month%/%day%/%slug%` style URL templates: match and format |
//! | [`resolve`] | Request path → content reference, with fixed rule precedence and page suffixes |
//! | [`page`] | Cached page handles and TOML front matter |
//! | [`cache`] | FIFO-bounded, run-scoped content cache |
//! | [`filter`] | The `and` / `or` / `not` / `has_*` / `is_*` listing filter |
//! | [`environment`] | The run context tying the above together |
//! | [`config`] | `config.toml` loading, merging over stock defaults, and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Post Order Is a Data Guarantee
//!
//! Every layout returns posts newest first, and the same set of posts comes
//! back in the same order whichever layout holds them. Zero-padded date
//! fields make string order equal chronological order, so no layout needs to
//! parse dates into numbers.
//!
//! ## Hierarchy Keeps One Post Per Day
//!
//! The `hierarchy` layout indexes a month's posts by day of month. Two posts
//! on the same day collide and only the one whose filename sorts last is
//! kept; a warning names the dropped file. The other layouts have no such
//! limit.
//!
//! ## First Blog Wins
//!
//! With several blogs, each routing rule is tried against every blog in
//! configuration order before the next rule runs. Blogs that share a template for the same kind of
//! content are ambiguous: the first one always wins, and a warning is logged
//! when the resolver is built.
//!
//! ## Crude Eviction
//!
//! The content cache evicts the oldest tenth of its limit in insertion
//! order once it overflows. Nothing depends on it for correctness, so a
//! true LRU would buy nothing.

pub mod cache;
pub mod config;
pub mod environment;
pub mod filter;
pub mod naming;
pub mod output;
pub mod page;
pub mod resolve;
pub mod scan;
pub mod uri;

#[cfg(test)]
pub(crate) mod test_helpers;
