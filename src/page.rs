//! Run-scoped page handles and front-matter loading.
//!
//! A [`Page`] wraps a resolved [`ContentReference`] together with the
//! metadata read from the file's front matter. Handles are shared through
//! the content cache as `Rc<Page>`; the page number is the only field that
//! changes after construction.
//!
//! ## Front matter
//!
//! An optional TOML block between two `+++` lines at the very top of the
//! file:
//!
//! ```text
//! +++
//! title = "Second"
//! category = "News"
//! tags = ["Rust", "cli"]
//! +++
//! body
//! ```
//!
//! A file that doesn't start with `+++` has empty metadata.

use crate::resolve::{ContentKind, ContentReference};
use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const FENCE: &str = "+++";

#[derive(Error, Debug)]
pub enum PageError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid front matter in {path}: {message}")]
    FrontMatter { path: PathBuf, message: String },
}

/// A resolved content item, shared for the duration of one run.
#[derive(Debug)]
pub struct Page {
    reference: ContentReference,
    metadata: toml::Table,
    page_num: Cell<u32>,
}

impl Page {
    /// Handle with no metadata; nothing is read from disk.
    pub fn new(reference: ContentReference) -> Self {
        Self::with_metadata(reference, toml::Table::new())
    }

    pub fn with_metadata(reference: ContentReference, metadata: toml::Table) -> Self {
        let page_num = Cell::new(reference.page_num);
        Self {
            reference,
            metadata,
            page_num,
        }
    }

    /// Read the referenced file's front matter.
    ///
    /// For posts this is where a missing file surfaces, since the resolver
    /// does not check post paths.
    pub fn load(reference: ContentReference) -> Result<Self, PageError> {
        let metadata = read_front_matter(&reference.path)?;
        Ok(Self::with_metadata(reference, metadata))
    }

    pub fn reference(&self) -> &ContentReference {
        &self.reference
    }

    pub fn uri(&self) -> &str {
        &self.reference.uri
    }

    pub fn kind(&self) -> ContentKind {
        self.reference.kind
    }

    pub fn metadata(&self) -> &toml::Table {
        &self.metadata
    }

    /// Current 1-based page number.
    pub fn page_num(&self) -> u32 {
        self.page_num.get()
    }

    pub fn set_page_num(&self, page_num: u32) {
        self.page_num.set(page_num.max(1));
    }
}

/// Read a file and parse its front matter.
pub fn read_front_matter(path: &Path) -> Result<toml::Table, PageError> {
    let text = fs::read_to_string(path).map_err(|source| PageError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_front_matter(path, &text)
}

/// Parse the front-matter block at the top of `text`.
///
/// `path` is only used for error messages.
pub fn parse_front_matter(path: &Path, text: &str) -> Result<toml::Table, PageError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = text.split_inclusive('\n');
    let start = match lines.next() {
        Some(first) if first.trim_end() == FENCE => first.len(),
        _ => return Ok(toml::Table::new()),
    };

    let mut end = start;
    for line in lines {
        if line.trim_end() == FENCE {
            return toml::from_str(&text[start..end]).map_err(|e| PageError::FrontMatter {
                path: path.to_path_buf(),
                message: e.to_string(),
            });
        }
        end += line.len();
    }
    Err(PageError::FrontMatter {
        path: path.to_path_buf(),
        message: "missing closing `+++`".to_string(),
    })
}
