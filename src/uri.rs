//! URL templates for posts and listing pages.
//!
//! A blog configures one template per content kind:
//!
//! ```text
//! post_url      = "%year%/%month%/%day%/%slug%"
//! tag_url       = "tag/%value%"
//! category_url  = "category/%value%"
//! ```
//!
//! The templates are opaque strings owned by the site configuration. This
//! module compiles them once into an anchored regex for matching request
//! paths, and keeps the parsed segment list so the same template can format a
//! path back from fields.
//!
//! ## Placeholders
//!
//! | Placeholder | Matches | Allowed in |
//! |---|---|---|
//! | `%year%` | 4 digits | post |
//! | `%month%` | 2 digits | post |
//! | `%day%` | 2 digits | post |
//! | `%slug%` | one path segment | post |
//! | `%value%` | tag: one or more segments; category: one segment | tag, category |
//!
//! Post templates must use all four date/slug placeholders; listing templates
//! must use `%value%`. Templates and request paths are compared with leading
//! and trailing slashes stripped.

use crate::naming::PostDate;
use regex::Regex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("unknown placeholder %{placeholder}% in URL template `{template}`")]
    UnknownPlaceholder {
        template: String,
        placeholder: String,
    },
    #[error("URL template `{template}` is missing %{placeholder}%")]
    MissingPlaceholder {
        template: String,
        placeholder: &'static str,
    },
    #[error("placeholder %{placeholder}% appears twice in URL template `{template}`")]
    DuplicatePlaceholder {
        template: String,
        placeholder: &'static str,
    },
    #[error("unterminated placeholder in URL template `{0}`")]
    Unterminated(String),
    #[error("URL template regex error: {0}")]
    Regex(#[from] regex::Error),
}

/// Which kind of content a template routes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    Post,
    Tag,
    Category,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placeholder {
    Year,
    Month,
    Day,
    Slug,
    Value,
}

impl Placeholder {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "year" => Some(Self::Year),
            "month" => Some(Self::Month),
            "day" => Some(Self::Day),
            "slug" => Some(Self::Slug),
            "value" => Some(Self::Value),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Year => "year",
            Self::Month => "month",
            Self::Day => "day",
            Self::Slug => "slug",
            Self::Value => "value",
        }
    }

    fn allowed_in(self, kind: TemplateKind) -> bool {
        match self {
            Self::Value => kind != TemplateKind::Post,
            _ => kind == TemplateKind::Post,
        }
    }
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Placeholder(Placeholder),
}

/// Fields captured from a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateMatch {
    Post { date: PostDate, slug: String },
    /// One value for categories, one or more for tags.
    Listing(Vec<String>),
}

/// A compiled URL template.
#[derive(Debug, Clone)]
pub struct UriTemplate {
    source: String,
    kind: TemplateKind,
    segments: Vec<Segment>,
    regex: Regex,
}

impl UriTemplate {
    pub fn parse(template: &str, kind: TemplateKind) -> Result<Self, TemplateError> {
        let source = template.trim_matches('/').to_string();
        let segments = parse_segments(&source, kind)?;

        let required: &[Placeholder] = match kind {
            TemplateKind::Post => &[
                Placeholder::Year,
                Placeholder::Month,
                Placeholder::Day,
                Placeholder::Slug,
            ],
            TemplateKind::Tag | TemplateKind::Category => &[Placeholder::Value],
        };
        for want in required {
            let count = segments
                .iter()
                .filter(|s| matches!(s, Segment::Placeholder(p) if p == want))
                .count();
            match count {
                0 => {
                    return Err(TemplateError::MissingPlaceholder {
                        template: source,
                        placeholder: want.name(),
                    });
                }
                1 => {}
                _ => {
                    return Err(TemplateError::DuplicatePlaceholder {
                        template: source,
                        placeholder: want.name(),
                    });
                }
            }
        }

        let mut pattern = String::from("^");
        for segment in &segments {
            match segment {
                Segment::Literal(text) => pattern.push_str(&regex::escape(text)),
                Segment::Placeholder(p) => pattern.push_str(placeholder_pattern(*p, kind)),
            }
        }
        pattern.push('$');
        let regex = Regex::new(&pattern)?;

        Ok(Self {
            source,
            kind,
            segments,
            regex,
        })
    }

    /// The template text, slashes trimmed.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn kind(&self) -> TemplateKind {
        self.kind
    }

    /// Match a request path (slashes trimmed) against this template.
    pub fn matches(&self, path: &str) -> Option<TemplateMatch> {
        let caps = self.regex.captures(path)?;
        match self.kind {
            TemplateKind::Post => {
                let date = PostDate::new(&caps["year"], &caps["month"], &caps["day"])?;
                Some(TemplateMatch::Post {
                    date,
                    slug: caps["slug"].to_string(),
                })
            }
            TemplateKind::Tag | TemplateKind::Category => {
                let values: Vec<String> = caps["value"]
                    .split('/')
                    .filter(|v| !v.is_empty())
                    .map(String::from)
                    .collect();
                if values.is_empty() {
                    None
                } else {
                    Some(TemplateMatch::Listing(values))
                }
            }
        }
    }

    /// Build the request path of a post. Listing templates ignore the fields.
    pub fn format_post(&self, date: &PostDate, slug: &str) -> String {
        self.format(|p| match p {
            Placeholder::Year => date.year.as_str(),
            Placeholder::Month => date.month.as_str(),
            Placeholder::Day => date.day.as_str(),
            Placeholder::Slug => slug,
            Placeholder::Value => "",
        })
    }

    /// Build the request path of a listing page. Tag values are joined by `/`.
    pub fn format_listing(&self, values: &[String]) -> String {
        let joined = values.join("/");
        self.format(|p| match p {
            Placeholder::Value => joined.as_str(),
            _ => "",
        })
    }

    fn format<'a>(&self, field: impl Fn(Placeholder) -> &'a str) -> String {
        let mut out = String::from("/");
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(p) => out.push_str(field(*p)),
            }
        }
        out
    }
}

fn placeholder_pattern(placeholder: Placeholder, kind: TemplateKind) -> &'static str {
    match placeholder {
        Placeholder::Year => r"(?P<year>[0-9]{4})",
        Placeholder::Month => r"(?P<month>[0-9]{2})",
        Placeholder::Day => r"(?P<day>[0-9]{2})",
        Placeholder::Slug => r"(?P<slug>[^/]+)",
        Placeholder::Value if kind == TemplateKind::Tag => r"(?P<value>.+)",
        Placeholder::Value => r"(?P<value>[^/]+)",
    }
}

fn parse_segments(source: &str, kind: TemplateKind) -> Result<Vec<Segment>, TemplateError> {
    let mut segments = Vec::new();
    let mut rest = source;
    while let Some(start) = rest.find('%') {
        if start > 0 {
            segments.push(Segment::Literal(rest[..start].to_string()));
        }
        let after = &rest[start + 1..];
        let end = after
            .find('%')
            .ok_or_else(|| TemplateError::Unterminated(source.to_string()))?;
        let name = &after[..end];
        let placeholder = Placeholder::parse(name)
            .filter(|p| p.allowed_in(kind))
            .ok_or_else(|| TemplateError::UnknownPlaceholder {
                template: source.to_string(),
                placeholder: name.to_string(),
            })?;
        segments.push(Segment::Placeholder(placeholder));
        rest = &after[end + 1..];
    }
    if !rest.is_empty() {
        segments.push(Segment::Literal(rest.to_string()));
    }
    Ok(segments)
}
