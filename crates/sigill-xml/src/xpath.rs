#![forbid(unsafe_code)]

//! The XPointer subset XML-DSig needs for same-document references.
//!
//! - `""` selects the document without comments
//! - `#xpointer(/)` selects the document with comments
//! - `#id` and `#xpointer(id('id'))` select an element by id

/// What a Reference URI points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UriTarget<'a> {
    /// `""`: whole document, comments removed.
    Document,
    /// `#xpointer(/)`: whole document, comments kept.
    DocumentWithComments,
    /// `#id`: element subtree, comments removed.
    Id(&'a str),
    /// `#xpointer(id('id'))`: element subtree, comments kept.
    IdWithComments(&'a str),
    /// Anything that is not a same-document reference.
    External(&'a str),
}

impl UriTarget<'_> {
    pub fn with_comments(&self) -> bool {
        matches!(self, Self::DocumentWithComments | Self::IdWithComments(_))
    }
}

/// Classify a Reference URI.
pub fn classify_uri(uri: &str) -> UriTarget<'_> {
    if uri.is_empty() {
        return UriTarget::Document;
    }
    let Some(fragment) = parse_same_document_ref(uri) else {
        return UriTarget::External(uri);
    };
    if fragment == "xpointer(/)" {
        UriTarget::DocumentWithComments
    } else if let Some(id) = parse_xpointer_id(fragment) {
        UriTarget::IdWithComments(id)
    } else {
        UriTarget::Id(fragment)
    }
}

/// Parse a same-document reference (e.g., `#foo` → `foo`).
pub fn parse_same_document_ref(uri: &str) -> Option<&str> {
    uri.strip_prefix('#')
}

/// Parse an `xpointer(id('...'))` expression and return the id value.
pub fn parse_xpointer_id(expr: &str) -> Option<&str> {
    let inner = expr.strip_prefix("xpointer(id(")?.strip_suffix("))")?;
    inner
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .or_else(|| inner.strip_prefix('"').and_then(|s| s.strip_suffix('"')))
}
