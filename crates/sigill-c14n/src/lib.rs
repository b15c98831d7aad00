#![forbid(unsafe_code)]

//! XML Canonicalization for the sigill XML-DSig engine.
//!
//! Implements the four variants XML-DSig relies on:
//! - Canonical XML 1.0 (with and without comments)
//! - Exclusive Canonical XML 1.0 (with and without comments)
//!
//! The minimal canonicalization URI is accepted and treated as Canonical
//! XML 1.0.

pub mod exclusive;
pub mod inclusive;
mod render;

use sigill_core::{algorithm, Error};
use sigill_xml::NodeSet;

/// The canonicalization mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum C14nMode {
    /// Canonical XML 1.0
    Inclusive,
    /// Canonical XML 1.0 with comments
    InclusiveWithComments,
    /// Exclusive Canonical XML 1.0
    Exclusive,
    /// Exclusive Canonical XML 1.0 with comments
    ExclusiveWithComments,
}

impl C14nMode {
    /// Algorithm URI for this mode.
    pub fn uri(&self) -> &'static str {
        match self {
            Self::Inclusive => algorithm::C14N,
            Self::InclusiveWithComments => algorithm::C14N_WITH_COMMENTS,
            Self::Exclusive => algorithm::EXC_C14N,
            Self::ExclusiveWithComments => algorithm::EXC_C14N_WITH_COMMENTS,
        }
    }

    /// Parse a mode from an algorithm URI.
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            algorithm::C14N | algorithm::MINIMAL_C14N => Some(Self::Inclusive),
            algorithm::C14N_WITH_COMMENTS => Some(Self::InclusiveWithComments),
            algorithm::EXC_C14N => Some(Self::Exclusive),
            algorithm::EXC_C14N_WITH_COMMENTS => Some(Self::ExclusiveWithComments),
            _ => None,
        }
    }

    pub fn with_comments(&self) -> bool {
        matches!(self, Self::InclusiveWithComments | Self::ExclusiveWithComments)
    }

    pub fn is_exclusive(&self) -> bool {
        matches!(self, Self::Exclusive | Self::ExclusiveWithComments)
    }
}

/// Canonicalize XML text.
///
/// - `node_set`: restricts output to a document subset; `None` means the
///   whole document
/// - `inclusive_prefixes`: the exclusive InclusiveNamespaces PrefixList,
///   ignored by the inclusive modes
pub fn canonicalize(
    xml: &str,
    mode: C14nMode,
    node_set: Option<&NodeSet>,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>, Error> {
    let doc = sigill_xml::parse(xml)?;
    canonicalize_doc(&doc, mode, node_set, inclusive_prefixes)
}

/// Canonicalize a pre-parsed document.
pub fn canonicalize_doc(
    doc: &roxmltree::Document<'_>,
    mode: C14nMode,
    node_set: Option<&NodeSet>,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>, Error> {
    if mode.is_exclusive() {
        exclusive::canonicalize(doc, mode.with_comments(), node_set, inclusive_prefixes)
    } else {
        inclusive::canonicalize(doc, mode.with_comments(), node_set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_uris_round_trip() {
        for mode in [
            C14nMode::Inclusive,
            C14nMode::InclusiveWithComments,
            C14nMode::Exclusive,
            C14nMode::ExclusiveWithComments,
        ] {
            assert_eq!(C14nMode::from_uri(mode.uri()), Some(mode));
        }
        assert_eq!(
            C14nMode::from_uri(algorithm::MINIMAL_C14N),
            Some(C14nMode::Inclusive)
        );
        assert_eq!(C14nMode::from_uri(algorithm::SHA1), None);
    }

    #[test]
    fn test_inclusive_and_exclusive_differ() {
        let xml = r#"<r xmlns:u="urn:unused"><c/></r>"#;
        let inc = canonicalize(xml, C14nMode::Inclusive, None, &[]).unwrap();
        let exc = canonicalize(xml, C14nMode::Exclusive, None, &[]).unwrap();
        assert_eq!(inc, br#"<r xmlns:u="urn:unused"><c></c></r>"#.to_vec());
        assert_eq!(exc, b"<r><c></c></r>".to_vec());
    }

    #[test]
    fn test_malformed_input() {
        let err = canonicalize("<a><b></a>", C14nMode::Inclusive, None, &[]).unwrap_err();
        assert!(matches!(err, Error::XmlParse(_)));
    }
}
