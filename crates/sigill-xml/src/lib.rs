#![forbid(unsafe_code)]

//! XML document glue for the sigill XML-DSig engine.
//!
//! Wraps `roxmltree` with the pieces the signature engine needs: node sets
//! for document-subset canonicalization, pluggable Id lookup, qualified-name
//! recovery and a small XML writer.

pub mod document;
pub mod escape;
pub mod nodeset;
pub mod qname;
pub mod writer;
pub mod xpath;

pub use document::{AttributeIdResolver, IdResolver, XmlDocument};
pub use nodeset::NodeSet;
pub use writer::XmlWriter;

use sigill_core::Error;

/// Return roxmltree parsing options that allow DTD.
///
/// roxmltree never fetches external entities, so allowing an internal DTD
/// subset is safe. Interop samples routinely carry one.
pub fn parsing_options() -> roxmltree::ParsingOptions {
    roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    }
}

/// Parse `text` with [`parsing_options`].
pub fn parse(text: &str) -> Result<roxmltree::Document<'_>, Error> {
    roxmltree::Document::parse_with_options(text, parsing_options())
        .map_err(|e| Error::XmlParse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_allows_internal_dtd() {
        let xml = r#"<!DOCTYPE a [<!ENTITY e "x">]><a>&e;</a>"#;
        let doc = parse(xml).unwrap();
        assert_eq!(doc.root_element().text(), Some("x"));
    }

    #[test]
    fn test_parse_error_is_xml_class() {
        let err = parse("<a>").unwrap_err();
        assert!(matches!(err, Error::XmlParse(_)));
    }
}
