#![forbid(unsafe_code)]

//! Owned XML documents, Id lookup and element search helpers.

use crate::qname::element_namespace;
use sigill_core::Error;

/// An owned XML document.
///
/// roxmltree trees borrow their input, so the document keeps only the text
/// and hands out short-lived trees through [`XmlDocument::parse_doc`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    text: String,
}

impl XmlDocument {
    /// Parse and validate XML from a string, taking ownership.
    pub fn parse(text: String) -> Result<Self, Error> {
        crate::parse(&text)?;
        Ok(Self { text })
    }

    /// The raw XML text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Parse the stored text into a temporary tree.
    pub fn parse_doc(&self) -> Result<roxmltree::Document<'_>, Error> {
        crate::parse(&self.text)
    }
}

// ── Id lookup ────────────────────────────────────────────────────────

/// Maps an id value to the element carrying it.
///
/// The signature engine calls this for `#id` references and for
/// `get_id_element`. Install a custom implementation when ids live in
/// attributes the default resolver does not know about.
pub trait IdResolver: Send + Sync {
    fn get_id_element<'a, 'input>(
        &self,
        doc: &'a roxmltree::Document<'input>,
        id: &str,
    ) -> Option<roxmltree::Node<'a, 'input>>;
}

/// Resolves ids by attribute local name. Defaults to `Id`, `ID` and `id`.
#[derive(Debug, Clone)]
pub struct AttributeIdResolver {
    attrs: Vec<String>,
}

impl AttributeIdResolver {
    pub fn new() -> Self {
        Self {
            attrs: vec!["Id".into(), "ID".into(), "id".into()],
        }
    }

    /// Also treat attributes with this local name as ids (e.g. `AssertionID`).
    pub fn with_attr(mut self, name: &str) -> Self {
        self.attrs.push(name.to_owned());
        self
    }
}

impl Default for AttributeIdResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl IdResolver for AttributeIdResolver {
    fn get_id_element<'a, 'input>(
        &self,
        doc: &'a roxmltree::Document<'input>,
        id: &str,
    ) -> Option<roxmltree::Node<'a, 'input>> {
        doc.descendants().find(|n| {
            n.is_element()
                && n.attributes()
                    .any(|a| a.value() == id && self.attrs.iter().any(|name| name == a.name()))
        })
    }
}

// ── Element search ───────────────────────────────────────────────────

fn has_name(node: &roxmltree::Node<'_, '_>, ns_uri: &str, local_name: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == local_name
        && element_namespace(*node).unwrap_or("") == ns_uri
}

/// First descendant element with the given namespace and local name.
pub fn find_element<'a, 'input>(
    doc: &'a roxmltree::Document<'input>,
    ns_uri: &str,
    local_name: &str,
) -> Option<roxmltree::Node<'a, 'input>> {
    doc.descendants().find(|n| has_name(n, ns_uri, local_name))
}

/// All descendant elements with the given namespace and local name, in
/// document order.
pub fn find_elements<'a, 'input>(
    doc: &'a roxmltree::Document<'input>,
    ns_uri: &str,
    local_name: &str,
) -> Vec<roxmltree::Node<'a, 'input>> {
    doc.descendants()
        .filter(|n| has_name(n, ns_uri, local_name))
        .collect()
}

pub fn find_child_element<'a, 'input>(
    parent: roxmltree::Node<'a, 'input>,
    ns_uri: &str,
    local_name: &str,
) -> Option<roxmltree::Node<'a, 'input>> {
    parent.children().find(|n| has_name(n, ns_uri, local_name))
}

pub fn find_child_elements<'a, 'input>(
    parent: roxmltree::Node<'a, 'input>,
    ns_uri: &str,
    local_name: &str,
) -> Vec<roxmltree::Node<'a, 'input>> {
    parent
        .children()
        .filter(|n| has_name(n, ns_uri, local_name))
        .collect()
}

/// Concatenated text of all descendant text nodes.
pub fn text_content(node: roxmltree::Node<'_, '_>) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_resolver_attrs() {
        let xml = r#"<r><a Id="one"/><b ID="two"/><c id="three"/><d Other="four"/></r>"#;
        let doc = crate::parse(xml).unwrap();
        let resolver = AttributeIdResolver::new();
        assert_eq!(resolver.get_id_element(&doc, "one").unwrap().tag_name().name(), "a");
        assert_eq!(resolver.get_id_element(&doc, "two").unwrap().tag_name().name(), "b");
        assert_eq!(resolver.get_id_element(&doc, "three").unwrap().tag_name().name(), "c");
        assert!(resolver.get_id_element(&doc, "four").is_none());
        assert!(resolver.get_id_element(&doc, "").is_none());
    }

    #[test]
    fn test_resolver_extra_attr() {
        let doc = crate::parse(r#"<r><a AssertionID="x"/></r>"#).unwrap();
        let resolver = AttributeIdResolver::new().with_attr("AssertionID");
        assert!(resolver.get_id_element(&doc, "x").is_some());
    }

    #[test]
    fn test_find_helpers() {
        let xml = r#"<r xmlns:ds="urn:d"><ds:a/><a/><ds:a/></r>"#;
        let doc = crate::parse(xml).unwrap();
        assert_eq!(find_elements(&doc, "urn:d", "a").len(), 2);
        assert!(find_element(&doc, "", "a").is_some());
        let root = doc.root_element();
        assert_eq!(find_child_elements(root, "urn:d", "a").len(), 2);
        assert!(find_child_element(root, "urn:other", "a").is_none());
    }

    #[test]
    fn test_xml_document_rejects_bad_input() {
        assert!(XmlDocument::parse("<a>".into()).is_err());
        let doc = XmlDocument::parse("<a>t</a>".to_owned()).unwrap();
        assert_eq!(doc.text(), "<a>t</a>");
        assert_eq!(text_content(doc.parse_doc().unwrap().root_element()), "t");
    }
}
