#![forbid(unsafe_code)]

//! The `<Object>` element of enveloping signatures.

use sigill_core::ns;
use sigill_xml::writer::NsScope;
use sigill_xml::XmlWriter;

/// Scope in effect inside a signature written by this crate.
fn dsig_scope() -> NsScope {
    let mut scope = NsScope::new();
    scope.insert(String::new(), ns::DSIG.to_owned());
    scope
}

/// An `<Object>` carried inside the signature.
///
/// The content is stored as markup that is valid under the dsig default
/// namespace, so nodes copied from another document get whatever `xmlns`
/// declarations they need to keep their own namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataObject {
    pub id: Option<String>,
    pub mime_type: Option<String>,
    pub encoding: Option<String>,
    content: String,
}

impl DataObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_owned());
        self
    }

    /// Builder form of [`DataObject::add_node`].
    pub fn with_node(mut self, node: roxmltree::Node<'_, '_>) -> Self {
        self.add_node(node);
        self
    }

    /// Append a copy of `node` and its subtree.
    pub fn add_node(&mut self, node: roxmltree::Node<'_, '_>) {
        let mut w = XmlWriter::new();
        w.write_node(node, &dsig_scope());
        self.content.push_str(&w.into_string());
    }

    /// Append character data.
    pub fn add_text(&mut self, text: &str) {
        let mut w = XmlWriter::new();
        w.write_text(text);
        self.content.push_str(&w.into_string());
    }

    /// The serialized content.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Parse an `<Object>` element, keeping its children as content.
    pub fn from_node(node: roxmltree::Node<'_, '_>) -> Self {
        let scope = dsig_scope();
        let mut w = XmlWriter::new();
        for child in node.children() {
            w.write_node(child, &scope);
        }
        Self {
            id: node.attribute(ns::attr::ID).map(str::to_owned),
            mime_type: node.attribute(ns::attr::MIME_TYPE).map(str::to_owned),
            encoding: node.attribute(ns::attr::ENCODING).map(str::to_owned),
            content: w.into_string(),
        }
    }

    /// Write the element. The writer's default namespace must be dsig.
    pub fn write(&self, w: &mut XmlWriter) {
        let mut attrs: Vec<(&str, &str)> = Vec::new();
        if let Some(id) = &self.id {
            attrs.push((ns::attr::ID, id));
        }
        if let Some(mime) = &self.mime_type {
            attrs.push((ns::attr::MIME_TYPE, mime));
        }
        if let Some(enc) = &self.encoding {
            attrs.push((ns::attr::ENCODING, enc));
        }
        if self.content.is_empty() {
            w.empty_element(ns::node::OBJECT, &attrs);
        } else {
            w.start_element(ns::node::OBJECT, &attrs);
            w.write_raw(&self.content);
            w.end_element(ns::node::OBJECT);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written(obj: &DataObject) -> String {
        let mut w = XmlWriter::new();
        obj.write(&mut w);
        w.into_string()
    }

    #[test]
    fn test_foreign_namespace_is_declared() {
        let doc = sigill_xml::parse("<Action xmlns='urn:foo'>Echo</Action>").unwrap();
        let obj = DataObject::new().with_id("_1").with_node(doc.root_element());
        assert_eq!(
            written(&obj),
            r#"<Object Id="_1"><Action xmlns="urn:foo">Echo</Action></Object>"#
        );
    }

    #[test]
    fn test_unqualified_node_resets_default() {
        let doc = sigill_xml::parse("<ObjectListTag />").unwrap();
        let obj = DataObject::new().with_node(doc.root_element());
        assert_eq!(obj.content(), r#"<ObjectListTag xmlns="" />"#);
    }

    #[test]
    fn test_text_and_attributes() {
        let mut obj = DataObject::new();
        assert_eq!(written(&obj), "<Object />");
        obj.mime_type = Some("text/plain".into());
        obj.encoding = Some("urn:enc".into());
        obj.add_text("a < b");
        assert_eq!(
            written(&obj),
            r#"<Object MimeType="text/plain" Encoding="urn:enc">a &lt; b</Object>"#
        );
    }

    #[test]
    fn test_from_node_keeps_children() {
        let xml = concat!(
            r#"<Object xmlns="http://www.w3.org/2000/09/xmldsig#" Id="o">"#,
            "some <b xmlns=\"\">text</b></Object>"
        );
        let doc = sigill_xml::parse(xml).unwrap();
        let obj = DataObject::from_node(doc.root_element());
        assert_eq!(obj.id.as_deref(), Some("o"));
        assert_eq!(obj.content(), r#"some <b xmlns="">text</b>"#);
    }
}
