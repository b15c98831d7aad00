#![forbid(unsafe_code)]

//! A small string-backed XML writer.
//!
//! Empty elements are written as `<Tag Attr="v" />` and attribute values are
//! always double-quoted. [`XmlWriter::write_node`] copies a parsed subtree,
//! declaring whatever namespaces its prefixes need relative to the scope the
//! caller has already written.

use crate::escape::{escape_attr, escape_pi, escape_text};
use crate::qname::{attribute_prefix, element_namespace, element_prefix};
use sigill_core::ns;
use std::collections::BTreeMap;

/// Prefix → namespace URI bindings already in effect in the output.
/// The empty prefix is the default namespace.
pub type NsScope = BTreeMap<String, String>;

/// A string-backed XML writer.
#[derive(Debug, Default)]
pub struct XmlWriter {
    out: String,
}

impl XmlWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an element with the given attributes.
    pub fn start_element(&mut self, name: &str, attrs: &[(&str, &str)]) {
        self.open_tag(name, attrs);
        self.out.push('>');
    }

    /// Write a self-closing element.
    pub fn empty_element(&mut self, name: &str, attrs: &[(&str, &str)]) {
        self.open_tag(name, attrs);
        self.out.push_str(" />");
    }

    pub fn end_element(&mut self, name: &str) {
        self.out.push_str("</");
        self.out.push_str(name);
        self.out.push('>');
    }

    /// Write an element holding only escaped text.
    pub fn text_element(&mut self, name: &str, attrs: &[(&str, &str)], text: &str) {
        self.start_element(name, attrs);
        self.write_text(text);
        self.end_element(name);
    }

    pub fn write_text(&mut self, text: &str) {
        self.out.push_str(&escape_text(text));
    }

    /// Append already-serialized markup.
    pub fn write_raw(&mut self, xml: &str) {
        self.out.push_str(xml);
    }

    /// Copy a parsed node (and its subtree) into the output.
    ///
    /// `scope` holds the bindings in effect where the node is written.
    /// Declarations the node itself carries are kept, and any binding its
    /// element or attribute prefixes need but `scope` lacks is added.
    pub fn write_node(&mut self, node: roxmltree::Node<'_, '_>, scope: &NsScope) {
        match node.node_type() {
            roxmltree::NodeType::Root => {
                for child in node.children() {
                    self.write_node(child, scope);
                }
            }
            roxmltree::NodeType::Element => self.write_element(node, scope),
            roxmltree::NodeType::Text => self.write_text(node.text().unwrap_or("")),
            roxmltree::NodeType::Comment => {
                self.out.push_str("<!--");
                self.out.push_str(node.text().unwrap_or(""));
                self.out.push_str("-->");
            }
            roxmltree::NodeType::PI => {
                if let Some(pi) = node.pi() {
                    self.out.push_str("<?");
                    self.out.push_str(pi.target);
                    if let Some(value) = pi.value {
                        self.out.push(' ');
                        self.out.push_str(&escape_pi(value));
                    }
                    self.out.push_str("?>");
                }
            }
        }
    }

    fn write_element(&mut self, node: roxmltree::Node<'_, '_>, scope: &NsScope) {
        let mut child_scope = scope.clone();
        let mut decls: Vec<(String, String)> = Vec::new();
        let mut need = |prefix: &str, uri: &str| {
            let current = child_scope.get(prefix).map(String::as_str);
            let satisfied =
                current == Some(uri) || (prefix.is_empty() && uri.is_empty() && current.is_none());
            if !satisfied {
                child_scope.insert(prefix.to_owned(), uri.to_owned());
                decls.push((prefix.to_owned(), uri.to_owned()));
            }
        };

        let prefix = element_prefix(node).unwrap_or("");
        need(prefix, element_namespace(node).unwrap_or(""));

        let parent_ns: Vec<(Option<&str>, &str)> = node
            .parent_element()
            .map(|p| p.namespaces().map(|n| (n.name(), n.uri())).collect())
            .unwrap_or_default();
        for decl in node.namespaces() {
            if !parent_ns.contains(&(decl.name(), decl.uri())) {
                need(decl.name().unwrap_or(""), decl.uri());
            }
        }

        let mut attrs: Vec<(String, &str)> = Vec::new();
        for attr in node.attributes() {
            let qname = match (attribute_prefix(node, &attr), attr.namespace()) {
                (Some(p), Some(uri)) => {
                    if uri != ns::XML {
                        need(p, uri);
                    }
                    format!("{p}:{}", attr.name())
                }
                _ => attr.name().to_owned(),
            };
            attrs.push((qname, attr.value()));
        }

        let name = if prefix.is_empty() {
            node.tag_name().name().to_owned()
        } else {
            format!("{prefix}:{}", node.tag_name().name())
        };
        self.out.push('<');
        self.out.push_str(&name);
        for (p, uri) in &decls {
            if p.is_empty() {
                self.out.push_str(" xmlns=\"");
            } else {
                self.out.push_str(" xmlns:");
                self.out.push_str(p);
                self.out.push_str("=\"");
            }
            self.out.push_str(&escape_attr(uri));
            self.out.push('"');
        }
        for (qname, value) in &attrs {
            self.push_attr(qname, value);
        }

        if !node.has_children() {
            self.out.push_str(" />");
            return;
        }
        self.out.push('>');
        for child in node.children() {
            self.write_node(child, &child_scope);
        }
        self.end_element(&name);
    }

    fn open_tag(&mut self, name: &str, attrs: &[(&str, &str)]) {
        self.out.push('<');
        self.out.push_str(name);
        for (k, v) in attrs {
            self.push_attr(k, v);
        }
    }

    fn push_attr(&mut self, name: &str, value: &str) {
        self.out.push(' ');
        self.out.push_str(name);
        self.out.push_str("=\"");
        self.out.push_str(&escape_attr(value));
        self.out.push('"');
    }

    /// Finish writing and return the XML text.
    pub fn into_string(self) -> String {
        self.out
    }
}
