#![forbid(unsafe_code)]

//! Output pieces shared by the inclusive and exclusive walkers.

use sigill_xml::escape;
use sigill_xml::qname::attribute_qname;
use sigill_xml::NodeSet;
use std::collections::BTreeMap;

/// A namespace declaration to be rendered. The empty prefix is the default
/// namespace, and an empty URI on it renders `xmlns=""`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct NsDecl {
    pub prefix: String,
    pub uri: String,
}

/// A non-namespace attribute. Field order gives the canonical sort:
/// unqualified attributes (empty URI) first, then by URI and local name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Attr {
    pub ns_uri: String,
    pub local_name: String,
    pub qualified_name: String,
    pub value: String,
}

impl Attr {
    pub fn from_node(node: roxmltree::Node<'_, '_>, attr: &roxmltree::Attribute<'_, '_>) -> Self {
        Attr {
            ns_uri: attr.namespace().unwrap_or("").to_owned(),
            local_name: attr.name().to_owned(),
            qualified_name: attribute_qname(node, attr),
            value: attr.value().to_owned(),
        }
    }
}

/// Write `<name decls attrs>`. Both slices must already be sorted.
pub(crate) fn write_start_tag(out: &mut Vec<u8>, name: &str, decls: &[NsDecl], attrs: &[Attr]) {
    out.push(b'<');
    out.extend_from_slice(name.as_bytes());
    for d in decls {
        if d.prefix.is_empty() {
            out.extend_from_slice(b" xmlns=\"");
        } else {
            out.extend_from_slice(b" xmlns:");
            out.extend_from_slice(d.prefix.as_bytes());
            out.extend_from_slice(b"=\"");
        }
        out.extend_from_slice(escape::escape_attr(&d.uri).as_bytes());
        out.push(b'"');
    }
    for a in attrs {
        out.push(b' ');
        out.extend_from_slice(a.qualified_name.as_bytes());
        out.extend_from_slice(b"=\"");
        out.extend_from_slice(escape::escape_attr(&a.value).as_bytes());
        out.push(b'"');
    }
    out.push(b'>');
}

pub(crate) fn write_end_tag(out: &mut Vec<u8>, name: &str) {
    out.extend_from_slice(b"</");
    out.extend_from_slice(name.as_bytes());
    out.push(b'>');
}

/// Namespaces in scope at `node`, minus the `xmlns=""` undeclaration.
pub(crate) fn inscope_namespaces(node: roxmltree::Node<'_, '_>) -> BTreeMap<String, String> {
    node.namespaces()
        .filter(|n| !n.uri().is_empty())
        .map(|n| (n.name().unwrap_or("").to_owned(), n.uri().to_owned()))
        .collect()
}

/// Handles every node kind except elements, which differ between the
/// inclusive and exclusive algorithms.
pub(crate) struct Leaves<'a> {
    pub with_comments: bool,
    pub node_set: Option<&'a NodeSet>,
}

impl Leaves<'_> {
    pub fn is_visible(&self, node: &roxmltree::Node<'_, '_>) -> bool {
        self.node_set.map_or(true, |ns| ns.contains(node))
    }

    /// Render a text, comment or PI node. Other kinds are ignored.
    pub fn write_leaf(&self, node: roxmltree::Node<'_, '_>, out: &mut Vec<u8>) {
        match node.node_type() {
            roxmltree::NodeType::Text => {
                if self.is_visible(&node) {
                    out.extend_from_slice(escape::escape_text(node.text().unwrap_or("")).as_bytes());
                }
            }
            roxmltree::NodeType::Comment => {
                if self.with_comments && self.is_visible(&node) {
                    let body = format!("<!--{}-->", node.text().unwrap_or(""));
                    write_top_level(node, body.as_bytes(), out);
                }
            }
            roxmltree::NodeType::PI => {
                if let (true, Some(pi)) = (self.is_visible(&node), node.pi()) {
                    let mut body = format!("<?{}", pi.target);
                    if let Some(value) = pi.value.filter(|v| !v.is_empty()) {
                        body.push(' ');
                        body.push_str(&escape::escape_pi(value));
                    }
                    body.push_str("?>");
                    write_top_level(node, body.as_bytes(), out);
                }
            }
            _ => {}
        }
    }
}

/// Outside the document element, comments and PIs are separated from it by
/// a line feed on the side facing the element.
fn write_top_level(node: roxmltree::Node<'_, '_>, body: &[u8], out: &mut Vec<u8>) {
    let top_level = node.parent().is_some_and(|p| p.is_root());
    if top_level && node.prev_siblings().skip(1).any(|s| s.is_element()) {
        out.push(b'\n');
    }
    out.extend_from_slice(body);
    if top_level && node.next_siblings().skip(1).any(|s| s.is_element()) {
        out.push(b'\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_order() {
        let mut attrs = vec![
            Attr {
                ns_uri: "urn:b".into(),
                local_name: "a".into(),
                qualified_name: "b:a".into(),
                value: String::new(),
            },
            Attr {
                ns_uri: String::new(),
                local_name: "z".into(),
                qualified_name: "z".into(),
                value: String::new(),
            },
            Attr {
                ns_uri: "urn:a".into(),
                local_name: "y".into(),
                qualified_name: "a:y".into(),
                value: String::new(),
            },
        ];
        attrs.sort();
        let names: Vec<&str> = attrs.iter().map(|a| a.qualified_name.as_str()).collect();
        assert_eq!(names, vec!["z", "a:y", "b:a"]);
    }

    #[test]
    fn test_ns_decl_order_default_first() {
        let mut decls = vec![
            NsDecl { prefix: "b".into(), uri: "urn:b".into() },
            NsDecl { prefix: String::new(), uri: "urn:d".into() },
            NsDecl { prefix: "a".into(), uri: "urn:a".into() },
        ];
        decls.sort();
        let mut out = Vec::new();
        write_start_tag(&mut out, "e", &decls, &[]);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            r#"<e xmlns="urn:d" xmlns:a="urn:a" xmlns:b="urn:b">"#
        );
    }
}
