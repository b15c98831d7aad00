#![forbid(unsafe_code)]

//! Inclusive Canonical XML 1.0 (C14N 1.0).
//!
//! Algorithm URI: `http://www.w3.org/TR/2001/REC-xml-c14n-20010315`
//! With comments: `http://www.w3.org/TR/2001/REC-xml-c14n-20010315#WithComments`
//!
//! Every in-scope namespace is rendered on the first visible element that
//! sees it. For document subsets, `xml:*` attributes of omitted ancestors are
//! pulled down onto the visible element.

use crate::render::{inscope_namespaces, write_end_tag, write_start_tag, Attr, Leaves, NsDecl};
use sigill_core::{ns, Error};
use sigill_xml::qname::element_qname;
use sigill_xml::NodeSet;
use std::collections::BTreeMap;

/// Canonicalize a document using Inclusive C14N 1.0.
pub fn canonicalize(
    doc: &roxmltree::Document<'_>,
    with_comments: bool,
    node_set: Option<&NodeSet>,
) -> Result<Vec<u8>, Error> {
    let mut output = Vec::new();
    let walker = Walker {
        leaves: Leaves {
            with_comments,
            node_set,
        },
    };
    walker.process_node(doc.root(), &mut output, &BTreeMap::new());
    Ok(output)
}

struct Walker<'a> {
    leaves: Leaves<'a>,
}

impl Walker<'_> {
    fn process_node(
        &self,
        node: roxmltree::Node<'_, '_>,
        output: &mut Vec<u8>,
        rendered: &BTreeMap<String, String>,
    ) {
        match node.node_type() {
            roxmltree::NodeType::Root => {
                for child in node.children() {
                    self.process_node(child, output, rendered);
                }
            }
            roxmltree::NodeType::Element => self.process_element(node, output, rendered),
            _ => self.leaves.write_leaf(node, output),
        }
    }

    fn process_element(
        &self,
        node: roxmltree::Node<'_, '_>,
        output: &mut Vec<u8>,
        rendered: &BTreeMap<String, String>,
    ) {
        if !self.leaves.is_visible(&node) {
            // Omitted elements render nothing themselves; descendants still
            // compare against the nearest rendered ancestor.
            for child in node.children() {
                self.process_node(child, output, rendered);
            }
            return;
        }

        let in_scope = inscope_namespaces(node);
        let mut child_rendered = rendered.clone();
        let mut decls: Vec<NsDecl> = Vec::new();
        for (prefix, uri) in &in_scope {
            if rendered.get(prefix) != Some(uri) {
                decls.push(NsDecl {
                    prefix: prefix.clone(),
                    uri: uri.clone(),
                });
            }
            child_rendered.insert(prefix.clone(), uri.clone());
        }
        // A default namespace rendered above but absent here is undeclared.
        if !in_scope.contains_key("") && rendered.get("").is_some_and(|u| !u.is_empty()) {
            decls.push(NsDecl {
                prefix: String::new(),
                uri: String::new(),
            });
            child_rendered.insert(String::new(), String::new());
        }
        decls.sort();

        let mut attrs: Vec<Attr> = node
            .attributes()
            .map(|a| Attr::from_node(node, &a))
            .collect();
        if self.leaves.node_set.is_some() {
            let parent_omitted = node
                .parent()
                .map_or(true, |p| !p.is_element() || !self.leaves.is_visible(&p));
            if parent_omitted {
                inherit_xml_attrs(node, &mut attrs);
            }
        }
        attrs.sort();

        let name = element_qname(node);
        write_start_tag(output, &name, &decls, &attrs);
        for child in node.children() {
            self.process_node(child, output, &child_rendered);
        }
        write_end_tag(output, &name);
    }
}

/// Add `xml:*` attributes from ancestors, nearest first, unless the element
/// already carries one with the same name.
fn inherit_xml_attrs(node: roxmltree::Node<'_, '_>, attrs: &mut Vec<Attr>) {
    for ancestor in node.ancestors().skip(1).filter(|n| n.is_element()) {
        for attr in ancestor.attributes() {
            if attr.namespace() != Some(ns::XML) {
                continue;
            }
            let present = attrs
                .iter()
                .any(|a| a.ns_uri == ns::XML && a.local_name == attr.name());
            if !present {
                attrs.push(Attr::from_node(ancestor, &attr));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c14n(xml: &str) -> String {
        let doc = sigill_xml::parse(xml).unwrap();
        String::from_utf8(canonicalize(&doc, false, None).unwrap()).unwrap()
    }

    #[test]
    fn test_attribute_sorting_and_empty_elements() {
        assert_eq!(
            c14n(r#"<root><a b="1" a="2"/></root>"#),
            r#"<root><a a="2" b="1"></a></root>"#
        );
    }

    #[test]
    fn test_namespaces_rendered_once() {
        let out = c14n(r#"<r xmlns:b="urn:b" xmlns:a="urn:a"><a:c><b:d/></a:c></r>"#);
        assert_eq!(
            out,
            r#"<r xmlns:a="urn:a" xmlns:b="urn:b"><a:c><b:d></b:d></a:c></r>"#
        );
    }

    #[test]
    fn test_text_escaping() {
        assert_eq!(c14n("<root>a &amp; b &lt; c &gt; d</root>"), "<root>a &amp; b &lt; c &gt; d</root>");
        assert_eq!(c14n("<root>a&#xD;b</root>"), "<root>a&#xD;b</root>");
    }

    #[test]
    fn test_comments_dropped_or_kept() {
        let xml = "<!--before--><r><!--in-->x</r><!--after-->";
        let doc = sigill_xml::parse(xml).unwrap();
        let without = canonicalize(&doc, false, None).unwrap();
        assert_eq!(String::from_utf8(without).unwrap(), "<r>x</r>");
        let with = canonicalize(&doc, true, None).unwrap();
        assert_eq!(
            String::from_utf8(with).unwrap(),
            "<!--before-->\n<r><!--in-->x</r>\n<!--after-->"
        );
    }

    #[test]
    fn test_subset_inherits_namespaces_and_xml_attrs() {
        let xml = r#"<r xmlns="urn:d" xmlns:p="urn:p" xml:lang="en"><s><p:t a="1"/></s></r>"#;
        let doc = sigill_xml::parse(xml).unwrap();
        let s = doc.root_element().first_element_child().unwrap();
        let set = NodeSet::tree(s, false);
        let out = canonicalize(&doc, false, Some(&set)).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            r#"<s xmlns="urn:d" xmlns:p="urn:p" xml:lang="en"><p:t a="1"></p:t></s>"#
        );
    }

    #[test]
    fn test_default_namespace_undeclared() {
        let out = c14n(r#"<a xmlns="urn:x"><b xmlns=""><c/></b></a>"#);
        assert_eq!(out, r#"<a xmlns="urn:x"><b xmlns=""><c></c></b></a>"#);
    }

    #[test]
    fn test_superfluous_undeclaration_dropped() {
        assert_eq!(c14n(r#"<a><b xmlns=""/></a>"#), "<a><b></b></a>");
    }
}
