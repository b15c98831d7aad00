#![forbid(unsafe_code)]

//! Exclusive Canonical XML 1.0 (exc-C14N).
//!
//! Algorithm URI: `http://www.w3.org/2001/10/xml-exc-c14n#`
//! With comments: `http://www.w3.org/2001/10/xml-exc-c14n#WithComments`
//!
//! Only visibly utilized namespaces are rendered: the prefix of the element
//! itself, the prefixes of its attributes, and anything named in the
//! InclusiveNamespaces PrefixList (`#default` standing for the default
//! namespace).

use crate::render::{inscope_namespaces, write_end_tag, write_start_tag, Attr, Leaves, NsDecl};
use sigill_core::Error;
use sigill_xml::qname::{attribute_prefix, element_prefix, element_qname};
use sigill_xml::NodeSet;
use std::collections::{BTreeMap, BTreeSet};

/// Canonicalize using Exclusive C14N 1.0.
pub fn canonicalize(
    doc: &roxmltree::Document<'_>,
    with_comments: bool,
    node_set: Option<&NodeSet>,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>, Error> {
    let inclusive = inclusive_prefixes
        .iter()
        .map(|p| if p == "#default" { String::new() } else { p.clone() })
        .collect();
    let walker = Walker {
        leaves: Leaves {
            with_comments,
            node_set,
        },
        inclusive,
    };
    let mut output = Vec::new();
    walker.process_node(doc.root(), &mut output, &BTreeMap::new());
    Ok(output)
}

struct Walker<'a> {
    leaves: Leaves<'a>,
    inclusive: BTreeSet<String>,
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
            for child in node.children() {
                self.process_node(child, output, rendered);
            }
            return;
        }

        let mut utilized: BTreeSet<String> = self.inclusive.clone();
        utilized.insert(element_prefix(node).unwrap_or("").to_owned());
        for attr in node.attributes() {
            if let Some(prefix) = attribute_prefix(node, &attr) {
                if prefix != "xml" {
                    utilized.insert(prefix.to_owned());
                }
            }
        }

        let in_scope = inscope_namespaces(node);
        let mut child_rendered = rendered.clone();
        let mut decls: Vec<NsDecl> = Vec::new();
        for prefix in &utilized {
            match in_scope.get(prefix) {
                Some(uri) => {
                    if rendered.get(prefix) != Some(uri) {
                        decls.push(NsDecl {
                            prefix: prefix.clone(),
                            uri: uri.clone(),
                        });
                        child_rendered.insert(prefix.clone(), uri.clone());
                    }
                }
                None if prefix.is_empty() => {
                    if rendered.get("").is_some_and(|u| !u.is_empty()) {
                        decls.push(NsDecl {
                            prefix: String::new(),
                            uri: String::new(),
                        });
                        child_rendered.insert(String::new(), String::new());
                    }
                }
                None => {}
            }
        }
        decls.sort();

        let mut attrs: Vec<Attr> = node
            .attributes()
            .map(|a| Attr::from_node(node, &a))
            .collect();
        attrs.sort();

        let name = element_qname(node);
        write_start_tag(output, &name, &decls, &attrs);
        for child in node.children() {
            self.process_node(child, output, &child_rendered);
        }
        write_end_tag(output, &name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exc(xml: &str, prefixes: &[&str]) -> String {
        let doc = sigill_xml::parse(xml).unwrap();
        let prefixes: Vec<String> = prefixes.iter().map(|p| p.to_string()).collect();
        String::from_utf8(canonicalize(&doc, false, None, &prefixes).unwrap()).unwrap()
    }

    #[test]
    fn test_unused_namespaces_dropped() {
        let out = exc(r#"<r xmlns:a="urn:a" xmlns:b="urn:b"><a:c/></r>"#, &[]);
        assert_eq!(out, r#"<r><a:c xmlns:a="urn:a"></a:c></r>"#);
    }

    #[test]
    fn test_inclusive_prefix_list() {
        let out = exc(r#"<r xmlns:a="urn:a" xmlns:b="urn:b"><a:c/></r>"#, &["b"]);
        assert_eq!(out, r#"<r xmlns:b="urn:b"><a:c xmlns:a="urn:a"></a:c></r>"#);
    }

    #[test]
    fn test_default_keyword() {
        let out = exc(r#"<r xmlns="urn:d" xmlns:a="urn:a"><a:c/></r>"#, &["#default"]);
        assert_eq!(out, r#"<r xmlns="urn:d"><a:c xmlns:a="urn:a"></a:c></r>"#);
    }

    #[test]
    fn test_attribute_prefix_utilized() {
        let out = exc(r#"<r xmlns:a="urn:a"><c a:x="1"/></r>"#, &[]);
        assert_eq!(out, r#"<r><c xmlns:a="urn:a" a:x="1"></c></r>"#);
    }

    #[test]
    fn test_subset_declares_inherited_default() {
        let xml = r#"<Signature xmlns="urn:dsig"><SignedInfo><Ref/></SignedInfo></Signature>"#;
        let doc = sigill_xml::parse(xml).unwrap();
        let si = doc.root_element().first_element_child().unwrap();
        let set = NodeSet::tree(si, false);
        let out = canonicalize(&doc, false, Some(&set), &[]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            r#"<SignedInfo xmlns="urn:dsig"><Ref></Ref></SignedInfo>"#
        );
    }

    #[test]
    fn test_undeclare_default_when_rendered() {
        let out = exc(r#"<a xmlns="urn:x"><b xmlns=""/></a>"#, &[]);
        assert_eq!(out, r#"<a xmlns="urn:x"><b xmlns=""></b></a>"#);
    }

    #[test]
    fn test_carriage_returns_escaped() {
        let out = exc("<person>&#xD;\n  <birthplace>Brussels</birthplace>&#xD;\n</person>", &[]);
        assert_eq!(
            out,
            "<person>&#xD;\n  <birthplace>Brussels</birthplace>&#xD;\n</person>"
        );
    }
}
