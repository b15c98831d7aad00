#![forbid(unsafe_code)]

//! Recover lexical prefixes from the source text.
//!
//! roxmltree resolves names to (namespace, local) pairs and drops the prefix
//! an element or attribute was written with. Canonical output must reproduce
//! that prefix, so it is read back from the node's source range.

use sigill_core::ns;

/// Namespace URI of an element; `xmlns=""` reads back as no namespace.
pub fn element_namespace<'a>(node: roxmltree::Node<'a, '_>) -> Option<&'a str> {
    node.tag_name().namespace().filter(|uri| !uri.is_empty())
}

/// The prefix an element was written with, if any.
pub fn element_prefix<'a, 'input: 'a>(node: roxmltree::Node<'a, 'input>) -> Option<&'a str> {
    let ns_uri = element_namespace(node)?;
    let src = node.document().input_text();
    let rest = src.get(node.range().start..)?.strip_prefix('<')?;
    let end = rest
        .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
        .unwrap_or(rest.len());
    match rest[..end].split_once(':') {
        Some((prefix, local)) if local == node.tag_name().name() => Some(prefix),
        Some(_) => node.lookup_prefix(ns_uri),
        None => None,
    }
}

/// Qualified name of an element: `prefix:local` or `local`.
pub fn element_qname(node: roxmltree::Node<'_, '_>) -> String {
    match element_prefix(node) {
        Some(prefix) => format!("{prefix}:{}", node.tag_name().name()),
        None => node.tag_name().name().to_owned(),
    }
}

/// The prefix an attribute was written with, if any.
pub fn attribute_prefix<'a, 'input: 'a>(
    node: roxmltree::Node<'a, 'input>,
    attr: &roxmltree::Attribute<'a, 'input>,
) -> Option<&'a str> {
    let ns_uri = attr.namespace()?;
    if ns_uri == ns::XML {
        return Some("xml");
    }
    let src = node.document().input_text();
    match src.get(attr.range_qname()).and_then(|q| q.split_once(':')) {
        Some((prefix, local)) if local == attr.name() => Some(prefix),
        // Attributes without a prefix are never in a namespace, so any
        // namespaced attribute has one somewhere in scope.
        _ => node
            .namespaces()
            .find(|n| n.uri() == ns_uri && n.name().is_some())
            .and_then(|n| n.name()),
    }
}

/// Qualified name of an attribute: `prefix:local` or `local`.
pub fn attribute_qname(node: roxmltree::Node<'_, '_>, attr: &roxmltree::Attribute<'_, '_>) -> String {
    match attribute_prefix(node, attr) {
        Some(prefix) => format!("{prefix}:{}", attr.name()),
        None => attr.name().to_owned(),
    }
}
