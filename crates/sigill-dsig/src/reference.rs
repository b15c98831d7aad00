#![forbid(unsafe_code)]

//! The `<Reference>` element and its `<Transforms>`.

use crate::decode_base64;
use base64::Engine;
use sigill_core::{algorithm, ns, Error};
use sigill_transforms::{TransformParams, XPathExpr};
use sigill_xml::document::{find_child_element, find_child_elements, text_content};
use sigill_xml::XmlWriter;

/// One `<Reference>` of a SignedInfo.
///
/// `digest_value` stays `None` until the reference is digested by
/// `compute_signature` or read from a loaded signature.
#[derive(Debug, Clone)]
pub struct Reference {
    pub id: Option<String>,
    /// `None` omits the attribute; it resolves like `""`.
    pub uri: Option<String>,
    pub type_uri: Option<String>,
    transforms: Vec<TransformParams>,
    pub digest_method: String,
    pub digest_value: Option<Vec<u8>>,
}

impl Default for Reference {
    fn default() -> Self {
        Self {
            id: None,
            uri: None,
            type_uri: None,
            transforms: Vec::new(),
            digest_method: algorithm::SHA1.to_owned(),
            digest_value: None,
        }
    }
}

impl Reference {
    pub fn new(uri: &str) -> Self {
        Self {
            uri: Some(uri.to_owned()),
            ..Self::default()
        }
    }

    pub fn with_digest_method(mut self, method: &str) -> Self {
        self.digest_method = method.to_owned();
        self
    }

    /// Append a transform that takes no parameters.
    pub fn add_transform(&mut self, algorithm: &str) {
        self.transforms.push(TransformParams {
            algorithm: algorithm.to_owned(),
            ..TransformParams::default()
        });
    }

    /// Append a transform with parameters (PrefixList, XPath expression).
    pub fn add_transform_params(&mut self, params: TransformParams) {
        self.transforms.push(params);
    }

    pub fn transforms(&self) -> &[TransformParams] {
        &self.transforms
    }

    /// The URI as used for resolution.
    pub fn resolution_uri(&self) -> &str {
        self.uri.as_deref().unwrap_or("")
    }

    /// Parse a `<Reference>` element.
    pub fn from_node(node: roxmltree::Node<'_, '_>) -> Result<Self, Error> {
        let digest_method = find_child_element(node, ns::DSIG, ns::node::DIGEST_METHOD)
            .and_then(|n| n.attribute(ns::attr::ALGORITHM))
            .ok_or_else(|| Error::MalformedSignature("Reference without DigestMethod".into()))?;
        let digest_node = find_child_element(node, ns::DSIG, ns::node::DIGEST_VALUE)
            .ok_or_else(|| Error::MalformedSignature("Reference without DigestValue".into()))?;
        let digest_value = decode_base64(&text_content(digest_node), ns::node::DIGEST_VALUE)?;

        let mut transforms = Vec::new();
        if let Some(list) = find_child_element(node, ns::DSIG, ns::node::TRANSFORMS) {
            for t in find_child_elements(list, ns::DSIG, ns::node::TRANSFORM) {
                transforms.push(parse_transform(t)?);
            }
        }

        Ok(Self {
            id: node.attribute(ns::attr::ID).map(str::to_owned),
            uri: node.attribute(ns::attr::URI).map(str::to_owned),
            type_uri: node.attribute(ns::attr::TYPE).map(str::to_owned),
            transforms,
            digest_method: digest_method.to_owned(),
            digest_value: Some(digest_value),
        })
    }

    /// Write the element. The writer's default namespace must be dsig.
    pub fn write(&self, w: &mut XmlWriter) {
        let mut attrs: Vec<(&str, &str)> = Vec::new();
        if let Some(id) = &self.id {
            attrs.push((ns::attr::ID, id));
        }
        if let Some(uri) = &self.uri {
            attrs.push((ns::attr::URI, uri));
        }
        if let Some(t) = &self.type_uri {
            attrs.push((ns::attr::TYPE, t));
        }
        w.start_element(ns::node::REFERENCE, &attrs);
        if !self.transforms.is_empty() {
            w.start_element(ns::node::TRANSFORMS, &[]);
            for t in &self.transforms {
                write_transform(w, t);
            }
            w.end_element(ns::node::TRANSFORMS);
        }
        w.empty_element(
            ns::node::DIGEST_METHOD,
            &[(ns::attr::ALGORITHM, &self.digest_method)],
        );
        match &self.digest_value {
            Some(value) => w.text_element(
                ns::node::DIGEST_VALUE,
                &[],
                &base64::engine::general_purpose::STANDARD.encode(value),
            ),
            None => w.empty_element(ns::node::DIGEST_VALUE, &[]),
        }
        w.end_element(ns::node::REFERENCE);
    }
}

// ── Transforms ───────────────────────────────────────────────────────

fn parse_transform(node: roxmltree::Node<'_, '_>) -> Result<TransformParams, Error> {
    let algorithm = node
        .attribute(ns::attr::ALGORITHM)
        .ok_or_else(|| Error::MalformedSignature("Transform without Algorithm".into()))?;

    let inclusive_prefixes = find_child_element(node, ns::EXC_C14N, ns::node::INCLUSIVE_NAMESPACES)
        .and_then(|n| n.attribute(ns::attr::PREFIX_LIST))
        .map(|list| list.split_whitespace().map(str::to_owned).collect())
        .unwrap_or_default();

    let xpath = find_child_element(node, ns::DSIG, ns::node::XPATH).map(|x| {
        let mut expr = XPathExpr::new(text_content(x).trim());
        for decl in x.namespaces() {
            if let Some(prefix) = decl.name() {
                expr = expr.with_namespace(prefix, decl.uri());
            }
        }
        expr
    });

    Ok(TransformParams {
        algorithm: algorithm.to_owned(),
        inclusive_prefixes,
        xpath,
        signature_ordinal: 0,
    })
}

fn write_transform(w: &mut XmlWriter, t: &TransformParams) {
    let attrs = [(ns::attr::ALGORITHM, t.algorithm.as_str())];
    if t.inclusive_prefixes.is_empty() && t.xpath.is_none() {
        w.empty_element(ns::node::TRANSFORM, &attrs);
        return;
    }
    w.start_element(ns::node::TRANSFORM, &attrs);
    if !t.inclusive_prefixes.is_empty() {
        let list = t.inclusive_prefixes.join(" ");
        w.empty_element(
            ns::node::INCLUSIVE_NAMESPACES,
            &[("xmlns", ns::EXC_C14N), (ns::attr::PREFIX_LIST, &list)],
        );
    }
    if let Some(xpath) = &t.xpath {
        let decls: Vec<(String, &str)> = xpath
            .namespaces
            .iter()
            .map(|(prefix, uri)| (format!("xmlns:{prefix}"), uri.as_str()))
            .collect();
        let attrs: Vec<(&str, &str)> = decls.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        w.text_element(ns::node::XPATH, &attrs, &xpath.expression);
    }
    w.end_element(ns::node::TRANSFORM);
}
