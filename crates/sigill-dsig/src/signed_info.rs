#![forbid(unsafe_code)]

//! The `<SignedInfo>` element.

use crate::reference::Reference;
use sigill_core::{algorithm, ns, Error};
use sigill_xml::document::{find_child_element, find_child_elements, text_content};
use sigill_xml::XmlWriter;

/// What the signature value covers: the canonicalization and signature
/// methods plus the ordered references.
#[derive(Debug, Clone)]
pub struct SignedInfo {
    pub id: Option<String>,
    pub canonicalization_method: String,
    /// Exclusive C14N InclusiveNamespaces PrefixList.
    pub inclusive_prefixes: Vec<String>,
    /// `None` until declared, or inferred from the key at compute time.
    pub signature_method: Option<String>,
    /// Raw `HMACOutputLength` text, validated when used.
    pub hmac_output_length: Option<String>,
    references: Vec<Reference>,
}

impl Default for SignedInfo {
    fn default() -> Self {
        Self {
            id: None,
            canonicalization_method: algorithm::C14N.to_owned(),
            inclusive_prefixes: Vec::new(),
            signature_method: None,
            hmac_output_length: None,
            references: Vec::new(),
        }
    }
}

impl SignedInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_reference(&mut self, reference: Reference) {
        self.references.push(reference);
    }

    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    pub fn references_mut(&mut self) -> &mut [Reference] {
        &mut self.references
    }

    /// Parse a `<SignedInfo>` element.
    pub fn from_node(node: roxmltree::Node<'_, '_>) -> Result<Self, Error> {
        let c14n = find_child_element(node, ns::DSIG, ns::node::CANONICALIZATION_METHOD)
            .ok_or_else(|| {
                Error::MalformedSignature("SignedInfo without CanonicalizationMethod".into())
            })?;
        let canonicalization_method = c14n.attribute(ns::attr::ALGORITHM).ok_or_else(|| {
            Error::MalformedSignature("CanonicalizationMethod without Algorithm".into())
        })?;
        let inclusive_prefixes = find_child_element(c14n, ns::EXC_C14N, ns::node::INCLUSIVE_NAMESPACES)
            .and_then(|n| n.attribute(ns::attr::PREFIX_LIST))
            .map(|list| list.split_whitespace().map(str::to_owned).collect())
            .unwrap_or_default();

        let method = find_child_element(node, ns::DSIG, ns::node::SIGNATURE_METHOD)
            .ok_or_else(|| Error::MalformedSignature("SignedInfo without SignatureMethod".into()))?;
        let hmac_output_length = find_child_element(method, ns::DSIG, ns::node::HMAC_OUTPUT_LENGTH)
            .map(|n| text_content(n).trim().to_owned());

        let references = find_child_elements(node, ns::DSIG, ns::node::REFERENCE)
            .into_iter()
            .map(Reference::from_node)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id: node.attribute(ns::attr::ID).map(str::to_owned),
            canonicalization_method: canonicalization_method.to_owned(),
            inclusive_prefixes,
            signature_method: method.attribute(ns::attr::ALGORITHM).map(str::to_owned),
            hmac_output_length,
            references,
        })
    }

    /// Write the element. The writer's default namespace must be dsig.
    pub fn write(&self, w: &mut XmlWriter) {
        let mut attrs: Vec<(&str, &str)> = Vec::new();
        if let Some(id) = &self.id {
            attrs.push((ns::attr::ID, id));
        }
        w.start_element(ns::node::SIGNED_INFO, &attrs);

        let c14n_attrs = [(ns::attr::ALGORITHM, self.canonicalization_method.as_str())];
        if self.inclusive_prefixes.is_empty() {
            w.empty_element(ns::node::CANONICALIZATION_METHOD, &c14n_attrs);
        } else {
            let list = self.inclusive_prefixes.join(" ");
            w.start_element(ns::node::CANONICALIZATION_METHOD, &c14n_attrs);
            w.empty_element(
                ns::node::INCLUSIVE_NAMESPACES,
                &[("xmlns", ns::EXC_C14N), (ns::attr::PREFIX_LIST, &list)],
            );
            w.end_element(ns::node::CANONICALIZATION_METHOD);
        }

        let mut method_attrs: Vec<(&str, &str)> = Vec::new();
        if let Some(method) = &self.signature_method {
            method_attrs.push((ns::attr::ALGORITHM, method));
        }
        match &self.hmac_output_length {
            Some(bits) => {
                w.start_element(ns::node::SIGNATURE_METHOD, &method_attrs);
                w.text_element(ns::node::HMAC_OUTPUT_LENGTH, &[], bits);
                w.end_element(ns::node::SIGNATURE_METHOD);
            }
            None => w.empty_element(ns::node::SIGNATURE_METHOD, &method_attrs),
        }

        for reference in &self.references {
            reference.write(w);
        }
        w.end_element(ns::node::SIGNED_INFO);
    }
}
