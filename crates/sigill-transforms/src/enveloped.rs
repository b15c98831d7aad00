#![forbid(unsafe_code)]

//! Enveloped signature transform, and the XPath transform that spells it
//! `not(ancestor-or-self::dsig:Signature)`.

use crate::pipeline::{Transform, TransformData, TransformParams, XPathExpr};
use sigill_core::{algorithm, ns, Error};
use sigill_xml::document::find_elements;
use sigill_xml::NodeSet;

/// Removes one `<Signature>` element and its descendants from the node set.
///
/// The signature is identified by its 1-based position among the
/// `dsig:Signature` elements of the input document, so sibling signatures
/// stay in the signed content.
pub struct EnvelopedSignatureTransform {
    ordinal: usize,
}

impl EnvelopedSignatureTransform {
    pub fn new(ordinal: usize) -> Self {
        Self { ordinal }
    }

    pub fn from_params(params: &TransformParams) -> Self {
        Self::new(params.signature_ordinal)
    }
}

impl Transform for EnvelopedSignatureTransform {
    fn uri(&self) -> &str {
        algorithm::ENVELOPED_SIGNATURE
    }

    fn execute(&self, input: TransformData) -> Result<TransformData, Error> {
        let TransformData::Xml { xml_text, node_set } = input else {
            return Err(Error::Transform(
                "enveloped-signature transform requires XML input".into(),
            ));
        };
        let doc = sigill_xml::parse(&xml_text)?;
        let mut set = node_set.unwrap_or_else(|| NodeSet::all(&doc));
        let signatures = find_elements(&doc, ns::DSIG, ns::node::SIGNATURE);
        match self.ordinal.checked_sub(1).and_then(|i| signatures.get(i)) {
            Some(sig) => {
                tracing::debug!(ordinal = self.ordinal, "removing enveloped signature");
                set.remove_subtree(*sig);
            }
            None => tracing::debug!(
                ordinal = self.ordinal,
                found = signatures.len(),
                "no enveloped signature to remove"
            ),
        }
        Ok(TransformData::Xml {
            xml_text,
            node_set: Some(set),
        })
    }
}

/// XPath filter transform.
///
/// Only the enveloped-signature idiom is evaluated; any other expression is
/// rejected.
pub struct XPathTransform {
    expr: XPathExpr,
    ordinal: usize,
}

impl XPathTransform {
    pub fn from_params(params: &TransformParams) -> Result<Self, Error> {
        let expr = params
            .xpath
            .clone()
            .ok_or_else(|| Error::Transform("XPath transform without an expression".into()))?;
        Ok(Self {
            expr,
            ordinal: params.signature_ordinal,
        })
    }
}

impl Transform for XPathTransform {
    fn uri(&self) -> &str {
        algorithm::XPATH
    }

    fn execute(&self, input: TransformData) -> Result<TransformData, Error> {
        if is_enveloped_xpath(&self.expr) {
            return EnvelopedSignatureTransform::new(self.ordinal).execute(input);
        }
        Err(Error::UnsupportedAlgorithm(format!(
            "XPath expression not supported: {}",
            self.expr.expression
        )))
    }
}

/// Whether `expr` is `not(ancestor-or-self::P:Signature)` with `P` bound to
/// the XML-DSig namespace.
pub fn is_enveloped_xpath(expr: &XPathExpr) -> bool {
    let compact: String = expr
        .expression
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    compact
        .strip_prefix("not(ancestor-or-self::")
        .and_then(|s| s.strip_suffix(":Signature)"))
        .is_some_and(|prefix| expr.lookup(prefix) == Some(ns::DSIG))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_SIGS: &str = concat!(
        r#"<doc xmlns:ds="http://www.w3.org/2000/09/xmldsig#">"#,
        "<data>x</data>",
        "<ds:Signature><ds:SignatureValue>A</ds:SignatureValue></ds:Signature>",
        "<ds:Signature><ds:SignatureValue>B</ds:SignatureValue></ds:Signature>",
        "</doc>"
    );

    fn run(t: &dyn Transform) -> String {
        let out = t
            .execute(TransformData::Xml {
                xml_text: TWO_SIGS.into(),
                node_set: None,
            })
            .unwrap();
        String::from_utf8(out.to_binary().unwrap()).unwrap()
    }

    #[test]
    fn test_removes_only_its_own_signature() {
        let out = run(&EnvelopedSignatureTransform::new(2));
        assert!(out.contains("<ds:SignatureValue>A</ds:SignatureValue>"));
        assert!(!out.contains(">B<"));

        let out = run(&EnvelopedSignatureTransform::new(1));
        assert!(!out.contains(">A<"));
        assert!(out.contains("<ds:SignatureValue>B</ds:SignatureValue>"));
    }

    #[test]
    fn test_ordinal_past_end_is_noop() {
        let out = run(&EnvelopedSignatureTransform::new(3));
        assert!(out.contains(">A<") && out.contains(">B<"));
    }

    #[test]
    fn test_binary_input_rejected() {
        let err = EnvelopedSignatureTransform::new(1)
            .execute(TransformData::Binary(b"x".to_vec()))
            .unwrap_err();
        assert!(matches!(err, Error::Transform(_)));
    }

    #[test]
    fn test_enveloped_xpath_idiom() {
        let ok = XPathExpr::new(" not( ancestor-or-self::dsig:Signature ) ")
            .with_namespace("dsig", ns::DSIG);
        assert!(is_enveloped_xpath(&ok));

        let unbound = XPathExpr::new("not(ancestor-or-self::dsig:Signature)");
        assert!(!is_enveloped_xpath(&unbound));

        let other = XPathExpr::new("//foo").with_namespace("dsig", ns::DSIG);
        assert!(!is_enveloped_xpath(&other));
    }

    #[test]
    fn test_xpath_transform() {
        let params = TransformParams {
            algorithm: algorithm::XPATH.into(),
            xpath: Some(
                XPathExpr::new("not(ancestor-or-self::ds:Signature)")
                    .with_namespace("ds", ns::DSIG),
            ),
            signature_ordinal: 1,
            ..Default::default()
        };
        let out = run(&XPathTransform::from_params(&params).unwrap());
        assert!(!out.contains(">A<"));

        let params = TransformParams {
            xpath: Some(XPathExpr::new("self::text()")),
            ..params
        };
        let err = XPathTransform::from_params(&params)
            .unwrap()
            .execute(TransformData::Binary(Vec::new()))
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedAlgorithm(_)));
    }
}
