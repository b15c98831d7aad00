#![forbid(unsafe_code)]

//! The signature context: the in-memory `<Signature>` and everything
//! needed to compute or check it.

use crate::decode_base64;
use crate::object::DataObject;
use crate::reference::Reference;
use crate::signed_info::SignedInfo;
use base64::Engine;
use sigill_c14n::C14nMode;
use sigill_core::{ns, Error};
use sigill_crypto::AlgorithmRegistry;
use sigill_keys::{Key, KeyInfo};
use sigill_xml::document::{
    find_child_element, find_child_elements, find_element, find_elements, text_content,
};
use sigill_xml::qname::element_qname;
use sigill_xml::{AttributeIdResolver, IdResolver, NodeSet, XmlDocument, XmlWriter};
use std::fmt;
use std::sync::Arc;

/// Text a signature was loaded from, and which `dsig:Signature` in it.
#[derive(Debug, Clone)]
pub(crate) struct LoadedSignature {
    pub text: String,
    pub ordinal: usize,
}

/// An XML signature being built or checked.
///
/// A context is filled either by the caller (references, objects, key info)
/// before [`compute_signature`](SignatureContext::compute_signature), or by
/// [`load_xml`](SignatureContext::load_xml) before one of the `check_*`
/// calls. The signature value is only present after one of those succeeds.
pub struct SignatureContext {
    pub(crate) document: Option<XmlDocument>,
    pub(crate) registry: Arc<AlgorithmRegistry>,
    pub(crate) id_resolver: Arc<dyn IdResolver>,
    pub(crate) signed_info: Option<SignedInfo>,
    pub(crate) key_info: Option<KeyInfo>,
    pub(crate) objects: Vec<DataObject>,
    pub(crate) signature_value: Option<Vec<u8>>,
    pub(crate) signing_key: Option<Key>,
    signing_key_name: Option<String>,
    /// `Id` attribute of the `<Signature>` element.
    pub id: Option<String>,
    pub(crate) loaded: Option<LoadedSignature>,
}

impl Default for SignatureContext {
    fn default() -> Self {
        Self {
            document: None,
            registry: Arc::new(AlgorithmRegistry::with_defaults()),
            id_resolver: Arc::new(AttributeIdResolver::new()),
            signed_info: None,
            key_info: None,
            objects: Vec::new(),
            signature_value: None,
            signing_key: None,
            signing_key_name: None,
            id: None,
            loaded: None,
        }
    }
}

impl fmt::Debug for SignatureContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureContext")
            .field("has_document", &self.document.is_some())
            .field("signed_info", &self.signed_info)
            .field("key_info", &self.key_info)
            .field("objects", &self.objects.len())
            .field("has_signature_value", &self.signature_value.is_some())
            .field("signing_key", &self.signing_key)
            .field("signing_key_name", &self.signing_key_name)
            .field("loaded", &self.loaded.is_some())
            .finish()
    }
}

impl SignatureContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sign or verify in the context of `document`: enveloped references
    /// and `#id` lookups resolve against it first.
    pub fn with_document(mut self, document: XmlDocument) -> Self {
        self.document = Some(document);
        self
    }

    pub fn with_registry(mut self, registry: Arc<AlgorithmRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_id_resolver(mut self, resolver: Arc<dyn IdResolver>) -> Self {
        self.id_resolver = resolver;
        self
    }

    pub fn with_signing_key(mut self, key: Key) -> Self {
        self.signing_key = Some(key);
        self
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn document(&self) -> Option<&XmlDocument> {
        self.document.as_ref()
    }

    pub fn registry(&self) -> &AlgorithmRegistry {
        &self.registry
    }

    pub fn set_signing_key(&mut self, key: Option<Key>) {
        self.signing_key = key;
    }

    pub fn signing_key(&self) -> Option<&Key> {
        self.signing_key.as_ref()
    }

    pub fn signing_key_name(&self) -> Option<&str> {
        self.signing_key_name.as_deref()
    }

    pub fn set_signing_key_name(&mut self, name: Option<String>) {
        self.signing_key_name = name;
    }

    pub fn signed_info(&self) -> Option<&SignedInfo> {
        self.signed_info.as_ref()
    }

    /// Mutable SignedInfo, created empty on first use. Editing it detaches
    /// the context from any loaded signature text.
    pub fn signed_info_mut(&mut self) -> &mut SignedInfo {
        self.loaded = None;
        self.signed_info.get_or_insert_with(SignedInfo::default)
    }

    pub fn key_info(&self) -> Option<&KeyInfo> {
        self.key_info.as_ref()
    }

    pub fn set_key_info(&mut self, key_info: Option<KeyInfo>) {
        self.key_info = key_info;
    }

    pub fn objects(&self) -> &[DataObject] {
        &self.objects
    }

    pub fn signature_value(&self) -> Option<&[u8]> {
        self.signature_value.as_deref()
    }

    /// The declared `SignatureMethod`, if any.
    pub fn signature_method(&self) -> Option<&str> {
        self.signed_info.as_ref()?.signature_method.as_deref()
    }

    /// Append a reference to the SignedInfo.
    pub fn add_reference(&mut self, reference: Option<Reference>) -> Result<(), Error> {
        let reference = reference
            .ok_or_else(|| Error::MalformedSignature("reference must not be null".into()))?;
        self.signed_info_mut().add_reference(reference);
        Ok(())
    }

    /// Append an object. `None` is ignored.
    pub fn add_object(&mut self, object: Option<DataObject>) {
        if let Some(object) = object {
            self.loaded = None;
            self.objects.push(object);
        }
    }

    /// Find the element whose id is `id`, through the installed resolver.
    pub fn get_id_element<'a, 'input>(
        &self,
        doc: &'a roxmltree::Document<'input>,
        id: &str,
    ) -> Option<roxmltree::Node<'a, 'input>> {
        if id.is_empty() {
            return None;
        }
        self.id_resolver.get_id_element(doc, id)
    }

    // ── Loading ──────────────────────────────────────────────────────

    /// Parse the first `dsig:Signature` in `text` into this context.
    ///
    /// When no document is set, `text` becomes the document, so an
    /// enveloped signature can be checked straight away.
    pub fn load_xml(&mut self, text: &str) -> Result<(), Error> {
        if text.trim().is_empty() {
            return Err(Error::MalformedSignature("empty signature XML".into()));
        }
        let doc = sigill_xml::parse(text)?;
        let sig = find_element(&doc, ns::DSIG, ns::node::SIGNATURE)
            .ok_or_else(|| Error::MalformedSignature("no Signature element".into()))?;

        let si_node = find_child_element(sig, ns::DSIG, ns::node::SIGNED_INFO)
            .ok_or_else(|| Error::MalformedSignature("Signature without SignedInfo".into()))?;
        let signed_info = SignedInfo::from_node(si_node)?;

        let value_node = find_child_element(sig, ns::DSIG, ns::node::SIGNATURE_VALUE)
            .ok_or_else(|| Error::MalformedSignature("Signature without SignatureValue".into()))?;
        let signature_value = decode_base64(&text_content(value_node), ns::node::SIGNATURE_VALUE)?;

        let key_info = find_child_element(sig, ns::DSIG, ns::node::KEY_INFO)
            .map(KeyInfo::from_node)
            .transpose()?;
        let objects = find_child_elements(sig, ns::DSIG, ns::node::OBJECT)
            .into_iter()
            .map(DataObject::from_node)
            .collect::<Vec<_>>();

        tracing::debug!(
            references = signed_info.references().len(),
            objects = objects.len(),
            has_key_info = key_info.is_some(),
            "loaded signature"
        );

        self.id = sig.attribute(ns::attr::ID).map(str::to_owned);
        self.signed_info = Some(signed_info);
        self.signature_value = Some(signature_value);
        self.key_info = key_info;
        self.objects = objects;
        if self.document.is_none() {
            self.document = Some(XmlDocument::parse(text.to_owned())?);
        }
        self.loaded = Some(LoadedSignature {
            text: text.to_owned(),
            ordinal: 1,
        });
        Ok(())
    }

    // ── Serialization ────────────────────────────────────────────────

    /// The `<Signature>` element as XML text.
    pub fn get_xml(&self) -> Result<String, Error> {
        let si = self.signed_info.as_ref().ok_or(Error::MissingSignedInfo)?;
        Ok(self.signature_xml(si, self.signature_value.as_deref()))
    }

    /// A copy of the document with the signature appended as the last
    /// child of its root element.
    pub fn signed_document(&self) -> Result<String, Error> {
        let document = self
            .document
            .as_ref()
            .ok_or_else(|| Error::MalformedSignature("no document to sign".into()))?;
        append_to_root(document.text(), &self.get_xml()?)
    }

    pub(crate) fn signature_xml(&self, si: &SignedInfo, value: Option<&[u8]>) -> String {
        let mut attrs: Vec<(&str, &str)> = vec![("xmlns", ns::DSIG)];
        if let Some(id) = &self.id {
            attrs.push((ns::attr::ID, id));
        }
        let mut w = XmlWriter::new();
        w.start_element(ns::node::SIGNATURE, &attrs);
        si.write(&mut w);
        match value {
            Some(v) => w.text_element(
                ns::node::SIGNATURE_VALUE,
                &[],
                &base64::engine::general_purpose::STANDARD.encode(v),
            ),
            None => w.empty_element(ns::node::SIGNATURE_VALUE, &[]),
        }
        if let Some(key_info) = self.key_info.as_ref().filter(|k| !k.is_empty()) {
            key_info.write(&mut w);
        }
        for object in &self.objects {
            object.write(&mut w);
        }
        w.end_element(ns::node::SIGNATURE);
        w.into_string()
    }

    /// The text the signature occupies when it is not loaded: appended to
    /// the document when there is one, on its own otherwise. Returns the
    /// text and the 1-based position of the signature in it.
    pub(crate) fn placed_signature(
        &self,
        si: &SignedInfo,
        value: Option<&[u8]>,
    ) -> Result<(String, usize), Error> {
        let sig = self.signature_xml(si, value);
        match &self.document {
            Some(document) => {
                let ordinal = count_signatures(document.text())? + 1;
                Ok((append_to_root(document.text(), &sig)?, ordinal))
            }
            None => Ok((sig, 1)),
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

fn count_signatures(text: &str) -> Result<usize, Error> {
    let doc = sigill_xml::parse(text)?;
    Ok(find_elements(&doc, ns::DSIG, ns::node::SIGNATURE).len())
}

/// Insert `fragment` as the last child of the root element of `text`.
pub(crate) fn append_to_root(text: &str, fragment: &str) -> Result<String, Error> {
    let doc = sigill_xml::parse(text)?;
    let root = doc.root_element();
    let range = root.range();
    let element = &text[range.clone()];

    let mut out = String::with_capacity(text.len() + fragment.len() + 16);
    out.push_str(&text[..range.start]);
    if element.ends_with("/>") {
        out.push_str(element[..element.len() - 2].trim_end());
        out.push('>');
        out.push_str(fragment);
        out.push_str("</");
        out.push_str(&element_qname(root));
        out.push('>');
    } else {
        let close = element
            .rfind("</")
            .ok_or_else(|| Error::XmlParse("root element has no end tag".into()))?;
        out.push_str(&element[..close]);
        out.push_str(fragment);
        out.push_str(&element[close..]);
    }
    out.push_str(&text[range.end..]);
    Ok(out)
}

/// Canonical SignedInfo of the `ordinal`-th signature in `text`, rendered
/// as a subset of that document so inherited namespaces are honoured.
pub(crate) fn canonical_signed_info(
    text: &str,
    ordinal: usize,
    si: &SignedInfo,
) -> Result<Vec<u8>, Error> {
    let method = si.canonicalization_method.as_str();
    let mode = C14nMode::from_uri(method)
        .ok_or_else(|| Error::UnsupportedAlgorithm(format!("C14N: {method}")))?;
    let doc = sigill_xml::parse(text)?;
    let signatures = find_elements(&doc, ns::DSIG, ns::node::SIGNATURE);
    let sig = ordinal
        .checked_sub(1)
        .and_then(|i| signatures.get(i))
        .ok_or_else(|| Error::MalformedSignature(format!("no Signature at position {ordinal}")))?;
    let si_node =
        find_child_element(*sig, ns::DSIG, ns::node::SIGNED_INFO).ok_or(Error::MissingSignedInfo)?;
    let set = NodeSet::tree(si_node, mode.with_comments());
    let bytes = sigill_c14n::canonicalize_doc(&doc, mode, Some(&set), &si.inclusive_prefixes)?;
    tracing::debug!(method, len = bytes.len(), "canonicalized SignedInfo");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigill_core::algorithm;

    #[test]
    fn test_fresh_context() {
        let ctx = SignatureContext::new();
        assert!(ctx.signed_info().is_none());
        assert!(ctx.signature_value().is_none());
        assert!(ctx.signing_key_name().is_none());
        assert!(matches!(ctx.get_xml(), Err(Error::MissingSignedInfo)));
        assert!(ctx.get_xml().unwrap_err().is_cryptographic());
    }

    #[test]
    fn test_add_reference_and_object() {
        let mut ctx = SignatureContext::new();
        assert!(matches!(
            ctx.add_reference(None),
            Err(Error::MalformedSignature(_))
        ));
        ctx.add_object(None);
        assert!(ctx.objects().is_empty());

        ctx.add_reference(Some(Reference::new("#a"))).unwrap();
        ctx.add_object(Some(DataObject::new().with_id("a")));
        assert_eq!(ctx.signed_info().unwrap().references().len(), 1);
        assert_eq!(ctx.objects().len(), 1);

        ctx.set_signing_key_name(Some("mykey".into()));
        assert_eq!(ctx.signing_key_name(), Some("mykey"));

        ctx.set_signing_key(Some(Key::hmac(sigill_crypto::HmacHash::Sha1, b"k")));
        assert!(ctx.signing_key().is_some());
        ctx.set_signing_key(None);
        assert!(ctx.signing_key().is_none());
    }

    #[test]
    fn test_unsigned_xml_shape() {
        let mut ctx = SignatureContext::new();
        ctx.id = Some("sig".into());
        ctx.add_reference(Some(Reference::new(""))).unwrap();
        ctx.signed_info_mut().signature_method = Some(algorithm::HMAC_SHA1.into());
        assert_eq!(
            ctx.get_xml().unwrap(),
            concat!(
                r#"<Signature xmlns="http://www.w3.org/2000/09/xmldsig#" Id="sig"><SignedInfo>"#,
                r#"<CanonicalizationMethod Algorithm="http://www.w3.org/TR/2001/REC-xml-c14n-20010315" />"#,
                r#"<SignatureMethod Algorithm="http://www.w3.org/2000/09/xmldsig#hmac-sha1" />"#,
                r#"<Reference URI=""><DigestMethod Algorithm="http://www.w3.org/2000/09/xmldsig#sha1" />"#,
                "<DigestValue /></Reference></SignedInfo><SignatureValue /></Signature>"
            )
        );
    }

    #[test]
    fn test_load_rejects_bad_input() {
        let mut ctx = SignatureContext::new();
        assert!(matches!(ctx.load_xml(""), Err(Error::MalformedSignature(_))));
        assert!(matches!(ctx.load_xml(" \n\t"), Err(Error::MalformedSignature(_))));
        assert!(matches!(ctx.load_xml("<a><b/></a>"), Err(Error::MalformedSignature(_))));
        assert!(matches!(ctx.load_xml("<a"), Err(Error::XmlParse(_))));
        assert!(ctx.signed_info().is_none());
    }

    #[test]
    fn test_append_to_root() {
        assert_eq!(
            append_to_root("<?xml version='1.0'?>\n<r a='1'/>\n", "<S/>").unwrap(),
            "<?xml version='1.0'?>\n<r a='1'><S/></r>\n"
        );
        assert_eq!(
            append_to_root("<p:r xmlns:p='urn:p' />", "<S/>").unwrap(),
            "<p:r xmlns:p='urn:p'><S/></p:r>"
        );
        assert_eq!(
            append_to_root("<r><a/>text</r><!--tail-->", "<S/>").unwrap(),
            "<r><a/>text<S/></r><!--tail-->"
        );
    }

    #[test]
    fn test_get_id_element() {
        let ctx = SignatureContext::new();
        let doc = sigill_xml::parse("<r><a Id='one'/><b id='two'/></r>").unwrap();
        assert_eq!(ctx.get_id_element(&doc, "two").unwrap().tag_name().name(), "b");
        assert!(ctx.get_id_element(&doc, "").is_none());
        assert!(ctx.get_id_element(&doc, "three").is_none());

        let ctx = SignatureContext::new()
            .with_id_resolver(Arc::new(AttributeIdResolver::new().with_attr("wsuId")));
        let doc = sigill_xml::parse("<r><a wsuId='x'/></r>").unwrap();
        assert!(ctx.get_id_element(&doc, "x").is_some());
    }
}
