#![forbid(unsafe_code)]

//! The `<KeyInfo>` model and key discovery.
//!
//! A [`KeyInfo`] is an ordered list of clauses. It is built by the signer
//! before computing a signature, or parsed from a loaded `<ds:KeyInfo>`
//! element. [`KeyInfo::candidates`] walks the clauses lazily and yields each
//! public key they carry, once.

use crate::key::{Key, KeyData};
use crate::loader::load_x509_cert_der;
use base64::Engine;
use sigill_core::{ns, Error};
use sigill_xml::document::{find_child_element, find_child_elements, text_content};
use sigill_xml::qname::element_namespace;
use sigill_xml::writer::NsScope;
use sigill_xml::XmlWriter;
use std::collections::VecDeque;
use std::iter::FusedIterator;

const B64: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD;

/// One child of `<KeyInfo>`.
#[derive(Debug, Clone)]
pub enum KeyInfoClause {
    KeyName(String),
    RsaKeyValue(rsa::RsaPublicKey),
    DsaKeyValue(dsa::VerifyingKey),
    /// DER certificates in document order.
    X509Data(Vec<Vec<u8>>),
    /// Any other element, kept as XML text that is valid inside the dsig
    /// default namespace.
    Unknown(String),
}

/// The `<KeyInfo>` element.
#[derive(Debug, Clone, Default)]
pub struct KeyInfo {
    pub id: Option<String>,
    clauses: Vec<KeyInfoClause>,
}

impl KeyInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_clause(&mut self, clause: KeyInfoClause) {
        self.clauses.push(clause);
    }

    /// Add the KeyValue clause matching the public half of `key`.
    /// Keys without a public half add nothing.
    pub fn add_key_value(&mut self, key: &Key) {
        match &key.data {
            KeyData::Rsa { public, .. } => self.add_clause(KeyInfoClause::RsaKeyValue(public.clone())),
            KeyData::Dsa { public, .. } => self.add_clause(KeyInfoClause::DsaKeyValue(public.clone())),
            KeyData::Hmac { .. } | KeyData::Symmetric(_) => {}
        }
    }

    pub fn clauses(&self) -> &[KeyInfoClause] {
        &self.clauses
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// The first `KeyName`, if any.
    pub fn key_name(&self) -> Option<&str> {
        self.clauses.iter().find_map(|c| match c {
            KeyInfoClause::KeyName(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// A fresh cursor over the candidate verification keys.
    pub fn candidates(&self) -> KeyCursor {
        KeyCursor {
            clauses: self.clauses.clone().into_iter(),
            pending: VecDeque::new(),
        }
    }

    /// Parse a `<KeyInfo>` element.
    pub fn from_node(node: roxmltree::Node<'_, '_>) -> Result<Self, Error> {
        let mut info = KeyInfo {
            id: node.attribute(ns::attr::ID).map(str::to_owned),
            clauses: Vec::new(),
        };
        for child in node.children().filter(|n| n.is_element()) {
            let ns_uri = element_namespace(child).unwrap_or("");
            let in_dsig = ns_uri == ns::DSIG || ns_uri.is_empty();
            let clause = match child.tag_name().name() {
                ns::node::KEY_NAME if in_dsig => {
                    KeyInfoClause::KeyName(text_content(child).trim().to_owned())
                }
                ns::node::KEY_VALUE if in_dsig => parse_key_value(child)?,
                ns::node::X509_DATA if in_dsig => parse_x509_data(child),
                _ => KeyInfoClause::Unknown(serialize_unknown(child)),
            };
            info.clauses.push(clause);
        }
        Ok(info)
    }

    /// Write `<KeyInfo>` into a writer whose default namespace is already
    /// the dsig namespace.
    pub fn write(&self, w: &mut XmlWriter) {
        let mut attrs: Vec<(&str, &str)> = Vec::new();
        if let Some(id) = &self.id {
            attrs.push((ns::attr::ID, id));
        }
        if self.clauses.is_empty() {
            w.empty_element(ns::node::KEY_INFO, &attrs);
            return;
        }
        w.start_element(ns::node::KEY_INFO, &attrs);
        for clause in &self.clauses {
            match clause {
                KeyInfoClause::KeyName(name) => w.text_element(ns::node::KEY_NAME, &[], name),
                KeyInfoClause::RsaKeyValue(public) => {
                    use rsa::traits::PublicKeyParts;
                    w.start_element(ns::node::KEY_VALUE, &[]);
                    w.start_element(ns::node::RSA_KEY_VALUE, &[]);
                    w.text_element(ns::node::RSA_MODULUS, &[], &B64.encode(public.n().to_bytes_be()));
                    w.text_element(ns::node::RSA_EXPONENT, &[], &B64.encode(public.e().to_bytes_be()));
                    w.end_element(ns::node::RSA_KEY_VALUE);
                    w.end_element(ns::node::KEY_VALUE);
                }
                KeyInfoClause::DsaKeyValue(public) => {
                    let c = public.components();
                    w.start_element(ns::node::KEY_VALUE, &[]);
                    w.start_element(ns::node::DSA_KEY_VALUE, &[]);
                    for (name, value) in [
                        (ns::node::DSA_P, c.p()),
                        (ns::node::DSA_Q, c.q()),
                        (ns::node::DSA_G, c.g()),
                        (ns::node::DSA_Y, public.y()),
                    ] {
                        w.text_element(name, &[], &B64.encode(value.to_bytes_be()));
                    }
                    w.end_element(ns::node::DSA_KEY_VALUE);
                    w.end_element(ns::node::KEY_VALUE);
                }
                KeyInfoClause::X509Data(certs) => {
                    w.start_element(ns::node::X509_DATA, &[]);
                    for der in certs {
                        w.text_element(ns::node::X509_CERTIFICATE, &[], &B64.encode(der));
                    }
                    w.end_element(ns::node::X509_DATA);
                }
                KeyInfoClause::Unknown(xml) => w.write_raw(xml),
            }
        }
        w.end_element(ns::node::KEY_INFO);
    }
}

// ── Key discovery ────────────────────────────────────────────────────

/// Forward-only cursor over the public keys a [`KeyInfo`] carries.
///
/// RSA and DSA KeyValues yield their key; X509Data yields the key of each
/// certificate in order. Unparsable certificates are skipped. Once
/// exhausted the cursor keeps returning `None`.
#[derive(Debug)]
pub struct KeyCursor {
    clauses: std::vec::IntoIter<KeyInfoClause>,
    pending: VecDeque<Key>,
}

impl Iterator for KeyCursor {
    type Item = Key;

    fn next(&mut self) -> Option<Key> {
        loop {
            if let Some(key) = self.pending.pop_front() {
                return Some(key);
            }
            match self.clauses.next()? {
                KeyInfoClause::RsaKeyValue(public) => {
                    return Some(Key::new(KeyData::Rsa {
                        private: None,
                        public,
                    }))
                }
                KeyInfoClause::DsaKeyValue(public) => {
                    return Some(Key::new(KeyData::Dsa {
                        private: None,
                        public,
                    }))
                }
                KeyInfoClause::X509Data(certs) => {
                    for (index, der) in certs.iter().enumerate() {
                        match load_x509_cert_der(der) {
                            Ok(key) => self.pending.push_back(key),
                            Err(e) => tracing::warn!(
                                index,
                                error = %e,
                                "skipping X.509 certificate in KeyInfo"
                            ),
                        }
                    }
                }
                KeyInfoClause::KeyName(name) => {
                    tracing::debug!(name = %name, "KeyName carries no key material");
                }
                KeyInfoClause::Unknown(_) => {}
            }
        }
    }
}

impl FusedIterator for KeyCursor {}

// ── Parsing helpers ──────────────────────────────────────────────────

/// Decode a CryptoBinary value, ignoring embedded whitespace.
fn decode_crypto_binary(text: &str, what: &str) -> Result<Vec<u8>, Error> {
    let clean: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if clean.is_empty() {
        return Err(Error::Key(format!("{what}: empty value")));
    }
    B64.decode(&clean)
        .map_err(|e| Error::Base64(format!("{what}: {e}")))
}

fn child_binary(parent: roxmltree::Node<'_, '_>, name: &str) -> Result<Vec<u8>, Error> {
    let node = find_child_element(parent, ns::DSIG, name)
        .ok_or_else(|| Error::Key(format!("missing {name} element")))?;
    decode_crypto_binary(&text_content(node), name)
}

fn parse_key_value(node: roxmltree::Node<'_, '_>) -> Result<KeyInfoClause, Error> {
    if let Some(rsa_kv) = find_child_element(node, ns::DSIG, ns::node::RSA_KEY_VALUE) {
        let n = rsa::BigUint::from_bytes_be(&child_binary(rsa_kv, ns::node::RSA_MODULUS)?);
        let e = rsa::BigUint::from_bytes_be(&child_binary(rsa_kv, ns::node::RSA_EXPONENT)?);
        let public = rsa::RsaPublicKey::new(n, e)
            .map_err(|err| Error::Key(format!("invalid RSA public key: {err}")))?;
        return Ok(KeyInfoClause::RsaKeyValue(public));
    }
    if let Some(dsa_kv) = find_child_element(node, ns::DSIG, ns::node::DSA_KEY_VALUE) {
        let big = |name: &str| -> Result<dsa::BigUint, Error> {
            Ok(dsa::BigUint::from_bytes_be(&child_binary(dsa_kv, name)?))
        };
        let components = dsa::Components::from_components(
            big(ns::node::DSA_P)?,
            big(ns::node::DSA_Q)?,
            big(ns::node::DSA_G)?,
        )
        .map_err(|e| Error::Key(format!("invalid DSA components: {e}")))?;
        let public = dsa::VerifyingKey::from_components(components, big(ns::node::DSA_Y)?)
            .map_err(|e| Error::Key(format!("invalid DSA public key: {e}")))?;
        return Ok(KeyInfoClause::DsaKeyValue(public));
    }
    Ok(KeyInfoClause::Unknown(serialize_unknown(node)))
}

fn parse_x509_data(node: roxmltree::Node<'_, '_>) -> KeyInfoClause {
    let mut certs = Vec::new();
    for cert in find_child_elements(node, ns::DSIG, ns::node::X509_CERTIFICATE) {
        match decode_crypto_binary(&text_content(cert), ns::node::X509_CERTIFICATE) {
            Ok(der) => certs.push(der),
            Err(e) => tracing::warn!(error = %e, "skipping undecodable X509Certificate"),
        }
    }
    KeyInfoClause::X509Data(certs)
}

fn serialize_unknown(node: roxmltree::Node<'_, '_>) -> String {
    let mut scope = NsScope::new();
    scope.insert(String::new(), ns::DSIG.to_owned());
    let mut w = XmlWriter::new();
    w.write_node(node, &scope);
    w.into_string()
}
