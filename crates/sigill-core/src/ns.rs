#![forbid(unsafe_code)]

//! Namespace URIs, element names and attribute names of the XML-DSig
//! vocabulary.

/// XML Digital Signature namespace
pub const DSIG: &str = "http://www.w3.org/2000/09/xmldsig#";

/// Exclusive C14N namespace (home of `InclusiveNamespaces`)
pub const EXC_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";

/// XML namespace, bound to the `xml` prefix
pub const XML: &str = "http://www.w3.org/XML/1998/namespace";

// ── Element names ────────────────────────────────────────────────────

pub mod node {
    pub const SIGNATURE: &str = "Signature";
    pub const SIGNED_INFO: &str = "SignedInfo";
    pub const CANONICALIZATION_METHOD: &str = "CanonicalizationMethod";
    pub const SIGNATURE_METHOD: &str = "SignatureMethod";
    pub const SIGNATURE_VALUE: &str = "SignatureValue";
    pub const HMAC_OUTPUT_LENGTH: &str = "HMACOutputLength";
    pub const REFERENCE: &str = "Reference";
    pub const TRANSFORMS: &str = "Transforms";
    pub const TRANSFORM: &str = "Transform";
    pub const DIGEST_METHOD: &str = "DigestMethod";
    pub const DIGEST_VALUE: &str = "DigestValue";
    pub const OBJECT: &str = "Object";
    pub const XPATH: &str = "XPath";
    pub const INCLUSIVE_NAMESPACES: &str = "InclusiveNamespaces";

    // KeyInfo
    pub const KEY_INFO: &str = "KeyInfo";
    pub const KEY_NAME: &str = "KeyName";
    pub const KEY_VALUE: &str = "KeyValue";

    pub const RSA_KEY_VALUE: &str = "RSAKeyValue";
    pub const RSA_MODULUS: &str = "Modulus";
    pub const RSA_EXPONENT: &str = "Exponent";

    pub const DSA_KEY_VALUE: &str = "DSAKeyValue";
    pub const DSA_P: &str = "P";
    pub const DSA_Q: &str = "Q";
    pub const DSA_G: &str = "G";
    pub const DSA_Y: &str = "Y";

    pub const X509_DATA: &str = "X509Data";
    pub const X509_CERTIFICATE: &str = "X509Certificate";
}

// ── Attribute names ──────────────────────────────────────────────────

pub mod attr {
    pub const ID: &str = "Id";
    pub const URI: &str = "URI";
    pub const TYPE: &str = "Type";
    pub const MIME_TYPE: &str = "MimeType";
    pub const ENCODING: &str = "Encoding";
    pub const ALGORITHM: &str = "Algorithm";
    pub const PREFIX_LIST: &str = "PrefixList";
}
