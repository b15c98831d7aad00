#![forbid(unsafe_code)]

//! Error kinds shared by every sigill crate.
//!
//! Structural and configuration failures are errors. A signature or digest
//! that simply does not match is reported as `Ok(false)` by the verifier,
//! never through this type.

/// Errors produced by the sigill XML-DSig engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No signing key was supplied when computing a signature.
    #[error("signing key is not loaded")]
    LoadKeyFailed,

    /// The supplied key is of a kind that cannot produce XML signatures.
    #[error("failed to create signing key: {0}")]
    CreatedKeyFailed(String),

    /// The `SignatureMethod` is missing, unknown or not a signature algorithm.
    #[error("signature description could not be created for algorithm: {0}")]
    SignatureDescriptionNotCreated(String),

    /// The digest bound to a signature description could not be created.
    #[error("hash algorithm could not be created: {0}")]
    CreateHashAlgorithmFailed(String),

    /// A Reference URI did not resolve to any element.
    #[error("malformed reference element: referenced object not found: {0}")]
    MissingReferencedObject(String),

    /// The Signature element (or input handed to the loader) is malformed.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    /// `HMACOutputLength` is not an integer.
    #[error("HMACOutputLength is not a valid integer: {0}")]
    InvalidOutputLengthFormat(String),

    /// `HMACOutputLength` is below the permitted floor (CVE-2009-0217).
    #[error("HMACOutputLength of {bits} bits is below the minimum of {minimum} bits")]
    TruncationRejected { bits: usize, minimum: usize },

    /// The declared `SignatureMethod` does not match the key family.
    #[error("signature method {method} does not match the {key} key")]
    KeyAlgorithmMismatch { method: String, key: String },

    /// `get_xml` on a context that holds no SignedInfo.
    #[error("signature has no SignedInfo")]
    MissingSignedInfo,

    #[error("XML parsing error: {0}")]
    XmlParse(String),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("cryptographic error: {0}")]
    Crypto(String),

    #[error("key error: {0}")]
    Key(String),

    #[error("canonicalization error: {0}")]
    Canonicalization(String),

    #[error("transform error: {0}")]
    Transform(String),

    #[error("base64 decode error: {0}")]
    Base64(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error belongs to the cryptographic class.
    ///
    /// Everything except plain XML syntax and I/O failures counts.
    pub fn is_cryptographic(&self) -> bool {
        !matches!(self, Error::XmlParse(_) | Error::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cryptographic_class() {
        assert!(Error::LoadKeyFailed.is_cryptographic());
        assert!(Error::MissingSignedInfo.is_cryptographic());
        assert!(Error::TruncationRejected {
            bits: 72,
            minimum: 80
        }
        .is_cryptographic());
        assert!(!Error::XmlParse("bad".into()).is_cryptographic());
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(!Error::from(io).is_cryptographic());
    }

    #[test]
    fn test_truncation_message() {
        let err = Error::TruncationRejected {
            bits: 72,
            minimum: 80,
        };
        assert_eq!(
            err.to_string(),
            "HMACOutputLength of 72 bits is below the minimum of 80 bits"
        );
    }
}
