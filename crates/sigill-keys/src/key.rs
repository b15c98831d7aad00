#![forbid(unsafe_code)]

//! Key types and data structures.

use sigill_core::Error;
use sigill_crypto::{HmacHash, SigningKey};

/// The underlying key data.
#[derive(Clone)]
pub enum KeyData {
    Rsa {
        private: Option<rsa::RsaPrivateKey>,
        public: rsa::RsaPublicKey,
    },
    Dsa {
        private: Option<dsa::SigningKey>,
        public: dsa::VerifyingKey,
    },
    Hmac {
        hash: HmacHash,
        key: Vec<u8>,
    },
    /// A block cipher key. It can be stored and looked up but never signs.
    Symmetric(Vec<u8>),
}

impl std::fmt::Debug for KeyData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rsa { private, .. } => {
                if private.is_some() {
                    write!(f, "RSA private+public key")
                } else {
                    write!(f, "RSA public key")
                }
            }
            Self::Dsa { private, .. } => {
                if private.is_some() {
                    write!(f, "DSA private+public key")
                } else {
                    write!(f, "DSA public key")
                }
            }
            Self::Hmac { hash, key } => write!(f, "HMAC-{hash:?} key ({} bytes)", key.len()),
            Self::Symmetric(k) => write!(f, "symmetric key ({} bytes)", k.len()),
        }
    }
}

/// A named key with associated data.
#[derive(Debug, Clone)]
pub struct Key {
    /// Optional name for key lookup.
    pub name: Option<String>,
    /// The key data.
    pub data: KeyData,
    /// X.509 certificates the key came with (DER-encoded), leaf first.
    pub x509_chain: Vec<Vec<u8>>,
}

impl Key {
    pub fn new(data: KeyData) -> Self {
        Self {
            name: None,
            data,
            x509_chain: Vec::new(),
        }
    }

    /// A keyed-hash key for `hash`.
    pub fn hmac(hash: HmacHash, secret: &[u8]) -> Self {
        Self::new(KeyData::Hmac {
            hash,
            key: secret.to_vec(),
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Convert to a `SigningKey` for use with crypto algorithms.
    ///
    /// Private halves are preferred; `None` for keys that cannot sign.
    pub fn to_signing_key(&self) -> Option<SigningKey> {
        match &self.data {
            KeyData::Rsa {
                private: Some(pk), ..
            } => Some(SigningKey::Rsa(pk.clone())),
            KeyData::Rsa { public, .. } => Some(SigningKey::RsaPublic(public.clone())),
            KeyData::Dsa {
                private: Some(sk), ..
            } => Some(SigningKey::Dsa(sk.clone())),
            KeyData::Dsa { public, .. } => Some(SigningKey::DsaPublic(public.clone())),
            KeyData::Hmac { hash, key } => Some(SigningKey::Hmac {
                hash: *hash,
                key: key.clone(),
            }),
            KeyData::Symmetric(_) => None,
        }
    }

    /// Like [`Key::to_signing_key`], failing with `CreatedKeyFailed` for key
    /// kinds that have no signature algorithm.
    pub fn signing_key(&self) -> Result<SigningKey, Error> {
        self.to_signing_key()
            .ok_or_else(|| Error::CreatedKeyFailed(format!("{:?}", self.data)))
    }

    /// Whether the key holds private (or secret) material.
    pub fn is_private(&self) -> bool {
        match &self.data {
            KeyData::Rsa { private, .. } => private.is_some(),
            KeyData::Dsa { private, .. } => private.is_some(),
            KeyData::Hmac { .. } | KeyData::Symmetric(_) => true,
        }
    }

    /// The public half of an asymmetric key.
    pub fn public_key(&self) -> Option<Key> {
        let data = match &self.data {
            KeyData::Rsa { public, .. } => KeyData::Rsa {
                private: None,
                public: public.clone(),
            },
            KeyData::Dsa { public, .. } => KeyData::Dsa {
                private: None,
                public: public.clone(),
            },
            KeyData::Hmac { .. } | KeyData::Symmetric(_) => return None,
        };
        Some(Key {
            name: self.name.clone(),
            data,
            x509_chain: self.x509_chain.clone(),
        })
    }

    pub fn rsa_public_key(&self) -> Option<&rsa::RsaPublicKey> {
        match &self.data {
            KeyData::Rsa { public, .. } => Some(public),
            _ => None,
        }
    }

    pub fn dsa_public_key(&self) -> Option<&dsa::VerifyingKey> {
        match &self.data {
            KeyData::Dsa { public, .. } => Some(public),
            _ => None,
        }
    }
}
