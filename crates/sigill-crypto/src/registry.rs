#![forbid(unsafe_code)]

//! Algorithm registry mapping URIs and names to descriptors.
//!
//! A registry is an ordinary value. Build one with
//! [`AlgorithmRegistry::with_defaults`], register any extra entries, then
//! share it (usually behind an `Arc`) with every signature context.

use crate::digest::{factory, DigestAlgorithm, DigestFactory};
use crate::sign::{self, HmacHash, KeyKind, SigningKey};
use sigill_core::{algorithm, Error};
use sigill_transforms::base64_transform::Base64DecodeTransform;
use sigill_transforms::enveloped::{EnvelopedSignatureTransform, XPathTransform};
use sigill_transforms::{C14nTransform, Transform, TransformParams};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Produces a signature value. Asymmetric formatters receive the SignedInfo
/// digest; keyed-hash formatters receive the canonical SignedInfo bytes.
pub type Formatter = Arc<dyn Fn(&SigningKey, &[u8]) -> Result<Vec<u8>, Error> + Send + Sync>;

/// Checks a signature value against the same input a [`Formatter`] takes.
pub type Deformatter =
    Arc<dyn Fn(&SigningKey, &[u8], &[u8]) -> Result<bool, Error> + Send + Sync>;

/// Builds a transform from the parameters of a `Transform` element.
pub type TransformFactory =
    Arc<dyn Fn(&TransformParams) -> Result<Box<dyn Transform>, Error> + Send + Sync>;

/// Everything needed to produce and check one signature method.
#[derive(Clone)]
pub struct SignatureDescription {
    pub key_kind: KeyKind,
    pub digest: DigestFactory,
    pub formatter: Formatter,
    pub deformatter: Deformatter,
}

impl SignatureDescription {
    /// RSA PKCS#1 v1.5 over the digest `D`.
    pub fn rsa_pkcs1v15<D>() -> Self
    where
        D: digest::Digest + digest::const_oid::AssociatedOid + Send + 'static,
    {
        Self {
            key_kind: KeyKind::Rsa,
            digest: factory::<D>(),
            formatter: Arc::new(sign::rsa_sign::<D>),
            deformatter: Arc::new(sign::rsa_verify::<D>),
        }
    }

    /// DSA over SHA-1.
    pub fn dsa_sha1() -> Self {
        Self {
            key_kind: KeyKind::Dsa,
            digest: factory::<sha1::Sha1>(),
            formatter: Arc::new(sign::dsa_sign),
            deformatter: Arc::new(sign::dsa_verify),
        }
    }

    /// HMAC over `hash`. Only the secret of the supplied key is used.
    pub fn hmac(hash: HmacHash) -> Self {
        let digest = match hash {
            HmacHash::Sha1 => factory::<sha1::Sha1>(),
            HmacHash::Sha256 => factory::<sha2::Sha256>(),
            HmacHash::Sha384 => factory::<sha2::Sha384>(),
            HmacHash::Sha512 => factory::<sha2::Sha512>(),
            HmacHash::Ripemd160 => factory::<ripemd::Ripemd160>(),
        };
        Self {
            key_kind: KeyKind::KeyedHash,
            digest,
            formatter: Arc::new(move |key: &SigningKey, data: &[u8]| {
                sign::hmac(hash, hmac_secret(key)?, data)
            }),
            deformatter: Arc::new(move |key: &SigningKey, data: &[u8], sig: &[u8]| {
                sign::hmac_verify(hash, hmac_secret(key)?, data, sig)
            }),
        }
    }

    /// A fresh hasher for this method, named `method` in errors.
    pub fn create_digest(&self, method: &str) -> Result<Box<dyn DigestAlgorithm>, Error> {
        (self.digest)().map_err(|e| {
            tracing::debug!(method, error = %e, "digest factory failed");
            Error::CreateHashAlgorithmFailed(method.to_owned())
        })
    }

    /// Native output length in bits of the bound digest (the MAC length for
    /// keyed-hash methods).
    pub fn output_bits(&self, method: &str) -> Result<usize, Error> {
        Ok(self.create_digest(method)?.output_len() * 8)
    }

    /// Sign canonical SignedInfo bytes. Keyed-hash methods return the full,
    /// untruncated MAC.
    pub fn sign(&self, method: &str, key: &SigningKey, data: &[u8]) -> Result<Vec<u8>, Error> {
        match self.key_kind {
            KeyKind::KeyedHash => (self.formatter)(key, data),
            KeyKind::Rsa | KeyKind::Dsa => {
                let hashed = self.hash(method, data)?;
                (self.formatter)(key, &hashed)
            }
        }
    }

    /// Check a signature value over canonical SignedInfo bytes.
    pub fn verify(
        &self,
        method: &str,
        key: &SigningKey,
        data: &[u8],
        signature: &[u8],
    ) -> Result<bool, Error> {
        match self.key_kind {
            KeyKind::KeyedHash => (self.deformatter)(key, data, signature),
            KeyKind::Rsa | KeyKind::Dsa => {
                let hashed = self.hash(method, data)?;
                (self.deformatter)(key, &hashed, signature)
            }
        }
    }

    fn hash(&self, method: &str, data: &[u8]) -> Result<Vec<u8>, Error> {
        let mut hasher = self.create_digest(method)?;
        hasher.update(data);
        Ok(hasher.finalize())
    }
}

fn hmac_secret(key: &SigningKey) -> Result<&[u8], Error> {
    match key {
        SigningKey::Hmac { key, .. } => Ok(key.as_slice()),
        _ => Err(Error::Key("HMAC key required".into())),
    }
}

/// A registry entry.
#[derive(Clone)]
pub enum AlgorithmDescriptor {
    Digest(DigestFactory),
    Signature(SignatureDescription),
    Transform(TransformFactory),
}

impl AlgorithmDescriptor {
    fn kind(&self) -> &'static str {
        match self {
            AlgorithmDescriptor::Digest(_) => "digest",
            AlgorithmDescriptor::Signature(_) => "signature",
            AlgorithmDescriptor::Transform(_) => "transform",
        }
    }
}

/// Central registry for digest, signature and transform algorithms.
#[derive(Clone, Default)]
pub struct AlgorithmRegistry {
    entries: HashMap<String, AlgorithmDescriptor>,
}

impl AlgorithmRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry seeded with the well-known XML-DSig algorithms.
    pub fn with_defaults() -> Self {
        let mut reg = Self::new();

        // Signatures
        reg.register(
            algorithm::RSA_SHA1,
            AlgorithmDescriptor::Signature(SignatureDescription::rsa_pkcs1v15::<sha1::Sha1>()),
        );
        reg.register(
            algorithm::RSA_SHA256,
            AlgorithmDescriptor::Signature(SignatureDescription::rsa_pkcs1v15::<sha2::Sha256>()),
        );
        reg.register(
            algorithm::DSA_SHA1,
            AlgorithmDescriptor::Signature(SignatureDescription::dsa_sha1()),
        );
        for hash in [
            HmacHash::Sha1,
            HmacHash::Sha256,
            HmacHash::Sha384,
            HmacHash::Sha512,
            HmacHash::Ripemd160,
        ] {
            reg.register(
                hash.signature_uri(),
                AlgorithmDescriptor::Signature(SignatureDescription::hmac(hash)),
            );
        }

        // Digests, by URI and by bare name
        let digests: [(&str, &str, DigestFactory); 5] = [
            (algorithm::SHA1, "SHA1", factory::<sha1::Sha1>()),
            (algorithm::SHA256, "SHA256", factory::<sha2::Sha256>()),
            (algorithm::SHA384, "SHA384", factory::<sha2::Sha384>()),
            (algorithm::SHA512, "SHA512", factory::<sha2::Sha512>()),
            (algorithm::RIPEMD160, "RIPEMD160", factory::<ripemd::Ripemd160>()),
        ];
        for (uri, alias, f) in digests {
            reg.register(uri, AlgorithmDescriptor::Digest(f.clone()));
            reg.register(alias, AlgorithmDescriptor::Digest(f));
        }

        // Transforms
        let c14n: TransformFactory = Arc::new(|p: &TransformParams| {
            Ok(Box::new(C14nTransform::from_params(p)?) as Box<dyn Transform>)
        });
        for uri in [
            algorithm::C14N,
            algorithm::C14N_WITH_COMMENTS,
            algorithm::EXC_C14N,
            algorithm::EXC_C14N_WITH_COMMENTS,
            algorithm::MINIMAL_C14N,
        ] {
            reg.register(uri, AlgorithmDescriptor::Transform(c14n.clone()));
        }
        reg.register(
            algorithm::ENVELOPED_SIGNATURE,
            AlgorithmDescriptor::Transform(Arc::new(|p: &TransformParams| {
                Ok(Box::new(EnvelopedSignatureTransform::from_params(p)) as Box<dyn Transform>)
            })),
        );
        reg.register(
            algorithm::XPATH,
            AlgorithmDescriptor::Transform(Arc::new(|p: &TransformParams| {
                Ok(Box::new(XPathTransform::from_params(p)?) as Box<dyn Transform>)
            })),
        );
        reg.register(
            algorithm::BASE64,
            AlgorithmDescriptor::Transform(Arc::new(|_: &TransformParams| {
                Ok(Box::new(Base64DecodeTransform) as Box<dyn Transform>)
            })),
        );

        reg
    }

    /// Add or replace an entry, returning the one it replaced.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        descriptor: AlgorithmDescriptor,
    ) -> Option<AlgorithmDescriptor> {
        let name = name.into();
        tracing::trace!(name = %name, kind = descriptor.kind(), "registering algorithm");
        self.entries.insert(name, descriptor)
    }

    pub fn resolve(&self, name: &str) -> Option<&AlgorithmDescriptor> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// The signature description registered for `method`.
    pub fn signature_description(&self, method: &str) -> Result<&SignatureDescription, Error> {
        match self.resolve(method) {
            Some(AlgorithmDescriptor::Signature(desc)) => Ok(desc),
            _ => Err(Error::SignatureDescriptionNotCreated(method.to_owned())),
        }
    }

    /// A fresh hasher for the digest registered under `name`.
    pub fn digest(&self, name: &str) -> Result<Box<dyn DigestAlgorithm>, Error> {
        match self.resolve(name) {
            Some(AlgorithmDescriptor::Digest(f)) => {
                f().map_err(|_| Error::CreateHashAlgorithmFailed(name.to_owned()))
            }
            _ => Err(Error::CreateHashAlgorithmFailed(name.to_owned())),
        }
    }

    /// Instantiate the transform named by `params.algorithm`.
    pub fn transform(&self, params: &TransformParams) -> Result<Box<dyn Transform>, Error> {
        match self.resolve(&params.algorithm) {
            Some(AlgorithmDescriptor::Transform(f)) => f(params),
            _ => Err(Error::UnsupportedAlgorithm(format!(
                "transform: {}",
                params.algorithm
            ))),
        }
    }
}

impl fmt::Debug for AlgorithmRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.entries.keys().collect();
        names.sort();
        f.debug_struct("AlgorithmRegistry")
            .field("entries", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigill_transforms::TransformData;

    fn hmac_key(secret: &[u8]) -> SigningKey {
        SigningKey::Hmac {
            hash: HmacHash::Sha1,
            key: secret.to_vec(),
        }
    }

    #[test]
    fn test_defaults_cover_well_known_uris() {
        let reg = AlgorithmRegistry::with_defaults();
        for uri in [
            algorithm::RSA_SHA1,
            algorithm::RSA_SHA256,
            algorithm::DSA_SHA1,
            algorithm::HMAC_SHA1,
            algorithm::HMAC_SHA256,
            algorithm::HMAC_SHA384,
            algorithm::HMAC_SHA512,
            algorithm::HMAC_RIPEMD160,
        ] {
            assert!(reg.signature_description(uri).is_ok(), "{uri}");
        }
        for name in [
            algorithm::SHA1,
            algorithm::SHA256,
            algorithm::SHA384,
            algorithm::SHA512,
            algorithm::RIPEMD160,
            "SHA1",
            "SHA256",
            "SHA384",
            "SHA512",
            "RIPEMD160",
        ] {
            assert!(reg.digest(name).is_ok(), "{name}");
        }
        assert_eq!(reg.digest("SHA384").unwrap().output_len(), 48);
        assert!(!reg.contains(algorithm::RSA_SHA512));
    }

    #[test]
    fn test_unknown_method_and_wrong_kind() {
        let reg = AlgorithmRegistry::with_defaults();
        let err = reg.signature_description("urn:nope").err().unwrap();
        assert!(matches!(err, Error::SignatureDescriptionNotCreated(_)));
        // A digest URI is not a signature method.
        let err = reg.signature_description(algorithm::SHA1).err().unwrap();
        assert!(matches!(err, Error::SignatureDescriptionNotCreated(_)));
        let err = reg.digest(algorithm::RSA_SHA1).err().unwrap();
        assert!(matches!(err, Error::CreateHashAlgorithmFailed(_)));
    }

    #[test]
    fn test_register_overwrites() {
        let mut reg = AlgorithmRegistry::with_defaults();
        let previous = reg.register(
            algorithm::HMAC_SHA1,
            AlgorithmDescriptor::Signature(SignatureDescription::hmac(HmacHash::Sha256)),
        );
        assert!(matches!(previous, Some(AlgorithmDescriptor::Signature(_))));
        let desc = reg.signature_description(algorithm::HMAC_SHA1).unwrap();
        assert_eq!(desc.output_bits(algorithm::HMAC_SHA1).unwrap(), 256);
    }

    #[test]
    fn test_bad_digest_factory() {
        let mut reg = AlgorithmRegistry::new();
        let broken: DigestFactory = Arc::new(|| -> Result<Box<dyn DigestAlgorithm>, Error> {
            Err(Error::UnsupportedAlgorithm("broken".into()))
        });
        reg.register(
            "urn:broken-sig",
            AlgorithmDescriptor::Signature(SignatureDescription {
                digest: broken.clone(),
                ..SignatureDescription::rsa_pkcs1v15::<sha1::Sha1>()
            }),
        );
        reg.register("urn:broken-digest", AlgorithmDescriptor::Digest(broken));

        let desc = reg.signature_description("urn:broken-sig").unwrap();
        let err = desc
            .verify("urn:broken-sig", &hmac_key(b"k"), b"data", b"sig")
            .unwrap_err();
        assert!(matches!(err, Error::CreateHashAlgorithmFailed(ref m) if m == "urn:broken-sig"));
        let err = reg.digest("urn:broken-digest").err().unwrap();
        assert!(matches!(err, Error::CreateHashAlgorithmFailed(_)));
    }

    #[test]
    fn test_runtime_rsa_sha512() {
        let mut reg = AlgorithmRegistry::with_defaults();
        reg.register(
            algorithm::RSA_SHA512,
            AlgorithmDescriptor::Signature(SignatureDescription::rsa_pkcs1v15::<sha2::Sha512>()),
        );
        let mut rng = rand::thread_rng();
        let private_key = rsa::RsaPrivateKey::new(&mut rng, 1024).unwrap();
        let public = SigningKey::RsaPublic(private_key.to_public_key());
        let key = SigningKey::Rsa(private_key);

        let desc = reg.signature_description(algorithm::RSA_SHA512).unwrap();
        let sig = desc.sign(algorithm::RSA_SHA512, &key, b"<SignedInfo/>").unwrap();
        assert!(desc
            .verify(algorithm::RSA_SHA512, &public, b"<SignedInfo/>", &sig)
            .unwrap());
        assert!(!desc
            .verify(algorithm::RSA_SHA512, &public, b"<SignedInfo />", &sig)
            .unwrap());
    }

    #[test]
    fn test_hmac_description_uses_method_hash() {
        let reg = AlgorithmRegistry::with_defaults();
        let desc = reg.signature_description(algorithm::HMAC_SHA512).unwrap();
        assert_eq!(desc.key_kind, KeyKind::KeyedHash);
        // The key was made for SHA-1, the method decides.
        let mac = desc.sign(algorithm::HMAC_SHA512, &hmac_key(b"k"), b"m").unwrap();
        assert_eq!(mac.len(), 64);
        assert!(desc
            .verify(algorithm::HMAC_SHA512, &hmac_key(b"k"), b"m", &mac)
            .unwrap());

        let mut rng = rand::thread_rng();
        let rsa_key = SigningKey::Rsa(rsa::RsaPrivateKey::new(&mut rng, 1024).unwrap());
        assert!(desc.sign(algorithm::HMAC_SHA512, &rsa_key, b"m").is_err());
    }

    #[test]
    fn test_transform_factories() {
        let reg = AlgorithmRegistry::with_defaults();
        let params = TransformParams {
            algorithm: algorithm::EXC_C14N.into(),
            inclusive_prefixes: vec!["b".into()],
            ..Default::default()
        };
        let t = reg.transform(&params).unwrap();
        let out = t
            .execute(TransformData::Xml {
                xml_text: r#"<r xmlns:a="urn:a" xmlns:b="urn:b"/>"#.into(),
                node_set: None,
            })
            .unwrap();
        assert_eq!(
            out.to_binary().unwrap(),
            br#"<r xmlns:b="urn:b"></r>"#.to_vec()
        );

        for uri in [
            algorithm::MINIMAL_C14N,
            algorithm::ENVELOPED_SIGNATURE,
            algorithm::BASE64,
        ] {
            let params = TransformParams {
                algorithm: uri.into(),
                ..Default::default()
            };
            assert!(reg.transform(&params).is_ok(), "{uri}");
        }

        let unknown = TransformParams {
            algorithm: "urn:unknown".into(),
            ..Default::default()
        };
        assert!(matches!(
            reg.transform(&unknown).err().unwrap(),
            Error::UnsupportedAlgorithm(_)
        ));
    }
}
