#![forbid(unsafe_code)]

//! Signature primitives (RSA PKCS#1 v1.5, DSA, HMAC).
//!
//! The asymmetric functions take a digest that the caller has already
//! computed over the canonical SignedInfo. The HMAC functions take the
//! canonical bytes themselves.

use hmac::{Hmac, Mac};
use sigill_core::{algorithm, Error};
use std::fmt;

/// Key material for signature operations.
#[derive(Clone)]
pub enum SigningKey {
    Rsa(rsa::RsaPrivateKey),
    RsaPublic(rsa::RsaPublicKey),
    Dsa(dsa::SigningKey),
    DsaPublic(dsa::VerifyingKey),
    Hmac { hash: HmacHash, key: Vec<u8> },
}

/// The algorithm family a key (or a signature method) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Rsa,
    Dsa,
    KeyedHash,
}

impl KeyKind {
    pub fn name(&self) -> &'static str {
        match self {
            KeyKind::Rsa => "RSA",
            KeyKind::Dsa => "DSA",
            KeyKind::KeyedHash => "HMAC",
        }
    }
}

impl SigningKey {
    pub fn kind(&self) -> KeyKind {
        match self {
            SigningKey::Rsa(_) | SigningKey::RsaPublic(_) => KeyKind::Rsa,
            SigningKey::Dsa(_) | SigningKey::DsaPublic(_) => KeyKind::Dsa,
            SigningKey::Hmac { .. } => KeyKind::KeyedHash,
        }
    }

    /// The `SignatureMethod` used when none is declared.
    pub fn default_signature_method(&self) -> &'static str {
        match self {
            SigningKey::Rsa(_) | SigningKey::RsaPublic(_) => algorithm::RSA_SHA1,
            SigningKey::Dsa(_) | SigningKey::DsaPublic(_) => algorithm::DSA_SHA1,
            SigningKey::Hmac { hash, .. } => hash.signature_uri(),
        }
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SigningKey::Rsa(_) => f.write_str("SigningKey::Rsa(..)"),
            SigningKey::RsaPublic(_) => f.write_str("SigningKey::RsaPublic(..)"),
            SigningKey::Dsa(_) => f.write_str("SigningKey::Dsa(..)"),
            SigningKey::DsaPublic(_) => f.write_str("SigningKey::DsaPublic(..)"),
            SigningKey::Hmac { hash, key } => f
                .debug_struct("SigningKey::Hmac")
                .field("hash", hash)
                .field("key_len", &key.len())
                .finish(),
        }
    }
}

// ── HMAC ─────────────────────────────────────────────────────────────

/// Hash functions available for keyed-hash signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HmacHash {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
    Ripemd160,
}

impl HmacHash {
    pub fn signature_uri(&self) -> &'static str {
        match self {
            HmacHash::Sha1 => algorithm::HMAC_SHA1,
            HmacHash::Sha256 => algorithm::HMAC_SHA256,
            HmacHash::Sha384 => algorithm::HMAC_SHA384,
            HmacHash::Sha512 => algorithm::HMAC_SHA512,
            HmacHash::Ripemd160 => algorithm::HMAC_RIPEMD160,
        }
    }

    pub fn from_signature_uri(uri: &str) -> Option<Self> {
        match uri {
            algorithm::HMAC_SHA1 => Some(HmacHash::Sha1),
            algorithm::HMAC_SHA256 => Some(HmacHash::Sha256),
            algorithm::HMAC_SHA384 => Some(HmacHash::Sha384),
            algorithm::HMAC_SHA512 => Some(HmacHash::Sha512),
            algorithm::HMAC_RIPEMD160 => Some(HmacHash::Ripemd160),
            _ => None,
        }
    }
}

/// Compute the full-length HMAC of `data`.
pub fn hmac(hash: HmacHash, key: &[u8], data: &[u8]) -> Result<Vec<u8>, Error> {
    macro_rules! hmac_compute {
        ($hasher:ty) => {{
            let mut mac = <Hmac<$hasher> as Mac>::new_from_slice(key)
                .map_err(|e| Error::Crypto(format!("HMAC key: {e}")))?;
            mac.update(data);
            Ok(mac.finalize().into_bytes().to_vec())
        }};
    }
    match hash {
        HmacHash::Sha1 => hmac_compute!(sha1::Sha1),
        HmacHash::Sha256 => hmac_compute!(sha2::Sha256),
        HmacHash::Sha384 => hmac_compute!(sha2::Sha384),
        HmacHash::Sha512 => hmac_compute!(sha2::Sha512),
        HmacHash::Ripemd160 => hmac_compute!(ripemd::Ripemd160),
    }
}

/// Compare `signature` in constant time against the leading bytes of the
/// HMAC of `data`.
///
/// Callers are responsible for rejecting truncated lengths that are too
/// short; an empty or over-long `signature` never matches.
pub fn hmac_verify(
    hash: HmacHash,
    key: &[u8],
    data: &[u8],
    signature: &[u8],
) -> Result<bool, Error> {
    macro_rules! hmac_check {
        ($hasher:ty) => {{
            let mut mac = <Hmac<$hasher> as Mac>::new_from_slice(key)
                .map_err(|e| Error::Crypto(format!("HMAC key: {e}")))?;
            mac.update(data);
            Ok(mac.verify_truncated_left(signature).is_ok())
        }};
    }
    match hash {
        HmacHash::Sha1 => hmac_check!(sha1::Sha1),
        HmacHash::Sha256 => hmac_check!(sha2::Sha256),
        HmacHash::Sha384 => hmac_check!(sha2::Sha384),
        HmacHash::Sha512 => hmac_check!(sha2::Sha512),
        HmacHash::Ripemd160 => hmac_check!(ripemd::Ripemd160),
    }
}

// ── RSA PKCS#1 v1.5 ─────────────────────────────────────────────────

/// Sign a precomputed digest `hashed` made with `D`.
pub fn rsa_sign<D>(key: &SigningKey, hashed: &[u8]) -> Result<Vec<u8>, Error>
where
    D: digest::Digest + digest::const_oid::AssociatedOid,
{
    let SigningKey::Rsa(private_key) = key else {
        return Err(Error::Key("RSA private key required".into()));
    };
    private_key
        .sign(rsa::Pkcs1v15Sign::new::<D>(), hashed)
        .map_err(|e| Error::Crypto(format!("RSA signing failed: {e}")))
}

/// Verify an RSA PKCS#1 v1.5 signature over a precomputed digest.
pub fn rsa_verify<D>(key: &SigningKey, hashed: &[u8], signature: &[u8]) -> Result<bool, Error>
where
    D: digest::Digest + digest::const_oid::AssociatedOid,
{
    let public_key = match key {
        SigningKey::Rsa(pk) => pk.to_public_key(),
        SigningKey::RsaPublic(pk) => pk.clone(),
        _ => return Err(Error::Key("RSA key required".into())),
    };
    Ok(public_key
        .verify(rsa::Pkcs1v15Sign::new::<D>(), hashed, signature)
        .is_ok())
}

// ── DSA ──────────────────────────────────────────────────────────────

/// Sign a SHA-1 digest with DSA. The result is `r || s`, each left-padded
/// to the byte length of `q`.
pub fn dsa_sign(key: &SigningKey, hashed: &[u8]) -> Result<Vec<u8>, Error> {
    let SigningKey::Dsa(signing_key) = key else {
        return Err(Error::Key("DSA private key required".into()));
    };
    let sig = signing_key
        .sign_prehashed_rfc6979::<sha1::Sha1>(hashed)
        .map_err(|e| Error::Crypto(format!("DSA signing failed: {e}")))?;
    let width = component_width(signing_key.verifying_key());
    let mut out = Vec::with_capacity(width * 2);
    out.extend(left_pad(&sig.r().to_bytes_be(), width));
    out.extend(left_pad(&sig.s().to_bytes_be(), width));
    Ok(out)
}

/// Verify an `r || s` DSA signature over a SHA-1 digest.
pub fn dsa_verify(key: &SigningKey, hashed: &[u8], signature: &[u8]) -> Result<bool, Error> {
    use signature::hazmat::PrehashVerifier;

    let verifying_key = match key {
        SigningKey::Dsa(sk) => sk.verifying_key(),
        SigningKey::DsaPublic(vk) => vk,
        _ => return Err(Error::Key("DSA key required".into())),
    };
    if signature.is_empty() || signature.len() % 2 != 0 {
        return Ok(false);
    }
    let (r, s) = signature.split_at(signature.len() / 2);
    let Ok(sig) = dsa::Signature::from_components(
        dsa::BigUint::from_bytes_be(r),
        dsa::BigUint::from_bytes_be(s),
    ) else {
        return Ok(false);
    };
    Ok(verifying_key.verify_prehash(hashed, &sig).is_ok())
}

fn component_width(key: &dsa::VerifyingKey) -> usize {
    (key.components().q().bits() as usize).div_ceil(8)
}

fn left_pad(bytes: &[u8], width: usize) -> Vec<u8> {
    let mut out = vec![0u8; width.saturating_sub(bytes.len())];
    out.extend_from_slice(bytes);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use digest::Digest;

    #[test]
    fn test_hmac_sha1_known_answer() {
        // RFC 2202 test case 2.
        let mac = hmac(HmacHash::Sha1, b"Jefe", b"what do ya want for nothing?").unwrap();
        let hex: String = mac.iter().map(|b| format!("{b:02x}")).collect();
        assert_eq!(hex, "effcdf6ae5eb2fa2d27416d5f184df9c259a7c79");
    }

    #[test]
    fn test_hmac_verify_truncated_prefix() {
        let mac = hmac(HmacHash::Sha256, b"secret", b"data").unwrap();
        assert_eq!(mac.len(), 32);
        assert!(hmac_verify(HmacHash::Sha256, b"secret", b"data", &mac).unwrap());
        assert!(hmac_verify(HmacHash::Sha256, b"secret", b"data", &mac[..16]).unwrap());
        assert!(!hmac_verify(HmacHash::Sha256, b"other", b"data", &mac[..16]).unwrap());
        assert!(!hmac_verify(HmacHash::Sha256, b"secret", b"data", &[]).unwrap());
        let mut long = mac.clone();
        long.push(0);
        assert!(!hmac_verify(HmacHash::Sha256, b"secret", b"data", &long).unwrap());
    }

    #[test]
    fn test_hmac_uris() {
        for (hash, bits) in [
            (HmacHash::Sha1, 160),
            (HmacHash::Sha256, 256),
            (HmacHash::Sha384, 384),
            (HmacHash::Sha512, 512),
            (HmacHash::Ripemd160, 160),
        ] {
            assert_eq!(HmacHash::from_signature_uri(hash.signature_uri()), Some(hash));
            let mac = hmac(hash, b"k", b"m").unwrap();
            assert_eq!(mac.len() * 8, bits);
        }
        assert_eq!(HmacHash::from_signature_uri(algorithm::RSA_SHA1), None);
    }

    #[test]
    fn test_rsa_round_trip() {
        let mut rng = rand::thread_rng();
        let private_key = rsa::RsaPrivateKey::new(&mut rng, 1024).unwrap();
        let key = SigningKey::Rsa(private_key.clone());
        let hashed = sha2::Sha256::digest(b"payload").to_vec();
        let sig = rsa_sign::<sha2::Sha256>(&key, &hashed).unwrap();
        assert_eq!(sig.len(), 128);

        let public = SigningKey::RsaPublic(private_key.to_public_key());
        assert!(rsa_verify::<sha2::Sha256>(&public, &hashed, &sig).unwrap());
        assert!(!rsa_verify::<sha1::Sha1>(&public, &hashed[..20], &sig).unwrap());
        assert!(rsa_sign::<sha2::Sha256>(&public, &hashed).is_err());
    }

    #[test]
    fn test_dsa_round_trip() {
        let mut rng = rand::thread_rng();
        let components = dsa::Components::generate(&mut rng, dsa::KeySize::DSA_1024_160);
        let signing_key = dsa::SigningKey::generate(&mut rng, components);
        let public = SigningKey::DsaPublic(signing_key.verifying_key().clone());
        let key = SigningKey::Dsa(signing_key);

        let hashed = sha1::Sha1::digest(b"payload").to_vec();
        let sig = dsa_sign(&key, &hashed).unwrap();
        assert_eq!(sig.len(), 40);
        assert!(dsa_verify(&public, &hashed, &sig).unwrap());

        let other = sha1::Sha1::digest(b"tampered").to_vec();
        assert!(!dsa_verify(&public, &other, &sig).unwrap());
        assert!(!dsa_verify(&public, &hashed, &sig[..39]).unwrap());
    }

    #[test]
    fn test_key_kinds_and_debug() {
        let key = SigningKey::Hmac {
            hash: HmacHash::Sha384,
            key: b"top secret".to_vec(),
        };
        assert_eq!(key.kind(), KeyKind::KeyedHash);
        assert_eq!(key.default_signature_method(), algorithm::HMAC_SHA384);
        let debug = format!("{key:?}");
        assert!(debug.contains("key_len"));
        assert!(!debug.contains("top secret"));
    }
}
