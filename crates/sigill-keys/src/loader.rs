#![forbid(unsafe_code)]

//! Key loading from PEM, DER and raw binary.

use crate::key::{Key, KeyData};
use sigill_core::Error;
use sigill_crypto::HmacHash;

fn pem_str(pem_data: &[u8]) -> Result<&str, Error> {
    std::str::from_utf8(pem_data).map_err(|e| Error::Key(format!("invalid PEM encoding: {e}")))
}

fn rsa_private(pk: rsa::RsaPrivateKey) -> Key {
    let public = pk.to_public_key();
    Key::new(KeyData::Rsa {
        private: Some(pk),
        public,
    })
}

fn dsa_private(sk: dsa::SigningKey) -> Key {
    let public = sk.verifying_key().clone();
    Key::new(KeyData::Dsa {
        private: Some(sk),
        public,
    })
}

/// Load an RSA private key from PEM data (PKCS#8 or PKCS#1).
pub fn load_rsa_private_pem(pem_data: &[u8]) -> Result<Key, Error> {
    use pkcs8::DecodePrivateKey;
    let pem_str = pem_str(pem_data)?;

    if let Ok(pk) = rsa::RsaPrivateKey::from_pkcs8_pem(pem_str) {
        return Ok(rsa_private(pk));
    }

    use pkcs1::DecodeRsaPrivateKey;
    let pk = rsa::RsaPrivateKey::from_pkcs1_pem(pem_str)
        .map_err(|e| Error::Key(format!("failed to parse RSA private key PEM: {e}")))?;
    Ok(rsa_private(pk))
}

/// Load an RSA public key from PEM data (SPKI or PKCS#1).
pub fn load_rsa_public_pem(pem_data: &[u8]) -> Result<Key, Error> {
    use pkcs8::DecodePublicKey;
    let pem_str = pem_str(pem_data)?;

    if let Ok(public) = rsa::RsaPublicKey::from_public_key_pem(pem_str) {
        return Ok(Key::new(KeyData::Rsa {
            private: None,
            public,
        }));
    }

    use pkcs1::DecodeRsaPublicKey;
    let public = rsa::RsaPublicKey::from_pkcs1_pem(pem_str)
        .map_err(|e| Error::Key(format!("failed to parse RSA public key PEM: {e}")))?;
    Ok(Key::new(KeyData::Rsa {
        private: None,
        public,
    }))
}

/// Load a DSA private key from PKCS#8 PEM data.
pub fn load_dsa_private_pem(pem_data: &[u8]) -> Result<Key, Error> {
    use pkcs8::DecodePrivateKey;
    let sk = dsa::SigningKey::from_pkcs8_pem(pem_str(pem_data)?)
        .map_err(|e| Error::Key(format!("failed to parse DSA private key PEM: {e}")))?;
    Ok(dsa_private(sk))
}

/// A keyed-hash key from raw secret bytes.
pub fn load_hmac_key(hash: HmacHash, data: &[u8]) -> Key {
    Key::hmac(hash, data)
}

/// Load a private key from PKCS#8 DER bytes, trying RSA then DSA.
pub fn load_private_key_pkcs8_der(der: &[u8]) -> Result<Key, Error> {
    use pkcs8::DecodePrivateKey;

    if let Ok(pk) = rsa::RsaPrivateKey::from_pkcs8_der(der) {
        return Ok(rsa_private(pk));
    }
    if let Ok(sk) = dsa::SigningKey::from_pkcs8_der(der) {
        return Ok(dsa_private(sk));
    }
    Err(Error::Key(
        "unable to parse PKCS#8 DER private key (tried RSA, DSA)".into(),
    ))
}

/// Auto-detect the key format of PEM data.
///
/// Tries RSA private, RSA public, DSA private, SPKI public keys and X.509
/// certificates in that order.
pub fn load_pem_auto(pem_data: &[u8]) -> Result<Key, Error> {
    if let Ok(key) = load_rsa_private_pem(pem_data) {
        return Ok(key);
    }
    if let Ok(key) = load_rsa_public_pem(pem_data) {
        return Ok(key);
    }
    if let Ok(key) = load_dsa_private_pem(pem_data) {
        return Ok(key);
    }
    if let Ok(key) = load_spki_pem(pem_data) {
        return Ok(key);
    }
    if let Ok(key) = load_x509_cert_pem(pem_data) {
        return Ok(key);
    }
    Err(Error::Key(
        "unable to auto-detect key format from PEM data".into(),
    ))
}

/// Load a public key from a PEM-encoded SubjectPublicKeyInfo (`-----BEGIN PUBLIC KEY-----`).
pub fn load_spki_pem(pem_data: &[u8]) -> Result<Key, Error> {
    let (label, der_bytes) = pem_rfc7468::decode_vec(pem_data)
        .map_err(|e| Error::Key(format!("failed to decode SPKI PEM: {e}")))?;
    if label != "PUBLIC KEY" {
        return Err(Error::Key(format!("expected PUBLIC KEY PEM label, got: {label}")));
    }
    load_spki_der(&der_bytes)
}

/// Load a public key from a PEM-encoded X.509 certificate.
pub fn load_x509_cert_pem(pem_data: &[u8]) -> Result<Key, Error> {
    // Some PEM files carry trailing blank lines.
    let trimmed = pem_str(pem_data)?.trim();
    let (label, der_bytes) = pem_rfc7468::decode_vec(trimmed.as_bytes())
        .map_err(|e| Error::Key(format!("failed to decode certificate PEM: {e}")))?;

    if label != "CERTIFICATE" {
        return Err(Error::Key(format!(
            "expected CERTIFICATE PEM label, got: {label}"
        )));
    }
    load_x509_cert_der(&der_bytes)
}

/// Load the public key of a DER-encoded X.509 certificate.
///
/// Only the key is extracted; the certificate is not validated.
pub fn load_x509_cert_der(data: &[u8]) -> Result<Key, Error> {
    use der::{Decode, Encode};

    let cert = x509_cert::Certificate::from_der(data)
        .map_err(|e| Error::Key(format!("failed to parse X.509 certificate: {e}")))?;
    let spki_der = cert
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| Error::Key(format!("failed to encode SPKI: {e}")))?;

    let mut key = load_spki_der(&spki_der).map_err(|_| {
        Error::Key("unsupported public key algorithm in X.509 certificate".into())
    })?;
    key.x509_chain = vec![data.to_vec()];
    Ok(key)
}

/// Load a public key from SubjectPublicKeyInfo DER bytes.
pub fn load_spki_der(spki_der: &[u8]) -> Result<Key, Error> {
    use spki::DecodePublicKey;

    if let Ok(public) = rsa::RsaPublicKey::from_public_key_der(spki_der) {
        return Ok(Key::new(KeyData::Rsa {
            private: None,
            public,
        }));
    }
    if let Ok(public) = dsa::VerifyingKey::from_public_key_der(spki_der) {
        return Ok(Key::new(KeyData::Dsa {
            private: None,
            public,
        }));
    }
    Err(Error::Key(
        "unsupported public key algorithm in SPKI DER".into(),
    ))
}

/// Load a key from a file, auto-detecting the format.
///
/// PEM is recognised by its armour; anything else is tried as PKCS#8,
/// PKCS#1, SPKI and X.509 DER in turn.
pub fn load_key_file(path: &std::path::Path) -> Result<Key, Error> {
    let data = std::fs::read(path)?;

    if data.starts_with(b"-----BEGIN") {
        return load_pem_auto(&data);
    }

    if let Ok(key) = load_private_key_pkcs8_der(&data) {
        return Ok(key);
    }

    use pkcs1::DecodeRsaPrivateKey;
    if let Ok(pk) = rsa::RsaPrivateKey::from_pkcs1_der(&data) {
        return Ok(rsa_private(pk));
    }

    if let Ok(key) = load_spki_der(&data) {
        return Ok(key);
    }
    if let Ok(key) = load_x509_cert_der(&data) {
        return Ok(key);
    }

    Err(Error::Key(format!(
        "unable to auto-detect key format from file: {}",
        path.display()
    )))
}

/// Read a raw HMAC secret from a file.
pub fn load_hmac_key_file(path: &std::path::Path, hash: HmacHash) -> Result<Key, Error> {
    let data = std::fs::read(path)?;
    Ok(load_hmac_key(hash, &data))
}
