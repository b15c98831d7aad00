#![forbid(unsafe_code)]

//! Signature computation.
//!
//! 1. Digest every reference that has no DigestValue yet
//! 2. Pick the SignatureMethod (declared, or the key's default)
//! 3. Canonicalize SignedInfo where the signature will sit
//! 4. Sign, truncating keyed-hash output to HMACOutputLength

use crate::context::{canonical_signed_info, SignatureContext};
use crate::resolve::{digest, reference_bytes, Source};
use crate::verify::truncation_floor;
use sigill_core::Error;
use sigill_crypto::KeyKind;
use sigill_keys::Key;

impl SignatureContext {
    /// Compute the signature with the configured signing key.
    pub fn compute_signature(&mut self) -> Result<(), Error> {
        let key = self.signing_key.clone().ok_or(Error::LoadKeyFailed)?;
        self.compute_signature_with_key(&key)
    }

    /// Compute the signature with `key`, which may be a keyed-hash key.
    ///
    /// On success every reference carries a DigestValue and the context
    /// holds the new SignatureValue. On failure the context is unchanged.
    pub fn compute_signature_with_key(&mut self, key: &Key) -> Result<(), Error> {
        let signing_key = key.signing_key()?;
        let mut si = self.signed_info.clone().unwrap_or_default();

        // ── References ──
        let (placed, ordinal) = self.placed_signature(&si, None)?;
        let sources = [Source {
            text: &placed,
            ordinal,
        }];
        for reference in si.references_mut() {
            if reference.digest_value.is_some() {
                continue;
            }
            let bytes = reference_bytes(reference, &sources, &self.registry, self.id_resolver.as_ref())?;
            let value = digest(&self.registry, &reference.digest_method, &bytes)?;
            tracing::debug!(
                uri = reference.resolution_uri(),
                method = %reference.digest_method,
                "reference digested"
            );
            reference.digest_value = Some(value);
        }

        // ── Signature method ──
        let kind = signing_key.kind();
        let method = si
            .signature_method
            .get_or_insert_with(|| signing_key.default_signature_method().to_owned())
            .clone();
        let description = self.registry.signature_description(&method)?;
        if description.key_kind != kind {
            return Err(Error::KeyAlgorithmMismatch {
                method,
                key: kind.name().to_owned(),
            });
        }
        let truncate_to = match (kind, si.hmac_output_length.as_deref()) {
            (KeyKind::KeyedHash, Some(text)) => {
                Some(output_length(text, description.output_bits(&method)?)?)
            }
            _ => None,
        };

        // ── SignedInfo ──
        let (placed, ordinal) = self.placed_signature(&si, None)?;
        let canonical = canonical_signed_info(&placed, ordinal, &si)?;
        let mut value = description.sign(&method, &signing_key, &canonical)?;
        if let Some(bits) = truncate_to {
            value.truncate(bits / 8);
        }
        tracing::debug!(method = %method, key = kind.name(), len = value.len(), "signature computed");

        self.signed_info = Some(si);
        self.signature_value = Some(value);
        self.loaded = None;
        Ok(())
    }
}

/// Validate a requested HMACOutputLength against the MAC size `full`.
/// Lengths below the verification floor give `TruncationRejected`.
fn output_length(text: &str, full: usize) -> Result<usize, Error> {
    let bits: usize = text
        .trim()
        .parse()
        .map_err(|_| Error::InvalidOutputLengthFormat(text.to_owned()))?;
    if bits == 0 || bits % 8 != 0 {
        return Err(Error::InvalidOutputLengthFormat(format!(
            "{bits} is not a positive multiple of 8"
        )));
    }
    let minimum = truncation_floor(full);
    if bits < minimum {
        tracing::warn!(bits, minimum, "refusing to truncate HMAC below the floor");
        return Err(Error::TruncationRejected { bits, minimum });
    }
    if bits > full {
        return Err(Error::Crypto(format!(
            "HMACOutputLength {bits} exceeds the {full}-bit MAC"
        )));
    }
    Ok(bits)
}
