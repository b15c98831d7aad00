#![forbid(unsafe_code)]

//! Signature verification.
//!
//! The SignedInfo signature is checked first. Reference digests are only
//! recomputed once it validates. A signature that does not match is
//! `Ok(false)`; structural problems, a truncation length below the
//! permitted floor and a SignatureValue shorter or longer than its declared
//! HMACOutputLength are errors.

use crate::context::{canonical_signed_info, SignatureContext};
use crate::decode_base64;
use crate::resolve::{digest, reference_bytes, Source};
use sigill_core::{ns, Error};
use sigill_crypto::{KeyKind, SignatureDescription};
use sigill_keys::Key;
use sigill_xml::document::{find_child_element, find_elements, text_content};

/// Everything needed to check SignedInfo against one candidate key.
struct Prepared<'a> {
    method: &'a str,
    description: &'a SignatureDescription,
    canonical: Vec<u8>,
    value: &'a [u8],
    hmac_output_length: Option<&'a str>,
}

impl SignatureContext {
    /// Check the signature with keys discovered through KeyInfo.
    ///
    /// Returns `false` when there is no SignedInfo, no KeyInfo, or no
    /// candidate key validates.
    pub fn check_signature(&self) -> Result<bool, Error> {
        let (valid, _) = self.check_signature_returning_key()?;
        if !valid {
            return Ok(false);
        }
        self.check_references()
    }

    /// Check the signature with an explicit public or keyed-hash key.
    pub fn check_signature_with_key(&self, key: &Key) -> Result<bool, Error> {
        let Some(prepared) = self.prepare()? else {
            return Ok(false);
        };
        if !self.verify_prepared(&prepared, key)? {
            return Ok(false);
        }
        self.check_references()
    }

    /// Try each KeyInfo candidate against the SignedInfo signature.
    ///
    /// References are not checked; follow up with
    /// [`check_references`](Self::check_references). Candidates of the
    /// wrong family for the SignatureMethod are skipped.
    pub fn check_signature_returning_key(&self) -> Result<(bool, Option<Key>), Error> {
        let Some(prepared) = self.prepare()? else {
            return Ok((false, None));
        };
        let Some(key_info) = &self.key_info else {
            tracing::debug!("no KeyInfo to discover a key from");
            return Ok((false, None));
        };
        for candidate in key_info.candidates() {
            match self.verify_prepared(&prepared, &candidate) {
                Ok(true) => return Ok((true, Some(candidate))),
                Ok(false) => tracing::debug!("candidate key did not verify"),
                Err(Error::KeyAlgorithmMismatch { method, key }) => {
                    tracing::warn!(method = %method, key = %key, "skipping candidate key");
                }
                Err(e) => return Err(e),
            }
        }
        Ok((false, None))
    }

    /// Recompute every reference digest and compare it with the stored
    /// DigestValue.
    pub fn check_references(&self) -> Result<bool, Error> {
        let Some(si) = &self.signed_info else {
            return Ok(false);
        };

        let mut texts: Vec<(String, usize)> = Vec::new();
        match (&self.loaded, &self.document) {
            (Some(loaded), Some(document)) if document.text() != loaded.text => {
                let ordinal = self.document_ordinal(document.text())?;
                texts.push((document.text().to_owned(), ordinal));
                texts.push((loaded.text.clone(), loaded.ordinal));
            }
            (Some(loaded), _) => texts.push((loaded.text.clone(), loaded.ordinal)),
            (None, _) => texts.push(self.placed_signature(si, self.signature_value.as_deref())?),
        }
        let sources: Vec<Source<'_>> = texts
            .iter()
            .map(|(text, ordinal)| Source {
                text,
                ordinal: *ordinal,
            })
            .collect();

        for reference in si.references() {
            let uri = reference.resolution_uri();
            let Some(expected) = &reference.digest_value else {
                tracing::debug!(uri, "reference has no DigestValue");
                return Ok(false);
            };
            let bytes = reference_bytes(reference, &sources, &self.registry, self.id_resolver.as_ref())?;
            let actual = match digest(&self.registry, &reference.digest_method, &bytes) {
                Ok(actual) => actual,
                Err(Error::CreateHashAlgorithmFailed(method)) => {
                    tracing::debug!(uri, method = %method, "unusable DigestMethod");
                    return Ok(false);
                }
                Err(e) => return Err(e),
            };
            if &actual != expected {
                tracing::debug!(uri, "digest mismatch");
                return Ok(false);
            }
            tracing::debug!(uri, "digest matches");
        }
        Ok(true)
    }

    // ── Internals ────────────────────────────────────────────────────

    /// Canonical SignedInfo plus the resolved method, or `None` when there
    /// is nothing to verify.
    fn prepare(&self) -> Result<Option<Prepared<'_>>, Error> {
        let (Some(si), Some(value)) = (&self.signed_info, &self.signature_value) else {
            return Ok(None);
        };
        let method = si
            .signature_method
            .as_deref()
            .ok_or_else(|| Error::SignatureDescriptionNotCreated("(none)".into()))?;
        let description = self.registry.signature_description(method)?;

        let canonical = match &self.loaded {
            Some(loaded) => canonical_signed_info(&loaded.text, loaded.ordinal, si)?,
            None => {
                let (placed, ordinal) = self.placed_signature(si, Some(value.as_slice()))?;
                canonical_signed_info(&placed, ordinal, si)?
            }
        };
        Ok(Some(Prepared {
            method,
            description,
            canonical,
            value,
            hmac_output_length: si.hmac_output_length.as_deref(),
        }))
    }

    fn verify_prepared(&self, p: &Prepared<'_>, key: &Key) -> Result<bool, Error> {
        let signing_key = key.signing_key()?;
        let kind = signing_key.kind();
        if kind != p.description.key_kind {
            return Err(Error::KeyAlgorithmMismatch {
                method: p.method.to_owned(),
                key: kind.name().to_owned(),
            });
        }
        if kind == KeyKind::KeyedHash {
            let full = p.description.output_bits(p.method)?;
            let actual = p.value.len() * 8;
            match p.hmac_output_length {
                Some(text) => {
                    let bits = check_truncation(text, full)?;
                    if actual != bits {
                        return Err(Error::Crypto(format!(
                            "SignatureValue has {actual} bits, HMACOutputLength declares {bits}"
                        )));
                    }
                }
                None if actual != full => {
                    tracing::debug!(expected = full, actual, "MAC length mismatch");
                    return Ok(false);
                }
                None => {}
            }
        }
        p.description
            .verify(p.method, &signing_key, &p.canonical, p.value)
    }

    /// Position of the loaded signature inside a document it was not
    /// loaded from, matched by SignatureValue. Past the end when absent.
    fn document_ordinal(&self, text: &str) -> Result<usize, Error> {
        let doc = sigill_xml::parse(text)?;
        let signatures = find_elements(&doc, ns::DSIG, ns::node::SIGNATURE);
        let position = signatures.iter().position(|sig| {
            find_child_element(*sig, ns::DSIG, ns::node::SIGNATURE_VALUE)
                .and_then(|v| decode_base64(&text_content(v), ns::node::SIGNATURE_VALUE).ok())
                .is_some_and(|v| Some(v.as_slice()) == self.signature_value.as_deref())
        });
        Ok(position.unwrap_or(signatures.len()) + 1)
    }
}

/// Shortest HMACOutputLength accepted for a `full`-bit MAC.
pub(crate) fn truncation_floor(full: usize) -> usize {
    (full / 2).max(80)
}

/// The truncation gate for a declared HMACOutputLength (CVE-2009-0217).
///
/// Lengths must be whole bytes, no shorter than `max(80, full / 2)` and no
/// longer than the MAC itself.
fn check_truncation(text: &str, full: usize) -> Result<usize, Error> {
    let bits: usize = text
        .trim()
        .parse()
        .map_err(|_| Error::InvalidOutputLengthFormat(text.to_owned()))?;
    if bits % 8 != 0 {
        return Err(Error::Crypto(format!(
            "HMACOutputLength {bits} is not a multiple of 8"
        )));
    }
    let minimum = truncation_floor(full);
    if bits < minimum {
        tracing::warn!(bits, minimum, "rejecting truncated HMAC");
        return Err(Error::TruncationRejected { bits, minimum });
    }
    if bits > full {
        return Err(Error::Crypto(format!(
            "HMACOutputLength {bits} exceeds the {full}-bit MAC"
        )));
    }
    Ok(bits)
}
