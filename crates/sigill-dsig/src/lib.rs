#![forbid(unsafe_code)]

//! XML Digital Signature (XML-DSig) creation and verification.
//!
//! [`SignatureContext`] holds one `<Signature>`: build it from references,
//! objects and key info and call `compute_signature`, or `load_xml` an
//! existing one and call one of the `check_*` methods. Algorithms are looked
//! up in the [`AlgorithmRegistry`](sigill_crypto::AlgorithmRegistry) the
//! context holds.

pub mod context;
pub mod object;
pub mod reference;
mod resolve;
pub mod sign;
pub mod signed_info;
pub mod verify;

pub use context::SignatureContext;
pub use object::DataObject;
pub use reference::Reference;
pub use signed_info::SignedInfo;

use base64::Engine;
use sigill_core::Error;

/// Decode the base64 text of a DigestValue or SignatureValue. Whitespace,
/// including line breaks inside the value, is ignored.
pub(crate) fn decode_base64(text: &str, what: &str) -> Result<Vec<u8>, Error> {
    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| Error::MalformedSignature(format!("invalid base64 in {what}: {e}")))
}
