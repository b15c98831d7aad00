#![forbid(unsafe_code)]

//! Reference dereferencing and digesting.
//!
//! A reference is looked up in each source in turn: normally the document
//! the signature belongs to, then the signature element itself so that
//! `#id` can point at one of its `<Object>`s.

use crate::reference::Reference;
use sigill_core::Error;
use sigill_crypto::AlgorithmRegistry;
use sigill_transforms::uri::resolve_uri;
use sigill_transforms::TransformPipeline;
use sigill_xml::IdResolver;

/// One XML text a reference may resolve into.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Source<'a> {
    pub text: &'a str,
    /// 1-based position of the signature being processed among the
    /// `dsig:Signature` elements of `text`.
    pub ordinal: usize,
}

/// Dereference `reference` and run its transforms, returning the octets
/// to digest.
pub(crate) fn reference_bytes(
    reference: &Reference,
    sources: &[Source<'_>],
    registry: &AlgorithmRegistry,
    resolver: &dyn IdResolver,
) -> Result<Vec<u8>, Error> {
    let uri = reference.resolution_uri();
    let mut found = None;
    for source in sources {
        if let Some(data) = resolve_uri(uri, source.text, resolver)? {
            found = Some((data, source.ordinal));
            break;
        }
    }
    let (data, ordinal) = found.ok_or_else(|| Error::MissingReferencedObject(uri.to_owned()))?;

    let mut pipeline = TransformPipeline::new();
    for params in reference.transforms() {
        let mut params = params.clone();
        params.signature_ordinal = ordinal;
        pipeline.push(registry.transform(&params)?);
    }
    let bytes = pipeline.execute(data)?.to_binary()?;
    tracing::debug!(uri, transforms = pipeline.len(), len = bytes.len(), "dereferenced");
    Ok(bytes)
}

/// Hash `data` with the digest registered under `method`.
pub(crate) fn digest(
    registry: &AlgorithmRegistry,
    method: &str,
    data: &[u8],
) -> Result<Vec<u8>, Error> {
    let mut hasher = registry.digest(method)?;
    hasher.update(data);
    Ok(hasher.finalize())
}
