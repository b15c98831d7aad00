#![forbid(unsafe_code)]

//! Same-document URI resolution for XML-DSig references.

use crate::pipeline::TransformData;
use sigill_core::Error;
use sigill_xml::xpath::{classify_uri, UriTarget};
use sigill_xml::{IdResolver, NodeSet};

/// Resolve `uri` against one XML text.
///
/// Returns `Ok(None)` when the URI names an id this text does not contain,
/// so the caller can try another source. External URIs are an error; the
/// engine never fetches remote content.
pub fn resolve_uri(
    uri: &str,
    xml_text: &str,
    resolver: &dyn IdResolver,
) -> Result<Option<TransformData>, Error> {
    let doc = sigill_xml::parse(xml_text)?;
    let target = classify_uri(uri);
    let node_set = match target {
        UriTarget::Document => NodeSet::all_without_comments(&doc),
        UriTarget::DocumentWithComments => NodeSet::all(&doc),
        UriTarget::Id(id) | UriTarget::IdWithComments(id) => {
            match resolver.get_id_element(&doc, id) {
                Some(node) => NodeSet::tree(node, target.with_comments()),
                None => return Ok(None),
            }
        }
        UriTarget::External(uri) => {
            return Err(Error::MissingReferencedObject(format!(
                "external URI not supported: {uri}"
            )))
        }
    };
    Ok(Some(TransformData::Xml {
        xml_text: xml_text.to_owned(),
        node_set: Some(node_set),
    }))
}
