#![forbid(unsafe_code)]

//! Base64 decode transform.

use crate::pipeline::{Transform, TransformData};
use base64::Engine;
use sigill_core::{algorithm, Error};

/// Decodes Base64 text into an octet stream.
///
/// A node-set input contributes the string value of its text nodes.
pub struct Base64DecodeTransform;

impl Transform for Base64DecodeTransform {
    fn uri(&self) -> &str {
        algorithm::BASE64
    }

    fn execute(&self, input: TransformData) -> Result<TransformData, Error> {
        let text = match input {
            TransformData::Binary(data) => String::from_utf8(data)
                .map_err(|e| Error::Transform(format!("base64 input not UTF-8: {e}")))?,
            TransformData::Xml { xml_text, node_set } => {
                let doc = sigill_xml::parse(&xml_text)?;
                doc.descendants()
                    .filter(|n| n.is_text())
                    .filter(|n| node_set.as_ref().map_or(true, |set| set.contains(n)))
                    .filter_map(|n| n.text())
                    .collect()
            }
        };

        let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(&cleaned)
            .map_err(|e| Error::Base64(format!("decode error: {e}")))?;
        Ok(TransformData::Binary(decoded))
    }
}
