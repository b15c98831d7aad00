#![forbid(unsafe_code)]

//! Transform pipeline and trait definitions.

use sigill_c14n::C14nMode;
use sigill_core::Error;
use sigill_xml::NodeSet;

/// Data flowing through the transform pipeline.
#[derive(Debug, Clone)]
pub enum TransformData {
    /// A node set over an XML document. `None` means every node.
    Xml {
        xml_text: String,
        node_set: Option<NodeSet>,
    },
    /// An octet stream.
    Binary(Vec<u8>),
}

impl TransformData {
    /// Bytes to digest. Node sets are serialized with inclusive C14N.
    pub fn to_binary(&self) -> Result<Vec<u8>, Error> {
        match self {
            TransformData::Binary(data) => Ok(data.clone()),
            TransformData::Xml { xml_text, node_set } => {
                sigill_c14n::canonicalize(xml_text, C14nMode::Inclusive, node_set.as_ref(), &[])
            }
        }
    }
}

/// An XPath expression together with the namespace bindings in effect where
/// it was written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XPathExpr {
    pub expression: String,
    /// (prefix, namespace URI) pairs.
    pub namespaces: Vec<(String, String)>,
}

impl XPathExpr {
    pub fn new(expression: &str) -> Self {
        Self {
            expression: expression.to_owned(),
            namespaces: Vec::new(),
        }
    }

    pub fn with_namespace(mut self, prefix: &str, uri: &str) -> Self {
        self.namespaces.push((prefix.to_owned(), uri.to_owned()));
        self
    }

    pub fn lookup(&self, prefix: &str) -> Option<&str> {
        self.namespaces
            .iter()
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
    }
}

/// Everything a transform factory needs to build a transform.
#[derive(Debug, Clone, Default)]
pub struct TransformParams {
    /// Algorithm URI from the `Transform` element.
    pub algorithm: String,
    /// Exclusive C14N InclusiveNamespaces PrefixList.
    pub inclusive_prefixes: Vec<String>,
    /// XPath filter expression, for the XPath transform.
    pub xpath: Option<XPathExpr>,
    /// 1-based position of the signature being processed among the
    /// `dsig:Signature` elements of the input document. A position past the
    /// last signature makes the enveloped transform a no-op.
    pub signature_ordinal: usize,
}

/// A single transform step.
pub trait Transform: Send {
    /// The algorithm URI for this transform.
    fn uri(&self) -> &str;

    /// Execute the transform on the given data.
    fn execute(&self, input: TransformData) -> Result<TransformData, Error>;
}

/// A pipeline of transforms executed in sequence.
#[derive(Default)]
pub struct TransformPipeline {
    transforms: Vec<Box<dyn Transform>>,
}

impl TransformPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, transform: Box<dyn Transform>) {
        self.transforms.push(transform);
    }

    /// Execute all transforms in order.
    pub fn execute(&self, input: TransformData) -> Result<TransformData, Error> {
        let mut data = input;
        for transform in &self.transforms {
            tracing::trace!(uri = transform.uri(), "applying transform");
            data = transform.execute(data)?;
        }
        Ok(data)
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

// ── C14N Transform ───────────────────────────────────────────────────

/// A canonicalization transform.
pub struct C14nTransform {
    mode: C14nMode,
    inclusive_prefixes: Vec<String>,
}

impl C14nTransform {
    pub fn new(mode: C14nMode, inclusive_prefixes: Vec<String>) -> Self {
        Self {
            mode,
            inclusive_prefixes,
        }
    }

    /// Build from factory parameters; fails for non-canonicalization URIs.
    pub fn from_params(params: &TransformParams) -> Result<Self, Error> {
        let mode = C14nMode::from_uri(&params.algorithm)
            .ok_or_else(|| Error::UnsupportedAlgorithm(format!("C14N: {}", params.algorithm)))?;
        let prefixes = if mode.is_exclusive() {
            params.inclusive_prefixes.clone()
        } else {
            Vec::new()
        };
        Ok(Self::new(mode, prefixes))
    }
}

impl Transform for C14nTransform {
    fn uri(&self) -> &str {
        self.mode.uri()
    }

    fn execute(&self, input: TransformData) -> Result<TransformData, Error> {
        let bytes = match input {
            TransformData::Xml { xml_text, node_set } => sigill_c14n::canonicalize(
                &xml_text,
                self.mode,
                node_set.as_ref(),
                &self.inclusive_prefixes,
            )?,
            TransformData::Binary(data) => {
                let text = std::str::from_utf8(&data)
                    .map_err(|e| Error::Transform(format!("invalid UTF-8: {e}")))?;
                sigill_c14n::canonicalize(text, self.mode, None, &self.inclusive_prefixes)?
            }
        };
        Ok(TransformData::Binary(bytes))
    }
}
