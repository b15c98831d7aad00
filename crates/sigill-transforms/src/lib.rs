#![forbid(unsafe_code)]

//! Transform pipeline for the sigill XML-DSig engine.
//!
//! Each Reference carries a sequence of transforms applied in order to the
//! data its URI selects. Transforms are built from [`TransformParams`] by
//! factories held in the algorithm registry.

pub mod base64_transform;
pub mod enveloped;
pub mod pipeline;
pub mod uri;

pub use pipeline::{
    C14nTransform, Transform, TransformData, TransformParams, TransformPipeline, XPathExpr,
};
