#![forbid(unsafe_code)]

//! Cryptographic algorithms for the sigill XML-DSig engine.
//!
//! Provides digests, RSA/DSA/HMAC signature primitives and the
//! [`AlgorithmRegistry`] that maps algorithm URIs to them.

pub mod digest;
pub mod registry;
pub mod sign;

pub use self::digest::{DigestAlgorithm, DigestFactory};
pub use registry::{
    AlgorithmDescriptor, AlgorithmRegistry, Deformatter, Formatter, SignatureDescription,
    TransformFactory,
};
pub use sign::{HmacHash, KeyKind, SigningKey};
