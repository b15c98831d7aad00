#![forbid(unsafe_code)]

//! Shared building blocks for the sigill XML-DSig engine: the error type,
//! algorithm URIs and the dsig vocabulary.

pub mod algorithm;
pub mod error;
pub mod ns;

pub use error::{Error, Result};
