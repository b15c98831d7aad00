#![forbid(unsafe_code)]

//! sigill: XML Digital Signatures in Rust.
//!
//! This crate re-exports the workspace crates under short names. Most
//! callers only need [`dsig::SignatureContext`] and [`keys::Key`].

pub use sigill_c14n as c14n;
pub use sigill_core as core;
pub use sigill_crypto as crypto;
pub use sigill_dsig as dsig;
pub use sigill_keys as keys;
pub use sigill_transforms as transforms;
pub use sigill_xml as xml;

pub use sigill_core::{Error, Result};
pub use sigill_dsig::{DataObject, Reference, SignatureContext, SignedInfo};
pub use sigill_keys::{Key, KeyInfo};
