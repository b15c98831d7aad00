#![forbid(unsafe_code)]

//! Keys for the sigill XML-DSig engine.
//!
//! Loads keys from PEM, DER, PKCS#8, X.509 and raw secrets, keeps them in a
//! [`KeysManager`] for named lookup, and models the `<KeyInfo>` element
//! together with the cursor that discovers verification keys from it.

pub mod key;
pub mod keyinfo;
pub mod loader;
pub mod manager;

pub use key::{Key, KeyData};
pub use keyinfo::{KeyCursor, KeyInfo, KeyInfoClause};
pub use manager::KeysManager;
