#![forbid(unsafe_code)]

//! Digest (hash) algorithm implementations.

use sigill_core::Error;
use std::sync::Arc;

/// Trait for digest algorithms.
pub trait DigestAlgorithm: Send {
    /// Feed data into the hash.
    fn update(&mut self, data: &[u8]);
    /// Finalize and return the hash value.
    fn finalize(self: Box<Self>) -> Vec<u8>;
    /// Output size in bytes.
    fn output_len(&self) -> usize;
}

/// Builds a fresh hasher for each use.
pub type DigestFactory = Arc<dyn Fn() -> Result<Box<dyn DigestAlgorithm>, Error> + Send + Sync>;

/// Any RustCrypto [`digest::Digest`] as a [`DigestAlgorithm`].
pub struct Hasher<D> {
    inner: D,
}

impl<D: digest::Digest> Hasher<D> {
    pub fn new() -> Self {
        Self { inner: D::new() }
    }
}

impl<D: digest::Digest> Default for Hasher<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: digest::Digest + Send> DigestAlgorithm for Hasher<D> {
    fn update(&mut self, data: &[u8]) {
        digest::Digest::update(&mut self.inner, data);
    }

    fn finalize(self: Box<Self>) -> Vec<u8> {
        digest::Digest::finalize(self.inner).to_vec()
    }

    fn output_len(&self) -> usize {
        <D as digest::Digest>::output_size()
    }
}

/// Factory for the RustCrypto digest `D`.
pub fn factory<D>() -> DigestFactory
where
    D: digest::Digest + Send + 'static,
{
    Arc::new(|| -> Result<Box<dyn DigestAlgorithm>, Error> {
        Ok(Box::new(Hasher::<D>::new()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    #[test]
    fn test_sha256() {
        let mut hasher = factory::<sha2::Sha256>()().unwrap();
        hasher.update(b"hello");
        assert_eq!(
            hex(&hasher.finalize()),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_sha1_incremental() {
        let mut hasher = factory::<sha1::Sha1>()().unwrap();
        assert_eq!(hasher.output_len(), 20);
        hasher.update(b"hel");
        hasher.update(b"lo");
        assert_eq!(
            hex(&hasher.finalize()),
            "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d"
        );
    }

    #[test]
    fn test_output_lengths() {
        assert_eq!(factory::<sha2::Sha384>()().unwrap().output_len(), 48);
        assert_eq!(factory::<sha2::Sha512>()().unwrap().output_len(), 64);
        assert_eq!(factory::<ripemd::Ripemd160>()().unwrap().output_len(), 20);
    }
}
