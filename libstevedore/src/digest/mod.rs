//! Content digests for layers in the local repository.
//!
//! This module wraps `oci_spec::image::Digest` so digests read from archives
//! are validated the same way registries validate them.

use crate::error::{Result, StevedoreError};
use oci_spec::image::Digest as OciDigest;
use sha2::{Digest as _, Sha256};
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;


/// Represents a content digest, wrapping the `oci_spec::image::Digest` type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest(OciDigest);

impl FromStr for Digest {
    type Err = StevedoreError;

    fn from_str(s: &str) -> Result<Self> {
        let oci_digest = OciDigest::from_str(s).map_err(|e| StevedoreError::Validation {
            message: format!("Invalid digest format: {}", e),
            source: Some(Box::new(e)),
        })?;
        Ok(Digest(oci_digest))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Digest {
    /// Builds a `sha256:` digest from a lowercase hex string.
    ///
    /// # Examples
    ///
    /// ```
    /// use libstevedore::digest::Digest;
    ///
    /// let hex = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
    /// let digest = Digest::sha256(hex).unwrap();
    /// assert_eq!(digest.hex(), hex);
    /// ```
    pub fn sha256(hex: &str) -> Result<Self> {
        Self::from_str(&format!("sha256:{}", hex))
    }

    /// Returns the encoded part of the digest, without the algorithm prefix.
    ///
    /// Layer files in the local repository are named after this value.
    pub fn hex(&self) -> String {
        let text = self.to_string();
        match text.split_once(':') {
            Some((_, encoded)) => encoded.to_string(),
            None => text,
        }
    }
}

/// A writer that hashes everything passing through it with SHA-256.
pub struct HashingWriter<W> {
    inner: W,
    hasher: Sha256,
    written: u64,
}

impl<W: Write> HashingWriter<W> {
    /// Wraps `inner`.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            written: 0,
        }
    }

    /// Finishes hashing, returning the inner writer, the digest and the byte count.
    pub fn finish(self) -> Result<(W, Digest, u64)> {
        let hex = format!("{:x}", self.hasher.finalize());
        Ok((self.inner, Digest::sha256(&hex)?, self.written))
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
