//! Content digests used to verify a copy before the original is deleted.
//!
//! The hasher always rewinds to offset 0 and reads to EOF, so a handle that was
//! already read (or partially copied) still yields the digest of the whole file.

use sha2::{Digest, Sha256};
use std::io::{self, Read, Seek, SeekFrom};

const HASH_BUF: usize = 256 * 1024;

/// Anything the hasher can rewind and read.
pub trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

/// Produces a lowercase hex digest of a whole stream.
/// Source and copy must be hashed with the same implementation.
pub trait ContentHasher: Send + Sync {
    /// Algorithm label for logs.
    fn algorithm(&self) -> &'static str;

    fn digest(&self, stream: &mut dyn ReadSeek) -> io::Result<String>;
}

/// SHA-256 over the full stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256Hasher;

impl ContentHasher for Sha256Hasher {
    fn algorithm(&self) -> &'static str {
        "sha256"
    }

    fn digest(&self, stream: &mut dyn ReadSeek) -> io::Result<String> {
        stream.seek(SeekFrom::Start(0))?;
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; HASH_BUF];
        loop {
            let n = match stream.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            hasher.update(&buf[..n]);
        }
        Ok(format!("{:x}", hasher.finalize()))
    }
}

/// Digests from the same hasher are hex; compare without regard to case.
pub fn digests_match(a: &str, b: &str) -> bool {
    !a.is_empty() && a.eq_ignore_ascii_case(b)
}
