//! `ContentHasher` — the deduplication key used across the history store.
//!
//! The digest is non-cryptographic by design (spec only requires collision
//! resistance adequate to disambiguate a user's own files); `twox-hash`'s
//! `XxHash64` gives us a fast, deterministic 64-bit digest that hashes large
//! video files without becoming the bottleneck the hasher would be if we
//! reached for something like `sha2`.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use twox_hash::XxHash64;

use std::hash::Hasher;

/// Chunk size used while streaming a file through the hasher.
const HASH_CHUNK_SIZE: usize = 8 * 1024;

/// Seed used for every digest; fixed so that hashes are stable across runs
/// and across machines.
const HASH_SEED: u64 = 0;

/// Computes the stable content digest for the file at `path`.
///
/// On any I/O error, returns the empty string; callers treat that as an
/// unrecoverable pre-upload failure for the file (per spec: `HashFailure`).
pub fn hash_file<P: AsRef<Path>>(path: P) -> String {
    match hash_file_inner(path.as_ref()) {
        Ok(digest) => digest,
        Err(_) => String::new(),
    }
}

fn hash_file_inner(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = XxHash64::with_seed(HASH_SEED);
    let mut buf = [0u8; HASH_CHUNK_SIZE];

    loop {
        let read = file.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.write(&buf[..read]);
    }

    Ok(format!("{:016x}", hasher.finish()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn hash_is_deterministic() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"the quick brown fox").unwrap();
        let a = hash_file(f.path());
        let b = hash_file(f.path());
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn different_contents_hash_differently() {
        let mut a = NamedTempFile::new().unwrap();
        a.write_all(b"alpha").unwrap();
        let mut b = NamedTempFile::new().unwrap();
        b.write_all(b"beta").unwrap();
        assert_ne!(hash_file(a.path()), hash_file(b.path()));
    }

    #[test]
    fn missing_file_hashes_to_empty_string() {
        assert_eq!(hash_file("/does/not/exist/at/all"), String::new());
    }

    #[test]
    fn hash_spans_multiple_chunks() {
        let mut f = NamedTempFile::new().unwrap();
        let data = vec![42u8; HASH_CHUNK_SIZE * 3 + 17];
        f.write_all(&data).unwrap();
        let digest = hash_file(f.path());
        assert_eq!(digest.len(), 16);
    }
}
