use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Length of a hex-encoded BLAKE3 digest.
pub const DIGEST_HEX_LEN: usize = 64;

/// Streaming BLAKE3 over `chunk_size` reads; memory stays bounded by the
/// chunk regardless of file size.
pub fn hash_file(path: &Path, chunk_size: usize) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; chunk_size.max(1)];

    loop {
        match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => {
                hasher.update(&buffer[..n]);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(hasher.finalize().to_hex().to_string())
}
