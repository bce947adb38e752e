use std::path::Path;

use sha2::Digest;

use crate::error::IngestError;

pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = sha2::Sha256::digest(bytes);
    hex::encode(digest)
}

/// Checksum of an uploaded file, compared against the checksum declared at
/// intake to produce the pipeline's integrity signal.
pub fn file_sha256_hex(path: &Path) -> Result<String, IngestError> {
    let bytes = std::fs::read(path).map_err(|e| IngestError::io(path, e))?;
    Ok(sha256_hex(&bytes))
}

/// Case-insensitive digest comparison; declared checksums arrive from
/// external systems with mixed hex casing.
pub fn checksum_matches(declared: &str, actual: &str) -> bool {
    declared.trim().eq_ignore_ascii_case(actual.trim())
}

#[cfg(test)]
mod tests {
    use super::{checksum_matches, sha256_hex};

    #[test]
    fn digest_is_stable() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn comparison_ignores_case_and_whitespace() {
        let digest = sha256_hex(b"station data");
        assert!(checksum_matches(&digest.to_uppercase(), &digest));
        assert!(checksum_matches(&format!(" {digest} "), &digest));
        assert!(!checksum_matches(&digest, &sha256_hex(b"other")));
    }
}
