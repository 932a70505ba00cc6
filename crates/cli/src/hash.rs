//! `aipctl config hash`: a content hash operators can diff across
//! deployments, normalizing line endings so a Windows checkout doesn't
//! produce a spurious mismatch against a Linux one.

use sha2::{Digest, Sha256};

pub fn compute_and_display(path: &str) -> Result<(), String> {
    let content = std::fs::read_to_string(path).map_err(|err| err.to_string())?;
    println!("{}", compute(&content));
    Ok(())
}

fn compute(content: &str) -> String {
    let normalized = content.replace("\r\n", "\n");
    let digest = Sha256::digest(normalized.as_bytes());
    format!("sha256:{}", hex::encode(digest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_across_crlf_and_lf() {
        let lf = compute("a: 1\nb: 2\n");
        let crlf = compute("a: 1\r\nb: 2\r\n");
        assert_eq!(lf, crlf);
    }

    #[test]
    fn hash_has_sha256_prefix() {
        assert!(compute("x").starts_with("sha256:"));
    }

    #[test]
    fn different_content_hashes_differently() {
        assert_ne!(compute("a"), compute("b"));
    }
}
