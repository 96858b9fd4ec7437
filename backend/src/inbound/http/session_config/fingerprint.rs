//! Session key fingerprints for startup logs.
//!
//! Operators compare fingerprints across replicas to confirm they share a
//! key without the key material ever being logged.

use actix_web::cookie::Key;
use sha2::{Digest, Sha256};

const FINGERPRINT_BYTES: usize = 8;

/// First eight bytes of the SHA-256 of the signing key, lowercase hex.
///
/// ```
/// use actix_web::cookie::Key;
/// use logistics::inbound::http::session_config::key_fingerprint;
///
/// let fingerprint = key_fingerprint(&Key::derive_from(&[7u8; 64]));
/// assert_eq!(fingerprint.len(), 16);
/// ```
#[must_use]
pub fn key_fingerprint(key: &Key) -> String {
    let digest = Sha256::digest(key.signing());
    hex::encode(digest.iter().take(FINGERPRINT_BYTES).copied().collect::<Vec<u8>>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn same_key_same_fingerprint() {
        let key = Key::derive_from(&[b'a'; 64]);
        assert_eq!(key_fingerprint(&key), key_fingerprint(&key.clone()));
    }

    #[rstest]
    fn fingerprints_are_short_lowercase_hex() {
        let fingerprint = key_fingerprint(&Key::generate());
        assert_eq!(fingerprint.len(), FINGERPRINT_BYTES * 2);
        assert!(
            fingerprint
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        );
    }

    #[rstest]
    fn distinct_keys_are_distinguishable() {
        assert_ne!(
            key_fingerprint(&Key::derive_from(&[b'a'; 64])),
            key_fingerprint(&Key::derive_from(&[b'b'; 64]))
        );
    }
}
