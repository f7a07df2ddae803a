use rand::Rng;

/// Lowercase alphanumerics only, so tokens survive URLs and copy/paste intact.
const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

pub const ACCESS_TOKEN_LEN: usize = 24;

/// Generates an unguessable public access token (used for vote_id / results_id).
///
/// 24 characters over a 36-symbol alphabet gives ~124 bits of entropy, so
/// tokens are unguessable and collisions are left to the unique index to catch.
pub fn access_token() -> String {
    let mut rng = rand::thread_rng();
    (0..ACCESS_TOKEN_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Checks the shape of a public access token received in a URL.
pub fn is_access_token(value: &str) -> bool {
    (20..=30).contains(&value.len())
        && value
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_shape() {
        let token = access_token();
        assert_eq!(token.len(), ACCESS_TOKEN_LEN);
        assert!(is_access_token(&token));
    }

    #[test]
    fn test_tokens_are_distinct() {
        let a = access_token();
        let b = access_token();
        assert_ne!(a, b);
    }

    #[test]
    fn test_is_access_token_rejects_bad_shapes() {
        assert!(!is_access_token(""));
        assert!(!is_access_token("short"));
        assert!(!is_access_token(&"a".repeat(31)));
        assert!(!is_access_token("ABCDEFGHIJKLMNOPQRSTUVWX")); // uppercase
        assert!(!is_access_token("abcdefghij-lmnopqrstuvwx")); // punctuation
        assert!(is_access_token(&"a2".repeat(12)));
    }
}
