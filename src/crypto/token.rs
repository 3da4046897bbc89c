use base64::{Engine as _, engine::general_purpose};
use rand::RngCore;
use rand::rngs::OsRng;

/// The size of a verification-code token in bytes.
const CODE_TOKEN_SIZE: usize = 32;

/// Generates a new random verification-code token.
///
/// # Returns
///
/// A URL-safe base64-encoded token, 256 bits of entropy.
pub fn generate_code_token() -> String {
    let mut token = [0u8; CODE_TOKEN_SIZE];
    OsRng.fill_bytes(&mut token);

    general_purpose::URL_SAFE_NO_PAD.encode(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique_and_url_safe() {
        let a = generate_code_token();
        let b = generate_code_token();

        assert_ne!(a, b);
        // 32 bytes come out as 43 unpadded base64 characters.
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
