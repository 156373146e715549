use rand::rngs::OsRng;
use rand::RngCore;

/// Generate a secure random token (32 bytes from the OS RNG, hex encoded = 64 characters)
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Whether a path segment looks like a generated token.
pub fn is_token_segment(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_hexdigit())
}
