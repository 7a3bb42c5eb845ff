//! Lenient base64url handling shared by tokens and configured keys.

use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE},
    DecodeError, Engine as _,
};

/// Decode base64url (or plain base64), with or without `=` padding.
///
/// The URL-safe alphabet is folded onto the standard one and the input is
/// padded to a multiple of four before a standard decode, so tokens from
/// either encoder are accepted.
pub fn decode_base64url(input: &str) -> Result<Vec<u8>, DecodeError> {
    let mut normalized = normalize(input);
    let decoded = STANDARD.decode(&normalized);
    // Inputs include configured keys.
    normalized.iter_mut().for_each(|b| *b = 0);
    decoded
}

fn normalize(input: &str) -> Vec<u8> {
    let trimmed = input.trim().as_bytes();
    let mut out = Vec::with_capacity(trimmed.len() + 3);
    out.extend(trimmed.iter().map(|&b| match b {
        b'-' => b'+',
        b'_' => b'/',
        other => other,
    }));
    while out.len() % 4 != 0 {
        out.push(b'=');
    }
    out
}

/// Encode bytes as padded base64url.
pub fn encode_base64url(bytes: &[u8]) -> String {
    URL_SAFE.encode(bytes)
}
