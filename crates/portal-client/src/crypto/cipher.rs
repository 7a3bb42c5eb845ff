//! AES-128-CBC with PKCS#7 padding.
//!
//! CBC gives no integrity on its own. Whether the trailing token tag is
//! checked is decided one layer up, in [`crate::envelope`].

use aes::Aes128;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use thiserror::Error;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// Byte length of an AES-128 key.
pub const KEY_LEN: usize = 16;

/// Byte length of a CBC initialization vector.
pub const IV_LEN: usize = 16;

/// AES block size.
pub const BLOCK_LEN: usize = 16;

/// Errors produced by the cipher layer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    /// The ciphertext is empty or not a whole number of blocks.
    #[error("ciphertext length {0} is not a positive multiple of {BLOCK_LEN}")]
    InvalidLength(usize),

    /// Decryption produced invalid PKCS#7 padding (wrong key, wrong IV on a
    /// single-block message, or tampered ciphertext).
    #[error("invalid padding after decryption")]
    InvalidPadding,
}

/// Encrypt `plaintext` under `key` and `iv`, appending PKCS#7 padding.
pub fn encrypt(plaintext: &[u8], key: &[u8; KEY_LEN], iv: &[u8; IV_LEN]) -> Vec<u8> {
    Aes128CbcEnc::new(&(*key).into(), &(*iv).into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext)
}

/// Decrypt `ciphertext` under `key` and `iv` and strip PKCS#7 padding.
///
/// # Errors
///
/// Returns [`CipherError::InvalidLength`] for empty or ragged input and
/// [`CipherError::InvalidPadding`] when the final block does not unpad.
pub fn decrypt(
    ciphertext: &[u8],
    key: &[u8; KEY_LEN],
    iv: &[u8; IV_LEN],
) -> Result<Vec<u8>, CipherError> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
        return Err(CipherError::InvalidLength(ciphertext.len()));
    }
    Aes128CbcDec::new(&(*key).into(), &(*iv).into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CipherError::InvalidPadding)
}
