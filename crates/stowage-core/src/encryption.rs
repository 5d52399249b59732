//! Object cipher for file content at rest
//!
//! Stored objects are laid out as `nonce || ciphertext || tag`. The nonce is freshly
//! generated for every encryption. AES-GCM authenticates the ciphertext, so truncated or
//! modified objects fail to decrypt instead of yielding garbage.

use crate::AppError;
use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes128Gcm, Aes256Gcm, Nonce,
};

/// Length of the nonce prefixed to every stored object
pub const NONCE_LEN: usize = 12;

/// Length of the authentication tag appended by AES-GCM
pub const TAG_LEN: usize = 16;

/// Suffix appended to the object path of every encrypted file
pub const ENCRYPTED_SUFFIX: &str = ".encrypted";

/// Bytes an object of `plaintext_len` bytes occupies on disk once sealed
pub fn sealed_len(plaintext_len: u64) -> u64 {
    plaintext_len.saturating_add((NONCE_LEN + TAG_LEN) as u64)
}

/// AES-128 and AES-256 keys are accepted.
pub fn is_supported_key_len(len: usize) -> bool {
    len == 16 || len == 32
}

#[derive(Clone)]
enum CipherKind {
    Aes128(Aes128Gcm),
    Aes256(Aes256Gcm),
}

/// Symmetric cipher used by the encrypted object store
#[derive(Clone)]
pub struct ObjectCipher {
    cipher: CipherKind,
}

impl ObjectCipher {
    /// Create a cipher from raw key bytes. The key length selects AES-128 or AES-256.
    pub fn from_key_bytes(key_bytes: &[u8]) -> Result<Self, AppError> {
        let cipher = match key_bytes.len() {
            16 => CipherKind::Aes128(
                Aes128Gcm::new_from_slice(key_bytes)
                    .map_err(|e| AppError::Crypto(format!("Invalid key: {}", e)))?,
            ),
            32 => CipherKind::Aes256(
                Aes256Gcm::new_from_slice(key_bytes)
                    .map_err(|e| AppError::Crypto(format!("Invalid key: {}", e)))?,
            ),
            n => {
                return Err(AppError::Crypto(format!(
                    "Encryption key must be 16 or 32 bytes, got {}",
                    n
                )))
            }
        };
        Ok(Self { cipher })
    }

    /// Key size in bits
    pub fn key_bits(&self) -> u16 {
        match self.cipher {
            CipherKind::Aes128(_) => 128,
            CipherKind::Aes256(_) => 256,
        }
    }

    /// Encrypt `plaintext`, returning `nonce || ciphertext || tag`
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, AppError> {
        let (nonce, ciphertext) = match &self.cipher {
            CipherKind::Aes128(c) => {
                let nonce = Aes128Gcm::generate_nonce(&mut OsRng);
                (nonce, c.encrypt(&nonce, plaintext))
            }
            CipherKind::Aes256(c) => {
                let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
                (nonce, c.encrypt(&nonce, plaintext))
            }
        };
        let ciphertext =
            ciphertext.map_err(|e| AppError::Crypto(format!("Encryption failed: {}", e)))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Decrypt an object produced by [`ObjectCipher::encrypt`]
    pub fn decrypt(&self, sealed: &[u8]) -> Result<Vec<u8>, AppError> {
        if sealed.len() < NONCE_LEN {
            return Err(AppError::Crypto(format!(
                "Ciphertext too short: {} bytes, nonce alone is {}",
                sealed.len(),
                NONCE_LEN
            )));
        }

        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce);

        let plaintext = match &self.cipher {
            CipherKind::Aes128(c) => c.decrypt(nonce, ciphertext),
            CipherKind::Aes256(c) => c.decrypt(nonce, ciphertext),
        };

        plaintext.map_err(|_| {
            AppError::Crypto("Decryption failed: wrong key or corrupted ciphertext".to_string())
        })
    }
}
