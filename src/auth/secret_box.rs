use base64::{engine::general_purpose::STANDARD, Engine as _};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use sha2::{Digest, Sha256};

use crate::error::{AppError, Result};

/// Marker prefix on encrypted values. Stored values without it are plaintext
/// written before encryption was configured.
const PREFIX: &str = "enc:v1:";
const NONCE_LEN: usize = 12;

/// Encrypts small secrets (API tokens) before they are written to the database.
#[derive(Clone)]
pub struct SecretBox {
    cipher: ChaCha20Poly1305,
}

impl SecretBox {
    /// Derive the key from the server secret so no extra key material needs
    /// to be provisioned.
    pub fn from_secret(secret: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"devflow-secret-box");
        hasher.update(secret.as_bytes());
        let key: [u8; 32] = hasher.finalize().into();
        Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(&key)),
        }
    }

    pub fn seal(&self, plaintext: &str) -> Result<String> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        let mut nonce_bytes = [0u8; NONCE_LEN];
        {
            use rand::RngCore;
            rand::thread_rng().fill_bytes(&mut nonce_bytes);
        }
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|_| AppError::Internal("Failed to encrypt secret".to_string()))?;

        let mut payload = nonce_bytes.to_vec();
        payload.extend_from_slice(&ciphertext);
        Ok(format!("{}{}", PREFIX, STANDARD.encode(payload)))
    }

    pub fn open(&self, stored: &str) -> Result<String> {
        let Some(encoded) = stored.strip_prefix(PREFIX) else {
            return Ok(stored.to_string());
        };

        let payload = STANDARD
            .decode(encoded)
            .map_err(|e| AppError::Internal(format!("Corrupt stored secret: {}", e)))?;
        if payload.len() <= NONCE_LEN {
            return Err(AppError::Internal("Corrupt stored secret: too short".to_string()));
        }

        let (nonce, ciphertext) = payload.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| AppError::Internal("Failed to decrypt stored secret".to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|e| AppError::Internal(format!("Stored secret is not UTF-8: {}", e)))
    }
}
