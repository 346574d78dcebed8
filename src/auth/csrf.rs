use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Stateless CSRF tokens: an HMAC of the session id under the server secret.
/// Nothing is stored; a token dies with its session.
#[derive(Clone)]
pub struct CsrfService {
    mac: HmacSha256,
}

impl CsrfService {
    pub fn new(secret: &str) -> Result<Self> {
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| AppError::Internal(format!("Invalid CSRF key: {}", e)))?;
        Ok(Self { mac })
    }

    /// Token the client must echo in `X-CSRF-Token` for this session.
    pub fn token_for(&self, session_id: &str) -> String {
        hex::encode(self.sign(session_id))
    }

    pub fn verify(&self, session_id: &str, token: &str) -> bool {
        let Ok(presented) = hex::decode(token) else {
            return false;
        };
        let expected = self.sign(session_id);
        expected.ct_eq(&presented).into()
    }

    fn sign(&self, session_id: &str) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(b"csrf:");
        mac.update(session_id.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}
