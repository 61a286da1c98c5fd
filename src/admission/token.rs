use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::{rngs::OsRng, TryRngCore};
use tracing::{debug, error};

use crate::shared::AppError;

/// Number of random bytes behind each token (128 bits)
const TOKEN_BYTES: usize = 16;

/// Trait for minting participant tokens
pub trait TokenIssuer: Send + Sync {
    /// Returns a fresh opaque, URL-safe token
    fn mint(&self) -> Result<String, AppError>;
}

/// Token issuer backed by the operating system's CSPRNG
pub struct RandomTokenIssuer;

impl RandomTokenIssuer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RandomTokenIssuer {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenIssuer for RandomTokenIssuer {
    fn mint(&self) -> Result<String, AppError> {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.try_fill_bytes(&mut bytes).map_err(|e| {
            error!(error = %e, "OS randomness source unavailable");
            AppError::RandomnessUnavailable(e.to_string())
        })?;

        let token = URL_SAFE_NO_PAD.encode(bytes);
        debug!(token_len = token.len(), "Minted participant token");
        Ok(token)
    }
}
