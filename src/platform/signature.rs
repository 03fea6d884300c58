//! Webhook signature verification.
//!
//! LINE signs every webhook delivery with HMAC-SHA256 over the raw request
//! body, keyed by the channel secret, and sends the base64 digest in the
//! `X-Line-Signature` header:
//!
//! ```text
//! signature = base64(HMAC-SHA256(channel_secret, body))
//! ```
//!
//! Verification decodes the provided signature and compares it against the
//! expected MAC in constant time. Telegram uses a shared secret token
//! instead; it is compared with [`constant_time_eq`].

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::PlatformError;

/// HMAC-SHA256 type alias
type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 body signer keyed by a channel secret.
#[derive(Clone)]
pub struct BodySigner {
    secret_key: Vec<u8>,
}

impl BodySigner {
    /// Create a signer with the given secret.
    pub fn new(secret_key: impl AsRef<[u8]>) -> Self {
        Self {
            secret_key: secret_key.as_ref().to_vec(),
        }
    }

    /// Base64-encoded signature of `body`.
    pub fn sign(&self, body: &[u8]) -> String {
        BASE64.encode(self.mac(body))
    }

    /// Verify a base64 signature against `body`.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::InvalidSignature`] if the signature is not
    /// valid base64 or does not match.
    pub fn verify(&self, body: &[u8], signature: &str) -> Result<(), PlatformError> {
        let provided = BASE64
            .decode(signature.trim())
            .map_err(|_| PlatformError::InvalidSignature)?;

        if constant_time_eq(&provided, &self.mac(body)) {
            Ok(())
        } else {
            Err(PlatformError::InvalidSignature)
        }
    }

    fn mac(&self, body: &[u8]) -> Vec<u8> {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret_key).expect("HMAC can take key of any size");
        mac.update(body);
        mac.finalize().into_bytes().to_vec()
    }
}

impl std::fmt::Debug for BodySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodySigner").finish_non_exhaustive()
    }
}

/// Compare two byte strings without early exit.
///
/// Slices of different lengths compare unequal.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}
