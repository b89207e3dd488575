//! Stateless admin session tokens.
//!
//! A token is `"{issued_at_ms}.{sig}"` where `sig` is the first 24 hex
//! characters of `HMAC-SHA256(secret, "{issued_at_ms}|{user_agent}")`, the
//! user agent taken as the raw header bytes.
//! Nothing is stored server-side: a token is valid while its signature
//! recomputes for the current request's user-agent and its age stays within
//! [`SESSION_LIFETIME_MS`].
//!
//! The user-agent binding only makes replay from a different client harder.
//! A fresh token replayed with a matching user-agent stays valid until it
//! ages out, and changing the admin password does not revoke it.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroize;

type HmacSha256 = Hmac<Sha256>;

/// Fixed validity window of a minted token (12 hours).
pub const SESSION_LIFETIME_MS: i64 = 12 * 60 * 60 * 1000;

/// Name of the cookie carrying the token.
pub const SESSION_COOKIE: &str = "admin";

/// Hex characters kept from the HMAC output.
const SIGNATURE_HEX_LEN: usize = 24;

/// Mints and verifies session tokens with a process-wide secret.
pub struct SessionCodec {
    secret: Vec<u8>,
    lifetime_ms: i64,
}

impl SessionCodec {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self::with_lifetime(secret, SESSION_LIFETIME_MS)
    }

    pub fn with_lifetime(secret: impl Into<Vec<u8>>, lifetime_ms: i64) -> Self {
        Self {
            secret: secret.into(),
            lifetime_ms,
        }
    }

    pub fn lifetime_ms(&self) -> i64 {
        self.lifetime_ms
    }

    fn mac(&self, issued_at_ms: i64, user_agent: &[u8]) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC-SHA256 accepts keys of any length");
        mac.update(format!("{}|", issued_at_ms).as_bytes());
        mac.update(user_agent);
        mac
    }

    /// Mint a token for a client identified by the raw `User-Agent` bytes.
    pub fn mint(&self, issued_at_ms: i64, user_agent: &[u8]) -> String {
        let digest = self.mac(issued_at_ms, user_agent).finalize().into_bytes();
        let sig = hex::encode(&digest[..SIGNATURE_HEX_LEN / 2]);
        format!("{}.{}", issued_at_ms, sig)
    }

    /// Check a presented token against the current request. Never panics;
    /// every malformed input is simply invalid.
    pub fn verify(&self, token: Option<&str>, user_agent: &[u8], now_ms: i64) -> bool {
        let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) else {
            return false;
        };

        let parts: Vec<&str> = token.split('.').collect();
        let [issued_at, sig] = parts.as_slice() else {
            return false;
        };

        let Ok(issued_at) = issued_at.parse::<i64>() else {
            return false;
        };
        if now_ms.saturating_sub(issued_at) > self.lifetime_ms {
            return false;
        }

        // The encoder only ever emits lowercase hex; anything else is not a
        // token we issued.
        if sig.len() != SIGNATURE_HEX_LEN
            || !sig.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        {
            return false;
        }
        let Ok(sig_bytes) = hex::decode(sig) else {
            return false;
        };

        self.mac(issued_at, user_agent)
            .verify_truncated_left(&sig_bytes)
            .is_ok()
    }
}

impl Drop for SessionCodec {
    fn drop(&mut self) {
        self.secret.zeroize();
    }
}

impl std::fmt::Debug for SessionCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCodec")
            .field("secret", &"<redacted>")
            .field("lifetime_ms", &self.lifetime_ms)
            .finish()
    }
}
