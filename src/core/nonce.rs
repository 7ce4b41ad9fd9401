use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

/// Action scope for refresh requests. Both the localized client payload and
/// the refresh endpoints use this scope.
pub const REFRESH_ACTION: &str = "force-refresh";

const TOKEN_BYTES: usize = 24;

#[derive(Debug, Error)]
pub enum NonceError {
    #[error("unknown or already used nonce")]
    Unknown,
    #[error("nonce expired")]
    Expired,
    #[error("nonce was issued for a different scope")]
    ScopeMismatch,
}

struct IssuedNonce {
    action: String,
    user_id: i64,
    issued_at: DateTime<Utc>,
}

/// Single-use, action-scoped anti-forgery tokens. Tokens are consumed on
/// first verification regardless of outcome.
pub struct NonceStore {
    ttl: Duration,
    issued: Mutex<HashMap<String, IssuedNonce>>,
}

impl NonceStore {
    pub fn new(ttl_hours: i64) -> Self {
        NonceStore {
            ttl: Duration::hours(ttl_hours),
            issued: Mutex::new(HashMap::new()),
        }
    }

    pub fn issue(&self, action: &str, user_id: i64) -> String {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = URL_SAFE_NO_PAD.encode(bytes);

        let mut issued = self.issued.lock().expect("nonce store poisoned");
        // Most issued nonces are never consumed; sweep the expired ones here
        // so the map stays bounded by the issue rate within one TTL window.
        let cutoff = Utc::now() - self.ttl;
        issued.retain(|_, nonce| nonce.issued_at > cutoff);
        issued.insert(
            token.clone(),
            IssuedNonce {
                action: action.to_string(),
                user_id,
                issued_at: Utc::now(),
            },
        );
        token
    }

    /// Number of outstanding (issued, unconsumed) nonces.
    pub fn outstanding(&self) -> usize {
        self.issued.lock().expect("nonce store poisoned").len()
    }

    pub fn consume(&self, token: &str, action: &str, user_id: i64) -> Result<(), NonceError> {
        let mut issued = self.issued.lock().expect("nonce store poisoned");
        let nonce = issued.remove(token).ok_or(NonceError::Unknown)?;

        if nonce.action != action || nonce.user_id != user_id {
            return Err(NonceError::ScopeMismatch);
        }
        if nonce.issued_at + self.ttl < Utc::now() {
            return Err(NonceError::Expired);
        }
        Ok(())
    }
}
