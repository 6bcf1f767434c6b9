//! Login-form CSRF protection.

use crate::error::EngineError;
use crate::models::CSRF_KEY;
use crate::random::random_bytes;
use crate::store::KvStore;
use chrono::Utc;
use hmac::{Hmac, Mac};
use log::{debug, info};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SECRET_LEN: usize = 32;

/// Resolves the process-wide CSRF secret.
///
/// A configured secret replaces a different stored one. Without one the
/// stored secret is adopted, or a new one is created. Concurrent creators
/// converge on whichever secret reached the store first.
pub async fn bootstrap_secret<S: KvStore + ?Sized>(
    store: &S,
    configured: Option<&[u8]>,
) -> Result<Vec<u8>, EngineError> {
    if let Some(stored) = store.get(CSRF_KEY).await? {
        return match configured {
            Some(secret) if secret != stored.as_slice() => {
                info!("Replacing stored CSRF secret with the configured one");
                store.set(CSRF_KEY, secret).await?;
                Ok(secret.to_vec())
            }
            Some(secret) => Ok(secret.to_vec()),
            None => Ok(stored),
        };
    }

    let secret = match configured {
        Some(secret) => secret.to_vec(),
        None => random_bytes(SECRET_LEN)?,
    };
    if store.compare_and_swap(CSRF_KEY, None, &secret).await? {
        debug!("Stored new CSRF secret");
        return Ok(secret);
    }
    if configured.is_some() {
        store.set(CSRF_KEY, &secret).await?;
        return Ok(secret);
    }
    debug!("Another process created the CSRF secret first, adopting it");
    store.get(CSRF_KEY).await?.ok_or(EngineError::NotFound)
}

/// Issues and checks `<unix-seconds>.<hex hmac>` tokens bound to a form action
#[derive(Clone)]
pub struct CsrfGuard {
    secret: Vec<u8>,
    ttl_secs: i64,
}

impl CsrfGuard {
    pub fn new(secret: Vec<u8>, ttl_secs: i64) -> Self {
        Self { secret, ttl_secs }
    }

    pub fn issue(&self, action: &str) -> Result<String, EngineError> {
        self.issue_at(action, Utc::now().timestamp())
    }

    pub fn verify(&self, action: &str, token: &str) -> bool {
        self.verify_at(action, token, Utc::now().timestamp())
    }

    fn issue_at(&self, action: &str, issued: i64) -> Result<String, EngineError> {
        let mac = self.mac(action, issued)?;
        Ok(format!("{issued}.{}", hex::encode(mac.finalize().into_bytes())))
    }

    fn verify_at(&self, action: &str, token: &str, now: i64) -> bool {
        let Some((issued, signature)) = token.split_once('.') else {
            return false;
        };
        let Ok(issued) = issued.parse::<i64>() else {
            return false;
        };
        if issued > now || now.checked_sub(issued).is_none_or(|age| age > self.ttl_secs) {
            return false;
        }
        let Ok(signature) = hex::decode(signature) else {
            return false;
        };
        match self.mac(action, issued) {
            Ok(mac) => mac.verify_slice(&signature).is_ok(),
            Err(_) => false,
        }
    }

    fn mac(&self, action: &str, issued: i64) -> Result<HmacSha256, EngineError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| EngineError::Hash(e.to_string()))?;
        mac.update(issued.to_string().as_bytes());
        mac.update(b"|");
        mac.update(action.as_bytes());
        Ok(mac)
    }
}

impl std::fmt::Debug for CsrfGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsrfGuard")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}
