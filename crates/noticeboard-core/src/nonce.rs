//! Time-windowed anti-CSRF tokens for dismiss links.
//!
//! A token is the first 10 hex chars of `HMAC-SHA256(secret, tick | action)`,
//! where `tick` advances every half lifetime. Tokens from the current and the
//! previous tick verify, so a link stays valid for between one half and one
//! full lifetime.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Default token lifetime: one day.
pub const DEFAULT_LIFETIME_SECS: i64 = 24 * 60 * 60;

/// Token length in hex chars (5 MAC bytes).
const TOKEN_LEN: usize = 10;

/// Issues and verifies tokens for a single actor secret.
#[derive(Debug, Clone)]
pub struct NonceSigner {
    secret: String,
    lifetime_secs: i64,
}

impl NonceSigner {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            lifetime_secs: DEFAULT_LIFETIME_SECS,
        }
    }

    pub fn with_lifetime(mut self, secs: i64) -> Self {
        self.lifetime_secs = secs.max(2);
        self
    }

    /// Tick index for a unix timestamp.
    pub fn tick(&self, unix_secs: i64) -> i64 {
        let half = self.lifetime_secs / 2;
        // ceil division; timestamps are non-negative in practice
        (unix_secs + half - 1).div_euclid(half)
    }

    pub fn create(&self, action: &str) -> String {
        self.create_at(action, now_unix())
    }

    /// Token for `action` at `unix_secs`. HMAC accepts keys of any length, so
    /// the empty fallback is never produced in practice and never verifies.
    pub fn create_at(&self, action: &str, unix_secs: i64) -> String {
        self.mac_for_tick(self.tick(unix_secs), action)
            .map(|mac| hex::encode(mac.finalize().into_bytes())[..TOKEN_LEN].to_string())
            .unwrap_or_default()
    }

    pub fn verify(&self, token: &str, action: &str) -> bool {
        self.verify_at(token, action, now_unix())
    }

    pub fn verify_at(&self, token: &str, action: &str, unix_secs: i64) -> bool {
        if token.len() != TOKEN_LEN {
            return false;
        }
        let Ok(tag) = hex::decode(token) else {
            return false;
        };
        let tick = self.tick(unix_secs);
        [tick, tick - 1].iter().any(|t| {
            self.mac_for_tick(*t, action)
                .is_some_and(|mac| mac.verify_truncated_left(&tag).is_ok())
        })
    }

    fn mac_for_tick(&self, tick: i64, action: &str) -> Option<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes()).ok()?;
        mac.update(format!("{tick}|{action}").as_bytes());
        Some(mac)
    }
}

fn now_unix() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}
