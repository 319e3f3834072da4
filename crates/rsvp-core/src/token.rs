//! QR token minting.
//!
//! A token is a fixed prefix plus `length` characters drawn uniformly from
//! the 62-symbol alphanumeric alphabet. With the defaults that is 62^12
//! (about 3.2e21) possible tokens per prefix. Uniqueness is still enforced
//! by the store; callers retry on a token collision up to
//! `TokenPolicy::max_attempts` times.

use std::sync::Mutex;

use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rsvp_state::QrToken;
use serde::{Deserialize, Serialize};

/// Shape of minted tokens and how often insertion may retry on collision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPolicy {
    /// Human-recognisable prefix, e.g. `QR_`.
    pub prefix: String,
    /// Number of random characters after the prefix.
    pub length: usize,
    /// Total insert attempts before giving up.
    pub max_attempts: u32,
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            prefix: "QR_".to_string(),
            length: 12,
            max_attempts: 5,
        }
    }
}

/// Mints check-in tokens.
#[derive(Debug)]
pub struct TokenIssuer {
    policy: TokenPolicy,
    rng: Mutex<StdRng>,
}

impl TokenIssuer {
    /// Issuer seeded from OS entropy.
    pub fn new(policy: TokenPolicy) -> Self {
        Self {
            policy,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic issuer; two issuers with the same seed mint the same
    /// sequence of tokens.
    pub fn with_seed(policy: TokenPolicy, seed: u64) -> Self {
        Self {
            policy,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn policy(&self) -> &TokenPolicy {
        &self.policy
    }

    /// Mint a fresh token.
    pub fn issue(&self) -> QrToken {
        let mut rng = self
            .rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let body: String = (&mut *rng)
            .sample_iter(&Alphanumeric)
            .take(self.policy.length)
            .map(char::from)
            .collect();
        QrToken::new(format!("{}{}", self.policy.prefix, body))
    }
}

impl Default for TokenIssuer {
    fn default() -> Self {
        Self::new(TokenPolicy::default())
    }
}
