// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Strava OAuth credential model.

use serde::{Deserialize, Serialize};

/// Seconds before `expires_at` at which a credential is treated as expired.
pub const EXPIRY_SKEW_SECS: i64 = 10;

/// Access/refresh token pair as last reported by Strava.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
    /// Absolute expiry (unix seconds) exactly as Strava reported it.
    pub expires_at: i64,
}

impl Credential {
    /// Whether the access token must be refreshed before use at `now` (unix seconds).
    pub fn needs_refresh(&self, now: i64) -> bool {
        now >= self.expires_at - EXPIRY_SKEW_SECS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential(expires_at: i64) -> Credential {
        Credential {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at,
        }
    }

    #[test]
    fn test_fresh_when_outside_skew() {
        assert!(!credential(1_000).needs_refresh(989));
        assert!(!credential(1_000).needs_refresh(0));
    }

    #[test]
    fn test_needs_refresh_at_skew_boundary() {
        assert!(credential(1_000).needs_refresh(990));
        assert!(credential(1_000).needs_refresh(1_000));
        assert!(credential(1_000).needs_refresh(5_000));
    }
}
