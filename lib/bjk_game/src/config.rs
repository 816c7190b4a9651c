//! Blindjack
//!
//! Mental Poker (1979) blackjack using ElGamal masking over BLS12-381.
//! Designed by the Sonia Code & Gemini AI (2026)
//!
//! Copyright (c) 2026 Sonia Code; See LICENSE file for license details.

use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How long to wait for the counterpart's next message before aborting.
    pub message_timeout_ms: u64,
    /// Public key declarations must carry a proof of knowledge of the secret key.
    pub require_key_proofs: bool,
    /// Unmask shares must carry a proof binding them to the sender's public key.
    pub require_share_proofs: bool,
    /// Deck hand-offs must carry one masking proof per card.
    pub require_mask_proofs: bool,
    /// Send the permutation along with the witness in `send-deck`.
    pub disclose_permutation: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            message_timeout_ms: 30_000,
            require_key_proofs: true,
            require_share_proofs: true,
            require_mask_proofs: true,
            disclose_permutation: false,
        }
    }
}

impl SessionConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ProtocolError> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|e| {
            ProtocolError::MalformedMessage(format!("cannot read {}: {}", path.display(), e))
        })?;
        Ok(serde_json::from_slice(&data)?)
    }

    pub const fn message_timeout(&self) -> Duration {
        Duration::from_millis(self.message_timeout_ms)
    }
}
