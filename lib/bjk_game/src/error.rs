//! Blindjack
//!
//! Mental Poker (1979) blackjack using ElGamal masking over BLS12-381.
//! Designed by the Sonia Code & Gemini AI (2026)
//!
//! Copyright (c) 2026 Sonia Code; See LICENSE file for license details.

use bjk_ec::error::EcError;
use thiserror::Error;

/// Every variant is fatal for the session it occurred in.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Proof verification failed: {0}")]
    ProofVerificationFailed(String),

    #[error("Malformed point: {0}")]
    MalformedPoint(String),

    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Unmasked card does not decode to any of the 52 cards")]
    UnknownCardEncoding,

    #[error("Invalid permutation witness: {0}")]
    InvalidPermutationWitness(String),

    #[error("Declared public keys do not match the frozen aggregate key")]
    AggregateKeyMismatch,

    #[error("At least one public key is required")]
    MissingPublicKeys,

    #[error("Shuffle proof backend failed: {0}")]
    ProofBackendError(String),

    #[error("Counterpart disconnected")]
    NetworkDisconnect,

    #[error("Timed out waiting for counterpart")]
    Timeout,

    #[error("Unexpected message {message} in phase {phase}")]
    UnexpectedMessage { phase: String, message: String },

    #[error("Out of turn: {0}")]
    OutOfTurn(String),

    #[error("No unused cards left in the deck")]
    DeckExhausted,

    #[error("Session is closed")]
    SessionClosed,
}

impl From<EcError> for ProtocolError {
    fn from(err: EcError) -> Self {
        match err {
            EcError::MalformedPoint(msg) => ProtocolError::MalformedPoint(msg),
            EcError::MalformedScalar(msg) => ProtocolError::MalformedMessage(msg),
            EcError::UnknownCardEncoding => ProtocolError::UnknownCardEncoding,
            EcError::CardOutOfRange(i) => {
                ProtocolError::MalformedMessage(format!("card index {} out of range", i))
            }
        }
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        ProtocolError::MalformedMessage(err.to_string())
    }
}
