//! Blindjack
//!
//! Mental Poker (1979) blackjack using ElGamal masking over BLS12-381.
//! Designed by the Sonia Code & Gemini AI (2026)
//!
//! Copyright (c) 2026 Sonia Code; See LICENSE file for license details.

//! Shuffle-proof backends.
//!
//! The proving system is external: the core hands a validated [`WitnessRecord`] in and
//! gets an opaque [`ShuffleProof`] out, and asks the backend to check a proof against the
//! [`PublicInputs`] of a received deck. How the backend does that is its own business.

use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
};

use alloy_primitives::Keccak256;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    error::ProtocolError,
    shuffle::{PublicInputs, WitnessRecord},
};

/// Proof and public-signal documents produced by a backend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShuffleProof {
    pub proof: Value,
    pub public_signals: Value,
}

pub trait ShuffleProofBackend {
    fn generate_proof(&self, witness: &WitnessRecord) -> Result<ShuffleProof, ProtocolError>;

    /// `Ok(false)` for a proof that does not verify, `Err` only when the backend itself
    /// could not run.
    fn verify_proof(
        &self,
        proof: &ShuffleProof,
        public_inputs: &PublicInputs,
    ) -> Result<bool, ProtocolError>;
}

impl<T: ShuffleProofBackend + ?Sized> ShuffleProofBackend for Box<T> {
    fn generate_proof(&self, witness: &WitnessRecord) -> Result<ShuffleProof, ProtocolError> {
        (**self).generate_proof(witness)
    }

    fn verify_proof(
        &self,
        proof: &ShuffleProof,
        public_inputs: &PublicInputs,
    ) -> Result<bool, ProtocolError> {
        (**self).verify_proof(proof, public_inputs)
    }
}

const OPENING_SCHEME: &str = "opening-v1";

/// In-process backend whose proof is the opening of the witness.
///
/// The verifier learns the permutation, so this is sound but not zero-knowledge. It is
/// meant for tests and local demos where both seats are run by the same operator.
#[derive(Clone, Copy, Debug, Default)]
pub struct OpeningBackend;

fn public_inputs_digest(inputs: &PublicInputs) -> String {
    let mut hasher = Keccak256::new();
    for card in inputs.original_deck.iter().chain(&inputs.shuffled_deck) {
        hasher.update(card.as_bytes());
    }
    let digest: [u8; 32] = hasher.finalize().into();
    hex::encode(digest)
}

impl ShuffleProofBackend for OpeningBackend {
    fn generate_proof(&self, witness: &WitnessRecord) -> Result<ShuffleProof, ProtocolError> {
        let digest = public_inputs_digest(&witness.public_inputs());
        Ok(ShuffleProof {
            proof: json!({
                "scheme": OPENING_SCHEME,
                "permutation": witness.permutation,
            }),
            public_signals: json!([digest]),
        })
    }

    fn verify_proof(
        &self,
        proof: &ShuffleProof,
        public_inputs: &PublicInputs,
    ) -> Result<bool, ProtocolError> {
        if proof.proof.get("scheme").and_then(Value::as_str) != Some(OPENING_SCHEME) {
            return Ok(false);
        }

        let expected = json!([public_inputs_digest(public_inputs)]);
        if proof.public_signals != expected {
            return Ok(false);
        }

        let Some(permutation) = proof
            .proof
            .get("permutation")
            .cloned()
            .and_then(|p| serde_json::from_value::<Vec<usize>>(p).ok())
        else {
            return Ok(false);
        };

        let witness = WitnessRecord {
            original_deck: public_inputs.original_deck.clone(),
            shuffled_deck: public_inputs.shuffled_deck.clone(),
            permutation,
        };
        Ok(witness.validate().is_ok())
    }
}

const INPUT_FILE: &str = "input.json";
const PROOF_FILE: &str = "proof.json";
const PUBLIC_FILE: &str = "public.json";
const PUBLIC_INPUTS_FILE: &str = "public_inputs.json";

/// Drives an external prover executable through JSON documents in `work_dir`.
///
/// Proving runs `program <prove_args..> input.json proof.json public.json` and reads the
/// two output documents back. Verification writes `public_inputs.json`, `proof.json` and
/// `public.json` and runs `program <verify_args..> public_inputs.json proof.json
/// public.json`; exit status 0 means the proof verified.
#[derive(Clone, Debug)]
pub struct CommandBackend {
    program: PathBuf,
    prove_args: Vec<String>,
    verify_args: Vec<String>,
    work_dir: PathBuf,
}

impl CommandBackend {
    pub fn new(program: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            prove_args: vec!["prove".into()],
            verify_args: vec!["verify".into()],
            work_dir: work_dir.into(),
        }
    }

    pub fn with_prove_args(mut self, args: Vec<String>) -> Self {
        self.prove_args = args;
        self
    }

    pub fn with_verify_args(mut self, args: Vec<String>) -> Self {
        self.verify_args = args;
        self
    }

    fn path(&self, name: &str) -> PathBuf {
        self.work_dir.join(name)
    }

    /// File names are passed relative to `work_dir`, which is the child's working directory.
    fn run(&self, args: &[String], files: &[&str]) -> Result<bool, ProtocolError> {
        let output = Command::new(&self.program)
            .args(args)
            .args(files)
            .current_dir(&self.work_dir)
            .output()
            .map_err(|e| {
                ProtocolError::ProofBackendError(format!(
                    "failed to run {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            tracing::debug!(
                program = %self.program.display(),
                status = ?output.status.code(),
                stderr = %String::from_utf8_lossy(&output.stderr),
                "prover exited with failure"
            );
        }
        Ok(output.status.success())
    }
}

fn write_json(path: &Path, value: &impl Serialize) -> Result<(), ProtocolError> {
    let data = serde_json::to_vec_pretty(value)
        .map_err(|e| ProtocolError::ProofBackendError(e.to_string()))?;
    fs::write(path, data).map_err(|e| {
        ProtocolError::ProofBackendError(format!("cannot write {}: {}", path.display(), e))
    })
}

fn read_json(path: &Path) -> Result<Value, ProtocolError> {
    let data = fs::read(path).map_err(|e| {
        ProtocolError::ProofBackendError(format!("cannot read {}: {}", path.display(), e))
    })?;
    serde_json::from_slice(&data).map_err(|e| {
        ProtocolError::ProofBackendError(format!("invalid JSON in {}: {}", path.display(), e))
    })
}

impl ShuffleProofBackend for CommandBackend {
    fn generate_proof(&self, witness: &WitnessRecord) -> Result<ShuffleProof, ProtocolError> {
        fs::create_dir_all(&self.work_dir)
            .map_err(|e| ProtocolError::ProofBackendError(e.to_string()))?;

        write_json(&self.path(INPUT_FILE), witness)?;

        if !self.run(&self.prove_args, &[INPUT_FILE, PROOF_FILE, PUBLIC_FILE])? {
            return Err(ProtocolError::ProofBackendError(format!(
                "{} could not prove the shuffle",
                self.program.display()
            )));
        }

        Ok(ShuffleProof {
            proof: read_json(&self.path(PROOF_FILE))?,
            public_signals: read_json(&self.path(PUBLIC_FILE))?,
        })
    }

    fn verify_proof(
        &self,
        proof: &ShuffleProof,
        public_inputs: &PublicInputs,
    ) -> Result<bool, ProtocolError> {
        fs::create_dir_all(&self.work_dir)
            .map_err(|e| ProtocolError::ProofBackendError(e.to_string()))?;

        write_json(&self.path(PUBLIC_INPUTS_FILE), public_inputs)?;
        write_json(&self.path(PROOF_FILE), &proof.proof)?;
        write_json(&self.path(PUBLIC_FILE), &proof.public_signals)?;

        self.run(
            &self.verify_args,
            &[PUBLIC_INPUTS_FILE, PROOF_FILE, PUBLIC_FILE],
        )
    }
}
