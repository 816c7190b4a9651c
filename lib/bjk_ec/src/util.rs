//! Blindjack
//!
//! Mental Poker (1979) blackjack using ElGamal masking over BLS12-381.
//! Designed by the Sonia Code & Gemini AI (2026)
//!
//! Copyright (c) 2026 Sonia Code; See LICENSE file for license details.

use bls12_381::G1Affine;
use pairing::group::Curve;
use serde::{Deserialize, Serialize};

use crate::{
    error::EcError,
    types::{GroupElement, Scalar},
};

pub const COORDINATE_LEN: usize = 48;
pub const POINT_UNCOMPRESSED_LEN: usize = 96;
pub const SCALAR_LEN: usize = 32;

/// Flag bits carried in the top of the first byte of a serialized coordinate.
const FLAG_BITS: u8 = 0b1110_0000;

/// Affine coordinates as fixed-width lowercase hex.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PointHex {
    pub x: String,
    pub y: String,
}

/// Raw affine coordinates, flags stripped. The identity maps to all zeroes, which is not
/// a point on the curve and therefore cannot collide with a real encoding.
pub fn point_to_uncompressed(p: &GroupElement) -> [u8; POINT_UNCOMPRESSED_LEN] {
    let affine = p.to_affine();
    if bool::from(affine.is_identity()) {
        return [0u8; POINT_UNCOMPRESSED_LEN];
    }
    affine.to_uncompressed()
}

pub fn point_from_uncompressed(bytes: &[u8]) -> Result<GroupElement, EcError> {
    if bytes.len() != POINT_UNCOMPRESSED_LEN {
        return Err(EcError::MalformedPoint(format!(
            "expected {} bytes, got {}",
            POINT_UNCOMPRESSED_LEN,
            bytes.len()
        )));
    }
    if bytes.iter().all(|b| *b == 0) {
        return Ok(GroupElement::identity());
    }
    if bytes[0] & FLAG_BITS != 0 {
        return Err(EcError::MalformedPoint("flag bits set".into()));
    }
    let mut raw = [0u8; POINT_UNCOMPRESSED_LEN];
    raw.copy_from_slice(bytes);
    G1Affine::from_uncompressed(&raw)
        .into_option()
        .map(GroupElement::from)
        .ok_or_else(|| EcError::MalformedPoint("not a point of the prime order subgroup".into()))
}

pub fn encode_point(p: &GroupElement) -> PointHex {
    let bytes = point_to_uncompressed(p);
    PointHex {
        x: hex::encode(&bytes[..COORDINATE_LEN]),
        y: hex::encode(&bytes[COORDINATE_LEN..]),
    }
}

pub fn decode_point(point: &PointHex) -> Result<GroupElement, EcError> {
    let x = decode_coordinate(&point.x)?;
    let y = decode_coordinate(&point.y)?;
    let mut bytes = [0u8; POINT_UNCOMPRESSED_LEN];
    bytes[..COORDINATE_LEN].copy_from_slice(&x);
    bytes[COORDINATE_LEN..].copy_from_slice(&y);
    point_from_uncompressed(&bytes)
}

fn decode_coordinate(data: &str) -> Result<[u8; COORDINATE_LEN], EcError> {
    if data.len() != COORDINATE_LEN * 2 || data.bytes().any(|c| c.is_ascii_uppercase()) {
        return Err(EcError::MalformedPoint(format!(
            "coordinate must be {} lowercase hex characters",
            COORDINATE_LEN * 2
        )));
    }
    let mut out = [0u8; COORDINATE_LEN];
    hex::decode_to_slice(data, &mut out).map_err(|e| EcError::MalformedPoint(e.to_string()))?;
    Ok(out)
}

/// `x || y` as one hex string.
pub fn point_fingerprint(p: &GroupElement) -> String {
    hex::encode(point_to_uncompressed(p))
}

/// Little-endian canonical scalar bytes as hex.
pub fn scalar_to_hex(s: &Scalar) -> String {
    hex::encode(s.to_bytes())
}

pub fn scalar_from_hex(data: &str) -> Result<Scalar, EcError> {
    if data.len() != SCALAR_LEN * 2 {
        return Err(EcError::MalformedScalar("Len Error".into()));
    }
    let mut bytes = [0u8; SCALAR_LEN];
    hex::decode_to_slice(data, &mut bytes).map_err(|e| EcError::MalformedScalar(e.to_string()))?;
    Scalar::from_bytes(&bytes)
        .into_option()
        .ok_or_else(|| EcError::MalformedScalar("Decode Error".into()))
}

/// Reduces a 32-byte digest into the scalar field.
pub fn scalar_from_digest(digest: &[u8; 32]) -> Scalar {
    let mut wide = [0u8; 64];
    wide[..32].copy_from_slice(digest);
    Scalar::from_bytes_wide(&wide)
}
