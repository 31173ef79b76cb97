//! Versioned payload envelope
//!
//! `[version: u8][kind: u8][body]`, where the body is bincode with fixed-width
//! little-endian integers. Trailing bytes and oversized payloads are rejected.

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::SigningError;
use crate::error::{ErrorCode, WalletError, WalletResult};

pub const CODEC_VERSION: u8 = 1;

const HEADER_LEN: usize = 2;

/// Record carried by a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PayloadKind {
    SigningInput = 1,
    PreSigningOutput = 2,
    SigningOutput = 3,
}

fn options(limit: u64) -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .reject_trailing_bytes()
        .with_limit(limit)
}

pub fn encode_payload<T: Serialize>(kind: PayloadKind, value: &T, limit: u64) -> WalletResult<Vec<u8>> {
    let body = options(limit).serialize(value).map_err(|e| {
        WalletError::new(ErrorCode::Internal, format!("{:?} payload could not be encoded: {}", kind, e))
    })?;

    let mut out = Vec::with_capacity(HEADER_LEN + body.len());
    out.push(CODEC_VERSION);
    out.push(kind as u8);
    out.extend_from_slice(&body);
    Ok(out)
}

pub fn decode_payload<T: DeserializeOwned>(kind: PayloadKind, bytes: &[u8], limit: u64) -> WalletResult<T> {
    if bytes.len() < HEADER_LEN {
        return Err(SigningError::MalformedPayload(format!("{} bytes is shorter than the header", bytes.len())).into());
    }
    if bytes.len() as u64 > limit.saturating_add(HEADER_LEN as u64) {
        return Err(SigningError::MalformedPayload(format!(
            "{} bytes exceeds the {} byte limit",
            bytes.len(),
            limit
        ))
        .into());
    }

    let (header, body) = bytes.split_at(HEADER_LEN);
    if header[0] != CODEC_VERSION {
        return Err(SigningError::MalformedPayload(format!("unknown version {}", header[0])).into());
    }
    if header[1] != kind as u8 {
        return Err(SigningError::MalformedPayload(format!(
            "expected {:?} (kind {}), got kind {}",
            kind, kind as u8, header[1]
        ))
        .into());
    }

    Ok(options(limit).deserialize(body)?)
}
