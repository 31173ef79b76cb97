//! Bitcoin-family locking scripts
//!
//! Builds the standard output scripts from addresses or hashes and matches
//! them back to the hash they commit to.

use bitcoin::blockdata::opcodes::all::{
    OP_CHECKSIG, OP_DUP, OP_EQUAL, OP_EQUALVERIFY, OP_HASH160, OP_PUSHNUM_1,
};
use bitcoin::blockdata::opcodes::OP_0;
use bitcoin::ScriptBuf;

use crate::coin::CoinType;
use crate::error::{ErrorCode, WalletError, WalletResult};
use crate::utils::crypto::{decode_base58check, decode_segwit};

/// Standard script templates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    P2pkh,
    P2sh,
    P2wpkh,
    P2wsh,
    /// Witness program of version 1 to 16
    WitnessProgram(u8),
    NonStandard,
}

/// Decode `address` with the coin's hrp and version bytes and return the
/// script it pays to
pub fn lock_script_for_address(address: &str, coin: CoinType) -> WalletResult<ScriptBuf> {
    let params = coin.descriptor()?.utxo_params()?;
    let trimmed = address.trim();

    if trimmed.to_lowercase().starts_with(&format!("{}1", params.hrp)) {
        let (version, program) = decode_segwit(params.hrp, trimmed)?;
        return match (version, program.len()) {
            (0, 20) => Ok(build_p2wpkh(&to_array(&program)?)),
            (0, 32) => Ok(build_p2wsh(&to_array(&program)?)),
            (0, len) => Err(WalletError::invalid_address(format!(
                "version 0 witness program must be 20 or 32 bytes, got {}",
                len
            ))),
            (v, _) => Ok(build_witness_program(v, &program)),
        };
    }

    let payload = decode_base58check(trimmed)?;
    if payload.len() != 21 {
        return Err(WalletError::invalid_address(format!(
            "Base58 payload must be 21 bytes, got {}",
            payload.len()
        )));
    }
    let hash = to_array::<20>(&payload[1..])?;
    match payload[0] {
        prefix if prefix == params.p2pkh_prefix => Ok(build_p2pkh(&hash)),
        prefix if prefix == params.p2sh_prefix => Ok(build_p2sh(&hash)),
        prefix => Err(WalletError::invalid_address(format!(
            "version byte 0x{:02x} is not used by {}",
            prefix, coin
        ))),
    }
}

fn to_array<const N: usize>(bytes: &[u8]) -> WalletResult<[u8; N]> {
    bytes
        .try_into()
        .map_err(|_| WalletError::invalid_address(format!("expected {} bytes, got {}", N, bytes.len())))
}

/// `OP_DUP OP_HASH160 <20> OP_EQUALVERIFY OP_CHECKSIG`
pub fn build_p2pkh(pub_key_hash: &[u8; 20]) -> ScriptBuf {
    let mut bytes = Vec::with_capacity(25);
    bytes.push(OP_DUP.to_u8());
    bytes.push(OP_HASH160.to_u8());
    bytes.push(20);
    bytes.extend_from_slice(pub_key_hash);
    bytes.push(OP_EQUALVERIFY.to_u8());
    bytes.push(OP_CHECKSIG.to_u8());
    ScriptBuf::from_bytes(bytes)
}

/// `OP_HASH160 <20> OP_EQUAL`
pub fn build_p2sh(script_hash: &[u8; 20]) -> ScriptBuf {
    let mut bytes = Vec::with_capacity(23);
    bytes.push(OP_HASH160.to_u8());
    bytes.push(20);
    bytes.extend_from_slice(script_hash);
    bytes.push(OP_EQUAL.to_u8());
    ScriptBuf::from_bytes(bytes)
}

/// `OP_0 <20>`
pub fn build_p2wpkh(pub_key_hash: &[u8; 20]) -> ScriptBuf {
    build_witness_program(0, pub_key_hash)
}

/// `OP_0 <32>`
pub fn build_p2wsh(script_hash: &[u8; 32]) -> ScriptBuf {
    build_witness_program(0, script_hash)
}

fn build_witness_program(version: u8, program: &[u8]) -> ScriptBuf {
    let mut bytes = Vec::with_capacity(2 + program.len());
    bytes.push(if version == 0 {
        OP_0.to_u8()
    } else {
        OP_PUSHNUM_1.to_u8() + version - 1
    });
    bytes.push(program.len() as u8);
    bytes.extend_from_slice(program);
    ScriptBuf::from_bytes(bytes)
}

/// `(version, program)` if the script is a witness program
pub fn witness_program(script: &[u8]) -> Option<(u8, &[u8])> {
    if script.len() < 4 || script.len() > 42 {
        return None;
    }
    let version = match script[0] {
        0x00 => 0,
        op if (OP_PUSHNUM_1.to_u8()..=OP_PUSHNUM_1.to_u8() + 15).contains(&op) => op - OP_PUSHNUM_1.to_u8() + 1,
        _ => return None,
    };
    let len = script[1] as usize;
    if len + 2 != script.len() {
        return None;
    }
    Some((version, &script[2..]))
}

/// Key hash of `0x00 0x14 <20 bytes>`; anything else is `NotWitnessProgram`
pub fn match_p2wpkh(script: &[u8]) -> WalletResult<[u8; 20]> {
    match witness_program(script) {
        Some((0, program)) if program.len() == 20 => to_array(program),
        _ => Err(WalletError::new(
            ErrorCode::NotWitnessProgram,
            format!("not a P2WPKH script: {}", hex::encode(script)),
        )),
    }
}

/// Script hash of `0x00 0x20 <32 bytes>`
pub fn match_p2wsh(script: &[u8]) -> WalletResult<[u8; 32]> {
    match witness_program(script) {
        Some((0, program)) if program.len() == 32 => to_array(program),
        _ => Err(WalletError::new(
            ErrorCode::NotWitnessProgram,
            format!("not a P2WSH script: {}", hex::encode(script)),
        )),
    }
}

pub fn match_p2pkh(script: &[u8]) -> WalletResult<[u8; 20]> {
    let is_p2pkh = script.len() == 25
        && script[0] == OP_DUP.to_u8()
        && script[1] == OP_HASH160.to_u8()
        && script[2] == 20
        && script[23] == OP_EQUALVERIFY.to_u8()
        && script[24] == OP_CHECKSIG.to_u8();
    if !is_p2pkh {
        return Err(WalletError::new(
            ErrorCode::InvalidOutputScript,
            format!("not a P2PKH script: {}", hex::encode(script)),
        ));
    }
    to_array(&script[3..23])
}

pub fn match_p2sh(script: &[u8]) -> WalletResult<[u8; 20]> {
    let is_p2sh = script.len() == 23
        && script[0] == OP_HASH160.to_u8()
        && script[1] == 20
        && script[22] == OP_EQUAL.to_u8();
    if !is_p2sh {
        return Err(WalletError::new(
            ErrorCode::InvalidOutputScript,
            format!("not a P2SH script: {}", hex::encode(script)),
        ));
    }
    to_array(&script[2..22])
}

pub fn classify(script: &[u8]) -> ScriptKind {
    if match_p2pkh(script).is_ok() {
        return ScriptKind::P2pkh;
    }
    if match_p2sh(script).is_ok() {
        return ScriptKind::P2sh;
    }
    match witness_program(script) {
        Some((0, p)) if p.len() == 20 => ScriptKind::P2wpkh,
        Some((0, p)) if p.len() == 32 => ScriptKind::P2wsh,
        Some((v, _)) if v > 0 => ScriptKind::WitnessProgram(v),
        _ => ScriptKind::NonStandard,
    }
}
