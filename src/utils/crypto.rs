//! Hashing and encoding helpers shared by the key engine and the compiler.

use bech32::{FromBase32, ToBase32, Variant};
use bitcoin::hashes::{hash160, sha256, sha256d, Hash};
use blake2::digest::consts::{U28, U32};
use blake2::{Blake2b, Digest};
use tiny_keccak::{Hasher, Keccak};

use crate::error::{WalletError, WalletResult};

/// Keccak256 hash (used for Ethereum addresses and signing hashes)
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut out = [0u8; 32];
    hasher.finalize(&mut out);
    out
}

pub fn sha256(data: &[u8]) -> [u8; 32] {
    sha256::Hash::hash(data).to_byte_array()
}

pub fn sha256d(data: &[u8]) -> [u8; 32] {
    sha256d::Hash::hash(data).to_byte_array()
}

/// RIPEMD160(SHA256(data))
pub fn hash160(data: &[u8]) -> [u8; 20] {
    hash160::Hash::hash(data).to_byte_array()
}

pub fn blake2b_224(data: &[u8]) -> [u8; 28] {
    let mut hasher = Blake2b::<U28>::new();
    hasher.update(data);
    hasher.finalize().into()
}

pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b::<U32>::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Convert raw address bytes to an EIP-55 checksummed Ethereum address
pub fn to_checksum_address(address: &[u8]) -> String {
    let lower = hex::encode(address);
    let hash = keccak256(lower.as_bytes());

    let mut result = String::from("0x");
    for (i, ch) in lower.chars().enumerate() {
        let byte = hash[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };

        if ch.is_ascii_alphabetic() && nibble >= 8 {
            result.push(ch.to_ascii_uppercase());
        } else {
            result.push(ch);
        }
    }

    result
}

/// Plain bech32 over 8-bit data (Binance, Cardano)
pub fn encode_bech32(hrp: &str, data: &[u8]) -> WalletResult<String> {
    Ok(bech32::encode(hrp, data.to_base32(), Variant::Bech32)?)
}

/// Decode plain bech32, requiring the given human-readable part
pub fn decode_bech32(expected_hrp: &str, address: &str) -> WalletResult<Vec<u8>> {
    let (hrp, data, variant) = bech32::decode(address)?;
    if hrp != expected_hrp || variant != Variant::Bech32 {
        return Err(WalletError::invalid_address(format!(
            "expected {} address, got prefix {}",
            expected_hrp, hrp
        )));
    }
    Ok(Vec::<u8>::from_base32(&data)?)
}

/// Segwit address: version as its own 5-bit group, then the program.
/// Version 0 uses bech32, later versions bech32m (BIP-350).
pub fn encode_segwit(hrp: &str, version: u8, program: &[u8]) -> WalletResult<String> {
    let mut data = vec![bech32::u5::try_from_u8(version)?];
    data.extend(program.to_base32());
    let variant = if version == 0 { Variant::Bech32 } else { Variant::Bech32m };
    Ok(bech32::encode(hrp, data, variant)?)
}

/// Returns (witness version, program)
pub fn decode_segwit(expected_hrp: &str, address: &str) -> WalletResult<(u8, Vec<u8>)> {
    let (hrp, data, variant) = bech32::decode(address)?;
    if hrp != expected_hrp {
        return Err(WalletError::invalid_address(format!(
            "expected prefix {}, got {}",
            expected_hrp, hrp
        )));
    }
    let (version, program) = data
        .split_first()
        .ok_or_else(|| WalletError::invalid_address("empty witness program"))?;
    let version = version.to_u8();
    let expected_variant = if version == 0 { Variant::Bech32 } else { Variant::Bech32m };
    if version > 16 || variant != expected_variant {
        return Err(WalletError::invalid_address("invalid witness version or checksum variant"));
    }
    let program = Vec::<u8>::from_base32(program)?;
    if program.len() < 2 || program.len() > 40 {
        return Err(WalletError::invalid_address(format!(
            "invalid witness program length {}",
            program.len()
        )));
    }
    Ok((version, program))
}

pub fn encode_base58check(payload: &[u8]) -> String {
    bitcoin::base58::encode_check(payload)
}

pub fn decode_base58check(encoded: &str) -> WalletResult<Vec<u8>> {
    bitcoin::base58::decode_check(encoded)
        .map_err(|e| WalletError::invalid_address(format!("Base58Check error: {}", e)))
}
