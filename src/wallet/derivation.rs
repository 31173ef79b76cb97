//! Address Encoding
//!
//! Turns derived public keys into coin addresses and decodes addresses back
//! into the raw bytes the transaction builders embed.

use crate::coin::{AddressFormat, CoinDescriptor, CoinType};
use crate::crypto::{Ed25519Curve, PublicKey, PublicKeyType};
use crate::error::{WalletError, WalletResult};
use crate::utils::crypto::{
    blake2b_224, decode_bech32, encode_bech32, encode_segwit, hash160, keccak256,
    to_checksum_address,
};

/// Shelley base address header: key payment credential, key staking
/// credential, mainnet
pub const CARDANO_BASE_HEADER: u8 = 0x01;

/// Encode the address for `public_key`. Cardano base addresses also need
/// the staking key.
pub fn encode_address(
    descriptor: &CoinDescriptor,
    public_key: &PublicKey,
    staking_key: Option<&PublicKey>,
) -> WalletResult<String> {
    match descriptor.address_format {
        AddressFormat::Segwit { hrp } => {
            let compressed = public_key.compressed()?;
            encode_segwit(hrp, 0, &compressed.hash160())
        }
        AddressFormat::Bech32Hash160 { hrp } => {
            let compressed = public_key.compressed()?;
            encode_bech32(hrp, &compressed.hash160())
        }
        AddressFormat::EthereumHex => Ok(to_checksum_address(&ethereum_address_bytes(public_key)?)),
        AddressFormat::CardanoBase { hrp, .. } => {
            let staking_key = staking_key.ok_or_else(|| {
                WalletError::invalid_input("Cardano base address requires a staking key")
            })?;
            encode_bech32(hrp, &cardano_base_address_bytes(public_key, staking_key)?)
        }
        AddressFormat::Base58PublicKey => {
            let bytes: [u8; 32] = public_key.key_bytes().try_into().map_err(|_| {
                WalletError::new(crate::error::ErrorCode::InvalidPublicKey, "expected a 32-byte key")
            })?;
            Ok(Ed25519Curve::to_solana_address(&bytes))
        }
    }
}

/// keccak256 of the uncompressed key without its 0x04 prefix, last 20 bytes
pub fn ethereum_address_bytes(public_key: &PublicKey) -> WalletResult<[u8; 20]> {
    let extended = public_key.extended()?;
    let hash = keccak256(&extended.as_bytes()[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    Ok(address)
}

/// blake2b-224 of a Cardano key, the credential used in addresses
pub fn cardano_key_hash(public_key: &PublicKey) -> WalletResult<[u8; 28]> {
    if public_key.key_type() != PublicKeyType::Ed25519Cardano {
        return Err(WalletError::new(
            crate::error::ErrorCode::InvalidPublicKey,
            format!("{:?} key is not a Cardano key", public_key.key_type()),
        ));
    }
    Ok(blake2b_224(public_key.key_bytes()))
}

/// `header || blake2b224(payment) || blake2b224(staking)`
pub fn cardano_base_address_bytes(payment: &PublicKey, staking: &PublicKey) -> WalletResult<Vec<u8>> {
    let mut raw = Vec::with_capacity(57);
    raw.push(CARDANO_BASE_HEADER);
    raw.extend_from_slice(&cardano_key_hash(payment)?);
    raw.extend_from_slice(&cardano_key_hash(staking)?);
    Ok(raw)
}

/// Decode an Ethereum address (checksum not enforced) to its 20 bytes
pub fn decode_ethereum_address(address: &str) -> WalletResult<[u8; 20]> {
    let trimmed = address.trim();
    let hex_part = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(|| WalletError::invalid_address(format!("missing 0x prefix: {}", address)))?;
    let bytes = hex::decode(hex_part)
        .map_err(|e| WalletError::invalid_address(format!("invalid hex address: {}", e)))?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| WalletError::invalid_address(format!("address must be 20 bytes, got {}", bytes.len())))
}

/// Decode a Binance Chain address to its 20-byte key hash
pub fn decode_binance_address(address: &str) -> WalletResult<[u8; 20]> {
    let hrp = match CoinType::BINANCE.descriptor()?.address_format {
        AddressFormat::Bech32Hash160 { hrp } => hrp,
        _ => return Err(WalletError::internal("Binance descriptor has an unexpected address format")),
    };
    let bytes = decode_bech32(hrp, address.trim())?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| WalletError::invalid_address(format!("address hash must be 20 bytes, got {}", bytes.len())))
}

/// Decode a Cardano Shelley address to its raw bytes
pub fn decode_cardano_address(address: &str) -> WalletResult<Vec<u8>> {
    let hrp = match CoinType::CARDANO.descriptor()?.address_format {
        AddressFormat::CardanoBase { hrp, .. } => hrp,
        _ => return Err(WalletError::internal("Cardano descriptor has an unexpected address format")),
    };
    let bytes = decode_bech32(hrp, address.trim())?;
    // header + payment credential at least (enterprise addresses are 29 bytes)
    if bytes.len() < 29 {
        return Err(WalletError::invalid_address(format!(
            "Cardano address too short: {} bytes",
            bytes.len()
        )));
    }
    Ok(bytes)
}

/// Payment credential of a raw Cardano address
pub fn cardano_payment_hash(address_bytes: &[u8]) -> WalletResult<[u8; 28]> {
    address_bytes
        .get(1..29)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| WalletError::invalid_address("Cardano address has no payment credential"))
}

/// HASH160 of a compressed key, as used by Bitcoin-family and Binance addresses
pub fn key_hash160(public_key: &PublicKey) -> WalletResult<[u8; 20]> {
    Ok(hash160(public_key.compressed()?.as_bytes()))
}
