//! Pre-Image Hash Generation
//!
//! Computes the digests an external signer must sign, each paired with the
//! hash of the key expected to sign it. Pairs come back in the order the
//! compiler expects the signatures.

pub mod binance;
pub mod bitcoin;
pub mod cardano;
pub mod ethereum;

use serde::{Deserialize, Serialize};

use super::codec::{decode_payload, encode_payload, PayloadKind};
use super::{ensure_family, SigningInput};
use crate::coin::CoinType;
use crate::error::{ErrorCode, WalletError, WalletResult};
use crate::utils::config::CompilerConfig;
use crate::{log_debug, log_warn};

/// A digest to sign and the hash of the key that must sign it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashPublicKey {
    pub data_hash: Vec<u8>,
    /// HASH160 for Bitcoin and Binance, the address for Ethereum (empty when
    /// no sender was given), blake2b-224 for Cardano
    pub public_key_hash: Vec<u8>,
}

impl HashPublicKey {
    pub fn new(data_hash: impl Into<Vec<u8>>, public_key_hash: impl Into<Vec<u8>>) -> Self {
        Self {
            data_hash: data_hash.into(),
            public_key_hash: public_key_hash.into(),
        }
    }
}

/// Result of preimage computation as it crosses the byte boundary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreSigningOutput {
    pub hash_public_keys: Vec<HashPublicKey>,
    pub error: ErrorCode,
    pub error_message: String,
}

impl PreSigningOutput {
    pub fn new(hash_public_keys: Vec<HashPublicKey>) -> Self {
        Self {
            hash_public_keys,
            ..Default::default()
        }
    }

    pub fn failed(error: &WalletError) -> Self {
        Self {
            hash_public_keys: Vec::new(),
            error: error.code,
            error_message: error.message.clone(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_ok()
    }

    pub fn encode(&self) -> WalletResult<Vec<u8>> {
        self.encode_with_config(&CompilerConfig::default())
    }

    pub fn encode_with_config(&self, config: &CompilerConfig) -> WalletResult<Vec<u8>> {
        encode_payload(PayloadKind::PreSigningOutput, self, config.max_payload_bytes)
    }

    pub fn decode(bytes: &[u8]) -> WalletResult<Self> {
        Self::decode_with_config(bytes, &CompilerConfig::default())
    }

    pub fn decode_with_config(bytes: &[u8], config: &CompilerConfig) -> WalletResult<Self> {
        decode_payload(PayloadKind::PreSigningOutput, bytes, config.max_payload_bytes)
    }
}

/// Typed preimage computation; fails on the first invalid field
pub fn compute_pre_image_hashes(
    coin: CoinType,
    input: &SigningInput,
    config: &CompilerConfig,
) -> WalletResult<Vec<HashPublicKey>> {
    ensure_family(coin, input)?;

    let pairs = match input {
        SigningInput::Bitcoin(tx) => bitcoin::hash_public_keys(coin, tx, config)?,
        SigningInput::Ethereum(tx) => vec![ethereum::hash_public_key(tx)?],
        SigningInput::Binance(tx) => vec![binance::hash_public_key(tx)?],
        SigningInput::Cardano(tx) => cardano::hash_public_keys(tx, config)?,
    };

    log_debug!("preimage", "preimages computed", coin = coin, pairs = pairs.len());
    Ok(pairs)
}

/// Decode a signing input and return the encoded [`PreSigningOutput`]
pub fn pre_image_hashes(coin: CoinType, input: &[u8]) -> WalletResult<Vec<u8>> {
    pre_image_hashes_with_config(coin, input, &CompilerConfig::default())
}

/// Chain failures are reported inside the output; only an output that
/// cannot itself be encoded is an `Err`
pub fn pre_image_hashes_with_config(
    coin: CoinType,
    input: &[u8],
    config: &CompilerConfig,
) -> WalletResult<Vec<u8>> {
    let result = config
        .validate()
        .and_then(|_| SigningInput::decode_with_config(input, config))
        .and_then(|decoded| compute_pre_image_hashes(coin, &decoded, config));

    let output = match result {
        Ok(pairs) => PreSigningOutput::new(pairs),
        Err(e) => {
            log_warn!("preimage", "preimage computation failed", coin = coin, code = format!("{:?}", e.code));
            PreSigningOutput::failed(&e)
        }
    };
    output.encode_with_config(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::{BinanceSigningInput, EthereumSigningInput};

    #[test]
    fn test_failed_output_carries_code() {
        let err = WalletError::new(ErrorCode::LowBalance, "need more");
        let output = PreSigningOutput::failed(&err);
        assert!(!output.is_ok());
        assert!(output.hash_public_keys.is_empty());

        let decoded = PreSigningOutput::decode(&output.encode().unwrap()).unwrap();
        assert_eq!(decoded.error, ErrorCode::LowBalance);
        assert_eq!(decoded.error_message, "need more");
    }

    #[test]
    fn test_malformed_input_reported_in_output() {
        let bytes = pre_image_hashes(CoinType::ETHEREUM, &[1, 1, 9]).unwrap();
        let output = PreSigningOutput::decode(&bytes).unwrap();
        assert_eq!(output.error, ErrorCode::InputParse);
    }

    #[test]
    fn test_family_mismatch_reported_in_output() {
        let input = SigningInput::Binance(BinanceSigningInput::default()).encode().unwrap();
        let output = PreSigningOutput::decode(&pre_image_hashes(CoinType::BITCOIN, &input).unwrap()).unwrap();
        assert_eq!(output.error, ErrorCode::InputParse);
    }

    #[test]
    fn test_account_chain_returns_one_pair() {
        let input = SigningInput::Ethereum(EthereumSigningInput {
            chain_id: 1,
            gas_limit: 21000,
            to_address: "0x3535353535353535353535353535353535353535".to_string(),
            amount: 1,
            ..Default::default()
        });
        let pairs = compute_pre_image_hashes(CoinType::ETHEREUM, &input, &CompilerConfig::default()).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].data_hash.len(), 32);
        assert!(pairs[0].public_key_hash.is_empty());
    }
}
