//! Signing inputs
//!
//! One record per signing family, wrapped in the chain-tagged
//! [`SigningInput`]. Callers edit an input by decoding it, changing fields,
//! and encoding it again.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::codec::{decode_payload, encode_payload, PayloadKind};
use crate::coin::SigningFamily;
use crate::error::WalletResult;
use crate::utils::config::CompilerConfig;

/// Chain-tagged signing input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SigningInput {
    Bitcoin(BitcoinSigningInput),
    Ethereum(EthereumSigningInput),
    Binance(BinanceSigningInput),
    Cardano(CardanoSigningInput),
}

impl SigningInput {
    pub fn family(&self) -> SigningFamily {
        match self {
            Self::Bitcoin(_) => SigningFamily::Bitcoin,
            Self::Ethereum(_) => SigningFamily::Ethereum,
            Self::Binance(_) => SigningFamily::Binance,
            Self::Cardano(_) => SigningFamily::Cardano,
        }
    }

    pub fn encode(&self) -> WalletResult<Vec<u8>> {
        self.encode_with_config(&CompilerConfig::default())
    }

    pub fn encode_with_config(&self, config: &CompilerConfig) -> WalletResult<Vec<u8>> {
        encode_payload(PayloadKind::SigningInput, self, config.max_payload_bytes)
    }

    pub fn decode(bytes: &[u8]) -> WalletResult<Self> {
        Self::decode_with_config(bytes, &CompilerConfig::default())
    }

    pub fn decode_with_config(bytes: &[u8], config: &CompilerConfig) -> WalletResult<Self> {
        decode_payload(PayloadKind::SigningInput, bytes, config.max_payload_bytes)
    }
}

// MARK: - Bitcoin

/// Reference to a previous output. `hash` is in serialization order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutPoint {
    pub hash: [u8; 32],
    pub index: u32,
    pub sequence: u32,
}

impl OutPoint {
    pub fn new(hash: [u8; 32], index: u32) -> Self {
        Self {
            hash,
            index,
            sequence: u32::MAX,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnspentTransaction {
    pub out_point: OutPoint,
    /// Satoshis; must be positive
    pub amount: i64,
    /// Locking script of the spent output
    pub script: Vec<u8>,
}

/// Amounts fixed by the caller instead of computed by the planner
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPlan {
    pub amount: u64,
    pub available_amount: u64,
    pub fee: u64,
    pub change: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitcoinSigningInput {
    /// Base type plus the ANYONECANPAY and FORK flags; fork id in the upper bits
    pub hash_type: u32,
    pub amount: u64,
    /// Satoshis per virtual byte; zero uses the configured default
    pub byte_fee: u64,
    pub to_address: String,
    pub change_address: String,
    pub use_max_amount: bool,
    /// Spent in this order
    pub utxos: Vec<UnspentTransaction>,
    /// Redeem scripts keyed by hex of the witness-program hash
    pub scripts: BTreeMap<String, Vec<u8>>,
    pub plan: Option<TransactionPlan>,
    pub version: i32,
    pub lock_time: u32,
}

impl Default for BitcoinSigningInput {
    fn default() -> Self {
        Self {
            hash_type: 0x01,
            amount: 0,
            byte_fee: 0,
            to_address: String::new(),
            change_address: String::new(),
            use_max_amount: false,
            utxos: Vec::new(),
            scripts: BTreeMap::new(),
            plan: None,
            version: 1,
            lock_time: 0,
        }
    }
}

// MARK: - Ethereum

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EthereumTxMode {
    /// EIP-155 replay-protected legacy transaction
    #[default]
    Legacy,
    /// Type 0x02 fee-market transaction
    Eip1559,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EthereumSigningInput {
    pub chain_id: u64,
    pub nonce: u64,
    pub tx_mode: EthereumTxMode,
    /// Legacy only
    pub gas_price: u128,
    pub gas_limit: u64,
    /// EIP-1559 only
    pub max_inclusion_fee_per_gas: u128,
    /// EIP-1559 only
    pub max_fee_per_gas: u128,
    /// Optional; when set, the signer's address must match
    pub from_address: String,
    /// Empty for contract creation
    pub to_address: String,
    /// Wei
    pub amount: u128,
    pub data: Vec<u8>,
}

// MARK: - Binance

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub denom: String,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendOrderEntry {
    /// 20-byte key hash
    pub address: Vec<u8>,
    pub coins: Vec<Token>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendOrder {
    pub inputs: Vec<SendOrderEntry>,
    pub outputs: Vec<SendOrderEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinanceSigningInput {
    pub chain_id: String,
    pub account_number: i64,
    pub sequence: i64,
    pub source: i64,
    pub memo: String,
    pub send_order: SendOrder,
}

// MARK: - Cardano

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardanoUtxo {
    pub tx_hash: [u8; 32],
    pub output_index: u32,
    /// Bech32 address holding the output; its payment key signs
    pub address: String,
    /// Lovelace
    pub amount: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardanoSigningInput {
    pub utxos: Vec<CardanoUtxo>,
    pub to_address: String,
    pub change_address: String,
    pub amount: u64,
    /// Zero estimates the linear fee
    pub fee: u64,
    /// Zero omits the validity bound
    pub ttl: u64,
    pub use_max_amount: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_encode_decode_preserves_fields() {
        let mut bitcoin = BitcoinSigningInput {
            amount: 1_200_000,
            byte_fee: 1,
            to_address: "bc1q2dsdlq3343vk29runkgv4yc292hmq53jedfjmp".to_string(),
            ..Default::default()
        };
        bitcoin.utxos.push(UnspentTransaction {
            out_point: OutPoint::new([7u8; 32], 1),
            amount: 500_000,
            script: vec![0x00, 0x14],
        });
        bitcoin.scripts.insert("ab".to_string(), vec![0x76]);
        let input = SigningInput::Bitcoin(bitcoin);

        let bytes = input.encode().unwrap();
        assert_eq!(bytes[0], 1);
        assert_eq!(bytes[1], 1);
        assert_eq!(SigningInput::decode(&bytes).unwrap(), input);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = SigningInput::decode(&[1, 1, 0xff, 0xff, 0xff, 0xff]).unwrap_err();
        assert_eq!(err.code, ErrorCode::InputParse);
        assert!(SigningInput::decode(&[]).is_err());
    }

    #[test]
    fn test_family_tags() {
        assert_eq!(SigningInput::Binance(Default::default()).family(), SigningFamily::Binance);
        assert_eq!(SigningInput::Cardano(Default::default()).family(), SigningFamily::Cardano);
        assert_eq!(BitcoinSigningInput::default().hash_type, 1);
        assert_eq!(OutPoint::new([0; 32], 0).sequence, u32::MAX);
    }
}
