//! Coin registry
//!
//! Coins are identified by their SLIP-44 number. Each registered id maps to
//! a [`CoinDescriptor`] naming its curve, canonical derivation path, address
//! encoding and, when transactions can be compiled for it, its signing
//! family.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::{CurveType, PublicKeyType};
use crate::error::{WalletError, WalletResult};

/// SLIP-44 coin identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoinType(pub u32);

impl CoinType {
    pub const BITCOIN: CoinType = CoinType(0);
    pub const LITECOIN: CoinType = CoinType(2);
    pub const ETHEREUM: CoinType = CoinType(60);
    pub const SOLANA: CoinType = CoinType(501);
    pub const BINANCE: CoinType = CoinType(714);
    pub const CARDANO: CoinType = CoinType(1815);

    /// Registry entry for this id
    pub fn descriptor(&self) -> WalletResult<&'static CoinDescriptor> {
        registry()
            .iter()
            .find(|d| d.id == *self)
            .ok_or_else(|| WalletError::unsupported_coin(self.0))
    }

    /// The transaction family, or `UnsupportedCoin` for address-only coins
    pub fn signing_family(&self) -> WalletResult<SigningFamily> {
        let descriptor = self.descriptor()?;
        descriptor.signing.ok_or_else(|| {
            WalletError::new(
                crate::error::ErrorCode::UnsupportedCoin,
                format!("{} has no transaction compiler", descriptor.name),
            )
        })
    }
}

impl fmt::Display for CoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.descriptor() {
            Ok(d) => write!(f, "{}", d.name),
            Err(_) => write!(f, "coin#{}", self.0),
        }
    }
}

impl std::str::FromStr for CoinType {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        if let Ok(id) = lower.parse::<u32>() {
            return CoinType(id).descriptor().map(|d| d.id);
        }
        registry()
            .iter()
            .find(|d| d.name.to_lowercase() == lower || d.symbol.to_lowercase() == lower)
            .map(|d| d.id)
            .ok_or_else(|| WalletError::invalid_input(format!("Unknown coin: {}", s)))
    }
}

/// How a public key becomes an address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFormat {
    /// Native segwit P2WPKH
    Segwit { hrp: &'static str },
    /// Plain bech32 over HASH160 of the compressed key
    Bech32Hash160 { hrp: &'static str },
    /// EIP-55 hex of keccak256(uncompressed key)[12..]
    EthereumHex,
    /// Shelley base address: payment and staking key hashes
    CardanoBase { hrp: &'static str, staking_path: &'static str },
    /// Base58 of the raw public key
    Base58PublicKey,
}

/// Transaction compiler dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SigningFamily {
    Bitcoin,
    Ethereum,
    Binance,
    Cardano,
}

/// Address parameters of a Bitcoin-family chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtxoParams {
    pub hrp: &'static str,
    pub p2pkh_prefix: u8,
    pub p2sh_prefix: u8,
}

/// Capabilities of one registered coin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoinDescriptor {
    pub id: CoinType,
    pub name: &'static str,
    pub symbol: &'static str,
    pub decimals: u8,
    pub curve: CurveType,
    pub public_key_type: PublicKeyType,
    pub derivation_path: &'static str,
    pub address_format: AddressFormat,
    pub signing: Option<SigningFamily>,
    pub utxo: Option<UtxoParams>,
}

impl CoinDescriptor {
    /// UTXO parameters, failing for account chains
    pub fn utxo_params(&self) -> WalletResult<UtxoParams> {
        self.utxo.ok_or_else(|| {
            WalletError::invalid_input(format!("{} is not a UTXO chain", self.name))
        })
    }
}

static REGISTRY: [CoinDescriptor; 6] = [
    CoinDescriptor {
        id: CoinType::BITCOIN,
        name: "Bitcoin",
        symbol: "BTC",
        decimals: 8,
        curve: CurveType::Secp256k1,
        public_key_type: PublicKeyType::Secp256k1,
        derivation_path: "m/84'/0'/0'/0/0",
        address_format: AddressFormat::Segwit { hrp: "bc" },
        signing: Some(SigningFamily::Bitcoin),
        utxo: Some(UtxoParams { hrp: "bc", p2pkh_prefix: 0x00, p2sh_prefix: 0x05 }),
    },
    CoinDescriptor {
        id: CoinType::LITECOIN,
        name: "Litecoin",
        symbol: "LTC",
        decimals: 8,
        curve: CurveType::Secp256k1,
        public_key_type: PublicKeyType::Secp256k1,
        derivation_path: "m/84'/2'/0'/0/0",
        address_format: AddressFormat::Segwit { hrp: "ltc" },
        signing: Some(SigningFamily::Bitcoin),
        utxo: Some(UtxoParams { hrp: "ltc", p2pkh_prefix: 0x30, p2sh_prefix: 0x32 }),
    },
    CoinDescriptor {
        id: CoinType::ETHEREUM,
        name: "Ethereum",
        symbol: "ETH",
        decimals: 18,
        curve: CurveType::Secp256k1,
        public_key_type: PublicKeyType::Secp256k1Extended,
        derivation_path: "m/44'/60'/0'/0/0",
        address_format: AddressFormat::EthereumHex,
        signing: Some(SigningFamily::Ethereum),
        utxo: None,
    },
    CoinDescriptor {
        id: CoinType::SOLANA,
        name: "Solana",
        symbol: "SOL",
        decimals: 9,
        curve: CurveType::Ed25519,
        public_key_type: PublicKeyType::Ed25519,
        derivation_path: "m/44'/501'/0'",
        address_format: AddressFormat::Base58PublicKey,
        signing: None,
        utxo: None,
    },
    CoinDescriptor {
        id: CoinType::BINANCE,
        name: "Binance",
        symbol: "BNB",
        decimals: 8,
        curve: CurveType::Secp256k1,
        public_key_type: PublicKeyType::Secp256k1,
        derivation_path: "m/44'/714'/0'/0/0",
        address_format: AddressFormat::Bech32Hash160 { hrp: "bnb" },
        signing: Some(SigningFamily::Binance),
        utxo: None,
    },
    CoinDescriptor {
        id: CoinType::CARDANO,
        name: "Cardano",
        symbol: "ADA",
        decimals: 6,
        curve: CurveType::Ed25519Cardano,
        public_key_type: PublicKeyType::Ed25519Cardano,
        derivation_path: "m/1852'/1815'/0'/0/0",
        address_format: AddressFormat::CardanoBase {
            hrp: "addr",
            staking_path: "m/1852'/1815'/0'/2/0",
        },
        signing: Some(SigningFamily::Cardano),
        utxo: None,
    },
];

/// All registered coins
pub fn registry() -> &'static [CoinDescriptor] {
    &REGISTRY
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_registry_ids_unique() {
        let mut ids: Vec<u32> = registry().iter().map(|d| d.id.0).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), registry().len());
    }

    #[test]
    fn test_descriptor_lookup() {
        let btc = CoinType::BITCOIN.descriptor().unwrap();
        assert_eq!(btc.symbol, "BTC");
        assert_eq!(btc.utxo_params().unwrap().hrp, "bc");
        assert_eq!(CoinType::CARDANO.descriptor().unwrap().curve, CurveType::Ed25519Cardano);
        assert!(CoinType::ETHEREUM.descriptor().unwrap().utxo_params().is_err());
    }

    #[test]
    fn test_unknown_coin() {
        let err = CoinType(9999).descriptor().unwrap_err();
        assert_eq!(err.code, ErrorCode::UnsupportedCoin);
        assert_eq!(CoinType(9999).to_string(), "coin#9999");
    }

    #[test]
    fn test_signing_family() {
        assert_eq!(CoinType::LITECOIN.signing_family().unwrap(), SigningFamily::Bitcoin);
        assert_eq!(CoinType::BINANCE.signing_family().unwrap(), SigningFamily::Binance);
        let err = CoinType::SOLANA.signing_family().unwrap_err();
        assert_eq!(err.code, ErrorCode::UnsupportedCoin);
    }

    #[test]
    fn test_parse_coin() {
        assert_eq!("btc".parse::<CoinType>().unwrap(), CoinType::BITCOIN);
        assert_eq!("Cardano".parse::<CoinType>().unwrap(), CoinType::CARDANO);
        assert_eq!("714".parse::<CoinType>().unwrap(), CoinType::BINANCE);
        assert!("dogecoin".parse::<CoinType>().is_err());
    }
}
