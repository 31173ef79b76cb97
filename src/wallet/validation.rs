//! Address and Mnemonic Validation
//!
//! Validates mnemonic phrases and addresses for all registered coins.

use crate::coin::{AddressFormat, CoinType};
use crate::crypto::Ed25519Curve;
use crate::script::lock_script_for_address;
use crate::utils::crypto::{decode_bech32, to_checksum_address};

use super::derivation::{decode_cardano_address, decode_ethereum_address};
use super::keygen::parse_mnemonic;

/// Check if a mnemonic phrase is valid: English wordlist and checksum
pub fn validate_mnemonic(phrase: &str) -> bool {
    parse_mnemonic(phrase).is_ok()
}

/// Validate an address for a specific coin.
/// Returns (is_valid, normalized_address)
pub fn validate_address(address: &str, coin: CoinType) -> (bool, Option<String>) {
    let trimmed = address.trim();
    let Ok(descriptor) = coin.descriptor() else {
        return (false, None);
    };

    match descriptor.address_format {
        AddressFormat::Segwit { hrp } => match lock_script_for_address(trimmed, coin) {
            Ok(_) => {
                // bech32 is case-insensitive, Base58 is not
                let lower = trimmed.to_lowercase();
                let normalized = if lower.starts_with(&format!("{}1", hrp)) {
                    lower
                } else {
                    trimmed.to_string()
                };
                (true, Some(normalized))
            }
            Err(_) => (false, None),
        },
        AddressFormat::Bech32Hash160 { hrp } => match decode_bech32(hrp, trimmed) {
            Ok(hash) if hash.len() == 20 => (true, Some(trimmed.to_lowercase())),
            _ => (false, None),
        },
        AddressFormat::EthereumHex => match decode_ethereum_address(trimmed) {
            Ok(bytes) => (true, Some(to_checksum_address(&bytes))),
            Err(_) => (false, None),
        },
        AddressFormat::CardanoBase { .. } => match decode_cardano_address(trimmed) {
            Ok(_) => (true, Some(trimmed.to_lowercase())),
            Err(_) => (false, None),
        },
        AddressFormat::Base58PublicKey => match Ed25519Curve::from_solana_address(trimmed) {
            Ok(_) => (true, Some(trimmed.to_string())),
            Err(_) => (false, None),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_mnemonic() {
        assert!(validate_mnemonic(
            "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about"
        ));
        // last word changed: checksum fails
        assert!(!validate_mnemonic(
            "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon"
        ));
        assert!(!validate_mnemonic("abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon zzzz"));
        assert!(!validate_mnemonic(""));
    }

    #[test]
    fn test_validate_bitcoin_addresses() {
        let (ok, normalized) = validate_address("bc1qhkfq3zahaqkkzx5mjnamwjsfpq2jk7z00ppggv", CoinType::BITCOIN);
        assert!(ok);
        assert_eq!(normalized.unwrap(), "bc1qhkfq3zahaqkkzx5mjnamwjsfpq2jk7z00ppggv");

        let (ok, normalized) = validate_address("BC1QHKFQ3ZAHAQKKZX5MJNAMWJSFPQ2JK7Z00PPGGV", CoinType::BITCOIN);
        assert!(ok);
        assert_eq!(normalized.unwrap(), "bc1qhkfq3zahaqkkzx5mjnamwjsfpq2jk7z00ppggv");

        assert!(validate_address("1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2", CoinType::BITCOIN).0);
        assert!(!validate_address("bc1qhkfq3zahaqkkzx5mjnamwjsfpq2jk7z00ppggv", CoinType::LITECOIN).0);
        assert!(validate_address("ltc1qhd8fxxp2dx3vsmpac43z6ev0kllm4n53t5sk0u", CoinType::LITECOIN).0);
    }

    #[test]
    fn test_validate_account_addresses() {
        let (ok, normalized) = validate_address("0x9858effd232b4033e47d90003d41ec34ecaeda94", CoinType::ETHEREUM);
        assert!(ok);
        assert_eq!(normalized.unwrap(), "0x9858EfFD232B4033E47d90003D41EC34EcaEda94");

        assert!(validate_address("bnb1grpf0955h0ykzq3ar5nmum7y6gdfl6lxfn46h2", CoinType::BINANCE).0);
        assert!(!validate_address("bnb1grpf0955h0ykzq3ar5nmum7y6gdfl6lxfn46h3", CoinType::BINANCE).0);
        assert!(validate_address("2bUBiBNZyD29gP1oV6de7nxowMLoDBtopMMTGgMvjG5m", CoinType::SOLANA).0);
        assert!(!validate_address("0x00", CoinType(9999)).0);
    }
}
