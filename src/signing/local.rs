//! Local Signer
//!
//! Runs the pipeline with keys held in process: preimage hashes, signing,
//! then compilation. Keys are matched to preimage pairs by key hash, so
//! the caller may pass them in any order.

use super::compiler::{compile_transaction, encode_signing_output};
use super::preimage::{compute_pre_image_hashes, HashPublicKey};
use super::SigningInput;
use crate::coin::{CoinType, SigningFamily};
use crate::crypto::{CurveType, PrivateKey, PublicKey};
use crate::error::{ErrorCode, WalletError, WalletResult};
use crate::log_debug;
use crate::utils::config::CompilerConfig;
use crate::wallet::{cardano_key_hash, ethereum_address_bytes, key_hash160};

/// Sign an encoded input; returns an encoded [`super::SigningOutput`]
pub fn sign_with_keys(coin: CoinType, input: &[u8], keys: &[PrivateKey]) -> Vec<u8> {
    sign_with_keys_with_config(coin, input, keys, &CompilerConfig::default())
}

pub fn sign_with_keys_with_config(
    coin: CoinType,
    input: &[u8],
    keys: &[PrivateKey],
    config: &CompilerConfig,
) -> Vec<u8> {
    let result = config
        .validate()
        .and_then(|_| SigningInput::decode_with_config(input, config))
        .and_then(|decoded| sign_transaction(coin, &decoded, keys, config));
    encode_signing_output(coin, result, config)
}

/// Typed form of [`sign_with_keys`]
pub fn sign_transaction(
    coin: CoinType,
    input: &SigningInput,
    keys: &[PrivateKey],
    config: &CompilerConfig,
) -> WalletResult<Vec<u8>> {
    let family = coin.signing_family()?;
    let candidates = keys
        .iter()
        .map(|key| key.public_key().map(|public_key| (key, public_key)))
        .collect::<WalletResult<Vec<_>>>()?;

    let pairs = compute_pre_image_hashes(coin, input, config)?;
    let mut signatures = Vec::with_capacity(pairs.len());
    let mut public_keys = Vec::with_capacity(pairs.len());
    for (index, pair) in pairs.iter().enumerate() {
        let (key, public_key) = find_signer(family, pair, &candidates)?.ok_or_else(|| {
            WalletError::new(
                ErrorCode::MissingPrivateKey,
                format!("no key matches the key hash of preimage {}", index),
            )
        })?;
        let signature = match family {
            SigningFamily::Bitcoin => key.sign_as_der(&pair.data_hash)?,
            _ => key.sign(&pair.data_hash)?,
        };
        signatures.push(signature);
        public_keys.push(public_key.as_bytes().to_vec());
    }

    log_debug!("local_signer", "preimages signed", coin = coin, count = signatures.len());
    compile_transaction(coin, input, &signatures, &public_keys, config)
}

fn find_signer<'a>(
    family: SigningFamily,
    pair: &HashPublicKey,
    candidates: &'a [(&'a PrivateKey, PublicKey)],
) -> WalletResult<Option<&'a (&'a PrivateKey, PublicKey)>> {
    for candidate in candidates {
        if signer_matches(family, pair, candidate)? {
            return Ok(Some(candidate));
        }
    }
    Ok(None)
}

fn signer_matches(family: SigningFamily, pair: &HashPublicKey, (key, public_key): &(&PrivateKey, PublicKey)) -> WalletResult<bool> {
    let expected = pair.public_key_hash.as_slice();
    Ok(match (family, key.curve()) {
        (SigningFamily::Bitcoin | SigningFamily::Binance, CurveType::Secp256k1) => {
            key_hash160(public_key)?.as_slice() == expected
        }
        // No sender was given; the first secp256k1 key signs
        (SigningFamily::Ethereum, CurveType::Secp256k1) if expected.is_empty() => true,
        (SigningFamily::Ethereum, CurveType::Secp256k1) => ethereum_address_bytes(public_key)?.as_slice() == expected,
        (SigningFamily::Cardano, CurveType::Ed25519Cardano) => cardano_key_hash(public_key)?.as_slice() == expected,
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::{EthereumSigningInput, SigningOutput};

    fn eth_input(from: &str) -> SigningInput {
        SigningInput::Ethereum(EthereumSigningInput {
            chain_id: 1,
            nonce: 11,
            gas_price: 20_000_000_000,
            gas_limit: 21000,
            from_address: from.to_string(),
            to_address: "0x3535353535353535353535353535353535353535".to_string(),
            amount: 1_000_000_000_000_000_000,
            ..Default::default()
        })
    }

    #[test]
    fn test_ethereum_picks_matching_key() {
        let signer = PrivateKey::new(&[0x46u8; 32], CurveType::Secp256k1).unwrap();
        let other = PrivateKey::new(&[0x11u8; 32], CurveType::Secp256k1).unwrap();
        let address = crate::utils::crypto::to_checksum_address(
            &ethereum_address_bytes(&signer.public_key().unwrap()).unwrap(),
        );

        let input = eth_input(&address);
        let config = CompilerConfig::default();
        let signed = sign_transaction(CoinType::ETHEREUM, &input, &[other.clone(), signer.clone()], &config).unwrap();
        let unnamed = sign_transaction(CoinType::ETHEREUM, &eth_input(""), &[signer], &config).unwrap();
        assert_eq!(signed, unnamed);

        let err = sign_transaction(CoinType::ETHEREUM, &input, &[other], &config).unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingPrivateKey);
    }

    #[test]
    fn test_byte_form_reports_errors() {
        let bytes = sign_with_keys(CoinType::ETHEREUM, &[0xff, 0x00], &[]);
        let output = SigningOutput::decode(&bytes).unwrap();
        assert_eq!(output.error, ErrorCode::InputParse);
    }
}
