//! Transaction Input Builder
//!
//! Maps generic transfer fields onto a chain's signing input. No network
//! state is fetched: UTXOs, nonces and fees stay at their defaults until
//! the caller decodes the input and fills them in.

use super::preimage::binance::MAX_MEMO_BYTES;
use super::{
    BinanceSigningInput, BitcoinSigningInput, CardanoSigningInput, EthereumSigningInput, SendOrder,
    SendOrderEntry, SigningInput, Token,
};
use crate::coin::{CoinType, SigningFamily};
use crate::error::{ErrorCode, WalletError, WalletResult};
use crate::log_debug;
use crate::script::lock_script_for_address;
use crate::utils::config::CompilerConfig;
use crate::wallet::{decode_binance_address, decode_cardano_address, decode_ethereum_address};

/// Amount keyword that spends everything on UTXO chains
pub const MAX_AMOUNT: &str = "max";

/// Native Binance Chain denomination
pub const DEFAULT_BINANCE_DENOM: &str = "BNB";

/// Gas limit of a plain value transfer
const TRANSFER_GAS_LIMIT: u64 = 21_000;

/// Build and encode a signing input
pub fn build_input(
    coin: CoinType,
    from: &str,
    to: &str,
    amount: &str,
    asset: &str,
    memo: &str,
    chain_id: &str,
) -> WalletResult<Vec<u8>> {
    build_input_with_config(coin, from, to, amount, asset, memo, chain_id, &CompilerConfig::default())
}

#[allow(clippy::too_many_arguments)]
pub fn build_input_with_config(
    coin: CoinType,
    from: &str,
    to: &str,
    amount: &str,
    asset: &str,
    memo: &str,
    chain_id: &str,
    config: &CompilerConfig,
) -> WalletResult<Vec<u8>> {
    build_signing_input(coin, from, to, amount, asset, memo, chain_id, config)?.encode_with_config(config)
}

/// Typed form of [`build_input`]
#[allow(clippy::too_many_arguments)]
pub fn build_signing_input(
    coin: CoinType,
    from: &str,
    to: &str,
    amount: &str,
    asset: &str,
    memo: &str,
    chain_id: &str,
    config: &CompilerConfig,
) -> WalletResult<SigningInput> {
    config.validate()?;
    let input = match coin.signing_family()? {
        SigningFamily::Bitcoin => SigningInput::Bitcoin(bitcoin_input(coin, from, to, amount)?),
        SigningFamily::Ethereum => SigningInput::Ethereum(ethereum_input(from, to, amount, chain_id, config)?),
        SigningFamily::Binance => {
            SigningInput::Binance(binance_input(from, to, amount, asset, memo, chain_id, config)?)
        }
        SigningFamily::Cardano => SigningInput::Cardano(cardano_input(from, to, amount)?),
    };

    log_debug!("input_builder", "input built", coin = coin, to_address = to);
    Ok(input)
}

fn bitcoin_input(coin: CoinType, from: &str, to: &str, amount: &str) -> WalletResult<BitcoinSigningInput> {
    lock_script_for_address(to, coin)?;
    if !from.trim().is_empty() {
        lock_script_for_address(from, coin)?;
    }

    let use_max_amount = is_max(amount);
    let amount = if use_max_amount { 0 } else { parse_amount::<u64>(amount)? };

    Ok(BitcoinSigningInput {
        amount,
        to_address: to.trim().to_string(),
        change_address: from.trim().to_string(),
        use_max_amount,
        ..Default::default()
    })
}

fn ethereum_input(
    from: &str,
    to: &str,
    amount: &str,
    chain_id: &str,
    config: &CompilerConfig,
) -> WalletResult<EthereumSigningInput> {
    if !from.trim().is_empty() {
        decode_ethereum_address(from)?;
    }
    if !to.trim().is_empty() {
        decode_ethereum_address(to)?;
    }

    Ok(EthereumSigningInput {
        chain_id: parse_chain_id(chain_id, config.ethereum_default_chain_id)?,
        gas_limit: TRANSFER_GAS_LIMIT,
        from_address: from.trim().to_string(),
        to_address: to.trim().to_string(),
        amount: parse_amount::<u128>(amount)?,
        ..Default::default()
    })
}

fn binance_input(
    from: &str,
    to: &str,
    amount: &str,
    asset: &str,
    memo: &str,
    chain_id: &str,
    config: &CompilerConfig,
) -> WalletResult<BinanceSigningInput> {
    if memo.len() > MAX_MEMO_BYTES {
        return Err(WalletError::new(
            ErrorCode::InvalidMemo,
            format!("memo is {} bytes, limit is {}", memo.len(), MAX_MEMO_BYTES),
        ));
    }
    let amount = parse_amount::<u64>(amount)?;
    let amount = i64::try_from(amount)
        .map_err(|_| WalletError::invalid_input(format!("amount {} is out of range", amount)))?;
    let denom = match asset.trim() {
        "" => DEFAULT_BINANCE_DENOM.to_string(),
        asset => asset.to_string(),
    };
    let entry = |address: [u8; 20]| SendOrderEntry {
        address: address.to_vec(),
        coins: vec![Token {
            denom: denom.clone(),
            amount,
        }],
    };

    Ok(BinanceSigningInput {
        chain_id: match chain_id.trim() {
            "" => config.binance_default_chain_id.clone(),
            id => id.to_string(),
        },
        memo: memo.to_string(),
        send_order: SendOrder {
            inputs: vec![entry(decode_binance_address(from)?)],
            outputs: vec![entry(decode_binance_address(to)?)],
        },
        ..Default::default()
    })
}

fn cardano_input(from: &str, to: &str, amount: &str) -> WalletResult<CardanoSigningInput> {
    decode_cardano_address(to)?;
    if !from.trim().is_empty() {
        decode_cardano_address(from)?;
    }

    let use_max_amount = is_max(amount);
    let amount = if use_max_amount { 0 } else { parse_amount::<u64>(amount)? };

    Ok(CardanoSigningInput {
        to_address: to.trim().to_string(),
        change_address: from.trim().to_string(),
        amount,
        use_max_amount,
        ..Default::default()
    })
}

fn is_max(amount: &str) -> bool {
    amount.trim().eq_ignore_ascii_case(MAX_AMOUNT)
}

/// Positive decimal amount in the chain's base unit
fn parse_amount<T>(amount: &str) -> WalletResult<T>
where
    T: std::str::FromStr + Default + PartialEq,
{
    let trimmed = amount.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(WalletError::invalid_input(format!("amount is not a decimal integer: {:?}", amount)));
    }
    let value = trimmed
        .parse::<T>()
        .map_err(|_| WalletError::invalid_input(format!("amount is out of range: {}", trimmed)))?;
    if value == T::default() {
        return Err(WalletError::new(ErrorCode::ZeroAmountRequested, "amount must be greater than zero"));
    }
    Ok(value)
}

/// Decimal, or hex with a `0x` prefix; empty selects `default`
fn parse_chain_id(chain_id: &str, default: u64) -> WalletResult<u64> {
    let trimmed = chain_id.trim();
    if trimmed.is_empty() {
        return Ok(default);
    }
    let parsed = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        Some(hex_part) => u64::from_str_radix(hex_part, 16),
        None => trimmed.parse::<u64>(),
    };
    parsed.map_err(|_| WalletError::invalid_input(format!("invalid chain id: {}", chain_id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ETH_TO: &str = "0x3535353535353535353535353535353535353535";
    const BNB_FROM: &str = "bnb1grpf0955h0ykzq3ar5nmum7y6gdfl6lxfn46h2";
    const BNB_TO: &str = "bnb1hlly02l6ahjsgxw9wlcswnlwdhg4xhx38yxpd5";
    const BTC_TO: &str = "bc1qhkfq3zahaqkkzx5mjnamwjsfpq2jk7z00ppggv";

    fn build(coin: CoinType, from: &str, to: &str, amount: &str, asset: &str, memo: &str, chain_id: &str) -> WalletResult<SigningInput> {
        build_signing_input(coin, from, to, amount, asset, memo, chain_id, &CompilerConfig::default())
    }

    #[test]
    fn test_ethereum_defaults() {
        let input = build(CoinType::ETHEREUM, "", ETH_TO, "1000", "", "", "").unwrap();
        let SigningInput::Ethereum(eth) = input else { panic!("wrong family") };
        assert_eq!(eth.chain_id, 1);
        assert_eq!(eth.amount, 1000);
        assert_eq!(eth.gas_limit, TRANSFER_GAS_LIMIT);
        assert_eq!(eth.to_address, ETH_TO);
    }

    #[test]
    fn test_chain_id_forms() {
        assert_eq!(parse_chain_id("05", 1).unwrap(), 5);
        assert_eq!(parse_chain_id("0x38", 1).unwrap(), 56);
        assert_eq!(parse_chain_id("  ", 7).unwrap(), 7);
        assert_eq!(parse_chain_id("mainnet", 1).unwrap_err().code, ErrorCode::InvalidInput);
    }

    #[test]
    fn test_amount_rules() {
        let err = build(CoinType::ETHEREUM, "", ETH_TO, "0", "", "", "").unwrap_err();
        assert_eq!(err.code, ErrorCode::ZeroAmountRequested);
        let err = build(CoinType::ETHEREUM, "", ETH_TO, "1.5", "", "", "").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
        let err = build(CoinType::ETHEREUM, "", ETH_TO, "-3", "", "", "").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
    }

    #[test]
    fn test_bitcoin_max_amount() {
        let input = build(CoinType::BITCOIN, BTC_TO, BTC_TO, "MAX", "", "", "").unwrap();
        let SigningInput::Bitcoin(btc) = input else { panic!("wrong family") };
        assert!(btc.use_max_amount);
        assert_eq!(btc.change_address, BTC_TO);

        let err = build(CoinType::BITCOIN, "", BTC_TO, "0", "", "", "").unwrap_err();
        assert_eq!(err.code, ErrorCode::ZeroAmountRequested);
    }

    #[test]
    fn test_bitcoin_rejects_foreign_address() {
        let err = build(CoinType::BITCOIN, "", ETH_TO, "1000", "", "", "").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidAddress);
    }

    #[test]
    fn test_binance_order() {
        let input = build(CoinType::BINANCE, BNB_FROM, BNB_TO, "1", "", "hello", "").unwrap();
        let SigningInput::Binance(bnb) = input else { panic!("wrong family") };
        assert_eq!(bnb.chain_id, "Binance-Chain-Nile");
        assert_eq!(bnb.memo, "hello");
        assert_eq!(hex::encode(&bnb.send_order.inputs[0].address), "40c2979694bbc961023d1d27be6fc4d21a9febe6");
        assert_eq!(bnb.send_order.outputs[0].coins[0].denom, DEFAULT_BINANCE_DENOM);

        let err = build(CoinType::BINANCE, BNB_FROM, BNB_TO, "1", "", &"m".repeat(129), "").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidMemo);
    }

    #[test]
    fn test_unsupported_coin() {
        let err = build(CoinType::SOLANA, "", "", "1", "", "", "").unwrap_err();
        assert_eq!(err.code, ErrorCode::UnsupportedCoin);
    }

    #[test]
    fn test_encoded_input_decodes() {
        let bytes = build_input(CoinType::ETHEREUM, "", ETH_TO, "42", "", "", "0x5").unwrap();
        let SigningInput::Ethereum(eth) = SigningInput::decode(&bytes).unwrap() else { panic!("wrong family") };
        assert_eq!(eth.chain_id, 5);
        assert_eq!(eth.amount, 42);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = CompilerConfig::standard().customize(|c| c.binance_default_chain_id = String::new());
        let err = build_input_with_config(CoinType::ETHEREUM, "", ETH_TO, "42", "", "", "1", &config).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
    }
}
