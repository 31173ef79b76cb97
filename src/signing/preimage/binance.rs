//! Binance Chain Pre-Image Hashing
//!
//! The digest is sha256 of the canonical JSON sign doc: keys sorted, no
//! whitespace, integers other than coin amounts rendered as strings.

use serde::Serialize;

use crate::error::{ErrorCode, WalletError, WalletResult};
use crate::signing::input::{BinanceSigningInput, SendOrderEntry};
use crate::utils::crypto::{encode_bech32, sha256};

use super::HashPublicKey;

pub const BINANCE_HRP: &str = "bnb";

/// Longest memo the chain accepts, in bytes
pub const MAX_MEMO_BYTES: usize = 128;

// Field order is the sorted key order of the sign doc.

#[derive(Serialize)]
struct SignDoc<'a> {
    account_number: String,
    chain_id: &'a str,
    data: Option<()>,
    memo: &'a str,
    msgs: [SendMsg; 1],
    sequence: String,
    source: String,
}

#[derive(Serialize)]
struct SendMsg {
    inputs: Vec<MsgEntry>,
    outputs: Vec<MsgEntry>,
}

#[derive(Serialize)]
struct MsgEntry {
    address: String,
    coins: Vec<MsgCoin>,
}

#[derive(Serialize)]
struct MsgCoin {
    amount: i64,
    denom: String,
}

fn msg_entries(entries: &[SendOrderEntry]) -> WalletResult<Vec<MsgEntry>> {
    entries
        .iter()
        .map(|entry| {
            if entry.address.len() != 20 {
                return Err(WalletError::invalid_address(format!(
                    "send order address must be 20 bytes, got {}",
                    entry.address.len()
                )));
            }
            Ok(MsgEntry {
                address: encode_bech32(BINANCE_HRP, &entry.address)?,
                coins: entry
                    .coins
                    .iter()
                    .map(|coin| MsgCoin {
                        amount: coin.amount,
                        denom: coin.denom.clone(),
                    })
                    .collect(),
            })
        })
        .collect()
}

/// Reject inputs the chain would refuse
pub fn validate(input: &BinanceSigningInput) -> WalletResult<()> {
    if input.memo.len() > MAX_MEMO_BYTES {
        return Err(WalletError::new(
            ErrorCode::InvalidMemo,
            format!("memo is {} bytes, limit is {}", input.memo.len(), MAX_MEMO_BYTES),
        ));
    }
    let order = &input.send_order;
    if order.inputs.is_empty() || order.outputs.is_empty() {
        return Err(WalletError::invalid_input("send order needs at least one input and one output"));
    }
    let amounts = order.inputs.iter().chain(&order.outputs).flat_map(|entry| &entry.coins);
    for coin in amounts {
        if coin.amount <= 0 {
            return Err(WalletError::new(
                ErrorCode::ZeroAmountRequested,
                format!("{} amount must be positive", coin.denom),
            ));
        }
    }
    Ok(())
}

/// Canonical JSON sign doc
pub fn sign_doc(input: &BinanceSigningInput) -> WalletResult<String> {
    validate(input)?;
    let doc = SignDoc {
        account_number: input.account_number.to_string(),
        chain_id: &input.chain_id,
        data: None,
        memo: &input.memo,
        msgs: [SendMsg {
            inputs: msg_entries(&input.send_order.inputs)?,
            outputs: msg_entries(&input.send_order.outputs)?,
        }],
        sequence: input.sequence.to_string(),
        source: input.source.to_string(),
    };
    Ok(serde_json::to_string(&doc)?)
}

/// Key hash of the first send-order input, which signs the transaction
pub fn signer_key_hash(input: &BinanceSigningInput) -> WalletResult<Vec<u8>> {
    input
        .send_order
        .inputs
        .first()
        .map(|entry| entry.address.clone())
        .ok_or_else(|| WalletError::invalid_input("send order has no inputs"))
}

pub fn hash_public_key(input: &BinanceSigningInput) -> WalletResult<HashPublicKey> {
    let doc = sign_doc(input)?;
    Ok(HashPublicKey::new(sha256(doc.as_bytes()).to_vec(), signer_key_hash(input)?))
}
