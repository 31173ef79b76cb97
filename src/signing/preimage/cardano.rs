//! Cardano Pre-Image Hashing
//!
//! Builds the Shelley transaction body as CBOR and hashes it with
//! blake2b-256. Every distinct payment key among the spent UTXOs signs the
//! same body hash.

use crate::error::{ErrorCode, WalletError, WalletResult};
use crate::signing::input::CardanoSigningInput;
use crate::utils::config::CompilerConfig;
use crate::utils::crypto::blake2b_256;
use crate::wallet::{cardano_payment_hash, decode_cardano_address};
use crate::log_debug;

use super::HashPublicKey;

const DUMMY_VKEY_LEN: usize = 32;
const DUMMY_SIGNATURE_LEN: usize = 64;

/// Fee estimation converges in two or three rounds
const FEE_ROUNDS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardanoTransaction {
    pub inputs: Vec<([u8; 32], u32)>,
    /// (raw address, lovelace)
    pub outputs: Vec<(Vec<u8>, u64)>,
    pub fee: u64,
    /// Zero omits the field
    pub ttl: u64,
    /// Payment key hashes that must sign, in first-appearance order
    pub signers: Vec<[u8; 28]>,
}

impl CardanoTransaction {
    /// `{0: inputs, 1: outputs, 2: fee, 3: ttl}`
    pub fn body_cbor(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        cbor_map_header(if self.ttl != 0 { 4 } else { 3 }, &mut buf);

        cbor_uint(0, &mut buf);
        cbor_array_header(self.inputs.len(), &mut buf);
        for (hash, index) in &self.inputs {
            cbor_array_header(2, &mut buf);
            cbor_bytes(hash, &mut buf);
            cbor_uint(*index as u64, &mut buf);
        }

        cbor_uint(1, &mut buf);
        cbor_array_header(self.outputs.len(), &mut buf);
        for (address, amount) in &self.outputs {
            cbor_array_header(2, &mut buf);
            cbor_bytes(address, &mut buf);
            cbor_uint(*amount, &mut buf);
        }

        cbor_uint(2, &mut buf);
        cbor_uint(self.fee, &mut buf);

        if self.ttl != 0 {
            cbor_uint(3, &mut buf);
            cbor_uint(self.ttl, &mut buf);
        }
        buf
    }

    pub fn body_hash(&self) -> [u8; 32] {
        blake2b_256(&self.body_cbor())
    }

    /// `[body, {0: [[vkey, signature], ...]}, true, null]`
    pub fn encode_signed(&self, witnesses: &[(Vec<u8>, Vec<u8>)]) -> Vec<u8> {
        let mut buf = Vec::new();
        cbor_array_header(4, &mut buf);
        buf.extend_from_slice(&self.body_cbor());

        cbor_map_header(1, &mut buf);
        cbor_uint(0, &mut buf);
        cbor_array_header(witnesses.len(), &mut buf);
        for (vkey, signature) in witnesses {
            cbor_array_header(2, &mut buf);
            cbor_bytes(vkey, &mut buf);
            cbor_bytes(signature, &mut buf);
        }

        buf.push(CBOR_TRUE);
        buf.push(CBOR_NULL);
        buf
    }

    fn estimated_size(&self) -> usize {
        let dummy = (vec![0u8; DUMMY_VKEY_LEN], vec![0u8; DUMMY_SIGNATURE_LEN]);
        let witnesses = vec![dummy; self.signers.len()];
        self.encode_signed(&witnesses).len()
    }
}

/// Resolve inputs, plan fee and change, and build the transaction
pub fn prepare(input: &CardanoSigningInput, config: &CompilerConfig) -> WalletResult<CardanoTransaction> {
    if input.utxos.is_empty() {
        return Err(WalletError::new(ErrorCode::MissingInputUtxos, "no UTXOs to spend"));
    }

    let mut inputs = Vec::with_capacity(input.utxos.len());
    let mut signers: Vec<[u8; 28]> = Vec::new();
    let mut available = 0u64;
    for utxo in &input.utxos {
        if utxo.amount == 0 {
            return Err(WalletError::new(ErrorCode::InvalidUtxoAmount, "UTXO amount must be positive"));
        }
        let key_hash = cardano_payment_hash(&decode_cardano_address(&utxo.address)?)?;
        if !signers.contains(&key_hash) {
            signers.push(key_hash);
        }
        inputs.push((utxo.tx_hash, utxo.output_index));
        available = available
            .checked_add(utxo.amount)
            .ok_or_else(|| WalletError::new(ErrorCode::InvalidUtxoAmount, "UTXO total overflows"))?;
    }

    let to = decode_cardano_address(&input.to_address)?;
    let change_address = if input.change_address.trim().is_empty() {
        None
    } else {
        Some(decode_cardano_address(&input.change_address)?)
    };

    let mut tx = CardanoTransaction {
        inputs,
        outputs: Vec::new(),
        fee: 0,
        ttl: input.ttl,
        signers,
    };

    let low_balance = |needed: u64| {
        WalletError::new(
            ErrorCode::LowBalance,
            format!("need {} lovelace, have {} lovelace", needed, available),
        )
    };

    if input.use_max_amount {
        let fee = settle_fee(&mut tx, input.fee, config, |tx, fee| {
            tx.outputs = vec![(to.clone(), available.saturating_sub(fee))];
        });
        let amount = available.checked_sub(fee).ok_or_else(|| low_balance(fee))?;
        if amount < config.cardano_min_change {
            return Err(WalletError::new(ErrorCode::NotEnoughUtxos, "nothing left to send after the fee"));
        }
        tx.outputs = vec![(to, amount)];
        tx.fee = fee;
        return Ok(tx);
    }

    if input.amount == 0 {
        return Err(WalletError::new(ErrorCode::ZeroAmountRequested, "amount must be greater than zero"));
    }
    if input.amount < config.cardano_min_change {
        return Err(WalletError::new(
            ErrorCode::NotEnoughUtxos,
            format!("amount {} is below the minimum output {}", input.amount, config.cardano_min_change),
        ));
    }

    if let Some(change_address) = &change_address {
        let fee = settle_fee(&mut tx, input.fee, config, |tx, fee| {
            let change = available.saturating_sub(input.amount).saturating_sub(fee);
            tx.outputs = vec![(to.clone(), input.amount), (change_address.clone(), change)];
        });
        let change = input
            .amount
            .checked_add(fee)
            .and_then(|needed| available.checked_sub(needed));
        if let Some(change) = change.filter(|c| *c >= config.cardano_min_change) {
            tx.outputs = vec![(to, input.amount), (change_address.clone(), change)];
            tx.fee = fee;
            log_debug!("cardano", "transaction planned", amount = input.amount, fee = fee, change = change);
            return Ok(tx);
        }
    }

    // Change too small for its own output is folded into the fee
    let fee = settle_fee(&mut tx, input.fee, config, |tx, _| {
        tx.outputs = vec![(to.clone(), input.amount)];
    });
    let needed = input
        .amount
        .checked_add(fee)
        .ok_or_else(|| WalletError::new(ErrorCode::WrongFee, "fee overflows"))?;
    if available < needed {
        return Err(low_balance(needed));
    }
    tx.outputs = vec![(to, input.amount)];
    tx.fee = available - input.amount;
    log_debug!("cardano", "transaction planned", amount = input.amount, fee = tx.fee, change = 0);
    Ok(tx)
}

/// The fixed fee, or the linear fee of the signed transaction. `layout`
/// rebuilds the outputs for a candidate fee.
fn settle_fee<F>(tx: &mut CardanoTransaction, fixed: u64, config: &CompilerConfig, layout: F) -> u64
where
    F: Fn(&mut CardanoTransaction, u64),
{
    if fixed != 0 {
        return fixed;
    }
    let mut fee = 0u64;
    for _ in 0..FEE_ROUNDS {
        layout(tx, fee);
        tx.fee = fee;
        let next = config
            .cardano_fee_constant
            .saturating_add(config.cardano_fee_per_byte.saturating_mul(tx.estimated_size() as u64));
        if next == fee {
            break;
        }
        fee = next;
    }
    fee
}

/// One pair per distinct payment key, all over the same body hash
pub fn hash_public_keys(input: &CardanoSigningInput, config: &CompilerConfig) -> WalletResult<Vec<HashPublicKey>> {
    let tx = prepare(input, config)?;
    let body_hash = tx.body_hash();
    Ok(tx
        .signers
        .iter()
        .map(|key_hash| HashPublicKey::new(body_hash.to_vec(), key_hash.to_vec()))
        .collect())
}

// MARK: - CBOR

const CBOR_TRUE: u8 = 0xf5;
const CBOR_NULL: u8 = 0xf6;

fn cbor_head(major: u8, value: u64, buf: &mut Vec<u8>) {
    let major = major << 5;
    if value < 24 {
        buf.push(major | value as u8);
    } else if value <= 0xff {
        buf.push(major | 24);
        buf.push(value as u8);
    } else if value <= 0xffff {
        buf.push(major | 25);
        buf.extend_from_slice(&(value as u16).to_be_bytes());
    } else if value <= 0xffff_ffff {
        buf.push(major | 26);
        buf.extend_from_slice(&(value as u32).to_be_bytes());
    } else {
        buf.push(major | 27);
        buf.extend_from_slice(&value.to_be_bytes());
    }
}

pub(crate) fn cbor_uint(value: u64, buf: &mut Vec<u8>) {
    cbor_head(0, value, buf);
}

pub(crate) fn cbor_bytes(bytes: &[u8], buf: &mut Vec<u8>) {
    cbor_head(2, bytes.len() as u64, buf);
    buf.extend_from_slice(bytes);
}

pub(crate) fn cbor_array_header(len: usize, buf: &mut Vec<u8>) {
    cbor_head(4, len as u64, buf);
}

pub(crate) fn cbor_map_header(len: usize, buf: &mut Vec<u8>) {
    cbor_head(5, len as u64, buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::input::CardanoUtxo;
    use crate::utils::crypto::encode_bech32;

    fn address(payment: u8, staking: u8) -> String {
        let mut raw = vec![0x01];
        raw.extend_from_slice(&[payment; 28]);
        raw.extend_from_slice(&[staking; 28]);
        encode_bech32("addr", &raw).unwrap()
    }

    fn sample() -> CardanoSigningInput {
        CardanoSigningInput {
            utxos: vec![
                CardanoUtxo {
                    tx_hash: [0x11; 32],
                    output_index: 0,
                    address: address(0xaa, 0xbb),
                    amount: 5_000_000,
                },
                CardanoUtxo {
                    tx_hash: [0x22; 32],
                    output_index: 1,
                    address: address(0xaa, 0xbb),
                    amount: 3_000_000,
                },
            ],
            to_address: address(0xcc, 0xdd),
            change_address: address(0xaa, 0xbb),
            amount: 2_000_000,
            fee: 170_000,
            ttl: 1000,
            use_max_amount: false,
        }
    }

    #[test]
    fn test_body_hash_with_fixed_fee() {
        let config = CompilerConfig::default();
        let tx = prepare(&sample(), &config).unwrap();
        assert_eq!(tx.fee, 170_000);
        assert_eq!(tx.outputs[1].1, 5_830_000);
        assert_eq!(&tx.body_cbor()[..3], &[0xa4, 0x00, 0x82]);

        let pairs = hash_public_keys(&sample(), &config).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].public_key_hash, vec![0xaa; 28]);
        assert_eq!(
            hex::encode(&pairs[0].data_hash),
            "a41b3c1ccda133207babb67642b6b85735e8bc42348f2e2cc0b19ecd73bbe398"
        );
    }

    #[test]
    fn test_estimated_fee() {
        let mut input = sample();
        input.fee = 0;
        let tx = prepare(&input, &CompilerConfig::default()).unwrap();
        assert_eq!(tx.fee, 169_637);
        assert_eq!(tx.outputs[0].1 + tx.outputs[1].1 + tx.fee, 8_000_000);
    }

    #[test]
    fn test_one_pair_per_distinct_key() {
        let mut input = sample();
        input.utxos.push(CardanoUtxo {
            tx_hash: [0x33; 32],
            output_index: 2,
            address: address(0xee, 0xbb),
            amount: 1_500_000,
        });
        input.utxos.swap(0, 2);
        let pairs = hash_public_keys(&input, &CompilerConfig::default()).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].public_key_hash, vec![0xee; 28]);
        assert_eq!(pairs[1].public_key_hash, vec![0xaa; 28]);
        assert_eq!(pairs[0].data_hash, pairs[1].data_hash);
    }

    #[test]
    fn test_small_change_and_ttl() {
        let mut input = sample();
        input.amount = 7_500_000;
        input.ttl = 0;
        let tx = prepare(&input, &CompilerConfig::default()).unwrap();
        assert_eq!(tx.outputs.len(), 1);
        assert_eq!(tx.fee, 500_000);
        assert_eq!(tx.body_cbor()[0], 0xa3);
    }

    #[test]
    fn test_use_max_amount() {
        let mut input = sample();
        input.use_max_amount = true;
        let tx = prepare(&input, &CompilerConfig::default()).unwrap();
        assert_eq!(tx.outputs, vec![(decode_cardano_address(&input.to_address).unwrap(), 7_830_000)]);
    }

    #[test]
    fn test_errors() {
        let config = CompilerConfig::default();
        let mut input = sample();
        input.amount = 8_000_000;
        assert_eq!(prepare(&input, &config).unwrap_err().code, ErrorCode::LowBalance);

        input.amount = 0;
        assert_eq!(prepare(&input, &config).unwrap_err().code, ErrorCode::ZeroAmountRequested);

        let mut input = sample();
        input.utxos.clear();
        assert_eq!(prepare(&input, &config).unwrap_err().code, ErrorCode::MissingInputUtxos);

        let mut input = sample();
        input.to_address = "addr1xyz".to_string();
        assert_eq!(prepare(&input, &config).unwrap_err().code, ErrorCode::InvalidAddress);
    }

    #[test]
    fn test_cbor_heads() {
        let mut buf = Vec::new();
        cbor_uint(23, &mut buf);
        cbor_uint(24, &mut buf);
        cbor_uint(1000, &mut buf);
        cbor_uint(170_000, &mut buf);
        cbor_bytes(&[0xff], &mut buf);
        assert_eq!(hex::encode(buf), "1718181903e81a0002981041ff");
    }
}
