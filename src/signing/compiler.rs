//! Transaction Compiler
//!
//! Splices externally produced signatures into broadcast-ready transactions.
//! Signatures and public keys arrive in the order of the preimage pairs for
//! the same input; every pair is checked against its key hash and, unless
//! disabled in the configuration, verified before anything is encoded.

use serde::{Deserialize, Serialize};

use super::codec::{decode_payload, encode_payload, PayloadKind};
use super::preimage::{binance, bitcoin, cardano, ethereum};
use super::{
    ensure_family, BinanceSigningInput, BitcoinSigningInput, CardanoSigningInput,
    EthereumSigningInput, SigningError, SigningInput,
};
use crate::coin::CoinType;
use crate::crypto::{PublicKey, PublicKeyType, RecoverableSignature, Secp256k1Curve};
use crate::error::{ErrorCode, WalletError, WalletResult};
use crate::utils::config::CompilerConfig;
use crate::utils::crypto::blake2b_224;
use crate::wallet::ethereum_address_bytes;
use crate::{log_error, log_info, log_warn};

/// Result of compilation as it crosses the byte boundary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningOutput {
    /// Signed transaction; empty on failure
    pub encoded: Vec<u8>,
    pub error: ErrorCode,
    pub error_message: String,
}

impl SigningOutput {
    pub fn new(encoded: Vec<u8>) -> Self {
        Self {
            encoded,
            ..Default::default()
        }
    }

    pub fn failed(error: &WalletError) -> Self {
        Self {
            encoded: Vec::new(),
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
        encode_payload(PayloadKind::SigningOutput, self, config.max_payload_bytes)
    }

    pub fn decode(bytes: &[u8]) -> WalletResult<Self> {
        Self::decode_with_config(bytes, &CompilerConfig::default())
    }

    pub fn decode_with_config(bytes: &[u8], config: &CompilerConfig) -> WalletResult<Self> {
        decode_payload(PayloadKind::SigningOutput, bytes, config.max_payload_bytes)
    }
}

/// Compile an encoded signing input; returns an encoded [`SigningOutput`]
pub fn compile_with_signatures(
    coin: CoinType,
    input: &[u8],
    signatures: &[Vec<u8>],
    public_keys: &[Vec<u8>],
) -> Vec<u8> {
    compile_with_signatures_with_config(coin, input, signatures, public_keys, &CompilerConfig::default())
}

/// Single-signer form of [`compile_with_signatures`]
pub fn compile_with_signature(coin: CoinType, input: &[u8], signature: &[u8], public_key: &[u8]) -> Vec<u8> {
    compile_with_signature_with_config(coin, input, signature, public_key, &CompilerConfig::default())
}

pub fn compile_with_signature_with_config(
    coin: CoinType,
    input: &[u8],
    signature: &[u8],
    public_key: &[u8],
    config: &CompilerConfig,
) -> Vec<u8> {
    compile_with_signatures_with_config(coin, input, &[signature.to_vec()], &[public_key.to_vec()], config)
}

/// Never fails: errors are carried in the output's `error` field
pub fn compile_with_signatures_with_config(
    coin: CoinType,
    input: &[u8],
    signatures: &[Vec<u8>],
    public_keys: &[Vec<u8>],
    config: &CompilerConfig,
) -> Vec<u8> {
    let result = config
        .validate()
        .and_then(|_| SigningInput::decode_with_config(input, config))
        .and_then(|decoded| compile_transaction(coin, &decoded, signatures, public_keys, config));
    encode_signing_output(coin, result, config)
}

/// Wrap a compilation result, logging its outcome
pub(crate) fn encode_signing_output(coin: CoinType, result: WalletResult<Vec<u8>>, config: &CompilerConfig) -> Vec<u8> {
    let output = match result {
        Ok(encoded) => {
            log_info!("compiler", "transaction compiled", coin = coin, size = encoded.len());
            SigningOutput::new(encoded)
        }
        Err(e) => {
            log_warn!("compiler", "compilation failed", coin = coin, code = format!("{:?}", e.code));
            SigningOutput::failed(&e)
        }
    };

    output.encode_with_config(config).unwrap_or_else(|e| {
        log_error!("compiler", "signing output not encodable", coin = coin, code = format!("{:?}", e.code));
        SigningOutput::failed(&e)
            .encode_with_config(config)
            .unwrap_or_default()
    })
}

/// Typed compilation returning the signed transaction bytes
pub fn compile_transaction(
    coin: CoinType,
    input: &SigningInput,
    signatures: &[Vec<u8>],
    public_keys: &[Vec<u8>],
    config: &CompilerConfig,
) -> WalletResult<Vec<u8>> {
    ensure_family(coin, input)?;
    match input {
        SigningInput::Bitcoin(tx) => compile_bitcoin(coin, tx, signatures, public_keys, config),
        SigningInput::Ethereum(tx) => compile_ethereum(tx, signatures, public_keys, config),
        SigningInput::Binance(tx) => compile_binance(tx, signatures, public_keys, config),
        SigningInput::Cardano(tx) => compile_cardano(tx, signatures, public_keys, config),
    }
}

fn check_counts(expected: usize, signatures: &[Vec<u8>], public_keys: &[Vec<u8>]) -> WalletResult<()> {
    if signatures.len() != expected || public_keys.len() != expected {
        return Err(SigningError::CountMismatch {
            expected,
            signatures: signatures.len(),
            public_keys: public_keys.len(),
        }
        .into());
    }
    Ok(())
}

fn parse_public_key(bytes: &[u8], key_type: PublicKeyType, index: usize) -> WalletResult<PublicKey> {
    PublicKey::new(bytes, key_type).map_err(|_| SigningError::InvalidPublicKey { index, expected: key_type }.into())
}

// MARK: - Bitcoin

fn compile_bitcoin(
    coin: CoinType,
    input: &BitcoinSigningInput,
    signatures: &[Vec<u8>],
    public_keys: &[Vec<u8>],
    config: &CompilerConfig,
) -> WalletResult<Vec<u8>> {
    let mut prepared = bitcoin::prepare(coin, input, config)?;
    check_counts(prepared.tx.inputs.len(), signatures, public_keys)?;

    let sighash_byte = prepared.hash_type.signature_byte();
    let mut unlocks = Vec::with_capacity(signatures.len());
    for (index, (signature, public_key)) in signatures.iter().zip(public_keys).enumerate() {
        let key = parse_public_key(public_key, PublicKeyType::Secp256k1, index)?;
        if key.hash160() != prepared.tx.inputs[index].key_hash {
            return Err(SigningError::KeyHashMismatch { index }.into());
        }
        let digest = prepared.tx.sighash(index, prepared.hash_type)?;
        if config.verify_signatures && !key.verify_as_der(signature, &digest) {
            return Err(SigningError::InvalidSignature { index }.into());
        }

        // LOW_S is standardness policy; unparseable bytes only reach here unverified
        let mut with_type = Secp256k1Curve::normalize_der(signature).unwrap_or_else(|_| signature.clone());
        with_type.push(sighash_byte);
        unlocks.push((with_type, key));
    }

    for (tx_input, (signature, key)) in prepared.tx.inputs.iter_mut().zip(unlocks) {
        match tx_input.kind {
            bitcoin::InputKind::P2wpkh => {
                tx_input.witness = vec![signature, key.as_bytes().to_vec()];
            }
            bitcoin::InputKind::P2pkh => {
                tx_input.script_sig = bitcoin::push_data_script(&[&signature, key.as_bytes()]);
            }
        }
    }

    Ok(prepared.tx.serialize())
}

// MARK: - Ethereum

fn compile_ethereum(
    input: &EthereumSigningInput,
    signatures: &[Vec<u8>],
    public_keys: &[Vec<u8>],
    config: &CompilerConfig,
) -> WalletResult<Vec<u8>> {
    check_counts(1, signatures, public_keys)?;
    let tx = ethereum::UnsignedEthereumTransaction::from_input(input)?;
    let digest = tx.signing_hash();

    let key_type = if public_keys[0].len() == 65 {
        PublicKeyType::Secp256k1Extended
    } else {
        PublicKeyType::Secp256k1
    };
    let key = parse_public_key(&public_keys[0], key_type, 0)?;
    let sender = ethereum::sender_key_hash(input)?;
    if !sender.is_empty() && ethereum_address_bytes(&key)?.as_slice() != sender.as_slice() {
        return Err(SigningError::KeyHashMismatch { index: 0 }.into());
    }

    let signature = &signatures[0];
    if signature.len() != 64 && signature.len() != 65 {
        return Err(SigningError::InvalidSignature { index: 0 }.into());
    }
    let (rs, flipped) = low_s(&signature[..64], 0)?;
    if config.verify_signatures && !key.verify(&rs, &digest) {
        return Err(SigningError::InvalidSignature { index: 0 }.into());
    }

    let recid = recovery_id(&digest, &rs, signature.get(64).copied(), flipped, &key)?;
    Ok(tx.encode_signed(recid, &rs[..32], &rs[32..]))
}

/// r || s with s <= n/2; EIP-2 rejects the upper half
fn low_s(rs: &[u8], index: usize) -> WalletResult<([u8; 64], bool)> {
    Secp256k1Curve::normalize_compact(rs).map_err(|_| SigningError::InvalidSignature { index }.into())
}

/// The recovery id that yields `key`; a supplied `v` (0/1 or 27/28) is checked
/// after adjusting for a negated s
fn recovery_id(digest: &[u8], rs: &[u8], v: Option<u8>, flipped: bool, key: &PublicKey) -> WalletResult<u8> {
    let compressed = key.compressed()?;
    let candidates: Vec<u8> = match v {
        Some(v @ 0..=1) => vec![v],
        Some(v @ 27..=28) => vec![v - 27],
        Some(_) => return Err(SigningError::InvalidSignature { index: 0 }.into()),
        None => vec![0, 1],
    };
    candidates
        .into_iter()
        .map(|recid| recid ^ u8::from(flipped))
        .find(|recid| {
            Secp256k1Curve::recover_public_key(digest, rs, *recid)
                .map(|recovered| recovered.as_slice() == compressed.as_bytes())
                .unwrap_or(false)
        })
        .ok_or_else(|| SigningError::InvalidSignature { index: 0 }.into())
}

// MARK: - Binance

const STD_TX_PREFIX: [u8; 4] = [0xf0, 0x62, 0x5d, 0xee];
const SEND_MSG_PREFIX: [u8; 4] = [0x2a, 0x2c, 0x87, 0xfa];
const PUB_KEY_SECP256K1_PREFIX: [u8; 4] = [0xeb, 0x5a, 0xe9, 0x87];

fn compile_binance(
    input: &BinanceSigningInput,
    signatures: &[Vec<u8>],
    public_keys: &[Vec<u8>],
    config: &CompilerConfig,
) -> WalletResult<Vec<u8>> {
    check_counts(1, signatures, public_keys)?;
    let pair = binance::hash_public_key(input)?;

    let key = parse_public_key(&public_keys[0], PublicKeyType::Secp256k1, 0)?;
    if key.hash160().as_slice() != pair.public_key_hash.as_slice() {
        return Err(SigningError::KeyHashMismatch { index: 0 }.into());
    }
    let signature = &signatures[0];
    if signature.len() != 64 && signature.len() != 65 {
        return Err(SigningError::InvalidSignature { index: 0 }.into());
    }
    let (rs, _) = low_s(&signature[..64], 0)?;
    if config.verify_signatures && !key.verify(&rs, &pair.data_hash) {
        return Err(SigningError::InvalidSignature { index: 0 }.into());
    }

    Ok(encode_std_tx(input, key.as_bytes(), &rs))
}

/// Amino `StdTx`, length-prefixed
fn encode_std_tx(input: &BinanceSigningInput, public_key: &[u8], signature: &[u8]) -> Vec<u8> {
    let mut msg = SEND_MSG_PREFIX.to_vec();
    for entry in &input.send_order.inputs {
        write_field_bytes(1, &encode_order_entry(&entry.address, &entry.coins), &mut msg);
    }
    for entry in &input.send_order.outputs {
        write_field_bytes(2, &encode_order_entry(&entry.address, &entry.coins), &mut msg);
    }

    let mut amino_key = PUB_KEY_SECP256K1_PREFIX.to_vec();
    write_field_len_prefixed(public_key, &mut amino_key);

    let mut std_signature = Vec::new();
    write_field_bytes(1, &amino_key, &mut std_signature);
    write_field_bytes(2, signature, &mut std_signature);
    write_field_varint(3, input.account_number as u64, &mut std_signature);
    write_field_varint(4, input.sequence as u64, &mut std_signature);

    let mut tx = STD_TX_PREFIX.to_vec();
    write_field_bytes(1, &msg, &mut tx);
    write_field_bytes(2, &std_signature, &mut tx);
    if !input.memo.is_empty() {
        write_field_bytes(3, input.memo.as_bytes(), &mut tx);
    }
    write_field_varint(4, input.source as u64, &mut tx);

    let mut out = Vec::with_capacity(tx.len() + 2);
    encode_varint(tx.len() as u64, &mut out);
    out.extend_from_slice(&tx);
    out
}

fn encode_order_entry(address: &[u8], coins: &[super::Token]) -> Vec<u8> {
    let mut entry = Vec::new();
    write_field_bytes(1, address, &mut entry);
    for coin in coins {
        let mut token = Vec::new();
        write_field_bytes(1, coin.denom.as_bytes(), &mut token);
        write_field_varint(2, coin.amount as u64, &mut token);
        write_field_bytes(2, &token, &mut entry);
    }
    entry
}

fn write_field_bytes(field: u64, bytes: &[u8], buf: &mut Vec<u8>) {
    encode_varint(field << 3 | 2, buf);
    write_field_len_prefixed(bytes, buf);
}

fn write_field_len_prefixed(bytes: &[u8], buf: &mut Vec<u8>) {
    encode_varint(bytes.len() as u64, buf);
    buf.extend_from_slice(bytes);
}

/// Zero values are omitted
fn write_field_varint(field: u64, value: u64, buf: &mut Vec<u8>) {
    if value == 0 {
        return;
    }
    encode_varint(field << 3, buf);
    encode_varint(value, buf);
}

fn encode_varint(mut value: u64, buf: &mut Vec<u8>) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

// MARK: - Cardano

fn compile_cardano(
    input: &CardanoSigningInput,
    signatures: &[Vec<u8>],
    public_keys: &[Vec<u8>],
    config: &CompilerConfig,
) -> WalletResult<Vec<u8>> {
    let tx = cardano::prepare(input, config)?;
    check_counts(tx.signers.len(), signatures, public_keys)?;
    let body_hash = tx.body_hash();

    let mut witnesses = Vec::with_capacity(signatures.len());
    for (index, (signature, public_key)) in signatures.iter().zip(public_keys).enumerate() {
        let key = parse_public_key(public_key, PublicKeyType::Ed25519Cardano, index)?;
        if blake2b_224(key.key_bytes()) != tx.signers[index] {
            return Err(SigningError::KeyHashMismatch { index }.into());
        }
        if signature.len() != 64 || (config.verify_signatures && !key.verify(signature, &body_hash)) {
            return Err(SigningError::InvalidSignature { index }.into());
        }
        witnesses.push((key.key_bytes().to_vec(), signature.clone()));
    }

    Ok(tx.encode_signed(&witnesses))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{CurveType, PrivateKey};
    use crate::signing::{SendOrder, SendOrderEntry, Token};

    fn binance_input() -> BinanceSigningInput {
        let entry = |hash: &str| SendOrderEntry {
            address: hex::decode(hash).unwrap(),
            coins: vec![Token {
                denom: "BNB".to_string(),
                amount: 1,
            }],
        };
        BinanceSigningInput {
            chain_id: "Binance-Chain-Nile".to_string(),
            send_order: SendOrder {
                inputs: vec![entry("40c2979694bbc961023d1d27be6fc4d21a9febe6")],
                outputs: vec![entry("bffe47abfaede50419c577f1074fee6dd1535cd1")],
            },
            ..Default::default()
        }
    }

    const BINANCE_PUBKEY: &str = "026a35920088d98c3888ca68c53dfc93f4564602606cbb87f0fe5ee533db38e502";
    const BINANCE_SIGNATURE: &str = "1b1181faec30b60a2ddaa2804c253cf264c69180ec31814929b5de62088c0c5a45e8a816d1208fc5366bb8b041781a6771248550d04094c3d7a504f9e8310679";

    #[test]
    fn test_binance_std_tx() {
        let input = SigningInput::Binance(binance_input());
        let encoded = compile_transaction(
            CoinType::BINANCE,
            &input,
            &[hex::decode(BINANCE_SIGNATURE).unwrap()],
            &[hex::decode(BINANCE_PUBKEY).unwrap()],
            &CompilerConfig::default(),
        )
        .unwrap();
        assert_eq!(
            hex::encode(encoded),
            "b801f0625dee0a462a2c87fa0a1f0a1440c2979694bbc961023d1d27be6fc4d21a9febe612070a03424e421001121f0a14bffe47abfaede50419c577f1074fee6dd1535cd112070a03424e421001126a0a26eb5ae98721026a35920088d98c3888ca68c53dfc93f4564602606cbb87f0fe5ee533db38e50212401b1181faec30b60a2ddaa2804c253cf264c69180ec31814929b5de62088c0c5a45e8a816d1208fc5366bb8b041781a6771248550d04094c3d7a504f9e8310679"
        );
    }

    #[test]
    fn test_binance_memo_and_counters() {
        let mut input = binance_input();
        input.memo = "hi".to_string();
        input.account_number = 5;
        input.sequence = 300;
        let tx = encode_std_tx(&input, &[2u8; 33], &[1u8; 64]);
        let hex_tx = hex::encode(&tx);
        assert!(hex_tx.contains("1805" /* account number */));
        assert!(hex_tx.contains("20ac02" /* sequence 300 */));
        assert!(hex_tx.ends_with("1a026869"));
    }

    #[test]
    fn test_binance_rejects_wrong_key() {
        let input = SigningInput::Binance(binance_input());
        let other = PrivateKey::new(&[0x46u8; 32], CurveType::Secp256k1).unwrap();
        let err = compile_transaction(
            CoinType::BINANCE,
            &input,
            &[hex::decode(BINANCE_SIGNATURE).unwrap()],
            &[other.public_key().unwrap().as_bytes().to_vec()],
            &CompilerConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidPublicKey);
    }

    #[test]
    fn test_binance_rejects_tampered_signature() {
        let input = SigningInput::Binance(binance_input());
        let mut signature = hex::decode(BINANCE_SIGNATURE).unwrap();
        signature[10] ^= 0x01;
        let err = compile_transaction(
            CoinType::BINANCE,
            &input,
            &[signature],
            &[hex::decode(BINANCE_PUBKEY).unwrap()],
            &CompilerConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::SigningError);
    }

    #[test]
    fn test_ethereum_accepts_64_byte_signature() {
        let key = PrivateKey::new(&[0x46u8; 32], CurveType::Secp256k1).unwrap();
        let input = EthereumSigningInput {
            chain_id: 1,
            nonce: 11,
            gas_price: 20_000_000_000,
            gas_limit: 21000,
            to_address: "0x3535353535353535353535353535353535353535".to_string(),
            amount: 1_000_000_000_000_000_000,
            ..Default::default()
        };
        let digest = ethereum::hash_public_key(&input).unwrap().data_hash;
        let signature = key.sign(&digest).unwrap();
        let public_key = key.public_key().unwrap().as_bytes().to_vec();

        let config = CompilerConfig::default();
        let with_recid = compile_ethereum(&input, &[signature.clone()], &[public_key.clone()], &config).unwrap();
        let without = compile_ethereum(&input, &[signature[..64].to_vec()], &[public_key], &config).unwrap();
        assert_eq!(with_recid, without);
    }

    #[test]
    fn test_ethereum_rejects_bad_v() {
        let key = PrivateKey::new(&[0x46u8; 32], CurveType::Secp256k1).unwrap();
        let input = EthereumSigningInput {
            chain_id: 1,
            gas_limit: 21000,
            to_address: "0x3535353535353535353535353535353535353535".to_string(),
            ..Default::default()
        };
        let digest = ethereum::hash_public_key(&input).unwrap().data_hash;
        let mut signature = key.sign(&digest).unwrap();
        signature[64] = 5;
        let err = compile_ethereum(
            &input,
            &[signature],
            &[key.public_key().unwrap().as_bytes().to_vec()],
            &CompilerConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::SigningError);
    }

    #[test]
    fn test_count_mismatch_output() {
        let input = SigningInput::Binance(binance_input()).encode().unwrap();
        let bytes = compile_with_signatures(CoinType::BINANCE, &input, &[], &[]);
        let output = SigningOutput::decode(&bytes).unwrap();
        assert_eq!(output.error, ErrorCode::SignaturesCountMismatch);
        assert!(output.encoded.is_empty());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let input = SigningInput::Binance(binance_input()).encode().unwrap();
        let config = CompilerConfig::standard().customize(|c| c.ethereum_default_chain_id = 0);
        let bytes = compile_with_signatures_with_config(CoinType::BINANCE, &input, &[], &[], &config);
        let output = SigningOutput::decode(&bytes).unwrap();
        assert_eq!(output.error, ErrorCode::InvalidInput);
        assert!(output.encoded.is_empty());
    }

    #[test]
    fn test_unencodable_output_reports_failure() {
        let config = CompilerConfig::standard().customize(|c| c.max_payload_bytes = 160);
        let bytes = encode_signing_output(CoinType::BINANCE, Ok(vec![0u8; 200]), &config);
        let output = SigningOutput::decode_with_config(&bytes, &config).unwrap();
        assert_eq!(output.error, ErrorCode::Internal);
        assert!(output.encoded.is_empty());
    }

    #[test]
    fn test_varint() {
        let mut buf = Vec::new();
        encode_varint(300, &mut buf);
        assert_eq!(buf, vec![0xac, 0x02]);
    }
}
