//! Bitcoin Pre-Image Hashing
//!
//! Plans a Bitcoin-family transaction from its UTXOs and computes the
//! sighash of every input. P2WPKH inputs use BIP-143, P2PKH inputs the
//! legacy algorithm, and any input signed with the FORK flag uses BIP-143.

use crate::coin::CoinType;
use crate::error::{ErrorCode, WalletError, WalletResult};
use crate::script::{self, ScriptKind};
use crate::signing::input::{BitcoinSigningInput, OutPoint, TransactionPlan, UnspentTransaction};
use crate::signing::SigningError;
use crate::utils::config::CompilerConfig;
use crate::utils::crypto::sha256d;
use crate::log_debug;

use super::HashPublicKey;

/// Highest previous-output index accepted in a UTXO
pub const MAX_OUTPUT_INDEX: u32 = 1 << 20;

/// Placeholder lengths used to measure a signed transaction before signing
const DUMMY_DER_LEN: usize = 71;
const DUMMY_PUBKEY_LEN: usize = 33;

/// Sighash type: base type in the low 5 bits, ANYONECANPAY and FORK flags,
/// and a fork id in the upper 24 bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SighashType(u32);

impl SighashType {
    pub const ALL: u32 = 0x01;
    pub const NONE: u32 = 0x02;
    pub const SINGLE: u32 = 0x03;
    pub const FORK: u32 = 0x40;
    pub const ANYONE_CAN_PAY: u32 = 0x80;

    /// Reject base types other than ALL, NONE and SINGLE
    pub fn new(raw: u32) -> WalletResult<Self> {
        let base = raw & 0x1f;
        if !(Self::ALL..=Self::SINGLE).contains(&base) {
            return Err(SigningError::UnsupportedSighash(raw).into());
        }
        Ok(Self(raw))
    }

    pub fn raw(&self) -> u32 {
        self.0
    }

    pub fn base(&self) -> u32 {
        self.0 & 0x1f
    }

    pub fn anyone_can_pay(&self) -> bool {
        self.0 & Self::ANYONE_CAN_PAY != 0
    }

    pub fn has_fork(&self) -> bool {
        self.0 & Self::FORK != 0
    }

    /// Byte appended to each DER signature
    pub fn signature_byte(&self) -> u8 {
        (self.0 & 0xff) as u8
    }
}

/// How an input is unlocked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    P2pkh,
    P2wpkh,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInput {
    pub out_point: OutPoint,
    pub amount: u64,
    pub kind: InputKind,
    pub key_hash: [u8; 20],
    /// Script committed to by the sighash
    pub script_code: Vec<u8>,
    pub script_sig: Vec<u8>,
    pub witness: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    pub value: u64,
    pub script_pubkey: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub version: i32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub lock_time: u32,
}

impl UnsignedTransaction {
    pub fn has_witness(&self) -> bool {
        self.inputs.iter().any(|input| !input.witness.is_empty())
    }

    /// Network serialization; marker and flag are written when any input
    /// carries a witness
    pub fn serialize(&self) -> Vec<u8> {
        self.serialize_inner(self.has_witness())
    }

    fn serialize_inner(&self, with_witness: bool) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&self.version.to_le_bytes());
        if with_witness {
            buf.push(0x00);
            buf.push(0x01);
        }

        write_var_int(self.inputs.len() as u64, &mut buf);
        for input in &self.inputs {
            write_out_point(&input.out_point, &mut buf);
            write_var_bytes(&input.script_sig, &mut buf);
            buf.extend_from_slice(&input.out_point.sequence.to_le_bytes());
        }

        write_var_int(self.outputs.len() as u64, &mut buf);
        for output in &self.outputs {
            write_output(output, &mut buf);
        }

        if with_witness {
            for input in &self.inputs {
                write_var_int(input.witness.len() as u64, &mut buf);
                for item in &input.witness {
                    write_var_bytes(item, &mut buf);
                }
            }
        }

        buf.extend_from_slice(&self.lock_time.to_le_bytes());
        buf
    }

    /// BIP-141 weight: stripped size × 3 + total size
    pub fn weight(&self) -> u64 {
        let stripped = self.serialize_inner(false).len() as u64;
        let total = self.serialize().len() as u64;
        stripped * 3 + total
    }

    pub fn vsize(&self) -> u64 {
        (self.weight() + 3) / 4
    }

    /// Sighash of input `index`
    pub fn sighash(&self, index: usize, hash_type: SighashType) -> WalletResult<[u8; 32]> {
        let input = self
            .inputs
            .get(index)
            .ok_or_else(|| WalletError::internal(format!("input index {} out of range", index)))?;

        if input.kind == InputKind::P2wpkh || hash_type.has_fork() {
            Ok(self.witness_v0_sighash(index, hash_type))
        } else {
            Ok(self.legacy_sighash(index, hash_type))
        }
    }

    fn legacy_sighash(&self, index: usize, hash_type: SighashType) -> [u8; 32] {
        let base = hash_type.base();
        if base == SighashType::SINGLE && index >= self.outputs.len() {
            // Historical SINGLE bug: the digest is the integer one
            let mut one = [0u8; 32];
            one[0] = 1;
            return one;
        }

        let mut buf = Vec::new();
        buf.extend_from_slice(&self.version.to_le_bytes());

        let signed: Vec<usize> = if hash_type.anyone_can_pay() {
            vec![index]
        } else {
            (0..self.inputs.len()).collect()
        };
        write_var_int(signed.len() as u64, &mut buf);
        for i in signed {
            let input = &self.inputs[i];
            write_out_point(&input.out_point, &mut buf);
            if i == index {
                write_var_bytes(&input.script_code, &mut buf);
            } else {
                buf.push(0x00);
            }
            let sequence = if i != index && (base == SighashType::NONE || base == SighashType::SINGLE) {
                0
            } else {
                input.out_point.sequence
            };
            buf.extend_from_slice(&sequence.to_le_bytes());
        }

        match base {
            SighashType::NONE => write_var_int(0, &mut buf),
            SighashType::SINGLE => {
                write_var_int(index as u64 + 1, &mut buf);
                for _ in 0..index {
                    buf.extend_from_slice(&u64::MAX.to_le_bytes());
                    buf.push(0x00);
                }
                write_output(&self.outputs[index], &mut buf);
            }
            _ => {
                write_var_int(self.outputs.len() as u64, &mut buf);
                for output in &self.outputs {
                    write_output(output, &mut buf);
                }
            }
        }

        buf.extend_from_slice(&self.lock_time.to_le_bytes());
        buf.extend_from_slice(&hash_type.raw().to_le_bytes());
        sha256d(&buf)
    }

    fn witness_v0_sighash(&self, index: usize, hash_type: SighashType) -> [u8; 32] {
        let input = &self.inputs[index];
        let base = hash_type.base();
        let single_or_none = base == SighashType::SINGLE || base == SighashType::NONE;

        let hash_prevouts = if hash_type.anyone_can_pay() {
            [0u8; 32]
        } else {
            let mut prevouts = Vec::with_capacity(self.inputs.len() * 36);
            for inp in &self.inputs {
                write_out_point(&inp.out_point, &mut prevouts);
            }
            sha256d(&prevouts)
        };

        let hash_sequence = if hash_type.anyone_can_pay() || single_or_none {
            [0u8; 32]
        } else {
            let sequences: Vec<u8> = self
                .inputs
                .iter()
                .flat_map(|inp| inp.out_point.sequence.to_le_bytes())
                .collect();
            sha256d(&sequences)
        };

        let hash_outputs = if !single_or_none {
            let mut outputs = Vec::new();
            for output in &self.outputs {
                write_output(output, &mut outputs);
            }
            sha256d(&outputs)
        } else if base == SighashType::SINGLE && index < self.outputs.len() {
            let mut output = Vec::new();
            write_output(&self.outputs[index], &mut output);
            sha256d(&output)
        } else {
            [0u8; 32]
        };

        let mut buf = Vec::new();
        buf.extend_from_slice(&self.version.to_le_bytes());
        buf.extend_from_slice(&hash_prevouts);
        buf.extend_from_slice(&hash_sequence);
        write_out_point(&input.out_point, &mut buf);
        write_var_bytes(&input.script_code, &mut buf);
        buf.extend_from_slice(&input.amount.to_le_bytes());
        buf.extend_from_slice(&input.out_point.sequence.to_le_bytes());
        buf.extend_from_slice(&hash_outputs);
        buf.extend_from_slice(&self.lock_time.to_le_bytes());
        buf.extend_from_slice(&hash_type.raw().to_le_bytes());
        sha256d(&buf)
    }
}

// MARK: - Planning

/// A planned transaction and the sighash type its inputs are signed with
#[derive(Debug, Clone)]
pub struct PreparedTransaction {
    pub tx: UnsignedTransaction,
    pub plan: TransactionPlan,
    pub hash_type: SighashType,
}

/// Resolve the UTXOs, plan amounts and build the unsigned transaction
pub fn prepare(
    coin: CoinType,
    input: &BitcoinSigningInput,
    config: &CompilerConfig,
) -> WalletResult<PreparedTransaction> {
    let hash_type = SighashType::new(input.hash_type)?;
    if input.utxos.is_empty() {
        return Err(WalletError::new(ErrorCode::MissingInputUtxos, "no UTXOs to spend"));
    }

    let inputs = input
        .utxos
        .iter()
        .map(|utxo| resolve_utxo(utxo, input))
        .collect::<WalletResult<Vec<_>>>()?;

    let to_script = script::lock_script_for_address(&input.to_address, coin)?.into_bytes();
    let change_script = if input.change_address.trim().is_empty() {
        None
    } else {
        Some(script::lock_script_for_address(&input.change_address, coin)?.into_bytes())
    };

    let available = inputs
        .iter()
        .try_fold(0u64, |acc, inp| acc.checked_add(inp.amount))
        .ok_or_else(|| WalletError::new(ErrorCode::InvalidUtxoAmount, "UTXO total overflows"))?;

    let mut tx = UnsignedTransaction {
        version: input.version,
        inputs,
        outputs: Vec::new(),
        lock_time: input.lock_time,
    };

    let plan = match input.plan {
        Some(plan) => check_plan(plan, available, config)?,
        None => {
            let byte_fee = if input.byte_fee == 0 { config.default_byte_fee } else { input.byte_fee };
            plan_amounts(&tx, input, available, byte_fee, &to_script, change_script.as_deref(), config)?
        }
    };

    tx.outputs.push(TxOutput {
        value: plan.amount,
        script_pubkey: to_script,
    });
    if plan.change > 0 {
        let change_script = change_script
            .ok_or_else(|| WalletError::invalid_address("a change address is required for change"))?;
        tx.outputs.push(TxOutput {
            value: plan.change,
            script_pubkey: change_script,
        });
    }

    let vsize = estimated_vsize(&tx);
    if vsize > config.max_tx_vsize {
        return Err(WalletError::new(
            ErrorCode::TxTooBig,
            format!("estimated {} vbytes exceeds {}", vsize, config.max_tx_vsize),
        ));
    }

    log_debug!(
        "bitcoin",
        "transaction planned",
        inputs = tx.inputs.len(),
        amount = plan.amount,
        fee = plan.fee,
        change = plan.change,
        vsize = vsize
    );
    Ok(PreparedTransaction { tx, plan, hash_type })
}

/// One (sighash, key hash) pair per UTXO, in UTXO order
pub fn hash_public_keys(
    coin: CoinType,
    input: &BitcoinSigningInput,
    config: &CompilerConfig,
) -> WalletResult<Vec<HashPublicKey>> {
    let prepared = prepare(coin, input, config)?;
    prepared
        .tx
        .inputs
        .iter()
        .enumerate()
        .map(|(index, inp)| {
            let digest = prepared.tx.sighash(index, prepared.hash_type)?;
            Ok(HashPublicKey::new(digest.to_vec(), inp.key_hash.to_vec()))
        })
        .collect()
}

fn resolve_utxo(utxo: &UnspentTransaction, input: &BitcoinSigningInput) -> WalletResult<TxInput> {
    if utxo.amount <= 0 {
        return Err(WalletError::new(
            ErrorCode::InvalidUtxoAmount,
            format!("UTXO amount must be positive, got {}", utxo.amount),
        ));
    }
    if utxo.out_point.index > MAX_OUTPUT_INDEX {
        return Err(WalletError::new(
            ErrorCode::InvalidUtxo,
            format!("output index {} is out of range", utxo.out_point.index),
        ));
    }
    if utxo.script.is_empty() {
        return Err(WalletError::new(ErrorCode::InvalidUtxo, "UTXO has no locking script"));
    }

    let (kind, key_hash, script_code) = match script::classify(&utxo.script) {
        ScriptKind::P2wpkh => {
            let key_hash = script::match_p2wpkh(&utxo.script)?;
            let redeem = input.scripts.get(&hex::encode(key_hash)).ok_or_else(|| {
                WalletError::new(
                    ErrorCode::MissingRedeemScript,
                    format!("no redeem script for key hash {}", hex::encode(key_hash)),
                )
            })?;
            if script::match_p2pkh(redeem)? != key_hash {
                return Err(WalletError::new(
                    ErrorCode::InvalidOutputScript,
                    "redeem script pays a different key hash",
                ));
            }
            (InputKind::P2wpkh, key_hash, redeem.clone())
        }
        ScriptKind::P2pkh => {
            let key_hash = script::match_p2pkh(&utxo.script)?;
            (InputKind::P2pkh, key_hash, utxo.script.clone())
        }
        ScriptKind::P2sh | ScriptKind::P2wsh | ScriptKind::WitnessProgram(_) => {
            return Err(WalletError::new(
                ErrorCode::UnsupportedTransaction,
                format!("{:?} inputs cannot be signed", script::classify(&utxo.script)),
            ))
        }
        ScriptKind::NonStandard => {
            return Err(WalletError::new(
                ErrorCode::InvalidOutputScript,
                format!("nonstandard locking script {}", hex::encode(&utxo.script)),
            ))
        }
    };

    Ok(TxInput {
        out_point: utxo.out_point,
        amount: utxo.amount as u64,
        kind,
        key_hash,
        script_code,
        script_sig: Vec::new(),
        witness: Vec::new(),
    })
}

fn check_plan(plan: TransactionPlan, available: u64, config: &CompilerConfig) -> WalletResult<TransactionPlan> {
    let spent = plan
        .amount
        .checked_add(plan.fee)
        .and_then(|v| v.checked_add(plan.change));
    if spent != Some(available) {
        return Err(WalletError::new(
            ErrorCode::WrongFee,
            format!(
                "amount {} + fee {} + change {} does not equal available {}",
                plan.amount, plan.fee, plan.change, available
            ),
        ));
    }
    if plan.amount < config.dust_threshold || (plan.change > 0 && plan.change < config.dust_threshold) {
        return Err(WalletError::new(ErrorCode::NotEnoughUtxos, "planned output is below the dust threshold"));
    }
    Ok(TransactionPlan {
        available_amount: available,
        ..plan
    })
}

fn plan_amounts(
    base: &UnsignedTransaction,
    input: &BitcoinSigningInput,
    available: u64,
    byte_fee: u64,
    to_script: &[u8],
    change_script: Option<&[u8]>,
    config: &CompilerConfig,
) -> WalletResult<TransactionPlan> {
    let fee_for = |outputs: &[&[u8]]| -> WalletResult<u64> {
        let mut tx = base.clone();
        tx.outputs = outputs
            .iter()
            .map(|script| TxOutput {
                value: 0,
                script_pubkey: script.to_vec(),
            })
            .collect();
        estimated_vsize(&tx)
            .checked_mul(byte_fee)
            .ok_or_else(|| WalletError::new(ErrorCode::WrongFee, "fee overflows"))
    };
    let low_balance = |needed: u64| {
        WalletError::new(
            ErrorCode::LowBalance,
            format!("need {} sat, have {} sat", needed, available),
        )
    };

    if input.use_max_amount {
        let fee = fee_for(&[to_script])?;
        let amount = available.checked_sub(fee).ok_or_else(|| low_balance(fee))?;
        if amount < config.dust_threshold {
            return Err(WalletError::new(ErrorCode::NotEnoughUtxos, "nothing left to send after the fee"));
        }
        return Ok(TransactionPlan {
            amount,
            available_amount: available,
            fee,
            change: 0,
        });
    }

    if input.amount == 0 {
        return Err(WalletError::new(ErrorCode::ZeroAmountRequested, "amount must be greater than zero"));
    }
    if input.amount < config.dust_threshold {
        return Err(WalletError::new(
            ErrorCode::NotEnoughUtxos,
            format!("amount {} is below the dust threshold {}", input.amount, config.dust_threshold),
        ));
    }

    if let Some(change_script) = change_script {
        let fee = fee_for(&[to_script, change_script])?;
        let change = input
            .amount
            .checked_add(fee)
            .and_then(|needed| available.checked_sub(needed));
        if let Some(change) = change.filter(|c| *c >= config.dust_threshold) {
            return Ok(TransactionPlan {
                amount: input.amount,
                available_amount: available,
                fee,
                change,
            });
        }
    }

    // No change output; whatever is left over goes to the fee
    let fee = fee_for(&[to_script])?;
    let needed = input
        .amount
        .checked_add(fee)
        .ok_or_else(|| WalletError::new(ErrorCode::WrongFee, "fee overflows"))?;
    if available < needed {
        return Err(low_balance(needed));
    }
    Ok(TransactionPlan {
        amount: input.amount,
        available_amount: available,
        fee: available - input.amount,
        change: 0,
    })
}

/// Size of `tx` once every input carries a placeholder signature and key
fn estimated_vsize(tx: &UnsignedTransaction) -> u64 {
    let mut sized = tx.clone();
    let signature = vec![0u8; DUMMY_DER_LEN + 1];
    let public_key = vec![0u8; DUMMY_PUBKEY_LEN];
    for input in &mut sized.inputs {
        match input.kind {
            InputKind::P2wpkh => input.witness = vec![signature.clone(), public_key.clone()],
            InputKind::P2pkh => input.script_sig = push_data_script(&[&signature, &public_key]),
        }
    }
    sized.vsize()
}

// MARK: - Encoding helpers

/// scriptSig made of data pushes
pub(crate) fn push_data_script(items: &[&[u8]]) -> Vec<u8> {
    let mut script = Vec::new();
    for item in items {
        match item.len() {
            len if len < 0x4c => script.push(len as u8),
            len if len <= 0xff => {
                script.push(0x4c);
                script.push(len as u8);
            }
            len if len <= 0xffff => {
                script.push(0x4d);
                script.extend_from_slice(&(len as u16).to_le_bytes());
            }
            len => {
                script.push(0x4e);
                script.extend_from_slice(&(len as u32).to_le_bytes());
            }
        }
        script.extend_from_slice(item);
    }
    script
}

pub(crate) fn write_var_int(value: u64, buf: &mut Vec<u8>) {
    if value < 0xfd {
        buf.push(value as u8);
    } else if value <= 0xffff {
        buf.push(0xfd);
        buf.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value <= 0xffffffff {
        buf.push(0xfe);
        buf.extend_from_slice(&(value as u32).to_le_bytes());
    } else {
        buf.push(0xff);
        buf.extend_from_slice(&value.to_le_bytes());
    }
}

fn write_var_bytes(bytes: &[u8], buf: &mut Vec<u8>) {
    write_var_int(bytes.len() as u64, buf);
    buf.extend_from_slice(bytes);
}

fn write_out_point(out_point: &OutPoint, buf: &mut Vec<u8>) {
    buf.extend_from_slice(&out_point.hash);
    buf.extend_from_slice(&out_point.index.to_le_bytes());
}

fn write_output(output: &TxOutput, buf: &mut Vec<u8>) {
    buf.extend_from_slice(&output.value.to_le_bytes());
    write_var_bytes(&output.script_pubkey, buf);
}
