//! Ethereum Pre-Image Hashing
//!
//! Signing hashes for Ethereum transactions.
//! Supports Legacy (EIP-155 replay protection) and EIP-1559 (Fee Market).

use crate::error::WalletResult;
use crate::signing::input::{EthereumSigningInput, EthereumTxMode};
use crate::utils::crypto::keccak256;
use crate::wallet::decode_ethereum_address;

use super::HashPublicKey;

/// EIP-2718 type byte of fee-market transactions
pub const EIP1559_TX_TYPE: u8 = 0x02;

/// Unsigned Ethereum transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedEthereumTransaction {
    pub mode: EthereumTxMode,
    pub chain_id: u64,
    pub nonce: u64,
    /// Legacy only
    pub gas_price: u128,
    /// EIP-1559 only
    pub max_priority_fee_per_gas: u128,
    /// EIP-1559 only
    pub max_fee_per_gas: u128,
    pub gas_limit: u64,
    /// None for contract creation
    pub to: Option<[u8; 20]>,
    pub value: u128,
    pub data: Vec<u8>,
}

impl UnsignedEthereumTransaction {
    pub fn from_input(input: &EthereumSigningInput) -> WalletResult<Self> {
        let to = if input.to_address.trim().is_empty() {
            None
        } else {
            Some(decode_ethereum_address(&input.to_address)?)
        };

        Ok(Self {
            mode: input.tx_mode,
            chain_id: input.chain_id,
            nonce: input.nonce,
            gas_price: input.gas_price,
            max_priority_fee_per_gas: input.max_inclusion_fee_per_gas,
            max_fee_per_gas: input.max_fee_per_gas,
            gas_limit: input.gas_limit,
            to,
            value: input.amount,
            data: input.data.clone(),
        })
    }

    /// RLP items common to the signing and signed encodings
    fn fields(&self) -> Vec<Vec<u8>> {
        match self.mode {
            EthereumTxMode::Legacy => vec![
                rlp_encode_u64(self.nonce),
                rlp_encode_u128(self.gas_price),
                rlp_encode_u64(self.gas_limit),
                rlp_encode_address(self.to),
                rlp_encode_u128(self.value),
                rlp_encode_bytes(&self.data),
            ],
            EthereumTxMode::Eip1559 => vec![
                rlp_encode_u64(self.chain_id),
                rlp_encode_u64(self.nonce),
                rlp_encode_u128(self.max_priority_fee_per_gas),
                rlp_encode_u128(self.max_fee_per_gas),
                rlp_encode_u64(self.gas_limit),
                rlp_encode_address(self.to),
                rlp_encode_u128(self.value),
                rlp_encode_bytes(&self.data),
                // empty access list
                rlp_encode_list(&[]),
            ],
        }
    }

    /// Legacy: keccak256(rlp[nonce, gasPrice, gasLimit, to, value, data, chainId, 0, 0]),
    /// without the last three items when the chain id is zero.
    /// EIP-1559: keccak256(0x02 || rlp[chainId, nonce, maxPriority, maxFee, gasLimit, to, value, data, []]).
    pub fn signing_hash(&self) -> [u8; 32] {
        let mut items = self.fields();
        match self.mode {
            EthereumTxMode::Legacy => {
                if self.chain_id != 0 {
                    items.push(rlp_encode_u64(self.chain_id));
                    items.push(rlp_encode_u64(0));
                    items.push(rlp_encode_u64(0));
                }
                keccak256(&rlp_encode_list(&items))
            }
            EthereumTxMode::Eip1559 => keccak256(&typed_envelope(&rlp_encode_list(&items))),
        }
    }

    /// `v` for a signature with recovery id `recid`
    pub fn v_value(&self, recid: u8) -> u64 {
        match self.mode {
            EthereumTxMode::Legacy if self.chain_id != 0 => self.chain_id * 2 + 35 + recid as u64,
            EthereumTxMode::Legacy => 27 + recid as u64,
            EthereumTxMode::Eip1559 => recid as u64,
        }
    }

    /// Signed network encoding
    pub fn encode_signed(&self, recid: u8, r: &[u8], s: &[u8]) -> Vec<u8> {
        let mut items = self.fields();
        items.push(rlp_encode_u64(self.v_value(recid)));
        items.push(rlp_encode_uint(r));
        items.push(rlp_encode_uint(s));
        let list = rlp_encode_list(&items);
        match self.mode {
            EthereumTxMode::Legacy => list,
            EthereumTxMode::Eip1559 => typed_envelope(&list),
        }
    }
}

fn typed_envelope(payload: &[u8]) -> Vec<u8> {
    let mut typed = Vec::with_capacity(payload.len() + 1);
    typed.push(EIP1559_TX_TYPE);
    typed.extend_from_slice(payload);
    typed
}

/// The sender address bytes, or empty when no sender was given
pub fn sender_key_hash(input: &EthereumSigningInput) -> WalletResult<Vec<u8>> {
    if input.from_address.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(decode_ethereum_address(&input.from_address)?.to_vec())
}

pub fn hash_public_key(input: &EthereumSigningInput) -> WalletResult<HashPublicKey> {
    let tx = UnsignedEthereumTransaction::from_input(input)?;
    Ok(HashPublicKey::new(tx.signing_hash().to_vec(), sender_key_hash(input)?))
}

// RLP encoding helpers

/// Big-endian integer with leading zeros stripped
pub(crate) fn rlp_encode_uint(be_bytes: &[u8]) -> Vec<u8> {
    let leading_zeros = be_bytes.iter().take_while(|&&b| b == 0).count();
    rlp_encode_bytes(&be_bytes[leading_zeros..])
}

pub(crate) fn rlp_encode_u64(val: u64) -> Vec<u8> {
    rlp_encode_uint(&val.to_be_bytes())
}

pub(crate) fn rlp_encode_u128(val: u128) -> Vec<u8> {
    rlp_encode_uint(&val.to_be_bytes())
}

pub(crate) fn rlp_encode_bytes(data: &[u8]) -> Vec<u8> {
    if data.len() == 1 && data[0] < 0x80 {
        return data.to_vec();
    }

    let mut result = encode_header(0x80, 0xb7, data.len());
    result.extend_from_slice(data);
    result
}

fn rlp_encode_address(addr: Option<[u8; 20]>) -> Vec<u8> {
    match addr {
        Some(a) => rlp_encode_bytes(&a),
        None => vec![0x80],
    }
}

pub(crate) fn rlp_encode_list(items: &[Vec<u8>]) -> Vec<u8> {
    let payload: Vec<u8> = items.concat();
    let mut result = encode_header(0xc0, 0xf7, payload.len());
    result.extend_from_slice(&payload);
    result
}

fn encode_header(short_base: u8, long_base: u8, len: usize) -> Vec<u8> {
    if len < 56 {
        return vec![short_base + len as u8];
    }
    let len_bytes = encode_length(len);
    let mut header = vec![long_base + len_bytes.len() as u8];
    header.extend_from_slice(&len_bytes);
    header
}

fn encode_length(len: usize) -> Vec<u8> {
    let bytes = len.to_be_bytes();
    let leading_zeros = bytes.iter().take_while(|&&b| b == 0).count();
    bytes[leading_zeros..].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn sample_legacy() -> EthereumSigningInput {
        EthereumSigningInput {
            chain_id: 1,
            nonce: 11,
            tx_mode: EthereumTxMode::Legacy,
            gas_price: 20_000_000_000,
            gas_limit: 21000,
            from_address: "0x9d8A62f656a8d1615C1294fd71e9CFb3E4855A4F".to_string(),
            to_address: "0x3535353535353535353535353535353535353535".to_string(),
            amount: 1_000_000_000_000_000_000,
            ..Default::default()
        }
    }

    #[test]
    fn test_legacy_hash() {
        let pair = hash_public_key(&sample_legacy()).unwrap();
        assert_eq!(
            hex::encode(&pair.data_hash),
            "15e180a6274b2f6a572b9b51823fce25ef39576d10188ecdcd7de44526c47217"
        );
        assert_eq!(hex::encode(&pair.public_key_hash), "9d8a62f656a8d1615c1294fd71e9cfb3e4855a4f");
    }

    #[test]
    fn test_eip1559_hash() {
        let input = EthereumSigningInput {
            chain_id: 1,
            nonce: 0,
            tx_mode: EthereumTxMode::Eip1559,
            max_inclusion_fee_per_gas: 2_000_000_000,
            max_fee_per_gas: 100_000_000_000,
            gas_limit: 21000,
            to_address: "0x3535353535353535353535353535353535353535".to_string(),
            amount: 1_000_000_000_000_000_000,
            ..Default::default()
        };
        let tx = UnsignedEthereumTransaction::from_input(&input).unwrap();
        assert_eq!(
            hex::encode(tx.signing_hash()),
            "0b90ec27784b0b819f9413e83d1eab4c84f1eda3150059f1881f867fb010f1d1"
        );
        assert_eq!(tx.v_value(1), 1);
        assert_eq!(tx.encode_signed(1, &[1u8; 32], &[2u8; 32])[0], EIP1559_TX_TYPE);
    }

    #[test]
    fn test_contract_creation() {
        let input = EthereumSigningInput {
            nonce: 11,
            gas_price: 20_000_000_000,
            gas_limit: 21000,
            chain_id: 1,
            data: hex::decode("6080604052").unwrap(),
            ..Default::default()
        };
        let tx = UnsignedEthereumTransaction::from_input(&input).unwrap();
        assert_eq!(tx.to, None);
        assert_eq!(
            hex::encode(tx.signing_hash()),
            "d4362f396d9adda0e318b99e4ae1fc823201080ead956c19b9f6357c8079fb5f"
        );
    }

    #[test]
    fn test_invalid_recipient() {
        let mut input = sample_legacy();
        input.to_address = "0x1234".to_string();
        assert_eq!(hash_public_key(&input).unwrap_err().code, ErrorCode::InvalidAddress);
    }

    #[test]
    fn test_v_values() {
        let mut tx = UnsignedEthereumTransaction::from_input(&sample_legacy()).unwrap();
        assert_eq!(tx.v_value(0), 37);
        assert_eq!(tx.v_value(1), 38);
        tx.chain_id = 0;
        assert_eq!(tx.v_value(1), 28);
    }

    #[test]
    fn test_signed_r_s_are_trimmed() {
        let tx = UnsignedEthereumTransaction::from_input(&sample_legacy()).unwrap();
        let mut r = [0u8; 32];
        r[31] = 0x01;
        let encoded = tx.encode_signed(0, &r, &[0x7fu8; 32]);
        let tail = hex::encode(&encoded[encoded.len() - 35..]);
        assert_eq!(tail, format!("2501a0{}", "7f".repeat(32)));
    }

    #[test]
    fn test_rlp_encode_u64() {
        assert_eq!(rlp_encode_u64(0), vec![0x80]);
        assert_eq!(rlp_encode_u64(127), vec![127]);
        assert_eq!(rlp_encode_u64(128), vec![0x81, 128]);
        assert_eq!(rlp_encode_u64(256), vec![0x82, 1, 0]);
    }

    #[test]
    fn test_rlp_encode_bytes() {
        assert_eq!(rlp_encode_bytes(&[]), vec![0x80]);
        assert_eq!(rlp_encode_bytes(&[0x7f]), vec![0x7f]);
        assert_eq!(rlp_encode_bytes(&[0x80]), vec![0x81, 0x80]);
        assert_eq!(rlp_encode_bytes(&[1, 2, 3]), vec![0x83, 1, 2, 3]);

        let long = vec![0xaa; 60];
        assert_eq!(&rlp_encode_bytes(&long)[..2], &[0xb8, 60]);
        assert_eq!(rlp_encode_list(&[]), vec![0xc0]);
    }
}
