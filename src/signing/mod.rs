//! Transaction Compiler
//!
//! The external-signature pipeline:
//! 1. Build a chain-tagged signing input from generic transfer fields
//! 2. Compute the preimage hashes, paired with the key hash that must sign each
//! 3. Accept signatures in preimage order and compile the signed transaction
//!
//! Supported chains:
//! - Bitcoin family (P2PKH, P2WPKH; BIP-143 and legacy sighash)
//! - Ethereum (Legacy EIP-155, EIP-1559)
//! - Binance Chain (JSON sign doc, amino StdTx)
//! - Cardano (Shelley CBOR body and vkey witnesses)
//!
//! Every payload crossing the boundary uses the versioned envelope in
//! [`codec`].

pub mod codec;
pub mod compiler;
pub mod input;
pub mod input_builder;
pub mod local;
pub mod preimage;

pub use compiler::{
    compile_transaction, compile_with_signature, compile_with_signature_with_config,
    compile_with_signatures, compile_with_signatures_with_config, SigningOutput,
};
pub use input::*;
pub use input_builder::{build_input, build_input_with_config, build_signing_input};
pub use local::{sign_with_keys, sign_with_keys_with_config};
pub use preimage::{
    compute_pre_image_hashes, pre_image_hashes, pre_image_hashes_with_config, HashPublicKey,
    PreSigningOutput,
};

use crate::coin::{CoinType, SigningFamily};
use crate::crypto::PublicKeyType;
use crate::error::{ErrorCode, WalletError};

/// Pipeline failures that are not plain validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SigningError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("{coin} compiles {expected:?} transactions, but the input is {found:?}")]
    FamilyMismatch {
        coin: CoinType,
        expected: SigningFamily,
        found: SigningFamily,
    },

    #[error("Expected {expected} signatures, got {signatures} signatures and {public_keys} public keys")]
    CountMismatch {
        expected: usize,
        signatures: usize,
        public_keys: usize,
    },

    #[error("Public key {index} is not a valid {expected:?} key")]
    InvalidPublicKey { index: usize, expected: PublicKeyType },

    #[error("Public key {index} does not match the key hash of its preimage")]
    KeyHashMismatch { index: usize },

    #[error("Signature {index} does not verify against its public key and preimage")]
    InvalidSignature { index: usize },

    #[error("Unsupported sighash type 0x{0:02x}")]
    UnsupportedSighash(u32),
}

impl SigningError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::MalformedPayload(_) | Self::FamilyMismatch { .. } => ErrorCode::InputParse,
            Self::CountMismatch { .. } => ErrorCode::SignaturesCountMismatch,
            Self::InvalidPublicKey { .. } | Self::KeyHashMismatch { .. } => ErrorCode::InvalidPublicKey,
            Self::InvalidSignature { .. } => ErrorCode::SigningError,
            Self::UnsupportedSighash(_) => ErrorCode::UnsupportedTransaction,
        }
    }
}

impl From<SigningError> for WalletError {
    fn from(e: SigningError) -> Self {
        WalletError::new(e.code(), e.to_string())
    }
}

/// Reject an input whose chain tag does not match the coin's family
pub(crate) fn ensure_family(coin: CoinType, input: &SigningInput) -> Result<SigningFamily, WalletError> {
    let expected = coin.signing_family()?;
    let found = input.family();
    if expected != found {
        return Err(SigningError::FamilyMismatch { coin, expected, found }.into());
    }
    Ok(expected)
}
