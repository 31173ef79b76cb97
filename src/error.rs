//! Unified error types for the wallet compiler
//!
//! Every failure that leaves the crate is a [`WalletError`] carrying a stable
//! [`ErrorCode`]. The same codes are embedded in `SigningOutput` payloads so
//! callers on the far side of the byte boundary see the same taxonomy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Main error type for all wallet and compiler operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl WalletError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, msg)
    }

    pub fn invalid_address(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidAddress, msg)
    }

    pub fn invalid_mnemonic(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidMnemonic, msg)
    }

    pub fn invalid_private_key(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidPrivateKey, msg)
    }

    pub fn signing_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::SigningError, msg)
    }

    pub fn input_parse(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InputParse, msg)
    }

    pub fn unsupported_coin(id: u32) -> Self {
        Self::new(ErrorCode::UnsupportedCoin, format!("coin type {} is not registered", id))
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, msg)
    }
}

impl fmt::Display for WalletError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for WalletError {}

/// Error codes for categorization
///
/// The numeric discriminants are part of the wire format and must not be
/// reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u16)]
pub enum ErrorCode {
    Ok = 0,

    // Generic
    Internal = 1,

    // Balance and amounts
    LowBalance = 2,
    ZeroAmountRequested = 3,
    WrongFee = 4,

    // Keys and addresses
    MissingPrivateKey = 5,
    InvalidPrivateKey = 6,
    InvalidPublicKey = 7,
    InvalidAddress = 8,

    // UTXO selection
    InvalidUtxo = 9,
    InvalidUtxoAmount = 10,
    MissingInputUtxos = 11,
    NotEnoughUtxos = 12,

    // Signing
    SigningError = 13,
    SignaturesCountMismatch = 14,

    // Transaction shape
    TxTooBig = 15,
    UnsupportedTransaction = 16,

    // Scripts
    MissingRedeemScript = 17,
    InvalidOutputScript = 18,
    NotWitnessProgram = 19,

    // Input
    InvalidMemo = 20,
    InputParse = 21,
    InvalidInput = 22,

    // Wallet
    InvalidMnemonic = 23,
    UnsupportedCoin = 24,
}

impl ErrorCode {
    pub fn is_ok(&self) -> bool {
        *self == ErrorCode::Ok
    }
}

impl Default for ErrorCode {
    fn default() -> Self {
        ErrorCode::Ok
    }
}

/// Result type alias for wallet operations
pub type WalletResult<T> = Result<T, WalletError>;

// Conversions from common error types

impl From<serde_json::Error> for WalletError {
    fn from(e: serde_json::Error) -> Self {
        WalletError::new(ErrorCode::Internal, format!("JSON error: {}", e))
    }
}

impl From<hex::FromHexError> for WalletError {
    fn from(e: hex::FromHexError) -> Self {
        WalletError::new(ErrorCode::InvalidInput, format!("Hex error: {}", e))
    }
}

impl From<bincode::Error> for WalletError {
    fn from(e: bincode::Error) -> Self {
        WalletError::new(ErrorCode::InputParse, format!("Decode error: {}", e))
    }
}

impl From<bech32::Error> for WalletError {
    fn from(e: bech32::Error) -> Self {
        WalletError::new(ErrorCode::InvalidAddress, format!("Bech32 error: {}", e))
    }
}

impl From<bitcoin::bip32::Error> for WalletError {
    fn from(e: bitcoin::bip32::Error) -> Self {
        WalletError::new(ErrorCode::Internal, format!("BIP32 error: {}", e))
    }
}

impl From<bitcoin::secp256k1::Error> for WalletError {
    fn from(e: bitcoin::secp256k1::Error) -> Self {
        WalletError::new(ErrorCode::InvalidPrivateKey, format!("Secp256k1 error: {}", e))
    }
}

impl From<bip39::Error> for WalletError {
    fn from(e: bip39::Error) -> Self {
        WalletError::new(ErrorCode::InvalidMnemonic, format!("BIP39 error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let err = WalletError::new(ErrorCode::LowBalance, "Not enough BTC")
            .with_details("Required: 1200277 sat, Available: 1000000 sat");

        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("low_balance"));
        assert!(json.contains("Not enough BTC"));
    }

    #[test]
    fn test_display_includes_details() {
        let err = WalletError::invalid_address("bad checksum").with_details("bc1qxyz");
        assert_eq!(err.to_string(), "[InvalidAddress] bad checksum (bc1qxyz)");
    }

    #[test]
    fn test_bip39_error_maps_to_invalid_mnemonic() {
        let err: WalletError = bip39::Mnemonic::parse("not a mnemonic").unwrap_err().into();
        assert_eq!(err.code, ErrorCode::InvalidMnemonic);
    }

    #[test]
    fn test_default_code_is_ok() {
        assert!(ErrorCode::default().is_ok());
        assert!(!ErrorCode::SigningError.is_ok());
    }
}
