//! Wallet Compiler Library
//!
//! HD wallet key management and an external-signer transaction compiler
//! for Bitcoin, Litecoin, Ethereum, Binance Chain and Cardano.
//!
//! # Architecture
//!
//! This crate provides:
//! - **wallet**: BIP-39 mnemonics, HD derivation, address encoding
//! - **crypto**: curve-tagged private and public keys, signature verification
//! - **coin**: the coin registry (SLIP-44 ids, curves, paths, address formats)
//! - **script**: Bitcoin-family locking scripts
//! - **signing**: input builder, preimage hashes, signature compiler
//!
//! # Security
//!
//! This crate uses `zeroize` to securely clear sensitive data from memory.
//! All private keys, seeds, and entropy are automatically zeroed when dropped.
//!
//! # Example
//!
//! ```rust,ignore
//! use wallet_compiler::{signing, CoinType, HDWallet};
//!
//! let wallet = HDWallet::from_mnemonic(words, "")?;
//! let input = signing::build_input(CoinType::ETHEREUM, &from, &to, "1000", "", "", "1")?;
//! let preimages = signing::pre_image_hashes(CoinType::ETHEREUM, &input);
//! // ... sign the hashes elsewhere ...
//! let output = signing::compile_with_signature(CoinType::ETHEREUM, &input, &signature, &public_key);
//! ```

pub mod coin;
pub mod crypto;
pub mod error;
pub mod script;
pub mod signing;
pub mod utils;
pub mod wallet;

// Re-export key types for convenience
pub use coin::{CoinType, SigningFamily};
pub use crypto::{CurveType, PrivateKey, PublicKey, PublicKeyType};
pub use error::{ErrorCode, WalletError, WalletResult};
pub use utils::config::CompilerConfig;
pub use wallet::{validate_mnemonic, HDWallet};
