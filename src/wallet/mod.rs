//! Wallet Module
//!
//! Handles mnemonic generation and validation, HD key derivation, address
//! encoding, and derivation path parsing.

mod derivation;
mod derivation_path;
mod hd_wallet;
mod keygen;
mod validation;

pub use derivation::*;
pub use derivation_path::*;
pub use hd_wallet::*;
pub use keygen::*;
pub use validation::*;
