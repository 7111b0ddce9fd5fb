#![cfg_attr(docsrs, feature(doc_cfg))]
//! Tura is the key-management core of the Tura wallet: password-sealed
//! private keys, per-address wallet records, expiring login sessions, an
//! EIP-1193 style provider and a small chat assistant on top.
//!
//! # Architecture
//!
//! ```text
//! WalletManager / WalletAgent / CustomProvider
//!        │
//!        ├── crypto   PBKDF2-HMAC-SHA256 + AES-256-GCM, key generation
//!        ├── wallet   sealed records, current-wallet pointer, sessions
//!        ├── store    key/value persistence (memory, JSON files)
//!        └── chain    JSON-RPC client, legacy transaction signing
//! ```
//!
//! Every fallible operation returns [`Result`] with a [`WalletError`]
//! whose [`WalletErrorKind`] is stable enough to branch on.

pub mod agent;
pub mod chain;
pub mod config;
pub mod crypto;
pub mod error;
pub mod prelude;
pub mod provider;
pub mod store;
pub mod units;
pub mod wallet;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::TuraConfig;
pub use error::{Result, WalletError, WalletErrorKind};
