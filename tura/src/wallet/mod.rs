//! Wallet records, login sessions and the [`WalletManager`] facade.
//!
//! # Architecture
//!
//! ```text
//! WalletManager
//!   ├── WalletStorage  → sealed `wallet_<address>` records, `lastWalletAddress`
//!   ├── SessionManager → `tura_session` in the ephemeral store, lazy expiry
//!   └── ChainClient    → balances, nonces, gas price, raw submission
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use tura::wallet::WalletManager;
//!
//! let created = manager.create_wallet("password123").await?;
//! let session = manager.login(&created.address.to_string(), "password123").await?;
//! let balance = manager.get_balance(&created.address.to_string()).await?;
//! ```

mod manager;
mod session;
mod storage;

pub use manager::{
    CreatedWallet, MIN_PASSWORD_LEN, MNEMONIC_WORDS, WalletInfo, WalletManager,
    WalletManagerBuilder,
};
pub use session::{SESSION_KEY, Session, SessionManager};
pub use storage::{
    CURRENT_WALLET_KEY, WALLET_KEY_PREFIX, WalletData, WalletStorage, derive_key, wallet_key,
};
