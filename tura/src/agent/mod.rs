//! Keyword-driven chat assistant for wallet operations.
//!
//! The agent matches each message against a small set of intents and
//! answers in plain text. It never signs user transactions; transfers are
//! checked against the balance and handed back to the wallet for signing.
//! The only transaction it submits is a test-token faucet payout, signed
//! with the configured faucet key.
//!
//! ```text
//! "create wallet" ─▶ awaiting password ─▶ WalletManager::create_wallet
//! "test tokens"   ─▶ awaiting "yes"    ─▶ faucet transfer
//! "balance" / "send ..." / "logout"    ─▶ one-shot replies
//! ```

mod intent;
mod wallet_agent;

pub use intent::{Intent, is_confirmation};
pub use wallet_agent::{Pending, WalletAgent};
