//! JSON-RPC access to the Tura chain.
//!
//! # Architecture
//!
//! ```text
//! ChainClient (trait)
//!   ├── HttpChainClient → alloy DynProvider, timeouts, retried reads
//!   └── tx              → legacy transaction build, local signing, submit
//! ```
//!
//! Reads are idempotent and retried with backoff. Submitting a raw
//! transaction is attempted exactly once; the caller decides what to do
//! with a failure.

mod http;
mod tx;

pub use http::HttpChainClient;
pub use tx::{
    LegacyTransaction, SentTransaction, SignedTransaction, TRANSFER_GAS_LIMIT, TransferRequest,
    sign_and_send,
};

use std::sync::Arc;

use alloy::primitives::{Address, B256, Bytes, U256};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;

use crate::error::Result;

/// The subset of the Ethereum JSON-RPC API the wallet relies on.
#[async_trait]
pub trait ChainClient: Send + Sync + std::fmt::Debug {
    /// `eth_chainId`.
    async fn chain_id(&self) -> Result<u64>;

    /// `eth_blockNumber`.
    async fn block_number(&self) -> Result<u64>;

    /// `eth_getBalance` at the latest block, in base units.
    async fn balance(&self, address: Address) -> Result<U256>;

    /// `eth_getTransactionCount` at the latest block.
    async fn transaction_count(&self, address: Address) -> Result<u64>;

    /// `eth_gasPrice`, in base units per gas.
    async fn gas_price(&self) -> Result<u128>;

    /// `eth_call` at the latest block.
    async fn call(&self, request: TransactionRequest) -> Result<Bytes>;

    /// `eth_sendRawTransaction`. Never retried.
    async fn send_raw_transaction(&self, raw: Bytes) -> Result<B256>;
}

/// A shared chain client.
pub type SharedChain = Arc<dyn ChainClient>;
