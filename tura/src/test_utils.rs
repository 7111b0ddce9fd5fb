//! Shared fixtures for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use alloy::primitives::{Address, B256, Bytes, U256, keccak256};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;

use crate::chain::ChainClient;
use crate::crypto::RandomSource;
use crate::error::{Result, StoreResult, WalletError};
use crate::store::{MemoryStore, Store};

/// Hardhat account #0.
pub const TEST_KEY: &str = "0xac0974bec39a17e36ba4a4b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
/// Address of [`TEST_KEY`].
pub const TEST_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

pub fn one_tura() -> U256 {
    U256::from(1_000_000_000_000_000_000u128)
}

/// Random source returning a fixed byte.
#[derive(Debug)]
pub struct FixedRandom(u8);

impl FixedRandom {
    pub const fn zeros() -> Self {
        Self(0)
    }
}

impl RandomSource for FixedRandom {
    fn fill(&self, dest: &mut [u8]) -> Result<()> {
        dest.fill(self.0);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum Fault {
    Corrupt,
    Drop,
}

/// Store whose writes do not stick.
#[derive(Debug)]
pub struct FaultyStore {
    inner: MemoryStore,
    fault: Fault,
    /// Only this write (0-based) is faulty; `None` means every write.
    faulty_write: Option<usize>,
    writes: AtomicUsize,
}

impl FaultyStore {
    fn new(fault: Fault, faulty_write: Option<usize>) -> Self {
        Self {
            inner: MemoryStore::new(),
            fault,
            faulty_write,
            writes: AtomicUsize::new(0),
        }
    }

    /// Writes store a truncated value.
    pub fn corrupting() -> Self {
        Self::new(Fault::Corrupt, None)
    }

    /// Writes are silently discarded.
    pub fn dropping() -> Self {
        Self::new(Fault::Drop, None)
    }

    /// Only write number `n` (0-based) stores a truncated value.
    pub fn corrupting_write(n: usize) -> Self {
        Self::new(Fault::Corrupt, Some(n))
    }

    pub const fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

#[async_trait]
impl Store for FaultyStore {
    fn backend(&self) -> &'static str {
        "faulty"
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let n = self.writes.fetch_add(1, Ordering::SeqCst);
        if self.faulty_write.is_some_and(|faulty| faulty != n) {
            return self.inner.set(key, value).await;
        }
        match self.fault {
            Fault::Corrupt => {
                let cut = value.len() / 2;
                self.inner.set(key, &value[..cut]).await
            }
            Fault::Drop => Ok(()),
        }
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        self.inner.remove(key).await
    }

    async fn keys(&self) -> StoreResult<Vec<String>> {
        self.inner.keys().await
    }
}

#[derive(Debug, Default)]
struct ChainState {
    balances: HashMap<Address, U256>,
    nonces: HashMap<Address, u64>,
    sent: Vec<Bytes>,
    calls: Vec<&'static str>,
    offline: bool,
}

/// In-memory chain that records every request.
#[derive(Debug)]
pub struct MockChain {
    chain_id: u64,
    gas_price: u128,
    state: Mutex<ChainState>,
}

impl MockChain {
    pub fn new() -> Self {
        Self {
            chain_id: 1337,
            gas_price: 1_000_000_000,
            state: Mutex::new(ChainState::default()),
        }
    }

    pub fn set_balance(&self, address: Address, balance: U256) {
        self.state.lock().unwrap().balances.insert(address, balance);
    }

    pub fn set_nonce(&self, address: Address, nonce: u64) {
        self.state.lock().unwrap().nonces.insert(address, nonce);
    }

    pub fn set_offline(&self, offline: bool) {
        self.state.lock().unwrap().offline = offline;
    }

    pub fn sent(&self) -> Vec<Bytes> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().calls.clone()
    }

    pub const fn gas_price_value(&self) -> u128 {
        self.gas_price
    }

    fn record(&self, method: &'static str) -> Result<std::sync::MutexGuard<'_, ChainState>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(method);
        if state.offline {
            return Err(WalletError::network(format!("{method} failed: offline")));
        }
        Ok(state)
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn chain_id(&self) -> Result<u64> {
        self.record("eth_chainId")?;
        Ok(self.chain_id)
    }

    async fn block_number(&self) -> Result<u64> {
        let state = self.record("eth_blockNumber")?;
        Ok(state.sent.len() as u64)
    }

    async fn balance(&self, address: Address) -> Result<U256> {
        let state = self.record("eth_getBalance")?;
        Ok(state.balances.get(&address).copied().unwrap_or_default())
    }

    async fn transaction_count(&self, address: Address) -> Result<u64> {
        let state = self.record("eth_getTransactionCount")?;
        Ok(state.nonces.get(&address).copied().unwrap_or_default())
    }

    async fn gas_price(&self) -> Result<u128> {
        self.record("eth_gasPrice")?;
        Ok(self.gas_price)
    }

    async fn call(&self, _request: TransactionRequest) -> Result<Bytes> {
        self.record("eth_call")?;
        Ok(Bytes::from_static(&[0x2a]))
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<B256> {
        let mut state = self.record("eth_sendRawTransaction")?;
        let hash = keccak256(&raw);
        state.sent.push(raw);
        Ok(hash)
    }
}
