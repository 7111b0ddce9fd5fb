//! HTTP JSON-RPC client.

use std::future::Future;

use alloy::network::Ethereum;
use alloy::primitives::{Address, B256, Bytes, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::transports::{RpcError, TransportError};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::ChainClient;
use crate::config::RpcConfig;
use crate::error::{Result, WalletError};

/// [`ChainClient`] over an HTTP endpoint.
///
/// Every call is bounded by [`RpcConfig::timeout`]. Reads that fail with a
/// transport error or time out are retried according to
/// [`RpcConfig::retry`]; error responses from the node are returned as is.
pub struct HttpChainClient {
    provider: DynProvider<Ethereum>,
    url: String,
    config: RpcConfig,
}

impl std::fmt::Debug for HttpChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpChainClient")
            .field("url", &self.url)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HttpChainClient {
    /// Connect to `url`.
    ///
    /// Only the transport is set up here; no request is sent. Use
    /// [`probe`](Self::probe) to check reachability.
    pub async fn connect(url: impl Into<String>, config: RpcConfig) -> Result<Self> {
        let url = url.into();
        let provider = ProviderBuilder::new()
            .connect(&url)
            .await
            .map_err(|e| WalletError::network_fatal(format!("failed to connect to '{url}': {e}")))?
            .erased();
        debug!(url = %url, "rpc transport ready");
        Ok(Self {
            provider,
            url,
            config,
        })
    }

    /// Endpoint URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Check that the endpoint answers and serves `expected_chain_id`.
    ///
    /// Failures are logged and reported as `false`; the wallet keeps
    /// working offline for everything that does not need the chain.
    pub async fn probe(&self, expected_chain_id: u64) -> bool {
        match self.chain_id().await {
            Ok(id) if id == expected_chain_id => {
                let block = self.block_number().await.ok();
                info!(url = %self.url, chain_id = id, block = ?block, "rpc endpoint reachable");
                true
            }
            Ok(id) => {
                warn!(
                    url = %self.url,
                    chain_id = id,
                    expected = expected_chain_id,
                    "rpc endpoint serves a different chain"
                );
                false
            }
            Err(e) => {
                warn!(url = %self.url, error = %e, "rpc endpoint unreachable, continuing offline");
                false
            }
        }
    }

    async fn once<T, Fut>(&self, method: &'static str, fut: Fut) -> Result<T>
    where
        Fut: Future<Output = std::result::Result<T, TransportError>> + Send,
    {
        match tokio::time::timeout(self.config.timeout(), fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(classify(method, &e)),
            Err(_) => Err(WalletError::network(format!(
                "{method} timed out after {}s",
                self.config.timeout_secs
            ))),
        }
    }

    async fn read<T, F, Fut>(&self, method: &'static str, op: F) -> Result<T>
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = std::result::Result<T, TransportError>> + Send,
        T: Send,
    {
        let retry = self.config.retry;
        let attempts = retry.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            match self.once(method, op()).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt + 1 < attempts => {
                    let delay = retry.delay_for_attempt(attempt);
                    warn!(
                        method,
                        attempt = attempt + 1,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %e,
                        "rpc read failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn classify(method: &str, err: &TransportError) -> WalletError {
    match err {
        RpcError::ErrorResp(payload) => {
            WalletError::network_fatal(format!("{method} rejected: {payload}"))
        }
        other => WalletError::network(format!("{method} failed: {other}")),
    }
}

#[async_trait]
impl ChainClient for HttpChainClient {
    async fn chain_id(&self) -> Result<u64> {
        self.read("eth_chainId", || async { self.provider.get_chain_id().await })
            .await
    }

    async fn block_number(&self) -> Result<u64> {
        self.read("eth_blockNumber", || async {
            self.provider.get_block_number().await
        })
        .await
    }

    async fn balance(&self, address: Address) -> Result<U256> {
        self.read("eth_getBalance", || async move {
            self.provider.get_balance(address).await
        })
        .await
    }

    async fn transaction_count(&self, address: Address) -> Result<u64> {
        self.read("eth_getTransactionCount", || async move {
            self.provider.get_transaction_count(address).await
        })
        .await
    }

    async fn gas_price(&self) -> Result<u128> {
        self.read("eth_gasPrice", || async { self.provider.get_gas_price().await })
            .await
    }

    async fn call(&self, request: TransactionRequest) -> Result<Bytes> {
        self.read("eth_call", || {
            let request = request.clone();
            async move { self.provider.call(request).await }
        })
        .await
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<B256> {
        let pending = self
            .once("eth_sendRawTransaction", async {
                self.provider.send_raw_transaction(&raw).await
            })
            .await
            .map_err(|e| WalletError {
                retryable: false,
                ..e
            })?;
        let hash = *pending.tx_hash();
        info!(tx_hash = %hash, "submitted raw transaction");
        Ok(hash)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;
    use crate::config::RetryConfig;
    use crate::error::WalletErrorKind;

    fn fast_config() -> RpcConfig {
        config_with_attempts(2)
    }

    fn config_with_attempts(max_attempts: u32) -> RpcConfig {
        RpcConfig {
            timeout_secs: 1,
            retry: RetryConfig {
                max_attempts,
                initial_delay_ms: 1,
                backoff_multiplier: 1.0,
                jitter: false,
            },
        }
    }

    /// Endpoint that answers every request with 503 and counts connections.
    async fn unavailable_endpoint() -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                let mut buf = vec![0u8; 8192];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(
                        b"HTTP/1.1 503 Service Unavailable\r\n\
                          content-length: 0\r\n\
                          connection: close\r\n\r\n",
                    )
                    .await;
                let _ = socket.shutdown().await;
            }
        });
        (url, hits)
    }

    #[tokio::test]
    async fn test_reads_retry_up_to_max_attempts() {
        let (url, hits) = unavailable_endpoint().await;
        let client = HttpChainClient::connect(url, config_with_attempts(3))
            .await
            .unwrap();

        let err = client.block_number().await.unwrap_err();
        assert_eq!(err.kind, WalletErrorKind::Network);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_send_raw_is_attempted_once() {
        let (url, hits) = unavailable_endpoint().await;
        let client = HttpChainClient::connect(url, config_with_attempts(3))
            .await
            .unwrap();

        let err = client
            .send_raw_transaction(Bytes::from_static(&[0x01]))
            .await
            .unwrap_err();
        assert!(!err.is_retryable());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_network_error() {
        let client = HttpChainClient::connect("http://127.0.0.1:1", fast_config())
            .await
            .unwrap();
        let err = client.block_number().await.unwrap_err();
        assert_eq!(err.kind, WalletErrorKind::Network);
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_probe_degrades_gracefully() {
        let client = HttpChainClient::connect("http://127.0.0.1:1", fast_config())
            .await
            .unwrap();
        assert!(!client.probe(1337).await);
    }

    #[tokio::test]
    async fn test_send_raw_is_not_retryable() {
        let client = HttpChainClient::connect("http://127.0.0.1:1", fast_config())
            .await
            .unwrap();
        let err = client
            .send_raw_transaction(Bytes::from_static(&[0x01]))
            .await
            .unwrap_err();
        assert_eq!(err.kind, WalletErrorKind::Network);
        assert!(!err.is_retryable());
    }
}
