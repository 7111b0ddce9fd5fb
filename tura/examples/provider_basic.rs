use std::sync::Arc;

use serde_json::{Value, json};
use tura::prelude::*;

#[tokio::main]
async fn main() -> std::result::Result<(), anyhow::Error> {
    let config = TuraConfig::default().with_env_overrides()?;
    let client = HttpChainClient::connect(&config.chain.rpc_url, config.rpc).await?;

    let provider = CustomProvider::new(
        KeyManager::new(Arc::new(MemoryStore::new())),
        Arc::new(client),
        config.chain.clone(),
    );

    // Print every event as it would reach a dapp
    for kind in [EventKind::AccountsChanged, EventKind::Connect, EventKind::Disconnect] {
        provider.on(kind, move |event| println!("event {}: {}", kind.as_str(), event.payload()));
    }

    let chain_id = provider.request("eth_chainId", Value::Null).await?;
    println!("chain id: {chain_id}");

    // No key yet: the dapp is told to run password setup
    if let Err(err) = provider.request("eth_requestAccounts", Value::Null).await {
        println!("eth_requestAccounts: {} ({})", err.message, err.code());
    }

    provider.create_account("correct horse battery").await?;
    let accounts = provider.request("eth_accounts", json!([])).await?;
    println!("accounts: {accounts}");

    provider.disconnect().await?;
    Ok(())
}
