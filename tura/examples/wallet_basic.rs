use std::sync::Arc;

use tura::prelude::*;

#[tokio::main]
async fn main() -> std::result::Result<(), anyhow::Error> {
    let config = TuraConfig::default().with_env_overrides()?;

    // Connect to the configured node; a dead endpoint only logs a warning
    let client = HttpChainClient::connect(&config.chain.rpc_url, config.rpc).await?;
    let online = client.probe(config.chain.chain_id).await;

    // Keep everything in memory for the demo
    let manager = WalletManager::builder()
        .config(config)
        .store(Arc::new(MemoryStore::new()))
        .chain(Arc::new(client))
        .build()?;

    let created = manager.create_wallet("correct horse battery").await?;
    println!("address:  {:#x}", created.address);
    println!("mnemonic: {}", created.mnemonic.as_str());

    let session = manager.session().await?.expect("session started on create");
    println!("session valid for {}s", session.remaining().num_seconds());

    if online {
        let balance = manager.get_balance(&format!("{:#x}", created.address)).await?;
        println!("balance:  {balance} TURA");
    }

    Ok(())
}
