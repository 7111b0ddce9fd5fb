//! Tura CLI - password-protected wallet for the Tura chain.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use tura::TuraConfig;
use tura::agent::WalletAgent;
use tura::chain::{HttpChainClient, SharedChain};
use tura::store::FileStore;
use tura::units::format_address;
use tura::wallet::WalletManager;
use tura_cli::{ChatBot, ChatBotConfig};

/// Tura CLI - password-protected wallet
#[derive(Parser, Debug)]
#[command(name = "tura")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding wallet records (defaults to ~/.tura/store)
    #[arg(long, global = true, env = "TURA_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Wallet password
    #[arg(long, global = true, env = "TURA_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a wallet from a fresh recovery phrase
    Create,
    /// Import a wallet from a recovery phrase or a private key
    Import {
        /// Recovery phrase, quoted
        #[arg(long, conflicts_with = "private_key", required_unless_present = "private_key")]
        mnemonic: Option<String>,
        /// Hex private key
        #[arg(long)]
        private_key: Option<String>,
    },
    /// Check the password and make the wallet current
    Login {
        /// Wallet address (defaults to the current wallet)
        address: Option<String>,
    },
    /// Forget the current wallet
    Logout,
    /// Show the balance of a wallet
    Balance {
        /// Wallet address (defaults to the current wallet)
        address: Option<String>,
    },
    /// Send native currency from the current wallet
    Send {
        /// Recipient address
        to: String,
        /// Amount in whole units, e.g. 0.5
        amount: String,
    },
    /// Show configuration, endpoint health and known wallets
    Status,
    /// Chat with the wallet assistant
    Chat,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("tura=debug,tura_cli=debug")
    } else {
        EnvFilter::new("tura=info,tura_cli=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<TuraConfig> {
    let config = match path {
        Some(path) => TuraConfig::load(path)?,
        None => TuraConfig::default().with_env_overrides()?,
    };
    Ok(config)
}

fn require_password(password: Option<&str>) -> anyhow::Result<&str> {
    password.context("a password is required: pass --password or set TURA_PASSWORD")
}

async fn current_or(manager: &WalletManager, address: Option<String>) -> anyhow::Result<String> {
    if let Some(address) = address {
        return Ok(address);
    }
    match manager.current_address().await? {
        Some(address) => Ok(format_address(&address)),
        None => bail!("no current wallet: create, import or login first"),
    }
}

#[tokio::main]
#[allow(clippy::print_stdout)]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = load_config(args.config.as_ref())?;
    let store = args
        .data_dir
        .map_or_else(FileStore::default_path, FileStore::new);

    let client = HttpChainClient::connect(&config.chain.rpc_url, config.rpc).await?;
    let reachable = match args.command {
        Command::Balance { .. } | Command::Send { .. } | Command::Status | Command::Chat => {
            client.probe(config.chain.chain_id).await
        }
        _ => false,
    };
    let rpc_url = client.url().to_owned();
    let chain: SharedChain = Arc::new(client);

    let manager = WalletManager::builder()
        .config(config)
        .store(Arc::new(store))
        .chain(chain)
        .build()?;
    let password = args.password.as_deref();
    let symbol = manager.chain_config().native_currency.symbol.clone();

    match args.command {
        Command::Create => {
            let created = manager.create_wallet(require_password(password)?).await?;
            println!("Address:  {}", format_address(&created.address));
            println!("Mnemonic: {}", created.mnemonic.as_str());
            println!();
            println!("Write the recovery phrase down and keep it offline.");
        }
        Command::Import {
            mnemonic,
            private_key,
        } => {
            let password = require_password(password)?;
            let info = match (mnemonic, private_key) {
                (Some(phrase), _) => manager.import_wallet(&phrase, password).await?,
                (None, Some(key)) => manager.import_private_key(&key, password).await?,
                (None, None) => bail!("pass --mnemonic or --private-key"),
            };
            println!("Imported {}", format_address(&info.address));
        }
        Command::Login { address } => {
            let password = require_password(password)?;
            let session = match address {
                Some(address) => manager.login(&address, password).await?,
                None => manager.login_current(password).await?,
            };
            println!("Unlocked {}", format_address(&session.address));
        }
        Command::Logout => {
            manager.logout().await?;
            println!("Logged out.");
        }
        Command::Balance { address } => {
            let address = current_or(&manager, address).await?;
            let balance = manager.get_balance(&address).await?;
            println!("{address}: {balance} {symbol}");
        }
        Command::Send { to, amount } => {
            let from = current_or(&manager, None).await?;
            let sent = manager
                .send_transaction(&from, &to, &amount, require_password(password)?)
                .await?;
            println!("Sent {amount} {symbol} to {}", format_address(&sent.to));
            println!("Transaction: {}", sent.hash);
        }
        Command::Status => {
            let chain = manager.chain_config();
            println!("Chain:    {} ({})", chain.chain_name, chain.chain_id);
            let health = if reachable { "reachable" } else { "unreachable" };
            println!("Endpoint: {rpc_url} ({health})");
            match manager.current_address().await? {
                Some(address) => println!("Current:  {}", format_address(&address)),
                None => println!("Current:  none"),
            }
            for address in manager.storage().wallet_addresses().await? {
                println!("Wallet:   {}", format_address(&address));
            }
        }
        Command::Chat => {
            if !reachable {
                warn!("chain endpoint unreachable; balance and faucet replies will fail");
            }
            let agent = WalletAgent::new(Arc::new(manager));
            ChatBot::new(agent, ChatBotConfig::default()).run().await?;
        }
    }

    Ok(())
}
