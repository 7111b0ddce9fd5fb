pub use crate::agent::WalletAgent;
pub use crate::chain::{ChainClient, HttpChainClient, SentTransaction, SharedChain};
pub use crate::config::{ChainConfig, TuraConfig};
pub use crate::crypto::{EncryptedKeyRecord, KeyManager, PrivateKey};
pub use crate::error::{Result, WalletError, WalletErrorKind};
pub use crate::provider::{CustomProvider, EventKind, ProviderEvent};
pub use crate::store::{FileStore, MemoryStore, SharedStore, Store};
pub use crate::wallet::{Session, WalletManager};
