//! Conversation state machine over [`WalletManager`].

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use tracing::{debug, info, warn};

use super::intent::{Intent, is_confirmation};
use crate::chain::{SentTransaction, TransferRequest, sign_and_send};
use crate::crypto::PrivateKey;
use crate::error::{Result, WalletError};
use crate::units::{format_address, format_amount, parse_amount};
use crate::wallet::{MIN_PASSWORD_LEN, WalletManager};

/// What the agent expects from the next message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pending {
    /// Nothing; the message is matched against intents.
    #[default]
    None,
    /// The next message is the password for a new wallet.
    Password,
    /// The next message answers a faucet offer.
    FaucetConfirmation,
}

/// Keyword-driven wallet assistant.
///
/// Every call to [`WalletAgent::handle`] returns a reply. Failures are
/// turned into readable text rather than propagated.
#[derive(Debug)]
pub struct WalletAgent {
    manager: Arc<WalletManager>,
    pending: Pending,
}

impl WalletAgent {
    /// Create an agent with no pending prompt.
    #[must_use]
    pub const fn new(manager: Arc<WalletManager>) -> Self {
        Self {
            manager,
            pending: Pending::None,
        }
    }

    /// Current pending prompt.
    #[must_use]
    pub const fn pending(&self) -> Pending {
        self.pending
    }

    /// Introduction shown when a conversation starts.
    #[must_use]
    pub fn greeting(&self) -> String {
        format!(
            "Your personal wallet assistant: I can create a wallet, check balances, help you send {} and hand out test tokens.",
            self.symbol()
        )
    }

    /// Reply to one user message.
    pub async fn handle(&mut self, text: &str) -> String {
        match std::mem::take(&mut self.pending) {
            Pending::Password => return self.finish_wallet_creation(text).await,
            Pending::FaucetConfirmation => {
                return if is_confirmation(text) {
                    self.distribute_faucet_tokens().await
                } else {
                    "Okay, I won't send you any test tokens. Let me know if you change your mind!"
                        .to_owned()
                };
            }
            Pending::None => {}
        }

        let intent = Intent::parse(text);
        debug!(?intent, "agent intent");
        match intent {
            Intent::CreateWallet => self.start_wallet_creation().await,
            Intent::Logout => self.logout().await,
            Intent::Balance => self.balance().await,
            Intent::Transfer { amount, to } => self.transfer(amount, to).await,
            Intent::Faucet => self.faucet_offer().await,
            Intent::Help => self.help(),
        }
    }

    fn symbol(&self) -> &str {
        &self.manager.chain_config().native_currency.symbol
    }

    fn decimals(&self) -> u8 {
        self.manager.chain_config().native_currency.decimals
    }

    fn help(&self) -> String {
        let symbol = self.symbol();
        format!(
            "I can help you with your wallet! Try asking me:\n\
             - \"Create a new wallet\"\n\
             - \"What's my balance?\"\n\
             - \"Send 10 {symbol} to 0x...\"\n\
             - \"Get test tokens\" (when your balance is low)"
        )
    }

    async fn start_wallet_creation(&mut self) -> String {
        let current = self.manager.current_address().await;
        match current {
            Ok(Some(address)) => format!(
                "You already have a wallet! Your address is {}. You can ask me to check your balance or send {}.",
                short_address(&address),
                self.symbol()
            ),
            Ok(None) => {
                self.pending = Pending::Password;
                format!(
                    "To create your wallet, I need a secure password. Please enter a password that:\n\
                     - Is at least {MIN_PASSWORD_LEN} characters long\n\
                     - Will be used to encrypt your wallet\n\
                     Make sure to remember it: you'll need it to access your wallet."
                )
            }
            Err(err) => failure("Couldn't look up your wallet", &err),
        }
    }

    async fn finish_wallet_creation(&mut self, password: &str) -> String {
        if password.chars().count() < MIN_PASSWORD_LEN {
            self.pending = Pending::Password;
            return format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters long. Please try again with a longer password."
            );
        }
        match self.manager.create_wallet(password).await {
            Ok(created) => {
                info!(address = %format_address(&created.address), "wallet created from chat");
                format!(
                    "Wallet created successfully!\n\n\
                     Your wallet address: {}\n\n\
                     IMPORTANT: below is your mnemonic phrase. Write it down and keep it safe; \
                     you'll need it to recover your wallet if you forget your password:\n\n\
                     {}\n\n\
                     Never share your mnemonic phrase with anyone!",
                    format_address(&created.address),
                    created.mnemonic.as_str()
                )
            }
            Err(err) => failure("Failed to create wallet", &err),
        }
    }

    async fn logout(&self) -> String {
        match self.manager.logout().await {
            Ok(()) => "You have been logged out successfully. Your session has been cleared."
                .to_owned(),
            Err(err) => failure("Couldn't log out", &err),
        }
    }

    async fn balance(&self) -> String {
        let address = match self.wallet_address().await {
            Ok(Some(address)) => address,
            Ok(None) => return no_wallet(),
            Err(err) => return failure("Couldn't find your wallet", &err),
        };
        match self.manager.balance_of(address).await {
            Ok(balance) => format!(
                "Your wallet ({}) contains {} {symbol}.\n\n\
                 Need to send {symbol}? Tell me the amount and recipient, like:\n\
                 \"Send 10 {symbol} to 0x...\"",
                short_address(&address),
                format_amount(balance, self.decimals()),
                symbol = self.symbol()
            ),
            Err(err) => failure("Couldn't check your balance", &err),
        }
    }

    async fn transfer(&self, amount: Option<String>, to: Option<Address>) -> String {
        let address = match self.wallet_address().await {
            Ok(Some(address)) => address,
            Ok(None) => return no_wallet(),
            Err(err) => return failure("Couldn't find your wallet", &err),
        };
        let symbol = self.symbol();
        let (Some(amount), Some(to)) = (amount, to) else {
            return format!(
                "To send {symbol}, please specify the amount and recipient address clearly. For example:\n\
                 \"Send 10 {symbol} to 0x123...\"\n\
                 \"Transfer 5.5 {symbol} to 0x456...\""
            );
        };
        let value = match parse_amount(&amount, self.decimals()) {
            Ok(value) => value,
            Err(err) => return failure("That amount doesn't look right", &err),
        };

        let balance = match self.manager.balance_of(address).await {
            Ok(balance) => balance,
            Err(err) => return failure("Error checking balance for transfer", &err),
        };
        let balance_text = format_amount(balance, self.decimals());
        if balance < value {
            return format!(
                "Insufficient balance. You have {balance_text} {symbol} but tried to send {amount} {symbol}."
            );
        }
        format!(
            "I can't sign transactions from the chat. Please confirm in the wallet to:\n\n\
             Send {amount} {symbol}\n\
             To: {}\n\n\
             Your current balance is {balance_text} {symbol}.",
            format_address(&to)
        )
    }

    async fn faucet_offer(&mut self) -> String {
        let address = match self.wallet_address().await {
            Ok(Some(address)) => address,
            Ok(None) => return no_wallet(),
            Err(err) => return failure("Couldn't process faucet request", &err),
        };
        let faucet = &self.manager.config().faucet;
        if faucet.private_key.is_none() {
            return "The test faucet is not available right now.".to_owned();
        }
        let decimals = self.decimals();
        let symbol = self.symbol().to_owned();
        let threshold = match parse_amount(&faucet.min_balance, decimals) {
            Ok(threshold) => threshold,
            Err(err) => return failure("The faucet is misconfigured", &err),
        };
        let amount = faucet.amount.clone();
        let min_balance = faucet.min_balance.clone();

        let balance = match self.manager.balance_of(address).await {
            Ok(balance) => balance,
            Err(err) => return failure("Couldn't process faucet request", &err),
        };
        if balance >= threshold {
            return format!(
                "Your current balance ({} {symbol}) is sufficient. The faucet is only available for wallets with less than {min_balance} {symbol}.",
                format_amount(balance, decimals)
            );
        }

        self.pending = Pending::FaucetConfirmation;
        format!(
            "Would you like to receive {amount} {symbol} from our test faucet? This will help you test the wallet features.\n\n\
             Reply \"yes\" to confirm."
        )
    }

    async fn distribute_faucet_tokens(&self) -> String {
        let recipient = match self.wallet_address().await {
            Ok(Some(address)) => address,
            Ok(None) => {
                return "Couldn't find your wallet address. Please create a wallet first."
                    .to_owned();
            }
            Err(err) => return failure("Couldn't find your wallet", &err),
        };
        match self.send_from_faucet(recipient).await {
            Ok(sent) => {
                info!(
                    to = %format_address(&recipient),
                    hash = %sent.hash,
                    "faucet tokens sent"
                );
                format!(
                    "Success! {} {} has been sent to your wallet.\n\n\
                     Transaction {} is being processed. Your balance will update once it is confirmed.",
                    self.manager.config().faucet.amount,
                    self.symbol(),
                    sent.hash
                )
            }
            Err(err) => {
                warn!(error = %err, "faucet transfer failed");
                failure("Failed to send test tokens", &err)
            }
        }
    }

    async fn send_from_faucet(&self, recipient: Address) -> Result<SentTransaction> {
        let faucet = &self.manager.config().faucet;
        let key = faucet
            .private_key
            .as_deref()
            .ok_or_else(|| WalletError::config("faucet key is not configured"))
            .and_then(PrivateKey::parse)?;
        let value = parse_amount(&faucet.amount, self.decimals())?;

        let available: U256 = self.manager.balance_of(key.address()).await?;
        if available < value {
            return Err(WalletError::insufficient_funds(
                "the faucet is currently out of funds",
            ));
        }

        sign_and_send(
            self.manager.chain().as_ref(),
            &key,
            self.manager.chain_config().chain_id,
            TransferRequest::transfer(recipient, value),
        )
        .await
    }

    /// Address of the session wallet, else the last used wallet.
    async fn wallet_address(&self) -> Result<Option<Address>> {
        if let Some(session) = self.manager.session().await? {
            return Ok(Some(session.address));
        }
        self.manager.current_address().await
    }
}

fn short_address(address: &Address) -> String {
    let full = format_address(address);
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}

fn no_wallet() -> String {
    "You'll need a wallet first. Just say 'create wallet' to get started.".to_owned()
}

/// Reply for a failed step. Only transient failures invite a retry.
fn failure(context: &str, err: &WalletError) -> String {
    if err.is_retryable() {
        format!("{context}: {err}. Please try again in a moment.")
    } else {
        format!("{context}: {err}.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::SharedChain;
    use crate::config::TuraConfig;
    use crate::error::WalletErrorKind;
    use crate::test_utils::{MockChain, TEST_ADDRESS, TEST_KEY, one_tura};

    const FAUCET_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

    fn agent_with(config: TuraConfig) -> (WalletAgent, Arc<MockChain>) {
        let chain = Arc::new(MockChain::new());
        let manager = WalletManager::builder()
            .config(config)
            .chain(Arc::clone(&chain) as SharedChain)
            .build()
            .unwrap();
        (WalletAgent::new(Arc::new(manager)), chain)
    }

    fn faucet_config() -> TuraConfig {
        let mut config = TuraConfig::default();
        config.faucet.private_key = Some(FAUCET_KEY.into());
        config
    }

    async fn with_wallet(agent: &mut WalletAgent) -> Address {
        agent.manager.import_private_key(TEST_KEY, "password123").await.unwrap();
        TEST_ADDRESS.parse().unwrap()
    }

    #[tokio::test]
    async fn test_help_for_unknown_message() {
        let (mut agent, _) = agent_with(TuraConfig::default());
        let reply = agent.handle("hello there").await;
        assert!(reply.contains("Create a new wallet"));
        assert_eq!(agent.pending(), Pending::None);
    }

    #[tokio::test]
    async fn test_create_wallet_flow() {
        let (mut agent, _) = agent_with(TuraConfig::default());

        let reply = agent.handle("create wallet").await;
        assert!(reply.contains("password"));
        assert_eq!(agent.pending(), Pending::Password);

        let reply = agent.handle("short").await;
        assert!(reply.contains("at least 8"));
        assert_eq!(agent.pending(), Pending::Password);

        let reply = agent.handle("password123").await;
        assert!(reply.contains("Wallet created successfully"));
        assert_eq!(agent.pending(), Pending::None);

        let address = agent.manager.current_address().await.unwrap().unwrap();
        assert!(reply.contains(&format_address(&address)));

        let reply = agent.handle("create another wallet").await;
        assert!(reply.contains("already have a wallet"));
    }

    #[tokio::test]
    async fn test_password_is_used_verbatim() {
        let (mut agent, _) = agent_with(TuraConfig::default());
        agent.handle("create wallet").await;
        let reply = agent.handle("  spaced password  ").await;
        assert!(reply.contains("Wallet created successfully"), "{reply}");

        let address = format_address(&agent.manager.current_address().await.unwrap().unwrap());
        agent.manager.login(&address, "  spaced password  ").await.unwrap();
        let err = agent.manager.login(&address, "spaced password").await.unwrap_err();
        assert_eq!(err.kind, WalletErrorKind::InvalidPassword);
    }

    #[tokio::test]
    async fn test_balance() {
        let (mut agent, chain) = agent_with(TuraConfig::default());
        assert!(agent.handle("balance").await.contains("need a wallet"));

        let address = with_wallet(&mut agent).await;
        chain.set_balance(address, one_tura() * U256::from(2));
        let reply = agent.handle("what's my balance?").await;
        assert!(reply.contains("2.0 TURA"), "{reply}");
        assert!(reply.contains("0xf39f...2266"), "{reply}");
    }

    #[tokio::test]
    async fn test_balance_network_failure_is_a_reply() {
        let (mut agent, chain) = agent_with(TuraConfig::default());
        with_wallet(&mut agent).await;
        chain.set_offline(true);
        let reply = agent.handle("check wallet").await;
        assert!(reply.starts_with("Couldn't check your balance"), "{reply}");
        assert!(reply.ends_with("Please try again in a moment."), "{reply}");
    }

    #[tokio::test]
    async fn test_invalid_amount_does_not_suggest_retry() {
        let (mut agent, chain) = agent_with(TuraConfig::default());
        let address = with_wallet(&mut agent).await;
        chain.set_balance(address, one_tura());

        let reply = agent
            .handle("send 1.0000000000000000009 TURA to 0x08bb6ea809a2d6c13d57166fa3ede48c0ae9a70e")
            .await;
        assert!(reply.starts_with("That amount doesn't look right"), "{reply}");
        assert!(reply.contains("18 decimal places"), "{reply}");
        assert!(!reply.contains("try again in a moment"), "{reply}");
    }

    #[tokio::test]
    async fn test_transfer_reports_without_signing() {
        let (mut agent, chain) = agent_with(TuraConfig::default());
        let address = with_wallet(&mut agent).await;
        chain.set_balance(address, one_tura() * U256::from(20));

        let recipient = "0x08bb6ea809a2d6c13d57166fa3ede48c0ae9a70e";
        let reply = agent.handle(&format!("Send 10 TURA to {recipient}")).await;
        assert!(reply.contains("Send 10 TURA"), "{reply}");
        assert!(reply.contains(recipient));
        assert!(reply.contains("20.0 TURA"));
        assert!(chain.sent().is_empty());

        let reply = agent.handle(&format!("send 50 TURA to {recipient}")).await;
        assert!(reply.starts_with("Insufficient balance"), "{reply}");

        let reply = agent.handle("send some tokens").await;
        assert!(reply.contains("specify the amount"));
    }

    #[tokio::test]
    async fn test_faucet_disabled_without_key() {
        let (mut agent, _) = agent_with(TuraConfig::default());
        with_wallet(&mut agent).await;
        let reply = agent.handle("faucet").await;
        assert!(reply.contains("not available"));
        assert_eq!(agent.pending(), Pending::None);
    }

    #[tokio::test]
    async fn test_faucet_refused_when_balance_sufficient() {
        let (mut agent, chain) = agent_with(faucet_config());
        let address = with_wallet(&mut agent).await;
        chain.set_balance(address, one_tura());

        let reply = agent.handle("get test tokens").await;
        assert!(reply.contains("is sufficient"), "{reply}");
        assert_eq!(agent.pending(), Pending::None);
    }

    #[tokio::test]
    async fn test_faucet_flow() {
        let (mut agent, chain) = agent_with(faucet_config());
        with_wallet(&mut agent).await;
        let faucet = PrivateKey::parse(FAUCET_KEY).unwrap().address();
        chain.set_balance(faucet, one_tura() * U256::from(100));

        let reply = agent.handle("get test tokens").await;
        assert!(reply.contains("Would you like to receive 1 TURA"), "{reply}");
        assert_eq!(agent.pending(), Pending::FaucetConfirmation);

        let reply = agent.handle("yes").await;
        assert!(reply.starts_with("Success! 1 TURA"), "{reply}");
        assert_eq!(chain.sent().len(), 1);
        assert_eq!(agent.pending(), Pending::None);
    }

    #[tokio::test]
    async fn test_faucet_declined() {
        let (mut agent, chain) = agent_with(faucet_config());
        with_wallet(&mut agent).await;
        agent.handle("faucet").await;

        let reply = agent.handle("no").await;
        assert!(reply.contains("won't send"));
        assert!(chain.sent().is_empty());
    }

    #[tokio::test]
    async fn test_faucet_out_of_funds() {
        let (mut agent, chain) = agent_with(faucet_config());
        with_wallet(&mut agent).await;
        agent.handle("faucet").await;

        let reply = agent.handle("yes").await;
        assert!(reply.contains("out of funds"), "{reply}");
        assert!(chain.sent().is_empty());
    }

    #[tokio::test]
    async fn test_logout() {
        let (mut agent, _) = agent_with(TuraConfig::default());
        with_wallet(&mut agent).await;
        assert!(agent.manager.session().await.unwrap().is_some());

        let reply = agent.handle("please log out").await;
        assert!(reply.contains("logged out"));
        assert!(agent.manager.session().await.unwrap().is_none());
    }
}
