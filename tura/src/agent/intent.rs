//! Keyword intent matching for chat messages.

use std::sync::LazyLock;

use alloy::primitives::Address;
use regex::Regex;

static TRANSFER_ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:to\s+)?(0x[a-f0-9]{40})\b").expect("valid transfer address regex")
});

static TRANSFER_AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(?:tura)?").expect("valid transfer amount regex")
});

/// What a chat message asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Start wallet creation.
    CreateWallet,
    /// End the session.
    Logout,
    /// Report the wallet balance.
    Balance,
    /// Transfer; fields are `None` when the message did not contain them.
    Transfer {
        /// Decimal amount as written.
        amount: Option<String>,
        /// Recipient.
        to: Option<Address>,
    },
    /// Ask for test tokens.
    Faucet,
    /// Anything else.
    Help,
}

impl Intent {
    /// Classify `text`. Earlier rules win when several keywords appear.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let lower = text.to_lowercase();
        let has = |word: &str| lower.contains(word);

        if has("create") && has("wallet") {
            Self::CreateWallet
        } else if has("logout") || has("log out") || has("sign out") {
            Self::Logout
        } else if has("balance") || (has("check") && has("wallet")) {
            Self::Balance
        } else if has("send") || has("transfer") {
            let (amount, to) = parse_transfer(text);
            Self::Transfer { amount, to }
        } else if (has("test") && has("token")) || has("faucet") {
            Self::Faucet
        } else {
            Self::Help
        }
    }
}

/// Whether `text` confirms a pending offer.
#[must_use]
pub fn is_confirmation(text: &str) -> bool {
    let lower = text.trim().to_lowercase();
    lower == "y" || lower.contains("yes")
}

/// Extract `<amount> [TURA]` and a `0x` recipient from free text.
///
/// The recipient is removed before the amount is searched, so digits inside
/// the address are never taken as the amount.
fn parse_transfer(text: &str) -> (Option<String>, Option<Address>) {
    let to = TRANSFER_ADDRESS_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok());
    let rest = TRANSFER_ADDRESS_RE.replace_all(text, " ");
    let amount = TRANSFER_AMOUNT_RE
        .captures(&rest)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_owned());
    (amount, to)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECIPIENT: &str = "0x08Bb6eA809A2d6c13D57166Fa3ede48C0ae9a70e";

    #[test]
    fn test_keywords() {
        assert_eq!(Intent::parse("Please CREATE a new Wallet"), Intent::CreateWallet);
        assert_eq!(Intent::parse("sign out"), Intent::Logout);
        assert_eq!(Intent::parse("What's my balance?"), Intent::Balance);
        assert_eq!(Intent::parse("check my wallet"), Intent::Balance);
        assert_eq!(Intent::parse("get test tokens"), Intent::Faucet);
        assert_eq!(Intent::parse("faucet please"), Intent::Faucet);
        assert_eq!(Intent::parse("hello"), Intent::Help);
    }

    #[test]
    fn test_transfer_parsing() {
        let intent = Intent::parse(&format!("Send 10.5 TURA to {RECIPIENT}"));
        assert_eq!(
            intent,
            Intent::Transfer {
                amount: Some("10.5".into()),
                to: Some(RECIPIENT.parse().unwrap()),
            }
        );
    }

    #[test]
    fn test_transfer_amount_after_address() {
        let intent = Intent::parse(&format!("transfer to {RECIPIENT} 3 tura"));
        assert_eq!(
            intent,
            Intent::Transfer {
                amount: Some("3".into()),
                to: Some(RECIPIENT.parse().unwrap()),
            }
        );
    }

    #[test]
    fn test_transfer_missing_parts() {
        assert_eq!(
            Intent::parse("send some money"),
            Intent::Transfer {
                amount: None,
                to: None
            }
        );
        assert_eq!(
            Intent::parse("send 5 TURA to 0x1234"),
            Intent::Transfer {
                amount: Some("5".into()),
                to: None
            }
        );
    }

    #[test]
    fn test_confirmation() {
        assert!(is_confirmation("Yes please"));
        assert!(is_confirmation(" y "));
        assert!(!is_confirmation("no thanks"));
    }
}
