//! Address and amount parsing.
//!
//! Addresses are accepted in any letter case but must be exactly `0x`
//! followed by 40 hex digits. They are rendered lower-case, which is also
//! the form used in storage keys. Amounts are decimal strings in whole
//! currency units (e.g. `"0.5"` TURA) and convert to base units through
//! `alloy`'s unit helpers.

use std::sync::LazyLock;

use alloy::primitives::utils::{format_units, parse_units};
use alloy::primitives::{Address, U256};
use regex::Regex;

use crate::error::{Result, WalletError};

static ADDRESS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("valid address regex"));

static AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(\.\d+)?$").expect("valid amount regex"));

/// Whether `input` has the shape of an address.
#[must_use]
pub fn is_valid_address(input: &str) -> bool {
    ADDRESS_RE.is_match(input)
}

/// Parse a `0x`-prefixed 20-byte address.
pub fn parse_address(input: &str) -> Result<Address> {
    let trimmed = input.trim();
    if !is_valid_address(trimmed) {
        return Err(WalletError::validation(format!(
            "invalid address '{trimmed}': expected 0x followed by 40 hex characters"
        )));
    }
    trimmed
        .parse()
        .map_err(|e| WalletError::validation(format!("invalid address '{trimmed}': {e}")))
}

/// Lower-case `0x` form of an address.
#[must_use]
pub fn format_address(address: &Address) -> String {
    format!("{address:#x}")
}

/// Parse a strictly positive decimal amount into base units.
pub fn parse_amount(input: &str, decimals: u8) -> Result<U256> {
    let trimmed = input.trim();
    if !AMOUNT_RE.is_match(trimmed) {
        return Err(WalletError::validation(format!(
            "invalid amount '{trimmed}': expected a positive decimal number"
        )));
    }
    let places = trimmed.split_once('.').map_or(0, |(_, fraction)| fraction.len());
    if places > usize::from(decimals) {
        return Err(WalletError::validation(format!(
            "invalid amount '{trimmed}': at most {decimals} decimal places"
        )));
    }
    let value = parse_units(trimmed, decimals)
        .map_err(|e| WalletError::validation(format!("invalid amount '{trimmed}': {e}")))?
        .get_absolute();
    if value.is_zero() {
        return Err(WalletError::validation("amount must be greater than zero"));
    }
    Ok(value)
}

/// Render base units as a decimal string with at least one fractional digit.
#[must_use]
pub fn format_amount(value: U256, decimals: u8) -> String {
    let Ok(formatted) = format_units(value, decimals) else {
        return value.to_string();
    };
    match formatted.split_once('.') {
        Some((whole, fraction)) => {
            let fraction = fraction.trim_end_matches('0');
            if fraction.is_empty() {
                format!("{whole}.0")
            } else {
                format!("{whole}.{fraction}")
            }
        }
        None => format!("{formatted}.0"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WalletErrorKind;

    const ONE_TURA: u128 = 1_000_000_000_000_000_000;

    #[test]
    fn test_parse_address() {
        let addr = parse_address("0x08Bb6eA809A2d6c13D57166Fa3ede48C0ae9a70e").unwrap();
        assert_eq!(
            format_address(&addr),
            "0x08bb6ea809a2d6c13d57166fa3ede48c0ae9a70e"
        );
    }

    #[test]
    fn test_parse_address_rejects_malformed() {
        for input in [
            "",
            "0x",
            "08bb6ea809a2d6c13d57166fa3ede48c0ae9a70e",
            "0x08bb6ea809a2d6c13d57166fa3ede48c0ae9a70",
            "0x08bb6ea809a2d6c13d57166fa3ede48c0ae9a70ee",
            "0xz8bb6ea809a2d6c13d57166fa3ede48c0ae9a70e",
        ] {
            let err = parse_address(input).unwrap_err();
            assert_eq!(err.kind, WalletErrorKind::Validation, "input {input:?}");
        }
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1", 18).unwrap(), U256::from(ONE_TURA));
        assert_eq!(parse_amount("0.5", 18).unwrap(), U256::from(ONE_TURA / 2));
        assert_eq!(parse_amount(" 2.25 ", 18).unwrap(), U256::from(ONE_TURA * 9 / 4));
    }

    #[test]
    fn test_parse_amount_rejects_non_positive() {
        for input in ["0", "0.0", "-1", "abc", "", "1.", ".5", "1e18"] {
            let err = parse_amount(input, 18).unwrap_err();
            assert_eq!(err.kind, WalletErrorKind::Validation, "input {input:?}");
        }
    }

    #[test]
    fn test_parse_amount_rejects_excess_precision() {
        for input in ["0.0000000000000000001", "1.0000000000000000009"] {
            let err = parse_amount(input, 18).unwrap_err();
            assert_eq!(err.kind, WalletErrorKind::Validation, "input {input:?}");
            assert!(err.message.contains("18 decimal places"), "input {input:?}");
        }
        assert_eq!(
            parse_amount("1.000000000000000009", 18).unwrap(),
            U256::from(ONE_TURA + 9)
        );
        assert!(parse_amount("0.01", 1).is_err());
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(U256::ZERO, 18), "0.0");
        assert_eq!(format_amount(U256::from(ONE_TURA), 18), "1.0");
        assert_eq!(format_amount(U256::from(ONE_TURA / 10), 18), "0.1");
        assert_eq!(format_amount(U256::from(1u8), 18), "0.000000000000000001");
    }
}
