//! Ethereum address validation
//!
//! Addresses are `0x` followed by 40 hex digits. All-lowercase and
//! all-uppercase forms are accepted as is; mixed-case input must carry a
//! valid EIP-55 checksum.

use std::str::FromStr;
use std::sync::LazyLock;

use alloy_primitives::Address;
use regex::Regex;

static ADDRESS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^0x[0-9a-fA-F]{40}$").unwrap());

/// Check that `raw` is a well-formed address, enforcing EIP-55 for mixed case
pub fn is_valid_address(raw: &str) -> bool {
    if !ADDRESS_REGEX.is_match(raw) {
        return false;
    }

    let digits = &raw[2..];
    let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());

    if has_lower && has_upper {
        Address::parse_checksummed(raw, None).is_ok()
    } else {
        true
    }
}

/// Normalize a valid address to its EIP-55 checksummed form
pub fn to_checksum_address(raw: &str) -> Option<String> {
    if !is_valid_address(raw) {
        return None;
    }

    Address::from_str(raw).ok().map(|a| a.to_checksum(None))
}
