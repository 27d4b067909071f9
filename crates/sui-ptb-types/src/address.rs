//! Address spellings.
//!
//! Reports, templates and RPC responses write the same 32-byte address as
//! `0x6`, as 64 zero-padded digits, or as bare hex (`6`, returned by token
//! pool lookups). Everything that crosses into the transaction model is
//! parsed here.

use move_core_types::account_address::AccountAddress;

/// Address of the shared `0x2::clock::Clock` object.
pub const CLOCK_OBJECT_ADDRESS: &str = "0x6";

const ADDRESS_HEX_LEN: usize = AccountAddress::LENGTH * 2;

fn strip_hex_prefix(value: &str) -> &str {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value)
}

/// Prefix `0x` onto a hex string that lacks one, leaving its digits untouched.
///
/// ```
/// use sui_ptb_types::address::with_hex_prefix;
///
/// assert_eq!(with_hex_prefix("abc"), "0xabc");
/// assert_eq!(with_hex_prefix("0xabc"), "0xabc");
/// ```
pub fn with_hex_prefix(value: &str) -> String {
    if strip_hex_prefix(value).len() == value.len() {
        format!("0x{}", value)
    } else {
        value.to_string()
    }
}

/// Parse a short, full or unprefixed hex address.
///
/// Returns `None` for empty input, non-hex digits or more than 32 bytes.
pub fn parse_address(addr: &str) -> Option<AccountAddress> {
    let digits = strip_hex_prefix(addr.trim());
    if digits.is_empty() || digits.len() > ADDRESS_HEX_LEN {
        return None;
    }
    let padded = format!("{:0>width$}", digits, width = ADDRESS_HEX_LEN);
    let mut bytes = [0u8; AccountAddress::LENGTH];
    hex::decode_to_slice(padded, &mut bytes).ok()?;
    Some(AccountAddress::new(bytes))
}
