//! Hex and base64 decoding with errors that name the value being decoded.

use anyhow::{anyhow, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use move_core_types::account_address::AccountAddress;

/// Parse an address, naming `what` in the error.
///
/// ```ignore
/// let clock = parse_address("0x6", "clock object")?;
/// ```
pub fn parse_address(value: &str, what: &str) -> Result<AccountAddress> {
    crate::address::parse_address(value)
        .ok_or_else(|| anyhow!("Invalid {} '{}': not a 32-byte hex address", what, value))
}

/// Decode hex digits, with or without a `0x` prefix.
pub fn parse_hex_bytes(value: &str, what: &str) -> Result<Vec<u8>> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(digits).map_err(|e| anyhow!("Invalid {} hex '{}': {}", what, value, e))
}

/// Decode standard base64.
pub fn base64_decode(value: &str, what: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(value)
        .map_err(|e| anyhow!("Invalid {} base64 '{}': {}", what, value, e))
}

/// Decode bytes written either as `0x` hex or as base64.
///
/// Nodes return `vector<u8>` values base64-encoded while templates and
/// callers write hex; the prefix picks the decoder.
pub fn decode_hex_or_base64(value: &str, what: &str) -> Result<Vec<u8>> {
    match value.get(..2) {
        Some("0x") | Some("0X") => parse_hex_bytes(&value[2..], what),
        _ => base64_decode(value, what),
    }
}
