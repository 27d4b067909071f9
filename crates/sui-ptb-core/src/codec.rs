//! Generic pure-value encoder.
//!
//! Turns a loosely typed JSON argument plus its declared Move type string
//! into BCS bytes suitable for a `CallArg::Pure` input. Callers supply
//! numbers as JSON numbers or decimal strings, addresses with or without a
//! `0x` prefix, and byte vectors as hex, base64 or arrays.

use anyhow::{anyhow, bail, Context, Result};
use move_core_types::account_address::AccountAddress;
use move_core_types::u256::U256;
use serde::{Serialize, Serializer};
use serde_json::Value as JsonValue;
use sui_ptb_types::address::parse_address;
use sui_ptb_types::encoding::decode_hex_or_base64;
use sui_ptb_types::type_parsing::vector_inner;

/// Type tag used by templates for object parameters.
pub const OBJECT_ID_TYPE: &str = "object_id";

/// Type tag used by templates for dependency parameters.
pub const PTB_DEPENDENCY_TYPE: &str = "ptb_dependency";

/// BCS bytes for `Option::None`, used for optional parameters left empty.
pub const EMPTY_OPTION_BYTES: [u8; 1] = [0x00];

/// Encode a JSON value as BCS bytes according to a Move type string.
pub fn encode_pure_value(value: &JsonValue, type_str: &str) -> Result<Vec<u8>> {
    let typed = PureValue::from_json(value, type_str.trim())?;
    bcs::to_bytes(&typed).with_context(|| format!("failed to serialize {} as BCS", type_str))
}

/// A JSON argument after it has been checked against its Move type.
#[derive(Debug, Clone, PartialEq)]
enum PureValue {
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    U128(u128),
    U256(U256),
    Address(AccountAddress),
    Bytes(Vec<u8>),
    Vector(Vec<PureValue>),
}

impl PureValue {
    fn from_json(value: &JsonValue, type_str: &str) -> Result<Self> {
        Ok(match type_str {
            "bool" => Self::Bool(parse_bool(value)?),
            "u8" => Self::U8(
                u8::try_from(parse_unsigned(value, type_str)?)
                    .map_err(|_| anyhow!("value {} overflows u8", value))?,
            ),
            "u16" => Self::U16(
                u16::try_from(parse_unsigned(value, type_str)?)
                    .map_err(|_| anyhow!("value {} overflows u16", value))?,
            ),
            "u32" => Self::U32(
                u32::try_from(parse_unsigned(value, type_str)?)
                    .map_err(|_| anyhow!("value {} overflows u32", value))?,
            ),
            "u64" => Self::U64(
                u64::try_from(parse_unsigned(value, type_str)?)
                    .map_err(|_| anyhow!("value {} overflows u64", value))?,
            ),
            "u128" => Self::U128(parse_unsigned(value, type_str)?),
            "u256" => Self::U256(parse_u256(value)?),
            "address" | OBJECT_ID_TYPE => Self::Address(parse_address_value(value)?),
            "string" | "String" | "0x1::string::String" | "0x1::ascii::String" => {
                let s = value
                    .as_str()
                    .ok_or_else(|| anyhow!("cannot convert {} to string", value))?;
                Self::Bytes(s.as_bytes().to_vec())
            }
            _ => {
                if let Some(inner) = vector_inner(type_str) {
                    return Self::vector_from_json(value, inner);
                }
                if type_str.contains("::") {
                    bail!("struct types are not supported: {}", type_str);
                }
                bail!("unsupported type: {}", type_str);
            }
        })
    }

    fn vector_from_json(value: &JsonValue, inner: &str) -> Result<Self> {
        if inner == "u8" {
            if let Some(s) = value.as_str() {
                return Ok(Self::Bytes(decode_hex_or_base64(s, "vector<u8>")?));
            }
        }

        let items = value
            .as_array()
            .ok_or_else(|| anyhow!("expected array for vector<{}>, got {}", inner, value))?;
        let elements = items
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                Self::from_json(item, inner)
                    .with_context(|| format!("vector<{}> element {}", inner, idx))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::Vector(elements))
    }
}

impl Serialize for PureValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            PureValue::Bool(b) => b.serialize(serializer),
            PureValue::U8(n) => n.serialize(serializer),
            PureValue::U16(n) => n.serialize(serializer),
            PureValue::U32(n) => n.serialize(serializer),
            PureValue::U64(n) => n.serialize(serializer),
            PureValue::U128(n) => n.serialize(serializer),
            PureValue::U256(n) => n.serialize(serializer),
            PureValue::Address(a) => a.serialize(serializer),
            PureValue::Bytes(b) => b.serialize(serializer),
            PureValue::Vector(v) => v.serialize(serializer),
        }
    }
}

fn parse_bool(value: &JsonValue) -> Result<bool> {
    match value {
        JsonValue::Bool(b) => Ok(*b),
        JsonValue::String(s) if s == "true" => Ok(true),
        JsonValue::String(s) if s == "false" => Ok(false),
        JsonValue::Number(n) => match n.as_u64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => bail!("cannot convert {} to bool", n),
        },
        other => bail!("cannot convert {} to bool", other),
    }
}

/// Parse a JSON value as an unsigned integer up to u128.
fn parse_unsigned(value: &JsonValue, type_name: &str) -> Result<u128> {
    match value {
        JsonValue::Number(n) => {
            if let Some(u) = n.as_u64() {
                return Ok(u as u128);
            }
            if let Some(i) = n.as_i64() {
                bail!("cannot convert negative value {} to {}", i, type_name);
            }
            if let Some(f) = n.as_f64() {
                if f < 0.0 {
                    bail!("cannot convert negative value {} to {}", f, type_name);
                }
                if f.fract() == 0.0 && f <= u64::MAX as f64 {
                    return Ok(f as u128);
                }
            }
            bail!("cannot convert {} to {}", n, type_name)
        }
        JsonValue::String(s) => {
            if s.starts_with('-') {
                bail!("cannot convert negative value {} to {}", s, type_name);
            }
            s.parse::<u128>()
                .with_context(|| format!("failed to parse '{}' as {}", s, type_name))
        }
        other => bail!("cannot convert {} to {}", other, type_name),
    }
}

/// Parse a JSON value as U256. Strings are decimal unless `0x`-prefixed.
fn parse_u256(value: &JsonValue) -> Result<U256> {
    if let Some(s) = value.as_str() {
        return match s.strip_prefix("0x") {
            Some(hex_str) => U256::from_str_radix(hex_str, 16)
                .with_context(|| format!("invalid hex u256 {}", s)),
            None => U256::from_str_radix(s, 10)
                .with_context(|| format!("invalid u256 {}", s)),
        };
    }
    Ok(U256::from(parse_unsigned(value, "u256")?))
}

fn parse_address_value(value: &JsonValue) -> Result<AccountAddress> {
    match value {
        JsonValue::String(s) => parse_address(s).ok_or_else(|| anyhow!("invalid address '{}'", s)),
        JsonValue::Array(items) => {
            let bytes = items
                .iter()
                .map(|item| {
                    item.as_u64()
                        .and_then(|b| u8::try_from(b).ok())
                        .ok_or_else(|| anyhow!("invalid address byte {}", item))
                })
                .collect::<Result<Vec<u8>>>()?;
            AccountAddress::from_bytes(&bytes).map_err(|_| {
                anyhow!("address byte array must have 32 elements, got {}", bytes.len())
            })
        }
        other => bail!("cannot convert {} to address", other),
    }
}
