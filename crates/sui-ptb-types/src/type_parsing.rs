//! Move type strings.
//!
//! Templates, token pool lookups and argument hints all carry Move types as
//! text (`0xb0::token::TOKEN`, `vector<u8>`, `0x2::coin::Coin<T>`). This
//! module turns that text into `TypeTag`s.

use move_core_types::identifier::Identifier;
use move_core_types::language_storage::{StructTag, TypeTag};

use crate::address::parse_address;

fn primitive_tag(name: &str) -> Option<TypeTag> {
    Some(match name {
        "bool" => TypeTag::Bool,
        "u8" => TypeTag::U8,
        "u16" => TypeTag::U16,
        "u32" => TypeTag::U32,
        "u64" => TypeTag::U64,
        "u128" => TypeTag::U128,
        "u256" => TypeTag::U256,
        "address" => TypeTag::Address,
        "signer" => TypeTag::Signer,
        _ => return None,
    })
}

/// Parse any Move type: a primitive, `vector<T>`, or a struct with optional
/// type arguments.
///
/// ```
/// use move_core_types::language_storage::TypeTag;
/// use sui_ptb_types::type_parsing::parse_type_tag;
///
/// let tag = parse_type_tag("vector<0x2::coin::Coin<0x2::sui::SUI>>");
/// assert!(matches!(tag, Some(TypeTag::Vector(_))));
/// ```
pub fn parse_type_tag(type_str: &str) -> Option<TypeTag> {
    let s = type_str.trim();
    if let Some(tag) = primitive_tag(s) {
        return Some(tag);
    }
    match vector_inner(s) {
        Some(inner) => parse_type_tag(inner).map(|t| TypeTag::Vector(Box::new(t))),
        None => parse_struct_tag(s).map(|t| TypeTag::Struct(Box::new(t))),
    }
}

/// Parse `address::module::Name` or `address::module::Name<T, ..>`.
///
/// The address may be short, full or unprefixed (`2::sui::SUI`).
pub fn parse_struct_tag(type_str: &str) -> Option<StructTag> {
    let s = type_str.trim();
    let (path, generics) = match s.split_once('<') {
        Some((path, rest)) => (path, Some(rest.strip_suffix('>')?)),
        None => (s, None),
    };

    let mut segments = path.split("::").map(str::trim);
    let (Some(addr), Some(module), Some(name), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return None;
    };

    let type_params = match generics {
        Some(list) => split_type_params(list)
            .into_iter()
            .map(parse_type_tag)
            .collect::<Option<Vec<_>>>()?,
        None => Vec::new(),
    };

    Some(StructTag {
        address: parse_address(addr)?,
        module: Identifier::new(module).ok()?,
        name: Identifier::new(name).ok()?,
        type_params,
    })
}

/// Return the element type of a `vector<T>` string, or `None` if it is not a vector.
pub fn vector_inner(type_str: &str) -> Option<&str> {
    type_str
        .trim()
        .strip_prefix("vector<")
        .and_then(|s| s.strip_suffix('>'))
        .map(str::trim)
}

/// Whether a type string names a Move primitive.
pub fn is_primitive(type_str: &str) -> bool {
    primitive_tag(type_str.trim()).is_some()
}

/// Split a comma-separated type argument list at top level only.
///
/// `"A, B<C, D>, E"` yields `["A", "B<C, D>", "E"]`.
pub fn split_type_params(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut nesting = 0usize;
    let mut from = 0;

    for (pos, ch) in list.char_indices() {
        match ch {
            '<' => nesting += 1,
            '>' => nesting = nesting.saturating_sub(1),
            ',' if nesting == 0 => {
                parts.push(list[from..pos].trim());
                from = pos + 1;
            }
            _ => {}
        }
    }
    let tail = list[from..].trim();
    if !tail.is_empty() {
        parts.push(tail);
    }
    parts
}
