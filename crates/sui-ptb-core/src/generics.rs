//! Generic type resolution.
//!
//! Collects the type arguments of a Move call from the parameters that name
//! a generic type. The first occurrence of each distinct type string fixes
//! its position, which must match the function's type-parameter order.

use std::collections::{BTreeMap, HashSet};

use move_core_types::language_storage::TypeTag;
use sui_ptb_types::type_parsing::{is_primitive, parse_struct_tag, vector_inner};
use tracing::trace;

use crate::config::ParamSpec;
use crate::error::{PtbError, PtbResult};

/// Resolve and deduplicate the type arguments referenced by `params`.
///
/// A param's `generic_type` wins; otherwise `type_hints[param.name]` is used.
/// Params with neither are skipped.
pub fn resolve_generics(
    params: &[ParamSpec],
    type_hints: &BTreeMap<String, String>,
) -> PtbResult<Vec<TypeTag>> {
    let mut seen = HashSet::new();
    let mut tags = Vec::new();

    for param in params {
        let Some(raw) = param
            .generic_type
            .as_deref()
            .or_else(|| type_hints.get(&param.name).map(String::as_str))
        else {
            continue;
        };
        if !seen.insert(raw) {
            continue;
        }
        let tag = create_type_tag(raw).map_err(|err| match err {
            PtbError::TypeResolutionError {
                type_string,
                parameter: None,
                message,
            } => PtbError::TypeResolutionError {
                type_string,
                parameter: Some(param.name.clone()),
                message,
            },
            other => other,
        })?;
        trace!(parameter = %param.name, generic_type = raw, "resolved generic type");
        tags.push(tag);
    }

    Ok(tags)
}

/// Build the type tag for one generic type string.
///
/// `vector<T>` resolves to `T`. Only struct types are accepted as the
/// underlying type.
pub fn create_type_tag(raw: &str) -> PtbResult<TypeTag> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PtbError::type_resolution(raw, "generic type is empty"));
    }

    let base = match vector_inner(trimmed) {
        Some(inner) if vector_inner(inner).is_some() => {
            return Err(PtbError::type_resolution(
                raw,
                "nested generic vectors are not supported",
            ));
        }
        Some(inner) => inner,
        None => trimmed,
    };

    if base.contains("::") {
        return parse_struct_tag(base)
            .map(|tag| TypeTag::Struct(Box::new(tag)))
            .ok_or_else(|| {
                PtbError::type_resolution(
                    raw,
                    "expected address::module::Name with a valid hex address",
                )
            });
    }

    if is_primitive(base) {
        return Err(PtbError::type_resolution(
            raw,
            "primitive generic types are not supported",
        ));
    }
    Err(PtbError::type_resolution(raw, "unrecognized type"))
}
