//! Collaborator interface to the chain.
//!
//! The engine never talks to a node directly. Lookups, argument encoding and
//! owned-object listing go through a [`PtbClient`], which in production wraps
//! an RPC client and in tests is an in-memory mock.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use sui_ptb_types::encoding::parse_address;
use sui_ptb_types::{CallArg, ObjectArg};

use crate::codec::{encode_pure_value, OBJECT_ID_TYPE};
use crate::context::CallContext;

/// An object owned by an address, with its decoded content fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OwnedObject {
    pub object_id: String,
    /// Full Move type string, e.g. `0xabc::offramp::OffRampStatePointer`
    pub object_type: String,
    #[serde(default)]
    pub fields: Map<String, JsonValue>,
}

/// One page of owned objects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectPage {
    pub data: Vec<OwnedObject>,
    pub next_cursor: Option<String>,
}

/// Chain access required by the PTB engine.
///
/// Implementations are shared across concurrent builds and must not keep
/// per-build state.
#[async_trait::async_trait]
pub trait PtbClient: Send + Sync {
    /// Dev-inspect a Move function and return its decoded return value.
    #[allow(clippy::too_many_arguments)]
    async fn read_function(
        &self,
        ctx: &CallContext,
        signer: &str,
        package_id: &str,
        module: &str,
        function: &str,
        args: Vec<JsonValue>,
        arg_types: Vec<String>,
    ) -> Result<JsonValue>;

    /// List one page of objects owned by `owner`.
    async fn list_owned_objects(
        &self,
        ctx: &CallContext,
        owner: &str,
        cursor: Option<String>,
    ) -> Result<ObjectPage>;

    /// Turn a raw argument into a transaction input.
    ///
    /// The default treats `object_id` values as object references carrying
    /// the requested mutability and BCS-encodes everything else.
    async fn transform_argument(
        &self,
        _ctx: &CallContext,
        raw: &JsonValue,
        declared_type: &str,
        mutable: bool,
    ) -> Result<CallArg> {
        default_transform(raw, declared_type, mutable)
    }
}

/// Encoding used by [`PtbClient::transform_argument`] unless overridden.
pub fn default_transform(raw: &JsonValue, declared_type: &str, mutable: bool) -> Result<CallArg> {
    if declared_type == OBJECT_ID_TYPE {
        let id = raw
            .as_str()
            .with_context(|| format!("expected string object id, got {}", raw))?;
        return Ok(CallArg::Object(ObjectArg {
            id: parse_address(id, "object id")?,
            mutable,
        }));
    }
    let bytes = encode_pure_value(raw, declared_type)
        .with_context(|| format!("failed to encode value as {}", declared_type))?;
    Ok(CallArg::Pure(bytes))
}
