//! Offramp operations: execution report model, built-in templates and
//! discovery of the shared objects the offramp calls need.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use sui_ptb_types::address::{with_hex_prefix, CLOCK_OBJECT_ADDRESS};
use sui_ptb_types::encoding::base64_decode;
use tracing::{debug, warn};

use crate::client::{OwnedObject, PtbClient};
use crate::config::{CommandTemplate, FunctionTemplate, ModuleTemplate, OperationMode, ParamSpec};
use crate::context::CallContext;
use crate::error::{PtbError, PtbResult};

pub const OFFRAMP_MODULE: &str = "offramp";
pub const COMMIT_OPERATION: &str = "commit";
pub const EXECUTE_OPERATION: &str = "execute";

/// Argument key holding the [`ExecutionReport`] for execute builds.
pub const EXECUTION_INFO_ARG: &str = "info";

const OFFRAMP_STATE_POINTER_TAG: &str = "offramp::OffRampStatePointer";
const CCIP_OBJECT_REF_POINTER_TAG: &str = "state_object::CCIPObjectRefPointer";

// =============================================================================
// Execution report
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAmount {
    #[serde(default)]
    pub source_pool_address: String,
    /// Coin metadata address of the token on this chain.
    pub dest_token_address: String,
    #[serde(default)]
    pub extra_data: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub dest_exec_data: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHeader {
    #[serde(default)]
    pub message_id: String,
    #[serde(default)]
    pub source_chain_selector: u64,
    #[serde(default)]
    pub dest_chain_selector: u64,
    #[serde(default)]
    pub sequence_number: u64,
    #[serde(default)]
    pub nonce: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub header: MessageHeader,
    #[serde(default)]
    pub sender: String,
    /// Hex payload for the receiver.
    #[serde(default)]
    pub data: String,
    /// `package::module::function` of the receiver, or empty.
    #[serde(default)]
    pub receiver: String,
    #[serde(default)]
    pub gas_limit: String,
    #[serde(default)]
    pub token_amounts: Vec<TokenAmount>,
}

impl Message {
    /// Whether this message calls a receiver: both receiver and payload set.
    pub fn wants_receiver_call(&self) -> bool {
        let data = self.data.trim_start_matches("0x");
        !self.receiver.is_empty() && !data.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteReport {
    #[serde(default)]
    pub source_chain_selector: u64,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub offchain_token_data: Vec<Vec<String>>,
    #[serde(default)]
    pub proofs: Vec<String>,
}

/// Everything one execute transaction delivers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    #[serde(default)]
    pub abstract_reports: Vec<ExecuteReport>,
}

impl ExecutionReport {
    /// Messages in report order.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.abstract_reports.iter().flat_map(|r| r.messages.iter())
    }

    /// Token amounts in report, message, then token order.
    pub fn token_amounts(&self) -> impl Iterator<Item = &TokenAmount> {
        self.messages().flat_map(|m| m.token_amounts.iter())
    }

    /// Chain selector passed to token pools; 0 for an empty report.
    pub fn remote_chain_selector(&self) -> u64 {
        self.abstract_reports
            .first()
            .map(|r| r.source_chain_selector)
            .unwrap_or_default()
    }
}

// =============================================================================
// Built-in templates
// =============================================================================

/// `offramp::commit`, driven by the generic path after object injection.
pub fn commit_template() -> FunctionTemplate {
    FunctionTemplate {
        name: Some(COMMIT_OPERATION.to_string()),
        mode: OperationMode::OffRampCommit,
        ptb_commands: vec![CommandTemplate::move_call(
            None,
            OFFRAMP_MODULE,
            "commit",
            vec![
                ParamSpec::object("ccip_object_ref", true),
                ParamSpec::object("state", true),
                ParamSpec::object("clock", false),
                ParamSpec::new("report_context", "vector<vector<u8>>"),
                ParamSpec::new("report", "vector<u8>"),
                ParamSpec::new("signatures", "vector<vector<u8>>"),
            ],
        )],
        ..Default::default()
    }
}

/// The `init_execute` / `finish_execute` bracket expanded per report.
pub fn execute_template() -> FunctionTemplate {
    FunctionTemplate {
        name: Some(EXECUTE_OPERATION.to_string()),
        mode: OperationMode::OffRampExecute,
        ptb_commands: vec![
            CommandTemplate::move_call(
                None,
                OFFRAMP_MODULE,
                "init_execute",
                vec![
                    ParamSpec::object("ccip_object_ref", false),
                    ParamSpec::new("state", "object_id"),
                    ParamSpec::object("clock", false),
                    ParamSpec::new("report_context", "vector<vector<u8>>"),
                    ParamSpec::new("report", "vector<u8>"),
                ],
            ),
            CommandTemplate::move_call(
                None,
                OFFRAMP_MODULE,
                "finish_execute",
                vec![
                    ParamSpec::object("state", true),
                    ParamSpec::dependency("receiver_params", 0, None),
                ],
            ),
        ],
        ..Default::default()
    }
}

/// A template module carrying both offramp operations.
pub fn offramp_module_template() -> ModuleTemplate {
    let mut functions = BTreeMap::new();
    functions.insert(COMMIT_OPERATION.to_string(), commit_template());
    functions.insert(EXECUTE_OPERATION.to_string(), execute_template());
    ModuleTemplate {
        name: Some(OFFRAMP_MODULE.to_string()),
        module_id: Some(OFFRAMP_MODULE.to_string()),
        functions,
    }
}

// =============================================================================
// Address mappings
// =============================================================================

/// Shared objects and packages the offramp operations reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffRampAddressMappings {
    pub ccip_package_id: String,
    pub ccip_object_ref: String,
    pub ccip_owner_cap: String,
    pub clock_object: String,
    pub offramp_package_id: String,
    pub offramp_state: String,
}

/// Discover the CCIP package and shared objects for an offramp package.
pub async fn get_address_mappings(
    ctx: &CallContext,
    client: &dyn PtbClient,
    signer: &str,
    offramp_package_id: &str,
) -> PtbResult<OffRampAddressMappings> {
    let operation = "offramp::get_ccip_package_id";
    let response = ctx
        .run(
            operation,
            client.read_function(
                ctx,
                signer,
                offramp_package_id,
                OFFRAMP_MODULE,
                "get_ccip_package_id",
                vec![],
                vec![],
            ),
        )
        .await?;
    let ccip_package_id = decode_address_response(&response)
        .map_err(|source| PtbError::external(operation, source))?;
    debug!(ccip_package_id = %ccip_package_id, offramp_package_id, "resolved ccip package");

    let offramp_state = find_pointer(ctx, client, offramp_package_id, OFFRAMP_STATE_POINTER_TAG)
        .await?
        .and_then(|obj| field_str(&obj, "off_ramp_state_id"))
        .ok_or_else(|| missing_mapping("offramp_state"))?;

    let pointer = find_pointer(ctx, client, &ccip_package_id, CCIP_OBJECT_REF_POINTER_TAG).await?;
    let ccip_object_ref = pointer
        .as_ref()
        .and_then(|obj| field_str(obj, "object_ref_id"))
        .ok_or_else(|| missing_mapping("ccip_object_ref"))?;
    let ccip_owner_cap = pointer
        .as_ref()
        .and_then(|obj| field_str(obj, "owner_cap_id"))
        .ok_or_else(|| missing_mapping("ccip_owner_cap"))?;

    Ok(OffRampAddressMappings {
        ccip_package_id,
        ccip_object_ref,
        ccip_owner_cap,
        clock_object: CLOCK_OBJECT_ADDRESS.to_string(),
        offramp_package_id: offramp_package_id.to_string(),
        offramp_state,
    })
}

/// Render a returned address as 0x-hex. Nodes return raw byte arrays or base64.
fn decode_address_response(response: &JsonValue) -> anyhow::Result<String> {
    let value = match response {
        JsonValue::Array(items) if items.len() == 1 => &items[0],
        other => other,
    };
    address_value_to_hex(value)
}

/// Normalize one returned address value to 0x-hex.
///
/// Accepts 0x-hex, bare 64-digit hex, base64, or an array of byte values.
pub(crate) fn address_value_to_hex(value: &JsonValue) -> anyhow::Result<String> {
    match value {
        JsonValue::String(s) if s.starts_with("0x") => Ok(s.clone()),
        JsonValue::String(s) if s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit()) => {
            Ok(with_hex_prefix(s))
        }
        JsonValue::String(s) => Ok(format!("0x{}", hex::encode(base64_decode(s, "address")?))),
        JsonValue::Array(bytes) => {
            let bytes = bytes
                .iter()
                .map(|b| b.as_u64().and_then(|b| u8::try_from(b).ok()))
                .collect::<Option<Vec<u8>>>()
                .ok_or_else(|| anyhow::anyhow!("address bytes out of range: {}", value))?;
            Ok(format!("0x{}", hex::encode(bytes)))
        }
        other => anyhow::bail!("unexpected address value: {}", other),
    }
}

/// First object owned by `owner` whose type contains `tag`, across all pages.
async fn find_pointer(
    ctx: &CallContext,
    client: &dyn PtbClient,
    owner: &str,
    tag: &str,
) -> PtbResult<Option<OwnedObject>> {
    let mut seen = HashSet::new();
    let mut cursor = None;
    loop {
        let page = ctx
            .run(
                "list_owned_objects",
                client.list_owned_objects(ctx, owner, cursor.take()),
            )
            .await?;
        if let Some(found) = page
            .data
            .into_iter()
            .find(|obj| obj.object_type.contains(tag))
        {
            return Ok(Some(found));
        }
        match page.next_cursor {
            Some(next) if seen.insert(next.clone()) => cursor = Some(next),
            Some(next) => {
                warn!(owner, cursor = %next, "owned object cursor repeated, stopping");
                return Ok(None);
            }
            None => return Ok(None),
        }
    }
}

fn field_str(obj: &OwnedObject, field: &str) -> Option<String> {
    obj.fields
        .get(field)
        .and_then(JsonValue::as_str)
        .filter(|s| !s.is_empty())
        .map(with_hex_prefix)
}

fn missing_mapping(name: &str) -> PtbError {
    PtbError::external(
        "offramp address mappings",
        anyhow::anyhow!("address mappings are missing required field {}", name),
    )
}

impl OffRampAddressMappings {
    /// Argument values injected into commit builds.
    pub fn commit_arguments(&self) -> [(&'static str, JsonValue); 3] {
        [
            ("ccip_object_ref", json!(self.ccip_object_ref)),
            ("state", json!(self.offramp_state)),
            ("clock", json!(self.clock_object)),
        ]
    }
}
