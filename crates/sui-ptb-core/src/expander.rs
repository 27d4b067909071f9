//! Offramp execute expansion.
//!
//! The execute operation is configured as a fixed two-command bracket,
//! `init_execute` and `finish_execute`. At build time one `release_or_mint`
//! call per delivered token and one call per registered message receiver are
//! spliced between them. Each spliced call consumes the receiver-params hot
//! potato produced by the call before it, and `finish_execute` is rewired to
//! consume the last one.
//!
//! ```text
//! [init_execute] [pool_1 .. pool_N] [receiver_N+1 .. receiver_N+R] [finish_execute]
//!       0            1 .. N              N+1 .. N+R                    N+R+1
//! ```

use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use sui_ptb_types::address::with_hex_prefix;
use tracing::{debug, warn};

use crate::arguments::Arguments;
use crate::client::PtbClient;
use crate::codec::OBJECT_ID_TYPE;
use crate::config::{CommandTemplate, ParamSpec};
use crate::context::CallContext;
use crate::error::{PtbError, PtbResult};
use crate::offramp::{address_value_to_hex, ExecutionReport, OffRampAddressMappings, TokenAmount};

/// Number of commands in the execute bracket.
pub const FIXED_TEMPLATE_COMMANDS: usize = 2;

/// Entry point every token pool exposes for inbound transfers.
pub const TOKEN_POOL_FUNCTION: &str = "release_or_mint";

const TOKEN_ADMIN_REGISTRY_MODULE: &str = "token_admin_registry";
const RECEIVER_REGISTRY_MODULE: &str = "receiver_registry";

/// Destination token pool for one token transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPoolDescriptor {
    pub coin_metadata: String,
    pub token_type: String,
    pub package: String,
    pub module: String,
    pub function: String,
    pub pool_state_address: String,
    /// Position among all token transfers in the report.
    pub index: usize,
}

/// A message receiver entry point, parsed from `package::module::function`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverTarget {
    pub package: String,
    pub module: String,
    pub function: String,
}

impl ReceiverTarget {
    pub fn parse(receiver: &str) -> PtbResult<Self> {
        let parts: Vec<&str> = receiver.split("::").collect();
        match parts.as_slice() {
            [package, module, function]
                if !package.is_empty() && !module.is_empty() && !function.is_empty() =>
            {
                Ok(Self {
                    package: with_hex_prefix(package),
                    module: module.to_string(),
                    function: function.to_string(),
                })
            }
            _ => Err(PtbError::invalid_shape(
                "receiver",
                format!(
                    "expected package::module::function, got '{}'",
                    receiver
                ),
            )),
        }
    }
}

/// Expanded command sequence plus the arguments it needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Expansion {
    pub commands: Vec<CommandTemplate>,
    /// Values for the spliced commands; pool token types go in `type_hints`.
    pub arguments: Arguments,
}

#[derive(Debug, Deserialize)]
struct PoolInfos {
    token_pool_package_ids: Vec<JsonValue>,
    token_pool_state_addresses: Vec<JsonValue>,
    token_pool_modules: Vec<String>,
    token_types: Vec<String>,
}

pub struct OffRampExpander<'a> {
    client: &'a dyn PtbClient,
    mappings: &'a OffRampAddressMappings,
    signer: &'a str,
}

impl<'a> OffRampExpander<'a> {
    pub fn new(
        client: &'a dyn PtbClient,
        mappings: &'a OffRampAddressMappings,
        signer: &'a str,
    ) -> Self {
        Self {
            client,
            mappings,
            signer,
        }
    }

    /// Expand the execute bracket for `report`.
    pub async fn expand(
        &self,
        ctx: &CallContext,
        report: &ExecutionReport,
        fixed: &[CommandTemplate],
    ) -> PtbResult<Expansion> {
        if fixed.len() != FIXED_TEMPLATE_COMMANDS {
            return Err(PtbError::TemplateShapeError {
                expected: FIXED_TEMPLATE_COMMANDS,
                found: fixed.len(),
            });
        }

        let tokens: Vec<&TokenAmount> = report.token_amounts().collect();
        let pools = self.token_pools(ctx, &tokens).await?;
        let receivers = self.registered_receivers(ctx, report).await?;

        let expansion = splice(
            fixed,
            &pools,
            &receivers,
            report.remote_chain_selector(),
            self.mappings,
        )?;
        debug!(
            tokens = pools.len(),
            receivers = receivers.len(),
            commands = expansion.commands.len(),
            "expanded execute template"
        );
        Ok(expansion)
    }

    /// Resolve the destination pool of every token, in one batched lookup.
    pub async fn token_pools(
        &self,
        ctx: &CallContext,
        tokens: &[&TokenAmount],
    ) -> PtbResult<Vec<TokenPoolDescriptor>> {
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        let coin_metadata: Vec<String> = tokens
            .iter()
            .map(|t| with_hex_prefix(&t.dest_token_address))
            .collect();
        let operation = "token_admin_registry::get_pool_infos";
        let response = ctx
            .run(
                operation,
                self.client.read_function(
                    ctx,
                    self.signer,
                    &self.mappings.ccip_package_id,
                    TOKEN_ADMIN_REGISTRY_MODULE,
                    "get_pool_infos",
                    vec![json!(self.mappings.ccip_object_ref), json!(coin_metadata)],
                    vec![OBJECT_ID_TYPE.to_string(), "vector<address>".to_string()],
                ),
            )
            .await?;

        decode_pool_infos(response, &coin_metadata).map_err(|e| PtbError::external(operation, e))
    }

    /// Messages that want a receiver call and whose receiver is registered, in message order.
    pub async fn registered_receivers(
        &self,
        ctx: &CallContext,
        report: &ExecutionReport,
    ) -> PtbResult<Vec<ReceiverTarget>> {
        let candidates = report
            .messages()
            .filter(|m| m.wants_receiver_call())
            .map(|m| ReceiverTarget::parse(&m.receiver))
            .collect::<PtbResult<Vec<_>>>()?;

        let mut registered = Vec::with_capacity(candidates.len());
        for target in candidates {
            if self.is_registered_receiver(ctx, &target.package).await? {
                registered.push(target);
            } else {
                warn!(package = %target.package, "skipping unregistered receiver");
            }
        }
        Ok(registered)
    }

    async fn is_registered_receiver(&self, ctx: &CallContext, package: &str) -> PtbResult<bool> {
        let operation = "receiver_registry::is_registered_receiver";
        let response = ctx
            .run(
                operation,
                self.client.read_function(
                    ctx,
                    self.signer,
                    &self.mappings.ccip_package_id,
                    RECEIVER_REGISTRY_MODULE,
                    "is_registered_receiver",
                    vec![json!(self.mappings.ccip_object_ref), json!(package)],
                    vec![OBJECT_ID_TYPE.to_string(), "address".to_string()],
                ),
            )
            .await?;
        decode_bool(&response).map_err(|e| PtbError::external(operation, e))
    }
}

fn decode_pool_infos(
    response: JsonValue,
    coin_metadata: &[String],
) -> anyhow::Result<Vec<TokenPoolDescriptor>> {
    let value = match response {
        JsonValue::Array(mut items) if items.len() == 1 => items.remove(0),
        other => other,
    };
    let infos: PoolInfos = serde_json::from_value(value)?;

    let expected = coin_metadata.len();
    for (field, len) in [
        ("token_pool_package_ids", infos.token_pool_package_ids.len()),
        ("token_pool_state_addresses", infos.token_pool_state_addresses.len()),
        ("token_pool_modules", infos.token_pool_modules.len()),
        ("token_types", infos.token_types.len()),
    ] {
        if len != expected {
            anyhow::bail!("{} has {} entries, expected {}", field, len, expected);
        }
    }

    coin_metadata
        .iter()
        .enumerate()
        .map(|(index, metadata)| {
            Ok(TokenPoolDescriptor {
                coin_metadata: metadata.clone(),
                token_type: with_hex_prefix(&infos.token_types[index]),
                package: address_value_to_hex(&infos.token_pool_package_ids[index])?,
                module: infos.token_pool_modules[index].clone(),
                function: TOKEN_POOL_FUNCTION.to_string(),
                pool_state_address: address_value_to_hex(
                    &infos.token_pool_state_addresses[index],
                )?,
                index,
            })
        })
        .collect()
}

fn decode_bool(response: &JsonValue) -> anyhow::Result<bool> {
    match response {
        JsonValue::Bool(b) => Ok(*b),
        JsonValue::Array(items) if items.len() == 1 => decode_bool(&items[0]),
        JsonValue::String(s) if s == "true" => Ok(true),
        JsonValue::String(s) if s == "false" => Ok(false),
        other => anyhow::bail!("expected bool, got {}", other),
    }
}

/// Splice pool and receiver commands into the bracket and build their arguments.
///
/// Pure: all lookups have already happened.
pub fn splice(
    fixed: &[CommandTemplate],
    pools: &[TokenPoolDescriptor],
    receivers: &[ReceiverTarget],
    remote_chain_selector: u64,
    mappings: &OffRampAddressMappings,
) -> PtbResult<Expansion> {
    let [begin, end] = fixed else {
        return Err(PtbError::TemplateShapeError {
            expected: FIXED_TEMPLATE_COMMANDS,
            found: fixed.len(),
        });
    };

    let mut commands = Vec::with_capacity(FIXED_TEMPLATE_COMMANDS + pools.len() + receivers.len());
    let mut arguments = Arguments::new()
        .with_value("ccip_object_ref", mappings.ccip_object_ref.clone())
        .with_value("clock", mappings.clock_object.clone())
        .with_value("remote_chain_selector", remote_chain_selector);

    commands.push(bracket_command(begin, mappings));

    for pool in pools {
        let n = commands.len();
        commands.push(pool_command(pool, n)?);
        arguments.insert(format!("pool_{n}"), pool.pool_state_address.clone());
        arguments.insert(format!("index_{n}"), pool.index as u64);
        arguments
            .type_hints
            .insert(format!("pool_{n}"), pool.token_type.clone());
    }

    for receiver in receivers {
        let k = commands.len();
        commands.push(receiver_command(receiver, k)?);
        arguments.insert(format!("package_id_{k}"), receiver.package.clone());
    }

    let last_dynamic = preceding(commands.len())?;
    let mut end = bracket_command(end, mappings);
    for param in &mut end.params {
        if let Some(dep) = param.dependency.as_mut() {
            dep.command_index = last_dynamic;
        }
    }
    commands.push(end);

    Ok(Expansion {
        commands,
        arguments,
    })
}

fn bracket_command(template: &CommandTemplate, mappings: &OffRampAddressMappings) -> CommandTemplate {
    let mut command = template.clone();
    if !mappings.offramp_package_id.is_empty() {
        command.package_id = Some(mappings.offramp_package_id.clone());
    }
    command
}

/// Index of the command just before position `n`, as a dependency reference.
fn preceding(n: usize) -> PtbResult<u16> {
    u16::try_from(n - 1).map_err(|_| {
        PtbError::invalid_shape(
            "report",
            format!("command {} is beyond the u16 reference range", n - 1),
        )
    })
}

fn pool_command(pool: &TokenPoolDescriptor, n: usize) -> PtbResult<CommandTemplate> {
    Ok(CommandTemplate::move_call(
        Some(pool.package.clone()),
        pool.module.clone(),
        pool.function.clone(),
        vec![
            ParamSpec::object("ccip_object_ref", false),
            ParamSpec::object("clock", false),
            ParamSpec::object(format!("pool_{n}"), true).with_generic(pool.token_type.clone()),
            ParamSpec::new("remote_chain_selector", "u64"),
            ParamSpec::dependency("receiver_params", preceding(n)?, None),
            ParamSpec::new(format!("index_{n}"), "u64"),
        ],
    ))
}

fn receiver_command(receiver: &ReceiverTarget, k: usize) -> PtbResult<CommandTemplate> {
    Ok(CommandTemplate::move_call(
        Some(receiver.package.clone()),
        receiver.module.clone(),
        receiver.function.clone(),
        vec![
            ParamSpec::object("ccip_object_ref", false),
            ParamSpec::new(format!("package_id_{k}"), "address"),
            ParamSpec::dependency(format!("receiver_params_{k}"), preceding(k)?, None),
        ],
    ))
}
