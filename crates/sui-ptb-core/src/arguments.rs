//! Argument resolution.
//!
//! Turns each [`ParamSpec`] of a command into a concrete transaction
//! argument. Values supplied by the caller are encoded once per build and
//! cached by parameter name, so an object named by two commands becomes one
//! transaction input referenced twice.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sui_ptb_types::{Argument, ProgrammableTransactionBuilder};
use tracing::{debug, trace};

use crate::client::PtbClient;
use crate::codec::{EMPTY_OPTION_BYTES, OBJECT_ID_TYPE};
use crate::config::ParamSpec;
use crate::context::CallContext;
use crate::error::{PtbError, PtbResult};

/// Runtime argument bag for one build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Arguments {
    #[serde(default)]
    pub values: BTreeMap<String, JsonValue>,
    /// Generic type strings keyed by parameter name.
    #[serde(default)]
    pub type_hints: BTreeMap<String, String>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn with_type_hint(mut self, name: impl Into<String>, type_str: impl Into<String>) -> Self {
        self.type_hints.insert(name.into(), type_str.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<JsonValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&JsonValue> {
        self.values.get(name)
    }

    /// Overlay `other` onto this bag. Entries in `other` win.
    pub fn merge(&mut self, other: Arguments) {
        self.values.extend(other.values);
        self.type_hints.extend(other.type_hints);
    }
}

/// A parameter after resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedArgument {
    /// Result of an earlier command. `None` takes the whole result.
    Dependency {
        command_index: u16,
        result_index: Option<u16>,
    },
    /// An encoded transaction input.
    Literal(Argument),
    /// Optional parameter with nothing to supply.
    Empty,
}

impl ResolvedArgument {
    /// Lower into a transaction argument, materializing placeholders as `Option::None`.
    pub fn into_argument(
        self,
        builder: &mut ProgrammableTransactionBuilder,
        index: usize,
    ) -> PtbResult<Argument> {
        Ok(match self {
            ResolvedArgument::Dependency {
                command_index,
                result_index: None,
            } => Argument::Result(command_index),
            ResolvedArgument::Dependency {
                command_index,
                result_index: Some(result_index),
            } => Argument::NestedResult(command_index, result_index),
            ResolvedArgument::Literal(arg) => arg,
            ResolvedArgument::Empty => builder
                .pure_bytes(EMPTY_OPTION_BYTES.to_vec())
                .map_err(|err| PtbError::capacity(index, err))?,
        })
    }
}

/// Encoded inputs of one build, keyed by parameter name.
///
/// Owned by a single build and dropped with it.
#[derive(Debug, Default)]
pub struct ArgumentCache {
    entries: HashMap<String, Argument>,
}

impl ArgumentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Argument> {
        self.entries.get(name).copied()
    }

    pub fn insert(&mut self, name: impl Into<String>, arg: Argument) {
        self.entries.insert(name.into(), arg);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct ArgumentResolver<'a> {
    client: &'a dyn PtbClient,
    ctx: &'a CallContext,
}

impl<'a> ArgumentResolver<'a> {
    pub fn new(client: &'a dyn PtbClient, ctx: &'a CallContext) -> Self {
        Self { client, ctx }
    }

    /// Resolve the parameters of the command at `command_index`.
    ///
    /// New inputs are appended to `builder`. Caller-supplied values are
    /// cached in `cache`; defaults are encoded fresh each time.
    pub async fn resolve(
        &self,
        builder: &mut ProgrammableTransactionBuilder,
        command_index: usize,
        params: &[ParamSpec],
        arguments: &Arguments,
        cache: &mut ArgumentCache,
    ) -> PtbResult<Vec<ResolvedArgument>> {
        let mut resolved = Vec::with_capacity(params.len());

        for param in params {
            trace!(command_index, parameter = %param.name, "resolving parameter");

            if let Some(dep) = &param.dependency {
                if dep.command_index as usize >= command_index {
                    return Err(PtbError::DependencyResolutionError {
                        parameter: param.name.clone(),
                        command_index,
                        message: format!(
                            "command {} does not precede command {}",
                            dep.command_index, command_index
                        ),
                    });
                }
                resolved.push(ResolvedArgument::Dependency {
                    command_index: dep.command_index,
                    result_index: dep.result_index,
                });
                continue;
            }

            if let Some(value) = arguments.values.get(&param.name) {
                if let Some(cached) = cache.get(&param.name) {
                    debug!(command_index, parameter = %param.name, "reusing cached argument");
                    resolved.push(ResolvedArgument::Literal(cached));
                    continue;
                }
                let arg = self.encode(builder, command_index, param, value).await?;
                cache.insert(param.name.clone(), arg);
                resolved.push(ResolvedArgument::Literal(arg));
                continue;
            }

            if let Some(default) = &param.default_value {
                let arg = self.encode(builder, command_index, param, default).await?;
                resolved.push(ResolvedArgument::Literal(arg));
                continue;
            }

            if param.required {
                return Err(PtbError::MissingRequiredParameter {
                    parameter: param.name.clone(),
                    command_index: Some(command_index),
                });
            }

            resolved.push(ResolvedArgument::Empty);
        }

        Ok(resolved)
    }

    async fn encode(
        &self,
        builder: &mut ProgrammableTransactionBuilder,
        command_index: usize,
        param: &ParamSpec,
        value: &JsonValue,
    ) -> PtbResult<Argument> {
        if param.param_type == OBJECT_ID_TYPE && !value.is_string() {
            return Err(PtbError::InvalidParameterShape {
                parameter: param.name.clone(),
                command_index: Some(command_index),
                message: format!("expected string for object id, got {}", value),
            });
        }
        let operation = format!("transform_argument({})", param.name);
        let call_arg = self
            .ctx
            .run(
                &operation,
                self.client.transform_argument(
                    self.ctx,
                    value,
                    &param.param_type,
                    param.is_mutable(),
                ),
            )
            .await
            .map_err(|err| match err {
                PtbError::ExternalLookupError { source, .. } => PtbError::InvalidParameterShape {
                    parameter: param.name.clone(),
                    command_index: Some(command_index),
                    message: format!("{:#}", source),
                },
                other => other,
            })?;
        builder
            .input(call_arg)
            .map_err(|err| PtbError::capacity(command_index, err))
    }
}
