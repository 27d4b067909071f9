//! PTB constructor.
//!
//! Walks an operation's command templates in order and appends one Move call
//! per template. Arguments and generics are resolved per command; a command
//! is appended only once both succeed, and any failure aborts the build so
//! no partial transaction ever escapes.

use std::borrow::Cow;
use std::sync::Arc;

use move_core_types::identifier::Identifier;
use sui_ptb_types::address::parse_address;
use sui_ptb_types::{ProgrammableTransaction, ProgrammableTransactionBuilder};
use tracing::{debug, info};

use crate::arguments::{ArgumentCache, ArgumentResolver, Arguments};
use crate::client::PtbClient;
use crate::config::{CommandKind, CommandTemplate, FunctionTemplate, OperationMode, TemplateStore};
use crate::context::CallContext;
use crate::error::{PtbError, PtbResult};
use crate::expander::OffRampExpander;
use crate::generics::resolve_generics;
use crate::offramp::{get_address_mappings, ExecutionReport, OffRampAddressMappings, EXECUTION_INFO_ARG};
use crate::prerequisites::PrerequisiteResolver;

/// Signer used for read-only lookups when none is configured.
pub const DEFAULT_SIGNER: &str = "0x0";

/// Inputs of a single build beyond the template and operation names.
#[derive(Debug, Clone, Default)]
pub struct BuildRequest<'a> {
    pub arguments: Arguments,
    /// Package to call. For offramp operations, the offramp package.
    pub destination: Option<&'a str>,
    /// Use this descriptor instead of looking one up in the store.
    pub descriptor: Option<&'a FunctionTemplate>,
    /// Sender for read-only lookups. Defaults to the descriptor's `from_address`.
    pub signer: Option<&'a str>,
}

impl<'a> BuildRequest<'a> {
    pub fn new(arguments: Arguments) -> Self {
        Self {
            arguments,
            ..Default::default()
        }
    }

    pub fn with_destination(mut self, destination: &'a str) -> Self {
        self.destination = Some(destination);
        self
    }

    pub fn with_descriptor(mut self, descriptor: &'a FunctionTemplate) -> Self {
        self.descriptor = Some(descriptor);
        self
    }

    pub fn with_signer(mut self, signer: &'a str) -> Self {
        self.signer = Some(signer);
        self
    }
}

/// Builds programmable transactions from templates.
///
/// Cheap to share: the store is immutable and every build owns its own
/// builder and argument cache.
#[derive(Clone)]
pub struct PtbConstructor {
    store: TemplateStore,
    client: Arc<dyn PtbClient>,
}

impl PtbConstructor {
    pub fn new(store: TemplateStore, client: Arc<dyn PtbClient>) -> Self {
        Self { store, client }
    }

    pub fn store(&self) -> &TemplateStore {
        &self.store
    }

    /// Build `template::operation` with `arguments` and no further options.
    pub async fn build(
        &self,
        ctx: &CallContext,
        template: &str,
        operation: &str,
        arguments: Arguments,
    ) -> PtbResult<ProgrammableTransaction> {
        self.build_with(ctx, template, operation, BuildRequest::new(arguments))
            .await
    }

    pub async fn build_with(
        &self,
        ctx: &CallContext,
        template: &str,
        operation: &str,
        request: BuildRequest<'_>,
    ) -> PtbResult<ProgrammableTransaction> {
        let descriptor = match request.descriptor {
            Some(descriptor) => descriptor,
            None => self.store.lookup(template, operation)?,
        };
        info!(template, operation, mode = ?descriptor.mode, "building transaction");

        let mut arguments = request.arguments;
        PrerequisiteResolver::new(self.client.as_ref())
            .resolve(
                ctx,
                &descriptor.prerequisite_objects,
                &mut arguments,
                descriptor.from_address.as_deref(),
            )
            .await?;

        let signer = request
            .signer
            .or(descriptor.from_address.as_deref())
            .unwrap_or(DEFAULT_SIGNER);

        let (commands, package_override) = match descriptor.mode {
            OperationMode::Generic => (
                Cow::Borrowed(descriptor.ptb_commands.as_slice()),
                request.destination.map(str::to_string),
            ),
            OperationMode::OffRampCommit => {
                let mappings = self.mappings(ctx, signer, request.destination).await?;
                for (name, value) in mappings.commit_arguments() {
                    arguments.insert(name, value);
                }
                (
                    Cow::Borrowed(descriptor.ptb_commands.as_slice()),
                    Some(mappings.offramp_package_id),
                )
            }
            OperationMode::OffRampExecute => {
                let mappings = self.mappings(ctx, signer, request.destination).await?;
                let report = execution_report(&arguments)?;
                let expansion = OffRampExpander::new(self.client.as_ref(), &mappings, signer)
                    .expand(ctx, &report, &descriptor.ptb_commands)
                    .await?;
                for (name, value) in mappings.commit_arguments() {
                    arguments.insert(name, value);
                }
                arguments.merge(expansion.arguments);
                (Cow::Owned(expansion.commands), None)
            }
        };

        let ptb = self
            .assemble(ctx, &commands, &arguments, package_override.as_deref())
            .await?;
        info!(
            template,
            operation,
            inputs = ptb.inputs.len(),
            commands = ptb.commands.len(),
            "built transaction"
        );
        Ok(ptb)
    }

    async fn mappings(
        &self,
        ctx: &CallContext,
        signer: &str,
        destination: Option<&str>,
    ) -> PtbResult<OffRampAddressMappings> {
        let offramp_package_id = destination.ok_or_else(|| PtbError::MissingRequiredParameter {
            parameter: "destination".to_string(),
            command_index: None,
        })?;
        get_address_mappings(ctx, self.client.as_ref(), signer, offramp_package_id).await
    }

    /// Append every command in order. Nothing is returned unless all succeed.
    async fn assemble(
        &self,
        ctx: &CallContext,
        commands: &[CommandTemplate],
        arguments: &Arguments,
        package_override: Option<&str>,
    ) -> PtbResult<ProgrammableTransaction> {
        let mut builder = ProgrammableTransactionBuilder::new();
        let mut cache = ArgumentCache::new();
        let resolver = ArgumentResolver::new(self.client.as_ref(), ctx);

        for (index, command) in commands.iter().enumerate() {
            ctx.check(&command.target_label())?;
            if command.kind != CommandKind::MoveCall {
                return Err(PtbError::UnsupportedCommandKind {
                    kind: command.kind.as_str().to_string(),
                    command_index: index,
                });
            }

            let package = required_target(
                package_override.or(command.package_id.as_deref()),
                "package_id",
                index,
            )?;
            let module = required_target(command.module_id.as_deref(), "module_id", index)?;
            let function = required_target(command.function.as_deref(), "function", index)?;

            let resolved = resolver
                .resolve(&mut builder, index, &command.params, arguments, &mut cache)
                .await?;
            let type_arguments = resolve_generics(&command.params, &arguments.type_hints)?;

            let package_addr =
                parse_address(package).ok_or_else(|| PtbError::TypeResolutionError {
                    type_string: package.to_string(),
                    parameter: Some("package_id".to_string()),
                    message: format!("package of command {} is not an address", index),
                })?;
            let module = identifier(module, "module_id", index)?;
            let function = identifier(function, "function", index)?;

            let call_args = resolved
                .into_iter()
                .map(|arg| arg.into_argument(&mut builder, index))
                .collect::<PtbResult<Vec<_>>>()?;
            debug!(
                command_index = index,
                target = %command.target_label(),
                type_arguments = type_arguments.len(),
                "appending move call"
            );
            builder
                .move_call(package_addr, module, function, type_arguments, call_args)
                .map_err(|err| PtbError::capacity(index, err))?;
        }

        Ok(builder.finish())
    }
}

fn required_target<'c>(value: Option<&'c str>, field: &str, index: usize) -> PtbResult<&'c str> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| PtbError::InvalidParameterShape {
            parameter: field.to_string(),
            command_index: Some(index),
            message: "command target is incomplete".to_string(),
        })
}

fn identifier(value: &str, field: &str, index: usize) -> PtbResult<Identifier> {
    Identifier::new(value).map_err(|_| PtbError::InvalidParameterShape {
        parameter: field.to_string(),
        command_index: Some(index),
        message: format!("'{}' is not a valid Move identifier", value),
    })
}

/// Read the execution report an execute build carries under `info`.
fn execution_report(arguments: &Arguments) -> PtbResult<ExecutionReport> {
    let value = arguments
        .get(EXECUTION_INFO_ARG)
        .ok_or_else(|| PtbError::MissingRequiredParameter {
            parameter: EXECUTION_INFO_ARG.to_string(),
            command_index: None,
        })?;
    serde_json::from_value(value.clone())
        .map_err(|e| PtbError::invalid_shape(EXECUTION_INFO_ARG, e.to_string()))
}
