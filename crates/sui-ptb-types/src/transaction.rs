//! Programmable transaction model.
//!
//! A [`ProgrammableTransaction`] is an ordered list of inputs plus an ordered
//! list of commands. Commands refer to inputs and to the results of earlier
//! commands through [`Argument`]. The builder hands out those references as
//! inputs and commands are appended, so a command can only ever name
//! something that already exists.

use anyhow::{anyhow, Context, Result};
use move_core_types::account_address::AccountAddress;
use move_core_types::identifier::Identifier;
use move_core_types::language_storage::TypeTag;
use serde::{Deserialize, Serialize};

/// Unique identifier for objects referenced by a transaction.
pub type ObjectID = AccountAddress;

/// Reference to a value in a PTB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Argument {
    /// The gas coin of the transaction.
    GasCoin,

    /// Reference to a transaction input (by index)
    Input(u16),

    /// Reference to the whole result of a previous command (by command index).
    Result(u16),

    /// Reference to a specific value in a multi-return command result.
    /// (command_index, value_index)
    NestedResult(u16, u16),
}

impl Argument {
    /// Index of the command this argument consumes, if it is a command result.
    pub fn command_index(&self) -> Option<u16> {
        match self {
            Argument::Result(idx) | Argument::NestedResult(idx, _) => Some(*idx),
            Argument::GasCoin | Argument::Input(_) => None,
        }
    }
}

/// An object passed to a transaction by id.
///
/// Version and digest are filled in by the submitting client, which has to
/// fetch the live object anyway. The builder only records intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectArg {
    pub id: ObjectID,
    pub mutable: bool,
}

/// A transaction input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallArg {
    /// BCS-encoded pure value.
    Pure(Vec<u8>),
    /// On-chain object.
    Object(ObjectArg),
}

impl CallArg {
    /// The object id for object inputs.
    pub fn object_id(&self) -> Option<&ObjectID> {
        match self {
            CallArg::Object(obj) => Some(&obj.id),
            CallArg::Pure(_) => None,
        }
    }
}

/// A Move function call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveCall {
    pub package: AccountAddress,
    pub module: Identifier,
    pub function: Identifier,
    pub type_arguments: Vec<TypeTag>,
    pub arguments: Vec<Argument>,
}

/// A command in a Programmable Transaction Block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Call a Move function
    MoveCall(Box<MoveCall>),
}

impl Command {
    /// All arguments consumed by this command, in order.
    pub fn arguments(&self) -> &[Argument] {
        match self {
            Command::MoveCall(call) => &call.arguments,
        }
    }

    /// The Move call, for the (currently only) call variant.
    pub fn as_move_call(&self) -> Option<&MoveCall> {
        match self {
            Command::MoveCall(call) => Some(call),
        }
    }
}

/// A finished transaction, ready to be handed to a signer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgrammableTransaction {
    pub inputs: Vec<CallArg>,
    pub commands: Vec<Command>,
}

impl ProgrammableTransaction {
    /// Serialize the transaction to BCS.
    pub fn to_bcs(&self) -> Result<Vec<u8>> {
        bcs::to_bytes(self).context("failed to BCS-serialize programmable transaction")
    }

    /// Iterate over the Move calls in command order.
    pub fn move_calls(&self) -> impl Iterator<Item = &MoveCall> {
        self.commands.iter().filter_map(Command::as_move_call)
    }

    /// Check the dependency ordering of this transaction.
    pub fn validate(&self) -> ValidationResult {
        validate_dependencies(&self.commands, self.inputs.len())
    }
}

/// Incremental builder for [`ProgrammableTransaction`].
///
/// Inputs are never deduplicated here. Callers that need one logical value
/// to map to one input keep the returned [`Argument`] and reuse it.
#[derive(Debug, Default)]
pub struct ProgrammableTransactionBuilder {
    inputs: Vec<CallArg>,
    commands: Vec<Command>,
}

impl ProgrammableTransactionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an input and return a reference to it.
    ///
    /// Fails once the input table is full, since references are `u16`.
    pub fn input(&mut self, arg: CallArg) -> Result<Argument> {
        let idx = next_index(self.inputs.len(), "inputs")?;
        self.inputs.push(arg);
        Ok(Argument::Input(idx))
    }

    /// Append pre-encoded pure bytes as an input.
    pub fn pure_bytes(&mut self, bytes: Vec<u8>) -> Result<Argument> {
        self.input(CallArg::Pure(bytes))
    }

    /// BCS-encode a value and append it as a pure input.
    pub fn pure<T: Serialize>(&mut self, value: &T) -> Result<Argument> {
        let bytes = bcs::to_bytes(value).context("failed to BCS-encode pure input")?;
        self.pure_bytes(bytes)
    }

    /// Append a command and return a reference to its result.
    pub fn command(&mut self, command: Command) -> Result<Argument> {
        let idx = next_index(self.commands.len(), "commands")?;
        self.commands.push(command);
        Ok(Argument::Result(idx))
    }

    /// Append a Move call and return a reference to its result.
    pub fn move_call(
        &mut self,
        package: AccountAddress,
        module: Identifier,
        function: Identifier,
        type_arguments: Vec<TypeTag>,
        arguments: Vec<Argument>,
    ) -> Result<Argument> {
        self.command(Command::MoveCall(Box::new(MoveCall {
            package,
            module,
            function,
            type_arguments,
            arguments,
        })))
    }

    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    pub fn finish(self) -> ProgrammableTransaction {
        ProgrammableTransaction {
            inputs: self.inputs,
            commands: self.commands,
        }
    }
}

fn next_index(len: usize, table: &str) -> Result<u16> {
    u16::try_from(len).map_err(|_| {
        anyhow!(
            "transaction cannot hold more than {} {}",
            u16::MAX as usize + 1,
            table
        )
    })
}

// =============================================================================
// Dependency Validation
// =============================================================================

/// Result of dependency validation.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether the PTB is valid.
    pub valid: bool,
    /// List of validation errors found.
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    pub fn failed(errors: Vec<ValidationError>) -> Self {
        Self {
            valid: false,
            errors,
        }
    }
}

/// A specific validation error in a PTB.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The command index where the error was found.
    pub command_index: usize,
    /// The type of validation error.
    pub kind: ValidationErrorKind,
    /// Human-readable description of the error.
    pub message: String,
}

/// Types of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Reference to a result that doesn't exist yet (forward reference).
    ForwardReference,
    /// Self-reference (command references its own result).
    SelfReference,
    /// Reference to an input index that's out of bounds.
    InputOutOfBounds,
}

/// Validate that every command only consumes inputs that exist and results
/// of strictly earlier commands.
pub fn validate_dependencies(commands: &[Command], num_inputs: usize) -> ValidationResult {
    let mut errors = Vec::new();

    for (cmd_idx, cmd) in commands.iter().enumerate() {
        for arg in cmd.arguments() {
            if let Argument::Input(idx) = arg {
                if (*idx as usize) >= num_inputs {
                    errors.push(ValidationError {
                        command_index: cmd_idx,
                        kind: ValidationErrorKind::InputOutOfBounds,
                        message: format!(
                            "Command {} references Input({}) but only {} inputs available",
                            cmd_idx, idx, num_inputs
                        ),
                    });
                }
                continue;
            }
            let Some(result_idx) = arg.command_index() else {
                continue;
            };
            let result_idx = result_idx as usize;
            if result_idx == cmd_idx {
                errors.push(ValidationError {
                    command_index: cmd_idx,
                    kind: ValidationErrorKind::SelfReference,
                    message: format!("Command {} references its own result {:?}", cmd_idx, arg),
                });
            } else if result_idx > cmd_idx {
                errors.push(ValidationError {
                    command_index: cmd_idx,
                    kind: ValidationErrorKind::ForwardReference,
                    message: format!(
                        "Command {} references {:?} which hasn't been produced yet",
                        cmd_idx, arg
                    ),
                });
            }
        }
    }

    if errors.is_empty() {
        ValidationResult::ok()
    } else {
        ValidationResult::failed(errors)
    }
}
