//! Shared types for the sui-ptb-composer workspace.
//!
//! This crate holds the transaction model produced by the engine and the
//! string utilities used to get addresses and type strings into it. It does
//! no I/O.
//!
//! ## Transaction Types
//!
//! The [`transaction`] module contains the programmable transaction model:
//! - [`ProgrammableTransaction`](transaction::ProgrammableTransaction) - inputs plus ordered commands
//! - [`ProgrammableTransactionBuilder`](transaction::ProgrammableTransactionBuilder) - incremental builder
//! - [`validate_dependencies`](transaction::validate_dependencies) - ordering check

pub mod address;
pub mod encoding;
pub mod transaction;
pub mod type_parsing;

pub use transaction::{
    validate_dependencies, Argument, CallArg, Command, MoveCall, ObjectArg, ObjectID,
    ProgrammableTransaction, ProgrammableTransactionBuilder, ValidationError,
    ValidationErrorKind, ValidationResult,
};
pub use type_parsing::{parse_struct_tag, parse_type_tag, split_type_params};
