//! Sui PTB Composer
//!
//! Builds Sui programmable transaction blocks from declarative templates:
//!
//! - **Templates**: operations described as ordered Move call templates (YAML or JSON)
//! - **Argument resolution**: parameters bound to runtime values, defaults or earlier results
//! - **Generic resolution**: type arguments collected and deduplicated in first-seen order
//! - **Offramp expansion**: token pool and receiver calls spliced into execute transactions
//!
//! See [`sui_ptb_core`] for the engine and [`types`] for the transaction model.

#![allow(clippy::result_large_err)]

pub use sui_ptb_core::*;
pub use sui_ptb_types as types;

/// Everything needed to load templates and build transactions.
pub mod prelude {
    pub use move_core_types::language_storage::TypeTag;
    pub use sui_ptb_core::{
        Arguments, BuildRequest, CallContext, CommandTemplate, ExecutionReport, FunctionTemplate,
        ParamSpec, PtbClient, PtbConstructor, PtbError, PtbErrorKind, PtbResult, TemplateStore,
    };
    pub use sui_ptb_types::{Argument, CallArg, ProgrammableTransaction};
}
