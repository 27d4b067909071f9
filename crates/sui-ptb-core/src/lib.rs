//! Sui PTB Core
//!
//! Declarative construction of Sui programmable transaction blocks.
//!
//! Operations are described as data: an ordered list of Move call templates
//! whose parameters name where each argument comes from. At build time the
//! engine resolves those parameters against a caller-supplied argument bag,
//! deduplicates generic type arguments, and appends one call per template.
//!
//! # Core Modules
//!
//! - [`config`]: template model, YAML/JSON loading and the [`TemplateStore`]
//! - [`arguments`]: argument bag, per-build cache and the [`ArgumentResolver`]
//! - [`generics`]: type-argument extraction and deduplication
//! - [`constructor`]: the [`PtbConstructor`] orchestrating a build
//! - [`expander`]: offramp execute expansion (token pools and receivers)
//! - [`prerequisites`]: owned-object lookup before a build
//! - [`offramp`]: execution report model and address discovery
//! - [`client`]: the [`PtbClient`] collaborator trait
//!
//! # Example
//!
//! ```ignore
//! use sui_ptb_core::{Arguments, CallContext, PtbConstructor, TemplateStore};
//!
//! let store = TemplateStore::load_from_path(Path::new("templates.yaml"))?;
//! let constructor = PtbConstructor::new(store, client);
//!
//! let args = Arguments::new()
//!     .with_value("treasury", "0x5")
//!     .with_value("amount", 1_000u64);
//! let ptb = constructor.build(&CallContext::new(), "coin", "mint", args).await?;
//! ```

#![allow(clippy::result_large_err)]

pub mod arguments;
pub mod client;
pub mod codec;
pub mod config;
pub mod constructor;
pub mod context;
pub mod error;
pub mod expander;
pub mod generics;
pub mod offramp;
pub mod prerequisites;

pub use arguments::{ArgumentCache, ArgumentResolver, Arguments, ResolvedArgument};
pub use client::{default_transform, ObjectPage, OwnedObject, PtbClient};
pub use config::{
    CommandKind, CommandTemplate, Dependency, FunctionTemplate, ModuleTemplate, OperationMode,
    ParamSpec, PrerequisiteObjectSpec, TemplateConfig, TemplateStore,
};
pub use constructor::{BuildRequest, PtbConstructor};
pub use context::CallContext;
pub use error::{PtbError, PtbErrorKind, PtbResult};
pub use expander::{Expansion, OffRampExpander, ReceiverTarget, TokenPoolDescriptor};
pub use generics::resolve_generics;
pub use offramp::{ExecutionReport, OffRampAddressMappings};
pub use prerequisites::PrerequisiteResolver;
