//! Error types for PTB construction and expansion.
//!
//! Every failure aborts the build in progress and reaches the caller as one
//! [`PtbError`]. Variants carry the parameter name and command index where
//! they are known.

use std::fmt;

/// Structured errors raised while building a programmable transaction.
#[derive(Debug)]
pub enum PtbError {
    /// Unknown template or operation name.
    ConfigNotFound {
        /// Template (module) that was requested
        template: String,
        /// Operation (function) within the template, if the template was found
        operation: Option<String>,
    },

    /// A required parameter has no value, no default and no dependency.
    MissingRequiredParameter {
        parameter: String,
        command_index: Option<usize>,
    },

    /// A value has the wrong shape for its declared type.
    InvalidParameterShape {
        parameter: String,
        command_index: Option<usize>,
        message: String,
    },

    /// Malformed generic type string, bad address or unsupported generic vector.
    TypeResolutionError {
        /// The type string that failed to resolve
        type_string: String,
        /// Parameter that declared it, if any
        parameter: Option<String>,
        message: String,
    },

    /// A dependency points at a command that does not precede it.
    DependencyResolutionError {
        parameter: String,
        command_index: usize,
        message: String,
    },

    /// The RPC collaborator failed.
    ExternalLookupError {
        /// Which lookup was in flight (e.g. "token_admin_registry::get_pool_infos")
        operation: String,
        source: anyhow::Error,
    },

    /// Command kind accepted by the template model but not implemented.
    UnsupportedCommandKind {
        kind: String,
        command_index: usize,
    },

    /// Expansion invoked on a template with the wrong number of commands.
    TemplateShapeError { expected: usize, found: usize },

    /// The call context was cancelled or its deadline elapsed.
    Cancelled {
        /// Suspension point at which the cancellation was observed
        operation: String,
    },
}

/// Fieldless discriminant of [`PtbError`], for matching in callers and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PtbErrorKind {
    ConfigNotFound,
    MissingRequiredParameter,
    InvalidParameterShape,
    TypeResolutionError,
    DependencyResolutionError,
    ExternalLookupError,
    UnsupportedCommandKind,
    TemplateShapeError,
    Cancelled,
}

pub type PtbResult<T> = std::result::Result<T, PtbError>;

impl PtbError {
    pub fn kind(&self) -> PtbErrorKind {
        match self {
            PtbError::ConfigNotFound { .. } => PtbErrorKind::ConfigNotFound,
            PtbError::MissingRequiredParameter { .. } => PtbErrorKind::MissingRequiredParameter,
            PtbError::InvalidParameterShape { .. } => PtbErrorKind::InvalidParameterShape,
            PtbError::TypeResolutionError { .. } => PtbErrorKind::TypeResolutionError,
            PtbError::DependencyResolutionError { .. } => PtbErrorKind::DependencyResolutionError,
            PtbError::ExternalLookupError { .. } => PtbErrorKind::ExternalLookupError,
            PtbError::UnsupportedCommandKind { .. } => PtbErrorKind::UnsupportedCommandKind,
            PtbError::TemplateShapeError { .. } => PtbErrorKind::TemplateShapeError,
            PtbError::Cancelled { .. } => PtbErrorKind::Cancelled,
        }
    }

    /// The command index at which the error occurred, if known.
    pub fn command_index(&self) -> Option<usize> {
        match self {
            PtbError::MissingRequiredParameter { command_index, .. }
            | PtbError::InvalidParameterShape { command_index, .. } => *command_index,
            PtbError::DependencyResolutionError { command_index, .. }
            | PtbError::UnsupportedCommandKind { command_index, .. } => Some(*command_index),
            _ => None,
        }
    }

    /// Attach a command index to errors raised before the index was known.
    pub fn at_command(mut self, index: usize) -> Self {
        match &mut self {
            PtbError::MissingRequiredParameter { command_index, .. }
            | PtbError::InvalidParameterShape { command_index, .. } => {
                command_index.get_or_insert(index);
            }
            _ => {}
        }
        self
    }

    pub fn external(operation: impl Into<String>, source: anyhow::Error) -> Self {
        PtbError::ExternalLookupError {
            operation: operation.into(),
            source,
        }
    }

    pub fn invalid_shape(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        PtbError::InvalidParameterShape {
            parameter: parameter.into(),
            command_index: None,
            message: message.into(),
        }
    }

    /// The transaction ran out of `u16` input or command slots.
    pub fn capacity(command_index: usize, source: anyhow::Error) -> Self {
        PtbError::InvalidParameterShape {
            parameter: "transaction".to_string(),
            command_index: Some(command_index),
            message: format!("{:#}", source),
        }
    }

    pub fn type_resolution(type_string: impl Into<String>, message: impl Into<String>) -> Self {
        PtbError::TypeResolutionError {
            type_string: type_string.into(),
            parameter: None,
            message: message.into(),
        }
    }
}

fn write_location(f: &mut fmt::Formatter<'_>, command_index: Option<usize>) -> fmt::Result {
    if let Some(idx) = command_index {
        write!(f, " (command {})", idx)?;
    }
    Ok(())
}

impl fmt::Display for PtbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PtbError::ConfigNotFound {
                template,
                operation,
            } => match operation {
                Some(op) => write!(
                    f,
                    "config not found: operation '{}' in template '{}'",
                    op, template
                ),
                None => write!(f, "config not found: template '{}'", template),
            },
            PtbError::MissingRequiredParameter {
                parameter,
                command_index,
            } => {
                write!(f, "required parameter {} has no value", parameter)?;
                write_location(f, *command_index)
            }
            PtbError::InvalidParameterShape {
                parameter,
                command_index,
                message,
            } => {
                write!(f, "invalid value for parameter {}: {}", parameter, message)?;
                write_location(f, *command_index)
            }
            PtbError::TypeResolutionError {
                type_string,
                parameter,
                message,
            } => {
                write!(f, "failed to resolve type '{}': {}", type_string, message)?;
                if let Some(p) = parameter {
                    write!(f, " (parameter {})", p)?;
                }
                Ok(())
            }
            PtbError::DependencyResolutionError {
                parameter,
                command_index,
                message,
            } => write!(
                f,
                "unresolvable dependency for parameter {} in command {}: {}",
                parameter, command_index, message
            ),
            PtbError::ExternalLookupError { operation, source } => {
                write!(f, "external lookup {} failed: {:#}", operation, source)
            }
            PtbError::UnsupportedCommandKind {
                kind,
                command_index,
            } => write!(
                f,
                "command kind {} is not supported yet (command {})",
                kind, command_index
            ),
            PtbError::TemplateShapeError { expected, found } => write!(
                f,
                "expected {} template commands for expansion, got {}",
                expected, found
            ),
            PtbError::Cancelled { operation } => {
                write!(f, "build cancelled during {}", operation)
            }
        }
    }
}

impl std::error::Error for PtbError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PtbError::ExternalLookupError { source, .. } => Some(&**source),
            _ => None,
        }
    }
}
