//! Command template store.
//!
//! Templates are pure data: a module of named operations, each an ordered
//! list of command templates whose parameters say where every argument comes
//! from. They are loaded once and shared read-only by every build.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::codec::{OBJECT_ID_TYPE, PTB_DEPENDENCY_TYPE};
use crate::error::{PtbError, PtbResult};

/// Kind of a PTB command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    #[default]
    MoveCall,
    Publish,
    Transfer,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::MoveCall => "move_call",
            CommandKind::Publish => "publish",
            CommandKind::Transfer => "transfer",
        }
    }
}

/// Reference from a parameter to the result of an earlier command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub command_index: u16,
    /// `None` consumes the command's entire result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_index: Option<u16>,
}

/// Where a single call argument comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<JsonValue>,
    /// Object mutability intent. Absent means mutable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_mutable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generic_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency: Option<Dependency>,
}

impl ParamSpec {
    /// A required parameter of the given type.
    pub fn new(name: impl Into<String>, param_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            required: true,
            default_value: None,
            is_mutable: None,
            generic_type: None,
            dependency: None,
        }
    }

    /// A required object parameter with explicit mutability.
    pub fn object(name: impl Into<String>, mutable: bool) -> Self {
        Self {
            is_mutable: Some(mutable),
            ..Self::new(name, OBJECT_ID_TYPE)
        }
    }

    /// A parameter fed by the result of an earlier command.
    pub fn dependency(
        name: impl Into<String>,
        command_index: u16,
        result_index: Option<u16>,
    ) -> Self {
        Self {
            dependency: Some(Dependency {
                command_index,
                result_index,
            }),
            ..Self::new(name, PTB_DEPENDENCY_TYPE)
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_default(mut self, value: JsonValue) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn with_generic(mut self, generic_type: impl Into<String>) -> Self {
        self.generic_type = Some(generic_type.into());
        self
    }

    pub fn is_mutable(&self) -> bool {
        self.is_mutable.unwrap_or(true)
    }
}

/// One call in an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandTemplate {
    #[serde(rename = "type", default)]
    pub kind: CommandKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    #[serde(default)]
    pub params: Vec<ParamSpec>,
}

impl CommandTemplate {
    pub fn move_call(
        package_id: Option<String>,
        module_id: impl Into<String>,
        function: impl Into<String>,
        params: Vec<ParamSpec>,
    ) -> Self {
        Self {
            kind: CommandKind::MoveCall,
            package_id,
            module_id: Some(module_id.into()),
            function: Some(function.into()),
            params,
        }
    }

    /// `module::function`, for logs and errors.
    pub fn target_label(&self) -> String {
        format!(
            "{}::{}",
            self.module_id.as_deref().unwrap_or("?"),
            self.function.as_deref().unwrap_or("?")
        )
    }
}

/// An on-chain object to look up before building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrerequisiteObjectSpec {
    /// Owner to search. Falls back to the caller-supplied owner when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    /// Substring matched against the object's type.
    pub tag: String,
    /// Argument name that receives the object id.
    pub name: String,
    /// Copy the object's fields into the arguments instead of its id.
    #[serde(default)]
    pub set_keys: bool,
}

/// How the constructor turns an operation into commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationMode {
    /// Commands come straight from `ptb_commands`.
    #[default]
    Generic,
    /// Generic, after injecting the discovered offramp objects.
    OffRampCommit,
    /// `ptb_commands` is a two-command bracket expanded from the execution report.
    OffRampExecute,
}

/// One operation of a template: the descriptor handed to the constructor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionTemplate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub mode: OperationMode,
    /// Signer address used for read-only lookups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_address: Option<String>,
    #[serde(default)]
    pub prerequisite_objects: Vec<PrerequisiteObjectSpec>,
    #[serde(default)]
    pub ptb_commands: Vec<CommandTemplate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleTemplate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_id: Option<String>,
    #[serde(default)]
    pub functions: BTreeMap<String, FunctionTemplate>,
}

/// Root of the template configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateConfig {
    #[serde(default)]
    pub modules: BTreeMap<String, ModuleTemplate>,
}

impl TemplateConfig {
    /// Load a config from a YAML (`.yaml`/`.yml`) or JSON file and validate it.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read template config {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|value| value.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let config = if ext == "yaml" || ext == "yml" {
            serde_yaml::from_str::<Self>(&raw)
                .with_context(|| format!("Invalid YAML template config in {}", path.display()))?
        } else {
            serde_json::from_str::<Self>(&raw)
                .with_context(|| format!("Invalid JSON template config in {}", path.display()))?
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let mut issues = Vec::new();
        self.collect_validation_issues(&mut issues);
        if issues.is_empty() {
            return Ok(());
        }

        let formatted = issues
            .into_iter()
            .enumerate()
            .map(|(idx, issue)| format!("  {}. {}", idx + 1, issue))
            .collect::<Vec<_>>()
            .join("\n");
        bail!("Template config validation failed:\n{formatted}");
    }

    fn collect_validation_issues(&self, issues: &mut Vec<String>) {
        for (module_key, module) in &self.modules {
            if module_key.trim().is_empty() {
                issues.push("module names cannot be empty".to_string());
            }
            for (function_key, function) in &module.functions {
                let label = format!("{module_key}.{function_key}");
                if function_key.trim().is_empty() {
                    issues.push(format!("{module_key}: function names cannot be empty"));
                }
                if function.ptb_commands.is_empty() {
                    issues.push(format!("{label}: ptb_commands must contain at least one entry"));
                }
                for prereq in &function.prerequisite_objects {
                    if prereq.tag.trim().is_empty() {
                        issues.push(format!("{label}: prerequisite {} has an empty tag", prereq.name));
                    }
                }
                for (idx, command) in function.ptb_commands.iter().enumerate() {
                    validate_command(&format!("{label}[{idx}]"), idx, command, issues);
                }
            }
        }
    }
}

fn validate_command(label: &str, idx: usize, command: &CommandTemplate, issues: &mut Vec<String>) {
    if command.kind == CommandKind::MoveCall {
        if command.module_id.as_deref().map_or(true, |m| m.trim().is_empty()) {
            issues.push(format!("{label}: move_call requires module_id"));
        }
        if command.function.as_deref().map_or(true, |f| f.trim().is_empty()) {
            issues.push(format!("{label}: move_call requires function"));
        }
    }

    let mut seen = HashSet::new();
    for param in &command.params {
        if param.name.trim().is_empty() {
            issues.push(format!("{label}: parameter names cannot be empty"));
        }
        if !seen.insert(param.name.as_str()) {
            issues.push(format!("{label}: duplicate parameter {}", param.name));
        }
        if param.param_type == PTB_DEPENDENCY_TYPE && param.dependency.is_none() {
            issues.push(format!(
                "{label}: parameter {} is a ptb_dependency without a dependency",
                param.name
            ));
        }
        if let Some(dep) = &param.dependency {
            if dep.command_index as usize >= idx {
                issues.push(format!(
                    "{label}: parameter {} depends on command {} which does not precede it",
                    param.name, dep.command_index
                ));
            }
        }
        if matches!(param.generic_type.as_deref(), Some(g) if g.trim().is_empty()) {
            issues.push(format!("{label}: parameter {} has an empty generic_type", param.name));
        }
    }
}

/// Read-only, shareable view over a validated [`TemplateConfig`].
#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    config: Arc<TemplateConfig>,
}

impl TemplateStore {
    pub fn new(config: TemplateConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
        })
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let config = TemplateConfig::load_from_path(path)?;
        Ok(Self {
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &TemplateConfig {
        &self.config
    }

    /// Look up a template module by name.
    ///
    /// Matches the map key first, then an explicit `name` override.
    pub fn module(&self, template: &str) -> PtbResult<&ModuleTemplate> {
        self.config
            .modules
            .get(template)
            .or_else(|| {
                self.config
                    .modules
                    .values()
                    .find(|m| m.name.as_deref() == Some(template))
            })
            .ok_or_else(|| PtbError::ConfigNotFound {
                template: template.to_string(),
                operation: None,
            })
    }

    /// Look up the descriptor for `template.operation`.
    pub fn lookup(&self, template: &str, operation: &str) -> PtbResult<&FunctionTemplate> {
        let module = self.module(template)?;
        module
            .functions
            .get(operation)
            .or_else(|| {
                module
                    .functions
                    .values()
                    .find(|f| f.name.as_deref() == Some(operation))
            })
            .ok_or_else(|| PtbError::ConfigNotFound {
                template: template.to_string(),
                operation: Some(operation.to_string()),
            })
    }
}
