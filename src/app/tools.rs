//! Control-surface tool registry.
//!
//! Every operation a remote agent may invoke is registered here by name
//! (`self.<device>.<action>`) with typed parameters. Arguments are checked
//! against the declared types and ranges before the handler runs, so
//! handlers only ever see valid input.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Integer { min: i64, max: i64 },
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
}

impl ParamSpec {
    pub const fn integer(name: &'static str, min: i64, max: i64) -> Self {
        Self {
            name,
            kind: ParamKind::Integer { min, max },
        }
    }

    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    UnknownTool(String),
    MissingParam(&'static str),
    WrongType(&'static str),
    OutOfRange {
        name: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
    /// The handler ran but the device reported a fault.
    Failed(String),
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTool(name) => write!(f, "unknown tool: {name}"),
            Self::MissingParam(name) => write!(f, "missing parameter: {name}"),
            Self::WrongType(name) => write!(f, "wrong type for parameter: {name}"),
            Self::OutOfRange {
                name,
                value,
                min,
                max,
            } => write!(f, "{name}={value} outside {min}..={max}"),
            Self::Failed(msg) => write!(f, "failed: {msg}"),
        }
    }
}

impl std::error::Error for ToolError {}

#[derive(Debug, Clone, PartialEq)]
enum ArgValue {
    Integer(i64),
    Text(String),
}

/// Validated arguments handed to a handler.
#[derive(Debug, Default)]
pub struct Args {
    values: BTreeMap<&'static str, ArgValue>,
}

impl Args {
    /// Declared integer parameter. Validation guarantees presence.
    pub fn integer(&self, name: &str) -> Result<i64, ToolError> {
        match self.values.get(name) {
            Some(ArgValue::Integer(v)) => Ok(*v),
            _ => Err(ToolError::Failed(format!("undeclared integer {name}"))),
        }
    }

    pub fn text(&self, name: &str) -> Result<&str, ToolError> {
        match self.values.get(name) {
            Some(ArgValue::Text(v)) => Ok(v),
            _ => Err(ToolError::Failed(format!("undeclared text {name}"))),
        }
    }
}

pub type ToolHandler = Box<dyn Fn(&Args) -> Result<Value, ToolError> + Send + Sync>;

struct Tool {
    description: &'static str,
    params: Vec<ParamSpec>,
    handler: ToolHandler,
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<&'static str, Tool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a tool.
    pub fn register(
        &mut self,
        name: &'static str,
        description: &'static str,
        params: Vec<ParamSpec>,
        handler: ToolHandler,
    ) {
        self.tools.insert(
            name,
            Tool {
                description,
                params,
                handler,
            },
        );
    }

    /// Validate `args` (a JSON object, or null for none) and run the tool.
    pub fn invoke(&self, name: &str, args: &Value) -> Result<Value, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_owned()))?;
        let empty = Map::new();
        let object = match args {
            Value::Object(map) => map,
            Value::Null => &empty,
            _ => return Err(ToolError::WrongType("arguments")),
        };
        let validated = validate(&tool.params, object)?;
        (tool.handler)(&validated)
    }

    /// `(name, description)` of every registered tool, sorted by name.
    pub fn list(&self) -> Vec<(&'static str, &'static str)> {
        self.tools
            .iter()
            .map(|(name, tool)| (*name, tool.description))
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

fn validate(specs: &[ParamSpec], args: &Map<String, Value>) -> Result<Args, ToolError> {
    let mut out = Args::default();
    for spec in specs {
        let raw = args.get(spec.name).ok_or(ToolError::MissingParam(spec.name))?;
        let value = match spec.kind {
            ParamKind::Integer { min, max } => {
                let v = raw.as_i64().ok_or(ToolError::WrongType(spec.name))?;
                if v < min || v > max {
                    return Err(ToolError::OutOfRange {
                        name: spec.name,
                        value: v,
                        min,
                        max,
                    });
                }
                ArgValue::Integer(v)
            }
            ParamKind::Text => {
                ArgValue::Text(raw.as_str().ok_or(ToolError::WrongType(spec.name))?.to_owned())
            }
        };
        out.values.insert(spec.name, value);
    }
    Ok(out)
}
