use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ArgType {
    Integer,
    String,
    Enum { choices: Vec<String> },
}

impl ArgType {
    pub fn name(&self) -> &'static str {
        match self {
            ArgType::Integer => "integer",
            ArgType::String => "string",
            ArgType::Enum { .. } => "enum",
        }
    }
}

/// Public shape of one declared argument.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArgDescriptor {
    pub name: String,
    #[serde(flatten)]
    pub ty: ArgType,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub args: Vec<ArgDescriptor>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn enum_arg_descriptor_serialize() {
        let arg = ArgDescriptor {
            name: "sort_by".to_string(),
            ty: ArgType::Enum {
                choices: vec!["cpu".to_string(), "memory".to_string()],
            },
            required: false,
            default: Some(Value::from("cpu")),
            constraint: None,
        };
        let raw = r#"{
  "name": "sort_by",
  "type": "enum",
  "choices": [
    "cpu",
    "memory"
  ],
  "required": false,
  "default": "cpu"
}"#;
        assert_eq!(serde_json::to_string_pretty(&arg).unwrap(), raw);
    }
}
