use serde_json::{Map, Value};
use std::collections::HashMap;
use sysmon_protocol::v1::action::{ArgDescriptor, ArgType, ToolDescriptor};
use sysmon_protocol::ToolError;

/// Checks a value that already has the declared type.
pub type Validator = fn(&Value) -> Result<(), String>;

pub struct ArgSpec {
    pub name: &'static str,
    pub ty: ArgType,
    pub required: bool,
    pub default: Option<Value>,
    pub constraint: Option<(&'static str, Validator)>,
}

impl ArgSpec {
    pub fn optional(name: &'static str, ty: ArgType, default: Value) -> Self {
        Self {
            name,
            ty,
            required: false,
            default: Some(default),
            constraint: None,
        }
    }

    pub fn required(name: &'static str, ty: ArgType) -> Self {
        Self {
            name,
            ty,
            required: true,
            default: None,
            constraint: None,
        }
    }

    pub fn check(mut self, description: &'static str, validator: Validator) -> Self {
        self.constraint = Some((description, validator));
        self
    }

    fn validate(&self, value: &Value) -> Result<(), ToolError> {
        let type_ok = match &self.ty {
            ArgType::Integer => value.is_i64() || value.is_u64(),
            ArgType::String => value.is_string(),
            ArgType::Enum { choices } => match value.as_str() {
                Some(s) => {
                    if !choices.iter().any(|c| c == s) {
                        return Err(ToolError::invalid(
                            self.name,
                            format!("expected one of {}, got `{}`", choices.join(", "), s),
                        ));
                    }
                    true
                }
                None => false,
            },
        };
        if !type_ok {
            return Err(ToolError::invalid(
                self.name,
                format!("expected {}, got {}", self.ty.name(), json_type(value)),
            ));
        }

        if let Some((_, validator)) = self.constraint {
            validator(value).map_err(|reason| ToolError::invalid(self.name, reason))?;
        }
        Ok(())
    }

    fn descriptor(&self) -> ArgDescriptor {
        ArgDescriptor {
            name: self.name.to_string(),
            ty: self.ty.clone(),
            required: self.required,
            default: self.default.clone(),
            constraint: self.constraint.map(|(description, _)| description.to_string()),
        }
    }
}

/// Declared arguments of one tool, in declaration order.
#[derive(Default)]
pub struct ToolSchema {
    args: Vec<ArgSpec>,
}

impl ToolSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg(mut self, spec: ArgSpec) -> Self {
        self.args.push(spec);
        self
    }

    /// Rejects unknown keys first, then checks declared arguments in order and
    /// fills defaults. Stops at the first violation.
    pub fn validate(&self, supplied: &Map<String, Value>) -> Result<ToolArgs, ToolError> {
        if let Some(unknown) = supplied
            .keys()
            .find(|key| !self.args.iter().any(|spec| spec.name == key.as_str()))
        {
            return Err(ToolError::invalid(unknown.as_str(), "unexpected argument"));
        }

        let mut values = HashMap::with_capacity(self.args.len());
        for spec in &self.args {
            match supplied.get(spec.name).filter(|v| !v.is_null()) {
                Some(value) => {
                    spec.validate(value)?;
                    values.insert(spec.name, value.clone());
                }
                None if spec.required => {
                    return Err(ToolError::invalid(spec.name, "missing required argument"));
                }
                None => {
                    if let Some(default) = &spec.default {
                        values.insert(spec.name, default.clone());
                    }
                }
            }
        }
        Ok(ToolArgs { values })
    }

    pub fn describe(&self, name: &str, description: &str) -> ToolDescriptor {
        ToolDescriptor {
            name: name.to_string(),
            description: description.to_string(),
            args: self.args.iter().map(ArgSpec::descriptor).collect(),
        }
    }
}

/// Arguments after validation and default filling.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArgs {
    values: HashMap<&'static str, Value>,
}

impl ToolArgs {
    pub fn integer(&self, name: &str) -> Result<i64, ToolError> {
        self.values
            .get(name)
            .and_then(Value::as_i64)
            .ok_or_else(|| ToolError::invalid(name, "expected integer"))
    }

    pub fn string(&self, name: &str) -> Result<&str, ToolError> {
        self.values
            .get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::invalid(name, "expected string"))
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn positive(value: &Value) -> Result<(), String> {
        match value.as_i64() {
            Some(n) if n > 0 => Ok(()),
            _ => Err("must be greater than 0".to_string()),
        }
    }

    fn schema() -> ToolSchema {
        ToolSchema::new()
            .arg(ArgSpec::optional("limit", ArgType::Integer, json!(5)).check("> 0", positive))
            .arg(ArgSpec::optional(
                "sort_by",
                ArgType::Enum {
                    choices: vec!["cpu".into(), "memory".into()],
                },
                json!("cpu"),
            ))
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn field_of(err: ToolError) -> String {
        match err {
            ToolError::InvalidArgument { field, .. } => field,
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn defaults_fill_missing_and_null() {
        let validated = schema().validate(&args(json!({ "sort_by": null }))).unwrap();
        assert_eq!(validated.integer("limit").unwrap(), 5);
        assert_eq!(validated.string("sort_by").unwrap(), "cpu");
    }

    #[test]
    fn supplied_values_win() {
        let validated = schema()
            .validate(&args(json!({ "limit": 2, "sort_by": "memory" })))
            .unwrap();
        assert_eq!(validated.integer("limit").unwrap(), 2);
        assert_eq!(validated.string("sort_by").unwrap(), "memory");
    }

    #[test]
    fn range_violation_names_field() {
        let err = schema().validate(&args(json!({ "limit": 0 }))).unwrap_err();
        assert_eq!(field_of(err), "limit");
    }

    #[test]
    fn type_violations() {
        for bad in [json!({ "limit": 2.5 }), json!({ "limit": "5" }), json!({ "limit": true })] {
            let err = schema().validate(&args(bad)).unwrap_err();
            assert_eq!(field_of(err), "limit");
        }
    }

    #[test]
    fn enum_membership() {
        let err = schema()
            .validate(&args(json!({ "sort_by": "name" })))
            .unwrap_err();
        assert_eq!(
            err,
            ToolError::invalid("sort_by", "expected one of cpu, memory, got `name`")
        );
    }

    #[test]
    fn unknown_key_rejected() {
        let err = schema().validate(&args(json!({ "limt": 3 }))).unwrap_err();
        assert_eq!(field_of(err), "limt");
    }

    #[test]
    fn missing_required() {
        let schema = ToolSchema::new().arg(ArgSpec::required("pid", ArgType::Integer));
        let err = schema.validate(&Map::new()).unwrap_err();
        assert_eq!(err, ToolError::invalid("pid", "missing required argument"));
    }

    #[test]
    fn descriptor_lists_constraint() {
        let descriptor = schema().describe("get_top_processes", "top");
        assert_eq!(descriptor.args.len(), 2);
        assert_eq!(descriptor.args[0].constraint.as_deref(), Some("> 0"));
        assert_eq!(descriptor.args[1].default, Some(json!("cpu")));
    }
}
