use crate::v1::action::retcode::{self, Retcode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure class reported back to the caller alongside the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    UnknownTool,
    InvalidArgument,
    ProviderUnavailable,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("unknown tool `{0}`")]
    UnknownTool(String),
    #[error("invalid argument `{field}`: {reason}")]
    InvalidArgument { field: String, reason: String },
    #[error("{0}")]
    ProviderUnavailable(String),
}

impl ToolError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ToolError::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        ToolError::ProviderUnavailable(reason.into())
    }

    pub fn kind(&self) -> ToolErrorKind {
        match self {
            ToolError::UnknownTool(_) => ToolErrorKind::UnknownTool,
            ToolError::InvalidArgument { .. } => ToolErrorKind::InvalidArgument,
            ToolError::ProviderUnavailable(_) => ToolErrorKind::ProviderUnavailable,
        }
    }

    pub fn retcode(&self) -> Retcode {
        let class = match self.kind() {
            ToolErrorKind::UnknownTool => &*retcode::UNKNOWN_TOOL,
            ToolErrorKind::InvalidArgument => &*retcode::INVALID_ARGUMENT,
            ToolErrorKind::ProviderUnavailable => &*retcode::PROVIDER_UNAVAILABLE,
        };
        class.with_message(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_argument_names_field() {
        let err = ToolError::invalid("limit", "must be greater than 0");
        assert_eq!(err.kind(), ToolErrorKind::InvalidArgument);
        assert_eq!(
            err.retcode().message(),
            "Invalid Argument: invalid argument `limit`: must be greater than 0"
        );
        assert_eq!(err.retcode().code(), 10006);
    }

    #[test]
    fn kind_serializes_snake_case() {
        let raw = serde_json::to_string(&ToolErrorKind::ProviderUnavailable).unwrap();
        assert_eq!(raw, r#""provider_unavailable""#);
    }
}
