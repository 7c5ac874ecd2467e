// src/error.rs
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Resource not found")]
    ResourceNotFound,

    #[error("Tool not found")]
    ToolNotFound,

    #[error("Method not found")]
    MethodNotFound,

    #[error("Parse error")]
    ParseError,

    /// The backend cannot be reached at all (wrong platform, missing database,
    /// no automation permission).
    #[error("{0}")]
    Unavailable(String),

    #[error("AppleScript error: {0}")]
    Script(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl ConnectorError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ConnectorError::Unavailable(_))
    }

    pub fn code_str(&self) -> &'static str {
        match self {
            ConnectorError::InvalidParams(_) => "invalid_params",
            ConnectorError::ResourceNotFound => "not_found",
            ConnectorError::ToolNotFound => "tool_not_found",
            ConnectorError::MethodNotFound => "method_not_found",
            ConnectorError::ParseError => "parse_error",
            ConnectorError::Unavailable(_) => "unavailable",
            ConnectorError::Script(_) => "script_error",
            ConnectorError::Database(_) => "database_error",
            ConnectorError::Timeout(_) => "timeout",
            _ => "internal_error",
        }
    }

    pub fn to_jsonrpc_error(&self) -> serde_json::Value {
        let (code, message) = match self {
            ConnectorError::ResourceNotFound => (-32602, "Resource not found".to_string()),
            ConnectorError::ToolNotFound => (-32602, "Tool not found".to_string()),
            ConnectorError::InvalidParams(msg) => (-32602, msg.to_string()),
            ConnectorError::MethodNotFound => (-32601, "Method not found".to_string()),
            ConnectorError::ParseError => (-32700, "Parse error".to_string()),
            ConnectorError::InternalError(msg) => (-32603, msg.to_string()),
            ConnectorError::Other(msg) => (-32603, msg.to_string()),
            err => (-32603, err.to_string()),
        };

        json!({
            "code": code,
            "message": message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jsonrpc_codes() {
        assert_eq!(
            ConnectorError::MethodNotFound.to_jsonrpc_error()["code"],
            -32601
        );
        assert_eq!(ConnectorError::ToolNotFound.to_jsonrpc_error()["code"], -32602);
        assert_eq!(ConnectorError::ParseError.to_jsonrpc_error()["code"], -32700);
        let err = ConnectorError::InvalidParams("Missing 'query'".into()).to_jsonrpc_error();
        assert_eq!(err["code"], -32602);
        assert_eq!(err["message"], "Missing 'query'");
        assert_eq!(
            ConnectorError::Script("boom".into()).to_jsonrpc_error()["message"],
            "AppleScript error: boom"
        );
    }

    #[test]
    fn test_unavailable_displays_bare_message() {
        let err = ConnectorError::Unavailable("Notes database not found".into());
        assert!(err.is_unavailable());
        assert_eq!(err.to_string(), "Notes database not found");
        assert_eq!(err.code_str(), "unavailable");
    }
}
