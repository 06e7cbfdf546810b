//! Request/response messaging between services.
//!
//! Frames are newline-delimited JSON over TCP: a request names an operation
//! and carries an arbitrary payload; the response is either `{"ok": value}`
//! or `{"err": {code, message}}`.

mod client;
mod server;

use serde::{Deserialize, Serialize};

pub use client::{RpcClient, RpcError};
pub use server::{RpcHandler, RpcServer};

/// A single request frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Operation name, e.g. `"authenticate"`.
    pub op: String,
    /// Operation-specific payload.
    pub payload: serde_json::Value,
}

/// A single response frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RpcResponse {
    Ok(serde_json::Value),
    Err(RpcFault),
}

/// An error response from the remote side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcFault {
    pub code: FaultCode,
    pub message: String,
}

impl RpcFault {
    pub fn new(code: FaultCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Wire-level fault categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultCode {
    Unauthorized,
    NotFound,
    Conflict,
    Unavailable,
    /// The request frame could not be parsed.
    Malformed,
    /// The operation name is not served by this endpoint.
    UnknownOp,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_shape() {
        let request = RpcRequest {
            op: "authenticate".to_string(),
            payload: json!({"token": "abc"}),
        };
        let wire = serde_json::to_value(&request).unwrap();
        assert_eq!(wire, json!({"op": "authenticate", "payload": {"token": "abc"}}));
    }

    #[test]
    fn test_ok_response_wire_shape() {
        let response = RpcResponse::Ok(json!({"id": "u1"}));
        let wire = serde_json::to_value(&response).unwrap();
        assert_eq!(wire, json!({"ok": {"id": "u1"}}));
    }

    #[test]
    fn test_err_response_wire_shape() {
        let response = RpcResponse::Err(RpcFault::new(FaultCode::Unauthorized, "Unauthorized"));
        let wire = serde_json::to_value(&response).unwrap();
        assert_eq!(
            wire,
            json!({"err": {"code": "unauthorized", "message": "Unauthorized"}})
        );
    }

    #[test]
    fn test_fault_code_round_trip() {
        for code in [
            FaultCode::Unauthorized,
            FaultCode::NotFound,
            FaultCode::Conflict,
            FaultCode::Unavailable,
            FaultCode::Malformed,
            FaultCode::UnknownOp,
        ] {
            let json = serde_json::to_string(&code).unwrap();
            let back: FaultCode = serde_json::from_str(&json).unwrap();
            assert_eq!(code, back);
        }
    }
}
