use std::time::Duration;

use super::authority::Identity;
use super::rpc::{AUTHENTICATE_OP, AuthenticateRequest};
use crate::rpc::{FaultCode, RpcClient, RpcError};

/// Client side of the authority's RPC surface, used by guards in other
/// services.
#[derive(Debug, Clone)]
pub struct AuthClient {
    rpc: RpcClient,
}

/// Outcome of a delegated authentication call, from the guard's point of
/// view: either the authority said no, or the authority could not be asked.
#[derive(Debug)]
pub enum AuthDelegateError {
    Unauthorized,
    Unavailable(String),
}

impl std::fmt::Display for AuthDelegateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthDelegateError::Unauthorized => write!(f, "Unauthorized"),
            AuthDelegateError::Unavailable(reason) => {
                write!(f, "Authority unavailable: {}", reason)
            }
        }
    }
}

impl std::error::Error for AuthDelegateError {}

impl AuthClient {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            rpc: RpcClient::new(addr, timeout),
        }
    }

    /// Ask the authority to resolve a bearer credential to an identity.
    pub async fn authenticate(&self, token: &str) -> Result<Identity, AuthDelegateError> {
        let payload = serde_json::to_value(AuthenticateRequest {
            token: token.to_string(),
        })
        .map_err(|e| AuthDelegateError::Unavailable(e.to_string()))?;

        let reply = self
            .rpc
            .call(AUTHENTICATE_OP, payload)
            .await
            .map_err(|e| match e {
                RpcError::Fault(fault) if fault.code == FaultCode::Unauthorized => {
                    AuthDelegateError::Unauthorized
                }
                RpcError::Fault(fault) => {
                    AuthDelegateError::Unavailable(format!("Authority fault: {}", fault.message))
                }
                RpcError::Unavailable(reason) | RpcError::Protocol(reason) => {
                    AuthDelegateError::Unavailable(reason)
                }
            })?;

        serde_json::from_value(reply)
            .map_err(|e| AuthDelegateError::Unavailable(format!("Invalid identity payload: {}", e)))
    }
}
