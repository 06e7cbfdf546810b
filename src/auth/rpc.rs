//! RPC surface of the authority.

use serde::{Deserialize, Serialize};
use tracing::error;

use super::authority::{AuthError, Authority};
use crate::rpc::{FaultCode, RpcFault, RpcHandler};

/// Operation name served by the authority and called by guards.
pub const AUTHENTICATE_OP: &str = "authenticate";

/// Payload of an `authenticate` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticateRequest {
    pub token: String,
}

/// Dispatches RPC requests onto an [`Authority`].
#[derive(Clone)]
pub struct AuthorityRpc {
    authority: Authority,
}

impl AuthorityRpc {
    pub fn new(authority: Authority) -> Self {
        Self { authority }
    }
}

impl RpcHandler for AuthorityRpc {
    async fn handle(
        &self,
        op: &str,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value, RpcFault> {
        match op {
            AUTHENTICATE_OP => {
                let request: AuthenticateRequest = serde_json::from_value(payload).map_err(|e| {
                    RpcFault::new(
                        FaultCode::Malformed,
                        format!("Invalid authenticate payload: {}", e),
                    )
                })?;

                let identity = self
                    .authority
                    .authenticate(&request.token)
                    .await
                    .map_err(fault_of)?;

                serde_json::to_value(identity).map_err(|e| {
                    error!(error = %e, "Failed to encode identity");
                    RpcFault::new(FaultCode::Unavailable, "Internal error")
                })
            }
            other => Err(RpcFault::new(
                FaultCode::UnknownOp,
                format!("Unknown operation: {}", other),
            )),
        }
    }
}

/// Map an authority error onto a wire fault without leaking which check
/// failed.
fn fault_of(err: AuthError) -> RpcFault {
    match err {
        AuthError::Unauthorized => RpcFault::new(FaultCode::Unauthorized, "Unauthorized"),
        AuthError::Conflict => RpcFault::new(FaultCode::Conflict, "Conflict"),
        AuthError::Store(e) => {
            error!(error = %e, "Store failure during authentication");
            RpcFault::new(FaultCode::Unavailable, "Service unavailable")
        }
        AuthError::Internal => RpcFault::new(FaultCode::Unavailable, "Service unavailable"),
    }
}
