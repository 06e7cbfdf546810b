use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use super::{RpcFault, RpcRequest, RpcResponse};

/// Client for a remote RPC endpoint. Opens a connection per call and bounds
/// the whole exchange with a finite timeout; a caller is never left waiting
/// on a dead peer.
#[derive(Debug, Clone)]
pub struct RpcClient {
    addr: String,
    timeout: Duration,
}

/// Errors from a client call.
#[derive(Debug)]
pub enum RpcError {
    /// The remote side answered with a fault.
    Fault(RpcFault),
    /// The remote side could not be reached or did not answer in time.
    Unavailable(String),
    /// The exchange completed but a frame could not be encoded or decoded.
    Protocol(String),
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RpcError::Fault(fault) => write!(f, "Remote fault: {}", fault.message),
            RpcError::Unavailable(reason) => write!(f, "Endpoint unavailable: {}", reason),
            RpcError::Protocol(reason) => write!(f, "Protocol error: {}", reason),
        }
    }
}

impl std::error::Error for RpcError {}

impl RpcClient {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }

    /// Send one request and await its response.
    pub async fn call(
        &self,
        op: &str,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value, RpcError> {
        match tokio::time::timeout(self.timeout, self.exchange(op, payload)).await {
            Ok(result) => result,
            Err(_) => Err(RpcError::Unavailable(format!(
                "No response from {} within {:?}",
                self.addr, self.timeout
            ))),
        }
    }

    async fn exchange(
        &self,
        op: &str,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value, RpcError> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|e| RpcError::Unavailable(format!("Connect to {}: {}", self.addr, e)))?;
        let (reader, mut writer) = stream.into_split();

        let request = RpcRequest {
            op: op.to_string(),
            payload,
        };
        let mut frame = serde_json::to_vec(&request).map_err(|e| RpcError::Protocol(e.to_string()))?;
        frame.push(b'\n');
        writer
            .write_all(&frame)
            .await
            .map_err(|e| RpcError::Unavailable(e.to_string()))?;

        let mut line = String::new();
        let read = BufReader::new(reader)
            .read_line(&mut line)
            .await
            .map_err(|e| RpcError::Unavailable(e.to_string()))?;
        if read == 0 {
            return Err(RpcError::Unavailable("Connection closed".to_string()));
        }

        match serde_json::from_str::<RpcResponse>(&line)
            .map_err(|e| RpcError::Protocol(format!("Bad response frame: {}", e)))?
        {
            RpcResponse::Ok(value) => Ok(value),
            RpcResponse::Err(fault) => Err(RpcError::Fault(fault)),
        }
    }
}
