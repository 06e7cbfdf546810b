use std::future::Future;
use std::net::SocketAddr;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::debug;

use super::{FaultCode, RpcFault, RpcRequest, RpcResponse};

/// Handles requests dispatched by operation name.
///
/// The returned fault is sent to the remote caller verbatim; keep internal
/// detail out of fault messages.
pub trait RpcHandler: Clone + Send + Sync + 'static {
    fn handle(
        &self,
        op: &str,
        payload: serde_json::Value,
    ) -> impl Future<Output = Result<serde_json::Value, RpcFault>> + Send;
}

/// Accepts connections and serves request/response frames, one task per
/// connection. Requests on one connection are answered in order; separate
/// connections proceed independently.
pub struct RpcServer {
    listener: TcpListener,
}

impl RpcServer {
    /// Bind to the given address. Use port 0 to let the OS choose.
    pub async fn bind(addr: &str) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener })
    }

    /// Wrap an already-bound listener.
    pub fn from_listener(listener: TcpListener) -> Self {
        Self { listener }
    }

    /// The address the server is listening on.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until the listener fails. This function blocks the calling task.
    pub async fn run<H: RpcHandler>(self, handler: H) -> std::io::Result<()> {
        loop {
            let (stream, peer) = self.listener.accept().await?;
            let handler = handler.clone();
            tokio::spawn(async move {
                if let Err(e) = serve_connection(stream, handler).await {
                    debug!(peer = %peer, error = %e, "RPC connection ended with error");
                }
            });
        }
    }
}

async fn serve_connection<H: RpcHandler>(stream: TcpStream, handler: H) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<RpcRequest>(&line) {
            Ok(request) => match handler.handle(&request.op, request.payload).await {
                Ok(value) => RpcResponse::Ok(value),
                Err(fault) => RpcResponse::Err(fault),
            },
            Err(e) => RpcResponse::Err(RpcFault::new(
                FaultCode::Malformed,
                format!("Malformed request frame: {}", e),
            )),
        };

        let mut frame = serde_json::to_vec(&response).map_err(std::io::Error::other)?;
        frame.push(b'\n');
        writer.write_all(&frame).await?;
    }

    Ok(())
}
