// ABOUTME: HTTP/1 JSON transport to the dataplane agent.
// ABOUTME: Dials the agent per call, the same way the agent client always has.

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper_util::rt::TokioIo;
use snafu::ResultExt;
use tokio::net::TcpStream;

use super::agent::{
    AgentError, BuildRequestSnafu, ConnectSnafu, DataplaneAgent, EncodeSnafu, HandshakeSnafu,
    RejectedSnafu, SendSnafu,
};
use super::model::DataChange;

const PUT_PATH: &str = "/v1/put";
const DEL_PATH: &str = "/v1/del";

/// Agent reached over HTTP at `host:port`.
#[derive(Debug, Clone)]
pub struct HttpAgent {
    endpoint: String,
}

impl HttpAgent {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post(&self, path: &str, change: &DataChange) -> Result<(), AgentError> {
        let body = serde_json::to_vec(change).context(EncodeSnafu)?;

        let stream = TcpStream::connect(&self.endpoint)
            .await
            .context(ConnectSnafu {
                endpoint: self.endpoint.clone(),
            })?;
        let io = TokioIo::new(stream);

        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .context(HandshakeSnafu)?;

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::warn!("dataplane agent connection error: {}", e);
            }
        });

        let req = hyper::Request::builder()
            .method("POST")
            .uri(path)
            .header("Host", self.endpoint.as_str())
            .header("Content-Type", "application/json")
            .body(Full::new(Bytes::from(body)))
            .context(BuildRequestSnafu)?;

        let resp = sender.send_request(req).await.context(SendSnafu)?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let message = match resp.into_body().collect().await {
            Ok(body) => String::from_utf8_lossy(&body.to_bytes()).into_owned(),
            Err(e) => format!("<unreadable body: {e}>"),
        };
        RejectedSnafu {
            status: status.as_u16(),
            message,
        }
        .fail()
    }
}

#[async_trait]
impl DataplaneAgent for HttpAgent {
    async fn put(&self, change: &DataChange) -> Result<(), AgentError> {
        self.post(PUT_PATH, change).await
    }

    async fn del(&self, change: &DataChange) -> Result<(), AgentError> {
        self.post(DEL_PATH, change).await
    }
}
