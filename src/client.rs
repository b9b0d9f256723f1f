//! Async client for the QT server protocol.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::debug;

use crate::protocol::{Reply, Request};

/// Client errors.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server answered `ERROR: <message>`.
    #[error("server error: {0}")]
    Server(String),

    /// The server closed the connection before replying.
    #[error("connection closed by server")]
    Closed,

    /// An `OK` reply without a value the operation promises.
    #[error("reply is missing {0}")]
    MissingField(&'static str),

    /// IO error during communication.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One connection to a QT server.
pub struct QtClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl QtClient {
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            lines: BufReader::new(reader).lines(),
            writer,
        })
    }

    /// Send a raw request and return the reply as-is, `ERROR` replies included.
    pub async fn request(&mut self, request: &Request) -> Result<Reply, ClientError> {
        let mut frame = serde_json::to_vec(request)?;
        frame.push(b'\n');
        self.writer.write_all(&frame).await?;
        self.writer.flush().await?;

        let line = self.lines.next_line().await?.ok_or(ClientError::Closed)?;
        debug!("Reply: {}", line);
        Ok(serde_json::from_str(&line)?)
    }

    async fn expect_ok(&mut self, request: &Request) -> Result<Reply, ClientError> {
        let reply = self.request(request).await?;
        match reply.error_message() {
            Some(message) => Err(ClientError::Server(message.to_string())),
            None => Ok(reply),
        }
    }

    /// LOAD_DATASET.
    pub async fn load_dataset(&mut self, table: &str) -> Result<(), ClientError> {
        self.expect_ok(&Request::load_dataset(table)).await?;
        Ok(())
    }

    /// CLUSTER: returns the cluster count and the detailed rendering.
    pub async fn cluster(&mut self, radius: f64) -> Result<(usize, String), ClientError> {
        let reply = self.expect_ok(&Request::cluster(radius)).await?;
        let count = reply
            .cluster_count
            .ok_or(ClientError::MissingField("cluster_count"))?;
        let rendering = reply
            .rendering
            .ok_or(ClientError::MissingField("rendering"))?;
        Ok((count, rendering))
    }

    /// SAVE_RESULT.
    pub async fn save_result(&mut self, path: &str) -> Result<(), ClientError> {
        self.expect_ok(&Request::save_result(path)).await?;
        Ok(())
    }

    /// LOAD_RESULT: returns the summary rendering.
    pub async fn load_result(&mut self, path: &str) -> Result<String, ClientError> {
        let reply = self.expect_ok(&Request::load_result(path)).await?;
        reply.rendering.ok_or(ClientError::MissingField("rendering"))
    }
}
