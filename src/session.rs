//! Per-connection session state machine.
//!
//! A session owns the dataset and clustering result of one client. Requests are
//! handled strictly one at a time: read a frame, dispatch, write one reply.
//! Domain and protocol failures become `ERROR` replies; only transport failures end
//! the session.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::data::{Dataset, TableSource};
use crate::error::{Error, Result};
use crate::model::QtMiner;
use crate::protocol::{Opcode, Reply, Request, PROTOCOL_VERSION};

/// Longest request frame accepted, newline included.
pub const MAX_FRAME_BYTES: u64 = 1024 * 1024;

/// Process-wide collaborators shared by every session.
pub struct SessionContext {
    source: Arc<dyn TableSource>,
    results_dir: PathBuf,
}

impl SessionContext {
    /// `results_dir` is the base for relative SAVE_RESULT / LOAD_RESULT paths.
    pub fn new(source: Arc<dyn TableSource>, results_dir: impl Into<PathBuf>) -> Self {
        Self {
            source,
            results_dir: results_dir.into(),
        }
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.results_dir.join(path)
    }
}

/// Mutable state of one connection.
pub struct Session {
    context: Arc<SessionContext>,
    dataset: Option<Arc<Dataset>>,
    last_result: Option<QtMiner>,
}

impl Session {
    pub fn new(context: Arc<SessionContext>) -> Self {
        Self {
            context,
            dataset: None,
            last_result: None,
        }
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_deref()
    }

    pub fn last_result(&self) -> Option<&QtMiner> {
        self.last_result.as_ref()
    }

    /// Handle one request. Never fails: every error becomes an `ERROR` reply.
    pub async fn handle(&mut self, request: Request) -> Reply {
        if request.version != PROTOCOL_VERSION {
            warn!("Rejecting request with protocol version {}", request.version);
            return Reply::error(Error::UnsupportedProtocolVersion {
                found: request.version,
                supported: PROTOCOL_VERSION,
            });
        }

        let Some(op) = Opcode::from_code(request.opcode) else {
            warn!("Unknown opcode {}", request.opcode);
            return Reply::error("unknown opcode");
        };
        debug!("Handling {} (opcode {})", op.name(), request.opcode);

        let outcome = match op {
            Opcode::LoadDataset => self.load_dataset(&request.payload).await,
            Opcode::Cluster => self.cluster(&request.payload).await,
            Opcode::SaveResult => self.save_result(&request.payload).await,
            Opcode::LoadResult => self.load_result(&request.payload).await,
        };

        match outcome {
            Ok(reply) => reply,
            Err(e) => {
                warn!("{} failed: {}", op.name(), e);
                Reply::error(e)
            }
        }
    }

    async fn load_dataset(&mut self, payload: &serde_json::Value) -> Result<Reply> {
        let table = string_payload(Opcode::LoadDataset, payload)?.to_string();
        let source = Arc::clone(&self.context.source);
        let dataset = tokio::task::spawn_blocking(move || source.load_table(&table)).await??;

        info!(
            "Dataset loaded: {} examples, {} attributes",
            dataset.example_count(),
            dataset.attribute_count()
        );
        self.dataset = Some(Arc::new(dataset));
        Ok(Reply::ok())
    }

    async fn cluster(&mut self, payload: &serde_json::Value) -> Result<Reply> {
        let dataset = self.dataset.clone().ok_or(Error::NoDataset)?;
        let radius = payload.as_f64().ok_or(Error::InvalidPayload {
            opcode: Opcode::Cluster.name(),
            expected: "a number",
        })?;

        let (miner, count, rendering) = tokio::task::spawn_blocking(move || {
            let mut miner = QtMiner::new(radius)?;
            let count = miner.compute(&dataset)?;
            let rendering = miner.clusters().render(&dataset)?;
            Ok::<_, Error>((miner, count, rendering))
        })
        .await??;

        info!("Clustering with radius {} produced {} clusters", radius, count);
        self.last_result = Some(miner);
        Ok(Reply::ok()
            .with_cluster_count(count)
            .with_rendering(rendering))
    }

    async fn save_result(&mut self, payload: &serde_json::Value) -> Result<Reply> {
        let miner = self.last_result.clone().ok_or(Error::NoResult)?;
        let path = self
            .context
            .resolve(string_payload(Opcode::SaveResult, payload)?);
        tokio::task::spawn_blocking(move || miner.save(&path)).await??;
        Ok(Reply::ok())
    }

    async fn load_result(&mut self, payload: &serde_json::Value) -> Result<Reply> {
        let path = self
            .context
            .resolve(string_payload(Opcode::LoadResult, payload)?);
        let (miner, rendering) = tokio::task::spawn_blocking(move || {
            let miner = QtMiner::load(&path)?;
            let rendering = miner.clusters().summary();
            Ok::<_, Error>((miner, rendering))
        })
        .await??;

        self.last_result = Some(miner);
        Ok(Reply::ok().with_rendering(rendering))
    }
}

fn string_payload(op: Opcode, payload: &serde_json::Value) -> Result<&str> {
    payload.as_str().ok_or(Error::InvalidPayload {
        opcode: op.name(),
        expected: "a string",
    })
}

/// Run the request/reply loop for one connection until the peer disconnects.
///
/// Returns `Ok(())` when the peer closes the stream between frames. Returns an error
/// on I/O failure, on a frame that is not a valid request, on a frame longer than
/// [`MAX_FRAME_BYTES`], or when the stream ends inside a frame. The stream is dropped
/// on return in every case.
pub async fn serve<S>(stream: S, peer: &str, session: &mut Session) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(reader);
    let mut frame = Vec::new();

    loop {
        frame.clear();
        let bytes_read = (&mut reader)
            .take(MAX_FRAME_BYTES)
            .read_until(b'\n', &mut frame)
            .await?;
        if bytes_read == 0 {
            debug!("Client {} closed connection", peer);
            return Ok(());
        }
        if frame.last() != Some(&b'\n') {
            if bytes_read as u64 >= MAX_FRAME_BYTES {
                return Err(Error::FrameTooLarge {
                    limit: MAX_FRAME_BYTES,
                });
            }
            return Err(Error::TruncatedFrame);
        }

        if frame.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        debug!("{} -> {}", peer, String::from_utf8_lossy(&frame).trim_end());

        let request: Request = serde_json::from_slice(&frame).map_err(Error::MalformedFrame)?;
        let reply = session.handle(request).await;

        let mut out = serde_json::to_vec(&reply).map_err(Error::MalformedFrame)?;
        out.push(b'\n');
        writer.write_all(&out).await?;
        writer.flush().await?;
    }
}
