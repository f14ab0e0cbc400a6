use std::sync::Arc;

use analytics::{PageView, Percentile};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use session::{LatestStats, SourceStatus};
use staking_model::{Metric, SnapshotTotals};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{info, warn};

pub const DEFAULT_SOCKET_PATH: &str = "/tmp/stakedash.sock";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum ViewRequest {
    Status,
    Stats,
    Thresholds,
    Ranges,
    Page(PageCommand),
}

/// Navigation applied to the session's page cursor before the page is returned.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "op", content = "input")]
pub enum PageCommand {
    Current,
    First,
    Last,
    Next,
    Previous,
    JumpTo(String),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionStatus {
    pub session_id: String,
    pub loading: bool,
    pub poll_interval_secs: u64,
    pub updated_at: Option<String>,
    pub snapshot: SourceStatus,
    pub history: SourceStatus,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StatsSummary {
    /// Newest history sample; `None` until history has loaded.
    pub latest: Option<LatestStats>,
    pub active_stakers: usize,
    pub snapshot_totals: SnapshotTotals,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ThresholdEntry {
    pub percentile: Percentile,
    pub label: String,
    pub staking_power: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RangeEntry {
    pub metric: Metric,
    pub min: i64,
    pub max: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum ViewResponse {
    Status(SessionStatus),
    Stats(StatsSummary),
    Thresholds(Vec<ThresholdEntry>),
    Ranges(Vec<RangeEntry>),
    Page(PageView),
    Error(String),
}

pub async fn run_server<F>(socket_path: &str, handler: F) -> Result<()>
where
    F: Fn(ViewRequest) -> Result<ViewResponse> + Send + Sync + 'static,
{
    let _ = std::fs::remove_file(socket_path);
    let listener = UnixListener::bind(socket_path)?;
    let handler = Arc::new(handler);
    info!(socket = socket_path, "view ipc listening");
    loop {
        let (stream, _) = listener.accept().await?;
        let handler = Arc::clone(&handler);
        tokio::spawn(async move {
            if let Err(err) = serve_connection(stream, handler.as_ref()).await {
                warn!(error = ?err, "view ipc connection failed");
            }
        });
    }
}

/// Answers a single request line. A line that does not decode is answered
/// with `ViewResponse::Error` rather than dropping the connection.
async fn serve_connection<F>(stream: UnixStream, handler: &F) -> Result<()>
where
    F: Fn(ViewRequest) -> Result<ViewResponse>,
{
    let (read_half, mut write_half) = stream.into_split();
    let Some(line) = read_line(&mut BufReader::new(read_half)).await? else {
        return Ok(());
    };
    let resp = answer(&line, handler);
    write_frame(&mut write_half, &resp).await
}

fn answer<F>(line: &str, handler: &F) -> ViewResponse
where
    F: Fn(ViewRequest) -> Result<ViewResponse>,
{
    match serde_json::from_str::<ViewRequest>(line) {
        Ok(req) => handler(req).unwrap_or_else(|err| ViewResponse::Error(err.to_string())),
        Err(err) => ViewResponse::Error(format!("bad request: {err}")),
    }
}

pub async fn send_request(socket_path: &str, req: &ViewRequest) -> Result<ViewResponse> {
    let stream = UnixStream::connect(socket_path).await?;
    let (read_half, mut write_half) = stream.into_split();
    write_frame(&mut write_half, req).await?;
    match read_line(&mut BufReader::new(read_half)).await? {
        Some(line) => Ok(serde_json::from_str(&line)?),
        None => bail!("{socket_path}: connection closed before a response"),
    }
}

/// One trimmed line, or `None` once the peer has closed.
async fn read_line<R>(reader: &mut R) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = String::new();
    if reader.read_line(&mut buf).await? == 0 {
        return Ok(None);
    }
    Ok(Some(buf.trim().to_owned()))
}

async fn write_frame<W, T>(writer: &mut W, msg: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut line = serde_json::to_vec(msg)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    Ok(())
}
