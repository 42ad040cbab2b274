use crate::error::{MiniTelError, Result};
use crate::protocol::codec::LENGTH_PREFIX_SIZE;
use std::io::ErrorKind;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, instrument, trace};

pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeouts bounding every transport operation of a session.
#[derive(Debug, Clone)]
pub struct WireConfig {
    pub read_timeout: Duration,
    pub write_timeout: Duration,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }
}

impl WireConfig {
    pub fn new(read_timeout: Duration, write_timeout: Duration) -> Self {
        Self {
            read_timeout,
            write_timeout,
        }
    }

    /// Use the same timeout for reads and writes
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new(timeout, timeout)
    }
}

fn map_io_error(e: std::io::Error, operation: &str) -> MiniTelError {
    match e.kind() {
        ErrorKind::UnexpectedEof => {
            MiniTelError::connection(format!("connection closed by peer while {}", operation))
        }
        _ => MiniTelError::connection(format!("failed while {}: {}", operation, e)),
    }
}

/// Read one complete length-prefixed frame and return its raw wire bytes
/// (prefix included), bounded by `timeout`.
#[instrument(level = "debug", skip(reader), fields(timeout_ms = timeout.as_millis() as u64))]
pub async fn read_frame(
    reader: &mut (impl AsyncRead + Unpin),
    timeout: Duration,
) -> Result<Vec<u8>> {
    let start_time = Instant::now();

    match tokio::time::timeout(timeout, read_frame_unbounded(reader)).await {
        Ok(result) => {
            debug!("Frame read completed in {:?}", start_time.elapsed());
            result
        }
        Err(_elapsed) => {
            error!(
                timeout = ?timeout,
                elapsed = ?start_time.elapsed(),
                "Read operation timed out"
            );
            Err(MiniTelError::ConnectionTimeout { timeout })
        }
    }
}

async fn read_frame_unbounded(reader: &mut (impl AsyncRead + Unpin)) -> Result<Vec<u8>> {
    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    reader
        .read_exact(&mut prefix)
        .await
        .map_err(|e| map_io_error(e, "reading length prefix"))?;

    let length = u16::from_be_bytes(prefix) as usize;
    trace!(length, "Read length prefix");

    let mut wire = Vec::with_capacity(LENGTH_PREFIX_SIZE + length);
    wire.extend_from_slice(&prefix);
    wire.resize(LENGTH_PREFIX_SIZE + length, 0);

    reader
        .read_exact(&mut wire[LENGTH_PREFIX_SIZE..])
        .await
        .map_err(|e| map_io_error(e, "reading frame body"))?;

    Ok(wire)
}

/// Write an encoded frame and flush it, bounded by `timeout`.
#[instrument(level = "debug", skip(writer, wire), fields(wire_size = wire.len(), timeout_ms = timeout.as_millis() as u64))]
pub async fn write_frame(
    writer: &mut (impl AsyncWrite + Unpin),
    wire: &[u8],
    timeout: Duration,
) -> Result<()> {
    let write = async {
        writer
            .write_all(wire)
            .await
            .map_err(|e| map_io_error(e, "writing frame"))?;
        writer
            .flush()
            .await
            .map_err(|e| map_io_error(e, "flushing frame"))
    };

    match tokio::time::timeout(timeout, write).await {
        Ok(result) => result,
        Err(_elapsed) => {
            error!(timeout = ?timeout, "Write operation timed out");
            Err(MiniTelError::ConnectionTimeout { timeout })
        }
    }
}
