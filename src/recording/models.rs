use crate::protocol::Frame;
use crate::recording::errors::{RecordingError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

pub const RECORDING_FORMAT_VERSION: u32 = 1;

/// Serde adapter storing byte buffers as standard base64 strings.
mod base64_bytes {
    use base64::{engine::general_purpose, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        general_purpose::STANDARD
            .decode(encoded)
            .map_err(serde::de::Error::custom)
    }
}

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Client,
    Server,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Client => "client",
            Direction::Server => "server",
        }
    }

    /// Arrow used when displaying the event, from the client's point of view.
    pub fn arrow(&self) -> &'static str {
        match self {
            Direction::Client => "->",
            Direction::Server => "<-",
        }
    }
}

/// Decoded view of a frame as stored in a recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedFrame {
    pub command: String,
    pub nonce: u32,
    #[serde(with = "base64_bytes")]
    pub payload: Vec<u8>,
}

impl From<&Frame> for RecordedFrame {
    fn from(frame: &Frame) -> Self {
        Self {
            command: frame.command().name().to_string(),
            nonce: frame.nonce(),
            payload: frame.payload().to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedEvent {
    pub direction: Direction,
    pub timestamp_ms: u64,
    /// `None` when the wire bytes never decoded into a frame.
    pub frame: Option<RecordedFrame>,
    #[serde(with = "base64_bytes")]
    pub raw: Vec<u8>,
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecordedEvent {
    pub fn accepted(direction: Direction, frame: &Frame, raw: &[u8]) -> Self {
        Self {
            direction,
            timestamp_ms: now_ms(),
            frame: Some(RecordedFrame::from(frame)),
            raw: raw.to_vec(),
            valid: true,
            error_kind: None,
            error: None,
        }
    }

    /// `frame` is the decoded frame when the failure came after decoding
    /// (a nonce or command violation), `None` when the bytes never decoded.
    pub fn rejected(
        direction: Direction,
        frame: Option<&Frame>,
        raw: &[u8],
        error_kind: &str,
        error: String,
    ) -> Self {
        Self {
            direction,
            timestamp_ms: now_ms(),
            frame: frame.map(RecordedFrame::from),
            raw: raw.to_vec(),
            valid: false,
            error_kind: Some(error_kind.to_string()),
            error: Some(error),
        }
    }
}

/// An ordered log of one session's frame exchanges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recording {
    pub version: u32,
    pub session_id: Uuid,
    pub started_at_ms: u64,
    pub finished_at_ms: Option<u64>,
    pub events: Vec<RecordedEvent>,
}

impl Default for Recording {
    fn default() -> Self {
        Self::new()
    }
}

impl Recording {
    pub fn new() -> Self {
        Self {
            version: RECORDING_FORMAT_VERSION,
            session_id: Uuid::new_v4(),
            started_at_ms: now_ms(),
            finished_at_ms: None,
            events: Vec::new(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished_at_ms.is_some()
    }

    /// File name used when the recording is persisted into a directory.
    pub fn file_name(&self) -> String {
        let id = self.session_id.simple().to_string();
        format!(
            "minitel_recording_{}_{}.json",
            self.started_at_ms / 1000,
            &id[..8]
        )
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| RecordingError::io(path, e))?;
        let recording: Recording = serde_json::from_str(&content)?;
        if recording.version != RECORDING_FORMAT_VERSION {
            return Err(RecordingError::UnsupportedVersion {
                found: recording.version,
                expected: RECORDING_FORMAT_VERSION,
            });
        }
        Ok(recording)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| RecordingError::io(parent, e))?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| RecordingError::io(path, e))
    }
}
