use crate::network::SessionState;
use crate::protocol::Command;
use crate::recording::RecordingError;
use std::time::Duration;
use thiserror::Error;

/// Every failure a MiniTel-Lite session can produce.
///
/// Protocol-layer errors are terminal: the session that raised them has
/// already disconnected by the time the caller sees them. `InvalidState`
/// and `DumpAttemptsExhausted` leave the session untouched.
#[derive(Error, Debug)]
pub enum MiniTelError {
    #[error("Base64 decoding failed: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("Malformed frame: {reason}")]
    MalformedFrame { reason: String },

    #[error("Frame hash validation failed (expected {expected}, got {received})")]
    Integrity { expected: String, received: String },

    #[error("Nonce mismatch: expected {expected:?}, got {received}")]
    Nonce { expected: Option<u32>, received: u32 },

    #[error("Unknown command byte: 0x{byte:02X}")]
    UnknownCommand { byte: u8 },

    #[error("Unexpected {received} response while {state}")]
    ProtocolViolation {
        state: SessionState,
        received: Command,
    },

    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("Server kept answering DUMP_FAILED after {attempts} attempts")]
    DumpAttemptsExhausted { attempts: u32 },

    #[error("Handshake failed: {reason}")]
    Handshake { reason: String },

    #[error("Connection error: {reason}")]
    Connection { reason: String },

    #[error("Operation timed out after {timeout:?}")]
    ConnectionTimeout { timeout: Duration },

    #[error("Recording error: {0}")]
    Recording(#[from] RecordingError),
}

impl MiniTelError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        MiniTelError::MalformedFrame {
            reason: reason.into(),
        }
    }

    pub fn connection(reason: impl Into<String>) -> Self {
        MiniTelError::Connection {
            reason: reason.into(),
        }
    }

    /// Stable name of the error category, as stored in recordings.
    pub fn kind(&self) -> &'static str {
        match self {
            MiniTelError::Encoding(_) => "EncodingError",
            MiniTelError::MalformedFrame { .. } => "MalformedFrameError",
            MiniTelError::Integrity { .. } => "IntegrityError",
            MiniTelError::Nonce { .. } => "NonceError",
            MiniTelError::UnknownCommand { .. } => "UnknownCommandError",
            MiniTelError::ProtocolViolation { .. } => "ProtocolViolationError",
            MiniTelError::InvalidState { .. } => "InvalidStateError",
            MiniTelError::DumpAttemptsExhausted { .. } => "DumpAttemptsExhaustedError",
            MiniTelError::Handshake { .. } => "HandshakeError",
            MiniTelError::Connection { .. } => "ConnectionError",
            MiniTelError::ConnectionTimeout { .. } => "ConnectionTimeoutError",
            MiniTelError::Recording(_) => "RecordingError",
        }
    }

    /// Whether the error originates from the peer violating the protocol
    /// (as opposed to transport or local failures).
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            MiniTelError::Encoding(_)
                | MiniTelError::MalformedFrame { .. }
                | MiniTelError::Integrity { .. }
                | MiniTelError::Nonce { .. }
                | MiniTelError::UnknownCommand { .. }
                | MiniTelError::ProtocolViolation { .. }
                | MiniTelError::Handshake { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, MiniTelError>;
