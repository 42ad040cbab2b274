pub mod cli;
pub mod error;
pub mod network;
pub mod protocol;
pub mod recording;

// Re-export key types for easy testing
pub use error::{MiniTelError, Result};
pub use network::{Client, ProtocolSession, SessionConfig, SessionState};
pub use protocol::{Command, Frame, FrameCodec, NonceSequencer};
pub use recording::{Recording, SessionRecorder, SessionReplayer};
