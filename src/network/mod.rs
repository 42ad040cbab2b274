pub mod client;
pub mod connection;
pub mod session;

pub use client::{Client, SessionOutcome};
pub use connection::{open_transport, BoxedTransport, ConnectTarget, Transport};
pub use session::{DumpOutcome, ProtocolSession, SessionConfig, SessionState};
