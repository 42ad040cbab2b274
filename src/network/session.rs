//! Client-side protocol state machine.
//!
//! States: Disconnected → Connected → Authenticated → (DumpPending ⇄ DumpFailed)
//! → DumpOk → Stopped
//!
//! Exactly one request is outstanding at a time. Any integrity, nonce or
//! command violation tears the connection down immediately and returns the
//! session to Disconnected. No retries, no resynchronization.

use crate::error::{MiniTelError, Result};
use crate::protocol::{read_frame, write_frame, Command, Frame, FrameCodec, NonceSequencer, WireConfig};
use crate::recording::{Direction, RecordedEvent, SessionRecorder};
use std::fmt;
use std::path::Path;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, info_span, warn, Instrument, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
    Authenticated,
    DumpPending,
    DumpFailed,
    DumpOk,
    Stopped,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connected => "connected",
            SessionState::Authenticated => "authenticated",
            SessionState::DumpPending => "dump pending",
            SessionState::DumpFailed => "dump failed",
            SessionState::DumpOk => "dump ok",
            SessionState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub wire: WireConfig,
    /// Upper bound on DUMP attempts in `retrieve_secret`. `None` retries
    /// until DUMP_OK or a connection failure.
    pub max_dump_attempts: Option<u32>,
}

/// Result of a single DUMP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DumpOutcome {
    /// DUMP_FAILED: a normal outcome, the caller should retry.
    Failed,
    /// DUMP_OK with the secret payload.
    Secret(Vec<u8>),
}

pub struct ProtocolSession<T> {
    transport: Option<T>,
    state: SessionState,
    sequencer: NonceSequencer,
    recorder: SessionRecorder,
    config: SessionConfig,
    secret: Option<Vec<u8>>,
    span: Span,
}

impl<T> ProtocolSession<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(config: SessionConfig, recorder: SessionRecorder) -> Self {
        Self {
            transport: None,
            state: SessionState::Disconnected,
            sequencer: NonceSequencer::new(),
            recorder,
            config,
            secret: None,
            span: info_span!("minitel_session"),
        }
    }

    /// Emit all session log events inside `span` instead of the default one.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    /// The secret from the last DUMP_OK, if any.
    pub fn secret(&self) -> Option<&[u8]> {
        self.secret.as_deref()
    }

    /// Nonce the next client frame will carry.
    pub fn next_nonce(&self) -> u32 {
        self.sequencer.current()
    }

    pub fn recorded_events(&self) -> &[RecordedEvent] {
        self.recorder.events()
    }

    pub fn recording_path(&self) -> Option<&Path> {
        self.recorder.saved_path()
    }

    /// Take ownership of an established transport. `Disconnected → Connected`.
    pub fn connect(&mut self, transport: T) -> Result<()> {
        if self.transport.is_some()
            || !matches!(self.state, SessionState::Disconnected | SessionState::Stopped)
        {
            return Err(MiniTelError::InvalidState {
                operation: "connect",
                state: self.state,
            });
        }

        self.transport = Some(transport);
        self.sequencer.reset();
        self.secret = None;
        self.recorder.start();
        self.state = SessionState::Connected;
        self.span.in_scope(|| info!("Session connected"));
        Ok(())
    }

    /// HELLO → HELLO_ACK. `Connected → Authenticated`.
    pub async fn hello(&mut self) -> Result<()> {
        self.require(&[SessionState::Connected], "hello")?;

        let span = self.span.clone();
        let result = self
            .exchange(Command::Hello, &[Command::HelloAck])
            .instrument(span)
            .await;

        match result {
            Ok(ack) => {
                self.state = SessionState::Authenticated;
                self.span
                    .in_scope(|| info!(nonce = ack.nonce(), "Handshake acknowledged"));
                Ok(())
            }
            Err(e) if e.is_protocol_error() => Err(MiniTelError::Handshake {
                reason: e.to_string(),
            }),
            Err(e) => Err(e),
        }
    }

    /// DUMP → DUMP_FAILED | DUMP_OK.
    ///
    /// DUMP_FAILED leaves the session in `DumpFailed`, ready for another
    /// attempt. DUMP_OK stores the secret and moves to `DumpOk`.
    pub async fn dump(&mut self) -> Result<DumpOutcome> {
        self.require(
            &[SessionState::Authenticated, SessionState::DumpFailed],
            "dump",
        )?;
        self.state = SessionState::DumpPending;

        let span = self.span.clone();
        let response = self
            .exchange(Command::Dump, &[Command::DumpFailed, Command::DumpOk])
            .instrument(span)
            .await?;

        let _guard = self.span.enter();
        if response.command() == Command::DumpOk {
            self.state = SessionState::DumpOk;
            let secret = response.into_payload();
            info!(secret_size = secret.len(), "Secret retrieved");
            self.secret = Some(secret.clone());
            Ok(DumpOutcome::Secret(secret))
        } else {
            self.state = SessionState::DumpFailed;
            info!("Server answered DUMP_FAILED");
            Ok(DumpOutcome::Failed)
        }
    }

    /// Repeat `dump` until the server hands over the secret.
    pub async fn retrieve_secret(&mut self) -> Result<Vec<u8>> {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            if let DumpOutcome::Secret(secret) = self.dump().await? {
                self.span
                    .in_scope(|| debug!(attempts, "Secret retrieved after retries"));
                return Ok(secret);
            }

            if let Some(max) = self.config.max_dump_attempts {
                if attempts >= max {
                    self.span.in_scope(|| warn!(attempts, "Giving up on DUMP"));
                    return Err(MiniTelError::DumpAttemptsExhausted { attempts });
                }
            }
        }
    }

    /// STOP_CMD → STOP_OK. Closes the transport and finalizes the recording.
    pub async fn stop(&mut self) -> Result<()> {
        self.require(
            &[
                SessionState::Authenticated,
                SessionState::DumpFailed,
                SessionState::DumpOk,
            ],
            "stop",
        )?;

        let span = self.span.clone();
        self.exchange(Command::StopCmd, &[Command::StopOk])
            .instrument(span)
            .await?;

        self.close_transport().await;
        self.state = SessionState::Stopped;
        self.span.in_scope(|| info!("Session stopped"));
        self.recorder.finalize()?;
        Ok(())
    }

    /// Abandon the session: close the transport and finalize the recording.
    pub async fn disconnect(&mut self) {
        if self.transport.is_none() {
            return;
        }
        self.teardown().await;
    }

    fn require(&self, allowed: &[SessionState], operation: &'static str) -> Result<()> {
        if self.transport.is_some() && allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(MiniTelError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    /// Send one client frame and wait for its verified response.
    ///
    /// The response must decode, carry the expected nonce, and use one of the
    /// `accepted` commands. Anything else aborts the session.
    async fn exchange(&mut self, command: Command, accepted: &[Command]) -> Result<Frame> {
        let nonce = self.sequencer.next_client_nonce();
        let request = Frame::empty(command, nonce);

        let wire = match FrameCodec::encode(&request) {
            Ok(wire) => wire,
            Err(e) => return Err(self.abort(Direction::Client, Some(&request), &[], e).await),
        };

        let write_timeout = self.config.wire.write_timeout;
        let read_timeout = self.config.wire.read_timeout;

        let sent = match self.transport.as_mut() {
            Some(transport) => write_frame(transport, &wire, write_timeout).await,
            None => Err(MiniTelError::connection("transport is not connected")),
        };
        if let Err(e) = sent {
            return Err(self.abort(Direction::Client, Some(&request), &wire, e).await);
        }
        self.recorder.record_sent(&request, &wire);
        debug!(command = %command, nonce, hash = %request.hash_hex(), "Sent frame");

        let received = match self.transport.as_mut() {
            Some(transport) => read_frame(transport, read_timeout).await,
            None => Err(MiniTelError::connection("transport is not connected")),
        };
        let raw = match received {
            Ok(raw) => raw,
            Err(e) => return Err(self.abort(Direction::Server, None, &[], e).await),
        };

        let response = match FrameCodec::decode(&raw) {
            Ok(frame) => frame,
            Err(e) => return Err(self.abort(Direction::Server, None, &raw, e).await),
        };

        if let Err(e) = self.sequencer.validate_server_nonce(response.nonce()) {
            return Err(self
                .abort(Direction::Server, Some(&response), &raw, e)
                .await);
        }

        if !accepted.contains(&response.command()) {
            let violation = MiniTelError::ProtocolViolation {
                state: self.state,
                received: response.command(),
            };
            return Err(self
                .abort(Direction::Server, Some(&response), &raw, violation)
                .await);
        }

        self.recorder.record_received(&response, &raw);
        debug!(
            command = %response.command(),
            nonce = response.nonce(),
            payload_size = response.payload().len(),
            "Received frame"
        );
        Ok(response)
    }

    /// Record the terminal failure, drop the connection, and hand back the error.
    async fn abort(
        &mut self,
        direction: Direction,
        frame: Option<&Frame>,
        raw: &[u8],
        err: MiniTelError,
    ) -> MiniTelError {
        error!(
            error = %err,
            kind = err.kind(),
            state = %self.state,
            "Fatal session error, disconnecting"
        );
        self.recorder.record_failure(direction, frame, raw, &err);
        self.teardown().await;
        err
    }

    async fn teardown(&mut self) {
        self.close_transport().await;
        self.state = SessionState::Disconnected;
        if let Err(e) = self.recorder.finalize() {
            self.span
                .in_scope(|| warn!(error = %e, "Failed to save session recording"));
        }
    }

    async fn close_transport(&mut self) {
        let Some(mut transport) = self.transport.take() else {
            return;
        };
        let timeout = self.config.wire.write_timeout;
        match tokio::time::timeout(timeout, transport.shutdown()).await {
            Ok(Ok(())) => self.span.in_scope(|| debug!("Transport closed")),
            Ok(Err(e)) => self
                .span
                .in_scope(|| warn!(error = %e, "Error while closing transport")),
            Err(_) => self
                .span
                .in_scope(|| warn!(timeout = ?timeout, "Timed out closing transport")),
        }
    }
}
