use crate::error::{MiniTelError, Result};
use crate::network::connection::{open_transport, ConnectTarget, Transport};
use crate::network::session::{ProtocolSession, SessionConfig};
use crate::recording::SessionRecorder;
use std::path::PathBuf;
use tracing::{debug, info, info_span, warn, Instrument};

/// What a complete HELLO → DUMP → STOP run produced.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub secret: Vec<u8>,
    /// Whether the session ran with recording on, from the CLI or the config file.
    pub recording_enabled: bool,
    pub recording_path: Option<PathBuf>,
}

impl SessionOutcome {
    pub fn secret_text(&self) -> String {
        String::from_utf8_lossy(&self.secret).into_owned()
    }
}

/// Runs the full retrieval flow against one server.
pub struct Client {
    target: ConnectTarget,
    session_config: SessionConfig,
    record: bool,
    recording_dir: PathBuf,
}

impl Client {
    pub fn new(target: ConnectTarget, session_config: SessionConfig) -> Self {
        Self {
            target,
            session_config,
            record: false,
            recording_dir: PathBuf::from("recordings"),
        }
    }

    pub fn with_recording(mut self, record: bool, recording_dir: impl Into<PathBuf>) -> Self {
        self.record = record;
        self.recording_dir = recording_dir.into();
        self
    }

    /// Connect, authenticate, retrieve the secret and stop.
    pub async fn run(&self) -> Result<SessionOutcome> {
        let span = info_span!("minitel_session", address = %self.target.address());
        let transport = open_transport(&self.target)
            .instrument(span.clone())
            .await?;
        self.run_over(transport, span).await
    }

    /// Same flow as `run` over an already established transport.
    pub async fn run_over<T: Transport>(
        &self,
        transport: T,
        span: tracing::Span,
    ) -> Result<SessionOutcome> {
        let recorder = SessionRecorder::from_config(self.record, &self.recording_dir)
            .with_span(span.clone());
        let mut session =
            ProtocolSession::new(self.session_config.clone(), recorder).with_span(span.clone());

        session.connect(transport)?;
        let result = async {
            session.hello().await?;
            let secret = session.retrieve_secret().await?;
            session.stop().await?;
            Ok::<_, MiniTelError>(secret)
        }
        .await;

        match result {
            Ok(secret) => {
                let recording_path = session.recording_path().map(|p| p.to_path_buf());
                span.in_scope(|| info!(state = %session.state(), "Session completed"));
                Ok(SessionOutcome {
                    secret,
                    recording_enabled: self.record,
                    recording_path,
                })
            }
            Err(e) => {
                // Fatal errors have already disconnected; this covers local
                // failures such as exhausted DUMP attempts.
                if session.is_connected() {
                    span.in_scope(|| warn!(error = %e, "Abandoning session"));
                    if let Err(stop_err) = session.stop().await {
                        span.in_scope(|| debug!(error = %stop_err, "Clean stop failed"));
                        session.disconnect().await;
                    }
                }
                if let Some(path) = session.recording_path() {
                    span.in_scope(|| {
                        warn!(path = %path.display(), "Failed session recording saved")
                    });
                }
                Err(e)
            }
        }
    }
}
