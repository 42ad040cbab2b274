use crate::error::MiniTelError;
use crate::protocol::Frame;
use crate::recording::errors::Result;
use crate::recording::models::{now_ms, Direction, RecordedEvent, Recording};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn, Span};

struct ActiveRecording {
    recording: Recording,
    directory: PathBuf,
    /// Set once a terminal (invalid) event has been appended.
    closed: bool,
    saved_to: Option<PathBuf>,
}

/// Collects the frames of a live session for later audit.
///
/// A disabled recorder has the same interface but holds no events and never
/// touches the filesystem.
pub struct SessionRecorder {
    active: Option<ActiveRecording>,
    span: Span,
}

impl SessionRecorder {
    /// A recorder that writes into `directory` when finalized.
    pub fn enabled(directory: impl Into<PathBuf>) -> Self {
        Self {
            active: Some(ActiveRecording {
                recording: Recording::new(),
                directory: directory.into(),
                closed: false,
                saved_to: None,
            }),
            span: Span::none(),
        }
    }

    pub fn disabled() -> Self {
        Self {
            active: None,
            span: Span::none(),
        }
    }

    pub fn from_config(record: bool, directory: &Path) -> Self {
        if record {
            Self::enabled(directory)
        } else {
            Self::disabled()
        }
    }

    /// Emit the recorder's log events inside `span`.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.active.is_some()
    }

    /// Begin a fresh recording, discarding any unsaved events.
    pub fn start(&mut self) {
        let _guard = self.span.enter();
        if let Some(active) = self.active.as_mut() {
            active.recording = Recording::new();
            active.closed = false;
            active.saved_to = None;
            debug!(session_id = %active.recording.session_id, "Session recording started");
        }
    }

    pub fn record_sent(&mut self, frame: &Frame, raw: &[u8]) {
        self.push(RecordedEvent::accepted(Direction::Client, frame, raw));
    }

    pub fn record_received(&mut self, frame: &Frame, raw: &[u8]) {
        self.push(RecordedEvent::accepted(Direction::Server, frame, raw));
    }

    /// Append the terminal invalid event; later events are ignored.
    pub fn record_failure(
        &mut self,
        direction: Direction,
        frame: Option<&Frame>,
        raw: &[u8],
        error: &MiniTelError,
    ) {
        self.push(RecordedEvent::rejected(
            direction,
            frame,
            raw,
            error.kind(),
            error.to_string(),
        ));
        if let Some(active) = self.active.as_mut() {
            active.closed = true;
        }
    }

    fn push(&mut self, event: RecordedEvent) {
        let _guard = self.span.enter();
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if active.closed || active.saved_to.is_some() {
            warn!("Dropping event recorded after the recording was closed");
            return;
        }
        debug!(
            direction = event.direction.as_str(),
            valid = event.valid,
            index = active.recording.events.len(),
            "Recorded event"
        );
        active.recording.events.push(event);
    }

    pub fn events(&self) -> &[RecordedEvent] {
        self.active
            .as_ref()
            .map(|active| active.recording.events.as_slice())
            .unwrap_or(&[])
    }

    pub fn recording(&self) -> Option<&Recording> {
        self.active.as_ref().map(|active| &active.recording)
    }

    /// Where the recording was written, once finalized.
    pub fn saved_path(&self) -> Option<&Path> {
        self.active.as_ref().and_then(|a| a.saved_to.as_deref())
    }

    /// Write the recording to disk. Repeated calls return the first path.
    pub fn finalize(&mut self) -> Result<Option<PathBuf>> {
        let _guard = self.span.enter();
        let Some(active) = self.active.as_mut() else {
            return Ok(None);
        };
        if let Some(path) = &active.saved_to {
            return Ok(Some(path.clone()));
        }

        active.recording.finished_at_ms = Some(now_ms());
        let path = active.directory.join(active.recording.file_name());
        active.recording.save(&path)?;

        info!(
            path = %path.display(),
            events = active.recording.events.len(),
            "Session recording saved"
        );
        active.saved_to = Some(path.clone());
        Ok(Some(path))
    }
}
