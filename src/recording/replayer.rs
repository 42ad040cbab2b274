use crate::recording::errors::Result;
use crate::recording::models::{RecordedEvent, Recording};
use std::path::Path;

/// Step-wise, read-only navigation over a finished recording.
///
/// Nothing is re-validated: events are shown exactly as they were captured.
pub struct SessionReplayer {
    recording: Recording,
    position: usize,
}

impl SessionReplayer {
    pub fn new(recording: Recording) -> Self {
        Self {
            recording,
            position: 0,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::new(Recording::load(path)?))
    }

    pub fn recording(&self) -> &Recording {
        &self.recording
    }

    pub fn current(&self) -> Option<&RecordedEvent> {
        self.recording.events.get(self.position)
    }

    /// Advance one step; stays put on the last event.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<&RecordedEvent> {
        if self.position + 1 < self.recording.events.len() {
            self.position += 1;
        }
        self.current()
    }

    /// Go back one step; stays put on the first event.
    pub fn previous(&mut self) -> Option<&RecordedEvent> {
        self.position = self.position.saturating_sub(1);
        self.current()
    }

    /// Jump to `index`, clamped to the last event.
    pub fn seek(&mut self, index: usize) -> Option<&RecordedEvent> {
        self.position = index.min(self.recording.events.len().saturating_sub(1));
        self.current()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.recording.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recording.events.is_empty()
    }

    pub fn is_at_start(&self) -> bool {
        self.position == 0
    }

    pub fn is_at_end(&self) -> bool {
        self.position + 1 >= self.recording.events.len()
    }
}
