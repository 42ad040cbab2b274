pub mod errors;
pub mod models;
pub mod recorder;
pub mod replayer;

pub use errors::RecordingError;
pub use models::{Direction, RecordedEvent, RecordedFrame, Recording, RECORDING_FORMAT_VERSION};
pub use recorder::SessionRecorder;
pub use replayer::SessionReplayer;
