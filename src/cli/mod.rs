pub mod app;
pub mod commands;
pub mod display;

pub use app::{run_client, Config};
pub use commands::{Cli, ReplayCli};
pub use display::{format_event, format_recording_header, run_replay, ReplayCommand};
