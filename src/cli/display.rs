use crate::recording::{RecordedEvent, Recording, SessionReplayer};
use std::io::{self, BufRead, Write};

/// Longest payload preview shown on a single line.
const PAYLOAD_PREVIEW_LIMIT: usize = 64;

fn payload_preview(payload: &[u8]) -> String {
    if payload.is_empty() {
        return "(empty)".to_string();
    }
    let shown = &payload[..payload.len().min(PAYLOAD_PREVIEW_LIMIT)];
    let mut text = match std::str::from_utf8(shown) {
        Ok(s) if s.chars().all(|c| !c.is_control()) => format!("\"{}\"", s),
        _ => format!("0x{}", hex::encode(shown)),
    };
    if payload.len() > PAYLOAD_PREVIEW_LIMIT {
        text.push_str(&format!(" ... ({} bytes)", payload.len()));
    }
    text
}

fn format_timestamp(timestamp_ms: u64) -> String {
    format!("{}.{:03}s", timestamp_ms / 1000, timestamp_ms % 1000)
}

/// Render one recorded event as a small text block.
pub fn format_event(event: &RecordedEvent, index: usize, total: usize) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Step {} of {}", index + 1, total));
    lines.push(format!(
        "{} {} at {}",
        event.direction.arrow(),
        event.direction.as_str().to_uppercase(),
        format_timestamp(event.timestamp_ms)
    ));

    match &event.frame {
        Some(frame) => {
            lines.push(format!("Command: {}", frame.command));
            lines.push(format!("Nonce:   {}", frame.nonce));
            lines.push(format!("Payload: {}", payload_preview(&frame.payload)));
        }
        None => lines.push("Command: <undecodable>".to_string()),
    }

    if event.valid {
        lines.push("Status:  VALID".to_string());
    } else {
        lines.push(format!(
            "Status:  INVALID ({})",
            event.error_kind.as_deref().unwrap_or("unknown error")
        ));
        if let Some(error) = &event.error {
            lines.push(format!("Error:   {}", error));
        }
    }
    lines.push(format!("Raw:     {} bytes", event.raw.len()));
    lines.join("\n")
}

pub fn format_recording_header(recording: &Recording) -> String {
    format!(
        "MiniTel-Lite session {} ({} events{})",
        recording.session_id,
        recording.events.len(),
        if recording.is_finished() { "" } else { ", unfinished" }
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayCommand {
    Next,
    Previous,
    Quit,
}

impl ReplayCommand {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "n" | "next" => Some(ReplayCommand::Next),
            "p" | "prev" | "previous" => Some(ReplayCommand::Previous),
            "q" | "quit" | "exit" => Some(ReplayCommand::Quit),
            _ => None,
        }
    }
}

fn show_current(replayer: &SessionReplayer, output: &mut impl Write) -> io::Result<()> {
    match replayer.current() {
        Some(event) => writeln!(
            output,
            "{}",
            format_event(event, replayer.position(), replayer.len())
        ),
        None => writeln!(output, "(recording contains no events)"),
    }
}

/// Drive a replayer from line-based input until `quit` or end of input.
pub fn run_replay(
    replayer: &mut SessionReplayer,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> io::Result<()> {
    writeln!(output, "{}", format_recording_header(replayer.recording()))?;
    writeln!(output, "[n]ext | [p]revious | [q]uit")?;
    show_current(replayer, output)?;

    let mut line = String::new();
    loop {
        write!(output, "> ")?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Ok(());
        }

        match ReplayCommand::parse(&line) {
            Some(ReplayCommand::Next) => {
                if replayer.is_at_end() {
                    writeln!(output, "(already at last step)")?;
                }
                replayer.next();
                show_current(replayer, output)?;
            }
            Some(ReplayCommand::Previous) => {
                if replayer.is_at_start() {
                    writeln!(output, "(already at first step)")?;
                }
                replayer.previous();
                show_current(replayer, output)?;
            }
            Some(ReplayCommand::Quit) => return Ok(()),
            None => writeln!(output, "Unknown command '{}': use n, p or q", line.trim())?,
        }
    }
}
