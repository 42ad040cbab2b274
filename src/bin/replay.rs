use anyhow::{Context, Result};
use clap::Parser;
use minitel::cli::{run_replay, ReplayCli};
use minitel::recording::SessionReplayer;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = ReplayCli::parse();

    let mut replayer = SessionReplayer::load(&cli.recording).with_context(|| {
        format!("Failed to load recording {}", cli.recording.display())
    })?;

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    run_replay(&mut replayer, &mut stdin.lock(), &mut stdout.lock())
        .context("Replay terminated with an I/O error")?;
    Ok(())
}
