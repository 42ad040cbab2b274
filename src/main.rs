use anyhow::Result;
use clap::Parser;
use minitel::cli::{run_client, Cli};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let outcome = run_client(&cli).await?;

    println!("Connection completed successfully");
    println!("Secret: {}", outcome.secret_text());
    match &outcome.recording_path {
        Some(path) => println!("Session recording saved to: {}", path.display()),
        None if outcome.recording_enabled => println!("No session recording saved"),
        None => {}
    }
    Ok(())
}
