use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "minitel")]
#[command(about = "MiniTel-Lite v3 client: authenticate, retrieve the secret, disconnect")]
#[command(version)]
pub struct Cli {
    /// Server hostname or IP address
    #[arg(long)]
    pub host: Option<String>,

    /// Server port
    #[arg(long)]
    pub port: Option<u16>,

    /// Wrap the TCP connection in TLS
    #[arg(long)]
    pub tls: bool,

    /// Record every frame of the session to a JSON file
    #[arg(long, alias = "record-session")]
    pub record: bool,

    /// Directory where session recordings are written
    #[arg(long, value_name = "DIR")]
    pub recording_dir: Option<PathBuf>,

    /// Read/write timeout in seconds for each frame
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Give up after this many DUMP attempts (default: retry until DUMP_OK)
    #[arg(long, value_name = "N")]
    pub max_dump_attempts: Option<u32>,

    /// Configuration file (TOML). Defaults to the platform config directory.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
#[command(name = "minitel-replay")]
#[command(about = "Step through a recorded MiniTel-Lite session")]
#[command(after_help = "Controls: n/next, p/prev, q/quit")]
pub struct ReplayCli {
    /// Path to the session recording file
    pub recording: PathBuf,
}
