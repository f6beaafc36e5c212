use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the Aegis gateway server
#[derive(Debug, Parser)]
#[command(name = "aegis", version, about = "Cost-aware LLM gateway")]
pub struct Cli {
    /// Configuration file (defaults to ~/.aegis/config.toml, created on first run)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to listen on, overriding the configured one
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Serve from in-process mock backends instead of HTTP endpoints
    #[arg(long)]
    pub mock: bool,
}
