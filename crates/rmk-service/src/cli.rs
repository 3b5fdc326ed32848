//! Command-line surface: just enough to point the service at a config file
//! and override the bits operators change most often at launch.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "rmk-service")]
#[command(about = "Reflective Memory Kernel service", long_about = None)]
pub struct Cli {
    /// Path to the TOML config file.
    #[arg(long, env = "RMK_CONFIG", default_value = "config/rmk.toml")]
    pub config: String,

    /// Run against in-memory backends instead of Dgraph/Qdrant/Redis, for
    /// local development and demos.
    #[arg(long)]
    pub dev: bool,
}
