use clap::Parser;

use crate::config::BackendKind;

#[derive(Parser, Debug)]
#[command(name = "aparajito-server", about = "Aparajito native playback host")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/aparajito.toml")]
    pub config: String,

    /// Path to directory containing built web UI files (overrides config)
    #[arg(long)]
    pub web_dir: Option<String>,

    /// Playback engine to drive (overrides config)
    #[arg(long, value_enum)]
    pub backend: Option<BackendKind>,
}
