use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "assetlens")]
#[command(about = "AssetLens CLI", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Identify an object from an image file
    Identify(IdentifyArgs),
}

#[derive(clap::Args, Debug)]
pub struct IdentifyArgs {
    /// Path to the image to submit
    pub image: PathBuf,

    /// Identification service base URL (overrides configuration)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Path to a configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
}
