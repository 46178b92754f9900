use crate::commands::Commands;

use clap::Parser;

#[derive(Parser)]
#[command(name = "orca-ide")]
#[command(about = "Start, watch and stop a local Orca lab-automation server")]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub(crate) command: Commands,

    /// Server URL (overrides server.base_url and ORCA_URL)
    #[arg(long, global = true)]
    pub(crate) server: Option<String>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub(crate) pretty: bool,
}
