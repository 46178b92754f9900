use clap::Subcommand;

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Launch (or adopt) the server and supervise it until Ctrl+C
    Run {
        /// Orca YAML configuration to load once the server is up
        #[arg(long)]
        load: Option<String>,
    },

    /// Report whether the server answers
    Status,

    /// Ask a running server to shut down
    Stop,

    /// Load an Orca YAML configuration file
    Load {
        /// Path of the YAML file, as seen by the server
        config_file: String,
    },

    /// List workflow recipe names
    Workflows,

    /// List method recipe names
    Methods,

    /// List the labware a method consumes
    Inputs {
        /// Method recipe name
        method: String,
    },

    /// List the labware a method produces
    Outputs {
        /// Method recipe name
        method: String,
    },

    /// List labware names
    Labwares,

    /// List location names
    Locations,
}
