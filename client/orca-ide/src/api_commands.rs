//! One-shot REST commands against a running server.

use crate::commands::Commands;

use orca_api::{ClientResult, OrcaClient};

use serde_json::{Value, json};

/// Execute a REST command and return its JSON output.
///
/// `Run` is handled by the supervisor and yields `Value::Null` here.
pub(crate) async fn execute(client: &OrcaClient, command: Commands) -> ClientResult<Value> {
    let value = match command {
        Commands::Run { .. } => Value::Null,
        Commands::Status => json!({
            "url": client.base_url,
            "reachable": client.is_connectable().await,
        }),
        Commands::Stop => json!({ "message": client.shutdown().await? }),
        Commands::Load { config_file } => {
            client.load_config(&config_file).await?;
            json!({ "loaded": config_file })
        }
        Commands::Workflows => json!(client.workflow_names().await?),
        Commands::Methods => json!(client.method_names().await?),
        Commands::Inputs { method } => json!(client.method_input_labwares(&method).await?),
        Commands::Outputs { method } => json!(client.method_output_labwares(&method).await?),
        Commands::Labwares => json!(client.labware_names().await?),
        Commands::Locations => json!(client.location_names().await?),
    };

    Ok(value)
}
