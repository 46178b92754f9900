use crate::{ClientError, ClientResult};

use std::panic::Location;

use error_location::ErrorLocation;
use reqwest::{Client as ReqwestClient, Method, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::{info, warn};

/// Recipes keyed by name, in the order the server listed them
pub type RecipeMap = Map<String, Value>;

/// HTTP client for the Orca server REST API
pub struct OrcaClient {
    pub base_url: String,
    client: ReqwestClient,
    config_loaded: watch::Sender<bool>,
}

impl OrcaClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `base_url` - Server URL (e.g., "http://127.0.0.1:5000")
    pub fn new(base_url: &str) -> Self {
        let (config_loaded, _) = watch::channel(false);
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: ReqwestClient::new(),
            config_loaded,
        }
    }

    /// Build a request for `path`, with optional query parameters
    fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
    ) -> ClientResult<reqwest::RequestBuilder> {
        let raw = format!("{}{}", self.base_url, path);
        let mut url = Url::parse(&raw).map_err(|e| ClientError::InvalidUrl {
            url: raw.clone(),
            message: e.to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;

        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        Ok(self.client.request(method, url))
    }

    /// Execute request and handle errors
    async fn execute(&self, req: reqwest::RequestBuilder) -> ClientResult<Value> {
        let response = req.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ClientError::api_error(
                status.as_u16(),
                error_message(&text).unwrap_or_else(|| status.to_string()),
            ));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_str(&text)?)
    }

    /// GET `path` and decode one field of the response body
    async fn get_field<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        field: &'static str,
    ) -> ClientResult<T> {
        let req = self.request(Method::GET, path, query)?;
        let mut body = self.execute(req).await?;

        let value = body
            .get_mut(field)
            .map(Value::take)
            .ok_or_else(|| ClientError::missing_field(field))?;

        Ok(serde_json::from_value(value)?)
    }

    // =========================================================================
    // Server Operations
    // =========================================================================

    /// Whether the server answers `GET /test` with a success status
    pub async fn is_connectable(&self) -> bool {
        match self.request(Method::GET, "/test", &[]) {
            Ok(req) => req
                .send()
                .await
                .is_ok_and(|response| response.status().is_success()),
            Err(_) => false,
        }
    }

    /// Load an Orca configuration file on the server
    pub async fn load_config(&self, config_file: &str) -> ClientResult<()> {
        #[derive(Serialize)]
        struct LoadRequest<'a> {
            config_file: &'a str,
        }

        info!("Loading YAML file: {config_file}");

        let result = match self.request(Method::POST, "/load", &[]) {
            Ok(req) => self.execute(req.json(&LoadRequest { config_file })).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(_) => {
                self.config_loaded.send_replace(true);
                info!("Loaded YAML file: {config_file}");
                Ok(())
            }
            Err(e) => {
                self.config_loaded.send_replace(false);
                warn!("Failed to load Orca config: {e}");
                Err(e)
            }
        }
    }

    /// Whether the last `load_config` succeeded
    pub fn config_loaded(&self) -> bool {
        *self.config_loaded.borrow()
    }

    /// Observe config-loaded changes
    pub fn subscribe_config_loaded(&self) -> watch::Receiver<bool> {
        self.config_loaded.subscribe()
    }

    /// Ask the server to shut down, returning its message if any
    pub async fn shutdown(&self) -> ClientResult<Option<String>> {
        let req = self.request(Method::GET, "/shutdown", &[])?;
        let body = self.execute(req).await?;

        Ok(body
            .get("message")
            .and_then(Value::as_str)
            .map(String::from))
    }

    // =========================================================================
    // Recipe Operations
    // =========================================================================

    pub async fn workflow_recipes(&self) -> ClientResult<RecipeMap> {
        self.get_field("/get_workflow_recipes", &[], "workflow_recipes")
            .await
    }

    /// Workflow names, in server order
    pub async fn workflow_names(&self) -> ClientResult<Vec<String>> {
        Ok(self.workflow_recipes().await?.keys().cloned().collect())
    }

    pub async fn method_recipes(&self) -> ClientResult<RecipeMap> {
        self.get_field("/get_method_recipes", &[], "method_recipes")
            .await
    }

    /// Method names, in server order
    pub async fn method_names(&self) -> ClientResult<Vec<String>> {
        Ok(self.method_recipes().await?.keys().cloned().collect())
    }

    /// Labware a method recipe consumes
    pub async fn method_input_labwares(&self, method_name: &str) -> ClientResult<Vec<String>> {
        self.get_field(
            "/get_method_recipe_input_labwares",
            &[("method_name", method_name)],
            "input_labwares",
        )
        .await
    }

    /// Labware a method recipe produces
    pub async fn method_output_labwares(&self, method_name: &str) -> ClientResult<Vec<String>> {
        self.get_field(
            "/get_method_recipe_output_labwares",
            &[("method_name", method_name)],
            "output_labwares",
        )
        .await
    }

    // =========================================================================
    // Labware / Location Operations
    // =========================================================================

    pub async fn labware_names(&self) -> ClientResult<Vec<String>> {
        self.get_field("/get_labware_recipes", &[], "labware_recipes")
            .await
    }

    pub async fn location_names(&self) -> ClientResult<Vec<String>> {
        self.get_field("/get_locations", &[], "locations").await
    }
}

/// Best message from an error body: JSON `error.message`, `message`, `detail` or `error`, else the raw text.
pub(crate) fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    let Ok(json) = serde_json::from_str::<Value>(trimmed) else {
        return Some(trimmed.to_string());
    };

    let candidates = [
        json.get("error").and_then(|e| e.get("message")),
        json.get("message"),
        json.get("detail"),
        json.get("error"),
    ];

    candidates
        .into_iter()
        .flatten()
        .find_map(|value| value.as_str().map(String::from))
        .or_else(|| Some(trimmed.to_string()))
}
