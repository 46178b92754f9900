//! Reachability probing and bounded readiness polling.

use crate::{Result, SupervisorError};

use std::panic::Location;
use std::time::Duration;

use async_trait::async_trait;
use error_location::ErrorLocation;
use orca_config::HealthConfig;
use reqwest::StatusCode;
use tracing::debug;

const TEST_PATH: &str = "/test";

/// Answers whether the Orca server currently responds.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    async fn is_reachable(&self) -> bool;
}

/// Probes `GET {base_url}/test`. Only a 200 counts as reachable.
pub struct HttpProbe {
    client: reqwest::Client,
    url: String,
}

impl HttpProbe {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            url: format!("{}{}", base_url.trim_end_matches('/'), TEST_PATH),
        })
    }
}

#[async_trait]
impl ReachabilityProbe for HttpProbe {
    async fn is_reachable(&self) -> bool {
        match self.client.get(&self.url).send().await {
            Ok(response) => response.status() == StatusCode::OK,
            Err(e) => {
                debug!("Reachability probe failed: {e}");
                false
            }
        }
    }
}

/// How long and how often to wait for the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl From<&HealthConfig> for RetryBudget {
    fn from(config: &HealthConfig) -> Self {
        Self {
            interval: config.interval(),
            max_attempts: config.max_attempts,
        }
    }
}

pub struct HealthPoller;

impl HealthPoller {
    /// Probe until the server answers or the budget runs out.
    ///
    /// Sleeps `interval` before every probe and makes at most `max_attempts`
    /// probes. Returns the attempt number that succeeded.
    pub async fn wait_until_reachable(
        probe: &dyn ReachabilityProbe,
        budget: RetryBudget,
    ) -> Result<u32> {
        for attempt in 1..=budget.max_attempts {
            tokio::time::sleep(budget.interval).await;

            if probe.is_reachable().await {
                return Ok(attempt);
            }

            debug!(
                "Orca server still down, attempt {attempt} of {}",
                budget.max_attempts
            );
        }

        Err(SupervisorError::UnreachableTimeout {
            attempts: budget.max_attempts,
            location: ErrorLocation::from(Location::caller()),
        })
    }
}
