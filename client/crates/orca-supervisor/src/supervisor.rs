//! Top-level coordinator owned by the front end.

use crate::{
    Connectivity, EngineIoConnector, HealthPoller, HttpProbe, LaunchOutcome, LogSink,
    LogStreamClient, Notifier, ProcessLauncher, ReachabilityProbe, ReconnectPolicy, Result,
    RetryBudget, ShutdownCoordinator, ShutdownOutcome, StreamConnector, StreamEndpoint,
};

use std::sync::Arc;

use orca_config::Config;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// The collaborators a [`ServerSupervisor`] coordinates.
pub struct SupervisorParts {
    pub launcher: Arc<ProcessLauncher>,
    pub probe: Arc<dyn ReachabilityProbe>,
    pub log_stream: Arc<LogStreamClient>,
    pub shutdown: Arc<ShutdownCoordinator>,
    pub sink: Arc<dyn LogSink>,
    pub budget: RetryBudget,
}

impl SupervisorParts {
    /// Wire the HTTP probe and Engine.IO log stream from `config`.
    pub fn from_config(
        config: &Config,
        sink: Arc<dyn LogSink>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        config.validate()?;
        StreamEndpoint::parse(&config.log_stream_endpoint())?;

        let probe: Arc<dyn ReachabilityProbe> = Arc::new(HttpProbe::new(
            config.server.base_url(),
            config.health.probe_timeout(),
        )?);
        let connector: Arc<dyn StreamConnector> = Arc::new(EngineIoConnector::new()?);

        Self::with_transports(config, probe, connector, sink, notifier)
    }

    /// Wire from `config` with caller-supplied probe and stream transport.
    pub fn with_transports(
        config: &Config,
        probe: Arc<dyn ReachabilityProbe>,
        connector: Arc<dyn StreamConnector>,
        sink: Arc<dyn LogSink>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let launcher = Arc::new(ProcessLauncher::new(
            config.server.resolve_command(),
            config.server.args.clone(),
            probe.clone(),
            sink.clone(),
            notifier.clone(),
        ));

        let log_stream = Arc::new(LogStreamClient::new(
            config.log_stream_endpoint(),
            ReconnectPolicy::from(&config.log_stream),
            connector,
            sink.clone(),
            notifier.clone(),
        ));

        let shutdown = Arc::new(ShutdownCoordinator::new(
            config.server.base_url(),
            &config.shutdown,
            launcher.clone(),
            sink.clone(),
            notifier,
        )?);

        Ok(Self {
            launcher,
            probe,
            log_stream,
            shutdown,
            sink,
            budget: RetryBudget::from(&config.health),
        })
    }
}

/// Starts, watches and stops one Orca server on behalf of a client.
pub struct ServerSupervisor {
    launcher: Arc<ProcessLauncher>,
    probe: Arc<dyn ReachabilityProbe>,
    log_stream: Arc<LogStreamClient>,
    shutdown: Arc<ShutdownCoordinator>,
    sink: Arc<dyn LogSink>,
    budget: RetryBudget,
    connectivity: Arc<Connectivity>,
    readiness: Mutex<Option<JoinHandle<bool>>>,
}

impl ServerSupervisor {
    pub fn new(parts: SupervisorParts) -> Self {
        Self {
            launcher: parts.launcher,
            probe: parts.probe,
            log_stream: parts.log_stream,
            shutdown: parts.shutdown,
            sink: parts.sink,
            budget: parts.budget,
            connectivity: Arc::new(Connectivity::new()),
            readiness: Mutex::new(None),
        }
    }

    pub fn from_config(
        config: &Config,
        sink: Arc<dyn LogSink>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        Ok(Self::new(SupervisorParts::from_config(config, sink, notifier)?))
    }

    /// Launch (or adopt) the server, start readiness polling and open the log stream.
    ///
    /// Readiness is awaited in the background; see [`wait_until_ready`](Self::wait_until_ready).
    pub async fn start(&self) -> Result<LaunchOutcome> {
        let outcome = self.launcher.start().await?;
        info!("Launch outcome: {outcome:?}");

        self.spawn_readiness_wait().await;
        self.log_stream.connect().await;
        self.is_reachable().await;

        Ok(outcome)
    }

    /// Wait for the readiness poll started by the last [`start`](Self::start).
    ///
    /// Returns the current connectivity when no poll is outstanding.
    pub async fn wait_until_ready(&self) -> bool {
        let task = self.readiness.lock().await.take();

        match task {
            Some(task) => task.await.unwrap_or(false),
            None => self.connectivity.current(),
        }
    }

    /// Request a cooperative shutdown, then close the log stream.
    pub async fn stop(&self) -> ShutdownOutcome {
        if let Some(task) = self.readiness.lock().await.take() {
            task.abort();
        }

        let outcome = self.shutdown.request_shutdown().await;
        self.log_stream.disconnect().await;
        self.is_reachable().await;

        outcome
    }

    /// Signal the owned process directly. Returns `false` when nothing is owned.
    pub async fn terminate(&self) -> bool {
        let terminated = self.launcher.stop().await;
        self.log_stream.disconnect().await;
        terminated
    }

    /// Probe the server now and publish the result if it changed.
    pub async fn is_reachable(&self) -> bool {
        let reachable = self.probe.is_reachable().await;
        self.connectivity.publish(reachable);
        reachable
    }

    pub fn subscribe(&self) -> broadcast::Receiver<bool> {
        self.connectivity.subscribe()
    }

    /// Last published reachability.
    pub fn connectivity(&self) -> bool {
        self.connectivity.current()
    }

    pub async fn is_stream_connected(&self) -> bool {
        self.log_stream.is_connected().await
    }

    pub async fn owns_process(&self) -> bool {
        self.launcher.is_owned().await
    }

    pub async fn server_pid(&self) -> Option<u32> {
        self.launcher.pid().await
    }

    async fn spawn_readiness_wait(&self) {
        let probe = self.probe.clone();
        let sink = self.sink.clone();
        let connectivity = self.connectivity.clone();
        let budget = self.budget;

        let task = tokio::spawn(async move {
            match HealthPoller::wait_until_reachable(probe.as_ref(), budget).await {
                Ok(attempt) => {
                    sink.extension_log(&format!(
                        "Orca server reachable after {attempt} attempt(s)"
                    ));
                    connectivity.publish(true);
                    true
                }
                Err(e) => {
                    warn!("Readiness wait gave up: {e}");
                    sink.extension_log(&format!("Orca server is down: {e}"));
                    connectivity.publish(false);
                    false
                }
            }
        });

        if let Some(previous) = self.readiness.lock().await.replace(task) {
            previous.abort();
        }
    }
}
