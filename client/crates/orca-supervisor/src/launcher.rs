//! Spawns and owns the Orca server process.

use crate::stream_reader::spawn_line_reader;
use crate::{LogSink, Notice, Notifier, ReachabilityProbe, Result, SupervisorError};

use std::io;
use std::panic::Location;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use error_location::ErrorLocation;
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, warn};

/// How long a server gets to exit after SIGTERM before it is killed.
pub const DEFAULT_TERMINATION_GRACE: Duration = Duration::from_secs(5);

/// Result of [`ProcessLauncher::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// A new process was spawned
    Spawned { pid: Option<u32> },
    /// This launcher already owns a running process
    AlreadyOwned,
    /// A server started elsewhere already answers
    ExternallyRunning,
}

/// A server process owned by a [`ProcessLauncher`].
#[derive(Debug)]
pub struct ServerHandle {
    id: u64,
    pid: Option<u32>,
    command: String,
    owned: Arc<AtomicBool>,
    terminate_tx: Option<oneshot::Sender<()>>,
}

impl ServerHandle {
    fn terminate(&mut self) {
        if let Some(terminate_tx) = self.terminate_tx.take() {
            // The watcher is gone once the process has exited
            let _ = terminate_tx.send(());
        }
    }

    /// Give up ownership. The watcher then only waits for a natural exit.
    fn disown(&mut self) {
        self.owned.store(false, Ordering::SeqCst);
        self.terminate_tx.take();
    }
}

impl ServerHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

/// Launches `command args...` and tracks the resulting process.
///
/// Holds at most one [`ServerHandle`]. The child itself is owned by a
/// watcher task that clears the handle when the process exits. A process
/// still owned when the launcher or its runtime goes away is terminated;
/// a released one is left to finish on its own.
pub struct ProcessLauncher {
    command: String,
    args: Vec<String>,
    probe: Arc<dyn ReachabilityProbe>,
    sink: Arc<dyn LogSink>,
    notifier: Arc<dyn Notifier>,
    handle: Arc<Mutex<Option<ServerHandle>>>,
    next_id: AtomicU64,
    termination_grace: Duration,
}

impl ProcessLauncher {
    pub fn new(
        command: impl Into<String>,
        args: Vec<String>,
        probe: Arc<dyn ReachabilityProbe>,
        sink: Arc<dyn LogSink>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            command: command.into(),
            args,
            probe,
            sink,
            notifier,
            handle: Arc::new(Mutex::new(None)),
            next_id: AtomicU64::new(1),
            termination_grace: DEFAULT_TERMINATION_GRACE,
        }
    }

    pub fn with_termination_grace(mut self, grace: Duration) -> Self {
        self.termination_grace = grace;
        self
    }

    /// Spawn the server unless one is already owned or reachable.
    pub async fn start(&self) -> Result<LaunchOutcome> {
        let mut guard = self.handle.lock().await;

        if let Some(handle) = guard.as_ref() {
            self.sink.extension_log(&format!(
                "Orca server already started by this client (pid {})",
                describe_pid(handle.pid)
            ));
            return Ok(LaunchOutcome::AlreadyOwned);
        }

        if self.probe.is_reachable().await {
            self.sink
                .extension_log("Orca server is already running, not starting another one.");
            return Ok(LaunchOutcome::ExternallyRunning);
        }

        self.sink.extension_log("Starting Orca server...");
        self.sink
            .extension_log(&format!("Orca command: {} {}", self.command, self.args.join(" ")));

        let mut child = match Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(source) => {
                self.sink
                    .server_log(&format!("Failed to start Orca server: {source}"));
                self.notifier
                    .notify(Notice::error(format!("Failed to start Orca server: {source}")));
                return Err(SupervisorError::LaunchFailure {
                    command: self.command.clone(),
                    source,
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        };

        if let Some(stdout) = child.stdout.take() {
            spawn_line_reader(stdout, "stdout", self.sink.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_line_reader(stderr, "stderr", self.sink.clone());
        }

        let pid = child.id();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (terminate_tx, terminate_rx) = oneshot::channel();
        let owned = Arc::new(AtomicBool::new(true));

        *guard = Some(ServerHandle {
            id,
            pid,
            command: self.command.clone(),
            owned: owned.clone(),
            terminate_tx: Some(terminate_tx),
        });
        drop(guard);

        tokio::spawn(watch_exit(
            OwnedChild { child, owned },
            id,
            terminate_rx,
            self.handle.clone(),
            self.sink.clone(),
            self.termination_grace,
        ));

        self.sink.extension_log(&format!(
            "Orca server started (pid {})",
            describe_pid(pid)
        ));

        Ok(LaunchOutcome::Spawned { pid })
    }

    /// Terminate the owned process. Returns `false` when nothing is owned.
    ///
    /// Servers that were already running when [`start`](Self::start) was
    /// called are never signalled.
    pub async fn stop(&self) -> bool {
        let handle = self.handle.lock().await.take();

        match handle {
            Some(mut handle) => {
                self.sink.extension_log(&format!(
                    "Terminating Orca server (pid {})",
                    describe_pid(handle.pid)
                ));
                handle.terminate();
                true
            }
            None => {
                self.notifier
                    .notify(Notice::warning("Orca server is not running."));
                false
            }
        }
    }

    /// Forget the owned process without signalling it.
    ///
    /// Used once the server has been asked to shut itself down.
    pub async fn release(&self) -> Option<ServerHandle> {
        let mut released = self.handle.lock().await.take();
        if let Some(handle) = released.as_mut() {
            handle.disown();
            debug!("Released Orca server handle {}", handle.id);
        }
        released
    }

    pub async fn is_owned(&self) -> bool {
        self.handle.lock().await.is_some()
    }

    pub async fn pid(&self) -> Option<u32> {
        self.handle.lock().await.as_ref().and_then(|h| h.pid)
    }
}

impl Drop for ProcessLauncher {
    fn drop(&mut self) {
        // The watcher holds the lock only briefly after the process exits
        if let Ok(mut guard) = self.handle.try_lock()
            && let Some(mut handle) = guard.take()
        {
            debug!("Launcher dropped, terminating Orca server handle {}", handle.id);
            handle.terminate();
        }
    }
}

/// A child that is killed when dropped while still owned.
///
/// Dropping happens when the watcher task is cancelled, which is what a
/// runtime shutdown does to it. `owned` is shared with the [`ServerHandle`]
/// so a release takes effect before the watcher next runs.
struct OwnedChild {
    child: Child,
    owned: Arc<AtomicBool>,
}

impl OwnedChild {
    fn is_owned(&self) -> bool {
        self.owned.load(Ordering::SeqCst)
    }
}

impl Drop for OwnedChild {
    fn drop(&mut self) {
        if self.is_owned() {
            // Already reaped children report an error here, which is fine
            let _ = self.child.start_kill();
        }
    }
}

/// Owns the child until it exits, termination is requested or it is released.
async fn watch_exit(
    mut owned: OwnedChild,
    id: u64,
    mut terminate_rx: oneshot::Receiver<()>,
    handle: Arc<Mutex<Option<ServerHandle>>>,
    sink: Arc<dyn LogSink>,
    grace: Duration,
) {
    let status = tokio::select! {
        status = owned.child.wait() => status,
        request = &mut terminate_rx => match request {
            Ok(()) => terminate(&mut owned.child, grace).await,
            Err(_) if !owned.is_owned() => owned.child.wait().await,
            // Handle dropped while still owned: the launcher went away
            Err(_) => terminate(&mut owned.child, grace).await,
        },
    };
    owned.owned.store(false, Ordering::SeqCst);

    {
        let mut guard = handle.lock().await;
        if guard.as_ref().is_some_and(|h| h.id == id) {
            *guard = None;
        }
    }

    match status {
        Ok(status) => sink.server_log(&describe_exit(status)),
        Err(e) => {
            warn!("Failed to wait for Orca server: {e}");
            sink.server_log(&format!("Lost track of Orca server: {e}"));
        }
    }
}

#[cfg(unix)]
async fn terminate(child: &mut Child, grace: Duration) -> io::Result<ExitStatus> {
    use nix::errno::Errno;
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return child.wait().await;
    };

    match signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        Ok(()) => {
            if let Ok(result) = tokio::time::timeout(grace, child.wait()).await {
                return result;
            }
            debug!("Orca server ignored SIGTERM for {grace:?}, killing");
        }
        Err(Errno::ESRCH) => return child.wait().await,
        Err(e) => warn!("SIGTERM to pid {pid} failed: {e}"),
    }

    child.start_kill()?;
    child.wait().await
}

#[cfg(not(unix))]
async fn terminate(child: &mut Child, _grace: Duration) -> io::Result<ExitStatus> {
    child.start_kill()?;
    child.wait().await
}

fn describe_exit(status: ExitStatus) -> String {
    if let Some(code) = status.code() {
        return format!("Orca server exited with code {code}");
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("Orca server terminated by signal {signal}");
        }
    }

    String::from("Orca server exited")
}

fn describe_pid(pid: Option<u32>) -> String {
    pid.map_or_else(|| String::from("unknown"), |pid| pid.to_string())
}
