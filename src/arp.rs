//! Gratuitous ARP announcements
//!
//! After static addresses are applied, peers may still hold stale neighbor
//! entries. The announcer broadcasts unsolicited ARP replies for every resolved
//! network in the background so convergence never waits on it.
//!
//! Each round visits every network in order: wait until the device shows up in
//! the device directory, send one announcement, then sleep the wait interval.
//! The device wait has no upper bound.

use crate::command::{command_line, CommandRunner};
use crate::fs::FileSystem;
use crate::network::ResolvedNetwork;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// Background announcement of address bindings
pub trait Announcer: Send + Sync {
    /// Start announcing and return immediately; the outcome is never reported
    fn announce(&self, networks: Vec<ResolvedNetwork>);
}

/// Timing of the announcement loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnounceTiming {
    pub rounds: u32,
    /// Interval between device existence checks
    pub poll_interval: Duration,
    /// Pause after each announcement
    pub wait_interval: Duration,
}

impl Default for AnnounceTiming {
    fn default() -> Self {
        Self {
            rounds: 6,
            poll_interval: Duration::from_millis(100),
            wait_interval: Duration::from_millis(100),
        }
    }
}

/// Announces with `arping`, one detached tokio task per `announce` call
#[derive(Clone)]
pub struct GratuitousArpAnnouncer {
    fs: Arc<dyn FileSystem>,
    runner: Arc<dyn CommandRunner>,
    net_class_dir: PathBuf,
    timing: AnnounceTiming,
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl GratuitousArpAnnouncer {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        runner: Arc<dyn CommandRunner>,
        net_class_dir: impl Into<PathBuf>,
        timing: AnnounceTiming,
    ) -> Self {
        Self {
            fs,
            runner,
            net_class_dir: net_class_dir.into(),
            timing,
            tasks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Run every round to completion on the current task
    pub async fn run(&self, networks: &[ResolvedNetwork]) {
        for round in 0..self.timing.rounds {
            debug!("Gratuitous ARP round {}/{}", round + 1, self.timing.rounds);

            for network in networks {
                self.wait_for_device(&network.device).await;
                self.send(network).await;
                sleep(self.timing.wait_interval).await;
            }
        }
    }

    /// Wait for announcement tasks spawned so far
    ///
    /// Convergence never calls this; it exists for processes about to exit.
    pub async fn drain(&self) {
        let tasks = match self.tasks.lock() {
            Ok(mut tasks) => std::mem::take(&mut *tasks),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };

        for task in tasks {
            if let Err(e) = task.await {
                warn!("Gratuitous ARP task ended abnormally: {}", e);
            }
        }
    }

    async fn wait_for_device(&self, device: &str) {
        let path = self.net_class_dir.join(device);
        while !self.fs.exists(&path).await {
            sleep(self.timing.poll_interval).await;
        }
    }

    async fn send(&self, network: &ResolvedNetwork) {
        let args = ["-c", "1", "-U", "-I", network.device.as_str(), network.ip()];
        match self.runner.run_command("arping", &args).await {
            Ok(_) => debug!("Announced {} on {}", network.ip(), network.device),
            // Discarded: announcements are advisory
            Err(e) => debug!("Ignoring failure of '{}': {}", command_line("arping", &args), e),
        }
    }
}

impl Announcer for GratuitousArpAnnouncer {
    fn announce(&self, networks: Vec<ResolvedNetwork>) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Cannot start gratuitous ARP without a tokio runtime: {}", e);
                return;
            }
        };

        info!("Starting gratuitous ARP for {} network(s)", networks.len());
        let announcer = self.clone();
        let task = handle.spawn(async move {
            announcer.run(&networks).await;
            debug!("Gratuitous ARP finished");
        });

        let mut tasks = match self.tasks.lock() {
            Ok(tasks) => tasks,
            Err(poisoned) => poisoned.into_inner(),
        };
        tasks.retain(|t| !t.is_finished());
        tasks.push(task);
    }
}
