//! Repeating `/api/status` probe for one accepted connection attempt.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use crate::structs::ProbeOutcome;
use crate::traits::PortalApi;

/// Interval between two status probes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1500);

/// Terminal outcome reported by a probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollReport {
    Connected { ip: String },
    Failed { message: String },
}

/// Owning handle of a running poller task.
///
/// The generation identifies the poll cycle the task belongs to; reports
/// carrying any other generation are stale.
#[derive(Debug)]
pub struct PollerHandle {
    generation: u64,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// `true` until the task is stopped or has stopped itself.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Idempotent.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!(generation = self.generation, "Status poller stopped");
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

pub struct StatusPoller;

impl StatusPoller {
    /// Spawns the probe loop.
    ///
    /// The first probe fires one `interval` after start. Probes are issued
    /// one at a time; a slow answer delays the next tick instead of queueing
    /// another request. `on_tick` is called for `connected` and `failed`
    /// only, after which the loop ends by itself. Any other status keeps the
    /// loop going. A probe that cannot be completed ends the loop without
    /// calling `on_tick`: the device may be dropping its access point to
    /// join the new network.
    pub fn start<A, F>(api: Arc<A>, interval: Duration, generation: u64, on_tick: F) -> PollerHandle
    where
        A: PortalApi + ?Sized + 'static,
        F: Fn(PollReport) + Send + 'static,
    {
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let status = match api.status().await {
                    Ok(status) => status,
                    Err(e) => {
                        tracing::debug!(generation, "Status probe failed ({}), stopping silently", e);
                        return;
                    }
                };

                match status.outcome() {
                    ProbeOutcome::Connected { ip } => {
                        tracing::debug!(generation, %ip, "Probe: connected");
                        on_tick(PollReport::Connected { ip });
                        return;
                    }
                    ProbeOutcome::Failed { message } => {
                        tracing::debug!(generation, %message, "Probe: failed");
                        on_tick(PollReport::Failed { message });
                        return;
                    }
                    ProbeOutcome::Pending(status) => {
                        tracing::debug!(generation, %status, "Probe: still waiting");
                    }
                }
            }
        });

        PollerHandle {
            generation,
            task: Some(task),
        }
    }

    pub fn stop(handle: &mut PollerHandle) {
        handle.stop();
    }
}
