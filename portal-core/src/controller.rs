//! Connection lifecycle: scan → select → submit → poll → outcome.
//!
//! The controller is the only owner of the selected network and of the
//! active poller. The presentation layer drives it through method calls,
//! observes it through a [`LifecycleObserver`] and reads it through
//! [`ControllerSnapshot`]s.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::catalog::consolidate;
use crate::config::PollConfig;
use crate::poller::{PollReport, PollerHandle, StatusPoller};
use crate::selection::SelectionContext;
use crate::structs::{DisplayNetwork, FormRequirements, SecurityClass};
use crate::traits::{LifecycleObserver, NoopObserver, PortalApi};
use crate::{Error, Result};

/// Shown when the connect request itself could not be completed.
pub const REQUEST_FAILED_MESSAGE: &str = "Request failed. Please try again.";

/// Where a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The connect request could not be completed.
    Transport,
    /// The device rejected the request synchronously.
    Validation,
    /// The device accepted the request, then reported that joining failed.
    Connection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    AwaitingSubmit,
    Submitting,
    Polling,
    Succeeded { ip: String },
    /// Editable again: the selection is kept so the user can retry.
    Failed { kind: FailureKind, message: String },
}

impl ConnectionState {
    pub fn name(&self) -> &'static str {
        match self {
            ConnectionState::Idle => "idle",
            ConnectionState::AwaitingSubmit => "awaiting submit",
            ConnectionState::Submitting => "submitting",
            ConnectionState::Polling => "polling",
            ConnectionState::Succeeded { .. } => "succeeded",
            ConnectionState::Failed { .. } => "failed",
        }
    }

    /// Whether the credential form accepts edits and a submit.
    pub fn is_editable(&self) -> bool {
        matches!(
            self,
            ConnectionState::AwaitingSubmit | ConnectionState::Failed { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptStatus {
    Submitted,
    Polling,
    Succeeded(String),
    Failed(String),
}

/// One submitted connect request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionAttempt {
    /// Generation of the poll cycle this attempt owns.
    pub id: u64,
    pub ssid: String,
    pub status: AttemptStatus,
}

/// Everything the presentation layer is told about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    CatalogUpdated(Vec<DisplayNetwork>),
    ScanFailed {
        message: String,
    },
    FormOpened {
        ssid: String,
        security: SecurityClass,
        requirements: FormRequirements,
    },
    Submitting {
        ssid: String,
    },
    PollingStarted {
        ssid: String,
    },
    Connected {
        ip: String,
    },
    Failed {
        kind: FailureKind,
        message: String,
    },
    Closed,
}

/// A poll report tagged with the cycle that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub generation: u64,
    pub report: PollReport,
}

/// Read-only copy of the controller's state.
#[derive(Debug, Clone)]
pub struct ControllerSnapshot {
    pub state: ConnectionState,
    pub selection: Option<SelectionContext>,
    pub catalog: Vec<DisplayNetwork>,
    pub attempt: Option<ConnectionAttempt>,
    pub poller_active: bool,
}

pub struct ConnectionController<A: PortalApi + ?Sized + 'static> {
    api: Arc<A>,
    poll: PollConfig,
    observer: Arc<dyn LifecycleObserver>,
    state: ConnectionState,
    selection: Option<SelectionContext>,
    catalog: Vec<DisplayNetwork>,
    attempt: Option<ConnectionAttempt>,
    poller: Option<PollerHandle>,
    generation: u64,
    reports_tx: mpsc::UnboundedSender<CycleReport>,
    reports_rx: mpsc::UnboundedReceiver<CycleReport>,
}

impl<A: PortalApi + ?Sized + 'static> ConnectionController<A> {
    pub fn new(api: Arc<A>, poll: PollConfig) -> Self {
        let (reports_tx, reports_rx) = mpsc::unbounded_channel();
        Self {
            api,
            poll,
            observer: Arc::new(NoopObserver),
            state: ConnectionState::Idle,
            selection: None,
            catalog: Vec::new(),
            attempt: None,
            poller: None,
            generation: 0,
            reports_tx,
            reports_rx,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn selection(&self) -> Option<&SelectionContext> {
        self.selection.as_ref()
    }

    pub fn catalog(&self) -> &[DisplayNetwork] {
        &self.catalog
    }

    pub fn attempt(&self) -> Option<&ConnectionAttempt> {
        self.attempt.as_ref()
    }

    pub fn poller_active(&self) -> bool {
        self.poller.as_ref().is_some_and(PollerHandle::is_running)
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            state: self.state.clone(),
            selection: self.selection.clone(),
            catalog: self.catalog.clone(),
            attempt: self.attempt.clone(),
            poller_active: self.poller_active(),
        }
    }

    /// Rebuilds the catalog from a fresh scan.
    ///
    /// A failed scan empties the catalog and is returned to the caller; the
    /// connection state is left untouched either way.
    pub async fn scan(&mut self) -> Result<&[DisplayNetwork]> {
        match self.api.scan().await {
            Ok(raw) => {
                let observations = raw.len();
                self.catalog = consolidate(raw);
                tracing::info!(
                    "📡 Scan complete: {} observations, {} networks",
                    observations,
                    self.catalog.len()
                );
                self.notify(LifecycleEvent::CatalogUpdated(self.catalog.clone()));
                Ok(&self.catalog)
            }
            Err(e) => {
                tracing::warn!("Scan failed: {}", e);
                self.catalog.clear();
                self.notify(LifecycleEvent::ScanFailed {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Opens the credential form for one network. Only valid while idle.
    pub fn select_network(
        &mut self,
        ssid: &str,
        open: bool,
        enterprise: bool,
    ) -> Result<FormRequirements> {
        if self.state != ConnectionState::Idle {
            return Err(self.invalid("select a network"));
        }
        let context = SelectionContext::open(ssid, open, enterprise);
        let security = context.security();
        let requirements = context.requirements();
        tracing::info!(ssid, ?security, "Network selected");

        self.selection = Some(context);
        self.state = ConnectionState::AwaitingSubmit;
        self.notify(LifecycleEvent::FormOpened {
            ssid: ssid.to_string(),
            security,
            requirements,
        });
        Ok(requirements)
    }

    pub fn set_username(&mut self, username: impl Into<String>) -> Result<()> {
        self.editable_selection("edit credentials")?
            .set_username(username);
        Ok(())
    }

    pub fn set_password(&mut self, password: impl Into<String>) -> Result<()> {
        self.editable_selection("edit credentials")?
            .set_password(password);
        Ok(())
    }

    /// Sends exactly one connect request for the selected network.
    ///
    /// Transport failures and device rejections do not produce an `Err`:
    /// they move the controller to `Failed` with the form editable again.
    /// `Err` is returned only when there is nothing to submit.
    pub async fn submit(&mut self) -> Result<&ConnectionState> {
        if !self.state.is_editable() {
            return Err(self.invalid("submit"));
        }
        let Some(context) = self.selection.as_ref() else {
            return Err(self.invalid("submit"));
        };
        let request = context.build_request();
        let ssid = request.ssid.clone();

        self.stop_poller();
        self.generation += 1;
        let generation = self.generation;
        self.attempt = Some(ConnectionAttempt {
            id: generation,
            ssid: ssid.clone(),
            status: AttemptStatus::Submitted,
        });
        self.state = ConnectionState::Submitting;
        tracing::info!(%ssid, attempt = generation, "🔗 Submitting connect request");
        self.notify(LifecycleEvent::Submitting { ssid: ssid.clone() });

        match self.api.connect(&request).await {
            Err(e) => {
                tracing::warn!(%ssid, "Connect request failed: {}", e);
                self.fail(FailureKind::Transport, REQUEST_FAILED_MESSAGE.to_string());
            }
            Ok(response) => match response.rejection() {
                Some(message) => {
                    tracing::warn!(%ssid, %message, "Device rejected connect request");
                    self.fail(FailureKind::Validation, message);
                }
                None => self.start_polling(generation, ssid),
            },
        }
        Ok(&self.state)
    }

    /// Waits for the current poll cycle to reach a terminal outcome.
    ///
    /// Returns `None` right away when nothing is being polled. If the poller
    /// stops silently after a probe transport failure this never resolves;
    /// callers bound it with their own timeout.
    pub async fn next_outcome(&mut self) -> Option<ConnectionState> {
        while self.state == ConnectionState::Polling {
            let cycle = self.reports_rx.recv().await?;
            if let Some(state) = self.apply_report(cycle) {
                return Some(state);
            }
        }
        None
    }

    /// Applies one poll report if it belongs to the active cycle.
    ///
    /// Reports from a stopped, cancelled or superseded poller are discarded
    /// and `None` is returned.
    pub fn apply_report(&mut self, cycle: CycleReport) -> Option<ConnectionState> {
        let active = self.poller.as_ref().map(PollerHandle::generation);
        if active != Some(cycle.generation) || self.state != ConnectionState::Polling {
            tracing::debug!(
                generation = cycle.generation,
                ?active,
                "Discarding stale poll report"
            );
            return None;
        }

        self.stop_poller();
        match cycle.report {
            PollReport::Connected { ip } => {
                if ip.is_empty() {
                    tracing::warn!("Device reported connected without an ip");
                }
                if let Some(attempt) = self.attempt.as_mut() {
                    attempt.status = AttemptStatus::Succeeded(ip.clone());
                }
                SelectionContext::close(&mut self.selection);
                self.state = ConnectionState::Succeeded { ip: ip.clone() };
                tracing::info!(%ip, "✅ Device joined the network");
                self.notify(LifecycleEvent::Connected { ip });
            }
            PollReport::Failed { message } => {
                self.fail(FailureKind::Connection, message);
            }
        }
        Some(self.state.clone())
    }

    /// Stops any poller, drops the selection and returns to `Idle`.
    pub fn cancel(&mut self) {
        self.stop_poller();
        SelectionContext::close(&mut self.selection);
        self.attempt = None;
        let previous = std::mem::replace(&mut self.state, ConnectionState::Idle);
        if previous != ConnectionState::Idle {
            tracing::info!("Cycle closed while {}", previous.name());
            self.notify(LifecycleEvent::Closed);
        }
    }

    /// Returns from `Succeeded` to `Idle` so a new cycle can begin.
    pub fn acknowledge(&mut self) -> Result<()> {
        if !matches!(self.state, ConnectionState::Succeeded { .. }) {
            return Err(self.invalid("acknowledge"));
        }
        self.cancel();
        Ok(())
    }

    fn start_polling(&mut self, generation: u64, ssid: String) {
        self.stop_poller();
        let reports = self.reports_tx.clone();
        let handle = StatusPoller::start(
            Arc::clone(&self.api),
            self.poll.interval,
            generation,
            move |report| {
                // the receiver lives as long as the controller
                let _ = reports.send(CycleReport { generation, report });
            },
        );
        self.poller = Some(handle);
        if let Some(attempt) = self.attempt.as_mut() {
            attempt.status = AttemptStatus::Polling;
        }
        self.state = ConnectionState::Polling;
        tracing::info!(%ssid, attempt = generation, "⏳ Device accepted, polling status");
        self.notify(LifecycleEvent::PollingStarted { ssid });
    }

    fn fail(&mut self, kind: FailureKind, message: String) {
        self.stop_poller();
        if let Some(attempt) = self.attempt.as_mut() {
            attempt.status = AttemptStatus::Failed(message.clone());
        }
        self.state = ConnectionState::Failed {
            kind,
            message: message.clone(),
        };
        tracing::info!(?kind, %message, "❌ Connection attempt failed");
        self.notify(LifecycleEvent::Failed { kind, message });
    }

    fn stop_poller(&mut self) {
        if let Some(mut handle) = self.poller.take() {
            handle.stop();
        }
    }

    fn editable_selection(&mut self, action: &'static str) -> Result<&mut SelectionContext> {
        let state = self.state.name();
        if !self.state.is_editable() {
            return Err(Error::InvalidTransition { action, state });
        }
        self.selection
            .as_mut()
            .ok_or(Error::InvalidTransition { action, state })
    }

    fn invalid(&self, action: &'static str) -> Error {
        Error::InvalidTransition {
            action,
            state: self.state.name(),
        }
    }

    fn notify(&self, event: LifecycleEvent) {
        self.observer.notify(&event);
    }
}
