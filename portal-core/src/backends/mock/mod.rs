use crate::structs::{ConnectRequest, ConnectResponse, RawNetwork, StatusResponse};
use crate::traits::PortalApi;
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// One scripted answer of the mock device.
#[derive(Debug, Clone)]
pub enum Scripted<T> {
    Reply(T),
    /// The request never completes (device unreachable).
    Unreachable,
}

/// A scripted device for testing purposes.
///
/// Replies are consumed in order. Once a queue runs dry the mock falls back
/// to accepting connect requests and answering `connecting` to probes.
#[derive(Debug, Default)]
pub struct MockPortalApi {
    scans: Mutex<VecDeque<Scripted<Vec<RawNetwork>>>>,
    connects: Mutex<VecDeque<Scripted<ConnectResponse>>>,
    statuses: Mutex<VecDeque<Scripted<StatusResponse>>>,
    connect_requests: Mutex<Vec<ConnectRequest>>,
    status_calls: AtomicUsize,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockPortalApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_scan(&self, reply: Scripted<Vec<RawNetwork>>) {
        locked(&self.scans).push_back(reply);
    }

    pub fn push_connect(&self, reply: Scripted<ConnectResponse>) {
        locked(&self.connects).push_back(reply);
    }

    pub fn push_status(&self, reply: Scripted<StatusResponse>) {
        locked(&self.statuses).push_back(reply);
    }

    /// Every connect payload received so far.
    pub fn connect_requests(&self) -> Vec<ConnectRequest> {
        locked(&self.connect_requests).clone()
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

fn unreachable_device(endpoint: &str) -> Error {
    Error::Transport(format!("{endpoint}: simulated device unreachable"))
}

#[async_trait]
impl PortalApi for MockPortalApi {
    async fn scan(&self) -> Result<Vec<RawNetwork>> {
        tracing::debug!("🤖 [MockPortalApi] scan");
        match locked(&self.scans).pop_front() {
            Some(Scripted::Reply(networks)) => Ok(networks),
            Some(Scripted::Unreachable) => Err(unreachable_device("/api/scan")),
            None => Ok(Vec::new()),
        }
    }

    async fn connect(&self, request: &ConnectRequest) -> Result<ConnectResponse> {
        tracing::debug!(ssid = %request.ssid, "🤖 [MockPortalApi] connect");
        locked(&self.connect_requests).push(request.clone());
        match locked(&self.connects).pop_front() {
            Some(Scripted::Reply(response)) => Ok(response),
            Some(Scripted::Unreachable) => Err(unreachable_device("/api/connect")),
            None => Ok(ConnectResponse::accepted()),
        }
    }

    async fn status(&self) -> Result<StatusResponse> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        match locked(&self.statuses).pop_front() {
            Some(Scripted::Reply(status)) => Ok(status),
            Some(Scripted::Unreachable) => Err(unreachable_device("/api/status")),
            None => Ok(StatusResponse::connecting()),
        }
    }
}
