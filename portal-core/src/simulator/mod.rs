//! In-process model of a provisioning device's portal endpoints.
//!
//! The device accepts a connect request right away, tries to join in the
//! background and lets the client poll the result: `connected` stays
//! reported, `failed` is reported once and then the device goes back to
//! `idle`.

use axum::http::StatusCode;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::{SimNetwork, SimulatorConfig};
use crate::structs::{ConnectRequest, RawNetwork, StatusResponse};

pub const MSG_NO_BODY: &str = "No body";
pub const MSG_MISSING_SSID: &str = "Missing SSID";
pub const MSG_USERNAME_REQUIRED: &str = "Username required for enterprise";
pub const MSG_ENTERPRISE_UNSUPPORTED: &str =
    "Enterprise WiFi not supported by current coprocessor firmware.";
pub const MSG_WPA_FAILED: &str = "Could not connect. Check the password and try again.";
pub const MSG_ENTERPRISE_FAILED: &str =
    "Enterprise authentication failed. Check your username and password.";
pub const MSG_NO_INTERNET: &str = "Connected to WiFi, but the network has no internet access.";

#[derive(Debug)]
struct PendingConnection {
    request: ConnectRequest,
    started: Instant,
    deadline: Instant,
}

#[derive(Debug, Clone)]
enum AttemptResult {
    Connected { ip: String },
    Failed { message: String },
}

#[derive(Debug, Default)]
struct DeviceState {
    pending: Option<PendingConnection>,
    result: Option<AttemptResult>,
}

#[derive(Debug)]
pub struct SimulatedDevice {
    config: SimulatorConfig,
    state: Mutex<DeviceState>,
}

impl SimulatedDevice {
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            config,
            state: Mutex::new(DeviceState::default()),
        }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Every configured observation, duplicates included.
    pub fn scan(&self) -> Vec<RawNetwork> {
        tracing::debug!("🤖 [SimulatedDevice] Scan: {} observations", self.config.networks.len());
        self.config
            .networks
            .iter()
            .map(|n| RawNetwork {
                ssid: n.ssid.clone(),
                rssi: n.rssi,
                ch: n.ch,
                open: n.open,
                enterprise: n.enterprise,
            })
            .collect()
    }

    /// Validates a raw connect body and, if it passes, starts a background attempt.
    pub async fn connect(&self, body: &[u8]) -> (StatusCode, Value) {
        let request: ConnectRequest = match serde_json::from_slice(body) {
            Ok(request) => request,
            Err(_) => return rejection(StatusCode::BAD_REQUEST, MSG_NO_BODY),
        };
        if request.ssid.is_empty() {
            return rejection(StatusCode::BAD_REQUEST, MSG_MISSING_SSID);
        }

        let enterprise = request.is_enterprise();
        if enterprise && request.user.as_deref().unwrap_or_default().is_empty() {
            return rejection(StatusCode::BAD_REQUEST, MSG_USERNAME_REQUIRED);
        }
        if enterprise && !self.config.enterprise_supported {
            tracing::warn!("🤖 [SimulatedDevice] Enterprise requested but unsupported");
            return rejection(StatusCode::OK, MSG_ENTERPRISE_UNSUPPORTED);
        }

        let now = Instant::now();
        let timeout = if enterprise {
            self.config.enterprise_deadline
        } else {
            self.config.wpa_deadline
        };
        tracing::info!(
            "🤖 [SimulatedDevice] Joining '{}'{}...",
            request.ssid,
            if enterprise { " [enterprise]" } else { "" }
        );

        let mut state = self.state.lock().await;
        state.result = None;
        state.pending = Some(PendingConnection {
            request,
            started: now,
            deadline: now + timeout,
        });
        (StatusCode::OK, json!({ "status": "connecting" }))
    }

    pub async fn status(&self) -> StatusResponse {
        let mut state = self.state.lock().await;
        self.resolve_pending(&mut state, Instant::now());

        match state.result.take() {
            Some(AttemptResult::Connected { ip }) => {
                state.result = Some(AttemptResult::Connected { ip: ip.clone() });
                StatusResponse::connected(ip)
            }
            Some(AttemptResult::Failed { message }) => StatusResponse::failed(message),
            None if state.pending.is_some() => StatusResponse::connecting(),
            None => StatusResponse::idle(),
        }
    }

    fn resolve_pending(&self, state: &mut DeviceState, now: Instant) {
        let verdict = match state.pending.as_ref() {
            None => return,
            Some(pending) => self.judge(pending, now),
        };
        if let Some(result) = verdict {
            match &result {
                AttemptResult::Connected { ip } => {
                    tracing::info!("🤖 [SimulatedDevice] Online ({})", ip)
                }
                AttemptResult::Failed { message } => {
                    tracing::info!("🤖 [SimulatedDevice] Attempt failed: {}", message)
                }
            }
            state.pending = None;
            state.result = Some(result);
        }
    }

    fn judge(&self, pending: &PendingConnection, now: Instant) -> Option<AttemptResult> {
        let joinable = self
            .config
            .networks
            .iter()
            .find(|n| n.ssid == pending.request.ssid && accepts(n, &pending.request));

        if let Some(network) = joinable {
            if now >= pending.started + self.config.association_delay {
                return Some(if network.internet {
                    AttemptResult::Connected {
                        ip: self.config.assigned_ip.clone(),
                    }
                } else {
                    AttemptResult::Failed {
                        message: MSG_NO_INTERNET.to_string(),
                    }
                });
            }
        }

        if now > pending.deadline {
            let message = if pending.request.is_enterprise() {
                MSG_ENTERPRISE_FAILED
            } else {
                MSG_WPA_FAILED
            };
            return Some(AttemptResult::Failed {
                message: message.to_string(),
            });
        }
        None
    }
}

fn rejection(status: StatusCode, msg: &str) -> (StatusCode, Value) {
    (status, json!({ "ok": false, "msg": msg }))
}

fn accepts(network: &SimNetwork, request: &ConnectRequest) -> bool {
    if network.enterprise {
        request.is_enterprise()
            && request.user.as_deref() == network.username.as_deref()
            && Some(request.pass.as_str()) == network.password.as_deref()
    } else if network.open {
        !request.is_enterprise()
    } else {
        !request.is_enterprise() && Some(request.pass.as_str()) == network.password.as_deref()
    }
}
