use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message shown when the device rejects a connect request without saying why.
pub const DEFAULT_REJECTION_MESSAGE: &str = "Connection failed.";

/// 表示扫描到的单次无线观测（`GET /api/scan` 数组中的一项）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawNetwork {
    pub ssid: String,
    pub rssi: i32, // dBm，越大越强
    pub ch: u32,
    pub open: bool,
    #[serde(default)]
    pub enterprise: bool,
}

/// One entry of the consolidated network list, one per distinct SSID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayNetwork {
    pub ssid: String,
    pub rssi: i32,
    pub ch: u32,
    pub open: bool,
    pub enterprise: bool,
}

impl DisplayNetwork {
    pub fn security(&self) -> SecurityClass {
        SecurityClass::from_flags(self.open, self.enterprise)
    }
}

impl From<RawNetwork> for DisplayNetwork {
    fn from(raw: RawNetwork) -> Self {
        Self {
            ssid: raw.ssid,
            rssi: raw.rssi,
            ch: raw.ch,
            open: raw.open,
            enterprise: raw.enterprise,
        }
    }
}

/// Authentication family of a network, derived from its scan flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SecurityClass {
    Open,
    Secured,
    Enterprise,
}

impl SecurityClass {
    /// The enterprise flag overrides the open flag.
    pub fn from_flags(open: bool, enterprise: bool) -> Self {
        if enterprise {
            SecurityClass::Enterprise
        } else if open {
            SecurityClass::Open
        } else {
            SecurityClass::Secured
        }
    }

    /// Which credential fields the form has to collect for this class.
    pub fn requirements(self) -> FormRequirements {
        match self {
            SecurityClass::Open => FormRequirements {
                username: false,
                password: false,
                unencrypted_warning: true,
            },
            SecurityClass::Secured => FormRequirements {
                username: false,
                password: true,
                unencrypted_warning: false,
            },
            SecurityClass::Enterprise => FormRequirements {
                username: true,
                password: true,
                unencrypted_warning: false,
            },
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            SecurityClass::Open => "Open network",
            SecurityClass::Secured => "Secured network",
            SecurityClass::Enterprise => "Enterprise network (WPA2-Enterprise)",
        }
    }

    /// Short list badge; open networks carry none.
    pub fn badge(self) -> Option<&'static str> {
        match self {
            SecurityClass::Open => None,
            SecurityClass::Secured => Some("Secured"),
            SecurityClass::Enterprise => Some("Enterprise"),
        }
    }
}

/// Mandatory fields of the credential form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FormRequirements {
    pub username: bool,
    pub password: bool,
    /// Open networks are joined without encryption; the form warns about it.
    pub unencrypted_warning: bool,
}

/// `POST /api/connect` 的请求体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectRequest {
    #[serde(default)]
    pub ssid: String,
    #[serde(default)]
    pub pass: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Present as the string `"true"` for enterprise targets only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enterprise: Option<String>,
}

impl ConnectRequest {
    pub fn is_enterprise(&self) -> bool {
        self.enterprise.as_deref() == Some("true")
    }
}

/// Synchronous answer to a connect request.
///
/// Only an explicit `"ok": false` is a rejection. A missing `ok`, any other
/// value, or a body that is not a JSON object means the device accepted the
/// attempt and started connecting in the background.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectResponse {
    pub ok: Option<Value>,
    pub msg: Option<String>,
}

impl ConnectResponse {
    pub fn accepted() -> Self {
        Self::default()
    }

    pub fn rejected(msg: impl Into<String>) -> Self {
        Self {
            ok: Some(Value::Bool(false)),
            msg: Some(msg.into()),
        }
    }

    pub fn from_value(body: &Value) -> Self {
        let Some(object) = body.as_object() else {
            return Self::default();
        };
        Self {
            ok: object.get("ok").cloned(),
            msg: object
                .get("msg")
                .and_then(Value::as_str)
                .filter(|msg| !msg.is_empty())
                .map(str::to_string),
        }
    }

    /// The user-facing rejection message, or `None` when the attempt was accepted.
    pub fn rejection(&self) -> Option<String> {
        if self.ok == Some(Value::Bool(false)) {
            Some(
                self.msg
                    .clone()
                    .unwrap_or_else(|| DEFAULT_REJECTION_MESSAGE.to_string()),
            )
        } else {
            None
        }
    }
}

/// `GET /api/status` 的响应体
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl StatusResponse {
    pub fn connecting() -> Self {
        Self {
            status: "connecting".to_string(),
            ..Self::default()
        }
    }

    pub fn idle() -> Self {
        Self {
            status: "idle".to_string(),
            ..Self::default()
        }
    }

    pub fn connected(ip: impl Into<String>) -> Self {
        Self {
            status: "connected".to_string(),
            ip: Some(ip.into()),
            msg: None,
        }
    }

    pub fn failed(msg: impl Into<String>) -> Self {
        Self {
            status: "failed".to_string(),
            ip: None,
            msg: Some(msg.into()),
        }
    }

    /// Classifies the probe answer for the poller.
    pub fn outcome(&self) -> ProbeOutcome {
        match self.status.as_str() {
            "connected" => ProbeOutcome::Connected {
                ip: self.ip.clone().unwrap_or_default(),
            },
            "failed" => ProbeOutcome::Failed {
                message: self
                    .msg
                    .clone()
                    .filter(|msg| !msg.is_empty())
                    .unwrap_or_else(|| DEFAULT_REJECTION_MESSAGE.to_string()),
            },
            other => ProbeOutcome::Pending(other.to_string()),
        }
    }
}

/// What a single status probe told us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Connected { ip: String },
    Failed { message: String },
    /// `connecting`, `idle` or anything else the device may send.
    Pending(String),
}
