use async_trait::async_trait;

use crate::controller::LifecycleEvent;
use crate::structs::{ConnectRequest, ConnectResponse, RawNetwork, StatusResponse};

// 在这里定义设备端接口和表现层接口。

/// The three endpoints a provisioning device exposes while its portal is up.
///
/// Every method returns `Err` only when the request could not be completed
/// (device unreachable, connection dropped, unparsable body). A rejection
/// reported by the device is a successful `ConnectResponse`.
#[async_trait]
pub trait PortalApi: Send + Sync {
    /// `GET /api/scan`: one entry per radio observation, duplicates included.
    async fn scan(&self) -> crate::Result<Vec<RawNetwork>>;

    /// `POST /api/connect`: submit credentials for one network.
    async fn connect(&self, request: &ConnectRequest) -> crate::Result<ConnectResponse>;

    /// `GET /api/status`: progress of the background connection attempt.
    async fn status(&self) -> crate::Result<StatusResponse>;
}

/// 表现层接收控制器生命周期事件的接口
///
/// This should be a "fire and forget" sink: it is called synchronously from
/// controller transitions and must not block.
pub trait LifecycleObserver: Send + Sync {
    fn notify(&self, event: &LifecycleEvent);
}

/// Observer that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl LifecycleObserver for NoopObserver {
    fn notify(&self, _event: &LifecycleEvent) {}
}
