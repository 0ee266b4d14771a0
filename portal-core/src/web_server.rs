use crate::simulator::SimulatedDevice;
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Address the real device serves its portal from; unknown paths redirect here.
pub const PORTAL_URL: &str = "http://192.168.4.1/";

// The shared state for the simulator routes.
pub type SimulatorState = State<Arc<SimulatedDevice>>;

/// Builds the router of the simulated device portal.
pub fn router(device: Arc<SimulatedDevice>) -> Router {
    Router::new()
        .route("/api/scan", get(api_scan))
        .route("/api/connect", post(api_connect))
        .route("/api/status", get(api_status))
        .route("/generate_204", get(handle_captive_portal))
        .fallback(redirect_to_portal)
        .with_state(device)
}

/// Binds the simulator and serves it in the background.
///
/// # Returns
/// The bound address (useful with port `0`) and a `JoinHandle` for the server task.
pub async fn start_simulator(
    device: Arc<SimulatedDevice>,
    addr: SocketAddr,
) -> crate::Result<(SocketAddr, JoinHandle<crate::Result<()>>)> {
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    let app = router(device);

    tracing::info!("🌐 Simulated device listening on {}", local_addr);

    let task = tokio::spawn(async move {
        axum::serve(listener, app.into_make_service())
            .await
            .map_err(|e| crate::Error::WebServer(e.into()))
    });
    Ok((local_addr, task))
}

// --- Route Handlers ---

async fn api_scan(State(device): SimulatorState) -> impl IntoResponse {
    tracing::debug!("Handling /api/scan");
    (StatusCode::OK, Json(device.scan()))
}

/// The body is taken raw so malformed JSON gets the device's own
/// `{"ok":false}` answer instead of the extractor's rejection.
async fn api_connect(State(device): SimulatorState, body: Bytes) -> impl IntoResponse {
    tracing::debug!("Handling /api/connect ({} bytes)", body.len());
    let (status, reply) = device.connect(&body).await;
    (status, Json(reply))
}

async fn api_status(State(device): SimulatorState) -> impl IntoResponse {
    (StatusCode::OK, Json(device.status().await))
}

/// 处理捕获门户检测请求（Captive Portal Detection），静默返回 204。
async fn handle_captive_portal() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

async fn redirect_to_portal() -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, PORTAL_URL)])
}
