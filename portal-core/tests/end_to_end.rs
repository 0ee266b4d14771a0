use portal_core::backends::http::HttpPortalApi;
use portal_core::config::{DeviceConfig, PollConfig, SimNetwork, SimulatorConfig};
use portal_core::controller::REQUEST_FAILED_MESSAGE;
use portal_core::simulator::{MSG_USERNAME_REQUIRED, MSG_WPA_FAILED, SimulatedDevice};
use portal_core::web_server::start_simulator;
use portal_core::{ConnectionController, ConnectionState, FailureKind};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::timeout;

// Integration tests: controller -> reqwest -> axum simulator, over loopback.

fn network(ssid: &str, rssi: i32, password: Option<&str>) -> SimNetwork {
    SimNetwork {
        ssid: ssid.to_string(),
        rssi,
        ch: 6,
        open: password.is_none(),
        enterprise: false,
        username: None,
        password: password.map(str::to_string),
        internet: true,
    }
}

fn simulator_config() -> SimulatorConfig {
    let mut corp = network("Corp", -65, Some("s3cret"));
    corp.enterprise = true;
    corp.username = Some("alice".to_string());

    SimulatorConfig {
        networks: vec![
            network("Home", -45, Some("hunter22")),
            network("Home", -75, Some("hunter22")),
            network("Cafe", -55, None),
            corp,
        ],
        assigned_ip: "10.0.0.5".to_string(),
        association_delay: Duration::from_millis(150),
        wpa_deadline: Duration::from_millis(400),
        enterprise_deadline: Duration::from_millis(600),
        enterprise_supported: true,
    }
}

async fn spawn_device() -> (String, JoinHandle<portal_core::Result<()>>) {
    let device = Arc::new(SimulatedDevice::new(simulator_config()));
    let addr: SocketAddr = "127.0.0.1:0".parse().expect("valid socket address");
    let (local_addr, server) = start_simulator(device, addr)
        .await
        .expect("simulator binds");
    (format!("http://{}", local_addr), server)
}

fn controller(base_url: &str) -> ConnectionController<HttpPortalApi> {
    let api = HttpPortalApi::new(&DeviceConfig {
        base_url: base_url.to_string(),
        request_timeout: Duration::from_secs(2),
    })
    .expect("failed to build HTTP client");
    ConnectionController::new(
        Arc::new(api),
        PollConfig {
            interval: Duration::from_millis(50),
        },
    )
}

#[tokio::test]
async fn scan_over_http_is_consolidated() {
    let (base_url, server) = spawn_device().await;
    let mut controller = controller(&base_url);

    let catalog = controller.scan().await.expect("scan succeeds");
    let names: Vec<&str> = catalog.iter().map(|n| n.ssid.as_str()).collect();
    assert_eq!(names, vec!["Home", "Cafe", "Corp"]);
    assert_eq!(catalog[0].rssi, -45);

    server.abort();
}

#[tokio::test]
async fn secured_network_connects() {
    let (base_url, server) = spawn_device().await;
    let mut controller = controller(&base_url);

    controller.select_network("Home", false, false).unwrap();
    controller.set_password("hunter22").unwrap();
    assert_eq!(controller.submit().await.unwrap(), &ConnectionState::Polling);

    let outcome = timeout(Duration::from_secs(5), controller.next_outcome())
        .await
        .expect("outcome before timeout");
    assert_eq!(outcome, Some(ConnectionState::Succeeded { ip: "10.0.0.5".into() }));
    assert!(controller.selection().is_none());

    server.abort();
}

#[tokio::test]
async fn wrong_password_then_retry() {
    let (base_url, server) = spawn_device().await;
    let mut controller = controller(&base_url);

    controller.select_network("Home", false, false).unwrap();
    controller.set_password("wrong").unwrap();
    controller.submit().await.unwrap();

    let outcome = timeout(Duration::from_secs(5), controller.next_outcome())
        .await
        .expect("outcome before timeout");
    assert_eq!(
        outcome,
        Some(ConnectionState::Failed {
            kind: FailureKind::Connection,
            message: MSG_WPA_FAILED.into()
        })
    );
    assert_eq!(controller.selection().unwrap().ssid(), "Home");

    controller.set_password("hunter22").unwrap();
    controller.submit().await.unwrap();
    let outcome = timeout(Duration::from_secs(5), controller.next_outcome())
        .await
        .expect("outcome before timeout");
    assert_eq!(outcome, Some(ConnectionState::Succeeded { ip: "10.0.0.5".into() }));

    server.abort();
}

#[tokio::test]
async fn open_network_connects_without_credentials() {
    let (base_url, server) = spawn_device().await;
    let mut controller = controller(&base_url);

    let requirements = controller.select_network("Cafe", true, false).unwrap();
    assert!(!requirements.password);
    controller.submit().await.unwrap();

    let outcome = timeout(Duration::from_secs(5), controller.next_outcome())
        .await
        .expect("outcome before timeout");
    assert_eq!(outcome, Some(ConnectionState::Succeeded { ip: "10.0.0.5".into() }));

    server.abort();
}

#[tokio::test]
async fn enterprise_without_username_is_rejected() {
    let (base_url, server) = spawn_device().await;
    let mut controller = controller(&base_url);

    controller.select_network("Corp", false, true).unwrap();
    controller.set_password("s3cret").unwrap();
    let state = controller.submit().await.unwrap().clone();

    assert_eq!(
        state,
        ConnectionState::Failed {
            kind: FailureKind::Validation,
            message: MSG_USERNAME_REQUIRED.into()
        }
    );
    assert!(!controller.poller_active());

    controller.set_username("alice").unwrap();
    controller.submit().await.unwrap();
    let outcome = timeout(Duration::from_secs(5), controller.next_outcome())
        .await
        .expect("outcome before timeout");
    assert_eq!(outcome, Some(ConnectionState::Succeeded { ip: "10.0.0.5".into() }));

    server.abort();
}

#[tokio::test]
async fn unreachable_device_fails_with_request_message() {
    // grab a free port, then close it again
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let mut controller = controller(&base_url);
    assert!(controller.scan().await.is_err());
    assert!(controller.catalog().is_empty());

    controller.select_network("Home", false, false).unwrap();
    controller.set_password("hunter22").unwrap();
    let state = controller.submit().await.unwrap().clone();
    assert_eq!(
        state,
        ConnectionState::Failed {
            kind: FailureKind::Transport,
            message: REQUEST_FAILED_MESSAGE.into()
        }
    );
}

#[tokio::test]
async fn captive_portal_probes_and_redirects() {
    let (base_url, server) = spawn_device().await;
    let client = reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    let probe = client
        .get(format!("{}/generate_204", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(probe.status(), reqwest::StatusCode::NO_CONTENT);

    let other = client
        .get(format!("{}/hotspot-detect.html", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(other.status(), reqwest::StatusCode::FOUND);
    assert_eq!(
        other.headers().get(reqwest::header::LOCATION).unwrap(),
        "http://192.168.4.1/"
    );

    let malformed = client
        .post(format!("{}/api/connect", base_url))
        .body("not json")
        .send()
        .await
        .unwrap();
    assert_eq!(malformed.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = malformed.json().await.unwrap();
    assert_eq!(body, serde_json::json!({"ok": false, "msg": "No body"}));

    server.abort();
}
