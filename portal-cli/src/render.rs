use portal_core::controller::LifecycleEvent;
use portal_core::traits::LifecycleObserver;
use portal_core::{DisplayNetwork, FailureKind};

/// Four-level signal strength used for the bar display.
pub fn signal_level(rssi: i32) -> u8 {
    if rssi > -50 {
        4
    } else if rssi > -65 {
        3
    } else if rssi > -80 {
        2
    } else {
        1
    }
}

pub fn signal_bars(rssi: i32) -> String {
    const BARS: [char; 4] = ['▂', '▄', '▆', '█'];
    let level = signal_level(rssi) as usize;
    BARS.iter()
        .enumerate()
        .map(|(i, bar)| if i < level { *bar } else { ' ' })
        .collect()
}

/// 一行网络列表，如 ` 1. HomeWiFi   [Secured]   ▂▄▆  -58 dBm  ch 6`
pub fn network_line(index: usize, network: &DisplayNetwork) -> String {
    let badge = network
        .security()
        .badge()
        .map(|b| format!("[{}]", b))
        .unwrap_or_default();
    format!(
        "{:>2}. {:<32} {:<12} {} {:>4} dBm  ch {}",
        index + 1,
        network.ssid,
        badge,
        signal_bars(network.rssi),
        network.rssi,
        network.ch
    )
}

pub fn print_catalog(networks: &[DisplayNetwork]) {
    if networks.is_empty() {
        println!("📭 No networks found.");
        return;
    }
    for (i, network) in networks.iter().enumerate() {
        println!("{}", network_line(i, network));
    }
}

pub fn failure_title(kind: FailureKind) -> &'static str {
    match kind {
        FailureKind::Transport => "Request failed",
        FailureKind::Validation => "Rejected by the device",
        FailureKind::Connection => "Connection failed",
    }
}

/// 把控制器事件打印到终端
#[derive(Debug, Default)]
pub struct TerminalObserver;

impl LifecycleObserver for TerminalObserver {
    fn notify(&self, event: &LifecycleEvent) {
        match event {
            LifecycleEvent::CatalogUpdated(networks) => {
                println!("📶 Available networks:");
                print_catalog(networks);
            }
            LifecycleEvent::ScanFailed { message } => {
                println!("❌ Failed to load networks: {}", message);
            }
            LifecycleEvent::FormOpened { ssid, security, requirements } => {
                println!("🔐 {} ({})", ssid, security.description());
                if requirements.unencrypted_warning {
                    println!("⚠️  This network is not encrypted. Traffic can be seen by others nearby.");
                }
            }
            LifecycleEvent::Submitting { ssid } => println!("⏳ Sending credentials for '{}'...", ssid),
            LifecycleEvent::PollingStarted { ssid } => {
                println!("⏳ Connecting to '{}'. The device may take a moment...", ssid)
            }
            LifecycleEvent::Connected { ip } => {
                if ip.is_empty() {
                    println!("✅ Connected!");
                } else {
                    println!("✅ Connected! Device IP: {}", ip);
                }
            }
            LifecycleEvent::Failed { kind, message } => {
                println!("❌ {}: {}", failure_title(*kind), message);
            }
            LifecycleEvent::Closed => {}
        }
    }
}
