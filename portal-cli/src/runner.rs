use crate::prompt::Prompt;
use anyhow::{Context, Result, anyhow, bail};
use portal_core::config::SimulatorConfig;
use portal_core::simulator::SimulatedDevice;
use portal_core::traits::PortalApi;
use portal_core::web_server;
use portal_core::{ConnectionController, ConnectionState, DisplayNetwork};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncBufRead;
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// 命令行传入的连接参数
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub ssid: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Upper bound for the `connecting` phase of one attempt.
    pub timeout: Duration,
}

pub async fn run_scan<A>(controller: &mut ConnectionController<A>) -> Result<()>
where
    A: PortalApi + ?Sized + 'static,
{
    controller
        .scan()
        .await
        .context("could not load the network list")?;
    Ok(())
}

/// Runs one provisioning session against the device.
///
/// Returns the device's new IP, or `None` when the user cancelled at the
/// retry prompt.
pub async fn run_connect<A, R>(
    controller: &mut ConnectionController<A>,
    prompt: &mut Prompt<R>,
    mut options: ConnectOptions,
) -> Result<Option<String>>
where
    A: PortalApi + ?Sized + 'static,
    R: AsyncBufRead + Unpin,
{
    controller
        .scan()
        .await
        .context("could not load the network list")?;
    let network = choose_network(controller.catalog(), options.ssid.as_deref(), prompt).await?;
    let requirements = controller.select_network(&network.ssid, network.open, network.enterprise)?;

    loop {
        if requirements.username {
            let username = match options.username.take() {
                Some(username) => username,
                None => ask_username(controller, prompt).await?,
            };
            controller.set_username(username)?;
        }
        if requirements.password {
            let password = match options.password.take() {
                Some(password) => password,
                None => prompt.ask("Password: ").await?,
            };
            controller.set_password(password)?;
        }

        let submitted = controller.submit().await?.clone();
        let outcome = match submitted {
            ConnectionState::Polling => match timeout(options.timeout, controller.next_outcome()).await {
                Ok(Some(state)) => state,
                Ok(None) => {
                    controller.cancel();
                    bail!("the device stopped reporting progress");
                }
                Err(_) => {
                    controller.cancel();
                    bail!(
                        "no result from the device after {}s, check whether it joined the network",
                        options.timeout.as_secs()
                    );
                }
            },
            other => other,
        };

        match outcome {
            ConnectionState::Succeeded { ip } => {
                controller.acknowledge()?;
                return Ok(Some(ip));
            }
            ConnectionState::Failed { .. } => {
                let retry = prompt
                    .ask_optional("Type r to try again, or press Enter to cancel: ")
                    .await?;
                if retry.is_none() {
                    controller.cancel();
                    return Ok(None);
                }
            }
            other => bail!("unexpected controller state '{}'", other.name()),
        }
    }
}

async fn choose_network<R>(
    catalog: &[DisplayNetwork],
    ssid: Option<&str>,
    prompt: &mut Prompt<R>,
) -> Result<DisplayNetwork>
where
    R: AsyncBufRead + Unpin,
{
    if let Some(ssid) = ssid {
        return catalog
            .iter()
            .find(|n| n.ssid == ssid)
            .cloned()
            .ok_or_else(|| anyhow!("network '{}' was not found in the scan", ssid));
    }
    if catalog.is_empty() {
        bail!("no networks to choose from");
    }
    loop {
        let answer = prompt
            .ask(&format!("Select a network [1-{}]: ", catalog.len()))
            .await?;
        match answer.trim().parse::<usize>() {
            Ok(n) if (1..=catalog.len()).contains(&n) => return Ok(catalog[n - 1].clone()),
            _ => println!("Please enter a number between 1 and {}.", catalog.len()),
        }
    }
}

// 重试时回车保留上次输入的用户名
async fn ask_username<A, R>(
    controller: &ConnectionController<A>,
    prompt: &mut Prompt<R>,
) -> Result<String>
where
    A: PortalApi + ?Sized + 'static,
    R: AsyncBufRead + Unpin,
{
    let previous = controller
        .selection()
        .and_then(|s| s.credentials().username.clone())
        .filter(|u| !u.is_empty());
    match previous {
        Some(previous) => Ok(prompt
            .ask_optional(&format!("Username [{}]: ", previous))
            .await?
            .unwrap_or(previous)),
        None => prompt.ask("Username: ").await,
    }
}

/// Serves the simulated device until the server fails or Ctrl-C is pressed.
pub async fn run_simulator(config: SimulatorConfig, bind: SocketAddr) -> Result<()> {
    let (addr, server) = spawn_simulator(config, bind).await?;
    println!("🤖 Simulated device portal at http://{}", addr);
    tokio::select! {
        result = server => result??,
        _ = tokio::signal::ctrl_c() => println!("👋 Shutting down simulator"),
    }
    Ok(())
}

pub async fn spawn_simulator(
    config: SimulatorConfig,
    bind: SocketAddr,
) -> Result<(SocketAddr, JoinHandle<portal_core::Result<()>>)> {
    let device = Arc::new(SimulatedDevice::new(config));
    let started = web_server::start_simulator(device, bind)
        .await
        .with_context(|| format!("could not bind simulator to {}", bind))?;
    Ok(started)
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_core::RawNetwork;
    use portal_core::backends::mock::{MockPortalApi, Scripted};
    use portal_core::config::PollConfig;
    use portal_core::structs::StatusResponse;
    use tokio::io::BufReader;

    fn raw(ssid: &str, rssi: i32, open: bool, enterprise: bool) -> RawNetwork {
        RawNetwork {
            ssid: ssid.into(),
            rssi,
            ch: 6,
            open,
            enterprise,
        }
    }

    fn setup() -> (Arc<MockPortalApi>, ConnectionController<MockPortalApi>) {
        let api = Arc::new(MockPortalApi::new());
        api.push_scan(Scripted::Reply(vec![
            raw("Home", -50, false, false),
            raw("Cafe", -70, true, false),
            raw("Corp", -60, false, true),
            raw("Home", -80, false, false),
        ]));
        let controller = ConnectionController::new(
            Arc::clone(&api),
            PollConfig {
                interval: Duration::from_millis(100),
            },
        );
        (api, controller)
    }

    fn options() -> ConnectOptions {
        ConnectOptions {
            ssid: None,
            username: None,
            password: None,
            timeout: Duration::from_secs(30),
        }
    }

    fn input(text: &'static str) -> Prompt<BufReader<&'static [u8]>> {
        Prompt::new(BufReader::new(text.as_bytes()))
    }

    #[tokio::test(start_paused = true)]
    async fn picks_by_number_and_connects() {
        let (api, mut controller) = setup();
        api.push_status(Scripted::Reply(StatusResponse::connected("10.0.0.5")));
        let mut prompt = input("9\n1\nhunter22\n");

        let ip = run_connect(&mut controller, &mut prompt, options()).await.unwrap();

        assert_eq!(ip.as_deref(), Some("10.0.0.5"));
        let requests = api.connect_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].ssid, "Home");
        assert_eq!(requests[0].pass, "hunter22");
        assert_eq!(controller.state(), &ConnectionState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn open_network_by_name_needs_no_input() {
        let (api, mut controller) = setup();
        api.push_status(Scripted::Reply(StatusResponse::connected("10.0.0.7")));
        let mut prompt = input("");
        let options = ConnectOptions {
            ssid: Some("Cafe".into()),
            ..options()
        };

        let ip = run_connect(&mut controller, &mut prompt, options).await.unwrap();
        assert_eq!(ip.as_deref(), Some("10.0.0.7"));
        assert_eq!(api.connect_requests()[0].pass, "");
    }

    #[tokio::test(start_paused = true)]
    async fn failure_then_retry_with_new_password() {
        let (api, mut controller) = setup();
        api.push_status(Scripted::Reply(StatusResponse::failed("wrong password")));
        api.push_status(Scripted::Reply(StatusResponse::connected("10.0.0.5")));
        let mut prompt = input("1\nbad\nr\nhunter22\n");

        let ip = run_connect(&mut controller, &mut prompt, options()).await.unwrap();

        assert_eq!(ip.as_deref(), Some("10.0.0.5"));
        let passwords: Vec<String> = api.connect_requests().into_iter().map(|r| r.pass).collect();
        assert_eq!(passwords, vec!["bad", "hunter22"]);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_line_at_retry_prompt_cancels() {
        let (api, mut controller) = setup();
        api.push_status(Scripted::Reply(StatusResponse::failed("wrong password")));
        let mut prompt = input("1\nbad\n\n");

        let ip = run_connect(&mut controller, &mut prompt, options()).await.unwrap();

        assert_eq!(ip, None);
        assert_eq!(controller.state(), &ConnectionState::Idle);
        assert!(controller.selection().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn enterprise_retry_keeps_previous_username() {
        let (api, mut controller) = setup();
        api.push_status(Scripted::Reply(StatusResponse::failed("auth failed")));
        api.push_status(Scripted::Reply(StatusResponse::connected("10.0.0.9")));
        let options = ConnectOptions {
            ssid: Some("Corp".into()),
            username: Some("alice".into()),
            password: Some("old".into()),
            ..options()
        };
        let mut prompt = input("r\n\nnew\n");

        let ip = run_connect(&mut controller, &mut prompt, options).await.unwrap();

        assert_eq!(ip.as_deref(), Some("10.0.0.9"));
        let requests = api.connect_requests();
        assert_eq!(requests[1].user.as_deref(), Some("alice"));
        assert_eq!(requests[1].pass, "new");
    }

    #[tokio::test(start_paused = true)]
    async fn endless_connecting_hits_timeout() {
        let (_api, mut controller) = setup();
        let options = ConnectOptions {
            ssid: Some("Home".into()),
            password: Some("hunter22".into()),
            timeout: Duration::from_secs(5),
            ..options()
        };
        let mut prompt = input("");

        let result = run_connect(&mut controller, &mut prompt, options).await;

        assert!(result.is_err());
        assert_eq!(controller.state(), &ConnectionState::Idle);
        assert!(!controller.poller_active());
    }

    #[tokio::test]
    async fn unknown_ssid_is_an_error() {
        let (_api, mut controller) = setup();
        let options = ConnectOptions {
            ssid: Some("Nowhere".into()),
            ..options()
        };
        let mut prompt = input("");
        let err = run_connect(&mut controller, &mut prompt, options).await.unwrap_err();
        assert!(err.to_string().contains("Nowhere"));
    }

    #[tokio::test]
    async fn simulator_binds_ephemeral_port() {
        let bind: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let (addr, server) = spawn_simulator(SimulatorConfig::default(), bind).await.unwrap();
        assert_ne!(addr.port(), 0);
        server.abort();
    }
}
