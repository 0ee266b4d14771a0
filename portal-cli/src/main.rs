mod prompt;
mod render;
mod runner;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use portal_core::ConnectionController;
use portal_core::backends::http::HttpPortalApi;
use portal_core::config::{
    ClientConfig, SimulatorConfig, load_config_from_path, load_simulator_config_from_path,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "portal", version)]
#[command(about = "Provision a device's Wi-Fi through its captive portal")]
struct Cli {
    /// Client config file (TOML). Built-in defaults are used when absent.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Portal address of the device, overrides the config file
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Simulated device definition (TOML)
    #[arg(long, global = true)]
    sim_config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List the networks the device can see
    Scan {
        /// Run against an in-process simulated device
        #[arg(long)]
        simulate: bool,
    },
    /// Pick a network, send credentials and follow the attempt
    Connect(ConnectArgs),
    /// Serve the simulated device portal
    Simulate {
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: SocketAddr,
    },
}

#[derive(Debug, Args)]
struct ConnectArgs {
    #[arg(long)]
    ssid: Option<String>,
    #[arg(long)]
    username: Option<String>,
    #[arg(long)]
    password: Option<String>,
    /// Give up on an attempt that is still connecting after this many seconds
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,
    /// Run against an in-process simulated device
    #[arg(long)]
    simulate: bool,
}

#[tokio::main]
async fn main() {
    // 初始化日志，级别由 RUST_LOG 控制
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        tracing::error!("❌ {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => load_config_from_path(path)?,
        None => ClientConfig::default(),
    };
    if let Some(base_url) = &cli.base_url {
        config.device.base_url = base_url.clone();
    }

    match cli.command {
        Commands::Simulate { bind } => {
            let sim_config = simulator_config(cli.sim_config.as_ref())?;
            runner::run_simulator(sim_config, bind).await
        }
        Commands::Scan { simulate } => {
            let simulator = start_in_process(simulate, cli.sim_config.as_ref(), &mut config).await?;
            let mut controller = build_controller(&config)?;
            let result = runner::run_scan(&mut controller).await;
            stop_in_process(simulator);
            result
        }
        Commands::Connect(args) => {
            let simulator =
                start_in_process(args.simulate, cli.sim_config.as_ref(), &mut config).await?;
            let mut controller = build_controller(&config)?;
            let mut prompt = prompt::Prompt::new(BufReader::new(tokio::io::stdin()));
            let options = runner::ConnectOptions {
                ssid: args.ssid,
                username: args.username,
                password: args.password,
                timeout: Duration::from_secs(args.timeout_secs),
            };
            let result = runner::run_connect(&mut controller, &mut prompt, options).await;
            stop_in_process(simulator);
            if let Ok(None) = result {
                println!("Cancelled.");
            }
            result.map(|_| ())
        }
    }
}

fn build_controller(config: &ClientConfig) -> Result<ConnectionController<HttpPortalApi>> {
    let api = HttpPortalApi::new(&config.device)?;
    tracing::info!("🚀 Using device portal at {}", api.base_url());
    Ok(ConnectionController::new(Arc::new(api), config.poll)
        .with_observer(Arc::new(render::TerminalObserver)))
}

fn simulator_config(path: Option<&PathBuf>) -> Result<SimulatorConfig> {
    Ok(match path {
        Some(path) => load_simulator_config_from_path(path)?,
        None => SimulatorConfig::default(),
    })
}

// --simulate: 在本进程内启动模拟设备，并把客户端指向它
async fn start_in_process(
    enabled: bool,
    sim_config: Option<&PathBuf>,
    config: &mut ClientConfig,
) -> Result<Option<JoinHandle<portal_core::Result<()>>>> {
    if !enabled {
        return Ok(None);
    }
    let bind: SocketAddr = ([127, 0, 0, 1], 0).into();
    let (addr, server) = runner::spawn_simulator(simulator_config(sim_config)?, bind).await?;
    config.device.base_url = format!("http://{}", addr);
    Ok(Some(server))
}

fn stop_in_process(server: Option<JoinHandle<portal_core::Result<()>>>) {
    if let Some(server) = server {
        server.abort();
    }
}
