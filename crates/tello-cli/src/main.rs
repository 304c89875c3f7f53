use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use tello_link::{doctor as link_doctor, Endpoint, LinkConfig, LinkEvent, LinkObserver, LinkStateChange, TelloLink};
use tello_proto::{CommandResponse, ControlCommand, ResponseCode, TelemetryFrame};
use tello_script::{doctor as script_doctor, ScriptConfig, ScriptRunner};

#[derive(Debug, Parser)]
#[command(name = "tello", version, about = "Tello SDK control channel client")]
struct Cli {
    /// TOML config; built-in defaults target the drone's own access point.
    #[arg(long)]
    config: Option<String>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate the config.
    Doctor,
    /// Send one command without waiting for the reply.
    Send {
        #[arg(required = true, trailing_var_arg = true)]
        command: Vec<String>,
    },
    /// Send one command and wait for the reply.
    Ask {
        #[arg(long)]
        timeout: Option<u64>,
        #[arg(required = true, trailing_var_arg = true)]
        command: Vec<String>,
    },
    /// Run a command script file.
    Script { path: String },
    /// Enter SDK mode and record telemetry.
    Record {
        #[arg(long, default_value_t = 10)]
        seconds: u64,
    },
    /// Print every response, state line and link change until Ctrl-C.
    Monitor {
        /// Stop after this many seconds.
        #[arg(long)]
        seconds: Option<u64>,
    },
}

#[derive(Debug, Default, serde::Deserialize)]
struct Config {
    #[serde(default)]
    link: LinkConfig,
    #[serde(default)]
    script: ScriptConfig,
}

fn load_config(path: Option<&str>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let s = std::fs::read_to_string(path).with_context(|| format!("read config {}", path))?;
    toml::from_str(&s).context("parse config toml")
}

/// Mirrors link traffic into the log.
struct LogObserver;

impl LinkObserver for LogObserver {
    fn on_response(&self, response: &CommandResponse) {
        info!("recv: {}", response);
    }

    fn on_state_changed(&self, change: &LinkStateChange) {
        match &change.reason {
            None => info!("link: {:?}", change.state),
            Some(reason) => warn!("link: {:?} ({:?})", change.state, reason),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = load_config(cli.config.as_deref())?;
    let endpoint = Endpoint::from(&cfg.link);

    match cli.cmd {
        Command::Doctor => doctor(&cfg)?,
        Command::Send { command } => send(endpoint, &command.join(" ")).await?,
        Command::Ask { timeout, command } => {
            let timeout = timeout.unwrap_or(cfg.script.default_timeout_s);
            ask(endpoint, &command.join(" "), timeout).await?
        }
        Command::Script { path } => script(endpoint, &cfg.script, &path).await?,
        Command::Record { seconds } => record(endpoint, cfg.script.default_timeout_s, seconds).await?,
        Command::Monitor { seconds } => monitor(endpoint, seconds).await?,
    }
    Ok(())
}

fn doctor(cfg: &Config) -> Result<()> {
    info!("doctor: starting");
    link_doctor::check_link(&cfg.link)?;
    script_doctor::check_script(&cfg.script)?;
    info!("doctor: OK");
    Ok(())
}

async fn connect(endpoint: Endpoint, observer: Arc<dyn LinkObserver>) -> Result<TelloLink> {
    let peer = endpoint.peer();
    let link = TelloLink::new(endpoint, observer);
    link.connect().await.with_context(|| format!("connect to {}", peer))?;
    Ok(link)
}

/// Commands outside the palette are still sent; the drone has the last word.
fn check_palette(command: &str) {
    if let Err(e) = command.parse::<ControlCommand>() {
        warn!("{} (sending anyway)", e);
    }
}

async fn send(endpoint: Endpoint, command: &str) -> Result<()> {
    check_palette(command);
    let link = connect(endpoint, Arc::new(LogObserver)).await?;
    link.send(command).await.context("send")?;
    // give the reply a moment to be logged
    tokio::time::sleep(Duration::from_secs(1)).await;
    link.disconnect();
    Ok(())
}

async fn ask(endpoint: Endpoint, command: &str, timeout_s: u64) -> Result<()> {
    check_palette(command);
    let link = connect(endpoint, Arc::new(LogObserver)).await?;
    let response = link.send_and_await(command, timeout_s).await.context("ask")?;
    println!("{}", response);
    link.disconnect();
    anyhow::ensure!(response.code != ResponseCode::Error, "drone rejected {:?}", command);
    Ok(())
}

async fn script(endpoint: Endpoint, cfg: &ScriptConfig, path: &str) -> Result<()> {
    let text = std::fs::read_to_string(path).with_context(|| format!("read script {}", path))?;
    let link = connect(endpoint, Arc::new(LogObserver)).await?;

    let runner = ScriptRunner::new(link.clone()).with_default_timeout(cfg.default_timeout_s);
    let result = runner.spawn(text).await.context("script task")?;
    link.disconnect();

    match result {
        Ok(report) => {
            println!("script OK: {} commands in {:.1}s", report.commands, report.elapsed.as_secs_f32());
            Ok(())
        }
        Err(e) => {
            error!("script: {:#}", anyhow::Error::from(e));
            anyhow::bail!("script {} failed", path)
        }
    }
}

async fn record(endpoint: Endpoint, timeout_s: u64, seconds: u64) -> Result<()> {
    let link = connect(endpoint, Arc::new(LogObserver)).await?;
    let response = link
        .send_and_await(&ControlCommand::Command.to_string(), timeout_s)
        .await
        .context("enter SDK mode")?;
    anyhow::ensure!(response.is_ok(), "drone refused SDK mode: {}", response);

    link.start_recording();
    tokio::time::sleep(Duration::from_secs(seconds)).await;
    let recording = link.end_recording();
    link.disconnect();

    println!("recording started {}", recording.started_at);
    for frame in &recording.frames {
        println!("{}", frame);
    }
    println!("frames={}", recording.len());
    Ok(())
}

async fn monitor(endpoint: Endpoint, seconds: Option<u64>) -> Result<()> {
    let (tx, mut events) = mpsc::unbounded_channel::<LinkEvent>();
    let link = connect(endpoint, Arc::new(tx)).await?;
    link.send(&ControlCommand::Command.to_string()).await.context("enter SDK mode")?;

    let limit = async {
        match seconds {
            Some(s) => tokio::time::sleep(Duration::from_secs(s)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(limit);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = &mut limit => break,
            event = events.recv() => match event {
                Some(LinkEvent::Response(r)) => println!("response {}", r),
                Some(LinkEvent::Telemetry(f)) => print_frame(&f),
                Some(LinkEvent::State(change)) => {
                    println!("state {:?} {:?}", change.state, change.reason);
                    if change.reason.is_some() {
                        break;
                    }
                }
                None => break,
            },
        }
    }

    let status = link.status();
    link.disconnect();
    println!("responses={} frames={}", status.responses_received, status.frames_received);
    Ok(())
}

fn print_frame(frame: &TelemetryFrame) {
    println!("state {}", frame);
}
