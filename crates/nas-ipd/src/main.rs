//! nas-ipd entry point.
//!
//! Subscribes to the interface and IPv6 observed-state channels and runs
//! the link-local and DAD reactors until a shutdown signal arrives or a
//! subscription closes.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use nas_ip_tool::IpTool;
use nas_ipd::{
    init_logging, DadReactor, LlaReactor, NasIpdConfig, RedisEventSource, DEFAULT_CONFIG_PATH,
};
use nas_os_common::SystemRunner;

/// NAS IP daemon
#[derive(Parser, Debug)]
#[command(name = "nas-ipd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log filter (e.g. `debug` or `nas_ip=debug,info`); takes precedence
    /// over RUST_LOG and logging.level from the config file
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = NasIpdConfig::load_or_default(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let explicit_level = args.log_level.is_some();
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    config.validate().context("invalid configuration")?;

    init_logging(&config.logging.level, explicit_level)?;
    info!("nas-ipd: Starting");

    match run_daemon(config).await {
        Ok(()) => {
            info!("nas-ipd: Exiting normally");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "nas-ipd: Exiting with error");
            Err(e)
        }
    }
}

async fn run_daemon(config: NasIpdConfig) -> anyhow::Result<()> {
    let tool = Arc::new(IpTool::new(SystemRunner, &config.tools));

    let url = &config.bus.redis_url;
    let interface_topic = &config.bus.interface_topic;
    let ipv6_topic = &config.bus.ipv6_topic;
    let interfaces = RedisEventSource::subscribe(url, interface_topic).await?;
    let addresses = RedisEventSource::subscribe(url, ipv6_topic).await?;

    let lla = LlaReactor::new(Arc::clone(&tool), interfaces);
    let dad = DadReactor::new(tool, addresses, config.dad.retry_interval());
    let mut lla: JoinHandle<()> = tokio::spawn(lla.run());
    let mut dad: JoinHandle<()> = tokio::spawn(dad.run());

    tokio::select! {
        res = &mut lla => warn!(result = ?res, "nas-ipd: LLA reactor ended"),
        res = &mut dad => warn!(result = ?res, "nas-ipd: DAD reactor ended"),
        () = shutdown_signal() => info!("nas-ipd: Received shutdown signal"),
    }

    lla.abort();
    dad.abort();
    info!("nas-ipd: Shutdown complete");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "nas-ipd: Cannot install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = signal::ctrl_c() => {}
        () = terminate => {}
    }
}
