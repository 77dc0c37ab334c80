//! skaldd - the skald broadcast-automation daemon.
//!
//! Hosts a list controller and serves it over Bifrost, on TCP and on an
//! interactive console. Every subsystem hangs off one root client:
//!
//! ```text
//! Controller(ListRole) ── root Client
//!                           ├── copy ──► Console (Bifrost over stdio)
//!                           └── copy ──► NetServer ── copy per connection
//! ```
//!
//! SIGINT shuts the root client down gracefully; the process exits once
//! every subsystem has returned.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use skald_comm::Controller;
use skald_list::{List, ListRole};

use skaldd::config::Config;
use skaldd::console;
use skaldd::netsrv::NetServer;

/// skaldd - broadcast automation daemon
#[derive(Parser, Debug)]
#[command(name = "skaldd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "skaldd.toml")]
    config: PathBuf,

    /// Override the net server host from the config file
    #[arg(long)]
    host: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.debug);

    let mut config = Config::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(host) = args.host {
        config.net.host = host;
    }

    let (controller, mut root) = Controller::new(ListRole::new(List::new()));
    for list in &config.lists {
        // Mounting an external player service is configured here but wired
        // up elsewhere; a config that asks for one gets a warning until a
        // player transport is attached.
        if let Some(player) = &list.player {
            warn!(%player, "player mounts are not yet attached");
        }
    }
    let controller_task = tokio::spawn(controller.run());

    let ct = CancellationToken::new();
    let mut tasks = Vec::new();

    if config.net.enabled {
        let client = root.copy(&ct).await.context("copying client for net")?;
        let server = NetServer::bind(&config.net.host, client, ct.clone(), config.net.log)
            .await
            .with_context(|| format!("binding {}", config.net.host))?;
        tasks.push(tokio::spawn(server.run()));
    }

    if config.console.enabled {
        let client = root.copy(&ct).await.context("copying client for console")?;
        let console_ct = ct.clone();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = console::run(client, console_ct).await {
                warn!(error = %e, "console failed");
            }
        }));
    }

    // The root client sees every broadcast; drain them until shutdown.
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("listening for ctrl-c")?;
                info!("interrupt received; shutting down");
                break;
            }
            response = root.recv() => {
                if response.is_none() {
                    // Controller stopped without us: all clients left.
                    break;
                }
            }
        }
    }

    // Ask the controller to stop first, then release every subsystem.
    root.shutdown(&CancellationToken::new())
        .await
        .context("shutting down root client")?;
    ct.cancel();

    controller_task.await.context("joining controller")?;
    for task in tasks {
        task.await.context("joining subsystem")?;
    }

    info!("bye");
    Ok(())
}

fn init_tracing(debug: bool) {
    let default = if debug { "skaldd=debug,skald_comm=debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
