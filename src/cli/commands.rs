use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tracing::{info, warn};

use crate::dispatcher::Dispatcher;
use crate::logging::{init_logging_with_config, LogConfig};
use crate::runtime_config::RuntimeConfig;
use crate::server::{HttpServer, ServerHandle};
use crate::store::Repository;

pub const DEFAULT_PORT: u16 = 5000;

/// Command-line interface for the Wax test server
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "wax_server", version)]
#[command(about = "In-memory Wax API server for HTTP client tests", long_about = None)]
pub struct Cli {
    /// Listen on all interfaces instead of loopback only
    #[arg(short = 'g', long = "global", default_value_t = false)]
    pub global: bool,

    /// TCP port to listen on (0 picks a free port)
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Send SIGUSR1 to this process once the listener is bound
    #[arg(
        long = "signal_pid",
        alias = "signal-pid",
        value_parser = clap::value_parser!(i32).range(1..)
    )]
    pub signal_pid: Option<i32>,

    /// Force debug-level logging
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Cli {
    /// Address to bind: `0.0.0.0` with `--global`, loopback otherwise.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        let ip = if self.global {
            Ipv4Addr::UNSPECIFIED
        } else {
            Ipv4Addr::LOCALHOST
        };
        SocketAddr::new(IpAddr::V4(ip), self.port)
    }

    /// Logging configuration from the environment, raised to debug by `--verbose`.
    #[must_use]
    pub fn log_config(&self) -> LogConfig {
        let mut config = LogConfig::from_env();
        if self.verbose {
            config.log_level = "debug".to_string();
        }
        config
    }
}

/// Start a server for `cli` with a fresh repository.
pub fn start_server(cli: &Cli, runtime: RuntimeConfig) -> Result<ServerHandle> {
    let repository = Arc::new(Repository::new());
    let dispatcher = Arc::new(Dispatcher::new(repository));
    let addr = cli.bind_addr();
    HttpServer::new(dispatcher, runtime)
        .start(addr)
        .with_context(|| format!("failed to bind {addr}"))
}

/// Tell the parent process the server is accepting connections.
#[cfg(unix)]
pub fn signal_ready(pid: i32) -> Result<()> {
    // SAFETY: kill(2) has no memory-safety preconditions; pid is validated positive by clap.
    let rc = unsafe { libc::kill(pid, libc::SIGUSR1) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error())
            .with_context(|| format!("failed to send SIGUSR1 to pid {pid}"));
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn signal_ready(pid: i32) -> Result<()> {
    Err(anyhow!("SIGUSR1 readiness signal is not supported on this platform (pid {pid})"))
}

/// Run the server until `/quit`.
pub fn run_cli(cli: Cli) -> Result<()> {
    init_logging_with_config(&cli.log_config())?;

    let runtime = RuntimeConfig::from_env();
    runtime.apply_to_runtime();

    let handle = start_server(&cli, runtime)?;
    info!(
        addr = %handle.local_addr(),
        global = cli.global,
        "Wax server ready"
    );

    if let Some(pid) = cli.signal_pid {
        match signal_ready(pid) {
            Ok(()) => info!(pid, "Sent readiness signal"),
            Err(e) => warn!(pid, error = %e, "Could not send readiness signal"),
        }
    }

    handle
        .join()
        .map_err(|_| anyhow!("accept coroutine panicked"))?;
    info!("Wax server exited");
    Ok(())
}
