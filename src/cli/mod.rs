//! # CLI Module
//!
//! Command-line entry point for the `wax_server` binary.
//!
//! ## Options
//!
//! - `-g`, `--global` - listen on `0.0.0.0` instead of `127.0.0.1`
//! - `--port <PORT>` - TCP port (default `5000`)
//! - `--signal_pid <PID>` - send `SIGUSR1` to `PID` once the listener is bound
//!   (also accepted as `--signal-pid`)
//! - `-v`, `--verbose` - debug-level logging
//!
//! A test harness typically starts the server as a child process, waits for
//! `SIGUSR1`, runs its requests and finally sends `GET /quit`.
//!
//! ```bash
//! wax_server --port 0 --signal_pid $$
//! ```
//!
//! Runtime tuning (`WAX_STACK_SIZE`, `WAX_WORKERS`, ...) and logging
//! (`WAX_LOG_*`) come from the environment; see
//! [`runtime_config`](crate::runtime_config) and [`logging`](crate::logging).

mod commands;


pub use commands::{run_cli, signal_ready, start_server, Cli, DEFAULT_PORT};
