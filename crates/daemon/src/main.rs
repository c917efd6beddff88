// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ATS OLC server (`atsd`)
//!
//! The process an ATS Server Preparer launches and supervises. Binds the
//! control/session TCP services, prints the readiness marker the
//! in-process-supervised launch strategy watches for (§4.1 step 4, §6
//! "Process interface"), then serves requests until killed.

use std::sync::Arc;

use ats_daemon::config::{DaemonConfig, READY_MARKER};
use ats_daemon::lifecycle::ServerState;
use ats_daemon::wire;
use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("atsd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("atsd {}", env!("CARGO_PKG_VERSION"));
                println!("ATS OLC server; launched and supervised by the `ats` CLI.");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: atsd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let _log_guard = setup_logging();

    let config = DaemonConfig::load();
    info!(port = config.port, "starting OLC server");

    let listener = TcpListener::bind(("127.0.0.1", config.port)).await?;
    let state = ServerState::new(config);

    // Readiness marker: printed to stdout only once the listener is bound,
    // so the in-process-supervised launch strategy can treat its arrival as
    // "safe to connect" (§4.1 step 4).
    println!("{READY_MARKER} (pid: {})", std::process::id());

    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(err) => {
                warn!(error = %err, "accept failed");
                continue;
            }
        };
        let state = state.clone();
        tokio::spawn(async move {
            if let Err(err) = serve_connection(state, socket).await {
                warn!(peer = %peer, error = %err, "connection ended with error");
            }
        });
    }
}

async fn serve_connection(
    state: Arc<ServerState>,
    mut socket: TcpStream,
) -> Result<(), wire::ProtocolError> {
    loop {
        let request = match wire::read_request(&mut socket, wire::DEFAULT_TIMEOUT).await {
            Ok(request) => request,
            Err(wire::ProtocolError::ConnectionClosed) => return Ok(()),
            Err(err) => return Err(err),
        };
        let response = state.handle_request(request).await;
        wire::write_response(&mut socket, &response, wire::DEFAULT_TIMEOUT).await?;
    }
}

fn setup_logging() -> tracing_appender::non_blocking::WorkerGuard {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stderr());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    guard
}
