// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ats` - client entrypoint for the ATS control plane: prepares (or
//! reuses) a live OLC server, then submits sessions and polls their
//! output (§2 components B, A, C).
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod config;
mod env;
mod server_preparer;
mod table;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use ats_core::ids::{ClientId, SessionId};
use ats_core::run_command::{DeviceTypeRequirement, RunCommand};
use ats_core::session::{AtsSessionPluginConfig, AtsSessionPluginOutput, DumpCommand, ListCommand, SessionStatus};
use clap::{Parser, Subcommand};

use crate::client::ControlClient;
use crate::config::PreparerConfig;
use crate::server_preparer::ServerPreparer;

#[derive(Parser)]
#[command(name = "ats", version, about = "ATS control-plane client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a RunCommand session and wait for it to finish, printing the
    /// final output.
    Run {
        /// xTS test plan name (e.g. "cts", "gts").
        test_plan: String,
        /// Root directory of the xTS installation.
        #[arg(long, default_value = "/xts")]
        xts_root_dir: String,
        /// xTS suite type (e.g. "cts").
        #[arg(long, default_value = "cts")]
        xts_type: String,
        /// Module include filters (repeatable).
        #[arg(long = "module")]
        modules: Vec<String>,
    },
    /// List modules under an xTS root without running anything.
    ListModules {
        #[arg(long, default_value = "/xts")]
        xts_root_dir: String,
        #[arg(long, default_value = "cts")]
        xts_type: String,
    },
    /// List sessions known to the server.
    Sessions {
        /// Only sessions whose name contains this substring.
        #[arg(long)]
        name: Option<String>,
    },
    /// Request cancellation of one or more sessions.
    Abort {
        session_ids: Vec<String>,
    },
    /// Print the server's version.
    Version,
    /// Kill the running server.
    Kill {
        /// Escalate to SIGKILL if the server refuses to die gracefully.
        #[arg(long)]
        forcibly: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();
    let cli = Cli::parse();

    let preparer_config = PreparerConfig::default();
    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], preparer_config.port));
    let client_id = ClientId::from(preparer_config.client_id.as_str());
    let preparer = Arc::new(ServerPreparer::new(preparer_config));

    if let Commands::Kill { forcibly } = cli.command {
        preparer.kill_existing(forcibly).await?;
        println!("server stopped");
        return Ok(());
    }

    preparer.prepare().await?;
    let _heartbeat = preparer.start_heartbeat();
    let control = ControlClient::new(addr);

    match cli.command {
        Commands::Kill { .. } => unreachable!("handled above"),
        Commands::Version => {
            let version = control.get_version().await?;
            println!("{} (pid {})", version.version_info, version.process_id);
        }
        Commands::Sessions { name } => {
            let sessions = control.get_all_sessions(name, None).await?;
            for s in sessions {
                println!("{}\t{:?}", s.session_id, s.status);
            }
        }
        Commands::Abort { session_ids } => {
            let ids: Vec<SessionId> = session_ids.into_iter().map(SessionId::from).collect();
            let aborted = control.abort_sessions(ids).await?;
            for id in aborted {
                println!("aborted {id}");
            }
        }
        Commands::ListModules { xts_root_dir, xts_type } => {
            let config = AtsSessionPluginConfig::ListCommand(ListCommand { xts_root_dir, xts_type });
            run_to_completion(&control, client_id, config).await?;
        }
        Commands::Run { test_plan, xts_root_dir, xts_type, modules } => {
            let run_command = build_run_command(test_plan, xts_root_dir, xts_type, modules);
            let config = AtsSessionPluginConfig::RunCommand(run_command);
            run_to_completion(&control, client_id, config).await?;
        }
    }

    Ok(())
}

fn build_run_command(
    test_plan: String,
    xts_root_dir: String,
    xts_type: String,
    modules: Vec<String>,
) -> RunCommand {
    RunCommand {
        test_plan,
        xts_root_dir,
        xts_type,
        device_serials_include: Vec::new(),
        device_serials_exclude: Vec::new(),
        module_include_filters: modules,
        module_exclude_filters: Vec::new(),
        module_metadata_include_filters: BTreeMap::new(),
        module_metadata_exclude_filters: BTreeMap::new(),
        module_args: Vec::new(),
        extra_args: Vec::new(),
        retries: Vec::new(),
        device_type_requirement: DeviceTypeRequirement::default(),
        min_battery_level: None,
        max_battery_level: None,
        min_sdk_level: None,
        max_sdk_level: None,
        enable_xts_dynamic_download: false,
        initial_command_line_args: None,
        device_property_map: BTreeMap::new(),
    }
}

/// Submits `config` and polls `GetSessionOutput` until the session reaches
/// `Finished`, then prints the result (§6: outputs are pulled by the
/// client, not pushed).
async fn run_to_completion(
    control: &ControlClient,
    client_id: ClientId,
    config: AtsSessionPluginConfig,
) -> Result<()> {
    let session_id = control.submit_session(client_id, config).await?;
    println!("submitted session {session_id}");

    loop {
        let sessions = control.get_all_sessions(None, None).await?;
        let Some(summary) = sessions.into_iter().find(|s| s.session_id == session_id) else {
            return Err(anyhow!("session {session_id} disappeared from the server"));
        };
        if summary.status == SessionStatus::Finished {
            break;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    match control.get_session_output(session_id).await? {
        Some(AtsSessionPluginOutput::Success { output_message }) => {
            println!("success: {output_message}");
        }
        Some(AtsSessionPluginOutput::Failure { error_message }) => {
            println!("failure: {error_message}");
            std::process::exit(1);
        }
        Some(AtsSessionPluginOutput::RunCommandState(state)) => {
            println!("still running: command {}", state.command_id);
        }
        None => println!("no output recorded"),
    }

    Ok(())
}

fn setup_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry().with(filter).with(fmt::layer()).init();
}
