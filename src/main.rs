// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Flowforge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Flowforge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Flowforge CLI entrypoint.
//!
//! `flowforge mcp` serves MCP over stdio (intended for tool integrations); `flowforge serve`
//! serves it over streamable HTTP at `http://127.0.0.1:<port>/mcp`. The remaining commands edit
//! flows in the flow folder directly. Logs go to stderr so stdout stays machine-readable.

use std::error::Error;
use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use clap::{Parser, Subcommand};
use rmcp::transport::{
    streamable_http_server::session::local::LocalSessionManager, StreamableHttpServerConfig,
    StreamableHttpService,
};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flowforge::config::{Config, DEFAULT_FLOW_DIR, DEFAULT_FLOW_ID, DEFAULT_MCP_HTTP_PORT};
use flowforge::history::{Origin, DEFAULT_HISTORY_CAP};
use flowforge::mcp::{FlowforgeMcp, SharedEngine};
use flowforge::model::FlowId;
use flowforge::ops::ToolCall;

#[derive(Parser, Debug)]
#[command(name = "flowforge", version, about, long_about = None)]
struct Cli {
    /// Directory holding one JSON file per flow
    #[arg(long, global = true, env = "FLOWFORGE_DIR", default_value = DEFAULT_FLOW_DIR)]
    flow_dir: PathBuf,

    /// Flow to operate on (MCP tools default to it when `flow_id` is omitted)
    #[arg(long, global = true, env = "FLOWFORGE_FLOW", default_value = DEFAULT_FLOW_ID)]
    flow: String,

    /// fsync flow files and their directory on every write
    #[arg(long, global = true, env = "FLOWFORGE_DURABLE_WRITES")]
    durable_writes: bool,

    /// Maximum number of snapshots kept per flow
    #[arg(long, global = true, env = "FLOWFORGE_HISTORY_CAP", default_value_t = DEFAULT_HISTORY_CAP)]
    history_cap: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Serve MCP over stdio
    Mcp,
    /// Serve MCP over streamable HTTP on 127.0.0.1
    Serve {
        /// 0 picks an ephemeral port
        #[arg(long, env = "FLOWFORGE_MCP_PORT", default_value_t = DEFAULT_MCP_HTTP_PORT)]
        port: u16,
    },
    /// Apply a JSON array of `{operation, params}` tool calls as one batch
    Apply {
        /// File to read the batch from, or `-` for stdin
        input: String,
    },
    /// Print the flow as JSON
    Show {
        /// Derive group/collapse visibility before printing
        #[arg(long)]
        visible: bool,
    },
    /// Edit interactively: one command per stdin line (`undo`, `redo`, `status`, `reset`,
    /// `show`, or a JSON tool call / array of tool calls), one JSON result per stdout line
    Session,
}

impl Cli {
    fn config(&self) -> Result<Config, Box<dyn Error>> {
        Ok(Config::default()
            .with_flow_dir(&self.flow_dir)
            .with_durable_writes(self.durable_writes)
            .with_history_cap(self.history_cap)
            .with_default_flow_id(&self.flow)?)
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flowforge=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn main() {
    let result = (|| -> Result<(), Box<dyn Error>> {
        dotenvy::dotenv().ok();
        let cli = Cli::parse();
        init_tracing();

        let config = cli.config()?;
        match cli.command {
            Command::Mcp => run_mcp_stdio(&config),
            Command::Serve { port } => run_mcp_http(&config.with_mcp_http_port(port)),
            Command::Apply { input } => run_apply(&config, &input),
            Command::Show { visible } => run_show(&config, visible),
            Command::Session => run_session(&config),
        }
    })();

    if let Err(err) = result {
        eprintln!("flowforge: {err}");
        std::process::exit(1);
    }
}

fn run_mcp_stdio(config: &Config) -> Result<(), Box<dyn Error>> {
    let mcp = FlowforgeMcp::new(config.open_engine(), config.default_flow_id().clone());
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;

    tracing::info!(flow_dir = %config.flow_dir().display(), "serving MCP over stdio");
    runtime.block_on(mcp.serve_stdio())?;
    Ok(())
}

fn run_mcp_http(config: &Config) -> Result<(), Box<dyn Error>> {
    let mcp = FlowforgeMcp::new(config.open_engine(), config.default_flow_id().clone());
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    let port = config.mcp_http_port();

    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;

        let http_config = StreamableHttpServerConfig {
            stateful_mode: true,
            ..StreamableHttpServerConfig::default()
        };
        let shutdown_token = http_config.cancellation_token.clone();

        let session_manager = Arc::new(LocalSessionManager::default());
        let mcp_service =
            StreamableHttpService::new(move || Ok(mcp.clone()), session_manager, http_config);
        let router = Router::new().nest_service("/mcp", mcp_service);

        tracing::info!(addr = %listener.local_addr()?, "serving MCP over HTTP at /mcp");
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("shutting down");
                shutdown_token.cancel();
            })
            .await?;
        Ok::<(), Box<dyn Error>>(())
    })
}

fn run_apply(config: &Config, input: &str) -> Result<(), Box<dyn Error>> {
    let raw = if input == "-" {
        let mut raw = String::new();
        io::stdin().read_to_string(&mut raw)?;
        raw
    } else {
        fs::read_to_string(input)?
    };
    let calls: Vec<ToolCall> = serde_json::from_str(&raw)?;

    let mut engine = config.open_engine();
    let report = engine.run_tool_calls(config.default_flow_id(), Origin::User, &calls)?;
    print_json(&report)?;

    if report.failed() > 0 {
        tracing::warn!(failed = report.failed(), "some operations failed");
    }
    Ok(())
}

fn run_show(config: &Config, visible: bool) -> Result<(), Box<dyn Error>> {
    let engine = config.open_engine();
    let flow_id = config.default_flow_id();
    let flow = if visible { engine.read_visible(flow_id)? } else { engine.read_flow(flow_id)? };
    print_json(&flow)
}

#[derive(Debug, PartialEq)]
enum SessionCommand {
    Undo,
    Redo,
    Status,
    Reset,
    Show,
    Batch(Vec<ToolCall>),
}

/// `Ok(None)` for blank lines.
fn parse_session_line(line: &str) -> Result<Option<SessionCommand>, serde_json::Error> {
    let line = line.trim();
    let command = match line {
        "" => return Ok(None),
        "undo" => SessionCommand::Undo,
        "redo" => SessionCommand::Redo,
        "status" => SessionCommand::Status,
        "reset" => SessionCommand::Reset,
        "show" => SessionCommand::Show,
        _ if line.starts_with('[') => SessionCommand::Batch(serde_json::from_str(line)?),
        _ => SessionCommand::Batch(vec![serde_json::from_str(line)?]),
    };
    Ok(Some(command))
}

fn run_session(config: &Config) -> Result<(), Box<dyn Error>> {
    let mut engine = config.open_engine();
    let flow_id = config.default_flow_id().clone();

    for line in io::stdin().lock().lines() {
        let line = line?;
        match parse_session_line(&line) {
            Ok(None) => {}
            Ok(Some(command)) => run_session_command(&mut engine, &flow_id, command)?,
            Err(err) => print_json(&serde_json::json!({ "error": err.to_string() }))?,
        }
    }
    Ok(())
}

fn run_session_command(
    engine: &mut SharedEngine,
    flow_id: &FlowId,
    command: SessionCommand,
) -> Result<(), Box<dyn Error>> {
    match command {
        SessionCommand::Undo => print_json(&engine.undo(flow_id)?),
        SessionCommand::Redo => print_json(&engine.redo(flow_id)?),
        SessionCommand::Status => print_json(&engine.status(flow_id)?),
        SessionCommand::Reset => print_json(&engine.reset_history(flow_id)?),
        SessionCommand::Show => print_json(&engine.read_visible(flow_id)?),
        SessionCommand::Batch(calls) => {
            print_json(&engine.run_tool_calls(flow_id, Origin::User, &calls)?)
        }
    }
}

/// One compact JSON document per line on stdout.
fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}
