//! bufsync plugin binary.
//!
//! Neovim starts it as an RPC job, e.g. `jobstart(['bufsync'], {'rpc': v:true})`;
//! stdin and stdout carry msgpack-rpc, so logs go to stderr or `$BUFSYNC_LOG_DIR`.
#![allow(unused_crate_dependencies)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use bufsync::{HostRequest, SyntaxListener, buffer_lines, channel_id, install_autocmds, start_server};
use bufsync_dispatch::{Config, Dispatcher, DispatcherSlot};
use bufsync_document::TreeSitterEngine;
use bufsync_proto::paths::socket_dir;
use bufsync_worker::{HostLoop, TaskClass, join_error_panic_message, spawn_blocking};
use tokio::task::JoinError;
use clap::Parser;
use tracing::{debug, info, warn};

/// Plugin command line arguments.
#[derive(Parser, Debug)]
#[command(name = "bufsync")]
#[command(about = "Keeps Neovim buffers in sync with incremental syntax trees")]
struct Args {
	/// Configuration file (defaults to `$XDG_CONFIG_HOME/bufsync/config.toml`)
	#[arg(long, value_name = "PATH")]
	config: Option<PathBuf>,

	/// Verbose logging
	#[arg(short, long)]
	verbose: bool,
}

fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	setup_tracing(args.verbose);

	let config = Config::load(args.config.as_deref()).context("loading configuration")?;
	info!(?config, "starting bufsync");

	let runtime = tokio::runtime::Builder::new_multi_thread()
		.enable_all()
		.thread_name("bufsync-rt")
		.build()
		.context("building runtime")?;
	runtime.block_on(run(config))
}

async fn run(config: Config) -> anyhow::Result<()> {
	let rpc = bufsync_rpc::connect(tokio::io::stdin(), tokio::io::stdout());
	let client = rpc.client;
	let mut notifications = rpc.notifications;

	let host = HostLoop::spawn("bufsync-host").context("starting host loop")?;
	let slot = Arc::new(DispatcherSlot::new());
	let mut dispatcher = Dispatcher::new(&slot, Arc::new(host.handle()), config.clone())?;

	let engine = TreeSitterEngine::new(&tree_sitter_java::LANGUAGE.into())?;
	let outline_dir = config.syntax.outline_path.clone().unwrap_or_else(std::env::temp_dir);
	let syntax = SyntaxListener::new(
		engine,
		buffer_lines(client.clone()),
		Arc::new(host.handle()),
		config.debounce(),
		outline_dir,
	);
	dispatcher.register_filetype(Arc::new(syntax), config.syntax.filetypes.iter().cloned());

	let channel = channel_id(&client).await?;
	install_autocmds(&client, channel).await?;
	let server_path = socket_dir().join(format!("bufsync-nvim.{}.sock", std::process::id()));
	let server = start_server(&client, &server_path).await?;
	debug!(channel, %server, "plugin.host_ready");

	let mut dispatcher = spawn_blocking(TaskClass::IoBlocking, move || -> anyhow::Result<Dispatcher> {
		dispatcher.spawn_relay(&server).context("starting relay")?;
		Ok(dispatcher)
	})
	.await
	.map_err(|e| joined("relay startup", e))??;
	info!("plugin.ready");

	while let Some(notification) = notifications.recv().await {
		match HostRequest::parse(&notification) {
			Some(HostRequest::Watch(buffer)) => {
				if let Err(e) = dispatcher.watch(buffer) {
					warn!(%buffer, error = %e, "plugin.watch_failed");
				}
			}
			Some(HostRequest::Shutdown) => {
				info!("plugin.host_leaving");
				break;
			}
			None => debug!(method = %notification.method, "plugin.notification_ignored"),
		}
	}

	spawn_blocking(TaskClass::IoBlocking, move || {
		dispatcher.shutdown();
		drop(dispatcher);
		host.shutdown();
	})
	.await
	.map_err(|e| joined("shutdown", e))?;
	info!("bufsync finished");
	Ok(())
}

/// Turns a failed blocking join into an error carrying the panic message.
fn joined(stage: &str, err: JoinError) -> anyhow::Error {
	match join_error_panic_message(err) {
		Some(message) => anyhow::anyhow!("{stage} panicked: {message}"),
		None => anyhow::anyhow!("{stage} was cancelled"),
	}
}

fn setup_tracing(verbose: bool) {
	use std::fs::OpenOptions;

	use tracing_subscriber::EnvFilter;
	use tracing_subscriber::prelude::*;

	let filter = || {
		EnvFilter::try_from_default_env().unwrap_or_else(|_| {
			if verbose {
				EnvFilter::new("bufsync=trace,bufsync_dispatch=trace,bufsync_document=trace,debug")
			} else {
				EnvFilter::new("bufsync=debug,bufsync_dispatch=debug,info")
			}
		})
	};

	// stdout is the RPC channel.
	if let Some(log_dir) = std::env::var("BUFSYNC_LOG_DIR").ok().map(PathBuf::from)
		&& std::fs::create_dir_all(&log_dir).is_ok()
	{
		let log_path = log_dir.join(format!("bufsync.{}.log", std::process::id()));
		if let Ok(file) = OpenOptions::new().create(true).append(true).open(&log_path) {
			let file_layer = tracing_subscriber::fmt::layer()
				.with_writer(file)
				.with_ansi(false)
				.with_target(true);
			tracing_subscriber::registry().with(filter()).with(file_layer).init();
			tracing::info!(path = ?log_path, "plugin tracing initialized");
			return;
		}
	}

	tracing_subscriber::fmt()
		.with_env_filter(filter())
		.with_writer(std::io::stderr)
		.with_ansi(false)
		.init();
}
