//! bufsync relay binary.
//!
//! Started by the plugin with the address of the host's RPC server and the path of the
//! relay channel socket the plugin is listening on.
#![allow(unused_crate_dependencies)]

use std::path::PathBuf;

use anyhow::Context;
use bufsync_relay::{EventRelay, NvimChangeSource};
use clap::Parser;
use tokio::net::UnixStream;
use tracing::info;

/// Relay command line arguments.
#[derive(Parser, Debug)]
#[command(name = "bufsync-relay")]
#[command(about = "Forwards Neovim buffer change notifications to a bufsync dispatcher")]
struct Args {
	/// Host RPC socket (as returned by `serverstart()`)
	#[arg(long, value_name = "PATH")]
	server: PathBuf,

	/// Relay channel socket to connect back to
	#[arg(long, value_name = "PATH")]
	channel: PathBuf,

	/// Verbose logging
	#[arg(short, long)]
	verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	setup_tracing(args.verbose);

	info!(server = %args.server.display(), channel = %args.channel.display(), "starting bufsync-relay");

	let rpc = bufsync_rpc::connect_unix(&args.server)
		.await
		.with_context(|| format!("connecting to host at {}", args.server.display()))?;
	let channel = UnixStream::connect(&args.channel)
		.await
		.with_context(|| format!("connecting to relay channel {}", args.channel.display()))?;
	let (input, output) = channel.into_split();

	let events = NvimChangeSource::event_stream(rpc.notifications);
	let relay = EventRelay::new(NvimChangeSource::new(rpc.client));
	let exit = relay.run(events, input, output).await?;
	info!(?exit, "bufsync-relay finished");
	Ok(())
}

fn setup_tracing(verbose: bool) {
	use std::fs::OpenOptions;

	use tracing_subscriber::EnvFilter;
	use tracing_subscriber::prelude::*;

	let filter = || {
		EnvFilter::try_from_default_env().unwrap_or_else(|_| {
			if verbose {
				EnvFilter::new("bufsync_relay=trace,bufsync_rpc=trace,debug")
			} else {
				EnvFilter::new("bufsync_relay=debug,info")
			}
		})
	};

	// stdout and stderr are detached when spawned by the plugin.
	if let Some(log_dir) = std::env::var("BUFSYNC_LOG_DIR").ok().map(PathBuf::from)
		&& std::fs::create_dir_all(&log_dir).is_ok()
	{
		let log_path = log_dir.join(format!("bufsync-relay.{}.log", std::process::id()));
		if let Ok(file) = OpenOptions::new().create(true).append(true).open(&log_path) {
			let file_layer = tracing_subscriber::fmt::layer()
				.with_writer(file)
				.with_ansi(false)
				.with_target(true);
			tracing_subscriber::registry().with(filter()).with(file_layer).init();
			tracing::info!(path = ?log_path, "relay tracing initialized");
			return;
		}
	}

	tracing_subscriber::fmt().with_env_filter(filter()).with_writer(std::io::stderr).init();
}
