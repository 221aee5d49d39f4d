// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Loom request execution server binary.

use clap::{Parser, Subcommand};
use loom_server::{create_app_state, create_router};
use std::net::SocketAddr;
use tower_http::{
	cors::{Any, CorsLayer},
	trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Loom server - request execution and authorization.
#[derive(Parser, Debug)]
#[command(name = "loom-server", about = "Loom request execution server", version)]
struct Args {
	/// Load configuration from this TOML file instead of /etc/loom/server.toml
	#[arg(long, env = "LOOM_SERVER_CONFIG")]
	config: Option<std::path::PathBuf>,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Show version information
	Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	if let Some(Command::Version) = args.command {
		println!("loom-server version: {}", env!("CARGO_PKG_VERSION"));
		return Ok(());
	}

	dotenvy::dotenv().ok();

	let config = match &args.config {
		Some(path) => loom_server_config::load_config_with_file(path)?,
		None => loom_server_config::load_config()?,
	};

	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| config.logging.level.clone().into()),
		)
		.with(tracing_subscriber::fmt::layer())
		.init();

	tracing::info!(
		host = %config.http.host,
		port = config.http.port,
		environment = %config.auth.environment,
		"starting loom-server"
	);

	let state = create_app_state(&config)?;

	let app = create_router(state)
		.layer(TraceLayer::new_for_http())
		.layer(
			CorsLayer::new()
				.allow_origin(Any)
				.allow_methods(Any)
				.allow_headers(Any),
		);

	let addr = config.socket_addr();
	tracing::info!("listening on {}", addr);

	let listener = tokio::net::TcpListener::bind(&addr).await?;

	tokio::select! {
		result = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()) => {
			if let Err(e) = result {
				tracing::error!(error = %e, "Server error");
			}
		}
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("Received shutdown signal");
		}
	}

	tracing::info!("Server shutdown complete");
	Ok(())
}
