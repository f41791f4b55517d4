// ABOUTME: Server binary: loads configuration, opens the database and serves the API
// ABOUTME: Refuses to start without identity-provider credentials or a reachable database
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Parley Contributors

use anyhow::{Context, Result};
use clap::Parser;
use parley_chat_server::auth::GoogleIdentityVerifier;
use parley_chat_server::config::environment::ServerConfig;
use parley_chat_server::database::Database;
use parley_chat_server::errors::set_production_mode;
use parley_chat_server::logging;
use parley_chat_server::middleware::AuthMiddleware;
use parley_chat_server::server::{HttpServer, ServerResources};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "parley-server")]
#[command(about = "Parley chat persistence server")]
struct Args {
    /// Override the HTTP port from configuration
    #[arg(long)]
    http_port: Option<u16>,

    /// Override the database URL from configuration
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init_from_env().context("failed to initialize logging")?;

    let mut config = ServerConfig::from_env().context("invalid server configuration")?;
    if let Some(port) = args.http_port {
        config.http_port = port;
    }
    if let Some(url) = args.database_url {
        config.database_url = parley_chat_server::config::environment::DatabaseUrl::parse_url(&url);
    }

    set_production_mode(config.environment.is_production());
    info!("starting parley-server: {}", config.summary());

    let database = Database::new(&config.database_url.to_connection_string())
        .await
        .context("failed to open database")?;

    let verifier = Arc::new(GoogleIdentityVerifier::new(&config.identity));
    let auth = AuthMiddleware::new(verifier, database.clone());

    let resources = Arc::new(ServerResources::new(database, auth, config));
    HttpServer::new(resources).serve().await
}
