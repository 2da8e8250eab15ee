//! The demo server.
//!
//! Run with:
//!   cargo run -- --config vireo.toml
//!
//! Try:
//!   curl http://localhost:1323/users/42
//!   curl 'http://localhost:1323/show?team=a&member=b'
//!   curl http://localhost:1323/bind/users/jon/jon@x.com
//!   curl -c jar http://localhost:1323/writeCookie && curl -b jar http://localhost:1323/readCookie

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use vireo::Server;
use vireo::app::build_router;
use vireo::config::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            // No subscriber yet.
            eprintln!("vireo: {e}");
            return ExitCode::FAILURE;
        }
    };

    vireo::logging::init(&config.log);
    info!(version = env!("CARGO_PKG_VERSION"), "vireo starting");

    let app = match build_router(&config.app) {
        Ok(app) => app,
        Err(e) => {
            error!(error = %e, "failed to build router");
            return ExitCode::FAILURE;
        }
    };

    let max_body = match config.server.max_body_bytes() {
        Ok(n) => n,
        Err(e) => {
            error!(error = %e, "invalid server configuration");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = Server::bind(config.server.addr).max_body(max_body).serve(app).await {
        error!(error = %e, addr = %config.server.addr, "server failed");
        return ExitCode::FAILURE;
    }

    info!("shutdown complete");
    ExitCode::SUCCESS
}
