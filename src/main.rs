//! microweb: a minimal HTTP/1.1 server for resource-constrained devices
//!
//! Serves one TCP connection at a time:
//! - Parse a single request (headers, optional `Content-Length` body)
//! - Hand it to the request handler (fixed `200 OK` echo by default)
//! - Send the response and close the connection
//!
//! Configuration via CLI arguments or TOML file.

mod config;
mod protocols;
mod runtime;
mod server;

use config::Config;
use protocols::http::OkHandler;
use runtime::Listener;
use server::Server;
use tracing::{info, info_span};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let addr = config.listen_addr()?;
    info!(
        host = %config.host,
        port = config.port,
        backlog = runtime::BACKLOG,
        chunk_size = runtime::CHUNK_SIZE,
        read_timeout = ?config.read_timeout,
        write_timeout = ?config.write_timeout,
        max_header_bytes = ?config.max_header_bytes,
        "Starting microweb server"
    );

    let listener = Listener::bind(addr)?.with_timeouts(config.read_timeout, config.write_timeout);
    let local = listener.local_addr()?;
    info!(address = %local, "Server listening");

    let server = Server::new(listener, OkHandler)
        .with_max_header_bytes(config.max_header_bytes)
        .with_span(info_span!("server", addr = %local));

    server.run()
}
