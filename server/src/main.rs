use clap::Parser;
use log::{error, info};
use pixel_server::config::{Args, ServerConfig};
use pixel_server::network::Server;

/// Main-method of the application.
/// Parses arguments and environment, then runs the server until Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = ServerConfig::from_args(args)?;

    let server = Server::bind(config).await?;
    let server_handle = tokio::spawn(server.run());

    // Handle shutdown gracefully
    tokio::select! {
        result = server_handle => {
            match result {
                Ok(Err(e)) => error!("Server stopped: {}", e),
                Err(e) => error!("Server task panicked: {}", e),
                Ok(Ok(())) => info!("Server stopped"),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
