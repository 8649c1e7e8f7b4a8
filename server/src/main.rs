use clap::Parser;
use log::info;
use server::config::{ServerConfig, UnknownTagPolicy};
use server::network::Server;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// How often the accept loop checks for shutdown, in milliseconds
    #[arg(long, default_value = "50")]
    poll_interval_ms: u64,

    /// What to do when a player sends an unknown message tag
    #[arg(long, value_enum, default_value_t = UnknownTagPolicy::Disconnect)]
    unknown_tag: UnknownTagPolicy,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        ServerConfig {
            host: args.host,
            port: args.port,
            poll_interval: Duration::from_millis(args.poll_interval_ms),
            unknown_tag_policy: args.unknown_tag,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let server = Server::bind(ServerConfig::from(args))?;
    let shutdown = server.shutdown_handle();

    // The session core is thread-per-connection; the runtime only waits for
    // the interrupt signal.
    let mut accept_loop = tokio::task::spawn_blocking(move || server.run());

    let report = tokio::select! {
        result = &mut accept_loop => result?,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Received Ctrl+C, shutting down gracefully...");
            shutdown.trigger();
            accept_loop.await?
        }
    };

    info!(
        "Shutdown complete: {} session(s) closed, {} handler(s) joined, {} failed",
        report.sessions_closed, report.handlers_joined, report.handlers_failed
    );
    Ok(())
}
