use clap::Parser;
use client::input;
use client::network::Client;
use client::peers::PeerEvent;
use log::info;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server host to connect to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Print peer events as JSON lines
    #[arg(long)]
    json: bool,
}

fn print_event(event: &PeerEvent, json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }

    match event {
        PeerEvent::Joined {
            player_id,
            position,
            is_self,
        } => {
            let who = if *is_self { " (you)" } else { "" };
            println!(
                "player {}{} joined at ({}, {})",
                player_id, who, position.x, position.y
            );
        }
        PeerEvent::Moved {
            player_id,
            position,
            ..
        } => println!("player {} at ({}, {})", player_id, position.x, position.y),
        PeerEvent::Left { player_id } => println!("player {} left", player_id),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    info!("Controls: w/a/s/d, h/j/k/l or up/down/left/right, q to quit");

    let client = Client::connect(&args.host, args.port).await?;

    let (key_tx, key_rx) = mpsc::channel(64);
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();

    // Blocking stdin reads stay off the runtime so exit never waits on them.
    std::thread::Builder::new()
        .name("input".into())
        .spawn(move || input::forward_commands(std::io::stdin().lock(), key_tx))?;

    let json = args.json;
    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            print_event(&event, json)?;
        }
        Ok::<(), serde_json::Error>(())
    });

    let mut session = tokio::spawn(client.run(key_rx, event_tx, cancel.clone()));
    let peers = tokio::select! {
        result = &mut session => result??,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Received Ctrl+C, disconnecting...");
            cancel.cancel();
            session.await??
        }
    };

    printer.await??;
    info!("Session ended with {} player(s) on the board", peers.len());
    Ok(())
}
