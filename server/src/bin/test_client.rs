use clap::Parser;
use futures::{SinkExt, StreamExt};
use pixel_shared::{ClientEvent, ServerEvent};
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

#[derive(Parser, Debug)]
#[clap(about = "Walks a small square on a running presence server")]
struct Args {
    /// WebSocket URL of the server
    #[clap(long, default_value = "ws://127.0.0.1:5000/ws")]
    url: String,
    /// Name to take after joining
    #[clap(long, default_value = "Walker")]
    name: String,
    /// Steps per side of the square
    #[clap(long, default_value = "5")]
    steps: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    println!("Connecting to {}", args.url);
    let (ws, _) = connect_async(args.url.as_str()).await?;
    let (mut write, mut read) = ws.split();

    // Print everything the server sends until the walk is over
    let reader = tokio::spawn(async move {
        while let Some(Ok(msg)) = read.next().await {
            if let Message::Text(text) = msg {
                match ServerEvent::from_json(text.as_str()) {
                    Ok(ServerEvent::GameState {
                        players,
                        your_player_id,
                        game_config,
                    }) => println!(
                        "Joined as {} on a {}x{} canvas with {} player(s)",
                        your_player_id,
                        game_config.width,
                        game_config.height,
                        players.len()
                    ),
                    Ok(event) => println!("<- {:?}", event),
                    Err(e) => println!("Unreadable frame: {}", e),
                }
            }
        }
    });

    let mut outgoing = vec![ClientEvent::UpdatePlayerName {
        name: args.name.clone(),
    }];
    for direction in ["right", "down", "left", "up"] {
        for _ in 0..args.steps {
            outgoing.push(ClientEvent::MovePlayer {
                direction: direction.to_string(),
            });
        }
    }
    outgoing.push(ClientEvent::GetPlayersList);

    for event in outgoing {
        write.send(Message::text(event.to_json()?)).await?;
        sleep(Duration::from_millis(50)).await;
    }

    sleep(Duration::from_millis(250)).await;
    write.send(Message::Close(None)).await?;
    let _ = timeout(Duration::from_secs(1), reader).await;

    println!("Done");
    Ok(())
}
