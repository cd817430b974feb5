use std::io::Write;

use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tracing::warn;

use windlass::chat::{ChatEngine, ChatEvent};
use windlass::config::WindlassConfig;

/// Interactive chat loop on stdin/stdout. Response chunks are printed as
/// they arrive from the provider stream.
pub async fn run(config: &WindlassConfig, session_key: &str) -> anyhow::Result<()> {
    let mut engine = ChatEngine::from_config(config)?;

    println!(
        "windlass v{} — session {session_key}",
        env!("CARGO_PKG_VERSION")
    );
    println!("type a message, or \"exit\" to quit");

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        print!("you> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        let (tap, mut events) = mpsc::channel::<ChatEvent>(32);
        let printer = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    ChatEvent::Text(chunk) => {
                        print!("{chunk}");
                        let _ = std::io::stdout().flush();
                    }
                    ChatEvent::Done => break,
                    _ => {}
                }
            }
        });

        match engine.send_with_tap(session_key, line, Some(tap)).await {
            Ok(_) => {
                let _ = printer.await;
                println!();
            }
            Err(e) => {
                printer.abort();
                println!();
                warn!(session = %session_key, "chat turn failed");
                eprintln!("error: {e}");
            }
        }
    }

    Ok(())
}
