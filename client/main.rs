// fanin-send: connect one or more clients and send fixed-size frames
use anyhow::{Context, Result};
use clap::Parser;
use fanin_client::{IngestClient, DEFAULT_MESSAGES};
use fanin_core::FRAME_SIZE;
use std::thread;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "fanin-send")]
#[command(about = "Send fixed-size frames to a fanin server", long_about = None)]
#[command(version = "0.1.0")]
struct Cli {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:8001")]
    addr: String,

    /// Concurrent connections, one thread each
    #[arg(short, long, default_value_t = 1)]
    clients: usize,

    /// Bytes per frame; must match the server
    #[arg(short, long, default_value_t = FRAME_SIZE)]
    frame_size: usize,

    /// Pause between messages on each connection
    #[arg(short, long, default_value_t = 0)]
    delay_ms: u64,

    /// Messages to send (default: Hello Apple Car Green Dog)
    messages: Vec<String>,
}

fn send_one(addr: &str, frame_size: usize, delay: Duration, messages: &[String]) -> Result<usize> {
    let mut client = IngestClient::connect(addr, frame_size)
        .with_context(|| format!("failed to connect to {}", addr))?;

    for text in messages {
        client.send_message(text).context("send failed")?;
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }

    let sent = client.sent();
    client.close().context("close failed")?;
    Ok(sent)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let messages: Vec<String> = if cli.messages.is_empty() {
        DEFAULT_MESSAGES.iter().map(|s| s.to_string()).collect()
    } else {
        cli.messages
    };
    let delay = Duration::from_millis(cli.delay_ms);

    let handles: Vec<_> = (0..cli.clients)
        .map(|client_id| {
            let addr = cli.addr.clone();
            let messages = messages.clone();
            let frame_size = cli.frame_size;
            thread::spawn(move || (client_id, send_one(&addr, frame_size, delay, &messages)))
        })
        .collect();

    let mut failed = 0;
    for handle in handles {
        match handle.join() {
            Ok((client_id, Ok(sent))) => println!("Client {}: sent {} messages", client_id, sent),
            Ok((client_id, Err(e))) => {
                eprintln!("Client {}: {:#}", client_id, e);
                failed += 1;
            }
            Err(_) => {
                eprintln!("client thread panicked");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} clients failed", failed, cli.clients);
    }
    Ok(())
}
