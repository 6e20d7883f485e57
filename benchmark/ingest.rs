// ingest.rs - End-to-end collection rounds over loopback TCP
use fanin::{Controller, ServerConfig};
use fanin_client::IngestClient;
use std::thread;
use std::time::{Duration, Instant};

pub struct IngestRound {
    pub clients: usize,
    pub messages_per_client: usize,
    pub duration: Duration,
    pub drained: usize,
    pub ok: bool,
}

pub fn bench_ingest(clients: usize, messages_per_client: usize, poll_ms: u64) -> IngestRound {
    println!("\n=== Ingest: {} clients x {} messages (poll {}ms) ===",
        clients, messages_per_client, poll_ms);

    let config = ServerConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        capacity: clients,
        messages_per_client,
        poll_interval: Duration::from_millis(poll_ms),
        collect_timeout: Some(Duration::from_secs(60)),
        ..ServerConfig::default()
    };
    let frame_size = config.frame_size;

    let start = Instant::now();
    let controller = match Controller::start(config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to start server: {}", e);
            return IngestRound { clients, messages_per_client, duration: start.elapsed(), drained: 0, ok: false };
        }
    };
    let addr = controller.local_addr();

    let senders: Vec<_> = (0..clients)
        .map(|i| {
            thread::spawn(move || -> std::io::Result<()> {
                let mut client = IngestClient::connect(addr, frame_size)?;
                for n in 0..messages_per_client {
                    client.send_message(&format!("client {} message {}", i, n))?;
                }
                client.close()
            })
        })
        .collect();

    let outcome = controller.run(drop);
    let duration = start.elapsed();

    for sender in senders {
        if let Ok(Err(e)) = sender.join() {
            eprintln!("client error: {}", e);
        }
    }

    match outcome {
        Ok(report) => IngestRound { clients, messages_per_client, duration, drained: report.drained, ok: true },
        Err(e) => {
            eprintln!("Ingest round failed: {}", e);
            IngestRound { clients, messages_per_client, duration, drained: 0, ok: false }
        }
    }
}

pub fn print_ingest_results(results: &[IngestRound]) {
    println!("\n╔═══════════════════════════════════════════════════════════════════════════╗");
    println!("║                         INGEST ROUND RESULTS                              ║");
    println!("╠═══════════════════════════════════════════════════════════════════════════╣");
    println!("║ Clients │ Msgs/Client │ Duration │ Drained │ Throughput │ Result          ║");
    println!("╠═══════════════════════════════════════════════════════════════════════════╣");

    for r in results {
        println!("║ {:>7} │ {:>11} │ {:>6.3}s │ {:>7} │ {:>8.0} /s │ {:<15} ║",
            r.clients,
            r.messages_per_client,
            r.duration.as_secs_f64(),
            r.drained,
            r.drained as f64 / r.duration.as_secs_f64(),
            if r.ok { "ok" } else { "FAILED" }
        );
    }

    println!("╚═══════════════════════════════════════════════════════════════════════════╝");
}
