// fanin-server: run one collection round and report what arrived
use anyhow::Result;
use clap::Parser;
use fanin::{init_logger, Controller, ServerConfig};
use log::{error, LevelFilter};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

/// Flags override the FANIN_* environment variables, which override defaults.
#[derive(Parser)]
#[command(name = "fanin-server")]
#[command(about = "Bounded fan-in ingestion server", long_about = None)]
#[command(version = "0.1.0")]
struct Cli {
    /// Address to bind
    #[arg(long)]
    addr: Option<IpAddr>,

    /// TCP port
    #[arg(short, long)]
    port: Option<u16>,

    /// Listen backlog
    #[arg(long)]
    backlog: Option<i32>,

    /// Connections admitted for this run
    #[arg(short, long)]
    capacity: Option<usize>,

    /// Messages expected from each connection
    #[arg(short, long)]
    messages_per_client: Option<usize>,

    /// Bytes per frame
    #[arg(long)]
    frame_size: Option<usize>,

    /// Polling interval of every loop, in milliseconds
    #[arg(long)]
    poll_ms: Option<u64>,

    /// Give up after this many seconds instead of waiting forever
    #[arg(long)]
    timeout_secs: Option<u64>,

    #[arg(long, default_value = "info")]
    log_level: LevelFilter,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Do not print collected messages
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn apply(&self, mut config: ServerConfig) -> ServerConfig {
        let ip = self.addr.unwrap_or(config.bind_addr.ip());
        let port = self.port.unwrap_or(config.bind_addr.port());
        config.bind_addr = SocketAddr::new(ip, port);

        if let Some(backlog) = self.backlog {
            config.backlog = backlog;
        }
        if let Some(capacity) = self.capacity {
            config.capacity = capacity;
        }
        if let Some(n) = self.messages_per_client {
            config.messages_per_client = n;
        }
        if let Some(size) = self.frame_size {
            config.frame_size = size;
        }
        if let Some(ms) = self.poll_ms {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = self.timeout_secs {
            config.collect_timeout = Some(Duration::from_secs(secs));
        }
        config
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.apply(ServerConfig::from_env());
    let controller = Controller::start(config)?;

    let quiet = cli.quiet;
    let report = controller.run(|message| {
        if !quiet {
            println!("Collected: {}", message.text());
        }
    })?;

    println!("Collected: {}", report.drained);
    println!("All messages were collected!");
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logger(cli.log_level, cli.log_file.as_deref()) {
        eprintln!("fanin-server: {}", e);
        return ExitCode::FAILURE;
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
