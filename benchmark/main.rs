// fanin-bench: SharedLog contention, ingest rounds and polling cost
mod append;
mod cpu_monitor;
mod ingest;

use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::process;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "fanin-bench")]
#[command(about = "fanin Benchmark Suite", long_about = None)]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Run all benchmark cases
    #[arg(short, long)]
    all: bool,

    /// Run specific case (shorthand for 'case' subcommand)
    #[arg(short = 'c', long = "case", value_name = "NAME")]
    case: Option<String>,

    /// Show server logs at this level
    #[arg(long, default_value = "warn")]
    log_level: LevelFilter,
}

#[derive(Subcommand)]
enum Commands {
    /// Run specific benchmark case
    Case {
        /// Case name to run
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// List all available benchmark cases
    List,
}

fn list_cases() {
    println!("\n=== Available Benchmark Cases ===\n");

    println!("SHARED LOG:");
    println!("  append-single       - Single appending thread baseline");
    println!("  append-scale        - Append scalability (1,2,4,8,16 threads)");
    println!();

    println!("INGEST:");
    println!("  ingest              - Reference round: 4 clients x 5 messages");
    println!("  ingest-scale        - 1,4,16,64 clients x 100 messages");
    println!();

    println!("POLLING:");
    println!("  idle-cpu            - CPU cost of idle workers at 1, 10 and 50ms polling");
    println!();

    println!("Usage:");
    println!("  fanin-bench -a                      # Run all benchmarks");
    println!("  fanin-bench -c append-scale         # Run one case");
    println!("  fanin-bench list                    # Show this list");
}

fn run_append_single() {
    let result = append::bench_append_threads(1, 100_000);
    append::print_append_results(&[result]);
}

fn run_append_scale() {
    let results = append::bench_append_scalability(20_000);
    append::print_append_results(&results);
}

fn run_ingest() {
    let result = ingest::bench_ingest(4, 5, 10);
    ingest::print_ingest_results(&[result]);
}

fn run_ingest_scale() {
    let results: Vec<_> = [1, 4, 16, 64]
        .into_iter()
        .map(|clients| ingest::bench_ingest(clients, 100, 1))
        .collect();
    ingest::print_ingest_results(&results);
}

fn run_idle_cpu() {
    let results: Vec<_> = [1, 10, 50]
        .into_iter()
        .filter_map(|poll_ms| cpu_monitor::bench_idle_polling(poll_ms, 8, Duration::from_secs(2)))
        .collect();
    cpu_monitor::print_idle_results(&results);
}

fn run_all() {
    run_append_single();
    run_append_scale();
    println!("\n{}", "─".repeat(79));
    run_ingest();
    run_ingest_scale();
    println!("\n{}", "─".repeat(79));
    run_idle_cpu();

    println!("\n✓ Full benchmark suite completed!");
}

fn run_case(name: &str) {
    match name {
        "append-single" => run_append_single(),
        "append-scale" => run_append_scale(),
        "ingest" => run_ingest(),
        "ingest-scale" => run_ingest_scale(),
        "idle-cpu" => run_idle_cpu(),

        _ => {
            eprintln!("Error: Unknown benchmark case '{}'", name);
            eprintln!("Run 'fanin-bench list' to see available cases");
            process::exit(1);
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = fanin::init_logger(cli.log_level, None) {
        eprintln!("Logger setup failed: {}", e);
    }

    if cli.all {
        run_all();
    } else if let Some(case_name) = cli.case {
        run_case(&case_name);
    } else {
        match cli.command {
            Some(Commands::Case { name }) => run_case(&name),
            Some(Commands::List) => list_cases(),
            None => {
                println!("\nNo benchmark specified. Use one of:");
                println!("  fanin-bench -a              # Run all benchmarks");
                println!("  fanin-bench -c <case>       # Run specific case");
                println!("  fanin-bench list            # List available cases");
            }
        }
    }
}
