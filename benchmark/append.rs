// append.rs - Benchmark SharedLog append contention
use fanin_buffer::SharedLog;
use fanin_core::{encode_frame, ConnectionId, Message, FRAME_SIZE};
use std::time::{Duration, Instant};

pub struct AppendResult {
    pub test_name: String,
    pub num_threads: usize,
    pub duration: Duration,
    pub total_messages: usize,
    pub throughput: f64,
    pub drained: usize,
}

/// N threads append `messages_per_thread` frames each, then the log is drained.
pub fn bench_append_threads(num_threads: usize, messages_per_thread: usize) -> AppendResult {
    println!("\n=== Benchmarking {} Appending Threads ===", num_threads);

    let log = SharedLog::with_capacity(num_threads * messages_per_thread);
    let frame = encode_frame("payload", FRAME_SIZE);

    let start = Instant::now();
    crossbeam::thread::scope(|s| {
        for t in 0..num_threads {
            let log = log.clone();
            let frame = &frame;
            s.spawn(move |_| {
                for _ in 0..messages_per_thread {
                    log.append(Message::new(ConnectionId(t as u32 + 1), frame.clone()));
                }
            });
        }
    })
    .expect("append thread panicked");
    let duration = start.elapsed();

    let total = log.snapshot_count();
    let drained = log.drain(drop);

    AppendResult {
        test_name: format!("{} Threads", num_threads),
        num_threads,
        duration,
        total_messages: total,
        throughput: total as f64 / duration.as_secs_f64(),
        drained,
    }
}

/// Scalability: 1, 2, 4, 8, 16 threads
pub fn bench_append_scalability(messages_per_thread: usize) -> Vec<AppendResult> {
    println!("\n=== Benchmarking Append Scalability ===");

    [1, 2, 4, 8, 16]
        .into_iter()
        .map(|threads| bench_append_threads(threads, messages_per_thread))
        .collect()
}

pub fn print_append_results(results: &[AppendResult]) {
    println!("\n╔═══════════════════════════════════════════════════════════════════════════╗");
    println!("║                      SHARED LOG APPEND RESULTS                            ║");
    println!("╠═══════════════════════════════════════════════════════════════════════════╣");
    println!("║ Test Name          │ Threads │ Duration │ Total Msgs │ Throughput │ Lost  ║");
    println!("╠═══════════════════════════════════════════════════════════════════════════╣");

    for result in results {
        println!("║ {:<18} │ {:>7} │ {:>6.3}s │ {:>10} │ {:>8.0} /s │ {:>5} ║",
            result.test_name,
            result.num_threads,
            result.duration.as_secs_f64(),
            result.total_messages,
            result.throughput,
            result.total_messages.abs_diff(result.drained)
        );
    }

    println!("╚═══════════════════════════════════════════════════════════════════════════╝");

    if let Some(baseline) = results.first() {
        for result in results.iter().skip(1) {
            println!("  {} threads: {:.2}x of single-thread throughput",
                result.num_threads, result.throughput / baseline.throughput);
        }
    }
}
