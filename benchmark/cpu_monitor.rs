// cpu_monitor.rs - CPU cost of the polling loops while nothing arrives
use fanin::{Controller, ServerConfig};
use fanin_client::IngestClient;
use sysinfo::{CpuRefreshKind, ProcessRefreshKind, RefreshKind, System};
use std::thread;
use std::time::{Duration, Instant};

pub struct CpuStats {
    pub avg_cpu_percent: f32,
    pub peak_cpu_percent: f32,
    pub samples: usize,
}

pub struct IdleResult {
    pub poll_ms: u64,
    pub idle_connections: usize,
    pub cpu: CpuStats,
}

/// Sample this process's CPU usage for `duration`
pub fn monitor_cpu_usage(duration: Duration) -> CpuStats {
    let mut sys = System::new_with_specifics(
        RefreshKind::new()
            .with_cpu(CpuRefreshKind::everything())
            .with_processes(ProcessRefreshKind::everything())
    );
    let pid = sysinfo::get_current_pid().ok();

    let mut samples = vec![];
    let start = Instant::now();

    // Initial refresh
    sys.refresh_cpu();
    sys.refresh_processes();
    thread::sleep(Duration::from_millis(100));

    while start.elapsed() < duration {
        sys.refresh_cpu();
        sys.refresh_processes();

        if let Some(process) = pid.and_then(|pid| sys.process(pid)) {
            samples.push(process.cpu_usage());
        }

        thread::sleep(Duration::from_millis(100));
    }

    let avg = if !samples.is_empty() {
        samples.iter().sum::<f32>() / samples.len() as f32
    } else {
        0.0
    };

    let peak = samples.iter().copied().fold(0.0f32, f32::max);

    CpuStats {
        avg_cpu_percent: avg,
        peak_cpu_percent: peak,
        samples: samples.len(),
    }
}

/// Hold `connections` silent clients open and measure what polling costs.
pub fn bench_idle_polling(poll_ms: u64, connections: usize, window: Duration) -> Option<IdleResult> {
    println!("\n=== Idle polling: {} connections, poll {}ms ===", connections, poll_ms);

    let config = ServerConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        capacity: connections,
        poll_interval: Duration::from_millis(poll_ms),
        ..ServerConfig::default()
    };
    let frame_size = config.frame_size;

    let controller = match Controller::start(config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to start server: {}", e);
            return None;
        }
    };

    let clients: Vec<_> = (0..connections)
        .filter_map(|_| IngestClient::connect(controller.local_addr(), frame_size).ok())
        .collect();

    let cpu = monitor_cpu_usage(window);

    if let Err(e) = controller.shutdown() {
        eprintln!("Shutdown failed: {}", e);
    }
    drop(clients);

    Some(IdleResult { poll_ms, idle_connections: connections, cpu })
}

pub fn print_idle_results(results: &[IdleResult]) {
    println!("\n╔═══════════════════════════════════════════════════════════════════════════╗");
    println!("║                        IDLE POLLING CPU COST                              ║");
    println!("╠═══════════════════════════════════════════════════════════════════════════╣");
    println!("║ Poll (ms) │ Idle Conns │ Avg CPU % │ Peak CPU % │ Samples                 ║");
    println!("╠═══════════════════════════════════════════════════════════════════════════╣");

    for r in results {
        println!("║ {:>9} │ {:>10} │ {:>9.1} │ {:>10.1} │ {:>7}                 ║",
            r.poll_ms,
            r.idle_connections,
            r.cpu.avg_cpu_percent,
            r.cpu.peak_cpu_percent,
            r.cpu.samples
        );
    }

    println!("╚═══════════════════════════════════════════════════════════════════════════╝");
}
