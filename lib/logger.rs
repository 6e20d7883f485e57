// Logger setup: `log` facade routed through a fern dispatcher
use chrono::Local;
use fanin_core::{IngestError, IngestResult};
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;
use once_cell::sync::OnceCell;
use std::path::Path;

static INSTALLED: OnceCell<()> = OnceCell::new();

/// Install the global logger. Console output goes to stderr so stdout stays
/// free for the collected messages; `file` adds an uncolored copy.
///
/// Only the first call installs anything; later calls are no-ops.
pub fn init_logger(level: LevelFilter, file: Option<&Path>) -> IngestResult<()> {
    INSTALLED.get_or_try_init(|| install(level, file)).map(|_| ())
}

fn install(level: LevelFilter, file: Option<&Path>) -> IngestResult<()> {
    let colors = ColoredLevelConfig::new()
        .info(Color::Green)
        .warn(Color::Yellow)
        .error(Color::Red)
        .debug(Color::Blue)
        .trace(Color::Magenta);

    let console = fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{} {:<5} [{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .chain(std::io::stderr());

    let mut dispatch = fern::Dispatch::new().level(level).chain(console);

    if let Some(path) = file {
        let log_file = fern::log_file(path)?;
        dispatch = dispatch.chain(
            fern::Dispatch::new()
                .format(|out, message, record| {
                    out.finish(format_args!(
                        "{} - {} - {} - {}",
                        Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                        record.target(),
                        record.level(),
                        message
                    ))
                })
                .chain(log_file),
        );
    }

    dispatch
        .apply()
        .map_err(|e| IngestError::Logger(e.to_string()))
}
