use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, LevelFilter, SharedLogger, TermLogger,
    TerminalMode, WriteLogger,
};

/// Log for a single check run: always appended to `log_path`, mirrored to
/// stderr in debug builds or when debug logging is on. Stdout is left to the
/// console dialogs.
pub fn init_logging(log_path: &Path, debug_enabled: bool, max_log_size: u64) {
    let config = log_config();
    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();

    match open_log_file(log_path, max_log_size) {
        Ok(file) => loggers.push(WriteLogger::new(LevelFilter::Debug, config.clone(), file)),
        Err(e) => eprintln!("herald: cannot open log file {}: {e}", log_path.display()),
    }

    if cfg!(debug_assertions) || debug_enabled {
        loggers.push(TermLogger::new(
            LevelFilter::Debug,
            config,
            TerminalMode::Stderr,
            ColorChoice::Auto,
        ));
    }

    if let Err(e) = CombinedLogger::init(loggers) {
        eprintln!("herald: logger already initialised: {e}");
    }

    set_debug_logging(debug_enabled);
    log::debug!("Logging to {}", log_path.display());
}

pub fn set_debug_logging(enabled: bool) {
    log::set_max_level(if enabled {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    });
}

fn log_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .add_filter_allow_str("herald")
        .build()
}

fn open_log_file(log_path: &Path, max_log_size: u64) -> io::Result<File> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if let Err(e) = trim_to_newer_half(log_path, max_log_size) {
        eprintln!("herald: cannot trim {}: {e}", log_path.display());
    }
    OpenOptions::new().create(true).append(true).open(log_path)
}

/// Drop the older half of a log larger than `max_log_size`, cutting at a line
/// boundary. A missing file is not an error.
fn trim_to_newer_half(log_path: &Path, max_log_size: u64) -> io::Result<()> {
    let contents = match std::fs::read(log_path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    if contents.len() as u64 <= max_log_size {
        return Ok(());
    }

    let half = contents.len() / 2;
    let keep_from = contents[half..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(half, |pos| half + pos + 1);
    std::fs::write(log_path, &contents[keep_from..])
}
