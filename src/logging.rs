//! Logger initialization and console sections.

use std::io::Write;

use colored::*;
use env_logger::Env;
use log::{info, SetLoggerError};

const BANNER_WIDTH: usize = 70;

/// Initializes `env_logger` with the coloured plain format.
///
/// Defaults to `info`; `RUST_LOG` overrides it. Uses `try_init` so tests that
/// initialize more than once do not panic.
pub fn init_logger() -> Result<(), SetLoggerError> {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    builder.filter_module("reqwest", log::LevelFilter::Warn);
    builder.filter_module("hyper", log::LevelFilter::Warn);

    builder.format(|buf, record| {
        let level = record.level();
        let colored_level = match level {
            log::Level::Error => level.to_string().red(),
            log::Level::Warn => level.to_string().yellow(),
            log::Level::Info => level.to_string().green(),
            log::Level::Debug => level.to_string().blue(),
            log::Level::Trace => level.to_string().purple(),
        };

        let emoji = match level {
            log::Level::Error => "❌",
            log::Level::Warn => "⚠️",
            log::Level::Info => "✔️",
            log::Level::Debug => "🔍",
            log::Level::Trace => "🔬",
        };

        writeln!(buf, "{} [{}] {}", emoji, colored_level, record.args())
    });

    builder.try_init()
}

/// Logs a stage header framed by `=` rules.
pub fn section(title: &str) {
    let rule = "=".repeat(BANNER_WIDTH);
    info!("{}", rule);
    info!("{}", title);
    info!("{}", rule);
}
