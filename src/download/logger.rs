//! Logging setup for the command line tool

use std::path::Path;
use anyhow::{Context, Result};
use log::LevelFilter;

pub fn setup_logger(level: LevelFilter, log_file: Option<&Path>) -> Result<()> {
    let mut base_config = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S"),
                record.level(),
                message
            ))
        })
        .level(level)
        // connection pool chatter drowns out chunk logs
        .level_for("hyper_util", LevelFilter::Warn)
        .level_for("reqwest", LevelFilter::Warn)
        .chain(std::io::stderr());

    if let Some(file) = log_file {
        let file = fern::log_file(file)
            .with_context(|| format!("Opening log file failed: {}", file.display()))?;
        base_config = base_config.chain(file);
    }

    base_config.apply()?;

    Ok(())
}
