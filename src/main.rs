use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use anyhow::{Context, Result};
use clap::Parser;
use futures_util::StreamExt;
use log::{error, info, warn};
use tokio::sync::watch;
use url::Url;
use rangefetch::download::logger::setup_logger;
use rangefetch::{progress_channel, progress_stream, ChunkClient, Config, Progress};
use crate::cli::CliArgs;
use crate::progress_bar::ProgressBar;

mod cli;
mod progress_bar;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: CliArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };
    if let Some(workers) = args.workers {
        config.worker_count = workers;
    }
    if let Some(chunk_size) = args.chunk_size {
        config.chunk_size = chunk_size;
    }
    if let Some(verify_etag) = args.verify_etag {
        config.verify_etag = verify_etag;
    }
    if args.insecure {
        config.accept_invalid_certs = true;
    }

    setup_logger(config.log_level(), config.log_file.as_deref())?;

    let output = output_path(&args, &config)?;
    let file = std::fs::File::create(&output)
        .with_context(|| format!("Creating output file failed: {}", output.display()))?;
    let file = Arc::new(file);

    let client = ChunkClient::from_config(&config)?;
    let (progress_sender, progress_receiver) = progress_channel();
    let render_handle = (!args.quiet).then(|| tokio::spawn(render_progress(progress_receiver)));

    let result = client.get_file_with_progress(&args.url, file.clone(), &progress_sender).await;
    drop(progress_sender);
    if let Some(handle) = render_handle {
        if let Err(err) = handle.await {
            warn!("Progress display stopped: {}", err);
        }
    }

    let summary = result.with_context(|| format!("Downloading {} failed", args.url))?;
    file.sync_all()
        .with_context(|| format!("Flushing output file failed: {}", output.display()))?;

    info!("Saved {} bytes to {}", summary.total_len, output.display());
    Ok(())
}

fn output_path(args: &CliArgs, config: &Config) -> Result<PathBuf> {
    if let Some(output) = &args.output {
        return Ok(output.clone());
    }

    let url = Url::parse(&args.url).with_context(|| format!("Invalid url: {}", args.url))?;
    let file_name = url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .unwrap_or("download");

    Ok(config.download_dir.join(file_name))
}

async fn render_progress(receiver: watch::Receiver<Progress>) {
    let mut bar = ProgressBar::new(100);
    let stream = progress_stream(receiver);
    futures_util::pin_mut!(stream);

    while let Some(progress) = stream.next().await {
        if progress.total_len == 0 {
            continue;
        }
        if bar.print(progress.downloaded_len, progress.total_len).is_err() {
            break;
        }
    }
    println!();
}
