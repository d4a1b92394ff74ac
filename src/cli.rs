use std::path::PathBuf;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct CliArgs {
    /// Resource to download
    pub url: String,

    /// Output file, defaults to the last URL path segment inside the download directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// JSON config file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Concurrent range requests
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Bytes per range request
    #[arg(long)]
    pub chunk_size: Option<u64>,

    /// Fail if the resource ETag changes during the download
    #[arg(long)]
    pub verify_etag: Option<bool>,

    /// Accept invalid TLS certificates
    #[arg(long)]
    pub insecure: bool,

    /// Hide the progress bar
    #[arg(short, long)]
    pub quiet: bool,
}
