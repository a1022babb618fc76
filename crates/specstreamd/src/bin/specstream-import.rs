//! Imports a CSV recording into the array store.
//!
//! ```text
//! specstream-import 007 recording.csv --sample-rate 256 --data-dir /srv/recordings
//! ```
//!
//! The CSV holds one row per sample and one column per channel in wire order
//! (LL, LP, RP, RL).

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use specstream_config::CreatePolicy;
use specstream_storage::import::{CsvImporter, RecordingImporter};
use specstream_storage::{ChannelIndex, FileArrayStore};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "specstream-import", about = "Import a CSV recording as a stored array")]
struct Args {
    /// Recording identifier to store the samples under.
    id: String,
    /// CSV file with one column per channel.
    csv: PathBuf,
    /// Sample rate of the recording in Hz.
    #[arg(long)]
    sample_rate: u32,
    /// Directory holding array files.
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,
    /// Skip the first CSV line.
    #[arg(long)]
    headers: bool,
    /// What to do when the identifier already has an array.
    #[arg(long, default_value_t = CreatePolicy::Truncate)]
    create_policy: CreatePolicy,
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(error) = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .compact()
        .try_init()
    {
        eprintln!("specstream-import: logging disabled: {error}");
    }

    if let Err(error) = std::fs::create_dir_all(&args.data_dir) {
        eprintln!(
            "specstream-import: cannot create {}: {error}",
            args.data_dir.display()
        );
        return ExitCode::FAILURE;
    }
    let store = FileArrayStore::new(&args.data_dir, ChannelIndex::default())
        .with_create_policy(args.create_policy);
    let importer = CsvImporter::new(&args.csv, args.sample_rate).with_headers(args.headers);
    match importer.import(&store, &args.id) {
        Ok(metadata) => {
            let summary = writeln!(
                io::stdout().lock(),
                "{}: {} samples at {} Hz -> {}",
                args.id,
                metadata.sample_count,
                metadata.sample_rate,
                args.data_dir.display()
            );
            if summary.is_err() {
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("specstream-import: {error}");
            ExitCode::FAILURE
        }
    }
}
