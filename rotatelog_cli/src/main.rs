use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{bail, Context};
use rotatelog::{Namer, RotateOptions, RotatingWriter, Timestamp, TimestampNamer};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
enum Command {
    /// Appends stdin to a rotating log file, one line at a time.
    Write {
        #[structopt(short, long)]
        path: Option<PathBuf>,
        /// Rotation threshold, in bytes.
        #[structopt(long)]
        max_bytes: Option<u64>,
        /// Rotation threshold, in MiB.
        #[structopt(long)]
        max_megabytes: Option<u64>,
        /// JSON file holding the `RotateOptions`.
        #[structopt(short, long)]
        config: Option<PathBuf>,
        /// Prints a JSON summary of the writer on exit.
        #[structopt(long)]
        summary: bool,
    },
    /// Prints the name a file would be archived under if it rotated now.
    ArchiveName { path: PathBuf },
}

fn load_options(
    path: Option<PathBuf>,
    max_bytes: Option<u64>,
    max_megabytes: Option<u64>,
    config: Option<PathBuf>,
) -> anyhow::Result<RotateOptions> {
    if let Some(config) = config {
        if path.is_some() || max_bytes.is_some() || max_megabytes.is_some() {
            bail!("--config cannot be combined with --path, --max-bytes or --max-megabytes");
        }
        let json = std::fs::read_to_string(&config)
            .with_context(|| format!("failed to read {}", config.display()))?;
        return RotateOptions::from_json(&json)
            .with_context(|| format!("invalid config {}", config.display()));
    }
    let Some(path) = path else {
        bail!("either --path or --config is required");
    };
    match (max_bytes, max_megabytes) {
        (Some(max_bytes), None) => Ok(RotateOptions::new(path, max_bytes)),
        (None, Some(max_megabytes)) => Ok(RotateOptions::with_max_megabytes(path, max_megabytes)),
        _ => bail!("exactly one of --max-bytes or --max-megabytes is required"),
    }
}

fn run_write(options: RotateOptions, print_summary: bool) -> anyhow::Result<()> {
    let writer = RotatingWriter::from_options(options)?;
    let mut stdin = io::stdin().lock();
    let mut line = Vec::new();
    loop {
        line.clear();
        if stdin.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        writer.append(&line)?;
    }
    writer.sync()?;
    if print_summary {
        println!("{}", serde_json::to_string(&writer.summary())?);
    }
    Ok(())
}

fn run_archive_name(path: &Path) {
    let archive_path = TimestampNamer.archive_path(path, Timestamp::from(SystemTime::now()));
    println!("{}", archive_path.display());
}

fn main() -> anyhow::Result<()> {
    let command = Command::from_args();
    match command {
        Command::Write {
            path,
            max_bytes,
            max_megabytes,
            config,
            summary,
        } => {
            let options = load_options(path, max_bytes, max_megabytes, config)?;
            run_write(options, summary)?;
        }
        Command::ArchiveName { path } => {
            run_archive_name(&path);
        }
    }
    Ok(())
}
