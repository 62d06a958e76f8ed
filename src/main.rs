use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{Level, LevelFilter, Log, Metadata, Record};

use fat_inspect::fs::DEFAULT_MAX_DEPTH;
use fat_inspect::{inspect_image, report, InspectOptions, SortOrder};

/// Inspect the boot sector, allocation table and directory tree of a
/// FAT12 or FAT32 image.
#[derive(Parser)]
#[command(name = "fat-inspect", version = env!("APP_VERSION"))]
struct Cli {
    /// Image file or block device holding a bare FAT volume
    image: PathBuf,

    /// Emit a JSON report instead of text
    #[arg(long)]
    json: bool,

    /// Only list the root directory
    #[arg(long)]
    no_recursive: bool,

    /// List files before subdirectories within each directory
    #[arg(long)]
    files_first: bool,

    /// Maximum directory nesting before the tree is treated as corrupt
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Writes log records to stderr as `HH:MM:SS [LEVEL] message`.
struct StderrLog {
    level: LevelFilter,
}

impl Log for StderrLog {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let prefix = match record.level() {
            Level::Error => "ERR ",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DBG ",
            Level::Trace => "TRC ",
        };
        let now = chrono::Local::now().format("%H:%M:%S");
        let _ = writeln!(io::stderr().lock(), "{now} [{prefix}] {}", record.args());
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    // Only fails if a logger is already installed.
    if log::set_boxed_logger(Box::new(StderrLog { level })).is_ok() {
        log::set_max_level(level);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let options = InspectOptions {
        max_depth: cli.max_depth,
        sort: if cli.files_first {
            SortOrder::FilesFirst
        } else {
            SortOrder::OnDisk
        },
    };

    let inspection = inspect_image(&cli.image, &options)
        .with_context(|| format!("failed to inspect {}", cli.image.display()))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if cli.json {
        report::write_json(&mut out, &inspection, !cli.no_recursive)
            .context("failed to write JSON report")?;
    } else {
        writeln!(out, "fat-inspect {}", env!("APP_VERSION"))?;
        writeln!(out)?;
        report::write_report(&mut out, &inspection, !cli.no_recursive)
            .context("failed to write report")?;
    }
    out.flush()?;
    Ok(())
}
