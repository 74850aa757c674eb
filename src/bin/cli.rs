use clap::{Parser, Subcommand};
use expiring_cuckoo_rs::{
    AddOutcome, CuckooFilter, CuckooFilterConfigBuilder, ExpiringCuckooFilter,
    ExpiringFilterConfigBuilder, FilterSnapshot, FilterStats,
    common::{bytes2hr, now_nanos},
    cuckoo::FilterKind,
};
use std::{
    fs,
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print each line of the input the first time it is seen
    Dedupe {
        /// Input file, one key per line; stdin when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Lines are `<timestamp_ns>\t<key>` instead of bare keys
        #[arg(short, long)]
        timestamps: bool,

        /// Filter capacity
        #[arg(short, long, default_value = "1000000")]
        capacity: usize,

        /// Interval length in minutes
        #[arg(long, default_value = "1")]
        interval: u32,

        /// Start from a snapshot instead of an empty filter
        #[arg(short, long)]
        load: Option<PathBuf>,

        /// Write a snapshot of the filter when done
        #[arg(short, long)]
        save: Option<PathBuf>,
    },

    /// Check whether a key is present in a snapshot
    Check {
        /// Snapshot file
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Key to look up
        #[arg(short, long)]
        key: String,
    },

    /// Display information about a snapshot
    Info {
        /// Snapshot file
        #[arg(short, long)]
        snapshot: PathBuf,
    },
}

#[derive(Debug, Default)]
struct Summary {
    added: usize,
    duplicates: usize,
    expired: usize,
    rejected: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Dedupe {
            input,
            timestamps,
            capacity,
            interval,
            load,
            save,
        } => {
            let mut filter = match &load {
                Some(path) => expiring_from_snapshot(&read_snapshot(path)?)?,
                None => ExpiringCuckooFilter::new(capacity, interval)?,
            };

            let reader: Box<dyn BufRead> = match &input {
                Some(path) => Box::new(BufReader::new(fs::File::open(path)?)),
                None => Box::new(BufReader::new(io::stdin())),
            };
            let summary = dedupe(&mut filter, reader, timestamps)?;

            eprintln!("Dedupe summary:");
            eprintln!("  Added: {}", summary.added);
            eprintln!("  Duplicates: {}", summary.duplicates);
            eprintln!("  Expired: {}", summary.expired);
            eprintln!("  Rejected (filter full): {}", summary.rejected);
            eprintln!("  Filter: {filter:?}");

            if let Some(path) = save {
                let bytes = filter.snapshot().encode()?;
                fs::write(&path, &bytes)?;
                info!(path = %path.display(), size = bytes.len(), "snapshot saved");
                eprintln!("Snapshot written to {}", path.display());
            }
        }
        Commands::Check { snapshot, key } => {
            let snapshot = read_snapshot(&snapshot)?;
            match snapshot.kind {
                FilterKind::Expiring => {
                    let filter = expiring_from_snapshot(&snapshot)?;
                    match filter.query(key.as_str()) {
                        Some(interval) => println!(
                            "Key '{key}' is present (interval {interval})"
                        ),
                        None => println!("Key '{key}' is not present"),
                    }
                }
                FilterKind::Plain => {
                    let config = CuckooFilterConfigBuilder::default()
                        .capacity(snapshot.capacity)
                        .build()?;
                    let filter = CuckooFilter::from_snapshot(config, &snapshot)?;
                    if filter.query(key.as_str()) {
                        println!("Key '{key}' is present");
                    } else {
                        println!("Key '{key}' is not present");
                    }
                }
            }
        }
        Commands::Info { snapshot: path } => {
            let snapshot = read_snapshot(&path)?;
            println!("Cuckoo Filter Snapshot:");
            println!("  File: {}", path.display());
            println!("  Kind: {:?}", snapshot.kind);
            println!("  Format version: {}", snapshot.version);
            println!("  Capacity: {}", snapshot.capacity);
            println!("  Count: {}", snapshot.count);
            println!(
                "  Load factor: {:.4}",
                snapshot.count as f64 / snapshot.capacity as f64
            );
            println!("  Image size: {}", bytes2hr(snapshot.data.len()));
            if let Some(minutes) = snapshot.interval_minutes {
                println!("  Interval: {minutes} minutes");
            }
            if let Some(ring) = snapshot.ring {
                println!("  Current interval: {}", ring.current);
                println!("  Current interval start: {}s", ring.current_time);
                match ring.lru {
                    Some(lru) => println!("  Next sweep interval: {lru}"),
                    None => println!("  Next sweep interval: none"),
                }
            }
        }
    }

    Ok(())
}

fn dedupe(
    filter: &mut ExpiringCuckooFilter,
    reader: impl BufRead,
    timestamps: bool,
) -> Result<Summary, Box<dyn std::error::Error>> {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut summary = Summary::default();

    for line in reader.lines() {
        let line = line?;
        let (timestamp, key) = if timestamps {
            parse_timestamped(&line)?
        } else {
            (now_nanos()?, line.as_str())
        };
        match filter.add(key, timestamp) {
            Ok(AddOutcome::Added) => {
                summary.added += 1;
                writeln!(out, "{key}")?;
            }
            Ok(AddOutcome::Duplicate { .. }) => summary.duplicates += 1,
            Ok(AddOutcome::Expired) => summary.expired += 1,
            Err(err) => {
                summary.rejected += 1;
                tracing::warn!(key, error = %err, "key not stored");
            }
        }
    }
    out.flush()?;
    Ok(summary)
}

fn parse_timestamped(
    line: &str,
) -> Result<(u64, &str), Box<dyn std::error::Error>> {
    let (timestamp, key) = line
        .split_once('\t')
        .ok_or_else(|| format!("expected `<timestamp_ns>\\t<key>`: {line:?}"))?;
    let timestamp = timestamp
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("bad timestamp {timestamp:?}: {e}"))?;
    Ok((timestamp, key))
}

fn read_snapshot(
    path: &Path,
) -> Result<FilterSnapshot, Box<dyn std::error::Error>> {
    let bytes = fs::read(path)?;
    Ok(FilterSnapshot::decode(&bytes)?)
}

fn expiring_from_snapshot(
    snapshot: &FilterSnapshot,
) -> Result<ExpiringCuckooFilter, Box<dyn std::error::Error>> {
    let interval = snapshot
        .interval_minutes
        .ok_or("snapshot is not from an expiring filter")?;
    let config = ExpiringFilterConfigBuilder::default()
        .capacity(snapshot.capacity)
        .interval_minutes(interval)
        .build()?;
    let filter = ExpiringCuckooFilter::from_snapshot(config, snapshot)?;
    info!(count = filter.count(), capacity = filter.capacity(), "snapshot loaded");
    Ok(filter)
}
