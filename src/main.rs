use ascii_table::{Align, AsciiTable};
use clap::Parser;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use htree::utils::{duration_to_human_readable, size_to_human_readable};
use htree::{
    evaluate, ByteSource, LocalBackend, NoopObserver, Partition, ProgressObserver, Strategy,
    TreeObserver, TreeOptions,
};

/// Command-line interface for htree
#[derive(Parser, Debug)]
#[command(name = "htree", version, about = "A parallel hash tree checksum for files")]
struct Cli {
    /// File to checksum
    file: PathBuf,

    /// Number of regions (tree nodes) to split the file into
    partitions: usize,

    /// Number of pool threads to use
    #[arg(short, long, value_name = "THREADS", default_value_t = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or_else(|_| NonZeroUsize::MIN.get()))]
    threads: usize,

    /// Scheduling strategy for tree nodes
    #[arg(short, long, value_enum, default_value_t = Strategy::Pool)]
    strategy: Strategy,

    /// Disables the progress bar
    #[arg(long)]
    no_progress: bool,
}

fn main() -> ExitCode {
    // Initialize logging using env_logger and HTREE_LOG
    env_logger::Builder::from_env(env_logger::Env::new().filter("HTREE_LOG")).init();

    let cli = Cli::parse();

    let source = match LocalBackend::open(&cli.file) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let layout = match Partition::new(source.len(), cli.partitions) {
        Ok(layout) => layout,
        Err(e) => {
            eprintln!("Invalid partitioning: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let options = TreeOptions {
        strategy: cli.strategy,
        workers: cli.threads.max(1),
    };
    let progress = if cli.no_progress {
        None
    } else {
        Some(ProgressObserver::new(layout.count()))
    };
    let observer: &dyn TreeObserver = match progress.as_ref() {
        Some(progress) => progress,
        None => &NoopObserver,
    };

    let start = Instant::now();
    let result = evaluate(&source, layout.count(), &options, observer);
    let elapsed = start.elapsed();
    if let Some(progress) = progress.as_ref() {
        progress.finish();
    }

    let hash = match result {
        Ok(hash) => hash,
        Err(e) => {
            eprintln!("Checksum failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let workers = match options.strategy {
        Strategy::Pool => options.workers.min(layout.count()),
        Strategy::Spawn => layout.count(),
    };
    let rows: Vec<[String; 2]> = vec![
        ["File".into(), source.path().display().to_string()],
        [
            "Length".into(),
            format!(
                "{} bytes ({})",
                layout.file_length(),
                size_to_human_readable(layout.file_length() as f64)
            ),
        ],
        ["Partitions".into(), layout.count().to_string()],
        ["Region length".into(), format!("{} bytes", layout.region_length())],
        ["Truncated".into(), format!("{} bytes", layout.truncated_bytes())],
        ["Strategy".into(), options.strategy.to_string()],
        ["Threads".into(), workers.to_string()],
        ["Elapsed".into(), duration_to_human_readable(elapsed)],
        ["Checksum".into(), hash.to_string()],
    ];

    let mut table = AsciiTable::default();
    table.column(0).set_header("Field").set_align(Align::Left);
    table.column(1).set_header("Value").set_align(Align::Right);
    table.print(rows);

    ExitCode::SUCCESS
}
