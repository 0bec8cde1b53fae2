//! spillsort CLI
//!
//! Sorts newline-delimited records from files (or stdin) to stdout, spilling
//! to disk when the input outgrows the memory budget.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

use clap::Parser;
use spillsort::{Bytewise, Compression, Options, Reversed, Sorter};
use tracing_subscriber::{fmt, EnvFilter};

/// spillsort
#[derive(Parser, Debug)]
#[command(name = "spillsort")]
#[command(about = "Sort lines that may not fit in memory")]
#[command(version)]
struct Args {
    /// Input files (stdin when omitted or "-")
    files: Vec<PathBuf>,

    /// Memory budget in MB before a run is spilled
    #[arg(short = 'm', long, default_value = "64")]
    buffer_mb: usize,

    /// Directory for the spill file
    #[arg(short = 'T', long)]
    tmp_dir: Option<PathBuf>,

    /// Spill compression (none, gzip, snappy)
    #[arg(short, long, default_value = "none")]
    compress: String,

    /// Output only the last line for each key
    #[arg(short, long)]
    unique: bool,

    /// Sort in descending order
    #[arg(short, long)]
    reverse: bool,

    /// Keep the spill file for inspection
    #[arg(long)]
    keep_files: bool,

    /// Split each line into key and value at the first occurrence of this
    /// character; only the key is compared
    #[arg(short = 't', long)]
    separator: Option<char>,
}

fn main() {
    // Initialize tracing/logging (stderr, stdout carries the output)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,spillsort=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> spillsort::Result<()> {
    let compression: Compression = args.compress.parse()?;

    let mut builder = Options::builder()
        .buffer_size(args.buffer_mb.max(1) * 1024 * 1024)
        .compression(compression)
        .keep_files(args.keep_files);
    if let Some(dir) = &args.tmp_dir {
        builder = builder.work_dir(dir);
    }
    if args.reverse {
        builder = builder.comparator(Reversed(Bytewise));
    }
    if args.unique {
        builder = builder.dedupe_bytewise();
    }
    let options = builder.build();

    tracing::debug!(?options, "starting sort");

    let separator = args.separator.map(|c| {
        let mut buf = [0u8; 4];
        c.encode_utf8(&mut buf).as_bytes().to_vec()
    });

    let mut sorter = Sorter::new(options)?;
    let mut lines = 0u64;

    let inputs = if args.files.is_empty() {
        vec![PathBuf::from("-")]
    } else {
        args.files.clone()
    };
    for path in &inputs {
        let reader: Box<dyn BufRead> = if path.as_os_str() == "-" {
            Box::new(BufReader::new(io::stdin().lock()))
        } else {
            Box::new(BufReader::new(File::open(path)?))
        };

        for line in reader.split(b'\n') {
            let mut line = line?;
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            match separator.as_deref().and_then(|sep| find(&line, sep)) {
                Some(at) => sorter.put(&line[..at], &line[at..])?,
                None => sorter.append(&line)?,
            }
            lines += 1;
        }
    }

    tracing::info!(lines, bytes = sorter.size(), "input consumed");

    let mut iter = sorter.sort()?;
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut written = 0u64;
    while iter.advance() {
        out.write_all(iter.key())?;
        out.write_all(iter.value())?;
        out.write_all(b"\n")?;
        written += 1;
    }
    out.flush()?;

    if let Some(err) = iter.err() {
        return Err(spillsort::SortError::Storage(format!(
            "merge failed after {} lines: {}",
            written, err
        )));
    }
    if args.keep_files {
        tracing::info!(path = %iter.temp_path().display(), "spill file kept");
    }
    iter.close()?;

    tracing::info!(written, "sort complete");
    Ok(())
}

/// Position of the first `needle` in `haystack`
fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
