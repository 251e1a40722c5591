//! The `pqfeed` command-line tool.
//!
//! Every command writes JSON to the supplied writer: one document for
//! `schema`, `metadata` and `read`, one line per chunk followed by a summary
//! line for `stream`.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use pqfeed_parquet::{ChunkControl, ParquetRegistry, ReadOptions, ReaderConfig, Record};
use pqfeed_result::Result;
use serde::Serialize;

fn parse_batch_size(value: &str) -> std::result::Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|err| format!("invalid batch size '{value}': {err}"))?;
    if parsed == 0 {
        return Err("batch size must be greater than zero".into());
    }
    Ok(parsed)
}

#[derive(Parser, Debug)]
#[command(
    name = "pqfeed",
    version,
    about = "Inspect and stream Parquet files as JSON records"
)]
pub struct Cli {
    /// Rows per decoded batch (or set PQFEED_BATCH_SIZE).
    #[arg(long = "batch-size", value_name = "ROWS", value_parser = parse_batch_size, global = true)]
    pub batch_size: Option<usize>,
    /// Decode projected columns concurrently (or set PQFEED_PARALLEL_COLUMNS=1).
    #[arg(long = "parallel-columns", global = true)]
    pub parallel_columns: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the schema tree.
    Schema { path: PathBuf },
    /// Print file, row-group and column-chunk metadata.
    Metadata { path: PathBuf },
    /// Print the selected rows as a JSON array.
    Read(ReadArgs),
    /// Print the selected rows as one JSON line per chunk.
    Stream(StreamArgs),
}

#[derive(Args, Debug)]
pub struct SelectArgs {
    /// Top-level columns to output, in this order.
    #[arg(long, value_delimiter = ',', value_name = "NAME")]
    pub columns: Vec<String>,
    /// Maximum number of rows.
    #[arg(long, value_name = "ROWS")]
    pub limit: Option<usize>,
    /// Rows to skip from the start of the file.
    #[arg(long, value_name = "ROWS", default_value_t = 0)]
    pub skip: usize,
}

impl SelectArgs {
    fn options(&self) -> ReadOptions {
        ReadOptions {
            columns: (!self.columns.is_empty()).then(|| self.columns.clone()),
            row_limit: self.limit,
            skip_rows: self.skip,
        }
    }
}

#[derive(Args, Debug)]
pub struct ReadArgs {
    pub path: PathBuf,
    #[command(flatten)]
    pub select: SelectArgs,
}

#[derive(Args, Debug)]
pub struct StreamArgs {
    pub path: PathBuf,
    /// Rows per chunk.
    #[arg(long = "chunk-size", value_name = "ROWS")]
    pub chunk_size: usize,
    /// Stop after this many chunks.
    #[arg(long = "max-chunks", value_name = "N")]
    pub max_chunks: Option<usize>,
    #[command(flatten)]
    pub select: SelectArgs,
}

#[derive(Serialize)]
struct ChunkLine<'a> {
    chunk: usize,
    records: &'a [Record],
}

impl Cli {
    /// Environment configuration overridden by command-line flags.
    pub fn reader_config(&self) -> ReaderConfig {
        let mut config = ReaderConfig::from_env();
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if self.parallel_columns {
            config.parallel_columns = true;
        }
        config
    }
}

/// Execute `cli`, writing JSON output to `out`.
pub fn run<W: Write>(cli: &Cli, out: &mut W) -> Result<()> {
    let registry = ParquetRegistry::new(cli.reader_config());
    let result = execute(&registry, &cli.command, out);
    registry.close();
    result
}

fn execute<W: Write>(registry: &ParquetRegistry, command: &Command, out: &mut W) -> Result<()> {
    match command {
        Command::Schema { path } => write_json(out, &*registry.schema(path)?),
        Command::Metadata { path } => write_json(out, &*registry.metadata(path)?),
        Command::Read(args) => {
            let records = registry.read(&args.path, &args.select.options())?;
            write_json(out, &records)
        }
        Command::Stream(args) => {
            let mut chunk = 0;
            let summary = registry.read_chunked_with_options(
                &args.path,
                args.chunk_size,
                &args.select.options(),
                |records| -> io::Result<ChunkControl> {
                    chunk += 1;
                    serde_json::to_writer(
                        &mut *out,
                        &ChunkLine {
                            chunk,
                            records: &records,
                        },
                    )?;
                    writeln!(out)?;
                    Ok(match args.max_chunks {
                        Some(max) if chunk >= max => ChunkControl::Stop,
                        _ => ChunkControl::Continue,
                    })
                },
            )?;
            write_json(out, &summary)
        }
    }
}

fn write_json<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer(&mut *out, value).map_err(io::Error::from)?;
    writeln!(out)?;
    Ok(())
}
