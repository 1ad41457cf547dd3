use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use replypairs::{init_tracing_once, FileConfig, PairETL, SqliteStore};
use std::io;
use std::path::PathBuf;

const DEFAULT_CONFIG: &str = "pairs.toml";

#[derive(Parser)]
#[command(name = "replypairs", about = "Build (parent, reply) pairs from RC comment dumps")]
struct Cli {
    /// TOML config with a [store] section
    #[arg(long, short, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Stream comments into the pair table (`-` reads stdin)
    Ingest {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Wipe the pair table first
        #[arg(long)]
        reset: bool,
        #[arg(long, allow_hyphen_values = true)]
        min_score: Option<i64>,
        /// Log every decision
        #[arg(long)]
        verbose: bool,
        #[arg(long)]
        backfill_parents: bool,
        #[arg(long)]
        progress: bool,
    },
    /// Write {table}.from / {table}.to for each table
    Export {
        tables: Vec<String>,
        #[arg(long)]
        out_dir: Option<PathBuf>,
        #[arg(long, allow_hyphen_values = true)]
        min_score: Option<i64>,
    },
}

fn main() -> Result<()> {
    init_tracing_once();
    let cli = Cli::parse();

    // Config problems are fatal before any row is touched.
    let cfg = FileConfig::load(&cli.config)?;
    let store_cfg = cfg.store()?.clone();
    let mut etl = PairETL::with_options(cfg.options());

    match cli.mode {
        Mode::Ingest { inputs, reset, min_score, verbose, backfill_parents, progress } => {
            if reset { etl = etl.reset(true); }
            if let Some(s) = min_score { etl = etl.min_score(s); }
            if verbose { etl = etl.log_decisions(true); }
            if backfill_parents { etl = etl.backfill_parents(true); }
            etl = etl.progress(progress).progress_label("Ingesting");

            tracing::info!("Opening pair store {}", store_cfg.path.display());
            let store = SqliteStore::open(&store_cfg.path, &store_cfg.table)
                .with_context(|| format!("open {}", store_cfg.path.display()))?;

            let stats = if inputs.len() == 1 && inputs[0].as_os_str() == "-" {
                etl.ingest_reader(&store, io::stdin().lock())?
            } else {
                etl.ingest(&store, &inputs)?
            };
            tracing::info!(
                rows = stats.rows_read,
                paired = stats.pairing.paired,
                unpaired = stats.pairing.unpaired,
                replaced = stats.pairing.replaced,
                skipped = stats.pairing.skipped,
                backfilled = stats.pairing.backfilled,
                rejected = stats.rejected_total(),
                parse_errors = stats.parse_errors,
                store_errors = stats.pairing.store_errors,
                "ingest finished"
            );
        }
        Mode::Export { tables, out_dir, min_score } => {
            if let Some(s) = min_score { etl = etl.export_min_score(s); }
            let out_dir = out_dir.unwrap_or_else(|| cfg.export_dir());
            let tables = if tables.is_empty() { cfg.export_tables()? } else { tables };

            for table in &tables {
                let store = SqliteStore::open_existing(&store_cfg.path, table)
                    .with_context(|| format!("open {} [{}]", store_cfg.path.display(), table))?;
                if !store.table_exists()? {
                    tracing::warn!("Table [{}] not found in {}, skipping", table, store_cfg.path.display());
                    continue;
                }
                let stats = etl.export(&store, &out_dir, table)?;
                println!("{} -> {} pairs ({}, {})", table, stats.rows, stats.from_path.display(), stats.to_path.display());
            }
        }
    }
    Ok(())
}
