use crate::config::PairOptions;
use crate::export::{export_pairs, ExportStats};
use crate::filters::{normalize, NormalizedComment, Rejection, TextLimits};
use crate::pairing::{Decision, Pairer, PairingCounts};
use crate::paths::discover_inputs;
use crate::progress::{make_progress_bar_labeled, total_input_size, RowLog};
use crate::reader::{for_each_line_with_progress, trim_line_end, warn_file_skip};
use crate::record::parse_comment;
use crate::store::PairStore;
use crate::util::init_tracing_once;
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};

#[derive(Clone)]
pub struct PairETL {
    pub(crate) opts: PairOptions,
}

impl Default for PairETL {
    fn default() -> Self {
        Self::new()
    }
}

/// Totals for one ingestion pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub files: u64,
    pub files_failed: u64,
    pub rows_read: u64,
    pub parse_errors: u64,
    pub rejected: BTreeMap<&'static str, u64>,
    pub pairing: PairingCounts,
}

impl IngestStats {
    pub fn rejected_total(&self) -> u64 {
        self.rejected.values().sum()
    }
}

/// One input line after the pure (store-free) stage.
enum Parsed {
    Blank,
    Malformed(String),
    Rejected(Rejection),
    Accepted(NormalizedComment),
}

fn classify(line: &[u8], limits: &TextLimits) -> Parsed {
    let line = match std::str::from_utf8(line) {
        Ok(l) => l,
        Err(e) => return Parsed::Malformed(format!("invalid UTF-8: {e}")),
    };
    if line.trim().is_empty() {
        return Parsed::Blank;
    }
    let raw = match parse_comment(line) {
        Ok(r) => r,
        Err(e) => return Parsed::Malformed(e.to_string()),
    };
    match normalize(raw, limits) {
        Ok(Ok(n)) => Parsed::Accepted(n),
        Ok(Err(r)) => Parsed::Rejected(r),
        Err(e) => Parsed::Malformed(e.to_string()),
    }
}

/// Sequential decision loop; parsed lines must be fed in file order.
struct IngestRun<'a> {
    pairer: Pairer<'a>,
    stats: IngestStats,
    rows: RowLog,
    log_decisions: bool,
}

impl<'a> IngestRun<'a> {
    fn apply(&mut self, parsed: Parsed) {
        self.stats.rows_read += 1;
        let row = self.stats.rows_read;
        match parsed {
            Parsed::Blank => {}
            Parsed::Malformed(e) => {
                self.stats.parse_errors += 1;
                tracing::warn!(row, "skipping malformed line: {e}");
            }
            Parsed::Rejected(r) => {
                *self.stats.rejected.entry(r.as_str()).or_insert(0) += 1;
            }
            Parsed::Accepted(rec) => {
                let d = self.pairer.ingest(&rec);
                if self.log_decisions {
                    log_decision(d, row, &rec);
                }
            }
        }
        self.rows.tick(row, self.pairer.counts().paired);
    }

    fn finish(mut self) -> IngestStats {
        self.stats.pairing = self.pairer.counts();
        self.rows.finish(self.stats.rows_read, self.stats.pairing.paired);
        self.stats
    }
}

fn log_decision(d: Decision, row: u64, rec: &NormalizedComment) {
    tracing::info!(
        decision = d.tag(),
        row,
        parent_id = %rec.parent_id,
        comment_id = %rec.comment_id,
        score = rec.score,
        "decision"
    );
}

impl PairETL {
    pub fn new() -> Self {
        Self { opts: PairOptions::default() }
    }

    pub fn with_options(opts: PairOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &PairOptions {
        &self.opts
    }

    // -------- Builder methods --------
    pub fn min_score(mut self, score: i64) -> Self { self.opts = self.opts.with_min_score(score); self }
    pub fn max_words(mut self, n: usize) -> Self { self.opts = self.opts.with_max_words(n); self }
    pub fn max_chars(mut self, n: usize) -> Self { self.opts = self.opts.with_max_chars(n); self }
    pub fn reset(mut self, yes: bool) -> Self { self.opts = self.opts.with_reset(yes); self }
    pub fn log_interval(mut self, rows: u64) -> Self { self.opts = self.opts.with_log_interval(rows); self }
    pub fn log_decisions(mut self, yes: bool) -> Self { self.opts = self.opts.with_log_decisions(yes); self }
    pub fn backfill_parents(mut self, yes: bool) -> Self { self.opts = self.opts.with_backfill_parents(yes); self }
    pub fn parse_parallelism(mut self, threads: usize) -> Self { self.opts = self.opts.with_parse_parallelism(threads); self }
    pub fn parse_batch(mut self, lines: usize) -> Self { self.opts = self.opts.with_parse_batch(lines); self }
    pub fn export_min_score(mut self, score: i64) -> Self { self.opts = self.opts.with_export_min_score(score); self }
    pub fn export_log_interval(mut self, rows: u64) -> Self { self.opts = self.opts.with_export_log_interval(rows); self }
    pub fn progress(mut self, yes: bool) -> Self { self.opts = self.opts.with_progress(yes); self }
    pub fn progress_label(mut self, label: impl Into<String>) -> Self { self.opts = self.opts.with_progress_label(label); self }
    pub fn io_buffers(mut self, read_bytes: usize, write_bytes: usize) -> Self { self.opts = self.opts.with_io_buffers(read_bytes, write_bytes); self }

    fn start<'a>(&self, store: &'a dyn PairStore) -> Result<IngestRun<'a>> {
        init_tracing_once();
        store.prepare(self.opts.reset).context("prepare pair store")?;
        Ok(IngestRun {
            pairer: Pairer::new(store).with_backfill(self.opts.backfill_parents),
            stats: IngestStats::default(),
            rows: RowLog::new(self.opts.log_interval),
            log_decisions: self.opts.log_decisions,
        })
    }

    fn parse_pool(&self) -> Result<Option<rayon::ThreadPool>> {
        if self.opts.parse_parallelism <= 1 {
            return Ok(None);
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.opts.parse_parallelism)
            .build()
            .context("build parse pool")?;
        Ok(Some(pool))
    }

    /// Ingest one or more JSONL inputs (files or directories) into `store`, in order.
    ///
    /// Creates the schema (and wipes it when `reset` is set) before the first row.
    /// A file that cannot be opened or decoded is logged and skipped; rows are
    /// never fatal.
    pub fn ingest(self, store: &dyn PairStore, inputs: &[PathBuf]) -> Result<IngestStats> {
        let mut run = self.start(store)?;
        let pool = self.parse_pool()?;

        let files = discover_inputs(inputs);
        if files.is_empty() {
            tracing::warn!("No input files found. Check the input paths.");
        } else {
            tracing::info!("Planned {} files for ingestion.", files.len());
        }

        let pb = if self.opts.progress {
            Some(make_progress_bar_labeled(total_input_size(&files), self.opts.progress_label.as_deref()))
        } else {
            None
        };

        for path in &files {
            run.stats.files += 1;
            let res = self.ingest_file(&mut run, pool.as_ref(), path, |delta| {
                if let Some(pb) = &pb { pb.inc(delta); }
            });
            if let Err(e) = res {
                run.stats.files_failed += 1;
                warn_file_skip(path, &e);
            }
        }

        if let Some(pb) = pb {
            pb.finish_with_message("done");
        }
        Ok(run.finish())
    }

    /// Ingest from any buffered line source (e.g. stdin).
    pub fn ingest_reader(self, store: &dyn PairStore, reader: impl BufRead) -> Result<IngestStats> {
        let mut run = self.start(store)?;
        let pool = self.parse_pool()?;
        let mut batch = Vec::new();
        for line in reader.split(b'\n') {
            let line = line.context("read input line")?;
            self.push_line(&mut run, pool.as_ref(), &mut batch, trim_line_end(&line));
        }
        self.flush_batch(&mut run, pool.as_ref(), &mut batch);
        Ok(run.finish())
    }

    fn ingest_file(
        &self,
        run: &mut IngestRun<'_>,
        pool: Option<&rayon::ThreadPool>,
        path: &Path,
        on_progress: impl FnMut(u64),
    ) -> Result<()> {
        let mut batch = Vec::new();
        let res = for_each_line_with_progress(path, self.opts.read_buffer_bytes, on_progress, |line| {
            self.push_line(run, pool, &mut batch, line);
            Ok(())
        });
        // Lines already read still get their decisions, even if the file broke later.
        self.flush_batch(run, pool, &mut batch);
        res
    }

    fn push_line(&self, run: &mut IngestRun<'_>, pool: Option<&rayon::ThreadPool>, batch: &mut Vec<Vec<u8>>, line: &[u8]) {
        if pool.is_none() {
            run.apply(classify(line, &self.opts.limits));
            return;
        }
        batch.push(line.to_vec());
        if batch.len() >= self.opts.parse_batch {
            self.flush_batch(run, pool, batch);
        }
    }

    /// Parse/normalize a batch in parallel, then apply decisions serially in line order.
    fn flush_batch(&self, run: &mut IngestRun<'_>, pool: Option<&rayon::ThreadPool>, batch: &mut Vec<Vec<u8>>) {
        let Some(pool) = pool else { return };
        if batch.is_empty() {
            return;
        }
        let limits = self.opts.limits;
        let parsed: Vec<Parsed> = pool.install(|| batch.par_iter().map(|l| classify(l, &limits)).collect());
        batch.clear();
        for p in parsed {
            run.apply(p);
        }
    }

    /// Write `{out_dir}/{name}.from` and `{out_dir}/{name}.to` from the paired slots in `store`.
    pub fn export(&self, store: &dyn PairStore, out_dir: &Path, name: &str) -> Result<ExportStats> {
        init_tracing_once();
        export_pairs(
            store,
            out_dir,
            name,
            self.opts.export_min_score,
            self.opts.export_log_interval,
            self.opts.write_buffer_bytes,
        )
    }
}
