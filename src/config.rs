use crate::filters::TextLimits;
use crate::sqlite_store::{validate_table_name, DEFAULT_TABLE};
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// User-facing options with sensible defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct PairOptions {
    // ingestion
    pub limits: TextLimits,           // score floor + body length ceilings
    pub reset: bool,                  // wipe the pair table before ingesting
    pub log_interval: u64,            // rows between progress lines
    pub log_decisions: bool,          // one log line per decision
    pub backfill_parents: bool,       // fill late-arriving parent text into existing slots
    pub parse_parallelism: usize,     // >1 parses/normalizes line batches on rayon
    pub parse_batch: usize,           // lines per parallel batch

    // export
    pub export_min_score: i64,
    pub export_log_interval: u64,

    pub progress: bool,               // show byte progress bar over inputs
    pub progress_label: Option<String>,

    // IO tuning
    pub read_buffer_bytes: usize,     // BufReader capacity
    pub write_buffer_bytes: usize,    // BufWriter capacity
}

impl Default for PairOptions {
    fn default() -> Self {
        Self {
            limits: TextLimits::default(),
            reset: false,
            log_interval: 10_000,
            log_decisions: false,
            backfill_parents: false,
            parse_parallelism: 1,
            parse_batch: 4096,

            export_min_score: 1,
            export_log_interval: 100_000,

            progress: false,
            progress_label: None,

            read_buffer_bytes: 256 * 1024,
            write_buffer_bytes: 256 * 1024,
        }
    }
}

impl PairOptions {
    pub fn with_min_score(mut self, score: i64) -> Self {
        self.limits.min_score = score;
        self
    }
    pub fn with_max_words(mut self, n: usize) -> Self {
        self.limits.max_words = n;
        self
    }
    pub fn with_max_chars(mut self, n: usize) -> Self {
        self.limits.max_chars = n;
        self
    }
    pub fn with_reset(mut self, yes: bool) -> Self {
        self.reset = yes;
        self
    }
    pub fn with_log_interval(mut self, rows: u64) -> Self {
        self.log_interval = rows.max(1);
        self
    }
    pub fn with_log_decisions(mut self, yes: bool) -> Self {
        self.log_decisions = yes;
        self
    }
    pub fn with_backfill_parents(mut self, yes: bool) -> Self {
        self.backfill_parents = yes;
        self
    }
    pub fn with_parse_parallelism(mut self, threads: usize) -> Self {
        self.parse_parallelism = threads.max(1);
        self
    }
    pub fn with_parse_batch(mut self, lines: usize) -> Self {
        self.parse_batch = lines.max(1);
        self
    }
    pub fn with_export_min_score(mut self, score: i64) -> Self {
        self.export_min_score = score;
        self
    }
    pub fn with_export_log_interval(mut self, rows: u64) -> Self {
        self.export_log_interval = rows.max(1);
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
    pub fn with_progress_label(mut self, label: impl Into<String>) -> Self {
        self.progress_label = Some(label.into());
        self
    }
    pub fn with_io_buffers(mut self, read_bytes: usize, write_bytes: usize) -> Self {
        self.read_buffer_bytes = read_bytes.max(8 * 1024);
        self.write_buffer_bytes = write_bytes.max(8 * 1024);
        self
    }
}

// ----------------------------- config file ------------------------------------

/// `[store]` section. Required.
#[derive(Clone, Debug, Deserialize)]
pub struct StoreSection {
    pub path: PathBuf,
    #[serde(default = "default_table")]
    pub table: String,
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngestSection {
    pub min_score: Option<i64>,
    pub max_words: Option<usize>,
    pub max_chars: Option<usize>,
    pub reset: Option<bool>,
    pub log_interval: Option<u64>,
    pub log_decisions: Option<bool>,
    pub backfill_parents: Option<bool>,
    pub parse_parallelism: Option<usize>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportSection {
    pub min_score: Option<i64>,
    pub log_interval: Option<u64>,
    pub out_dir: Option<PathBuf>,
    pub tables: Option<Vec<String>>,
}

/// On-disk TOML configuration:
///
/// ```toml
/// [store]
/// path = "data/replies.db"
/// table = "replies"
///
/// [ingest]
/// min_score = -100
///
/// [export]
/// min_score = 1
/// out_dir = "data"
/// tables = ["replies"]
/// ```
#[derive(Clone, Debug, Deserialize)]
pub struct FileConfig {
    pub store: Option<StoreSection>,
    #[serde(default)]
    pub ingest: IngestSection,
    #[serde(default)]
    pub export: ExportSection,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("in config {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let cfg: FileConfig = toml::from_str(text)?;
        let store = cfg.store.as_ref().ok_or_else(|| anyhow!("section [store] not found"))?;
        validate_table_name(&store.table)?;
        for t in cfg.export.tables.iter().flatten() {
            validate_table_name(t)?;
        }
        Ok(cfg)
    }

    /// The `[store]` section; `parse` already guarantees it is present.
    pub fn store(&self) -> Result<&StoreSection> {
        self.store.as_ref().ok_or_else(|| anyhow!("section [store] not found"))
    }

    /// Layer file values over the defaults.
    pub fn options(&self) -> PairOptions {
        let mut o = PairOptions::default();
        let i = &self.ingest;
        if let Some(v) = i.min_score { o = o.with_min_score(v); }
        if let Some(v) = i.max_words { o = o.with_max_words(v); }
        if let Some(v) = i.max_chars { o = o.with_max_chars(v); }
        if let Some(v) = i.reset { o = o.with_reset(v); }
        if let Some(v) = i.log_interval { o = o.with_log_interval(v); }
        if let Some(v) = i.log_decisions { o = o.with_log_decisions(v); }
        if let Some(v) = i.backfill_parents { o = o.with_backfill_parents(v); }
        if let Some(v) = i.parse_parallelism { o = o.with_parse_parallelism(v); }
        let e = &self.export;
        if let Some(v) = e.min_score { o = o.with_export_min_score(v); }
        if let Some(v) = e.log_interval { o = o.with_export_log_interval(v); }
        o
    }

    /// Export targets: `[export].tables`, falling back to the store table.
    pub fn export_tables(&self) -> Result<Vec<String>> {
        match &self.export.tables {
            Some(t) if !t.is_empty() => Ok(t.clone()),
            _ => Ok(vec![self.store()?.table.clone()]),
        }
    }

    pub fn export_dir(&self) -> PathBuf {
        self.export.out_dir.clone().unwrap_or_else(|| PathBuf::from("data"))
    }
}
