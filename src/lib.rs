mod config;
mod paths;
mod reader;
mod progress;
mod util;
mod pipeline;

mod record;
mod filters;
mod pairing;

mod store;
mod sqlite_store;
mod memory_store;
mod export;

pub use crate::config::{FileConfig, PairOptions, StoreSection};
pub use crate::pipeline::{IngestStats, PairETL};

pub use crate::record::{parse_comment, ParentKind, ParentRef, RawComment};
pub use crate::filters::{check_body, format_text, normalize, NormalizedComment, Rejection, TextLimits};
pub use crate::pairing::{Decision, Pairer, PairingCounts};

// Pair Store seam and its two backends.
pub use crate::store::{PairRecord, PairStore, Reply, StoreCounts, StoreError, StoreResult};
pub use crate::sqlite_store::{validate_table_name, SqliteStore, DEFAULT_TABLE};
pub use crate::memory_store::MemoryStore;

pub use crate::export::{export_pairs, output_paths, ExportStats};
pub use crate::paths::discover_inputs;
pub use crate::util::init_tracing_once;
