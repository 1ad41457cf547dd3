//! Export projection: paired slots → `{name}.from` / `{name}.to`, one pair per line.

use crate::store::PairStore;
use crate::util::create_with_backoff;
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportStats {
    pub name: String,
    pub rows: u64,
    pub from_path: PathBuf,
    pub to_path: PathBuf,
}

/// Buffered line writer over a freshly truncated file.
/// You are responsible for nothing but the payload; `\n` is appended.
pub struct LineWriter {
    path: PathBuf,
    w: BufWriter<File>,
}

impl LineWriter {
    pub fn create(path: &Path, buf_bytes: usize) -> io::Result<Self> {
        let f = create_with_backoff(path, 16, 50)?;
        Ok(Self { path: path.to_path_buf(), w: BufWriter::with_capacity(buf_bytes.max(8 * 1024), f) })
    }

    #[inline]
    pub fn write_line(&mut self, s: &str) -> io::Result<()> {
        self.w.write_all(s.as_bytes())?;
        self.w.write_all(b"\n")
    }

    pub fn finish(mut self) -> Result<()> {
        self.w.flush().with_context(|| format!("flush {}", self.path.display()))
    }
}

pub fn output_paths(out_dir: &Path, name: &str) -> (PathBuf, PathBuf) {
    (out_dir.join(format!("{name}.from")), out_dir.join(format!("{name}.to")))
}

/// Stream every paired slot with `score >= min_score` out of `store`.
///
/// Both files are truncated first and kept index-aligned: line `i` of `.from`
/// is the parent of line `i` of `.to`. Rerunning over an unchanged store
/// rewrites identical bytes.
pub fn export_pairs(
    store: &dyn PairStore,
    out_dir: &Path,
    name: &str,
    min_score: i64,
    log_interval: u64,
    write_buf_bytes: usize,
) -> Result<ExportStats> {
    fs::create_dir_all(out_dir).with_context(|| format!("create {}", out_dir.display()))?;
    let (from_path, to_path) = output_paths(out_dir, name);
    let mut from = LineWriter::create(&from_path, write_buf_bytes)
        .with_context(|| format!("create {}", from_path.display()))?;
    let mut to = LineWriter::create(&to_path, write_buf_bytes)
        .with_context(|| format!("create {}", to_path.display()))?;

    tracing::info!("Exporting table [{}]", name);
    let interval = log_interval.max(1);
    let mut counter = 0u64;
    let rows = store
        .for_each_pair(min_score, &mut |parent, comment| {
            from.write_line(parent)?;
            to.write_line(comment)?;
            counter += 1;
            if counter % interval == 0 {
                tracing::info!("{} rows completed so far", counter);
            }
            Ok(())
        })
        .with_context(|| format!("export {name}"))?;

    from.finish()?;
    to.finish()?;
    tracing::info!(table = name, rows, "export finished");
    Ok(ExportStats { name: name.to_string(), rows, from_path, to_path })
}
