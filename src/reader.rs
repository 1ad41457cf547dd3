use anyhow::{Context, Result};
use std::fs;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use zstd::stream::read::Decoder;

use crate::util::open_with_backoff;

/// A `Read` wrapper that counts on-disk bytes read (compressed for `.zst`).
struct CountingReader<R: Read> {
    inner: R,
    counter: Arc<AtomicU64>,
}
impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.counter.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }
}

pub fn is_zst(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()).map(|e| e.eq_ignore_ascii_case("zst")).unwrap_or(false)
}

/// Open `path` as a buffered line source, decompressing `.zst` on the fly.
///
/// We request `window_log_max(31)` up front to avoid "Frame requires too much memory"
/// on the very large frames used by the monthly dumps.
fn open_lines(path: &Path, read_buf_bytes: usize, counter: Arc<AtomicU64>) -> Result<Box<dyn BufRead>> {
    let file = open_with_backoff(path, 16, 50).with_context(|| format!("open {}", path.display()))?;
    let cnt = CountingReader { inner: file, counter };
    let cap = read_buf_bytes.max(8 * 1024);
    if is_zst(path) {
        let mut decoder = Decoder::new(cnt)?;
        decoder.window_log_max(31)?;
        Ok(Box::new(BufReader::with_capacity(cap, decoder)))
    } else {
        Ok(Box::new(BufReader::with_capacity(cap, cnt)))
    }
}

/// Strip a trailing `\n` and then `\r` from a raw line.
pub fn trim_line_end(mut line: &[u8]) -> &[u8] {
    if let Some(rest) = line.strip_suffix(b"\n") {
        line = rest;
    }
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Stream a JSONL file (plain or `.zst`) line-by-line.
/// Calls `on_progress(delta_bytes_read)` as the file advances and `on_line` with each
/// raw line stripped of its `\r?\n`. Lines are not UTF-8 checked here, so one bad line
/// never ends the stream. A decode or IO failure mid-file aborts this file with an error;
/// callers decide whether to continue with the next one.
pub fn for_each_line_with_progress(
    path: &Path,
    read_buf_bytes: usize,
    mut on_progress: impl FnMut(u64),
    mut on_line: impl FnMut(&[u8]) -> Result<()>,
) -> Result<()> {
    let counter = Arc::new(AtomicU64::new(0));
    let mut reader = open_lines(path, read_buf_bytes, counter.clone())?;

    let mut buf: Vec<u8> = Vec::with_capacity(16 * 1024);
    let mut last = 0u64;
    loop {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf)?;
        if n == 0 {
            let cur = counter.load(Ordering::Relaxed);
            if cur > last {
                on_progress(cur - last);
            }
            break;
        }
        let cur = counter.load(Ordering::Relaxed);
        if cur > last {
            on_progress(cur - last);
            last = cur;
        }
        on_line(trim_line_end(&buf))?;
    }
    Ok(())
}

/// Log a skipped input file with its absolute path.
pub fn warn_file_skip(path: &Path, e: &anyhow::Error) {
    let abs = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    tracing::warn!(
        "Skipping rest of input after read/decode error\n  path : {}\n  error: {:#}",
        abs.display(),
        e
    );
}
