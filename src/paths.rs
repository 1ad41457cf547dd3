use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

fn input_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // RC_2019-08, RC_2019-08.zst, comments.jsonl, testdata.txt, ...
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(RC_\d{4}-\d{2}(\.zst)?|.+\.(jsonl|ndjson|json|txt|zst))$").expect("static regex")
    })
}

/// Expand the given inputs into an ordered list of files.
///
/// Files are taken as-is. Directories are walked recursively and only
/// JSONL-looking names are kept, sorted by path so monthly dumps replay in order.
pub fn discover_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for p in inputs {
        if p.is_dir() {
            out.extend(walk_dir(p));
        } else {
            out.push(p.clone());
        }
    }
    out
}

fn walk_dir(dir: &Path) -> Vec<PathBuf> {
    let re = input_name_re();
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.file_name().to_str().map(|n| re.is_match(n)).unwrap_or(false))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}
