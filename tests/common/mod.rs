#![allow(dead_code)]

use replypairs::{normalize, NormalizedComment, RawComment, TextLimits};
use serde_json::json;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// One RC-style comment line. `parent` is a full name like `t1_abc` / `t3_xyz`.
pub fn comment_line(id: &str, parent: &str, body: &str, score: i64) -> String {
    json!({
        "controversiality": 0, "body": body, "subreddit_id": "t5_x",
        "link_id": "t3_s1", "stickied": false, "subreddit": "programming", "score": score,
        "ups": score, "author": "alice", "id": id, "edited": false, "parent_id": parent,
        "gilded": 0, "distinguished": null, "created_utc": 1136074600, "retrieved_on": 1136075600
    })
    .to_string()
}

/// Build an accepted comment directly, bypassing the JSON layer.
pub fn nc(id: &str, parent: &str, body: &str, score: i64) -> NormalizedComment {
    let raw = RawComment {
        id: id.to_string(),
        parent_id: parent.to_string(),
        body: body.to_string(),
        subreddit: "programming".to_string(),
        created_utc: 1136074600,
        score,
    };
    normalize(raw, &TextLimits::default()).unwrap().unwrap()
}

pub fn write_lines(path: &Path, lines: &[String]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut f = File::create(path).unwrap();
    for l in lines {
        writeln!(&mut f, "{}", l).unwrap();
    }
}

/// Write a compressed `.zst` file containing the provided JSONL lines.
pub fn write_zst_lines(path: &Path, lines: &[String]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let f = File::create(path).unwrap();
    let mut enc = zstd::stream::write::Encoder::new(f, 3).unwrap();
    for l in lines {
        writeln!(&mut enc, "{}", l).unwrap();
    }
    enc.finish().unwrap();
}

/// Read a text file line-by-line into strings, keeping empty lines.
pub fn read_lines(path: &Path) -> Vec<String> {
    let f = File::open(path).unwrap();
    BufReader::new(f).lines().map(|l| l.unwrap()).collect()
}

/// A small mixed corpus:
/// - x replies to link s1 ("hello")
/// - a malformed line and a blank line
/// - y replies to x (paired with "hello"), score 5
/// - z replies to x but was deleted
/// - w replies to x below the default floor
/// - v replies to x with score 7 and takes the slot over
/// - a line whose parent_id has no type tag
pub fn mixed_corpus() -> Vec<String> {
    vec![
        comment_line("x", "t3_s1", "hello", 3),
        "{not json".to_string(),
        String::new(),
        comment_line("y", "t1_x", "hi there", 5),
        comment_line("z", "t1_x", "[deleted]", 10),
        comment_line("w", "t1_x", "meh", -200),
        comment_line("v", "t1_x", "better", 7),
        comment_line("u", "x", "no tag", 1),
    ]
}

/// Raw JSONL bytes with a non-UTF-8 line between valid ones:
/// a opens link s1, b replies to a, c opens link s2. CRLF endings on the last line.
pub fn corpus_with_invalid_utf8() -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(comment_line("a", "t3_s1", "first", 2).as_bytes());
    out.push(b'\n');
    out.extend_from_slice(b"{\"id\":\"bad\",\"body\":\"\xff\xfe\"}\n");
    out.extend_from_slice(comment_line("b", "t1_a", "second", 4).as_bytes());
    out.push(b'\n');
    out.extend_from_slice(comment_line("c", "t3_s2", "third", 1).as_bytes());
    out.extend_from_slice(b"\r\n");
    out
}
