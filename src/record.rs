//! Line-level comment schema and parent-reference parsing.

use anyhow::{anyhow, Result};
use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::sync::OnceLock;

/// One raw comment line as it appears in the RC corpus.
/// Extra fields are ignored by serde.
#[derive(Debug, Clone, Deserialize)]
pub struct RawComment {
    pub id: String,
    pub parent_id: String,
    pub body: String,
    pub subreddit: String,
    #[serde(deserialize_with = "de_unix")]
    pub created_utc: i64,
    pub score: i64,
}

/// `created_utc` shows up as an integer, a float, or a numeric string
/// depending on the dump vintage.
fn de_unix<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Unix {
        Int(i64),
        Float(f64),
        Str(String),
    }
    match Unix::deserialize(d)? {
        Unix::Int(n) => Ok(n),
        Unix::Float(f) => Ok(f as i64),
        Unix::Str(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .or_else(|_| s.parse::<f64>().map(|f| f as i64))
                .map_err(|_| serde::de::Error::custom(format!("non-numeric created_utc: {s:?}")))
        }
    }
}

/// Thing type named by a fullname prefix (`t1_` comment, `t3_` link).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentKind {
    Comment,
    Link,
    Other(String),
}

/// A parsed `"<type>_<id>"` parent reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentRef {
    pub kind: ParentKind,
    pub id: String,
}

fn fullname_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Za-z0-9]+)_([A-Za-z0-9]+)$").expect("static regex"))
}

impl ParentRef {
    /// Split a fullname into its type tag and bare id.
    pub fn parse(fullname: &str) -> Result<Self> {
        let caps = fullname_re()
            .captures(fullname.trim())
            .ok_or_else(|| anyhow!("parent_id is not <type>_<id>: {fullname:?}"))?;
        let kind = match &caps[1] {
            "t1" => ParentKind::Comment,
            "t3" => ParentKind::Link,
            other => ParentKind::Other(other.to_string()),
        };
        Ok(Self { kind, id: caps[2].to_string() })
    }
}

/// Parse a JSON line into `RawComment` using serde_json.
#[inline]
pub fn parse_comment(line: &str) -> Result<RawComment> {
    Ok(serde_json::from_str(line)?)
}
