//! Comment normalization and acceptance rules applied before any store access.

use crate::record::{ParentKind, ParentRef, RawComment};
use anyhow::Result;

/// Thresholds for accepting a comment body.
#[derive(Clone, Copy, Debug)]
pub struct TextLimits {
    pub min_score: i64,
    pub max_words: usize,
    pub max_chars: usize,
}

impl Default for TextLimits {
    fn default() -> Self {
        Self { min_score: -100, max_words: 1000, max_chars: 32_000 }
    }
}

/// Why a well-formed comment was dropped. Not an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Rejection {
    BelowMinScore,
    EmptyBody,
    TooManyWords,
    TooManyChars,
    Deleted,
    Removed,
}

impl Rejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rejection::BelowMinScore => "below_min_score",
            Rejection::EmptyBody => "empty_body",
            Rejection::TooManyWords => "too_many_words",
            Rejection::TooManyChars => "too_many_chars",
            Rejection::Deleted => "deleted",
            Rejection::Removed => "removed",
        }
    }
}

/// A comment that passed validation, with its parent tag stripped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizedComment {
    pub comment_id: String,
    pub parent_id: String,
    pub parent_kind: ParentKind,
    pub body: String,
    pub subreddit: String,
    pub created_utc: i64,
    pub score: i64,
}

/// Drop line breaks and swap double quotes for single quotes so a body
/// always fits on one output line.
pub fn format_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\n' | '\r' => {}
            '"' => out.push('\''),
            _ => out.push(c),
        }
    }
    out
}

/// Length and sentinel checks on an already formatted body.
/// Word and char ceilings count the body as stored, with no SQL quote doubling.
pub fn check_body(body: &str, limits: &TextLimits) -> Option<Rejection> {
    if body.is_empty() {
        return Some(Rejection::EmptyBody);
    }
    if body.split(' ').count() > limits.max_words {
        return Some(Rejection::TooManyWords);
    }
    if body.chars().count() > limits.max_chars {
        return Some(Rejection::TooManyChars);
    }
    match body {
        "[deleted]" => Some(Rejection::Deleted),
        "[removed]" => Some(Rejection::Removed),
        _ => None,
    }
}

/// Validate and normalize one raw comment.
///
/// The outer `Result` carries malformed input (bad parent reference); the inner
/// one carries a rejection reason for well-formed comments we do not keep.
pub fn normalize(raw: RawComment, limits: &TextLimits) -> Result<std::result::Result<NormalizedComment, Rejection>> {
    let parent = ParentRef::parse(&raw.parent_id)?;
    if raw.score < limits.min_score {
        return Ok(Err(Rejection::BelowMinScore));
    }
    let body = format_text(&raw.body);
    if let Some(r) = check_body(&body, limits) {
        return Ok(Err(r));
    }
    Ok(Ok(NormalizedComment {
        comment_id: raw.id,
        parent_id: parent.id,
        parent_kind: parent.kind,
        body,
        subreddit: raw.subreddit,
        created_utc: raw.created_utc,
        score: raw.score,
    }))
}
