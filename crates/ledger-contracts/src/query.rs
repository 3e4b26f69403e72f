//! Read-side query types.
//!
//! `SequenceRange` bounds a verification walk; `BlockQuery` drives the
//! filtered listing the admin UI searches with.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::block::Block;

/// An inclusive window of sequence ids. `None` on either side is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceRange {
    pub start: Option<u64>,
    pub end: Option<u64>,
}

impl SequenceRange {
    /// The whole chain.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(start: Option<u64>, end: Option<u64>) -> Self {
        Self { start, end }
    }

    /// True when the range begins at the head of the chain.
    pub fn starts_at_genesis(&self) -> bool {
        self.start.map_or(true, |s| s <= 1)
    }

    pub fn contains(&self, sequence_id: u64) -> bool {
        self.start.map_or(true, |s| sequence_id >= s) && self.end.map_or(true, |e| sequence_id <= e)
    }
}

/// Listing order for API responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    /// Newest first. The portal's audit page has always shown this order.
    #[default]
    Desc,
}

/// Filters for `list_blocks`. Every set filter must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockQuery {
    /// Case-insensitive substring of `actor`.
    pub actor_contains: Option<String>,

    /// Case-insensitive substring of `actor` or `action`, or a substring of
    /// `hash`.
    pub search: Option<String>,

    /// Inclusive lower timestamp bound.
    pub since: Option<DateTime<Utc>>,

    /// Inclusive upper timestamp bound.
    pub until: Option<DateTime<Utc>>,

    /// Only blocks appended on this UTC calendar day.
    pub on: Option<NaiveDate>,

    /// Resume cursor: only blocks with a sequence id greater than this.
    pub after: Option<u64>,

    /// Maximum number of blocks to yield.
    pub limit: Option<usize>,
}

impl BlockQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actor(mut self, needle: impl Into<String>) -> Self {
        self.actor_contains = Some(needle.into());
        self
    }

    pub fn search(mut self, needle: impl Into<String>) -> Self {
        self.search = Some(needle.into());
        self
    }

    pub fn between(mut self, since: Option<DateTime<Utc>>, until: Option<DateTime<Utc>>) -> Self {
        self.since = since;
        self.until = until;
        self
    }

    pub fn on(mut self, day: NaiveDate) -> Self {
        self.on = Some(day);
        self
    }

    pub fn after(mut self, cursor: u64) -> Self {
        self.after = Some(cursor);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Apply the content filters to one block.
    ///
    /// `after` and `limit` are positional and are handled by the iterator,
    /// not here.
    pub fn matches(&self, block: &Block) -> bool {
        if let Some(needle) = &self.actor_contains {
            if !contains_ignore_case(&block.actor, needle) {
                return false;
            }
        }

        if let Some(needle) = &self.search {
            let hit = contains_ignore_case(&block.actor, needle)
                || contains_ignore_case(&block.action, needle)
                || block.hash.contains(needle.as_str());
            if !hit {
                return false;
            }
        }

        if let Some(since) = self.since {
            if block.timestamp < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if block.timestamp > until {
                return false;
            }
        }
        if let Some(day) = self.on {
            if block.timestamp.date_naive() != day {
                return false;
            }
        }

        true
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
