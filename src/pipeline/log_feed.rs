use super::errors::{ServiceError, ServiceResult};
use crate::constants::MAX_PAGE_LIMIT;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// One audit log line with its monotonically increasing sequence number.
/// The sequence is the cursor basis; clients only ever see it encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub message: String,
    pub source: String,
}

/// One page of the cursor feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogPage {
    pub logs: Vec<AuditLogEntry>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

#[derive(Debug, Default)]
struct FeedState {
    entries: Vec<AuditLogEntry>,
    next_seq: u64,
}

/// Append-only audit log feed with opaque-cursor pagination.
///
/// New entries only ever receive higher sequence numbers, so successive
/// pages chained through `next_cursor` are disjoint and contiguous even
/// under concurrent appends — unlike an offset, the cursor cannot slide.
#[derive(Debug, Default)]
pub struct CursorLogFeed {
    state: RwLock<FeedState>,
}

impl CursorLogFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, returning its sequence number
    pub fn append(
        &self,
        level: impl Into<String>,
        message: impl Into<String>,
        source: impl Into<String>,
    ) -> u64 {
        let mut state = self.state.write();
        let seq = state.next_seq;
        state.next_seq += 1;
        state.entries.push(AuditLogEntry {
            seq,
            timestamp: Utc::now(),
            level: level.into(),
            message: message.into(),
            source: source.into(),
        });
        seq
    }

    /// Read one page after the given cursor (`None` starts from the top)
    pub fn page(&self, cursor: Option<&str>, limit: usize) -> ServiceResult<LogPage> {
        if limit == 0 {
            return Err(ServiceError::InvalidQuery("limit must be at least 1".into()));
        }
        let limit = limit.min(MAX_PAGE_LIMIT);
        let floor = match cursor {
            Some(token) => Some(decode_cursor(token)?),
            None => None,
        };

        let state = self.state.read();
        let start = match floor {
            // Entries are in ascending seq order; find the first strictly after
            Some(seq) => state.entries.partition_point(|e| e.seq <= seq),
            None => 0,
        };

        let logs: Vec<AuditLogEntry> = state.entries[start..]
            .iter()
            .take(limit)
            .cloned()
            .collect();
        let has_more = state.entries.len() > start + logs.len();
        let next_cursor = logs.last().map(|e| encode_cursor(e.seq));

        Ok(LogPage {
            logs,
            next_cursor,
            has_more,
        })
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }
}

fn encode_cursor(seq: u64) -> String {
    format!("{seq:016x}")
}

fn decode_cursor(token: &str) -> ServiceResult<u64> {
    u64::from_str_radix(token, 16)
        .map_err(|_| ServiceError::InvalidQuery(format!("malformed cursor '{token}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_feed(count: usize) -> CursorLogFeed {
        let feed = CursorLogFeed::new();
        for i in 0..count {
            feed.append("info", format!("line {i}"), "ingestor");
        }
        feed
    }

    #[test]
    fn test_chained_pages_are_disjoint_and_contiguous() {
        let feed = seeded_feed(7);

        let first = feed.page(None, 3).unwrap();
        assert_eq!(first.logs.len(), 3);
        assert!(first.has_more);

        let second = feed.page(first.next_cursor.as_deref(), 3).unwrap();
        assert_eq!(second.logs.len(), 3);
        assert!(second.has_more);

        let third = feed.page(second.next_cursor.as_deref(), 3).unwrap();
        assert_eq!(third.logs.len(), 1);
        assert!(!third.has_more);

        let seqs: Vec<u64> = first
            .logs
            .iter()
            .chain(&second.logs)
            .chain(&third.logs)
            .map(|e| e.seq)
            .collect();
        assert_eq!(seqs, (0..7).collect::<Vec<u64>>());
    }

    #[test]
    fn test_cursor_is_stable_under_concurrent_appends() {
        let feed = seeded_feed(4);
        let first = feed.page(None, 2).unwrap();

        // New entries arrive between page reads
        feed.append("info", "late arrival", "ingestor");

        let second = feed.page(first.next_cursor.as_deref(), 10).unwrap();
        let seqs: Vec<u64> = second.logs.iter().map(|e| e.seq).collect();
        // No duplicates of page one, no gaps, late arrival included
        assert_eq!(seqs, vec![2, 3, 4]);
    }

    #[test]
    fn test_malformed_cursor_is_rejected() {
        let feed = seeded_feed(1);
        assert!(matches!(
            feed.page(Some("not-hex"), 5),
            Err(ServiceError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_zero_limit_is_rejected() {
        let feed = seeded_feed(1);
        assert!(feed.page(None, 0).is_err());
    }

    #[test]
    fn test_empty_feed_page() {
        let feed = CursorLogFeed::new();
        let page = feed.page(None, 5).unwrap();
        assert!(page.logs.is_empty());
        assert!(page.next_cursor.is_none());
        assert!(!page.has_more);
    }
}
