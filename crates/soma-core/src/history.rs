use std::collections::VecDeque;

use crate::types::{TrackHistoryEntry, TrackMetadata};

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Most-recent-first tracklist, bounded and de-duplicated against its head.
#[derive(Debug, Clone)]
pub struct TrackHistory {
    entries: VecDeque<TrackHistoryEntry>,
    limit: usize,
}

impl Default for TrackHistory {
    fn default() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }
}

impl TrackHistory {
    pub fn with_limit(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            entries: VecDeque::with_capacity(limit),
            limit,
        }
    }

    pub fn head(&self) -> Option<&TrackHistoryEntry> {
        self.entries.front()
    }

    /// Prepend `track` unless it is the same song as the current head.
    /// Returns true when an entry was added.
    pub fn record(&mut self, track: TrackMetadata, played_at: i64) -> bool {
        if self.head().is_some_and(|head| head.track.same_track(&track)) {
            return false;
        }
        self.entries.push_front(TrackHistoryEntry::new(track, played_at));
        self.entries.truncate(self.limit);
        true
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackHistoryEntry> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<TrackHistoryEntry> {
        self.entries.iter().cloned().collect()
    }
}
