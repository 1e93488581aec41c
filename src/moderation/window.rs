use serde::{Deserialize, Serialize};

/// A single sender's recent accepted sends, in milliseconds since the epoch,
/// oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimestampWindow {
    stamps: Vec<i64>,
}

impl TimestampWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stamps strictly younger than `horizon_ms` at `now`.
    pub fn recent(&self, now: i64, horizon_ms: i64) -> usize {
        self.stamps
            .iter()
            .filter(|&&ts| now.saturating_sub(ts) < horizon_ms)
            .count()
    }

    /// Copy holding only the stamps younger than `horizon_ms` at `now`.
    pub fn pruned(&self, now: i64, horizon_ms: i64) -> Self {
        let stamps = self
            .stamps
            .iter()
            .copied()
            .filter(|&ts| now.saturating_sub(ts) < horizon_ms)
            .collect();
        Self { stamps }
    }

    /// Prune to the horizon, then record `now`.
    pub fn admit(&self, now: i64, horizon_ms: i64) -> Self {
        let mut next = self.pruned(now, horizon_ms);
        next.stamps.push(now);
        next
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.stamps
    }

    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }
}

impl From<Vec<i64>> for TimestampWindow {
    fn from(stamps: Vec<i64>) -> Self {
        Self { stamps }
    }
}

impl FromIterator<i64> for TimestampWindow {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        Self {
            stamps: iter.into_iter().collect(),
        }
    }
}
