//! Transition records and replication snapshots.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of transitions kept per manager.
pub const DEFAULT_HISTORY_LEN: usize = 16;

/// What caused a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    /// `force_goto_state`, interruption rules ignored
    Forced,
    /// `try_goto_state`, accepted by the current state
    Requested,
    /// A state left on its own through `goto_state`
    SelfInitiated,
    /// Applied from a replicated state index
    Synced,
}

impl TransitionKind {
    /// Name used in logs and JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Forced => "forced",
            Self::Requested => "requested",
            Self::SelfInitiated => "self_initiated",
            Self::Synced => "synced",
        }
    }
}

/// One completed transition, by state index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Index of the state left, if any
    pub from: Option<usize>,
    /// Index of the state entered, if any
    pub to: Option<usize>,
    pub kind: TransitionKind,
    /// When the swap happened
    pub at: DateTime<Utc>,
}

/// Bounded log of recent transitions, oldest first.
#[derive(Debug, Clone)]
pub struct TransitionHistory {
    records: VecDeque<TransitionRecord>,
    capacity: usize,
}

impl Default for TransitionHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_LEN)
    }
}

impl TransitionHistory {
    /// A capacity of zero disables recording.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record a transition, dropping the oldest one when full.
    pub fn push(&mut self, from: Option<usize>, to: Option<usize>, kind: TransitionKind) {
        if self.capacity == 0 {
            return;
        }
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(TransitionRecord {
            from,
            to,
            kind,
            at: Utc::now(),
        });
    }

    /// Records, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &TransitionRecord> {
        self.records.iter()
    }

    /// Most recent record.
    pub fn last(&self) -> Option<&TransitionRecord> {
        self.records.back()
    }

    /// Number of records kept.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Maximum number of records kept.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop all records.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

/// Current state of a manager, by index, for sending over the network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Index of the current state
    pub current: Option<usize>,
    /// Whether the current state is active
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_history_is_bounded() {
        let mut history = TransitionHistory::with_capacity(2);
        history.push(None, Some(0), TransitionKind::Forced);
        history.push(Some(0), Some(1), TransitionKind::Requested);
        history.push(Some(1), None, TransitionKind::SelfInitiated);

        let kept: Vec<_> = history.iter().map(|r| (r.from, r.to, r.kind)).collect();
        assert_eq!(
            kept,
            vec![
                (Some(0), Some(1), TransitionKind::Requested),
                (Some(1), None, TransitionKind::SelfInitiated),
            ]
        );
    }

    #[test]
    fn test_zero_capacity_records_nothing() {
        let mut history = TransitionHistory::with_capacity(0);
        history.push(None, Some(0), TransitionKind::Forced);
        assert!(history.is_empty());
        assert!(history.last().is_none());
    }

    #[test]
    fn test_record_json() {
        let mut history = TransitionHistory::default();
        history.push(Some(2), Some(0), TransitionKind::SelfInitiated);

        let json = serde_json::to_value(history.last().unwrap()).unwrap();
        assert_eq!(json["from"], 2);
        assert_eq!(json["to"], 0);
        assert_eq!(json["kind"], "self_initiated");
        assert!(json["at"].is_string());
    }

    #[test]
    fn test_snapshot_json() {
        let snapshot = StateSnapshot {
            current: Some(1),
            active: true,
        };
        let text = serde_json::to_string(&snapshot).unwrap();
        assert_eq!(text, r#"{"current":1,"active":true}"#);

        let back: StateSnapshot = serde_json::from_str(&text).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn test_kind_as_str_matches_serde() {
        for kind in [
            TransitionKind::Forced,
            TransitionKind::Requested,
            TransitionKind::SelfInitiated,
            TransitionKind::Synced,
        ] {
            assert_eq!(serde_json::to_value(kind).unwrap(), kind.as_str());
        }
    }
}
