//! Bounded undo/redo history over vector documents.
//!
//! The history is a single list of serialized [`VectorDocument`]
//! snapshots plus a cursor pointing at the selected one. Pushing after
//! an undo discards the redo branch. When the list grows past its
//! capacity the oldest snapshot is evicted and the cursor shifts down so
//! the newest snapshot stays selected.
//!
//! Snapshots are stored as JSON so that later edits to a live document
//! can never alias a stored state.

use crate::types::PipelineError;
use crate::vector::VectorDocument;

/// Default maximum number of snapshots.
pub const HISTORY_CAPACITY: usize = 50;

/// Linear snapshot history with a cursor.
///
/// Invariant: `index < snapshots.len()` whenever the history is
/// non-empty.
#[derive(Debug, Clone)]
pub struct HistoryStack {
    snapshots: Vec<String>,
    index: usize,
    capacity: usize,
}

impl HistoryStack {
    /// An empty history holding at most [`HISTORY_CAPACITY`] snapshots.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    /// An empty history holding at most `capacity` snapshots (minimum 1).
    #[must_use]
    pub const fn with_capacity(capacity: usize) -> Self {
        Self {
            snapshots: Vec::new(),
            index: 0,
            capacity: if capacity == 0 { 1 } else { capacity },
        }
    }

    /// Number of stored snapshots.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Returns `true` if nothing has been pushed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Position of the selected snapshot, or `None` when empty.
    #[must_use]
    pub const fn index(&self) -> Option<usize> {
        if self.snapshots.is_empty() {
            None
        } else {
            Some(self.index)
        }
    }

    /// Maximum number of snapshots kept.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether [`undo`](Self::undo) would move the cursor.
    #[must_use]
    pub const fn can_undo(&self) -> bool {
        !self.snapshots.is_empty() && self.index > 0
    }

    /// Whether [`redo`](Self::redo) would move the cursor.
    #[must_use]
    pub const fn can_redo(&self) -> bool {
        self.index + 1 < self.snapshots.len()
    }

    /// Record `document` as the newest state and select it.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Snapshot`] if the document cannot be
    /// serialized; the history is left unchanged.
    pub fn push(&mut self, document: &VectorDocument) -> Result<(), PipelineError> {
        let snapshot = serde_json::to_string(document)?;
        self.push_snapshot(snapshot);
        Ok(())
    }

    fn push_snapshot(&mut self, snapshot: String) {
        if !self.snapshots.is_empty() {
            self.snapshots.truncate(self.index + 1);
        }
        self.snapshots.push(snapshot);
        self.index = self.snapshots.len() - 1;

        if self.snapshots.len() > self.capacity {
            self.snapshots.remove(0);
            self.index -= 1;
        }
    }

    /// Step back one snapshot and return it, or `None` at the oldest.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Snapshot`] if the stored snapshot cannot
    /// be read back.
    pub fn undo(&mut self) -> Result<Option<VectorDocument>, PipelineError> {
        if !self.can_undo() {
            return Ok(None);
        }
        self.index -= 1;
        self.current()
    }

    /// Step forward one snapshot and return it, or `None` at the newest.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Snapshot`] if the stored snapshot cannot
    /// be read back.
    pub fn redo(&mut self) -> Result<Option<VectorDocument>, PipelineError> {
        if !self.can_redo() {
            return Ok(None);
        }
        self.index += 1;
        self.current()
    }

    /// The selected snapshot, or `None` when empty.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Snapshot`] if the stored snapshot cannot
    /// be read back.
    pub fn current(&self) -> Result<Option<VectorDocument>, PipelineError> {
        self.snapshots
            .get(self.index)
            .map(|s| serde_json::from_str(s))
            .transpose()
            .map_err(PipelineError::from)
    }
}

impl Default for HistoryStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::types::Dimensions;

    /// A document whose width tags it for identification.
    fn doc(tag: u32) -> VectorDocument {
        VectorDocument::empty(Dimensions {
            width: tag,
            height: 1,
        })
    }

    fn tag(document: Option<VectorDocument>) -> u32 {
        document.unwrap().dimensions.width
    }

    #[test]
    fn empty_history_is_inert() {
        let mut history = HistoryStack::new();
        assert!(history.is_empty());
        assert_eq!(history.index(), None);
        assert!(history.undo().unwrap().is_none());
        assert!(history.redo().unwrap().is_none());
        assert!(history.current().unwrap().is_none());
    }

    #[test]
    fn push_selects_newest() {
        let mut history = HistoryStack::new();
        history.push(&doc(1)).unwrap();
        history.push(&doc(2)).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history.index(), Some(1));
        assert_eq!(tag(history.current().unwrap()), 2);
    }

    #[test]
    fn undo_stops_at_oldest() {
        let mut history = HistoryStack::new();
        history.push(&doc(1)).unwrap();
        history.push(&doc(2)).unwrap();
        assert_eq!(tag(history.undo().unwrap()), 1);
        assert!(history.undo().unwrap().is_none());
        assert_eq!(history.index(), Some(0));
    }

    #[test]
    fn redo_stops_at_newest() {
        let mut history = HistoryStack::new();
        history.push(&doc(1)).unwrap();
        assert!(history.redo().unwrap().is_none());
        history.push(&doc(2)).unwrap();
        history.undo().unwrap();
        assert_eq!(tag(history.redo().unwrap()), 2);
        assert!(history.redo().unwrap().is_none());
    }

    #[test]
    fn push_after_undo_drops_redo_branch() {
        let mut history = HistoryStack::new();
        for t in 1..=3 {
            history.push(&doc(t)).unwrap();
        }
        history.undo().unwrap();
        history.undo().unwrap();
        history.push(&doc(9)).unwrap();
        assert_eq!(history.len(), 2);
        assert!(!history.can_redo());
        assert_eq!(tag(history.undo().unwrap()), 1);
        assert_eq!(tag(history.redo().unwrap()), 9);
    }

    #[test]
    fn fifty_two_pushes_evict_the_first_two() {
        let mut history = HistoryStack::new();
        for t in 1..=52 {
            history.push(&doc(t)).unwrap();
        }
        assert_eq!(history.len(), 50);
        assert_eq!(history.index(), Some(49));
        assert_eq!(tag(history.current().unwrap()), 52);

        let mut oldest = 0;
        while let Some(document) = history.undo().unwrap() {
            oldest = document.dimensions.width;
        }
        assert_eq!(oldest, 3);
    }

    #[test]
    fn zero_capacity_keeps_one_snapshot() {
        let mut history = HistoryStack::with_capacity(0);
        history.push(&doc(1)).unwrap();
        history.push(&doc(2)).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(tag(history.current().unwrap()), 2);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Push,
        Undo,
        Redo,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![Just(Op::Push), Just(Op::Undo), Just(Op::Redo)]
    }

    proptest! {
        #[test]
        fn cursor_always_in_bounds(ops in prop::collection::vec(op(), 0..200), capacity in 1usize..8) {
            let mut history = HistoryStack::with_capacity(capacity);
            for (n, op) in ops.iter().enumerate() {
                match op {
                    Op::Push => history.push(&doc(u32::try_from(n).unwrap())).unwrap(),
                    Op::Undo => { history.undo().unwrap(); }
                    Op::Redo => { history.redo().unwrap(); }
                }
                prop_assert!(history.len() <= capacity);
                if let Some(index) = history.index() {
                    prop_assert!(index < history.len());
                }
            }
        }

        #[test]
        fn undo_then_redo_round_trips(pushes in 2u32..80, undos in 1usize..60) {
            let mut history = HistoryStack::new();
            for t in 0..pushes {
                history.push(&doc(t)).unwrap();
            }
            let before = history.current().unwrap();
            let mut moved = 0;
            for _ in 0..undos {
                if history.undo().unwrap().is_some() {
                    moved += 1;
                }
            }
            for _ in 0..moved {
                prop_assert!(history.redo().unwrap().is_some());
            }
            prop_assert_eq!(history.current().unwrap(), before);
        }
    }
}
