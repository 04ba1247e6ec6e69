//! Ordered, admission-gated snapshot buffer.
//!
//! Snapshots are kept sorted by [`Snapshot::remote_timestamp`]. The front
//! two entries form the *active interpolation segment* that
//! [`crate::engine::compute`] reads from on every tick;
//! [`OrderedBuffer::insert_if_new_enough`] refuses any admission that would
//! mutate that segment mid-interpolation, which is what keeps playback from
//! jerking or teleporting when a snapshot arrives out of order.
//!
//! A plain sorted `Vec` is used rather than a balanced tree: realistic
//! jitter buffers hold at most a few tens of entries, so linear insertion
//! cost is not worth the complexity of a tree structure here.

use crate::snapshot::Snapshot;

/// A buffer of snapshots, strictly increasing by remote timestamp.
#[derive(Clone, Debug)]
pub struct OrderedBuffer<S> {
    entries: Vec<S>,
}

impl<S> OrderedBuffer<S> {
    /// Creates an empty buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Number of buffered snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the buffer holds no snapshots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the two oldest snapshots, if at least two are buffered.
    ///
    /// These are the current interpolation segment endpoints.
    #[must_use]
    pub fn front_two(&self) -> Option<(&S, &S)> {
        if self.entries.len() < 2 {
            return None;
        }
        Some((&self.entries[0], &self.entries[1]))
    }

    /// Returns the newest buffered snapshot.
    #[must_use]
    pub fn newest(&self) -> Option<&S> {
        self.entries.last()
    }

    /// Removes and returns the oldest snapshot.
    ///
    /// Eviction from the front is the only way entries leave the buffer
    /// other than admission rejection; callers outside [`crate::engine`]
    /// should rarely need this directly.
    pub fn pop_front(&mut self) -> Option<S> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.remove(0))
        }
    }

    /// Iterates buffered snapshots, oldest first.
    pub fn iter(&self) -> std::slice::Iter<'_, S> {
        self.entries.iter()
    }
}

impl<S> Default for OrderedBuffer<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Snapshot> OrderedBuffer<S> {
    /// Admits `snapshot` if it satisfies the ordered-buffer invariants.
    ///
    /// Returns `true` if the snapshot was inserted, `false` if it was
    /// silently rejected -- rejection is not an error, just a dropped
    /// late or superseded sample. Rules:
    ///
    /// - empty buffer: always admit.
    /// - one resident: admit only if strictly newer than it
    ///   (first-is-lagging -- an older arrival must not re-latch the head
    ///   to stale data).
    /// - two or more residents: admit only if strictly newer than the
    ///   *second* entry (ACB -- the first two entries are the active
    ///   interpolation segment and must not be disturbed mid-interpolation).
    ///
    /// When admission is allowed, the snapshot is inserted at its sorted
    /// position rather than appended, so the strictly-increasing invariant
    /// holds even if a snapshot arrives that is newer than the segment
    /// endpoints but older than some entry deeper in the buffer.
    pub fn insert_if_new_enough(&mut self, snapshot: S) -> bool {
        let remote_timestamp = snapshot.remote_timestamp();

        match self.entries.len() {
            0 => {
                self.entries.push(snapshot);
                true
            }
            1 => {
                if remote_timestamp > self.entries[0].remote_timestamp() {
                    self.entries.push(snapshot);
                    true
                } else {
                    false
                }
            }
            _ => {
                if remote_timestamp <= self.entries[1].remote_timestamp() {
                    return false;
                }
                let index = self
                    .entries
                    .partition_point(|e| e.remote_timestamp() < remote_timestamp);
                if index < self.entries.len()
                    && self.entries[index].remote_timestamp() == remote_timestamp
                {
                    // Duplicate key deeper in the buffer than the segment
                    // endpoints; keeps invariant 1 (unique, strictly
                    // increasing keys) watertight.
                    return false;
                }
                self.entries.insert(index, snapshot);
                true
            }
        }
    }
}
