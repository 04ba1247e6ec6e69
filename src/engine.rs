//! Stepping engine.
//!
//! [`compute`] is called once per local tick. It advances the
//! interpolation cursor, consumes buffer entries as the cursor crosses
//! them, and returns either an interpolated snapshot or `None` if the
//! buffer is not yet ready. It never extrapolates: if the cursor runs past
//! the newest known segment before a fresh snapshot arrives, it clamps to
//! the newest buffered value and waits.
//!
//! ## States
//!
//! These are derived from buffer contents and cursor position, not stored
//! anywhere:
//!
//! - **underfull** (`len < 2`): returns `None`.
//! - **warming** (`len >= 2`, second snapshot hasn't aged past `buffer_time`
//!   on the local clock yet): returns `None`.
//! - **interpolating** (gates pass, cursor inside the current segment):
//!   returns `Some` with a blended value.
//! - **overshoot** (cursor past the last known segment, no new snapshot
//!   yet): returns `Some` with the newest buffered value, unchanged.

use crate::buffer::OrderedBuffer;
use crate::snapshot::Snapshot;

/// Controls catch-up behavior when the buffer grows past a healthy depth.
///
/// When more than `threshold` snapshots are queued, the cursor speeds up
/// by `multiplier` per excess entry, draining the backlog instead of
/// letting latency creep up indefinitely.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CatchUpConfig {
    /// Buffer length above which catch-up engages.
    pub threshold: u32,
    /// Fractional cursor speed-up applied per entry beyond `threshold`.
    pub multiplier: f32,
}

impl CatchUpConfig {
    /// Disables catch-up: the cursor always advances at exactly
    /// `delta_time`, no matter how deep the buffer gets.
    pub const DISABLED: Self = Self {
        threshold: u32::MAX,
        multiplier: 0.0,
    };

    /// Creates a catch-up configuration.
    #[must_use]
    pub const fn new(threshold: u32, multiplier: f32) -> Self {
        Self { threshold, multiplier }
    }
}

impl Default for CatchUpConfig {
    fn default() -> Self {
        Self::DISABLED
    }
}

/// Advances `interpolation_time` by one tick and, if the buffer is ready,
/// emits an interpolated snapshot.
///
/// - `local_time` / `delta_time`: the consumer's clock and the elapsed
///   time since the previous call (seconds). `delta_time == 0.0` is legal
///   and leaves the cursor unchanged.
/// - `interpolation_time`: the cursor, owned by the caller. Advanced in
///   place; decreased whenever a segment is fully crossed and its front
///   entry is popped.
/// - `buffer_time`: the jitter buffer depth -- the minimum age (on the
///   *local* clock) a snapshot must reach before it can anchor a segment.
/// - `catchup`: see [`CatchUpConfig`].
///
/// Returns `None` when there isn't yet enough buffered data to
/// interpolate (buffer underfull, or the second snapshot hasn't aged past
/// `buffer_time`). Returns `Some(snapshot)` otherwise, including the
/// no-extrapolation overshoot case where the newest buffered snapshot is
/// emitted unchanged and the cursor is left wherever it landed, to be
/// drained naturally once a new snapshot arrives.
///
/// # Panics
///
/// Never panics in release builds. In debug builds, panics if the
/// buffer's strictly-increasing invariant has been violated by a caller
/// that bypassed [`OrderedBuffer::insert_if_new_enough`].
pub fn compute<S: Snapshot>(
    local_time: f64,
    delta_time: f64,
    interpolation_time: &mut f64,
    buffer_time: f32,
    buffer: &mut OrderedBuffer<S>,
    catchup: CatchUpConfig,
) -> Option<S> {
    if buffer.len() < 2 {
        return None;
    }

    let second_local = buffer
        .front_two()
        .expect("buffer.len() >= 2 checked above")
        .1
        .local_timestamp();
    if second_local > local_time - f64::from(buffer_time) {
        return None;
    }

    let excess = (buffer.len() as u32).saturating_sub(catchup.threshold);
    let effective_delta = delta_time * f64::from(excess).mul_add(f64::from(catchup.multiplier), 1.0);
    *interpolation_time += effective_delta;

    if excess > 0 {
        tracing::trace!(excess, effective_delta, "catch-up engaged");
    }

    // Cross as many fully-elapsed segments as the cursor allows, but
    // always leave at least two entries buffered: the last pair is kept
    // around so the final check below can tell "still interpolating
    // within the known segment" apart from "overshot it, nothing newer
    // buffered yet".
    while buffer.len() > 2 {
        let span = {
            let (b0, b1) = buffer.front_two().expect("buffer.len() > 2 checked above");
            b1.remote_timestamp() - b0.remote_timestamp()
        };
        debug_assert!(
            span > 0.0,
            "ordered buffer invariant violated: remote timestamps are not strictly increasing"
        );
        if *interpolation_time < span {
            break;
        }
        *interpolation_time -= span;
        buffer.pop_front();
    }

    let (b0, b1) = buffer
        .front_two()
        .expect("traversal never drops below the 2 entries checked at entry");
    let span = b1.remote_timestamp() - b0.remote_timestamp();
    debug_assert!(
        span > 0.0,
        "ordered buffer invariant violated: remote timestamps are not strictly increasing"
    );

    if *interpolation_time >= span {
        tracing::trace!(
            interpolation_time = *interpolation_time,
            "overshoot: cursor past newest known segment, holding for new data"
        );
        return Some(b1.interpolate(b1, 0.0));
    }

    let t = *interpolation_time / span;
    Some(b0.interpolate(b1, t))
}

/// Owned interpolation state for a single producer stream.
///
/// Bundles the ordered buffer, the interpolation cursor, and the
/// buffer-depth / catch-up configuration so a consumer can drive the
/// whole admission-and-stepping pipeline through two calls per tick:
/// [`SnapshotInterpolator::insert`] when a snapshot arrives,
/// [`SnapshotInterpolator::step`] once per frame.
#[derive(Clone, Debug)]
pub struct SnapshotInterpolator<S> {
    buffer: OrderedBuffer<S>,
    interpolation_time: f64,
    buffer_time: f32,
    catchup: CatchUpConfig,
}

impl<S> SnapshotInterpolator<S> {
    /// Creates an interpolator with the given jitter buffer depth and
    /// catch-up disabled.
    #[must_use]
    pub fn new(buffer_time: f32) -> Self {
        Self {
            buffer: OrderedBuffer::new(),
            interpolation_time: 0.0,
            buffer_time,
            catchup: CatchUpConfig::default(),
        }
    }

    /// Sets the catch-up configuration.
    #[must_use]
    pub fn with_catchup(mut self, catchup: CatchUpConfig) -> Self {
        self.catchup = catchup;
        self
    }

    /// Current interpolation cursor value.
    #[must_use]
    pub const fn interpolation_time(&self) -> f64 {
        self.interpolation_time
    }

    /// Number of buffered snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// `true` if no snapshots are buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl<S: Snapshot> SnapshotInterpolator<S> {
    /// Admits a snapshot per the ordered-buffer rules (see
    /// [`OrderedBuffer::insert_if_new_enough`]). Returns `true` if it was
    /// kept.
    pub fn insert(&mut self, snapshot: S) -> bool {
        self.buffer.insert_if_new_enough(snapshot)
    }

    /// Advances the cursor one tick and returns an interpolated snapshot
    /// if the buffer is ready. See [`compute`] for the full contract.
    pub fn step(&mut self, local_time: f64, delta_time: f64) -> Option<S> {
        compute(
            local_time,
            delta_time,
            &mut self.interpolation_time,
            self.buffer_time,
            &mut self.buffer,
            self.catchup,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq)]
    struct Value {
        remote: f64,
        local: f64,
        value: f64,
    }

    impl Snapshot for Value {
        fn remote_timestamp(&self) -> f64 {
            self.remote
        }

        fn local_timestamp(&self) -> f64 {
            self.local
        }

        fn interpolate(&self, to: &Self, t: f64) -> Self {
            Self {
                remote: self.remote,
                local: self.local,
                value: self.value + (to.value - self.value) * t,
            }
        }
    }

    fn v(remote: f64, local: f64, value: f64) -> Value {
        Value { remote, local, value }
    }

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn underfull_buffer_returns_none() {
        let mut buf = OrderedBuffer::new();
        buf.insert_if_new_enough(v(0.0, 0.0, 1.0));
        let mut cursor = 0.0;
        let result = compute(1.0, 0.5, &mut cursor, 2.0, &mut buf, CatchUpConfig::DISABLED);
        assert!(result.is_none());
        assert_eq!(cursor, 0.0);
    }

    #[test]
    fn warming_gate_blocks_before_buffer_time_elapses() {
        // S4: second snapshot's local timestamp hasn't aged past buffer_time.
        let mut buf = OrderedBuffer::new();
        buf.insert_if_new_enough(v(0.1, 0.1, 1.0));
        buf.insert_if_new_enough(v(0.9, 1.1, 2.0));

        let mut cursor = 0.0;
        let result = compute(3.0, 0.5, &mut cursor, 2.0, &mut buf, CatchUpConfig::DISABLED);

        assert!(result.is_none());
        assert_eq!(cursor, 0.0);
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn basic_interpolate() {
        // S5
        let mut buf = OrderedBuffer::new();
        buf.insert_if_new_enough(v(0.0, 0.0, 1.0));
        buf.insert_if_new_enough(v(2.0, 2.0, 2.0));

        let mut cursor = 0.0;
        let result = compute(4.0, 1.5, &mut cursor, 2.0, &mut buf, CatchUpConfig::DISABLED).unwrap();

        assert!(approx_eq(cursor, 1.5));
        assert_eq!(buf.len(), 2);
        assert!(approx_eq(result.value, 1.75));
    }

    #[test]
    fn catchup_accelerates_cursor() {
        // S6
        let mut buf = OrderedBuffer::new();
        buf.insert_if_new_enough(v(0.0, 0.0, 1.0));
        buf.insert_if_new_enough(v(1.0, 1.0, 2.0));
        buf.insert_if_new_enough(v(2.0, 2.0, 3.0));
        buf.insert_if_new_enough(v(3.0, 3.0, 4.0));

        let mut cursor = 0.0;
        let catchup = CatchUpConfig::new(2, 0.25);
        let result = compute(3.0, 0.5, &mut cursor, 2.0, &mut buf, catchup).unwrap();

        assert!(approx_eq(cursor, 0.75));
        assert_eq!(buf.len(), 4);
        assert!(approx_eq(result.value, 1.75));
    }

    #[test]
    fn overshoot_clamps_without_extrapolating() {
        // S7
        let mut buf = OrderedBuffer::new();
        buf.insert_if_new_enough(v(0.0, 0.0, 1.0));
        buf.insert_if_new_enough(v(1.0, 1.0, 2.0));

        let mut cursor = 1.0;
        let result = compute(3.0, 0.5, &mut cursor, 2.0, &mut buf, CatchUpConfig::DISABLED).unwrap();

        assert!(approx_eq(cursor, 1.5));
        assert_eq!(buf.len(), 2);
        assert!(approx_eq(result.value, 2.0));
    }

    #[test]
    fn overshoot_traverses_into_newly_available_segment() {
        // S8
        let mut buf = OrderedBuffer::new();
        buf.insert_if_new_enough(v(0.0, 0.0, 1.0));
        buf.insert_if_new_enough(v(1.0, 1.0, 2.0));
        buf.insert_if_new_enough(v(3.0, 3.0, 4.0));

        let mut cursor = 1.0;
        let result = compute(3.0, 0.5, &mut cursor, 2.0, &mut buf, CatchUpConfig::DISABLED).unwrap();

        assert!(approx_eq(cursor, 0.5));
        assert_eq!(buf.len(), 2);
        assert!(approx_eq(result.value, 2.5));
    }

    #[test]
    fn double_overshoot_traverses_two_segments() {
        // S9
        let mut buf = OrderedBuffer::new();
        buf.insert_if_new_enough(v(0.0, 0.0, 1.0));
        buf.insert_if_new_enough(v(1.0, 1.0, 2.0));
        buf.insert_if_new_enough(v(3.0, 3.0, 4.0));
        buf.insert_if_new_enough(v(5.0, 5.0, 6.0));

        let mut cursor = 1.0;
        let result = compute(5.0, 2.5, &mut cursor, 2.0, &mut buf, CatchUpConfig::DISABLED).unwrap();

        assert!(approx_eq(cursor, 0.5));
        assert_eq!(buf.len(), 2);
        assert!(approx_eq(result.value, 4.5));
    }

    #[test]
    fn zero_delta_is_idempotent() {
        // Invariant 5: with delta_time == 0, consecutive calls produce
        // identical output and cursor.
        let mut buf = OrderedBuffer::new();
        buf.insert_if_new_enough(v(0.0, 0.0, 1.0));
        buf.insert_if_new_enough(v(2.0, 2.0, 2.0));

        let mut cursor = 0.5;
        let first = compute(4.0, 0.0, &mut cursor, 2.0, &mut buf, CatchUpConfig::DISABLED).unwrap();
        let cursor_after_first = cursor;
        let second = compute(4.0, 0.0, &mut cursor, 2.0, &mut buf, CatchUpConfig::DISABLED).unwrap();

        assert_eq!(cursor_after_first, cursor);
        assert!(approx_eq(first.value, second.value));
    }

    #[test]
    fn catchup_threshold_max_disables_catchup_even_with_nonzero_multiplier() {
        let mut buf = OrderedBuffer::new();
        for i in 0..10 {
            let t = f64::from(i);
            buf.insert_if_new_enough(v(t, t, t));
        }

        let mut cursor = 0.0;
        let catchup = CatchUpConfig::new(u32::MAX, 0.5);
        compute(0.5, 0.5, &mut cursor, 0.0, &mut buf, catchup).unwrap();

        assert!(approx_eq(cursor, 0.5));
    }
}
