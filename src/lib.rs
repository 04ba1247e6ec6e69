//! # Snapshot Interpolation Core
//!
//! Buffer admission and temporal interpolation for a networked transform
//! sync system. A remote peer emits timestamped state samples at an
//! irregular cadence over a lossy, jitter-prone channel; this crate
//! reconstructs a smooth, monotonically advancing stream of interpolated
//! states suitable for display.
//!
//! ## Architecture
//!
//! ```text
//! producer -> insert_if_new_enough -> OrderedBuffer -> compute -> consumer
//! ```
//!
//! Two collaborating pieces do the work:
//!
//! - [`buffer::OrderedBuffer`] keeps admitted snapshots sorted by remote
//!   timestamp, rejecting anything that would disturb the two snapshots
//!   currently serving as the active interpolation segment.
//! - [`engine::compute`] runs once per local tick: it advances an
//!   interpolation cursor, consumes buffer entries as the cursor crosses
//!   them, and returns an interpolated snapshot (or nothing, if the buffer
//!   isn't ready yet).
//!
//! [`engine::SnapshotInterpolator`] bundles both into a single owned type
//! for the common case of one producer stream per consumer.
//!
//! ## Out of scope
//!
//! Wire encoding/decoding, clock synchronization between peers, and
//! applying a produced snapshot to a scene or object are all the caller's
//! responsibility. This crate never extrapolates past the newest buffered
//! sample, never reorders the output stream, and assumes a single producer.
//!
//! ## Concurrency
//!
//! Nothing here blocks or allocates unboundedly, and nothing is
//! internally synchronized. [`buffer::OrderedBuffer::insert_if_new_enough`]
//! and [`engine::compute`] are meant to be called from a single serial tick
//! loop; if admission happens on a separate thread (e.g. a network receive
//! thread), the caller must provide external mutual exclusion.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod buffer;
pub mod engine;
pub mod snapshot;

pub use buffer::OrderedBuffer;
pub use engine::{compute, CatchUpConfig, SnapshotInterpolator};
pub use snapshot::Snapshot;
