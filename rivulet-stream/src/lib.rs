// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stream state reconstruction for rivulet document streams.
//!
//! The current document value is never stored; it is recomputed on every
//! read by replaying the stream's commit list with [`Replay`] or
//! [`reconstruct`].

mod replay;

pub use replay::{Replay, ReplayError, Step, looks_like_patch, reconstruct};
