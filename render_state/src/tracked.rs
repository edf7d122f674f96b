//! Values stamped with a global change counter.
//!
//! A [Tracked] value records when it was last written rather than what was written,
//! so a consumer can decide whether to re-upload it by comparing a single integer.

use std::sync::atomic::{AtomicU64, Ordering};

static CHANGE_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_stamp() -> u64 {
    CHANGE_COUNTER.fetch_add(1, Ordering::Relaxed) + 1
}

/// A value together with the stamp of its most recent [Tracked::set].
///
/// The default value has stamp 0, which is never handed out by `set`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Tracked<T> {
    value: T,
    stamp: u64,
}

impl<T: Copy> Tracked<T> {
    /// Stores `value` under a fresh stamp.
    ///
    /// The stamp advances even if `value` equals the stored value, so every `set` is
    /// seen as a change by [Tracked::update].
    pub fn set(&mut self, value: T) {
        self.value = value;
        self.stamp = next_stamp();
    }

    /// Copies `source` into `self` if its stamp differs, returning whether it did.
    pub fn update(&mut self, source: &Self) -> bool {
        if self.stamp != source.stamp {
            *self = *source;
            true
        } else {
            false
        }
    }

    #[allow(missing_docs)]
    pub fn value(&self) -> T {
        self.value
    }

    #[allow(missing_docs)]
    pub fn stamp(&self) -> u64 {
        self.stamp
    }
}

/// A tracked 3-vector.
pub type StateVec3 = Tracked<[f32; 3]>;

impl StateVec3 {
    /// Stores a world-space position with Y and Z swapped, which is the layout the
    /// shaders read.
    pub fn set_xyz(&mut self, x: f32, y: f32, z: f32) {
        self.set([x, z, y]);
    }
}
