// Copyright 2026 the Geosprite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sprite and image identity types.

use core::fmt;

/// Sentinel value indicating "no sprite" or "no target" in index fields.
pub const INVALID: u32 = u32::MAX;

/// A handle to a sprite in a [`SpriteStore`](super::SpriteStore).
///
/// Contains both a slot index and a generation counter so that stale handles
/// can be detected after a sprite is removed and the slot is reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpriteHandle {
    /// Slot index into the store's arrays.
    pub(crate) idx: u32,
    /// Generation counter, must match the store's generation for this slot.
    pub(crate) generation: u32,
}

impl SpriteHandle {
    /// Returns the raw slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for SpriteHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SpriteHandle({}@gen{})", self.idx, self.generation)
    }
}

/// Slot of an image within its sprite.
///
/// Images draw in ascending `sub_layer`; within a sub-layer, `order` breaks
/// depth ties. Ordering of keys is `(sub_layer, order)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImageKey {
    /// Draw group.
    pub sub_layer: i32,
    /// Tie-break order within the group.
    pub order: i32,
}

impl ImageKey {
    /// Creates a key.
    #[inline]
    #[must_use]
    pub const fn new(sub_layer: i32, order: i32) -> Self {
        Self { sub_layer, order }
    }
}

impl fmt::Display for ImageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.sub_layer, self.order)
    }
}
