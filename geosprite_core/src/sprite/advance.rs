// Copyright 2026 the Geosprite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-frame animation advance and change collection.
//!
//! [`SpriteStore::advance`] steps every in-flight tween to the frame
//! timestamp, then drains the dirty channels:
//!
//! 1. **LOCATION**: sprites whose location was commanded or moved.
//! 2. **IMAGE**: sprites with image state changes.
//! 3. **TOPOLOGY**: drained to decide whether render targets must be
//!    rebuilt.
//!
//! Like the store's other change reports, [`SpriteChanges`] carries raw slot
//! indices so consumers can use the `*_at()` accessors directly.

use alloc::vec::Vec;

use crate::dirty;

use super::store::SpriteStore;

/// The set of changes produced by a single [`SpriteStore::advance`] call.
///
/// The compositor acts on the two flags. The slot lists are for host code
/// that keeps its own per-sprite state in step with the store.
#[derive(Clone, Debug, Default)]
pub struct SpriteChanges {
    /// Sprites whose location changed.
    pub moved: Vec<u32>,
    /// Sprites with changed image state.
    pub images: Vec<u32>,
    /// Sprites added since the last advance.
    pub added: Vec<u32>,
    /// Sprites removed since the last advance.
    pub removed: Vec<u32>,
    /// Whether the drawable image set may have changed.
    pub topology_changed: bool,
    /// Whether any tween is still in flight.
    pub animating: bool,
}

impl SpriteChanges {
    /// Clears all change lists.
    pub fn clear(&mut self) {
        self.moved.clear();
        self.images.clear();
        self.added.clear();
        self.removed.clear();
        self.topology_changed = false;
        self.animating = false;
    }
}

impl<T> SpriteStore<T> {
    /// Advances all tweens to `now_ms` and returns the set of changes since
    /// the previous call.
    pub fn advance(&mut self, now_ms: f64) -> SpriteChanges {
        let mut changes = SpriteChanges::default();
        self.advance_into(now_ms, &mut changes);
        changes
    }

    /// Like [`advance`](Self::advance), but reuses a caller-provided buffer
    /// to avoid allocation.
    pub fn advance_into(&mut self, now_ms: f64, changes: &mut SpriteChanges) {
        changes.clear();

        let active: Vec<u32> = self.animating.iter().copied().collect();
        for idx in active {
            let i = idx as usize;
            if self.location[i].advance(now_ms) {
                self.dirty.mark(idx, dirty::LOCATION);
            }
            let mut images_changed = false;
            let mut visibility_changed = false;
            let mut still_animating = self.location[i].is_animating();
            for image in self.images[i].values_mut() {
                let was_visible = image.is_visible_class();
                images_changed |= image.advance(now_ms);
                visibility_changed |= image.is_visible_class() != was_visible;
                still_animating |= image.is_animating();
            }
            if images_changed {
                self.dirty.mark(idx, dirty::IMAGE);
            }
            if visibility_changed {
                self.mark_topology(idx);
            }
            if !still_animating {
                self.animating.remove(&idx);
            }
        }

        changes.moved = self
            .dirty
            .drain(dirty::LOCATION)
            .deterministic()
            .run()
            .collect();
        changes.images = self
            .dirty
            .drain(dirty::IMAGE)
            .deterministic()
            .run()
            .collect();
        let topology: Vec<u32> = self
            .dirty
            .drain(dirty::TOPOLOGY)
            .deterministic()
            .run()
            .collect();
        changes.topology_changed = !topology.is_empty();

        // Move lifecycle lists.
        core::mem::swap(&mut self.pending_added, &mut changes.added);
        core::mem::swap(&mut self.pending_removed, &mut changes.removed);

        changes.animating = !self.animating.is_empty();
    }

    /// Whether any tween is in flight.
    #[must_use]
    pub fn is_animating(&self) -> bool {
        !self.animating.is_empty()
    }
}
