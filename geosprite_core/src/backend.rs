// Copyright 2026 the Geosprite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Placement backend contract.
//!
//! A *placement backend* turns one frame's render targets into depth-sorted
//! [`PreparedItem`]s. Geosprite ships two:
//!
//! - [`ReferenceBackend`]: sequential, defined directly in terms of the
//!   [`placement`](crate::placement) and [`depth`](crate::depth) functions.
//! - `geosprite_accel::ParallelBackend`: splits the targets across worker
//!   threads and must agree with the reference within a fixed tolerance.
//!
//! # Frame loop pseudocode
//!
//! The [`FrameCompositor`](crate::compositor::FrameCompositor) drives a
//! backend like this:
//!
//! ```rust,ignore
//! let changes = store.advance(now_ms);
//! if changes.topology_changed {
//!     targets.rebuild(store.frame_view(), resources);
//! }
//! cache.clear();
//! backend.prepare(&request, &mut cache, &mut output);
//! ```

use alloc::vec::Vec;

use crate::camera::CameraState;
use crate::depth::compare_frame_order;
use crate::placement::{CenterCache, FrameParams, ImageResolver, PreparedItem, SkipReason};
use crate::projection::Projector;
use crate::resource::ResourceCatalog;
use crate::sprite::{ImageKey, SpriteFrameView};
use crate::targets::RenderTarget;

/// Everything a backend reads for one frame.
#[derive(Clone, Copy)]
pub struct PlacementRequest<'a> {
    /// Sprite arrays.
    pub sprites: SpriteFrameView<'a>,
    /// Render targets in pre-sort order.
    pub targets: &'a [RenderTarget],
    /// Resource lookup.
    pub resources: &'a dyn ResourceCatalog,
    /// Camera snapshot.
    pub camera: &'a CameraState,
    /// Per-frame scalars.
    pub params: FrameParams,
}

impl core::fmt::Debug for PlacementRequest<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PlacementRequest")
            .field("targets", &self.targets.len())
            .field("camera", self.camera)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// A target that produced no item this frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SkippedItem {
    /// Sprite slot.
    pub sprite: u32,
    /// Image key.
    pub key: ImageKey,
    /// Why it was skipped.
    pub reason: SkipReason,
}

/// Backend output buffers, reused across frames.
#[derive(Clone, Debug, Default)]
pub struct PlacementOutput {
    /// Items in frame order (sub-layer, then draw order).
    pub items: Vec<PreparedItem>,
    /// Skipped targets, in target order.
    pub skipped: Vec<SkippedItem>,
}

impl PlacementOutput {
    /// Clears both buffers.
    pub fn clear(&mut self) {
        self.items.clear();
        self.skipped.clear();
    }
}

/// Prepares and orders the items of one frame.
pub trait PlacementBackend {
    /// Fills `out` with the frame's items sorted by
    /// [`compare_frame_order`] and the skipped targets.
    ///
    /// `cache` has been cleared by the caller. Implementations must produce
    /// the same items as [`ReferenceBackend`] for the same request.
    fn prepare(
        &mut self,
        request: &PlacementRequest<'_>,
        cache: &mut CenterCache,
        out: &mut PlacementOutput,
    );
}

/// Sequential reference backend.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReferenceBackend;

impl PlacementBackend for ReferenceBackend {
    fn prepare(
        &mut self,
        request: &PlacementRequest<'_>,
        cache: &mut CenterCache,
        out: &mut PlacementOutput,
    ) {
        out.clear();
        let projection = Projector::new(*request.camera);
        let mut resolver = ImageResolver::new(
            &projection,
            request.sprites,
            request.resources,
            request.params,
            cache,
        );
        for target in request.targets {
            match resolver.prepare(target) {
                Ok(item) => out.items.push(item),
                Err(reason) => out.skipped.push(SkippedItem {
                    sprite: target.sprite,
                    key: target.key,
                    reason,
                }),
            }
        }
        out.items.sort_by(compare_frame_order);
    }
}
