// Copyright 2026 the Geosprite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Flattened render targets.
//!
//! [`RenderTargets`] is the flat list of `(sprite, image)` pairs a frame may
//! draw. It only changes with topology (sprites or images added or removed,
//! enable toggles, images crossing zero opacity, resource catalog changes),
//! so the compositor rebuilds it on those frames and reuses it otherwise.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::ops::Range;

use crate::resource::ResourceCatalog;
use crate::sprite::{INVALID, ImageKey, SpriteFrameView};

/// One drawable image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RenderTarget {
    /// Sprite slot.
    pub sprite: u32,
    /// Image key.
    pub key: ImageKey,
    /// Index of the origin image's target in the same list, or [`INVALID`].
    ///
    /// Placement follows origins through the store and does not read this.
    /// It lets draw-list consumers, such as hit testing or leader-line
    /// picking, jump from an image to its origin without a lookup.
    pub origin_index: u32,
}

/// Contiguous run of targets sharing a sub-layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubLayerRange {
    /// Sub-layer of every target in the run.
    pub sub_layer: i32,
    /// Index range.
    pub range: Range<usize>,
}

/// Groups an already sub-layer-sorted sequence into [`SubLayerRange`]s.
pub fn sub_layer_ranges(sub_layers: impl IntoIterator<Item = i32>) -> Vec<SubLayerRange> {
    let mut ranges: Vec<SubLayerRange> = Vec::new();
    for (i, sub_layer) in sub_layers.into_iter().enumerate() {
        match ranges.last_mut() {
            Some(last) if last.sub_layer == sub_layer => last.range.end = i + 1,
            _ => ranges.push(SubLayerRange {
                sub_layer,
                range: i..i + 1,
            }),
        }
    }
    ranges
}

/// The render target list of a layer.
#[derive(Clone, Debug, Default)]
pub struct RenderTargets {
    targets: Vec<RenderTarget>,
    sub_layers: Vec<SubLayerRange>,
    rebuilds: u64,
}

impl RenderTargets {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the list from the current sprites.
    ///
    /// Keeps images of enabled sprites that are visible or fading and whose
    /// resource is registered, sorted by `(sub_layer, order, resource id,
    /// sprite id)`.
    pub fn rebuild(&mut self, sprites: SpriteFrameView<'_>, resources: &dyn ResourceCatalog) {
        let mut entries = Vec::new();
        for sprite in 0..sprites.slot_count() {
            if !sprites.is_enabled(sprite) {
                continue;
            }
            for (&key, image) in sprites.images_at(sprite) {
                if !image.is_visible_class() || resources.resource(&image.resource).is_none() {
                    continue;
                }
                entries.push((sprite, key, image));
            }
        }
        entries.sort_by(|a, b| {
            a.1.sub_layer
                .cmp(&b.1.sub_layer)
                .then_with(|| a.1.order.cmp(&b.1.order))
                .then_with(|| a.2.resource.cmp(&b.2.resource))
                .then_with(|| sprites.id_at(a.0).cmp(sprites.id_at(b.0)))
        });

        #[expect(
            clippy::cast_possible_truncation,
            reason = "target count is bounded by sprite slots times images, far below u32::MAX"
        )]
        let positions: BTreeMap<(u32, ImageKey), u32> = entries
            .iter()
            .enumerate()
            .map(|(i, &(sprite, key, _))| ((sprite, key), i as u32))
            .collect();

        self.targets.clear();
        self.targets
            .extend(entries.iter().map(|&(sprite, key, image)| {
                let origin_index = image
                    .origin
                    .filter(|origin| origin.key != key)
                    .and_then(|origin| positions.get(&(sprite, origin.key)).copied())
                    .unwrap_or(INVALID);
                RenderTarget {
                    sprite,
                    key,
                    origin_index,
                }
            }));
        self.sub_layers = sub_layer_ranges(self.targets.iter().map(|t| t.key.sub_layer));
        self.rebuilds += 1;
    }

    /// All targets in pre-sort order.
    #[must_use]
    pub fn as_slice(&self) -> &[RenderTarget] {
        &self.targets
    }

    /// Sub-layer runs over [`as_slice`](Self::as_slice).
    #[must_use]
    pub fn sub_layers(&self) -> &[SubLayerRange] {
        &self.sub_layers
    }

    /// Number of targets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether there are no targets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// How many times the list has been rebuilt.
    #[must_use]
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }
}
