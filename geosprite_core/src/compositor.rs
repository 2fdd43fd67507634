// Copyright 2026 the Geosprite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame compositor.
//!
//! [`FrameCompositor`] owns everything that lives across frames but is not
//! sprite state: the render targets, the center cache, the placement backend
//! and its output buffers. One [`compose`](FrameCompositor::compose) call
//! produces one [`PreparedFrame`]:
//!
//! 1. Advance every running tween to the frame timestamp.
//! 2. Rebuild the render targets if the topology or the resource catalog
//!    changed.
//! 3. Clear the center cache.
//! 4. Let the backend place and depth-sort every target.

use alloc::vec::Vec;
use core::mem;

use crate::backend::{
    PlacementBackend, PlacementOutput, PlacementRequest, ReferenceBackend, SkippedItem,
};
use crate::camera::CameraState;
use crate::config::SpriteLayerConfig;
use crate::placement::{CenterCache, FrameParams, PreparedItem, SkipCounts, SkipReason};
use crate::resource::ResourceCatalog;
use crate::sprite::{SpriteChanges, SpriteStore};
use crate::targets::{RenderTargets, SubLayerRange, sub_layer_ranges};
#[cfg(feature = "trace-rich")]
use crate::trace::ItemSkippedEvent;
use crate::trace::{FrameBeginEvent, FrameSummary, TopologyRebuildEvent, Tracer};

/// Result of one compose call.
#[derive(Clone, Debug, Default)]
pub struct PreparedFrame {
    /// Frame counter, starting at zero.
    pub frame_index: u64,
    /// Items in draw order: ascending sub-layer, back-to-front within each.
    pub items: Vec<PreparedItem>,
    /// Sub-layer runs over `items`.
    pub sub_layers: Vec<SubLayerRange>,
    /// Skips by reason.
    pub skipped: SkipCounts,
    /// Whether the render targets were rebuilt.
    pub topology_changed: bool,
    /// Whether any tween is still running. When `false`, nothing changes
    /// until the next mutation or camera move.
    pub animating: bool,
}

/// Per-layer compose driver.
#[derive(Debug)]
pub struct FrameCompositor<B = ReferenceBackend> {
    backend: B,
    config: SpriteLayerConfig,
    targets: RenderTargets,
    cache: CenterCache,
    changes: SpriteChanges,
    output: PlacementOutput,
    frame_index: u64,
    resource_revision: Option<u64>,
}

impl Default for FrameCompositor {
    fn default() -> Self {
        Self::new(SpriteLayerConfig::default())
    }
}

impl FrameCompositor {
    /// Creates a compositor using the [`ReferenceBackend`].
    #[must_use]
    pub fn new(config: SpriteLayerConfig) -> Self {
        Self::with_backend(ReferenceBackend, config)
    }
}

impl<B: PlacementBackend> FrameCompositor<B> {
    /// Creates a compositor with a custom backend.
    #[must_use]
    pub fn with_backend(backend: B, config: SpriteLayerConfig) -> Self {
        Self {
            backend,
            config,
            targets: RenderTargets::new(),
            cache: CenterCache::new(),
            changes: SpriteChanges::default(),
            output: PlacementOutput::default(),
            frame_index: 0,
            resource_revision: None,
        }
    }

    /// Layer configuration.
    #[must_use]
    pub fn config(&self) -> &SpriteLayerConfig {
        &self.config
    }

    /// Replaces the layer configuration. Takes effect on the next frame.
    pub fn set_config(&mut self, config: SpriteLayerConfig) {
        self.config = config;
    }

    /// The backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Current render targets.
    #[must_use]
    pub fn targets(&self) -> &RenderTargets {
        &self.targets
    }

    /// Center cache as left by the last frame.
    #[must_use]
    pub fn cache(&self) -> &CenterCache {
        &self.cache
    }

    /// Changes drained by the last frame.
    ///
    /// The frame loop itself only reads the topology and animating flags.
    /// The slot lists are for host-side indices kept alongside the layer,
    /// such as a hit-test grid that refreshes only moved or added sprites.
    #[must_use]
    pub fn last_changes(&self) -> &SpriteChanges {
        &self.changes
    }

    /// Skipped targets of the last frame, in target order.
    #[must_use]
    pub fn last_skipped(&self) -> &[SkippedItem] {
        &self.output.skipped
    }

    /// Composes one frame.
    pub fn compose<T>(
        &mut self,
        store: &mut SpriteStore<T>,
        resources: &dyn ResourceCatalog,
        camera: &CameraState,
        now_ms: f64,
        tracer: &mut Tracer<'_>,
    ) -> PreparedFrame {
        let frame_index = self.frame_index;
        self.frame_index += 1;
        tracer.frame_begin(&FrameBeginEvent {
            frame_index,
            now_ms,
            sprite_count: store.len(),
        });

        store.advance_into(now_ms, &mut self.changes);

        let revision = resources.revision();
        let topology_changed =
            self.changes.topology_changed || self.resource_revision != Some(revision);
        if topology_changed {
            self.targets.rebuild(store.frame_view(), resources);
            self.resource_revision = Some(revision);
            tracer.topology_rebuild(&TopologyRebuildEvent {
                frame_index,
                target_count: self.targets.len(),
                sub_layer_count: self.targets.sub_layers().len(),
                resource_revision: revision,
            });
        }

        self.cache.clear();
        if camera.is_valid() {
            let request = PlacementRequest {
                sprites: store.frame_view(),
                targets: self.targets.as_slice(),
                resources,
                camera,
                params: FrameParams::new(camera.zoom, &self.config),
            };
            self.backend
                .prepare(&request, &mut self.cache, &mut self.output);
        } else {
            self.output.clear();
            self.output
                .skipped
                .extend(self.targets.as_slice().iter().map(|target| SkippedItem {
                    sprite: target.sprite,
                    key: target.key,
                    reason: SkipReason::ProjectionFailed,
                }));
        }

        let mut skipped = SkipCounts::default();
        for item in &self.output.skipped {
            skipped.record(item.reason);
            #[cfg(feature = "trace-rich")]
            tracer.item_skipped(&ItemSkippedEvent {
                frame_index,
                sprite: item.sprite,
                key: item.key,
                reason: item.reason,
            });
        }

        let items = mem::take(&mut self.output.items);
        let sub_layers = sub_layer_ranges(items.iter().map(|item| item.key.sub_layer));
        let animating = self.changes.animating;
        tracer.frame_summary(&FrameSummary {
            frame_index,
            item_count: items.len(),
            target_count: self.targets.len(),
            skipped,
            topology_changed,
            animating,
        });

        PreparedFrame {
            frame_index,
            items,
            sub_layers,
            skipped,
            topology_changed,
            animating,
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use kurbo::Size;

    use super::*;
    use crate::camera::MapView;
    use crate::geo::LngLat;
    use crate::interpolation::InterpolationOptions;
    use crate::resource::{ResourceInfo, ResourceTable};
    use crate::sprite::{ImageInit, ImageKey, RenderMode, SpriteInit, SpriteUpdate};

    const TOKYO: LngLat = LngLat::new(139.7, 35.6);

    fn camera() -> CameraState {
        MapView::new(TOKYO, 16.0, Size::new(800.0, 600.0))
            .with_pitch(45.0)
            .camera_state()
    }

    fn resources() -> ResourceTable {
        let mut table = ResourceTable::new();
        table.register("pin", ResourceInfo::ready(32, 32));
        table.register("shadow", ResourceInfo::ready(64, 64));
        table
    }

    fn compose(
        compositor: &mut FrameCompositor,
        store: &mut SpriteStore,
        table: &ResourceTable,
        now_ms: f64,
    ) -> PreparedFrame {
        compositor.compose(store, table, &camera(), now_ms, &mut Tracer::none())
    }

    #[test]
    fn coincident_sprites_sort_by_id_either_way() {
        let table = resources();
        for ids in [["A", "B"], ["B", "A"]] {
            let mut store: SpriteStore = SpriteStore::new();
            for id in ids {
                store
                    .add_sprite(
                        id,
                        SpriteInit::new(TOKYO).with_image(ImageKey::new(0, 0), ImageInit::new("pin")),
                    )
                    .unwrap();
            }
            let mut compositor = FrameCompositor::default();
            let frame = compose(&mut compositor, &mut store, &table, 0.0);
            let order: Vec<&str> = frame.items.iter().map(|i| &*i.sprite_id).collect();
            assert_eq!(order, ["A", "B"]);
        }
    }

    #[test]
    fn surfaces_draw_below_higher_sub_layers() {
        let table = resources();
        let mut store: SpriteStore = SpriteStore::new();
        store
            .add_sprite(
                "a",
                SpriteInit::new(TOKYO)
                    .with_image(ImageKey::new(1, 0), ImageInit::new("pin"))
                    .with_image(
                        ImageKey::new(0, 0),
                        ImageInit::new("shadow").with_mode(RenderMode::Surface),
                    ),
            )
            .unwrap();
        let mut compositor = FrameCompositor::default();
        let frame = compose(&mut compositor, &mut store, &table, 0.0);
        assert_eq!(frame.items.len(), 2);
        assert_eq!(frame.items[0].mode, RenderMode::Surface);
        assert_eq!(frame.sub_layers.len(), 2);
        assert_eq!(frame.sub_layers[1].range, 1..2);
        assert!(frame.topology_changed);
    }

    #[test]
    fn targets_rebuild_only_on_topology_or_resources() {
        let mut table = resources();
        let mut store: SpriteStore = SpriteStore::new();
        store
            .add_sprite(
                "a",
                SpriteInit::new(TOKYO).with_image(ImageKey::new(0, 0), ImageInit::new("late")),
            )
            .unwrap();
        let mut compositor = FrameCompositor::default();

        let frame = compose(&mut compositor, &mut store, &table, 0.0);
        assert!(frame.items.is_empty());
        assert_eq!(compositor.targets().rebuild_count(), 1);

        let frame = compose(&mut compositor, &mut store, &table, 16.0);
        assert!(!frame.topology_changed);
        assert_eq!(compositor.targets().rebuild_count(), 1);

        table.register("late", ResourceInfo::ready(16, 16));
        let frame = compose(&mut compositor, &mut store, &table, 32.0);
        assert!(frame.topology_changed);
        assert_eq!(frame.items.len(), 1);
        assert_eq!(compositor.targets().rebuild_count(), 2);
    }

    #[test]
    fn animating_flag_follows_tweens() {
        let table = resources();
        let mut store: SpriteStore = SpriteStore::new();
        store
            .add_sprite(
                "a",
                SpriteInit::new(TOKYO)
                    .with_interpolation(InterpolationOptions::feedback(100.0))
                    .with_image(ImageKey::new(0, 0), ImageInit::new("pin")),
            )
            .unwrap();
        let mut compositor = FrameCompositor::default();
        assert!(!compose(&mut compositor, &mut store, &table, 0.0).animating);

        store
            .update_sprite("a", SpriteUpdate::location(LngLat::new(139.701, 35.6)))
            .unwrap();
        let first = compose(&mut compositor, &mut store, &table, 10.0);
        assert!(first.animating);
        let middle = compose(&mut compositor, &mut store, &table, 60.0);
        assert!(middle.items[0].center.x > first.items[0].center.x);
        let last = compose(&mut compositor, &mut store, &table, 110.0);
        assert!(!last.animating);
        assert_eq!(last.frame_index, 3);
    }

    #[test]
    fn hosts_can_follow_changes_and_origins() {
        let table = resources();
        let mut store: SpriteStore = SpriteStore::new();
        store
            .add_sprite(
                "a",
                SpriteInit::new(TOKYO)
                    .with_image(ImageKey::new(1, 0), ImageInit::new("pin"))
                    .with_image(
                        ImageKey::new(1, 1),
                        ImageInit::new("pin").with_origin(ImageKey::new(1, 0), true),
                    ),
            )
            .unwrap();
        let mut compositor = FrameCompositor::default();
        compose(&mut compositor, &mut store, &table, 0.0);
        assert_eq!(compositor.last_changes().added, &[0]);

        let targets = compositor.targets().as_slice();
        let child = targets
            .iter()
            .find(|t| t.key == ImageKey::new(1, 1))
            .unwrap();
        assert_eq!(targets[child.origin_index as usize].key, ImageKey::new(1, 0));

        store
            .update_sprite("a", SpriteUpdate::location(LngLat::new(139.701, 35.6)))
            .unwrap();
        compose(&mut compositor, &mut store, &table, 16.0);
        assert_eq!(compositor.last_changes().moved, &[0]);
        assert!(compositor.last_changes().added.is_empty());
    }

    #[test]
    fn invalid_camera_skips_everything() {
        let table = resources();
        let mut store: SpriteStore = SpriteStore::new();
        store
            .add_sprite(
                "a",
                SpriteInit::new(TOKYO).with_image(ImageKey::new(0, 0), ImageInit::new("pin")),
            )
            .unwrap();
        let mut compositor = FrameCompositor::default();
        let mut broken = camera();
        broken.viewport = Size::ZERO;
        let frame = compositor.compose(&mut store, &table, &broken, 0.0, &mut Tracer::none());
        assert!(frame.items.is_empty());
        assert_eq!(frame.skipped.projection_failed, 1);
        assert_eq!(compositor.last_skipped()[0].reason, SkipReason::ProjectionFailed);
    }
}
