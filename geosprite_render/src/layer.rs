// Copyright 2026 the Geosprite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sprite layer: store, compositor and plan wired together.

use geosprite_core::backend::{PlacementBackend, ReferenceBackend};
use geosprite_core::camera::CameraState;
use geosprite_core::compositor::{FrameCompositor, PreparedFrame};
use geosprite_core::config::SpriteLayerConfig;
use geosprite_core::resource::ResourceCatalog;
use geosprite_core::sprite::SpriteStore;
use geosprite_core::trace::Tracer;

use crate::plan::RenderPlan;

/// Draws a [`RenderPlan`].
///
/// GPU renderers upload [`RenderPlan::write_vertices`] output and issue one
/// draw per item; test doubles record the plan.
pub trait Rasterizer {
    /// Draws every item of `plan` in order.
    fn draw(&mut self, plan: &RenderPlan);
}

/// A map layer of sprites.
///
/// Owns the [`SpriteStore`] (mutated by the host between frames) and the
/// [`FrameCompositor`]. Each [`render`](Self::render) call composes one frame
/// and hands the resulting plan to a [`Rasterizer`].
#[derive(Debug)]
pub struct SpriteLayer<T = (), B = ReferenceBackend> {
    store: SpriteStore<T>,
    compositor: FrameCompositor<B>,
    plan: RenderPlan,
}

impl<T> SpriteLayer<T> {
    /// Creates an empty layer using the reference backend.
    #[must_use]
    pub fn new(config: SpriteLayerConfig) -> Self {
        Self::with_backend(ReferenceBackend, config)
    }
}

impl<T, B: PlacementBackend> SpriteLayer<T, B> {
    /// Creates an empty layer with a custom placement backend.
    #[must_use]
    pub fn with_backend(backend: B, config: SpriteLayerConfig) -> Self {
        let mut store = SpriteStore::new();
        store.set_auto_rotation_min_distance(config.auto_rotation_min_distance_meters);
        Self {
            store,
            compositor: FrameCompositor::with_backend(backend, config),
            plan: RenderPlan::new(),
        }
    }

    /// The sprites.
    #[must_use]
    pub fn store(&self) -> &SpriteStore<T> {
        &self.store
    }

    /// The sprites, for mutation between frames.
    pub fn store_mut(&mut self) -> &mut SpriteStore<T> {
        &mut self.store
    }

    /// The compositor.
    #[must_use]
    pub fn compositor(&self) -> &FrameCompositor<B> {
        &self.compositor
    }

    /// Layer configuration.
    #[must_use]
    pub fn config(&self) -> &SpriteLayerConfig {
        self.compositor.config()
    }

    /// Replaces the layer configuration.
    pub fn set_config(&mut self, config: SpriteLayerConfig) {
        self.store
            .set_auto_rotation_min_distance(config.auto_rotation_min_distance_meters);
        self.compositor.set_config(config);
    }

    /// Plan of the last rendered frame.
    #[must_use]
    pub fn plan(&self) -> &RenderPlan {
        &self.plan
    }

    /// Composes a frame without drawing it.
    pub fn prepare(
        &mut self,
        resources: &dyn ResourceCatalog,
        camera: &CameraState,
        now_ms: f64,
        tracer: &mut Tracer<'_>,
    ) -> PreparedFrame {
        self.compositor
            .compose(&mut self.store, resources, camera, now_ms, tracer)
    }

    /// Composes and draws one frame.
    ///
    /// Returns whether a tween is still running, i.e. whether the host should
    /// schedule another frame.
    pub fn render(
        &mut self,
        resources: &dyn ResourceCatalog,
        camera: &CameraState,
        now_ms: f64,
        rasterizer: &mut dyn Rasterizer,
        tracer: &mut Tracer<'_>,
    ) -> bool {
        let frame = self.prepare(resources, camera, now_ms, tracer);
        self.plan.fill(&frame);
        rasterizer.draw(&self.plan);
        frame.animating
    }
}
