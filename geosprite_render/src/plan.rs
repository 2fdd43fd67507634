// Copyright 2026 the Geosprite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render plan: an ordered sequence of textured quads for one frame.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use kurbo::Point;

use geosprite_core::compositor::PreparedFrame;
use geosprite_core::placement::{LeaderLinePlacement, PreparedItem, QUAD_UVS};
use geosprite_core::sprite::{Border, ImageKey, RenderMode};
use geosprite_core::targets::SubLayerRange;

/// Corner indices of the two triangles of a quad.
///
/// Corners are numbered top-left, top-right, bottom-left, bottom-right.
pub const QUAD_INDICES: [usize; 6] = [0, 2, 1, 1, 2, 3];

/// A GPU-ready vertex: clip-space position and texture coordinate.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    /// Clip-space `x, y, z, w`.
    pub position: [f32; 4],
    /// Texture coordinate.
    pub uv: [f32; 2],
}

/// A single textured quad in the render plan.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderItem {
    /// Sprite id.
    pub sprite_id: Arc<str>,
    /// Image key.
    pub key: ImageKey,
    /// Texture to sample.
    pub resource: Arc<str>,
    /// Render mode.
    pub mode: RenderMode,
    /// Four clip-space vertices, `x y z w` each, in corner order.
    pub vertices: [f32; 16],
    /// Opacity (0.0–1.0).
    pub opacity: f32,
    /// Screen corners in pixels, for hit-testing.
    pub screen_corners: [Point; 4],
    /// Optional outline.
    pub border: Option<Border>,
    /// Optional leader line.
    pub leader_line: Option<LeaderLinePlacement>,
}

impl RenderItem {
    /// Converts a prepared item to `f32` vertex data.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "clip-space coordinates and opacity are uploaded as f32"
    )]
    pub fn from_prepared(item: &PreparedItem) -> Self {
        let mut vertices = [0.0_f32; 16];
        for (dst, src) in vertices
            .chunks_exact_mut(4)
            .zip(&item.clip_vertices)
        {
            for (d, s) in dst.iter_mut().zip(src) {
                *d = *s as f32;
            }
        }
        Self {
            sprite_id: Arc::clone(&item.sprite_id),
            key: item.key,
            resource: Arc::clone(&item.resource),
            mode: item.mode,
            vertices,
            opacity: item.opacity as f32,
            screen_corners: item.screen_corners,
            border: item.border,
            leader_line: item.leader_line,
        }
    }

    /// Clip-space position of corner `i`.
    #[must_use]
    pub fn corner(&self, i: usize) -> [f32; 4] {
        let c = &self.vertices[i * 4..i * 4 + 4];
        [c[0], c[1], c[2], c[3]]
    }

    /// Expands the quad to two triangles.
    #[must_use]
    pub fn quad_vertices(&self) -> [QuadVertex; 6] {
        QUAD_INDICES.map(|i| QuadVertex {
            position: self.corner(i),
            uv: QUAD_UVS[i],
        })
    }
}

/// The ordered draw list for a single frame.
///
/// Items are grouped by ascending sub-layer and back-to-front within each
/// sub-layer.
#[derive(Clone, Debug, Default)]
pub struct RenderPlan {
    /// Frame counter of the source frame.
    pub frame_index: u64,
    /// Draw items in order.
    pub items: Vec<RenderItem>,
    /// Sub-layer runs over `items`.
    pub sub_layers: Vec<SubLayerRange>,
}

impl RenderPlan {
    /// Creates an empty plan.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the plan for a composed frame.
    #[must_use]
    pub fn from_frame(frame: &PreparedFrame) -> Self {
        let mut plan = Self::new();
        plan.fill(frame);
        plan
    }

    /// Refills this plan from a composed frame, reusing its allocation.
    pub fn fill(&mut self, frame: &PreparedFrame) {
        self.clear();
        self.frame_index = frame.frame_index;
        self.items
            .extend(frame.items.iter().map(RenderItem::from_prepared));
        self.sub_layers.extend(frame.sub_layers.iter().cloned());
    }

    /// Clears the plan for reuse.
    pub fn clear(&mut self) {
        self.items.clear();
        self.sub_layers.clear();
    }

    /// Appends six vertices per item, in draw order.
    pub fn write_vertices(&self, out: &mut Vec<QuadVertex>) {
        out.reserve(self.items.len() * QUAD_INDICES.len());
        for item in &self.items {
            out.extend_from_slice(&item.quad_vertices());
        }
    }

    /// Views a vertex buffer as bytes for upload.
    #[must_use]
    pub fn vertex_bytes(vertices: &[QuadVertex]) -> &[u8] {
        bytemuck::cast_slice(vertices)
    }
}
