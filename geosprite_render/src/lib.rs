// Copyright 2026 the Geosprite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render plans and the sprite layer driver for geosprite.
//!
//! This crate sits between [`geosprite_core`]'s compositor and whatever
//! draws the quads. It defines:
//!
//! - [`RenderItem`]: a single textured quad with `f32` clip-space vertices
//! - [`RenderPlan`]: the ordered draw list for one frame
//! - [`QuadVertex`]: a `Pod` vertex for GPU upload, two triangles per item
//! - [`Rasterizer`]: the trait renderers implement
//! - [`SpriteLayer`]: owns a sprite store and compositor and renders them

mod layer;
mod plan;

pub use layer::{Rasterizer, SpriteLayer};
pub use plan::{QUAD_INDICES, QuadVertex, RenderItem, RenderPlan};
