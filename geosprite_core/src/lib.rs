// Copyright 2026 the Geosprite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Placement, interpolation, and depth-sorted compositing of map sprites.
//!
//! `geosprite_core` places thousands of images ("sprites") on a pitched,
//! rotated web-mercator map and orders them for drawing. Each frame it turns
//! the host camera and the sprite store into a list of textured quads in
//! clip space, sorted back-to-front within each sub-layer. It owns no GPU
//! state: rendering is left to [`geosprite_render`] or the host.
//!
//! # Architecture
//!
//! ```text
//!   mutations ──► SpriteStore (validated, dirty-tracked)
//!                     │
//!   now_ms ──► SpriteStore::advance() ──► SpriteChanges
//!                     │
//!                     ▼
//!   FrameCompositor::compose()
//!     ├─ RenderTargets::rebuild()        (topology / resource changes only)
//!     ├─ CenterCache::clear()
//!     └─ PlacementBackend::prepare()
//!          ├─ ImageResolver  ──► ProjectionAdapter (camera)
//!          └─ depth keys + compare_frame_order
//!                     │
//!                     ▼
//!               PreparedFrame ──► renderer
//! ```
//!
//! **[`sprite`]**: struct-of-arrays sprite storage with generational
//! handles. Mutations validate origin references before applying.
//!
//! **[`interpolation`]** and **[`easing`]**: per-channel tweens with
//! feedback and feedforward modes and shortest-arc angle channels.
//!
//! **[`projection`]**: the [`ProjectionAdapter`](projection::ProjectionAdapter)
//! seam over a [`camera`] snapshot.
//!
//! **[`placement`]**: billboard and surface quad geometry, origin
//! resolution, and the per-frame center cache.
//!
//! **[`depth`]**: NDC depth keys and the deterministic draw-order
//! comparators.
//!
//! **[`targets`]**, **[`backend`]** and **[`compositor`]**: the frame loop.
//!
//! **[`dirty`]**: dirty-tracking channels via `understory_dirty`.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! compose-loop instrumentation, with zero-overhead
//! [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `serde` (disabled by default): Derives `Serialize`/`Deserialize` for
//!   configuration and plain-data sprite attributes.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-item skip
//!   events.
//!
//! [`geosprite_render`]: https://docs.rs/geosprite_render

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod backend;
pub mod camera;
pub mod compositor;
pub mod config;
pub mod depth;
pub mod dirty;
pub mod easing;
pub mod error;
pub mod geo;
pub mod interpolation;
pub mod placement;
pub mod projection;
pub mod resource;
pub mod sprite;
pub mod targets;
pub mod trace;
pub mod transform;
