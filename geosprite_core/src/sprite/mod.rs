// Copyright 2026 the Geosprite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sprite data model.
//!
//! A *sprite* is a geographic entity that draws one or more images. Each
//! sprite has:
//!
//! - An identity: a unique string id plus a generational [`SpriteHandle`]
//!   that becomes stale when the sprite is removed.
//! - An animated location, an enable flag, and an optional caller tag.
//! - Images keyed by [`ImageKey`] `(sub_layer, order)`, each with its own
//!   animated offset, rotation, and opacity.
//!
//! Images may anchor to another image of the same sprite through an
//! [`OriginReference`]. The store rejects any mutation that would leave a
//! reference dangling or form a loop, so the origin graph seen by the
//! placement resolver is always a forest.
//!
//! # Dirty tracking
//!
//! Mutations mark the corresponding dirty channel (see
//! [`dirty`](crate::dirty)), and [`SpriteStore::advance`] drains them into
//! [`SpriteChanges`].

mod advance;
mod id;
mod image;
mod origin;
mod store;

pub use advance::SpriteChanges;
pub use id::{INVALID, ImageKey, SpriteHandle};
pub use image::{
    Anchor, Border, ImageInit, ImageInterpolation, ImageState, ImageUpdate, LeaderLine,
    OriginReference, RenderMode, Rgba,
};
pub use store::{
    DEFAULT_AUTO_ROTATION_MIN_DISTANCE_METERS, SpriteFrameView, SpriteInit, SpriteStore,
    SpriteUpdate,
};
