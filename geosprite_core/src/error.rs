// Copyright 2026 the Geosprite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors returned by sprite store mutations.
//!
//! A mutation that returns an error has not changed the store.

use alloc::sync::Arc;

use thiserror::Error;

use crate::sprite::ImageKey;

/// Why a [`SpriteStore`](crate::sprite::SpriteStore) mutation was rejected.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MutationError {
    /// A sprite with this id already exists.
    #[error("sprite `{0}` already exists")]
    DuplicateSprite(Arc<str>),
    /// No live sprite has this id.
    #[error("unknown sprite `{0}`")]
    UnknownSprite(Arc<str>),
    /// The sprite already has an image in this slot.
    #[error("sprite `{sprite}` already has an image at {key}")]
    DuplicateImage {
        /// Owning sprite.
        sprite: Arc<str>,
        /// Occupied slot.
        key: ImageKey,
    },
    /// The sprite has no image in this slot.
    #[error("sprite `{sprite}` has no image at {key}")]
    UnknownImage {
        /// Owning sprite.
        sprite: Arc<str>,
        /// Missing slot.
        key: ImageKey,
    },
    /// An origin reference names a slot the sprite does not have.
    #[error("image {key} of sprite `{sprite}` references missing origin {origin}")]
    DanglingOrigin {
        /// Owning sprite.
        sprite: Arc<str>,
        /// Referencing image.
        key: ImageKey,
        /// Referenced slot.
        origin: ImageKey,
    },
    /// Following origin references from this image leads back to it.
    #[error("origin references of sprite `{sprite}` form a cycle through {key}")]
    OriginCycle {
        /// Owning sprite.
        sprite: Arc<str>,
        /// An image on the cycle.
        key: ImageKey,
    },
    /// The image is still the origin of another image.
    #[error("image {key} of sprite `{sprite}` is the origin of {referrer}")]
    ImageInUse {
        /// Owning sprite.
        sprite: Arc<str>,
        /// Image that was to be removed.
        key: ImageKey,
        /// An image referencing it.
        referrer: ImageKey,
    },
    /// Longitude or latitude is not finite.
    #[error("sprite `{0}` location is not finite")]
    InvalidLocation(Arc<str>),
}
