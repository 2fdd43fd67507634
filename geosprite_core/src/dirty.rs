// Copyright 2026 the Geosprite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! The sprite store uses multi-channel dirty tracking (via
//! [`understory_dirty`]) keyed by sprite slot. Each channel represents an
//! independent category of change. Origin references never cross sprites,
//! so no channel propagates: only the explicitly marked slot appears in the
//! drain output.
//!
//! # Consumption
//!
//! Callers never need to query dirty state directly. Each
//! [`SpriteStore::advance`](crate::sprite::SpriteStore::advance) call drains
//! all channels and surfaces the results as
//! [`SpriteChanges`](crate::sprite::SpriteChanges).

use understory_dirty::Channel;

/// Sprite location commanded or interpolated.
pub const LOCATION: Channel = Channel::new(0);

/// Image offset, rotation, opacity, or attributes changed.
pub const IMAGE: Channel = Channel::new(1);

/// Drawable image set may have changed: sprite or image added or removed,
/// enable toggled, image resource swapped, or an image crossed the
/// zero-opacity boundary. Triggers a render-target rebuild.
pub const TOPOLOGY: Channel = Channel::new(2);
