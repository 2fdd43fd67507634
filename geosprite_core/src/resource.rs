// Copyright 2026 the Geosprite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Image resource lookup.
//!
//! Texture atlas packing and upload live outside the engine. Placement only
//! needs each resource's pixel size and whether its texture can be sampled,
//! which it reads through [`ResourceCatalog`].

use alloc::collections::BTreeMap;
use alloc::sync::Arc;

/// What placement needs to know about an image resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResourceInfo {
    /// Width in image pixels.
    pub width: u32,
    /// Height in image pixels.
    pub height: u32,
    /// Whether the texture is uploaded and can be drawn.
    pub texture_ready: bool,
}

impl ResourceInfo {
    /// A ready resource of the given size.
    #[must_use]
    pub const fn ready(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            texture_ready: true,
        }
    }
}

/// Source of [`ResourceInfo`] by resource id.
///
/// Catalogs are shared across worker threads by the accelerated backend, so
/// they must be `Sync`.
pub trait ResourceCatalog: Sync {
    /// Looks up a resource. `None` means "not registered".
    fn resource(&self, id: &str) -> Option<ResourceInfo>;

    /// Bumped whenever resources are registered, unregistered, or change
    /// readiness. A change triggers a render-target rebuild.
    fn revision(&self) -> u64 {
        0
    }
}

/// In-memory [`ResourceCatalog`].
#[derive(Clone, Debug, Default)]
pub struct ResourceTable {
    entries: BTreeMap<Arc<str>, ResourceInfo>,
    revision: u64,
}

impl ResourceTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces a resource.
    pub fn register(&mut self, id: impl Into<Arc<str>>, info: ResourceInfo) {
        self.entries.insert(id.into(), info);
        self.revision += 1;
    }

    /// Unregisters a resource. Returns whether it was registered.
    pub fn unregister(&mut self, id: &str) -> bool {
        let removed = self.entries.remove(id).is_some();
        if removed {
            self.revision += 1;
        }
        removed
    }

    /// Marks a registered resource's texture as (not) ready. Returns whether
    /// the resource exists.
    pub fn set_texture_ready(&mut self, id: &str, ready: bool) -> bool {
        let Some(info) = self.entries.get_mut(id) else {
            return false;
        };
        if info.texture_ready != ready {
            info.texture_ready = ready;
            self.revision += 1;
        }
        true
    }

    /// Number of registered resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no resource is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ResourceCatalog for ResourceTable {
    fn resource(&self, id: &str) -> Option<ResourceInfo> {
        self.entries.get(id).copied()
    }

    fn revision(&self) -> u64 {
        self.revision
    }
}
