// Copyright 2026 the Geosprite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays sprite storage with allocation, mutation, and validation.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::sync::Arc;
use alloc::vec::Vec;

use understory_dirty::{CycleHandling, DirtyTracker};

use crate::dirty;
use crate::error::MutationError;
use crate::geo::LngLat;
use crate::interpolation::{AnimatedValue, InterpolationOptions};

use super::id::{INVALID, ImageKey, SpriteHandle};
use super::image::{ImageInit, ImageState, ImageUpdate};
use super::origin::validate_origin_graph;

/// Default minimum movement before a sprite's heading updates.
pub const DEFAULT_AUTO_ROTATION_MIN_DISTANCE_METERS: f64 = 20.0;

/// Description of a new sprite.
#[derive(Clone, Debug)]
pub struct SpriteInit<T = ()> {
    /// Initial location.
    pub location: LngLat,
    /// Whether the sprite is drawn.
    pub enabled: bool,
    /// Caller payload.
    pub tag: Option<T>,
    /// Interpolation of later location commands.
    pub interpolation: Option<InterpolationOptions>,
    /// Initial images.
    pub images: Vec<(ImageKey, ImageInit)>,
}

impl<T> SpriteInit<T> {
    /// An enabled sprite at `location` without images.
    #[must_use]
    pub fn new(location: LngLat) -> Self {
        Self {
            location,
            enabled: true,
            tag: None,
            interpolation: None,
            images: Vec::new(),
        }
    }

    /// Returns a copy with an additional image.
    #[must_use]
    pub fn with_image(mut self, key: ImageKey, image: ImageInit) -> Self {
        self.images.push((key, image));
        self
    }

    /// Returns a copy carrying `tag`.
    #[must_use]
    pub fn with_tag(mut self, tag: T) -> Self {
        self.tag = Some(tag);
        self
    }

    /// Returns a copy interpolating location commands with `options`.
    #[must_use]
    pub fn with_interpolation(mut self, options: InterpolationOptions) -> Self {
        self.interpolation = Some(options);
        self
    }
}

/// Partial update of a sprite. `None` fields are left unchanged.
#[derive(Clone, Debug)]
pub struct SpriteUpdate<T = ()> {
    /// New location command.
    pub location: Option<LngLat>,
    /// New location interpolation, applied to this update's command.
    pub interpolation: Option<Option<InterpolationOptions>>,
    /// Enable or disable.
    pub enabled: Option<bool>,
    /// Set or clear the tag.
    pub tag: Option<Option<T>>,
}

impl<T> Default for SpriteUpdate<T> {
    fn default() -> Self {
        Self {
            location: None,
            interpolation: None,
            enabled: None,
            tag: None,
        }
    }
}

impl<T> SpriteUpdate<T> {
    /// An update commanding a new location.
    #[must_use]
    pub fn location(location: LngLat) -> Self {
        Self {
            location: Some(location),
            ..Self::default()
        }
    }
}

/// Read-only, tag-free view of the sprite arrays for one frame.
///
/// Backends receive this instead of the store so that they do not depend on
/// the tag type. Indices are raw slot indices, as found in
/// [`RenderTarget`](crate::targets::RenderTarget).
#[derive(Clone, Copy, Debug)]
pub struct SpriteFrameView<'a> {
    ids: &'a [Arc<str>],
    locations: &'a [AnimatedValue<LngLat>],
    enabled: &'a [bool],
    images: &'a [BTreeMap<ImageKey, ImageState>],
}

impl<'a> SpriteFrameView<'a> {
    /// Number of slots (live or free).
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "slot indices are u32 by construction"
    )]
    pub fn slot_count(&self) -> u32 {
        self.ids.len() as u32
    }

    /// Whether the slot holds a live, enabled sprite.
    #[must_use]
    pub fn is_enabled(&self, idx: u32) -> bool {
        self.enabled.get(idx as usize).copied().unwrap_or(false)
    }

    /// Sprite id at `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is out of range.
    #[must_use]
    pub fn id_at(&self, idx: u32) -> &'a Arc<str> {
        &self.ids[idx as usize]
    }

    /// Current (possibly interpolated) location at `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is out of range.
    #[must_use]
    pub fn location_at(&self, idx: u32) -> LngLat {
        self.locations[idx as usize].current()
    }

    /// Images of the sprite at `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is out of range.
    #[must_use]
    pub fn images_at(&self, idx: u32) -> &'a BTreeMap<ImageKey, ImageState> {
        &self.images[idx as usize]
    }

    /// One image, if the slot is in range and has it.
    #[must_use]
    pub fn image(&self, idx: u32, key: ImageKey) -> Option<&'a ImageState> {
        self.images.get(idx as usize)?.get(&key)
    }
}

/// Struct-of-arrays storage for all sprites of a layer.
///
/// Sprites are addressed by string id or by [`SpriteHandle`]. Internally,
/// each sprite occupies a slot in parallel arrays. Removed sprites are
/// recycled via a free list, and generation counters prevent stale handle
/// access.
///
/// Every mutation validates first and applies second: a mutation that
/// returns an error leaves the store unchanged.
#[derive(Debug)]
pub struct SpriteStore<T = ()> {
    // -- Identity --
    pub(crate) ids: Vec<Arc<str>>,
    pub(crate) by_id: BTreeMap<Arc<str>, u32>,

    // -- Sprite properties --
    pub(crate) location: Vec<AnimatedValue<LngLat>>,
    pub(crate) location_interpolation: Vec<Option<InterpolationOptions>>,
    pub(crate) enabled: Vec<bool>,
    pub(crate) tags: Vec<Option<T>>,

    // -- Auto-rotation --
    pub(crate) heading_location: Vec<LngLat>,
    pub(crate) heading_deg: Vec<Option<f64>>,
    pub(crate) auto_rotation_min_distance_meters: f64,

    // -- Images --
    pub(crate) images: Vec<BTreeMap<ImageKey, ImageState>>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Dirty tracking --
    pub(crate) dirty: DirtyTracker<u32>,
    pub(crate) animating: BTreeSet<u32>,
    pub(crate) topology_revision: u64,

    // -- Lifecycle tracking --
    pub(crate) pending_added: Vec<u32>,
    pub(crate) pending_removed: Vec<u32>,
}

impl<T> Default for SpriteStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SpriteStore<T> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ids: Vec::new(),
            by_id: BTreeMap::new(),
            location: Vec::new(),
            location_interpolation: Vec::new(),
            enabled: Vec::new(),
            tags: Vec::new(),
            heading_location: Vec::new(),
            heading_deg: Vec::new(),
            auto_rotation_min_distance_meters: DEFAULT_AUTO_ROTATION_MIN_DISTANCE_METERS,
            images: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            animating: BTreeSet::new(),
            topology_revision: 0,
            pending_added: Vec::new(),
            pending_removed: Vec::new(),
        }
    }

    /// Sets the minimum movement before a sprite's heading updates.
    pub fn set_auto_rotation_min_distance(&mut self, meters: f64) {
        self.auto_rotation_min_distance_meters = if meters.is_finite() {
            meters.max(0.0)
        } else {
            DEFAULT_AUTO_ROTATION_MIN_DISTANCE_METERS
        };
    }

    /// Number of live sprites.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether the store holds no sprites.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Bumped whenever the set of drawable images may have changed.
    #[must_use]
    pub fn topology_revision(&self) -> u64 {
        self.topology_revision
    }

    // -- Mutation API --

    /// Adds a sprite with its initial images.
    ///
    /// # Errors
    ///
    /// Fails if the id is taken, the location is not finite, two images share
    /// a key, or the images' origin references dangle or loop.
    pub fn add_sprite(
        &mut self,
        id: impl Into<Arc<str>>,
        init: SpriteInit<T>,
    ) -> Result<SpriteHandle, MutationError> {
        let id: Arc<str> = id.into();
        if self.by_id.contains_key(&id) {
            return Err(MutationError::DuplicateSprite(id));
        }
        if !init.location.is_finite() {
            return Err(MutationError::InvalidLocation(id));
        }
        let mut origins = BTreeMap::new();
        for (key, image) in &init.images {
            if origins
                .insert(*key, image.origin.map(|o| o.key))
                .is_some()
            {
                return Err(MutationError::DuplicateImage {
                    sprite: id,
                    key: *key,
                });
            }
        }
        validate_origin_graph(&id, &origins)?;

        let images: BTreeMap<ImageKey, ImageState> = init
            .images
            .into_iter()
            .map(|(key, image)| (key, ImageState::from_init(image, None)))
            .collect();

        let idx = if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot.
            let i = idx as usize;
            self.generation[i] += 1;
            self.ids[i] = Arc::clone(&id);
            self.location[i] = AnimatedValue::new(init.location);
            self.location_interpolation[i] = init.interpolation;
            self.enabled[i] = init.enabled;
            self.tags[i] = init.tag;
            self.heading_location[i] = init.location;
            self.heading_deg[i] = None;
            self.images[i] = images;
            idx
        } else {
            // Allocate a new slot.
            let idx = self.len;
            self.len += 1;
            self.ids.push(Arc::clone(&id));
            self.location.push(AnimatedValue::new(init.location));
            self.location_interpolation.push(init.interpolation);
            self.enabled.push(init.enabled);
            self.tags.push(init.tag);
            self.heading_location.push(init.location);
            self.heading_deg.push(None);
            self.images.push(images);
            self.generation.push(0);
            idx
        };

        self.by_id.insert(id, idx);
        self.pending_added.push(idx);
        self.mark_topology(idx);

        Ok(SpriteHandle {
            idx,
            generation: self.generation[idx as usize],
        })
    }

    /// Removes a sprite and all of its images.
    ///
    /// # Errors
    ///
    /// Fails if no sprite has this id.
    pub fn remove_sprite(&mut self, id: &str) -> Result<(), MutationError> {
        let idx = self.slot(id)?;
        let i = idx as usize;
        self.by_id.remove(id);
        self.images[i].clear();
        self.tags[i] = None;
        self.enabled[i] = false;
        self.animating.remove(&idx);

        // Remove dirty tracking state for the slot.
        self.dirty.remove_key(idx);

        // Bump generation so old handles immediately fail validation.
        self.generation[i] += 1;

        self.free_list.push(idx);
        self.pending_removed.push(idx);
        self.mark_topology(idx);
        Ok(())
    }

    /// Applies a sprite update.
    ///
    /// A location command runs through the sprite's location interpolation
    /// and, once the sprite has moved at least the auto-rotation minimum
    /// distance since the last heading update, re-aims every auto-rotating
    /// image.
    ///
    /// # Errors
    ///
    /// Fails if no sprite has this id or the new location is not finite.
    pub fn update_sprite(&mut self, id: &str, update: SpriteUpdate<T>) -> Result<(), MutationError> {
        let idx = self.slot(id)?;
        if let Some(location) = &update.location
            && !location.is_finite()
        {
            return Err(MutationError::InvalidLocation(Arc::clone(&self.ids[idx as usize])));
        }
        let i = idx as usize;

        if let Some(interpolation) = update.interpolation {
            self.location_interpolation[i] = interpolation;
            if interpolation.is_none() && self.location[i].collapse() {
                self.dirty.mark(idx, dirty::LOCATION);
                self.refresh_animating(idx);
            }
        }
        if let Some(tag) = update.tag {
            self.tags[i] = tag;
        }
        if let Some(location) = update.location {
            self.command_location(idx, location);
        }
        if let Some(enabled) = update.enabled {
            self.apply_enabled(idx, enabled);
        }
        Ok(())
    }

    /// Enables or disables a sprite. Disabled sprites keep animating but are
    /// not drawn.
    ///
    /// # Errors
    ///
    /// Fails if no sprite has this id.
    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> Result<(), MutationError> {
        let idx = self.slot(id)?;
        self.apply_enabled(idx, enabled);
        Ok(())
    }

    /// Adds an image to a sprite.
    ///
    /// # Errors
    ///
    /// Fails if the sprite is unknown, the slot is taken, or the image's
    /// origin reference dangles or closes a loop.
    pub fn add_image(
        &mut self,
        id: &str,
        key: ImageKey,
        image: ImageInit,
    ) -> Result<(), MutationError> {
        let idx = self.slot(id)?;
        let i = idx as usize;
        if self.images[i].contains_key(&key) {
            return Err(MutationError::DuplicateImage {
                sprite: Arc::clone(&self.ids[i]),
                key,
            });
        }
        let mut origins = self.origin_map(idx);
        origins.insert(key, image.origin.map(|o| o.key));
        validate_origin_graph(&self.ids[i], &origins)?;

        let state = ImageState::from_init(image, self.heading_deg[i]);
        self.images[i].insert(key, state);
        self.mark_topology(idx);
        Ok(())
    }

    /// Updates an image of a sprite.
    ///
    /// # Errors
    ///
    /// Fails if the sprite or image is unknown, or a new origin reference
    /// dangles or closes a loop.
    pub fn update_image(
        &mut self,
        id: &str,
        key: ImageKey,
        update: ImageUpdate,
    ) -> Result<(), MutationError> {
        let idx = self.slot(id)?;
        let i = idx as usize;
        if !self.images[i].contains_key(&key) {
            return Err(self.unknown_image(idx, key));
        }
        if let Some(origin) = update.origin {
            let mut origins = self.origin_map(idx);
            origins.insert(key, origin.map(|o| o.key));
            validate_origin_graph(&self.ids[i], &origins)?;
        }

        let heading = self.heading_deg[i];
        let topology = update.resource.is_some();
        let Some(image) = self.images[i].get_mut(&key) else {
            return Err(self.unknown_image(idx, key));
        };
        let was_visible = image.is_visible_class();
        image.apply(update, heading);
        let visibility_changed = image.is_visible_class() != was_visible;

        if topology || visibility_changed {
            self.mark_topology(idx);
        }
        self.refresh_animating(idx);
        self.dirty.mark(idx, dirty::IMAGE);
        Ok(())
    }

    /// Removes an image from a sprite.
    ///
    /// # Errors
    ///
    /// Fails if the sprite or image is unknown, or another image of the
    /// sprite uses it as its origin.
    pub fn remove_image(&mut self, id: &str, key: ImageKey) -> Result<(), MutationError> {
        let idx = self.slot(id)?;
        let i = idx as usize;
        if !self.images[i].contains_key(&key) {
            return Err(self.unknown_image(idx, key));
        }
        if let Some((&referrer, _)) = self.images[i]
            .iter()
            .find(|(_, image)| image.origin.is_some_and(|o| o.key == key))
        {
            return Err(MutationError::ImageInUse {
                sprite: Arc::clone(&self.ids[i]),
                key,
                referrer,
            });
        }
        self.images[i].remove(&key);
        self.mark_topology(idx);
        Ok(())
    }

    // -- Query API --

    /// Returns the handle of a live sprite.
    #[must_use]
    pub fn handle(&self, id: &str) -> Option<SpriteHandle> {
        let &idx = self.by_id.get(id)?;
        Some(SpriteHandle {
            idx,
            generation: self.generation[idx as usize],
        })
    }

    /// Returns whether the given handle refers to a live sprite.
    #[must_use]
    pub fn is_alive(&self, handle: SpriteHandle) -> bool {
        handle.idx < self.len
            && self.generation[handle.idx as usize] == handle.generation
            && self.by_id.get(&self.ids[handle.idx as usize]) == Some(&handle.idx)
    }

    /// Returns the id of a sprite.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn id(&self, handle: SpriteHandle) -> &Arc<str> {
        self.validate(handle);
        &self.ids[handle.idx as usize]
    }

    /// Returns the current (possibly interpolated) location of a sprite.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn location(&self, handle: SpriteHandle) -> LngLat {
        self.validate(handle);
        self.location[handle.idx as usize].current()
    }

    /// Returns the location channel of a sprite.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn location_channel(&self, handle: SpriteHandle) -> &AnimatedValue<LngLat> {
        self.validate(handle);
        &self.location[handle.idx as usize]
    }

    /// Returns whether a sprite is enabled.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn is_enabled(&self, handle: SpriteHandle) -> bool {
        self.validate(handle);
        self.enabled[handle.idx as usize]
    }

    /// Returns a sprite's tag.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn tag(&self, handle: SpriteHandle) -> Option<&T> {
        self.validate(handle);
        self.tags[handle.idx as usize].as_ref()
    }

    /// Returns a sprite's last auto-rotation heading.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn heading_deg(&self, handle: SpriteHandle) -> Option<f64> {
        self.validate(handle);
        self.heading_deg[handle.idx as usize]
    }

    /// Returns a sprite's images.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn images(&self, handle: SpriteHandle) -> &BTreeMap<ImageKey, ImageState> {
        self.validate(handle);
        &self.images[handle.idx as usize]
    }

    /// Returns one image of a sprite.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn image(&self, handle: SpriteHandle, key: ImageKey) -> Option<&ImageState> {
        self.images(handle).get(&key)
    }

    /// Iterates over the handles of live sprites in id order.
    pub fn handles(&self) -> impl Iterator<Item = SpriteHandle> + '_ {
        self.by_id.values().map(|&idx| SpriteHandle {
            idx,
            generation: self.generation[idx as usize],
        })
    }

    /// Tag-free view for backends.
    #[must_use]
    pub fn frame_view(&self) -> SpriteFrameView<'_> {
        SpriteFrameView {
            ids: &self.ids,
            locations: &self.location,
            enabled: &self.enabled,
            images: &self.images,
        }
    }

    // -- Raw-index accessors --
    //
    // These accept raw slot indices (as found in `SpriteChanges` or render
    // targets) rather than handles, skipping generation validation.

    /// Returns the id at raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn id_at(&self, idx: u32) -> &Arc<str> {
        assert!(
            idx < self.len,
            "slot index {idx} out of range (len {})",
            self.len
        );
        &self.ids[idx as usize]
    }

    /// Returns the current location at raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn location_at(&self, idx: u32) -> LngLat {
        assert!(
            idx < self.len,
            "slot index {idx} out of range (len {})",
            self.len
        );
        self.location[idx as usize].current()
    }

    /// Returns the tag at raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn tag_at(&self, idx: u32) -> Option<&T> {
        assert!(
            idx < self.len,
            "slot index {idx} out of range (len {})",
            self.len
        );
        self.tags[idx as usize].as_ref()
    }

    // -- Internal helpers --

    /// Resolves a live sprite id to its slot.
    fn slot(&self, id: &str) -> Result<u32, MutationError> {
        self.by_id
            .get(id)
            .copied()
            .ok_or_else(|| MutationError::UnknownSprite(Arc::from(id)))
    }

    /// Panics if the handle is stale.
    fn validate(&self, handle: SpriteHandle) {
        assert!(
            self.is_alive(handle),
            "stale SpriteHandle: {handle:?} (current gen: {})",
            if handle.idx < self.len {
                self.generation[handle.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    fn unknown_image(&self, idx: u32, key: ImageKey) -> MutationError {
        MutationError::UnknownImage {
            sprite: Arc::clone(&self.ids[idx as usize]),
            key,
        }
    }

    fn origin_map(&self, idx: u32) -> BTreeMap<ImageKey, Option<ImageKey>> {
        self.images[idx as usize]
            .iter()
            .map(|(&key, image)| (key, image.origin.map(|o| o.key)))
            .collect()
    }

    pub(crate) fn mark_topology(&mut self, idx: u32) {
        self.topology_revision += 1;
        self.dirty.mark(idx, dirty::TOPOLOGY);
    }

    fn apply_enabled(&mut self, idx: u32, enabled: bool) {
        if self.enabled[idx as usize] != enabled {
            self.enabled[idx as usize] = enabled;
            self.mark_topology(idx);
        }
    }

    /// Keeps `idx` in the advance set exactly while one of its channels is
    /// tweening.
    fn refresh_animating(&mut self, idx: u32) {
        let i = idx as usize;
        let animating = self.location[i].is_animating()
            || self.images[i].values().any(ImageState::is_animating);
        if animating {
            self.animating.insert(idx);
        } else {
            self.animating.remove(&idx);
        }
    }

    fn command_location(&mut self, idx: u32, location: LngLat) {
        let i = idx as usize;
        let options = self.location_interpolation[i];
        self.location[i].command(location, options.as_ref());
        self.refresh_animating(idx);
        self.dirty.mark(idx, dirty::LOCATION);

        let moved = self.heading_location[i].distance_meters(&location);
        if moved < self.auto_rotation_min_distance_meters || moved == 0.0 {
            return;
        }
        let heading = self.heading_location[i].bearing_deg_to(&location);
        self.heading_location[i] = location;
        self.heading_deg[i] = Some(heading);

        let mut any_image = false;
        for image in self.images[i].values_mut().filter(|image| image.auto_rotation) {
            image.command_rotation(Some(heading));
            any_image = true;
        }
        if any_image {
            self.dirty.mark(idx, dirty::IMAGE);
            self.refresh_animating(idx);
        }
    }
}
