// Copyright 2026 the Geosprite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Placement resolver.
//!
//! Turns a sprite image into a screen-space (billboard) or ground-space
//! (surface) quad for one frame's camera.
//!
//! The module has two layers:
//!
//! - **Pure geometry**: [`effective_pixels_per_meter`],
//!   [`clamp_sprite_pixel_size`], [`billboard_pixel_dimensions`],
//!   [`surface_world_dimensions`], [`offset_vector`], [`rotate_clockwise`],
//!   [`anchor_shift`] and [`quad_corners`]. Every backend goes through these.
//! - **Resolution**: [`ImageResolver`] walks origin references, caches each
//!   image's [`ImageLayout`] in a [`CenterCache`], and produces a
//!   [`PreparedItem`] per drawable image.
//!
//! # Coordinate conventions
//!
//! Offsets and corners are built as `(x, y)` vectors where `x` points right
//! (billboard) or east (surface) and `y` points up or north. Screen points
//! have `y` growing downwards, so billboard vectors flip `y` when applied.
//! Rotations and bearings are degrees clockwise.
//!
//! # Failure policy
//!
//! Resolution never mutates sprite state. An image that cannot be placed
//! this frame is reported with a [`SkipReason`] and left out.

use alloc::collections::BTreeMap;
use alloc::sync::Arc;

use kurbo::{Point, Vec2};

use crate::config::{DepthBiasConfig, ScalingOptions, SpriteLayerConfig};
use crate::depth::{billboard_depth_key, surface_depth_key};
use crate::geo::{LngLat, meters_per_pixel_at_latitude};
use crate::projection::ProjectionAdapter;
use crate::resource::{ResourceCatalog, ResourceInfo};
use crate::sprite::{Anchor, Border, ImageKey, ImageState, LeaderLine, RenderMode, SpriteFrameView};
use crate::targets::RenderTarget;

/// Corner signs in vertex order: top-left, top-right, bottom-left,
/// bottom-right.
pub const CORNER_SIGNS: [(f64, f64); 4] = [(-1.0, 1.0), (1.0, 1.0), (-1.0, -1.0), (1.0, -1.0)];

/// Texture coordinates matching [`CORNER_SIGNS`].
pub const QUAD_UVS: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];

// ---------------------------------------------------------------------------
// Pure geometry
// ---------------------------------------------------------------------------

/// Screen pixels per meter at a location: `(1 / meters_per_pixel) ×
/// perspective_ratio`.
///
/// Returns `0.0` when either input is not a positive finite number.
#[must_use]
pub fn effective_pixels_per_meter(meters_per_pixel: f64, perspective_ratio: f64) -> f64 {
    if !(meters_per_pixel.is_finite() && meters_per_pixel > 0.0) {
        return 0.0;
    }
    if !(perspective_ratio.is_finite() && perspective_ratio > 0.0) {
        return 0.0;
    }
    perspective_ratio / meters_per_pixel
}

/// Clamps the larger side of a `width × height` pixel rectangle into
/// `[min_px, max_px]`, keeping the aspect ratio.
///
/// A bound `≤ 0` disables that side of the clamp. Returns the clamped size
/// and the applied scale adjustment (`1.0` when unclamped).
#[must_use]
pub fn clamp_sprite_pixel_size(width: f64, height: f64, min_px: f64, max_px: f64) -> (f64, f64, f64) {
    let largest = width.max(height);
    if !(largest.is_finite() && largest > 0.0) {
        return (width, height, 1.0);
    }
    let target = if max_px > 0.0 && largest > max_px {
        max_px
    } else if min_px > 0.0 && largest < min_px {
        min_px
    } else {
        return (width, height, 1.0);
    };
    let adjustment = target / largest;
    (width * adjustment, height * adjustment, adjustment)
}

/// On-screen size of a billboard image in pixels, plus the clamp
/// adjustment.
#[must_use]
pub fn billboard_pixel_dimensions(
    image: ResourceInfo,
    scaling: &ScalingOptions,
    scale: f64,
    zoom_scale_factor: f64,
    pixels_per_meter: f64,
) -> (f64, f64, f64) {
    let factor = scaling.meters_per_pixel * scale * zoom_scale_factor * pixels_per_meter;
    clamp_sprite_pixel_size(
        f64::from(image.width) * factor,
        f64::from(image.height) * factor,
        scaling.sprite_min_pixel,
        scaling.sprite_max_pixel,
    )
}

/// Ground size of a surface image in meters, plus the clamp adjustment.
///
/// The clamp is evaluated on the image's on-screen size and folded back into
/// meters. Without a usable `pixels_per_meter` no clamp applies.
#[must_use]
pub fn surface_world_dimensions(
    image: ResourceInfo,
    scaling: &ScalingOptions,
    scale: f64,
    zoom_scale_factor: f64,
    pixels_per_meter: f64,
) -> (f64, f64, f64) {
    let factor = scaling.meters_per_pixel * scale * zoom_scale_factor;
    let width = f64::from(image.width) * factor;
    let height = f64::from(image.height) * factor;
    if !(pixels_per_meter.is_finite() && pixels_per_meter > 0.0) {
        return (width, height, 1.0);
    }
    let (_, _, adjustment) = clamp_sprite_pixel_size(
        width * pixels_per_meter,
        height * pixels_per_meter,
        scaling.sprite_min_pixel,
        scaling.sprite_max_pixel,
    );
    (width * adjustment, height * adjustment, adjustment)
}

/// Vector of length `distance` along `bearing_deg` (clockwise from up).
#[must_use]
pub fn offset_vector(distance: f64, bearing_deg: f64) -> Vec2 {
    if distance == 0.0 || !distance.is_finite() {
        return Vec2::ZERO;
    }
    let (sin, cos) = bearing_deg.to_radians().sin_cos();
    Vec2::new(distance * sin, distance * cos)
}

/// Rotates `v` clockwise by `deg` degrees.
#[must_use]
pub fn rotate_clockwise(v: Vec2, deg: f64) -> Vec2 {
    let (sin, cos) = deg.to_radians().sin_cos();
    Vec2::new(v.x * cos + v.y * sin, -v.x * sin + v.y * cos)
}

/// Displacement from the image center to its anchor point, after rotation.
#[must_use]
pub fn anchor_shift(half_width: f64, half_height: f64, anchor: Anchor, rotate_deg: f64) -> Vec2 {
    rotate_clockwise(
        Vec2::new(anchor.x * half_width, anchor.y * half_height),
        rotate_deg,
    )
}

/// Corner vectors relative to the quad center, in [`CORNER_SIGNS`] order.
#[must_use]
pub fn quad_corners(half_width: f64, half_height: f64, rotate_deg: f64) -> [Vec2; 4] {
    CORNER_SIGNS.map(|(sx, sy)| {
        rotate_clockwise(Vec2::new(sx * half_width, sy * half_height), rotate_deg)
    })
}

/// Applies an up-positive vector to a y-down screen point.
fn screen_offset(point: Point, v: Vec2) -> Point {
    Point::new(point.x + v.x, point.y - v.y)
}

// ---------------------------------------------------------------------------
// Frame inputs and results
// ---------------------------------------------------------------------------

/// Per-frame scalar inputs shared by every image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameParams {
    /// Camera zoom.
    pub zoom: f64,
    /// `scaling.zoom_scale_factor(zoom)`.
    pub zoom_scale_factor: f64,
    /// Normalized sizing rules.
    pub scaling: ScalingOptions,
    /// Surface depth bias.
    pub depth_bias: DepthBiasConfig,
}

impl FrameParams {
    /// Derives the frame inputs from the layer configuration.
    #[must_use]
    pub fn new(zoom: f64, config: &SpriteLayerConfig) -> Self {
        let scaling = config.scaling.normalized();
        Self {
            zoom,
            zoom_scale_factor: scaling.zoom_scale_factor(zoom),
            scaling,
            depth_bias: config.depth_bias,
        }
    }
}

/// Why an image was left out of a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SkipReason {
    /// The resource is registered but its texture is not uploaded.
    TextureNotReady,
    /// The resource is not registered.
    MissingResource,
    /// A vertex or the base point could not be projected.
    ProjectionFailed,
    /// The origin image is missing or could not be placed.
    OriginUnresolved,
    /// Scale or resulting size is zero or not finite.
    DegenerateScale,
    /// Opacity is zero.
    Transparent,
    /// The image was removed after the render targets were built.
    MissingImage,
}

/// Number of images skipped per [`SkipReason`] in one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SkipCounts {
    /// [`SkipReason::TextureNotReady`].
    pub texture_not_ready: u32,
    /// [`SkipReason::MissingResource`].
    pub missing_resource: u32,
    /// [`SkipReason::ProjectionFailed`].
    pub projection_failed: u32,
    /// [`SkipReason::OriginUnresolved`].
    pub origin_unresolved: u32,
    /// [`SkipReason::DegenerateScale`].
    pub degenerate_scale: u32,
    /// [`SkipReason::Transparent`].
    pub transparent: u32,
    /// [`SkipReason::MissingImage`].
    pub missing_image: u32,
}

impl SkipCounts {
    /// Counts one skipped image.
    pub fn record(&mut self, reason: SkipReason) {
        let slot = match reason {
            SkipReason::TextureNotReady => &mut self.texture_not_ready,
            SkipReason::MissingResource => &mut self.missing_resource,
            SkipReason::ProjectionFailed => &mut self.projection_failed,
            SkipReason::OriginUnresolved => &mut self.origin_unresolved,
            SkipReason::DegenerateScale => &mut self.degenerate_scale,
            SkipReason::Transparent => &mut self.transparent,
            SkipReason::MissingImage => &mut self.missing_image,
        };
        *slot = slot.saturating_add(1);
    }

    /// Total skipped images.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.texture_not_ready
            + self.missing_resource
            + self.projection_failed
            + self.origin_unresolved
            + self.degenerate_scale
            + self.transparent
            + self.missing_image
    }
}

/// A resolved point: geographic location plus its screen position, when it
/// projects.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolvedCenter {
    /// Location on the map.
    pub location: LngLat,
    /// Screen position in pixels.
    pub screen: Option<Point>,
}

/// Frame geometry of one image, shared by the image itself and every image
/// that uses it as origin.
///
/// Billboard extents and offsets are in screen pixels; surface ones are in
/// meters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImageLayout {
    /// Render mode the layout was computed for.
    pub mode: RenderMode,
    /// Point the image is offset from: the sprite location or the origin
    /// image's center.
    pub base: ResolvedCenter,
    /// Center after the offset, before the anchor shift.
    pub anchorless: ResolvedCenter,
    /// Center after the offset and the anchor shift.
    pub anchored: ResolvedCenter,
    /// Anchored center relative to the base (right/up pixels or east/north
    /// meters).
    pub center_offset: Vec2,
    /// Half the quad width.
    pub half_width: f64,
    /// Half the quad height.
    pub half_height: f64,
    /// Displayed rotation in degrees.
    pub rotate_deg: f64,
    /// Pixel clamp adjustment folded into size and offset.
    pub scale_adjustment: f64,
    /// Effective screen pixels per meter at the base.
    pub pixels_per_meter: f64,
}

impl ImageLayout {
    /// The center an origin reference resolves to.
    #[must_use]
    pub fn center(&self, use_resolved_anchor: bool) -> ResolvedCenter {
        if use_resolved_anchor {
            self.anchored
        } else {
            self.anchorless
        }
    }
}

/// Per-frame cache of image layouts keyed by `(sprite slot, image key)`.
///
/// Owned by the compositor and cleared before each frame. Each entry is
/// computed at most once per frame, so origin chains see identical values.
#[derive(Clone, Debug, Default)]
pub struct CenterCache {
    entries: BTreeMap<(u32, ImageKey), Result<ImageLayout, SkipReason>>,
}

impl CenterCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of cached layouts, including failures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached result for an image, if resolved this frame.
    #[must_use]
    pub fn get(&self, sprite: u32, key: ImageKey) -> Option<Result<ImageLayout, SkipReason>> {
        self.entries.get(&(sprite, key)).copied()
    }

    /// Moves every entry of `other` into this cache.
    ///
    /// Used by backends that resolve disjoint target slices with private
    /// caches. Entries for the same key are identical within a frame.
    pub fn merge(&mut self, other: Self) {
        self.entries.extend(other.entries);
    }

    fn insert(&mut self, sprite: u32, key: ImageKey, layout: Result<ImageLayout, SkipReason>) {
        self.entries.insert((sprite, key), layout);
    }
}

/// Leader line from the image's base point to its center.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LeaderLinePlacement {
    /// Stroke style.
    pub style: LeaderLine,
    /// Base point in screen pixels.
    pub from: Point,
    /// Image center in screen pixels.
    pub to: Point,
}

/// A placed, drawable image.
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedItem {
    /// Sprite slot.
    pub sprite: u32,
    /// Sprite id.
    pub sprite_id: Arc<str>,
    /// Image key.
    pub key: ImageKey,
    /// Resource drawn.
    pub resource: Arc<str>,
    /// Render mode.
    pub mode: RenderMode,
    /// Opacity in `0..=1`.
    pub opacity: f64,
    /// NDC depth key, `−z/w`. Smaller is farther.
    pub depth_key: f64,
    /// Clip-space vertices in [`CORNER_SIGNS`] order.
    pub clip_vertices: [[f64; 4]; 4],
    /// Screen corners in pixels, for hit-testing.
    pub screen_corners: [Point; 4],
    /// Screen position of the anchored center.
    pub center: Point,
    /// Ground corners of surface images.
    pub geo_corners: Option<[LngLat; 4]>,
    /// Optional outline.
    pub border: Option<Border>,
    /// Optional leader line.
    pub leader_line: Option<LeaderLinePlacement>,
}

// ---------------------------------------------------------------------------
// ImageResolver
// ---------------------------------------------------------------------------

/// Resolves image layouts and prepares draw items for one frame.
pub struct ImageResolver<'a, P: ProjectionAdapter + ?Sized> {
    projection: &'a P,
    sprites: SpriteFrameView<'a>,
    resources: &'a dyn ResourceCatalog,
    params: FrameParams,
    cache: &'a mut CenterCache,
}

impl<P: ProjectionAdapter + ?Sized> core::fmt::Debug for ImageResolver<'_, P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ImageResolver")
            .field("params", &self.params)
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl<'a, P: ProjectionAdapter + ?Sized> ImageResolver<'a, P> {
    /// Creates a resolver over one frame's inputs.
    pub fn new(
        projection: &'a P,
        sprites: SpriteFrameView<'a>,
        resources: &'a dyn ResourceCatalog,
        params: FrameParams,
        cache: &'a mut CenterCache,
    ) -> Self {
        Self {
            projection,
            sprites,
            resources,
            params,
            cache,
        }
    }

    /// Layout of an image, following its origin chain.
    ///
    /// Chains of any length resolve the same way regardless of which link
    /// is asked for first: the unresolved part of the chain is collected and
    /// then laid out from the outermost origin inward.
    ///
    /// # Errors
    ///
    /// Returns the reason the image cannot be placed this frame.
    pub fn layout(&mut self, sprite: u32, key: ImageKey) -> Result<ImageLayout, SkipReason> {
        if let Some(hit) = self.cache.get(sprite, key) {
            return hit;
        }

        // Nearest link first. Stops at a root, a cached link, a missing
        // image, or a repeat.
        let mut chain = vec![key];
        let mut link = key;
        while let Some(origin) = self.sprites.image(sprite, link).and_then(|image| image.origin) {
            if chain.contains(&origin.key) || self.cache.get(sprite, origin.key).is_some() {
                break;
            }
            chain.push(origin.key);
            link = origin.key;
        }

        let mut result = Err(SkipReason::MissingImage);
        for &link in chain.iter().rev() {
            result = self.compute_layout(sprite, link);
            self.cache.insert(sprite, link, result);
        }
        result
    }

    /// Lays out one image. Its origin, if any, must already be cached.
    fn compute_layout(&self, sprite: u32, key: ImageKey) -> Result<ImageLayout, SkipReason> {
        let image = self
            .sprites
            .image(sprite, key)
            .ok_or(SkipReason::MissingImage)?;

        let base = match image.origin {
            Some(origin) => match self.cache.get(sprite, origin.key) {
                Some(Ok(layout)) if origin.key != key => layout.center(origin.use_resolved_anchor),
                _ => return Err(SkipReason::OriginUnresolved),
            },
            None => {
                let location = self.sprites.location_at(sprite);
                ResolvedCenter {
                    location,
                    screen: self.projection.project(&location),
                }
            }
        };

        if !(image.scale.is_finite() && image.scale > 0.0) {
            return Err(SkipReason::DegenerateScale);
        }
        let info = self
            .resources
            .resource(&image.resource)
            .ok_or(SkipReason::MissingResource)?;

        let meters_per_pixel = meters_per_pixel_at_latitude(self.params.zoom, base.location.lat);
        let pixels_per_meter = effective_pixels_per_meter(
            meters_per_pixel,
            self.projection.perspective_ratio(&base.location),
        );

        match image.mode {
            RenderMode::Billboard => self.billboard_layout(image, info, base, pixels_per_meter),
            RenderMode::Surface => self.surface_layout(image, info, base, pixels_per_meter),
        }
    }

    fn billboard_layout(
        &self,
        image: &ImageState,
        info: ResourceInfo,
        base: ResolvedCenter,
        pixels_per_meter: f64,
    ) -> Result<ImageLayout, SkipReason> {
        let params = &self.params;
        let base_screen = base
            .screen
            .or_else(|| self.projection.project(&base.location))
            .ok_or(SkipReason::ProjectionFailed)?;
        let (width, height, adjustment) = billboard_pixel_dimensions(
            info,
            &params.scaling,
            image.scale,
            params.zoom_scale_factor,
            pixels_per_meter,
        );
        check_extent(width, height)?;
        let (half_width, half_height) = (width / 2.0, height / 2.0);
        let rotate_deg = image.displayed_rotate.current().get();

        let offset = offset_vector(
            image.offset_meters.current()
                * image.scale
                * params.zoom_scale_factor
                * pixels_per_meter
                * adjustment,
            image.offset_bearing_deg(),
        );
        let center_offset = offset - anchor_shift(half_width, half_height, image.anchor, rotate_deg);
        let anchorless_screen = screen_offset(base_screen, offset);
        let anchored_screen = screen_offset(base_screen, center_offset);

        let unproject_or_base = |point: Point| {
            self.projection
                .unproject(point)
                .unwrap_or(base.location)
        };
        Ok(ImageLayout {
            mode: RenderMode::Billboard,
            base: ResolvedCenter {
                location: base.location,
                screen: Some(base_screen),
            },
            anchorless: ResolvedCenter {
                location: unproject_or_base(anchorless_screen),
                screen: Some(anchorless_screen),
            },
            anchored: ResolvedCenter {
                location: unproject_or_base(anchored_screen),
                screen: Some(anchored_screen),
            },
            center_offset,
            half_width,
            half_height,
            rotate_deg,
            scale_adjustment: adjustment,
            pixels_per_meter,
        })
    }

    fn surface_layout(
        &self,
        image: &ImageState,
        info: ResourceInfo,
        base: ResolvedCenter,
        pixels_per_meter: f64,
    ) -> Result<ImageLayout, SkipReason> {
        let params = &self.params;
        let (width, height, adjustment) = surface_world_dimensions(
            info,
            &params.scaling,
            image.scale,
            params.zoom_scale_factor,
            pixels_per_meter,
        );
        check_extent(width, height)?;
        let (half_width, half_height) = (width / 2.0, height / 2.0);
        let rotate_deg = image.displayed_rotate.current().get();

        let offset = offset_vector(
            image.offset_meters.current() * image.scale * params.zoom_scale_factor * adjustment,
            image.offset_bearing_deg(),
        );
        let center_offset = offset - anchor_shift(half_width, half_height, image.anchor, rotate_deg);
        let resolve = |v: Vec2| {
            let location = base.location.displaced(v.x, v.y);
            ResolvedCenter {
                location,
                screen: self.projection.project(&location),
            }
        };
        Ok(ImageLayout {
            mode: RenderMode::Surface,
            base: ResolvedCenter {
                location: base.location,
                screen: base
                    .screen
                    .or_else(|| self.projection.project(&base.location)),
            },
            anchorless: resolve(offset),
            anchored: resolve(center_offset),
            center_offset,
            half_width,
            half_height,
            rotate_deg,
            scale_adjustment: adjustment,
            pixels_per_meter,
        })
    }

    /// Prepares the draw item for a render target.
    ///
    /// # Errors
    ///
    /// Returns the reason the image is left out of this frame.
    pub fn prepare(&mut self, target: &RenderTarget) -> Result<PreparedItem, SkipReason> {
        let image = self
            .sprites
            .image(target.sprite, target.key)
            .ok_or(SkipReason::MissingImage)?;
        let opacity = image.opacity.current();
        if opacity.is_nan() || opacity <= 0.0 {
            return Err(SkipReason::Transparent);
        }
        let info = self
            .resources
            .resource(&image.resource)
            .ok_or(SkipReason::MissingResource)?;
        if !info.texture_ready {
            return Err(SkipReason::TextureNotReady);
        }
        let layout = self.layout(target.sprite, target.key)?;

        let corners = quad_corners(layout.half_width, layout.half_height, layout.rotate_deg);
        let (clip_vertices, screen_corners, center, geo_corners, depth_key) = match layout.mode {
            RenderMode::Billboard => {
                let center = layout.anchored.screen.ok_or(SkipReason::ProjectionFailed)?;
                let screen_corners = corners.map(|c| screen_offset(center, c));
                let clip_vertices = screen_corners.map(|p| {
                    let (x, y) = self.projection.screen_to_clip(p);
                    [x, y, 0.0, 1.0]
                });
                if clip_vertices.iter().flatten().any(|v| !v.is_finite()) {
                    return Err(SkipReason::ProjectionFailed);
                }
                let depth_key =
                    billboard_depth_key(self.projection, center, &layout.base.location)
                        .ok_or(SkipReason::ProjectionFailed)?;
                (clip_vertices, screen_corners, center, None, depth_key)
            }
            RenderMode::Surface => {
                let base = layout.base.location;
                let geo_corners = corners.map(|c| {
                    let v = layout.center_offset + c;
                    base.displaced(v.x, v.y)
                });
                let mut clip_vertices = [[0.0; 4]; 4];
                for (clip, corner) in clip_vertices.iter_mut().zip(&geo_corners) {
                    *clip = self
                        .projection
                        .to_clip_space(corner)
                        .ok_or(SkipReason::ProjectionFailed)?;
                }
                let mut screen_corners = [Point::ZERO; 4];
                for (screen, clip) in screen_corners.iter_mut().zip(&clip_vertices) {
                    *screen = self
                        .projection
                        .clip_to_screen(*clip)
                        .ok_or(SkipReason::ProjectionFailed)?;
                }
                let depth_key =
                    surface_depth_key(&mut clip_vertices, &self.params.depth_bias, target.key)
                        .ok_or(SkipReason::ProjectionFailed)?;
                let center = layout.anchored.screen.unwrap_or_else(|| {
                    let sum = screen_corners
                        .iter()
                        .fold(Vec2::ZERO, |acc, p| acc + p.to_vec2());
                    (sum / 4.0).to_point()
                });
                (clip_vertices, screen_corners, center, Some(geo_corners), depth_key)
            }
        };

        let leader_line = image.leader_line.and_then(|style| {
            Some(LeaderLinePlacement {
                style,
                from: layout.base.screen?,
                to: center,
            })
        });

        Ok(PreparedItem {
            sprite: target.sprite,
            sprite_id: Arc::clone(self.sprites.id_at(target.sprite)),
            key: target.key,
            resource: Arc::clone(&image.resource),
            mode: layout.mode,
            opacity,
            depth_key,
            clip_vertices,
            screen_corners,
            center,
            geo_corners,
            border: image.border,
            leader_line,
        })
    }
}

fn check_extent(width: f64, height: f64) -> Result<(), SkipReason> {
    if width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0 {
        Ok(())
    } else {
        Err(SkipReason::DegenerateScale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::MapView;
    use crate::projection::Projector;
    use crate::resource::ResourceTable;
    use crate::sprite::{INVALID, ImageInit, SpriteInit, SpriteStore};
    use kurbo::Size;

    const TOKYO: LngLat = LngLat::new(139.7, 35.6);

    fn projector(bearing: f64) -> Projector {
        let view = MapView::new(TOKYO, 16.0, Size::new(800.0, 600.0)).with_bearing(bearing);
        Projector::new(view.camera_state())
    }

    fn resources() -> ResourceTable {
        let mut table = ResourceTable::new();
        table.register("car", ResourceInfo::ready(64, 32));
        table.register("label", ResourceInfo::ready(20, 10));
        table
    }

    fn params(zoom: f64) -> FrameParams {
        FrameParams::new(zoom, &SpriteLayerConfig::default())
    }

    fn target(key: ImageKey) -> RenderTarget {
        RenderTarget {
            sprite: 0,
            key,
            origin_index: INVALID,
        }
    }

    #[test]
    fn pixels_per_meter_rejects_bad_inputs() {
        assert_eq!(effective_pixels_per_meter(0.0, 1.0), 0.0);
        assert_eq!(effective_pixels_per_meter(2.0, f64::NAN), 0.0);
        assert!((effective_pixels_per_meter(2.0, 0.5) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn clamp_keeps_aspect_ratio() {
        assert_eq!(clamp_sprite_pixel_size(200.0, 100.0, 24.0, 100.0), (100.0, 50.0, 0.5));
        assert_eq!(clamp_sprite_pixel_size(6.0, 12.0, 24.0, 100.0), (12.0, 24.0, 2.0));
        assert_eq!(clamp_sprite_pixel_size(50.0, 20.0, 24.0, 100.0), (50.0, 20.0, 1.0));
        // Disabled bounds.
        assert_eq!(clamp_sprite_pixel_size(500.0, 20.0, 0.0, 0.0), (500.0, 20.0, 1.0));
    }

    #[test]
    fn rotation_is_clockwise() {
        let v = rotate_clockwise(Vec2::new(0.0, 1.0), 90.0);
        assert!((v.x - 1.0).abs() < 1e-12);
        assert!(v.y.abs() < 1e-12);
        let east = offset_vector(10.0, 90.0);
        assert!((east.x - 10.0).abs() < 1e-12);
        assert!(east.y.abs() < 1e-12);
    }

    #[test]
    fn bottom_anchor_lifts_the_quad() {
        let shift = anchor_shift(10.0, 5.0, Anchor::BOTTOM, 0.0);
        assert_eq!(shift, Vec2::new(0.0, -5.0));
        let corners = quad_corners(10.0, 5.0, 0.0);
        assert_eq!(corners[0], Vec2::new(-10.0, 5.0));
        assert_eq!(corners[3], Vec2::new(10.0, -5.0));
    }

    #[test]
    fn billboard_is_centered_on_sprite() {
        let mut store: SpriteStore = SpriteStore::new();
        store
            .add_sprite("a", SpriteInit::new(TOKYO).with_image(ImageKey::new(0, 0), ImageInit::new("car")))
            .unwrap();
        let projection = projector(0.0);
        let table = resources();
        let mut cache = CenterCache::new();
        let mut resolver =
            ImageResolver::new(&projection, store.frame_view(), &table, params(16.0), &mut cache);
        let item = resolver.prepare(&target(ImageKey::new(0, 0))).unwrap();
        assert!((item.center.x - 400.0).abs() < 1e-6);
        assert!((item.center.y - 300.0).abs() < 1e-6);
        let width = item.screen_corners[1].x - item.screen_corners[0].x;
        let height = item.screen_corners[2].y - item.screen_corners[0].y;
        assert!((width / height - 2.0).abs() < 1e-9);
        for clip in item.clip_vertices {
            assert_eq!(clip[2], 0.0);
            assert_eq!(clip[3], 1.0);
        }
    }

    #[test]
    fn origin_chain_layouts_are_cached_identically() {
        let mut store: SpriteStore = SpriteStore::new();
        let init = SpriteInit::new(TOKYO)
            .with_image(ImageKey::new(0, 0), ImageInit::new("car").with_offset(30.0, 45.0))
            .with_image(
                ImageKey::new(0, 1),
                ImageInit::new("label").with_origin(ImageKey::new(0, 0), true),
            )
            .with_image(
                ImageKey::new(0, 2),
                ImageInit::new("label")
                    .with_origin(ImageKey::new(0, 1), false)
                    .with_offset(10.0, 180.0),
            );
        store.add_sprite("a", init).unwrap();
        let projection = projector(20.0);
        let table = resources();
        let mut cache = CenterCache::new();
        let mut resolver =
            ImageResolver::new(&projection, store.frame_view(), &table, params(16.0), &mut cache);

        let leaf = resolver.layout(0, ImageKey::new(0, 2)).unwrap();
        let root = resolver.layout(0, ImageKey::new(0, 0)).unwrap();
        let middle = resolver.layout(0, ImageKey::new(0, 1)).unwrap();
        assert_eq!(middle.base, root.anchored);
        assert_eq!(leaf.base, middle.anchorless);
        // Repeated lookups return the same values.
        assert_eq!(resolver.layout(0, ImageKey::new(0, 2)).unwrap(), leaf);
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get(0, ImageKey::new(0, 1)), Some(Ok(middle)));
    }

    #[test]
    fn long_origin_chains_resolve_in_any_order() {
        const LINKS: i32 = 70;
        let root = ImageInit::new("car").with_offset(5.0, 90.0);
        let mut init = SpriteInit::new(TOKYO).with_image(ImageKey::new(0, LINKS - 1), root);
        for order in 0..LINKS - 1 {
            init = init.with_image(
                ImageKey::new(0, order),
                ImageInit::new("label")
                    .with_origin(ImageKey::new(0, order + 1), order % 2 == 0)
                    .with_offset(2.0, 0.0),
            );
        }
        let mut store: SpriteStore = SpriteStore::new();
        store.add_sprite("a", init).unwrap();
        let projection = projector(0.0);
        let table = resources();

        let mut fresh = CenterCache::new();
        let direct =
            ImageResolver::new(&projection, store.frame_view(), &table, params(16.0), &mut fresh)
                .layout(0, ImageKey::new(0, 30));

        let mut warmed = CenterCache::new();
        let mut resolver =
            ImageResolver::new(&projection, store.frame_view(), &table, params(16.0), &mut warmed);
        assert!(resolver.layout(0, ImageKey::new(0, 0)).is_ok());
        let after_leaf = resolver.layout(0, ImageKey::new(0, 30));

        assert!(direct.is_ok());
        assert_eq!(direct, after_leaf);
        assert_eq!(warmed.len(), LINKS as usize);
    }

    #[test]
    fn surface_world_size_ignores_camera_bearing() {
        let mut store: SpriteStore = SpriteStore::new();
        store
            .add_sprite(
                "a",
                SpriteInit::new(TOKYO).with_image(
                    ImageKey::new(0, 0),
                    ImageInit::new("car").with_mode(RenderMode::Surface),
                ),
            )
            .unwrap();
        let table = resources();
        let frame = params(14.0);
        let mut sizes = Vec::new();
        for bearing in [0.0, 90.0, 233.0] {
            let projection = projector(bearing);
            let mut cache = CenterCache::new();
            let mut resolver =
                ImageResolver::new(&projection, store.frame_view(), &table, frame, &mut cache);
            let layout = resolver.layout(0, ImageKey::new(0, 0)).unwrap();
            sizes.push((layout.half_width * 2.0, layout.half_height * 2.0));
            let item = resolver.prepare(&target(ImageKey::new(0, 0))).unwrap();
            let corners = item.geo_corners.unwrap();
            let measured = corners[0].distance_meters(&corners[1]);
            assert!((measured - 64.0 * frame.zoom_scale_factor).abs() < 1e-3);
        }
        for (width, height) in sizes {
            assert!((width - 64.0 * frame.zoom_scale_factor).abs() < 1e-9);
            assert!((height - 32.0 * frame.zoom_scale_factor).abs() < 1e-9);
        }
    }

    #[test]
    fn unready_and_transparent_images_are_skipped() {
        let mut store: SpriteStore = SpriteStore::new();
        let mut ghost = ImageInit::new("car");
        ghost.opacity = 0.0;
        store
            .add_sprite(
                "a",
                SpriteInit::new(TOKYO)
                    .with_image(ImageKey::new(0, 0), ImageInit::new("car"))
                    .with_image(ImageKey::new(0, 1), ghost)
                    .with_image(ImageKey::new(0, 2), ImageInit::new("nowhere")),
            )
            .unwrap();
        let mut table = resources();
        table.set_texture_ready("car", false);
        let projection = projector(0.0);
        let mut cache = CenterCache::new();
        let mut resolver =
            ImageResolver::new(&projection, store.frame_view(), &table, params(16.0), &mut cache);
        assert_eq!(
            resolver.prepare(&target(ImageKey::new(0, 0))),
            Err(SkipReason::TextureNotReady)
        );
        assert_eq!(
            resolver.prepare(&target(ImageKey::new(0, 1))),
            Err(SkipReason::Transparent)
        );
        assert_eq!(
            resolver.prepare(&target(ImageKey::new(0, 2))),
            Err(SkipReason::MissingResource)
        );
    }

    #[test]
    fn missing_origin_resource_is_unresolved() {
        let mut store: SpriteStore = SpriteStore::new();
        store
            .add_sprite(
                "a",
                SpriteInit::new(TOKYO)
                    .with_image(ImageKey::new(0, 0), ImageInit::new("nowhere"))
                    .with_image(
                        ImageKey::new(0, 1),
                        ImageInit::new("label").with_origin(ImageKey::new(0, 0), true),
                    ),
            )
            .unwrap();
        let table = resources();
        let projection = projector(0.0);
        let mut cache = CenterCache::new();
        let mut resolver =
            ImageResolver::new(&projection, store.frame_view(), &table, params(16.0), &mut cache);
        assert_eq!(
            resolver.prepare(&target(ImageKey::new(0, 1))),
            Err(SkipReason::OriginUnresolved)
        );
    }

    #[test]
    fn skip_counts_total() {
        let mut counts = SkipCounts::default();
        counts.record(SkipReason::Transparent);
        counts.record(SkipReason::Transparent);
        counts.record(SkipReason::ProjectionFailed);
        assert_eq!(counts.transparent, 2);
        assert_eq!(counts.total(), 3);
    }
}
