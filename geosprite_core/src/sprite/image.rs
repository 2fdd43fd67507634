// Copyright 2026 the Geosprite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-image attributes and animated state.

use alloc::sync::Arc;

use crate::interpolation::{AnimatedValue, Degrees, InterpolationOptions};

use super::id::ImageKey;

/// How an image is oriented relative to the camera.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RenderMode {
    /// Always faces the screen; sized in screen pixels.
    #[default]
    Billboard,
    /// Lies flat on the map; sized in meters.
    Surface,
}

/// Point of the image placed at its base, in `-1..=1` per axis.
///
/// `(0, 0)` is the image center, `(-1, 1)` the top-left corner and `(0, -1)`
/// the bottom edge midpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Anchor {
    /// Horizontal position, right positive.
    pub x: f64,
    /// Vertical position, up positive.
    pub y: f64,
}

impl Anchor {
    /// The image center.
    pub const CENTER: Self = Self { x: 0.0, y: 0.0 };
    /// Midpoint of the bottom edge.
    pub const BOTTOM: Self = Self { x: 0.0, y: -1.0 };

    /// Creates an anchor, clamping each axis to `-1..=1`.
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        let clamp = |v: f64| if v.is_finite() { v.clamp(-1.0, 1.0) } else { 0.0 };
        Self {
            x: clamp(x),
            y: clamp(y),
        }
    }
}

/// Anchors an image to another image of the same sprite instead of the
/// sprite location.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OriginReference {
    /// Referenced image.
    pub key: ImageKey,
    /// Use the referenced image's anchored center (`true`) or its center
    /// before the anchor shift (`false`).
    pub use_resolved_anchor: bool,
}

/// An RGBA color with components in `0..=1`.
pub type Rgba = [f32; 4];

/// Outline drawn around the image quad.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Border {
    /// Stroke color.
    pub color: Rgba,
    /// Stroke width in screen pixels.
    pub width_px: f64,
}

/// Line from the image's base point to its center.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LeaderLine {
    /// Stroke color.
    pub color: Rgba,
    /// Stroke width in screen pixels.
    pub width_px: f64,
}

/// Interpolation applied when an image channel is commanded.
///
/// `None` snaps the channel.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImageInterpolation {
    /// Offset distance and bearing.
    pub offset: Option<InterpolationOptions>,
    /// Displayed rotation (manual and auto-rotation).
    pub rotation: Option<InterpolationOptions>,
    /// Opacity.
    pub opacity: Option<InterpolationOptions>,
}

/// Attributes of a new image.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageInit {
    /// Image resource drawn by this image.
    pub resource: Arc<str>,
    /// Orientation.
    pub mode: RenderMode,
    /// Size multiplier.
    pub scale: f64,
    /// Point placed at the base.
    pub anchor: Anchor,
    /// Offset distance from the base, in meters.
    pub offset_meters: f64,
    /// Offset bearing, in degrees clockwise from north (surface) or
    /// screen-up (billboard).
    pub offset_deg: f64,
    /// Manual rotation, degrees clockwise.
    pub rotate_deg: f64,
    /// Adds the sprite's heading to the rotation and offset bearing.
    pub auto_rotation: bool,
    /// Opacity in `0..=1`.
    pub opacity: f64,
    /// Optional origin image.
    pub origin: Option<OriginReference>,
    /// Optional outline.
    pub border: Option<Border>,
    /// Optional leader line.
    pub leader_line: Option<LeaderLine>,
    /// Interpolation of later updates.
    pub interpolation: ImageInterpolation,
}

impl ImageInit {
    /// A centered, unrotated, fully opaque billboard of `resource`.
    #[must_use]
    pub fn new(resource: impl Into<Arc<str>>) -> Self {
        Self {
            resource: resource.into(),
            mode: RenderMode::Billboard,
            scale: 1.0,
            anchor: Anchor::CENTER,
            offset_meters: 0.0,
            offset_deg: 0.0,
            rotate_deg: 0.0,
            auto_rotation: false,
            opacity: 1.0,
            origin: None,
            border: None,
            leader_line: None,
            interpolation: ImageInterpolation::default(),
        }
    }

    /// Returns a copy with the given render mode.
    #[must_use]
    pub fn with_mode(mut self, mode: RenderMode) -> Self {
        self.mode = mode;
        self
    }

    /// Returns a copy anchored to another image.
    #[must_use]
    pub fn with_origin(mut self, key: ImageKey, use_resolved_anchor: bool) -> Self {
        self.origin = Some(OriginReference {
            key,
            use_resolved_anchor,
        });
        self
    }

    /// Returns a copy with the given anchor.
    #[must_use]
    pub fn with_anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = anchor;
        self
    }

    /// Returns a copy with the given offset.
    #[must_use]
    pub fn with_offset(mut self, meters: f64, deg: f64) -> Self {
        self.offset_meters = meters;
        self.offset_deg = deg;
        self
    }
}

/// Partial update of an image. `None` fields are left unchanged.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImageUpdate {
    /// New resource.
    pub resource: Option<Arc<str>>,
    /// New render mode.
    pub mode: Option<RenderMode>,
    /// New scale.
    pub scale: Option<f64>,
    /// New anchor.
    pub anchor: Option<Anchor>,
    /// New offset distance (animated).
    pub offset_meters: Option<f64>,
    /// New offset bearing (animated).
    pub offset_deg: Option<f64>,
    /// New manual rotation (animated).
    pub rotate_deg: Option<f64>,
    /// Toggle auto-rotation.
    pub auto_rotation: Option<bool>,
    /// New opacity (animated).
    pub opacity: Option<f64>,
    /// Set or clear the origin reference.
    pub origin: Option<Option<OriginReference>>,
    /// Set or clear the border.
    pub border: Option<Option<Border>>,
    /// Set or clear the leader line.
    pub leader_line: Option<Option<LeaderLine>>,
    /// New interpolation settings, applied to this update's commands.
    pub interpolation: Option<ImageInterpolation>,
}

/// Current state of one image.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageState {
    /// Image resource drawn by this image.
    pub resource: Arc<str>,
    /// Orientation.
    pub mode: RenderMode,
    /// Size multiplier.
    pub scale: f64,
    /// Point placed at the base.
    pub anchor: Anchor,
    /// Offset distance in meters.
    pub offset_meters: AnimatedValue<f64>,
    /// Offset bearing.
    pub offset_deg: AnimatedValue<Degrees>,
    /// Manual rotation in degrees.
    pub rotate_deg: f64,
    /// Whether the sprite heading contributes.
    pub auto_rotation: bool,
    /// Heading contribution, zero unless auto-rotating.
    pub resolved_base_rotate_deg: f64,
    /// Rotation actually drawn: `resolved_base_rotate_deg + rotate_deg`.
    pub displayed_rotate: AnimatedValue<Degrees>,
    /// Opacity in `0..=1`.
    pub opacity: AnimatedValue<f64>,
    /// Optional origin image.
    pub origin: Option<OriginReference>,
    /// Optional outline.
    pub border: Option<Border>,
    /// Optional leader line.
    pub leader_line: Option<LeaderLine>,
    /// Interpolation of later updates.
    pub interpolation: ImageInterpolation,
}

impl ImageState {
    pub(crate) fn from_init(init: ImageInit, heading_deg: Option<f64>) -> Self {
        let resolved_base_rotate_deg = if init.auto_rotation {
            heading_deg.unwrap_or(0.0)
        } else {
            0.0
        };
        Self {
            resource: init.resource,
            mode: init.mode,
            scale: init.scale,
            anchor: init.anchor,
            offset_meters: AnimatedValue::new(init.offset_meters),
            offset_deg: AnimatedValue::new(Degrees::new(init.offset_deg)),
            rotate_deg: init.rotate_deg,
            auto_rotation: init.auto_rotation,
            resolved_base_rotate_deg,
            displayed_rotate: AnimatedValue::new(Degrees::new(
                resolved_base_rotate_deg + init.rotate_deg,
            )),
            opacity: AnimatedValue::new(clamp_opacity(init.opacity)),
            origin: init.origin,
            border: init.border,
            leader_line: init.leader_line,
            interpolation: init.interpolation,
        }
    }

    /// Offset bearing actually applied: the offset bearing plus the heading
    /// contribution.
    #[must_use]
    pub fn offset_bearing_deg(&self) -> f64 {
        self.offset_deg.current().get() + self.resolved_base_rotate_deg
    }

    /// Whether any channel is tweening.
    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.offset_meters.is_animating()
            || self.offset_deg.is_animating()
            || self.displayed_rotate.is_animating()
            || self.opacity.is_animating()
    }

    /// Whether the image can contribute pixels now or while fading.
    ///
    /// A change of this flag changes the render target set.
    #[must_use]
    pub fn is_visible_class(&self) -> bool {
        self.opacity.current() > 0.0 || self.opacity.is_animating()
    }

    /// Commands the displayed rotation from the current heading and manual
    /// rotation.
    pub(crate) fn command_rotation(&mut self, heading_deg: Option<f64>) {
        self.resolved_base_rotate_deg = if self.auto_rotation {
            heading_deg.unwrap_or(0.0)
        } else {
            0.0
        };
        let target = Degrees::new(self.resolved_base_rotate_deg + self.rotate_deg);
        self.displayed_rotate
            .command(target, self.interpolation.rotation.as_ref());
    }

    /// Applies a partial update. Origin validation happens in the store
    /// beforehand.
    ///
    /// New interpolation settings replace all three channels' options. A
    /// channel whose options become `None` drops its running tween and
    /// settles on its last commanded value before this update's commands
    /// apply.
    pub(crate) fn apply(&mut self, update: ImageUpdate, heading_deg: Option<f64>) {
        if let Some(interpolation) = update.interpolation {
            self.interpolation = interpolation;
            if interpolation.offset.is_none() {
                self.offset_meters.collapse();
                self.offset_deg.collapse();
            }
            if interpolation.rotation.is_none() {
                self.displayed_rotate.collapse();
            }
            if interpolation.opacity.is_none() {
                self.opacity.collapse();
            }
        }
        if let Some(resource) = update.resource {
            self.resource = resource;
        }
        if let Some(mode) = update.mode {
            self.mode = mode;
        }
        if let Some(scale) = update.scale {
            self.scale = scale;
        }
        if let Some(anchor) = update.anchor {
            self.anchor = anchor;
        }
        if let Some(meters) = update.offset_meters {
            self.offset_meters
                .command(meters, self.interpolation.offset.as_ref());
        }
        if let Some(deg) = update.offset_deg {
            self.offset_deg
                .command(Degrees::new(deg), self.interpolation.offset.as_ref());
        }
        let mut rotation_changed = false;
        if let Some(rotate_deg) = update.rotate_deg {
            self.rotate_deg = rotate_deg;
            rotation_changed = true;
        }
        if let Some(auto_rotation) = update.auto_rotation {
            rotation_changed |= auto_rotation != self.auto_rotation;
            self.auto_rotation = auto_rotation;
        }
        if rotation_changed {
            self.command_rotation(heading_deg);
        }
        if let Some(opacity) = update.opacity {
            self.opacity
                .command(clamp_opacity(opacity), self.interpolation.opacity.as_ref());
        }
        if let Some(origin) = update.origin {
            self.origin = origin;
        }
        if let Some(border) = update.border {
            self.border = border;
        }
        if let Some(leader_line) = update.leader_line {
            self.leader_line = leader_line;
        }
    }

    /// Advances every channel. Returns whether any value changed.
    pub(crate) fn advance(&mut self, now_ms: f64) -> bool {
        let mut changed = self.offset_meters.advance(now_ms);
        changed |= self.offset_deg.advance(now_ms);
        changed |= self.displayed_rotate.advance(now_ms);
        changed |= self.opacity.advance(now_ms);
        changed
    }
}

fn clamp_opacity(opacity: f64) -> f64 {
    if opacity.is_finite() {
        opacity.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchor_is_clamped() {
        assert_eq!(Anchor::new(2.0, -3.0), Anchor { x: 1.0, y: -1.0 });
        assert_eq!(Anchor::new(f64::NAN, 0.5), Anchor { x: 0.0, y: 0.5 });
    }

    #[test]
    fn auto_rotation_adds_heading() {
        let mut init = ImageInit::new("arrow");
        init.auto_rotation = true;
        init.rotate_deg = 10.0;
        let state = ImageState::from_init(init, Some(90.0));
        assert_eq!(state.resolved_base_rotate_deg, 90.0);
        assert_eq!(state.displayed_rotate.current().get(), 100.0);
    }

    #[test]
    fn manual_rotation_ignores_heading() {
        let mut init = ImageInit::new("arrow");
        init.rotate_deg = -30.0;
        let state = ImageState::from_init(init, Some(90.0));
        assert_eq!(state.resolved_base_rotate_deg, 0.0);
        assert_eq!(state.displayed_rotate.current().get(), 330.0);
    }

    #[test]
    fn fading_out_keeps_visible_class_until_done() {
        let mut state = ImageState::from_init(ImageInit::new("a"), None);
        state.apply(
            ImageUpdate {
                opacity: Some(0.0),
                interpolation: Some(ImageInterpolation {
                    opacity: Some(InterpolationOptions::feedback(100.0)),
                    ..ImageInterpolation::default()
                }),
                ..ImageUpdate::default()
            },
            None,
        );
        assert!(state.is_visible_class());
        state.advance(0.0);
        state.advance(100.0);
        assert_eq!(state.opacity.current(), 0.0);
        assert!(!state.is_visible_class());
    }

    #[test]
    fn clearing_interpolation_stops_running_tweens() {
        let mut state = ImageState::from_init(ImageInit::new("a"), None);
        let smooth = InterpolationOptions::feedback(200.0);
        state.apply(
            ImageUpdate {
                opacity: Some(0.0),
                offset_meters: Some(40.0),
                interpolation: Some(ImageInterpolation {
                    offset: Some(smooth),
                    rotation: Some(smooth),
                    opacity: Some(smooth),
                }),
                ..ImageUpdate::default()
            },
            None,
        );
        state.advance(0.0);
        state.advance(100.0);
        assert!((state.opacity.current() - 0.5).abs() < 1e-12);
        assert!((state.offset_meters.current() - 20.0).abs() < 1e-12);

        // Only opacity is cleared; the offset keeps tweening.
        state.apply(
            ImageUpdate {
                interpolation: Some(ImageInterpolation {
                    offset: Some(smooth),
                    rotation: Some(smooth),
                    opacity: None,
                }),
                ..ImageUpdate::default()
            },
            None,
        );
        assert_eq!(state.opacity.current(), 0.0);
        assert!(!state.opacity.is_animating());
        assert!(!state.is_visible_class());
        assert!(state.offset_meters.is_animating());

        state.apply(
            ImageUpdate {
                interpolation: Some(ImageInterpolation::default()),
                ..ImageUpdate::default()
            },
            None,
        );
        assert_eq!(state.offset_meters.current(), 40.0);
        assert!(!state.is_animating());
    }

    #[test]
    fn opacity_is_clamped() {
        let mut init = ImageInit::new("a");
        init.opacity = 3.0;
        assert_eq!(ImageState::from_init(init, None).opacity.current(), 1.0);
    }
}
