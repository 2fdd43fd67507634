// Copyright 2026 the Geosprite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer-wide configuration.
//!
//! All config types are plain data. With the `serde` feature they derive
//! `Serialize`/`Deserialize` so hosts can load them from their own settings.

/// Sprite sizing rules.
///
/// A sprite image's size in meters is `image_px × meters_per_pixel × scale ×
/// zoom_scale_factor(zoom)`. The on-screen size is then clamped so that its
/// larger side stays within `[sprite_min_pixel, sprite_max_pixel]`; a bound
/// of `0` disables that side of the clamp.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ScalingOptions {
    /// Meters covered by one image pixel at scale 1.
    pub meters_per_pixel: f64,
    /// Zoom level at which `scale_min` applies.
    pub zoom_min: f64,
    /// Zoom level at which `scale_max` applies.
    pub zoom_max: f64,
    /// Scale factor at and below `zoom_min`.
    pub scale_min: f64,
    /// Scale factor at and above `zoom_max`.
    pub scale_max: f64,
    /// Lower bound for the larger on-screen side, in pixels.
    pub sprite_min_pixel: f64,
    /// Upper bound for the larger on-screen side, in pixels.
    pub sprite_max_pixel: f64,
}

impl Default for ScalingOptions {
    fn default() -> Self {
        Self::unlimited()
    }
}

impl ScalingOptions {
    /// No zoom-dependent scaling and no pixel clamp.
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            meters_per_pixel: 1.0,
            zoom_min: 0.0,
            zoom_max: 24.0,
            scale_min: 1.0,
            scale_max: 1.0,
            sprite_min_pixel: 0.0,
            sprite_max_pixel: 0.0,
        }
    }

    /// Shrinks sprites when zoomed out and keeps them readable on screen.
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            meters_per_pixel: 1.0,
            zoom_min: 8.0,
            zoom_max: 20.0,
            scale_min: 0.1,
            scale_max: 1.0,
            sprite_min_pixel: 24.0,
            sprite_max_pixel: 100.0,
        }
    }

    /// Returns a copy with invalid values replaced and inverted ranges
    /// swapped.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let defaults = Self::unlimited();
        let positive_or = |v: f64, fallback: f64| {
            if v.is_finite() && v > 0.0 { v } else { fallback }
        };
        let non_negative = |v: f64| if v.is_finite() && v > 0.0 { v } else { 0.0 };

        let meters_per_pixel = positive_or(self.meters_per_pixel, defaults.meters_per_pixel);
        let mut zoom_min = if self.zoom_min.is_finite() {
            self.zoom_min
        } else {
            defaults.zoom_min
        };
        let mut zoom_max = if self.zoom_max.is_finite() {
            self.zoom_max
        } else {
            defaults.zoom_max
        };
        if zoom_min > zoom_max {
            core::mem::swap(&mut zoom_min, &mut zoom_max);
        }
        let mut scale_min = non_negative(self.scale_min);
        let mut scale_max = non_negative(self.scale_max);
        if scale_min > scale_max {
            core::mem::swap(&mut scale_min, &mut scale_max);
        }
        let mut sprite_min_pixel = non_negative(self.sprite_min_pixel);
        let mut sprite_max_pixel = non_negative(self.sprite_max_pixel);
        if sprite_max_pixel > 0.0 && sprite_min_pixel > sprite_max_pixel {
            core::mem::swap(&mut sprite_min_pixel, &mut sprite_max_pixel);
        }
        Self {
            meters_per_pixel,
            zoom_min,
            zoom_max,
            scale_min,
            scale_max,
            sprite_min_pixel,
            sprite_max_pixel,
        }
    }

    /// Linear scale factor for `zoom`, clamped to `[scale_min, scale_max]`.
    #[must_use]
    pub fn zoom_scale_factor(&self, zoom: f64) -> f64 {
        if !zoom.is_finite() {
            return self.scale_max;
        }
        if self.zoom_max <= self.zoom_min {
            return if zoom < self.zoom_min {
                self.scale_min
            } else {
                self.scale_max
            };
        }
        let t = ((zoom - self.zoom_min) / (self.zoom_max - self.zoom_min)).clamp(0.0, 1.0);
        self.scale_min + (self.scale_max - self.scale_min) * t
    }
}

/// Depth bias applied to surface quads so coplanar images keep their
/// sub-layer and order stacking in the depth buffer.
///
/// The bias index of an image is `sub_layer × order_bucket + min(order,
/// order_max − 1)`, clamped at zero; the clip `z` moves towards the camera by
/// `index × epsilon_ndc × w`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DepthBiasConfig {
    /// Whether the bias is applied at all.
    pub enabled: bool,
    /// Bias slots reserved per sub-layer.
    pub order_bucket: u32,
    /// Orders at or above `order_max − 1` share the top slot.
    pub order_max: u32,
    /// NDC distance between adjacent bias slots.
    pub epsilon_ndc: f64,
    /// Minimum distance kept from the near plane after biasing.
    pub min_clip_z_epsilon: f64,
}

impl Default for DepthBiasConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            order_bucket: 16,
            order_max: 16,
            epsilon_ndc: 1e-6,
            min_clip_z_epsilon: 1e-7,
        }
    }
}

impl DepthBiasConfig {
    /// Bias in NDC units for an image at `(sub_layer, order)`. Never
    /// positive.
    #[must_use]
    pub fn bias_ndc(&self, sub_layer: i32, order: i32) -> f64 {
        if !self.enabled {
            return 0.0;
        }
        let order_cap = i64::from(self.order_max.max(1)) - 1;
        let index = i64::from(sub_layer) * i64::from(self.order_bucket)
            + i64::from(order).min(order_cap);
        let index = index.max(0) as f64;
        -index * self.epsilon_ndc
    }
}

/// Configuration of one sprite layer.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SpriteLayerConfig {
    /// Sizing rules.
    pub scaling: ScalingOptions,
    /// Surface depth bias.
    pub depth_bias: DepthBiasConfig,
    /// Minimum distance a sprite must move before its heading updates.
    pub auto_rotation_min_distance_meters: f64,
}

impl Default for SpriteLayerConfig {
    fn default() -> Self {
        Self {
            scaling: ScalingOptions::default(),
            depth_bias: DepthBiasConfig::default(),
            auto_rotation_min_distance_meters: 20.0,
        }
    }
}
