// Copyright 2026 the Geosprite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Camera snapshot handed over by the host map.
//!
//! The engine never owns a camera. Each frame the host supplies a
//! [`CameraState`] carrying the two matrices the host renders with:
//!
//! - the **mercator matrix**, mapping normalized mercator coordinates
//!   (`0..1` across the world, `z` in mercator units) to clip space, and
//! - the **pixel matrix**, mapping world pixels (`x`, `y` in world pixels,
//!   `z` in meters) to screen pixels with a top-left origin.
//!
//! [`MapView`] builds both matrices the same way the host map does, from a
//! center / zoom / pitch / bearing / viewport description. Hosts that already
//! have matrices construct [`CameraState`] directly.

use core::f64::consts::PI;

use kurbo::Size;

use crate::geo::{LngLat, MercatorCoordinate, TILE_SIZE, mercator_z_from_altitude};
use crate::transform::Transform3d;

/// Vertical field of view of the host map camera (radians).
pub const DEFAULT_FOV_Y: f64 = 0.643_501_108_793_284_4;

/// Snapshot of the host camera for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraState {
    /// Fractional zoom level.
    pub zoom: f64,
    /// Size of the world in pixels at this zoom (`512 × 2^zoom`).
    pub world_size: f64,
    /// Distance from the camera to the map center, in pixels.
    pub camera_to_center_distance: f64,
    /// Viewport size in CSS pixels.
    pub viewport: Size,
    /// Normalized mercator → clip space.
    pub mercator_matrix: Transform3d,
    /// World pixels (`z` in meters) → screen pixels.
    pub pixel_matrix: Transform3d,
}

impl CameraState {
    /// Whether both matrices and the scalar inputs are usable.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.world_size.is_finite()
            && self.world_size > 0.0
            && self.camera_to_center_distance.is_finite()
            && self.viewport.width > 0.0
            && self.viewport.height > 0.0
            && self.mercator_matrix.is_finite()
            && self.pixel_matrix.is_finite()
    }
}

/// Host-compatible camera description.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MapView {
    /// Map center.
    pub center: LngLat,
    /// Fractional zoom level.
    pub zoom: f64,
    /// Tilt away from straight-down, in degrees.
    pub pitch_deg: f64,
    /// Rotation of the map, in degrees clockwise from north.
    pub bearing_deg: f64,
    /// Viewport size in CSS pixels.
    pub viewport: Size,
    /// Vertical field of view (radians).
    pub fov_y: f64,
}

impl MapView {
    /// Creates a top-down view with no bearing.
    #[must_use]
    pub fn new(center: LngLat, zoom: f64, viewport: Size) -> Self {
        Self {
            center,
            zoom,
            pitch_deg: 0.0,
            bearing_deg: 0.0,
            viewport,
            fov_y: DEFAULT_FOV_Y,
        }
    }

    /// Returns a copy with the given pitch.
    #[must_use]
    pub fn with_pitch(mut self, pitch_deg: f64) -> Self {
        self.pitch_deg = pitch_deg;
        self
    }

    /// Returns a copy with the given bearing.
    #[must_use]
    pub fn with_bearing(mut self, bearing_deg: f64) -> Self {
        self.bearing_deg = bearing_deg;
        self
    }

    /// Builds the camera snapshot.
    #[must_use]
    pub fn camera_state(&self) -> CameraState {
        let width = self.viewport.width;
        let height = self.viewport.height;
        let world_size = TILE_SIZE * 2_f64.powf(self.zoom);
        let half_fov = self.fov_y / 2.0;
        let pitch = self.pitch_deg.to_radians();
        let angle = -self.bearing_deg.to_radians();
        let camera_to_center_distance = 0.5 / half_fov.tan() * height;

        // Far plane reaches the furthest visible ground point.
        let ground_angle = PI / 2.0 + pitch;
        let top_half_surface_distance = half_fov.sin() * camera_to_center_distance
            / (PI - ground_angle - half_fov).clamp(0.01, PI - 0.01).sin();
        let furthest_distance =
            (PI / 2.0 - pitch).cos() * top_half_surface_distance + camera_to_center_distance;
        let far = furthest_distance * 1.01;
        let near = height / 50.0;

        let center = MercatorCoordinate::from_lng_lat(&self.center);
        let view = Transform3d::perspective(self.fov_y, width / height, near, far)
            * Transform3d::from_scale(1.0, -1.0, 1.0)
            * Transform3d::from_translation(0.0, 0.0, -camera_to_center_distance)
            * Transform3d::from_rotation_x(pitch)
            * Transform3d::from_rotation_z(angle)
            * Transform3d::from_translation(-center.x * world_size, -center.y * world_size, 0.0);

        let mercator_matrix = view * Transform3d::from_scale(world_size, world_size, world_size);

        let pixels_per_meter = mercator_z_from_altitude(1.0, self.center.lat) * world_size;
        let label_plane = Transform3d::from_scale(width / 2.0, -height / 2.0, 1.0)
            * Transform3d::from_translation(1.0, -1.0, 0.0);
        let pixel_matrix =
            label_plane * view * Transform3d::from_scale(1.0, 1.0, pixels_per_meter);

        CameraState {
            zoom: self.zoom,
            world_size,
            camera_to_center_distance,
            viewport: self.viewport,
            mercator_matrix,
            pixel_matrix,
        }
    }
}
