// Copyright 2026 the Geosprite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geographic projection adapter.
//!
//! [`ProjectionAdapter`] is the single seam through which placement code
//! touches the camera. Every method is total: projection failures surface as
//! `None` (or a neutral fallback for [`perspective_ratio`]) and callers treat
//! them as "cannot render this vertex this frame".
//!
//! [`Projector`] is the reference implementation over a [`CameraState`]. It
//! caches the inverse pixel matrix so that repeated `unproject` calls within
//! a frame do not re-invert.
//!
//! [`perspective_ratio`]: ProjectionAdapter::perspective_ratio

use kurbo::{Point, Size};

use crate::camera::CameraState;
use crate::geo::{LngLat, MercatorCoordinate};
use crate::transform::Transform3d;

/// Clip-space `w` at or below this value is treated as a near-plane
/// degeneracy.
pub const MIN_CLIP_W: f64 = 1e-6;

/// Camera-dependent conversions used by the placement resolver and the depth
/// sorter.
pub trait ProjectionAdapter {
    /// Viewport size in pixels.
    fn viewport(&self) -> Size;

    /// Projects a location to screen pixels (top-left origin, y down).
    ///
    /// Returns `None` when the point is behind the camera or the result is
    /// not finite.
    fn project(&self, location: &LngLat) -> Option<Point>;

    /// Intersects the screen ray through `point` with the `z = 0` map plane.
    fn unproject(&self, point: Point) -> Option<LngLat>;

    /// Projects a location to homogeneous clip space through the mercator
    /// matrix.
    ///
    /// Returns `None` when any component is not finite or `w ≤ 1e-6`.
    fn to_clip_space(&self, location: &LngLat) -> Option<[f64; 4]>;

    /// Ratio of the camera-to-center distance to the clip `w` at `location`.
    ///
    /// Falls back to `1.0` when the ratio cannot be computed.
    fn perspective_ratio(&self, location: &LngLat) -> f64;

    /// Converts a clip-space position to screen pixels.
    fn clip_to_screen(&self, clip: [f64; 4]) -> Option<Point> {
        let [x, y, _, w] = clip;
        if !(w.is_finite() && w > MIN_CLIP_W) {
            return None;
        }
        let size = self.viewport();
        let point = Point::new(
            (x / w + 1.0) * 0.5 * size.width,
            (1.0 - y / w) * 0.5 * size.height,
        );
        point.is_finite().then_some(point)
    }

    /// Converts screen pixels to normalized device `(x, y)`.
    fn screen_to_clip(&self, point: Point) -> (f64, f64) {
        let size = self.viewport();
        (
            point.x / size.width * 2.0 - 1.0,
            1.0 - point.y / size.height * 2.0,
        )
    }
}

/// Reference [`ProjectionAdapter`] over a [`CameraState`].
#[derive(Clone, Debug)]
pub struct Projector {
    camera: CameraState,
    inverse_pixel_matrix: Option<Transform3d>,
}

impl Projector {
    /// Creates a projector for one frame's camera.
    #[must_use]
    pub fn new(camera: CameraState) -> Self {
        let inverse_pixel_matrix = if camera.pixel_matrix.is_finite() {
            camera.pixel_matrix.inverse()
        } else {
            None
        };
        Self {
            camera,
            inverse_pixel_matrix,
        }
    }

    /// The camera this projector was built from.
    #[must_use]
    pub fn camera(&self) -> &CameraState {
        &self.camera
    }
}

impl ProjectionAdapter for Projector {
    fn viewport(&self) -> Size {
        self.camera.viewport
    }

    fn project(&self, location: &LngLat) -> Option<Point> {
        let m = MercatorCoordinate::from_lng_lat(location);
        let ws = self.camera.world_size;
        let elevation = if location.altitude().is_finite() {
            location.altitude()
        } else {
            0.0
        };
        let [x, y, _, w] = self
            .camera
            .pixel_matrix
            .transform_point([m.x * ws, m.y * ws, elevation, 1.0]);
        if !w.is_finite() || w <= 0.0 {
            return None;
        }
        let point = Point::new(x / w, y / w);
        point.is_finite().then_some(point)
    }

    fn unproject(&self, point: Point) -> Option<LngLat> {
        let inverse = self.inverse_pixel_matrix.as_ref()?;
        if !point.is_finite() {
            return None;
        }
        let a = inverse.transform_point([point.x, point.y, 0.0, 1.0]);
        let b = inverse.transform_point([point.x, point.y, 1.0, 1.0]);
        if a[3] == 0.0 || b[3] == 0.0 {
            return None;
        }
        let (x0, y0, z0) = (a[0] / a[3], a[1] / a[3], a[2] / a[3]);
        let (x1, y1, z1) = (b[0] / b[3], b[1] / b[3], b[2] / b[3]);
        if z0 == z1 {
            return None;
        }
        let t = -z0 / (z1 - z0);
        let ws = self.camera.world_size;
        let mercator = MercatorCoordinate {
            x: (x0 + (x1 - x0) * t) / ws,
            y: (y0 + (y1 - y0) * t) / ws,
            z: 0.0,
        };
        let location = mercator.to_lng_lat();
        location.is_finite().then_some(location)
    }

    fn to_clip_space(&self, location: &LngLat) -> Option<[f64; 4]> {
        let m = MercatorCoordinate::from_lng_lat(location);
        let clip = self
            .camera
            .mercator_matrix
            .transform_point([m.x, m.y, m.z, 1.0]);
        if clip.iter().any(|v| !v.is_finite()) || clip[3] <= MIN_CLIP_W {
            return None;
        }
        Some(clip)
    }

    fn perspective_ratio(&self, location: &LngLat) -> f64 {
        let m = MercatorCoordinate::from_lng_lat(location);
        let w = self
            .camera
            .mercator_matrix
            .transform_point([m.x, m.y, m.z, 1.0])[3];
        if !w.is_finite() || w <= 0.0 {
            return 1.0;
        }
        let ratio = self.camera.camera_to_center_distance / w;
        if ratio.is_finite() && ratio > 0.0 {
            ratio
        } else {
            1.0
        }
    }
}
