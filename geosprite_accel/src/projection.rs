// Copyright 2026 the Geosprite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Flat-matrix projection.

use geosprite_core::camera::CameraState;
use geosprite_core::geo::{LngLat, MercatorCoordinate};
use geosprite_core::projection::{MIN_CLIP_W, ProjectionAdapter};
use kurbo::{Point, Size};

/// [`ProjectionAdapter`] over flat column-major `[f64; 16]` matrices.
///
/// Built once per frame and shared by every worker. The products are
/// evaluated in the same order as
/// [`Transform3d::transform_point`](geosprite_core::transform::Transform3d::transform_point),
/// so results match the reference projector bit for bit on the same
/// platform.
#[derive(Clone, Copy, Debug)]
pub struct FlatProjection {
    viewport: Size,
    world_size: f64,
    camera_to_center_distance: f64,
    mercator: [f64; 16],
    pixel: [f64; 16],
    inverse_pixel: Option<[f64; 16]>,
}

/// `m · v` for a column-major `m`.
#[inline]
fn mul(m: &[f64; 16], v: [f64; 4]) -> [f64; 4] {
    let mut out = [0.0; 4];
    for (row, o) in out.iter_mut().enumerate() {
        *o = m[row] * v[0] + m[4 + row] * v[1] + m[8 + row] * v[2] + m[12 + row] * v[3];
    }
    out
}

impl FlatProjection {
    /// Flattens a camera snapshot.
    #[must_use]
    pub fn new(camera: &CameraState) -> Self {
        let inverse_pixel = if camera.pixel_matrix.is_finite() {
            camera.pixel_matrix.inverse().map(|m| m.to_cols_array())
        } else {
            None
        };
        Self {
            viewport: camera.viewport,
            world_size: camera.world_size,
            camera_to_center_distance: camera.camera_to_center_distance,
            mercator: camera.mercator_matrix.to_cols_array(),
            pixel: camera.pixel_matrix.to_cols_array(),
            inverse_pixel,
        }
    }

    fn mercator_clip(&self, location: &LngLat) -> [f64; 4] {
        let m = MercatorCoordinate::from_lng_lat(location);
        mul(&self.mercator, [m.x, m.y, m.z, 1.0])
    }
}

impl ProjectionAdapter for FlatProjection {
    fn viewport(&self) -> Size {
        self.viewport
    }

    fn project(&self, location: &LngLat) -> Option<Point> {
        let m = MercatorCoordinate::from_lng_lat(location);
        let elevation = location.altitude();
        let elevation = if elevation.is_finite() { elevation } else { 0.0 };
        let ws = self.world_size;
        let [x, y, _, w] = mul(&self.pixel, [m.x * ws, m.y * ws, elevation, 1.0]);
        if !w.is_finite() || w <= 0.0 {
            return None;
        }
        let point = Point::new(x / w, y / w);
        point.is_finite().then_some(point)
    }

    fn unproject(&self, point: Point) -> Option<LngLat> {
        let inverse = self.inverse_pixel.as_ref()?;
        if !point.is_finite() {
            return None;
        }
        let a = mul(inverse, [point.x, point.y, 0.0, 1.0]);
        let b = mul(inverse, [point.x, point.y, 1.0, 1.0]);
        if a[3] == 0.0 || b[3] == 0.0 {
            return None;
        }
        let (x0, y0, z0) = (a[0] / a[3], a[1] / a[3], a[2] / a[3]);
        let (x1, y1, z1) = (b[0] / b[3], b[1] / b[3], b[2] / b[3]);
        if z0 == z1 {
            return None;
        }
        let t = -z0 / (z1 - z0);
        let ws = self.world_size;
        let location = MercatorCoordinate {
            x: (x0 + (x1 - x0) * t) / ws,
            y: (y0 + (y1 - y0) * t) / ws,
            z: 0.0,
        }
        .to_lng_lat();
        location.is_finite().then_some(location)
    }

    fn to_clip_space(&self, location: &LngLat) -> Option<[f64; 4]> {
        let clip = self.mercator_clip(location);
        if clip.iter().any(|v| !v.is_finite()) || clip[3] <= MIN_CLIP_W {
            return None;
        }
        Some(clip)
    }

    fn perspective_ratio(&self, location: &LngLat) -> f64 {
        let w = self.mercator_clip(location)[3];
        if !w.is_finite() || w <= 0.0 {
            return 1.0;
        }
        let ratio = self.camera_to_center_distance / w;
        if ratio.is_finite() && ratio > 0.0 {
            ratio
        } else {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geosprite_core::camera::MapView;
    use geosprite_core::projection::Projector;

    fn camera() -> CameraState {
        MapView::new(LngLat::new(-122.42, 37.77), 17.0, Size::new(1024.0, 768.0))
            .with_pitch(60.0)
            .with_bearing(-35.0)
            .camera_state()
    }

    #[test]
    fn agrees_with_reference_projector() {
        let camera = camera();
        let flat = FlatProjection::new(&camera);
        let reference = Projector::new(camera);
        for i in 0..20 {
            let d = f64::from(i) * 1e-4;
            let location = LngLat::new(-122.42 + d, 37.77 - d * 0.5);
            assert_eq!(flat.project(&location), reference.project(&location));
            assert_eq!(flat.to_clip_space(&location), reference.to_clip_space(&location));
            assert_eq!(
                flat.perspective_ratio(&location),
                reference.perspective_ratio(&location)
            );
            let screen = Point::new(100.0 + f64::from(i) * 40.0, 500.0);
            assert_eq!(flat.unproject(screen), reference.unproject(screen));
        }
    }

    #[test]
    fn singular_pixel_matrix_cannot_unproject() {
        let mut camera = camera();
        camera.pixel_matrix = geosprite_core::transform::Transform3d::from_scale(0.0, 1.0, 1.0);
        let flat = FlatProjection::new(&camera);
        assert!(flat.unproject(Point::new(10.0, 10.0)).is_none());
    }
}
