// Copyright 2026 the Geosprite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geographic primitives shared by every placement stage.
//!
//! Locations are WGS84 longitude/latitude in degrees with an optional
//! elevation in meters. Web-mercator coordinates are normalized to `0..1`
//! across the world, matching the convention of the host map's transform
//! matrices.

use core::f64::consts::PI;

/// Equatorial earth radius used by the web-mercator projection, in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_378_137.0;

/// Latitude bound of the web-mercator projection, in degrees.
pub const MAX_MERCATOR_LATITUDE: f64 = 85.051129;

/// Size of one zoom-0 tile in world pixels.
pub const TILE_SIZE: f64 = 512.0;

/// Lower bound applied to `cos(latitude)` when converting meters to degrees.
pub const MIN_COS_LAT: f64 = 1e-6;

const DEG2RAD: f64 = PI / 180.0;
const RAD2DEG: f64 = 180.0 / PI;

/// A geographic location.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LngLat {
    /// Longitude in degrees.
    pub lng: f64,
    /// Latitude in degrees.
    pub lat: f64,
    /// Elevation above the map plane in meters, if any.
    pub z: Option<f64>,
}

impl LngLat {
    /// Creates a location on the map plane.
    #[inline]
    #[must_use]
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat, z: None }
    }

    /// Returns a copy carrying the given elevation.
    #[inline]
    #[must_use]
    pub const fn with_z(self, z: f64) -> Self {
        Self {
            lng: self.lng,
            lat: self.lat,
            z: Some(z),
        }
    }

    /// Elevation in meters, zero when absent.
    #[inline]
    #[must_use]
    pub fn altitude(&self) -> f64 {
        self.z.unwrap_or(0.0)
    }

    /// Whether longitude, latitude and (if present) elevation are finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.lng.is_finite() && self.lat.is_finite() && self.z.is_none_or(f64::is_finite)
    }

    /// Great-circle distance to `other` in meters (haversine).
    #[must_use]
    pub fn distance_meters(&self, other: &Self) -> f64 {
        let lat1 = self.lat * DEG2RAD;
        let lat2 = other.lat * DEG2RAD;
        let dlat = lat2 - lat1;
        let dlng = (other.lng - self.lng) * DEG2RAD;
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_METERS * a.sqrt().min(1.0).asin()
    }

    /// Initial great-circle bearing towards `other`, in degrees clockwise
    /// from north, normalized to `[0, 360)`.
    #[must_use]
    pub fn bearing_deg_to(&self, other: &Self) -> f64 {
        let lat1 = self.lat * DEG2RAD;
        let lat2 = other.lat * DEG2RAD;
        let dlng = (other.lng - self.lng) * DEG2RAD;
        let y = dlng.sin() * lat2.cos();
        let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlng.cos();
        normalize_angle_deg(y.atan2(x) * RAD2DEG)
    }

    /// Displaces this location by `east`/`north` meters using a local
    /// equirectangular approximation. Elevation is carried over.
    #[must_use]
    pub fn displaced(&self, east: f64, north: f64) -> Self {
        let delta_lat = (north / EARTH_RADIUS_METERS) * RAD2DEG;
        let cos_lat = (self.lat * DEG2RAD).cos().max(MIN_COS_LAT);
        let delta_lng = (east / (EARTH_RADIUS_METERS * cos_lat)) * RAD2DEG;
        Self {
            lng: self.lng + delta_lng,
            lat: self.lat + delta_lat,
            z: self.z,
        }
    }
}

/// A normalized web-mercator coordinate (`0..1` across the world).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MercatorCoordinate {
    /// Horizontal position, 0 at 180°W.
    pub x: f64,
    /// Vertical position, 0 at the northern projection bound.
    pub y: f64,
    /// Elevation in mercator units at the location's latitude.
    pub z: f64,
}

impl MercatorCoordinate {
    /// Converts a geographic location, clamping latitude to the projection
    /// bound and replacing non-finite components with zero.
    #[must_use]
    pub fn from_lng_lat(location: &LngLat) -> Self {
        let lng = finite_or(location.lng, 0.0);
        let lat = finite_or(location.lat, 0.0).clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE);
        let altitude = finite_or(location.altitude(), 0.0);
        Self {
            x: mercator_x_from_lng(lng),
            y: mercator_y_from_lat(lat),
            z: mercator_z_from_altitude(altitude, lat),
        }
    }

    /// Converts back to a geographic location on the map plane.
    #[must_use]
    pub fn to_lng_lat(&self) -> LngLat {
        let lng = self.x * 360.0 - 180.0;
        let y2 = 180.0 - self.y * 360.0;
        let lat = (360.0 / PI) * (y2 * PI / 180.0).exp().atan() - 90.0;
        LngLat::new(lng, lat.clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE))
    }
}

#[inline]
pub(crate) fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() { value } else { fallback }
}

#[inline]
fn mercator_x_from_lng(lng: f64) -> f64 {
    (180.0 + lng) / 360.0
}

#[inline]
fn mercator_y_from_lat(lat: f64) -> f64 {
    let radians = lat * DEG2RAD;
    (180.0 - RAD2DEG * (PI / 4.0 + radians / 2.0).tan().ln()) / 360.0
}

/// Earth circumference along the parallel at `lat_deg`, in meters.
#[inline]
#[must_use]
pub fn circumference_at_latitude(lat_deg: f64) -> f64 {
    2.0 * PI * EARTH_RADIUS_METERS * (lat_deg * DEG2RAD).cos()
}

/// Converts an elevation in meters to mercator units at `lat_deg`.
#[inline]
#[must_use]
pub fn mercator_z_from_altitude(altitude: f64, lat_deg: f64) -> f64 {
    let circumference = circumference_at_latitude(lat_deg);
    if circumference == 0.0 {
        0.0
    } else {
        altitude / circumference
    }
}

/// Ground resolution at `lat_deg` for the given zoom level.
#[must_use]
pub fn meters_per_pixel_at_latitude(zoom: f64, lat_deg: f64) -> f64 {
    let cos_lat = (lat_deg.clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE) * DEG2RAD).cos();
    cos_lat * 2.0 * PI * EARTH_RADIUS_METERS / (TILE_SIZE * 2_f64.powf(zoom))
}

/// Wraps an angle into `[0, 360)`. Non-finite input maps to zero.
#[must_use]
pub fn normalize_angle_deg(angle: f64) -> f64 {
    if !angle.is_finite() {
        return 0.0;
    }
    let wrapped = angle % 360.0;
    let normalized = if wrapped < 0.0 { wrapped + 360.0 } else { wrapped };
    // `-0.0 + 360.0` is handled above; fold the remaining signed zero and the
    // `360.0` produced by tiny negative inputs.
    if normalized == 0.0 || normalized >= 360.0 {
        0.0
    } else {
        normalized
    }
}

/// Signed shortest rotation from `from` to `to`, in `(-180, 180]` degrees.
#[must_use]
pub fn shortest_angle_delta(from: f64, to: f64) -> f64 {
    let delta = normalize_angle_deg(to) - normalize_angle_deg(from);
    if delta > 180.0 {
        delta - 360.0
    } else if delta <= -180.0 {
        delta + 360.0
    } else {
        delta
    }
}
