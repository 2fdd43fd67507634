// Copyright 2026 the Geosprite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Depth keys and the draw-order comparators.
//!
//! A depth key is the NDC value `−z/w`. Sorting keys ascending draws the
//! farthest image first. Ties are broken by image order, then sprite id,
//! then resource id, so any input permutation sorts to the same output.

use core::cmp::Ordering;

use kurbo::Point;

use crate::config::DepthBiasConfig;
use crate::geo::LngLat;
use crate::placement::PreparedItem;
use crate::projection::{MIN_CLIP_W, ProjectionAdapter};
use crate::sprite::ImageKey;

/// `−z/w` for a clip-space position, or `None` for a degenerate `w`.
#[must_use]
pub fn ndc_depth_key(clip: [f64; 4]) -> Option<f64> {
    let [_, _, z, w] = clip;
    if !(w.is_finite() && w > MIN_CLIP_W) {
        return None;
    }
    let key = -z / w;
    key.is_finite().then_some(key)
}

/// Depth key of a billboard whose anchored center is at `center` on screen.
///
/// The center is unprojected onto the map plane and taken through the
/// mercator matrix. If that fails the base location is used instead.
pub fn billboard_depth_key<P: ProjectionAdapter + ?Sized>(
    projection: &P,
    center: Point,
    base: &LngLat,
) -> Option<f64> {
    projection
        .unproject(center)
        .and_then(|location| projection.to_clip_space(&location))
        .and_then(ndc_depth_key)
        .or_else(|| projection.to_clip_space(base).and_then(ndc_depth_key))
}

/// Applies the surface depth bias for the image at `key` to four clip-space
/// corners in place and returns the nearest corner's key.
///
/// Each corner gets `z′ = max(z + bias × w, −w + min_clip_z_epsilon)`, so the
/// bias never pushes a vertex through the near plane. With the bias disabled
/// the corners are left as projected.
pub fn surface_depth_key(
    clips: &mut [[f64; 4]; 4],
    bias: &DepthBiasConfig,
    key: ImageKey,
) -> Option<f64> {
    let bias_ndc = bias.bias_ndc(key.sub_layer, key.order);
    let mut depth = f64::NEG_INFINITY;
    for clip in clips.iter_mut() {
        if bias.enabled {
            let [_, _, z, w] = *clip;
            clip[2] = (z + bias_ndc * w).max(-w + bias.min_clip_z_epsilon);
        }
        depth = depth.max(ndc_depth_key(*clip)?);
    }
    Some(depth)
}

/// Draw order within one sub-layer: depth key, then order, then sprite id,
/// then resource id.
#[must_use]
pub fn compare_draw_order(a: &PreparedItem, b: &PreparedItem) -> Ordering {
    // `==` first so that `0.0` and `-0.0` tie.
    let depth = if a.depth_key == b.depth_key {
        Ordering::Equal
    } else {
        a.depth_key.total_cmp(&b.depth_key)
    };
    depth
        .then_with(|| a.key.order.cmp(&b.key.order))
        .then_with(|| a.sprite_id.cmp(&b.sprite_id))
        .then_with(|| a.resource.cmp(&b.resource))
}

/// Frame order: ascending sub-layer, then [`compare_draw_order`].
#[must_use]
pub fn compare_frame_order(a: &PreparedItem, b: &PreparedItem) -> Ordering {
    a.key
        .sub_layer
        .cmp(&b.key.sub_layer)
        .then_with(|| compare_draw_order(a, b))
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;
    use alloc::vec::Vec;

    use super::*;
    use crate::sprite::RenderMode;

    fn item(sprite: &str, key: ImageKey, resource: &str, depth_key: f64) -> PreparedItem {
        PreparedItem {
            sprite: 0,
            sprite_id: Arc::from(sprite),
            key,
            resource: Arc::from(resource),
            mode: RenderMode::Billboard,
            opacity: 1.0,
            depth_key,
            clip_vertices: [[0.0, 0.0, 0.0, 1.0]; 4],
            screen_corners: [Point::ZERO; 4],
            center: Point::ZERO,
            geo_corners: None,
            border: None,
            leader_line: None,
        }
    }

    fn names(items: &[PreparedItem]) -> Vec<(&str, &str)> {
        items
            .iter()
            .map(|i| (&*i.sprite_id, &*i.resource))
            .collect()
    }

    #[test]
    fn degenerate_w_has_no_key() {
        assert_eq!(ndc_depth_key([0.0, 0.0, 0.5, 0.0]), None);
        assert_eq!(ndc_depth_key([0.0, 0.0, 0.5, f64::NAN]), None);
        assert_eq!(ndc_depth_key([0.0, 0.0, 0.5, 2.0]), Some(-0.25));
    }

    fn coarse_bias(enabled: bool) -> DepthBiasConfig {
        DepthBiasConfig {
            enabled,
            epsilon_ndc: 0.01,
            ..DepthBiasConfig::default()
        }
    }

    fn near_plane_corners() -> [[f64; 4]; 4] {
        [
            [0.0, 0.0, 0.5, 1.0],
            [0.0, 0.0, 0.4, 1.0],
            [0.0, 0.0, -0.999_999_9, 1.0],
            [0.0, 0.0, 0.3, 2.0],
        ]
    }

    #[test]
    fn surface_bias_is_written_back_and_clamped() {
        let mut clips = near_plane_corners();
        let key = surface_depth_key(&mut clips, &coarse_bias(true), ImageKey::new(0, 1)).unwrap();
        assert!((clips[0][2] - 0.49).abs() < 1e-12);
        assert!((clips[3][2] - 0.28).abs() < 1e-12);
        // Clamped to the near plane.
        assert!((clips[2][2] - (-1.0 + 1e-7)).abs() < 1e-12);
        assert!((key - (1.0 - 1e-7)).abs() < 1e-12);
    }

    #[test]
    fn disabled_bias_leaves_corners_unclamped() {
        let mut clips = near_plane_corners();
        let key = surface_depth_key(&mut clips, &coarse_bias(false), ImageKey::new(0, 1)).unwrap();
        assert_eq!(clips, near_plane_corners());
        assert!((key - 0.999_999_9).abs() < 1e-12);

        // A zero bias still clamps while enabled.
        let mut clips = near_plane_corners();
        clips[2][2] = -1.0;
        surface_depth_key(&mut clips, &coarse_bias(true), ImageKey::new(0, 0)).unwrap();
        assert!((clips[2][2] - (-1.0 + 1e-7)).abs() < 1e-12);
        clips[2][2] = -1.0;
        surface_depth_key(&mut clips, &coarse_bias(false), ImageKey::new(0, 0)).unwrap();
        assert_eq!(clips[2][2], -1.0);
    }

    #[test]
    fn coincident_sprites_sort_by_id_in_any_input_order() {
        let a = item("A", ImageKey::new(0, 0), "pin", 0.25);
        let b = item("B", ImageKey::new(0, 0), "pin", 0.25);
        let mut forward = alloc::vec![a.clone(), b.clone()];
        let mut backward = alloc::vec![b, a];
        forward.sort_by(compare_frame_order);
        backward.sort_by(compare_frame_order);
        assert_eq!(names(&forward), [("A", "pin"), ("B", "pin")]);
        assert_eq!(names(&backward), [("A", "pin"), ("B", "pin")]);
    }

    #[test]
    fn tie_break_chain() {
        let mut items = alloc::vec![
            item("B", ImageKey::new(0, 0), "z", 0.0),
            item("A", ImageKey::new(0, 1), "a", 0.0),
            item("A", ImageKey::new(0, 0), "z", -0.0),
            item("C", ImageKey::new(0, 0), "a", -0.5),
            item("A", ImageKey::new(1, 0), "a", -0.9),
            item("B", ImageKey::new(0, 0), "a", 0.0),
        ];
        items.reverse();
        items.sort_by(compare_frame_order);
        assert_eq!(
            names(&items),
            [("C", "a"), ("A", "z"), ("B", "a"), ("B", "z"), ("A", "a"), ("A", "a")]
        );
        assert_eq!(items[5].key, ImageKey::new(1, 0));
    }
}
