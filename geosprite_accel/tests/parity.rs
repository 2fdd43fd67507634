// Copyright 2026 the Geosprite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The parallel backend must reproduce the reference backend's frames.

use geosprite_accel::{AccelConfig, ParallelBackend};
use geosprite_core::camera::{CameraState, MapView};
use geosprite_core::compositor::{FrameCompositor, PreparedFrame};
use geosprite_core::config::SpriteLayerConfig;
use geosprite_core::geo::LngLat;
use geosprite_core::resource::{ResourceInfo, ResourceTable};
use geosprite_core::sprite::{Anchor, ImageInit, ImageKey, RenderMode, SpriteInit, SpriteStore};
use geosprite_core::trace::Tracer;
use kurbo::Size;

const CENTER: LngLat = LngLat::new(2.3522, 48.8566);

/// xorshift64, enough to scatter sprites deterministically.
struct Scatter(u64);

impl Scatter {
    fn next_unit(&mut self) -> f64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        (self.0 >> 11) as f64 / (1_u64 << 53) as f64
    }
}

fn resources() -> ResourceTable {
    let mut table = ResourceTable::new();
    table.register("pin", ResourceInfo::ready(32, 48));
    table.register("label", ResourceInfo::ready(96, 24));
    table.register("shadow", ResourceInfo::ready(64, 64));
    table.register(
        "loading",
        ResourceInfo {
            width: 16,
            height: 16,
            texture_ready: false,
        },
    );
    table
}

fn populate(count: usize, seed: u64) -> SpriteStore {
    let mut rng = Scatter(seed);
    let mut store = SpriteStore::new();
    for i in 0..count {
        let location = LngLat::new(
            CENTER.lng + (rng.next_unit() - 0.5) * 0.01,
            CENTER.lat + (rng.next_unit() - 0.5) * 0.006,
        );
        let mut pin = ImageInit::new("pin");
        pin.anchor = Anchor::BOTTOM;
        pin.rotate_deg = rng.next_unit() * 360.0;
        let mut label = ImageInit::new("label").with_origin(ImageKey::new(1, 0), true);
        label.anchor = Anchor::new(-1.0, 0.0);
        label.offset_meters = 5.0;
        label.offset_deg = rng.next_unit() * 360.0;
        let mut shadow = ImageInit::new("shadow").with_mode(RenderMode::Surface);
        shadow.scale = 0.5 + rng.next_unit();
        let mut init = SpriteInit::new(location)
            .with_image(ImageKey::new(1, 0), pin)
            .with_image(ImageKey::new(1, 1), label)
            .with_image(ImageKey::new(0, 0), shadow);
        match i % 7 {
            0 => init = init.with_image(ImageKey::new(2, 0), ImageInit::new("missing")),
            1 => init = init.with_image(ImageKey::new(2, 0), ImageInit::new("loading")),
            2 => {
                let mut hidden = ImageInit::new("pin");
                hidden.opacity = 0.0;
                init = init.with_image(ImageKey::new(2, 0), hidden);
            }
            _ => {}
        }
        store
            .add_sprite(format!("s{i:04}"), init)
            .expect("generated sprites are valid");
    }
    store
}

fn camera(pitch: f64, bearing: f64) -> CameraState {
    MapView::new(CENTER, 16.5, Size::new(1280.0, 720.0))
        .with_pitch(pitch)
        .with_bearing(bearing)
        .camera_state()
}

fn reference_frame(store: &mut SpriteStore, camera: &CameraState) -> PreparedFrame {
    let mut compositor = FrameCompositor::new(SpriteLayerConfig::default());
    compositor.compose(store, &resources(), camera, 0.0, &mut Tracer::none())
}

fn parallel_frame(
    store: &mut SpriteStore,
    camera: &CameraState,
    config: AccelConfig,
    threads: usize,
) -> (PreparedFrame, usize) {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .expect("thread pool");
    pool.install(|| {
        let mut compositor =
            FrameCompositor::with_backend(ParallelBackend::new(config), SpriteLayerConfig::default());
        let frame = compositor.compose(store, &resources(), camera, 0.0, &mut Tracer::none());
        (frame, compositor.backend().last_worker_count())
    })
}

fn assert_frames_match(reference: &PreparedFrame, parallel: &PreparedFrame) {
    assert_eq!(reference.items.len(), parallel.items.len(), "item count");
    assert_eq!(reference.skipped, parallel.skipped, "skip counts");
    assert_eq!(reference.sub_layers, parallel.sub_layers, "sub-layer runs");
    for (r, p) in reference.items.iter().zip(&parallel.items) {
        assert_eq!(r.sprite_id, p.sprite_id, "draw order");
        assert_eq!(r.key, p.key, "draw order");
        assert_eq!(r.resource, p.resource, "resource");
        assert!(
            (r.depth_key - p.depth_key).abs() <= 1e-9,
            "depth key of {}:{}",
            r.sprite_id,
            r.key
        );
        for (rv, pv) in r.clip_vertices.iter().flatten().zip(p.clip_vertices.iter().flatten()) {
            let scale = rv.abs().max(1.0);
            assert!(
                (rv - pv).abs() <= 1e-6 * scale,
                "clip vertex of {}:{}: {rv} vs {pv}",
                r.sprite_id,
                r.key
            );
        }
    }
}

fn slicing() -> AccelConfig {
    AccelConfig {
        min_parallel_items: 1,
        slice_size: 16,
        max_workers: 0,
    }
}

#[test]
fn parallel_matches_reference_top_down() {
    let camera = camera(0.0, 0.0);
    let reference = reference_frame(&mut populate(300, 7), &camera);
    let (parallel, workers) = parallel_frame(&mut populate(300, 7), &camera, slicing(), 4);
    assert_eq!(workers, 4);
    assert!(!reference.items.is_empty());
    assert_frames_match(&reference, &parallel);
}

#[test]
fn parallel_matches_reference_pitched_and_rotated() {
    for (pitch, bearing) in [(45.0, 30.0), (60.0, -120.0), (75.0, 200.0)] {
        let camera = camera(pitch, bearing);
        let reference = reference_frame(&mut populate(257, 11), &camera);
        let (parallel, _) = parallel_frame(&mut populate(257, 11), &camera, slicing(), 3);
        assert_frames_match(&reference, &parallel);
    }
}

fn chained(links: i32) -> SpriteStore {
    let mut init =
        SpriteInit::new(CENTER).with_image(ImageKey::new(0, links - 1), ImageInit::new("pin"));
    for order in 0..links - 1 {
        let mut label =
            ImageInit::new("label").with_origin(ImageKey::new(0, order + 1), order % 3 == 0);
        label.offset_meters = 3.0;
        label.offset_deg = f64::from(order) * 37.0;
        init = init.with_image(ImageKey::new(0, order), label);
    }
    let mut store = SpriteStore::new();
    store.add_sprite("chain", init).expect("chain is acyclic");
    store
}

#[test]
fn long_origin_chain_split_across_chunks() {
    let camera = camera(40.0, 15.0);
    let reference = reference_frame(&mut chained(100), &camera);
    let (parallel, workers) = parallel_frame(&mut chained(100), &camera, slicing(), 4);
    assert!(workers > 1);
    assert_eq!(reference.skipped.origin_unresolved, 0);
    assert_eq!(reference.items.len(), 100);
    assert_frames_match(&reference, &parallel);
}

#[test]
fn skips_are_reported_in_target_order() {
    let camera = camera(30.0, 0.0);
    let mut store = populate(64, 3);
    let mut compositor = FrameCompositor::new(SpriteLayerConfig::default());
    compositor.compose(&mut store, &resources(), &camera, 0.0, &mut Tracer::none());
    let reference = compositor.last_skipped().to_vec();

    let mut store = populate(64, 3);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(4)
        .build()
        .expect("thread pool");
    let parallel = pool.install(|| {
        let mut compositor =
            FrameCompositor::with_backend(ParallelBackend::new(slicing()), SpriteLayerConfig::default());
        compositor.compose(&mut store, &resources(), &camera, 0.0, &mut Tracer::none());
        compositor.last_skipped().to_vec()
    });
    assert!(!reference.is_empty());
    assert_eq!(reference, parallel);
}

#[test]
fn center_cache_is_complete_after_merge() {
    let camera = camera(20.0, 10.0);
    let mut store = populate(128, 5);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(4)
        .build()
        .expect("thread pool");
    pool.install(|| {
        let mut compositor =
            FrameCompositor::with_backend(ParallelBackend::new(slicing()), SpriteLayerConfig::default());
        let frame = compositor.compose(&mut store, &resources(), &camera, 0.0, &mut Tracer::none());
        for item in &frame.items {
            assert!(
                compositor.cache().get(item.sprite, item.key).is_some(),
                "layout of {}:{} cached",
                item.sprite_id,
                item.key
            );
        }
    });
}

#[test]
fn small_frames_run_on_one_worker() {
    let camera = camera(0.0, 0.0);
    let reference = reference_frame(&mut populate(10, 1), &camera);
    let (parallel, workers) =
        parallel_frame(&mut populate(10, 1), &camera, AccelConfig::default(), 4);
    assert_eq!(workers, 1);
    assert_frames_match(&reference, &parallel);
}
