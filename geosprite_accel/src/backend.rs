// Copyright 2026 the Geosprite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rayon-backed placement backend.

use geosprite_core::backend::{PlacementBackend, PlacementOutput, PlacementRequest, SkippedItem};
use geosprite_core::depth::compare_frame_order;
use geosprite_core::placement::{CenterCache, ImageResolver, PreparedItem};
use geosprite_core::targets::RenderTarget;
use rayon::prelude::*;

use crate::config::{AccelConfig, determine_worker_count};
use crate::projection::FlatProjection;

/// Results of one worker slice.
type SliceOutput = (Vec<PreparedItem>, Vec<SkippedItem>, CenterCache);

/// Placement backend that resolves target slices on the rayon pool.
///
/// Each slice gets its own [`ImageResolver`] and center cache, so an origin
/// chain shared by two slices is resolved once per slice. The caches are
/// merged into the caller's cache afterwards. Item order is restored by a
/// final stable sort with [`compare_frame_order`], which is total, so the
/// output does not depend on how targets were split.
#[derive(Clone, Debug, Default)]
pub struct ParallelBackend {
    config: AccelConfig,
    last_worker_count: usize,
}

impl ParallelBackend {
    /// Creates a backend with the given tuning.
    #[must_use]
    pub fn new(config: AccelConfig) -> Self {
        Self {
            config,
            last_worker_count: 0,
        }
    }

    /// Tuning.
    #[must_use]
    pub fn config(&self) -> &AccelConfig {
        &self.config
    }

    /// Workers used by the last [`prepare`](PlacementBackend::prepare) call.
    #[must_use]
    pub fn last_worker_count(&self) -> usize {
        self.last_worker_count
    }
}

fn resolve_slice(
    projection: &FlatProjection,
    request: &PlacementRequest<'_>,
    targets: &[RenderTarget],
    cache: &mut CenterCache,
    items: &mut Vec<PreparedItem>,
    skipped: &mut Vec<SkippedItem>,
) {
    let mut resolver = ImageResolver::new(
        projection,
        request.sprites,
        request.resources,
        request.params,
        cache,
    );
    for target in targets {
        match resolver.prepare(target) {
            Ok(item) => items.push(item),
            Err(reason) => skipped.push(SkippedItem {
                sprite: target.sprite,
                key: target.key,
                reason,
            }),
        }
    }
}

impl PlacementBackend for ParallelBackend {
    fn prepare(
        &mut self,
        request: &PlacementRequest<'_>,
        cache: &mut CenterCache,
        out: &mut PlacementOutput,
    ) {
        out.clear();
        let projection = FlatProjection::new(request.camera);
        let total = request.targets.len();
        let workers = determine_worker_count(total, rayon::current_num_threads(), &self.config);
        self.last_worker_count = workers;

        if workers <= 1 {
            resolve_slice(
                &projection,
                request,
                request.targets,
                cache,
                &mut out.items,
                &mut out.skipped,
            );
            out.items.sort_by(compare_frame_order);
            return;
        }

        let chunk = total.div_ceil(workers);
        let slices: Vec<SliceOutput> = request
            .targets
            .par_chunks(chunk)
            .map(|targets| {
                let mut local = CenterCache::new();
                let mut items = Vec::with_capacity(targets.len());
                let mut skipped = Vec::new();
                resolve_slice(
                    &projection,
                    request,
                    targets,
                    &mut local,
                    &mut items,
                    &mut skipped,
                );
                (items, skipped, local)
            })
            .collect();

        for (items, skipped, local) in slices {
            out.items.extend(items);
            out.skipped.extend(skipped);
            cache.merge(local);
        }
        out.items.par_sort_by(compare_frame_order);
    }
}
