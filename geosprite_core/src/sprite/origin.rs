// Copyright 2026 the Geosprite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Origin-reference graph validation.
//!
//! Each image references at most one origin, so a sprite's origin graph is a
//! functional graph: following references from any image either ends at an
//! image without an origin or loops. Validation walks each chain once with
//! three-state marking, so the whole check is linear in the number of images.

use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::error::MutationError;

use super::id::ImageKey;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnPath,
    Done,
}

/// Checks that every origin reference in `origins` (image → its origin)
/// resolves and that no chain loops.
pub(crate) fn validate_origin_graph(
    sprite: &Arc<str>,
    origins: &BTreeMap<ImageKey, Option<ImageKey>>,
) -> Result<(), MutationError> {
    for (&key, origin) in origins {
        if let Some(origin) = *origin
            && !origins.contains_key(&origin)
        {
            return Err(MutationError::DanglingOrigin {
                sprite: Arc::clone(sprite),
                key,
                origin,
            });
        }
    }

    let mut marks: BTreeMap<ImageKey, Mark> =
        origins.keys().map(|&k| (k, Mark::Unvisited)).collect();
    let mut path = Vec::new();
    for &start in origins.keys() {
        if marks[&start] != Mark::Unvisited {
            continue;
        }
        let mut current = Some(start);
        while let Some(key) = current {
            match marks[&key] {
                Mark::Done => break,
                Mark::OnPath => {
                    return Err(MutationError::OriginCycle {
                        sprite: Arc::clone(sprite),
                        key,
                    });
                }
                Mark::Unvisited => {
                    marks.insert(key, Mark::OnPath);
                    path.push(key);
                    current = origins[&key];
                }
            }
        }
        for key in path.drain(..) {
            marks.insert(key, Mark::Done);
        }
    }
    Ok(())
}
