// Copyright 2026 the Geosprite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Parallel placement backend for geosprite.
//!
//! [`ParallelBackend`] implements
//! [`PlacementBackend`](geosprite_core::backend::PlacementBackend) by
//! splitting a frame's render targets into contiguous slices and resolving
//! each slice on a rayon worker with its own center cache. Projection runs
//! through [`FlatProjection`], which works on flat column-major matrices
//! instead of [`Transform3d`](geosprite_core::transform::Transform3d).
//!
//! The output agrees with the
//! [`ReferenceBackend`](geosprite_core::backend::ReferenceBackend) within
//! `1e-6` relative on clip-space vertices and `1e-9` on depth keys, and the
//! item order is identical. `tests/parity.rs` checks this.
//!
//! # Crate features
//!
//! - `serde` (disabled by default): Derives `Serialize`/`Deserialize` for
//!   [`AccelConfig`].

mod backend;
mod config;
mod projection;

pub use backend::ParallelBackend;
pub use config::{AccelConfig, DEFAULT_WORKER_COUNT, determine_worker_count};
pub use projection::FlatProjection;
