// Copyright 2026 the Geosprite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pretty-printing and JSON-lines export for geosprite diagnostics.
//!
//! This crate provides [`TraceSink`](geosprite_core::trace::TraceSink)
//! implementations for development and offline analysis:
//!
//! - [`pretty::PrettyPrintSink`]: human-readable one-line-per-event output.
//! - [`json::JsonLinesSink`]: one JSON object per event, for piping into
//!   `jq` or a notebook.

use geosprite_core::placement::SkipReason;

pub mod json;
pub mod pretty;

/// Short, stable name of a skip reason.
fn reason_name(reason: SkipReason) -> &'static str {
    match reason {
        SkipReason::TextureNotReady => "texture_not_ready",
        SkipReason::MissingResource => "missing_resource",
        SkipReason::ProjectionFailed => "projection_failed",
        SkipReason::OriginUnresolved => "origin_unresolved",
        SkipReason::DegenerateScale => "degenerate_scale",
        SkipReason::Transparent => "transparent",
        SkipReason::MissingImage => "missing_image",
    }
}
