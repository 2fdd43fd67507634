// Copyright 2026 the Geosprite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! JSON-lines trace export.
//!
//! [`JsonLinesSink`] writes one JSON object per event, each on its own line.
//! Every object carries an `"event"` field naming the event kind:
//!
//! ```text
//! {"event":"frame_begin","frame":0,"now_ms":0.0,"sprites":2}
//! {"event":"topology_rebuild","frame":0,"targets":3,"sub_layers":2,"resource_revision":1}
//! {"event":"frame_summary","frame":0,"items":3,"targets":3,"skipped":{...},...}
//! ```

use std::io::Write;

use geosprite_core::placement::SkipCounts;
use geosprite_core::trace::{
    FrameBeginEvent, FrameSummary, ItemSkippedEvent, TopologyRebuildEvent, TraceSink,
};
use serde_json::{Value, json};

use crate::reason_name;

/// Writes trace events as JSON lines.
///
/// Write failures are counted, not propagated, since trace sinks cannot fail.
pub struct JsonLinesSink<W: Write> {
    writer: W,
    write_errors: u64,
}

impl<W: Write> std::fmt::Debug for JsonLinesSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonLinesSink")
            .field("write_errors", &self.write_errors)
            .finish_non_exhaustive()
    }
}

impl<W: Write> JsonLinesSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            write_errors: 0,
        }
    }

    /// Number of events that could not be written.
    #[must_use]
    pub fn write_errors(&self) -> u64 {
        self.write_errors
    }

    /// Consumes the sink and returns the destination.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn emit(&mut self, value: &Value) {
        let written = serde_json::to_writer(&mut self.writer, value)
            .map_err(std::io::Error::from)
            .and_then(|()| self.writer.write_all(b"\n"));
        if written.is_err() {
            self.write_errors += 1;
        }
    }
}

fn skip_counts(c: &SkipCounts) -> Value {
    json!({
        "texture_not_ready": c.texture_not_ready,
        "missing_resource": c.missing_resource,
        "projection_failed": c.projection_failed,
        "origin_unresolved": c.origin_unresolved,
        "degenerate_scale": c.degenerate_scale,
        "transparent": c.transparent,
        "missing_image": c.missing_image,
    })
}

impl<W: Write> TraceSink for JsonLinesSink<W> {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        self.emit(&json!({
            "event": "frame_begin",
            "frame": e.frame_index,
            "now_ms": e.now_ms,
            "sprites": e.sprite_count,
        }));
    }

    fn on_topology_rebuild(&mut self, e: &TopologyRebuildEvent) {
        self.emit(&json!({
            "event": "topology_rebuild",
            "frame": e.frame_index,
            "targets": e.target_count,
            "sub_layers": e.sub_layer_count,
            "resource_revision": e.resource_revision,
        }));
    }

    fn on_item_skipped(&mut self, e: &ItemSkippedEvent) {
        self.emit(&json!({
            "event": "item_skipped",
            "frame": e.frame_index,
            "sprite": e.sprite,
            "sub_layer": e.key.sub_layer,
            "order": e.key.order,
            "reason": reason_name(e.reason),
        }));
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.emit(&json!({
            "event": "frame_summary",
            "frame": s.frame_index,
            "items": s.item_count,
            "targets": s.target_count,
            "skipped": skip_counts(&s.skipped),
            "topology_changed": s.topology_changed,
            "animating": s.animating,
        }));
    }
}
