// Copyright 2026 the Geosprite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use geosprite_core::placement::SkipCounts;
use geosprite_core::trace::{
    FrameBeginEvent, FrameSummary, ItemSkippedEvent, TopologyRebuildEvent, TraceSink,
};

use crate::reason_name;

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    skips: bool,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("skips", &self.skips)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::with_writer(Box::new(std::io::stderr()))
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer,
            skips: true,
        }
    }

    /// Whether to print one line per skipped image. On by default.
    #[must_use]
    pub fn with_skips(mut self, skips: bool) -> Self {
        self.skips = skips;
        self
    }

    /// Consumes the sink and returns the destination.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn skip_breakdown(c: &SkipCounts) -> String {
    let parts = [
        ("texture", c.texture_not_ready),
        ("resource", c.missing_resource),
        ("projection", c.projection_failed),
        ("origin", c.origin_unresolved),
        ("scale", c.degenerate_scale),
        ("transparent", c.transparent),
        ("image", c.missing_image),
    ];
    let mut out = String::new();
    for (name, n) in parts.into_iter().filter(|(_, n)| *n > 0) {
        if !out.is_empty() {
            out.push(',');
        }
        out.push_str(&format!("{name}:{n}"));
    }
    out
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[begin] frame={} now={:.1}ms sprites={}",
            e.frame_index, e.now_ms, e.sprite_count,
        );
    }

    fn on_topology_rebuild(&mut self, e: &TopologyRebuildEvent) {
        let _ = writeln!(
            self.writer,
            "[targets] frame={} targets={} sub_layers={} resources@{}",
            e.frame_index, e.target_count, e.sub_layer_count, e.resource_revision,
        );
    }

    fn on_item_skipped(&mut self, e: &ItemSkippedEvent) {
        if !self.skips {
            return;
        }
        let _ = writeln!(
            self.writer,
            "[skip] frame={} sprite={} image={} reason={}",
            e.frame_index,
            e.sprite,
            e.key,
            reason_name(e.reason),
        );
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        let total = s.skipped.total();
        let skipped = if total == 0 {
            "0".to_owned()
        } else {
            format!("{total} ({})", skip_breakdown(&s.skipped))
        };
        let _ = writeln!(
            self.writer,
            "[summary] frame={} items={}/{} skipped={skipped} rebuilt={} animating={}",
            s.frame_index, s.item_count, s.target_count, s.topology_changed, s.animating,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geosprite_core::placement::SkipReason;
    use geosprite_core::sprite::ImageKey;

    #[test]
    fn pretty_print_begin() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_frame_begin(&FrameBeginEvent {
            frame_index: 1,
            now_ms: 16.5,
            sprite_count: 3,
        });
        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert!(output.contains("[begin]"), "got: {output}");
        assert!(output.contains("frame=1"), "got: {output}");
        assert!(output.contains("now=16.5ms"), "got: {output}");
    }

    #[test]
    fn summary_lists_nonzero_skips() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        let mut skipped = SkipCounts::default();
        skipped.record(SkipReason::MissingResource);
        skipped.record(SkipReason::MissingResource);
        skipped.record(SkipReason::Transparent);
        sink.on_frame_summary(&FrameSummary {
            frame_index: 4,
            item_count: 10,
            target_count: 13,
            skipped,
            topology_changed: false,
            animating: true,
        });
        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert!(
            output.contains("skipped=3 (resource:2,transparent:1)"),
            "got: {output}"
        );
        assert!(output.contains("items=10/13"), "got: {output}");
    }

    #[test]
    fn skip_lines_can_be_muted() {
        let event = ItemSkippedEvent {
            frame_index: 2,
            sprite: 7,
            key: ImageKey::new(1, 2),
            reason: SkipReason::OriginUnresolved,
        };
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_item_skipped(&event);
        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert!(output.contains("image=1:2 reason=origin_unresolved"), "got: {output}");

        let mut muted = PrettyPrintSink::with_writer(Vec::<u8>::new()).with_skips(false);
        muted.on_item_skipped(&event);
        assert!(muted.into_inner().is_empty());
    }
}
