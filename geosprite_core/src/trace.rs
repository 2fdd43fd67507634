// Copyright 2026 the Geosprite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the compose loop.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that
//! [`FrameCompositor::compose`](crate::compositor::FrameCompositor::compose)
//! calls at each stage. All method bodies default to no-ops, so implementing
//! only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! # Crate features
//!
//! - `trace` enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`) gates [`ItemSkippedEvent`] and the
//!   corresponding `TraceSink` method.

#[cfg(feature = "trace-rich")]
use crate::placement::SkipReason;
use crate::placement::SkipCounts;
#[cfg(feature = "trace-rich")]
use crate::sprite::ImageKey;

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a frame starts composing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameBeginEvent {
    /// Monotonic frame counter.
    pub frame_index: u64,
    /// Frame timestamp in milliseconds.
    pub now_ms: f64,
    /// Live sprites.
    pub sprite_count: usize,
}

/// Emitted after the render targets were rebuilt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TopologyRebuildEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Targets after the rebuild.
    pub target_count: usize,
    /// Distinct sub-layers after the rebuild.
    pub sub_layer_count: usize,
    /// Resource catalog revision the rebuild saw.
    pub resource_revision: u64,
}

/// A single target left out of a frame.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ItemSkippedEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Sprite slot.
    pub sprite: u32,
    /// Image key.
    pub key: ImageKey,
    /// Why it was skipped.
    pub reason: SkipReason,
}

/// Per-frame summary emitted when compose finishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameSummary {
    /// Frame counter.
    pub frame_index: u64,
    /// Items prepared for drawing.
    pub item_count: usize,
    /// Targets considered.
    pub target_count: usize,
    /// Skips by reason.
    pub skipped: SkipCounts,
    /// Whether the targets were rebuilt this frame.
    pub topology_changed: bool,
    /// Whether any tween is still running (another frame is needed).
    pub animating: bool,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the compose loop.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a frame starts composing.
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        _ = e;
    }

    /// Called after the render targets were rebuilt.
    fn on_topology_rebuild(&mut self, e: &TopologyRebuildEvent) {
        _ = e;
    }

    /// Called for every skipped target (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    fn on_item_skipped(&mut self, e: &ItemSkippedEvent) {
        _ = e;
    }

    /// Called with the per-frame summary.
    fn on_frame_summary(&mut self, s: &FrameSummary) {
        _ = s;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`FrameBeginEvent`].
    #[inline]
    pub fn frame_begin(&mut self, e: &FrameBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_frame_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`TopologyRebuildEvent`].
    #[inline]
    pub fn topology_rebuild(&mut self, e: &TopologyRebuildEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_topology_rebuild(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an [`ItemSkippedEvent`] (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn item_skipped(&mut self, e: &ItemSkippedEvent) {
        if let Some(s) = &mut self.sink {
            s.on_item_skipped(e);
        }
    }

    /// Emits a [`FrameSummary`].
    #[inline]
    pub fn frame_summary(&mut self, s: &FrameSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_frame_summary(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_begin() -> FrameBeginEvent {
        FrameBeginEvent {
            frame_index: 42,
            now_ms: 1000.0,
            sprite_count: 3,
        }
    }

    fn sample_summary() -> FrameSummary {
        FrameSummary {
            frame_index: 42,
            item_count: 2,
            target_count: 3,
            skipped: SkipCounts {
                transparent: 1,
                ..SkipCounts::default()
            },
            topology_changed: false,
            animating: true,
        }
    }

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_frame_begin(&sample_begin());
        sink.on_topology_rebuild(&TopologyRebuildEvent {
            frame_index: 42,
            target_count: 3,
            sub_layer_count: 1,
            resource_revision: 0,
        });
        sink.on_frame_summary(&sample_summary());
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.frame_begin(&sample_begin());
        tracer.frame_summary(&sample_summary());
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        use alloc::vec::Vec;

        struct RecordingSink {
            frames: Vec<u64>,
            items: Vec<usize>,
        }
        impl TraceSink for RecordingSink {
            fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
                self.frames.push(e.frame_index);
            }
            fn on_frame_summary(&mut self, s: &FrameSummary) {
                self.items.push(s.item_count);
            }
        }

        let mut sink = RecordingSink {
            frames: Vec::new(),
            items: Vec::new(),
        };
        let mut tracer = Tracer::new(&mut sink);
        tracer.frame_begin(&sample_begin());
        tracer.frame_summary(&sample_summary());
        // Access sink after tracer is dropped.
        drop(tracer);
        assert_eq!(sink.frames, &[42]);
        assert_eq!(sink.items, &[2]);
    }
}
