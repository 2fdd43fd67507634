// Copyright 2026 the Geosprite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Animated value channels.
//!
//! Every animatable property (sprite location, image offset, rotation,
//! opacity) is an [`AnimatedValue`]: a current value plus an explicit
//! [`AnimState`]. A channel moves through `Idle → Animating → Idle`:
//!
//! - [`command`](AnimatedValue::command) sets a new target. Without options
//!   (or with a zero duration) the channel snaps to the target. Otherwise an
//!   [`Animation`] starts from the current value, unless the target is within
//!   `1e-6` of it.
//! - [`advance`](AnimatedValue::advance) evaluates the animation at a
//!   timestamp. The first advance after a command fixes the start time, so
//!   commands never need a clock. When progress reaches 1 the channel holds
//!   the final value and returns to `Idle`.
//!
//! # Feedback and feedforward
//!
//! In [`InterpolationMode::Feedback`] the tween heads for the commanded
//! value. In [`InterpolationMode::Feedforward`] it heads for
//! `new + (new − previous command)`, the position the value will have at the
//! next command if it keeps its current velocity. Under a command cadence
//! equal to the duration this removes the one-step lag of feedback.

use crate::easing::Easing;
use crate::geo::{LngLat, normalize_angle_deg, shortest_angle_delta};

/// Differences at or below this are treated as "no change".
pub const VALUE_EPSILON: f64 = 1e-6;

/// How a commanded value is turned into a tween destination.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InterpolationMode {
    /// Tween towards the commanded value.
    #[default]
    Feedback,
    /// Tween towards the commanded value extrapolated by one command step.
    Feedforward,
}

/// Interpolation settings attached to a command.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InterpolationOptions {
    /// Destination rule.
    pub mode: InterpolationMode,
    /// Tween length in milliseconds. Zero or less snaps immediately.
    pub duration_ms: f64,
    /// Progress curve.
    pub easing: Easing,
}

impl InterpolationOptions {
    /// Linear feedback tween of the given duration.
    #[must_use]
    pub fn feedback(duration_ms: f64) -> Self {
        Self {
            mode: InterpolationMode::Feedback,
            duration_ms,
            easing: Easing::Linear,
        }
    }

    /// Linear feedforward tween of the given duration.
    #[must_use]
    pub fn feedforward(duration_ms: f64) -> Self {
        Self {
            mode: InterpolationMode::Feedforward,
            duration_ms,
            easing: Easing::Linear,
        }
    }

    /// Returns a copy with the given easing.
    #[must_use]
    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }
}

/// A value that can be tweened.
pub trait Interpolate: Copy + core::fmt::Debug {
    /// Value at eased progress `t` between `from` and `to`.
    fn lerp(from: &Self, to: &Self, t: f64) -> Self;

    /// Whether `a` and `b` differ by more than [`VALUE_EPSILON`].
    fn differs(a: &Self, b: &Self) -> bool;

    /// `next + (next − previous)`.
    fn extrapolate(previous: &Self, next: &Self) -> Self;
}

impl Interpolate for f64 {
    fn lerp(from: &Self, to: &Self, t: f64) -> Self {
        from + (to - from) * t
    }

    fn differs(a: &Self, b: &Self) -> bool {
        (a - b).abs() > VALUE_EPSILON
    }

    fn extrapolate(previous: &Self, next: &Self) -> Self {
        next + (next - previous)
    }
}

/// An angle in degrees, kept normalized to `[0, 360)` and tweened along the
/// shortest arc.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Degrees(f64);

impl Degrees {
    /// Creates a normalized angle.
    #[inline]
    #[must_use]
    pub fn new(deg: f64) -> Self {
        Self(normalize_angle_deg(deg))
    }

    /// The angle in `[0, 360)`.
    #[inline]
    #[must_use]
    pub const fn get(self) -> f64 {
        self.0
    }
}

impl Interpolate for Degrees {
    fn lerp(from: &Self, to: &Self, t: f64) -> Self {
        Self::new(from.0 + shortest_angle_delta(from.0, to.0) * t)
    }

    fn differs(a: &Self, b: &Self) -> bool {
        shortest_angle_delta(a.0, b.0).abs() > VALUE_EPSILON
    }

    fn extrapolate(previous: &Self, next: &Self) -> Self {
        Self::new(next.0 + shortest_angle_delta(previous.0, next.0))
    }
}

impl Interpolate for LngLat {
    fn lerp(from: &Self, to: &Self, t: f64) -> Self {
        let z = (from.z.is_some() || to.z.is_some())
            .then(|| f64::lerp(&from.altitude(), &to.altitude(), t));
        Self {
            lng: f64::lerp(&from.lng, &to.lng, t),
            lat: f64::lerp(&from.lat, &to.lat, t),
            z,
        }
    }

    fn differs(a: &Self, b: &Self) -> bool {
        f64::differs(&a.lng, &b.lng)
            || f64::differs(&a.lat, &b.lat)
            || f64::differs(&a.altitude(), &b.altitude())
    }

    fn extrapolate(previous: &Self, next: &Self) -> Self {
        Self {
            lng: f64::extrapolate(&previous.lng, &next.lng),
            lat: f64::extrapolate(&previous.lat, &next.lat),
            z: next
                .z
                .map(|z| f64::extrapolate(&previous.altitude(), &z)),
        }
    }
}

/// An in-flight tween.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Animation<V> {
    /// Value at progress 0.
    pub from: V,
    /// Value at progress 1.
    pub to: V,
    /// Start timestamp, fixed by the first evaluation.
    pub start_ms: Option<f64>,
    /// Tween length in milliseconds.
    pub duration_ms: f64,
    /// Progress curve.
    pub easing: Easing,
}

/// Result of evaluating an [`Animation`] at a timestamp.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Step<V> {
    /// Interpolated (or final) value.
    pub value: V,
    /// Whether raw progress reached 1.
    pub completed: bool,
    /// Start timestamp to keep for later evaluations.
    pub effective_start: f64,
}

impl<V: Interpolate> Animation<V> {
    /// Evaluates the tween at `now_ms` without mutating it.
    #[must_use]
    pub fn step(&self, now_ms: f64) -> Step<V> {
        let effective_start = self.start_ms.unwrap_or(now_ms);
        if self.duration_ms.is_nan() || self.duration_ms <= 0.0 || !V::differs(&self.from, &self.to)
        {
            return Step {
                value: self.to,
                completed: true,
                effective_start,
            };
        }
        let raw = (now_ms - effective_start) / self.duration_ms;
        let completed = !raw.is_finite() || raw >= 1.0;
        let value = if completed {
            self.to
        } else {
            V::lerp(&self.from, &self.to, self.easing.apply(raw))
        };
        Step {
            value,
            completed,
            effective_start,
        }
    }
}

/// Interpolation state of a channel.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum AnimState<V> {
    /// Holding the current value.
    #[default]
    Idle,
    /// Tweening.
    Animating(Animation<V>),
}

/// A value with optional in-flight interpolation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimatedValue<V> {
    current: V,
    last_command: Option<V>,
    state: AnimState<V>,
}

impl<V: Interpolate> AnimatedValue<V> {
    /// Creates an idle channel holding `value`.
    #[must_use]
    pub fn new(value: V) -> Self {
        Self {
            current: value,
            last_command: None,
            state: AnimState::Idle,
        }
    }

    /// The value to render now.
    #[inline]
    #[must_use]
    pub fn current(&self) -> V {
        self.current
    }

    /// The most recently commanded value, if any command was issued.
    #[inline]
    #[must_use]
    pub fn last_command(&self) -> Option<V> {
        self.last_command
    }

    /// The interpolation state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> &AnimState<V> {
        &self.state
    }

    /// Whether a tween is in flight.
    #[inline]
    #[must_use]
    pub fn is_animating(&self) -> bool {
        matches!(self.state, AnimState::Animating(_))
    }

    /// The value the channel will settle on.
    #[must_use]
    pub fn target(&self) -> V {
        match &self.state {
            AnimState::Idle => self.current,
            AnimState::Animating(animation) => animation.to,
        }
    }

    /// Commands a new value. Returns whether a tween was started.
    pub fn command(&mut self, value: V, options: Option<&InterpolationOptions>) -> bool {
        let previous = self.last_command.replace(value);
        let Some(options) = options.filter(|o| o.duration_ms > 0.0) else {
            self.current = value;
            self.state = AnimState::Idle;
            return false;
        };
        let destination = match (options.mode, previous) {
            (InterpolationMode::Feedforward, Some(previous)) => V::extrapolate(&previous, &value),
            _ => value,
        };
        if !V::differs(&self.current, &destination) {
            self.current = destination;
            self.state = AnimState::Idle;
            return false;
        }
        self.state = AnimState::Animating(Animation {
            from: self.current,
            to: destination,
            start_ms: None,
            duration_ms: options.duration_ms,
            easing: options.easing,
        });
        true
    }

    /// Drops any in-flight tween and settles on the last commanded value.
    ///
    /// This is what an explicit `None` interpolation does to a running
    /// channel. Returns whether the channel changed.
    pub fn collapse(&mut self) -> bool {
        let was_animating = self.is_animating();
        let settled = self.last_command.unwrap_or(self.current);
        let moved = V::differs(&self.current, &settled);
        self.current = settled;
        self.state = AnimState::Idle;
        was_animating || moved
    }

    /// Evaluates the tween at `now_ms`. Returns whether the value was
    /// updated (always `false` when idle).
    pub fn advance(&mut self, now_ms: f64) -> bool {
        let AnimState::Animating(animation) = &mut self.state else {
            return false;
        };
        let step = animation.step(now_ms);
        animation.start_ms = Some(step.effective_start);
        self.current = step.value;
        if step.completed {
            self.state = AnimState::Idle;
        }
        true
    }
}
