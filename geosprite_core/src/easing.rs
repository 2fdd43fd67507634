// Copyright 2026 the Geosprite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Easing presets for interpolated channels.
//!
//! [`Easing::apply`] maps raw progress (clamped to `[0, 1]`) to eased
//! progress. Out-of-range parameters fall back to the preset defaults, so any
//! value a host deserializes produces a usable curve.

use core::f64::consts::PI;

/// Which end(s) of the curve are shaped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EasingMode {
    /// Slow start.
    In,
    /// Slow end.
    Out,
    /// Slow start and end.
    #[default]
    InOut,
}

/// An easing curve.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Easing {
    /// Identity.
    #[default]
    Linear,
    /// Polynomial of the given power (default 3).
    Ease {
        /// Exponent of the polynomial.
        power: f64,
        /// Shaped end(s).
        mode: EasingMode,
    },
    /// Normalized exponential (default exponent 5).
    Exponential {
        /// Growth rate.
        exponent: f64,
        /// Shaped end(s).
        mode: EasingMode,
    },
    /// Power 2.
    Quadratic(EasingMode),
    /// Power 3.
    Cubic(EasingMode),
    /// Quarter / half sine wave scaled by `amplitude` (default 1).
    Sine {
        /// Shaped end(s).
        mode: EasingMode,
        /// Peak of the curve.
        amplitude: f64,
    },
    /// Damped bounce settling on 1.
    Bounce {
        /// Number of bounces (default 3, rounded, at least 1).
        bounces: f64,
        /// Amplitude kept per bounce, in `(0, 1]` (default 0.5).
        decay: f64,
    },
    /// Overshoots the target before settling.
    Back {
        /// Overshoot amount (default 1.70158).
        overshoot: f64,
    },
}

impl Easing {
    /// Maps `progress` to eased progress. Non-finite progress counts as
    /// complete.
    #[must_use]
    pub fn apply(&self, progress: f64) -> f64 {
        let t = clamp01(progress);
        match *self {
            Self::Linear => t,
            Self::Ease { power, mode } => {
                let power = if power > 0.0 { power } else { 3.0 };
                shaped(t, mode, |x| x.powf(power))
            }
            Self::Exponential { exponent, mode } => {
                let exponent = if exponent > 0.0 { exponent } else { 5.0 };
                let denom = exponent.exp_m1();
                let ease_in = |v: f64| {
                    if v == 0.0 || v == 1.0 {
                        v
                    } else {
                        (exponent * v).exp_m1() / denom
                    }
                };
                match mode {
                    EasingMode::In => ease_in(t),
                    EasingMode::Out => 1.0 - ease_in(1.0 - t),
                    EasingMode::InOut => {
                        if t < 0.5 {
                            0.5 * ease_in(t * 2.0)
                        } else {
                            0.5 + 0.5 * (1.0 - ease_in(2.0 - t * 2.0))
                        }
                    }
                }
            }
            Self::Quadratic(mode) => shaped(t, mode, |x| x * x),
            Self::Cubic(mode) => shaped(t, mode, |x| x * x * x),
            Self::Sine { mode, amplitude } => {
                let amplitude = if amplitude > 0.0 { amplitude } else { 1.0 };
                amplitude
                    * match mode {
                        EasingMode::In => 1.0 - (PI / 2.0 * t).cos(),
                        EasingMode::Out => (PI / 2.0 * t).sin(),
                        EasingMode::InOut => 0.5 * (1.0 - (PI * t).cos()),
                    }
            }
            Self::Bounce { bounces, decay } => {
                let bounces = (if bounces > 0.0 { bounces } else { 3.0 }).round().max(1.0);
                let decay = if decay > 0.0 { decay.min(1.0) } else { 0.5 };
                let oscillation = (PI * (bounces + 0.5) * t).cos();
                1.0 - oscillation.abs() * decay.powf(t * bounces)
            }
            Self::Back { overshoot } => {
                let s = if overshoot.is_finite() && overshoot != 0.0 {
                    overshoot
                } else {
                    1.701_58
                };
                let p = t - 1.0;
                1.0 + (s + 1.0) * p * p * p + s * p * p
            }
        }
    }
}

fn clamp01(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        1.0
    }
}

/// Builds the in / out / in-out variants of an ease-in curve `f`.
fn shaped(t: f64, mode: EasingMode, f: impl Fn(f64) -> f64) -> f64 {
    match mode {
        EasingMode::In => f(t),
        EasingMode::Out => 1.0 - f(1.0 - t),
        EasingMode::InOut => {
            if t < 0.5 {
                0.5 * f(t * 2.0)
            } else {
                1.0 - 0.5 * f(2.0 - t * 2.0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Easing; 8] = [
        Easing::Linear,
        Easing::Ease {
            power: 3.0,
            mode: EasingMode::InOut,
        },
        Easing::Exponential {
            exponent: 5.0,
            mode: EasingMode::Out,
        },
        Easing::Quadratic(EasingMode::In),
        Easing::Cubic(EasingMode::Out),
        Easing::Sine {
            mode: EasingMode::InOut,
            amplitude: 1.0,
        },
        Easing::Bounce {
            bounces: 3.0,
            decay: 0.5,
        },
        Easing::Back { overshoot: 1.70158 },
    ];

    #[test]
    fn endpoints_are_fixed() {
        for easing in ALL {
            assert!(easing.apply(0.0).abs() < 1e-9, "{easing:?} at 0");
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-9, "{easing:?} at 1");
        }
    }

    #[test]
    fn progress_is_clamped() {
        assert_eq!(Easing::Linear.apply(-0.5), 0.0);
        assert_eq!(Easing::Linear.apply(2.0), 1.0);
        assert_eq!(Easing::Linear.apply(f64::NAN), 1.0);
    }

    #[test]
    fn in_out_is_symmetric() {
        let e = Easing::Cubic(EasingMode::InOut);
        assert!((e.apply(0.5) - 0.5).abs() < 1e-12);
        assert!((e.apply(0.25) + e.apply(0.75) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn ease_in_starts_slow() {
        let e = Easing::Quadratic(EasingMode::In);
        assert!((e.apply(0.5) - 0.25).abs() < 1e-12);
        let e = Easing::Quadratic(EasingMode::Out);
        assert!((e.apply(0.5) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn back_overshoots() {
        let e = Easing::Back { overshoot: 0.0 };
        let peak = (1..100)
            .map(|i| e.apply(f64::from(i) / 100.0))
            .fold(f64::MIN, f64::max);
        assert!(peak > 1.0);
    }

    #[test]
    fn invalid_parameters_use_defaults() {
        let fallback = Easing::Ease {
            power: -1.0,
            mode: EasingMode::In,
        };
        let explicit = Easing::Ease {
            power: 3.0,
            mode: EasingMode::In,
        };
        assert_eq!(fallback.apply(0.3), explicit.apply(0.3));
    }
}
