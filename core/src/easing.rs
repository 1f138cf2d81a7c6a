//! Contains the [`Easing`] enum which defines the standard easing types available for tweens, as
//! well as an [`EasingFunction`] trait for defining custom easings.

use dyn_clone::{clone_trait_object, DynClone};
use lazy_static::lazy_static;
use lyon_geom::{CubicBezierSegment, Point};
use std::f64::consts::{FRAC_PI_2, PI, TAU};
use std::fmt::Debug;
use std::str::FromStr;
use thiserror::Error;

/// Provides an easing function, AKA animation timing function, for non-linear progression of a
/// tween.
///
/// The engine computes a linear progress `x` from elapsed time and duration, passes it through the
/// tween's easing, and hands the eased value to the interpolator. The easing never sees the values
/// being animated.
pub trait EasingFunction: Debug + DynClone {
    /// Computes the `y` value along the curve for a given `x` position.
    ///
    /// Expects `x` to be normalized (from 0 to 1) and returns a normalized y-value which is
    /// typically between 0 and 1, but may be outside that range (e.g. [Easing::OutBack]).
    fn calc(&self, x: f64) -> f64;
}

clone_trait_object!(EasingFunction);

/// Overshoot used by the back easings unless specified otherwise.
pub const DEFAULT_OVERSHOOT: f64 = 1.70158;

/// Exponent used by the polynomial easings unless specified otherwise.
pub const DEFAULT_EXPONENT: f64 = 3.0;

/// Amplitude used by the elastic easings unless specified otherwise.
pub const DEFAULT_AMPLITUDE: f64 = 1.0;

/// Period used by the elastic easings unless specified otherwise.
pub const DEFAULT_PERIOD: f64 = 0.3;

/// Specifies a standard or custom [`EasingFunction`].
///
/// The standard set is the usual family of polynomial, sinusoidal, exponential, circular, bounce,
/// back and elastic curves, each in an accelerating (`In`), decelerating (`Out`) and symmetric
/// (`InOut`) form. The CSS keyword curves `ease`, `ease-in`, `ease-out` and `ease-in-out` are also
/// available, as are user-defined functions via [`Custom`](Easing::Custom).
///
/// The default is [`InOutCubic`](Easing::InOutCubic).
#[derive(Clone, Debug, Default)]
pub enum Easing {
    /// No easing; progress is used as-is.
    Linear,
    /// Quadratic, starts slowly.
    InQuad,
    /// Quadratic, ends slowly.
    OutQuad,
    /// Quadratic, starts and ends slowly.
    InOutQuad,
    /// Cubic, starts slowly.
    InCubic,
    /// Cubic, ends slowly.
    OutCubic,
    /// Cubic, starts and ends slowly. The default easing for tweens.
    #[default]
    InOutCubic,
    /// Polynomial with the given exponent, starts slowly.
    InPoly(f64),
    /// Polynomial with the given exponent, ends slowly.
    OutPoly(f64),
    /// Polynomial with the given exponent, starts and ends slowly.
    InOutPoly(f64),
    /// Sinusoidal, starts slowly.
    InSin,
    /// Sinusoidal, ends slowly.
    OutSin,
    /// Sinusoidal, starts and ends slowly.
    InOutSin,
    /// Exponential, starts slowly.
    InExp,
    /// Exponential, ends slowly.
    OutExp,
    /// Exponential, starts and ends slowly.
    InOutExp,
    /// Circular, starts slowly.
    InCircle,
    /// Circular, ends slowly.
    OutCircle,
    /// Circular, starts and ends slowly.
    InOutCircle,
    /// Bounces at the start, like [`OutBounce`](Self::OutBounce) played backward.
    InBounce,
    /// Bounces against the end value before settling.
    OutBounce,
    /// Bounces at both ends.
    InOutBounce,
    /// Pulls back below `0` by the given overshoot before accelerating forward.
    InBack(f64),
    /// Overshoots past `1` by the given overshoot before settling.
    OutBack(f64),
    /// Pulls back at the start and overshoots at the end.
    InOutBack(f64),
    /// Oscillates with growing amplitude before snapping to the end.
    InElastic {
        /// Oscillation amplitude, at least `1`.
        amplitude: f64,
        /// Oscillation period, in normalized time.
        period: f64,
    },
    /// Snaps toward the end and oscillates around it, like a released spring.
    OutElastic {
        /// Oscillation amplitude, at least `1`.
        amplitude: f64,
        /// Oscillation period, in normalized time.
        period: f64,
    },
    /// Elastic at both ends.
    InOutElastic {
        /// Oscillation amplitude, at least `1`.
        amplitude: f64,
        /// Oscillation period, in normalized time.
        period: f64,
    },
    /// Curve equivalent to CSS
    /// [`ease`](https://developer.mozilla.org/en-US/docs/Web/CSS/easing-function#ease).
    Ease,
    /// Curve equivalent to CSS
    /// [`ease-in`](https://developer.mozilla.org/en-US/docs/Web/CSS/easing-function#ease-in).
    In,
    /// Curve equivalent to CSS
    /// [`ease-out`](https://developer.mozilla.org/en-US/docs/Web/CSS/easing-function#ease-out).
    Out,
    /// Curve equivalent to CSS
    /// [`ease-in-out`](https://developer.mozilla.org/en-US/docs/Web/CSS/easing-function#ease-in-out).
    InOut,
    /// User-defined easing, such as an ad-hoc [`CubicBezierEasing`].
    Custom(Box<dyn EasingFunction>),
}

impl EasingFunction for Easing {
    fn calc(&self, x: f64) -> f64 {
        match self {
            Self::Linear => x,
            Self::InQuad => x * x,
            Self::OutQuad => x * (2.0 - x),
            Self::InOutQuad => in_out(x, |x| x * x),
            Self::InCubic => x * x * x,
            Self::OutCubic => out(x, |x| x * x * x),
            Self::InOutCubic => in_out(x, |x| x * x * x),
            Self::InPoly(e) => x.powf(*e),
            Self::OutPoly(e) => out(x, |x| x.powf(*e)),
            Self::InOutPoly(e) => in_out(x, |x| x.powf(*e)),
            Self::InSin => in_sin(x),
            Self::OutSin => (x * FRAC_PI_2).sin(),
            Self::InOutSin => (1.0 - (PI * x).cos()) / 2.0,
            Self::InExp => tpmt(1.0 - x),
            Self::OutExp => 1.0 - tpmt(x),
            Self::InOutExp => in_out(x, |x| tpmt(1.0 - x)),
            Self::InCircle => in_circle(x),
            Self::OutCircle => out(x, in_circle),
            Self::InOutCircle => in_out(x, in_circle),
            Self::InBounce => 1.0 - out_bounce(1.0 - x),
            Self::OutBounce => out_bounce(x),
            Self::InOutBounce => in_out(x, |x| 1.0 - out_bounce(1.0 - x)),
            Self::InBack(s) => in_back(x, *s),
            Self::OutBack(s) => out(x, |x| in_back(x, *s)),
            Self::InOutBack(s) => in_out(x, |x| in_back(x, *s)),
            Self::InElastic { amplitude, period } => in_elastic(x, *amplitude, *period),
            Self::OutElastic { amplitude, period } => {
                out(x, |x| in_elastic(x, *amplitude, *period))
            }
            Self::InOutElastic { amplitude, period } => {
                in_out(x, |x| in_elastic(x, *amplitude, *period))
            }
            Self::Ease => EASE_WEB.calc(x),
            Self::In => EASE_IN.calc(x),
            Self::Out => EASE_OUT.calc(x),
            Self::InOut => EASE_IN_OUT.calc(x),
            Self::Custom(custom) => custom.calc(x),
        }
    }
}

/// Error returned when parsing an [`Easing`] from an unrecognized name.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("unknown easing name: {0:?}")]
pub struct UnknownEasingError(pub String);

impl FromStr for Easing {
    type Err = UnknownEasingError;

    /// Parses one of the conventional easing names, e.g. `easeLinear`, `easeQuadIn`,
    /// `easeCubicInOut` or `easeElasticOut`. A bare family name (`easeCubic`) means the family's
    /// customary variant: `InOut` for most families, `Out` for bounce and elastic.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let elastic = |make: fn(f64, f64) -> Easing| make(DEFAULT_AMPLITUDE, DEFAULT_PERIOD);
        let easing = match name {
            "easeLinear" => Self::Linear,
            "easeQuadIn" => Self::InQuad,
            "easeQuadOut" => Self::OutQuad,
            "easeQuad" | "easeQuadInOut" => Self::InOutQuad,
            "easeCubicIn" => Self::InCubic,
            "easeCubicOut" => Self::OutCubic,
            "easeCubic" | "easeCubicInOut" => Self::InOutCubic,
            "easePolyIn" => Self::InPoly(DEFAULT_EXPONENT),
            "easePolyOut" => Self::OutPoly(DEFAULT_EXPONENT),
            "easePoly" | "easePolyInOut" => Self::InOutPoly(DEFAULT_EXPONENT),
            "easeSinIn" => Self::InSin,
            "easeSinOut" => Self::OutSin,
            "easeSin" | "easeSinInOut" => Self::InOutSin,
            "easeExpIn" => Self::InExp,
            "easeExpOut" => Self::OutExp,
            "easeExp" | "easeExpInOut" => Self::InOutExp,
            "easeCircleIn" => Self::InCircle,
            "easeCircleOut" => Self::OutCircle,
            "easeCircle" | "easeCircleInOut" => Self::InOutCircle,
            "easeBounceIn" => Self::InBounce,
            "easeBounce" | "easeBounceOut" => Self::OutBounce,
            "easeBounceInOut" => Self::InOutBounce,
            "easeBackIn" => Self::InBack(DEFAULT_OVERSHOOT),
            "easeBackOut" => Self::OutBack(DEFAULT_OVERSHOOT),
            "easeBack" | "easeBackInOut" => Self::InOutBack(DEFAULT_OVERSHOOT),
            "easeElasticIn" => elastic(|amplitude, period| Self::InElastic { amplitude, period }),
            "easeElastic" | "easeElasticOut" => {
                elastic(|amplitude, period| Self::OutElastic { amplitude, period })
            }
            "easeElasticInOut" => {
                elastic(|amplitude, period| Self::InOutElastic { amplitude, period })
            }
            _ => return Err(UnknownEasingError(name.to_owned())),
        };
        Ok(easing)
    }
}

/// Mirrors an "in" curve into its "out" form.
fn out(x: f64, ease_in: impl Fn(f64) -> f64) -> f64 {
    1.0 - ease_in(1.0 - x)
}

/// Runs an "in" curve over the first half and its mirror over the second half.
fn in_out(x: f64, ease_in: impl Fn(f64) -> f64) -> f64 {
    let x = x * 2.0;
    if x <= 1.0 {
        ease_in(x) / 2.0
    } else {
        (2.0 - ease_in(2.0 - x)) / 2.0
    }
}

fn in_sin(x: f64) -> f64 {
    if x == 1.0 {
        1.0
    } else {
        1.0 - (x * FRAC_PI_2).cos()
    }
}

fn in_circle(x: f64) -> f64 {
    1.0 - (1.0 - x * x).sqrt()
}

/// `2^(-10x)`, shifted and scaled so that it runs exactly from `1` at `x = 0` to `0` at `x = 1`.
fn tpmt(x: f64) -> f64 {
    (2f64.powf(-10.0 * x) - 0.0009765625) * 1.0009775171065494
}

fn in_back(x: f64, overshoot: f64) -> f64 {
    x * x * (overshoot * (x - 1.0) + x)
}

fn out_bounce(x: f64) -> f64 {
    const B1: f64 = 4.0 / 11.0;
    const B2: f64 = 6.0 / 11.0;
    const B3: f64 = 8.0 / 11.0;
    const B4: f64 = 3.0 / 4.0;
    const B5: f64 = 9.0 / 11.0;
    const B6: f64 = 10.0 / 11.0;
    const B7: f64 = 15.0 / 16.0;
    const B8: f64 = 21.0 / 22.0;
    const B9: f64 = 63.0 / 64.0;
    const B0: f64 = 1.0 / B1 / B1;

    if x < B1 {
        B0 * x * x
    } else if x < B3 {
        B0 * (x - B2) * (x - B2) + B4
    } else if x < B6 {
        B0 * (x - B5) * (x - B5) + B7
    } else {
        B0 * (x - B8) * (x - B8) + B9
    }
}

fn in_elastic(x: f64, amplitude: f64, period: f64) -> f64 {
    let amplitude = amplitude.max(1.0);
    let period = period / TAU;
    let shift = (1.0 / amplitude).asin() * period;
    let x = x - 1.0;
    amplitude * tpmt(-x) * ((shift - x) / period).sin()
}

lazy_static! {
    static ref EASE_WEB: CubicBezierEasing = CubicBezierEasing::new(0.25, 0.1, 0.25, 1.0);
    static ref EASE_IN: CubicBezierEasing = CubicBezierEasing::new(0.42, 0.0, 1.0, 1.0);
    static ref EASE_OUT: CubicBezierEasing = CubicBezierEasing::new(0.0, 0.0, 0.58, 1.0);
    static ref EASE_IN_OUT: CubicBezierEasing = CubicBezierEasing::new(0.42, 0.0, 0.58, 1.0);
}

/// Easing function defined by a cubic bezier curve with the start and end points fixed at `(0, 0)`
/// and `(1, 1)`, i.e. only the control points are specified.
///
/// The CSS keyword easings use `CubicBezierEasing`. Instances may also be created and used in
/// [Easing::Custom] in cases where the standard easings do not suffice.
#[derive(Clone, Debug)]
pub struct CubicBezierEasing {
    segment: CubicBezierSegment<f64>,
}

impl CubicBezierEasing {
    /// Creates a new [CubicBezierEasing] with control points `(x1, y1)` and `(x2, y2)`.
    ///
    /// To experiment with different curves, see: <https://cubic-bezier.com/>
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            segment: CubicBezierSegment {
                from: Point::new(0.0, 0.0),
                to: Point::new(1.0, 1.0),
                ctrl1: Point::new(x1, y1),
                ctrl2: Point::new(x2, y2),
            },
        }
    }
}

impl EasingFunction for CubicBezierEasing {
    fn calc(&self, x: f64) -> f64 {
        if x <= 0.0 {
            return 0.0;
        }
        if x >= 1.0 {
            return 1.0;
        }
        // The curve is parameterized by t, not x; find the t at which the curve reaches x.
        match self.segment.solve_t_for_x(x).first() {
            Some(t) => self.segment.y(*t),
            None => x,
        }
    }
}
