pub mod prelude;

pub use tweenery_core::{
    color::Rgba,
    easing::{CubicBezierEasing, Easing, EasingFunction, UnknownEasingError},
    engine::{Engine, TweenError, TweenRequest},
    interpolation::{Interpolator, Lerp},
    timer::{FrameTimer, TimerId, TimerSource},
    timing::{InvalidTimingError, Timing, TimingConfiguration, TimingDefaults},
    tween::{Callbacks, Phase, Property, Status, TweenHandle, TweenId},
    value::{TweenValues, Value},
};
