//! Includes the types commonly used for starting and observing tweens.

pub use crate::{
    Callbacks, Easing, Engine, FrameTimer, Phase, Property, Status, TimerSource,
    TimingConfiguration, TweenHandle, TweenValues, Value,
};
