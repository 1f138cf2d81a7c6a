//! Core types for Tweenery.
//!
//! Everything the scheduling engine needs lives here: values and their interpolation, easing and
//! timing, the timer abstraction, and the engine itself. All important types are re-exported by
//! Tweenery.

pub mod color;
pub mod easing;
pub mod engine;
pub mod interpolation;
mod registry;
pub mod timer;
pub mod timing;
pub mod tween;
pub mod value;
