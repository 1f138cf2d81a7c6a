//! Scalar values that a tween can animate, and the start/end pair requested for a tween.

use std::fmt::{self, Display, Formatter};

/// A single animatable property value.
///
/// Tweens only ever deal in two shapes: plain numbers, which interpolate linearly, and text, which
/// may be a color token (`"#f80"`, `"rgb(255, 0, 0)"`, `"steelblue"`) or any other string with
/// embedded numbers such as `"translate(10px, 20px)"`. See
/// [`Interpolator::resolve`](crate::interpolation::Interpolator::resolve) for how a pair of values
/// is turned into an interpolation function.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Numeric value.
    Number(f64),
    /// Textual value, e.g. a color or a string containing numbers.
    Text(String),
}

impl Value {
    /// Returns the numeric value, if this is a [`Value::Number`].
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }

    /// Returns the text, if this is a [`Value::Text`].
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Number(_) => None,
            Self::Text(s) => Some(s),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::Number(0.0)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

macro_rules! impl_from_number {
    ($($t:ty),*) => {
        $( impl From<$t> for Value {
            fn from(value: $t) -> Self {
                Self::Number(value as f64)
            }
        }) *
    }
}

impl_from_number! { i8, i16, i32, i64, u8, u16, u32, u64, usize, f32, f64 }

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// The start and end values requested for a tween.
///
/// The end value is always known up front. The start value may be given explicitly, or left for
/// the tween to read from the live property at the moment it starts, since an earlier animation of
/// the same property may still be moving it until then.
#[derive(Clone, Debug, PartialEq)]
pub struct TweenValues {
    pub(crate) start: StartValue,
    pub(crate) end: Value,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum StartValue {
    /// Read through the property getter when the tween starts.
    Live,
    Explicit(Value),
}

impl TweenValues {
    /// Animates from whatever the property holds when the tween starts, to `end`.
    ///
    /// If the property has no getter, or the getter reports no value, the tween has nothing to
    /// interpolate from and behaves like [`hold`](Self::hold).
    pub fn to(end: impl Into<Value>) -> Self {
        Self {
            start: StartValue::Live,
            end: end.into(),
        }
    }

    /// Animates from `start` to `end`.
    pub fn from_to(start: impl Into<Value>, end: impl Into<Value>) -> Self {
        Self {
            start: StartValue::Explicit(start.into()),
            end: end.into(),
        }
    }

    /// Runs the full timing and lifecycle of a tween without ever changing the property.
    pub fn hold(value: impl Into<Value>) -> Self {
        let value = value.into();
        Self {
            start: StartValue::Explicit(value.clone()),
            end: value,
        }
    }

    /// The explicit start value, if one was given.
    pub fn start(&self) -> Option<&Value> {
        match &self.start {
            StartValue::Live => None,
            StartValue::Explicit(value) => Some(value),
        }
    }

    /// The end value.
    pub fn end(&self) -> &Value {
        &self.end
    }
}
