//! Traits and implementations related to interpolation of animatable values.

use crate::color::Rgba;
use crate::value::Value;
use lazy_static::lazy_static;
use num_traits::NumCast;
use regex::Regex;

/// Trait for a type that supports the standard `lerp` (**l**inear int**erp**olation) operation.
///
/// Linear interpolation refers mathematically to computing the `y` value of the straight line
/// connecting two points `(x0, y0)` and `(x1, y1)` at a given `x` position. `Lerp` assumes a
/// normalized `x` value, such that _x0_ = 0 and _x1_ = 1, which reduces the equation to:
///
/// `lerp(y0, y1, x) = y0 + x(y1 - y0)`
///
/// All primitive numeric types are `lerp`able. The computation is performed in 64-bit floating
/// point, and integer results are rounded to the nearest value representable by the type.
pub trait Lerp {
    /// Computes the linear interpolation between this value (`y0`) and a second (`y1`) value of the
    /// same type, at normalized (from 0 to 1) position `x`.
    ///
    /// # Example
    ///
    /// ```
    /// use tweenery_core::interpolation::Lerp;
    ///
    /// let y0: f64 = 5.0;
    /// let y1: f64 = 15.0;
    ///
    /// assert_eq!(y0.lerp(&y1, 0.0), 5.0);
    /// assert_eq!(y0.lerp(&y1, 0.25), 7.5);
    /// assert_eq!(y0.lerp(&y1, 1.0), 15.0);
    /// ```
    fn lerp(&self, y1: &Self, x: f64) -> Self;
}

// The form `y0 * (1 - x) + y1 * x` is used instead of `y0 + x(y1 - y0)` because it lands exactly on
// `y1` when `x == 1`, which the final frame of every tween depends on, and it keeps the subtraction
// out of the value space for integer types.

macro_rules! impl_lerp_for_integer_types {
    ($($t:ty),*) => {
        $( impl Lerp for $t {
            fn lerp(&self, y1: &Self, x: f64) -> Self {
                let result = (*self as f64).lerp(&(*y1 as f64), x).round();
                <$t as NumCast>::from(result)
                    .unwrap_or(if result < 0.0 { <$t>::MIN } else { <$t>::MAX })
            }
        }) *
    }
}

impl_lerp_for_integer_types! { i8, i16, i32, i64, u8, u16, u32, u64, usize }

impl Lerp for f64 {
    fn lerp(&self, y1: &Self, x: f64) -> Self {
        self * (1.0 - x) + y1 * x
    }
}

impl Lerp for f32 {
    fn lerp(&self, y1: &Self, x: f64) -> Self {
        (*self as f64).lerp(&(*y1 as f64), x) as f32
    }
}

lazy_static! {
    static ref NUMBER: Regex = Regex::new(r"[-+]?(?:\d+\.?\d*|\.?\d+)(?:[eE][-+]?\d+)?")
        .expect("Number pattern should be a valid regex.");
}

/// A resolved interpolation between two [`Value`]s, mapping a normalized progress to a value.
///
/// Created with [`Interpolator::resolve`]. Evaluating at exactly `1.0` always returns the end value
/// that was passed to `resolve`, unchanged; intermediate values of color and string interpolations
/// are re-formatted and would otherwise not round-trip (e.g. `"red"` vs. `"rgb(255, 0, 0)"`).
#[derive(Clone, Debug, PartialEq)]
pub enum Interpolator {
    /// Linear interpolation between two numbers.
    Number {
        /// Value at progress `0`.
        start: f64,
        /// Value at progress `1`.
        end: f64,
    },
    /// Channel-wise blending of two colors.
    Color {
        /// Color at progress `0`.
        start: Rgba,
        /// Color at progress `1`.
        end: Rgba,
        /// The end token as originally given.
        end_value: String,
    },
    /// Interpolation of the numbers embedded in a string.
    Text(TextInterpolator),
}

impl Interpolator {
    /// Picks the interpolation for a pair of values, based on the shape of the `end` value:
    ///
    /// 1. A number end interpolates numerically. A textual start is parsed as a number if possible;
    ///    otherwise the interpolation stays at `end`.
    /// 2. A text end that parses as a color blends colors. A start that is not a color contributes
    ///    no channels, so every channel falls back to the end color.
    /// 3. Anything else uses string interpolation.
    ///
    /// Mismatched shapes never fail; they degrade to the most permissive interpolation available.
    pub fn resolve(start: &Value, end: &Value) -> Self {
        match end {
            Value::Number(end) => {
                let start = match start {
                    Value::Number(n) => Some(*n),
                    Value::Text(s) => s.trim().parse::<f64>().ok(),
                };
                Self::Number {
                    start: start.unwrap_or(*end),
                    end: *end,
                }
            }
            Value::Text(end_text) => match Rgba::parse(end_text) {
                Some(end_color) => {
                    let start_color = start
                        .as_text()
                        .and_then(Rgba::parse)
                        .unwrap_or(Rgba::new(f64::NAN, f64::NAN, f64::NAN, f64::NAN));
                    Self::Color {
                        start: start_color,
                        end: end_color,
                        end_value: end_text.clone(),
                    }
                }
                None => Self::Text(TextInterpolator::new(&start.to_string(), end_text)),
            },
        }
    }

    /// Computes the value at normalized progress `x`.
    pub fn at(&self, x: f64) -> Value {
        match self {
            Self::Number { start, end } => Value::Number(start.lerp(end, x)),
            Self::Color { end_value, .. } if x == 1.0 => Value::Text(end_value.clone()),
            Self::Color { start, end, .. } => Value::Text(start.blend(end, x).to_css()),
            Self::Text(text) => Value::Text(text.at(x)),
        }
    }
}

/// String interpolation that treats every number in the string as an independent animatable value.
///
/// Both strings are split into alternating literal and numeric segments. The n-th number of the end
/// string is interpolated from the n-th number of the start string, or held at its end value if the
/// start string has fewer numbers. Literal segments cannot be interpolated, so each one shows the
/// start string's segment until progress reaches `0.5` and the end string's segment afterward.
#[derive(Clone, Debug, PartialEq)]
pub struct TextInterpolator {
    literals: Vec<(Option<String>, String)>,
    numbers: Vec<(Option<f64>, f64)>,
    end: String,
}

impl TextInterpolator {
    /// Creates an interpolator from `start` to `end`.
    pub fn new(start: &str, end: &str) -> Self {
        let (start_literals, start_numbers) = split_numbers(start);
        let (end_literals, end_numbers) = split_numbers(end);
        let mut start_literals = start_literals.into_iter();
        let mut start_numbers = start_numbers.into_iter();
        Self {
            literals: end_literals
                .into_iter()
                .map(|end| (start_literals.next(), end))
                .collect(),
            numbers: end_numbers
                .into_iter()
                .map(|end| (start_numbers.next(), end))
                .collect(),
            end: end.to_owned(),
        }
    }

    /// Computes the interpolated string at normalized progress `x`.
    pub fn at(&self, x: f64) -> String {
        if x == 1.0 {
            return self.end.clone();
        }
        let mut result = String::new();
        for (i, (start, end)) in self.literals.iter().enumerate() {
            match start {
                Some(start) if x < 0.5 => result.push_str(start),
                _ => result.push_str(end),
            }
            if let Some((start, end)) = self.numbers.get(i) {
                let value = start.map_or(*end, |start| start.lerp(end, x));
                result.push_str(&value.to_string());
            }
        }
        result
    }
}

/// Splits a string into `n + 1` literal segments surrounding `n` numbers.
fn split_numbers(text: &str) -> (Vec<String>, Vec<f64>) {
    let mut literals = Vec::new();
    let mut numbers = Vec::new();
    let mut last = 0;
    for m in NUMBER.find_iter(text) {
        let Ok(number) = m.as_str().parse::<f64>() else {
            continue;
        };
        literals.push(text[last..m.start()].to_owned());
        numbers.push(number);
        last = m.end();
    }
    literals.push(text[last..].to_owned());
    (literals, numbers)
}
