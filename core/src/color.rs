//! Parsing and blending of CSS color tokens.

use crate::interpolation::Lerp;
use palette::{FromColor, Hsl, Srgb};
use std::str::FromStr;

/// An sRGB color with 8-bit-range channels and a normalized alpha.
///
/// Channels are kept as `f64` so that intermediate frames are not quantized until formatting, and
/// so that a channel can be "missing" (`NaN`). Missing channels come from tokens that carry no hue
/// information, such as `transparent`; when blending, a missing channel takes the value of the same
/// channel on the other endpoint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgba {
    /// Red, `0..=255`.
    pub r: f64,
    /// Green, `0..=255`.
    pub g: f64,
    /// Blue, `0..=255`.
    pub b: f64,
    /// Alpha, `0..=1`.
    pub a: f64,
}

impl Rgba {
    /// Creates a color from its channels.
    pub fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Parses a CSS color token.
    ///
    /// Accepts hex (`#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`), functional `rgb()`, `rgba()`,
    /// `hsl()` and `hsla()` notation, `transparent`, and the CSS named colors. Returns [`None`] for
    /// anything else; callers treat that as "not a color" rather than as an error.
    pub fn parse(input: &str) -> Option<Self> {
        let token = input.trim().to_ascii_lowercase();
        if token == "transparent" {
            return Some(Self::new(f64::NAN, f64::NAN, f64::NAN, 0.0));
        }
        if let Some(hex) = token.strip_prefix('#') {
            return parse_hex(hex);
        }
        if let Some(args) = function_args(&token, &["rgba", "rgb"]) {
            return parse_rgb_args(&args);
        }
        if let Some(args) = function_args(&token, &["hsla", "hsl"]) {
            return parse_hsl_args(&args);
        }
        palette::named::from_str(&token).map(|c| {
            Self::new(c.red as f64, c.green as f64, c.blue as f64, 1.0)
        })
    }

    /// Blends each channel independently at position `x`.
    pub fn blend(&self, other: &Self, x: f64) -> Self {
        Self {
            r: blend_channel(self.r, other.r, x),
            g: blend_channel(self.g, other.g, x),
            b: blend_channel(self.b, other.b, x),
            a: blend_channel(self.a, other.a, x),
        }
    }

    /// Formats as `rgb(r, g, b)`, or `rgba(r, g, b, a)` when not fully opaque.
    ///
    /// Channels are rounded and clamped; a missing channel formats as `0`.
    pub fn to_css(&self) -> String {
        let r = format_channel(self.r);
        let g = format_channel(self.g);
        let b = format_channel(self.b);
        let a = if self.a.is_nan() { 1.0 } else { self.a.clamp(0.0, 1.0) };
        if a == 1.0 {
            format!("rgb({r}, {g}, {b})")
        } else {
            format!("rgba({r}, {g}, {b}, {a})")
        }
    }
}

fn blend_channel(y0: f64, y1: f64, x: f64) -> f64 {
    match (y0.is_nan(), y1.is_nan()) {
        (true, _) => y1,
        (false, true) => y0,
        (false, false) => y0.lerp(&y1, x),
    }
}

fn format_channel(value: f64) -> u8 {
    if value.is_nan() {
        0
    } else {
        value.round().clamp(0.0, 255.0) as u8
    }
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let (rgb, alpha) = match hex.len() {
        3 | 6 => (hex, None),
        4 => (&hex[..3], Some(&hex[3..])),
        8 => (&hex[..6], Some(&hex[6..])),
        _ => return None,
    };
    let color = Srgb::<u8>::from_str(rgb).ok()?;
    let a = match alpha {
        None => 1.0,
        // Single-digit alpha repeats the digit, like the channels of a short hex code.
        Some(digit) if digit.len() == 1 => {
            u8::from_str_radix(&digit.repeat(2), 16).ok()? as f64 / 255.0
        }
        Some(digits) => u8::from_str_radix(digits, 16).ok()? as f64 / 255.0,
    };
    Some(Rgba::new(
        color.red as f64,
        color.green as f64,
        color.blue as f64,
        a,
    ))
}

fn function_args(token: &str, names: &[&str]) -> Option<Vec<String>> {
    let name = names.iter().find(|name| token.starts_with(*name))?;
    let body = token[name.len()..].trim_start().strip_prefix('(')?.strip_suffix(')')?;
    Some(
        body.split(|c: char| c == ',' || c == '/' || c.is_whitespace())
            .filter(|arg| !arg.is_empty())
            .map(str::to_owned)
            .collect(),
    )
}

fn parse_number(arg: &str) -> Option<f64> {
    arg.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Parses a channel that is either a number in `0..=scale` or a percentage of `scale`.
fn parse_scaled(arg: &str, scale: f64) -> Option<f64> {
    match arg.strip_suffix('%') {
        Some(percent) => parse_number(percent).map(|p| p / 100.0 * scale),
        None => parse_number(arg),
    }
}

fn parse_alpha(args: &[String], index: usize) -> Option<f64> {
    match args.get(index) {
        Some(arg) => parse_scaled(arg, 1.0),
        None => Some(1.0),
    }
}

fn parse_rgb_args(args: &[String]) -> Option<Rgba> {
    if !(3..=4).contains(&args.len()) {
        return None;
    }
    Some(Rgba::new(
        parse_scaled(&args[0], 255.0)?,
        parse_scaled(&args[1], 255.0)?,
        parse_scaled(&args[2], 255.0)?,
        parse_alpha(args, 3)?,
    ))
}

fn parse_hsl_args(args: &[String]) -> Option<Rgba> {
    if !(3..=4).contains(&args.len()) {
        return None;
    }
    let hue = parse_number(args[0].trim_end_matches("deg"))?;
    let saturation = parse_scaled(&args[1], 1.0)?;
    let lightness = parse_scaled(&args[2], 1.0)?;
    let hsl: Hsl<palette::encoding::Srgb, f32> =
        Hsl::new(hue as f32, saturation as f32, lightness as f32);
    let rgb: Srgb<f32> = Srgb::from_color(hsl);
    Some(Rgba::new(
        rgb.red as f64 * 255.0,
        rgb.green as f64 * 255.0,
        rgb.blue as f64 * 255.0,
        parse_alpha(args, 3)?,
    ))
}
