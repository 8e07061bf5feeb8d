//! Tile tint colors as a tagged RGB / HSV value.
//!
//! Colors enter the editor from JSON (`{"r","g","b","a"}`, `{"h","s","v","a"}`
//! or a `#RRGGBB[AA]` hex string). Anything else is rejected with a
//! [`ColorError`] instead of being guessed at.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Error type for color parsing failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ColorError {
    /// Input string was empty
    #[error("empty color string")]
    Empty,
    /// Input string doesn't start with '#'
    #[error("color must start with '#'")]
    MissingHash,
    /// Invalid length (must be 6 or 8 hex chars after #)
    #[error("invalid color length {0}, expected 6 or 8")]
    InvalidLength(usize),
    /// Contains non-hex characters
    #[error("invalid hex character '{0}'")]
    InvalidHex(char),
    /// Value has neither the RGB nor the HSV shape
    #[error("not a color: {0}")]
    NotAColor(String),
    /// A channel is outside its range
    #[error("color channel '{channel}' out of range: {value}")]
    OutOfRange { channel: &'static str, value: String },
}

/// A color in one of the two supported models.
///
/// RGB channels are 0..=255. HSV hue is in degrees `[0, 360)`, saturation and
/// value are `[0, 1]`. Alpha is 0..=255 in both.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "lowercase")]
pub enum Color {
    Rgb { r: u8, g: u8, b: u8, a: u8 },
    Hsv { h: f64, s: f64, v: f64, a: u8 },
}

impl Color {
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color::Rgb { r, g, b, a: 255 }
    }

    pub fn alpha(&self) -> u8 {
        match *self {
            Color::Rgb { a, .. } | Color::Hsv { a, .. } => a,
        }
    }

    /// Convert to RGB, rounding channels to the nearest integer.
    pub fn to_rgb(&self) -> Color {
        let [r, g, b, a] = self.to_rgba();
        Color::Rgb { r, g, b, a }
    }

    pub fn to_hsv(&self) -> Color {
        match *self {
            Color::Hsv { .. } => *self,
            Color::Rgb { r, g, b, a } => {
                let (r, g, b) = (r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0);
                let max = r.max(g).max(b);
                let min = r.min(g).min(b);
                let delta = max - min;

                let h = if delta == 0.0 {
                    0.0
                } else if max == r {
                    60.0 * ((g - b) / delta).rem_euclid(6.0)
                } else if max == g {
                    60.0 * ((b - r) / delta + 2.0)
                } else {
                    60.0 * ((r - g) / delta + 4.0)
                };
                let s = if max == 0.0 { 0.0 } else { delta / max };
                Color::Hsv { h, s, v: max, a }
            }
        }
    }

    /// `[r, g, b, a]` bytes.
    pub fn to_rgba(&self) -> [u8; 4] {
        match *self {
            Color::Rgb { r, g, b, a } => [r, g, b, a],
            Color::Hsv { h, s, v, a } => {
                let h = h.rem_euclid(360.0) / 60.0;
                let c = v * s;
                let x = c * (1.0 - (h % 2.0 - 1.0).abs());
                let m = v - c;
                let (r, g, b) = match h as u32 {
                    0 => (c, x, 0.0),
                    1 => (x, c, 0.0),
                    2 => (0.0, c, x),
                    3 => (0.0, x, c),
                    4 => (x, 0.0, c),
                    _ => (c, 0.0, x),
                };
                let to_u8 = |f: f64| ((f + m) * 255.0).round().clamp(0.0, 255.0) as u8;
                [to_u8(r), to_u8(g), to_u8(b), a]
            }
        }
    }

    /// `#RRGGBB`, or `#RRGGBBAA` when not opaque.
    pub fn to_hex(&self) -> String {
        let [r, g, b, a] = self.to_rgba();
        if a == 255 {
            format!("#{:02X}{:02X}{:02X}", r, g, b)
        } else {
            format!("#{:02X}{:02X}{:02X}{:02X}", r, g, b, a)
        }
    }

    /// Read a color from its JSON form.
    pub fn from_json(value: &Value) -> Result<Color, ColorError> {
        match value {
            Value::String(s) => parse_hex(s),
            Value::Object(map) => {
                let has = |k: &str| map.contains_key(k);
                let rgb = has("r") && has("g") && has("b");
                let hsv = has("h") && has("s") && has("v");
                let a = match map.get("a") {
                    None => 255,
                    Some(v) => channel_u8(v, "a")?,
                };
                match (rgb, hsv) {
                    (true, false) => Ok(Color::Rgb {
                        r: channel_u8(&map["r"], "r")?,
                        g: channel_u8(&map["g"], "g")?,
                        b: channel_u8(&map["b"], "b")?,
                        a,
                    }),
                    (false, true) => Ok(Color::Hsv {
                        h: channel_f64(&map["h"], "h", 0.0, 360.0)?,
                        s: channel_f64(&map["s"], "s", 0.0, 1.0)?,
                        v: channel_f64(&map["v"], "v", 0.0, 1.0)?,
                        a,
                    }),
                    _ => Err(ColorError::NotAColor(value.to_string())),
                }
            }
            other => Err(ColorError::NotAColor(other.to_string())),
        }
    }

    /// JSON form used by [`Color::from_json`].
    pub fn to_json(&self) -> Value {
        match *self {
            Color::Rgb { r, g, b, a } => serde_json::json!({ "r": r, "g": g, "b": b, "a": a }),
            Color::Hsv { h, s, v, a } => serde_json::json!({ "h": h, "s": s, "v": v, "a": a }),
        }
    }
}

fn channel_u8(value: &Value, channel: &'static str) -> Result<u8, ColorError> {
    value
        .as_u64()
        .and_then(|n| u8::try_from(n).ok())
        .ok_or_else(|| ColorError::OutOfRange { channel, value: value.to_string() })
}

fn channel_f64(value: &Value, channel: &'static str, min: f64, max: f64) -> Result<f64, ColorError> {
    match value.as_f64() {
        Some(f) if f >= min && f <= max => Ok(f),
        _ => Err(ColorError::OutOfRange { channel, value: value.to_string() }),
    }
}

/// Parse `#RRGGBB` or `#RRGGBBAA`.
pub fn parse_hex(s: &str) -> Result<Color, ColorError> {
    if s.is_empty() {
        return Err(ColorError::Empty);
    }
    let hex = s.strip_prefix('#').ok_or(ColorError::MissingHash)?;
    if let Some(c) = hex.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(ColorError::InvalidHex(c));
    }
    if hex.len() != 6 && hex.len() != 8 {
        return Err(ColorError::InvalidLength(hex.len()));
    }

    let pair = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| ColorError::InvalidHex('?'));
    let a = if hex.len() == 8 { pair(6)? } else { 255 };
    Ok(Color::Rgb { r: pair(0)?, g: pair(2)?, b: pair(4)?, a })
}
