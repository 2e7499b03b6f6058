use serde::{Deserialize, Serialize};

/// Linear premultiplied RGBA color.
///
/// Invariant:
/// - `rgb` components are expected to be multiplied by `a` (premultiplied alpha).
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Color {
    pub r: f32, // premultiplied
    pub g: f32, // premultiplied
    pub b: f32, // premultiplied
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color { r: 1.0, g: 1.0, b: 1.0, a: 1.0 };

    #[inline]
    pub const fn transparent() -> Self {
        Self { r: 0.0, g: 0.0, b: 0.0, a: 0.0 }
    }

    /// Creates a premultiplied color from straight sRGB bytes (`0`–`255`).
    #[inline]
    pub fn from_srgb_u8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::from_straight(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, a as f32 / 255.0)
    }

    /// Parses `#rgb`, `#rrggbb` or `#rrggbbaa` (the leading `#` is optional).
    pub fn from_hex(s: &str) -> Option<Self> {
        let hex = s.trim().trim_start_matches('#');
        let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        match hex.len() {
            3 => {
                let nib = |i: usize| {
                    let v = u8::from_str_radix(hex.get(i..i + 1)?, 16).ok()?;
                    Some(v * 17)
                };
                Some(Self::from_srgb_u8(nib(0)?, nib(1)?, nib(2)?, 255))
            }
            6 => Some(Self::from_srgb_u8(byte(0)?, byte(2)?, byte(4)?, 255)),
            8 => Some(Self::from_srgb_u8(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => None,
        }
    }

    /// Creates a premultiplied color from premultiplied components.
    #[inline]
    pub const fn from_premul(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Creates a premultiplied color from straight alpha components.
    #[inline]
    pub fn from_straight(r: f32, g: f32, b: f32, a: f32) -> Self {
        let a = a.clamp(0.0, 1.0);
        Self {
            r: (r.clamp(0.0, 1.0)) * a,
            g: (g.clamp(0.0, 1.0)) * a,
            b: (b.clamp(0.0, 1.0)) * a,
            a,
        }
    }

    /// Scales opacity, keeping premultiplication intact.
    #[inline]
    pub fn fade(self, factor: f32) -> Self {
        let f = factor.clamp(0.0, 1.0);
        Self { r: self.r * f, g: self.g * f, b: self.b * f, a: self.a * f }
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.r.is_finite() && self.g.is_finite() && self.b.is_finite() && self.a.is_finite()
    }

    #[inline]
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Clamps all channels to [0, 1] and enforces premultiplication.
    ///
    /// Used on colors that came from untrusted scene data.
    #[inline]
    pub fn clamped(self) -> Self {
        if !self.is_finite() {
            return Self::transparent();
        }
        let a = self.a.clamp(0.0, 1.0);
        Self {
            r: self.r.clamp(0.0, a),
            g: self.g.clamp(0.0, a),
            b: self.b.clamp(0.0, a),
            a,
        }
    }
}

/// Color as it appears in scene custom data and config files.
///
/// Accepts either a hex string or a straight-alpha `[r, g, b, a]` array in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColorSpec {
    Hex(String),
    Rgba([f32; 4]),
}

impl ColorSpec {
    /// Resolves to a premultiplied color; malformed hex strings yield `None`.
    pub fn resolve(&self) -> Option<Color> {
        match self {
            ColorSpec::Hex(s) => Color::from_hex(s),
            ColorSpec::Rgba([r, g, b, a]) => {
                let c = Color::from_straight(*r, *g, *b, *a);
                c.is_finite().then_some(c)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_forms_agree() {
        assert_eq!(Color::from_hex("#fff"), Color::from_hex("ffffff"));
        assert_eq!(Color::from_hex("#ff000080").map(|c| c.a), Some(128.0 / 255.0));
    }

    #[test]
    fn bad_hex_is_none() {
        assert!(Color::from_hex("#12").is_none());
        assert!(Color::from_hex("#zzzzzz").is_none());
    }

    #[test]
    fn nan_clamps_to_transparent() {
        let c = Color::from_premul(f32::NAN, 0.0, 0.0, 1.0).clamped();
        assert_eq!(c, Color::transparent());
    }

    #[test]
    fn spec_from_json_array() {
        let spec: ColorSpec = serde_json::from_str("[1.0, 0.0, 0.0, 0.5]").unwrap();
        assert_eq!(spec.resolve(), Some(Color::from_premul(0.5, 0.0, 0.0, 0.5)));
    }
}
