//! CSS color parsing and WCAG 2.1 contrast math.

/// Opaque sRGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    /// Red component (0-255)
    pub r: u8,
    /// Green component (0-255)
    pub g: u8,
    /// Blue component (0-255)
    pub b: u8,
}

impl Color {
    /// Default text color
    pub const BLACK: Self = Self::new(0, 0, 0);
    /// Default page background
    pub const WHITE: Self = Self::new(255, 255, 255);

    /// Create a new color
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Create from hex value (e.g., 0xFF5500)
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xFF) as u8,
            g: ((hex >> 8) & 0xFF) as u8,
            b: (hex & 0xFF) as u8,
        }
    }

    /// Parse a CSS color value.
    ///
    /// Accepts `#rgb`, `#rrggbb`, `rgb(r, g, b)`, `rgba(r, g, b, a)` and a
    /// handful of named colors. Fully transparent colors and anything else
    /// yield `None`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_ascii_lowercase();
        if let Some(hex) = value.strip_prefix('#') {
            return parse_hex(hex);
        }
        if let Some(args) = value
            .strip_prefix("rgba(")
            .or_else(|| value.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return parse_rgb_args(args);
        }
        named(&value)
    }

    /// Get the relative luminance (per WCAG 2.1)
    #[must_use]
    pub fn relative_luminance(&self) -> f32 {
        let r = srgb_to_linear(f32::from(self.r) / 255.0);
        let g = srgb_to_linear(f32::from(self.g) / 255.0);
        let b = srgb_to_linear(f32::from(self.b) / 255.0);
        0.2126 * r + 0.7152 * g + 0.0722 * b
    }

    /// Calculate contrast ratio with another color (1.0 to 21.0)
    #[must_use]
    pub fn contrast_ratio(&self, other: &Self) -> f32 {
        let l1 = self.relative_luminance();
        let l2 = other.relative_luminance();
        let lighter = l1.max(l2);
        let darker = l1.min(l2);
        (lighter + 0.05) / (darker + 0.05)
    }
}

/// Convert sRGB to linear RGB (per WCAG 2.1)
fn srgb_to_linear(value: f32) -> f32 {
    if value <= 0.03928 {
        value / 12.92
    } else {
        ((value + 0.055) / 1.055).powf(2.4)
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        3 | 4 => {
            let digit = |i: usize| u8::from_str_radix(&hex[i..=i], 16).ok().map(|d| d * 17);
            if hex.len() == 4 && digit(3)? == 0 {
                return None;
            }
            Some(Color::new(digit(0)?, digit(1)?, digit(2)?))
        }
        6 | 8 => {
            if hex.len() == 8 && &hex[6..8] == "00" {
                return None;
            }
            u32::from_str_radix(&hex[..6], 16).ok().map(Color::from_hex)
        }
        _ => None,
    }
}

fn parse_rgb_args(args: &str) -> Option<Color> {
    let parts: Vec<&str> = args
        .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() < 3 || parts.len() > 4 {
        return None;
    }
    if let Some(alpha) = parts.get(3) {
        let alpha = match alpha.strip_suffix('%') {
            Some(percent) => percent.parse::<f32>().ok()? / 100.0,
            None => alpha.parse::<f32>().ok()?,
        };
        if alpha <= 0.0 {
            return None;
        }
    }
    let channel = |part: &str| -> Option<u8> {
        let value = match part.strip_suffix('%') {
            Some(percent) => percent.parse::<f32>().ok()? * 2.55,
            None => part.parse::<f32>().ok()?,
        };
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Some(value.round().clamp(0.0, 255.0) as u8)
    };
    Some(Color::new(
        channel(parts[0])?,
        channel(parts[1])?,
        channel(parts[2])?,
    ))
}

fn named(name: &str) -> Option<Color> {
    let hex = match name {
        "black" => 0x0000_0000,
        "white" => 0x00FF_FFFF,
        "red" => 0x00FF_0000,
        "green" => 0x0000_8000,
        "lime" => 0x0000_FF00,
        "blue" => 0x0000_00FF,
        "navy" => 0x0000_0080,
        "yellow" => 0x00FF_FF00,
        "orange" => 0x00FF_A500,
        "purple" => 0x0080_0080,
        "fuchsia" | "magenta" => 0x00FF_00FF,
        "aqua" | "cyan" => 0x0000_FFFF,
        "teal" => 0x0000_8080,
        "maroon" => 0x0080_0000,
        "olive" => 0x0080_8000,
        "silver" => 0x00C0_C0C0,
        "gray" | "grey" => 0x0080_8080,
        "lightgray" | "lightgrey" => 0x00D3_D3D3,
        "darkgray" | "darkgrey" => 0x00A9_A9A9,
        _ => return None,
    };
    Some(Color::from_hex(hex))
}
