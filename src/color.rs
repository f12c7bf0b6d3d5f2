/// Color as stored on materials and instances. Components are in the
/// 0..=1 range, sRGB, straight alpha.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// Applied when the color service is unreachable or the payload is junk.
pub const FALLBACK_COLOR: Rgba = Rgba::BLACK;

impl Rgba {
    pub const BLACK: Rgba = Rgba::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Rgba = Rgba::new(1.0, 1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// From a packed 0xRRGGBB value, opaque.
    pub fn from_hex(rgb: u32) -> Self {
        Self::new(
            ((rgb >> 16) & 0xff) as f32 / 255.0,
            ((rgb >> 8) & 0xff) as f32 / 255.0,
            (rgb & 0xff) as f32 / 255.0,
            1.0,
        )
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// sRGB to linear, for clear colors handed straight to the GPU.
    pub fn to_linear(self) -> [f64; 4] {
        fn channel(c: f32) -> f64 {
            let c = c as f64;
            if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        }
        [channel(self.r), channel(self.g), channel(self.b), self.a as f64]
    }
}

/// Parses the CSS-style color strings the color service returns.
///
/// Supports `#rgb`, `#rrggbb` (leading `#` optional) and the handful of
/// named colors that actually show up in model data. Returns `None` for
/// anything else; callers fall back to [`FALLBACK_COLOR`].
pub fn parse_css_color(input: &str) -> Option<Rgba> {
    let input = input.trim();

    if let Some(named) = named_color(input) {
        return Some(named);
    }

    let hex = input.strip_prefix('#').unwrap_or(input);
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    match hex.len() {
        3 => {
            let mut channels = hex.chars().map(|c| {
                let v = c.to_digit(16).unwrap() as u32;
                (v << 4 | v) as f32 / 255.0
            });
            Some(Rgba::new(
                channels.next().unwrap(),
                channels.next().unwrap(),
                channels.next().unwrap(),
                1.0,
            ))
        }
        6 => {
            let packed = u32::from_str_radix(hex, 16).ok()?;
            Some(Rgba::from_hex(packed))
        }
        _ => None,
    }
}

fn named_color(name: &str) -> Option<Rgba> {
    let rgb = match name.to_ascii_lowercase().as_str() {
        "black" => 0x000000,
        "white" => 0xffffff,
        "red" => 0xff0000,
        "green" => 0x008000,
        "blue" => 0x0000ff,
        "yellow" => 0xffff00,
        "cyan" => 0x00ffff,
        "magenta" => 0xff00ff,
        "gray" | "grey" => 0x808080,
        "orange" => 0xffa500,
        "purple" => 0x800080,
        "brown" => 0xa52a2a,
        "pink" => 0xffc0cb,
        _ => return None,
    };
    Some(Rgba::from_hex(rgb))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_six_digit_hex() {
        assert_eq!(
            parse_css_color("#ff00ff"),
            Some(Rgba::new(1.0, 0.0, 1.0, 1.0))
        );
        assert_eq!(parse_css_color("000000"), Some(Rgba::BLACK));
    }

    #[test]
    fn parses_three_digit_hex() {
        assert_eq!(parse_css_color("#fff"), Some(Rgba::WHITE));
        assert_eq!(parse_css_color("#f0f"), Some(Rgba::new(1.0, 0.0, 1.0, 1.0)));
    }

    #[test]
    fn parses_named_colors() {
        assert_eq!(parse_css_color("Magenta"), Some(Rgba::from_hex(0xff00ff)));
        assert_eq!(parse_css_color("black"), Some(Rgba::BLACK));
    }

    #[test]
    fn rejects_junk() {
        assert_eq!(parse_css_color(""), None);
        assert_eq!(parse_css_color("#12345"), None);
        assert_eq!(parse_css_color("not-a-color"), None);
        assert_eq!(parse_css_color("#ggg"), None);
    }

    #[test]
    fn fallback_is_black() {
        assert_eq!(FALLBACK_COLOR, Rgba::BLACK);
    }
}
