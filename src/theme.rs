use image::Rgba;

/// One gradient stop: offset in `0.0..=1.0` and an sRGB color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStop {
    pub offset: f32,
    pub color: Rgba<u8>,
}

/// Decorative background and text color for the composed strip.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameTheme {
    pub id: &'static str,
    pub display_name: &'static str,
    pub icon: &'static str,
    pub gradient: Vec<ColorStop>,
    pub text_color: Rgba<u8>,
}

pub const DEFAULT_THEME_ID: &str = "peach";

// (id, name, icon, start, end, text)
const THEME_TABLE: &[(&str, &str, &str, &str, &str, &str)] = &[
    ("coral", "Coral", "🌺", "#ff9a9e", "#fecfef", "#d63384"),
    ("peach", "Peach", "🍑", "#ffecd2", "#fcb69f", "#e85d04"),
    ("sunset", "Sunset", "🌇", "#fa709a", "#fee140", "#d00000"),
    ("cream", "Cream", "🍦", "#fdfbfb", "#ebedee", "#6c757d"),
    ("mint", "Mint", "🌱", "#d4fc79", "#96e6a1", "#2d6a4f"),
    ("sage", "Sage", "🌿", "#c1dfc4", "#deecdd", "#40916c"),
    ("rose", "Rose", "🌹", "#ffc3a0", "#ffafbd", "#c9184a"),
    ("lavender", "Lavender", "💜", "#e0c3fc", "#8ec5fc", "#7209b7"),
    ("sky", "Sky", "☁️", "#a1c4fd", "#c2e9fb", "#0077b6"),
    ("ocean", "Ocean", "🌊", "#667eea", "#764ba2", "#ffffff"),
    ("mono", "Mono", "⬜", "#f5f5f5", "#e0e0e0", "#424242"),
    ("dark", "Dark", "⬛", "#434343", "#000000", "#ffffff"),
];

impl FrameTheme {
    pub fn all() -> Vec<FrameTheme> {
        THEME_TABLE.iter().map(Self::from_row).collect()
    }

    pub fn find(id: &str) -> Option<FrameTheme> {
        THEME_TABLE.iter().find(|row| row.0 == id).map(Self::from_row)
    }

    pub fn default_theme() -> FrameTheme {
        Self::find(DEFAULT_THEME_ID).unwrap_or_else(|| Self::from_row(&THEME_TABLE[1]))
    }

    fn from_row(row: &(&'static str, &'static str, &'static str, &str, &str, &str)) -> FrameTheme {
        let (id, display_name, icon, start, end, text) = *row;
        FrameTheme {
            id,
            display_name,
            icon,
            gradient: vec![
                ColorStop { offset: 0.0, color: parse_hex_color(start).unwrap_or(BLACK) },
                ColorStop { offset: 1.0, color: parse_hex_color(end).unwrap_or(BLACK) },
            ],
            text_color: parse_hex_color(text).unwrap_or(BLACK),
        }
    }

    /// Color of the gradient at `t` (clamped to `0.0..=1.0`).
    pub fn gradient_at(&self, t: f32) -> Rgba<u8> {
        sample_stops(&self.gradient, t)
    }
}

const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Parse `#rgb` or `#rrggbb` into an opaque color.
pub fn parse_hex_color(hex: &str) -> Option<Rgba<u8>> {
    let digits = hex.strip_prefix('#')?;
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match digits.len() {
        6 => Some(Rgba([
            channel(&digits[0..2])?,
            channel(&digits[2..4])?,
            channel(&digits[4..6])?,
            255,
        ])),
        3 => {
            let expand = |i: usize| channel(&digits[i..i + 1]).map(|v| v * 17);
            Some(Rgba([expand(0)?, expand(1)?, expand(2)?, 255]))
        }
        _ => None,
    }
}

pub fn sample_stops(stops: &[ColorStop], t: f32) -> Rgba<u8> {
    let t = t.clamp(0.0, 1.0);
    let (first, last) = match (stops.first(), stops.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return BLACK,
    };
    if t <= first.offset {
        return first.color;
    }
    if t >= last.offset {
        return last.color;
    }

    for pair in stops.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if t >= a.offset && t <= b.offset {
            let span = b.offset - a.offset;
            let local = if span <= f32::EPSILON { 0.0 } else { (t - a.offset) / span };
            return lerp_color(a.color, b.color, local);
        }
    }
    last.color
}

fn lerp_color(a: Rgba<u8>, b: Rgba<u8>, t: f32) -> Rgba<u8> {
    let mix = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * t).round().clamp(0.0, 255.0) as u8;
    Rgba([mix(a[0], b[0]), mix(a[1], b[1]), mix(a[2], b[2]), mix(a[3], b[3])])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_has_twelve_unique_themes() {
        let themes = FrameTheme::all();
        assert_eq!(themes.len(), 12);
        let mut ids: Vec<_> = themes.iter().map(|t| t.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 12);
    }

    #[test]
    fn test_default_theme_is_peach() {
        let theme = FrameTheme::default_theme();
        assert_eq!(theme.id, "peach");
        assert_eq!(theme.text_color, Rgba([0xe8, 0x5d, 0x04, 255]));
    }

    #[test]
    fn test_mono_theme_values() {
        let mono = FrameTheme::find("mono").unwrap();
        assert_eq!(mono.gradient[0].color, Rgba([0xf5, 0xf5, 0xf5, 255]));
        assert_eq!(mono.gradient[1].color, Rgba([0xe0, 0xe0, 0xe0, 255]));
        assert_eq!(mono.text_color, Rgba([0x42, 0x42, 0x42, 255]));
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#ff0080"), Some(Rgba([255, 0, 128, 255])));
        assert_eq!(parse_hex_color("#fff"), Some(Rgba([255, 255, 255, 255])));
        assert_eq!(parse_hex_color("ff0080"), None);
        assert_eq!(parse_hex_color("#gg0000"), None);
    }

    #[test]
    fn test_gradient_sampling() {
        let dark = FrameTheme::find("dark").unwrap();
        assert_eq!(dark.gradient_at(0.0), Rgba([0x43, 0x43, 0x43, 255]));
        assert_eq!(dark.gradient_at(1.0), Rgba([0, 0, 0, 255]));
        assert_eq!(dark.gradient_at(-3.0), dark.gradient_at(0.0));

        let mid = dark.gradient_at(0.5);
        assert!(mid[0] > 0 && mid[0] < 0x43);
    }
}
