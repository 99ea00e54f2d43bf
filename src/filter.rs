use image::RgbaImage;

use crate::error::FilterParseError;

/// Named entry of the filter catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterDefinition {
    pub id: &'static str,
    pub display_name: &'static str,
    pub icon: &'static str,
    /// CSS filter function list, e.g. `sepia(0.4) contrast(1.1)`.
    pub expression: &'static str,
}

pub const DEFAULT_FILTER_ID: &str = "none";

const FILTERS: &[FilterDefinition] = &[
    FilterDefinition { id: "none", display_name: "Original", icon: "✨", expression: "" },
    FilterDefinition {
        id: "vintage",
        display_name: "Vintage",
        icon: "📷",
        expression: "sepia(0.4) contrast(1.1) brightness(0.95)",
    },
    FilterDefinition {
        id: "bw",
        display_name: "Black & White",
        icon: "⚫",
        expression: "grayscale(1) contrast(1.2)",
    },
    FilterDefinition {
        id: "warm",
        display_name: "Warm",
        icon: "🌅",
        expression: "sepia(0.2) saturate(1.3) brightness(1.05)",
    },
    FilterDefinition {
        id: "cool",
        display_name: "Cool",
        icon: "❄️",
        expression: "saturate(0.9) brightness(1.05) hue-rotate(10deg)",
    },
    FilterDefinition {
        id: "soft",
        display_name: "Soft",
        icon: "🌸",
        expression: "contrast(0.9) brightness(1.1) saturate(0.9)",
    },
];

impl FilterDefinition {
    pub fn all() -> &'static [FilterDefinition] {
        FILTERS
    }

    pub fn find(id: &str) -> Option<&'static FilterDefinition> {
        FILTERS.iter().find(|f| f.id == id)
    }

    pub fn none() -> &'static FilterDefinition {
        &FILTERS[0]
    }

    pub fn chain(&self) -> Result<FilterChain, FilterParseError> {
        FilterChain::parse(self.expression)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterOp {
    Grayscale(f32),
    Sepia(f32),
    Saturate(f32),
    HueRotate(f32), // degrees
    Brightness(f32),
    Contrast(f32),
}

impl FilterOp {
    fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        let [r, g, b] = rgb;
        let out = match *self {
            FilterOp::Grayscale(amount) => {
                let a = 1.0 - amount.clamp(0.0, 1.0);
                mat3(
                    [
                        [0.2126 + 0.7874 * a, 0.7152 - 0.7152 * a, 0.0722 - 0.0722 * a],
                        [0.2126 - 0.2126 * a, 0.7152 + 0.2848 * a, 0.0722 - 0.0722 * a],
                        [0.2126 - 0.2126 * a, 0.7152 - 0.7152 * a, 0.0722 + 0.9278 * a],
                    ],
                    rgb,
                )
            }
            FilterOp::Sepia(amount) => {
                let a = 1.0 - amount.clamp(0.0, 1.0);
                mat3(
                    [
                        [0.393 + 0.607 * a, 0.769 - 0.769 * a, 0.189 - 0.189 * a],
                        [0.349 - 0.349 * a, 0.686 + 0.314 * a, 0.168 - 0.168 * a],
                        [0.272 - 0.272 * a, 0.534 - 0.534 * a, 0.131 + 0.869 * a],
                    ],
                    rgb,
                )
            }
            FilterOp::Saturate(s) => {
                let s = s.max(0.0);
                mat3(
                    [
                        [0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s],
                        [0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s],
                        [0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s],
                    ],
                    rgb,
                )
            }
            FilterOp::HueRotate(degrees) => {
                let (sin, cos) = degrees.to_radians().sin_cos();
                mat3(
                    [
                        [
                            0.213 + cos * 0.787 - sin * 0.213,
                            0.715 - cos * 0.715 - sin * 0.715,
                            0.072 - cos * 0.072 + sin * 0.928,
                        ],
                        [
                            0.213 - cos * 0.213 + sin * 0.143,
                            0.715 + cos * 0.285 + sin * 0.140,
                            0.072 - cos * 0.072 - sin * 0.283,
                        ],
                        [
                            0.213 - cos * 0.213 - sin * 0.787,
                            0.715 - cos * 0.715 + sin * 0.715,
                            0.072 + cos * 0.928 + sin * 0.072,
                        ],
                    ],
                    rgb,
                )
            }
            FilterOp::Brightness(k) => {
                let k = k.max(0.0);
                [r * k, g * k, b * k]
            }
            FilterOp::Contrast(k) => {
                let k = k.max(0.0);
                let offset = 0.5 - 0.5 * k;
                [r * k + offset, g * k + offset, b * k + offset]
            }
        };
        // Each primitive clamps before the next one runs
        [out[0].clamp(0.0, 1.0), out[1].clamp(0.0, 1.0), out[2].clamp(0.0, 1.0)]
    }
}

fn mat3(m: [[f32; 3]; 3], v: [f32; 3]) -> [f32; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

/// Parsed filter expression, applied left to right.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterChain {
    ops: Vec<FilterOp>,
}

impl FilterChain {
    pub fn parse(expression: &str) -> Result<Self, FilterParseError> {
        let mut ops = Vec::new();
        let mut rest = expression.trim();

        while !rest.is_empty() {
            let open = rest
                .find('(')
                .ok_or_else(|| FilterParseError::Malformed(rest.to_string()))?;
            let close = rest[open..]
                .find(')')
                .map(|i| open + i)
                .ok_or_else(|| FilterParseError::Malformed(rest.to_string()))?;

            let name = rest[..open].trim();
            let argument = rest[open + 1..close].trim();
            ops.push(parse_op(name, argument)?);

            rest = rest[close + 1..].trim_start();
        }

        Ok(Self { ops })
    }

    pub fn ops(&self) -> &[FilterOp] {
        &self.ops
    }

    pub fn is_identity(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn apply_pixel(&self, rgba: [u8; 4]) -> [u8; 4] {
        let mut rgb = [
            rgba[0] as f32 / 255.0,
            rgba[1] as f32 / 255.0,
            rgba[2] as f32 / 255.0,
        ];
        for op in &self.ops {
            rgb = op.apply(rgb);
        }
        [
            (rgb[0] * 255.0).round() as u8,
            (rgb[1] * 255.0).round() as u8,
            (rgb[2] * 255.0).round() as u8,
            rgba[3],
        ]
    }

    pub fn apply(&self, image: &mut RgbaImage) {
        if self.is_identity() {
            return;
        }
        for pixel in image.pixels_mut() {
            pixel.0 = self.apply_pixel(pixel.0);
        }
    }
}

fn parse_op(name: &str, argument: &str) -> Result<FilterOp, FilterParseError> {
    let invalid = || FilterParseError::InvalidArgument {
        function: name.to_string(),
        argument: argument.to_string(),
    };

    match name {
        "hue-rotate" => parse_angle(argument).map(FilterOp::HueRotate).ok_or_else(invalid),
        "grayscale" | "sepia" | "saturate" | "brightness" | "contrast" => {
            let amount = parse_amount(argument).ok_or_else(invalid)?;
            Ok(match name {
                "grayscale" => FilterOp::Grayscale(amount),
                "sepia" => FilterOp::Sepia(amount),
                "saturate" => FilterOp::Saturate(amount),
                "brightness" => FilterOp::Brightness(amount),
                _ => FilterOp::Contrast(amount),
            })
        }
        other => Err(FilterParseError::UnknownFunction(other.to_string())),
    }
}

/// `0.4` or `40%`; an empty argument means 1.
fn parse_amount(argument: &str) -> Option<f32> {
    if argument.is_empty() {
        return Some(1.0);
    }
    let value = match argument.strip_suffix('%') {
        Some(percent) => percent.trim().parse::<f32>().ok()? / 100.0,
        None => argument.parse::<f32>().ok()?,
    };
    (value >= 0.0).then_some(value)
}

/// Angle in degrees from `deg`, `rad` or `turn` units; bare zero allowed.
fn parse_angle(argument: &str) -> Option<f32> {
    if argument.is_empty() {
        return Some(0.0);
    }
    if let Some(v) = argument.strip_suffix("deg") {
        return v.trim().parse().ok();
    }
    if let Some(v) = argument.strip_suffix("rad") {
        return v.trim().parse::<f32>().ok().map(f32::to_degrees);
    }
    if let Some(v) = argument.strip_suffix("turn") {
        return v.trim().parse::<f32>().ok().map(|t| t * 360.0);
    }
    match argument.parse::<f32>() {
        Ok(v) if v == 0.0 => Some(0.0),
        _ => None,
    }
}
