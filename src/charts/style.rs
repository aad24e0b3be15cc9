//! Shared colours for the interactive and static renderers.

use crate::data::Series;

/// Series palette (RGB)
pub const PALETTE: [(u8, u8, u8); 10] = [
    (231, 76, 60),  // Red
    (52, 152, 219), // Blue
    (46, 204, 113), // Green
    (155, 89, 182), // Purple
    (243, 156, 18), // Orange
    (26, 188, 156), // Teal
    (233, 30, 99),  // Pink
    (0, 188, 212),  // Cyan
    (121, 85, 72),  // Brown
    (96, 125, 139), // Blue Grey
];

/// Overlay line colour for time series drawn over a chart.
pub const OVERLAY: (u8, u8, u8) = (44, 62, 80);

/// Sequential scale for maps: pale yellow to deep red.
const SCALE_LOW: (u8, u8, u8) = (255, 237, 160);
const SCALE_MID: (u8, u8, u8) = (253, 141, 60);
const SCALE_HIGH: (u8, u8, u8) = (189, 0, 38);

/// Parse `#rrggbb` (or `rrggbb`).
pub fn parse_hex(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

/// Colour for a series: explicit override, else palette by position.
pub fn series_color(series: &Series, index: usize) -> (u8, u8, u8) {
    series
        .color
        .as_deref()
        .and_then(parse_hex)
        .unwrap_or(PALETTE[index % PALETTE.len()])
}

fn lerp(a: (u8, u8, u8), b: (u8, u8, u8), t: f64) -> (u8, u8, u8) {
    let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * t).round() as u8;
    (mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

/// Map a value onto the sequential scale, clamped to [min, max].
pub fn color_scale(value: f64, min: f64, max: f64) -> (u8, u8, u8) {
    let t = if max > min {
        ((value - min) / (max - min)).clamp(0.0, 1.0)
    } else {
        0.5
    };
    if t < 0.5 {
        lerp(SCALE_LOW, SCALE_MID, t * 2.0)
    } else {
        lerp(SCALE_MID, SCALE_HIGH, (t - 0.5) * 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colours_parse() {
        assert_eq!(parse_hex("#e74c3c"), Some((231, 76, 60)));
        assert_eq!(parse_hex("3498DB"), Some((52, 152, 219)));
        assert_eq!(parse_hex("#fff"), None);
        assert_eq!(parse_hex("#zzzzzz"), None);
    }

    #[test]
    fn series_colour_falls_back_to_palette() {
        let series = Series {
            name: "a".into(),
            values: vec![],
            color: Some("not a colour".into()),
        };
        assert_eq!(series_color(&series, 11), PALETTE[1]);
    }

    #[test]
    fn scale_endpoints_and_clamping() {
        assert_eq!(color_scale(0.0, 0.0, 1.0), SCALE_LOW);
        assert_eq!(color_scale(1.0, 0.0, 1.0), SCALE_HIGH);
        assert_eq!(color_scale(5.0, 0.0, 1.0), SCALE_HIGH);
        assert_eq!(color_scale(-5.0, 0.0, 1.0), SCALE_LOW);
        assert_eq!(color_scale(0.5, 0.0, 1.0), SCALE_MID);
    }
}
