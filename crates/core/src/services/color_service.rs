use crate::models::position::Position;

/// Chart palette, assigned to positions by index.
pub const PRESET_COLORS: [&str; 8] = [
    "#3b82f6", "#10b981", "#f59e0b", "#ef4444", "#8b5cf6", "#ec4899", "#06b6d4", "#84cc16",
];

/// Color for a position in charts: its own color, else the preset for its
/// index, else a random one.
#[must_use]
pub fn position_color(position: &Position, index: usize) -> String {
    if let Some(color) = position.color.as_deref().filter(|c| !c.is_empty()) {
        return color.to_string();
    }
    match PRESET_COLORS.get(index) {
        Some(preset) => (*preset).to_string(),
        None => random_color(),
    }
}

/// A vivid random color that reads well on a dark background, as `#rrggbb`.
///
/// Hue 0–359°, saturation 60–90%, lightness 45–60%. Hex rather than HSL
/// because the backend only stores `#rrggbb` colors.
#[must_use]
pub fn random_color() -> String {
    let mut bytes = [0u8; 4];
    if getrandom::getrandom(&mut bytes).is_err() {
        log::debug!("OS randomness unavailable, using a preset color");
        return PRESET_COLORS[0].to_string();
    }

    let hue = f64::from(u16::from_le_bytes([bytes[0], bytes[1]]) % 360);
    let saturation = 60.0 + f64::from(bytes[2]) / 255.0 * 30.0;
    let lightness = 45.0 + f64::from(bytes[3]) / 255.0 * 15.0;
    hsl_to_hex(hue, saturation, lightness)
}

/// Convert HSL (degrees, percent, percent) to `#rrggbb`.
#[must_use]
pub fn hsl_to_hex(hue: f64, saturation: f64, lightness: f64) -> String {
    let s = (saturation / 100.0).clamp(0.0, 1.0);
    let l = (lightness / 100.0).clamp(0.0, 1.0);
    let h = hue.rem_euclid(360.0) / 60.0;

    let chroma = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = chroma * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let m = l - chroma / 2.0;
    let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;

    format!("#{:02x}{:02x}{:02x}", channel(r), channel(g), channel(b))
}
