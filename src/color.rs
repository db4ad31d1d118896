use std::str::FromStr;

use eframe::egui::Color32;
use palette::Srgb;

// ---------------------------------------------------------------------------
// Fixed activity colours
// ---------------------------------------------------------------------------

/// Known activity labels and their colours. Any other label gets
/// [`DEFAULT_ACTIVITY_HEX`].
const ACTIVITY_COLORS: &[(&str, &str)] = &[
    ("rest", "#6B7280"),
    ("grip", "#EF4444"),
    ("release", "#3B82F6"),
];

pub const DEFAULT_ACTIVITY_HEX: &str = "#10B981";

/// Smoothed trace when no category column is selected.
pub const SMOOTH_HEX: &str = "#111827";

/// Thin translucent gray for the raw signal.
pub const RAW_TRACE: Color32 = Color32::from_rgba_premultiplied(36, 36, 36, 77);

/// Parse `#rrggbb` into an egui colour.
pub fn hex_to_color32(hex: &str) -> Option<Color32> {
    let rgb = Srgb::<u8>::from_str(hex).ok()?;
    Some(Color32::from_rgb(rgb.red, rgb.green, rgb.blue))
}

fn hex_or_gray(hex: &str) -> Color32 {
    hex_to_color32(hex).unwrap_or(Color32::GRAY)
}

/// Colour for an activity label, shared by the line and bar charts.
pub fn activity_color(label: &str) -> Color32 {
    let hex = ACTIVITY_COLORS
        .iter()
        .find(|(known, _)| *known == label)
        .map(|(_, hex)| *hex)
        .unwrap_or(DEFAULT_ACTIVITY_HEX);
    hex_or_gray(hex)
}

pub fn smooth_color() -> Color32 {
    hex_or_gray(SMOOTH_HEX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_labels_use_fixed_colours() {
        assert_eq!(activity_color("rest"), Color32::from_rgb(0x6B, 0x72, 0x80));
        assert_eq!(activity_color("grip"), Color32::from_rgb(0xEF, 0x44, 0x44));
        assert_eq!(activity_color("release"), Color32::from_rgb(0x3B, 0x82, 0xF6));
    }

    #[test]
    fn unknown_labels_fall_back() {
        let fallback = Color32::from_rgb(0x10, 0xB9, 0x81);
        assert_eq!(activity_color("walk"), fallback);
        assert_eq!(activity_color("Grip"), fallback);
        assert_eq!(activity_color("3"), fallback);
    }

    #[test]
    fn hex_parsing() {
        assert_eq!(hex_to_color32("#111827"), Some(Color32::from_rgb(0x11, 0x18, 0x27)));
        assert_eq!(hex_to_color32("not a colour"), None);
    }
}
