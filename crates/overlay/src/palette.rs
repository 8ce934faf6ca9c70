use image::Rgba;

/// Fixed per-class palette. The mapping is deterministic: the same label
/// always gets the same color, across renders and sessions.
const PALETTE: &[(&str, [u8; 3])] = &[
    ("fish", [0x3B, 0x82, 0xF6]),
    ("salmon", [0xEF, 0x44, 0x44]),
    ("tuna", [0x10, 0xB9, 0x81]),
    ("cod", [0xF5, 0x9E, 0x0B]),
    ("bass", [0x8B, 0x5C, 0xF6]),
    ("trout", [0xEC, 0x48, 0x99]),
];

const DEFAULT: [u8; 3] = [0x3B, 0x82, 0xF6];

pub fn class_color(label: &str) -> Rgba<u8> {
    let rgb = PALETTE
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(label))
        .map(|(_, rgb)| *rgb)
        .unwrap_or(DEFAULT);
    Rgba([rgb[0], rgb[1], rgb[2], 0xFF])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_classes_get_their_palette_entry() {
        assert_eq!(class_color("salmon"), Rgba([0xEF, 0x44, 0x44, 0xFF]));
        assert_eq!(class_color("trout"), Rgba([0xEC, 0x48, 0x99, 0xFF]));
    }

    #[test]
    fn lookup_ignores_case() {
        assert_eq!(class_color("Salmon"), class_color("salmon"));
    }

    #[test]
    fn unknown_classes_fall_back_to_the_default() {
        assert_eq!(class_color("kraken"), Rgba([0x3B, 0x82, 0xF6, 0xFF]));
    }

    #[test]
    fn mapping_is_stable_across_calls() {
        for label in ["fish", "cod", "kraken"] {
            assert_eq!(class_color(label), class_color(label));
        }
    }
}
