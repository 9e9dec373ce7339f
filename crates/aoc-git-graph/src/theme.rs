use aoc_core::LaneColor;
use ratatui::style::{Color, Modifier, Style};

pub const HEADER_STYLE: Style = Style::new()
    .fg(Color::Rgb(142, 192, 124))
    .add_modifier(Modifier::BOLD);
pub const SELECTED_STYLE: Style = Style::new()
    .bg(Color::Rgb(60, 56, 54))
    .add_modifier(Modifier::BOLD);
pub const HASH_STYLE: Style = Style::new().fg(Color::Rgb(250, 189, 47));
pub const AUTHOR_STYLE: Style = Style::new().fg(Color::Rgb(131, 165, 152));
pub const DIM_STYLE: Style = Style::new().fg(Color::Rgb(146, 131, 116));
pub const ERROR_STYLE: Style = Style::new()
    .fg(Color::Rgb(251, 73, 52))
    .add_modifier(Modifier::BOLD);

const FALLBACK_LANE: Color = Color::Gray;

pub fn zebra_row_style(index: usize) -> Style {
    let bg = if index % 2 == 0 {
        Color::Rgb(18, 20, 26)
    } else {
        Color::Rgb(24, 27, 34)
    };
    Style::new().bg(bg)
}

pub fn lane_color(color: LaneColor) -> Color {
    parse_hex(color.hex()).unwrap_or(FALLBACK_LANE)
}

/// Lane glyph style; glyphs on the selected lineage are drawn bold.
pub fn lane_style(color: Option<LaneColor>, highlighted: bool) -> Style {
    let Some(color) = color else {
        return Style::new();
    };
    let style = Style::new().fg(lane_color(color));
    if highlighted {
        style.add_modifier(Modifier::BOLD)
    } else {
        style
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(digits.get(range)?, 16).ok();
    Some(Color::Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aoc_core::LANE_PALETTE;

    #[test]
    fn every_palette_entry_parses() {
        for index in 0..LANE_PALETTE.len() {
            let color = LaneColor::from_counter(index);
            assert_ne!(lane_color(color), FALLBACK_LANE, "{}", color.hex());
        }
        assert_eq!(parse_hex("#83a598"), Some(Color::Rgb(0x83, 0xa5, 0x98)));
        assert_eq!(parse_hex("83a598"), None);
        assert_eq!(parse_hex("#zzzzzz"), None);
    }
}
