use anyhow::Result;
use palette::Srgb;
use plotters::style::RGBColor;
use std::str::FromStr;

/// Parses a hex colour (`#1B2ACC`, `#fff`) or a CSS colour name (`blue`).
pub fn parse_color(text: &str) -> Result<Srgb<u8>> {
    let trimmed = text.trim();
    if trimmed.starts_with('#') {
        return Srgb::from_str(trimmed)
            .map_err(|e| anyhow::anyhow!("invalid hex colour '{}': {}", text, e));
    }
    palette::named::from_str(&trimmed.to_ascii_lowercase())
        .ok_or_else(|| anyhow::anyhow!("unknown colour name '{}'", text))
}

/// Plotters colour for `text`, falling back to black for unparsable input.
pub fn rgb(text: &str) -> RGBColor {
    match parse_color(text) {
        Ok(color) => RGBColor(color.red, color.green, color.blue),
        Err(e) => {
            log::warn!("{}, using black.", e);
            RGBColor(0, 0, 0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_and_named_colours() {
        assert_eq!(parse_color("#1B2ACC").unwrap(), Srgb::new(0x1B, 0x2A, 0xCC));
        assert_eq!(parse_color("#089FFF").unwrap(), Srgb::new(0x08, 0x9F, 0xFF));
        assert_eq!(parse_color("blue").unwrap(), Srgb::new(0, 0, 255));
        assert_eq!(parse_color(" Black ").unwrap(), Srgb::new(0, 0, 0));
        assert_eq!(parse_color("green").unwrap(), Srgb::new(0, 128, 0));
    }

    #[test]
    fn bad_colours() {
        assert!(parse_color("#12345Z").is_err());
        assert!(parse_color("not-a-colour").is_err());
        assert_eq!(rgb("???"), RGBColor(0, 0, 0));
        assert_eq!(rgb("#1B2ACC"), RGBColor(0x1B, 0x2A, 0xCC));
    }
}
