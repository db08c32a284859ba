//! Background color parsing
//!
//! Supports the following formats:
//! - Hex: `#RGB`, `#RGBA`, `#RRGGBB`, `#RRGGBBAA`
//! - Named: `transparent`, `black`, `white`

use image::Rgba;
use thiserror::Error;

/// Error type for color parsing failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    /// Input string was empty
    #[error("empty color string")]
    Empty,
    /// Invalid length (must be 3, 4, 6, or 8 hex chars after #)
    #[error("invalid color length {0}, expected 3, 4, 6, or 8")]
    InvalidLength(usize),
    /// Contains non-hex characters
    #[error("invalid hex character '{0}'")]
    InvalidHex(char),
    /// Not a hex color and not a known name
    #[error("unknown color name '{0}'")]
    UnknownName(String),
}

/// Parse a color string into an RGBA color.
///
/// # Examples
///
/// ```
/// use tilestitch::color::parse_color;
///
/// assert_eq!(parse_color("#F00").unwrap(), image::Rgba([255, 0, 0, 255]));
/// assert_eq!(parse_color("#00FF0080").unwrap(), image::Rgba([0, 255, 0, 128]));
/// assert_eq!(parse_color("transparent").unwrap(), image::Rgba([0, 0, 0, 0]));
/// ```
///
/// # Errors
///
/// Returns `ColorError` if the input is invalid or unparseable.
pub fn parse_color(s: &str) -> Result<Rgba<u8>, ColorError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ColorError::Empty);
    }

    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex_color(hex);
    }

    match s.to_ascii_lowercase().as_str() {
        "transparent" | "none" => Ok(Rgba([0, 0, 0, 0])),
        "black" => Ok(Rgba([0, 0, 0, 255])),
        "white" => Ok(Rgba([255, 255, 255, 255])),
        _ => Err(ColorError::UnknownName(s.to_string())),
    }
}

/// Parse the digits of a hex color (RGB, RGBA, RRGGBB, RRGGBBAA)
fn parse_hex_color(hex: &str) -> Result<Rgba<u8>, ColorError> {
    if let Some(c) = hex.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(ColorError::InvalidHex(c));
    }

    let digits: Vec<u8> = hex.chars().map(parse_hex_digit).collect::<Result<_, _>>()?;

    match digits.len() {
        // Short forms double each digit: #F00 -> #FF0000
        3 => Ok(Rgba([digits[0] * 17, digits[1] * 17, digits[2] * 17, 255])),
        4 => Ok(Rgba([digits[0] * 17, digits[1] * 17, digits[2] * 17, digits[3] * 17])),
        6 => Ok(Rgba([
            digits[0] * 16 + digits[1],
            digits[2] * 16 + digits[3],
            digits[4] * 16 + digits[5],
            255,
        ])),
        8 => Ok(Rgba([
            digits[0] * 16 + digits[1],
            digits[2] * 16 + digits[3],
            digits[4] * 16 + digits[5],
            digits[6] * 16 + digits[7],
        ])),
        len => Err(ColorError::InvalidLength(len)),
    }
}

/// Parse a single hex digit (0-9, A-F, a-f) to u8 (0-15)
fn parse_hex_digit(c: char) -> Result<u8, ColorError> {
    match c {
        '0'..='9' => Ok(c as u8 - b'0'),
        'a'..='f' => Ok(c as u8 - b'a' + 10),
        'A'..='F' => Ok(c as u8 - b'A' + 10),
        _ => Err(ColorError::InvalidHex(c)),
    }
}
