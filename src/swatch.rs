//! Opaque RGB color values as exchanged with the display layer.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A 24-bit RGB color, written `#RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorSwatch {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl ColorSwatch {
    pub const WHITE: ColorSwatch = ColorSwatch::new(255, 255, 255);
    pub const BLACK: ColorSwatch = ColorSwatch::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl From<rgb::RGBA8> for ColorSwatch {
    fn from(c: rgb::RGBA8) -> Self {
        Self::new(c.r, c.g, c.b)
    }
}

impl fmt::Display for ColorSwatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid color '{0}', expected #RRGGBB or rgb(r, g, b)")]
pub struct ParseSwatchError(pub String);

impl FromStr for ColorSwatch {
    type Err = ParseSwatchError;

    /// Accepts `#RRGGBB`, `RRGGBB`, `rgb(r, g, b)` and `rgba(r, g, b, a)`;
    /// alpha is discarded.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let err = || ParseSwatchError(s.to_string());

        if trimmed.starts_with("rgb") {
            let open = trimmed.find('(').ok_or_else(err)?;
            let close = trimmed.rfind(')').ok_or_else(err)?;
            if close <= open {
                return Err(err());
            }
            let parts: Vec<u8> = trimmed[open + 1..close]
                .split(',')
                .take(3)
                .map(|p| p.trim().parse::<u8>())
                .collect::<Result<_, _>>()
                .map_err(|_| err())?;
            return match parts.as_slice() {
                [r, g, b] => Ok(Self::new(*r, *g, *b)),
                _ => Err(err()),
            };
        }

        let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(err());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl Serialize for ColorSwatch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ColorSwatch {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_round_trip_is_uppercase() {
        let c: ColorSwatch = "#1a2b3c".parse().unwrap();
        assert_eq!(c, ColorSwatch::new(0x1a, 0x2b, 0x3c));
        assert_eq!(c.to_hex(), "#1A2B3C");
    }

    #[test]
    fn test_parse_without_hash() {
        assert_eq!("ffffff".parse::<ColorSwatch>().unwrap(), ColorSwatch::WHITE);
    }

    #[test]
    fn test_parse_rgb_and_rgba() {
        assert_eq!(
            "rgb(10, 20, 30)".parse::<ColorSwatch>().unwrap(),
            ColorSwatch::new(10, 20, 30)
        );
        assert_eq!(
            "rgba(255, 255, 255, 0.5)".parse::<ColorSwatch>().unwrap(),
            ColorSwatch::WHITE
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("#12345".parse::<ColorSwatch>().is_err());
        assert!("#GGGGGG".parse::<ColorSwatch>().is_err());
        assert!("rgb(1, 2)".parse::<ColorSwatch>().is_err());
        assert!("blue".parse::<ColorSwatch>().is_err());
    }

    #[test]
    fn test_serde_as_hex_string() {
        let json = serde_json::to_string(&ColorSwatch::new(0, 128, 255)).unwrap();
        assert_eq!(json, "\"#0080FF\"");
        let back: ColorSwatch = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ColorSwatch::new(0, 128, 255));
    }
}
