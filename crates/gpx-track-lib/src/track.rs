//! Track record types
//!
//! A [`TrackRecord`] is the user-editable metadata of one loaded route. Its style fields use
//! small validated value types so that a record can never hold an out-of-range stroke weight.

use crate::{Result, TrackError};
use std::fmt;
use std::str::FromStr;

/// Opaque track identity, unique for the lifetime of a session
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackId(String);

impl TrackId {
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TrackId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for TrackId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// sRGB stroke color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl TrackColor {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    #[inline]
    pub fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    #[inline]
    pub fn from_array([r, g, b]: [u8; 3]) -> Self {
        Self { r, g, b }
    }
}

/// Parses `#rrggbb`, `rrggbb` and the short `#rgb` form
impl FromStr for TrackColor {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || TrackError::InvalidColor(s.to_string());
        let hex = s.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| invalid());
        match hex.len() {
            6 => Ok(Self::rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => {
                let short = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
                Ok(Self::rgb(short(0)?, short(1)?, short(2)?))
            }
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for TrackColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Default colors handed out to newly loaded tracks
pub const PALETTE: [TrackColor; 6] = [
    TrackColor::rgb(0xef, 0x44, 0x44), // red
    TrackColor::rgb(0x3b, 0x82, 0xf6), // blue
    TrackColor::rgb(0x22, 0xc5, 0x5e), // green
    TrackColor::rgb(0xf5, 0x9e, 0x0b), // amber
    TrackColor::rgb(0x8b, 0x5c, 0xf6), // violet
    TrackColor::rgb(0xec, 0x48, 0x99), // pink
];

/// Stroke width in pixels, always within `1..=10`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "u8", into = "u8")
)]
pub struct StrokeWeight(u8);

impl StrokeWeight {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;
    pub const DEFAULT: StrokeWeight = StrokeWeight(3);

    pub fn new(pixels: u8) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&pixels) {
            Ok(Self(pixels))
        } else {
            Err(TrackError::InvalidWeight(pixels))
        }
    }

    #[inline]
    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for StrokeWeight {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u8> for StrokeWeight {
    type Error = TrackError;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value)
    }
}

impl From<StrokeWeight> for u8 {
    fn from(value: StrokeWeight) -> Self {
        value.0
    }
}

/// User-visible metadata for one loaded route
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackRecord {
    id: TrackId,
    /// Display label (file name without extension)
    pub name: String,
    pub color: TrackColor,
    pub weight: StrokeWeight,
    pub visible: bool,
}

impl TrackRecord {
    pub(crate) fn new(id: TrackId, name: String, color: TrackColor, weight: StrokeWeight) -> Self {
        Self {
            id,
            name,
            color,
            weight,
            visible: true,
        }
    }

    #[inline]
    pub fn id(&self) -> &TrackId {
        &self.id
    }

    /// Merge the fields present in `patch`, leaving the others untouched
    pub(crate) fn apply(&mut self, patch: &TrackPatch) {
        if let Some(name) = &patch.name {
            self.name.clone_from(name);
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
        if let Some(weight) = patch.weight {
            self.weight = weight;
        }
        if let Some(visible) = patch.visible {
            self.visible = visible;
        }
    }
}

/// Partial update of a track; `None` fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackPatch {
    pub name: Option<String>,
    pub color: Option<TrackColor>,
    pub weight: Option<StrokeWeight>,
    pub visible: Option<bool>,
}

impl TrackPatch {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_color(mut self, color: TrackColor) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_weight(mut self, weight: StrokeWeight) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = Some(visible);
        self
    }
}
