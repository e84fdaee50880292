//! Track point extraction
//!
//! Scans raw GPX text for `trkpt` elements and reads their `lat`/`lon` attributes, in document
//! order. The scan is lenient about the GPX schema (points are accepted anywhere
//! in the document and other elements are ignored) but strict about XML well-formedness: a
//! syntax error anywhere yields no points at all.

use geo::Coord;
use xml::reader::{EventReader, XmlEvent};

use crate::utils::lat_lon;

/// Local element name of a track point
const TRACK_POINT: &str = "trkpt";

/// What to do with a point whose latitude or longitude is missing or not a finite number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MalformedPointPolicy {
    /// Keep the point, reading the bad component as `0`
    #[default]
    ZeroFill,
    /// Drop the point
    Skip,
}

/// Point extractor configured with a [`MalformedPointPolicy`]
#[derive(Debug, Clone, Copy, Default)]
pub struct Extractor {
    policy: MalformedPointPolicy,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Extractor {
    pub fn with_policy(policy: MalformedPointPolicy) -> Self {
        Self { policy }
    }

    /// Extract all track points from `raw_text`
    ///
    /// Returns an empty vector when the document has no track points or is not well-formed.
    pub fn extract(&self, raw_text: &str) -> Vec<Coord<f64>> {
        let mut coordinates = Vec::new();
        let mut malformed = 0usize;

        for event in EventReader::from_str(raw_text) {
            match event {
                Ok(XmlEvent::StartElement {
                    name, attributes, ..
                }) if name.local_name == TRACK_POINT => {
                    let mut lat = None;
                    let mut lon = None;
                    for attribute in &attributes {
                        match attribute.name.local_name.as_str() {
                            "lat" => lat = parse_degrees(&attribute.value),
                            "lon" => lon = parse_degrees(&attribute.value),
                            _ => {}
                        }
                    }

                    match (lat, lon, self.policy) {
                        (Some(lat), Some(lon), _) => coordinates.push(lat_lon(lat, lon)),
                        (lat, lon, MalformedPointPolicy::ZeroFill) => {
                            malformed += 1;
                            coordinates.push(lat_lon(lat.unwrap_or(0.0), lon.unwrap_or(0.0)));
                        }
                        (_, _, MalformedPointPolicy::Skip) => malformed += 1,
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::debug!("Discarding malformed track document: {err}");
                    return Vec::new();
                }
            }
        }

        if malformed > 0 {
            tracing::warn!(
                "{malformed} track point(s) with missing or invalid coordinates ({:?})",
                self.policy
            );
        }

        coordinates
    }
}

/// Extract track points with the default [`MalformedPointPolicy::ZeroFill`] policy
pub fn extract(raw_text: &str) -> Vec<Coord<f64>> {
    Extractor::default().extract(raw_text)
}

/// Read the leading decimal number of an attribute value, ignoring anything after it
/// (`"40.5abc"` reads as `40.5`)
fn parse_degrees(value: &str) -> Option<f64> {
    let value = value.trim_start();
    let bytes = value.as_bytes();
    let digits_from = |mut end: usize| {
        while bytes.get(end).is_some_and(u8::is_ascii_digit) {
            end += 1;
        }
        end
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    end = digits_from(end);
    if bytes.get(end) == Some(&b'.') {
        end = digits_from(end + 1);
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let sign = usize::from(matches!(bytes.get(end + 1), Some(b'+' | b'-')));
        let exponent_end = digits_from(end + 1 + sign);
        // A bare `e` is not part of the number
        if exponent_end > end + 1 + sign {
            end = exponent_end;
        }
    }

    value[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}
