//! Coordinate helpers
//!
//! Geographic coordinates follow the `geo` convention throughout the crate: `x` is the
//! longitude and `y` the latitude, both in degrees. Projected coordinates are Web Mercator
//! (EPSG:3857) meters.

use geo::{Coord, Rect};
use std::f64::consts::{FRAC_PI_2, PI};

/// Half the width of the Web Mercator plane, in meters
pub const EARTH_MERCATOR_MAX: f64 = 20037508.34;
/// Full width of the Web Mercator plane, in meters
pub const EARTH_SIZE_METERS: f64 = 2.0 * EARTH_MERCATOR_MAX;

/// Latitudes beyond this cannot be projected
pub const MAX_LATITUDE: f64 = 85.05112878;

/// Build a coordinate from latitude and longitude in degrees
#[inline(always)]
pub fn lat_lon(lat: f64, lon: f64) -> Coord<f64> {
    Coord { x: lon, y: lat }
}

/// Project a geographic coordinate to Web Mercator meters, clamping polar latitudes
#[inline]
pub fn project(coord: Coord<f64>) -> Coord<f64> {
    let lat = coord.y.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    Coord {
        x: coord.x * EARTH_MERCATOR_MAX / 180.0,
        y: (FRAC_PI_2 / 2.0 + lat / 2.0).tan().ln() * EARTH_MERCATOR_MAX / PI,
    }
}

/// Inverse of [`project`]
#[inline]
pub fn unproject(coord: Coord<f64>) -> Coord<f64> {
    let lat = 2.0 * (coord.y * PI / EARTH_MERCATOR_MAX).exp().atan() - FRAC_PI_2;
    lat_lon(lat.to_degrees(), coord.x * 180.0 / EARTH_MERCATOR_MAX)
}

/// Project a geographic rectangle into Web Mercator meters
pub fn rect_to_mercator(bounds: Rect<f64>) -> Rect<f64> {
    Rect::new(project(bounds.min()), project(bounds.max()))
}
