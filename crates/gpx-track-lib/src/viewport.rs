//! Viewport fitting
//!
//! [`ViewportFitter`] unions the bounds of the visible geometries and asks a [`MapSurface`] to
//! frame them. Framing after a state change goes through [`FitScheduler`], a single
//! re-armable deadline: the map gets a moment to pick up the new layer state, and a burst of
//! changes produces one framing instead of many.

use crate::layers::{LayerSync, TrackGeometry};
use crate::track::TrackId;
use crate::Result;
use crate::utils::{self, EARTH_SIZE_METERS};
use geo::{Coord, Rect};
use instant::Instant;
use std::time::Duration;

/// Padding around framed bounds, in screen pixels
pub const DEFAULT_FIT_PADDING: f32 = 50.0;

/// Delay between a state change and the framing it triggers
pub const DEFAULT_FIT_DELAY: Duration = Duration::from_millis(100);

/// Size in pixels of one map tile (zoom 0 shows the whole world in one tile)
const TILE_SIZE: f64 = 256.0;
const MIN_ZOOM: f64 = 1.0;
const MAX_ZOOM: f64 = 18.0;
/// Zoom used when the bounds collapse to a single point
const SINGLE_POINT_ZOOM: f64 = 16.0;

/// The map widget, as seen by the fitter
pub trait MapSurface {
    /// Move the camera so `bounds` (x = lon, y = lat) is fully visible with `padding` pixels
    /// to spare on every side.
    fn frame_region(&mut self, bounds: Rect<f64>, padding: f32);
}

/// Union of the bounds of `geometries`, `None` if none of them has any point
pub fn union_bounds<'a>(geometries: impl IntoIterator<Item = &'a TrackGeometry>) -> Option<Rect<f64>> {
    geometries
        .into_iter()
        .filter_map(TrackGeometry::bounds)
        .reduce(|acc, bounds| {
            Rect::new(
                Coord {
                    x: acc.min().x.min(bounds.min().x),
                    y: acc.min().y.min(bounds.min().y),
                },
                Coord {
                    x: acc.max().x.max(bounds.max().x),
                    y: acc.max().y.max(bounds.max().y),
                },
            )
        })
}

/// Computes framing regions and forwards them to the map
#[derive(Debug, Clone, Copy)]
pub struct ViewportFitter {
    padding: f32,
}

impl Default for ViewportFitter {
    fn default() -> Self {
        Self::new(DEFAULT_FIT_PADDING)
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl ViewportFitter {
    pub fn new(padding: f32) -> Self {
        Self { padding }
    }

    #[inline]
    pub fn padding(&self) -> f32 {
        self.padding
    }

    /// Frame every visible geometry. Does nothing, and returns `None`, when nothing is visible.
    pub fn fit_all(&self, layers: &LayerSync, map: &mut dyn MapSurface) -> Option<Rect<f64>> {
        let bounds = union_bounds(layers.visible_geometries().map(|(_, geometry)| geometry))?;
        tracing::debug!(
            "Fitting all tracks: ({:.4}, {:.4}) - ({:.4}, {:.4})",
            bounds.min().y,
            bounds.min().x,
            bounds.max().y,
            bounds.max().x
        );
        map.frame_region(bounds, self.padding);
        Some(bounds)
    }

    /// Frame a single track, visible or not
    pub fn fit_one(
        &self,
        layers: &LayerSync,
        id: &TrackId,
        map: &mut dyn MapSurface,
    ) -> Result<Option<Rect<f64>>> {
        let bounds = layers.geometry_of(id)?.bounds();
        if let Some(bounds) = bounds {
            map.frame_region(bounds, self.padding);
        }
        Ok(bounds)
    }
}

/// Single pending deadline for a deferred `fit_all`
///
/// A new request re-arms the deadline, cancelling the pending one.
#[derive(Debug, Clone)]
pub struct FitScheduler {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Default for FitScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_FIT_DELAY)
    }
}

impl FitScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    #[inline]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Arm the deadline at `now + delay`. Returns `true` if a pending request was superseded.
    pub fn request(&mut self, now: Instant) -> bool {
        let superseded = self.deadline.replace(now + self.delay).is_some();
        if superseded {
            tracing::trace!("Pending fit superseded");
        }
        superseded
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// `true` exactly once per armed deadline, as soon as `now` reaches it
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Remaining wait, for repaint scheduling
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }
}

/// Camera placement produced by [`frame_for_viewport`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Framing {
    /// Center of the framed region (x = lon, y = lat)
    pub center: Coord<f64>,
    /// Web Mercator zoom level (256 px tiles)
    pub zoom: f64,
}

/// Center and zoom that fit `bounds` into a `viewport` of pixels, keeping `padding` free
/// on every side
pub fn frame_for_viewport(bounds: Rect<f64>, viewport: (f32, f32), padding: f32) -> Framing {
    let projected = utils::rect_to_mercator(bounds);
    let center = utils::unproject(projected.center());

    let available_x = (viewport.0 - 2.0 * padding).max(1.0) as f64;
    let available_y = (viewport.1 - 2.0 * padding).max(1.0) as f64;

    // Pixels spanned by one meter at zoom 0 is TILE_SIZE / EARTH_SIZE_METERS
    let zoom_for = |span_meters: f64, available_px: f64| {
        (available_px * EARTH_SIZE_METERS / (TILE_SIZE * span_meters)).log2()
    };

    let zoom = match (projected.width() > 0.0, projected.height() > 0.0) {
        (false, false) => SINGLE_POINT_ZOOM,
        (true, false) => zoom_for(projected.width(), available_x),
        (false, true) => zoom_for(projected.height(), available_y),
        (true, true) => zoom_for(projected.width(), available_x)
            .min(zoom_for(projected.height(), available_y)),
    };

    Framing {
        center,
        zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::{PALETTE, StrokeWeight, TrackPatch};
    use crate::TrackError;
    use crate::utils::lat_lon;

    /// Map surface recording every framing request
    #[derive(Default)]
    struct RecordingMap {
        frames: Vec<(Rect<f64>, f32)>,
    }

    impl MapSurface for RecordingMap {
        fn frame_region(&mut self, bounds: Rect<f64>, padding: f32) {
            self.frames.push((bounds, padding));
        }
    }

    fn layers() -> (LayerSync, TrackId, TrackId) {
        let mut layers = LayerSync::new();
        let west = TrackId::from("west");
        let east = TrackId::from("east");
        layers
            .create_geometry(
                west.clone(),
                vec![lat_lon(40.0, -4.0), lat_lon(40.5, -3.5)],
                PALETTE[0],
                StrokeWeight::DEFAULT,
            )
            .unwrap();
        layers
            .create_geometry(
                east.clone(),
                vec![lat_lon(41.0, 2.0), lat_lon(41.5, 2.5)],
                PALETTE[1],
                StrokeWeight::DEFAULT,
            )
            .unwrap();
        (layers, west, east)
    }

    #[test]
    fn test_fit_all_frames_union_of_visible() {
        let (layers, _, _) = layers();
        let mut map = RecordingMap::default();

        let bounds = ViewportFitter::default().fit_all(&layers, &mut map).unwrap();

        assert_eq!(bounds, Rect::new(lat_lon(40.0, -4.0), lat_lon(41.5, 2.5)));
        assert_eq!(map.frames, vec![(bounds, DEFAULT_FIT_PADDING)]);
    }

    #[test]
    fn test_fit_all_ignores_hidden() {
        let (mut layers, _, east) = layers();
        layers
            .apply_update(&east, &TrackPatch::default().with_visible(false))
            .unwrap();
        let mut map = RecordingMap::default();

        let bounds = ViewportFitter::new(10.0).fit_all(&layers, &mut map).unwrap();

        assert_eq!(bounds, Rect::new(lat_lon(40.0, -4.0), lat_lon(40.5, -3.5)));
        assert_eq!(map.frames[0].1, 10.0);
    }

    #[test]
    fn test_fit_all_without_visible_is_noop() {
        let (mut layers, west, east) = layers();
        for id in [&west, &east] {
            layers
                .apply_update(id, &TrackPatch::default().with_visible(false))
                .unwrap();
        }
        let mut map = RecordingMap::default();

        assert!(ViewportFitter::default().fit_all(&layers, &mut map).is_none());
        assert!(
            ViewportFitter::default()
                .fit_all(&LayerSync::new(), &mut map)
                .is_none()
        );
        assert!(map.frames.is_empty());
    }

    #[test]
    fn test_fit_one_frames_hidden_track() {
        let (mut layers, west, _) = layers();
        layers
            .apply_update(&west, &TrackPatch::default().with_visible(false))
            .unwrap();
        let mut map = RecordingMap::default();

        let bounds = ViewportFitter::default()
            .fit_one(&layers, &west, &mut map)
            .unwrap()
            .unwrap();

        assert_eq!(bounds, Rect::new(lat_lon(40.0, -4.0), lat_lon(40.5, -3.5)));
        assert_eq!(map.frames.len(), 1);
    }

    #[test]
    fn test_fit_one_unknown_track() {
        let (layers, _, _) = layers();
        let mut map = RecordingMap::default();
        let result = ViewportFitter::default().fit_one(&layers, &TrackId::from("nope"), &mut map);
        assert!(matches!(result, Err(TrackError::NotFound(_))));
        assert!(map.frames.is_empty());
    }

    #[test]
    fn test_scheduler_fires_once_after_delay() {
        let start = Instant::now();
        let mut scheduler = FitScheduler::new(Duration::from_millis(100));
        assert!(!scheduler.poll(start));

        assert!(!scheduler.request(start));
        assert!(scheduler.is_pending());
        assert!(!scheduler.poll(start + Duration::from_millis(99)));
        assert_eq!(
            scheduler.time_until_due(start + Duration::from_millis(40)),
            Some(Duration::from_millis(60))
        );

        assert!(scheduler.poll(start + Duration::from_millis(100)));
        assert!(!scheduler.poll(start + Duration::from_millis(200)));
        assert!(!scheduler.is_pending());
    }

    #[test]
    fn test_scheduler_later_request_supersedes() {
        let start = Instant::now();
        let mut scheduler = FitScheduler::new(Duration::from_millis(100));

        scheduler.request(start);
        assert!(scheduler.request(start + Duration::from_millis(80)));

        // The first deadline no longer fires
        assert!(!scheduler.poll(start + Duration::from_millis(120)));
        assert!(scheduler.poll(start + Duration::from_millis(180)));
    }

    #[test]
    fn test_scheduler_cancel() {
        let start = Instant::now();
        let mut scheduler = FitScheduler::default();
        scheduler.request(start);
        scheduler.cancel();
        assert!(!scheduler.poll(start + Duration::from_secs(1)));
        assert_eq!(scheduler.time_until_due(start), None);
    }

    #[test]
    fn test_frame_for_viewport_centers_bounds() {
        let bounds = Rect::new(lat_lon(40.0, -4.0), lat_lon(41.0, -3.0));
        let framing = frame_for_viewport(bounds, (800.0, 600.0), 50.0);

        assert!(framing.center.y > 40.0 && framing.center.y < 41.0);
        assert!((framing.center.x - -3.5).abs() < 1e-9);
        // A one degree box fits a few hundred pixels around zoom 8-9
        assert!(framing.zoom > 7.0 && framing.zoom < 10.0);
    }

    #[test]
    fn test_frame_for_viewport_padding_zooms_out() {
        let bounds = Rect::new(lat_lon(40.0, -4.0), lat_lon(41.0, -3.0));
        let tight = frame_for_viewport(bounds, (800.0, 600.0), 0.0);
        let padded = frame_for_viewport(bounds, (800.0, 600.0), 100.0);
        assert!(padded.zoom < tight.zoom);
    }

    #[test]
    fn test_frame_for_viewport_degenerate_bounds() {
        let point = Rect::new(lat_lon(40.0, -4.0), lat_lon(40.0, -4.0));
        let framing = frame_for_viewport(point, (800.0, 600.0), 50.0);
        assert_eq!(framing.zoom, SINGLE_POINT_ZOOM);

        let world = Rect::new(lat_lon(-80.0, -180.0), lat_lon(80.0, 180.0));
        let framing = frame_for_viewport(world, (300.0, 300.0), 50.0);
        assert_eq!(framing.zoom, MIN_ZOOM);
    }
}
