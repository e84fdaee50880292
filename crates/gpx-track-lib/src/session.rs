//! TrackSession - session-scoped owner of tracks, layers and viewport state
//!
//! Records and geometries are always changed together through this type, so the store and the
//! layers never disagree about which tracks exist.

use crate::extract::{Extractor, MalformedPointPolicy};
use crate::layers::{LayerSync, TrackGeometry};
use crate::notify::NotificationSink;
use crate::store::{Clock, SystemClock, TrackStore};
use crate::track::{PALETTE, StrokeWeight, TrackColor, TrackId, TrackPatch, TrackRecord};
use crate::viewport::{
    DEFAULT_FIT_DELAY, DEFAULT_FIT_PADDING, FitScheduler, MapSurface, ViewportFitter,
};
use crate::Result;
use geo::{Coord, Rect};
use instant::Instant;
use std::time::Duration;

/// Configuration for a track session
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Stroke weight of newly loaded tracks
    pub default_weight: StrokeWeight,
    /// Colors handed out round-robin to newly loaded tracks.
    /// An empty palette falls back to [`PALETTE`].
    pub palette: Vec<TrackColor>,
    /// Padding in pixels kept around framed bounds
    pub fit_padding: f32,
    /// Delay before a deferred fit runs
    pub fit_delay: Duration,
    /// Handling of track points with missing or invalid coordinates
    pub malformed_points: MalformedPointPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_weight: StrokeWeight::DEFAULT,
            palette: PALETTE.to_vec(),
            fit_padding: DEFAULT_FIT_PADDING,
            fit_delay: DEFAULT_FIT_DELAY,
            malformed_points: MalformedPointPolicy::default(),
        }
    }
}

/// All track state of one application session
#[derive(Debug)]
pub struct TrackSession {
    config: Config,
    extractor: Extractor,
    store: TrackStore,
    layers: LayerSync,
    fitter: ViewportFitter,
    scheduler: FitScheduler,
    /// Number of colors handed out so far
    colors_assigned: usize,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl TrackSession {
    pub fn new(config: Config) -> Self {
        Self::with_clock(config, SystemClock)
    }

    /// Create a session whose track ids are stamped by `clock`
    pub fn with_clock(config: Config, clock: impl Clock + 'static) -> Self {
        Self {
            extractor: Extractor::with_policy(config.malformed_points),
            store: TrackStore::with_clock(clock),
            layers: LayerSync::new(),
            fitter: ViewportFitter::new(config.fit_padding),
            scheduler: FitScheduler::new(config.fit_delay),
            colors_assigned: 0,
            config,
        }
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    #[inline]
    pub fn store(&self) -> &TrackStore {
        &self.store
    }

    #[inline]
    pub fn layers(&self) -> &LayerSync {
        &self.layers
    }

    #[inline]
    pub fn scheduler(&self) -> &FitScheduler {
        &self.scheduler
    }

    /// Track records in display order
    #[inline]
    pub fn tracks(&self) -> &[TrackRecord] {
        self.store.list()
    }

    /// Geometries currently on the map, in draw order
    pub fn visible_geometries(&self) -> impl Iterator<Item = (&TrackId, &TrackGeometry)> + '_ {
        self.layers.visible_geometries()
    }

    /// Register a parsed track: allocate its record with the default style and build its
    /// geometry.
    pub fn add_track(
        &mut self,
        name: impl Into<String>,
        coordinates: Vec<Coord<f64>>,
    ) -> Result<TrackId> {
        let color = self.next_color();
        let weight = self.config.default_weight;
        let id = self.store.add_track(name, color, weight);
        if let Err(err) = self.layers.create_geometry(id.clone(), coordinates, color, weight) {
            // Keep store and layers in lockstep
            if let Err(rollback) = self.store.delete(&id) {
                tracing::warn!("Failed to roll back track {id}: {rollback}");
            }
            return Err(err);
        }
        Ok(id)
    }

    /// Apply `patch` to a track and its geometry. A visibility change re-frames the map
    /// after the fit delay.
    pub fn update_track(
        &mut self,
        id: &TrackId,
        patch: &TrackPatch,
        now: Instant,
    ) -> Result<&TrackRecord> {
        self.store.get(id)?;
        self.layers.apply_update(id, patch)?;
        if patch.visible.is_some() {
            self.scheduler.request(now);
        }
        self.store.update(id, patch)
    }

    /// Remove a track and its geometry, then re-frame the remaining tracks
    pub fn delete_track(
        &mut self,
        id: &TrackId,
        now: Instant,
        sink: &mut dyn NotificationSink,
    ) -> Result<TrackRecord> {
        self.layers.remove_geometry(id)?;
        let record = self.store.delete(id)?;
        sink.notify_success(&format!("Track {} removed", record.name));
        self.scheduler.request(now);
        Ok(record)
    }

    /// Frame a single track right away
    pub fn zoom_to_track(
        &self,
        id: &TrackId,
        map: &mut dyn MapSurface,
        sink: &mut dyn NotificationSink,
    ) -> Result<Option<Rect<f64>>> {
        let bounds = self.fitter.fit_one(&self.layers, id, map)?;
        if bounds.is_some() {
            sink.notify_success("Zoomed to track");
        }
        Ok(bounds)
    }

    /// Frame every visible track right away
    pub fn fit_all(&self, map: &mut dyn MapSurface) -> Option<Rect<f64>> {
        self.fitter.fit_all(&self.layers, map)
    }

    /// Schedule a deferred `fit_all`, superseding any pending one
    pub fn request_fit(&mut self, now: Instant) {
        self.scheduler.request(now);
    }

    /// Run the deferred `fit_all` if it is due
    pub fn poll_fit(&mut self, now: Instant, map: &mut dyn MapSurface) -> Option<Rect<f64>> {
        if self.scheduler.poll(now) {
            self.fitter.fit_all(&self.layers, map)
        } else {
            None
        }
    }

    /// Drop every track. Ids issued so far stay retired.
    pub fn clear(&mut self) {
        tracing::info!("Clearing {} track(s)", self.store.len());
        self.store.clear();
        self.layers.clear();
        self.scheduler.cancel();
    }

    fn next_color(&mut self) -> TrackColor {
        let palette: &[TrackColor] = if self.config.palette.is_empty() {
            &PALETTE
        } else {
            &self.config.palette
        };
        let color = palette[self.colors_assigned % palette.len()];
        self.colors_assigned += 1;
        color
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Notifications;
    use crate::store::tests::FixedClock;
    use crate::utils::lat_lon;
    use crate::TrackError;
    use std::sync::Arc;

    #[derive(Default)]
    struct RecordingMap {
        frames: Vec<Rect<f64>>,
    }

    impl MapSurface for RecordingMap {
        fn frame_region(&mut self, bounds: Rect<f64>, _padding: f32) {
            self.frames.push(bounds);
        }
    }

    fn session() -> TrackSession {
        TrackSession::with_clock(Config::default(), FixedClock(1_000))
    }

    fn coords(offset: f64) -> Vec<Coord<f64>> {
        (0..5)
            .map(|i| lat_lon(40.0 + offset + i as f64 * 0.01, -3.7 + i as f64 * 0.01))
            .collect()
    }

    #[test]
    fn test_add_track_creates_record_and_geometry() {
        let mut session = session();
        let id = session.add_track("ride", coords(0.0)).unwrap();

        let record = session.store().get(&id).unwrap();
        assert_eq!(record.weight.get(), 3);
        assert_eq!(record.color, PALETTE[0]);
        assert!(record.visible);

        let geometry = session.layers().geometry_of(&id).unwrap();
        assert_eq!(geometry.style().color, record.color);
        assert_eq!(geometry.line().0.len(), 5);
        assert_eq!(session.visible_geometries().count(), 1);
    }

    #[test]
    fn test_palette_round_robin() {
        let mut session = session();
        let colors: Vec<TrackColor> = (0..PALETTE.len() + 1)
            .map(|i| {
                let id = session.add_track(format!("t{i}"), coords(0.0)).unwrap();
                session.store().get(&id).unwrap().color
            })
            .collect();

        assert_eq!(&colors[..PALETTE.len()], &PALETTE[..]);
        assert_eq!(colors[PALETTE.len()], PALETTE[0]);
    }

    #[test]
    fn test_empty_palette_falls_back_to_default() {
        let config = Config {
            palette: Vec::new(),
            ..Config::default()
        };
        let mut session = TrackSession::with_clock(config, FixedClock(0));
        let id = session.add_track("a", coords(0.0)).unwrap();
        assert!(PALETTE.contains(&session.store().get(&id).unwrap().color));
    }

    #[test]
    fn test_weight_update_restyles_without_touching_points() {
        let mut session = session();
        let id = session.add_track("ride", coords(0.0)).unwrap();
        let line_before = session.layers().geometry_of(&id).unwrap().line().clone();

        let weight = StrokeWeight::new(7).unwrap();
        let record = session
            .update_track(&id, &TrackPatch::default().with_weight(weight), Instant::now())
            .unwrap();
        assert_eq!(record.weight.get(), 7);

        let geometry = session.layers().geometry_of(&id).unwrap();
        assert_eq!(geometry.style().weight.get(), 7);
        assert!(Arc::ptr_eq(geometry.line(), &line_before));
        assert_eq!(geometry.line().0, coords(0.0));
        // Style-only edits do not re-frame
        assert!(!session.scheduler().is_pending());
    }

    #[test]
    fn test_rename_keeps_style_and_geometry() {
        let mut session = session();
        let id = session.add_track("ride", coords(0.0)).unwrap();
        let geometry_before = session.layers().geometry_of(&id).unwrap().id();

        let record = session
            .update_track(&id, &TrackPatch::default().with_name("Sierra loop"), Instant::now())
            .unwrap();
        assert_eq!(record.name, "Sierra loop");
        assert_eq!(record.weight, StrokeWeight::DEFAULT);

        assert_eq!(session.layers().geometry_of(&id).unwrap().id(), geometry_before);
        assert!(!session.scheduler().is_pending());
    }

    #[test]
    fn test_visibility_update_schedules_fit() {
        let mut session = session();
        let a = session.add_track("a", coords(0.0)).unwrap();
        let b = session.add_track("b", coords(1.0)).unwrap();
        let now = Instant::now();

        session
            .update_track(&b, &TrackPatch::default().with_visible(false), now)
            .unwrap();
        assert!(session.scheduler().is_pending());
        assert!(!session.store().get(&b).unwrap().visible);

        let mut map = RecordingMap::default();
        assert!(session.poll_fit(now, &mut map).is_none());
        let framed = session
            .poll_fit(now + session.config().fit_delay, &mut map)
            .unwrap();

        let expected = session.layers().geometry_of(&a).unwrap().bounds().unwrap();
        assert_eq!(framed, expected);
        assert_eq!(map.frames, vec![expected]);
    }

    #[test]
    fn test_update_unknown_track_changes_nothing() {
        let mut session = session();
        let result = session.update_track(
            &TrackId::from("0-0"),
            &TrackPatch::default().with_visible(false),
            Instant::now(),
        );
        assert!(matches!(result, Err(TrackError::NotFound(_))));
        assert!(!session.scheduler().is_pending());
    }

    #[test]
    fn test_delete_track_removes_everything() {
        let mut session = session();
        let id = session.add_track("ride", coords(0.0)).unwrap();
        let mut sink = Notifications::default();

        let removed = session.delete_track(&id, Instant::now(), &mut sink).unwrap();

        assert_eq!(removed.name, "ride");
        assert!(session.tracks().is_empty());
        assert_eq!(session.visible_geometries().count(), 0);
        assert_eq!(sink.successes().count(), 1);
        assert!(session.scheduler().is_pending());

        assert!(matches!(
            session.update_track(&id, &TrackPatch::default().with_visible(true), Instant::now()),
            Err(TrackError::NotFound(_))
        ));
        assert!(matches!(
            session.delete_track(&id, Instant::now(), &mut sink),
            Err(TrackError::NotFound(_))
        ));
    }

    #[test]
    fn test_deferred_fit_after_deleting_last_track_is_noop() {
        let mut session = session();
        let id = session.add_track("ride", coords(0.0)).unwrap();
        let now = Instant::now();
        session
            .delete_track(&id, now, &mut Notifications::default())
            .unwrap();

        let mut map = RecordingMap::default();
        assert!(session.poll_fit(now + Duration::from_secs(1), &mut map).is_none());
        assert!(map.frames.is_empty());
    }

    #[test]
    fn test_zoom_to_hidden_track() {
        let mut session = session();
        let id = session.add_track("ride", coords(0.0)).unwrap();
        session
            .update_track(&id, &TrackPatch::default().with_visible(false), Instant::now())
            .unwrap();

        let mut map = RecordingMap::default();
        let mut sink = Notifications::default();
        let bounds = session.zoom_to_track(&id, &mut map, &mut sink).unwrap();

        assert!(bounds.is_some());
        assert_eq!(map.frames.len(), 1);
        assert_eq!(sink.successes().count(), 1);
    }

    #[test]
    fn test_clear_cancels_pending_fit() {
        let mut session = session();
        let first = session.add_track("a", coords(0.0)).unwrap();
        session.request_fit(Instant::now());

        session.clear();

        assert!(session.tracks().is_empty());
        assert!(session.layers().is_empty());
        assert!(!session.scheduler().is_pending());
        let second = session.add_track("b", coords(0.0)).unwrap();
        assert_ne!(first, second);
    }
}
