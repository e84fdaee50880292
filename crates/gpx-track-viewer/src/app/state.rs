//! Application state management
//!
//! This module owns the track session, the background file reader and the toast queue.
//! The UI thread is the only mutator of the session: file contents are read on a tokio task
//! and handed back over a channel.

use crate::app::settings::Settings;
use gpx_track_lib::{
    Batch, BatchReport, Notification, NotificationSink, Notifications, PendingFile, StrokeWeight,
    TrackColor, TrackId, TrackPatch, TrackSession,
};
use instant::Instant;
use std::collections::VecDeque;
use std::io;
use std::time::Duration;
use tokio::sync::mpsc;

/// Main application state
pub struct AppState {
    /// Tracks, their geometries and the deferred fit
    pub session: TrackSession,

    /// File loading state
    pub file_loader: FileLoader,

    /// Notifications not yet turned into toasts
    pub notifications: Notifications,

    /// Toasts currently on screen
    pub toasts: Toasts,

    /// Current UI settings
    pub ui_settings: UiSettings,

    /// Camera change requested by the UI, applied by the map view on its next frame
    pub pending_map_action: Option<MapAction>,
}

/// UI-specific settings that can be adjusted at runtime
#[derive(Clone)]
pub struct UiSettings {
    /// Map tiles provider
    pub tiles_provider: TilesProvider,

    /// Whether sidebar is open
    pub sidebar_open: bool,
}

/// Camera changes that need the map widget
#[derive(Clone, Debug, PartialEq)]
pub enum MapAction {
    FitAll,
    ZoomTo(TrackId),
}

/// Available map tile providers
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum TilesProvider {
    OpenStreetMap,
    OpenTopoMap,
    /// Esri World Imagery satellite photos
    EsriWorldImagery,
    /// IGN España raster topographic map (Spain only)
    IgnEspana,
}

impl TilesProvider {
    pub fn attribution(&self) -> &'static str {
        match self {
            Self::OpenStreetMap => "© OpenStreetMap contributors",
            Self::OpenTopoMap => "© OpenTopoMap (CC-BY-SA)",
            Self::EsriWorldImagery => "© Esri",
            Self::IgnEspana => "© IGN España",
        }
    }

    pub fn all() -> &'static [Self] {
        &[
            Self::OpenStreetMap,
            Self::OpenTopoMap,
            Self::EsriWorldImagery,
            Self::IgnEspana,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenStreetMap => "OpenStreetMap",
            Self::OpenTopoMap => "OpenTopoMap",
            Self::EsriWorldImagery => "Satellite",
            Self::IgnEspana => "IGN España",
        }
    }
}

/// Events sent by the reader task
#[derive(Debug)]
pub enum LoadEvent {
    /// One file was read (or failed to read)
    File {
        name: String,
        contents: io::Result<String>,
    },
    /// Every file of the current batch was sent
    BatchFinished,
}

/// File loading state and operations
pub struct FileLoader {
    /// Batches of files for the reader task
    requests: mpsc::UnboundedSender<Vec<PendingFile>>,

    /// Read results coming back from the reader task
    events: mpsc::UnboundedReceiver<LoadEvent>,

    /// Batch currently being ingested
    batch: Option<Batch>,

    /// Batches sent to the reader task and not finished yet
    batches_in_flight: usize,

    /// Show file picker dialog
    pub show_picker: bool,
}

impl FileLoader {
    /// Spawn the reader task on the current tokio runtime
    pub fn spawn(ctx: egui::Context) -> Self {
        let (requests, request_rx) = mpsc::unbounded_channel();
        let (event_tx, events) = mpsc::unbounded_channel();
        tokio::spawn(read_batches(request_rx, event_tx, ctx));

        Self {
            requests,
            events,
            batch: None,
            batches_in_flight: 0,
            show_picker: false,
        }
    }

    /// Queue a set of files to be loaded as one batch
    pub fn queue(&mut self, files: Vec<PendingFile>) {
        if files.is_empty() {
            return;
        }
        tracing::info!("Queueing {} file(s) for loading", files.len());
        if self.requests.send(files).is_ok() {
            self.batches_in_flight += 1;
        } else {
            tracing::error!("File reader task is gone, dropping load request");
        }
    }

    /// Check if any files are being processed
    pub fn is_busy(&self) -> bool {
        self.batches_in_flight > 0
    }

    /// Ingest everything the reader task sent so far, returning the batches that finished
    pub fn process_events(
        &mut self,
        session: &mut TrackSession,
        sink: &mut dyn NotificationSink,
        now: Instant,
    ) -> Vec<BatchReport> {
        let mut finished = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            match event {
                LoadEvent::File { name, contents } => {
                    self.batch
                        .get_or_insert_with(Batch::new)
                        .ingest(session, &name, contents, sink);
                }
                LoadEvent::BatchFinished => {
                    self.batches_in_flight = self.batches_in_flight.saturating_sub(1);
                    let batch = self.batch.take().unwrap_or_default();
                    finished.push(batch.finish(session, now));
                }
            }
        }
        finished
    }

    /// Forget the tracks the current batch added so far; files still to come form a new batch
    pub fn restart_batch(&mut self) {
        self.batch = None;
    }
}

/// Reads batches one after the other, files in order, and reports each file back
async fn read_batches(
    mut requests: mpsc::UnboundedReceiver<Vec<PendingFile>>,
    events: mpsc::UnboundedSender<LoadEvent>,
    ctx: egui::Context,
) {
    while let Some(files) = requests.recv().await {
        for file in files {
            let contents = file.source.read().await;
            let event = LoadEvent::File {
                name: file.name,
                contents,
            };
            if events.send(event).is_err() {
                return;
            }
            ctx.request_repaint();
        }
        if events.send(LoadEvent::BatchFinished).is_err() {
            return;
        }
        ctx.request_repaint();
    }
}

impl AppState {
    /// Create new application state from CLI settings
    pub fn new(settings: &Settings, ctx: &egui::Context) -> Self {
        let mut file_loader = FileLoader::spawn(ctx.clone());
        file_loader.queue(
            settings
                .gpx_files
                .iter()
                .map(PendingFile::from_path)
                .collect(),
        );

        Self {
            session: TrackSession::new(settings.to_config()),
            file_loader,
            notifications: Notifications::default(),
            toasts: Toasts::default(),
            ui_settings: UiSettings {
                tiles_provider: settings.tiles,
                ..UiSettings::default()
            },
            pending_map_action: None,
        }
    }

    /// Queue files picked or dropped by the user
    pub fn queue_files(&mut self, files: Vec<PendingFile>) {
        self.file_loader.queue(files);
    }

    /// Feed everything the reader task sent so far into the session
    pub fn process_load_events(&mut self, now: Instant) -> Vec<BatchReport> {
        profiling::scope!("process_load_events");
        self.file_loader
            .process_events(&mut self.session, &mut self.notifications, now)
    }

    pub fn rename_track(&mut self, id: &TrackId, name: String, now: Instant) {
        self.update_track(id, TrackPatch::default().with_name(name), now);
    }

    pub fn set_visible(&mut self, id: &TrackId, visible: bool, now: Instant) {
        self.update_track(id, TrackPatch::default().with_visible(visible), now);
    }

    pub fn set_color(&mut self, id: &TrackId, color: TrackColor, now: Instant) {
        self.update_track(id, TrackPatch::default().with_color(color), now);
    }

    pub fn set_weight(&mut self, id: &TrackId, weight: StrokeWeight, now: Instant) {
        self.update_track(id, TrackPatch::default().with_weight(weight), now);
    }

    pub fn delete_track(&mut self, id: &TrackId, now: Instant) {
        if let Err(err) = self
            .session
            .delete_track(id, now, &mut self.notifications)
        {
            tracing::warn!("Delete failed: {err}");
        }
    }

    /// Clear all loaded tracks
    pub fn clear_tracks(&mut self) {
        self.session.clear();
        self.file_loader.restart_batch();
        self.pending_map_action = None;
    }

    /// Move new notifications to the toast queue and expire old toasts
    pub fn update_toasts(&mut self, now: Instant) {
        self.toasts.extend(self.notifications.drain(), now);
        self.toasts.prune(now);
    }

    fn update_track(&mut self, id: &TrackId, patch: TrackPatch, now: Instant) {
        if let Err(err) = self.session.update_track(id, &patch, now) {
            tracing::warn!("Update failed: {err}");
        }
    }
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            tiles_provider: TilesProvider::OpenStreetMap,
            sidebar_open: true,
        }
    }
}

/// A notification on screen
#[derive(Debug, Clone)]
pub struct Toast {
    pub notification: Notification,
    pub shown_at: Instant,
}

/// Fading, time-limited notifications
#[derive(Debug)]
pub struct Toasts {
    entries: VecDeque<Toast>,
    lifetime: Duration,
}

impl Default for Toasts {
    fn default() -> Self {
        Self {
            entries: VecDeque::new(),
            lifetime: Self::DEFAULT_LIFETIME,
        }
    }
}

impl Toasts {
    pub const DEFAULT_LIFETIME: Duration = Duration::from_secs(4);
    const FADE: Duration = Duration::from_millis(300);
    /// Oldest toasts are dropped beyond this
    const MAX_VISIBLE: usize = 5;

    pub fn extend(&mut self, notifications: impl IntoIterator<Item = Notification>, now: Instant) {
        for notification in notifications {
            self.entries.push_back(Toast {
                notification,
                shown_at: now,
            });
        }
        while self.entries.len() > Self::MAX_VISIBLE {
            self.entries.pop_front();
        }
    }

    /// Drop toasts that have fully faded out
    pub fn prune(&mut self, now: Instant) {
        let lifetime = self.lifetime;
        self.entries
            .retain(|toast| now.saturating_duration_since(toast.shown_at) < lifetime);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Toast> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fade alpha for a toast (0.0 to 1.0): fade in, stay visible, fade out
    pub fn alpha(&self, toast: &Toast, now: Instant) -> f32 {
        let elapsed = now.saturating_duration_since(toast.shown_at);
        let fade = Self::FADE.as_secs_f32();

        if elapsed >= self.lifetime {
            0.0
        } else if elapsed < Self::FADE {
            elapsed.as_secs_f32() / fade
        } else if elapsed + Self::FADE > self.lifetime {
            (self.lifetime - elapsed).as_secs_f32() / fade
        } else {
            1.0
        }
    }
}
