//! GPX Track Library - Track/Layer Synchronization Engine
//!
//! This library keeps a set of loaded GPX tracks, their renderable line geometries and the
//! map viewport in sync. It is UI-agnostic: the map widget and the notification surface are
//! reached through the narrow [`MapSurface`] and [`NotificationSink`] traits.
//!
//! # Architecture
//!
//! - **[`Extractor`]**: Lenient `trkpt` scanner turning raw GPX text into coordinates
//! - **[`TrackStore`]**: Ordered track records with unique, never reused identities
//! - **[`LayerSync`]**: One styled line geometry per track plus the visible group
//! - **[`ViewportFitter`]** / **[`FitScheduler`]**: Bounds union and debounced framing
//! - **[`Batch`]** / **[`BatchLoader`]**: Per-file tolerant loading of a set of files
//! - **[`TrackSession`]**: Session-scoped owner of all of the above
//!
//! # Usage Example
//!
//! ```rust
//! use gpx_track_lib::{Config, Notifications, TrackPatch, TrackSession};
//!
//! let mut session = TrackSession::new(Config::default());
//! let mut notifications = Notifications::default();
//! let gpx = r#"<gpx><trk><trkseg>
//!     <trkpt lat="40.41" lon="-3.70"/><trkpt lat="40.42" lon="-3.71"/>
//! </trkseg></trk></gpx>"#;
//!
//! let mut batch = gpx_track_lib::Batch::new();
//! let id = batch
//!     .ingest(&mut session, "madrid.gpx", Ok(gpx.to_string()), &mut notifications)
//!     .unwrap();
//! batch.finish(&mut session, instant::Instant::now());
//!
//! assert_eq!(session.tracks()[0].name, "madrid");
//! session
//!     .update_track(&id, &TrackPatch::default().with_visible(false), instant::Instant::now())
//!     .unwrap();
//! assert_eq!(session.layers().visible_geometries().count(), 0);
//! ```

mod extract;
mod layers;
mod loader;
mod notify;
mod session;
mod store;
mod track;
pub mod utils;
mod viewport;

// Public API exports
pub use extract::{Extractor, MalformedPointPolicy, extract};
pub use layers::{GeometryId, LayerSync, LineStyle, TrackGeometry};
pub use loader::{Batch, BatchLoader, BatchReport, FileSource, PendingFile, track_name};
pub use notify::{Notification, NotificationSink, Notifications};
pub use session::{Config, TrackSession};
pub use store::{Clock, SystemClock, TrackStore};
pub use track::{PALETTE, StrokeWeight, TrackColor, TrackId, TrackPatch, TrackRecord};
pub use utils::lat_lon;
pub use viewport::{FitScheduler, Framing, MapSurface, ViewportFitter, frame_for_viewport};

/// Error types for the track engine
#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    #[error("{file}: no valid track points")]
    Parse { file: String },

    #[error("{file}: read error: {source}")]
    Read {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown track id: {0}")]
    NotFound(TrackId),

    #[error("Geometry already exists for track {0}")]
    DuplicateGeometry(TrackId),

    #[error("Stroke weight {0} outside 1..=10")]
    InvalidWeight(u8),

    #[error("Invalid color: {0:?}")]
    InvalidColor(String),
}

pub type Result<T> = std::result::Result<T, TrackError>;
