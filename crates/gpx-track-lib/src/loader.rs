//! Batch loading of GPX files into a [`TrackSession`]
//!
//! A batch is fault tolerant per file: unreadable files and files without points are reported
//! and skipped, the rest of the batch still loads.

use crate::notify::NotificationSink;
use crate::session::TrackSession;
use crate::track::TrackId;
use crate::TrackError;
use instant::Instant;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where the contents of a pending file come from
#[derive(Debug, Clone)]
pub enum FileSource {
    /// File on disk
    Path(PathBuf),
    /// Raw bytes already in memory (e.g. dropped onto the window)
    Bytes(Arc<[u8]>),
}

impl FileSource {
    /// Read the whole source as text. Only I/O failures are errors: bytes that are not valid
    /// UTF-8 (Latin-1 names, stray binary) are replaced, and the track points are still read.
    pub async fn read(&self) -> io::Result<String> {
        match self {
            Self::Path(path) => tokio::fs::read(path).await.map(|bytes| decode_text(&bytes)),
            Self::Bytes(bytes) => Ok(decode_text(bytes)),
        }
    }
}

fn decode_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// A named file waiting to be loaded
#[derive(Debug, Clone)]
pub struct PendingFile {
    /// File name as shown to the user, extension included
    pub name: String,
    pub source: FileSource,
}

impl PendingFile {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            source: FileSource::Path(path),
        }
    }

    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            source: FileSource::Bytes(bytes.into()),
        }
    }
}

/// Display name of a track loaded from `file_name`: the file name without directories and
/// without its final extension
pub fn track_name(file_name: &str) -> String {
    let path = Path::new(file_name);
    path.file_stem()
        .or_else(|| path.file_name())
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string())
}

/// Outcome of one batch
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Tracks added, in file order
    pub added: Vec<TrackId>,
    /// Per-file failures, in file order
    pub failed: Vec<TrackError>,
}

/// One in-progress batch, fed file by file.
///
/// Used directly by callers that read files elsewhere (e.g. on a background task) and hand the
/// results to the thread owning the session.
#[derive(Debug, Default)]
pub struct Batch {
    report: BatchReport,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process the contents (or read failure) of one file
    pub fn ingest(
        &mut self,
        session: &mut TrackSession,
        file_name: &str,
        contents: io::Result<String>,
        sink: &mut dyn NotificationSink,
    ) -> Option<TrackId> {
        let text = match contents {
            Ok(text) => text,
            Err(source) => {
                tracing::warn!("Failed to read {file_name}: {source}");
                sink.notify_error(&format!("Failed to load {file_name}"));
                self.report.failed.push(TrackError::Read {
                    file: file_name.to_string(),
                    source,
                });
                return None;
            }
        };

        let coordinates = session.extractor().extract(&text);
        if coordinates.is_empty() {
            tracing::warn!("{file_name} contains no valid track points");
            sink.notify_error(&format!("File {file_name} contains no valid points"));
            self.report.failed.push(TrackError::Parse {
                file: file_name.to_string(),
            });
            return None;
        }

        let point_count = coordinates.len();
        match session.add_track(track_name(file_name), coordinates) {
            Ok(id) => {
                tracing::debug!("Loaded {file_name} as track {id} ({point_count} points)");
                sink.notify_success(&format!("{file_name} loaded successfully"));
                self.report.added.push(id.clone());
                Some(id)
            }
            Err(err) => {
                tracing::warn!("Failed to add {file_name}: {err}");
                sink.notify_error(&format!("Failed to load {file_name}"));
                self.report.failed.push(err);
                None
            }
        }
    }

    /// Close the batch, scheduling a single re-framing if anything was added
    pub fn finish(self, session: &mut TrackSession, now: Instant) -> BatchReport {
        let report = self.report;
        if !report.added.is_empty() {
            session.request_fit(now);
        }
        tracing::info!(
            "Batch finished: {} loaded, {} failed",
            report.added.len(),
            report.failed.len()
        );
        report
    }
}

/// Async driver reading a set of files one after the other and loading them into a session
#[derive(Debug, Default, Clone, Copy)]
pub struct BatchLoader;

impl BatchLoader {
    pub async fn load(
        session: &mut TrackSession,
        files: impl IntoIterator<Item = PendingFile>,
        sink: &mut dyn NotificationSink,
    ) -> BatchReport {
        let mut batch = Batch::new();
        for file in files {
            let contents = file.source.read().await;
            batch.ingest(session, &file.name, contents, sink);
        }
        batch.finish(session, Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Notifications;
    use crate::session::Config;
    use crate::store::tests::FixedClock;
    use crate::utils::lat_lon;
    use crate::viewport::MapSurface;
    use geo::Rect;
    use std::io::Write;

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
        TrackSession::with_clock(Config::default(), FixedClock(42))
    }

    /// GPX document with one track of `points` points
    fn gpx_text(points: usize) -> String {
        let mut segment = gpx::TrackSegment::default();
        for i in 0..points {
            let point = geo::Point::new(-3.70 + i as f64 * 0.001, 40.41 + i as f64 * 0.001);
            segment.points.push(gpx::Waypoint::new(point));
        }
        let mut track = gpx::Track::default();
        track.segments.push(segment);

        let document = gpx::Gpx {
            version: gpx::GpxVersion::Gpx11,
            creator: Some("loader tests".to_string()),
            tracks: vec![track],
            ..Default::default()
        };
        let mut out = Vec::new();
        gpx::write(&document, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_track_name_strips_final_extension() {
        assert_eq!(track_name("ride.gpx"), "ride");
        assert_eq!(track_name("a.b.gpx"), "a.b");
        assert_eq!(track_name("noext"), "noext");
        assert_eq!(track_name("dir/morning.gpx"), "morning");
    }

    #[test]
    fn test_pending_file_from_path_uses_file_name() {
        let file = PendingFile::from_path("/tmp/tracks/alps.gpx");
        assert_eq!(file.name, "alps.gpx");
        assert!(matches!(file.source, FileSource::Path(_)));
    }

    #[test]
    fn test_mixed_batch_keeps_going() {
        let mut session = session();
        let mut sink = Notifications::default();
        let mut batch = Batch::new();

        let first = batch.ingest(&mut session, "good.gpx", Ok(gpx_text(5)), &mut sink);
        let second = batch.ingest(&mut session, "empty.gpx", Ok(gpx_text(0)), &mut sink);
        let report = batch.finish(&mut session, Instant::now());

        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(session.tracks().len(), 1);
        assert_eq!(session.tracks()[0].name, "good");
        assert_eq!(report.added, vec![first.unwrap()]);
        assert_eq!(report.failed.len(), 1);
        assert!(matches!(&report.failed[0], TrackError::Parse { file } if file == "empty.gpx"));

        assert_eq!(sink.successes().collect::<Vec<_>>(), ["good.gpx loaded successfully"]);
        let errors: Vec<&str> = sink.errors().collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("empty.gpx"));
    }

    #[test]
    fn test_batch_fits_once_to_loaded_track() {
        let mut session = session();
        let mut sink = Notifications::default();
        let mut batch = Batch::new();
        let now = Instant::now();

        let id = batch
            .ingest(&mut session, "good.gpx", Ok(gpx_text(5)), &mut sink)
            .unwrap();
        batch.ingest(&mut session, "empty.gpx", Ok(gpx_text(0)), &mut sink);
        batch.finish(&mut session, now);

        let mut map = RecordingMap::default();
        let due = now + session.config().fit_delay;
        assert!(session.poll_fit(due, &mut map).is_some());
        assert!(session.poll_fit(due, &mut map).is_none());

        let expected = session.layers().geometry_of(&id).unwrap().bounds().unwrap();
        assert_eq!(map.frames, vec![expected]);
        assert_eq!(expected.min(), lat_lon(40.41, -3.70));
    }

    #[test]
    fn test_all_failed_batch_changes_nothing() {
        let mut session = session();
        let mut sink = Notifications::default();
        let mut batch = Batch::new();

        batch.ingest(&mut session, "empty.gpx", Ok(gpx_text(0)), &mut sink);
        batch.ingest(
            &mut session,
            "gone.gpx",
            Err(io::Error::new(io::ErrorKind::NotFound, "missing")),
            &mut sink,
        );
        let report = batch.finish(&mut session, Instant::now());

        assert!(report.added.is_empty());
        assert_eq!(report.failed.len(), 2);
        assert!(matches!(&report.failed[1], TrackError::Read { file, .. } if file == "gone.gpx"));
        assert!(session.tracks().is_empty());
        assert!(!session.scheduler().is_pending());
        assert_eq!(sink.errors().count(), 2);
        assert_eq!(sink.errors().nth(1), Some("Failed to load gone.gpx"));
    }

    #[tokio::test]
    async fn test_loader_reads_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.gpx");
        let second = dir.path().join("second.gpx");
        std::fs::File::create(&first)
            .unwrap()
            .write_all(gpx_text(3).as_bytes())
            .unwrap();
        std::fs::File::create(&second)
            .unwrap()
            .write_all(gpx_text(4).as_bytes())
            .unwrap();

        let mut session = session();
        let mut sink = Notifications::default();
        let report = BatchLoader::load(
            &mut session,
            [
                PendingFile::from_path(&first),
                PendingFile::from_path(dir.path().join("missing.gpx")),
                PendingFile::from_path(&second),
            ],
            &mut sink,
        )
        .await;

        let names: Vec<&str> = session.tracks().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["first", "second"]);
        assert_eq!(report.added.len(), 2);
        assert!(matches!(&report.failed[..], [TrackError::Read { file, .. }] if file == "missing.gpx"));
        assert!(session.scheduler().is_pending());

        // Each file gets distinct colors and ids
        assert_ne!(session.tracks()[0].color, session.tracks()[1].color);
        assert_ne!(session.tracks()[0].id(), session.tracks()[1].id());
    }

    /// Latin-1 export with a non-ASCII track name
    const LATIN1_GPX: &[u8] = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\n\
<gpx version=\"1.1\" creator=\"test\"><trk><name>Monta\xF1a</name><trkseg>\
<trkpt lat=\"40.1\" lon=\"-3.7\"/><trkpt lat=\"40.2\" lon=\"-3.6\"/>\
</trkseg></trk></gpx>";

    #[tokio::test]
    async fn test_loader_reads_latin1_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ruta.gpx");
        std::fs::write(&path, LATIN1_GPX).unwrap();

        let mut session = session();
        let mut sink = Notifications::default();
        let report = BatchLoader::load(
            &mut session,
            [
                PendingFile::from_path(&path),
                PendingFile::from_bytes("dropped.gpx", LATIN1_GPX.to_vec()),
            ],
            &mut sink,
        )
        .await;

        assert!(report.failed.is_empty());
        assert_eq!(report.added.len(), 2);
        assert_eq!(sink.errors().count(), 0);
        assert_eq!(sink.successes().next(), Some("ruta.gpx loaded successfully"));

        let geometry = session.layers().geometry_of(&report.added[0]).unwrap();
        assert_eq!(
            geometry.line().0,
            vec![lat_lon(40.1, -3.7), lat_lon(40.2, -3.6)]
        );
    }

    #[tokio::test]
    async fn test_loader_reports_binary_bytes_as_unparsable() {
        let mut session = session();
        let mut sink = Notifications::default();
        let report = BatchLoader::load(
            &mut session,
            [
                PendingFile::from_bytes("binary.gpx", vec![0xff, 0xfe, 0x00]),
                PendingFile::from_bytes("dropped.gpx", gpx_text(2).into_bytes()),
            ],
            &mut sink,
        )
        .await;

        assert_eq!(report.added.len(), 1);
        assert!(matches!(&report.failed[..], [TrackError::Parse { file }] if file == "binary.gpx"));
        assert_eq!(session.tracks()[0].name, "dropped");
    }
}
