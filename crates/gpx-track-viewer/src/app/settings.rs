use crate::app::state::TilesProvider;
use clap::Parser;
use gpx_track_lib::{Config, MalformedPointPolicy, StrokeWeight, TrackColor};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// GPX Track Viewer - Load, style and compare GPX tracks on an interactive map
pub struct Settings {
    /// GPX files to load on startup
    #[clap(short, long, value_name = "FILE")]
    pub gpx_files: Vec<PathBuf>,

    /// Padding in pixels kept around tracks when fitting the map
    #[clap(long, default_value = "50.0")]
    pub fit_padding: f32,

    /// Delay in milliseconds before re-framing the map after loads, deletions and visibility
    /// changes
    #[clap(long, default_value = "100")]
    pub fit_delay_ms: u64,

    /// Stroke weight of newly loaded tracks (1-10 px)
    #[clap(long, default_value = "3", value_parser = clap::value_parser!(u8).range(1..=10))]
    pub default_weight: u8,

    /// Colors handed out to newly loaded tracks in turn, as `#rrggbb` (comma separated)
    #[clap(long, value_name = "COLOR", value_delimiter = ',')]
    pub palette: Vec<TrackColor>,

    /// Drop track points with missing or invalid coordinates instead of placing them at 0,0
    #[clap(long, default_value = "false")]
    pub skip_malformed_points: bool,

    /// Map tiles provider
    #[clap(long, value_enum, default_value_t = TilesProvider::OpenStreetMap)]
    pub tiles: TilesProvider,
}

impl Settings {
    pub fn from_cli() -> Self {
        match Settings::try_parse() {
            Ok(args) => args,
            Err(e) => e.exit(),
        }
    }

    /// Library configuration matching these settings
    pub fn to_config(&self) -> Config {
        let default_weight = StrokeWeight::new(self.default_weight).unwrap_or_else(|err| {
            tracing::warn!("{err}, using the default weight");
            StrokeWeight::DEFAULT
        });
        let malformed_points = if self.skip_malformed_points {
            MalformedPointPolicy::Skip
        } else {
            MalformedPointPolicy::ZeroFill
        };

        let defaults = Config::default();
        let palette = if self.palette.is_empty() {
            defaults.palette.clone()
        } else {
            self.palette.clone()
        };

        Config {
            default_weight,
            palette,
            fit_padding: self.fit_padding.max(0.0),
            fit_delay: Duration::from_millis(self.fit_delay_ms),
            malformed_points,
            ..defaults
        }
    }
}
