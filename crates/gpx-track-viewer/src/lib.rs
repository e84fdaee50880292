//! GPX Track Viewer - Application Library
//!
//! Desktop front end for `gpx-track-lib`: a walkers map view, a track list sidebar and a
//! background file reader feeding the track session.

mod app;

pub use app::GpxTrackViewerApp;

use tracing_subscriber::EnvFilter;

/// Install the `tracing` subscriber, honoring `RUST_LOG` when set
pub fn setup_logging() {
    let default_directives = if cfg!(debug_assertions) {
        "debug,eframe::native=warn,hyper_util=info,walkers=info,egui::context=warn,reqwest::connect=info"
    } else {
        "info,eframe::native=warn,egui::context=warn"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));

    if tracing_subscriber::fmt().with_env_filter(filter).try_init().is_err() {
        tracing::debug!("Logging already initialized");
    }
}

/// Open the main window and run the viewer until it is closed
pub fn run_native(app_name: &str) -> eframe::Result {
    setup_logging();
    tracing::info!("Starting {app_name} v{}", env!("CARGO_PKG_VERSION"));

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_title(app_name)
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        app_name,
        native_options,
        Box::new(|cc| Ok(Box::new(GpxTrackViewerApp::new(cc)))),
    )
}
