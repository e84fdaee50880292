#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows in release

fn main() -> eframe::Result {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| eframe::Error::AppCreation(Box::new(err)))?;

    // The reader task is spawned from the UI thread, which must be inside the runtime
    let _guard = rt.enter();
    gpx_track_viewer::run_native("GPX Track Viewer")
}
