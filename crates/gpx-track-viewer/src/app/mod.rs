//! Application module
//!
//! This module provides the main application structure:
//! - Full-screen map view with the visible tracks drawn on top
//! - Sidebar with the track list and per-track controls
//! - Drag-and-drop support for GPX files
//! - Toasts for load results and track actions

mod plugin;
pub(crate) mod settings;
mod state;
mod ui_panels;

use crate::app::plugin::TrackPlugin;
use crate::app::settings::Settings;
use crate::app::state::{AppState, MapAction, TilesProvider};
use eframe::egui;
use geo::Rect;
use gpx_track_lib::{MapSurface, frame_for_viewport};
use walkers::{
    HttpTiles, Map, MapMemory, TileId,
    sources::{Attribution, OpenStreetMap, TileSource},
};

/// Map position shown until the first tracks are framed
const START_LAT_LON: (f64, f64) = (40.4168, -3.7038);
const START_ZOOM: f64 = 6.0;

/// Custom OpenTopoMap tile source
pub struct OpenTopoMap;

impl TileSource for OpenTopoMap {
    fn tile_url(&self, tile_id: TileId) -> String {
        format!(
            "https://tile.opentopomap.org/{}/{}/{}.png",
            tile_id.zoom, tile_id.x, tile_id.y
        )
    }

    fn attribution(&self) -> Attribution {
        Attribution {
            text: "© OpenTopoMap (CC-BY-SA)",
            url: "https://opentopomap.org/",
            logo_light: None,
            logo_dark: None,
        }
    }

    fn max_zoom(&self) -> u8 {
        17 // OpenTopoMap has max zoom of 17
    }
}

/// Esri World Imagery satellite tiles
pub struct EsriWorldImagery;

impl TileSource for EsriWorldImagery {
    fn tile_url(&self, tile_id: TileId) -> String {
        // Row before column
        format!(
            "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{}/{}/{}",
            tile_id.zoom, tile_id.y, tile_id.x
        )
    }

    fn attribution(&self) -> Attribution {
        Attribution {
            text: "© Esri",
            url: "https://www.esri.com/",
            logo_light: None,
            logo_dark: None,
        }
    }

    fn max_zoom(&self) -> u8 {
        19
    }
}

/// IGN España raster map, served as WMTS on the Google Maps compatible tile grid
pub struct IgnEspana;

impl TileSource for IgnEspana {
    fn tile_url(&self, tile_id: TileId) -> String {
        format!(
            "https://www.ign.es/wmts/mapa-raster?SERVICE=WMTS&REQUEST=GetTile&VERSION=1.0.0\
             &LAYER=MTN&STYLE=default&TILEMATRIXSET=GoogleMapsCompatible\
             &TILEMATRIX={}&TILEROW={}&TILECOL={}&FORMAT=image/jpeg",
            tile_id.zoom, tile_id.y, tile_id.x
        )
    }

    fn attribution(&self) -> Attribution {
        Attribution {
            text: "© IGN España",
            url: "https://www.ign.es/",
            logo_light: None,
            logo_dark: None,
        }
    }

    fn max_zoom(&self) -> u8 {
        18
    }
}

/// The walkers camera as a [`MapSurface`]
struct MapFrame<'a> {
    memory: &'a mut MapMemory,
    /// Size of the map view in points
    viewport: egui::Vec2,
}

impl MapSurface for MapFrame<'_> {
    fn frame_region(&mut self, bounds: Rect<f64>, padding: f32) {
        let framing = frame_for_viewport(bounds, (self.viewport.x, self.viewport.y), padding);
        self.memory
            .center_at(walkers::lat_lon(framing.center.y, framing.center.x));
        if let Err(err) = self.memory.set_zoom(framing.zoom) {
            tracing::warn!("Map rejected zoom {:.1}: {err:?}", framing.zoom);
        }

        tracing::trace!(
            "Framed ({:.4}, {:.4}) - ({:.4}, {:.4}) at zoom {:.1}",
            bounds.min().y,
            bounds.min().x,
            bounds.max().y,
            bounds.max().x,
            framing.zoom
        );
    }
}

/// Main application structure
pub struct GpxTrackViewerApp {
    /// Application state (tracks, loader, toasts, UI settings)
    state: AppState,

    /// Map tiles provider (OpenStreetMap)
    tiles_osm: HttpTiles,

    /// Map tiles provider (OpenTopoMap)
    tiles_otm: HttpTiles,

    /// Map tiles provider (Esri World Imagery)
    tiles_esri: HttpTiles,

    /// Map tiles provider (IGN España)
    tiles_ign: HttpTiles,

    /// Map state (camera position, zoom, etc.)
    map_memory: MapMemory,

    /// Size of the map view on the last frame
    map_viewport: egui::Vec2,

    /// Show help overlay
    show_help: bool,
}

impl GpxTrackViewerApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let settings = Settings::from_cli();
        let state = AppState::new(&settings, &cc.egui_ctx);

        let tiles_osm = HttpTiles::new(OpenStreetMap, cc.egui_ctx.clone());
        let tiles_otm = HttpTiles::new(OpenTopoMap, cc.egui_ctx.clone());
        let tiles_esri = HttpTiles::new(EsriWorldImagery, cc.egui_ctx.clone());
        let tiles_ign = HttpTiles::new(IgnEspana, cc.egui_ctx.clone());

        let mut map_memory = MapMemory::default();
        if let Err(err) = map_memory.set_zoom(START_ZOOM) {
            tracing::warn!("Map rejected start zoom: {err:?}");
        }

        tracing::info!(
            "Initialized with {} file(s) to load",
            settings.gpx_files.len()
        );

        Self {
            state,
            tiles_osm,
            tiles_otm,
            tiles_esri,
            tiles_ign,
            map_memory,
            map_viewport: egui::vec2(1280.0, 720.0),
            show_help: false,
        }
    }

    /// Apply the deferred fit and any camera change requested by the sidebar
    fn update_camera(&mut self, ctx: &egui::Context, now: instant::Instant) {
        let mut map = MapFrame {
            memory: &mut self.map_memory,
            viewport: self.map_viewport,
        };

        match self.state.pending_map_action.take() {
            Some(MapAction::FitAll) => {
                if self.state.session.fit_all(&mut map).is_none() {
                    tracing::debug!("Nothing visible to fit");
                }
            }
            Some(MapAction::ZoomTo(id)) => {
                if let Err(err) =
                    self.state
                        .session
                        .zoom_to_track(&id, &mut map, &mut self.state.notifications)
                {
                    tracing::warn!("Zoom failed: {err}");
                }
            }
            None => {}
        }

        self.state.session.poll_fit(now, &mut map);
        if let Some(remaining) = self.state.session.scheduler().time_until_due(now) {
            ctx.request_repaint_after(remaining);
        }
    }
}

#[profiling::all_functions]
impl eframe::App for GpxTrackViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = instant::Instant::now();

        // Handle keyboard shortcuts
        ctx.input(|i| {
            if i.key_pressed(egui::Key::F1) {
                self.show_help = !self.show_help;
            }
            if i.key_pressed(egui::Key::H) && i.modifiers.ctrl {
                self.show_help = !self.show_help;
            }
        });

        // Ingest files read by the background task
        for report in self.state.process_load_events(now) {
            if !report.added.is_empty() {
                // Wake up for the deferred fit of this batch
                ctx.request_repaint();
            }
        }

        // Handle drag and drop
        ui_panels::handle_drag_and_drop(ctx, &mut self.state);

        // Handle file picker
        ui_panels::show_file_picker(&mut self.state);

        // Show help overlay if enabled
        if self.show_help {
            ui_panels::help_overlay(ctx, &mut self.show_help);
        }

        ui_panels::render_sidebar(ctx, &mut self.state, now);

        self.update_camera(ctx, now);

        let tiles_provider = self.state.ui_settings.tiles_provider;
        let attribution_text = tiles_provider.attribution();

        // Central panel: Map view (full screen)
        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                profiling::scope!("map_panel");

                self.map_viewport = ui.available_size();
                let track_plugin = TrackPlugin::new(&self.state.session);

                let tiles: &mut HttpTiles = match tiles_provider {
                    TilesProvider::OpenStreetMap => &mut self.tiles_osm,
                    TilesProvider::OpenTopoMap => &mut self.tiles_otm,
                    TilesProvider::EsriWorldImagery => &mut self.tiles_esri,
                    TilesProvider::IgnEspana => &mut self.tiles_ign,
                };

                let map = Map::new(
                    Some(tiles),
                    &mut self.map_memory,
                    walkers::lat_lon(START_LAT_LON.0, START_LAT_LON.1),
                )
                .with_plugin(track_plugin);

                ui.add(map);

                ui_panels::sidebar_toggle_button(ui, &mut self.state);

                let painter = ui.painter();
                let screen_rect = ui.max_rect();
                painter.text(
                    screen_rect.center_bottom() + egui::vec2(0.0, -5.0),
                    egui::Align2::CENTER_BOTTOM,
                    attribution_text,
                    egui::FontId::proportional(10.0),
                    egui::Color32::from_black_alpha(180),
                );
            });

        // Toasts are drawn last so they stay on top
        self.state.update_toasts(now);
        if !self.state.toasts.is_empty() {
            ui_panels::show_toasts(ctx, &self.state, now);
            ctx.request_repaint();
        }

        if self.state.file_loader.is_busy() {
            ctx.request_repaint();
        }
    }
}
