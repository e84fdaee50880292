//! Walkers plugin drawing the visible track geometries on the map view

use egui::{Color32, Stroke};
use geo::LineString;
use gpx_track_lib::{LineStyle, TrackSession};
use std::sync::Arc;
use walkers::{Plugin, Projector};

/// Snapshot of one visible line, cheap to take every frame
struct StyledLine {
    line: Arc<LineString<f64>>,
    stroke: Stroke,
}

/// Plugin for rendering GPX tracks on the map
pub struct TrackPlugin {
    /// Lines in draw order
    lines: Vec<StyledLine>,
}

impl TrackPlugin {
    /// Capture the visible group of `session`; coordinate buffers are shared, not copied
    pub fn new(session: &TrackSession) -> Self {
        let lines = session
            .visible_geometries()
            .map(|(_, geometry)| StyledLine {
                line: Arc::clone(geometry.line()),
                stroke: stroke_for(geometry.style()),
            })
            .collect();
        Self { lines }
    }
}

/// Egui stroke matching a line style
pub fn stroke_for(style: LineStyle) -> Stroke {
    let [r, g, b] = style.color.to_array();
    Stroke::new(f32::from(style.weight.get()), Color32::from_rgb(r, g, b))
}

impl Plugin for TrackPlugin {
    fn run(
        self: Box<Self>,
        ui: &mut egui::Ui,
        _response: &egui::Response,
        projector: &Projector,
        _map_memory: &walkers::MapMemory,
    ) {
        profiling::scope!("TrackPlugin::run");

        let painter = ui.painter();
        for styled in &self.lines {
            // Convert WGS84 coordinates to screen space
            let screen_points: Vec<egui::Pos2> = styled
                .line
                .coords()
                .map(|coord| {
                    let screen_vec = projector.project(walkers::lat_lon(coord.y, coord.x));
                    egui::Pos2::new(screen_vec.x, screen_vec.y)
                })
                .collect();

            match screen_points.len() {
                0 => {}
                1 => {
                    painter.circle_filled(
                        screen_points[0],
                        styled.stroke.width,
                        styled.stroke.color,
                    );
                }
                _ => {
                    painter.add(egui::Shape::line(screen_points, styled.stroke));
                }
            }
        }
    }
}
