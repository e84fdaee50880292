//! UI panels for the application
//!
//! This module provides the sidebar with the track list, the map overlay controls,
//! toasts and drag-and-drop support.

use crate::app::state::{AppState, MapAction, TilesProvider};
use egui::{Color32, RichText, Ui};
use gpx_track_lib::{Notification, PendingFile, StrokeWeight, TrackColor, TrackId};
use instant::Instant;

/// Edits made from the track list, applied once the list is no longer borrowed
enum TrackAction {
    Zoom(TrackId),
    Rename(TrackId, String),
    SetVisible(TrackId, bool),
    SetColor(TrackId, TrackColor),
    SetWeight(TrackId, StrokeWeight),
    Delete(TrackId),
}

/// Render the sidebar toggle button (overlaid on top-right of map)
pub fn sidebar_toggle_button(ui: &mut Ui, state: &mut AppState) {
    let button_size = egui::vec2(40.0, 40.0);
    let margin = 10.0;

    let rect = ui.max_rect();
    let button_pos = rect.right_top() + egui::vec2(-button_size.x - margin, margin);
    let button_rect = egui::Rect::from_min_size(button_pos, button_size);

    let response = ui.allocate_rect(button_rect, egui::Sense::click());

    if response.clicked() {
        state.ui_settings.sidebar_open = !state.ui_settings.sidebar_open;
    }

    let bg_color = if response.hovered() {
        ui.visuals().widgets.hovered.bg_fill
    } else {
        ui.visuals().widgets.inactive.bg_fill
    };

    ui.painter().rect_filled(button_rect, 5.0, bg_color);

    let icon = if state.ui_settings.sidebar_open {
        "✕"
    } else {
        "☰"
    };

    ui.painter().text(
        button_rect.center(),
        egui::Align2::CENTER_CENTER,
        icon,
        egui::FontId::proportional(20.0),
        ui.visuals().text_color(),
    );
}

/// Render the main sidebar (responsive: side on landscape, bottom on portrait)
pub fn render_sidebar(ctx: &egui::Context, state: &mut AppState, now: Instant) {
    if !state.ui_settings.sidebar_open {
        return;
    }

    let screen_size = ctx.viewport_rect().size();
    if screen_size.y > screen_size.x {
        egui::TopBottomPanel::bottom("main_sidebar")
            .default_height(280.0)
            .min_height(180.0)
            .max_height(ctx.viewport_rect().height() * 0.6)
            .resizable(true)
            .show(ctx, |ui| render_sidebar_content(ui, state, now));
    } else {
        egui::SidePanel::left("main_sidebar")
            .default_width(320.0)
            .min_width(260.0)
            .max_width(450.0)
            .resizable(true)
            .show(ctx, |ui| render_sidebar_content(ui, state, now));
    }
}

fn render_sidebar_content(ui: &mut Ui, state: &mut AppState, now: Instant) {
    ui.heading("GPX Track Viewer");
    ui.add_space(4.0);

    ui.horizontal_wrapped(|ui| {
        if ui.button("📂 Load GPX Files...").clicked() {
            state.file_loader.show_picker = true;
        }
        if ui.button("🎯 Fit to Tracks").clicked() {
            state.pending_map_action = Some(MapAction::FitAll);
        }
        if ui.button("🗑 Clear All").clicked() {
            state.clear_tracks();
        }
    });

    if state.file_loader.is_busy() {
        ui.add_space(4.0);
        ui.horizontal(|ui| {
            ui.spinner();
            ui.label(
                RichText::new("Loading files...")
                    .strong()
                    .color(ui.visuals().warn_fg_color),
            );
        });
    }

    ui.add_space(8.0);
    ui.separator();

    ui.label(RichText::new(format!("📊 Tracks ({})", state.session.tracks().len())).strong());
    ui.add_space(4.0);

    let actions = egui::ScrollArea::vertical()
        .id_salt("tracks_scroll")
        .max_height((ui.available_height() - 90.0).max(80.0))
        .auto_shrink([false, true])
        .show(ui, |ui| render_track_list(ui, state))
        .inner;

    for action in actions {
        match action {
            TrackAction::Zoom(id) => state.pending_map_action = Some(MapAction::ZoomTo(id)),
            TrackAction::Rename(id, name) => state.rename_track(&id, name, now),
            TrackAction::SetVisible(id, visible) => state.set_visible(&id, visible, now),
            TrackAction::SetColor(id, color) => state.set_color(&id, color, now),
            TrackAction::SetWeight(id, weight) => state.set_weight(&id, weight, now),
            TrackAction::Delete(id) => state.delete_track(&id, now),
        }
    }

    ui.separator();
    ui.add_space(4.0);

    // Map Tiles section
    ui.label(RichText::new("🗺 Map Tiles").strong());
    ui.horizontal_wrapped(|ui| {
        for provider in TilesProvider::all() {
            let selected = state.ui_settings.tiles_provider == *provider;
            if ui.selectable_label(selected, provider.name()).clicked() {
                state.ui_settings.tiles_provider = *provider;
            }
        }
    });
    ui.label(
        RichText::new("F1 / Ctrl+H - Help")
            .small()
            .weak(),
    );
}

/// Render one card per track, returning the edits made this frame
fn render_track_list(ui: &mut Ui, state: &AppState) -> Vec<TrackAction> {
    let mut actions = Vec::new();

    if state.session.tracks().is_empty() {
        ui.add_space(24.0);
        ui.vertical_centered(|ui| {
            ui.label(RichText::new("No tracks loaded").weak());
            ui.label(
                RichText::new("Load GPX files or drop them on the window")
                    .small()
                    .weak(),
            );
        });
        return actions;
    }

    for track in state.session.tracks() {
        let id = track.id();
        egui::Frame::group(ui.style()).show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.horizontal(|ui| {
                let [r, g, b] = track.color.to_array();
                let (swatch, _) =
                    ui.allocate_exact_size(egui::vec2(12.0, 12.0), egui::Sense::hover());
                ui.painter()
                    .circle_filled(swatch.center(), 6.0, Color32::from_rgb(r, g, b));

                let mut name = track.name.clone();
                let text_color = if track.visible {
                    ui.visuals().strong_text_color()
                } else {
                    ui.visuals().weak_text_color()
                };
                let edit = egui::TextEdit::singleline(&mut name)
                    .text_color(text_color)
                    .desired_width((ui.available_width() - 80.0).max(60.0));
                if ui.add(edit).on_hover_text("Click to rename").changed() {
                    actions.push(TrackAction::Rename(id.clone(), name));
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.small_button("🗑").on_hover_text("Delete track").clicked() {
                        actions.push(TrackAction::Delete(id.clone()));
                    }
                    let eye = if track.visible { "👁" } else { "◌" };
                    let hint = if track.visible { "Hide track" } else { "Show track" };
                    if ui.small_button(eye).on_hover_text(hint).clicked() {
                        actions.push(TrackAction::SetVisible(id.clone(), !track.visible));
                    }
                    if ui.small_button("🔍").on_hover_text("Zoom to track").clicked() {
                        actions.push(TrackAction::Zoom(id.clone()));
                    }
                });
            });

            ui.horizontal(|ui| {
                let mut rgb = track.color.to_array();
                if ui.color_edit_button_srgb(&mut rgb).changed() {
                    actions.push(TrackAction::SetColor(id.clone(), TrackColor::from_array(rgb)));
                }

                let mut weight = track.weight.get();
                let slider = egui::Slider::new(&mut weight, StrokeWeight::MIN..=StrokeWeight::MAX)
                    .suffix(" px");
                if ui.add(slider).changed()
                    && let Ok(weight) = StrokeWeight::new(weight)
                {
                    actions.push(TrackAction::SetWeight(id.clone(), weight));
                }
            });
        });
        ui.add_space(4.0);
    }

    actions
}

/// Show file picker dialog
#[cfg(not(any(target_arch = "wasm32", target_os = "android")))]
pub fn show_file_picker(state: &mut AppState) {
    if state.file_loader.show_picker {
        state.file_loader.show_picker = false;

        if let Some(paths) = rfd::FileDialog::new()
            .add_filter("GPX Files", &["gpx"])
            .set_title("Select GPX Files")
            .pick_files()
        {
            state.queue_files(paths.into_iter().map(PendingFile::from_path).collect());
        }
    }
}

#[cfg(any(target_arch = "wasm32", target_os = "android"))]
pub fn show_file_picker(state: &mut AppState) {
    if state.file_loader.show_picker {
        state.file_loader.show_picker = false;
        tracing::warn!("File picker is not available on this platform, drop files instead");
    }
}

/// Help overlay
pub fn help_overlay(ctx: &egui::Context, show_help: &mut bool) {
    egui::Window::new("Help")
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            ui.heading("GPX Track Viewer");
            ui.add_space(8.0);

            ui.label(RichText::new("Loading Tracks").strong());
            ui.label("• Click 'Load GPX Files...' in the sidebar");
            ui.label("• Or drag and drop GPX files onto the window");
            ui.add_space(8.0);

            ui.label(RichText::new("Tracks").strong());
            ui.label("• 🔍 zooms to a track, 👁 shows or hides it, 🗑 deletes it");
            ui.label("• Click a track name to rename it");
            ui.label("• Pick a color and a line width per track");
            ui.label("• 'Fit to Tracks' frames every visible track");
            ui.add_space(8.0);

            ui.label(RichText::new("Keyboard Shortcuts").strong());
            ui.label("• F1 or Ctrl+H - Toggle this help");
            ui.add_space(12.0);

            if ui.button("Close").clicked() {
                *show_help = false;
            }
        });
}

/// Whether a file looks like a GPX file, judging by its name
fn is_gpx_file(name: &str) -> bool {
    std::path::Path::new(name)
        .extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("gpx"))
}

/// Handle drag and drop of GPX files
pub fn handle_drag_and_drop(ctx: &egui::Context, state: &mut AppState) {
    let hovered_files = ctx.input(|i| !i.raw.hovered_files.is_empty());
    let dropped_files: Vec<egui::DroppedFile> = ctx.input(|i| i.raw.dropped_files.clone());

    if hovered_files {
        let painter = ctx.layer_painter(egui::LayerId::new(
            egui::Order::Foreground,
            egui::Id::new("drop_preview"),
        ));
        let screen_rect = ctx.content_rect();
        let bg_rect = egui::Rect::from_center_size(screen_rect.center(), egui::vec2(340.0, 80.0));
        painter.rect_filled(bg_rect, 16.0, Color32::from_black_alpha(180));
        painter.text(
            screen_rect.center(),
            egui::Align2::CENTER_CENTER,
            "📂 Drop GPX files here",
            egui::FontId::proportional(32.0),
            Color32::WHITE,
        );
    }

    let mut files = Vec::new();
    for dropped in dropped_files {
        let file = match (dropped.path, dropped.bytes) {
            (Some(path), _) => PendingFile::from_path(path),
            (None, Some(bytes)) => PendingFile::from_bytes(dropped.name, bytes),
            (None, None) => {
                tracing::warn!("Dropped file {} has neither a path nor contents", dropped.name);
                continue;
            }
        };
        if is_gpx_file(&file.name) {
            files.push(file);
        } else {
            tracing::debug!("Ignoring dropped non-GPX file {}", file.name);
        }
    }
    state.queue_files(files);
}

/// Draw the toast stack in the bottom-right corner
pub fn show_toasts(ctx: &egui::Context, state: &AppState, now: Instant) {
    egui::Area::new(egui::Id::new("toasts"))
        .order(egui::Order::Foreground)
        .anchor(egui::Align2::RIGHT_BOTTOM, [-12.0, -24.0])
        .interactable(false)
        .show(ctx, |ui| {
            for toast in state.toasts.iter() {
                let alpha = state.toasts.alpha(toast, now);
                let (icon, accent) = match &toast.notification {
                    Notification::Success(_) => ("✔", Color32::from_rgb(34, 197, 94)),
                    Notification::Error(_) => ("⚠", Color32::from_rgb(239, 68, 68)),
                };

                egui::Frame::NONE
                    .fill(Color32::from_black_alpha((200.0 * alpha) as u8))
                    .corner_radius(8.0)
                    .inner_margin(egui::Margin::symmetric(12, 8))
                    .show(ui, |ui| {
                        ui.label(
                            RichText::new(format!("{icon} {}", toast.notification.message()))
                                .color(accent.gamma_multiply(alpha)),
                        );
                    });
                ui.add_space(6.0);
            }
        });
}
