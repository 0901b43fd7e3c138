//! HUD prompt and scene statistics window.
//!
//! The HUD tells the user what the next tap will do and shows the last
//! distance. The statistics window is the equivalent of a scene view's
//! statistics bar: frame rate, tracked feature points, and session state.

use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};

use crate::config::RulerConfig;
use crate::theme::{to_egui_color32, to_egui_color32_alpha, AppTheme};
use crate::tools::{ActiveMeasurement, MeasurementCompleted, MeasurementPhase};
use crate::tracking::{FeaturePoints, TrackingSession, TrackingState};
use crate::units::Meters;

/// EMA smoothing factor for FPS (lower = smoother).
const FPS_SMOOTHING: f32 = 0.05;
const HUD_FONT_SIZE: f32 = 16.0;

/// Snapshot of everything the overlay draws, refreshed once per frame.
#[derive(Resource, Default, Clone, Debug)]
pub struct OverlayState {
    pub phase: MeasurementPhase,
    pub distance: Option<Meters>,
    pub completed: u32,
    pub feature_points: usize,
    pub tracking: TrackingState,
    pub fps: f32,
    pub show_statistics: bool,
}

pub struct OverlayPlugin;

impl Plugin for OverlayPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<OverlayState>()
            .add_systems(Update, update_overlay_state)
            .add_systems(EguiPrimaryContextPass, render_overlay);
    }
}

pub fn update_overlay_state(
    time: Res<Time>,
    active: Res<ActiveMeasurement>,
    mut completed: MessageReader<MeasurementCompleted>,
    feature_points: Res<FeaturePoints>,
    tracking: Res<TrackingSession>,
    config: Res<RulerConfig>,
    mut overlay: ResMut<OverlayState>,
) {
    let dt = time.delta_secs();
    if dt > 0.0 {
        let instant_fps = 1.0 / dt;
        if overlay.fps == 0.0 {
            overlay.fps = instant_fps;
        } else {
            overlay.fps += FPS_SMOOTHING * (instant_fps - overlay.fps);
        }
    }

    overlay.phase = active.session.phase();
    overlay.distance = active.session.measurement().map(|m| m.distance);
    for MeasurementCompleted(measurement) in completed.read() {
        overlay.completed += 1;
        debug!("Overlay picked up measurement of {}", measurement.distance);
    }
    overlay.feature_points = feature_points.len();
    overlay.tracking = tracking.state();
    overlay.show_statistics = config.display.show_statistics;
}

/// Prompt text for the next tap.
pub fn hud_prompt(phase: MeasurementPhase) -> &'static str {
    match phase {
        MeasurementPhase::Empty => "Tap a surface to place the first point",
        MeasurementPhase::OnePointPlaced => "Tap to place the second point",
        MeasurementPhase::Complete => "Tap to clear",
    }
}

pub fn render_hud_ui(ctx: &egui::Context, overlay: &OverlayState, theme: &AppTheme) {
    let frame = egui::Frame::popup(&ctx.style())
        .fill(to_egui_color32_alpha(theme.hud_background(), 220));

    egui::Area::new(egui::Id::new("measurement_hud"))
        .anchor(egui::Align2::CENTER_TOP, egui::vec2(0.0, 16.0))
        .show(ctx, |ui| {
            frame.show(ui, |ui| {
                ui.vertical_centered(|ui| {
                    if let Some(distance) = overlay.distance {
                        ui.label(
                            egui::RichText::new(format!("Distance: {}", distance))
                                .size(HUD_FONT_SIZE)
                                .color(to_egui_color32(theme.hud_accent()))
                                .strong(),
                        );
                    }
                    if overlay.tracking == TrackingState::Paused {
                        ui.label(
                            egui::RichText::new("Tracking paused")
                                .color(to_egui_color32(theme.hud_subtext())),
                        );
                    }
                    ui.label(
                        egui::RichText::new(hud_prompt(overlay.phase))
                            .color(to_egui_color32(theme.hud_text())),
                    );
                });
            });
        });
}

pub fn render_statistics_ui(ctx: &egui::Context, overlay: &OverlayState) {
    egui::Window::new("Statistics")
        .anchor(egui::Align2::LEFT_BOTTOM, egui::vec2(8.0, -8.0))
        .resizable(false)
        .collapsible(true)
        .show(ctx, |ui| {
            egui::Grid::new("statistics_grid")
                .num_columns(2)
                .spacing([12.0, 4.0])
                .show(ui, |ui| {
                    ui.label("FPS:");
                    ui.label(format!("{:.0}", overlay.fps));
                    ui.end_row();

                    ui.label("Feature points:");
                    ui.label(format!("{}", overlay.feature_points));
                    ui.end_row();

                    ui.label("Tracking:");
                    ui.label(overlay.tracking.to_string());
                    ui.end_row();

                    ui.label("Measurements:");
                    ui.label(format!("{}", overlay.completed));
                    ui.end_row();
                });
        });
}

pub fn render_overlay(
    mut contexts: EguiContexts,
    overlay: Res<OverlayState>,
    theme: Res<AppTheme>,
) {
    let Ok(ctx) = contexts.ctx_mut() else {
        return;
    };

    render_hud_ui(ctx, &overlay, &theme);
    if overlay.show_statistics {
        render_statistics_ui(ctx, &overlay);
    }
}
