use bevy::prelude::*;
use bevy_egui::EguiPlugin;

mod config;
mod geometry;
mod overlay;
mod theme;
mod tools;
mod tracking;
mod units;

use config::ConfigPlugin;
use overlay::OverlayPlugin;
use theme::AppTheme;
use tools::ToolsPlugin;
use tracking::{ArCamera, SimulatedTrackingPlugin, TrackingPlugin, TABLE};

// =============================================================================
// Constants
// =============================================================================

mod constants {
    use bevy::math::Vec3;

    /// Handheld device pose for the simulated session: standing back from the
    /// table at chest height.
    pub const CAMERA_POSITION: Vec3 = Vec3::new(0.0, 1.4, 1.0);

    pub const LIGHT_POSITION: Vec3 = Vec3::new(2.0, 4.0, 2.0);
}

fn main() {
    App::new()
        .add_plugins((
            DefaultPlugins.set(WindowPlugin {
                primary_window: Some(Window {
                    title: "AR Ruler".to_string(),
                    resolution: (1280, 720).into(),
                    ..default()
                }),
                ..default()
            }),
            EguiPlugin::default(),
            ConfigPlugin,
            TrackingPlugin,
            SimulatedTrackingPlugin,
            ToolsPlugin,
            OverlayPlugin,
        ))
        .init_resource::<AppTheme>()
        .add_systems(Startup, setup_scene)
        .run();
}

fn setup_scene(mut commands: Commands) {
    let target = TABLE.center.with_y(TABLE.top_height());

    commands.spawn((
        Name::new("AR Camera"),
        ArCamera,
        Camera3d::default(),
        Transform::from_translation(constants::CAMERA_POSITION).looking_at(target, Vec3::Y),
    ));

    commands.spawn((
        Name::new("Sun"),
        DirectionalLight {
            shadows_enabled: true,
            ..default()
        },
        Transform::from_translation(constants::LIGHT_POSITION).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}
