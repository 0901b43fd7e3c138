mod measurement;

pub use measurement::*;

use bevy::prelude::*;

use crate::tracking::TrackingSystems;

/// Tap handling. Runs after the tracking session has seen this frame's focus
/// changes, so a click that refocuses the window is hit-tested while running.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct MeasurementSystems;

pub struct ToolsPlugin;

impl Plugin for ToolsPlugin {
    fn build(&self, app: &mut App) {
        configure_measurement_ordering(app);
        app.init_resource::<ActiveMeasurement>()
            .add_message::<MeasurementCompleted>()
            .add_systems(Update, handle_measurement_taps.in_set(MeasurementSystems));
    }
}

pub fn configure_measurement_ordering(app: &mut App) {
    app.configure_sets(Update, MeasurementSystems.after(TrackingSystems));
}
