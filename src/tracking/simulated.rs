use bevy::prelude::*;

use super::FeaturePoints;

/// Grid spacing of the synthetic cloud (meters).
const SAMPLE_SPACING: f32 = 0.02;
/// Half extent of the sampled floor square.
const FLOOR_HALF_EXTENT: f32 = 1.5;

/// Axis-aligned box standing on the floor, stand-in for a table.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedBox {
    pub center: Vec3,
    pub half_size: Vec3,
}

impl SimulatedBox {
    pub fn top_height(&self) -> f32 {
        self.center.y + self.half_size.y
    }
}

pub const TABLE: SimulatedBox = SimulatedBox {
    center: Vec3::new(0.0, 0.375, -0.6),
    half_size: Vec3::new(0.4, 0.375, 0.25),
};

/// Desktop stand-in for an AR framework: fills `FeaturePoints` with a
/// deterministic cloud over the floor and the table top.
pub struct SimulatedTrackingPlugin;

impl Plugin for SimulatedTrackingPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, (spawn_simulated_environment, seed_feature_points));
    }
}

/// Sample the floor (y = 0) and the top face of `table` on a regular grid.
/// Floor samples hidden under the table are skipped. Returns an empty cloud
/// unless `spacing` is positive.
pub fn sample_feature_cloud(table: &SimulatedBox, spacing: f32) -> Vec<Vec3> {
    if !(spacing > 0.0) {
        return Vec::new();
    }
    let steps = (FLOOR_HALF_EXTENT * 2.0 / spacing) as i32;
    let under_table = |x: f32, z: f32| {
        (x - table.center.x).abs() <= table.half_size.x
            && (z - table.center.z).abs() <= table.half_size.z
    };

    let mut points = Vec::new();
    for i in 0..=steps {
        for j in 0..=steps {
            let x = -FLOOR_HALF_EXTENT + i as f32 * spacing;
            let z = -FLOOR_HALF_EXTENT + j as f32 * spacing;
            if !under_table(x, z) {
                points.push(Vec3::new(x, 0.0, z));
            }
        }
    }

    let top = table.top_height();
    let nx = (table.half_size.x * 2.0 / spacing) as i32;
    let nz = (table.half_size.z * 2.0 / spacing) as i32;
    for i in 0..=nx {
        for j in 0..=nz {
            let x = table.center.x - table.half_size.x + i as f32 * spacing;
            let z = table.center.z - table.half_size.z + j as f32 * spacing;
            points.push(Vec3::new(x, top, z));
        }
    }
    points
}

pub fn seed_feature_points(mut feature_points: ResMut<FeaturePoints>) {
    feature_points.replace(sample_feature_cloud(&TABLE, SAMPLE_SPACING));
    info!("Simulated tracking: {} feature points", feature_points.len());
}

/// Visible geometry matching the sampled surfaces.
pub fn spawn_simulated_environment(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.spawn((
        Name::new("Floor"),
        Mesh3d(meshes.add(Plane3d::new(Vec3::Y, Vec2::splat(FLOOR_HALF_EXTENT)))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.35, 0.33, 0.3),
            perceptual_roughness: 1.0,
            ..default()
        })),
        Transform::default(),
    ));

    commands.spawn((
        Name::new("Table"),
        Mesh3d(meshes.add(Cuboid::from_size(TABLE.half_size * 2.0))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.55, 0.4, 0.25),
            ..default()
        })),
        Transform::from_translation(TABLE.center),
    ));
}
