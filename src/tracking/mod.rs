//! World-tracking session adapter.
//!
//! Feature detection and pose estimation belong to the platform AR framework.
//! This module only holds what that framework publishes (the current feature
//! point cloud and whether the session is running) and answers hit-tests
//! against it.

mod simulated;

pub use simulated::*;

use bevy::prelude::*;
use bevy::window::WindowFocused;

use crate::config::HitTestConfig;

/// Camera whose view the user taps on.
#[derive(Component)]
pub struct ArCamera;

/// Tracking service seam: project a screen point into the world and return the
/// nearest detected feature point under it.
pub trait HitTester {
    fn hit_test_feature_point(&self, screen_point: Vec2) -> Option<Vec3>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackingState {
    #[default]
    Paused,
    Running,
}

impl std::fmt::Display for TrackingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackingState::Paused => write!(f, "Paused"),
            TrackingState::Running => write!(f, "Running"),
        }
    }
}

#[derive(Resource, Default)]
pub struct TrackingSession {
    state: TrackingState,
}

impl TrackingSession {
    pub fn state(&self) -> TrackingState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TrackingState::Running
    }

    pub fn run(&mut self) {
        if self.state != TrackingState::Running {
            self.state = TrackingState::Running;
            info!("World tracking session running");
        }
    }

    pub fn pause(&mut self) {
        if self.state != TrackingState::Paused {
            self.state = TrackingState::Paused;
            info!("World tracking session paused");
        }
    }
}

/// Feature points detected by the tracking backend, in world space.
/// Written by the backend, read by hit-tests.
#[derive(Resource, Default)]
pub struct FeaturePoints {
    points: Vec<Vec3>,
}

impl FeaturePoints {
    pub fn new(points: Vec<Vec3>) -> Self {
        Self { points }
    }

    /// Swap in a fresh cloud from the backend.
    pub fn replace(&mut self, points: Vec<Vec3>) {
        self.points = points;
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Nearest feature point (by distance along the ray) that lies inside the
    /// hit cone around `ray` and no farther than `config.max_distance`.
    pub fn hit_test_ray(&self, ray: Ray3d, config: &HitTestConfig) -> Option<Vec3> {
        let direction: Vec3 = *ray.direction;
        let max_tan = config.cone_half_angle_deg.to_radians().tan();

        self.points
            .iter()
            .filter_map(|&point| {
                let offset = point - ray.origin;
                let along = offset.dot(direction);
                if along <= 0.0 || along > config.max_distance {
                    return None;
                }
                let lateral = (offset - direction * along).length();
                (lateral <= along * max_tan).then_some((along, point))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, point)| point)
    }
}

/// Hit-tests viewport points through the AR camera against the feature cloud.
pub struct CameraHitTester<'a> {
    pub camera: &'a Camera,
    pub camera_transform: &'a GlobalTransform,
    pub feature_points: &'a FeaturePoints,
    pub session: &'a TrackingSession,
    pub config: &'a HitTestConfig,
}

impl HitTester for CameraHitTester<'_> {
    fn hit_test_feature_point(&self, screen_point: Vec2) -> Option<Vec3> {
        if !self.session.is_running() {
            return None;
        }
        let ray = self
            .camera
            .viewport_to_world(self.camera_transform, screen_point)
            .ok()?;
        self.feature_points.hit_test_ray(ray, self.config)
    }
}

/// Systems that update `TrackingSession` for the frame. Anything that
/// hit-tests must run after this set.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackingSystems;

pub struct TrackingPlugin;

impl Plugin for TrackingPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TrackingSession>()
            .init_resource::<FeaturePoints>()
            .add_systems(Startup, start_tracking_session)
            .add_systems(Update, pause_tracking_on_focus_change.in_set(TrackingSystems));
    }
}

pub fn start_tracking_session(mut session: ResMut<TrackingSession>) {
    session.run();
}

/// The session follows window focus: losing focus pauses tracking, regaining
/// it resumes.
pub fn pause_tracking_on_focus_change(
    mut focus_events: MessageReader<WindowFocused>,
    mut session: ResMut<TrackingSession>,
) {
    for event in focus_events.read() {
        if event.focused {
            session.run();
        } else {
            session.pause();
        }
    }
}
