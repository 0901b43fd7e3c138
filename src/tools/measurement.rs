use bevy::prelude::*;
use bevy_egui::EguiContexts;

use crate::config::{HitTestConfig, RulerConfig};
use crate::geometry::{distance, line_segment, marker_mesh};
use crate::theme::AppTheme;
use crate::tracking::{ArCamera, CameraHitTester, FeaturePoints, HitTester, TrackingSession};
use crate::units::Meters;

/// Which end of the measurement a marker belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerRole {
    Start,
    End,
}

/// Renderable handed to the scene graph.
#[derive(Debug, Clone)]
pub enum SceneNode {
    Marker { position: Vec3, role: MarkerRole },
    Segment(Mesh),
}

/// Scene graph seam. The controller only removes nodes it added itself.
pub trait SceneGraph {
    type Handle: Copy;

    fn add_node(&mut self, node: SceneNode) -> Self::Handle;
    fn remove_node(&mut self, handle: Self::Handle);
}

/// A marker inserted into the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedMarker<H> {
    pub handle: H,
    pub position: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MeasurementState<H> {
    Empty,
    OnePointPlaced {
        start: PlacedMarker<H>,
    },
    Complete {
        start: PlacedMarker<H>,
        end: PlacedMarker<H>,
        segment: H,
    },
}

/// Which phase the session is in, without the scene handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeasurementPhase {
    #[default]
    Empty,
    OnePointPlaced,
    Complete,
}

/// A finished two-point measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub start: Vec3,
    pub end: Vec3,
    pub distance: Meters,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TapOutcome {
    /// No feature point under the tap; nothing changed.
    Missed,
    StartPlaced(Vec3),
    Measured(Measurement),
    Cleared,
}

/// Measurement state for one screen session.
#[derive(Debug)]
pub struct MeasurementSession<H> {
    state: MeasurementState<H>,
}

impl<H> Default for MeasurementSession<H> {
    fn default() -> Self {
        Self {
            state: MeasurementState::Empty,
        }
    }
}

impl<H: Copy> MeasurementSession<H> {
    pub fn state(&self) -> &MeasurementState<H> {
        &self.state
    }

    pub fn phase(&self) -> MeasurementPhase {
        match self.state {
            MeasurementState::Empty => MeasurementPhase::Empty,
            MeasurementState::OnePointPlaced { .. } => MeasurementPhase::OnePointPlaced,
            MeasurementState::Complete { .. } => MeasurementPhase::Complete,
        }
    }

    /// The completed measurement, if both points are placed.
    pub fn measurement(&self) -> Option<Measurement> {
        match self.state {
            MeasurementState::Complete { start, end, .. } => Some(Measurement {
                start: start.position,
                end: end.position,
                distance: Meters(distance(start.position, end.position)),
            }),
            _ => None,
        }
    }

    /// Advance the measurement cycle for one tap.
    ///
    /// A tap that finds no feature point is ignored in every phase.
    pub fn handle_tap<T, S>(&mut self, screen_point: Vec2, tracker: &T, scene: &mut S) -> TapOutcome
    where
        T: HitTester + ?Sized,
        S: SceneGraph<Handle = H> + ?Sized,
    {
        let Some(position) = tracker.hit_test_feature_point(screen_point) else {
            return TapOutcome::Missed;
        };

        match self.state {
            MeasurementState::Empty => {
                let handle = scene.add_node(SceneNode::Marker {
                    position,
                    role: MarkerRole::Start,
                });
                self.state = MeasurementState::OnePointPlaced {
                    start: PlacedMarker { handle, position },
                };
                TapOutcome::StartPlaced(position)
            }
            MeasurementState::OnePointPlaced { start } => {
                let end_handle = scene.add_node(SceneNode::Marker {
                    position,
                    role: MarkerRole::End,
                });
                let segment = scene.add_node(SceneNode::Segment(line_segment(
                    start.position,
                    position,
                )));
                let end = PlacedMarker {
                    handle: end_handle,
                    position,
                };
                self.state = MeasurementState::Complete {
                    start,
                    end,
                    segment,
                };
                TapOutcome::Measured(Measurement {
                    start: start.position,
                    end: position,
                    distance: Meters(distance(start.position, position)),
                })
            }
            MeasurementState::Complete {
                start,
                end,
                segment,
            } => {
                scene.remove_node(start.handle);
                scene.remove_node(end.handle);
                scene.remove_node(segment);
                self.state = MeasurementState::Empty;
                TapOutcome::Cleared
            }
        }
    }
}

// =============================================================================
// Bevy wiring
// =============================================================================

/// The active session, keyed by scene entities.
#[derive(Resource, Default)]
pub struct ActiveMeasurement {
    pub session: MeasurementSession<Entity>,
}

/// Emitted once per completed measurement.
#[derive(Message, Debug, Clone, Copy)]
pub struct MeasurementCompleted(pub Measurement);

/// Marker component for entities the measurement tool spawned.
#[derive(Component)]
pub struct MeasurementNode;

/// `SceneGraph` over Bevy commands and asset stores.
pub struct BevyScene<'a, 'w, 's> {
    pub commands: &'a mut Commands<'w, 's>,
    pub meshes: &'a mut Assets<Mesh>,
    pub materials: &'a mut Assets<StandardMaterial>,
    pub theme: &'a AppTheme,
    pub marker_radius: f32,
}

impl SceneGraph for BevyScene<'_, '_, '_> {
    type Handle = Entity;

    fn add_node(&mut self, node: SceneNode) -> Entity {
        match node {
            SceneNode::Marker { position, role } => {
                let color = match role {
                    MarkerRole::Start => self.theme.start_marker(),
                    MarkerRole::End => self.theme.end_marker(),
                };
                self.commands
                    .spawn((
                        Name::new(format!("{:?} Marker", role)),
                        MeasurementNode,
                        Mesh3d(self.meshes.add(marker_mesh(self.marker_radius))),
                        MeshMaterial3d(self.materials.add(StandardMaterial {
                            base_color: color,
                            ..default()
                        })),
                        Transform::from_translation(position),
                    ))
                    .id()
            }
            SceneNode::Segment(mesh) => self
                .commands
                .spawn((
                    Name::new("Measurement Line"),
                    MeasurementNode,
                    Mesh3d(self.meshes.add(mesh)),
                    MeshMaterial3d(self.materials.add(StandardMaterial {
                        base_color: self.theme.segment(),
                        unlit: true,
                        ..default()
                    })),
                    Transform::default(),
                ))
                .id(),
        }
    }

    fn remove_node(&mut self, handle: Entity) {
        self.commands.entity(handle).despawn();
    }
}

/// Screen positions of this frame's discrete taps: new touches, plus a left
/// click at the cursor on desktop.
fn collect_taps(touches: &Touches, mouse_button: &ButtonInput<MouseButton>, window: &Window) -> Vec<Vec2> {
    let mut taps: Vec<Vec2> = touches.iter_just_pressed().map(|t| t.position()).collect();
    if mouse_button.just_pressed(MouseButton::Left) {
        if let Some(cursor) = window.cursor_position() {
            taps.push(cursor);
        }
    }
    taps
}

/// Feed taps on the AR view into the measurement session.
pub fn handle_measurement_taps(
    mut active: ResMut<ActiveMeasurement>,
    touches: Res<Touches>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    window_query: Query<&Window>,
    camera_query: Query<(&Camera, &GlobalTransform), With<ArCamera>>,
    feature_points: Res<FeaturePoints>,
    tracking: Res<TrackingSession>,
    hit_test_config: Res<HitTestConfig>,
    config: Res<RulerConfig>,
    theme: Res<AppTheme>,
    mut completed: MessageWriter<MeasurementCompleted>,
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut contexts: EguiContexts,
) {
    // Taps on HUD panels belong to egui
    if let Ok(ctx) = contexts.ctx_mut() {
        if ctx.wants_pointer_input() {
            return;
        }
    }

    let Ok(window) = window_query.single() else {
        return;
    };
    let taps = collect_taps(&touches, &mouse_button, window);
    if taps.is_empty() {
        return;
    }

    let Ok((camera, camera_transform)) = camera_query.single() else {
        return;
    };

    let tracker = CameraHitTester {
        camera,
        camera_transform,
        feature_points: &*feature_points,
        session: &*tracking,
        config: &*hit_test_config,
    };
    let mut scene = BevyScene {
        commands: &mut commands,
        meshes: &mut *meshes,
        materials: &mut *materials,
        theme: &*theme,
        marker_radius: config.markers.radius,
    };

    apply_taps(&mut active, &taps, &tracker, &mut scene, &mut completed);
}

/// Run each tap through the session, logging the outcome and writing one
/// `MeasurementCompleted` per finished pair.
pub fn apply_taps<T, S>(
    active: &mut ActiveMeasurement,
    taps: &[Vec2],
    tracker: &T,
    scene: &mut S,
    completed: &mut MessageWriter<MeasurementCompleted>,
) where
    T: HitTester + ?Sized,
    S: SceneGraph<Handle = Entity> + ?Sized,
{
    for &tap in taps {
        match active.session.handle_tap(tap, tracker, scene) {
            TapOutcome::Missed => {
                debug!("No feature point under tap at {:.0}, {:.0}", tap.x, tap.y);
            }
            TapOutcome::StartPlaced(start) => {
                info!("Measurement start: {:.3}, {:.3}, {:.3}", start.x, start.y, start.z);
            }
            TapOutcome::Measured(measurement) => {
                let end = measurement.end;
                info!("Measurement end: {:.3}, {:.3}, {:.3}", end.x, end.y, end.z);
                info!("Distance: {}", measurement.distance);
                completed.write(MeasurementCompleted(measurement));
            }
            TapOutcome::Cleared => {
                info!("Measurement cleared");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::mesh::{Indices, VertexAttributeValues};
    use std::collections::HashMap;

    /// Returns the scripted hit for the next tap; `None` entries are misses.
    struct ScriptedTracker {
        hits: std::cell::RefCell<std::collections::VecDeque<Option<Vec3>>>,
    }

    impl ScriptedTracker {
        fn new(hits: impl IntoIterator<Item = Option<Vec3>>) -> Self {
            Self {
                hits: std::cell::RefCell::new(hits.into_iter().collect()),
            }
        }
    }

    impl HitTester for ScriptedTracker {
        fn hit_test_feature_point(&self, _screen_point: Vec2) -> Option<Vec3> {
            self.hits.borrow_mut().pop_front().flatten()
        }
    }

    struct FixedTracker(Option<Vec3>);

    impl HitTester for FixedTracker {
        fn hit_test_feature_point(&self, _screen_point: Vec2) -> Option<Vec3> {
            self.0
        }
    }

    #[derive(Default)]
    struct RecordingScene {
        next: u32,
        nodes: HashMap<u32, SceneNode>,
        removed: Vec<u32>,
    }

    impl RecordingScene {
        fn markers(&self) -> Vec<(Vec3, MarkerRole)> {
            let mut markers: Vec<_> = self
                .nodes
                .values()
                .filter_map(|n| match n {
                    SceneNode::Marker { position, role } => Some((*position, *role)),
                    SceneNode::Segment(_) => None,
                })
                .collect();
            markers.sort_by_key(|(_, role)| *role == MarkerRole::End);
            markers
        }

        fn segments(&self) -> Vec<&Mesh> {
            self.nodes
                .values()
                .filter_map(|n| match n {
                    SceneNode::Segment(mesh) => Some(mesh),
                    SceneNode::Marker { .. } => None,
                })
                .collect()
        }
    }

    impl SceneGraph for RecordingScene {
        type Handle = u32;

        fn add_node(&mut self, node: SceneNode) -> u32 {
            let id = self.next;
            self.next += 1;
            self.nodes.insert(id, node);
            id
        }

        fn remove_node(&mut self, handle: u32) {
            assert!(self.nodes.remove(&handle).is_some(), "removed unknown node {handle}");
            self.removed.push(handle);
        }
    }

    fn tap(session: &mut MeasurementSession<u32>, hit: Option<Vec3>, scene: &mut RecordingScene) -> TapOutcome {
        session.handle_tap(Vec2::new(100.0, 200.0), &FixedTracker(hit), scene)
    }

    #[test]
    fn first_hit_places_start_marker() {
        let mut session = MeasurementSession::default();
        let mut scene = RecordingScene::default();

        let outcome = tap(&mut session, Some(Vec3::ZERO), &mut scene);

        assert_eq!(outcome, TapOutcome::StartPlaced(Vec3::ZERO));
        assert_eq!(session.phase(), MeasurementPhase::OnePointPlaced);
        assert_eq!(scene.markers(), vec![(Vec3::ZERO, MarkerRole::Start)]);
        assert!(scene.segments().is_empty());
    }

    #[test]
    fn second_hit_completes_measurement() {
        let mut session = MeasurementSession::default();
        let mut scene = RecordingScene::default();

        tap(&mut session, Some(Vec3::ZERO), &mut scene);
        let outcome = tap(&mut session, Some(Vec3::X), &mut scene);

        let TapOutcome::Measured(measurement) = outcome else {
            panic!("expected a measurement, got {:?}", outcome);
        };
        assert_eq!(measurement.distance, Meters(1.0));
        assert_eq!(measurement.start, Vec3::ZERO);
        assert_eq!(measurement.end, Vec3::X);
        assert_eq!(session.phase(), MeasurementPhase::Complete);
        assert_eq!(session.measurement(), Some(measurement));
        assert_eq!(
            scene.markers(),
            vec![(Vec3::ZERO, MarkerRole::Start), (Vec3::X, MarkerRole::End)]
        );
        assert_eq!(scene.segments().len(), 1);
    }

    #[test]
    fn segment_connects_start_to_end() {
        let mut session = MeasurementSession::default();
        let mut scene = RecordingScene::default();
        let a = Vec3::new(0.1, 0.0, -0.5);
        let b = Vec3::new(0.4, 0.0, -0.9);

        tap(&mut session, Some(a), &mut scene);
        tap(&mut session, Some(b), &mut scene);

        let segment = scene.segments()[0];
        let Some(VertexAttributeValues::Float32x3(positions)) =
            segment.attribute(Mesh::ATTRIBUTE_POSITION)
        else {
            panic!("segment has no positions");
        };
        assert_eq!(positions, &vec![a.to_array(), b.to_array()]);
        assert!(matches!(segment.indices(), Some(Indices::U32(i)) if i == &vec![0, 1]));
    }

    #[test]
    fn third_hit_clears_scene() {
        let mut session = MeasurementSession::default();
        let mut scene = RecordingScene::default();

        tap(&mut session, Some(Vec3::ZERO), &mut scene);
        tap(&mut session, Some(Vec3::X), &mut scene);
        let outcome = tap(&mut session, Some(Vec3::new(5.0, 5.0, 5.0)), &mut scene);

        assert_eq!(outcome, TapOutcome::Cleared);
        assert_eq!(session.phase(), MeasurementPhase::Empty);
        assert!(scene.nodes.is_empty());
        assert_eq!(scene.removed.len(), 3);
        assert_eq!(session.measurement(), None);
    }

    #[test]
    fn miss_when_empty_is_a_no_op() {
        let mut session = MeasurementSession::default();
        let mut scene = RecordingScene::default();

        assert_eq!(tap(&mut session, None, &mut scene), TapOutcome::Missed);
        assert_eq!(session.phase(), MeasurementPhase::Empty);
        assert!(scene.nodes.is_empty());
    }

    #[test]
    fn miss_leaves_every_phase_unchanged() {
        let mut session = MeasurementSession::default();
        let mut scene = RecordingScene::default();
        let hits = [Some(Vec3::ZERO), Some(Vec3::Y)];

        for hit in hits.iter().copied().chain([Some(Vec3::Z)]) {
            let before = *session.state();
            let nodes_before = scene.nodes.len();
            let removed_before = scene.removed.len();

            assert_eq!(tap(&mut session, None, &mut scene), TapOutcome::Missed);
            assert_eq!(*session.state(), before);
            assert_eq!(scene.nodes.len(), nodes_before);
            assert_eq!(scene.removed.len(), removed_before);

            tap(&mut session, hit, &mut scene);
        }
    }

    #[test]
    fn hits_cycle_every_three_taps() {
        let mut session = MeasurementSession::default();
        let mut scene = RecordingScene::default();
        let expected = [
            MeasurementPhase::OnePointPlaced,
            MeasurementPhase::Complete,
            MeasurementPhase::Empty,
        ];

        for i in 0..9 {
            let hit = Vec3::new(i as f32, 0.0, 0.0);
            tap(&mut session, Some(hit), &mut scene);
            assert_eq!(session.phase(), expected[i % 3]);
            assert!(scene.markers().len() <= 2);
            assert_eq!(
                scene.segments().len() == 1,
                session.phase() == MeasurementPhase::Complete
            );
        }
        assert!(scene.nodes.is_empty());
    }

    #[test]
    fn interleaved_misses_do_not_shift_the_cycle() {
        let tracker = ScriptedTracker::new([
            None,
            Some(Vec3::ZERO),
            None,
            None,
            Some(Vec3::new(3.0, 4.0, 0.0)),
        ]);
        let mut session = MeasurementSession::default();
        let mut scene = RecordingScene::default();

        let outcomes: Vec<_> = (0..5)
            .map(|_| session.handle_tap(Vec2::ZERO, &tracker, &mut scene))
            .collect();

        assert_eq!(outcomes[0], TapOutcome::Missed);
        assert_eq!(outcomes[1], TapOutcome::StartPlaced(Vec3::ZERO));
        assert_eq!(outcomes[2], TapOutcome::Missed);
        assert_eq!(outcomes[3], TapOutcome::Missed);
        match outcomes[4] {
            TapOutcome::Measured(m) => assert!((m.distance.0 - 5.0).abs() < 1e-6),
            other => panic!("expected a measurement, got {:?}", other),
        }
    }

    #[test]
    fn complete_state_never_holds_segment_without_markers() {
        let mut session = MeasurementSession::<u32>::default();
        let mut scene = RecordingScene::default();
        tap(&mut session, Some(Vec3::ZERO), &mut scene);
        tap(&mut session, Some(Vec3::ONE), &mut scene);

        let MeasurementState::Complete { start, end, segment } = *session.state() else {
            panic!("expected Complete");
        };
        assert!(scene.nodes.contains_key(&start.handle));
        assert!(scene.nodes.contains_key(&end.handle));
        assert!(scene.nodes.contains_key(&segment));
    }

    // -------------------------------------------------------------------------
    // Bevy scene adapter, driven through a headless App
    // -------------------------------------------------------------------------

    /// Hit for the next frame's single tap; `None` is a miss.
    #[derive(Resource, Default)]
    struct NextHit(Option<Option<Vec3>>);

    #[derive(Resource, Default)]
    struct ReportedMeasurements(Vec<Measurement>);

    fn drive_tap(
        mut active: ResMut<ActiveMeasurement>,
        mut next: ResMut<NextHit>,
        theme: Res<AppTheme>,
        mut completed: MessageWriter<MeasurementCompleted>,
        mut commands: Commands,
        mut meshes: ResMut<Assets<Mesh>>,
        mut materials: ResMut<Assets<StandardMaterial>>,
    ) {
        let Some(hit) = next.0.take() else {
            return;
        };
        let mut scene = BevyScene {
            commands: &mut commands,
            meshes: &mut *meshes,
            materials: &mut *materials,
            theme: &*theme,
            marker_radius: 0.005,
        };
        apply_taps(&mut active, &[Vec2::ZERO], &FixedTracker(hit), &mut scene, &mut completed);
    }

    fn collect_reports(
        mut reader: MessageReader<MeasurementCompleted>,
        mut reported: ResMut<ReportedMeasurements>,
    ) {
        reported.0.extend(reader.read().map(|m| m.0));
    }

    fn tap_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .init_resource::<Assets<Mesh>>()
            .init_resource::<Assets<StandardMaterial>>()
            .init_resource::<AppTheme>()
            .init_resource::<ActiveMeasurement>()
            .init_resource::<NextHit>()
            .init_resource::<ReportedMeasurements>()
            .add_message::<MeasurementCompleted>()
            .add_systems(Update, (drive_tap, collect_reports.after(drive_tap)));
        app
    }

    fn tap_once(app: &mut App, hit: Option<Vec3>) {
        app.world_mut().resource_mut::<NextHit>().0 = Some(hit);
        app.update();
    }

    fn node_count(app: &mut App) -> usize {
        let world = app.world_mut();
        let mut query = world.query_filtered::<(), With<MeasurementNode>>();
        query.iter(world).count()
    }

    #[test]
    fn bevy_scene_spawns_and_despawns_measurement_entities() {
        let mut app = tap_app();

        tap_once(&mut app, Some(Vec3::ZERO));
        assert_eq!(node_count(&mut app), 1);

        tap_once(&mut app, Some(Vec3::X));
        assert_eq!(node_count(&mut app), 3);

        tap_once(&mut app, Some(Vec3::Y));
        assert_eq!(node_count(&mut app), 0);
        assert_eq!(
            app.world().resource::<ActiveMeasurement>().session.phase(),
            MeasurementPhase::Empty
        );
    }

    #[test]
    fn bevy_scene_places_markers_at_hit_positions() {
        let mut app = tap_app();
        let start = Vec3::new(0.2, 0.75, -0.5);
        tap_once(&mut app, Some(start));

        let world = app.world_mut();
        let mut query = world.query_filtered::<&Transform, With<MeasurementNode>>();
        let translations: Vec<Vec3> = query.iter(world).map(|t| t.translation).collect();
        assert_eq!(translations, vec![start]);
    }

    #[test]
    fn one_completed_message_per_pair() {
        let mut app = tap_app();

        tap_once(&mut app, Some(Vec3::ZERO));
        tap_once(&mut app, None);
        tap_once(&mut app, Some(Vec3::X));
        tap_once(&mut app, Some(Vec3::Z));

        let reported = &app.world().resource::<ReportedMeasurements>().0;
        assert_eq!(reported.len(), 1);
        assert_eq!(reported[0].distance, Meters(1.0));
        assert_eq!(reported[0].start, Vec3::ZERO);
        assert_eq!(reported[0].end, Vec3::X);
    }

    #[test]
    fn miss_spawns_nothing_and_reports_nothing() {
        let mut app = tap_app();
        tap_once(&mut app, None);

        assert_eq!(node_count(&mut app), 0);
        assert!(app.world().resource::<ReportedMeasurements>().0.is_empty());
    }
}
