//! Property-based tests for reachability and visibility
//!
//! Uses `proptest` to check flood-fill invariants over randomly furnished
//! rooms: results are deterministic, every reported cell can be walked to
//! one grid step at a time, and view distance is a strict bound.

use proptest::prelude::*;

use glam::Vec3;
use roomsense_core::math::Transform;
use roomsense_core::navigation::grid::step_direction;
use roomsense_core::world::description::standing_height;
use roomsense_core::world::SceneDescription;
use roomsense_core::{
    AgentController, EngineConfig, MotionValidator, ObjectSpec, ReachabilityExplorer, Scene, Shape,
};

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

/// Floor-standing crates kept clear of the agent start at the room centre
fn arb_crates() -> impl Strategy<Value = Vec<(f32, f32, f32)>> {
    prop::collection::vec(
        (-1.2..1.2f32, -1.2..1.2f32, 0.05..0.3f32)
            .prop_filter("clear of the start", |(x, z, half)| {
                x.abs() > half + 0.3 || z.abs() > half + 0.3
            }),
        0..4,
    )
}

fn furnished_room(crates: &[(f32, f32, f32)], config: &EngineConfig) -> Scene {
    let mut scene = SceneDescription::walled_room(3.0, 3.0, 2.0, config)
        .build(config)
        .unwrap();
    for (x, z, half) in crates {
        scene
            .add_structure(
                Shape::cuboid(Vec3::new(*half, 0.4, *half)),
                Transform::from_translation(Vec3::new(*x, 0.4, *z)),
            )
            .unwrap();
    }
    scene
}

// ---------------------------------------------------------------------------
// Property: flood fill is deterministic
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn reachability_is_deterministic(crates in arb_crates()) {
        let config = EngineConfig::default();
        let scene = furnished_room(&crates, &config);
        let validator = MotionValidator::new(config.clone());
        let explorer = ReachabilityExplorer::new(config.reachability.clone());
        let origin = scene.agent_pose().position;

        let first = explorer.explore(&scene, &validator, origin, 0.25);
        let second = explorer.explore(&scene, &validator, origin, 0.25);
        prop_assert_eq!(first.cells(), second.cells());
        prop_assert_eq!(first.iterations(), second.iterations());
    }
}

// ---------------------------------------------------------------------------
// Property: every reachable cell is reachable by validated single steps
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn reachable_cells_replay_as_valid_moves(crates in arb_crates()) {
        let config = EngineConfig::default();
        let scene = furnished_room(&crates, &config);
        let validator = MotionValidator::new(config.clone());
        let explorer = ReachabilityExplorer::new(config.reachability.clone());
        let start = *scene.agent_pose();
        let set = explorer.explore(&scene, &validator, start.position, 0.25);

        for cell in set.iter() {
            let path = set.path_to(cell).unwrap();
            for step in path.windows(2) {
                let from = start.with_position(set.position(&step[0]));
                let direction = step_direction(step[1].x - step[0].x, step[1].z - step[0].z);
                let result = validator.can_translate_from(&scene, &from, direction, 0.25, &[]);
                prop_assert!(result.success, "{:?} -> {:?}: {:?}", step[0], step[1], result.failure);
            }
            prop_assert!(scene.bounds().contains(set.position(cell)));
        }
    }
}

// ---------------------------------------------------------------------------
// Property: planar view distance is strict
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn visible_only_strictly_inside_view_distance(
        distance in 0.4..1.4f32,
        max_distance in 0.4..1.45f32,
    ) {
        let config = EngineConfig::default();
        let eye = standing_height(&config) + config.agent.standing_camera_offset;
        let description = SceneDescription::walled_room(4.0, 4.0, 2.0, &config);
        let mut controller = AgentController::from_description(&description, config).unwrap();
        let target = controller
            .scene_mut()
            .add_object(ObjectSpec::boxed(
                "target",
                Vec3::new(0.0, eye, distance),
                Vec3::splat(0.05),
            ))
            .unwrap();

        let visible = controller.is_visible(target, max_distance).unwrap().visible;
        prop_assert_eq!(visible, distance < max_distance);
    }
}
