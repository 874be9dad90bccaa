//! Integration tests for the bundled scene and scenario files
//!
//! These load the RON files under `scenes/` at the workspace root, so a
//! broken sample fails here rather than on the command line.

use std::path::PathBuf;

use roomsense::scenario::load_scene;
use roomsense::{AppConfig, Scenario, ScenarioRunner};

fn scenes_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../scenes")
}

// ============================================================================
// Scene files
// ============================================================================

#[test]
fn test_kitchen_scene_builds() {
    let description = load_scene(scenes_dir().join("kitchen.ron")).unwrap();
    assert_eq!(description.objects.len(), 4);

    let config = AppConfig::default();
    let runner = ScenarioRunner::new(&description, config.engine).unwrap();
    let scene = runner.controller().scene();
    assert!(scene.object_by_name("Mug").is_some());
    assert!(scene.object_by_name("Partition").unwrap().is_see_through());
}

// ============================================================================
// Scenario files
// ============================================================================

#[test]
fn test_kitchen_tour_passes() {
    let path = scenes_dir().join("kitchen_tour.ron");
    let scenario = Scenario::from_file(&path).unwrap();
    let config = AppConfig::default();
    let description = scenario.scene(&scenes_dir(), &config.engine).unwrap();

    let mut runner = ScenarioRunner::new(&description, config.engine).unwrap();
    let report = runner.run_scenario(&scenario).unwrap();
    assert_eq!(report.outcomes.len(), 7);
    assert!(report.passed(), "{}", report);
}
