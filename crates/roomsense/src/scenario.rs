//! Scenario definition, RON loading and execution
//!
//! A scenario is a scene plus an ordered list of queries. Queries run
//! against one controller in order, so actions (translate, rotate,
//! teleport) change the agent pose seen by later queries.

use anyhow::{Context, Result};
use glam::Vec3;
use roomsense_core::world::SceneDescription;
use roomsense_core::{ActionPayload, ActionResult, AgentController, EngineConfig, Pose, Stance};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Where the scene of a scenario comes from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SceneSource {
    /// RON scene file, relative to the scenario file
    File(PathBuf),
    Inline(SceneDescription),
    /// Empty walled room centred on the origin
    Room {
        width: f32,
        depth: f32,
        wall_height: f32,
    },
}

/// One query against the scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Query {
    Reachable {
        #[serde(default)]
        grid_size: Option<f32>,
    },
    Visible {
        object: String,
        #[serde(default)]
        max_distance: Option<f32>,
    },
    VisibleFrom {
        object: String,
    },
    /// Translate along a world direction
    Translate {
        direction: Vec3,
        magnitude: f32,
    },
    Rotate {
        degrees: f32,
    },
    Teleport {
        position: Vec3,
        #[serde(default)]
        yaw: f32,
        #[serde(default)]
        stance: Stance,
        #[serde(default)]
        force: bool,
    },
    Pickup {
        object: String,
    },
    /// Move the held object's origin to a world position
    MoveHand {
        target: Vec3,
    },
}

/// A query plus the optional outcome it must produce
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioStep {
    pub query: Query,
    /// Expected success (for visibility: expected visible)
    #[serde(default)]
    pub expect: Option<bool>,
}

/// Top-level scenario definition loaded from RON files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,

    #[serde(default)]
    pub description: String,

    pub scene: SceneSource,

    pub steps: Vec<ScenarioStep>,
}

impl Scenario {
    /// Load scenario from RON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario file: {}", path.display()))?;

        let scenario = ron::from_str(&content)
            .with_context(|| format!("Failed to parse RON scenario: {}", path.display()))?;

        Ok(scenario)
    }

    /// Resolve the scene, reading files relative to `base_dir`
    pub fn scene(&self, base_dir: &Path, config: &EngineConfig) -> Result<SceneDescription> {
        match &self.scene {
            SceneSource::File(path) => load_scene(base_dir.join(path)),
            SceneSource::Inline(description) => Ok(description.clone()),
            SceneSource::Room {
                width,
                depth,
                wall_height,
            } => Ok(SceneDescription::walled_room(
                *width,
                *depth,
                *wall_height,
                config,
            )),
        }
    }
}

/// Load a scene description from a RON file
pub fn load_scene(path: impl AsRef<Path>) -> Result<SceneDescription> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read scene file: {}", path.display()))?;

    SceneDescription::from_ron_str(&content)
        .with_context(|| format!("Failed to parse RON scene: {}", path.display()))
}

/// Result of one query
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub query: Query,
    pub success: bool,
    /// Human-readable result line
    pub detail: String,
    /// `None` when the step had no expectation
    pub matched: Option<bool>,
}

impl fmt::Display for QueryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = match self.matched {
            Some(true) => "PASS",
            Some(false) => "FAIL",
            None => "----",
        };
        write!(f, "[{}] {:?}: {}", marker, self.query, self.detail)
    }
}

/// Report from scenario execution
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub scenario_name: String,
    pub outcomes: Vec<QueryOutcome>,
}

impl ScenarioReport {
    /// No step contradicted its expectation
    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(|o| o.matched != Some(false))
    }

    pub fn failed_steps(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.matched == Some(false))
            .count()
    }
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Scenario: {}", self.scenario_name)?;
        for outcome in &self.outcomes {
            writeln!(f, "  {}", outcome)?;
        }
        write!(
            f,
            "{} steps, {} failed",
            self.outcomes.len(),
            self.failed_steps()
        )
    }
}

/// Executes queries against a controller
pub struct ScenarioRunner {
    controller: AgentController,
    /// Cap on positions listed in reachability details
    max_listed: usize,
}

impl ScenarioRunner {
    pub fn new(description: &SceneDescription, config: EngineConfig) -> Result<Self> {
        let controller = AgentController::from_description(description, config)
            .context("Failed to build scene")?;
        Ok(Self {
            controller,
            max_listed: 0,
        })
    }

    /// List up to `max_listed` positions in reachability details
    pub fn with_listing(mut self, max_listed: usize) -> Self {
        self.max_listed = max_listed;
        self
    }

    pub fn controller(&self) -> &AgentController {
        &self.controller
    }

    /// Execute a complete scenario
    pub fn run_scenario(&mut self, scenario: &Scenario) -> Result<ScenarioReport> {
        log::info!("Starting scenario: {}", scenario.name);
        if !scenario.description.is_empty() {
            log::info!("Description: {}", scenario.description);
        }

        let mut outcomes = Vec::with_capacity(scenario.steps.len());
        for (idx, step) in scenario.steps.iter().enumerate() {
            let mut outcome = self
                .run_query(&step.query)
                .with_context(|| format!("Step {} failed to evaluate", idx))?;
            outcome.matched = step.expect.map(|expected| expected == outcome.success);
            if outcome.matched == Some(false) {
                log::warn!("Step {} did not match its expectation: {}", idx, outcome);
            }
            outcomes.push(outcome);
        }

        Ok(ScenarioReport {
            scenario_name: scenario.name.clone(),
            outcomes,
        })
    }

    /// Evaluate one query. Rejected actions are outcomes, not errors; only
    /// unknown objects and similar configuration problems fail.
    pub fn run_query(&mut self, query: &Query) -> Result<QueryOutcome> {
        let (success, detail) = match query {
            Query::Reachable { grid_size } => {
                let grid = grid_size.unwrap_or(self.controller.config().reachability.grid_size);
                let origin = self.controller.pose().position;
                let set = self.controller.compute_reachable(origin, grid);
                let mut detail = format!("{} reachable positions", set.len());
                if let Some(reason) = set.soft_failure() {
                    detail.push_str(&format!(" (partial: {})", reason));
                }
                for position in set.positions().iter().take(self.max_listed) {
                    detail.push_str(&format!(
                        "\n    ({:.2}, {:.2}, {:.2})",
                        position.x, position.y, position.z
                    ));
                }
                (set.soft_failure().is_none(), detail)
            }
            Query::Visible {
                object,
                max_distance,
            } => {
                let id = self.controller.object_named(object)?;
                let max = max_distance.unwrap_or(self.controller.config().visibility.view_distance);
                let visibility = self.controller.is_visible(id, max)?;
                let detail = format!(
                    "visible={} interactable={} points={:?}",
                    visibility.visible, visibility.interactable, visibility.visible_points
                );
                (visibility.visible, detail)
            }
            Query::VisibleFrom { object } => {
                let id = self.controller.object_named(object)?;
                let found = self.controller.positions_from_which_visible(id)?;
                let mut detail = format!("visible from {} poses", found.len());
                for entry in found.iter().take(self.max_listed) {
                    detail.push_str(&format!(
                        "\n    ({:.2}, {:.2}) yaw {} {:?}",
                        entry.position.x, entry.position.z, entry.yaw, entry.stance
                    ));
                }
                (!found.is_empty(), detail)
            }
            Query::Translate {
                direction,
                magnitude,
            } => action_outcome(self.controller.try_translate(*direction, *magnitude)),
            Query::Rotate { degrees } => action_outcome(self.controller.try_rotate(*degrees)),
            Query::Teleport {
                position,
                yaw,
                stance,
                force,
            } => {
                let pose = Pose::new(*position, *yaw).with_stance(*stance);
                action_outcome(self.controller.try_teleport(pose, *force))
            }
            Query::Pickup { object } => {
                let id = self.controller.object_named(object)?;
                action_outcome(self.controller.pickup(id))
            }
            Query::MoveHand { target } => action_outcome(self.controller.try_move_hand(*target)),
        };

        log::debug!("{:?} -> success={}", query, success);
        Ok(QueryOutcome {
            query: query.clone(),
            success,
            detail,
            matched: None,
        })
    }
}

fn action_outcome(result: ActionResult) -> (bool, String) {
    let detail = match (&result.failure, &result.payload) {
        (Some(reason), _) => format!("rejected: {}", reason),
        (None, Some(ActionPayload::Pose(pose))) => format!(
            "agent at ({:.2}, {:.2}, {:.2}) yaw {}",
            pose.position.x, pose.position.y, pose.position.z, pose.yaw
        ),
        (None, Some(ActionPayload::HeldLocal(local))) => format!(
            "holding at ({:.2}, {:.2}, {:.2}) in the agent frame",
            local.translation.x, local.translation.y, local.translation.z
        ),
        (None, _) => "ok".to_string(),
    };
    (result.success, detail)
}
