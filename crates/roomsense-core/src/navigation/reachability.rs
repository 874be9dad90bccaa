//! Breadth-first flood fill of the positions the agent can reach
//!
//! Cells are explored in FIFO order over the 4-connected grid. A step is
//! accepted when the agent (and held object) sweep is clear, the destination
//! lies in the scene bounds, has floor below it and, with a held object,
//! leaves room for that object at one of the cardinal headings.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use glam::Vec3;
use rapier3d::prelude::ColliderHandle;

use super::grid::{DIRECTIONS, GridCell, step_direction};
use crate::config::ReachabilityConfig;
use crate::entity::{Pose, Stance};
use crate::error::{Result, SceneError};
use crate::math::Transform;
use crate::motion::{FailureReason, MotionValidator};
use crate::world::{ColliderCategory, CollisionOracle, ObjectId, QueryMask, Scene};

/// Headings tried for held-object fit and visibility sampling
pub const CARDINAL_YAWS: [f32; 4] = [0.0, 90.0, 180.0, 270.0];

/// Non-fatal events recorded during exploration
#[derive(Debug, Clone, PartialEq)]
pub enum ExploreDiagnostic {
    /// The iteration cap stopped the search early
    SafetyCapExceeded { iterations: usize },
    /// A cell passed the sweep but lies outside the scene bounds
    OutOfBounds { cell: GridCell, position: Vec3 },
}

/// Cells reachable from an origin, with the BFS tree that found them
#[derive(Debug, Clone, PartialEq)]
pub struct ReachableSet {
    origin: Vec3,
    grid_size: f32,
    cells: BTreeSet<GridCell>,
    parents: BTreeMap<GridCell, GridCell>,
    iterations: usize,
    diagnostics: Vec<ExploreDiagnostic>,
}

impl ReachableSet {
    fn seeded(origin: Vec3, grid_size: f32) -> Self {
        Self {
            origin,
            grid_size,
            cells: BTreeSet::from([GridCell::ORIGIN]),
            parents: BTreeMap::new(),
            iterations: 0,
            diagnostics: Vec::new(),
        }
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn grid_size(&self) -> f32 {
        self.grid_size
    }

    pub fn cells(&self) -> &BTreeSet<GridCell> {
        &self.cells
    }

    pub fn contains(&self, cell: &GridCell) -> bool {
        self.cells.contains(cell)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GridCell> {
        self.cells.iter()
    }

    pub fn position(&self, cell: &GridCell) -> Vec3 {
        cell.world_position(self.origin, self.grid_size)
    }

    pub fn positions(&self) -> Vec<Vec3> {
        self.cells.iter().map(|cell| self.position(cell)).collect()
    }

    /// Cells from the origin to `cell` along the BFS tree
    pub fn path_to(&self, cell: &GridCell) -> Option<Vec<GridCell>> {
        if !self.cells.contains(cell) {
            return None;
        }
        let mut path = vec![*cell];
        let mut current = *cell;
        while let Some(parent) = self.parents.get(&current) {
            path.push(*parent);
            current = *parent;
        }
        path.reverse();
        Some(path)
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn diagnostics(&self) -> &[ExploreDiagnostic] {
        &self.diagnostics
    }

    /// `SafetyCapExceeded` if the search was cut short
    pub fn soft_failure(&self) -> Option<FailureReason> {
        self.diagnostics.iter().find_map(|d| match d {
            ExploreDiagnostic::SafetyCapExceeded { iterations } => {
                Some(FailureReason::SafetyCapExceeded {
                    iterations: *iterations,
                })
            }
            ExploreDiagnostic::OutOfBounds { .. } => None,
        })
    }
}

/// A pose on a reachable cell from which an object is visible
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleFrom {
    pub cell: GridCell,
    pub position: Vec3,
    pub yaw: f32,
    pub stance: Stance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    revision: u64,
    origin: [u32; 3],
    grid_size: u32,
    yaw: u32,
    held: Option<ObjectId>,
}

impl CacheKey {
    fn new(scene: &Scene, origin: Vec3, grid_size: f32) -> Self {
        Self {
            revision: scene.revision(),
            origin: origin.to_array().map(f32::to_bits),
            grid_size: grid_size.to_bits(),
            yaw: scene.agent_pose().yaw.to_bits(),
            held: scene.agent().held_object(),
        }
    }
}

pub struct ReachabilityExplorer {
    config: ReachabilityConfig,
    /// Most recent result only; older origins are recomputed on demand
    cache: Option<(CacheKey, ReachableSet)>,
}

impl ReachabilityExplorer {
    pub fn new(config: ReachabilityConfig) -> Self {
        Self {
            config,
            cache: None,
        }
    }

    pub fn config(&self) -> &ReachabilityConfig {
        &self.config
    }

    /// Reachable cells, reusing a cached result while the scene is unchanged
    pub fn compute_reachable(
        &mut self,
        scene: &Scene,
        validator: &MotionValidator,
        origin: Vec3,
        grid_size: f32,
    ) -> ReachableSet {
        let key = CacheKey::new(scene, origin, grid_size);
        if let Some((_, cached)) = self.cache.as_ref().filter(|(cached_key, _)| *cached_key == key) {
            log::trace!("Reachability: cache hit ({} cells)", cached.len());
            return cached.clone();
        }

        let set = self.explore(scene, validator, origin, grid_size);
        self.cache = Some((key, set.clone()));
        set
    }

    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    pub fn cached_results(&self) -> usize {
        usize::from(self.cache.is_some())
    }

    /// Uncached flood fill from `origin`
    pub fn explore(
        &self,
        scene: &Scene,
        validator: &MotionValidator,
        origin: Vec3,
        grid_size: f32,
    ) -> ReachableSet {
        let mut set = ReachableSet::seeded(origin, grid_size);
        if !(grid_size.is_finite() && grid_size > 0.0) {
            log::warn!("Reachability: grid size {} is not positive", grid_size);
            return set;
        }

        let pose = *scene.agent_pose();
        let holding = scene.held().is_some();
        let capsule = scene.agent().capsule;
        let mut touch_mask = QueryMask::solids().exclude_category(ColliderCategory::FLOOR);
        if let Some(held) = scene.held() {
            touch_mask = touch_mask.ignoring_object(held.object);
        }

        let mut frontier = VecDeque::from([GridCell::ORIGIN]);
        let mut out_of_bounds = BTreeSet::new();

        while !frontier.is_empty() {
            if set.iterations >= self.config.max_iterations {
                log::warn!(
                    "Reachability: safety cap of {} iterations hit with {} cells queued",
                    self.config.max_iterations,
                    frontier.len()
                );
                set.diagnostics.push(ExploreDiagnostic::SafetyCapExceeded {
                    iterations: set.iterations,
                });
                break;
            }
            let Some(cell) = frontier.pop_front() else {
                break;
            };
            set.iterations += 1;

            let from = pose.with_position(set.position(&cell));
            let touching: Vec<ColliderHandle> = CollisionOracle::overlap(
                scene,
                &capsule,
                &Transform::from_translation(from.position),
                &touch_mask,
            )
            .into_iter()
            .map(|hit| hit.handle)
            .collect();

            for (dx, dz) in DIRECTIONS {
                let next = cell.offset(dx, dz);
                if set.cells.contains(&next) || out_of_bounds.contains(&next) {
                    continue;
                }

                let direction = step_direction(dx, dz);
                if let Some(reason) =
                    validator.translation_obstruction(scene, &from, direction, grid_size, &touching)
                {
                    log::trace!("Reachability: {:?} -> {:?} blocked: {}", cell, next, reason);
                    continue;
                }

                let target = set.position(&next);
                if !scene.bounds().contains(target) {
                    log::warn!(
                        "Reachability: cell {:?} at {:?} passed the sweep but lies outside the scene bounds",
                        next,
                        target
                    );
                    set.diagnostics.push(ExploreDiagnostic::OutOfBounds {
                        cell: next,
                        position: target,
                    });
                    out_of_bounds.insert(next);
                    continue;
                }

                if self.config.require_floor_support
                    && !CollisionOracle::has_floor_below(scene, target, self.config.floor_probe_distance)
                {
                    continue;
                }

                if holding
                    && !CARDINAL_YAWS
                        .iter()
                        .any(|yaw| validator.can_fit_held_object(scene, target, *yaw))
                {
                    continue;
                }

                set.cells.insert(next);
                set.parents.insert(next, cell);
                frontier.push_back(next);
            }
        }

        log::debug!(
            "Reachability: {} cells from {:?} in {} iterations",
            set.len(),
            origin,
            set.iterations
        );
        set
    }

    /// Every (cell, yaw, stance) from which `object` is visible, evaluated
    /// over the cached reachable set around the agent
    pub fn positions_from_which_visible(
        &mut self,
        scene: &Scene,
        validator: &MotionValidator,
        object: ObjectId,
    ) -> Result<Vec<VisibleFrom>> {
        let spatial = scene.object(object)?;
        if spatial.visibility_points.is_empty() {
            return Err(SceneError::NoVisibilityPoints {
                id: object,
                name: spatial.name.clone(),
            });
        }

        let agent = *scene.agent_pose();
        let reachable = self.compute_reachable(scene, validator, agent.position, self.config.grid_size);
        let max_distance = validator.config().visibility.view_distance;
        let oracle = validator.visibility();

        let mut found = Vec::new();
        for cell in reachable.iter() {
            let position = reachable.position(cell);
            for stance in Stance::ALL {
                for yaw in CARDINAL_YAWS {
                    let mut pose = Pose::new(position, yaw).with_stance(stance);
                    pose.horizon = agent.horizon;
                    let camera = validator.camera_for(&pose);
                    if oracle.is_visible(scene, object, &camera, max_distance)?.visible {
                        found.push(VisibleFrom {
                            cell: *cell,
                            position,
                            yaw,
                            stance,
                        });
                    }
                }
            }
        }

        log::debug!(
            "Reachability: {} visible from {} of {} poses",
            object,
            found.len(),
            reachable.len() * Stance::ALL.len() * CARDINAL_YAWS.len()
        );
        Ok(found)
    }
}
