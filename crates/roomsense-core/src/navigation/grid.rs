use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Integer grid offset from an exploration origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCell {
    pub x: i32,
    pub z: i32,
}

/// Neighbour order used by the flood fill: +Z, +X, -Z, -X
pub const DIRECTIONS: [(i32, i32); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];

impl GridCell {
    pub const ORIGIN: GridCell = GridCell { x: 0, z: 0 };

    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub fn offset(&self, dx: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            z: self.z + dz,
        }
    }

    pub fn neighbors(&self) -> [GridCell; 4] {
        DIRECTIONS.map(|(dx, dz)| self.offset(dx, dz))
    }

    pub fn world_position(&self, origin: Vec3, grid_size: f32) -> Vec3 {
        origin + Vec3::new(self.x as f32 * grid_size, 0.0, self.z as f32 * grid_size)
    }

    /// Nearest cell to a world position
    pub fn from_world(origin: Vec3, grid_size: f32, position: Vec3) -> Self {
        let delta = (position - origin) / grid_size;
        Self {
            x: delta.x.round() as i32,
            z: delta.z.round() as i32,
        }
    }

    /// Manhattan distance in cells
    pub fn manhattan(&self, other: &GridCell) -> u32 {
        self.x.abs_diff(other.x) + self.z.abs_diff(other.z)
    }
}

/// Unit world direction of a grid step
pub fn step_direction(dx: i32, dz: i32) -> Vec3 {
    Vec3::new(dx as f32, 0.0, dz as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_position_round_trip() {
        let origin = Vec3::new(0.1, 0.46, -0.3);
        let cell = GridCell::new(3, -2);
        let world = cell.world_position(origin, 0.25);
        assert_eq!(GridCell::from_world(origin, 0.25, world), cell);
        assert!((world.y - 0.46).abs() < 1e-6);
    }

    #[test]
    fn test_neighbor_order() {
        let n = GridCell::ORIGIN.neighbors();
        assert_eq!(n[0], GridCell::new(0, 1));
        assert_eq!(n[1], GridCell::new(1, 0));
        assert_eq!(n[2], GridCell::new(0, -1));
        assert_eq!(n[3], GridCell::new(-1, 0));
    }

    #[test]
    fn test_manhattan() {
        assert_eq!(GridCell::new(2, -3).manhattan(&GridCell::ORIGIN), 5);
    }
}
