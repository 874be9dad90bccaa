//! Polling state for objects coming to rest after a drop

use crate::config::SettleConfig;
use crate::error::Result;
use crate::world::{ObjectId, Scene};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleStatus {
    Pending,
    Settled,
    TimedOut,
}

impl SettleStatus {
    pub fn is_done(&self) -> bool {
        !matches!(self, SettleStatus::Pending)
    }
}

/// Tracks one object; advance it once after every physics step
#[derive(Debug, Clone, PartialEq)]
pub struct SettleWatch {
    pub object: ObjectId,
    pub ticks_elapsed: u32,
    pub max_ticks: u32,
    pub velocity_epsilon: f32,
    status: SettleStatus,
}

impl SettleWatch {
    pub fn new(object: ObjectId, config: &SettleConfig) -> Self {
        Self {
            object,
            ticks_elapsed: 0,
            max_ticks: config.max_ticks,
            velocity_epsilon: config.velocity_epsilon,
            status: SettleStatus::Pending,
        }
    }

    pub fn status(&self) -> SettleStatus {
        self.status
    }

    /// Record one tick with the body's current speeds. `Settled` and
    /// `TimedOut` are terminal.
    pub fn advance(&mut self, linear_speed: f32, angular_speed: f32) -> SettleStatus {
        if self.status.is_done() {
            return self.status;
        }

        self.ticks_elapsed += 1;
        if linear_speed < self.velocity_epsilon && angular_speed < self.velocity_epsilon {
            self.status = SettleStatus::Settled;
            log::debug!("Settle: {} at rest after {} ticks", self.object, self.ticks_elapsed);
        } else if self.ticks_elapsed >= self.max_ticks {
            self.status = SettleStatus::TimedOut;
            log::warn!(
                "Settle: {} still moving after {} ticks (linear {:.4}, angular {:.4})",
                self.object,
                self.ticks_elapsed,
                linear_speed,
                angular_speed
            );
        }
        self.status
    }

    /// Read the object's velocity from the scene and advance
    pub fn poll(&mut self, scene: &Scene) -> Result<SettleStatus> {
        if self.status.is_done() {
            return Ok(self.status);
        }
        let (linear, angular) = scene.body_velocity(self.object)?;
        Ok(self.advance(linear, angular))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn watch(max_ticks: u32) -> SettleWatch {
        let config = SettleConfig {
            max_ticks,
            ..Default::default()
        };
        SettleWatch::new(ObjectId::from_raw(1), &config)
    }

    #[test]
    fn test_settles_when_slow() {
        let mut w = watch(10);
        assert_eq!(w.advance(1.0, 0.0), SettleStatus::Pending);
        assert_eq!(w.advance(0.0, 0.0), SettleStatus::Settled);
        assert_eq!(w.ticks_elapsed, 2);
    }

    #[test]
    fn test_times_out() {
        let mut w = watch(3);
        assert_eq!(w.advance(1.0, 1.0), SettleStatus::Pending);
        assert_eq!(w.advance(1.0, 1.0), SettleStatus::Pending);
        assert_eq!(w.advance(1.0, 1.0), SettleStatus::TimedOut);
    }

    #[test]
    fn test_terminal_states_are_sticky() {
        let mut w = watch(1);
        assert_eq!(w.advance(5.0, 0.0), SettleStatus::TimedOut);
        assert_eq!(w.advance(0.0, 0.0), SettleStatus::TimedOut);
        assert_eq!(w.ticks_elapsed, 1);
    }

    #[test]
    fn test_angular_motion_keeps_pending() {
        let mut w = watch(10);
        assert_eq!(w.advance(0.0, 0.5), SettleStatus::Pending);
    }
}
