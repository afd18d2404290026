//! Ground-truth target trajectories in physical space.
//!
//! Each target has a true 3D position/velocity and a `MotionSpec` describing
//! how it moves. The scenario steps every target forward once per frame.

use serde::{Deserialize, Serialize};
use tracker_core::types::Rgb;

/// How a target moves between frames.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum MotionSpec {
    /// Constant velocity: no acceleration.
    ConstantVelocity,
    /// Gravity plus velocity-proportional drag, the balloon regime.
    /// `gravity` is positive downward (+y), `drag` is the per-second
    /// velocity fraction lost, in [0, 1).
    Ballistic { gravity: f64, drag: f64 },
    /// Sinusoidal horizontal drift around the starting position.
    /// `amplitude` in physical units, `period` in seconds.
    Drift { amplitude: f64, period: f64 },
}

/// A simulated target with ground-truth state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimTarget {
    pub id: u32,
    /// True position [x, y, z] in physical units
    pub position: [f64; 3],
    /// True velocity [vx, vy, vz]
    pub velocity: [f64; 3],
    /// True surface color, used by the simulated appearance sampler
    pub color: Rgb,
    pub motion: MotionSpec,
    /// Anchor for the Drift motion (captured at construction)
    anchor_x: f64,
    /// Accumulated simulation time (drives Drift phase)
    elapsed: f64,
}

impl SimTarget {
    pub fn new(
        id: u32,
        position: [f64; 3],
        velocity: [f64; 3],
        color: Rgb,
        motion: MotionSpec,
    ) -> Self {
        Self {
            id,
            position,
            velocity,
            color,
            motion,
            anchor_x: position[0],
            elapsed: 0.0,
        }
    }

    /// Propagate the true state by `dt` seconds.
    pub fn step(&mut self, dt: f64) {
        self.elapsed += dt;
        match self.motion {
            MotionSpec::ConstantVelocity => {
                for i in 0..3 {
                    self.position[i] += self.velocity[i] * dt;
                }
            }
            MotionSpec::Ballistic { gravity, drag } => {
                let damp = (1.0 - drag).powf(dt);
                for v in &mut self.velocity {
                    *v *= damp;
                }
                self.velocity[1] += gravity * dt;
                for i in 0..3 {
                    self.position[i] += self.velocity[i] * dt;
                }
            }
            MotionSpec::Drift { amplitude, period } => {
                let omega = std::f64::consts::TAU / period;
                self.position[0] = self.anchor_x + amplitude * (omega * self.elapsed).sin();
                self.position[1] += self.velocity[1] * dt;
                self.position[2] += self.velocity[2] * dt;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_velocity_moves_linearly() {
        let mut t = SimTarget::new(
            0,
            [0.0, 0.0, 2.0],
            [1.0, -0.5, 0.0],
            Rgb::default(),
            MotionSpec::ConstantVelocity,
        );
        t.step(2.0);
        assert_eq!(t.position, [2.0, -1.0, 2.0]);
    }

    #[test]
    fn ballistic_target_accelerates_downward() {
        let mut t = SimTarget::new(
            0,
            [0.0, 0.0, 2.0],
            [0.0, 0.0, 0.0],
            Rgb::default(),
            MotionSpec::Ballistic {
                gravity: 1.0,
                drag: 0.0,
            },
        );
        t.step(1.0);
        assert!(t.velocity[1] > 0.0);
        assert!(t.position[1] > 0.0);
    }

    #[test]
    fn drift_stays_within_amplitude() {
        let mut t = SimTarget::new(
            0,
            [5.0, 1.0, 2.0],
            [0.0, 0.0, 0.0],
            Rgb::default(),
            MotionSpec::Drift {
                amplitude: 0.5,
                period: 4.0,
            },
        );
        for _ in 0..100 {
            t.step(0.1);
            assert!((t.position[0] - 5.0).abs() <= 0.5 + 1e-9);
        }
    }
}
