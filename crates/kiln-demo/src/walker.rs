use glam::{Vec2, Vec3};

use crate::camera::Camera;
use crate::config::MovementSection;

const EYE_HEIGHT: f32 = 35.0;
const START_HEIGHT: f32 = 20.0;

/// Movement intent for one frame, each axis in `-1..=1`.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Steer {
    /// +1 strafes right (E), -1 left (Q).
    pub strafe: f32,
    /// +1 walks forward (W), -1 back (S).
    pub forward: f32,
    /// +1 turns right (D), -1 left (A).
    pub turn: f32,
}

/// First-person walker on the arena floor.
#[derive(Debug, Clone)]
pub struct Walker {
    pub position: Vec3,
    /// Degrees.
    pub yaw: f32,
    settings: MovementSection,
}

impl Walker {
    pub fn new(settings: MovementSection) -> Self {
        Self {
            position: Vec3::new(0.0, START_HEIGHT, 0.0),
            yaw: 0.0,
            settings,
        }
    }

    /// World-space unit direction of travel for `steer` at the current heading.
    fn direction(&self, steer: Steer) -> Vec3 {
        let mv = Vec3::new(steer.strafe, 0.0, -steer.forward).normalize_or_zero();
        let (sin, cos) = self.yaw.to_radians().sin_cos();
        mv.x * Vec3::new(cos, 0.0, -sin) + mv.z * Vec3::new(sin, 0.0, cos)
    }

    /// Speed after the soft boundary: heading outward near `reach` slows to a stop,
    /// heading back in is never slowed.
    fn speed(&self, dir: Vec3) -> f32 {
        let reach = self.settings.reach;
        if reach == 0.0 {
            return self.settings.velocity;
        }

        let flat = Vec2::new(self.position.x, self.position.z);
        let bias = flat.normalize_or_zero();
        let affinity = std::f32::consts::FRAC_1_SQRT_2 * (bias + Vec2::new(dir.x, dir.z)).length();
        let tensity = flat.length() / reach;

        self.settings.velocity * (1.0 - affinity * tensity).max(0.0)
    }

    /// Advances by `dt` seconds.
    pub fn step(&mut self, steer: Steer, dt: f32) {
        let dir = self.direction(steer);
        self.position += dt * self.speed(dir) * dir;
        self.yaw -= dt * self.settings.turn_speed * steer.turn;
    }

    pub fn place_camera(&self, camera: &mut Camera) {
        camera.eye = self.position + Vec3::new(0.0, EYE_HEIGHT, 0.0);
        camera.yaw = self.yaw.to_radians();
    }
}
