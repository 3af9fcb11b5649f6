use glam::Vec2;
use std::f32::consts::PI;
use std::fmt;

/// Viewer pose over the heightfield.
///
/// At angle 0 the camera looks down the negative y axis. Rays are cast through
/// a fixed 90 degree frustum, so at depth `z` the left and right frustum edges
/// sit at `(-z, -z)` and `(z, -z)` relative to the viewer before rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec2,
    pub angle: f32,
    pub distance: f32,
    pub height: f32,
    pub horizon: f32,
}

impl Camera {
    pub fn new(position: Vec2, distance: f32) -> Self {
        Self {
            position,
            angle: 0.0,
            distance,
            height: 100.0,
            horizon: 50.0,
        }
    }

    /// Moves by a velocity given in the camera's local frame
    /// (`-y` forward, `+x` right).
    pub fn translate(&mut self, velocity: Vec2) {
        self.position += Vec2::from_angle(self.angle).rotate(velocity);
    }

    pub fn rotate(&mut self, delta: f32) {
        self.angle += delta;
    }

    /// Sine and cosine of the negated facing angle, the basis the frustum edges are built from.
    pub fn ray_basis(&self) -> (f32, f32) {
        (-self.angle).sin_cos()
    }

    /// Left and right frustum edge points in world space at depth `z`.
    pub fn frustum_edges(&self, z: f32) -> (Vec2, Vec2) {
        let (sin, cos) = self.ray_basis();
        let left = Vec2::new(-cos * z - sin * z, sin * z - cos * z);
        let right = Vec2::new(cos * z - sin * z, -sin * z - cos * z);
        (left + self.position, right + self.position)
    }

    /// Unit vector the camera faces in world space.
    pub fn forward(&self) -> Vec2 {
        Vec2::from_angle(self.angle).rotate(Vec2::NEG_Y)
    }
}

impl fmt::Display for Camera {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "P: ({:.3}, {:.3}) θ: {:.3}pi Dist: {:.1} Height: {:.1} Horizon: {:.1}",
            self.position.x,
            self.position.y,
            self.angle / PI,
            self.distance,
            self.height,
            self.horizon
        )
    }
}
