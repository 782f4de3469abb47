use crate::Vec3;

pub const DEFAULT_LIGHT_SPEED: f32 = 2.5;

/// Axis-aligned nudge applied to the light each frame a key is held.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LightMovement {
    /// -Z
    Away,
    /// +Z
    Toward,
    /// -X
    Left,
    /// +X
    Right,
    /// +Y
    Up,
    /// -Y
    Down,
}

impl LightMovement {
    fn direction(self) -> Vec3 {
        match self {
            Self::Away => Vec3::NEG_Z,
            Self::Toward => Vec3::Z,
            Self::Left => Vec3::NEG_X,
            Self::Right => Vec3::X,
            Self::Up => Vec3::Y,
            Self::Down => Vec3::NEG_Y,
        }
    }
}

/// Single point light.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Vec3,
    pub speed: f32,
}

impl PointLight {
    pub fn new(position: Vec3, color: Vec3) -> Self {
        Self {
            position,
            color,
            speed: DEFAULT_LIGHT_SPEED,
        }
    }

    pub fn process_keyboard(&mut self, movement: LightMovement, dt: f32) {
        self.position += movement.direction() * (self.speed * dt);
    }
}

impl Default for PointLight {
    /// Slightly warm white, up and in front of the origin.
    fn default() -> Self {
        Self::new(Vec3::new(1.2, 1.5, 3.0), Vec3::new(1.0, 1.0, 0.95))
    }
}
