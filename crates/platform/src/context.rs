//! Per-application state updated once per frame.

use std::time::{Duration, Instant};

use corelib::{Vec3, camera::Camera, light::PointLight, scene::Scene};

use crate::input::{Action, InputState};

pub const CAMERA_START: Vec3 = Vec3::new(0.0, 1.0, 7.0);

/// Delta time between successive frames. The first tick yields zero.
#[derive(Debug, Default)]
pub struct FrameClock {
    last: Option<Instant>,
}

impl FrameClock {
    pub fn tick(&mut self, now: Instant) -> f32 {
        let dt = self
            .last
            .map_or(0.0, |last| now.saturating_duration_since(last).as_secs_f32());
        self.last = Some(now);
        dt
    }
}

/// Counts frames and reports the rate once per second.
#[derive(Debug, Default)]
pub struct FpsCounter {
    frames: u32,
    elapsed: Duration,
}

impl FpsCounter {
    pub fn frame(&mut self, dt: f32) -> Option<f32> {
        self.frames += 1;
        self.elapsed += Duration::from_secs_f32(dt);
        if self.elapsed < Duration::from_secs(1) {
            return None;
        }
        let fps = self.frames as f32 / self.elapsed.as_secs_f32();
        *self = Self::default();
        Some(fps)
    }
}

/// Everything the frame loop mutates: camera, light, scene and input.
pub struct AppContext {
    pub camera: Camera,
    pub light: PointLight,
    pub scene: Scene,
    pub input: InputState,
    pub clock: FrameClock,
    pub fps: FpsCounter,
    pub quit_requested: bool,
}

impl AppContext {
    pub fn new() -> Self {
        Self {
            camera: Camera::new(CAMERA_START),
            light: PointLight::default(),
            scene: Scene::new(),
            input: InputState::default(),
            clock: FrameClock::default(),
            fps: FpsCounter::default(),
            quit_requested: false,
        }
    }

    /// Apply held keys, mouse motion and scroll accumulated since the last frame.
    pub fn update(&mut self, dt: f32) {
        let actions: Vec<Action> = self.input.held_actions().collect();
        for action in actions {
            match action {
                Action::Quit => self.quit_requested = true,
                Action::Camera(m) => self.camera.process_keyboard(m, dt),
                Action::Light(m) => self.light.process_keyboard(m, dt),
            }
        }

        let (dx, dy) = self.input.take_mouse_offsets();
        if dx != 0.0 || dy != 0.0 {
            self.camera.process_mouse_movement(dx, dy);
        }
        let scroll = self.input.take_scroll();
        if scroll != 0.0 {
            self.camera.process_mouse_scroll(scroll);
        }
    }
}

impl Default for AppContext {
    fn default() -> Self {
        Self::new()
    }
}
