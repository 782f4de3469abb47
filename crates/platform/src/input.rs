//! Keyboard bindings and accumulated input between frames.

use std::collections::HashSet;

use corelib::{camera::CameraMovement, light::LightMovement};
use winit::keyboard::KeyCode;

/// What a held key does each frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Camera(CameraMovement),
    Light(LightMovement),
    Quit,
}

pub fn action_for(key: KeyCode) -> Option<Action> {
    use Action::{Camera, Light};
    let action = match key {
        KeyCode::Escape => Action::Quit,
        KeyCode::KeyW => Camera(CameraMovement::Forward),
        KeyCode::KeyS => Camera(CameraMovement::Backward),
        KeyCode::KeyA => Camera(CameraMovement::Left),
        KeyCode::KeyD => Camera(CameraMovement::Right),
        KeyCode::Space => Camera(CameraMovement::Up),
        KeyCode::ShiftLeft => Camera(CameraMovement::Down),
        KeyCode::KeyI => Light(LightMovement::Away),
        KeyCode::KeyK => Light(LightMovement::Toward),
        KeyCode::KeyJ => Light(LightMovement::Left),
        KeyCode::KeyL => Light(LightMovement::Right),
        KeyCode::KeyU => Light(LightMovement::Up),
        KeyCode::KeyO => Light(LightMovement::Down),
        _ => return None,
    };
    Some(action)
}

/// Pixels treated as one wheel notch for touchpads reporting pixel deltas.
pub const PIXELS_PER_SCROLL_LINE: f32 = 20.0;

#[derive(Debug, Default)]
pub struct InputState {
    held: HashSet<KeyCode>,
    mouse_delta: (f64, f64),
    scroll: f32,
}

impl InputState {
    pub fn key(&mut self, key: KeyCode, pressed: bool) {
        if pressed {
            self.held.insert(key);
        } else {
            self.held.remove(&key);
        }
    }

    /// Forget held keys, e.g. when the window loses focus.
    pub fn release_all(&mut self) {
        self.held.clear();
    }

    pub fn mouse_motion(&mut self, dx: f64, dy: f64) {
        self.mouse_delta.0 += dx;
        self.mouse_delta.1 += dy;
    }

    pub fn scroll(&mut self, lines: f32) {
        self.scroll += lines;
    }

    pub fn held_actions(&self) -> impl Iterator<Item = Action> + '_ {
        self.held.iter().filter_map(|&k| action_for(k))
    }

    /// Mouse motion since the last call as camera offsets (`y` up).
    pub fn take_mouse_offsets(&mut self) -> (f32, f32) {
        let (dx, dy) = std::mem::take(&mut self.mouse_delta);
        (dx as f32, -dy as f32)
    }

    pub fn take_scroll(&mut self) -> f32 {
        std::mem::take(&mut self.scroll)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bindings() {
        assert_eq!(action_for(KeyCode::Escape), Some(Action::Quit));
        assert_eq!(
            action_for(KeyCode::ShiftLeft),
            Some(Action::Camera(CameraMovement::Down))
        );
        assert_eq!(
            action_for(KeyCode::KeyI),
            Some(Action::Light(LightMovement::Away))
        );
        assert_eq!(
            action_for(KeyCode::KeyO),
            Some(Action::Light(LightMovement::Down))
        );
        assert_eq!(action_for(KeyCode::KeyZ), None);
    }

    #[test]
    fn held_keys_track_press_and_release() {
        let mut input = InputState::default();
        input.key(KeyCode::KeyW, true);
        input.key(KeyCode::KeyZ, true);
        input.key(KeyCode::KeyW, true);
        let actions: Vec<Action> = input.held_actions().collect();
        assert_eq!(actions, [Action::Camera(CameraMovement::Forward)]);

        input.key(KeyCode::KeyW, false);
        assert_eq!(input.held_actions().count(), 0);
        input.key(KeyCode::KeyJ, true);
        input.release_all();
        assert_eq!(input.held_actions().count(), 0);
    }

    #[test]
    fn mouse_motion_accumulates_and_inverts_y() {
        let mut input = InputState::default();
        input.mouse_motion(3.0, 4.0);
        input.mouse_motion(1.0, -1.0);
        assert_eq!(input.take_mouse_offsets(), (4.0, -3.0));
        assert_eq!(input.take_mouse_offsets(), (0.0, 0.0));
        input.scroll(1.5);
        input.scroll(-0.5);
        assert_eq!(input.take_scroll(), 1.0);
        assert_eq!(input.take_scroll(), 0.0);
    }
}
