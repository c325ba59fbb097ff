use std::collections::HashSet;

use bitflags::bitflags;
use glam::Vec2;
use winit::event::{ElementState, MouseButton, MouseScrollDelta};
use winit::keyboard::KeyCode;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MouseButtons: u8 {
        const LEFT = 1 << 0;
        const RIGHT = 1 << 1;
        const MIDDLE = 1 << 2;
    }
}

impl MouseButtons {
    fn from_winit(button: MouseButton) -> Self {
        match button {
            MouseButton::Left => MouseButtons::LEFT,
            MouseButton::Right => MouseButtons::RIGHT,
            MouseButton::Middle => MouseButtons::MIDDLE,
            _ => MouseButtons::empty(),
        }
    }
}

/// Keyboard and mouse state collected from window events, consumed once per frame.
#[derive(Debug, Default)]
pub struct InputState {
    held: HashSet<KeyCode>,
    pressed: HashSet<KeyCode>,
    buttons: MouseButtons,
    mouse_delta: Vec2,
    scroll_delta: f32,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_key(&mut self, key: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if self.held.insert(key) {
                    self.pressed.insert(key);
                }
            }
            ElementState::Released => {
                self.held.remove(&key);
            }
        }
    }

    pub fn on_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        let flag = MouseButtons::from_winit(button);
        self.buttons.set(flag, state == ElementState::Pressed);
    }

    pub fn on_mouse_motion(&mut self, dx: f64, dy: f64) {
        self.mouse_delta += Vec2::new(dx as f32, dy as f32);
    }

    pub fn on_scroll(&mut self, delta: MouseScrollDelta) {
        self.scroll_delta += match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 120.0,
        };
    }

    pub fn key_down(&self, key: KeyCode) -> bool {
        self.held.contains(&key)
    }

    /// True only on the frame the key went down.
    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.pressed.contains(&key)
    }

    pub fn mouse_down(&self, buttons: MouseButtons) -> bool {
        self.buttons.contains(buttons)
    }

    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    pub fn scroll_delta(&self) -> f32 {
        self.scroll_delta
    }

    /// Axis value in [-1, 1] from a pair of keys.
    pub fn axis(&self, negative: KeyCode, positive: KeyCode) -> f32 {
        let mut value = 0.0;
        if self.key_down(positive) {
            value += 1.0;
        }
        if self.key_down(negative) {
            value -= 1.0;
        }
        value
    }

    pub fn end_frame(&mut self) {
        self.pressed.clear();
        self.mouse_delta = Vec2::ZERO;
        self.scroll_delta = 0.0;
    }

    pub fn clear(&mut self) {
        self.held.clear();
        self.buttons = MouseButtons::empty();
        self.end_frame();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pressed_is_edge_triggered() {
        let mut input = InputState::new();
        input.on_key(KeyCode::KeyW, ElementState::Pressed);
        assert!(input.key_pressed(KeyCode::KeyW));
        assert!(input.key_down(KeyCode::KeyW));

        input.end_frame();
        // key repeat must not re-trigger the edge
        input.on_key(KeyCode::KeyW, ElementState::Pressed);
        assert!(!input.key_pressed(KeyCode::KeyW));
        assert!(input.key_down(KeyCode::KeyW));

        input.on_key(KeyCode::KeyW, ElementState::Released);
        assert!(!input.key_down(KeyCode::KeyW));
    }

    #[test]
    fn mouse_delta_accumulates_until_end_of_frame() {
        let mut input = InputState::new();
        input.on_mouse_motion(2.0, -1.0);
        input.on_mouse_motion(3.0, 4.0);
        assert_eq!(input.mouse_delta(), Vec2::new(5.0, 3.0));
        input.end_frame();
        assert_eq!(input.mouse_delta(), Vec2::ZERO);
    }

    #[test]
    fn axis_combines_opposing_keys() {
        let mut input = InputState::new();
        input.on_key(KeyCode::KeyA, ElementState::Pressed);
        assert_eq!(input.axis(KeyCode::KeyA, KeyCode::KeyD), -1.0);
        input.on_key(KeyCode::KeyD, ElementState::Pressed);
        assert_eq!(input.axis(KeyCode::KeyA, KeyCode::KeyD), 0.0);
    }

    #[test]
    fn mouse_buttons_track_state() {
        let mut input = InputState::new();
        input.on_mouse_button(MouseButton::Right, ElementState::Pressed);
        assert!(input.mouse_down(MouseButtons::RIGHT));
        assert!(!input.mouse_down(MouseButtons::LEFT));
        input.on_mouse_button(MouseButton::Right, ElementState::Released);
        assert!(!input.mouse_down(MouseButtons::RIGHT));
    }
}
