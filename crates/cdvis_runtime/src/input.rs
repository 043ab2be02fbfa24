//! Keyboard and mouse state for the desktop controls
//!
//! Window events are folded into an [`InputState`]; the frame loop reads
//! held keys, this frame's key presses and the mouse motion since the
//! last frame, then calls [`InputState::end_frame`].

use std::collections::HashSet;

use cdvis_math::Vec2;
use winit::event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta};
use winit::keyboard::{KeyCode, ModifiersState, PhysicalKey};

/// Pixel scroll is converted to lines at this rate
const PIXELS_PER_LINE: f32 = 50.0;

#[derive(Debug, Default)]
pub struct InputState {
    keys_held: HashSet<KeyCode>,
    keys_pressed: HashSet<KeyCode>,
    mouse_buttons: HashSet<MouseButton>,
    mouse_position: Vec2,
    last_mouse_position: Option<Vec2>,
    mouse_delta: Vec2,
    scroll_lines: f32,
    modifiers: ModifiersState,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_key(&mut self, event: &KeyEvent) {
        if let PhysicalKey::Code(code) = event.physical_key {
            self.set_key(code, event.state, event.repeat);
        }
    }

    /// Track a key by its physical position. Repeats do not count as new
    /// presses.
    pub fn set_key(&mut self, code: KeyCode, state: ElementState, repeat: bool) {
        match state {
            ElementState::Pressed => {
                if self.keys_held.insert(code) && !repeat {
                    self.keys_pressed.insert(code);
                }
            }
            ElementState::Released => {
                self.keys_held.remove(&code);
            }
        }
    }

    pub fn set_modifiers(&mut self, modifiers: ModifiersState) {
        self.modifiers = modifiers;
    }

    pub fn handle_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        match state {
            ElementState::Pressed => {
                self.mouse_buttons.insert(button);
            }
            ElementState::Released => {
                self.mouse_buttons.remove(&button);
            }
        }
    }

    /// Accumulates motion until the end of the frame. Several events can
    /// arrive per frame.
    pub fn set_mouse_position(&mut self, x: f32, y: f32) {
        let position = Vec2::new(x, y);
        if let Some(last) = self.last_mouse_position {
            self.mouse_delta += position - last;
        }
        self.last_mouse_position = Some(position);
        self.mouse_position = position;
    }

    pub fn handle_scroll(&mut self, delta: MouseScrollDelta) {
        self.scroll_lines += match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / PIXELS_PER_LINE,
        };
    }

    /// Focus lost: nothing stays held
    pub fn release_all(&mut self) {
        self.keys_held.clear();
        self.mouse_buttons.clear();
        self.last_mouse_position = None;
    }

    pub fn is_key_held(&self, code: KeyCode) -> bool {
        self.keys_held.contains(&code)
    }

    /// Went down this frame
    pub fn was_key_pressed(&self, code: KeyCode) -> bool {
        self.keys_pressed.contains(&code)
    }

    pub fn is_mouse_held(&self, button: MouseButton) -> bool {
        self.mouse_buttons.contains(&button)
    }

    pub fn shift(&self) -> bool {
        self.modifiers.shift_key()
            || self.is_key_held(KeyCode::ShiftLeft)
            || self.is_key_held(KeyCode::ShiftRight)
    }

    pub fn mouse_position(&self) -> Vec2 {
        self.mouse_position
    }

    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    pub fn scroll_lines(&self) -> f32 {
        self.scroll_lines
    }

    /// +1 / -1 / 0 from a pair of held keys
    pub fn axis(&self, negative: KeyCode, positive: KeyCode) -> f32 {
        let mut value = 0.0;
        if self.is_key_held(negative) {
            value -= 1.0;
        }
        if self.is_key_held(positive) {
            value += 1.0;
        }
        value
    }

    /// Clear per-frame presses, motion and scroll
    pub fn end_frame(&mut self) {
        self.keys_pressed.clear();
        self.mouse_delta = Vec2::ZERO;
        self.scroll_lines = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_is_reported_once() {
        let mut input = InputState::new();
        input.set_key(KeyCode::KeyG, ElementState::Pressed, false);
        assert!(input.was_key_pressed(KeyCode::KeyG));
        assert!(input.is_key_held(KeyCode::KeyG));

        input.end_frame();
        input.set_key(KeyCode::KeyG, ElementState::Pressed, true);
        assert!(!input.was_key_pressed(KeyCode::KeyG));
        assert!(input.is_key_held(KeyCode::KeyG));

        input.set_key(KeyCode::KeyG, ElementState::Released, false);
        assert!(!input.is_key_held(KeyCode::KeyG));
    }

    #[test]
    fn test_mouse_delta_accumulates() {
        let mut input = InputState::new();
        input.set_mouse_position(10.0, 10.0);
        assert_eq!(input.mouse_delta(), Vec2::ZERO);
        input.set_mouse_position(12.0, 9.0);
        input.set_mouse_position(15.0, 11.0);
        assert_eq!(input.mouse_delta(), Vec2::new(5.0, 1.0));
        assert_eq!(input.mouse_position(), Vec2::new(15.0, 11.0));

        input.end_frame();
        assert_eq!(input.mouse_delta(), Vec2::ZERO);
    }

    #[test]
    fn test_scroll_lines() {
        let mut input = InputState::new();
        input.handle_scroll(MouseScrollDelta::LineDelta(0.0, 1.0));
        input.handle_scroll(MouseScrollDelta::LineDelta(0.0, 2.0));
        assert_eq!(input.scroll_lines(), 3.0);
        input.end_frame();
        assert_eq!(input.scroll_lines(), 0.0);
    }

    #[test]
    fn test_axis_and_release_all() {
        let mut input = InputState::new();
        input.set_key(KeyCode::KeyW, ElementState::Pressed, false);
        assert_eq!(input.axis(KeyCode::KeyS, KeyCode::KeyW), 1.0);
        input.set_key(KeyCode::KeyS, ElementState::Pressed, false);
        assert_eq!(input.axis(KeyCode::KeyS, KeyCode::KeyW), 0.0);

        input.handle_mouse_button(MouseButton::Right, ElementState::Pressed);
        input.set_key(KeyCode::ShiftLeft, ElementState::Pressed, false);
        assert!(input.shift());
        input.release_all();
        assert!(!input.is_mouse_held(MouseButton::Right));
        assert!(!input.shift());
        assert_eq!(input.axis(KeyCode::KeyS, KeyCode::KeyW), 0.0);
    }
}
