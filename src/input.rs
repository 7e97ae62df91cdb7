//! Per-frame input snapshot
//!
//! [`InputState`] accumulates window events between frames; [`InputState::snapshot`]
//! hands the frame a [`FrameInput`] with button edges and cursor deltas and
//! resets the accumulators.

use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

/// Level and edges of one mouse button during a frame.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ButtonState {
    pub down: bool,
    pub pressed: bool,
    pub released: bool,
}

impl ButtonState {
    fn set(&mut self, down: bool) {
        if down && !self.down {
            self.pressed = true;
        }
        if !down && self.down {
            self.released = true;
        }
        self.down = down;
    }

    fn end_frame(&mut self) {
        self.pressed = false;
        self.released = false;
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct FrameInput {
    /// Cursor in physical window pixels, origin top-left.
    pub cursor: (f64, f64),
    pub cursor_delta: (f64, f64),
    /// Wheel movement in lines, positive away from the user.
    pub scroll: f32,
    pub left: ButtonState,
    pub right: ButtonState,
    pub middle: ButtonState,
    pub shift: bool,
    /// Keys that went down this frame.
    pub keys_pressed: Vec<KeyCode>,
}

impl FrameInput {
    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// Copy with every pointer action removed, for frames where the GUI owns the mouse.
    ///
    /// Button levels are kept so a drag that started in the viewport can still end.
    pub fn without_pointer(&self) -> Self {
        let strip = |b: ButtonState| ButtonState {
            pressed: false,
            ..b
        };
        Self {
            cursor: (-1.0, -1.0),
            cursor_delta: (0.0, 0.0),
            scroll: 0.0,
            left: strip(self.left),
            right: strip(self.right),
            middle: strip(self.middle),
            shift: self.shift,
            keys_pressed: self.keys_pressed.clone(),
        }
    }
}

#[derive(Debug, Default)]
pub struct InputState {
    cursor: Option<(f64, f64)>,
    delta: (f64, f64),
    scroll: f32,
    left: ButtonState,
    right: ButtonState,
    middle: ButtonState,
    shift: bool,
    keys_pressed: Vec<KeyCode>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a window event. Returns true if the event was an input event.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor_moved(position.x, position.y);
                true
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                true
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.mouse_button(*button, *state == ElementState::Pressed);
                true
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(PhysicalPosition { y, .. }) => *y as f32 / 40.0,
                };
                self.scroll(lines);
                true
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.shift = modifiers.state().shift_key();
                true
            }
            WindowEvent::KeyboardInput { event, .. } => {
                self.keyboard(event);
                true
            }
            WindowEvent::Focused(false) => {
                self.release_all();
                false
            }
            _ => false,
        }
    }

    fn keyboard(&mut self, event: &KeyEvent) {
        if let PhysicalKey::Code(code) = event.physical_key {
            self.key(code, event.state == ElementState::Pressed, event.repeat);
        }
    }

    pub fn cursor_moved(&mut self, x: f64, y: f64) {
        if let Some((px, py)) = self.cursor {
            self.delta.0 += x - px;
            self.delta.1 += y - py;
        }
        self.cursor = Some((x, y));
    }

    pub fn mouse_button(&mut self, button: MouseButton, pressed: bool) {
        match button {
            MouseButton::Left => self.left.set(pressed),
            MouseButton::Right => self.right.set(pressed),
            MouseButton::Middle => self.middle.set(pressed),
            _ => {}
        }
    }

    pub fn scroll(&mut self, lines: f32) {
        self.scroll += lines;
    }

    pub fn key(&mut self, key: KeyCode, pressed: bool, repeat: bool) {
        if matches!(key, KeyCode::ShiftLeft | KeyCode::ShiftRight) {
            self.shift = pressed;
        }
        if pressed && !repeat && !self.keys_pressed.contains(&key) {
            self.keys_pressed.push(key);
        }
    }

    fn release_all(&mut self) {
        self.left.set(false);
        self.right.set(false);
        self.middle.set(false);
        self.shift = false;
    }

    /// Takes this frame's input and resets edges and deltas.
    pub fn snapshot(&mut self) -> FrameInput {
        let frame = FrameInput {
            cursor: self.cursor.unwrap_or((-1.0, -1.0)),
            cursor_delta: self.delta,
            scroll: self.scroll,
            left: self.left,
            right: self.right,
            middle: self.middle,
            shift: self.shift,
            keys_pressed: std::mem::take(&mut self.keys_pressed),
        };

        self.delta = (0.0, 0.0);
        self.scroll = 0.0;
        self.left.end_frame();
        self.right.end_frame();
        self.middle.end_frame();
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edges_last_one_frame() {
        let mut input = InputState::new();
        input.mouse_button(MouseButton::Left, true);

        let frame = input.snapshot();
        assert!(frame.left.pressed && frame.left.down);

        let frame = input.snapshot();
        assert!(!frame.left.pressed && frame.left.down);

        input.mouse_button(MouseButton::Left, false);
        let frame = input.snapshot();
        assert!(frame.left.released && !frame.left.down);
    }

    #[test]
    fn test_click_within_one_frame_keeps_both_edges() {
        let mut input = InputState::new();
        input.mouse_button(MouseButton::Left, true);
        input.mouse_button(MouseButton::Left, false);
        let frame = input.snapshot();
        assert!(frame.left.pressed && frame.left.released && !frame.left.down);
    }

    #[test]
    fn test_cursor_delta_accumulates() {
        let mut input = InputState::new();
        input.cursor_moved(10.0, 10.0);
        input.cursor_moved(13.0, 8.0);
        input.cursor_moved(15.0, 9.0);

        let frame = input.snapshot();
        assert_eq!(frame.cursor, (15.0, 9.0));
        assert_eq!(frame.cursor_delta, (5.0, -1.0));
        assert_eq!(input.snapshot().cursor_delta, (0.0, 0.0));
    }

    #[test]
    fn test_unknown_cursor_is_off_window() {
        let mut input = InputState::new();
        assert_eq!(input.snapshot().cursor, (-1.0, -1.0));
    }

    #[test]
    fn test_key_presses_ignore_repeats() {
        let mut input = InputState::new();
        input.key(KeyCode::KeyV, true, false);
        input.key(KeyCode::KeyV, true, true);
        input.key(KeyCode::ShiftLeft, true, false);

        let frame = input.snapshot();
        assert!(frame.key_pressed(KeyCode::KeyV));
        assert!(frame.shift);
        assert_eq!(frame.keys_pressed.len(), 2);
        assert!(input.snapshot().keys_pressed.is_empty());
    }
}
