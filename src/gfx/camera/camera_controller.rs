use std::collections::HashSet;

use winit::{
    dpi::{PhysicalPosition, PhysicalSize},
    event::{DeviceEvent, ElementState, KeyEvent, MouseScrollDelta, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use super::camera_utils::CameraMovement;

/// Pixels treated as one scroll "line" for touchpads reporting pixel deltas.
const PIXELS_PER_SCROLL_LINE: f32 = 20.0;

/// Everything the frame loop needs from one round of input polling.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameInput {
    /// Directions held down this frame.
    pub movements: Vec<CameraMovement>,
    /// Speed boost (Shift) held.
    pub boost: bool,
    /// Accumulated mouse motion since the last poll; positive y looks up.
    pub look_delta: (f32, f32),
    /// Accumulated scroll lines since the last poll; positive zooms in.
    pub scroll: f32,
    /// Latest viewport size if the window was resized since the last poll.
    pub resized: Option<(u32, u32)>,
    /// Window close or ESC observed.
    pub close_requested: bool,
}

/// Accumulates winit events between frames.
///
/// Held keys persist across polls; deltas, resize and scroll are drained by
/// [`InputState::poll`]. Raw mouse motion is ignored while the window is
/// unfocused.
#[derive(Debug, Default)]
pub struct InputState {
    unfocused: bool,
    held: HashSet<CameraMovement>,
    boost: bool,
    look_delta: (f64, f64),
    scroll: f32,
    resized: Option<(u32, u32)>,
    close_requested: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process_window_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key_code),
                        state,
                        ..
                    },
                ..
            } => self.process_key(*key_code, *state),
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, scroll) => *scroll,
                    MouseScrollDelta::PixelDelta(PhysicalPosition { y: scroll, .. }) => {
                        *scroll as f32 / PIXELS_PER_SCROLL_LINE
                    }
                };
                self.process_scroll(lines);
            }
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                self.resized = Some((*width, *height));
            }
            WindowEvent::CloseRequested => {
                self.close_requested = true;
            }
            WindowEvent::Focused(true) => self.unfocused = false,
            WindowEvent::Focused(false) => {
                // Key releases are lost while unfocused.
                self.unfocused = true;
                self.held.clear();
                self.boost = false;
                self.look_delta = (0.0, 0.0);
            }
            _ => (),
        }
    }

    pub fn process_device_event(&mut self, event: &DeviceEvent) {
        // Device events arrive regardless of which window has focus.
        match event {
            DeviceEvent::MouseMotion { delta } if !self.unfocused => {
                self.process_mouse_motion(delta.0, delta.1)
            }
            _ => (),
        }
    }

    pub fn process_key(&mut self, key_code: KeyCode, state: ElementState) {
        let pressed = state == ElementState::Pressed;

        let movement = match key_code {
            KeyCode::KeyW => Some(CameraMovement::Forward),
            KeyCode::KeyS => Some(CameraMovement::Backward),
            KeyCode::KeyA => Some(CameraMovement::Left),
            KeyCode::KeyD => Some(CameraMovement::Right),
            KeyCode::KeyE | KeyCode::Space => Some(CameraMovement::Up),
            KeyCode::KeyQ | KeyCode::ControlLeft => Some(CameraMovement::Down),
            KeyCode::ShiftLeft | KeyCode::ShiftRight => {
                self.boost = pressed;
                None
            }
            KeyCode::Escape => {
                if pressed {
                    self.close_requested = true;
                }
                None
            }
            _ => None,
        };

        if let Some(movement) = movement {
            if pressed {
                self.held.insert(movement);
            } else {
                self.held.remove(&movement);
            }
        }
    }

    /// Raw device motion; screen y grows downward so it is inverted here.
    pub fn process_mouse_motion(&mut self, delta_x: f64, delta_y: f64) {
        self.look_delta.0 += delta_x;
        self.look_delta.1 -= delta_y;
    }

    pub fn process_scroll(&mut self, lines: f32) {
        self.scroll += lines;
    }

    pub fn close_requested(&self) -> bool {
        self.close_requested
    }

    /// Drains accumulated input into a [`FrameInput`].
    pub fn poll(&mut self) -> FrameInput {
        let movements = CameraMovement::ALL
            .iter()
            .copied()
            .filter(|movement| self.held.contains(movement))
            .collect();

        let look_delta = std::mem::take(&mut self.look_delta);

        FrameInput {
            movements,
            boost: self.boost,
            look_delta: (look_delta.0 as f32, look_delta.1 as f32),
            scroll: std::mem::take(&mut self.scroll),
            resized: self.resized.take(),
            close_requested: self.close_requested,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_held_keys_persist_and_deltas_drain() {
        let mut input = InputState::new();
        input.process_key(KeyCode::KeyW, ElementState::Pressed);
        input.process_key(KeyCode::KeyD, ElementState::Pressed);
        input.process_mouse_motion(4.0, 2.0);
        input.process_mouse_motion(1.0, 1.0);
        input.process_scroll(1.5);

        let first = input.poll();
        assert_eq!(
            first.movements,
            vec![CameraMovement::Forward, CameraMovement::Right]
        );
        assert_eq!(first.look_delta, (5.0, -3.0));
        assert_eq!(first.scroll, 1.5);

        let second = input.poll();
        assert_eq!(second.movements.len(), 2);
        assert_eq!(second.look_delta, (0.0, 0.0));
        assert_eq!(second.scroll, 0.0);

        input.process_key(KeyCode::KeyW, ElementState::Released);
        assert_eq!(input.poll().movements, vec![CameraMovement::Right]);
    }

    #[test]
    fn test_shift_sets_boost() {
        let mut input = InputState::new();
        input.process_key(KeyCode::ShiftLeft, ElementState::Pressed);
        assert!(input.poll().boost);
        input.process_key(KeyCode::ShiftLeft, ElementState::Released);
        assert!(!input.poll().boost);
    }

    #[test]
    fn test_escape_and_close_request_termination() {
        let mut input = InputState::new();
        assert!(!input.poll().close_requested);
        input.process_key(KeyCode::Escape, ElementState::Pressed);
        assert!(input.poll().close_requested);

        let mut input = InputState::new();
        input.process_window_event(&WindowEvent::CloseRequested);
        assert!(input.close_requested());
    }

    #[test]
    fn test_resize_is_reported_once() {
        let mut input = InputState::new();
        input.process_window_event(&WindowEvent::Resized(PhysicalSize::new(640, 480)));
        input.process_window_event(&WindowEvent::Resized(PhysicalSize::new(800, 600)));
        assert_eq!(input.poll().resized, Some((800, 600)));
        assert_eq!(input.poll().resized, None);
    }

    #[test]
    fn test_focus_loss_releases_keys() {
        let mut input = InputState::new();
        input.process_key(KeyCode::KeyS, ElementState::Pressed);
        input.process_window_event(&WindowEvent::Focused(false));
        assert!(input.poll().movements.is_empty());
    }

    #[test]
    fn test_mouse_motion_is_ignored_while_unfocused() {
        let motion = DeviceEvent::MouseMotion { delta: (3.0, 4.0) };
        let mut input = InputState::new();
        input.process_device_event(&motion);
        assert_eq!(input.poll().look_delta, (3.0, -4.0));

        input.process_window_event(&WindowEvent::Focused(false));
        input.process_device_event(&motion);
        assert_eq!(input.poll().look_delta, (0.0, 0.0));

        input.process_window_event(&WindowEvent::Focused(true));
        input.process_device_event(&motion);
        assert_eq!(input.poll().look_delta, (3.0, -4.0));
    }
}
