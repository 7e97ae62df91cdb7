use winit::keyboard::KeyCode;

use crate::input::FrameInput;

use super::orbit_camera::OrbitCamera;

/// Maps mouse input to camera motion.
///
/// Right drag orbits, middle or shift+right drag pans, the wheel zooms and
/// Shift+C resets the view. The left button is left to object picking.
#[derive(Debug, Clone, Copy)]
pub struct CameraController {
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new(0.005, 1.0)
    }
}

impl CameraController {
    pub fn new(rotate_speed: f32, zoom_speed: f32) -> Self {
        Self {
            rotate_speed,
            zoom_speed,
            pan_speed: 0.01,
        }
    }

    pub fn set_pan_speed(&mut self, speed: f32) {
        self.pan_speed = speed;
    }

    pub fn is_panning(&self, input: &FrameInput) -> bool {
        input.middle.down || (input.right.down && input.shift)
    }

    pub fn is_rotating(&self, input: &FrameInput) -> bool {
        input.right.down && !input.shift
    }

    /// Applies one frame of input. Returns true if the camera moved.
    pub fn update(&self, input: &FrameInput, camera: &mut OrbitCamera) -> bool {
        let (dx, dy) = (input.cursor_delta.0 as f32, input.cursor_delta.1 as f32);
        let mut moved = false;

        if dx != 0.0 || dy != 0.0 {
            if self.is_panning(input) {
                camera.pan((-dx * self.pan_speed, dy * self.pan_speed));
                moved = true;
            } else if self.is_rotating(input) {
                camera.add_yaw(-dx * self.rotate_speed);
                camera.add_pitch(dy * self.rotate_speed);
                moved = true;
            }
        }

        if input.scroll != 0.0 {
            camera.add_distance(-input.scroll * self.zoom_speed);
            moved = true;
        }

        if input.shift && input.key_pressed(KeyCode::KeyC) {
            log::info!("Camera reset");
            camera.reset_to_default();
            moved = true;
        }

        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ButtonState;
    use cgmath::Vector3;

    fn camera() -> OrbitCamera {
        OrbitCamera::new(10.0, 0.2, 0.0, Vector3::new(0.0, 0.0, 0.0), 1.0)
    }

    fn held() -> ButtonState {
        ButtonState {
            down: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_right_drag_orbits() {
        let controller = CameraController::default();
        let mut camera = camera();
        let input = FrameInput {
            cursor_delta: (40.0, 0.0),
            right: held(),
            ..Default::default()
        };

        assert!(controller.update(&input, &mut camera));
        assert!(camera.yaw < 0.0);
        assert_eq!(camera.target, Vector3::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn test_shift_drag_pans() {
        let controller = CameraController::default();
        let mut camera = camera();
        let input = FrameInput {
            cursor_delta: (40.0, 0.0),
            right: held(),
            shift: true,
            ..Default::default()
        };

        controller.update(&input, &mut camera);
        assert_eq!(camera.yaw, 0.0);
        assert_ne!(camera.target, Vector3::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn test_left_drag_leaves_camera_alone() {
        let controller = CameraController::default();
        let mut camera = camera();
        let input = FrameInput {
            cursor_delta: (40.0, 25.0),
            left: held(),
            ..Default::default()
        };

        assert!(!controller.update(&input, &mut camera));
        assert_eq!(camera.yaw, 0.0);
        assert_eq!(camera.pitch, 0.2);
    }

    #[test]
    fn test_wheel_zooms_in() {
        let controller = CameraController::default();
        let mut camera = camera();
        let input = FrameInput {
            scroll: 1.0,
            ..Default::default()
        };

        controller.update(&input, &mut camera);
        assert!(camera.distance < 10.0);
    }
}
