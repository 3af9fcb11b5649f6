use crate::camera::Camera;
use crate::config::ControlSettings;
use crate::terrain::TerrainField;
use glam::Vec2;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Turns held keys and mouse drags into camera motion, applied between frames.
#[derive(Default)]
pub struct CameraController {
    settings: ControlSettings,

    is_forward_pressed: bool,
    is_backward_pressed: bool,
    is_strafe_left_pressed: bool,
    is_strafe_right_pressed: bool,
    is_turn_left_pressed: bool,
    is_turn_right_pressed: bool,
    is_climb_pressed: bool,
    is_descend_pressed: bool,
    is_horizon_up_pressed: bool,
    is_horizon_down_pressed: bool,
    is_sprint_pressed: bool,
    is_left_mouse_pressed: bool,

    mouse_delta_x: f32,
    mouse_delta_y: f32,
}

impl CameraController {
    pub fn new(settings: ControlSettings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    pub fn process_events(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput { event: key_event, .. } => match key_event.physical_key {
                PhysicalKey::Code(code) => {
                    self.set_key(code, key_event.state == ElementState::Pressed)
                }
                PhysicalKey::Unidentified(_) => false,
            },
            WindowEvent::MouseInput { state, button, .. } => {
                if *button == MouseButton::Left {
                    self.is_left_mouse_pressed = *state == ElementState::Pressed;
                    true
                } else {
                    false
                }
            }
            _ => false,
        }
    }

    /// Records a key transition; returns false for keys the controller ignores.
    pub fn set_key(&mut self, code: KeyCode, pressed: bool) -> bool {
        let flag = match code {
            KeyCode::KeyW => &mut self.is_forward_pressed,
            KeyCode::KeyS => &mut self.is_backward_pressed,
            KeyCode::KeyQ => &mut self.is_strafe_left_pressed,
            KeyCode::KeyE => &mut self.is_strafe_right_pressed,
            KeyCode::KeyA => &mut self.is_turn_left_pressed,
            KeyCode::KeyD => &mut self.is_turn_right_pressed,
            KeyCode::KeyZ => &mut self.is_climb_pressed,
            KeyCode::KeyX => &mut self.is_descend_pressed,
            KeyCode::KeyR => &mut self.is_horizon_up_pressed,
            KeyCode::KeyF => &mut self.is_horizon_down_pressed,
            KeyCode::ShiftLeft => &mut self.is_sprint_pressed,
            _ => return false,
        };
        *flag = pressed;
        true
    }

    pub fn process_mouse_motion(&mut self, delta_x: f64, delta_y: f64) {
        if self.is_left_mouse_pressed {
            self.mouse_delta_x += delta_x as f32;
            self.mouse_delta_y += delta_y as f32;
        }
    }

    pub fn update_camera(&mut self, camera: &mut Camera, terrain: &TerrainField) {
        let s = &self.settings;
        let modifier = if self.is_sprint_pressed { s.sprint_multiplier } else { 1.0 };

        if self.is_turn_left_pressed {
            camera.rotate(-s.turn_speed);
        }
        if self.is_turn_right_pressed {
            camera.rotate(s.turn_speed);
        }
        camera.rotate(self.mouse_delta_x * s.mouse_sensitivity);
        camera.horizon -= self.mouse_delta_y;

        if self.is_horizon_up_pressed {
            camera.horizon += s.horizon_step;
        }
        if self.is_horizon_down_pressed {
            camera.horizon -= s.horizon_step;
        }
        if self.is_climb_pressed {
            camera.height += s.climb_speed * modifier;
        }
        if self.is_descend_pressed {
            camera.height -= s.descend_speed * modifier;
        }

        let mut velocity = Vec2::ZERO;
        if self.is_forward_pressed {
            velocity.y -= 1.0;
        }
        if self.is_backward_pressed {
            velocity.y += 1.0;
        }
        if self.is_strafe_left_pressed {
            velocity.x -= 1.0;
        }
        if self.is_strafe_right_pressed {
            velocity.x += 1.0;
        }
        if velocity != Vec2::ZERO {
            camera.translate(velocity * s.move_speed * modifier);
        }

        if s.gravity {
            camera.height -= s.gravity_force;
        }
        let ground = terrain.sample_height(camera.position.x, camera.position.y);
        camera.height = camera.height.max(ground + s.player_height);

        self.mouse_delta_x = 0.0;
        self.mouse_delta_y = 0.0;
    }
}
