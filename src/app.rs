use std::time::Instant;

use glam::{Mat4, Vec2, Vec3};
use log::{debug, info};

use crate::camera::{CameraSettings, FreeLookCamera};
use crate::input::{InputState, KeyBindings, KeyCode, NamedKey};

/// Measures the time between rendered frames.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last_frame: Option<Instant>,
    delta: f32,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last_frame: None,
            delta: 0.0,
        }
    }

    /// Samples the wall clock. The very first tick reports zero.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        self.delta = self
            .last_frame
            .map(|last| now.duration_since(last).as_secs_f32())
            .unwrap_or(0.0);
        self.last_frame = Some(now);
        self.delta
    }

    /// Feeds an explicit frame delta, for replays and tests.
    pub fn advance(&mut self, seconds: f32) -> f32 {
        self.delta = seconds.max(0.0);
        self.delta
    }

    pub fn delta(&self) -> f32 {
        self.delta
    }
}

/// Spot light carried by the camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Flashlight {
    pub position: Vec3,
    pub direction: Vec3,
    /// Cosine of the full-intensity cone half-angle.
    pub inner_cutoff: f32,
    /// Cosine of the outer fade-out half-angle.
    pub outer_cutoff: f32,
    /// Constant, linear and quadratic attenuation terms.
    pub attenuation: Vec3,
}

impl Flashlight {
    fn follow(camera: &FreeLookCamera) -> Self {
        Self {
            position: camera.position(),
            direction: camera.front(),
            inner_cutoff: 12f32.to_radians().cos(),
            outer_cutoff: 17f32.to_radians().cos(),
            attenuation: Vec3::new(1.0, 0.09, 0.032),
        }
    }
}

/// Per-frame values the renderer uploads as uniforms.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameGlobals {
    pub view: Mat4,
    pub projection: Mat4,
    pub camera_position: Vec3,
    pub camera_front: Vec3,
    pub flashlight: Option<Flashlight>,
}

/// Owns the camera and translates host input into camera calls.
///
/// The host forwards window events through the `key_*`, `cursor_moved`,
/// `scrolled`, `resized` and `focus_changed` methods, then calls
/// [`update`](Self::update) once per frame.
#[derive(Debug, Clone)]
pub struct FlyController {
    camera: FreeLookCamera,
    input: InputState,
    bindings: KeyBindings,
    zoom_sensitivity: f32,
    flashlight_on: bool,
    exit_requested: bool,
}

impl FlyController {
    pub fn new(width: f32, height: f32, settings: &CameraSettings) -> Self {
        Self {
            camera: FreeLookCamera::with_settings(width, height, settings),
            input: InputState::new(),
            bindings: KeyBindings::default(),
            zoom_sensitivity: settings.zoom_sensitivity,
            flashlight_on: false,
            exit_requested: false,
        }
    }

    pub fn with_bindings(mut self, bindings: KeyBindings) -> Self {
        self.bindings = bindings;
        self
    }

    pub fn key_pressed(&mut self, key: KeyCode) {
        if !self.input.set_key_down(key) {
            return;
        }
        match key {
            KeyCode::Named(NamedKey::Escape) => {
                info!("exit requested");
                self.exit_requested = true;
            }
            KeyCode::Character('F') => {
                self.flashlight_on = !self.flashlight_on;
                info!(
                    "flashlight {}",
                    if self.flashlight_on { "on" } else { "off" }
                );
            }
            _ => {}
        }
    }

    pub fn key_released(&mut self, key: KeyCode) {
        self.input.set_key_up(key);
    }

    pub fn cursor_moved(&mut self, x: f32, y: f32) {
        self.input.set_cursor_position(Vec2::new(x, y));
        self.camera.process_look(x, y, true);
    }

    /// Relative pointer motion from a grabbed mouse. Drives the same look
    /// path as [`cursor_moved`](Self::cursor_moved) through a virtual cursor,
    /// so turning is not limited by the window edges.
    pub fn pointer_moved_by(&mut self, dx: f32, dy: f32) {
        let position = self.input.move_cursor_by(Vec2::new(dx, dy));
        self.camera.process_look(position.x, position.y, true);
    }

    pub fn scrolled(&mut self, amount: f32) {
        self.input.add_scroll(amount);
    }

    pub fn resized(&mut self, width: f32, height: f32) {
        debug!("viewport resized to {width}x{height}");
        self.camera.set_viewport(width, height);
    }

    /// Losing focus releases held keys; regaining it re-arms the cursor
    /// baseline so the pointer's re-entry point does not spin the view.
    pub fn focus_changed(&mut self, focused: bool) {
        if focused {
            self.camera.reset_cursor();
        } else {
            self.input.release_all();
        }
    }

    /// Applies held movement keys and pending scroll for one frame.
    pub fn update(&mut self, elapsed_seconds: f32) {
        for movement in self.bindings.held_movements(&self.input) {
            self.camera.process_movement(movement, elapsed_seconds);
        }
        let scroll = self.input.take_scroll();
        if scroll != 0.0 {
            self.camera.process_zoom(scroll, self.zoom_sensitivity);
        }
    }

    pub fn frame_globals(&self) -> FrameGlobals {
        FrameGlobals {
            view: self.camera.view_matrix(),
            projection: self.camera.projection_matrix(),
            camera_position: self.camera.position(),
            camera_front: self.camera.front(),
            flashlight: self
                .flashlight_on
                .then(|| Flashlight::follow(&self.camera)),
        }
    }

    pub fn camera(&self) -> &FreeLookCamera {
        &self.camera
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn flashlight_on(&self) -> bool {
        self.flashlight_on
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraMovement;

    fn controller() -> FlyController {
        FlyController::new(800.0, 600.0, &CameraSettings::default())
    }

    #[test]
    fn clock_first_tick_is_zero() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.tick(), 0.0);
        assert!(clock.tick() >= 0.0);
        assert_eq!(clock.advance(-1.0), 0.0);
        assert_eq!(clock.advance(0.25), 0.25);
        assert_eq!(clock.delta(), 0.25);
    }

    #[test]
    fn held_keys_move_the_camera_each_update() {
        let mut app = controller();
        app.key_pressed(KeyCode::Character('W'));
        app.update(1.0);
        app.update(1.0);
        assert!((app.camera().position() - Vec3::new(0.0, 0.0, -2.0)).length() < 1e-4);

        app.key_released(KeyCode::Character('W'));
        app.update(1.0);
        assert!((app.camera().position() - Vec3::new(0.0, 0.0, -2.0)).length() < 1e-4);
    }

    #[test]
    fn custom_bindings_replace_the_defaults() {
        let mut bindings = KeyBindings::default();
        bindings.clear(CameraMovement::Forward);
        bindings.bind(KeyCode::Named(NamedKey::Up), CameraMovement::Forward);
        let mut app = controller().with_bindings(bindings);

        app.key_pressed(KeyCode::Character('W'));
        app.update(1.0);
        assert_eq!(app.camera().position(), Vec3::new(0.0, 0.0, 3.0));

        app.key_pressed(KeyCode::Named(NamedKey::Up));
        app.update(1.0);
        assert!((app.camera().position() - Vec3::new(0.0, 0.0, 0.5)).length() < 1e-4);
    }

    #[test]
    fn scroll_zooms_with_configured_sensitivity() {
        let mut app = controller();
        app.scrolled(2.0);
        app.scrolled(2.0);
        assert_eq!(app.camera().field_of_view(), 45.0);
        app.update(0.0);
        assert_eq!(app.camera().field_of_view(), 44.0);
    }

    #[test]
    fn cursor_drives_look_after_baseline() {
        let mut app = controller();
        app.cursor_moved(400.0, 300.0);
        assert_eq!(app.camera().yaw(), -90.0);
        app.cursor_moved(410.0, 300.0);
        assert!((app.camera().yaw() + 89.2).abs() < 1e-4);
        assert_eq!(app.input().cursor_position(), Some(Vec2::new(410.0, 300.0)));
    }

    #[test]
    fn pointer_motion_can_turn_all_the_way_around() {
        let mut app = controller();
        app.pointer_moved_by(0.0, 0.0);
        // 4500 px at 0.08 deg/px is a full 360 degree turn
        for _ in 0..45 {
            app.pointer_moved_by(100.0, 0.0);
        }
        assert!((app.camera().yaw() - 270.0).abs() < 1e-2);
        assert!((app.camera().front() - Vec3::NEG_Z).length() < 1e-3);

        app.pointer_moved_by(0.0, -5000.0);
        assert_eq!(app.camera().pitch(), 89.0);
    }

    #[test]
    fn pointer_motion_after_refocus_sets_a_new_baseline() {
        let mut app = controller();
        app.pointer_moved_by(0.0, 0.0);
        app.pointer_moved_by(10.0, 0.0);
        app.focus_changed(true);
        app.pointer_moved_by(500.0, 0.0);
        assert!((app.camera().yaw() + 89.2).abs() < 1e-4);
        app.pointer_moved_by(10.0, 0.0);
        assert!((app.camera().yaw() + 88.4).abs() < 1e-4);
    }

    #[test]
    fn flashlight_toggles_on_press_not_repeat() {
        let mut app = controller();
        app.key_pressed(KeyCode::Character('F'));
        app.key_pressed(KeyCode::Character('F'));
        assert!(app.flashlight_on());
        let light = app.frame_globals().flashlight.unwrap();
        assert_eq!(light.position, app.camera().position());
        assert_eq!(light.direction, app.camera().front());
        assert!(light.inner_cutoff > light.outer_cutoff);

        app.key_released(KeyCode::Character('F'));
        app.key_pressed(KeyCode::Character('F'));
        assert!(!app.flashlight_on());
        assert!(app.frame_globals().flashlight.is_none());
    }

    #[test]
    fn escape_requests_exit() {
        let mut app = controller();
        assert!(!app.exit_requested());
        app.key_pressed(KeyCode::Named(NamedKey::Escape));
        assert!(app.exit_requested());
    }

    #[test]
    fn losing_focus_releases_keys_and_regaining_resets_cursor() {
        let mut app = controller();
        app.key_pressed(KeyCode::Character('D'));
        app.cursor_moved(100.0, 100.0);
        app.focus_changed(false);
        app.update(1.0);
        assert_eq!(app.camera().position(), Vec3::new(0.0, 0.0, 3.0));

        app.focus_changed(true);
        app.cursor_moved(700.0, 10.0);
        assert_eq!(app.camera().yaw(), -90.0);
    }

    #[test]
    fn frame_globals_follow_resize() {
        let mut app = controller();
        app.resized(1000.0, 500.0);
        let globals = app.frame_globals();
        assert_eq!(app.camera().aspect_ratio(), 2.0);
        assert_eq!(globals.projection, app.camera().projection_matrix());
        assert_eq!(globals.view, app.camera().view_matrix());
    }
}
