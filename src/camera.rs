use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Lowest field of view reachable by zooming, in degrees.
pub const MIN_FOV: f32 = 5.0;
/// Widest field of view, also the default.
pub const MAX_FOV: f32 = 45.0;
/// Pitch limit in degrees; keeps `front` away from `world_up`.
pub const PITCH_LIMIT: f32 = 89.0;

/// Direction of a keyboard-driven camera displacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CameraMovement {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
}

impl CameraMovement {
    pub const ALL: [Self; 6] = [
        Self::Forward,
        Self::Backward,
        Self::Left,
        Self::Right,
        Self::Up,
        Self::Down,
    ];

    /// Lower-case name used by scene files (`forward`, `left`...).
    pub fn name(self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Backward => "backward",
            Self::Left => "left",
            Self::Right => "right",
            Self::Up => "up",
            Self::Down => "down",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|movement| movement.name() == name)
    }
}

/// Starting pose and tuning for a [`FreeLookCamera`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub position: Vec3,
    /// Degrees from +X in the XZ plane. `-90` looks down -Z.
    pub yaw: f32,
    pub pitch: f32,
    pub fov: f32,
    /// World units per second.
    pub speed: f32,
    /// Degrees per pixel of cursor travel.
    pub sensitivity: f32,
    /// Degrees of field of view per scroll unit.
    pub zoom_sensitivity: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 3.0),
            yaw: -90.0,
            pitch: 0.0,
            fov: MAX_FOV,
            speed: 2.5,
            sensitivity: 0.08,
            zoom_sensitivity: 0.25,
            near: 0.1,
            far: 100.0,
        }
    }
}

/// First-person camera driven by keyboard displacement, cursor look and
/// scroll zoom.
///
/// `front`, `right` and `up` are always recomputed together from yaw and
/// pitch, so they stay an orthonormal basis as long as pitch is kept inside
/// [`PITCH_LIMIT`].
#[derive(Debug, Clone, PartialEq)]
pub struct FreeLookCamera {
    position: Vec3,
    yaw: f32,
    pitch: f32,
    front: Vec3,
    right: Vec3,
    up: Vec3,
    world_up: Vec3,
    fov: f32,
    viewport: (f32, f32),
    speed: f32,
    sensitivity: f32,
    near: f32,
    far: f32,
    last_cursor: Option<(f32, f32)>,
}

impl FreeLookCamera {
    /// Creates a camera at the default pose for the given viewport.
    pub fn new(viewport_width: f32, viewport_height: f32) -> Self {
        Self::with_settings(viewport_width, viewport_height, &CameraSettings::default())
    }

    /// Creates a camera from explicit settings. Pitch and field of view are
    /// clamped into their valid ranges.
    pub fn with_settings(
        viewport_width: f32,
        viewport_height: f32,
        settings: &CameraSettings,
    ) -> Self {
        let mut camera = Self {
            position: settings.position,
            yaw: settings.yaw,
            pitch: settings.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT),
            front: Vec3::NEG_Z,
            right: Vec3::X,
            up: Vec3::Y,
            world_up: Vec3::Y,
            fov: settings.fov.clamp(MIN_FOV, MAX_FOV),
            viewport: (viewport_width, viewport_height),
            speed: settings.speed,
            sensitivity: settings.sensitivity,
            near: settings.near,
            far: settings.far,
            last_cursor: None,
        };
        camera.update_vectors();
        camera
    }

    /// Moves the eye along the camera basis. Orientation is untouched.
    pub fn process_movement(&mut self, direction: CameraMovement, elapsed_seconds: f32) {
        let velocity = self.speed * elapsed_seconds;
        let offset = match direction {
            CameraMovement::Forward => self.front,
            CameraMovement::Backward => -self.front,
            CameraMovement::Right => self.right,
            CameraMovement::Left => -self.right,
            CameraMovement::Up => self.up,
            CameraMovement::Down => -self.up,
        };
        self.position += offset * velocity;
    }

    /// Rotates the camera from an absolute cursor position.
    ///
    /// The first call after construction (or [`reset_cursor`]) only records
    /// the cursor so an arbitrary starting position does not cause a jump.
    ///
    /// [`reset_cursor`]: Self::reset_cursor
    pub fn process_look(&mut self, cursor_x: f32, cursor_y: f32, constrain_pitch: bool) {
        let Some((last_x, last_y)) = self.last_cursor.replace((cursor_x, cursor_y)) else {
            return;
        };

        // window y grows downward
        let dx = (cursor_x - last_x) * self.sensitivity;
        let dy = (last_y - cursor_y) * self.sensitivity;

        self.yaw += dx;
        self.pitch += dy;
        if constrain_pitch {
            self.pitch = self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        }
        self.update_vectors();
    }

    /// Narrows (positive scroll) or widens the field of view.
    pub fn process_zoom(&mut self, scroll_amount: f32, sensitivity: f32) {
        self.fov = (self.fov - scroll_amount * sensitivity).clamp(MIN_FOV, MAX_FOV);
    }

    /// Forgets the last cursor position; the next look call sets a baseline.
    pub fn reset_cursor(&mut self) {
        self.last_cursor = None;
    }

    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.viewport = (width, height);
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov.to_radians(), self.aspect_ratio(), self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn aspect_ratio(&self) -> f32 {
        let (width, height) = self.viewport;
        if height <= 0.0 {
            1.0
        } else {
            width / height
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn front(&self) -> Vec3 {
        self.front
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn world_up(&self) -> Vec3 {
        self.world_up
    }

    pub fn field_of_view(&self) -> f32 {
        self.fov
    }

    pub fn viewport(&self) -> (f32, f32) {
        self.viewport
    }

    fn update_vectors(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        let front = Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos());
        self.front = front.normalize();
        // up comes from right x front, not world_up, so it stays orthogonal
        // to front near the pitch limit
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
    }
}
