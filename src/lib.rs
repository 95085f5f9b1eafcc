//! First-person free-look camera and the pieces needed to drive it.
//!
//! [`FreeLookCamera`] is pure math and knows nothing about windows or GPUs.
//! [`FlyController`] owns a camera and turns host input events into camera
//! calls; the host polls it once per frame for the view and projection
//! matrices. The wgpu [`Renderer`] and the binary's winit loop are thin
//! consumers of that surface.

pub mod app;
pub mod camera;
pub mod input;
pub mod render;
pub mod replay;
pub mod scene;

pub use app::{FlyController, Flashlight, FrameClock, FrameGlobals};
pub use camera::{CameraMovement, CameraSettings, FreeLookCamera};
pub use input::{InputState, KeyBindings, KeyCode, NamedKey};
pub use render::Renderer;
pub use replay::{parse_replay, run_replay, ReplayCommand};
pub use scene::{DirectionalLight, Light, Scene, SceneError, SceneObject};
