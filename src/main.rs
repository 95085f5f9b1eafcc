use std::any::Any;
use std::env;
use std::fmt;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use log::{error, info, warn};
use pollster::block_on;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{DeviceEvent, DeviceId, ElementState, KeyEvent, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode as WinitKey, PhysicalKey};
use winit::window::{CursorGrabMode, Window, WindowId};

use freelook::{
    parse_replay, run_replay, FlyController, FrameClock, KeyCode, NamedKey, Renderer,
    ReplayCommand, Scene,
};

const WINDOW_WIDTH: u32 = 1200;
const WINDOW_HEIGHT: u32 = 800;
/// Scroll units reported per line for pixel-precise wheels.
const PIXELS_PER_LINE: f64 = 40.0;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;
    let scene = match &options.scene_path {
        Some(path) => {
            let xml =
                fs::read_to_string(path).with_context(|| format!("failed to read scene {path}"))?;
            Scene::from_xml(&xml).with_context(|| format!("failed to parse scene {path}"))?
        }
        None => Scene::demo(),
    };
    let replay = match &options.replay_path {
        Some(path) => {
            let script = fs::read_to_string(path)
                .with_context(|| format!("failed to read replay {path}"))?;
            parse_replay(&script).with_context(|| format!("failed to parse replay {path}"))?
        }
        None => Vec::new(),
    };

    println!(
        "Loaded scene with {} objects ({} lights)",
        scene.objects.len(),
        scene.lights.len()
    );
    for object in &scene.objects {
        println!(" - {}", object.name);
    }

    if options.summary_only {
        return run_headless(&scene, &replay);
    }
    match run_interactive(&scene, &replay) {
        Ok(()) => Ok(()),
        Err(err) => {
            if err.downcast_ref::<WindowInitError>().is_some() {
                eprintln!(
                    "{err}. Falling back to --summary-only mode (set DISPLAY or install X11 libs to enable rendering)."
                );
                run_headless(&scene, &replay)
            } else {
                Err(err)
            }
        }
    }
}

fn run_headless(scene: &Scene, replay: &[ReplayCommand]) -> Result<()> {
    let mut controller = controller_for(scene);
    if !replay.is_empty() {
        let frames = run_replay(&mut controller, &mut FrameClock::new(), replay);
        println!("Replayed {frames} frame(s)");
    }
    print_camera_state(&controller);
    Ok(())
}

fn run_interactive(scene: &Scene, replay: &[ReplayCommand]) -> Result<()> {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
    panic::set_hook(default_hook);
    let event_loop = event_loop
        .map_err(|panic| WindowInitError::from_panic("event loop", panic))?
        .map_err(|err| WindowInitError::from_error("event loop", err))?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut controller = controller_for(scene);
    let mut clock = FrameClock::new();
    if !replay.is_empty() {
        let frames = run_replay(&mut controller, &mut clock, replay);
        info!("replayed {frames} frame(s) before opening the window");
    }

    let mut app = AppState {
        scene: scene.clone(),
        controller,
        clock,
        renderer: None,
        focused: true,
        last_error: None,
    };
    event_loop
        .run_app(&mut app)
        .context("event loop terminated abnormally")?;

    if let Some(err) = app.last_error {
        return Err(err);
    }
    print_camera_state(&app.controller);
    Ok(())
}

fn controller_for(scene: &Scene) -> FlyController {
    FlyController::new(WINDOW_WIDTH as f32, WINDOW_HEIGHT as f32, &scene.camera)
        .with_bindings(scene.bindings.clone())
}

fn print_camera_state(controller: &FlyController) {
    let camera = controller.camera();
    let position = camera.position();
    println!(
        "Camera pos=({:.2}, {:.2}, {:.2}) yaw={:.2} pitch={:.2} fov={:.2}",
        position.x,
        position.y,
        position.z,
        camera.yaw(),
        camera.pitch(),
        camera.field_of_view()
    );
}

struct AppState {
    scene: Scene,
    controller: FlyController,
    clock: FrameClock,
    renderer: Option<Renderer>,
    focused: bool,
    last_error: Option<anyhow::Error>,
}

impl AppState {
    fn create_renderer(&mut self, event_loop: &ActiveEventLoop) -> Result<Renderer> {
        let attributes = Window::default_attributes()
            .with_title("Freelook")
            .with_inner_size(LogicalSize::new(WINDOW_WIDTH, WINDOW_HEIGHT));
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .map_err(|err| WindowInitError::from_error("window", err))?,
        );
        capture_cursor(&window);

        let size = window.inner_size();
        self.controller
            .resized(size.width as f32, size.height as f32);
        let renderer = block_on(Renderer::new(Arc::clone(&window), &self.scene))?;
        window.request_redraw();
        Ok(renderer)
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let elapsed = self.clock.tick();
        self.controller.update(elapsed);
        if self.controller.exit_requested() {
            event_loop.exit();
            return Ok(());
        }

        let Some(renderer) = self.renderer.as_mut() else {
            return Ok(());
        };
        renderer.update_globals(&self.controller.frame_globals(), &self.scene);
        match renderer.render() {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = renderer.window().inner_size();
                renderer.resize(size);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                return Err(anyhow!("GPU is out of memory"));
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("Surface timeout; retrying next frame");
            }
            Err(err) => {
                warn!("Surface error {err}; retrying next frame");
            }
        }
        Ok(())
    }

    fn handle_keyboard(&mut self, event: &KeyEvent) {
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        let Some(key) = map_keycode(code) else {
            return;
        };
        match event.state {
            ElementState::Pressed => self.controller.key_pressed(key),
            ElementState::Released => self.controller.key_released(key),
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        error!("{err:?}");
        self.last_error = Some(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_some() {
            return;
        }
        match self.create_renderer(event_loop) {
            Ok(renderer) => self.renderer = Some(renderer),
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        if window_id != renderer.window_id() {
            return;
        }
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                renderer.resize(size);
                self.controller
                    .resized(size.width as f32, size.height as f32);
            }
            WindowEvent::Focused(focused) => {
                if focused {
                    capture_cursor(renderer.window());
                }
                self.focused = focused;
                self.controller.focus_changed(focused);
            }
            WindowEvent::KeyboardInput { event, .. } => {
                self.handle_keyboard(&event);
                if self.controller.exit_requested() {
                    event_loop.exit();
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let amount = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(offset) => (offset.y / PIXELS_PER_LINE) as f32,
                };
                self.controller.scrolled(amount);
            }
            WindowEvent::RedrawRequested => {
                if let Err(err) = self.redraw(event_loop) {
                    self.fail(event_loop, err);
                }
            }
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        if self.renderer.is_none() || !self.focused {
            return;
        }
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            self.controller.pointer_moved_by(dx as f32, dy as f32);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(renderer) = &self.renderer {
            renderer.window().request_redraw();
        }
    }
}

fn capture_cursor(window: &Window) {
    let grabbed = window
        .set_cursor_grab(CursorGrabMode::Locked)
        .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
    if let Err(err) = grabbed {
        warn!("unable to grab cursor: {err}");
    }
    window.set_cursor_visible(false);
}

#[derive(Debug)]
struct WindowInitError {
    message: String,
}

impl WindowInitError {
    fn from_panic(stage: &str, panic: Box<dyn Any + Send>) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {}", panic_message(panic)),
        }
    }

    fn from_error(stage: &str, err: impl fmt::Display) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {err}"),
        }
    }
}

impl fmt::Display for WindowInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WindowInitError {}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}

fn map_keycode(code: WinitKey) -> Option<KeyCode> {
    Some(match code {
        WinitKey::Space => KeyCode::Named(NamedKey::Space),
        WinitKey::Enter => KeyCode::Named(NamedKey::Enter),
        WinitKey::Tab => KeyCode::Named(NamedKey::Tab),
        WinitKey::ArrowLeft => KeyCode::Named(NamedKey::Left),
        WinitKey::ArrowRight => KeyCode::Named(NamedKey::Right),
        WinitKey::ArrowUp => KeyCode::Named(NamedKey::Up),
        WinitKey::ArrowDown => KeyCode::Named(NamedKey::Down),
        WinitKey::Escape => KeyCode::Named(NamedKey::Escape),
        WinitKey::ShiftLeft => KeyCode::Named(NamedKey::LeftShift),
        WinitKey::ShiftRight => KeyCode::Named(NamedKey::RightShift),
        WinitKey::ControlLeft => KeyCode::Named(NamedKey::LeftCtrl),
        WinitKey::ControlRight => KeyCode::Named(NamedKey::RightCtrl),
        WinitKey::AltLeft => KeyCode::Named(NamedKey::LeftAlt),
        WinitKey::AltRight => KeyCode::Named(NamedKey::RightAlt),
        WinitKey::Digit0 => KeyCode::Digit(0),
        WinitKey::Digit1 => KeyCode::Digit(1),
        WinitKey::Digit2 => KeyCode::Digit(2),
        WinitKey::Digit3 => KeyCode::Digit(3),
        WinitKey::Digit4 => KeyCode::Digit(4),
        WinitKey::Digit5 => KeyCode::Digit(5),
        WinitKey::Digit6 => KeyCode::Digit(6),
        WinitKey::Digit7 => KeyCode::Digit(7),
        WinitKey::Digit8 => KeyCode::Digit(8),
        WinitKey::Digit9 => KeyCode::Digit(9),
        WinitKey::KeyA => KeyCode::Character('A'),
        WinitKey::KeyB => KeyCode::Character('B'),
        WinitKey::KeyC => KeyCode::Character('C'),
        WinitKey::KeyD => KeyCode::Character('D'),
        WinitKey::KeyE => KeyCode::Character('E'),
        WinitKey::KeyF => KeyCode::Character('F'),
        WinitKey::KeyG => KeyCode::Character('G'),
        WinitKey::KeyH => KeyCode::Character('H'),
        WinitKey::KeyI => KeyCode::Character('I'),
        WinitKey::KeyJ => KeyCode::Character('J'),
        WinitKey::KeyK => KeyCode::Character('K'),
        WinitKey::KeyL => KeyCode::Character('L'),
        WinitKey::KeyM => KeyCode::Character('M'),
        WinitKey::KeyN => KeyCode::Character('N'),
        WinitKey::KeyO => KeyCode::Character('O'),
        WinitKey::KeyP => KeyCode::Character('P'),
        WinitKey::KeyQ => KeyCode::Character('Q'),
        WinitKey::KeyR => KeyCode::Character('R'),
        WinitKey::KeyS => KeyCode::Character('S'),
        WinitKey::KeyT => KeyCode::Character('T'),
        WinitKey::KeyU => KeyCode::Character('U'),
        WinitKey::KeyV => KeyCode::Character('V'),
        WinitKey::KeyW => KeyCode::Character('W'),
        WinitKey::KeyX => KeyCode::Character('X'),
        WinitKey::KeyY => KeyCode::Character('Y'),
        WinitKey::KeyZ => KeyCode::Character('Z'),
        WinitKey::F1 => KeyCode::Function(1),
        WinitKey::F2 => KeyCode::Function(2),
        WinitKey::F3 => KeyCode::Function(3),
        WinitKey::F4 => KeyCode::Function(4),
        WinitKey::F5 => KeyCode::Function(5),
        WinitKey::F6 => KeyCode::Function(6),
        WinitKey::F7 => KeyCode::Function(7),
        WinitKey::F8 => KeyCode::Function(8),
        WinitKey::F9 => KeyCode::Function(9),
        WinitKey::F10 => KeyCode::Function(10),
        WinitKey::F11 => KeyCode::Function(11),
        WinitKey::F12 => KeyCode::Function(12),
        _ => return None,
    })
}

struct CliOptions {
    scene_path: Option<String>,
    replay_path: Option<String>,
    summary_only: bool,
}

impl CliOptions {
    const USAGE: &'static str = "Usage: freelook [scene.xml] [--summary-only] [--replay <script>]";

    fn parse() -> Result<Self> {
        Self::parse_from(env::args().skip(1))
    }

    fn parse_from(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut scene_path = None;
        let mut replay_path = None;
        let mut summary_only = false;
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--summary-only" => summary_only = true,
                "--replay" => {
                    let path = args
                        .next()
                        .ok_or_else(|| anyhow!("--replay expects a file. {}", Self::USAGE))?;
                    replay_path = Some(path);
                }
                "--help" | "-h" => return Err(anyhow!(Self::USAGE)),
                other if other.starts_with("--") => {
                    return Err(anyhow!("Unknown argument: {other}. {}", Self::USAGE));
                }
                _ if scene_path.is_none() => scene_path = Some(arg),
                other => {
                    return Err(anyhow!("Unexpected argument: {other}. {}", Self::USAGE));
                }
            }
        }
        Ok(Self {
            scene_path,
            replay_path,
            summary_only,
        })
    }
}
