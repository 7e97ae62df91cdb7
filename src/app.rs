//! Windowed application
//!
//! [`EditorApp`] implements winit's `ApplicationHandler`: it creates the
//! window and the [`RenderEngine`] on resume, feeds window events to the GUI
//! and the input tracker, and on every redraw runs the camera, the editor
//! frame, the GUI overlay and presentation in that order.

use cgmath::Vector3;
use std::{sync::Arc, time::Instant};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::KeyCode,
    window::{Window, WindowAttributes, WindowId},
};

use crate::{
    config::EditorConfig,
    editor::Editor,
    error::{EditorError, Result},
    gfx::{camera::OrbitCameraBounds, CameraController, OrbitCamera, RenderEngine},
    input::{FrameInput, InputState},
    render::RenderBackend,
    ui::{EditorUi, FrameStats, UiManager, ViewSettings},
};

const CAMERA_TARGET: Vector3<f32> = Vector3::new(0.0, 2.5, -3.0);
const CAMERA_DISTANCE: f32 = 14.0;
const CAMERA_PITCH: f32 = 0.35;
const CAMERA_YAW: f32 = 0.3;
/// Longest step handed to physics after a stall (window drag, breakpoint).
const MAX_FRAME_DT: f32 = 0.1;

pub struct EditorApp {
    config: EditorConfig,
    state: Option<AppState>,
    startup_error: Option<EditorError>,
}

struct AppState {
    window: Arc<Window>,
    engine: RenderEngine,
    editor: Editor,
    ui: UiManager,
    editor_ui: EditorUi,
    camera: OrbitCamera,
    camera_controller: CameraController,
    input: InputState,
    view: ViewSettings,
    stats: FrameStats,
    fps: FpsCounter,
    last_frame: Instant,
}

impl EditorApp {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            config,
            state: None,
            startup_error: None,
        }
    }

    /// Opens the window and blocks until it is closed.
    pub fn run(mut self) -> anyhow::Result<()> {
        let event_loop = EventLoop::new().map_err(EditorError::from)?;
        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop
            .run_app(&mut self)
            .map_err(EditorError::from)?;

        match self.startup_error.take() {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

impl AppState {
    fn new(event_loop: &ActiveEventLoop, config: &EditorConfig) -> Result<Self> {
        let (width, height) = config.window_size;
        let window = event_loop
            .create_window(
                WindowAttributes::default()
                    .with_title(config.window_title.clone())
                    .with_inner_size(PhysicalSize::new(width, height)),
            )?;
        let window = Arc::new(window);

        let mut engine = pollster::block_on(RenderEngine::new(window.clone(), config))?;
        let editor = Editor::new(config.clone(), &mut engine)?;
        let ui = UiManager::new(
            engine.device(),
            engine.queue(),
            engine.surface_format(),
            &window,
        );

        let (width, height) = engine.viewport_size();
        let camera = OrbitCamera::new(
            CAMERA_DISTANCE,
            CAMERA_PITCH,
            CAMERA_YAW,
            CAMERA_TARGET,
            width as f32 / height.max(1) as f32,
        )
        .with_bounds(OrbitCameraBounds {
            min_distance: Some(2.0),
            ..OrbitCameraBounds::default()
        });

        let view = ViewSettings {
            vsync: engine.vsync(),
            wireframe: engine.wireframe(),
            wireframe_supported: engine.wireframe_supported(),
            show_debug: false,
        };
        let stats = FrameStats {
            fps: 0.0,
            resolution: (width, height),
            adapter: engine.adapter_name().to_string(),
        };

        Ok(Self {
            editor_ui: EditorUi::new(editor.dimensions()),
            window,
            engine,
            editor,
            ui,
            camera,
            camera_controller: CameraController::default(),
            input: InputState::new(),
            view,
            stats,
            fps: FpsCounter::default(),
            last_frame: Instant::now(),
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.engine.resize(width, height);
        self.camera.resize_projection(width, height);
        self.stats.resolution = (width, height);
    }

    /// Runs one frame. Returns false when the GUI asked to quit.
    fn redraw(&mut self) -> bool {
        let now = Instant::now();
        let elapsed = (now - self.last_frame).as_secs_f32();
        let dt = simulation_dt(elapsed);
        self.last_frame = now;

        let mut input = self.input.snapshot();
        if self.ui.wants_keyboard() {
            input.keys_pressed.clear();
        }
        self.handle_view_keys(&input);
        if self.ui.wants_mouse() {
            input = input.without_pointer();
        }

        self.camera_controller.update(&input, &mut self.camera);
        self.editor.frame(
            &mut self.engine,
            &input,
            dt,
            self.camera.build_view_projection_matrix(),
            self.camera.eye,
        );

        let Self {
            window,
            ui,
            editor_ui,
            editor,
            view,
            stats,
            ..
        } = self;
        ui.update_logic(window, |frame| editor_ui.draw(frame, editor, view, stats));
        self.apply_view_settings();

        let ui = &mut self.ui;
        self.engine
            .render_overlay(|device, queue, encoder, target| {
                ui.render_display_only(device, queue, encoder, target)
            });
        self.engine.present();

        if let Some(fps) = self.fps.tick(elapsed) {
            self.stats.fps = fps;
            self.window.set_title(&format!(
                "{} | {:.0} FPS",
                self.editor.config().window_title,
                fps
            ));
        }

        !self.editor_ui.take_quit_request()
    }

    fn handle_view_keys(&mut self, input: &FrameInput) {
        if input.key_pressed(KeyCode::KeyV) {
            self.view.vsync = !self.view.vsync;
        }
        if input.key_pressed(KeyCode::KeyP) {
            self.view.wireframe = !self.view.wireframe;
        }
        if input.key_pressed(KeyCode::F3) {
            self.view.show_debug = !self.view.show_debug;
        }
    }

    /// Pushes GUI/key toggles to the engine and reads back what took effect.
    fn apply_view_settings(&mut self) {
        if self.view.vsync != self.engine.vsync() {
            self.engine.set_vsync(self.view.vsync);
            self.view.vsync = self.engine.vsync();
        }
        if self.view.wireframe != self.engine.wireframe() {
            self.view.wireframe = self.engine.set_wireframe(self.view.wireframe);
        }
    }
}

impl ApplicationHandler for EditorApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        match AppState::new(event_loop, &self.config) {
            Ok(state) => {
                log::info!("Editor ready");
                self.state = Some(state);
            }
            Err(e) => {
                log::error!("Startup failed: {}", e);
                self.startup_error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(state) = self.state.as_mut() else {
            return;
        };

        state.ui.handle_event(&state.window, window_id, &event);
        state.input.handle_window_event(&event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(PhysicalSize { width, height }) => state.resize(width, height),
            WindowEvent::RedrawRequested => {
                if !state.redraw() {
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = self.state.as_ref() {
            state.window.request_redraw();
        }
    }
}

/// Step handed to the editor. Long stalls are clamped so spheres do not
/// tunnel through shelves. The FPS counter still sees the real frame time.
fn simulation_dt(elapsed: f32) -> f32 {
    elapsed.min(MAX_FRAME_DT)
}

/// Averages frame times over one-second windows.
#[derive(Debug, Default)]
struct FpsCounter {
    frames: u32,
    elapsed: f32,
}

impl FpsCounter {
    /// Counts a frame. Returns the average rate once a second has accumulated.
    fn tick(&mut self, dt: f32) -> Option<f32> {
        self.frames += 1;
        self.elapsed += dt;
        if self.elapsed < 1.0 {
            return None;
        }
        let fps = self.frames as f32 / self.elapsed;
        self.frames = 0;
        self.elapsed = 0.0;
        Some(fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fps_counter_reports_once_per_second() {
        let mut fps = FpsCounter::default();
        for _ in 0..59 {
            assert!(fps.tick(1.0 / 60.0).is_none());
        }
        let rate = fps.tick(1.0 / 60.0 + 0.001).unwrap();
        assert_relative_eq!(rate, 60.0, epsilon = 0.1);
        assert!(fps.tick(1.0 / 60.0).is_none());
    }

    #[test]
    fn test_fps_counter_long_frame() {
        let mut fps = FpsCounter::default();
        let rate = fps.tick(2.0).unwrap();
        assert_relative_eq!(rate, 0.5);
    }

    #[test]
    fn test_stalls_are_clamped_for_simulation_only() {
        let stall = 2.5;
        assert_relative_eq!(simulation_dt(stall), MAX_FRAME_DT);
        assert_relative_eq!(simulation_dt(1.0 / 60.0), 1.0 / 60.0);

        let mut fps = FpsCounter::default();
        let rate = fps.tick(stall).unwrap();
        assert_relative_eq!(rate, 0.4);
    }
}
