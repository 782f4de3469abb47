//! Platform layer: window, event loop, per-frame update and teardown.

pub mod context;
pub mod input;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, anyhow};
use corelib::{Vec3, scene::Scene, transform::Transform};
use renderer::{DEFAULT_SHADER, Renderer};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, ElementState, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::PhysicalKey,
    window::{CursorGrabMode, Window, WindowId},
};

use crate::context::AppContext;
use crate::input::PIXELS_PER_SCROLL_LINE;

pub const WINDOW_TITLE: &str = "Computer Graphics Coursework";

/// Settings the binary hands to [`run_with_renderer`].
#[derive(Clone, Debug)]
pub struct ViewerConfig {
    pub backends: wgpu::Backends,
    pub width: u32,
    pub height: u32,
    pub assets_dir: PathBuf,
    /// WGSL file replacing the built-in shader.
    pub shader_path: Option<PathBuf>,
    pub show_fps: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            width: 1024,
            height: 768,
            assets_dir: PathBuf::from("../assets"),
            shader_path: None,
            show_fps: false,
        }
    }
}

/// A model file, its diffuse texture and where to put it.
#[derive(Clone, Debug)]
pub struct SceneEntry {
    pub mesh: &'static str,
    pub texture: &'static str,
    pub transform: Transform,
}

pub fn default_scene() -> [SceneEntry; 2] {
    [
        SceneEntry {
            mesh: "caixote.obj",
            texture: "caixote_uv_pronto.png",
            transform: Transform::from_translation(Vec3::new(-2.0, 0.0, 0.0)),
        },
        SceneEntry {
            mesh: "pilot.obj",
            texture: "pilot.png",
            transform: Transform::from_translation(Vec3::new(1.0, -1.5, 0.0))
                .with_uniform_scale(1.0),
        },
    ]
}

/// Load every entry; failures are logged and that instance is left out.
pub fn populate_scene(
    renderer: &mut Renderer,
    assets_dir: &Path,
    entries: &[SceneEntry],
    scene: &mut Scene,
) {
    for entry in entries {
        let mesh_path = assets_dir.join(entry.mesh);
        match renderer.load_model(&mesh_path, &assets_dir.join(entry.texture)) {
            Ok(id) => {
                scene.add(id, entry.transform);
            }
            Err(err) => log::error!(
                "Failed to load model asset ({}): {err:#}",
                mesh_path.display()
            ),
        }
    }
    log::info!("Scene ready: {} instance(s)", scene.len());
}

// Field order is drop order: GPU state goes before the window it renders to.
struct App {
    config: ViewerConfig,
    renderer: Option<Renderer>,
    window: Option<Arc<Window>>,
    ctx: AppContext,
    error: Option<anyhow::Error>,
}

impl App {
    fn new(config: ViewerConfig) -> Self {
        Self {
            config,
            renderer: None,
            window: None,
            ctx: AppContext::new(),
            error: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(WINDOW_TITLE)
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height))
            .with_resizable(true);
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("Failed to create window")?,
        );
        log::info!(
            "Window created: {}x{}",
            window.inner_size().width,
            window.inner_size().height
        );
        grab_cursor(&window);

        let shader_src = match &self.config.shader_path {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read shader {}", path.display()))?,
            None => DEFAULT_SHADER.to_owned(),
        };
        let mut renderer = pollster::block_on(Renderer::new(
            window.clone(),
            self.config.backends,
            &shader_src,
        ))?;

        populate_scene(
            &mut renderer,
            &self.config.assets_dir,
            &default_scene(),
            &mut self.ctx.scene,
        );

        window.request_redraw();
        self.renderer = Some(renderer);
        self.window = Some(window);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        self.error = Some(err);
        event_loop.exit();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };

        let dt = self.ctx.clock.tick(Instant::now());
        self.ctx.update(dt);
        if self.ctx.quit_requested {
            log::info!("Escape pressed. Exiting event loop.");
            event_loop.exit();
            return;
        }
        if self.config.show_fps {
            if let Some(fps) = self.ctx.fps.frame(dt) {
                log::info!("FPS: {fps:.1}");
            }
        }

        match renderer.render(&self.ctx.camera, &self.ctx.light, &self.ctx.scene) {
            Ok(()) => {}
            Err(err) if Renderer::is_surface_lost(&err) => {
                log::warn!("Surface {err:?}; reconfiguring");
                renderer.recreate_surface();
            }
            Err(wgpu::SurfaceError::Timeout) => log::warn!("Surface timeout; skipping frame"),
            Err(err) => {
                let err = anyhow!("Unrecoverable surface error: {err:?}");
                self.fail(event_loop, err);
            }
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.init(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested. Exiting event loop.");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                log::debug!("Resized: {}x{}", size.width, size.height);
                if let Some(r) = self.renderer.as_mut() {
                    r.resize(size.width, size.height);
                }
            }
            WindowEvent::Focused(focused) => {
                if !focused {
                    self.ctx.input.release_all();
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    self.ctx
                        .input
                        .key(code, event.state == ElementState::Pressed);
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / PIXELS_PER_SCROLL_LINE,
                };
                self.ctx.input.scroll(lines);
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn device_event(&mut self, _: &ActiveEventLoop, _: DeviceId, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            self.ctx.input.mouse_motion(dx, dy);
        }
    }

    fn about_to_wait(&mut self, _: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn grab_cursor(window: &Window) {
    let grabbed = window
        .set_cursor_grab(CursorGrabMode::Locked)
        .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
    if let Err(err) = grabbed {
        log::warn!("Cursor grab unavailable: {err}");
    }
    window.set_cursor_visible(false);
}

/// Open the window and run until it is closed.
/// Any initialization failure is returned once the loop has stopped.
pub fn run_with_renderer(config: ViewerConfig) -> Result<()> {
    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop
        .run_app(&mut app)
        .map_err(|e| anyhow!("Event loop error: {e:?}"))?;

    log::info!("Releasing GPU resources");
    app.renderer = None;
    app.window = None;

    match app.error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
