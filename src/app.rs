//! Windowed viewer application
//!
//! [`App`] collects configuration and scene content up front, then
//! [`App::run`] opens the window, creates the [`RenderEngine`] and drives
//! [`FrameContext::run_frame`] from the winit event loop, paced to the
//! configured frame rate.

use std::{
    path::Path,
    sync::Arc,
    time::Instant,
};

use thiserror::Error;
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{CursorGrabMode, Window, WindowAttributes, WindowId},
};

use crate::{
    config::{AppConfig, ConfigError},
    gfx::{
        camera::{FpsCamera, InputState},
        rendering::{FrameContext, FrameOutcome, RenderEngine},
        resources::{Light, MaterialLibrary},
        scene::{load_model, LoadError, Model, Scene, SceneError},
        transform::Transform,
    },
    logging::init_logging,
    performance::{FramePacer, PerformanceMonitor},
};

#[derive(Debug, Error)]
pub enum AddModelError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Scene(#[from] SceneError),
}

pub struct App {
    config: AppConfig,
    library: MaterialLibrary,
    context: FrameContext,
}

impl App {
    /// Validates `config` and initializes logging.
    pub fn new(config: AppConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        init_logging(&config.logging);

        Ok(Self {
            context: FrameContext::new(&config),
            library: MaterialLibrary::new(),
            config,
        })
    }

    /// Loads an OBJ file and inserts it under `id`.
    ///
    /// On failure the error is logged and returned; the scene is unchanged.
    pub fn add_model(
        &mut self,
        id: &str,
        path: impl AsRef<Path>,
        transform: Transform,
    ) -> Result<(), AddModelError> {
        let path = path.as_ref();
        let result = load_model(path, &mut self.library)
            .map_err(AddModelError::from)
            .and_then(|model| {
                self.context
                    .scene
                    .add(id, Arc::new(model), transform)
                    .map_err(AddModelError::from)
            });

        if let Err(err) = &result {
            log::warn!("not adding '{}' from {}: {}", id, path.display(), err);
        }
        result
    }

    /// Inserts an already built model, e.g. one shared between entries.
    pub fn add_shared_model(
        &mut self,
        id: &str,
        model: Arc<Model>,
        transform: Transform,
    ) -> Result<(), SceneError> {
        self.context.scene.add(id, model, transform)
    }

    pub fn scene(&self) -> &Scene {
        &self.context.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.context.scene
    }

    pub fn camera_mut(&mut self) -> &mut FpsCamera {
        &mut self.context.camera
    }

    pub fn light_mut(&mut self) -> &mut Light {
        &mut self.context.light
    }

    pub fn library(&self) -> &MaterialLibrary {
        &self.library
    }

    /// Opens the window and renders until ESC, window close or a fatal error.
    pub fn run(self) -> anyhow::Result<()> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut runner = Runner {
            pacer: FramePacer::new(self.config.target_fps),
            config: self.config,
            context: self.context,
            input: InputState::new(),
            monitor: PerformanceMonitor::new(),
            window: None,
            engine: None,
            frames: 0,
            error: None,
        };

        event_loop.run_app(&mut runner)?;
        log::info!("render loop exited after {} frames", runner.frames);

        match runner.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

struct Runner {
    config: AppConfig,
    context: FrameContext,
    input: InputState,
    pacer: FramePacer,
    monitor: PerformanceMonitor,
    window: Option<Arc<Window>>,
    engine: Option<RenderEngine>,
    frames: u64,
    error: Option<anyhow::Error>,
}

impl Runner {
    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{:#}", err);
        self.error = Some(err);
        event_loop.exit();
    }

    fn create_window(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window = Arc::new(
            event_loop.create_window(
                WindowAttributes::default()
                    .with_title(self.config.window.title.clone())
                    .with_inner_size(winit::dpi::PhysicalSize::new(
                        self.config.window.width,
                        self.config.window.height,
                    )),
            )?,
        );

        let (width, height) = window.inner_size().into();
        let engine = pollster::block_on(RenderEngine::new(window.clone(), width, height))?;

        let (width, height) = engine.surface_size();
        log::info!("surface configured at {}x{}", width, height);
        if width > 0 && height > 0 {
            self.context.camera.set_aspect_ratio(width, height);
        }
        grab_cursor(&window);

        self.window = Some(window);
        self.engine = Some(engine);
        self.context.reset_clock();
        self.monitor.reset();
        Ok(())
    }

    fn render(&mut self, event_loop: &ActiveEventLoop) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };

        let start = Instant::now();
        self.pacer.begin_frame(start);
        self.monitor.frame_started(start);

        let input = self.input.poll();
        match self.context.run_frame(engine, input) {
            Ok(FrameOutcome::Exit) => event_loop.exit(),
            Ok(FrameOutcome::Rendered(stats)) => {
                self.frames += 1;
                self.monitor.report(&stats);
            }
            Err(err) if err.is_fatal() => self.fail(event_loop, err.into()),
            Err(err) => log::warn!("dropping frame: {}", err),
        }
    }
}

fn grab_cursor(window: &Window) {
    let grabbed = window
        .set_cursor_grab(CursorGrabMode::Confined)
        .or_else(|_| window.set_cursor_grab(CursorGrabMode::Locked));
    match grabbed {
        Ok(()) => window.set_cursor_visible(false),
        Err(err) => log::warn!("cursor grab unavailable: {}", err),
    }
}

impl ApplicationHandler for Runner {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.create_window(event_loop) {
            self.fail(event_loop, err.context("failed to start the renderer"));
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        self.input.process_window_event(&event);

        if let WindowEvent::RedrawRequested = event {
            self.render(event_loop);
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        self.input.process_device_event(&event);
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(window) = self.window.as_ref() else {
            return;
        };

        // A pending close is handled by the next frame, without waiting.
        if self.input.close_requested() || self.pacer.is_due(Instant::now()) {
            window.request_redraw();
        }

        match self.pacer.deadline() {
            Some(deadline) if !self.input.close_requested() => {
                event_loop.set_control_flow(ControlFlow::WaitUntil(deadline))
            }
            _ => event_loop.set_control_flow(ControlFlow::Poll),
        }
    }
}
