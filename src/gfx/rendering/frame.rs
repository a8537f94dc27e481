//! Per-frame orchestration
//!
//! [`FrameContext`] owns the camera, scene and light and runs one frame
//! against a [`RenderBackend`] in a fixed order:
//!
//! 1. take the polled input (stop here on a close request)
//! 2. update the camera from movement, look, zoom and resize input
//! 3. begin the frame (clear color and depth)
//! 4. write frame-global uniforms
//! 5. for each scene entry in insertion order: compose the model matrix,
//!    derive the normal matrix, bind the material, submit the draw
//! 6. end the frame (submit and present)
//!
//! Nothing here touches wgpu directly, so the whole sequence runs in tests
//! against a recording backend.

use std::{collections::HashSet, sync::Arc};

use cgmath::{Matrix3, SquareMatrix};
use thiserror::Error;

use super::binding::{UniformBinder, UniformSink};
use crate::{
    config::AppConfig,
    gfx::{
        camera::{FpsCamera, FrameInput},
        resources::global_bindings::Light,
        scene::{Model, Scene},
        transform::normal_matrix,
    },
    performance::{FrameClock, FrameStats},
};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FrameError {
    #[error("surface lost or outdated; it has been reconfigured")]
    SurfaceLost,
    #[error("timed out acquiring the next surface texture")]
    SurfaceTimeout,
    #[error("GPU out of memory")]
    OutOfMemory,
    #[error("surface error: {0}")]
    Surface(String),
}

impl FrameError {
    /// Whether the loop must stop. Recoverable errors only drop this frame.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FrameError::OutOfMemory | FrameError::Surface(_))
    }
}

/// GPU side of a frame, as seen by the frame loop
pub trait RenderBackend: UniformSink {
    /// Acquires the target and clears color and depth.
    fn begin_frame(&mut self, clear_color: [f32; 3]) -> Result<(), FrameError>;

    /// Submits an indexed draw of `model` with the uniforms set so far.
    fn draw_model(&mut self, model: &Arc<Model>) -> Result<(), FrameError>;

    /// Finishes the frame and presents it.
    fn end_frame(&mut self) -> Result<(), FrameError>;

    fn resize(&mut self, width: u32, height: u32);
}

/// Input response tuning, taken from [`AppConfig`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSettings {
    pub movement_speed: f32,
    pub mouse_sensitivity: f32,
    pub boost_multiplier: f32,
    pub zoom_speed: f32,
    pub clear_color: [f32; 3],
}

impl From<&AppConfig> for FrameSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            movement_speed: config.movement_speed,
            mouse_sensitivity: config.mouse_sensitivity,
            boost_multiplier: config.boost_multiplier,
            zoom_speed: config.zoom_speed,
            clear_color: config.clear_color,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameOutcome {
    Rendered(FrameStats),
    /// Close was requested; nothing was drawn.
    Exit,
}

/// Everything a frame reads or updates, passed explicitly to [`run_frame`].
///
/// [`run_frame`]: FrameContext::run_frame
pub struct FrameContext {
    pub camera: FpsCamera,
    pub scene: Scene,
    pub light: Light,
    pub settings: FrameSettings,
    binder: UniformBinder,
    clock: FrameClock,
    degenerate: HashSet<String>,
    mirrored: HashSet<String>,
}

impl FrameContext {
    pub fn new(config: &AppConfig) -> Self {
        let aspect = config.window.width as f32 / config.window.height.max(1) as f32;
        Self {
            camera: FpsCamera::from_config(&config.camera, aspect),
            scene: Scene::new(),
            light: config.light,
            settings: FrameSettings::from(config),
            binder: UniformBinder::new(),
            clock: FrameClock::new(),
            degenerate: HashSet::new(),
            mirrored: HashSet::new(),
        }
    }

    /// Restarts delta-time measurement, e.g. after a pause.
    pub fn reset_clock(&mut self) {
        self.clock.reset();
    }

    /// Runs one full frame. On a close request returns [`FrameOutcome::Exit`]
    /// before touching the camera or the backend.
    pub fn run_frame<B: RenderBackend>(
        &mut self,
        backend: &mut B,
        input: FrameInput,
    ) -> Result<FrameOutcome, FrameError> {
        if input.close_requested {
            return Ok(FrameOutcome::Exit);
        }

        let time = self.clock.tick();
        self.update_camera(backend, &input, time.dt);

        backend.begin_frame(self.settings.clear_color)?;

        self.binder.set_frame_globals(
            backend,
            self.camera.view_matrix(),
            self.camera.projection_matrix(),
            self.camera.position,
            &self.light,
        );

        let mut stats = FrameStats::new(time.frame_index);
        for (id, model, transform) in self.scene.iter() {
            // Zero scales are caught below as degenerate; negative ones flip
            // the winding and the model is drawn inside out.
            if transform.has_invalid_scale() {
                if self.mirrored.insert(id.to_string()) {
                    log::warn!(
                        "'{}': scale {:?} is not positive on every axis",
                        id,
                        transform.scale
                    );
                }
                stats.invalid_scales += 1;
            } else {
                self.mirrored.remove(id);
            }

            let model_matrix = transform.compose();
            let normal = match normal_matrix(&model_matrix) {
                Ok(normal) => {
                    self.degenerate.remove(id);
                    normal
                }
                Err(err) => {
                    if self.degenerate.insert(id.to_string()) {
                        log::warn!("'{}': {}; lighting it with an identity normal matrix", id, err);
                    }
                    stats.degenerate_transforms += 1;
                    Matrix3::identity()
                }
            };

            self.binder.set_object_transform(backend, model_matrix, normal);
            self.binder.bind_material(backend, model.material());
            backend.draw_model(model)?;
            stats.record_draw(model.mesh().triangle_count());
        }

        backend.end_frame()?;
        log::trace!(
            "frame {}: {} draws, {} triangles",
            stats.frame_index,
            stats.draw_calls,
            stats.triangles
        );
        Ok(FrameOutcome::Rendered(stats))
    }

    fn update_camera<B: RenderBackend>(&mut self, backend: &mut B, input: &FrameInput, dt: f32) {
        if let Some((width, height)) = input.resized {
            // Zero-sized while minimized; keep the last aspect ratio.
            if width > 0 && height > 0 {
                self.camera.set_aspect_ratio(width, height);
                backend.resize(width, height);
            }
        }

        let speed = if input.boost {
            self.settings.movement_speed * self.settings.boost_multiplier
        } else {
            self.settings.movement_speed
        };
        for &movement in &input.movements {
            self.camera.process_movement(movement, dt, speed);
        }

        let (dx, dy) = input.look_delta;
        if dx != 0.0 || dy != 0.0 {
            self.camera
                .process_look(dx, dy, self.settings.mouse_sensitivity);
        }

        if input.scroll != 0.0 {
            self.camera.process_zoom(input.scroll * self.settings.zoom_speed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::{
        camera::CameraMovement,
        rendering::{
            binding::{tests::RecordingSink, BindingError},
            uniforms::{self, UniformValue},
        },
        resources::{material::Material, texture_resource::TextureImage},
        scene::model::tests::triangle_model,
        transform::Transform,
    };
    use cgmath::{Matrix4, Vector3};

    #[derive(Default)]
    struct MockBackend {
        sink: RecordingSink,
        events: Vec<String>,
        draws: Vec<(String, Option<UniformValue>, bool)>,
        fail_begin: Option<FrameError>,
    }

    impl UniformSink for MockBackend {
        fn set_uniform(&mut self, name: &str, value: UniformValue) -> Result<(), BindingError> {
            self.events.push(format!("set {}", name));
            self.sink.set_uniform(name, value)
        }

        fn bind_texture(
            &mut self,
            name: &str,
            unit: u32,
            texture: &Arc<TextureImage>,
        ) -> Result<(), BindingError> {
            self.events.push("bind texture".into());
            self.sink.bind_texture(name, unit, texture)
        }

        fn unbind_texture(&mut self, unit: u32) {
            self.events.push("unbind texture".into());
            self.sink.unbind_texture(unit)
        }
    }

    impl RenderBackend for MockBackend {
        fn begin_frame(&mut self, _clear_color: [f32; 3]) -> Result<(), FrameError> {
            if let Some(err) = self.fail_begin.clone() {
                return Err(err);
            }
            self.events.push("begin".into());
            Ok(())
        }

        fn draw_model(&mut self, model: &Arc<Model>) -> Result<(), FrameError> {
            self.events.push(format!("draw {}", model.name));
            self.draws.push((
                model.name.clone(),
                self.sink.value(uniforms::MODEL),
                self.sink.texture.is_some(),
            ));
            Ok(())
        }

        fn end_frame(&mut self) -> Result<(), FrameError> {
            self.events.push("end".into());
            Ok(())
        }

        fn resize(&mut self, width: u32, height: u32) {
            self.events.push(format!("resize {}x{}", width, height));
        }
    }

    fn context_with_two_entries() -> FrameContext {
        let mut context = FrameContext::new(&AppConfig::default());
        context
            .scene
            .add("a", Arc::new(triangle_model("a")), Transform::identity())
            .unwrap();
        context
            .scene
            .add(
                "b",
                Arc::new(triangle_model("b")),
                Transform::from_position(Vector3::new(5.0, 0.0, 0.0)),
            )
            .unwrap();
        context
    }

    fn index_of(events: &[String], event: &str) -> usize {
        events
            .iter()
            .position(|e| e == event)
            .unwrap_or_else(|| panic!("missing event {}", event))
    }

    #[test]
    fn test_steps_run_in_order() {
        let mut context = context_with_two_entries();
        let mut backend = MockBackend::default();

        let outcome = context
            .run_frame(&mut backend, FrameInput::default())
            .unwrap();

        let events = &backend.events;
        let begin = index_of(events, "begin");
        let view = index_of(events, "set view");
        let light = index_of(events, "set light.specular");
        let model_a = index_of(events, "set model");
        let draw_a = index_of(events, "draw a");
        let draw_b = index_of(events, "draw b");
        let end = index_of(events, "end");

        assert!(begin < view && view < light && light < model_a);
        assert!(model_a < draw_a && draw_a < draw_b && draw_b < end);
        assert_eq!(end, events.len() - 1);

        match outcome {
            FrameOutcome::Rendered(stats) => {
                assert_eq!(stats.draw_calls, 2);
                assert_eq!(stats.triangles, 2);
            }
            FrameOutcome::Exit => panic!("frame should render"),
        }
    }

    #[test]
    fn test_draws_follow_scene_order_with_their_transforms() {
        let mut context = context_with_two_entries();
        let mut backend = MockBackend::default();
        context
            .run_frame(&mut backend, FrameInput::default())
            .unwrap();

        let names: Vec<_> = backend.draws.iter().map(|d| d.0.as_str()).collect();
        assert_eq!(names, ["a", "b"]);

        let Some(UniformValue::Mat4(a)) = backend.draws[0].1 else {
            panic!("model matrix not set for a")
        };
        let Some(UniformValue::Mat4(b)) = backend.draws[1].1 else {
            panic!("model matrix not set for b")
        };
        assert_eq!(a, Matrix4::identity());
        assert_eq!(b, Matrix4::from_translation(Vector3::new(5.0, 0.0, 0.0)));
    }

    #[test]
    fn test_removed_entry_is_not_drawn() {
        let mut context = context_with_two_entries();
        context.scene.remove("a").unwrap();
        let mut backend = MockBackend::default();
        context
            .run_frame(&mut backend, FrameInput::default())
            .unwrap();

        let names: Vec<_> = backend.draws.iter().map(|d| d.0.as_str()).collect();
        assert_eq!(names, ["b"]);
    }

    #[test]
    fn test_transform_mutation_shows_next_frame() {
        let mut context = context_with_two_entries();
        let mut backend = MockBackend::default();
        context
            .run_frame(&mut backend, FrameInput::default())
            .unwrap();

        context.scene.transform_mut("a").unwrap().position.y = 2.0;
        let mut backend = MockBackend::default();
        context
            .run_frame(&mut backend, FrameInput::default())
            .unwrap();

        assert_eq!(
            backend.draws[0].1,
            Some(UniformValue::Mat4(Matrix4::from_translation(Vector3::new(
                0.0, 2.0, 0.0
            ))))
        );
    }

    #[test]
    fn test_close_request_exits_before_drawing() {
        let mut context = context_with_two_entries();
        let position = context.camera.position;
        let mut backend = MockBackend::default();

        let input = FrameInput {
            close_requested: true,
            movements: vec![CameraMovement::Forward],
            ..Default::default()
        };
        let outcome = context.run_frame(&mut backend, input).unwrap();

        assert_eq!(outcome, FrameOutcome::Exit);
        assert!(backend.events.is_empty());
        assert_eq!(context.camera.position, position);
    }

    #[test]
    fn test_surface_loss_aborts_before_any_draw() {
        let mut context = context_with_two_entries();
        let mut backend = MockBackend {
            fail_begin: Some(FrameError::SurfaceLost),
            ..Default::default()
        };

        let result = context.run_frame(&mut backend, FrameInput::default());
        assert_eq!(result, Err(FrameError::SurfaceLost));
        assert!(backend.draws.is_empty());
        assert!(!FrameError::SurfaceLost.is_fatal());
        assert!(FrameError::OutOfMemory.is_fatal());
    }

    #[test]
    fn test_camera_updates_before_globals() {
        let mut context = FrameContext::new(&AppConfig::default());
        let start = context.camera.position;
        let mut backend = MockBackend::default();

        let input = FrameInput {
            movements: vec![CameraMovement::Forward],
            resized: Some((1920, 1080)),
            ..Default::default()
        };
        context.run_frame(&mut backend, input).unwrap();

        assert!(context.camera.position.z < start.z);
        assert_eq!(
            backend.sink.value(uniforms::VIEW_POS),
            Some(UniformValue::Vec3(context.camera.position.into()))
        );
        assert!((context.camera.aspect() - 1920.0 / 1080.0).abs() < 1e-6);
        assert!(index_of(&backend.events, "resize 1920x1080") < index_of(&backend.events, "begin"));
    }

    #[test]
    fn test_zero_size_resize_is_ignored() {
        let mut context = FrameContext::new(&AppConfig::default());
        let aspect = context.camera.aspect();
        let mut backend = MockBackend::default();
        let input = FrameInput {
            resized: Some((0, 0)),
            ..Default::default()
        };
        context.run_frame(&mut backend, input).unwrap();
        assert_eq!(context.camera.aspect(), aspect);
        assert!(!backend.events.iter().any(|e| e.starts_with("resize")));
    }

    #[test]
    fn test_degenerate_transform_still_draws() {
        let mut context = FrameContext::new(&AppConfig::default());
        context
            .scene
            .add(
                "flat",
                Arc::new(triangle_model("flat")),
                Transform::identity().with_scale(1.0, 0.0, 1.0),
            )
            .unwrap();
        let mut backend = MockBackend::default();

        let outcome = context
            .run_frame(&mut backend, FrameInput::default())
            .unwrap();

        assert_eq!(
            backend.sink.value(uniforms::NORMAL_MATRIX),
            Some(UniformValue::Mat3(Matrix3::identity()))
        );
        match outcome {
            FrameOutcome::Rendered(stats) => {
                assert_eq!(stats.draw_calls, 1);
                assert_eq!(stats.degenerate_transforms, 1);
            }
            FrameOutcome::Exit => panic!("frame should render"),
        }
    }

    #[test]
    fn test_negative_scale_is_reported_once_and_still_draws() {
        let mut context = FrameContext::new(&AppConfig::default());
        context
            .scene
            .add(
                "mirror",
                Arc::new(triangle_model("mirror")),
                Transform::identity().with_scale(-1.0, 1.0, 1.0),
            )
            .unwrap();
        let mut backend = MockBackend::default();

        for _ in 0..2 {
            match context.run_frame(&mut backend, FrameInput::default()).unwrap() {
                FrameOutcome::Rendered(stats) => {
                    assert_eq!(stats.draw_calls, 1);
                    assert_eq!(stats.invalid_scales, 1);
                    assert_eq!(stats.degenerate_transforms, 0);
                }
                FrameOutcome::Exit => panic!("frame should render"),
            }
        }
        assert!(context.mirrored.contains("mirror"));

        context.scene.transform_mut("mirror").unwrap().scale = Vector3::new(1.0, 1.0, 1.0);
        match context.run_frame(&mut backend, FrameInput::default()).unwrap() {
            FrameOutcome::Rendered(stats) => assert_eq!(stats.invalid_scales, 0),
            FrameOutcome::Exit => panic!("frame should render"),
        }
        assert!(context.mirrored.is_empty());
    }

    #[test]
    fn test_texture_does_not_leak_between_draws() {
        let mut context = FrameContext::new(&AppConfig::default());
        let textured = Material::new("brick")
            .with_texture(Arc::new(TextureImage::solid_color("brick", [0.5; 3])));
        let mesh = triangle_model("tmp").mesh().clone();
        context
            .scene
            .add(
                "textured",
                Arc::new(Model::new("textured", mesh, Arc::new(textured))),
                Transform::identity(),
            )
            .unwrap();
        context
            .scene
            .add("plain", Arc::new(triangle_model("plain")), Transform::identity())
            .unwrap();

        let mut backend = MockBackend::default();
        context
            .run_frame(&mut backend, FrameInput::default())
            .unwrap();

        assert!(backend.draws[0].2, "textured draw sees its texture");
        assert!(!backend.draws[1].2, "plain draw sees no texture");
    }
}
