//! # Frame Orchestration
//!
//! One frame, in order:
//!
//! 1. release retired meshes and upload new ones
//! 2. stage the drag translation
//! 3. collision step
//! 4. transform update
//! 5. shadow pass (light's view, depth only)
//! 6. picking pass (flat index colors on white)
//! 7. pixel readback on click or hover, handed to the controller
//! 8. main shaded pass with the selection highlighted
//!
//! GUI and present are left to the caller.

use cgmath::{
    ortho, Deg, EuclideanSpace, Matrix4, Point3, Quaternion, Rotation, Rotation3, Vector3,
};

use crate::{
    input::FrameInput,
    interaction::{InteractionController, PickAction},
    physics, picking,
    scene::{DrawContext, PassKind, Scene},
};

use super::{uniforms, ClearValue, RenderBackend, TargetId, UniformValue, OPENGL_TO_WGPU_MATRIX};

pub const LIGHT_START: Vector3<f32> = Vector3::new(10.0, 30.0, -10.0);
pub const LIGHT_TARGET: Vector3<f32> = Vector3::new(-2.0, 0.0, -2.0);
/// Orbit speed of the light around the X axis.
pub const LIGHT_ORBIT_DEG_PER_SEC: f32 = 90.0;

/// Per-frame state shared by all passes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameContext {
    pub dt: f32,
    pub view_proj: Matrix4<f32>,
    pub view_pos: Vector3<f32>,
    pub light_pos: Vector3<f32>,
    pub light_paused: bool,
    pub clear_color: [f64; 4],
    /// Texture set highlighted in the object panel's combo.
    pub selected_texture: Option<usize>,
}

impl FrameContext {
    pub fn new(clear_color: [f64; 4]) -> Self {
        Self {
            dt: 0.0,
            view_proj: Matrix4::from_scale(1.0),
            view_pos: Vector3::new(0.0, 0.0, 0.0),
            light_pos: LIGHT_START,
            light_paused: false,
            clear_color,
            selected_texture: None,
        }
    }

    /// Starts a frame: records `dt` and moves the light along its orbit.
    pub fn advance(&mut self, dt: f32) {
        self.dt = dt;
        if !self.light_paused {
            let rotation = Quaternion::from_angle_x(Deg(LIGHT_ORBIT_DEG_PER_SEC * dt));
            self.light_pos = rotation.rotate_vector(self.light_pos);
        }
    }

    pub fn set_camera(&mut self, view_proj: Matrix4<f32>, view_pos: Vector3<f32>) {
        self.view_proj = view_proj;
        self.view_pos = view_pos;
    }

    /// Orthographic projection from the light towards [`LIGHT_TARGET`].
    pub fn light_space(&self) -> Matrix4<f32> {
        let projection = ortho(-10.0, 10.0, -10.0, 10.0, 1.0, 80.5);
        let view = Matrix4::look_at_rh(
            Point3::from_vec(self.light_pos),
            Point3::from_vec(LIGHT_TARGET),
            Vector3::unit_y(),
        );
        OPENGL_TO_WGPU_MATRIX * projection * view
    }
}

/// What happened during one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    pub action: PickAction,
    /// Decoded pick, when a readback happened.
    pub picked: Option<usize>,
    pub resting: usize,
    pub draws: usize,
}

#[derive(Debug, Default)]
pub struct RenderOrchestrator {
    frame: u64,
}

impl RenderOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    pub fn render_frame<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        scene: &mut Scene,
        controller: &mut InteractionController,
        input: &FrameInput,
        ctx: &FrameContext,
    ) -> FrameReport {
        self.frame += 1;

        scene.sync_meshes(backend);
        controller.update_drag(input, ctx.dt, scene);
        let resting = physics::step(scene);
        scene.update_transforms(ctx.dt);

        let mut draws = self.shadow_pass(backend, scene, ctx);
        draws += self.picking_pass(backend, scene, ctx);

        let (action, picked) = if controller.wants_pick(input) {
            let picked = picking::pick_at(backend, input.cursor, scene.len());
            (controller.handle_pick(input, picked, scene), picked)
        } else {
            (PickAction::None, None)
        };

        draws += self.main_pass(backend, scene, ctx, controller.valid_selection(scene));

        FrameReport {
            action,
            picked,
            resting,
            draws,
        }
    }

    pub fn shadow_pass<B: RenderBackend + ?Sized>(
        &self,
        backend: &mut B,
        scene: &Scene,
        ctx: &FrameContext,
    ) -> usize {
        backend.bind_target(TargetId::Shadow);
        backend.clear(ClearValue::Depth(1.0));
        backend.set_uniform(uniforms::LIGHT_SPACE, UniformValue::Mat4(ctx.light_space()));
        draw_scene(backend, scene, PassKind::Shadow, None)
    }

    pub fn picking_pass<B: RenderBackend + ?Sized>(
        &self,
        backend: &mut B,
        scene: &Scene,
        ctx: &FrameContext,
    ) -> usize {
        backend.bind_target(TargetId::Picking);
        backend.clear(ClearValue::ColorAndDepth(picking::CLEAR_COLOR, 1.0));
        backend.set_uniform(uniforms::VIEW_PROJ, UniformValue::Mat4(ctx.view_proj));
        draw_scene(backend, scene, PassKind::Picking, None)
    }

    pub fn main_pass<B: RenderBackend + ?Sized>(
        &self,
        backend: &mut B,
        scene: &Scene,
        ctx: &FrameContext,
        selected: Option<usize>,
    ) -> usize {
        backend.bind_target(TargetId::Main);
        backend.clear(ClearValue::ColorAndDepth(ctx.clear_color, 1.0));
        backend.set_uniform(uniforms::VIEW_PROJ, UniformValue::Mat4(ctx.view_proj));
        backend.set_uniform(uniforms::LIGHT_SPACE, UniformValue::Mat4(ctx.light_space()));
        backend.set_uniform(uniforms::VIEW_POS, UniformValue::Vec3(ctx.view_pos));
        backend.set_uniform(uniforms::LIGHT_POS, UniformValue::Vec3(ctx.light_pos));
        draw_scene(backend, scene, PassKind::Main, selected)
    }
}

fn draw_scene<B: RenderBackend + ?Sized>(
    backend: &mut B,
    scene: &Scene,
    pass: PassKind,
    selected: Option<usize>,
) -> usize {
    let mut submitted = 0;
    for (index, object) in scene.iter().enumerate() {
        if !object.flags.enabled || !object.has_mesh() {
            continue;
        }
        let ctx = DrawContext {
            pass,
            index,
            selected: selected == Some(index),
        };
        object.draw(backend, &ctx);
        submitted += 1;
    }
    submitted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        input::ButtonState,
        render::{textures::WOOD, HeadlessBackend, RowOrder, TextureRegistry},
        scene::SceneObject,
    };
    use approx::assert_relative_eq;
    use cgmath::InnerSpace;

    const SIZE: u32 = 90;

    /// 3 spheres along X, seen head-on by an ortho camera spanning x in -4.5..4.5.
    fn setup() -> (HeadlessBackend, Scene, FrameContext) {
        let mut backend = HeadlessBackend::new(SIZE, SIZE);
        let textures = TextureRegistry::with_defaults(&mut backend)
            .unwrap()
            .get_or_default(WOOD);
        let mut scene = Scene::new();
        for i in 0..3 {
            let x = (i as f32 - 1.0) * 3.0;
            let mut ball = SceneObject::new_sphere(&format!("ball{i}"), Vector3::new(x, 0.0, 0.0), 1.0)
                .with_textures(textures);
            ball.flags.physics = false;
            scene.add_object(ball);
        }

        let mut ctx = FrameContext::new([0.0, 0.0, 0.0, 1.0]);
        ctx.set_camera(
            ortho(-4.5, 4.5, -4.5, 4.5, -10.0, 10.0),
            Vector3::new(0.0, 0.0, 10.0),
        );
        ctx.light_paused = true;
        (backend, scene, ctx)
    }

    fn click_at(x: f64, y: f64) -> FrameInput {
        FrameInput {
            cursor: (x, y),
            left: ButtonState {
                down: false,
                pressed: true,
                released: true,
            },
            ..FrameInput::default()
        }
    }

    #[test]
    fn test_click_selects_and_background_clears() {
        let (mut backend, mut scene, ctx) = setup();
        let mut controller = InteractionController::new(1.0, false);
        let mut orchestrator = RenderOrchestrator::new();

        let report = orchestrator.render_frame(&mut backend, &mut scene, &mut controller, &click_at(45.0, 45.0), &ctx);
        assert_eq!(report.picked, Some(1));
        assert_eq!(report.action, PickAction::Selected(1));
        assert_eq!(controller.selected(), Some(1));

        let report = orchestrator.render_frame(&mut backend, &mut scene, &mut controller, &click_at(45.0, 5.0), &ctx);
        assert_eq!(report.picked, None);
        assert_eq!(report.action, PickAction::Cleared);
        assert_eq!(controller.selected(), None);
    }

    #[test]
    fn test_selection_follows_layout_after_resize_and_removal() {
        let (mut backend, mut scene, ctx) = setup();
        let mut controller = InteractionController::new(1.0, false);
        let mut orchestrator = RenderOrchestrator::new();

        backend.resize(180, 180);
        orchestrator.render_frame(&mut backend, &mut scene, &mut controller, &click_at(150.0, 90.0), &ctx);
        assert_eq!(controller.selected(), Some(2));

        scene.remove_at(0);
        let report = orchestrator.render_frame(&mut backend, &mut scene, &mut controller, &FrameInput::default(), &ctx);
        assert_eq!(report.action, PickAction::None);
        assert_eq!(controller.selected(), None);

        let report = orchestrator.render_frame(&mut backend, &mut scene, &mut controller, &click_at(150.0, 90.0), &ctx);
        assert_eq!(report.picked, Some(1));
        assert_eq!(scene.get(1).unwrap().name, "ball2");
    }

    #[test]
    fn test_top_down_backend_picks_same_object() {
        let (_, mut scene, ctx) = setup();
        let mut backend = HeadlessBackend::new(SIZE, SIZE).with_row_order(RowOrder::TopDown);
        let mut controller = InteractionController::new(1.0, false);
        let mut orchestrator = RenderOrchestrator::new();

        let report = orchestrator.render_frame(&mut backend, &mut scene, &mut controller, &click_at(15.0, 45.0), &ctx);
        assert_eq!(report.picked, Some(0));
    }

    #[test]
    fn test_pass_order_and_highlight() {
        let (mut backend, mut scene, ctx) = setup();
        let mut controller = InteractionController::new(1.0, false);
        let mut orchestrator = RenderOrchestrator::new();

        orchestrator.render_frame(&mut backend, &mut scene, &mut controller, &click_at(75.0, 45.0), &ctx);
        backend.clear_draws();
        orchestrator.render_frame(&mut backend, &mut scene, &mut controller, &FrameInput::default(), &ctx);

        let targets: Vec<TargetId> = backend.draws().iter().map(|d| d.target).collect();
        assert_eq!(&targets[0..3], &[TargetId::Shadow; 3]);
        assert_eq!(&targets[3..6], &[TargetId::Picking; 3]);
        assert_eq!(&targets[6..9], &[TargetId::Main; 3]);

        let highlighted: Vec<bool> = backend.draws()[6..].iter().map(|d| d.selected).collect();
        assert_eq!(highlighted, vec![false, false, true]);
        assert!(backend.draws()[6..].iter().all(|d| d.textures[0].is_some()));
    }

    #[test]
    fn test_disabled_objects_are_not_drawn_or_picked() {
        let (mut backend, mut scene, ctx) = setup();
        scene.get_mut(1).unwrap().flags.enabled = false;
        let mut controller = InteractionController::new(1.0, false);
        let mut orchestrator = RenderOrchestrator::new();

        let report = orchestrator.render_frame(&mut backend, &mut scene, &mut controller, &click_at(45.0, 45.0), &ctx);
        assert_eq!(report.picked, None);
        let picking_draws = backend.draws().iter().filter(|d| d.target == TargetId::Picking).count();
        assert_eq!(picking_draws, 2);
    }

    #[test]
    fn test_light_orbits_unless_paused() {
        let mut ctx = FrameContext::new([0.0; 4]);
        let radius = LIGHT_START.magnitude();

        ctx.advance(1.0);
        assert_relative_eq!(ctx.light_pos.x, 10.0, epsilon = 1e-4);
        assert_relative_eq!(ctx.light_pos.magnitude(), radius, epsilon = 1e-3);
        assert!((ctx.light_pos - LIGHT_START).magnitude() > 1.0);

        ctx.light_paused = true;
        let before = ctx.light_pos;
        ctx.advance(1.0);
        assert_eq!(ctx.light_pos, before);
        assert_eq!(ctx.dt, 1.0);
    }
}
