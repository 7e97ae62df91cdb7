//! # Editor
//!
//! Owns the scene and everything that edits it, independent of any window or
//! GPU. The app drives it once per frame with an input snapshot and a backend;
//! the GUI calls the editing methods in between.

use cgmath::{Matrix4, Vector3};
use winit::keyboard::KeyCode;

use crate::{
    config::{EditorConfig, WardrobeDimensions},
    error::Result,
    input::FrameInput,
    interaction::{
        DeleteOutcome, EditOutcome, InteractionController, MoveTransaction, PickAction,
    },
    render::{
        textures::{FLOOR, WOOD},
        FrameContext, FrameReport, RenderBackend, RenderOrchestrator, TextureRegistry,
    },
    scene::{
        ClusterManager, InsertRequest, Material, PartKind, Scene, SceneObject, SceneStatistics,
        WardrobeGenerator, WardrobeSide,
    },
};

/// Back-left-bottom corner of the generated wardrobe.
pub const WARDROBE_ORIGIN: Vector3<f32> = Vector3::new(-2.0, 0.0, -4.0);

const DEMO_TEXTURES: [&str; 4] = [WOOD, "Walnut", "Birch", "White"];

pub struct Editor {
    config: EditorConfig,
    scene: Scene,
    clusters: ClusterManager,
    controller: InteractionController,
    orchestrator: RenderOrchestrator,
    frame_ctx: FrameContext,
    textures: TextureRegistry,
    generator: Option<WardrobeGenerator>,
    dimensions: WardrobeDimensions,
    last_report: Option<FrameReport>,
}

impl Editor {
    pub fn new<B: RenderBackend + ?Sized>(config: EditorConfig, backend: &mut B) -> Result<Self> {
        let mut textures = TextureRegistry::with_defaults(backend)?;
        if let Some(dir) = &config.texture_dir {
            textures.load_directory(backend, dir)?;
        }

        let mut editor = Self {
            scene: Scene::new(),
            clusters: ClusterManager::new(),
            controller: InteractionController::from_config(&config),
            orchestrator: RenderOrchestrator::new(),
            frame_ctx: FrameContext::new(config.clear_color),
            textures,
            generator: None,
            dimensions: config.wardrobe,
            last_report: None,
            config,
        };

        if !editor.new_project(editor.dimensions) {
            log::warn!("Configured wardrobe {:?} is not buildable, using defaults", editor.dimensions);
            editor.new_project(WardrobeDimensions::default());
        }
        Ok(editor)
    }

    /// Replaces the scene with a fresh wardrobe. Returns false and keeps the
    /// current scene when the dimensions cannot be built.
    pub fn new_project(&mut self, dimensions: WardrobeDimensions) -> bool {
        if !dimensions.is_buildable() {
            return false;
        }

        self.scene.clear();
        self.clusters.clear();
        self.controller.clear_selection();
        self.controller.cancel_insert();

        if self.config.demo_scene {
            self.populate_demo();
        }

        self.scene
            .add_object(WardrobeGenerator::floor(self.textures.get_or_default(FLOOR)));

        let generator = WardrobeGenerator::from_mm(
            WARDROBE_ORIGIN,
            &dimensions,
            self.textures.get_or_default(WOOD),
        );
        generator.install(&mut self.scene);
        self.generator = Some(generator);
        self.dimensions = dimensions;

        log::info!(
            "New project {}x{}x{} mm, {} objects",
            dimensions.width,
            dimensions.height,
            dimensions.depth,
            self.scene.len()
        );
        true
    }

    /// Row of material spheres and one falling ball.
    fn populate_demo(&mut self) {
        for (i, name) in DEMO_TEXTURES.iter().enumerate() {
            let k = (i + 1) as f32 / 7.0;
            let mut sphere = SceneObject::new_sphere(
                &format!("Material sphere {}", i + 1),
                Vector3::new(i as f32 * 2.0, 1.0, 4.0),
                1.0,
            )
            .with_material(Material {
                roughness: k.clamp(0.05, 1.0),
                metalness: k,
                ..Material::default()
            })
            .with_textures(self.textures.get_or_default(name));
            sphere.flags.physics = false;
            sphere.flags.collision = false;
            self.scene.add_object(sphere);
        }

        let ball = SceneObject::new_sphere("Falling ball", Vector3::new(-4.0, 6.0, 2.0), 0.5)
            .with_textures(self.textures.get_or_default("White"));
        self.scene.add_object(ball);
    }

    /// Runs one frame against `backend`.
    pub fn frame<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        input: &FrameInput,
        dt: f32,
        view_proj: Matrix4<f32>,
        view_pos: Vector3<f32>,
    ) -> FrameReport {
        self.handle_keys(input);
        self.frame_ctx.advance(dt);
        self.frame_ctx.set_camera(view_proj, view_pos);

        let report = self.orchestrator.render_frame(
            backend,
            &mut self.scene,
            &mut self.controller,
            input,
            &self.frame_ctx,
        );

        if let PickAction::Insert { request, anchor } = report.action {
            self.insert_element(request, anchor);
        }
        self.last_report = Some(report);
        report
    }

    fn handle_keys(&mut self, input: &FrameInput) {
        if input.key_pressed(KeyCode::Delete) {
            self.delete_selected();
        }
        if input.key_pressed(KeyCode::Escape) {
            self.controller.cancel_insert();
            self.controller.clear_selection();
        }
        if input.key_pressed(KeyCode::KeyL) {
            self.frame_ctx.light_paused = !self.frame_ctx.light_paused;
        }
    }

    /// Places a shelf or partition, anchored on `anchor` if it is a wardrobe part.
    pub fn insert_element(&mut self, request: InsertRequest, anchor: Option<usize>) -> Option<usize> {
        let generator = self.generator.as_ref()?;
        let inserted = generator.insert(&mut self.scene, &mut self.clusters, request, anchor);
        if inserted.is_none() {
            log::info!("No room left for a {}", request.label().to_lowercase());
        }
        inserted
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    pub fn textures(&self) -> &TextureRegistry {
        &self.textures
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn dimensions(&self) -> WardrobeDimensions {
        self.dimensions
    }

    pub fn frame_context(&self) -> &FrameContext {
        &self.frame_ctx
    }

    pub fn frame_context_mut(&mut self) -> &mut FrameContext {
        &mut self.frame_ctx
    }

    pub fn frame_count(&self) -> u64 {
        self.orchestrator.frame_count()
    }

    pub fn last_report(&self) -> Option<FrameReport> {
        self.last_report
    }

    pub fn statistics(&self) -> SceneStatistics {
        self.scene.statistics()
    }

    pub fn selected(&self) -> Option<usize> {
        self.controller.valid_selection(&self.scene)
    }

    pub fn select(&mut self, index: usize) -> bool {
        self.controller.select(index, &self.scene)
    }

    pub fn clear_selection(&mut self) {
        self.controller.clear_selection();
    }

    pub fn set_hover_picking(&mut self, enabled: bool) {
        self.controller.set_hover_picking(enabled);
    }

    pub fn request_insert(&mut self, request: InsertRequest) {
        self.controller.request_insert(request);
    }

    pub fn delete_selected(&mut self) -> DeleteOutcome {
        self.controller.delete_selected(&mut self.scene, &mut self.clusters)
    }

    pub fn begin_move(&self) -> Option<MoveTransaction> {
        self.controller.begin_move(&self.scene)
    }

    pub fn end_move(&mut self, tx: MoveTransaction) -> EditOutcome {
        self.controller.end_move(tx, &mut self.scene)
    }

    pub fn side_enabled(&self, side: WardrobeSide) -> Option<bool> {
        WardrobeGenerator::side_enabled(&self.scene, side)
    }

    pub fn set_side_enabled(&mut self, side: WardrobeSide, enabled: bool) -> bool {
        if self.side_enabled(side) == Some(true) && !enabled {
            // A hidden side must not stay selected.
            if let Some(i) = self.selected() {
                if self.scene.find_side(side) == Some(i) {
                    self.controller.clear_selection();
                }
            }
        }
        WardrobeGenerator::set_side_enabled(&mut self.scene, side, enabled)
    }

    /// Index of the selected object's texture set in the registry.
    pub fn selected_texture_set(&self) -> Option<usize> {
        let object = self.scene.get(self.selected()?)?;
        self.textures.index_of(&object.textures)
    }

    /// Applies a registry texture set to the selection.
    pub fn apply_texture_set(&mut self, set: usize) -> bool {
        let Some(textures) = self.textures.sets().get(set).map(|s| s.textures) else {
            return false;
        };
        let Some(object) = self.selected().and_then(|i| self.scene.get_mut(i)) else {
            return false;
        };
        object.textures = textures;
        self.frame_ctx.selected_texture = Some(set);
        true
    }

    /// Enabled wardrobe parts with their picking IDs, for the element list.
    pub fn wardrobe_elements(&self) -> Vec<(usize, &str)> {
        self.scene
            .iter()
            .enumerate()
            .filter(|(_, o)| o.flags.enabled && o.part().is_some())
            .map(|(i, o)| (i, o.name.as_str()))
            .collect()
    }

    pub fn shelf_count(&self) -> usize {
        self.scene
            .iter()
            .filter(|o| o.part().map(|p| p.kind) == Some(PartKind::Shelf))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::EditorError, input::ButtonState, render::HeadlessBackend};
    use cgmath::ortho;

    fn editor(demo: bool) -> (Editor, HeadlessBackend) {
        let mut backend = HeadlessBackend::new(64, 64);
        let config = EditorConfig::default().with_demo_scene(demo);
        let editor = Editor::new(config, &mut backend).unwrap();
        (editor, backend)
    }

    fn view() -> Matrix4<f32> {
        ortho(-10.0, 10.0, -10.0, 10.0, -50.0, 50.0)
    }

    #[test]
    fn test_new_project_layout() {
        let (editor, _) = editor(true);
        assert_eq!(editor.scene().len(), DEMO_TEXTURES.len() + 1 + 1 + 5);
        assert_eq!(editor.wardrobe_elements().len(), 5);
        assert!(editor.scene().iter().all(|o| o.textures.is_complete()));
        assert_eq!(editor.side_enabled(WardrobeSide::Top), Some(true));
    }

    #[test]
    fn test_broken_texture_file_fails_startup() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.png"), b"not a png at all").unwrap();

        let mut backend = HeadlessBackend::new(64, 64);
        let config = EditorConfig::default()
            .with_demo_scene(false)
            .with_texture_dir(dir.path());
        let result = Editor::new(config, &mut backend);
        assert!(matches!(result, Err(EditorError::TextureDecode { .. })));
    }

    #[test]
    fn test_unbuildable_project_is_rejected() {
        let (mut editor, _) = editor(false);
        let before = editor.scene().len();
        let bad = WardrobeDimensions {
            width: 20.0,
            ..WardrobeDimensions::default()
        };
        assert!(!editor.new_project(bad));
        assert_eq!(editor.scene().len(), before);
        assert_eq!(editor.dimensions(), WardrobeDimensions::default());
    }

    #[test]
    fn test_falling_ball_comes_to_rest_on_floor() {
        let (mut editor, mut backend) = editor(true);
        let ball = editor
            .scene()
            .iter()
            .position(|o| o.name == "Falling ball")
            .unwrap();

        for _ in 0..180 {
            editor.frame(&mut backend, &FrameInput::default(), 1.0 / 60.0, view(), Vector3::new(0.0, 0.0, 20.0));
        }

        let ball = editor.scene().get(ball).unwrap();
        assert!((ball.position().y - 0.5).abs() < 0.01, "ball at {:?}", ball.position());
        assert!(ball.velocity().y.abs() < 0.2);
    }

    #[test]
    fn test_insert_then_cascade_delete() {
        let (mut editor, _) = editor(false);
        let base = editor.scene().len();

        let partition = editor
            .insert_element(InsertRequest::VerticalPartition, None)
            .unwrap();
        let shelf = editor
            .insert_element(InsertRequest::HorizontalShelf, Some(partition))
            .unwrap();
        editor
            .insert_element(InsertRequest::HorizontalShelf, Some(partition))
            .unwrap();
        assert_eq!(editor.scene().len(), base + 3);
        assert_eq!(editor.shelf_count(), 2);

        assert!(editor.select(shelf));
        assert_eq!(editor.delete_selected(), DeleteOutcome::Deleted(1));

        assert!(editor.select(partition));
        assert_eq!(editor.delete_selected(), DeleteOutcome::Deleted(2));
        assert_eq!(editor.scene().len(), base);
        assert_eq!(editor.selected(), None);
    }

    #[test]
    fn test_insert_mode_click_places_element() {
        let (mut editor, mut backend) = editor(false);
        let base = editor.scene().len();
        editor.request_insert(InsertRequest::HorizontalShelf);

        let click = FrameInput {
            cursor: (1.0, 1.0),
            left: ButtonState {
                down: false,
                pressed: true,
                released: true,
            },
            ..FrameInput::default()
        };
        let report = editor.frame(&mut backend, &click, 0.0, view(), Vector3::new(0.0, 0.0, 20.0));
        assert!(matches!(report.action, PickAction::Insert { request: InsertRequest::HorizontalShelf, .. }));
        assert_eq!(editor.scene().len(), base + 1);
        assert_eq!(editor.shelf_count(), 1);
    }

    #[test]
    fn test_texture_set_applies_to_selection() {
        let (mut editor, _) = editor(false);
        let left = editor.scene().find_side(WardrobeSide::Left).unwrap();
        assert!(!editor.apply_texture_set(0));

        editor.select(left);
        let walnut = editor
            .textures()
            .sets()
            .iter()
            .position(|s| s.name == "Walnut")
            .unwrap();
        assert!(editor.apply_texture_set(walnut));
        assert_eq!(editor.selected_texture_set(), Some(walnut));
        assert_eq!(editor.frame_context().selected_texture, Some(walnut));
    }

    #[test]
    fn test_hiding_selected_side_clears_selection() {
        let (mut editor, _) = editor(false);
        let back = editor.scene().find_side(WardrobeSide::Back).unwrap();
        editor.select(back);

        assert!(editor.set_side_enabled(WardrobeSide::Back, false));
        assert_eq!(editor.selected(), None);
        assert!(!editor.select(back));
        assert!(editor.wardrobe_elements().iter().all(|(i, _)| *i != back));
    }
}
