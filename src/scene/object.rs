//! # Scene Objects
//!
//! Every drawable thing in the editor is a [`SceneObject`]: one shared record
//! (position, transform, material, flags, mesh handle) plus an [`ObjectKind`]
//! payload for the variant-specific shape. Dispatch happens on the kind tag,
//! so "is this a box" questions are a `match`, never a downcast.
//!
//! ## Transform model
//!
//! Meshes are unit shapes (a -0.5..0.5 cube, a radius-1 sphere). The model
//! matrix is `translate(position) * rotate * scale`, and the bounds are
//! recomputed from scratch after every change so they never drift away from
//! the position.

use cgmath::{
    Matrix, Matrix3, Matrix4, One, Quaternion, SquareMatrix, Vector3, Zero,
};

use crate::{
    geometry::{unit_cube, unit_sphere, Bounds, MeshData},
    picking,
    render::{uniforms, MeshHandle, RenderBackend, TextureId, TextureSlot, UniformValue},
};

use super::cluster::ClusterId;

/// Downward acceleration applied to free-falling objects, in units/s².
pub const GRAVITY: f32 = 9.81;

const SPHERE_LONGITUDE_SEGMENTS: u32 = 48;
const SPHERE_LATITUDE_SEGMENTS: u32 = 24;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub color: Vector3<f32>,
    pub emissive: Vector3<f32>,
    pub reflectance: Vector3<f32>,
    pub roughness: f32,
    pub metalness: f32,
    pub opacity: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: Vector3::new(1.0, 1.0, 1.0),
            emissive: Vector3::zero(),
            reflectance: Vector3::new(1.0, 1.0, 1.0),
            roughness: 0.5,
            metalness: 0.0,
            opacity: 1.0,
        }
    }
}

/// Material maps bound while shading. Handles point into the texture registry.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MaterialTextures {
    pub albedo: Option<TextureId>,
    pub normal: Option<TextureId>,
    pub metallic: Option<TextureId>,
    pub roughness: Option<TextureId>,
    pub height: Option<TextureId>,
    pub ambient_occlusion: Option<TextureId>,
}

impl MaterialTextures {
    /// Slots the shaded pass cannot render without.
    pub const REQUIRED: [TextureSlot; 4] = [
        TextureSlot::Albedo,
        TextureSlot::Normal,
        TextureSlot::Metallic,
        TextureSlot::Roughness,
    ];

    pub fn get(&self, slot: TextureSlot) -> Option<TextureId> {
        match slot {
            TextureSlot::Albedo => self.albedo,
            TextureSlot::Normal => self.normal,
            TextureSlot::Metallic => self.metallic,
            TextureSlot::Roughness => self.roughness,
            TextureSlot::Height => self.height,
            TextureSlot::AmbientOcclusion => self.ambient_occlusion,
        }
    }

    pub fn set(&mut self, slot: TextureSlot, texture: Option<TextureId>) {
        let entry = match slot {
            TextureSlot::Albedo => &mut self.albedo,
            TextureSlot::Normal => &mut self.normal,
            TextureSlot::Metallic => &mut self.metallic,
            TextureSlot::Roughness => &mut self.roughness,
            TextureSlot::Height => &mut self.height,
            TextureSlot::AmbientOcclusion => &mut self.ambient_occlusion,
        };
        *entry = texture;
    }

    pub fn is_complete(&self) -> bool {
        Self::REQUIRED.iter().all(|slot| self.get(*slot).is_some())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectFlags {
    /// Gravity applies while the object is free.
    pub physics: bool,
    /// Takes part in the box/sphere collision test.
    pub collision: bool,
    /// Can be dragged with the mouse.
    pub interactive: bool,
    /// Disabled objects keep their index but are not drawn, picked or collided.
    pub enabled: bool,
}

/// Per-frame collision response, recomputed from scratch every frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PhysicsState {
    #[default]
    Free,
    Resting(f32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxShape {
    pub half_size: Vector3<f32>,
    pub rotation: Quaternion<f32>,
}

impl BoxShape {
    pub fn new(size: Vector3<f32>) -> Self {
        Self {
            half_size: size * 0.5,
            rotation: Quaternion::one(),
        }
    }

    pub fn size(&self) -> Vector3<f32> {
        self.half_size * 2.0
    }

    /// Half extents of the axis-aligned box enclosing the rotated shape.
    fn aligned_half_extents(&self) -> Vector3<f32> {
        let r = Matrix3::from(self.rotation);
        let h = self.half_size;
        // Column-major: r[col][row]
        Vector3::new(
            r[0][0].abs() * h.x + r[1][0].abs() * h.y + r[2][0].abs() * h.z,
            r[0][1].abs() * h.x + r[1][1].abs() * h.y + r[2][1].abs() * h.z,
            r[0][2].abs() * h.x + r[1][2].abs() * h.y + r[2][2].abs() * h.z,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WardrobeSide {
    Bottom,
    Back,
    Top,
    Left,
    Right,
}

impl WardrobeSide {
    pub const ALL: [WardrobeSide; 5] = [
        WardrobeSide::Bottom,
        WardrobeSide::Back,
        WardrobeSide::Top,
        WardrobeSide::Left,
        WardrobeSide::Right,
    ];

    pub fn label(self) -> &'static str {
        match self {
            WardrobeSide::Bottom => "Bottom",
            WardrobeSide::Back => "Back",
            WardrobeSide::Top => "Top",
            WardrobeSide::Left => "Left",
            WardrobeSide::Right => "Right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    /// One of the five generated sides. Cannot be deleted.
    Edge(WardrobeSide),
    Shelf,
    VerticalElement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WardrobePart {
    pub kind: PartKind,
    pub cluster: Option<ClusterId>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObjectKind {
    Box(BoxShape),
    Sphere { radius: f32 },
    WardrobePart { shape: BoxShape, part: WardrobePart },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    Shadow,
    Picking,
    Main,
}

/// What a single draw call needs to know about its surroundings.
#[derive(Debug, Clone, Copy)]
pub struct DrawContext {
    pub pass: PassKind,
    /// Position in the scene sequence, encoded as the picking color.
    pub index: usize,
    pub selected: bool,
}

#[derive(Debug)]
pub struct SceneObject {
    pub name: String,
    kind: ObjectKind,
    position: Vector3<f32>,
    start_position: Vector3<f32>,
    velocity: Vector3<f32>,
    pending_translation: Vector3<f32>,
    model: Matrix4<f32>,
    bounds: Bounds,
    pub material: Material,
    pub textures: MaterialTextures,
    pub tex_scale: [f32; 2],
    pub flags: ObjectFlags,
    physics_state: PhysicsState,
    mesh: Option<MeshHandle>,
}

impl SceneObject {
    fn with_kind(name: &str, kind: ObjectKind, position: Vector3<f32>, flags: ObjectFlags) -> Self {
        let mut object = Self {
            name: name.to_owned(),
            kind,
            position,
            start_position: position,
            velocity: Vector3::zero(),
            pending_translation: Vector3::zero(),
            model: Matrix4::identity(),
            bounds: Bounds::from_center(position, Vector3::zero()),
            material: Material::default(),
            textures: MaterialTextures::default(),
            tex_scale: [1.0, 1.0],
            flags,
            physics_state: PhysicsState::Free,
            mesh: None,
        };
        object.refresh();
        object
    }

    /// Static box centered at `center` with full extents `size`.
    pub fn new_box(name: &str, center: Vector3<f32>, size: Vector3<f32>) -> Self {
        Self::with_kind(
            name,
            ObjectKind::Box(BoxShape::new(size)),
            center,
            ObjectFlags {
                physics: false,
                collision: true,
                interactive: false,
                enabled: true,
            },
        )
    }

    /// Box given by its minimum corner, the way floor slabs are usually specified.
    pub fn new_box_from_corner(name: &str, min: Vector3<f32>, size: Vector3<f32>) -> Self {
        Self::new_box(name, min + size * 0.5, size)
    }

    /// Draggable sphere affected by gravity.
    pub fn new_sphere(name: &str, center: Vector3<f32>, radius: f32) -> Self {
        Self::with_kind(
            name,
            ObjectKind::Sphere { radius },
            center,
            ObjectFlags {
                physics: true,
                collision: true,
                interactive: true,
                enabled: true,
            },
        )
    }

    pub fn new_wardrobe_part(
        name: &str,
        center: Vector3<f32>,
        size: Vector3<f32>,
        part: WardrobePart,
    ) -> Self {
        Self::with_kind(
            name,
            ObjectKind::WardrobePart {
                shape: BoxShape::new(size),
                part,
            },
            center,
            ObjectFlags {
                physics: false,
                collision: true,
                interactive: false,
                enabled: true,
            },
        )
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    pub fn with_textures(mut self, textures: MaterialTextures) -> Self {
        self.textures = textures;
        self
    }

    pub fn with_tex_scale(mut self, scale: f32) -> Self {
        self.tex_scale = [scale, scale];
        self
    }

    pub fn with_flags(mut self, flags: ObjectFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_rotation(mut self, rotation: Quaternion<f32>) -> Self {
        match &mut self.kind {
            ObjectKind::Box(shape) | ObjectKind::WardrobePart { shape, .. } => {
                shape.rotation = rotation;
            }
            ObjectKind::Sphere { .. } => {}
        }
        self.refresh();
        self
    }

    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    pub fn position(&self) -> Vector3<f32> {
        self.position
    }

    pub fn start_position(&self) -> Vector3<f32> {
        self.start_position
    }

    /// Offset accumulated since the last [`Self::mark_start`].
    pub fn displacement(&self) -> Vector3<f32> {
        self.position - self.start_position
    }

    /// Re-anchors relative translation at the current position.
    pub fn mark_start(&mut self) {
        self.start_position = self.position;
    }

    pub fn set_position(&mut self, position: Vector3<f32>) {
        self.position = position;
        self.velocity = Vector3::zero();
        self.refresh();
    }

    pub fn velocity(&self) -> Vector3<f32> {
        self.velocity
    }

    pub fn model(&self) -> Matrix4<f32> {
        self.model
    }

    /// Bounds as of the last transform update.
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn box_shape(&self) -> Option<&BoxShape> {
        match &self.kind {
            ObjectKind::Box(shape) | ObjectKind::WardrobePart { shape, .. } => Some(shape),
            ObjectKind::Sphere { .. } => None,
        }
    }

    pub fn sphere_radius(&self) -> Option<f32> {
        match self.kind {
            ObjectKind::Sphere { radius } => Some(radius),
            _ => None,
        }
    }

    pub fn part(&self) -> Option<&WardrobePart> {
        match &self.kind {
            ObjectKind::WardrobePart { part, .. } => Some(part),
            _ => None,
        }
    }

    pub fn cluster(&self) -> Option<ClusterId> {
        self.part().and_then(|p| p.cluster)
    }

    pub fn is_edge(&self) -> bool {
        matches!(self.part().map(|p| p.kind), Some(PartKind::Edge(_)))
    }

    /// Full extents, for box variants only.
    pub fn size(&self) -> Option<Vector3<f32>> {
        self.box_shape().map(BoxShape::size)
    }

    /// Resizes a box variant. Returns false for spheres or non-positive sizes.
    pub fn set_size(&mut self, size: Vector3<f32>) -> bool {
        if size.x <= 0.0 || size.y <= 0.0 || size.z <= 0.0 {
            return false;
        }
        match &mut self.kind {
            ObjectKind::Box(shape) | ObjectKind::WardrobePart { shape, .. } => {
                shape.half_size = size * 0.5;
            }
            ObjectKind::Sphere { .. } => return false,
        }
        self.refresh();
        true
    }

    pub fn is_selectable(&self) -> bool {
        self.flags.enabled
    }

    pub fn is_draggable(&self) -> bool {
        self.flags.enabled && self.flags.interactive
    }

    pub fn physics_state(&self) -> PhysicsState {
        self.physics_state
    }

    pub fn set_physics_state(&mut self, state: PhysicsState) {
        self.physics_state = state;
    }

    /// Bounds derived from the current position and shape.
    pub fn compute_bounds(&self) -> Bounds {
        match &self.kind {
            ObjectKind::Box(shape) | ObjectKind::WardrobePart { shape, .. } => {
                Bounds::from_center(self.position, shape.aligned_half_extents())
            }
            ObjectKind::Sphere { radius } => {
                Bounds::from_center(self.position, Vector3::new(*radius, *radius, *radius))
            }
        }
    }

    /// Advances physics by `dt` and rebuilds the model matrix and bounds.
    pub fn update_transform(&mut self, dt: f32) {
        match self.physics_state {
            PhysicsState::Resting(height) => {
                self.position.y = height;
                self.velocity = Vector3::zero();
            }
            PhysicsState::Free if self.flags.physics => {
                self.velocity.y -= GRAVITY * dt;
                self.position += self.velocity * dt;
            }
            PhysicsState::Free => {}
        }
        self.refresh();
    }

    /// Queues a translation to be committed by [`Self::apply_pending_translation`].
    pub fn translate_pending(&mut self, delta: Vector3<f32>) {
        self.pending_translation += delta;
    }

    pub fn pending_translation(&self) -> Vector3<f32> {
        self.pending_translation
    }

    pub fn apply_pending_translation(&mut self) {
        if self.pending_translation.is_zero() {
            return;
        }
        self.position += self.pending_translation;
        self.pending_translation = Vector3::zero();
        self.refresh();
    }

    fn refresh(&mut self) {
        self.model = self.compute_model();
        self.bounds = self.compute_bounds();
    }

    fn compute_model(&self) -> Matrix4<f32> {
        let translation = Matrix4::from_translation(self.position);
        match &self.kind {
            ObjectKind::Box(shape) | ObjectKind::WardrobePart { shape, .. } => {
                let size = shape.size();
                translation
                    * Matrix4::from(shape.rotation)
                    * Matrix4::from_nonuniform_scale(size.x, size.y, size.z)
            }
            ObjectKind::Sphere { radius } => translation * Matrix4::from_scale(*radius),
        }
    }

    /// Unit mesh matching the kind; the model matrix supplies the real size.
    pub fn mesh_data(&self) -> MeshData {
        match self.kind {
            ObjectKind::Box(_) | ObjectKind::WardrobePart { .. } => unit_cube(),
            ObjectKind::Sphere { .. } => {
                unit_sphere(SPHERE_LONGITUDE_SEGMENTS, SPHERE_LATITUDE_SEGMENTS)
            }
        }
    }

    pub fn has_mesh(&self) -> bool {
        self.mesh.is_some()
    }

    /// Stores the uploaded mesh, handing back any handle it replaces.
    pub fn attach_mesh(&mut self, mesh: MeshHandle) -> Option<MeshHandle> {
        self.mesh.replace(mesh)
    }

    pub fn take_mesh(&mut self) -> Option<MeshHandle> {
        self.mesh.take()
    }

    /// Emits this object's draw call for the given pass.
    pub fn draw<B: RenderBackend + ?Sized>(&self, backend: &mut B, ctx: &DrawContext) {
        if !self.flags.enabled {
            return;
        }
        let Some(mesh) = self.mesh.as_ref() else {
            return;
        };

        backend.set_uniform(uniforms::MODEL, UniformValue::Mat4(self.model));

        match ctx.pass {
            PassKind::Shadow => {}
            PassKind::Picking => {
                let Some(color) = picking::index_to_color(ctx.index) else {
                    return;
                };
                backend.set_uniform(uniforms::PICK_COLOR, UniformValue::Vec4(color));
            }
            PassKind::Main => {
                debug_assert!(
                    self.textures.is_complete(),
                    "'{}' drawn without its required material textures",
                    self.name
                );
                if !self.textures.is_complete() {
                    log::warn!("Skipping '{}': required material textures missing", self.name);
                    return;
                }

                let normal_matrix = self
                    .model
                    .invert()
                    .map(|m| m.transpose())
                    .unwrap_or_else(Matrix4::identity);
                backend.set_uniform(uniforms::NORMAL_MATRIX, UniformValue::Mat4(normal_matrix));
                backend.set_uniform(uniforms::IS_PICKED, UniformValue::Int(ctx.selected as i32));
                backend.set_uniform(uniforms::BASE_COLOR, UniformValue::Vec3(self.material.color));
                backend.set_uniform(uniforms::EMISSIVE, UniformValue::Vec3(self.material.emissive));
                backend.set_uniform(
                    uniforms::REFLECTANCE,
                    UniformValue::Vec3(self.material.reflectance),
                );
                backend.set_uniform(uniforms::ROUGHNESS, UniformValue::Float(self.material.roughness));
                backend.set_uniform(uniforms::METALNESS, UniformValue::Float(self.material.metalness));
                backend.set_uniform(uniforms::OPACITY, UniformValue::Float(self.material.opacity));
                backend.set_uniform(
                    uniforms::TEX_SCALE,
                    UniformValue::Vec4([self.tex_scale[0], self.tex_scale[1], 0.0, 0.0]),
                );
                for slot in TextureSlot::ALL {
                    backend.bind_texture(slot, self.textures.get(slot));
                }
            }
        }

        backend.submit_draw(mesh, mesh.index_count());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cgmath::{Deg, Rotation3};

    #[test]
    fn test_box_bounds_follow_position() {
        let mut cube = SceneObject::new_box("cube", Vector3::new(1.0, 2.0, 3.0), Vector3::new(2.0, 4.0, 6.0));
        assert_eq!(cube.bounds().min, Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(cube.bounds().max, Vector3::new(2.0, 4.0, 6.0));

        cube.set_position(Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(cube.bounds(), cube.compute_bounds());
        assert_eq!(cube.bounds().min, Vector3::new(-1.0, -2.0, -3.0));
    }

    #[test]
    fn test_box_from_corner() {
        let floor = SceneObject::new_box_from_corner(
            "floor",
            Vector3::new(-10.0, -1.0, -10.0),
            Vector3::new(20.0, 1.0, 20.0),
        );
        assert_eq!(floor.position(), Vector3::new(0.0, -0.5, 0.0));
        assert_eq!(floor.bounds().max.y, 0.0);
    }

    #[test]
    fn test_rotated_box_bounds() {
        let plank = SceneObject::new_box("plank", Vector3::zero(), Vector3::new(4.0, 1.0, 1.0))
            .with_rotation(Quaternion::from_angle_y(Deg(90.0)));
        let half = plank.bounds().half_extents();
        assert_relative_eq!(half.x, 0.5, epsilon = 1e-5);
        assert_relative_eq!(half.z, 2.0, epsilon = 1e-5);
    }

    #[test]
    fn test_sphere_bounds_and_model() {
        let sphere = SceneObject::new_sphere("ball", Vector3::new(0.0, 5.0, 0.0), 2.0);
        assert_eq!(sphere.bounds().min, Vector3::new(-2.0, 3.0, -2.0));
        assert_eq!(sphere.model()[3][1], 5.0);
        assert_eq!(sphere.model()[0][0], 2.0);
        assert!(sphere.size().is_none());
    }

    #[test]
    fn test_free_fall_and_resting() {
        let mut ball = SceneObject::new_sphere("ball", Vector3::new(0.0, 10.0, 0.0), 1.0);
        ball.update_transform(0.5);
        assert!(ball.position().y < 10.0);
        assert!(ball.velocity().y < 0.0);
        assert_eq!(ball.bounds(), ball.compute_bounds());

        ball.set_physics_state(PhysicsState::Resting(1.0));
        ball.update_transform(0.5);
        assert_eq!(ball.position().y, 1.0);
        assert_eq!(ball.velocity(), Vector3::zero());
    }

    #[test]
    fn test_static_box_ignores_gravity() {
        let mut cube = SceneObject::new_box("cube", Vector3::new(0.0, 3.0, 0.0), Vector3::new(1.0, 1.0, 1.0));
        cube.update_transform(1.0);
        assert_eq!(cube.position().y, 3.0);
    }

    #[test]
    fn test_pending_translation_commits_once() {
        let mut ball = SceneObject::new_sphere("ball", Vector3::zero(), 1.0);
        ball.translate_pending(Vector3::new(1.0, 0.0, 0.5));
        ball.translate_pending(Vector3::new(1.0, 0.0, 0.5));
        assert_eq!(ball.position(), Vector3::zero());

        ball.apply_pending_translation();
        assert_eq!(ball.position(), Vector3::new(2.0, 0.0, 1.0));
        assert_eq!(ball.bounds().center(), Vector3::new(2.0, 0.0, 1.0));
        assert_eq!(ball.displacement(), Vector3::new(2.0, 0.0, 1.0));

        ball.apply_pending_translation();
        assert_eq!(ball.position(), Vector3::new(2.0, 0.0, 1.0));

        ball.mark_start();
        assert_eq!(ball.displacement(), Vector3::zero());
    }

    #[test]
    fn test_set_size_only_for_boxes() {
        let mut cube = SceneObject::new_box("cube", Vector3::zero(), Vector3::new(1.0, 1.0, 1.0));
        assert!(cube.set_size(Vector3::new(2.0, 2.0, 2.0)));
        assert_eq!(cube.size(), Some(Vector3::new(2.0, 2.0, 2.0)));
        assert!(!cube.set_size(Vector3::new(0.0, 2.0, 2.0)));

        let mut ball = SceneObject::new_sphere("ball", Vector3::zero(), 1.0);
        assert!(!ball.set_size(Vector3::new(2.0, 2.0, 2.0)));
    }

    #[test]
    fn test_material_textures_completeness() {
        let mut textures = MaterialTextures::default();
        assert!(!textures.is_complete());

        for (i, slot) in MaterialTextures::REQUIRED.iter().enumerate() {
            textures.set(*slot, Some(TextureId(i as u32)));
        }
        assert!(textures.is_complete());
        assert_eq!(textures.get(TextureSlot::Height), None);
        assert_eq!(textures.get(TextureSlot::Normal), Some(TextureId(1)));
    }
}
