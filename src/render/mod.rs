//! # Render Abstraction
//!
//! The editor core never talks to a graphics API directly. Everything it needs
//! from the GPU goes through [`RenderBackend`]: binding one of the three render
//! targets, clearing it, setting named uniforms, binding material textures,
//! submitting a mesh, and reading back a single pixel.
//!
//! Two backends exist:
//!
//! - [`crate::gfx::RenderEngine`] - the wgpu implementation used by the app
//! - [`headless::HeadlessBackend`] - a CPU rasterizer of projected bounds, used by tests
//!
//! ## Immediate-mode contract
//!
//! Uniforms and textures behave like GL state: they persist until overwritten
//! and are captured at each `submit_draw`. `read_pixel` must observe every draw
//! submitted to the target before the call.

pub mod headless;
pub mod orchestrator;
pub mod textures;

pub use headless::HeadlessBackend;
pub use orchestrator::{FrameContext, FrameReport, RenderOrchestrator};
pub use textures::TextureRegistry;

use cgmath::{Matrix4, Vector3};

use crate::{
    error::{EditorError, Result},
    geometry::MeshData,
};

/// Remaps cgmath's OpenGL clip depth (-1..1) to the 0..1 range wgpu expects.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Checks that `rgba` holds exactly `width * height` RGBA8 texels.
pub fn validate_rgba(label: &str, width: u32, height: u32, rgba: &[u8]) -> Result<()> {
    let expected = width as usize * height as usize * 4;
    if rgba.len() != expected {
        return Err(EditorError::TextureSize {
            label: label.to_owned(),
            expected,
            actual: rgba.len(),
        });
    }
    Ok(())
}

/// The three framebuffers a frame renders into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetId {
    /// Depth-only shadow map rendered from the light.
    Shadow,
    /// Off-screen color-ID target read back for selection.
    Picking,
    /// The visible surface.
    Main,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    Color([f64; 4]),
    Depth(f32),
    ColorAndDepth([f64; 4], f32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Mat4(Matrix4<f32>),
    Vec3(Vector3<f32>),
    Vec4([f32; 4]),
    Float(f32),
    Int(i32),
}

/// Uniform names understood by every backend.
pub mod uniforms {
    pub const MODEL: &str = "model";
    pub const NORMAL_MATRIX: &str = "normal_matrix";
    pub const VIEW_PROJ: &str = "view_proj";
    pub const LIGHT_SPACE: &str = "light_space";
    pub const VIEW_POS: &str = "view_pos";
    pub const LIGHT_POS: &str = "light_pos";
    pub const PICK_COLOR: &str = "pick_color";
    pub const IS_PICKED: &str = "is_picked";
    pub const BASE_COLOR: &str = "base_color";
    pub const EMISSIVE: &str = "emissive";
    pub const REFLECTANCE: &str = "reflectance";
    pub const ROUGHNESS: &str = "roughness";
    pub const METALNESS: &str = "metalness";
    pub const OPACITY: &str = "opacity";
    pub const TEX_SCALE: &str = "tex_scale";
}

/// Texture unit a material map is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    Albedo,
    Normal,
    Metallic,
    Roughness,
    Height,
    AmbientOcclusion,
}

impl TextureSlot {
    pub const ALL: [TextureSlot; 6] = [
        TextureSlot::Albedo,
        TextureSlot::Normal,
        TextureSlot::Metallic,
        TextureSlot::Roughness,
        TextureSlot::Height,
        TextureSlot::AmbientOcclusion,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Shared texture handle. Textures are owned by the [`TextureRegistry`], never by objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

/// Owned handle to mesh buffers living in a backend.
///
/// Not `Clone`: whoever holds it is responsible for passing it back to
/// [`RenderBackend::release_mesh`] exactly once.
#[derive(Debug, PartialEq, Eq)]
pub struct MeshHandle {
    id: u64,
    index_count: u32,
}

impl MeshHandle {
    pub fn new(id: u64, index_count: u32) -> Self {
        Self { id, index_count }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}

/// Row order of a color target's storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOrder {
    /// Row 0 is the top of the viewport (wgpu, window coordinates).
    TopDown,
    /// Row 0 is the bottom of the viewport (OpenGL-style framebuffers).
    BottomUp,
}

pub trait RenderBackend {
    /// Current viewport size in physical pixels.
    fn viewport_size(&self) -> (u32, u32);

    /// Resizes the surface and every viewport-sized target, including the picking target.
    fn resize(&mut self, width: u32, height: u32);

    fn row_order(&self) -> RowOrder;

    fn upload_mesh(&mut self, mesh: &MeshData) -> MeshHandle;

    fn release_mesh(&mut self, mesh: MeshHandle);

    fn create_texture(
        &mut self,
        label: &str,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Result<TextureId>;

    fn bind_target(&mut self, target: TargetId);

    fn clear(&mut self, value: ClearValue);

    fn set_uniform(&mut self, name: &str, value: UniformValue);

    fn bind_texture(&mut self, slot: TextureSlot, texture: Option<TextureId>);

    fn submit_draw(&mut self, mesh: &MeshHandle, index_count: u32);

    /// Synchronously reads one texel. `None` when out of bounds or the readback failed.
    fn read_pixel(&mut self, target: TargetId, x: u32, y: u32) -> Option<[u8; 4]>;
}
