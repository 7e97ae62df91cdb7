//! CPU render backend
//!
//! Rasterizes the screen-space rectangle of each mesh's projected bounds into
//! plain color and depth buffers. That is enough to reproduce what the GPU
//! picking pass produces for separated objects, so selection can be exercised
//! without a device.

use std::collections::HashMap;

use cgmath::{Matrix4, SquareMatrix, Vector4};

use crate::{
    error::Result,
    geometry::{Bounds, MeshData},
};

use super::{
    uniforms, validate_rgba, ClearValue, MeshHandle, RenderBackend, RowOrder, TargetId, TextureId,
    TextureSlot, UniformValue,
};

/// One submitted draw, captured with the state it was drawn with.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub target: TargetId,
    pub mesh: u64,
    pub index_count: u32,
    pub pick_color: Option<[f32; 4]>,
    pub selected: bool,
    pub textures: [Option<TextureId>; 6],
}

#[derive(Debug, Clone)]
struct Canvas {
    color: Vec<[u8; 4]>,
    depth: Vec<f32>,
}

impl Canvas {
    fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            color: vec![[0; 4]; len],
            depth: vec![1.0; len],
        }
    }
}

#[derive(Debug)]
pub struct HeadlessBackend {
    width: u32,
    height: u32,
    row_order: RowOrder,
    meshes: HashMap<u64, Bounds>,
    next_mesh_id: u64,
    released: usize,
    textures: Vec<String>,
    target: TargetId,
    uniforms: HashMap<String, UniformValue>,
    bound_textures: [Option<TextureId>; 6],
    picking: Canvas,
    main: Canvas,
    draws: Vec<DrawRecord>,
}

impl HeadlessBackend {
    /// Backend with bottom-up storage, like a GL framebuffer.
    pub fn new(width: u32, height: u32) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        Self {
            width,
            height,
            row_order: RowOrder::BottomUp,
            meshes: HashMap::new(),
            next_mesh_id: 0,
            released: 0,
            textures: Vec::new(),
            target: TargetId::Main,
            uniforms: HashMap::new(),
            bound_textures: [None; 6],
            picking: Canvas::new(width, height),
            main: Canvas::new(width, height),
            draws: Vec::new(),
        }
    }

    pub fn with_row_order(mut self, row_order: RowOrder) -> Self {
        self.row_order = row_order;
        self
    }

    pub fn live_mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn released_mesh_count(&self) -> usize {
        self.released
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    /// Forgets recorded draws; buffer contents are kept.
    pub fn clear_draws(&mut self) {
        self.draws.clear();
    }

    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.uniforms.get(name).copied()
    }

    fn canvas_mut(&mut self, target: TargetId) -> Option<&mut Canvas> {
        match target {
            TargetId::Picking => Some(&mut self.picking),
            TargetId::Main => Some(&mut self.main),
            TargetId::Shadow => None,
        }
    }

    fn matrix(&self, name: &str) -> Matrix4<f32> {
        match self.uniforms.get(name) {
            Some(UniformValue::Mat4(m)) => *m,
            _ => Matrix4::identity(),
        }
    }

    fn fragment_color(&self) -> [u8; 4] {
        let to_byte = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        match (self.target, self.uniforms.get(uniforms::PICK_COLOR), self.uniforms.get(uniforms::BASE_COLOR)) {
            (TargetId::Picking, Some(UniformValue::Vec4(c)), _) => {
                [to_byte(c[0]), to_byte(c[1]), to_byte(c[2]), to_byte(c[3])]
            }
            (TargetId::Main, _, Some(UniformValue::Vec3(c))) => {
                [to_byte(c.x), to_byte(c.y), to_byte(c.z), 255]
            }
            _ => [0, 0, 0, 255],
        }
    }

    /// Fills the projected rectangle of `local` with the current fragment color.
    fn rasterize(&mut self, local: Bounds) {
        let mvp = self.matrix(uniforms::VIEW_PROJ) * self.matrix(uniforms::MODEL);

        let mut ndc = Vec::with_capacity(8);
        for corner in local.corners() {
            let clip = mvp * Vector4::new(corner.x, corner.y, corner.z, 1.0);
            if clip.w <= f32::EPSILON {
                // Straddles the eye plane; skip rather than clip.
                return;
            }
            ndc.push(clip.truncate() / clip.w);
        }
        let rect = Bounds::from_points(ndc);
        if rect.max.z < -1.0 || rect.min.z > 1.0 {
            return;
        }

        let (w, h) = (self.width as f32, self.height as f32);
        let x0 = (((rect.min.x * 0.5 + 0.5) * w).floor().max(0.0)) as u32;
        let x1 = (((rect.max.x * 0.5 + 0.5) * w).ceil().min(w)) as u32;
        // Window rows grow downward.
        let y0 = (((0.5 - rect.max.y * 0.5) * h).floor().max(0.0)) as u32;
        let y1 = (((0.5 - rect.min.y * 0.5) * h).ceil().min(h)) as u32;

        let color = self.fragment_color();
        let depth = rect.min.z;
        let (width, height, row_order, target) = (self.width, self.height, self.row_order, self.target);
        let Some(canvas) = self.canvas_mut(target) else {
            return;
        };

        for y in y0..y1 {
            let row = match row_order {
                RowOrder::TopDown => y,
                RowOrder::BottomUp => height - 1 - y,
            };
            for x in x0..x1 {
                let i = row as usize * width as usize + x as usize;
                if depth < canvas.depth[i] {
                    canvas.depth[i] = depth;
                    canvas.color[i] = color;
                }
            }
        }
    }
}

impl RenderBackend for HeadlessBackend {
    fn viewport_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.picking = Canvas::new(self.width, self.height);
        self.main = Canvas::new(self.width, self.height);
    }

    fn row_order(&self) -> RowOrder {
        self.row_order
    }

    fn upload_mesh(&mut self, mesh: &MeshData) -> MeshHandle {
        let id = self.next_mesh_id;
        self.next_mesh_id += 1;
        self.meshes.insert(id, mesh.local_bounds());
        MeshHandle::new(id, mesh.index_count())
    }

    fn release_mesh(&mut self, mesh: MeshHandle) {
        if self.meshes.remove(&mesh.id()).is_some() {
            self.released += 1;
        } else {
            log::warn!("Released unknown mesh {}", mesh.id());
        }
    }

    fn create_texture(&mut self, label: &str, width: u32, height: u32, rgba: &[u8]) -> Result<TextureId> {
        validate_rgba(label, width, height, rgba)?;
        self.textures.push(label.to_owned());
        Ok(TextureId(self.textures.len() as u32 - 1))
    }

    fn bind_target(&mut self, target: TargetId) {
        self.target = target;
    }

    fn clear(&mut self, value: ClearValue) {
        let to_byte = |c: f64| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        let target = self.target;
        let Some(canvas) = self.canvas_mut(target) else {
            return;
        };

        let (color, depth) = match value {
            ClearValue::Color(c) => (Some(c), None),
            ClearValue::Depth(d) => (None, Some(d)),
            ClearValue::ColorAndDepth(c, d) => (Some(c), Some(d)),
        };
        if let Some(c) = color {
            canvas.color.fill([to_byte(c[0]), to_byte(c[1]), to_byte(c[2]), to_byte(c[3])]);
        }
        if let Some(d) = depth {
            canvas.depth.fill(d);
        }
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        self.uniforms.insert(name.to_owned(), value);
    }

    fn bind_texture(&mut self, slot: TextureSlot, texture: Option<TextureId>) {
        self.bound_textures[slot.index()] = texture;
    }

    fn submit_draw(&mut self, mesh: &MeshHandle, index_count: u32) {
        let Some(local) = self.meshes.get(&mesh.id()).copied() else {
            log::warn!("Draw with released mesh {}", mesh.id());
            return;
        };

        let pick_color = match (self.target, self.uniforms.get(uniforms::PICK_COLOR)) {
            (TargetId::Picking, Some(UniformValue::Vec4(c))) => Some(*c),
            _ => None,
        };
        let selected = matches!(self.uniforms.get(uniforms::IS_PICKED), Some(UniformValue::Int(1)));
        self.draws.push(DrawRecord {
            target: self.target,
            mesh: mesh.id(),
            index_count,
            pick_color,
            selected: self.target == TargetId::Main && selected,
            textures: self.bound_textures,
        });

        self.rasterize(local);
    }

    fn read_pixel(&mut self, target: TargetId, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let width = self.width as usize;
        self.canvas_mut(target)
            .map(|canvas| canvas.color[y as usize * width + x as usize])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EditorError;
    use crate::geometry::unit_cube;
    use cgmath::{ortho, Vector3};

    fn backend() -> HeadlessBackend {
        let mut backend = HeadlessBackend::new(8, 8).with_row_order(RowOrder::TopDown);
        backend.set_uniform(
            uniforms::VIEW_PROJ,
            UniformValue::Mat4(ortho(-4.0, 4.0, -4.0, 4.0, -10.0, 10.0)),
        );
        backend
    }

    #[test]
    fn test_picking_draw_fills_projected_rect() {
        let mut backend = backend();
        let cube = backend.upload_mesh(&unit_cube());

        backend.bind_target(TargetId::Picking);
        backend.clear(ClearValue::Color([1.0; 4]));
        backend.set_uniform(uniforms::MODEL, UniformValue::Mat4(Matrix4::from_scale(2.0)));
        backend.set_uniform(uniforms::PICK_COLOR, UniformValue::Vec4([2.0 / 255.0, 0.0, 0.0, 1.0]));
        backend.submit_draw(&cube, 36);

        assert_eq!(backend.read_pixel(TargetId::Picking, 4, 4), Some([2, 0, 0, 255]));
        assert_eq!(backend.read_pixel(TargetId::Picking, 0, 0), Some([255; 4]));
        assert_eq!(backend.read_pixel(TargetId::Picking, 8, 0), None);
        assert_eq!(backend.draws()[0].pick_color, Some([2.0 / 255.0, 0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_nearer_draw_wins() {
        let mut backend = backend();
        let cube = backend.upload_mesh(&unit_cube());
        backend.bind_target(TargetId::Picking);
        backend.clear(ClearValue::ColorAndDepth([1.0; 4], 1.0));

        // cgmath's ortho maps larger z closer to the viewer.
        for (z, red) in [(2.0, 1u8), (-2.0, 2u8)] {
            let model = Matrix4::from_translation(Vector3::new(0.0, 0.0, z)) * Matrix4::from_scale(2.0);
            backend.set_uniform(uniforms::MODEL, UniformValue::Mat4(model));
            backend.set_uniform(
                uniforms::PICK_COLOR,
                UniformValue::Vec4([f32::from(red) / 255.0, 0.0, 0.0, 1.0]),
            );
            backend.submit_draw(&cube, 36);
        }

        assert_eq!(backend.read_pixel(TargetId::Picking, 4, 4), Some([1, 0, 0, 255]));
    }

    #[test]
    fn test_bottom_up_storage_flips_rows() {
        let mut backend = backend().with_row_order(RowOrder::BottomUp);
        let cube = backend.upload_mesh(&unit_cube());
        backend.bind_target(TargetId::Picking);
        backend.clear(ClearValue::Color([1.0; 4]));

        // Occupies the top window row only.
        let model = Matrix4::from_translation(Vector3::new(0.0, 3.5, 0.0))
            * Matrix4::from_nonuniform_scale(8.0, 1.0, 1.0);
        backend.set_uniform(uniforms::MODEL, UniformValue::Mat4(model));
        backend.set_uniform(uniforms::PICK_COLOR, UniformValue::Vec4([0.0, 0.0, 0.0, 1.0]));
        backend.submit_draw(&cube, 36);

        assert_eq!(backend.read_pixel(TargetId::Picking, 3, 7), Some([0, 0, 0, 255]));
        assert_eq!(backend.read_pixel(TargetId::Picking, 3, 0), Some([255; 4]));
    }

    #[test]
    fn test_texture_size_is_validated() {
        let mut backend = backend();
        assert!(backend.create_texture("ok", 2, 2, &[0; 16]).is_ok());
        assert!(matches!(
            backend.create_texture("short", 2, 2, &[0; 12]),
            Err(EditorError::TextureSize { expected: 16, actual: 12, .. })
        ));
        assert_eq!(backend.texture_count(), 1);
    }

    #[test]
    fn test_resize_clamps_and_reallocates() {
        let mut backend = backend();
        backend.resize(0, 0);
        assert_eq!(backend.viewport_size(), (1, 1));
        assert!(backend.read_pixel(TargetId::Picking, 0, 0).is_some());
        assert!(backend.read_pixel(TargetId::Shadow, 0, 0).is_none());
    }
}
